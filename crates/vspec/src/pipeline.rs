//! The compile pipeline, front to back
//!
//! One call to [`compile`] performs the whole single-shot transformation:
//! load the root vspec and overlays, merge, build registries, materialize the
//! tree, expand instance templates, validate. Everything downstream (the
//! exporters) receives the result read-only.

use crate::error::{CompileError, Result};
use crate::expand::expand_instances;
use crate::loader::Loader;
use crate::overlay::apply_overlays;
use crate::tree_build::build_tree;
use crate::validate::{
    TreeRole, ValidationReport, Validator, check_unit_quantities, validate_instance_labels,
};
use std::path::PathBuf;
use tracing::{debug, info};
use vspec_model::{Node, Profile, QuantityRegistry, TypeRegistry, UnitRegistry};

/// Everything one pipeline run needs to know
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Root vspec file
    pub vspec: PathBuf,
    /// Include search roots, tried in order after the including file's dir
    pub include_dirs: Vec<PathBuf>,
    /// Overlays, applied in order (last wins)
    pub overlays: Vec<PathBuf>,
    /// Unit files, merged in order
    pub unit_files: Vec<PathBuf>,
    /// Quantity files, merged in order
    pub quantity_files: Vec<PathBuf>,
    /// Struct/property definition files; first is base, rest overlay it
    pub type_files: Vec<PathBuf>,
    /// Extended attributes the validator accepts without complaint
    pub extended_attributes: Vec<String>,
    /// Attribute profile binding extended attributes to declared types
    pub profile: Option<PathBuf>,
    /// Promote naming/unknown-attribute warnings to errors
    pub strict: bool,
    /// Skip instance expansion (`--no-expand`)
    pub no_expand: bool,
}

/// Output of a successful pipeline run
#[derive(Debug, Clone)]
pub struct Compiled {
    /// The expanded, validated signal tree
    pub tree: Node,
    /// The user-defined-types tree, when type files were given
    pub types_tree: Option<Node>,
    pub units: UnitRegistry,
    pub quantities: QuantityRegistry,
    pub types: TypeRegistry,
    /// Warnings collected along the way (errors abort the run instead)
    pub report: ValidationReport,
    pub extended_attributes: Vec<String>,
    pub profile: Option<Profile>,
}

fn registry_files(explicit: &[PathBuf], vspec: &std::path::Path, default_name: &str) -> Vec<PathBuf> {
    if !explicit.is_empty() {
        return explicit.to_vec();
    }
    let candidate = vspec
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."))
        .join(default_name);
    if candidate.is_file() {
        info!(file = %candidate.display(), "using registry file found next to the vspec");
        vec![candidate]
    } else {
        Vec::new()
    }
}

/// Run the whole pipeline
pub fn compile(options: &CompileOptions) -> Result<Compiled> {
    let loader = Loader::new(options.include_dirs.clone());

    // Load and merge: base, then overlays in order.
    let mut flat = loader.load_file(&options.vspec)?;
    let overlays = options
        .overlays
        .iter()
        .map(|path| loader.load_file(path))
        .collect::<Result<Vec<_>>>()?;
    apply_overlays(&mut flat, &overlays);
    debug!(nodes = flat.len(), overlays = overlays.len(), "merged flat model");

    // Registries. Without explicit files, a `units.yaml`/`quantities.yaml`
    // sitting next to the root vspec is picked up.
    let units = UnitRegistry::load_files(&registry_files(
        &options.unit_files,
        &options.vspec,
        "units.yaml",
    ))?;
    let quantities = QuantityRegistry::load_files(&registry_files(
        &options.quantity_files,
        &options.vspec,
        "quantities.yaml",
    ))?;

    let profile = options
        .profile
        .as_ref()
        .map(Profile::load_file)
        .transpose()?;

    let mut report = ValidationReport::new();

    // The types tree loads through the same loader/overlay machinery.
    let (types, types_tree) = if options.type_files.is_empty() {
        (TypeRegistry::new(), None)
    } else {
        let (first, rest) = options.type_files.split_first().unwrap();
        let mut type_flat = loader.load_file(first)?;
        let type_overlays = rest
            .iter()
            .map(|path| loader.load_file(path))
            .collect::<Result<Vec<_>>>()?;
        apply_overlays(&mut type_flat, &type_overlays);
        let types_tree = build_tree(&type_flat, first)?;
        let registry = TypeRegistry::from_tree(&types_tree);
        registry.check_cycles()?;
        info!(structs = registry.len(), "loaded type definitions");
        (registry, Some(types_tree))
    };

    // Materialize and expand.
    let mut tree = build_tree(&flat, &options.vspec)?;
    report.extend(validate_instance_labels(&tree));
    if !options.no_expand {
        expand_instances(&mut tree);
    }

    // Validate.
    let validator = Validator::new(
        &units,
        &types,
        &options.extended_attributes,
        options.strict,
    )
    .with_profile(profile.as_ref());
    report.extend(validator.validate(&tree, TreeRole::Signals));
    if let Some(types_tree) = &types_tree {
        report.extend(validator.validate(types_tree, TreeRole::Types));
    }
    report.extend(check_unit_quantities(&units, &quantities));

    if report.has_errors() {
        return Err(CompileError::ValidationFailed { report });
    }

    info!(nodes = tree.count(), "compiled vspec");
    Ok(Compiled {
        tree,
        types_tree,
        units,
        quantities,
        types,
        report,
        extended_attributes: options.extended_attributes.clone(),
        profile,
    })
}
