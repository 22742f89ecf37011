//! Semantic validation
//!
//! The validator is the gatekeeper between the expanded tree and the
//! exporters. It never fails fast: every check runs, every finding is
//! collected into a [`ValidationReport`], and the caller decides what a
//! non-empty report means (the CLI maps errors to exit code 1). Strict mode
//! promotes the policy-level warnings - naming style and unknown extended
//! attributes - to errors.

use std::fmt;
use tracing::warn;
use vspec_model::flat::keys;
use vspec_model::{
    Node, NodeKind, Primitive, Profile, QuantityRegistry, ScalarValue, TypeRegistry, UnitRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// What went wrong, mirroring the error taxonomy of the format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    NamingStyle,
    UnknownAttribute,
    MissingRequiredField,
    InconsistentDatatype,
    UnknownUnit,
    UnknownQuantity,
    UnknownType,
    BoundViolation,
    InvalidAllowed,
    InstanceLabelCollision,
    ShapeViolation,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NamingStyle => "naming-style",
            Self::UnknownAttribute => "unknown-attribute",
            Self::MissingRequiredField => "missing-required-field",
            Self::InconsistentDatatype => "inconsistent-datatype",
            Self::UnknownUnit => "unknown-unit",
            Self::UnknownQuantity => "unknown-quantity",
            Self::UnknownType => "unknown-type",
            Self::BoundViolation => "bound-violation",
            Self::InvalidAllowed => "invalid-allowed",
            Self::InstanceLabelCollision => "instance-label-collision",
            Self::ShapeViolation => "shape-violation",
        }
    }
}

/// One finding, anchored to the node it concerns
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub fqn: String,
    pub message: String,
}

/// Every finding of one validation run, in tree order
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        if issue.severity == Severity::Warning {
            warn!(fqn = %issue.fqn, kind = issue.kind.as_str(), "{}", issue.message);
        }
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            let severity = match issue.severity {
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            writeln!(
                f,
                "{severity} [{}] {}: {}",
                issue.kind.as_str(),
                issue.fqn,
                issue.message
            )?;
        }
        write!(
            f,
            "{} error(s), {} warning(s)",
            self.error_count(),
            self.warning_count()
        )
    }
}

/// Which tree is being validated; struct/property placement rules differ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeRole {
    Signals,
    Types,
}

/// Validator over one expanded tree
pub struct Validator<'a> {
    units: &'a UnitRegistry,
    types: &'a TypeRegistry,
    extended_whitelist: &'a [String],
    profile: Option<&'a Profile>,
    strict: bool,
}

impl<'a> Validator<'a> {
    pub fn new(
        units: &'a UnitRegistry,
        types: &'a TypeRegistry,
        extended_whitelist: &'a [String],
        strict: bool,
    ) -> Self {
        Self {
            units,
            types,
            extended_whitelist,
            profile: None,
            strict,
        }
    }

    /// Bind extended attributes to a declared profile
    pub fn with_profile(mut self, profile: Option<&'a Profile>) -> Self {
        self.profile = profile;
        self
    }

    /// Walk the whole tree and collect every finding
    pub fn validate(&self, root: &Node, role: TreeRole) -> ValidationReport {
        let mut report = ValidationReport::new();
        self.check_node(root, None, &root.name.to_string(), role, &mut report);
        report
    }

    fn check_node(
        &self,
        node: &Node,
        parent: Option<&Node>,
        fqn: &str,
        role: TreeRole,
        report: &mut ValidationReport,
    ) {
        let policy = if self.strict {
            Severity::Error
        } else {
            Severity::Warning
        };
        let kind = node.kind();

        // Naming convention; instance labels are exempt.
        if !node.instance_label && !name_is_conventional(&node.name) {
            push(
                report,
                policy,
                IssueKind::NamingStyle,
                fqn,
                format!("name `{}` does not match [A-Z][A-Za-z0-9]*", node.name),
            );
        }

        // Shape invariants.
        if !kind.is_grouping() && !node.children.is_empty() {
            push(
                report,
                Severity::Error,
                IssueKind::ShapeViolation,
                fqn,
                format!("{} has children but is not a branch or struct", kind),
            );
        }
        match role {
            TreeRole::Signals => {
                if matches!(kind, NodeKind::Struct | NodeKind::Property) {
                    push(
                        report,
                        Severity::Error,
                        IssueKind::ShapeViolation,
                        fqn,
                        format!("{} is only allowed in a type definition tree", kind),
                    );
                }
            }
            TreeRole::Types => {
                if matches!(kind, NodeKind::Sensor | NodeKind::Actuator | NodeKind::Attribute) {
                    push(
                        report,
                        Severity::Error,
                        IssueKind::ShapeViolation,
                        fqn,
                        format!("{} is not allowed in a type definition tree", kind),
                    );
                }
                if kind == NodeKind::Property && parent.map(Node::kind) != Some(NodeKind::Struct) {
                    push(
                        report,
                        Severity::Error,
                        IssueKind::ShapeViolation,
                        fqn,
                        "property must be a direct child of a struct".to_string(),
                    );
                }
                if kind == NodeKind::Struct && parent.is_some_and(|p| p.kind() != NodeKind::Branch)
                {
                    push(
                        report,
                        Severity::Error,
                        IssueKind::ShapeViolation,
                        fqn,
                        "struct must live under a branch".to_string(),
                    );
                }
            }
        }

        // Required fields. Synthesized instance branches inherit their
        // description during expansion and carry none under no-expand.
        if node.description.is_none() && !node.instance_label {
            push(
                report,
                Severity::Error,
                IssueKind::MissingRequiredField,
                fqn,
                "description is required".to_string(),
            );
        }

        // Extended attributes: core attributes that fell through are
        // misplacements; profile-declared attributes are typed; the rest is
        // checked against the whitelist.
        for (key, value) in &node.extra {
            if keys::CORE.contains(&key.as_str()) {
                push(
                    report,
                    Severity::Error,
                    IssueKind::InconsistentDatatype,
                    fqn,
                    format!("attribute `{}` is not applicable to a {}", key, kind),
                );
            } else if let Some(spec) = self.profile.and_then(|p| p.get(key)) {
                let conforms = ScalarValue::from_yaml(value)
                    .is_some_and(|scalar| spec.datatype.can_represent(&scalar));
                if !conforms {
                    push(
                        report,
                        Severity::Error,
                        IssueKind::InconsistentDatatype,
                        fqn,
                        format!(
                            "profile attribute `{}` must be a {}",
                            key, spec.datatype
                        ),
                    );
                }
            } else if !self.extended_whitelist.iter().any(|w| w == key.as_str()) {
                push(
                    report,
                    policy,
                    IssueKind::UnknownAttribute,
                    fqn,
                    format!("unknown extended attribute `{}`", key),
                );
            }
        }

        if let Some(signal) = node.signal() {
            match &signal.datatype {
                None => push(
                    report,
                    Severity::Error,
                    IssueKind::MissingRequiredField,
                    fqn,
                    format!("{} requires a datatype", kind),
                ),
                Some(datatype) => {
                    if !self.types.resolves(datatype) {
                        push(
                            report,
                            Severity::Error,
                            IssueKind::UnknownType,
                            fqn,
                            format!("datatype `{}` is not a known struct", datatype),
                        );
                    }
                    if let Some(primitive) = datatype.primitive() {
                        self.check_values(node, primitive, fqn, report);
                    } else if signal.min.is_some()
                        || signal.max.is_some()
                        || !signal.allowed.is_empty()
                    {
                        push(
                            report,
                            Severity::Error,
                            IssueKind::InconsistentDatatype,
                            fqn,
                            "min/max/allowed are not applicable to struct datatypes".to_string(),
                        );
                    }
                    // Unit resolution, and the unit's datatype restriction.
                    if let Some(unit) = &signal.unit {
                        match self.units.get(unit) {
                            None => push(
                                report,
                                Severity::Error,
                                IssueKind::UnknownUnit,
                                fqn,
                                format!("unit `{}` is not defined", unit),
                            ),
                            Some(def) if !def.accepts(datatype) => push(
                                report,
                                Severity::Error,
                                IssueKind::InconsistentDatatype,
                                fqn,
                                format!("unit `{}` does not allow datatype `{}`", unit, datatype),
                            ),
                            Some(_) => {}
                        }
                    }
                }
            }
        }

        for child in &node.children {
            let child_fqn = format!("{}.{}", fqn, child.name);
            self.check_node(child, Some(node), &child_fqn, role, report);
        }
    }

    /// min / max / default / allowed consistency for a numeric-or-scalar leaf
    fn check_values(
        &self,
        node: &Node,
        primitive: Primitive,
        fqn: &str,
        report: &mut ValidationReport,
    ) {
        let signal = node.signal().expect("caller checked");
        let mut issue = |kind, message: String| {
            report.push(ValidationIssue {
                severity: Severity::Error,
                kind,
                fqn: fqn.to_string(),
                message,
            });
        };

        for (label, bound) in [("min", &signal.min), ("max", &signal.max)] {
            if let Some(value) = bound {
                if !primitive.can_represent(value) {
                    issue(
                        IssueKind::BoundViolation,
                        format!("{} {} is not representable in {}", label, value, primitive),
                    );
                }
            }
        }

        let default_scalars = default_scalars(signal.default.as_ref());
        for value in &default_scalars {
            if !primitive.can_represent(value) {
                issue(
                    IssueKind::BoundViolation,
                    format!("default {} is not representable in {}", value, primitive),
                );
            }
        }

        // A fixed arraysize pins the default's length.
        if let (Some(size), Some(serde_yaml::Value::Sequence(seq))) = (
            signal.datatype.as_ref().and_then(|d| d.arraysize()),
            signal.default.as_ref(),
        ) {
            if seq.len() != size {
                issue(
                    IssueKind::BoundViolation,
                    format!("default has {} elements, arraysize is {}", seq.len(), size),
                );
            }
        }

        // min <= default <= max, checked numerically when all sides are.
        let min = signal.min.as_ref().and_then(ScalarValue::as_f64);
        let max = signal.max.as_ref().and_then(ScalarValue::as_f64);
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                issue(
                    IssueKind::BoundViolation,
                    format!("min {} exceeds max {}", min, max),
                );
            }
        }
        for value in default_scalars.iter().filter_map(ScalarValue::as_f64) {
            if min.is_some_and(|m| value < m) || max.is_some_and(|m| value > m) {
                issue(
                    IssueKind::BoundViolation,
                    format!("default {} is outside [min, max]", value),
                );
            }
        }

        for (index, value) in signal.allowed.iter().enumerate() {
            if !primitive.can_represent(value) {
                issue(
                    IssueKind::InvalidAllowed,
                    format!("allowed value {} is not representable in {}", value, primitive),
                );
            }
            if signal.allowed[..index].contains(value) {
                issue(
                    IssueKind::InvalidAllowed,
                    format!("allowed value {} appears more than once", value),
                );
            }
        }
    }
}

fn push(
    report: &mut ValidationReport,
    severity: Severity,
    kind: IssueKind,
    fqn: &str,
    message: String,
) {
    report.push(ValidationIssue {
        severity,
        kind,
        fqn: fqn.to_string(),
        message,
    });
}

fn default_scalars(default: Option<&serde_yaml::Value>) -> Vec<ScalarValue> {
    match default {
        Some(serde_yaml::Value::Sequence(seq)) => {
            seq.iter().filter_map(ScalarValue::from_yaml).collect()
        }
        Some(value) => ScalarValue::from_yaml(value).into_iter().collect(),
        None => Vec::new(),
    }
}

/// `[A-Z][A-Za-z0-9]*`
fn name_is_conventional(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric())
}

/// Instance-descriptor checks that must run before expansion consumes the
/// descriptors: labels non-empty and unique per dimension, and no collision
/// between generated instance names and children declared directly under the
/// template.
pub fn validate_instance_labels(root: &Node) -> ValidationReport {
    let mut report = ValidationReport::new();
    for (fqn, _, node) in root.preorder() {
        let Some(instances) = node.instances() else {
            continue;
        };
        let mut issue = |message: String| {
            report.push(ValidationIssue {
                severity: Severity::Error,
                kind: IssueKind::InstanceLabelCollision,
                fqn: fqn.clone(),
                message,
            });
        };
        for (level, dim) in instances.dims.iter().enumerate() {
            for (index, label) in dim.labels.iter().enumerate() {
                if label.is_empty() {
                    issue(format!("dimension {} has an empty label", level + 1));
                }
                if dim.labels[..index].contains(label) {
                    issue(format!(
                        "label `{}` appears twice in dimension {}",
                        label,
                        level + 1
                    ));
                }
                match level {
                    // Level-0 collisions with branch children are the
                    // authored-override pattern; anything else collides.
                    0 => {
                        if node
                            .child(label)
                            .is_some_and(|c| c.kind() != NodeKind::Branch)
                        {
                            issue(format!(
                                "instance label `{}` collides with a declared {}",
                                label,
                                node.child(label).unwrap().kind()
                            ));
                        }
                    }
                    _ => {
                        if node.child(label).is_some() {
                            issue(format!(
                                "instance label `{}` (dimension {}) collides with a declared child",
                                label,
                                level + 1
                            ));
                        }
                    }
                }
            }
        }
    }
    report
}

/// Registry-level cross-check: units referencing quantities the quantity
/// registry does not know. Warnings only; a missing quantity file silences
/// the check entirely.
pub fn check_unit_quantities(
    units: &UnitRegistry,
    quantities: &QuantityRegistry,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    for (unit, quantity) in units.unknown_quantities(quantities) {
        report.push(ValidationIssue {
            severity: Severity::Warning,
            kind: IssueKind::UnknownQuantity,
            fqn: format!("unit:{}", unit),
            message: format!("quantity `{}` is not defined", quantity),
        });
    }
    report
}
