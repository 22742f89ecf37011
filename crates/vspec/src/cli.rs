//! Argument surface of the `vspec` binary

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "vspec",
    version,
    about = "Compiler for COVESA VSS signal catalogs"
)]
pub struct Cli {
    /// Verbosity; repeat for more detail (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Mirror log output into this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and export the processed tree
    Export {
        #[command(subcommand)]
        format: ExportFormat,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExportFormat {
    /// Nested JSON object
    Json {
        #[command(flatten)]
        common: CommonArgs,
        /// Pretty-print with indentation
        #[arg(long)]
        pretty: bool,
    },
    /// Flat FQN-keyed vspec YAML
    Yaml {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// One row per node
    Csv {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Terminal tree rendering
    Tree {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// OMG IDL for DDS
    Ddsidl {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Franca IDL type collection
    Franca {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// GraphQL schema (SDL)
    Graphql {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// JSON Schema document
    Jsonschema {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// proto3 schema
    Protobuf {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Length-prefixed binary wire format
    Binary {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Static-UID stamping and validation
    Id {
        #[command(flatten)]
        common: CommonArgs,

        /// Previously stamped vspec to validate against
        #[arg(long = "validate-prior")]
        validate_prior: Option<PathBuf>,

        /// Layer id carried in the high byte of every id
        #[arg(long)]
        layer: Option<u8>,

        /// Report diagnostics without writing output
        #[arg(long)]
        validate_only: bool,

        /// Hash case-sensitively (the default; pass false to fold case)
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        case_sensitive: bool,
    },
}

impl ExportFormat {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Json { common, .. }
            | Self::Yaml { common }
            | Self::Csv { common }
            | Self::Tree { common }
            | Self::Ddsidl { common }
            | Self::Franca { common }
            | Self::Graphql { common }
            | Self::Jsonschema { common }
            | Self::Protobuf { common }
            | Self::Binary { common }
            | Self::Id { common, .. } => common,
        }
    }
}

/// Options shared by every export format
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Root vspec file
    pub vspec: PathBuf,

    /// Include search root; repeatable, tried in order
    #[arg(short = 'I', long = "include-dir")]
    pub include_dirs: Vec<PathBuf>,

    /// Overlay vspec; repeatable, applied in order
    #[arg(short = 'l', long = "overlay")]
    pub overlays: Vec<PathBuf>,

    /// Unit file; repeatable, merged in order
    #[arg(short = 'u', long = "unit-file")]
    pub unit_files: Vec<PathBuf>,

    /// Quantity file; repeatable, merged in order
    #[arg(short = 'q', long = "quantity-file")]
    pub quantity_files: Vec<PathBuf>,

    /// Struct/property definition file; repeatable, overlay-merged
    #[arg(long = "types")]
    pub type_files: Vec<PathBuf>,

    /// Extended attribute accepted by the validator; repeatable
    #[arg(short = 'e', long = "extended-attributes")]
    pub extended_attributes: Vec<String>,

    /// Attribute profile declaring typed extended attributes
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Promote naming/unknown-attribute warnings to errors
    #[arg(short = 's', long)]
    pub strict: bool,

    /// Keep instance templates unexpanded
    #[arg(long)]
    pub no_expand: bool,

    /// Output path
    #[arg(short = 'o', long)]
    pub output: PathBuf,
}

impl CommonArgs {
    pub fn to_compile_options(&self) -> crate::pipeline::CompileOptions {
        crate::pipeline::CompileOptions {
            vspec: self.vspec.clone(),
            include_dirs: self.include_dirs.clone(),
            overlays: self.overlays.clone(),
            unit_files: self.unit_files.clone(),
            quantity_files: self.quantity_files.clone(),
            type_files: self.type_files.clone(),
            extended_attributes: self.extended_attributes.clone(),
            profile: self.profile.clone(),
            strict: self.strict,
            no_expand: self.no_expand,
        }
    }
}
