use clap::Parser;
use std::fs::File;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vspec::cli::{Cli, Command, ExportFormat};
use vspec::error::CompileError;
use vspec::export::{
    Exporter, ExporterContext, binary::BinaryExporter, csv::CsvExporter, ddsidl::DdsIdlExporter,
    franca::FrancaExporter, graphql::GraphqlExporter, id::IdExporter, json::JsonExporter,
    jsonschema::JsonSchemaExporter, protobuf::ProtobufExporter, tree::TreeExporter,
    yaml::YamlExporter,
};
use vspec_id::IdOptions;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let code = error.exit_code();
            if let CompileError::ValidationFailed { report } = &error {
                eprintln!("{}", report);
            }
            eprintln!("{:?}", miette::Report::new(error));
            ExitCode::from(code as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<(), CompileError> {
    let Command::Export { format } = &cli.command;
    let common = format.common();

    let compiled = vspec::compile(&common.to_compile_options())?;
    if !compiled.report.is_empty() {
        eprintln!("{}", compiled.report);
    }

    let context = ExporterContext::from_compiled(&compiled);
    let exporter: Box<dyn Exporter> = match format {
        ExportFormat::Json { pretty, .. } => Box::new(JsonExporter { pretty: *pretty }),
        ExportFormat::Yaml { .. } => Box::new(YamlExporter),
        ExportFormat::Csv { .. } => Box::new(CsvExporter),
        ExportFormat::Tree { .. } => Box::new(TreeExporter),
        ExportFormat::Ddsidl { .. } => Box::new(DdsIdlExporter),
        ExportFormat::Franca { .. } => Box::new(FrancaExporter),
        ExportFormat::Graphql { .. } => Box::new(GraphqlExporter),
        ExportFormat::Jsonschema { .. } => Box::new(JsonSchemaExporter),
        ExportFormat::Protobuf { .. } => Box::new(ProtobufExporter),
        ExportFormat::Binary { .. } => Box::new(BinaryExporter),
        ExportFormat::Id {
            common,
            validate_prior,
            layer,
            validate_only,
            case_sensitive,
        } => {
            let mut id_options = IdOptions::new();
            id_options.layer = *layer;
            id_options.case_sensitive = *case_sensitive;
            Box::new(IdExporter {
                id_options,
                prior: validate_prior.clone(),
                validate_only: *validate_only,
                include_dirs: common.include_dirs.clone(),
            })
        }
    };

    for artifact in exporter.export(&context, &common.output)? {
        artifact.write()?;
    }
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vspec={0},vspec_id={0},vspec_binary={0},vspec_model={0}", default_level)));

    match cli.log_file.as_ref().and_then(|path| File::create(path).ok()) {
        Some(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
