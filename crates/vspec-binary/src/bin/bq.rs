//! `vspec-bq`: inspect and query a binary-exported signal tree

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use vspec_binary::{SearchOptions, max_validate, read_file, search};

#[derive(Parser, Debug)]
#[command(
    name = "vspec-bq",
    version,
    about = "Query a binary-exported VSS tree"
)]
struct Cli {
    /// Binary tree file, as written by `vspec export binary`
    file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print node count and maximum depth
    Metadata,
    /// Search by dot-separated path; `*` matches one segment
    Search {
        /// Query path, e.g. `Vehicle.Cabin.*.IsOpen`
        query: String,

        /// Enumerate all leaves below the matched prefix
        #[arg(long)]
        any_depth: bool,

        /// Exclude branches and structs from the results
        #[arg(long)]
        leaf_only: bool,

        /// Stop after this many matches (0 = unbounded)
        #[arg(long, default_value_t = 0)]
        max_results: usize,

        /// Prune matches under this path; repeatable
        #[arg(long = "no-scope")]
        no_scope: Vec<String>,

        /// Also print the combined access-validation level of the matches
        #[arg(long)]
        validate: bool,
    },
    /// Print every leaf path as JSON
    Leafpaths,
    /// Print every (path, uuid) pair as JSON
    Leafuuids,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("vspec-bq: {}", error);
            ExitCode::from(if error.is_io() { 3 } else { 1 })
        }
    }
}

fn run(cli: &Cli) -> vspec_binary::Result<()> {
    let (tree, metadata) = read_file(&cli.file)?;

    match &cli.command {
        Command::Metadata => {
            println!("nodes: {}", metadata.node_count);
            println!("depth: {}", metadata.max_depth);
        }
        Command::Search {
            query,
            any_depth,
            leaf_only,
            max_results,
            no_scope,
            validate,
        } => {
            let options = SearchOptions {
                any_depth: *any_depth,
                leaf_nodes_only: *leaf_only,
                max_results: *max_results,
                no_scope: no_scope.clone(),
            };
            let matches = search(&tree, query, &options);
            for (path, node) in &matches {
                match node.uuid.is_empty() {
                    true => println!("{}", path),
                    false => println!("{} {}", path, node.uuid),
                }
            }
            if *validate {
                let level = max_validate(matches.iter().map(|(_, node)| *node));
                println!("validate: {}", level.as_str());
            }
        }
        Command::Leafpaths => {
            vspec_binary::export_leaf_paths(&tree, std::io::stdout().lock())?;
            println!();
        }
        Command::Leafuuids => {
            vspec_binary::export_leaf_uuids(&tree, std::io::stdout().lock())?;
            println!();
        }
    }
    Ok(())
}
