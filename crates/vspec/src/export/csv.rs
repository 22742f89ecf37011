//! CSV back-end: one row per node

use super::{Artifact, Exporter, ExporterContext};
use crate::error::Result;
use std::path::Path;
use vspec_model::Node;

const HEADER: &str =
    "Signal,Type,DataType,Deprecated,Unit,Min,Max,Desc,Comment,Allowed,Default,Instances";

/// Render the tree as a CSV table
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let mut out = String::with_capacity(4096);
        out.push_str(HEADER);
        out.push('\n');
        for (fqn, _, node) in context.tree.preorder() {
            out.push_str(&row(&fqn, node));
            out.push('\n');
        }
        Ok(vec![Artifact::new(output, out.into_bytes())])
    }
}

fn row(fqn: &str, node: &Node) -> String {
    let signal = node.signal();
    let cells = [
        fqn.to_string(),
        node.kind().to_string(),
        signal
            .and_then(|s| s.datatype.as_ref())
            .map(|d| d.canonical())
            .unwrap_or_default(),
        node.deprecation.clone().unwrap_or_default(),
        signal
            .and_then(|s| s.unit.as_deref())
            .unwrap_or_default()
            .to_string(),
        signal
            .and_then(|s| s.min.as_ref())
            .map(ToString::to_string)
            .unwrap_or_default(),
        signal
            .and_then(|s| s.max.as_ref())
            .map(ToString::to_string)
            .unwrap_or_default(),
        node.description.clone().unwrap_or_default(),
        node.comment.clone().unwrap_or_default(),
        signal
            .map(|s| {
                s.allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" / ")
            })
            .unwrap_or_default(),
        signal
            .and_then(|s| s.default.as_ref())
            .and_then(|d| serde_yaml::to_string(d).ok())
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
        node.instances()
            .map(|i| {
                i.dims
                    .iter()
                    .map(|d| d.labels.join("/"))
                    .collect::<Vec<_>>()
                    .join(" x ")
            })
            .unwrap_or_default(),
    ];
    cells
        .iter()
        .map(|cell| escape(cell))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote cells containing separators, quotes, or newlines
fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
