//! Tree-render back-end: a terminal-friendly picture of the hierarchy

use super::{Artifact, Exporter, ExporterContext};
use crate::error::Result;
use std::path::Path;
use vspec_model::{Node, NodeKind};

/// Render the tree with box-drawing connectors
#[derive(Debug, Clone, Default)]
pub struct TreeExporter;

impl Exporter for TreeExporter {
    fn format(&self) -> &'static str {
        "tree"
    }

    fn export(&self, context: &ExporterContext<'_>, output: &Path) -> Result<Vec<Artifact>> {
        let mut out = String::with_capacity(4096);
        out.push_str(&label(context.tree));
        out.push('\n');
        render_children(context.tree, "", &mut out);
        Ok(vec![Artifact::new(output, out.into_bytes())])
    }
}

fn render_children(node: &Node, prefix: &str, out: &mut String) {
    let last = node.children.len().saturating_sub(1);
    for (index, child) in node.children.iter().enumerate() {
        let (connector, extension) = if index == last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(&label(child));
        out.push('\n');
        render_children(child, &format!("{}{}", prefix, extension), out);
    }
}

fn label(node: &Node) -> String {
    match node.kind() {
        NodeKind::Branch | NodeKind::Struct => format!("{} ({})", node.name, node.kind()),
        _ => {
            let signal = node.signal();
            let datatype = signal
                .and_then(|s| s.datatype.as_ref())
                .map(|d| d.canonical())
                .unwrap_or_default();
            match signal.and_then(|s| s.unit.as_deref()) {
                Some(unit) => format!("{} ({}, {}, {})", node.name, node.kind(), datatype, unit),
                None => format!("{} ({}, {})", node.name, node.kind(), datatype),
            }
        }
    }
}
