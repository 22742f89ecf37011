//! Wildcard path search over decoded trees
//!
//! A search path is dot-separated segments with `*` matching exactly one
//! segment. The engine walks the tree in pre-order and records a match when
//! every segment has been satisfied. Wildcard segments open a *speculation
//! frame*: matches recorded beneath one are provisional until the remainder
//! of the path resolves, and are rolled back when it does not. Speculation
//! nesting is capped at [`MAX_SPECULATION_DEPTH`] outstanding wildcards.
//!
//! A trailing `*` (or the explicit `any_depth` flag) switches the engine
//! into a breadth-first enumeration of the leaves below the node matched by
//! the remaining prefix.

use crate::error::{BinaryError, Result};
use crate::node::BinaryNode;
use serde::Serialize;
use std::collections::VecDeque;
use std::io::Write;

/// Upper bound on nested outstanding wildcards during speculation
pub const MAX_SPECULATION_DEPTH: usize = 20;

/// Engine state, advanced as segments are consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Descending,
    Matching,
    Speculating,
    Finalizing,
}

/// Policy knobs for one search
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Enumerate all leaves below the matched prefix instead of exact-length
    /// matching; implied by a trailing `*` segment
    pub any_depth: bool,
    /// Exclude branches and structs from the result list
    pub leaf_nodes_only: bool,
    /// Stop after this many matches; 0 means unbounded
    pub max_results: usize,
    /// Paths pruned from the results when they are an exact prefix of a match
    pub no_scope: Vec<String>,
}

/// One search run; holds the match buffer and the speculation stack
pub struct SearchEngine<'a, 'o> {
    options: &'o SearchOptions,
    matches: Vec<(String, &'a BinaryNode)>,
    speculation: Vec<usize>,
    state: SearchState,
}

/// Convenience wrapper over [`SearchEngine`]
pub fn search<'a>(
    root: &'a BinaryNode,
    query: &str,
    options: &SearchOptions,
) -> Vec<(String, &'a BinaryNode)> {
    let mut engine = SearchEngine::new(options);
    engine.run(root, query);
    engine.into_matches()
}

impl<'a, 'o> SearchEngine<'a, 'o> {
    pub fn new(options: &'o SearchOptions) -> Self {
        Self {
            options,
            matches: Vec::new(),
            speculation: Vec::new(),
            state: SearchState::Idle,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn into_matches(self) -> Vec<(String, &'a BinaryNode)> {
        self.matches
    }

    /// Execute one search; the engine finishes in `Finalizing`
    pub fn run(&mut self, root: &'a BinaryNode, query: &str) {
        // initContext: clear the buffer, seed the path from the root.
        self.matches.clear();
        self.speculation.clear();
        self.state = SearchState::Descending;

        let segments: Vec<&str> = query.split('.').collect();
        if query.is_empty() || segments.iter().any(|s| s.is_empty()) {
            self.state = SearchState::Finalizing;
            return;
        }

        let trailing_wildcard = segments.last() == Some(&"*");
        if self.options.any_depth || trailing_wildcard {
            let prefix = if trailing_wildcard {
                &segments[..segments.len() - 1]
            } else {
                &segments[..]
            };
            self.run_any_depth(root, prefix);
        } else {
            self.descend(root, &segments, 0, root.name.clone());
        }
        self.state = SearchState::Finalizing;
    }

    /// Exact-length matcher with speculative wildcard frames
    fn descend(&mut self, node: &'a BinaryNode, segments: &[&str], index: usize, path: String) -> bool {
        if self.state == SearchState::Finalizing {
            return false;
        }
        let segment = segments[index];
        let wildcard = segment == "*";
        if !wildcard && segment != node.name {
            return false;
        }
        self.state = SearchState::Matching;

        if wildcard {
            if self.speculation.len() >= MAX_SPECULATION_DEPTH {
                return false;
            }
            self.state = SearchState::Speculating;
            self.speculation.push(self.matches.len());
        }

        let satisfied = if index + 1 == segments.len() {
            self.record(path, node)
        } else {
            let mut any = false;
            for child in &node.children {
                let child_path = format!("{}.{}", path, child.name);
                any |= self.descend(child, segments, index + 1, child_path);
                if self.state == SearchState::Finalizing {
                    break;
                }
            }
            any
        };

        if wildcard {
            let checkpoint = self.speculation.pop().expect("frame pushed above");
            if !satisfied && self.state != SearchState::Finalizing {
                // The remainder never resolved under this subtree: roll the
                // provisional matches back.
                self.matches.truncate(checkpoint);
            }
            if self.speculation.is_empty() && self.state == SearchState::Speculating {
                self.state = SearchState::Matching;
            }
        }
        satisfied
    }

    /// Breadth-first leaf enumeration below every node matching `prefix`
    fn run_any_depth(&mut self, root: &'a BinaryNode, prefix: &[&str]) {
        let mut subtree_roots: Vec<(String, &BinaryNode)> = Vec::new();
        if prefix.is_empty() {
            subtree_roots.push((root.name.clone(), root));
        } else {
            collect_prefix_matches(root, prefix, 0, root.name.clone(), &mut subtree_roots);
        }

        for (path, subtree) in subtree_roots {
            let mut queue: VecDeque<(String, &BinaryNode)> = VecDeque::new();
            queue.push_back((path, subtree));
            while let Some((path, node)) = queue.pop_front() {
                if node.is_leaf() && !self.record_leaf(path.clone(), node) {
                    continue;
                }
                if self.state == SearchState::Finalizing {
                    return;
                }
                for child in &node.children {
                    queue.push_back((format!("{}.{}", path, child.name), child));
                }
            }
        }
    }

    /// Record a match unless the policy filters exclude it. Returns whether
    /// the path itself matched (pre-filter), which is what speculation
    /// frames care about.
    fn record(&mut self, path: String, node: &'a BinaryNode) -> bool {
        if self.options.leaf_nodes_only && !node.is_leaf() {
            return true;
        }
        if self.is_no_scoped(&path) {
            return true;
        }
        self.push_match(path, node);
        true
    }

    fn record_leaf(&mut self, path: String, node: &'a BinaryNode) -> bool {
        if self.is_no_scoped(&path) {
            return false;
        }
        self.push_match(path, node);
        true
    }

    fn push_match(&mut self, path: String, node: &'a BinaryNode) {
        self.matches.push((path, node));
        if self.options.max_results > 0 && self.matches.len() >= self.options.max_results {
            self.state = SearchState::Finalizing;
        }
    }

    fn is_no_scoped(&self, path: &str) -> bool {
        self.options.no_scope.iter().any(|scope| {
            path == scope
                || (path.starts_with(scope.as_str())
                    && path.as_bytes().get(scope.len()) == Some(&b'.'))
        })
    }
}

/// Match `prefix` (wildcards allowed) without recording, collecting the
/// nodes the trailing enumeration will run under.
fn collect_prefix_matches<'a>(
    node: &'a BinaryNode,
    prefix: &[&str],
    index: usize,
    path: String,
    out: &mut Vec<(String, &'a BinaryNode)>,
) {
    let segment = prefix[index];
    if segment != "*" && segment != node.name {
        return;
    }
    if index + 1 == prefix.len() {
        out.push((path, node));
        return;
    }
    for child in &node.children {
        let child_path = format!("{}.{}", path, child.name);
        collect_prefix_matches(child, prefix, index + 1, child_path, out);
    }
}

// ============================================================================
// Access-validation combining
// ============================================================================

/// The five access-validation states, in lattice order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidateLevel {
    #[default]
    None,
    WriteOnly,
    ReadWrite,
    WriteOnlyConsent,
    ReadWriteConsent,
}

/// Combination matrix: `read-write` dominates `write-only`, and `consent`
/// is preserved once seen. Indexed by the enum discriminants in order none,
/// write-only, read-write, write-only+consent, read-write+consent.
const VALIDATE_COMBINE: [[u8; 5]; 5] = [
    [0, 1, 2, 3, 4],
    [1, 1, 2, 3, 4],
    [2, 2, 2, 4, 4],
    [3, 3, 4, 3, 4],
    [4, 4, 4, 4, 4],
];

impl ValidateLevel {
    pub fn parse(s: &str) -> Self {
        match s {
            "write-only" => Self::WriteOnly,
            "read-write" => Self::ReadWrite,
            "write-only+consent" => Self::WriteOnlyConsent,
            "read-write+consent" => Self::ReadWriteConsent,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::WriteOnly => "write-only",
            Self::ReadWrite => "read-write",
            Self::WriteOnlyConsent => "write-only+consent",
            Self::ReadWriteConsent => "read-write+consent",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::None => 0,
            Self::WriteOnly => 1,
            Self::ReadWrite => 2,
            Self::WriteOnlyConsent => 3,
            Self::ReadWriteConsent => 4,
        }
    }

    fn from_index(index: u8) -> Self {
        match index {
            1 => Self::WriteOnly,
            2 => Self::ReadWrite,
            3 => Self::WriteOnlyConsent,
            4 => Self::ReadWriteConsent,
            _ => Self::None,
        }
    }

    /// Idempotent, commutative lattice join
    pub fn combine(self, other: Self) -> Self {
        Self::from_index(VALIDATE_COMBINE[self.index()][other.index()])
    }
}

/// Fold the `validate` attribute of every match into its join
pub fn max_validate<'a>(matches: impl IntoIterator<Item = &'a BinaryNode>) -> ValidateLevel {
    matches
        .into_iter()
        .map(|node| ValidateLevel::parse(&node.validate))
        .fold(ValidateLevel::None, ValidateLevel::combine)
}

// ============================================================================
// Bulk enumerations
// ============================================================================

#[derive(Serialize)]
struct LeafPaths {
    leafpaths: Vec<String>,
}

#[derive(Serialize)]
struct LeafUuid {
    path: String,
    uuid: String,
}

#[derive(Serialize)]
struct LeafUuids {
    leafuuids: Vec<LeafUuid>,
}

fn collect_leaves<'a>(node: &'a BinaryNode, path: String, out: &mut Vec<(String, &'a BinaryNode)>) {
    if node.is_leaf() {
        out.push((path.clone(), node));
    }
    for child in &node.children {
        collect_leaves(child, format!("{}.{}", path, child.name), out);
    }
}

/// Write `{"leafpaths": [...]}` with every leaf path in pre-order
pub fn export_leaf_paths<W: Write>(root: &BinaryNode, sink: W) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaves(root, root.name.clone(), &mut leaves);
    let doc = LeafPaths {
        leafpaths: leaves.into_iter().map(|(path, _)| path).collect(),
    };
    serde_json::to_writer(sink, &doc)
        .map_err(|e| BinaryError::io(std::io::Error::other(e)))
}

/// Write `{"leafuuids": [{"path": ..., "uuid": ...}, ...]}` in pre-order
pub fn export_leaf_uuids<W: Write>(root: &BinaryNode, sink: W) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaves(root, root.name.clone(), &mut leaves);
    let doc = LeafUuids {
        leafuuids: leaves
            .into_iter()
            .map(|(path, node)| LeafUuid {
                path,
                uuid: node.uuid.clone(),
            })
            .collect(),
    };
    serde_json::to_writer(sink, &doc)
        .map_err(|e| BinaryError::io(std::io::Error::other(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, validate: &str) -> BinaryNode {
        BinaryNode {
            name: name.to_string(),
            node_type: "sensor".to_string(),
            uuid: format!("{:08x}", name.len()),
            validate: validate.to_string(),
            ..BinaryNode::default()
        }
    }

    fn branch(name: &str, children: Vec<BinaryNode>) -> BinaryNode {
        BinaryNode {
            name: name.to_string(),
            node_type: "branch".to_string(),
            children,
            ..BinaryNode::default()
        }
    }

    /// A.B.X.S, A.B.Y.S, A.C.S
    fn sample_tree() -> BinaryNode {
        branch(
            "A",
            vec![
                branch(
                    "B",
                    vec![
                        branch("X", vec![leaf("S", "write-only")]),
                        branch("Y", vec![leaf("S", "read-write")]),
                    ],
                ),
                branch("C", vec![leaf("S", "")]),
            ],
        )
    }

    fn paths(matches: &[(String, &BinaryNode)]) -> Vec<String> {
        matches.iter().map(|(p, _)| p.clone()).collect()
    }

    #[test]
    fn exact_path() {
        let tree = sample_tree();
        let options = SearchOptions::default();
        let matches = search(&tree, "A.C.S", &options);
        assert_eq!(paths(&matches), ["A.C.S"]);
    }

    #[test]
    fn double_wildcard_no_spurious_matches() {
        let tree = sample_tree();
        let options = SearchOptions {
            leaf_nodes_only: true,
            ..SearchOptions::default()
        };
        let matches = search(&tree, "A.*.*.S", &options);
        // A.C.S is one level short and must not appear.
        assert_eq!(paths(&matches), ["A.B.X.S", "A.B.Y.S"]);
    }

    #[test]
    fn trailing_wildcard_enumerates_leaves() {
        let tree = sample_tree();
        let options = SearchOptions {
            leaf_nodes_only: true,
            ..SearchOptions::default()
        };
        let matches = search(&tree, "A.B.*", &options);
        assert_eq!(paths(&matches), ["A.B.X.S", "A.B.Y.S"]);
    }

    #[test]
    fn failed_speculation_rolls_back() {
        let tree = sample_tree();
        let options = SearchOptions::default();
        // `Z` exists nowhere; the wildcard frames must leave no residue.
        let matches = search(&tree, "A.*.Z", &options);
        assert!(matches.is_empty());
        let matches = search(&tree, "A.*.*.Z", &options);
        assert!(matches.is_empty());
    }

    #[test]
    fn max_results_stops_early() {
        let tree = sample_tree();
        let options = SearchOptions {
            leaf_nodes_only: true,
            max_results: 1,
            ..SearchOptions::default()
        };
        let mut engine = SearchEngine::new(&options);
        engine.run(&tree, "A.*.*.S");
        assert_eq!(engine.state(), SearchState::Finalizing);
        assert_eq!(paths(&engine.into_matches()), ["A.B.X.S"]);
    }

    #[test]
    fn no_scope_prunes_prefixes() {
        let tree = sample_tree();
        let options = SearchOptions {
            leaf_nodes_only: true,
            no_scope: vec!["A.B.X".to_string()],
            ..SearchOptions::default()
        };
        let matches = search(&tree, "A.*.*.S", &options);
        assert_eq!(paths(&matches), ["A.B.Y.S"]);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let tree = sample_tree();
        let options = SearchOptions::default();
        assert!(search(&tree, "", &options).is_empty());
    }

    #[test]
    fn lattice_combining() {
        use ValidateLevel::*;
        assert_eq!(WriteOnly.combine(ReadWrite), ReadWrite);
        assert_eq!(WriteOnlyConsent.combine(ReadWrite), ReadWriteConsent);
        assert_eq!(None.combine(WriteOnlyConsent), WriteOnlyConsent);
        assert_eq!(ReadWriteConsent.combine(None), ReadWriteConsent);
        // Idempotent and commutative.
        for a in [None, WriteOnly, ReadWrite, WriteOnlyConsent, ReadWriteConsent] {
            assert_eq!(a.combine(a), a);
            for b in [None, WriteOnly, ReadWrite, WriteOnlyConsent, ReadWriteConsent] {
                assert_eq!(a.combine(b), b.combine(a));
            }
        }
    }

    #[test]
    fn max_validate_over_matches() {
        let tree = sample_tree();
        let options = SearchOptions {
            leaf_nodes_only: true,
            ..SearchOptions::default()
        };
        let matches = search(&tree, "A.*.*.S", &options);
        let level = max_validate(matches.iter().map(|(_, node)| *node));
        assert_eq!(level, ValidateLevel::ReadWrite);
    }

    #[test]
    fn leaf_path_enumeration() {
        let tree = sample_tree();
        let mut sink = Vec::new();
        export_leaf_paths(&tree, &mut sink).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&sink).unwrap();
        assert_eq!(
            doc["leafpaths"],
            serde_json::json!(["A.B.X.S", "A.B.Y.S", "A.C.S"])
        );
    }

    #[test]
    fn leaf_uuid_enumeration() {
        let tree = sample_tree();
        let mut sink = Vec::new();
        export_leaf_uuids(&tree, &mut sink).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&sink).unwrap();
        assert_eq!(doc["leafuuids"][0]["path"], "A.B.X.S");
        assert!(doc["leafuuids"][0]["uuid"].is_string());
    }
}
