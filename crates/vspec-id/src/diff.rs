//! Validation against a previously stamped tree
//!
//! Given the prior stamped vspec, every node of the current tree is located
//! in the prior one - by FQN first, then through each `fka` entry - and
//! classified: unchanged, non-breaking change (id preserved), breaking
//! change (rehashed), semantic rename (id preserved through `fka`), or newly
//! added. Prior nodes with no current counterpart are reported deleted; their
//! ids are not reused. No id ever changes silently: every difference emits a
//! diagnostic carrying both ids.

use crate::hash::IdOptions;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};
use vspec_model::Node;

/// How a node moved between the prior and current tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Deleted,
    BreakingChange,
    NonBreakingChange,
    SemanticRename,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Deleted => "deleted",
            Self::BreakingChange => "breaking-change",
            Self::NonBreakingChange => "non-breaking-change",
            Self::SemanticRename => "semantic-rename",
        }
    }
}

/// One finding of the validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdDiagnostic {
    pub kind: ChangeKind,
    pub fqn: String,
    pub old_id: Option<u32>,
    pub new_id: Option<u32>,
    pub detail: String,
}

impl fmt::Display for IdDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |id: Option<u32>| match id {
            Some(id) => format!("0x{:08X}", id),
            None => "-".to_string(),
        };
        write!(
            f,
            "{} {}: {} -> {} ({})",
            self.kind.as_str(),
            self.fqn,
            render(self.old_id),
            render(self.new_id),
            self.detail
        )
    }
}

/// The contract fields that participate in the id hash, minus the name
fn contract(node: &Node) -> (String, String, String, String, String, String) {
    let signal = node.signal();
    (
        node.kind().to_string(),
        signal
            .and_then(|s| s.datatype.as_ref())
            .map(|d| d.canonical())
            .unwrap_or_default(),
        signal
            .and_then(|s| s.unit.as_deref())
            .unwrap_or_default()
            .to_string(),
        signal
            .map(|s| {
                s.allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default(),
        signal
            .and_then(|s| s.min.as_ref())
            .map(ToString::to_string)
            .unwrap_or_default(),
        signal
            .and_then(|s| s.max.as_ref())
            .map(ToString::to_string)
            .unwrap_or_default(),
    )
}

fn cosmetic_changed(current: &Node, prior: &Node) -> bool {
    current.description != prior.description
        || current.comment != prior.comment
        || current.deprecation != prior.deprecation
}

/// Validate a freshly stamped tree against the prior stamped tree.
///
/// `current` must already be stamped (see [`crate::stamp::stamp_tree`]);
/// matched unchanged nodes get their prior id back, so the caller can write
/// the result out as the next stamped vspec. `_options` pins the run to the
/// same hashing convention as the stamping pass.
pub fn validate_against(
    current: &mut Node,
    prior: &Node,
    _options: &IdOptions,
) -> Vec<IdDiagnostic> {
    let prior_by_fqn: HashMap<String, &Node> =
        prior.preorder().map(|(fqn, _, node)| (fqn, node)).collect();

    let mut diagnostics = Vec::new();
    let mut matched: Vec<String> = Vec::new();
    let current_fqn = current.name.to_string();
    visit(
        current,
        &current_fqn,
        &prior_by_fqn,
        &mut matched,
        &mut diagnostics,
    );

    // Anything in the prior tree we never matched is gone.
    for (fqn, _, node) in prior.preorder() {
        if !matched.contains(&fqn) {
            diagnostics.push(IdDiagnostic {
                kind: ChangeKind::Deleted,
                fqn: fqn.clone(),
                old_id: node.static_uid,
                new_id: None,
                detail: "node no longer exists; its id is not reused".to_string(),
            });
        }
    }
    diagnostics
}

fn visit(
    node: &mut Node,
    fqn: &str,
    prior_by_fqn: &HashMap<String, &Node>,
    matched: &mut Vec<String>,
    diagnostics: &mut Vec<IdDiagnostic>,
) {
    let found = prior_by_fqn
        .get(fqn)
        .map(|prior| (fqn.to_string(), *prior, false))
        .or_else(|| {
            node.fka.iter().find_map(|former| {
                prior_by_fqn
                    .get(former)
                    .map(|prior| (former.clone(), *prior, true))
            })
        });

    match found {
        None => {
            info!(%fqn, "new node");
            diagnostics.push(IdDiagnostic {
                kind: ChangeKind::Added,
                fqn: fqn.to_string(),
                old_id: None,
                new_id: node.static_uid,
                detail: "not present in the prior tree".to_string(),
            });
        }
        Some((prior_fqn, prior, via_fka)) => {
            matched.push(prior_fqn.clone());
            if contract(node) != contract(prior) {
                warn!(%fqn, "breaking change, id rehashed");
                diagnostics.push(IdDiagnostic {
                    kind: ChangeKind::BreakingChange,
                    fqn: fqn.to_string(),
                    old_id: prior.static_uid,
                    new_id: node.static_uid,
                    detail: "contract changed; id was rehashed".to_string(),
                });
            } else {
                // Same contract: the prior id stands.
                node.static_uid = prior.static_uid;
                if via_fka {
                    info!(%fqn, former = %prior_fqn, "semantic rename");
                    diagnostics.push(IdDiagnostic {
                        kind: ChangeKind::SemanticRename,
                        fqn: fqn.to_string(),
                        old_id: prior.static_uid,
                        new_id: prior.static_uid,
                        detail: format!("renamed from {}", prior_fqn),
                    });
                } else if cosmetic_changed(node, prior) {
                    diagnostics.push(IdDiagnostic {
                        kind: ChangeKind::NonBreakingChange,
                        fqn: fqn.to_string(),
                        old_id: prior.static_uid,
                        new_id: prior.static_uid,
                        detail: "only non-hashed attributes changed".to_string(),
                    });
                }
            }
        }
    }

    for index in 0..node.children.len() {
        let child_fqn = format!("{}.{}", fqn, node.children[index].name);
        visit(
            &mut node.children[index],
            &child_fqn,
            prior_by_fqn,
            matched,
            diagnostics,
        );
    }
}
