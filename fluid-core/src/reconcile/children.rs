//! Children reconciliation.
//!
//! Brings one region of a parent's children from the previously rendered
//! node list to a newly desired one with as few structural edits as it can.
//!
//! # How It Works
//!
//! 1. Match every desired item to a previous node. Elements match by
//!    identity. Text matches a previous text node with the same content,
//!    preferring the node in the same slot.
//!
//! 2. Desired text that found no match reuses the previous text node in its
//!    slot and rewrites its content, unless the previous list mixed text and
//!    elements. Anything still unmatched is created.
//!
//! 3. Previous nodes nobody matched are detached.
//!
//! 4. Walk the result with a cursor that starts at the region's first
//!    surviving node (or the anchor). A node already at the cursor advances
//!    it; any other node is inserted before the cursor.

use tracing::debug;

use crate::dom::Node;

/// One desired child of a region.
#[derive(Debug, Clone, PartialEq)]
pub enum Desired {
    /// An existing node, matched by identity.
    Node(Node),
    /// Text content, matched by value.
    Text(String),
}

impl From<Node> for Desired {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for Desired {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Desired {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Counts of the edits one reconciliation applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditStats {
    pub created: usize,
    pub moved: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Reconcile the region of `parent` holding `previous` against `next`.
///
/// `anchor` is the first node after the region, or `None` if the region
/// ends the parent. Returns the region's new nodes and its first node, which
/// callers use as the anchor of the region before it.
pub fn reconcile(
    parent: &Node,
    previous: &[Node],
    next: Vec<Desired>,
    anchor: Option<&Node>,
) -> (Vec<Node>, Option<Node>) {
    let (nodes, stats) = reconcile_with_stats(parent, previous, next, anchor);
    let first = nodes.first().cloned();
    debug!(
        parent = ?parent.id(),
        created = stats.created,
        moved = stats.moved,
        updated = stats.updated,
        removed = stats.removed,
        "children reconciled"
    );
    (nodes, first)
}

/// Like [`reconcile`], but returns the edit counts instead of the first
/// node.
pub fn reconcile_with_stats(
    parent: &Node,
    previous: &[Node],
    next: Vec<Desired>,
    anchor: Option<&Node>,
) -> (Vec<Node>, EditStats) {
    debug_assert!(
        previous
            .iter()
            .all(|node| node.parent().as_ref() == Some(parent)),
        "previous nodes must be children of the parent"
    );

    let mut stats = EditStats::default();
    let mut used = vec![false; previous.len()];
    let mut slots: Vec<Option<Node>> = vec![None; next.len()];

    // Exact matches: elements by identity, text by content.
    for (index, desired) in next.iter().enumerate() {
        let found = match desired {
            Desired::Node(node) => previous
                .iter()
                .enumerate()
                .position(|(at, candidate)| !used[at] && candidate == node),
            Desired::Text(text) => {
                let same_slot = previous.get(index).filter(|candidate| {
                    !used[index] && candidate.is_text() && candidate.text_content() == *text
                });
                match same_slot {
                    Some(_) => Some(index),
                    None => previous.iter().enumerate().position(|(at, candidate)| {
                        !used[at] && candidate.is_text() && candidate.text_content() == *text
                    }),
                }
            }
        };
        if let Some(at) = found {
            used[at] = true;
            slots[index] = Some(previous[at].clone());
        }
    }

    // Rewrite text in place, or create what is still missing.
    let mixed = previous.iter().any(Node::is_text) && previous.iter().any(Node::is_element);
    let mut nodes = Vec::with_capacity(next.len());
    for (index, (desired, slot)) in next.into_iter().zip(slots).enumerate() {
        if let Some(node) = slot {
            nodes.push(node);
            continue;
        }
        let node = match desired {
            Desired::Node(node) => {
                stats.created += 1;
                node
            }
            Desired::Text(text) => {
                let reusable = !mixed
                    && previous
                        .get(index)
                        .is_some_and(|candidate| !used[index] && candidate.is_text());
                if reusable {
                    used[index] = true;
                    let node = previous[index].clone();
                    node.set_text(&text);
                    stats.updated += 1;
                    node
                } else {
                    stats.created += 1;
                    Node::text(text)
                }
            }
        };
        nodes.push(node);
    }

    // Detach what nobody matched before placing, so the cursor never lands
    // on a doomed node.
    for (node, _) in previous.iter().zip(&used).filter(|(_, used)| !**used) {
        if parent.remove_child(node) {
            stats.removed += 1;
        }
    }

    let mut cursor = previous
        .iter()
        .zip(&used)
        .find(|(_, used)| **used)
        .map(|(node, _)| node.clone())
        .or_else(|| anchor.cloned());

    for node in &nodes {
        if cursor.as_ref() == Some(node) {
            cursor = node.next_sibling();
            continue;
        }
        let attached = node.parent().as_ref() == Some(parent);
        parent.insert_before(node, cursor.as_ref());
        if attached {
            stats.moved += 1;
        }
    }

    (nodes, stats)
}
