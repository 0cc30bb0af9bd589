//! Reconciler
//!
//! Keeps a live node tree in sync with repeatedly recomputed descriptions of
//! what it should contain.
//!
//! - [`reconcile`] diffs one region of a parent's children against a new
//!   list of desired nodes and text, and applies the minimal set of moves,
//!   insertions, in-place text updates and removals.
//! - [`reconcile_property`] applies one attribute given the value applied
//!   last time, diffing style per key and binding listeners exactly once.
//!
//! Both work on [`dom::Node`](crate::dom::Node) directly; there is no
//! intermediate virtual tree.

mod children;
mod properties;

pub use children::{reconcile, reconcile_with_stats, Desired, EditStats};
pub use properties::{reconcile_property, AttrValue, StyleMap};
