//! Dependency Graph
//!
//! This module implements the bidirectional index between signals and the
//! computations that read them.
//!
//! # Overview
//!
//! - Signal nodes carry a stability status and the set of computations that
//!   read them during their last run.
//! - Computation nodes carry their kind (effect or memo), stability status,
//!   the set of signals they read, their cleanups and their body.
//!
//! Both directions of an edge are kept in sync by [`DependencyGraph`]. The
//! propagation algorithm that walks the graph lives in
//! [`reactive::runtime`](crate::reactive::Runtime).
//!
//! # Design Decisions
//!
//! 1. Nodes are addressed by integer ids rather than shared pointers, so a
//!    stale link can never keep a disposed computation alive.
//!
//! 2. Subscriber and dependency sets are insertion-ordered. Notification
//!    order, and therefore effect order, is deterministic.

mod index;
mod node;

pub(crate) use index::DependencyGraph;
pub(crate) use node::{Cleanup, ComputationNode, RunFn};
pub use node::{ComputationKind, Status};
