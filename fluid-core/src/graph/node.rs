//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use smallvec::SmallVec;

use crate::reactive::{ComputationId, ScopeId, SignalId};

/// Stability of a signal or computation within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Settled: the value (or last run) reflects every input.
    Stable,

    /// An input may be about to change. Readers must wait.
    Stale,
}

/// Whether a computation re-runs immediately or through the transaction
/// queue when it becomes runnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationKind {
    /// Side effect. Queued on the transaction and run in FIFO order.
    Effect,

    /// Derived value. Re-runs synchronously, because other computations in
    /// the same sweep may need its output.
    Memo,
}

/// A callback registered against a computation, run before its next
/// execution or on disposal.
pub(crate) enum Cleanup {
    /// User callback (`on_cleanup`, listener removal, ...).
    Callback(Box<dyn FnOnce()>),

    /// Dispose a computation that was created while this one was running.
    Dispose(ComputationId),

    /// User callback that survives re-runs and fires only on disposal.
    OnDispose(Box<dyn FnOnce()>),
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Dispose(id) => f.debug_tuple("Dispose").field(id).finish(),
            Self::OnDispose(_) => f.write_str("OnDispose(..)"),
        }
    }
}

/// Type-erased body of a computation. The previous result lives inside the
/// closure.
pub(crate) type RunFn = Rc<RefCell<dyn FnMut()>>;

/// Graph-side state of a signal. The value itself lives in the signal handle.
#[derive(Debug)]
pub(crate) struct SignalNode {
    pub(crate) status: Status,

    /// Computations that read this signal during their last run, in
    /// subscription order.
    pub(crate) subscribers: IndexSet<ComputationId>,

    /// The memo that writes this signal, if any.
    pub(crate) owner: Option<ComputationId>,
}

impl SignalNode {
    pub(crate) fn new() -> Self {
        Self {
            status: Status::Stable,
            subscribers: IndexSet::new(),
            owner: None,
        }
    }
}

/// Graph-side state of an effect or memo.
pub(crate) struct ComputationNode {
    pub(crate) kind: ComputationKind,
    pub(crate) status: Status,

    /// Set when a dependency reports a real change; cleared after each run.
    pub(crate) should_compute: bool,

    /// Set when the computation was released while its body was running.
    pub(crate) rerun: bool,

    /// Signal a memo writes its result into.
    pub(crate) output: Option<SignalId>,

    /// Scope the computation was created in and re-enters on every run.
    pub(crate) scope: ScopeId,

    /// Signals read during the last run. Rebuilt from scratch every run.
    pub(crate) dependencies: IndexSet<SignalId>,

    pub(crate) cleanups: SmallVec<[Cleanup; 2]>,
    pub(crate) run: RunFn,
    pub(crate) run_count: usize,
}

impl ComputationNode {
    pub(crate) fn new(kind: ComputationKind, scope: ScopeId, run: RunFn) -> Self {
        Self {
            kind,
            status: Status::Stable,
            should_compute: true,
            rerun: false,
            output: None,
            scope,
            dependencies: IndexSet::new(),
            cleanups: SmallVec::new(),
            run,
            run_count: 0,
        }
    }
}

impl fmt::Debug for ComputationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationNode")
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("should_compute", &self.should_compute)
            .field("rerun", &self.rerun)
            .field("output", &self.output)
            .field("scope", &self.scope)
            .field("dependencies", &self.dependencies)
            .field("cleanups", &self.cleanups.len())
            .field("run_count", &self.run_count)
            .finish()
    }
}
