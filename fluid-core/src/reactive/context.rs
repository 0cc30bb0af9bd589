//! Ownership Scopes and the Reactive Context
//!
//! An ownership scope owns every computation created while it is current
//! and disposes them together. Each scope also keeps the stack of
//! computations that are currently running inside it: the top of that stack
//! is the computation a signal read is attributed to.
//!
//! # Implementation
//!
//! The current scope and each scope's stack live in the thread-local
//! runtime. Entering a scope or a computation returns a guard that restores
//! the previous state when dropped, so the stacks stay balanced even if a
//! computation panics.
//!
//! Nested computations are supported: a computation created while another
//! one is running registers its own disposal as a cleanup of the running
//! one.

use indexmap::IndexSet;
use tracing::{debug, trace};

use super::runtime::Runtime;
use super::{ComputationId, ScopeId};
use crate::graph::Cleanup;

/// Per-scope bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct ScopeState {
    /// Computations currently running in this scope, innermost last.
    pub(crate) stack: Vec<ComputationId>,

    /// Every computation that ran in this scope and has not been cleaned up.
    pub(crate) registry: IndexSet<ComputationId>,
}

/// Guard that makes a scope current and restores the previous one on drop.
pub(crate) struct ScopeGuard {
    previous: Option<ScopeId>,
}

impl ScopeGuard {
    pub(crate) fn enter(scope: ScopeId) -> Self {
        let previous = Runtime::with(|rt| rt.current_scope.replace(Some(scope)));
        Self { previous }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        Runtime::try_with(|rt| rt.current_scope.set(self.previous));
    }
}

/// Guard that pushes a running computation onto its scope's stack and pops
/// it when dropped.
pub(crate) struct ReactiveContext {
    scope: ScopeId,
    computation: ComputationId,
}

impl ReactiveContext {
    /// Enter the context of `computation`, running in `scope`.
    ///
    /// While the context is active, signal reads register `computation` as a
    /// subscriber.
    pub(crate) fn enter(scope: ScopeId, computation: ComputationId) -> Self {
        Runtime::with(|rt| {
            let mut scopes = rt.scopes.borrow_mut();
            let state = scopes.entry(scope).or_default();
            state.stack.push(computation);
            state.registry.insert(computation);
        });
        Self { scope, computation }
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        Runtime::try_with(|rt| {
            if let Some(state) = rt.scopes.borrow_mut().get_mut(&self.scope) {
                let popped = state.stack.pop();

                // Catch mismatched enter/exit pairs.
                debug_assert!(
                    popped.is_none() || popped == Some(self.computation),
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.computation,
                    popped
                );
            }
        });
    }
}

/// Guard that hides the running computations of a scope and puts them back
/// on drop.
struct UntrackGuard {
    scope: ScopeId,
    saved: Vec<ComputationId>,
}

impl Drop for UntrackGuard {
    fn drop(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        Runtime::try_with(|rt| {
            if let Some(state) = rt.scopes.borrow_mut().get_mut(&self.scope) {
                state.stack = saved;
            }
        });
    }
}

/// Run `f` without tracking: signal reads inside it register no
/// dependency, and writes inside it have no issuer.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let Some(scope) = Runtime::current_scope() else {
        return f();
    };
    let saved = Runtime::with(|rt| {
        rt.scopes
            .borrow_mut()
            .get_mut(&scope)
            .map(|state| std::mem::take(&mut state.stack))
            .unwrap_or_default()
    });
    let _guard = UntrackGuard { scope, saved };
    f()
}

/// Disposes every computation owned by one ownership scope.
///
/// Obtained from [`create_root`]. Copies share the same scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disposer {
    scope: ScopeId,
}

impl Disposer {
    /// The scope this disposer releases.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Dispose every computation registered in the scope. Each one runs its
    /// cleanups exactly once and drops all of its subscriptions.
    pub fn dispose(&self) {
        let registry = Runtime::with(|rt| {
            rt.scopes
                .borrow_mut()
                .remove(&self.scope)
                .map(|state| state.registry)
                .unwrap_or_default()
        });

        debug!(scope = ?self.scope, computations = registry.len(), "disposing scope");
        for computation in registry {
            Runtime::dispose(computation);
        }
    }
}

/// Open a new ownership scope and run `f` inside it.
///
/// Every computation created (directly or transitively) while `f` runs is
/// owned by the new scope and is released by the [`Disposer`] handed to `f`.
/// The previous scope is current again once `f` returns.
pub fn create_root<R>(f: impl FnOnce(Disposer) -> R) -> R {
    let scope = ScopeId::next();
    Runtime::with(|rt| {
        rt.scopes.borrow_mut().insert(scope, ScopeState::default());
    });
    trace!(?scope, "root created");

    let _guard = ScopeGuard::enter(scope);
    f(Disposer { scope })
}

/// Register `f` to run before the current computation re-runs, or when it
/// is disposed. Outside of a computation this does nothing.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    match Runtime::current_computation() {
        Some(computation) => Runtime::add_cleanup(computation, Cleanup::Callback(Box::new(f))),
        None => trace!("on_cleanup called outside of a computation; ignored"),
    }
}
