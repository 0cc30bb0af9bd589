//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the dependency graph, the ownership scopes and the
//! current transaction, and implements glitch-free propagation.
//!
//! # How It Works
//!
//! 1. A write marks its signal stale. Every subscriber goes stale and, in
//!    turn, marks every *other* signal it reads as stale. This seeds the
//!    closure of signals that might change in this transaction.
//!
//! 2. The written signal becomes stable again right after the value is
//!    stored, telling subscribers whether the value changed.
//!
//! 3. A computation becomes runnable only once all of its dependencies are
//!    stable and at least one of them changed. Memos re-run on the spot;
//!    effects are queued on the transaction.
//!
//! 4. The transaction drains its queue, then force-stabilizes every signal
//!    that was marked stale but never written. That may release more
//!    computations, so the drain repeats until nothing is left.
//!
//! # Thread Safety
//!
//! There is none to speak of: the runtime is thread-local and every handle
//! is `!Send`. Borrows of runtime state are never held while user code
//! runs, so computations may freely read, write and create reactive values.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{error, trace};

use super::context::{ReactiveContext, ScopeGuard, ScopeState};
use super::transaction::Transaction;
use super::{ComputationId, ScopeId, SignalId};
use crate::config::RuntimeConfig;
use crate::error::{ConfigError, ReactiveError, Result};
use crate::graph::{Cleanup, ComputationKind, ComputationNode, DependencyGraph, RunFn, Status};

thread_local! {
    static RUNTIME: RuntimeState = RuntimeState::new();
}

/// Per-thread state behind [`Runtime`].
pub(crate) struct RuntimeState {
    pub(crate) graph: RefCell<DependencyGraph>,
    pub(crate) scopes: RefCell<HashMap<ScopeId, ScopeState>>,
    pub(crate) current_scope: Cell<Option<ScopeId>>,
    pub(crate) transaction: RefCell<Option<Transaction>>,
    pub(crate) config: RefCell<RuntimeConfig>,
}

impl RuntimeState {
    fn new() -> Self {
        Self {
            graph: RefCell::new(DependencyGraph::new()),
            scopes: RefCell::new(HashMap::new()),
            current_scope: Cell::new(None),
            transaction: RefCell::new(None),
            config: RefCell::new(RuntimeConfig::default()),
        }
    }
}

/// The per-thread reactive runtime.
///
/// All reactive values created on a thread share one runtime. This type
/// only exposes associated functions.
#[derive(Debug)]
pub struct Runtime;

impl Runtime {
    pub(crate) fn with<R>(f: impl FnOnce(&RuntimeState) -> R) -> R {
        RUNTIME.with(f)
    }

    /// Like [`Runtime::with`], but a no-op while the thread is shutting down.
    pub(crate) fn try_with(f: impl FnOnce(&RuntimeState)) {
        let _ = RUNTIME.try_with(f);
    }

    /// Install a configuration for this thread.
    pub fn configure(config: RuntimeConfig) -> std::result::Result<(), ConfigError> {
        config.validate()?;
        Self::with(|rt| *rt.config.borrow_mut() = config);
        Ok(())
    }

    /// The configuration in effect on this thread.
    pub fn config() -> RuntimeConfig {
        Self::with(|rt| rt.config.borrow().clone())
    }

    /// The ownership scope new computations are created in, if any.
    pub fn current_scope() -> Option<ScopeId> {
        Self::with(|rt| rt.current_scope.get())
    }

    /// The computation currently running in the current scope, if any.
    pub fn current_computation() -> Option<ComputationId> {
        Self::with(|rt| {
            let scope = rt.current_scope.get()?;
            rt.scopes
                .borrow()
                .get(&scope)
                .and_then(|state| state.stack.last().copied())
        })
    }

    /// Whether a transaction is open on this thread.
    pub fn in_transaction() -> bool {
        Self::with(|rt| rt.transaction.borrow().is_some())
    }

    /// Whether `id` names a live (not disposed) computation.
    pub fn is_alive(id: ComputationId) -> bool {
        Self::with(|rt| rt.graph.borrow().contains_computation(id))
    }

    /// How many times the computation has run, or `None` once disposed.
    pub fn run_count(id: ComputationId) -> Option<usize> {
        Self::with(|rt| rt.graph.borrow().computation(id).map(|node| node.run_count))
    }

    /// Number of signals the computation read during its last run.
    pub fn dependency_count(id: ComputationId) -> usize {
        Self::with(|rt| {
            rt.graph
                .borrow()
                .computation(id)
                .map_or(0, |node| node.dependencies.len())
        })
    }

    /// Number of live computations on this thread.
    pub fn computation_count() -> usize {
        Self::with(|rt| rt.graph.borrow().computation_count())
    }

    /// Number of live signals on this thread.
    pub fn signal_count() -> usize {
        Self::with(|rt| rt.graph.borrow().signal_count())
    }

    // ------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------

    pub(crate) fn register_signal(id: SignalId) {
        Self::with(|rt| rt.graph.borrow_mut().add_signal(id));
    }

    /// Forget a dropped signal and every edge to it.
    pub(crate) fn release_signal(id: SignalId) {
        Self::try_with(|rt| {
            if let Ok(mut graph) = rt.graph.try_borrow_mut() {
                graph.remove_signal(id);
            }
            if let Ok(mut transaction) = rt.transaction.try_borrow_mut() {
                if let Some(transaction) = transaction.as_mut() {
                    transaction.unregister_signal(id);
                }
            }
        });
    }

    pub(crate) fn subscriber_count(id: SignalId) -> usize {
        Self::with(|rt| {
            rt.graph
                .borrow()
                .signal(id)
                .map_or(0, |node| node.subscribers.len())
        })
    }

    /// Record a read of `signal` by the running computation.
    pub(crate) fn track(signal: SignalId) {
        if let Some(computation) = Self::current_computation() {
            Self::with(|rt| rt.graph.borrow_mut().add_edge(signal, computation));
        }
    }

    /// Mark `signal` stale and cascade to its subscribers, skipping `issuer`.
    pub(crate) fn notify_stale(signal: SignalId, issuer: Option<ComputationId>) {
        let subscribers = Self::with(|rt| {
            let mut graph = rt.graph.borrow_mut();
            let node = graph.signal_mut(signal)?;
            if node.status == Status::Stale {
                return None;
            }
            node.status = Status::Stale;
            let subscribers = graph.subscribers(signal, issuer);
            drop(graph);

            if let Some(transaction) = rt.transaction.borrow_mut().as_mut() {
                transaction.register_signal(signal);
            }
            Some(subscribers)
        });

        trace!(?signal, "stale");
        for computation in subscribers.into_iter().flatten() {
            Self::mark_stale(computation, signal);
        }
    }

    /// Mark `signal` stable again and let subscribers know whether it changed.
    pub(crate) fn notify_stable(signal: SignalId, changed: bool, issuer: Option<ComputationId>) {
        let subscribers = Self::with(|rt| {
            let mut graph = rt.graph.borrow_mut();
            let node = graph.signal_mut(signal)?;
            if node.status == Status::Stable {
                return None;
            }
            node.status = Status::Stable;
            let subscribers = graph.subscribers(signal, issuer);
            drop(graph);

            if let Some(transaction) = rt.transaction.borrow_mut().as_mut() {
                transaction.unregister_signal(signal);
            }
            Some(subscribers)
        });

        trace!(?signal, changed, "stable");
        for computation in subscribers.into_iter().flatten() {
            Self::mark_stable(computation, changed);
        }
    }

    // ------------------------------------------------------------------
    // Computations
    // ------------------------------------------------------------------

    /// Create a computation in the current scope and run it once.
    pub(crate) fn create_computation(kind: ComputationKind, run: RunFn) -> Result<ComputationId> {
        let scope = Self::current_scope().ok_or(ReactiveError::NoActiveScope)?;
        let parent = Self::current_computation();
        let id = ComputationId::next();

        Self::with(|rt| {
            rt.graph
                .borrow_mut()
                .add_computation(id, ComputationNode::new(kind, scope, run));
        });
        if let Some(parent) = parent {
            Self::add_cleanup(parent, Cleanup::Dispose(id));
        }

        trace!(?id, ?kind, ?scope, ?parent, "computation created");
        Self::execute(id);
        Ok(id)
    }

    pub(crate) fn add_cleanup(computation: ComputationId, cleanup: Cleanup) {
        Self::with(|rt| {
            if let Some(node) = rt.graph.borrow_mut().computation_mut(computation) {
                node.cleanups.push(cleanup);
            }
        });
    }

    fn mark_stale(computation: ComputationId, source: SignalId) {
        let (others, output) = Self::with(|rt| {
            let mut graph = rt.graph.borrow_mut();
            let Some(node) = graph.computation_mut(computation) else {
                return (Vec::new(), None);
            };
            node.status = Status::Stale;
            let others: Vec<SignalId> = node
                .dependencies
                .iter()
                .copied()
                .filter(|dependency| *dependency != source)
                .collect();
            (others, node.output)
        });

        // Readers of a memo must wait for it as well.
        if let Some(output) = output {
            Self::notify_stale(output, None);
        }
        for dependency in others {
            Self::notify_stale(dependency, Some(computation));
        }
    }

    fn mark_stable(computation: ComputationId, changed: bool) {
        let release = Self::with(|rt| {
            let mut graph = rt.graph.borrow_mut();
            {
                let node = graph.computation_mut(computation)?;
                if changed {
                    node.should_compute = true;
                }
                if node.status == Status::Stable {
                    return None;
                }
            }
            if !graph.dependencies_stable(computation) {
                return None;
            }
            let node = graph.computation_mut(computation)?;
            node.status = Status::Stable;
            Some(if node.should_compute {
                Release::Run(node.kind)
            } else {
                Release::Settle(node.output)
            })
        });

        match release {
            Some(Release::Run(ComputationKind::Memo)) => {
                Self::execute(computation);
                // An equal result is not written; readers still need to hear
                // that the memo settled.
                if let Some(output) = Self::output(computation) {
                    Self::notify_stable(output, false, None);
                }
            }
            Some(Release::Run(ComputationKind::Effect)) => {
                let queued = Self::with(|rt| {
                    rt.transaction
                        .borrow_mut()
                        .as_mut()
                        .map(|transaction| transaction.schedule_effect(computation))
                        .is_some()
                });
                if !queued {
                    Self::execute(computation);
                }
            }
            Some(Release::Settle(Some(output))) => Self::notify_stable(output, false, None),
            Some(Release::Settle(None)) | None => {}
        }
    }

    /// Record that the memo `computation` writes its result into `output`.
    pub(crate) fn bind_output(computation: ComputationId, output: SignalId) {
        Self::with(|rt| {
            let mut graph = rt.graph.borrow_mut();
            if let Some(node) = graph.computation_mut(computation) {
                node.output = Some(output);
            }
            if let Some(node) = graph.signal_mut(output) {
                node.owner = Some(computation);
            }
        });
    }

    /// Whether `signal` is the output of a memo that has not settled yet.
    pub(crate) fn awaits_owner(signal: SignalId) -> bool {
        Self::with(|rt| {
            let graph = rt.graph.borrow();
            graph
                .signal(signal)
                .and_then(|node| node.owner)
                .and_then(|owner| graph.computation(owner))
                .is_some_and(|owner| owner.status == Status::Stale)
        })
    }

    fn output(computation: ComputationId) -> Option<SignalId> {
        Self::with(|rt| rt.graph.borrow().computation(computation)?.output)
    }

    /// Whether the computation is waiting for one of its dependencies.
    pub(crate) fn is_stale(computation: ComputationId) -> bool {
        Self::with(|rt| {
            rt.graph
                .borrow()
                .computation(computation)
                .is_some_and(|node| node.status == Status::Stale)
        })
    }

    /// Forget a pending run that will not happen.
    pub(crate) fn discard_run(computation: ComputationId) {
        Self::with(|rt| {
            if let Some(node) = rt.graph.borrow_mut().computation_mut(computation) {
                node.should_compute = false;
                node.status = Status::Stable;
            }
        });
    }

    /// Re-run a computation: clean up the previous run, then run the body
    /// inside the owning scope with dependency tracking enabled.
    ///
    /// If the computation is released again while its body runs, it runs
    /// once more right after, up to `max_effect_runs` times in a row.
    pub(crate) fn execute(id: ComputationId) {
        let max_runs = Self::with(|rt| rt.config.borrow().max_effect_runs);
        let mut runs = 0usize;

        while Self::run_once(id) {
            runs += 1;
            let again = Self::with(|rt| {
                rt.graph
                    .borrow_mut()
                    .computation_mut(id)
                    .is_some_and(|node| std::mem::take(&mut node.rerun))
            });
            if !again {
                return;
            }
            if runs >= max_runs {
                error!(?id, max_runs, "computation keeps invalidating itself; giving up");
                return;
            }
            trace!(?id, "released during its own run; running again");
        }
    }

    /// One run of the computation. Returns `false` if it did not run.
    fn run_once(id: ComputationId) -> bool {
        let Some((scope, run)) = Self::with(|rt| {
            rt.graph
                .borrow()
                .computation(id)
                .map(|node| (node.scope, Rc::clone(&node.run)))
        }) else {
            return false;
        };

        // Released while its body is still on the stack: the outer
        // `execute` picks the flag up once the body returns.
        if run.try_borrow_mut().is_err() {
            trace!(?id, "computation re-entered while running; deferred");
            Self::with(|rt| {
                if let Some(node) = rt.graph.borrow_mut().computation_mut(id) {
                    node.rerun = true;
                }
            });
            return false;
        }

        let _scope = ScopeGuard::enter(scope);
        Self::cleanup(id, false);
        if !Self::is_alive(id) {
            return false;
        }

        trace!(?id, "run");
        {
            let _context = ReactiveContext::enter(scope, id);
            if let Ok(mut body) = run.try_borrow_mut() {
                (&mut *body)();
            }
        }

        Self::with(|rt| {
            if let Some(node) = rt.graph.borrow_mut().computation_mut(id) {
                node.should_compute = false;
                node.run_count += 1;
            }
        });
        true
    }

    /// Run the cleanups of the last execution and release every dependency.
    /// Disposal cleanups only run when `disposing`.
    pub(crate) fn cleanup(id: ComputationId, disposing: bool) {
        let Some((scope, cleanups)) = Self::with(|rt| {
            rt.graph
                .borrow_mut()
                .computation_mut(id)
                .map(|node| (node.scope, std::mem::take(&mut node.cleanups)))
        }) else {
            return;
        };

        let mut kept = Vec::new();
        for cleanup in cleanups {
            match cleanup {
                Cleanup::Callback(callback) => callback(),
                Cleanup::Dispose(child) => Self::dispose(child),
                Cleanup::OnDispose(callback) if disposing => callback(),
                Cleanup::OnDispose(callback) => kept.push(Cleanup::OnDispose(callback)),
            }
        }

        Self::with(|rt| {
            let mut graph = rt.graph.borrow_mut();
            if let Some(node) = graph.computation_mut(id) {
                node.cleanups.extend(kept);
            }
            graph.release_dependencies(id);
            drop(graph);
            if let Some(state) = rt.scopes.borrow_mut().get_mut(&scope) {
                state.registry.shift_remove(&id);
            }
        });
    }

    /// Clean up a computation and remove it from the graph for good.
    pub(crate) fn dispose(id: ComputationId) {
        if !Self::is_alive(id) {
            return;
        }
        Self::cleanup(id, true);

        let node = Self::with(|rt| rt.graph.borrow_mut().remove_computation(id));
        if node.is_some() {
            trace!(?id, "disposed");
        }
        // Dropping the body may drop signals, which touch the graph again.
        drop(node);
    }
}

/// What a computation does once all of its dependencies are stable.
enum Release {
    Run(ComputationKind),
    /// Nothing changed. A memo still reports its output as settled.
    Settle(Option<SignalId>),
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::reactive::{batch, create_effect, create_root, create_signal, on_cleanup};

    #[test]
    fn computation_outside_scope_is_rejected() {
        let run: RunFn = Rc::new(RefCell::new(|| {}));
        let err = Runtime::create_computation(ComputationKind::Effect, run).unwrap_err();
        assert_eq!(err, ReactiveError::NoActiveScope);
    }

    #[test]
    fn reads_register_both_sides_of_the_link() {
        create_root(|dispose| {
            let (count, _set_count) = create_signal(0);
            let reader = count.clone();
            let effect = create_effect(move |_| {
                reader.get();
            });

            assert_eq!(Runtime::dependency_count(effect.id()), 1);
            assert_eq!(count.subscriber_count(), 1);

            dispose.dispose();

            assert_eq!(Runtime::dependency_count(effect.id()), 0);
            assert_eq!(count.subscriber_count(), 0);
        });
    }

    #[test]
    fn cleanups_run_before_each_rerun() {
        create_root(|dispose| {
            let log = Rc::new(RefCell::new(Vec::new()));
            let (count, set_count) = create_signal(0);

            let log_clone = log.clone();
            create_effect(move |_| {
                let value = count.get();
                log_clone.borrow_mut().push(format!("run {value}"));
                let log = log_clone.clone();
                on_cleanup(move || log.borrow_mut().push(format!("cleanup {value}")));
            });

            set_count.set(1);

            assert_eq!(*log.borrow(), vec!["run 0", "cleanup 0", "run 1"]);
            dispose.dispose();
        });
    }

    #[test]
    fn transaction_closes_after_outermost_write() {
        create_root(|dispose| {
            let (count, set_count) = create_signal(0);
            let seen_in_transaction = Rc::new(RefCell::new(Vec::new()));

            let seen = seen_in_transaction.clone();
            create_effect(move |_| {
                count.get();
                seen.borrow_mut().push(Runtime::in_transaction());
            });

            assert!(!Runtime::in_transaction());
            batch(|| {
                set_count.set(5);
                assert!(Runtime::in_transaction());
            });
            assert!(!Runtime::in_transaction());

            // Initial run happened outside, the re-run inside the drain.
            assert_eq!(*seen_in_transaction.borrow(), vec![false, true]);
            dispose.dispose();
        });
    }

    #[test]
    fn configure_rejects_invalid_config() {
        let config = RuntimeConfig {
            max_effect_runs: 0,
            ..RuntimeConfig::default()
        };
        assert!(Runtime::configure(config).is_err());
        assert_eq!(Runtime::config(), RuntimeConfig::default());
    }
}
