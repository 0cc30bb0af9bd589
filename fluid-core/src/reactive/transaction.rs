//! Transactions
//!
//! A transaction coordinates one glitch-free propagation sweep. It is opened
//! lazily by the outermost write (or by [`batch`]), collects the effects
//! that became runnable and the signals that were marked stale, and is
//! drained and discarded before that outermost call returns.
//!
//! # Draining
//!
//! 1. Run queued effects in FIFO order. Effects may write signals, which can
//!    queue more effects; those run in the same loop.
//! 2. Every signal still marked stale was never written: it was only
//!    suspected of changing. Stabilize it as "unchanged", which may release
//!    computations that were waiting on it.
//! 3. Repeat while step 2 queued new effects.

use indexmap::IndexSet;
use tracing::{debug, error};

use super::runtime::Runtime;
use super::{ComputationId, SignalId};

/// Pending work of the open transaction.
#[derive(Debug, Default)]
pub(crate) struct Transaction {
    /// Effects waiting to run, deduplicated, in enqueue order.
    pending_effects: IndexSet<ComputationId>,

    /// Signals marked stale and not yet stable again.
    pending_signals: IndexSet<SignalId>,

    /// Effects run so far.
    effect_runs: usize,
}

impl Transaction {
    pub(crate) fn schedule_effect(&mut self, effect: ComputationId) {
        self.pending_effects.insert(effect);
    }

    pub(crate) fn register_signal(&mut self, signal: SignalId) {
        self.pending_signals.insert(signal);
    }

    pub(crate) fn unregister_signal(&mut self, signal: SignalId) {
        self.pending_signals.shift_remove(&signal);
    }

    fn next_effect(&mut self) -> Option<ComputationId> {
        self.pending_effects.shift_remove_index(0)
    }

    fn has_pending_effects(&self) -> bool {
        !self.pending_effects.is_empty()
    }
}

/// Guard owning the transaction slot. Clears it on drop, including during
/// unwinding.
struct TransactionGuard;

impl TransactionGuard {
    /// Open a transaction, or return `None` if one is already open.
    fn open() -> Option<Self> {
        Runtime::with(|rt| {
            let mut slot = rt.transaction.borrow_mut();
            if slot.is_some() {
                return None;
            }
            *slot = Some(Transaction::default());
            Some(Self)
        })
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        Runtime::try_with(|rt| {
            if let Ok(mut slot) = rt.transaction.try_borrow_mut() {
                slot.take();
            }
        });
    }
}

fn with_transaction<R>(f: impl FnOnce(&mut Transaction) -> R) -> Option<R> {
    Runtime::with(|rt| rt.transaction.borrow_mut().as_mut().map(f))
}

/// Run queued effects and settle stale signals until the transaction is
/// quiet.
fn drain() {
    let max_effect_runs = Runtime::with(|rt| rt.config.borrow().max_effect_runs);
    let mut rounds = 0usize;

    loop {
        while let Some(effect) = with_transaction(Transaction::next_effect).flatten() {
            // Went stale again after it was queued; it is queued anew once
            // its inputs settle.
            if Runtime::is_stale(effect) {
                continue;
            }
            let runs = with_transaction(|transaction| {
                transaction.effect_runs += 1;
                transaction.effect_runs
            })
            .unwrap_or(0);
            if runs > max_effect_runs {
                abandon(max_effect_runs);
                return;
            }
            Runtime::execute(effect);
        }

        settle_stale_signals();
        rounds += 1;
        if !with_transaction(|transaction| transaction.has_pending_effects()).unwrap_or(false) {
            break;
        }
    }

    let effect_runs = with_transaction(|transaction| transaction.effect_runs).unwrap_or(0);
    debug!(rounds, effect_runs, "transaction drained");
}

/// Stabilize every signal that was marked stale but never written.
///
/// Outputs of memos that are still waiting are settled last, so a memo gets
/// the chance to write its new value before readers hear "unchanged".
fn settle_stale_signals() {
    while let Some(signal) = next_settleable_signal() {
        Runtime::notify_stable(signal, false, None);
    }
}

fn next_settleable_signal() -> Option<SignalId> {
    let pending: Vec<SignalId> =
        with_transaction(|transaction| transaction.pending_signals.iter().copied().collect())?;
    let signal = pending
        .iter()
        .copied()
        .find(|signal| !Runtime::awaits_owner(*signal))
        .or_else(|| pending.first().copied())?;
    with_transaction(|transaction| transaction.unregister_signal(signal));
    Some(signal)
}

/// Drop the remaining queue but leave every signal stable, so later writes
/// propagate normally.
fn abandon(max_effect_runs: usize) {
    error!(
        max_effect_runs,
        "transaction exceeded its effect budget; abandoning remaining effects"
    );
    discard_pending_effects();
    settle_stale_signals();
    discard_pending_effects();
}

fn discard_pending_effects() {
    let discarded: Vec<ComputationId> =
        with_transaction(|transaction| transaction.pending_effects.drain(..).collect())
            .unwrap_or_default();
    for effect in discarded {
        Runtime::discard_run(effect);
    }
}

/// Coalesce every write made by `f` into one transaction.
///
/// Dependent effects run at most once, after `f` returns, against the final
/// values of all written signals. Nested calls join the outer transaction;
/// only the outermost call drains it.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let Some(guard) = TransactionGuard::open() else {
        return f();
    };
    let result = f();
    drain();
    drop(guard);
    result
}
