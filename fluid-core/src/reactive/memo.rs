//! Memo Implementation
//!
//! A Memo is a cached derived value. It is a computation that writes its
//! result into an internal signal, so readers subscribe to the memo exactly
//! as they would to a signal.
//!
//! # How Memos Work
//!
//! 1. On creation, the memo runs its function once and stores the result.
//!
//! 2. When a dependency changes, the memo re-runs eagerly as soon as all of
//!    its dependencies are stable, before any queued effect.
//!
//! 3. The new result is written untracked, so the memo never subscribes to
//!    its own output. An equal result is not written at all: readers that
//!    only depend on the memo do not re-run.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::context::untrack;
use super::runtime::Runtime;
use super::signal::Signal;
use super::ComputationId;
use crate::error::{ReactiveError, Result};
use crate::graph::{ComputationKind, RunFn};

/// A cached derived value that recomputes only when dependencies change.
///
/// The `PartialEq` bound is needed to detect when the computed value
/// actually changed.
pub struct Memo<T> {
    output: Signal<T>,
    computation: ComputationId,
}

impl<T: 'static> Memo<T> {
    pub fn id(&self) -> ComputationId {
        self.computation
    }

    /// Borrow the cached value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.output.with(f)
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        Runtime::dispose(self.computation);
    }

    pub fn is_disposed(&self) -> bool {
        !Runtime::is_alive(self.computation)
    }

    /// Number of computations reading this memo.
    pub fn subscriber_count(&self) -> usize {
        self.output.subscriber_count()
    }
}

impl<T: Clone + 'static> Memo<T> {
    /// Get the cached value, tracking the read.
    pub fn get(&self) -> T {
        self.output.get()
    }

    pub fn get_untracked(&self) -> T {
        self.output.get_untracked()
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            output: self.output.clone(),
            computation: self.computation,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.computation)
            .field("value", &self.output)
            .finish()
    }
}

/// Create a memo in the current ownership scope.
///
/// Fails with [`ReactiveError::NoActiveScope`] outside of [`create_root`](super::create_root).
pub fn try_create_memo<T: PartialEq + 'static>(
    mut f: impl FnMut() -> T + 'static,
) -> Result<Memo<T>> {
    let cell: Rc<OnceCell<Signal<T>>> = Rc::new(OnceCell::new());
    let output = Rc::clone(&cell);

    let run: RunFn = Rc::new(RefCell::new(move || {
        let value = f();
        match output.get() {
            Some(signal) => untrack(|| signal.set(value)),
            None => {
                let _ = output.set(Signal::new(value));
            }
        }
    }));

    let computation = Runtime::create_computation(ComputationKind::Memo, run)?;
    let output = cell.get().cloned().ok_or(ReactiveError::MemoUninitialized)?;
    Runtime::bind_output(computation, output.id());
    Ok(Memo {
        output,
        computation,
    })
}

/// Create a memo in the current ownership scope.
///
/// # Panics
///
/// Panics when called outside of an ownership scope.
pub fn create_memo<T: PartialEq + 'static>(f: impl FnMut() -> T + 'static) -> Memo<T> {
    try_create_memo(f).unwrap_or_else(|err| panic!("create_memo: {err}"))
}
