//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When a dependency changes, the effect is queued on the transaction and
//!    runs once every signal it reads has settled.
//!
//! 3. Before re-running, the effect runs its cleanups and clears its old
//!    dependencies, then tracks new ones during execution.
//!
//! Each run receives the value returned by the previous run (`None` the
//! first time).
//!
//! # Differences from Memo
//!
//! - Memos publish a value others can subscribe to; effects do not.
//! - Memos re-run as soon as their inputs settle; effects wait for the
//!   transaction queue.

use std::cell::RefCell;
use std::rc::Rc;

use super::runtime::Runtime;
use super::ComputationId;
use crate::error::Result;
use crate::graph::{ComputationKind, RunFn};

/// Handle to an effect. Copies refer to the same effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Effect {
    id: ComputationId,
}

impl Effect {
    pub fn id(&self) -> ComputationId {
        self.id
    }

    /// Run the cleanups one last time and stop reacting.
    pub fn dispose(&self) {
        Runtime::dispose(self.id);
    }

    pub fn is_disposed(&self) -> bool {
        !Runtime::is_alive(self.id)
    }

    /// How many times the effect has run. Zero once disposed.
    pub fn run_count(&self) -> usize {
        Runtime::run_count(self.id).unwrap_or(0)
    }

    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.id)
    }
}

/// Create an effect in the current ownership scope and run it once.
pub fn try_create_effect<T: 'static>(
    mut f: impl FnMut(Option<T>) -> T + 'static,
) -> Result<Effect> {
    let mut previous: Option<T> = None;
    let run: RunFn = Rc::new(RefCell::new(move || {
        previous = Some(f(previous.take()));
    }));

    let id = Runtime::create_computation(ComputationKind::Effect, run)?;
    Ok(Effect { id })
}

/// Create an effect in the current ownership scope and run it once.
///
/// # Panics
///
/// Panics when called outside of an ownership scope.
pub fn create_effect<T: 'static>(f: impl FnMut(Option<T>) -> T + 'static) -> Effect {
    try_create_effect(f).unwrap_or_else(|err| panic!("create_effect: {err}"))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::ReactiveError;
    use crate::reactive::{create_memo, create_root, create_signal, on_cleanup};

    #[test]
    fn effect_runs_on_creation() {
        create_root(|dispose| {
            let ran = Rc::new(Cell::new(false));
            let ran_clone = ran.clone();
            let effect = create_effect(move |_| ran_clone.set(true));

            assert!(ran.get());
            assert_eq!(effect.run_count(), 1);
            dispose.dispose();
        });
    }

    #[test]
    fn effect_receives_previous_result() {
        create_root(|dispose| {
            let (count, set_count) = create_signal(1);
            let history = Rc::new(RefCell::new(Vec::new()));

            let history_clone = history.clone();
            create_effect(move |previous: Option<i32>| {
                let value = count.get();
                history_clone.borrow_mut().push((previous, value));
                value
            });

            set_count.set(2);
            set_count.set(3);
            assert_eq!(
                *history.borrow(),
                vec![(None, 1), (Some(1), 2), (Some(2), 3)]
            );
            dispose.dispose();
        });
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        create_root(|dispose| {
            let (count, set_count) = create_signal(0);
            let effect = create_effect(move |_| count.get());
            assert_eq!(effect.run_count(), 1);

            effect.dispose();
            assert!(effect.is_disposed());
            set_count.set(1);
            assert_eq!(effect.run_count(), 0);
            dispose.dispose();
        });
    }

    #[test]
    fn dependencies_are_rebuilt_each_run() {
        create_root(|dispose| {
            let (flag, set_flag) = create_signal(true);
            let (a, set_a) = create_signal(0);
            let (b, _set_b) = create_signal(0);

            let effect = create_effect(move |_| {
                if flag.get() {
                    a.get();
                } else {
                    b.get();
                }
            });
            assert_eq!(effect.dependency_count(), 2);

            set_flag.set(false);
            assert_eq!(effect.dependency_count(), 2);
            let runs = effect.run_count();

            // `a` is no longer read
            set_a.set(1);
            assert_eq!(effect.run_count(), runs);
            dispose.dispose();
        });
    }

    #[test]
    fn nested_effect_is_disposed_with_parent() {
        create_root(|dispose| {
            let (count, set_count) = create_signal(0);
            let inner_cleanups = Rc::new(Cell::new(0));

            let inner_cleanups_clone = inner_cleanups.clone();
            create_effect(move |_| {
                count.get();
                let cleanups = inner_cleanups_clone.clone();
                create_effect(move |_| {
                    let cleanups = cleanups.clone();
                    on_cleanup(move || cleanups.set(cleanups.get() + 1));
                });
            });

            set_count.set(1);
            // The first inner effect was disposed when the outer one re-ran.
            assert_eq!(inner_cleanups.get(), 1);
            dispose.dispose();
            assert_eq!(inner_cleanups.get(), 2);
        });
    }

    #[test]
    fn effect_writing_its_own_input_sees_the_result() {
        create_root(|dispose| {
            let (count, set_count) = create_signal(0);
            let doubled = create_memo(move || count.get() * 2);
            let seen = Rc::new(RefCell::new(Vec::new()));

            let seen_clone = seen.clone();
            let effect = create_effect(move |_| {
                let value = doubled.get();
                seen_clone.borrow_mut().push(value);
                if value == 0 {
                    set_count.set(1);
                }
            });

            assert_eq!(*seen.borrow(), vec![0, 2]);
            assert_eq!(effect.run_count(), 2);
            dispose.dispose();
        });
    }

    #[test]
    fn effect_outside_scope_is_an_error() {
        let err = try_create_effect(|_| ()).unwrap_err();
        assert_eq!(err, ReactiveError::NoActiveScope);
    }

    #[test]
    #[should_panic(expected = "inside an ownership scope")]
    fn create_effect_outside_scope_panics() {
        create_effect(|_| ());
    }
}
