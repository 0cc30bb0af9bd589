//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read inside a running computation, the computation is
//!    registered as a subscriber and the signal as one of its dependencies.
//!
//! 2. A write that stores a different value opens (or joins) a transaction,
//!    marks the signal stale, stores the value and marks it stable again.
//!
//! 3. When the write opened the transaction, every dependent effect has run
//!    by the time `set` returns.
//!
//! # Memory Layout
//!
//! The value lives behind an `Rc`, so clones are cheap and share state. The
//! subscriber set lives in the runtime's dependency graph, keyed by the
//! signal's id. Dropping the last handle removes the signal from the graph.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::runtime::Runtime;
use super::transaction::batch;
use super::SignalId;

struct SignalInner<T> {
    id: SignalId,
    value: RefCell<T>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        Runtime::release_signal(self.id);
    }
}

/// A reactive cell holding a value of type `T`.
///
/// # Example
///
/// ```rust
/// use fluid_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        let id = SignalId::next();
        Runtime::register_signal(id);
        Self {
            inner: Rc::new(SignalInner {
                id,
                value: RefCell::new(value),
            }),
        }
    }

    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::track(self.inner.id);
        self.with_untracked(f)
    }

    /// Borrow the current value without registering a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value` unconditionally and propagate the change.
    ///
    /// Prefer [`Signal::set`]; this skips the equality check.
    pub fn set_unchecked(&self, value: T) {
        let id = self.inner.id;
        let issuer = Runtime::current_computation();

        batch(|| {
            Runtime::notify_stale(id, issuer);
            let previous = self.inner.value.replace(value);
            // The old value may own signals of its own.
            drop(previous);
            Runtime::notify_stable(id, true, issuer);
        });
    }

    /// Number of computations currently subscribed to this signal.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.id)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Get the current value.
    ///
    /// If called within a running computation, this also registers the
    /// computation as a subscriber.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Set a new value and notify subscribers.
    ///
    /// Writing a value equal to the current one does nothing.
    pub fn set(&self, value: T) {
        if *self.inner.value.borrow() == value {
            trace!(signal = ?self.inner.id, "unchanged write skipped");
            return;
        }
        self.set_unchecked(value);
    }

    /// Update the value using a function of the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T> Eq for Signal<T> {}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

/// Read half of a signal created by [`create_signal`].
pub struct ReadSignal<T>(Signal<T>);

impl<T: 'static> ReadSignal<T> {
    pub fn id(&self) -> SignalId {
        self.0.id()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with_untracked(f)
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subscriber_count()
    }
}

impl<T: Clone + 'static> ReadSignal<T> {
    pub fn get(&self) -> T {
        self.0.get()
    }

    pub fn get_untracked(&self) -> T {
        self.0.get_untracked()
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.0).finish()
    }
}

/// Write half of a signal created by [`create_signal`].
pub struct WriteSignal<T>(Signal<T>);

impl<T: PartialEq + 'static> WriteSignal<T> {
    pub fn set(&self, value: T) {
        self.0.set(value);
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.0.update(f);
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WriteSignal").field(&self.0.inner.id).finish()
    }
}

/// Create a signal and return its read and write halves.
///
/// ```rust
/// use fluid_core::reactive::create_signal;
///
/// let (count, set_count) = create_signal(1);
/// set_count.update(|n| n * 10);
/// assert_eq!(count.get(), 10);
/// ```
pub fn create_signal<T: 'static>(value: T) -> (ReadSignal<T>, WriteSignal<T>) {
    let signal = Signal::new(value);
    (ReadSignal(signal.clone()), WriteSignal(signal))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::reactive::{create_effect, create_root};

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1, signal2);
    }

    #[test]
    fn equal_write_does_not_notify() {
        create_root(|dispose| {
            let (name, set_name) = create_signal(String::from("ada"));
            let runs = Rc::new(Cell::new(0));

            let runs_clone = runs.clone();
            create_effect(move |_| {
                name.with(|_| ());
                runs_clone.set(runs_clone.get() + 1);
            });

            set_name.set(String::from("ada"));
            assert_eq!(runs.get(), 1);

            set_name.set(String::from("grace"));
            assert_eq!(runs.get(), 2);
            dispose.dispose();
        });
    }

    #[test]
    fn handles_have_debug_output() {
        let (read, write) = create_signal(7);
        let id = read.id();

        assert_eq!(
            format!("{read:?}"),
            format!("ReadSignal(Signal {{ id: {id:?}, value: 7 }})")
        );
        assert_eq!(format!("{write:?}"), format!("WriteSignal({id:?})"));
    }

    #[test]
    fn set_unchecked_always_notifies() {
        create_root(|dispose| {
            let signal = Signal::new(1);
            let runs = Rc::new(Cell::new(0));

            let reader = signal.clone();
            let runs_clone = runs.clone();
            create_effect(move |_| {
                reader.get();
                runs_clone.set(runs_clone.get() + 1);
            });

            signal.set_unchecked(1);
            assert_eq!(runs.get(), 2);
            dispose.dispose();
        });
    }

    #[test]
    fn dropping_last_handle_unregisters() {
        let before = Runtime::signal_count();
        let signal = Signal::new(0u8);
        let copy = signal.clone();
        assert_eq!(Runtime::signal_count(), before + 1);

        drop(signal);
        assert_eq!(Runtime::signal_count(), before + 1);
        drop(copy);
        assert_eq!(Runtime::signal_count(), before);
    }

    #[test]
    fn untracked_read_subscribes_nothing() {
        create_root(|dispose| {
            let (count, _set_count) = create_signal(0);
            let reader = count.clone();
            create_effect(move |_| reader.get_untracked());

            assert_eq!(count.subscriber_count(), 0);
            dispose.dispose();
        });
    }
}
