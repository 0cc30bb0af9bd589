//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, effects,
//! ownership scopes and transactions. These primitives form the foundation of
//! Fluid's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while a computation runs, the signal registers that computation as a
//! subscriber. When the value changes, subscribers are re-run.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result and re-evaluates only
//! when one of its dependencies changes. Readers subscribe to it like a
//! signal.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Effects synchronize reactive state with the outside
//! world, such as the node tree in [`dom`](crate::dom).
//!
//! ## Ownership Scopes
//!
//! Every computation belongs to the scope that was current when it was
//! created. [`create_root`] opens a scope and hands out a [`Disposer`] that
//! tears down everything created inside it.
//!
//! ## Transactions
//!
//! Every write runs inside a transaction. Several writes wrapped in
//! [`batch`] share one transaction: each dependent effect runs at most once,
//! after the last write, against fully settled inputs.
//!
//! # Implementation Notes
//!
//! The reactive system uses thread-local state to detect dependencies
//! automatically. When a signal is read, we check whether a computation is
//! running in the current scope and, if so, record the link in the
//! dependency graph.

mod context;
mod effect;
mod id;
mod memo;
mod runtime;
mod signal;
mod transaction;

pub use context::{create_root, on_cleanup, untrack, Disposer};
pub use effect::{create_effect, try_create_effect, Effect};
pub use id::{ComputationId, ScopeId, SignalId};
pub use memo::{create_memo, try_create_memo, Memo};
pub use runtime::Runtime;
pub use signal::{create_signal, ReadSignal, Signal, WriteSignal};
pub use transaction::batch;
