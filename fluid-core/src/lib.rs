//! Fluid Core
//!
//! This crate provides the core runtime for the Fluid UI library.
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects, ownership scopes)
//! - Glitch-free transactions
//! - A live node tree with attributes, styles and listeners
//! - Reconcilers for children and properties
//! - Keyed lists, a nested reactive store and a view builder
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `graph`: Dependency graph between signals and computations
//! - `dom`: The node tree views render into
//! - `reconcile`: Minimal updates of children and properties
//! - `view`: Element builder, keyed lists and mounting
//! - `store`: Nested reactive state
//!
//! # Example
//!
//! ```rust
//! use fluid_core::prelude::*;
//!
//! let root = Node::element("body");
//! let (count, set_count) = create_signal(0);
//!
//! let app = render(
//!     move || {
//!         let count = count.clone();
//!         element("p").child("Count: ").child_dyn(move || count.get()).build()
//!     },
//!     &root,
//! );
//!
//! set_count.set(5);
//! assert_eq!(root.to_html(), "<body><p>Count: 5</p></body>");
//! app.dispose();
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod reconcile;
pub mod store;
pub mod view;

/// The names most applications need.
pub mod prelude {
    pub use crate::dom::{Event, Node};
    pub use crate::reactive::{
        batch, create_effect, create_memo, create_root, create_signal, on_cleanup, untrack,
        Memo, ReadSignal, Signal, WriteSignal,
    };
    pub use crate::store::{Selector, Store, Update};
    pub use crate::view::{element, keyed_list, keyed_list_by, render, Child, ItemIndex};
}
