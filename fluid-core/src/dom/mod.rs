//! Node Tree
//!
//! A retained, in-process tree of element and text nodes. It is the live
//! host that the [reconciler](crate::reconcile) mutates and that
//! [`render`](crate::view::render) mounts applications into.
//!
//! # Overview
//!
//! - Elements carry attributes, a per-key style map, live properties
//!   (`value`, `checked`) and event listeners.
//! - Text nodes carry a mutable string.
//! - A node has at most one parent. Inserting a node that already has a
//!   parent moves it.
//!
//! The tree is single-threaded like the rest of the runtime: handles are
//! `Rc`-based and compare by identity.

mod event;
mod node;

pub use event::{Event, ListenerId};
pub use node::{Node, NodeId, PropValue};
