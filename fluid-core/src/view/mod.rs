//! View Layer
//!
//! Builds node trees whose dynamic parts are kept up to date by effects.
//!
//! - [`element`] builds an element from static and dynamic attributes,
//!   style and children.
//! - [`Child`] describes renderable content: nodes, text, fragments and
//!   accessors.
//! - [`keyed_list`] and [`keyed_list_by`] render one row per list item and
//!   keep rows alive across reorderings.
//! - [`render`] mounts an application into a root node.

mod child;
mod element;
mod keyed;
mod mount;

pub use child::Child;
pub use element::{element, Attr, ElementBuilder, Style, StyleValue};
pub use keyed::{keyed_list, keyed_list_by, try_keyed_list_by, ItemIndex};
pub use mount::{render, Mounted};
