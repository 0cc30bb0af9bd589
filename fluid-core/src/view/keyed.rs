//! Keyed List View
//!
//! Renders one row per item of a reactive list and keeps each row alive for
//! as long as its item stays in the list, however the list is reordered.
//!
//! # How It Works
//!
//! Every recomputation of the source list walks the new items in order:
//!
//! 1. An item whose key matches a row of the previous pass takes that row
//!    over: its nodes, its ownership scope and its index signal. Each row is
//!    taken at most once, so duplicate keys match rows first-come.
//!
//! 2. Any other item gets a fresh ownership scope, and the render callback
//!    runs inside it.
//!
//! 3. Rows nobody took are disposed.
//!
//! The result is a memo of the concatenated row nodes, ready to be used as a
//! dynamic child. When the computation that created the list is cleaned up,
//! every live row is disposed.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::child::Child;
use crate::dom::Node;
use crate::error::Result;
use crate::graph::Cleanup;
use crate::reactive::{create_root, try_create_memo, untrack, Disposer, Memo, Runtime, Signal};

/// Accessor for the current position of a row's item.
///
/// Reading it inside a computation subscribes to position changes.
#[derive(Debug, Clone)]
pub struct ItemIndex(Signal<usize>);

impl ItemIndex {
    pub fn get(&self) -> usize {
        self.0.get()
    }

    pub fn get_untracked(&self) -> usize {
        self.0.get_untracked()
    }
}

struct Row<K> {
    key: K,
    nodes: Vec<Node>,
    disposer: Disposer,
    index: Signal<usize>,
}

/// Render `each()` with one row per item, matching rows by item equality.
///
/// # Panics
///
/// Panics when called outside of an ownership scope.
pub fn keyed_list<T, R>(
    each: impl Fn() -> Vec<T> + 'static,
    render: impl FnMut(&T, ItemIndex) -> R + 'static,
) -> Memo<Vec<Node>>
where
    T: Clone + PartialEq + 'static,
    R: Into<Child>,
{
    keyed_list_by(each, T::clone, render)
}

/// Render `each()` with one row per item, matching rows by `key(item)`.
///
/// # Panics
///
/// Panics when called outside of an ownership scope.
pub fn keyed_list_by<T, K, R>(
    each: impl Fn() -> Vec<T> + 'static,
    key: impl Fn(&T) -> K + 'static,
    render: impl FnMut(&T, ItemIndex) -> R + 'static,
) -> Memo<Vec<Node>>
where
    T: 'static,
    K: PartialEq + 'static,
    R: Into<Child>,
{
    try_keyed_list_by(each, key, render).unwrap_or_else(|err| panic!("keyed_list: {err}"))
}

/// Fallible form of [`keyed_list_by`].
pub fn try_keyed_list_by<T, K, R>(
    each: impl Fn() -> Vec<T> + 'static,
    key: impl Fn(&T) -> K + 'static,
    mut render: impl FnMut(&T, ItemIndex) -> R + 'static,
) -> Result<Memo<Vec<Node>>>
where
    T: 'static,
    K: PartialEq + 'static,
    R: Into<Child>,
{
    let rows: Rc<RefCell<Vec<Row<K>>>> = Rc::new(RefCell::new(Vec::new()));

    let state = Rc::clone(&rows);
    let memo = try_create_memo(move || {
        let items = each();
        let mut previous: Vec<Option<Row<K>>> =
            state.borrow_mut().drain(..).map(Some).collect();
        let mut next = Vec::with_capacity(items.len());
        let mut created = 0usize;

        for (position, item) in items.iter().enumerate() {
            let item_key = key(item);
            let reused = previous
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|row| row.key == item_key))
                .and_then(Option::take);

            let row = match reused {
                Some(row) => {
                    untrack(|| row.index.set(position));
                    row
                }
                None => {
                    created += 1;
                    let index = Signal::new(position);
                    let item_index = ItemIndex(index.clone());
                    let (disposer, nodes) = create_root(|disposer| {
                        let child: Child = render(item, item_index).into();
                        (disposer, child.into_nodes())
                    });
                    Row {
                        key: item_key,
                        nodes,
                        disposer,
                        index,
                    }
                }
            };
            next.push(row);
        }

        let stale: Vec<Row<K>> = previous.into_iter().flatten().collect();
        debug!(
            rows = next.len(),
            created,
            disposed = stale.len(),
            "keyed list updated"
        );
        for row in &stale {
            row.disposer.dispose();
        }

        let nodes = next
            .iter()
            .flat_map(|row| row.nodes.iter().cloned())
            .collect();
        *state.borrow_mut() = next;
        nodes
    })?;

    // Rows outlive re-runs of the memo and go away with it.
    Runtime::add_cleanup(
        memo.id(),
        Cleanup::OnDispose(Box::new(move || {
            let live = std::mem::take(&mut *rows.borrow_mut());
            for row in &live {
                row.disposer.dispose();
            }
        })),
    );

    Ok(memo)
}
