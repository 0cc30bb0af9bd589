//! Reactive Store
//!
//! Nested reactive state built from a JSON document. Every scalar becomes
//! its own signal, every object is wrapped key by key, and every array is a
//! signal holding its wrapped items. A computation that reads one field
//! re-runs only when that field changes.
//!
//! # Paths
//!
//! Reads and writes address values with a list of [`Selector`]s:
//!
//! - `Key` steps into an object.
//! - `Index` steps into an array.
//! - `Where` fans out to every array item matching a predicate.
//!
//! ```rust
//! use fluid_core::store::{Selector, Store};
//! use serde_json::json;
//!
//! let store = Store::new(json!({ "todos": [
//!     { "title": "write", "done": false },
//!     { "title": "test", "done": false },
//! ]}));
//!
//! store
//!     .set(
//!         &["todos".into(), Selector::matching(|todo| todo["title"] == "test")],
//!         json!({ "done": true }),
//!     )
//!     .unwrap();
//!
//! assert_eq!(store.get(&["todos".into(), 1.into(), "done".into()]).unwrap(), json!(true));
//! ```
//!
//! # Writes
//!
//! A write merges a partial object into every selected object, replaces
//! selected scalars and arrays, and runs in one transaction. Keys that do not
//! exist yet are added; readers that failed to find them earlier are not
//! notified.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::error::StoreError;
use crate::reactive::{batch, Signal};

#[derive(Clone)]
enum StoreNode {
    Leaf(Signal<Value>),
    Object(Rc<RefCell<IndexMap<String, StoreNode>>>),
    Array(Signal<Vec<StoreNode>>),
}

impl PartialEq for StoreNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Leaf(a), Self::Leaf(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Array(a), Self::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl StoreNode {
    fn wrap(value: Value) -> Self {
        match value {
            Value::Object(entries) => Self::Object(Rc::new(RefCell::new(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::wrap(value)))
                    .collect(),
            ))),
            Value::Array(items) => Self::Array(Signal::new(items.into_iter().map(Self::wrap).collect())),
            scalar => Self::Leaf(Signal::new(scalar)),
        }
    }

    fn items(items: &Signal<Vec<StoreNode>>, tracked: bool) -> Vec<StoreNode> {
        if tracked {
            items.with(Vec::clone)
        } else {
            items.with_untracked(Vec::clone)
        }
    }

    fn snapshot(&self, tracked: bool) -> Value {
        match self {
            Self::Leaf(signal) if tracked => signal.get(),
            Self::Leaf(signal) => signal.get_untracked(),
            Self::Object(entries) => {
                let entries: Vec<(String, StoreNode)> = entries
                    .borrow()
                    .iter()
                    .map(|(key, node)| (key.clone(), node.clone()))
                    .collect();
                Value::Object(
                    entries
                        .into_iter()
                        .map(|(key, node)| (key, node.snapshot(tracked)))
                        .collect(),
                )
            }
            Self::Array(items) => Value::Array(
                Self::items(items, tracked)
                    .iter()
                    .map(|item| item.snapshot(tracked))
                    .collect(),
            ),
        }
    }

    fn select(&self, selector: &Selector, tracked: bool, out: &mut Vec<StoreNode>) -> Result<(), StoreError> {
        match (selector, self) {
            (Selector::Key(key), Self::Object(entries)) => {
                let child = entries
                    .borrow()
                    .get(key)
                    .cloned()
                    .ok_or_else(|| StoreError::MissingKey(key.clone()))?;
                out.push(child);
            }
            (Selector::Key(key), _) => return Err(StoreError::NotAnObject(key.clone())),
            (Selector::Index(index), Self::Array(items)) => {
                let items = Self::items(items, tracked);
                let len = items.len();
                let item = items
                    .into_iter()
                    .nth(*index)
                    .ok_or(StoreError::IndexOutOfBounds { index: *index, len })?;
                out.push(item);
            }
            (Selector::Index(index), _) => return Err(StoreError::NotAnArray(*index)),
            (Selector::Where(predicate), Self::Array(items)) => {
                out.extend(
                    Self::items(items, tracked)
                        .into_iter()
                        .filter(|item| predicate(&item.snapshot(tracked))),
                );
            }
            (Selector::Where(_), _) => return Err(StoreError::PredicateOnNonArray),
        }
        Ok(())
    }

    /// Fail with the error `assign` would report, without writing anything.
    fn check(&self, value: &Value, path: &str) -> Result<(), StoreError> {
        match (self, value) {
            (Self::Object(entries), Value::Object(partial)) => {
                for (key, value) in partial {
                    let Some(child) = entries.borrow().get(key).cloned() else {
                        continue;
                    };
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    child.check(value, &child_path)?;
                }
                Ok(())
            }
            (Self::Array(_), Value::Array(_)) => Ok(()),
            (Self::Leaf(_), value) if !value.is_object() && !value.is_array() => Ok(()),
            _ => Err(StoreError::ShapeMismatch(path.to_string())),
        }
    }

    /// Write `value` into this node, keeping every nested signal that
    /// survives.
    fn assign(&self, value: Value, path: &str) -> Result<(), StoreError> {
        match (self, value) {
            (Self::Object(entries), Value::Object(partial)) => {
                for (key, value) in partial {
                    let existing = entries.borrow().get(&key).cloned();
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    match existing {
                        Some(child) => child.assign(value, &child_path)?,
                        None => {
                            trace!(path = %child_path, "store key added");
                            entries.borrow_mut().insert(key, Self::wrap(value));
                        }
                    }
                }
                Ok(())
            }
            (Self::Array(items), Value::Array(values)) => {
                items.set(values.into_iter().map(Self::wrap).collect());
                Ok(())
            }
            (Self::Leaf(signal), value) if !value.is_object() && !value.is_array() => {
                signal.set(value);
                Ok(())
            }
            _ => Err(StoreError::ShapeMismatch(path.to_string())),
        }
    }
}

/// One step of a store path.
#[derive(Clone)]
pub enum Selector {
    Key(String),
    Index(usize),
    Where(Rc<dyn Fn(&Value) -> bool>),
}

impl Selector {
    /// Select every array item whose current value satisfies `predicate`.
    pub fn matching(predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::Where(Rc::new(predicate))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Index(index) => f.debug_tuple("Index").field(index).finish(),
            Self::Where(_) => f.write_str("Where(..)"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
            Self::Where(_) => f.write_str("*"),
        }
    }
}

impl From<&str> for Selector {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for Selector {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for Selector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// The final argument of [`Store::set`]: a value, or a function computing
/// one from each selected value.
pub enum Update {
    Value(Value),
    With(Box<dyn Fn(&Value) -> Value>),
}

impl Update {
    pub fn with(f: impl Fn(&Value) -> Value + 'static) -> Self {
        Self::With(Box::new(f))
    }
}

impl From<Value> for Update {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}

/// Nested reactive state. Clones share the same state.
#[derive(Clone)]
pub struct Store {
    root: StoreNode,
}

impl Store {
    pub fn new(initial: Value) -> Self {
        Self {
            root: StoreNode::wrap(initial),
        }
    }

    fn resolve(&self, path: &[Selector], tracked: bool) -> Result<Vec<StoreNode>, StoreError> {
        let mut targets = vec![self.root.clone()];
        for selector in path {
            let mut next = Vec::with_capacity(targets.len());
            for target in &targets {
                target.select(selector, tracked, &mut next)?;
            }
            targets = next;
        }
        Ok(targets)
    }

    /// Read the value at `path`, tracking every signal it touches.
    ///
    /// A path containing a `Where` selector returns an array of every
    /// matching value.
    pub fn get(&self, path: &[Selector]) -> Result<Value, StoreError> {
        let targets = self.resolve(path, true)?;
        let fans_out = path.iter().any(|selector| matches!(selector, Selector::Where(_)));
        if fans_out {
            return Ok(Value::Array(
                targets.iter().map(|target| target.snapshot(true)).collect(),
            ));
        }
        Ok(targets
            .first()
            .map_or(Value::Null, |target| target.snapshot(true)))
    }

    /// The whole state as plain JSON, without tracking.
    pub fn snapshot(&self) -> Value {
        self.root.snapshot(false)
    }

    /// Write `update` into every value selected by `path`, in one
    /// transaction.
    ///
    /// Objects are merged with the partial object given (or computed);
    /// scalars and arrays are replaced. A value cannot change between
    /// object, array and scalar.
    pub fn set(&self, path: &[Selector], update: impl Into<Update>) -> Result<(), StoreError> {
        let update = update.into();
        let location = path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");

        batch(|| -> Result<(), StoreError> {
            let targets = self.resolve(path, false)?;
            trace!(path = %location, targets = targets.len(), "store write");

            let mut writes = Vec::with_capacity(targets.len());
            for target in targets {
                let next = match &update {
                    Update::Value(value) => value.clone(),
                    Update::With(f) => f(&target.snapshot(false)),
                };
                if matches!(target, StoreNode::Object(_)) && !next.is_object() {
                    return Err(StoreError::PartialNotObject(kind_of(&next).to_string()));
                }
                target.check(&next, &location)?;
                writes.push((target, next));
            }

            // Nothing is written unless every target accepts its value.
            for (target, next) in writes {
                target.assign(next, &location)?;
            }
            Ok(())
        })
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Store").field(&self.snapshot()).finish()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;
    use crate::reactive::{create_effect, create_root};

    fn counted_reader(store: &Store, path: Vec<Selector>) -> Rc<Cell<usize>> {
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let store = store.clone();
        create_effect(move |_| {
            let _ = store.get(&path);
            runs_clone.set(runs_clone.get() + 1);
        });
        runs
    }

    #[test]
    fn only_readers_of_touched_leaves_rerun() {
        create_root(|dispose| {
            let store = Store::new(json!({ "user": { "name": "ada", "age": 36 } }));
            let name_runs = counted_reader(&store, vec!["user".into(), "name".into()]);
            let age_runs = counted_reader(&store, vec!["user".into(), "age".into()]);

            store.set(&["user".into()], json!({ "name": "grace" })).unwrap();

            assert_eq!(name_runs.get(), 2);
            assert_eq!(age_runs.get(), 1);
            assert_eq!(store.snapshot(), json!({ "user": { "name": "grace", "age": 36 } }));
            dispose.dispose();
        });
    }

    #[test]
    fn predicate_updates_every_match_in_one_transaction() {
        create_root(|dispose| {
            let store = Store::new(json!({ "todos": [
                { "title": "a", "done": false },
                { "title": "b", "done": true },
                { "title": "c", "done": false },
            ]}));
            let all_runs = counted_reader(&store, vec!["todos".into()]);

            store
                .set(
                    &["todos".into(), Selector::matching(|todo| todo["done"] == false)],
                    json!({ "done": true }),
                )
                .unwrap();

            assert_eq!(all_runs.get(), 2);
            let open = store
                .get(&["todos".into(), Selector::matching(|todo| todo["done"] == false)])
                .unwrap();
            assert_eq!(open, json!([]));
            dispose.dispose();
        });
    }

    #[test]
    fn updater_sees_current_value() {
        let store = Store::new(json!({ "count": 1 }));
        store
            .set(
                &[],
                Update::with(|state| json!({ "count": state["count"].as_i64().unwrap_or(0) + 1 })),
            )
            .unwrap();
        assert_eq!(store.get(&["count".into()]).unwrap(), json!(2));
    }

    #[test]
    fn leaves_and_arrays_are_replaced() {
        let store = Store::new(json!({ "tags": ["x"], "title": "t" }));
        store.set(&["title".into()], json!("u")).unwrap();
        store.set(&["tags".into()], json!(["y", "z"])).unwrap();

        assert_eq!(store.snapshot(), json!({ "tags": ["y", "z"], "title": "u" }));
    }

    #[test]
    fn new_keys_are_added() {
        let store = Store::new(json!({}));
        store.set(&[], json!({ "theme": { "dark": true } })).unwrap();
        assert_eq!(
            store.get(&["theme".into(), "dark".into()]).unwrap(),
            json!(true)
        );
    }

    #[test]
    fn path_errors() {
        let store = Store::new(json!({ "list": [1, 2], "obj": { "a": 1 } }));

        assert_eq!(
            store.get(&["list".into(), "a".into()]).unwrap_err(),
            StoreError::NotAnObject("a".into())
        );
        assert_eq!(
            store.get(&["obj".into(), 0.into()]).unwrap_err(),
            StoreError::NotAnArray(0)
        );
        assert_eq!(
            store.get(&["list".into(), 5.into()]).unwrap_err(),
            StoreError::IndexOutOfBounds { index: 5, len: 2 }
        );
        assert_eq!(
            store.get(&["missing".into()]).unwrap_err(),
            StoreError::MissingKey("missing".into())
        );
        assert_eq!(
            store
                .set(&["obj".into(), Selector::matching(|_| true)], json!({}))
                .unwrap_err(),
            StoreError::PredicateOnNonArray
        );
    }

    #[test]
    fn shape_errors() {
        let store = Store::new(json!({ "obj": { "a": 1 } }));

        assert_eq!(
            store.set(&["obj".into()], json!(3)).unwrap_err(),
            StoreError::PartialNotObject("a number".into())
        );
        assert_eq!(
            store.set(&[], json!({ "obj": { "a": [1] } })).unwrap_err(),
            StoreError::ShapeMismatch("obj.a".into())
        );
        assert_eq!(store.snapshot(), json!({ "obj": { "a": 1 } }));
    }

    #[test]
    fn rejected_write_changes_nothing() {
        create_root(|dispose| {
            let store = Store::new(json!({
                "settings": { "a": 1, "z": 2 },
                "rows": [{ "v": 1 }, { "v": [1] }],
            }));
            let a_runs = counted_reader(&store, vec!["settings".into(), "a".into()]);

            // `a` comes first in the partial and is valid on its own.
            assert_eq!(
                store
                    .set(&["settings".into()], json!({ "a": 10, "z": { "deep": true } }))
                    .unwrap_err(),
                StoreError::ShapeMismatch("settings.z".into())
            );

            // The first row accepts a number, the second one does not.
            assert_eq!(
                store
                    .set(
                        &["rows".into(), Selector::matching(|_| true)],
                        json!({ "v": 5 }),
                    )
                    .unwrap_err(),
                StoreError::ShapeMismatch("rows.*.v".into())
            );

            assert_eq!(a_runs.get(), 1);
            assert_eq!(
                store.snapshot(),
                json!({
                    "settings": { "a": 1, "z": 2 },
                    "rows": [{ "v": 1 }, { "v": [1] }],
                })
            );
            dispose.dispose();
        });
    }
}
