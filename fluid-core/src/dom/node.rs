//! Retained element and text nodes.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::trace;

use super::event::{Event, Handler, Listener, ListenerId};

/// Unique identifier of a node, stable for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A live property value (`value`, `checked`, ...). Unlike attributes these
/// are not serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    Text(String),
    Bool(bool),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

#[derive(Default)]
struct ElementData {
    attributes: IndexMap<String, String>,
    style: IndexMap<String, String>,
    properties: IndexMap<String, PropValue>,
    listeners: Vec<Listener>,
}

enum NodeKind {
    Element {
        tag: String,
        data: RefCell<ElementData>,
    },
    Text(RefCell<String>),
}

struct NodeData {
    id: NodeId,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<Node>>,
    kind: NodeKind,
}

/// A handle to a node in a retained tree.
///
/// Handles are cheap to clone and compare by identity. A parent owns its
/// children; a child only refers back to its parent weakly.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self(Rc::new(NodeData {
            id: NodeId::next(),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            kind,
        }))
    }

    /// Create a detached element.
    pub fn element(tag: &str) -> Self {
        Self::new(NodeKind::Element {
            tag: tag.to_string(),
            data: RefCell::new(ElementData::default()),
        })
    }

    /// Create a detached text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(RefCell::new(content.into())))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.kind, NodeKind::Text(_))
    }

    /// Tag name of an element, `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = parent.0.children.borrow();
        let index = siblings.iter().position(|node| node == self)?;
        siblings.get(index + 1).cloned()
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    pub fn append_child(&self, child: &Node) {
        self.insert_before(child, None);
    }

    /// Insert `child` right before `reference`, or last when `reference` is
    /// `None` or not a child of `self`. A child that already has a parent is
    /// moved.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        debug_assert!(self.is_element(), "only elements can have children");
        debug_assert!(!child.contains(self), "inserting a node into its own subtree");
        if reference == Some(child) {
            return;
        }

        child.detach();
        let mut children = self.0.children.borrow_mut();
        let index = reference
            .and_then(|reference| children.iter().position(|node| node == reference))
            .unwrap_or(children.len());
        children.insert(index, child.clone());
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        trace!(parent = ?self.id(), child = ?child.id(), index, "node inserted");
    }

    /// Remove `child` from `self`. Returns `false` if it was not a child.
    pub fn remove_child(&self, child: &Node) -> bool {
        let removed = {
            let mut children = self.0.children.borrow_mut();
            match children.iter().position(|node| node == child) {
                Some(index) => Some(children.remove(index)),
                None => None,
            }
        };
        match removed {
            Some(node) => {
                *node.0.parent.borrow_mut() = Weak::new();
                true
            }
            None => false,
        }
    }

    /// Remove `self` from its parent, if any.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    /// Remove every child.
    pub fn clear_children(&self) {
        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in &children {
            *child.0.parent.borrow_mut() = Weak::new();
        }
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Text of a text node, or the concatenated text of an element's
    /// descendants.
    pub fn text_content(&self) -> String {
        match &self.0.kind {
            NodeKind::Text(text) => text.borrow().clone(),
            NodeKind::Element { .. } => self
                .0
                .children
                .borrow()
                .iter()
                .map(Node::text_content)
                .collect(),
        }
    }

    /// Replace the content of a text node. Does nothing on elements.
    pub fn set_text(&self, content: &str) {
        debug_assert!(self.is_text(), "set_text on an element");
        if let NodeKind::Text(text) = &self.0.kind {
            let mut text = text.borrow_mut();
            if *text != content {
                *text = content.to_string();
            }
        }
    }

    // ------------------------------------------------------------------
    // Attributes, style and properties
    // ------------------------------------------------------------------

    fn with_element<R>(&self, f: impl FnOnce(&RefCell<ElementData>) -> R) -> Option<R> {
        match &self.0.kind {
            NodeKind::Element { data, .. } => Some(f(data)),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with_element(|data| data.borrow().attributes.get(name).cloned())
            .flatten()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.with_element(|data| {
            data.borrow_mut()
                .attributes
                .insert(name.to_string(), value.to_string())
        });
    }

    pub fn remove_attribute(&self, name: &str) {
        self.with_element(|data| data.borrow_mut().attributes.shift_remove(name));
    }

    /// Attribute names and values in insertion order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.with_element(|data| {
            data.borrow()
                .attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn style(&self, key: &str) -> Option<String> {
        self.with_element(|data| data.borrow().style.get(key).cloned())
            .flatten()
    }

    pub fn set_style(&self, key: &str, value: &str) {
        self.with_element(|data| {
            data.borrow_mut()
                .style
                .insert(key.to_string(), value.to_string())
        });
    }

    pub fn remove_style(&self, key: &str) {
        self.with_element(|data| data.borrow_mut().style.shift_remove(key));
    }

    pub fn style_keys(&self) -> Vec<String> {
        self.with_element(|data| data.borrow().style.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn property(&self, name: &str) -> Option<PropValue> {
        self.with_element(|data| data.borrow().properties.get(name).cloned())
            .flatten()
    }

    pub fn set_property(&self, name: &str, value: PropValue) {
        self.with_element(|data| {
            data.borrow_mut()
                .properties
                .insert(name.to_string(), value)
        });
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Register `handler` for events of type `event_type`.
    pub fn add_event_listener(&self, event_type: &str, handler: impl Fn(&Event) + 'static) -> ListenerId {
        let id = ListenerId::next();
        let handler: Handler = Rc::new(handler);
        self.with_element(|data| {
            data.borrow_mut().listeners.push(Listener {
                id,
                event_type: event_type.to_string(),
                handler,
            });
        });
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered here.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let removed = self.with_element(|data| {
            let mut data = data.borrow_mut();
            let index = data.listeners.iter().position(|listener| listener.id == id)?;
            Some(data.listeners.remove(index))
        });
        // The handler may own nodes; drop it outside the borrow.
        removed.flatten().is_some()
    }

    /// Number of listeners registered for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.with_element(|data| {
            data.borrow()
                .listeners
                .iter()
                .filter(|listener| listener.event_type == event_type)
                .count()
        })
        .unwrap_or(0)
    }

    /// Invoke every listener for `event_type` on this node, in registration
    /// order. Returns how many ran.
    pub fn dispatch_event(&self, event_type: &str) -> usize {
        let handlers: Vec<Handler> = self
            .with_element(|data| {
                data.borrow()
                    .listeners
                    .iter()
                    .filter(|listener| listener.event_type == event_type)
                    .map(|listener| Rc::clone(&listener.handler))
                    .collect()
            })
            .unwrap_or_default();

        let event = Event::new(event_type, self.clone());
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    // ------------------------------------------------------------------
    // Queries and serialization
    // ------------------------------------------------------------------

    /// Depth-first search of `self` and its descendants.
    pub fn find(&self, predicate: &impl Fn(&Node) -> bool) -> Option<Node> {
        if predicate(self) {
            return Some(self.clone());
        }
        self.children()
            .iter()
            .find_map(|child| child.find(predicate))
    }

    /// Every descendant element with the given tag, in document order.
    pub fn find_all_by_tag(&self, tag: &str) -> Vec<Node> {
        let mut found = Vec::new();
        self.collect_by_tag(tag, &mut found);
        found
    }

    fn collect_by_tag(&self, tag: &str, found: &mut Vec<Node>) {
        for child in self.children() {
            if child.tag() == Some(tag) {
                found.push(child.clone());
            }
            child.collect_by_tag(tag, found);
        }
    }

    /// Serialize the subtree as HTML. Style is rendered as a `style`
    /// attribute; live properties and listeners are not serialized.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match &self.0.kind {
            NodeKind::Text(text) => escape_into(&text.borrow(), out),
            NodeKind::Element { tag, data } => {
                out.push('<');
                out.push_str(tag);
                {
                    let data = data.borrow();
                    for (name, value) in &data.attributes {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        escape_into(value, out);
                        out.push('"');
                    }
                    if !data.style.is_empty() {
                        let style = data
                            .style
                            .iter()
                            .map(|(key, value)| format!("{key}: {value}"))
                            .collect::<Vec<_>>()
                            .join("; ");
                        out.push_str(" style=\"");
                        escape_into(&style, out);
                        out.push('"');
                    }
                }
                out.push('>');
                for child in self.children() {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            NodeKind::Element { tag, .. } => write!(f, "<{tag}>#{}", self.0.id.0),
            NodeKind::Text(text) => write!(f, "{:?}#{}", text.borrow(), self.0.id.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn list(parent: &Node) -> Vec<String> {
        parent.children().iter().map(Node::text_content).collect()
    }

    #[test]
    fn insert_before_moves_existing_child() {
        let parent = Node::element("ul");
        let a = Node::text("a");
        let b = Node::text("b");
        let c = Node::text("c");
        parent.append_child(&a);
        parent.append_child(&b);
        parent.append_child(&c);

        parent.insert_before(&c, Some(&a));
        assert_eq!(list(&parent), vec!["c", "a", "b"]);
        assert_eq!(c.parent(), Some(parent.clone()));

        parent.insert_before(&c, None);
        assert_eq!(list(&parent), vec!["a", "b", "c"]);
        assert_eq!(a.next_sibling(), Some(b));
    }

    #[test]
    fn moving_between_parents_detaches_first() {
        let left = Node::element("div");
        let right = Node::element("div");
        let child = Node::element("span");

        left.append_child(&child);
        right.append_child(&child);

        assert_eq!(left.child_count(), 0);
        assert_eq!(right.children(), vec![child.clone()]);
        assert_eq!(child.parent(), Some(right));
    }

    #[test]
    fn remove_child_clears_parent() {
        let parent = Node::element("div");
        let child = Node::text("x");
        parent.append_child(&child);

        assert!(parent.remove_child(&child));
        assert!(!parent.remove_child(&child));
        assert!(child.parent().is_none());
    }

    #[test]
    fn attributes_and_style_are_serialized() {
        let div = Node::element("div");
        div.set_attribute("class", "card");
        div.set_style("color", "red");
        div.set_style("margin", "0");
        div.set_property("value", PropValue::Text("ignored".into()));
        div.append_child(&Node::text("a < b"));

        assert_eq!(
            div.to_html(),
            r#"<div class="card" style="color: red; margin: 0">a &lt; b</div>"#
        );

        div.remove_style("color");
        div.remove_attribute("class");
        assert_eq!(div.to_html(), r#"<div style="margin: 0">a &lt; b</div>"#);
    }

    #[test]
    fn listeners_dispatch_and_unregister() {
        let button = Node::element("button");
        let clicks = Rc::new(Cell::new(0));

        let clicks_clone = clicks.clone();
        let id = button.add_event_listener("click", move |event| {
            assert_eq!(event.event_type(), "click");
            clicks_clone.set(clicks_clone.get() + 1);
        });

        assert_eq!(button.dispatch_event("click"), 1);
        assert_eq!(button.dispatch_event("input"), 0);
        assert!(button.remove_event_listener(id));
        assert_eq!(button.dispatch_event("click"), 0);
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn text_nodes_ignore_element_operations() {
        let text = Node::text("hi");
        text.set_attribute("id", "x");
        assert!(text.attribute("id").is_none());
        assert_eq!(text.tag(), None);

        text.set_text("bye");
        assert_eq!(text.text_content(), "bye");
    }

    #[test]
    fn find_searches_depth_first() {
        let root = Node::element("div");
        let list = Node::element("ul");
        let item = Node::element("li");
        item.set_attribute("id", "target");
        list.append_child(&item);
        root.append_child(&list);

        let found = root.find(&|node: &Node| node.attribute("id").as_deref() == Some("target"));
        assert_eq!(found, Some(item));
        assert_eq!(root.find_all_by_tag("li").len(), 1);
    }
}
