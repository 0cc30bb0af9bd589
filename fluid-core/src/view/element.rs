//! Element construction.
//!
//! [`element`] returns a builder. Static attributes and children are applied
//! once; dynamic ones get their own effect in the current ownership scope,
//! so only the part that depends on a changed signal is touched.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::child::Child;
use crate::dom::{Event, Node};
use crate::error::Result;
use crate::reactive::{try_create_effect, Runtime};
use crate::reconcile::{reconcile, reconcile_property, AttrValue, StyleMap};

/// An attribute as written in a view: either a value or an accessor.
#[derive(Clone)]
pub enum Attr {
    Static(AttrValue),
    Dynamic(Rc<dyn Fn() -> AttrValue>),
}

impl fmt::Debug for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// One style property as written in a view.
#[derive(Clone)]
pub enum StyleValue {
    Static(String),
    Dynamic(Rc<dyn Fn() -> String>),
}

impl StyleValue {
    fn resolve(&self) -> String {
        match self {
            Self::Static(value) => value.clone(),
            Self::Dynamic(accessor) => accessor(),
        }
    }
}

/// Style as written in a view; values may be accessors.
pub type Style = IndexMap<String, StyleValue>;

/// Builder for an element and everything it renders.
#[must_use]
pub struct ElementBuilder {
    tag: String,
    attributes: Vec<(String, Attr)>,
    style: Style,
    children: Vec<Child>,
}

/// Start building an element.
///
/// ```rust
/// use fluid_core::reactive::create_root;
/// use fluid_core::view::element;
///
/// create_root(|dispose| {
///     let link = element("a").attr("href", "/docs").child("Docs").build();
///     assert_eq!(link.to_html(), r#"<a href="/docs">Docs</a>"#);
///     dispose.dispose();
/// });
/// ```
pub fn element(tag: &str) -> ElementBuilder {
    ElementBuilder {
        tag: tag.to_string(),
        attributes: Vec::new(),
        style: Style::new(),
        children: Vec::new(),
    }
}

impl ElementBuilder {
    pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes
            .push((name.to_string(), Attr::Static(value.into())));
        self
    }

    /// An attribute recomputed whenever the signals `f` reads change.
    pub fn attr_dyn<V: Into<AttrValue>>(mut self, name: &str, f: impl Fn() -> V + 'static) -> Self {
        self.attributes
            .push((name.to_string(), Attr::Dynamic(Rc::new(move || f().into()))));
        self
    }

    /// Listen for `event_type` (`"click"`, `"input"`, ...).
    pub fn on(mut self, event_type: &str, handler: impl Fn(&Event) + 'static) -> Self {
        let name = format!("{}{event_type}", Runtime::config().listener_prefix);
        self.attributes
            .push((name, Attr::Static(AttrValue::listener(handler))));
        self
    }

    pub fn style(mut self, key: &str, value: impl Into<String>) -> Self {
        self.style
            .insert(key.to_string(), StyleValue::Static(value.into()));
        self
    }

    pub fn style_dyn(mut self, key: &str, f: impl Fn() -> String + 'static) -> Self {
        self.style
            .insert(key.to_string(), StyleValue::Dynamic(Rc::new(f)));
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    /// A child region re-rendered whenever the signals `f` reads change.
    pub fn child_dyn<C: Into<Child>>(mut self, f: impl Fn() -> C + 'static) -> Self {
        self.children.push(Child::dynamic(f));
        self
    }

    pub fn children<C: Into<Child>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Create the element, failing if a dynamic part needs an ownership
    /// scope and none is current.
    pub fn try_build(self) -> Result<Node> {
        let node = Node::element(&self.tag);
        render_children(&node, self.children)?;
        render_properties(&node, self.attributes, self.style)?;
        Ok(node)
    }

    /// Create the element.
    ///
    /// # Panics
    ///
    /// Panics if the element has dynamic parts and no ownership scope is
    /// current.
    pub fn build(self) -> Node {
        self.try_build()
            .unwrap_or_else(|err| panic!("element: {err}"))
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Child::Node(builder.build())
    }
}

/// Mount `children` into `parent`, one region per child.
///
/// Each dynamic child keeps its region between the static content before
/// it and the first node rendered by any later child.
pub(crate) fn render_children(parent: &Node, children: Vec<Child>) -> Result<()> {
    let children = Child::flatten(children);
    let next_siblings: Rc<RefCell<Vec<Option<Node>>>> =
        Rc::new(RefCell::new(vec![None; children.len()]));

    for (index, child) in children.into_iter().enumerate() {
        match child {
            Child::Dynamic(accessor) => {
                let parent = parent.clone();
                let next_siblings = Rc::clone(&next_siblings);
                try_create_effect(move |previous: Option<Vec<Node>>| {
                    let desired = accessor().into_desired();
                    let anchor = next_siblings.borrow()[index + 1..]
                        .iter()
                        .flatten()
                        .next()
                        .cloned();
                    let (nodes, first) = reconcile(
                        &parent,
                        previous.as_deref().unwrap_or_default(),
                        desired,
                        anchor.as_ref(),
                    );
                    next_siblings.borrow_mut()[index] = first;
                    nodes
                })?;
            }
            child => {
                let (_, first) = reconcile(parent, &[], child.into_desired(), None);
                next_siblings.borrow_mut()[index] = first;
            }
        }
    }
    Ok(())
}

/// Apply attributes and style to a freshly created element.
fn render_properties(element: &Node, attributes: Vec<(String, Attr)>, style: Style) -> Result<()> {
    let dynamic_style = style
        .values()
        .any(|value| matches!(value, StyleValue::Dynamic(_)));

    for (name, attr) in attributes {
        match attr {
            Attr::Static(value) => reconcile_property(element, &name, &value, None),
            Attr::Dynamic(accessor) => {
                let element = element.clone();
                try_create_effect(move |previous: Option<AttrValue>| {
                    let next = accessor();
                    reconcile_property(&element, &name, &next, previous.as_ref());
                    next
                })?;
            }
        }
    }

    let resolve = move || {
        AttrValue::Style(
            style
                .iter()
                .map(|(key, value)| (key.clone(), value.resolve()))
                .collect::<StyleMap>(),
        )
    };
    if !dynamic_style {
        reconcile_property(element, "style", &resolve(), None);
    } else {
        let element = element.clone();
        try_create_effect(move |previous: Option<AttrValue>| {
            let next = resolve();
            reconcile_property(&element, "style", &next, previous.as_ref());
            next
        })?;
    }
    Ok(())
}
