//! Attribute, style, property and listener reconciliation.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use crate::dom::{Event, Node, PropValue};
use crate::reactive::{on_cleanup, Runtime};

/// Resolved style: property name to value. Empty values mean "unset".
pub type StyleMap = IndexMap<String, String>;

/// A resolved attribute value, ready to be applied to an element.
#[derive(Clone, Default)]
pub enum AttrValue {
    /// No value. Removes the attribute.
    #[default]
    Empty,
    /// `true` sets the attribute to the empty string, `false` removes it.
    Bool(bool),
    Text(String),
    Style(StyleMap),
    Listener(Rc<dyn Fn(&Event)>),
}

impl AttrValue {
    /// Wrap an event handler.
    pub fn listener(handler: impl Fn(&Event) + 'static) -> Self {
        Self::Listener(Rc::new(handler))
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Style(a), Self::Style(b)) => a == b,
            (Self::Listener(a), Self::Listener(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bool(flag) => f.debug_tuple("Bool").field(flag).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Style(style) => f.debug_tuple("Style").field(style).finish(),
            Self::Listener(_) => f.write_str("Listener(..)"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for AttrValue {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<StyleMap> for AttrValue {
    fn from(style: StyleMap) -> Self {
        Self::Style(style)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

macro_rules! attr_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    Self::Text(value.to_string())
                }
            }
        )*
    };
}

attr_from_number!(i32, i64, u32, u64, usize, f64);

/// Apply `next` as the value of attribute `name`, given the value applied
/// last time.
///
/// - `style` is diffed key by key over the union of `previous` and `next`;
///   style keys neither mentions are left alone.
/// - `class` is replaced as a whole. An empty class removes the attribute.
/// - Listener attributes (`onclick`, ...) register the handler and remove it
///   again when the running computation is cleaned up.
/// - `value` and `checked` are written as live properties.
/// - Anything else is skipped when unchanged, removed when empty or `false`,
///   and set to the empty string when `true`.
pub fn reconcile_property(element: &Node, name: &str, next: &AttrValue, previous: Option<&AttrValue>) {
    debug_assert!(element.is_element(), "properties only apply to elements");

    if name == "style" {
        assign_style(element, next, previous);
    } else if name == "class" {
        assign_class(element, next);
    } else if let Some(event_type) = Runtime::config().listener_event(name) {
        assign_listener(element, &event_type, next);
    } else if name == "value" || name == "checked" {
        assign_live_property(element, name, next);
    } else if previous != Some(next) {
        assign_attribute(element, name, next);
    }
}

fn style_entries(value: Option<&AttrValue>) -> Option<&StyleMap> {
    match value {
        Some(AttrValue::Style(style)) => Some(style),
        _ => None,
    }
}

fn assign_style(element: &Node, next: &AttrValue, previous: Option<&AttrValue>) {
    let next = style_entries(Some(next));
    let previous = style_entries(previous);

    let keys = previous
        .into_iter()
        .chain(next)
        .flat_map(|style| style.keys())
        .cloned()
        .collect::<indexmap::IndexSet<String>>();

    for key in &keys {
        let value = next
            .and_then(|style| style.get(key))
            .filter(|value| !value.is_empty());
        let current = element.style(key).filter(|current| !current.is_empty());

        match (value, current) {
            (Some(value), Some(current)) if *value == current => {}
            (Some(value), _) => element.set_style(key, value),
            (None, Some(_)) => element.remove_style(key),
            (None, None) => {}
        }
    }
}

fn assign_class(element: &Node, next: &AttrValue) {
    match next {
        AttrValue::Text(class) if !class.is_empty() => element.set_attribute("class", class),
        _ => element.remove_attribute("class"),
    }
}

fn assign_listener(element: &Node, event_type: &str, next: &AttrValue) {
    let AttrValue::Listener(handler) = next else {
        return;
    };

    let handler = Rc::clone(handler);
    let id = element.add_event_listener(event_type, move |event| handler(event));
    trace!(element = ?element.id(), event_type, "listener bound");

    let element = element.clone();
    on_cleanup(move || {
        element.remove_event_listener(id);
    });
}

fn assign_live_property(element: &Node, name: &str, next: &AttrValue) {
    let value = match next {
        AttrValue::Bool(flag) => PropValue::Bool(*flag),
        AttrValue::Text(text) => PropValue::Text(text.clone()),
        AttrValue::Empty if name == "checked" => PropValue::Bool(false),
        AttrValue::Empty => PropValue::Text(String::new()),
        AttrValue::Style(_) | AttrValue::Listener(_) => {
            debug_assert!(false, "`{name}` cannot hold a style or a listener");
            return;
        }
    };
    element.set_property(name, value);
}

fn assign_attribute(element: &Node, name: &str, next: &AttrValue) {
    match next {
        AttrValue::Empty | AttrValue::Bool(false) => element.remove_attribute(name),
        AttrValue::Bool(true) => element.set_attribute(name, ""),
        AttrValue::Text(text) => element.set_attribute(name, text),
        AttrValue::Style(style) => {
            let text = style
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(key, value)| format!("{key}: {value}"))
                .collect::<Vec<_>>()
                .join("; ");
            element.set_attribute(name, &text);
        }
        AttrValue::Listener(_) => {
            debug_assert!(false, "listener bound to non-listener attribute `{name}`");
        }
    }
}
