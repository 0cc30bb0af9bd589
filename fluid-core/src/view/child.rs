//! Child descriptions.

use std::fmt;
use std::rc::Rc;

use crate::dom::Node;
use crate::reactive::{Memo, ReadSignal};
use crate::reconcile::Desired;

/// Something that can be rendered as children of an element.
///
/// Strings and numbers become text nodes. `None` and [`Child::Empty`]
/// render nothing. A [`Child::Dynamic`] is re-evaluated inside its own
/// effect whenever the signals it reads change.
#[derive(Clone, Default)]
pub enum Child {
    #[default]
    Empty,
    Node(Node),
    Text(String),
    Fragment(Vec<Child>),
    Dynamic(Rc<dyn Fn() -> Child>),
}

impl Child {
    /// Wrap an accessor as a dynamic child.
    pub fn dynamic<C: Into<Child>>(f: impl Fn() -> C + 'static) -> Self {
        Self::Dynamic(Rc::new(move || f().into()))
    }

    /// Flatten into desired region content. Dynamic children are evaluated
    /// on the spot, so their reads are tracked by the running computation.
    pub(crate) fn into_desired(self) -> Vec<Desired> {
        let mut out = Vec::new();
        self.collect_desired(&mut out);
        out
    }

    fn collect_desired(self, out: &mut Vec<Desired>) {
        match self {
            Self::Empty => {}
            Self::Node(node) => out.push(Desired::Node(node)),
            Self::Text(text) => out.push(Desired::Text(text)),
            Self::Fragment(children) => {
                for child in children {
                    child.collect_desired(out);
                }
            }
            Self::Dynamic(accessor) => accessor().collect_desired(out),
        }
    }

    /// Materialize as detached nodes, creating text nodes for text.
    pub(crate) fn into_nodes(self) -> Vec<Node> {
        self.into_desired()
            .into_iter()
            .map(|desired| match desired {
                Desired::Node(node) => node,
                Desired::Text(text) => Node::text(text),
            })
            .collect()
    }

    /// Expand nested fragments so every dynamic child becomes its own
    /// region.
    pub(crate) fn flatten(children: Vec<Child>) -> Vec<Child> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Self::Fragment(inner) => out.extend(Self::flatten(inner)),
                other => out.push(other),
            }
        }
        out
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<&Node> for Child {
    fn from(node: &Node) -> Self {
        Self::Node(node.clone())
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for Child {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

macro_rules! child_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Self::Text(value.to_string())
                }
            }
        )*
    };
}

child_from_number!(i32, i64, u32, u64, usize, f64);

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(children: Vec<T>) -> Self {
        Self::Fragment(children.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<Child> + 'static> From<Memo<T>> for Child {
    fn from(memo: Memo<T>) -> Self {
        Self::dynamic(move || memo.get())
    }
}

impl<T: Clone + Into<Child> + 'static> From<ReadSignal<T>> for Child {
    fn from(signal: ReadSignal<T>) -> Self {
        Self::dynamic(move || signal.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_flatten_in_order() {
        let child: Child = vec![
            Child::from("a"),
            Child::from(vec![Child::from(1), Child::Empty]),
            Child::from(None::<String>),
            Child::from("b"),
        ]
        .into();

        assert_eq!(
            child.into_desired(),
            vec![
                Desired::Text("a".into()),
                Desired::Text("1".into()),
                Desired::Text("b".into()),
            ]
        );
    }

    #[test]
    fn flatten_keeps_dynamic_children_separate() {
        let children = Child::flatten(vec![
            Child::from("a"),
            Child::Fragment(vec![Child::dynamic(|| "b"), Child::from("c")]),
        ]);

        assert_eq!(children.len(), 3);
        assert!(matches!(children[1], Child::Dynamic(_)));
    }

    #[test]
    fn into_nodes_creates_text_nodes() {
        let span = Node::element("span");
        let nodes = Child::from(vec![Child::from(&span), Child::from("x")]).into_nodes();

        assert_eq!(nodes[0], span);
        assert!(nodes[1].is_text());
        assert_eq!(nodes[1].text_content(), "x");
    }
}
