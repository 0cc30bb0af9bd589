//! Mounting an application into a root node.

use tracing::{debug, error};

use super::child::Child;
use super::element::render_children;
use crate::dom::Node;
use crate::reactive::{create_root, Disposer};

/// A mounted application. Dropping it leaves the application running;
/// call [`Mounted::dispose`] to tear it down.
#[derive(Debug)]
pub struct Mounted {
    root: Node,
    disposer: Disposer,
}

impl Mounted {
    /// The node the application is mounted into.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Empty the root node and dispose every computation the application
    /// created.
    pub fn dispose(&self) {
        debug!(root = ?self.root.id(), "unmounting");
        self.root.clear_children();
        self.disposer.dispose();
    }
}

/// Render `app` into `root` inside a new ownership scope.
///
/// `app` runs as a dynamic child of `root`: signals it reads directly
/// re-render the whole application.
pub fn render<C: Into<Child>>(app: impl Fn() -> C + 'static, root: &Node) -> Mounted {
    create_root(|disposer| {
        if let Err(err) = render_children(root, vec![Child::dynamic(app)]) {
            error!(%err, "failed to mount application");
        }
        debug!(root = ?root.id(), scope = ?disposer.scope(), "mounted");
        Mounted {
            root: root.clone(),
            disposer,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_signal, Runtime};
    use crate::view::element;

    #[test]
    fn render_and_dispose() {
        let root = Node::element("main");
        let (name, set_name) = create_signal(String::from("world"));
        let reader = name.clone();

        let mounted = render(
            move || {
                let name = reader.clone();
                element("h1")
                    .child("Hello, ")
                    .child_dyn(move || name.get())
                    .build()
            },
            &root,
        );

        assert_eq!(root.to_html(), "<main><h1>Hello, world</h1></main>");
        set_name.set(String::from("fluid"));
        assert_eq!(root.text_content(), "Hello, fluid");

        mounted.dispose();
        assert_eq!(root.child_count(), 0);
        assert_eq!(name.subscriber_count(), 0);

        // Nothing is listening any more.
        set_name.set(String::from("gone"));
        assert_eq!(root.child_count(), 0);
        assert_eq!(Runtime::current_scope(), None);
    }
}
