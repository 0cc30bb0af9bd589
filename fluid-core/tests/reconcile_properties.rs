//! Property tests for the children reconciler.

use std::collections::HashSet;

use proptest::prelude::*;

use fluid_core::dom::Node;
use fluid_core::reconcile::{reconcile_with_stats, Desired};

#[derive(Debug, Clone)]
enum Item {
    Element(usize),
    Text(String),
}

const POOL: usize = 6;

fn item() -> impl Strategy<Value = Item> {
    prop_oneof![
        (0..POOL).prop_map(Item::Element),
        "[a-c]{1,2}".prop_map(Item::Text),
    ]
}

/// A node may appear only once among its parent's children.
fn items() -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec(item(), 0..10).prop_map(|items| {
        let mut seen = HashSet::new();
        items
            .into_iter()
            .filter(|item| match item {
                Item::Element(key) => seen.insert(*key),
                Item::Text(_) => true,
            })
            .collect()
    })
}

fn desired(pool: &[Node], items: &[Item]) -> Vec<Desired> {
    items
        .iter()
        .map(|item| match item {
            Item::Element(key) => Desired::Node(pool[*key].clone()),
            Item::Text(text) => Desired::Text(text.clone()),
        })
        .collect()
}

fn describe(nodes: &[Node]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| match node.attribute("data-key") {
            Some(key) => format!("<{key}>"),
            None => node.text_content(),
        })
        .collect()
}

fn expected(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            Item::Element(key) => format!("<{key}>"),
            Item::Text(text) => text.clone(),
        })
        .collect()
}

proptest! {
    #[test]
    fn children_match_desired_sequence(before in items(), after in items()) {
        let pool: Vec<Node> = (0..POOL)
            .map(|key| {
                let node = Node::element("i");
                node.set_attribute("data-key", &key.to_string());
                node
            })
            .collect();
        let parent = Node::element("div");

        let (previous, _) = reconcile_with_stats(&parent, &[], desired(&pool, &before), None);
        prop_assert_eq!(describe(&parent.children()), expected(&before));

        let (nodes, stats) = reconcile_with_stats(&parent, &previous, desired(&pool, &after), None);
        prop_assert_eq!(describe(&parent.children()), expected(&after));
        prop_assert_eq!(parent.children(), nodes);

        let mounted: HashSet<usize> = before
            .iter()
            .filter_map(|item| match item {
                Item::Element(key) => Some(*key),
                Item::Text(_) => None,
            })
            .collect();
        let fresh = after
            .iter()
            .filter(|item| match item {
                Item::Element(key) => !mounted.contains(key),
                Item::Text(_) => true,
            })
            .count();
        prop_assert!(stats.created <= fresh);
    }

    #[test]
    fn unchanged_children_are_untouched(before in items()) {
        let pool: Vec<Node> = (0..POOL).map(|_| Node::element("i")).collect();
        let parent = Node::element("div");

        let (previous, _) = reconcile_with_stats(&parent, &[], desired(&pool, &before), None);
        let (nodes, stats) = reconcile_with_stats(&parent, &previous, desired(&pool, &before), None);

        prop_assert_eq!(nodes, previous);
        prop_assert_eq!(stats.created, 0);
        prop_assert_eq!(stats.updated, 0);
        prop_assert_eq!(stats.removed, 0);
        prop_assert_eq!(stats.moved, 0);
    }

    #[test]
    fn anchor_stays_last(before in items(), after in items()) {
        let pool: Vec<Node> = (0..POOL).map(|_| Node::element("i")).collect();
        let parent = Node::element("div");
        let anchor = Node::element("footer");
        parent.append_child(&anchor);

        let (previous, _) = reconcile_with_stats(&parent, &[], desired(&pool, &before), Some(&anchor));
        let (nodes, _) = reconcile_with_stats(&parent, &previous, desired(&pool, &after), Some(&anchor));

        let mut children = parent.children();
        prop_assert_eq!(children.pop(), Some(anchor));
        prop_assert_eq!(children, nodes);
    }
}
