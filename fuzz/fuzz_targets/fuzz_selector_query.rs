#![no_main]

//! Querying an arbitrary tree with arbitrary selector text must never
//! panic; malformed selectors match nothing.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use wirework_core::Element;
use wirework_tree::TreeElement;

#[derive(Debug, Arbitrary)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    children: Vec<Node>,
}

#[derive(Debug, Arbitrary)]
struct Input {
    root: Node,
    selector: String,
}

fn build(node: &Node, depth: usize) -> TreeElement {
    let mut element = TreeElement::new(node.tag.clone());
    if let Some(id) = &node.id {
        element = element.with_id(id.clone());
    }
    for class in node.classes.iter().take(8) {
        element = element.with_class(class.clone());
    }
    if depth < 6 {
        for child in node.children.iter().take(8) {
            element.append_child(&build(child, depth + 1));
        }
    }
    element
}

fuzz_target!(|input: Input| {
    let root = build(&input.root, 0);
    let matched = root.query(&input.selector);
    // Results are always strict descendants.
    for el in &matched {
        assert_ne!(el.key(), root.key());
    }
});
