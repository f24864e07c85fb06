use pretty_assertions::assert_eq;

use super::*;

fn div_with_text(doc: &mut Document, text: &str) -> (NodeId, NodeId) {
    let div = doc.create_element(Tag::Div);
    let node = doc.create_text(text);
    doc.append_child(div, node);
    let root = doc.root();
    doc.append_child(root, div);
    (div, node)
}

#[test]
fn sibling_navigation_follows_child_order() {
    let mut doc = Document::new();
    let (first, _) = div_with_text(&mut doc, "one");
    let (second, _) = div_with_text(&mut doc, "two");

    assert_eq!(doc.next_sibling(first), Some(second));
    assert_eq!(doc.previous_sibling(second), Some(first));
    assert_eq!(doc.previous_sibling(first), None);
    assert_eq!(doc.index_in_parent(second), Some(1));
    assert_eq!(doc.common_ancestor(first, second), doc.root());
}

#[test]
fn moving_a_node_detaches_it_from_the_old_parent() {
    let mut doc = Document::new();
    let (first, text) = div_with_text(&mut doc, "one");
    let (second, _) = div_with_text(&mut doc, "two");

    doc.prepend_child(second, text);
    assert!(!doc.has_children(first));
    assert_eq!(doc.text_content(second), "onetwo");
    assert_eq!(doc.parent(text), Some(second));
}

#[test]
fn removed_nodes_are_no_longer_attached() {
    let mut doc = Document::new();
    let (div, text) = div_with_text(&mut doc, "gone");
    doc.remove_node(div);

    assert!(!doc.is_attached(div));
    assert!(!doc.is_alive(text));
    assert!(doc.children(doc.root()).is_empty());
}

#[test]
fn tracked_range_survives_wrapping_its_text() {
    let mut doc = Document::new();
    let root = doc.root();
    let text = doc.create_text("Hello");
    doc.append_child(root, text);
    let handle = doc.track_range(&Range::new(Position::new(text, 1), Position::new(text, 4)));

    let wrapper = doc.create_element(Tag::Div);
    doc.insert_before(text, wrapper);
    doc.append_child(wrapper, text);

    let range = doc.untrack_range(handle).unwrap();
    assert_eq!(range.start, Position::new(text, 1));
    assert_eq!(range.end, Position::new(text, 4));
    assert!(doc.is_attached(range.start.container));
}

#[test]
fn removal_collapses_tracked_boundaries_to_the_removal_point() {
    let mut doc = Document::new();
    let (first, text) = div_with_text(&mut doc, "one");
    let (second, _) = div_with_text(&mut doc, "two");
    let handle = doc.track_range(&Range::collapsed_at(Position::new(text, 2)));

    doc.remove_node(first);

    let range = doc.tracked_range(handle).unwrap();
    assert_eq!(range.start, Position::new(doc.root(), 0));
    assert_eq!(doc.children(doc.root())[range.start.offset], second);
}

#[test]
fn merging_text_keeps_offsets_pointing_at_the_same_character() {
    let mut doc = Document::new();
    let root = doc.root();
    let hello = doc.create_text("Hello ");
    let world = doc.create_text("World");
    doc.append_child(root, hello);
    doc.append_child(root, world);
    let handle = doc.track_range(&Range::new(Position::new(hello, 2), Position::new(world, 3)));

    let survivor = doc.merge_text_with_next(hello, KeepNode::Next).unwrap();
    assert_eq!(survivor, world);
    assert_eq!(doc.text(world), "Hello World");
    assert!(!doc.is_alive(hello));

    let range = doc.tracked_range(handle).unwrap();
    assert_eq!(range.start, Position::new(world, 2));
    assert_eq!(range.end, Position::new(world, 9));
}

#[test]
fn merging_into_previous_shifts_following_offsets() {
    let mut doc = Document::new();
    let root = doc.root();
    let a = doc.create_text("ab");
    let b = doc.create_text("cd");
    doc.append_child(root, a);
    doc.append_child(root, b);
    let handle = doc.track_range(&Range::collapsed_at(Position::new(b, 1)));

    doc.merge_text_with_next(a, KeepNode::Previous);

    assert_eq!(doc.text(a), "abcd");
    assert_eq!(doc.tracked_range(handle).unwrap().start, Position::new(a, 3));
}

#[test]
fn replacing_a_container_redirects_element_boundaries() {
    let mut doc = Document::new();
    let (div, text) = div_with_text(&mut doc, "x");
    let handle = doc.track_range(&Range::new(Position::new(div, 0), Position::new(div, 1)));

    let p = doc.create_element(Tag::P);
    doc.append_child(p, text);
    doc.replace_node(div, p);

    let range = doc.tracked_range(handle).unwrap();
    assert_eq!(range.start, Position::new(p, 0));
    assert_eq!(range.end, Position::new(p, 1));
    assert_eq!(doc.children(doc.root()), &[p]);
}

#[test]
fn unwrap_keeps_children_in_place() {
    let mut doc = Document::new();
    let root = doc.root();
    let outer = doc.create_element(Tag::Div);
    let inner = doc.create_element(Tag::P);
    let tail = doc.create_element(Tag::P);
    doc.append_child(root, outer);
    doc.append_child(outer, inner);
    doc.append_child(outer, tail);

    doc.unwrap_node(outer);
    assert_eq!(doc.children(root), &[inner, tail]);
    assert!(!doc.is_alive(outer));
}

#[test]
fn normalize_text_merges_runs() {
    let mut doc = Document::new();
    let root = doc.root();
    for part in ["a", "b", "c"] {
        let text = doc.create_text(part);
        doc.append_child(root, text);
    }
    doc.normalize_text(root);
    assert_eq!(doc.children(root).len(), 1);
    assert_eq!(doc.text_content(root), "abc");
}

#[test]
fn detached_boundary_is_reported() {
    let mut doc = Document::new();
    let orphan = doc.create_text("floating");
    let handle = doc.track_range(&Range::collapsed_at(Position::new(orphan, 0)));
    assert_eq!(
        doc.tracked_range(handle),
        Err(RangeError::Detached(orphan))
    );
    doc.untrack_range(handle).unwrap_err();
    assert_eq!(doc.tracked_range(handle), Err(RangeError::Released));
}

#[test]
fn tag_names_round_trip_through_strings() {
    for name in ["div", "p", "h4", "li", "td", "blockquote", "br"] {
        let tag = Tag::from_name(name).unwrap();
        assert_eq!(tag.name(), name);
    }
    assert_eq!(Tag::from_name("B"), Some(Tag::Strong));
    assert_eq!(Tag::try_from("blink".to_string()), Err("unknown tag `blink`".to_string()));
}
