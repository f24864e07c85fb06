use pretty_assertions::assert_eq;

use super::*;
use crate::{
    config::BidiConfig,
    profile::EngineProfile,
    range::Position,
    tree::{NodeId, markup},
};

fn editor(source: &str) -> BidiEditor {
    BidiEditor::new(markup::parse(source).unwrap(), BidiConfig::default())
}

fn editor_with(source: &str, config: BidiConfig) -> BidiEditor {
    BidiEditor::new(markup::parse(source).unwrap(), config)
}

/// Selects from the start of the text containing `from` to the end of the text
/// containing `to`.
fn select(editor: &mut BidiEditor, from: &str, to: &str) {
    let doc = editor.document();
    let start = doc.find_text(from).unwrap();
    let end = doc.find_text(to).unwrap();
    let range = Range::new(Position::new(start, 0), Position::new(end, doc.text_len(end)));
    editor.set_selection(Some(range));
}

fn html(editor: &BidiEditor) -> String {
    markup::serialize(editor.document())
}

fn block_of(editor: &BidiEditor, text: &str) -> NodeId {
    let doc = editor.document();
    let node = doc.find_text(text).unwrap();
    editor.classifier.block_ancestor(doc, node)
}

fn assert_no_adjacent_text(doc: &Document) {
    for node in doc.descendants(doc.root()) {
        let children = doc.children(node);
        for pair in children.windows(2) {
            assert!(
                !(doc.is_text(pair[0]) && doc.is_text(pair[1])),
                "adjacent text under {node}: {:?}",
                markup::serialize_node(doc, node)
            );
        }
    }
}

// ============================================================================
// Direction
// ============================================================================

#[test]
fn set_direction_replaces_dir_attributes_with_explicit_direction() {
    let mut editor = editor(r#"<div dir="ltr">Hello</div><div dir="ltr">World</div>"#);
    select(&mut editor, "Hello", "World");

    let blocks = editor.set_direction(Direction::Rtl).unwrap().unwrap();

    assert_eq!(blocks.len(), 2);
    assert_eq!(
        html(&editor),
        r#"<div style="direction: rtl">Hello</div><div style="direction: rtl">World</div>"#
    );
    for node in &blocks.nodes {
        assert_eq!(editor.document().attribute(*node, "dir"), None);
        assert_eq!(editor.document().style(*node).alignment, None);
    }
}

#[test]
fn loose_text_under_the_root_gets_one_wrapper() {
    let mut editor = editor("Hello");
    select(&mut editor, "Hello", "Hello");

    let blocks = editor.exec("rtl".parse().unwrap()).unwrap().unwrap();

    assert_eq!(blocks.len(), 1);
    assert_eq!(html(&editor), r#"<div style="direction: rtl">Hello</div>"#);
}

#[test]
fn nested_list_item_margin_uses_its_level() {
    let mut editor =
        editor(r#"<ul><li>outer<ul><li style="margin-left: 20px">inner</li></ul></li></ul>"#);
    select(&mut editor, "inner", "inner");

    editor.set_direction(Direction::Rtl).unwrap();

    let item = block_of(&editor, "inner");
    assert_eq!(list_level(editor.document(), item), 2);
    assert_eq!(
        markup::serialize_node(editor.document(), item),
        r#"<li style="direction: rtl; margin-right: 95px">inner</li>"#
    );
}

#[test]
fn selection_ending_in_a_nested_item_collects_every_item() {
    let mut editor = editor(
        r#"<ul><li>a<ul><li dir="ltr">b</li><li>c</li></ul></li></ul><p>after</p>"#,
    );
    select(&mut editor, "a", "b");

    let blocks = editor.set_direction(Direction::Rtl).unwrap().unwrap();

    let outer = editor.document().nodes_with_tag(Tag::Li)[0];
    let inner = block_of(&editor, "b");
    let untouched = block_of(&editor, "c");
    assert_eq!(blocks.nodes, vec![outer, inner]);

    let doc = editor.document();
    assert_eq!(doc.style(inner).direction, Some(Direction::Rtl));
    assert_eq!(doc.attribute(inner, "dir"), None);
    assert_eq!(doc.style(untouched).direction, None);
    assert_eq!(doc.resolved_direction(block_of(&editor, "after")), Direction::Ltr);
}

#[test]
fn flipping_a_list_item_back_restores_its_margin() {
    let mut editor = editor(r#"<ul><li style="margin-left: 20px">item</li></ul>"#);
    select(&mut editor, "item", "item");

    editor.set_direction(Direction::Rtl).unwrap();
    let item = block_of(&editor, "item");
    assert_eq!(editor.document().style(item).margin_right, Some(55));

    editor.set_direction(Direction::Ltr).unwrap();
    assert_eq!(editor.document().style(item).margin_left, Some(20));
    assert_eq!(editor.document().style(item).margin_right, None);
}

#[test]
fn mirroring_twice_restores_direction_and_alignment() {
    let mut editor = editor(
        r#"<div style="text-align: left">one</div><div dir="rtl">two</div><p style="text-align: center">three</p><div style="direction: rtl; text-align: left">four</div>"#,
    );
    select(&mut editor, "one", "four");
    let blocks: Vec<NodeId> = ["one", "two", "three", "four"]
        .iter()
        .map(|text| block_of(&editor, text))
        .collect();
    let snapshot = |editor: &BidiEditor| {
        blocks
            .iter()
            .map(|block| {
                let style = editor.document().resolved_style(*block);
                (style.direction, style.alignment, style.visual_alignment())
            })
            .collect::<Vec<_>>()
    };
    let before = snapshot(&editor);

    editor.mirror_direction().unwrap();
    let mirrored = snapshot(&editor);
    for ((dir_before, ..), (dir_after, ..)) in before.iter().zip(&mirrored) {
        assert_eq!(*dir_after, dir_before.opposite());
    }

    editor.mirror_direction().unwrap();
    assert_eq!(snapshot(&editor), before);
}

#[test]
fn explicit_start_alignment_moves_to_the_new_start() {
    let mut editor = editor(r#"<div style="text-align: left">one</div>"#);
    select(&mut editor, "one", "one");

    editor.set_direction(Direction::Rtl).unwrap();
    assert_eq!(html(&editor), r#"<div style="direction: rtl; text-align: right">one</div>"#);

    editor.set_direction(Direction::Ltr).unwrap();
    assert_eq!(html(&editor), r#"<div style="direction: ltr; text-align: left">one</div>"#);
}

#[test]
fn commands_leave_no_adjacent_text_nodes() {
    let mut editor = editor("one<!-- note -->two<br>three<div>four</div>five");
    select(&mut editor, "one", "five");

    editor.mirror_direction().unwrap();

    assert_no_adjacent_text(editor.document());
    assert_eq!(
        html(&editor),
        "<div style=\"direction: rtl\">onetwo<br></div>\
         <div style=\"direction: rtl\">three</div>\
         <div style=\"direction: rtl\">four</div>\
         <div style=\"direction: rtl\">five</div>"
    );
}

// ============================================================================
// Tables
// ============================================================================

const TABLE: &str = "<table><tbody><tr><td>a1</td><td>a2</td></tr>\
                     <tr><td>b1</td><td>b2</td></tr></tbody></table>";

fn table_direction(editor: &BidiEditor) -> Option<Direction> {
    let table = editor.document().nodes_with_tag(Tag::Table)[0];
    editor.document().style(table).direction
}

#[test]
fn partly_selected_table_keeps_its_direction() {
    let mut editor = editor(TABLE);
    select(&mut editor, "a1", "a2");

    let blocks = editor.set_direction(Direction::Rtl).unwrap().unwrap();

    assert_eq!(blocks.cells.len(), 2);
    assert_eq!(table_direction(&editor), None);
    let b2 = block_of(&editor, "b2");
    assert_eq!(editor.document().style(b2).direction, None);
}

#[test]
fn fully_selected_table_flips_as_a_unit() {
    let mut editor = editor(TABLE);
    select(&mut editor, "a1", "b2");

    editor.mirror_direction().unwrap();

    assert_eq!(table_direction(&editor), Some(Direction::Rtl));
    for cell in editor.document().nodes_with_tag(Tag::Td) {
        assert_eq!(editor.document().style(cell).direction, Some(Direction::Rtl));
    }
}

// ============================================================================
// Selection handling
// ============================================================================

#[test]
fn without_a_range_nothing_changes() {
    let source = "loose<div>block</div>";
    let mut editor = editor(source);

    assert_eq!(editor.set_direction(Direction::Rtl), Ok(None));
    assert_eq!(editor.mirror_direction(), Ok(None));
    assert_eq!(html(&editor), source);
    assert_eq!(editor.selection().active_range(), None);
}

#[test]
fn collapsed_selection_stays_at_the_same_text_position() {
    let mut editor = editor("Hello");
    let text = editor.document().find_text("Hello").unwrap();
    editor.set_selection(Some(Range::collapsed_at(Position::new(text, 2))));

    editor.set_direction(Direction::Rtl).unwrap();

    let range = editor.selection().active_range().unwrap();
    assert!(range.is_collapsed());
    assert_eq!(range.start, Position::new(text, 2));
    assert_eq!(editor.document().parent(text), Some(block_of(&editor, "Hello")));
}

#[test]
fn selection_keeps_pointing_at_text_moved_into_wrappers() {
    let mut editor = editor("first<br>second");
    select(&mut editor, "first", "second");

    editor.set_alignment(Alignment::Center).unwrap();

    let range = editor.selection().active_range().unwrap();
    let doc = editor.document();
    assert_eq!(doc.text(range.start.container), "first");
    assert_eq!(doc.text(range.end.container), "second");
    assert_eq!(range.end.offset, 6);
}

#[test]
fn groups_follow_the_engine_ordering() {
    let source = "<div>top</div><ul><li>item</li></ul>";

    let mut standard = editor(source);
    select(&mut standard, "top", "item");
    let blocks = standard.set_direction(Direction::Rtl).unwrap().unwrap();
    assert!(!blocks.is_single_group());
    let item = block_of(&standard, "item");
    let top = block_of(&standard, "top");
    assert_eq!(blocks.groups, vec![vec![item], vec![top]]);

    let config = BidiConfig::default().with_profile(EngineProfile::StyleLosingFormat);
    let mut webkit = editor_with(source, config);
    select(&mut webkit, "top", "item");
    let blocks = webkit.set_direction(Direction::Rtl).unwrap().unwrap();
    let item = block_of(&webkit, "item");
    let top = block_of(&webkit, "top");
    assert_eq!(blocks.groups, vec![vec![top], vec![item]]);
}

#[test]
fn list_type_change_compares_the_parent_list() {
    let editor = editor("<ul><li>a</li></ul><ol><li>b</li></ol>");
    let a = block_of(&editor, "a");
    let b = block_of(&editor, "b");
    let doc = editor.document();

    assert!(is_list_type_change(doc, a, ListKind::Ordered));
    assert!(!is_list_type_change(doc, a, ListKind::Unordered));
    assert!(is_list_type_change(doc, b, ListKind::Unordered));
    assert!(!is_list_type_change(doc, doc.root(), ListKind::Ordered));
}

// ============================================================================
// Alignment and explicit direction
// ============================================================================

#[test]
fn alignment_replaces_align_attributes() {
    let mut editor = editor(r#"<p align="left">a</p><center>b</center>"#);
    select(&mut editor, "a", "b");

    editor.set_alignment(Alignment::Right).unwrap();

    assert_eq!(
        html(&editor),
        r#"<p style="text-align: right">a</p><center><div style="text-align: right">b</div></center>"#
    );
}

#[test]
fn center_blocks_keep_their_alignment() {
    let mut classifier = crate::tree::Classifier::default();
    classifier.line_text.insert(Tag::Center);
    let config = BidiConfig {
        classifier: Some(classifier),
        ..BidiConfig::default()
    };
    let mut editor = editor_with("<center>mid</center>", config);
    select(&mut editor, "mid", "mid");

    editor.set_alignment(Alignment::Left).unwrap();
    editor.set_direction(Direction::Rtl).unwrap();

    assert_eq!(html(&editor), r#"<center style="direction: rtl">mid</center>"#);
}

#[test]
fn explicit_direction_filter_covers_the_whole_document() {
    let mut editor = editor(r#"<div>a</div><p dir="rtl">b</p><ul><li>c</li></ul>"#);

    let blocks = editor.explicit_direction_filter().unwrap().unwrap();

    assert_eq!(blocks.len(), 3);
    assert_eq!(
        html(&editor),
        r#"<div style="direction: ltr">a</div><p style="direction: rtl">b</p><ul><li style="direction: ltr">c</li></ul>"#
    );
}

#[test]
fn direction_at_selection_reads_the_enclosing_block() {
    let mut editor = editor(r#"<div dir="rtl"><strong>bold</strong> text</div><div>plain</div>"#);
    assert_eq!(editor.direction_at_selection(), None);

    select(&mut editor, "bold", "bold");
    assert_eq!(editor.direction_at_selection(), Some(Direction::Rtl));

    select(&mut editor, "plain", "plain");
    assert_eq!(editor.direction_at_selection(), Some(Direction::Ltr));
}

#[test]
fn typed_text_sets_the_direction_of_its_paragraph() {
    let mut editor = editor("<div>\u{5e9}\u{5dc}\u{5d5}\u{5dd} hello</div><div>hello</div>");
    select(&mut editor, "\u{5e9}", "\u{5e9}");

    editor.apply_typed_direction().unwrap();

    let hebrew = block_of(&editor, "\u{5e9}");
    assert_eq!(editor.document().style(hebrew).direction, Some(Direction::Rtl));

    let latin = editor.document().children(editor.document().root())[1];
    let text = editor.document().children(latin)[0];
    editor.set_selection(Some(Range::collapsed_at(Position::new(text, 0))));
    editor.apply_typed_direction().unwrap();
    assert_eq!(editor.document().style(latin).direction, Some(Direction::Ltr));
}

// ============================================================================
// Command parsing
// ============================================================================

#[test]
fn parses_command_names() {
    assert_eq!("ltr".parse(), Ok(Command::SetDirection(Direction::Ltr)));
    assert_eq!(" RTL ".parse(), Ok(Command::SetDirection(Direction::Rtl)));
    assert_eq!("mirror".parse(), Ok(Command::MirrorDirection));
    assert_eq!("center".parse(), Ok(Command::SetAlignment(Alignment::Center)));
    assert_eq!("explicitdir".parse(), Ok(Command::CaptureExplicitDirection));
    assert_eq!("prepareformat:<p>".parse(), Ok(Command::PrepareFormat(Tag::P)));
    assert_eq!("formatblock:h2".parse(), Ok(Command::CommitFormat(Tag::Heading(2))));
}

#[test]
fn unknown_commands_are_reported() {
    assert_eq!(
        "bold".parse::<Command>(),
        Err(BidiError::UnknownCommand("bold".to_string()))
    );
    assert_eq!(
        "formatblock:blink".parse::<Command>(),
        Err(BidiError::UnknownCommand("formatblock:blink".to_string()))
    );
    assert!("prepareformat".parse::<Command>().is_err());
}

#[test]
fn command_names_survive_display() {
    for command in [
        Command::SetDirection(Direction::Rtl),
        Command::MirrorDirection,
        Command::SetAlignment(Alignment::Left),
        Command::CaptureExplicitDirection,
        Command::PrepareFormat(Tag::Pre),
    ] {
        assert_eq!(command.to_string().parse(), Ok(command));
    }
}
