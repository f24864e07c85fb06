use pretty_assertions::assert_eq;

use super::*;
use crate::{
    config::{BidiConfig, BlockMode, NBSP},
    tree::{Direction, Document, markup},
};

fn with_context<R>(
    doc: &mut Document,
    config: &BidiConfig,
    f: impl FnOnce(&mut CommandContext<'_>) -> R,
) -> R {
    let classifier = config.classifier();
    let mut ctx = CommandContext::new(doc, &classifier, config);
    f(&mut ctx)
}

fn root_children(doc: &Document) -> Vec<NodeId> {
    doc.children(doc.root()).to_vec()
}

#[test]
fn line_breaks_split_a_root_run_into_wrappers() {
    let mut doc = markup::parse("Hello<br>big<br>World")
        .unwrap()
        .with_root_direction(Direction::Rtl);
    let config = BidiConfig::default();
    let children = root_children(&doc);
    let root = doc.root();

    let wrappers = with_context(&mut doc, &config, |ctx| {
        repack_inline_run(ctx, children[0], children[4], root)
    });

    assert_eq!(wrappers.len(), 3);
    assert_eq!(root_children(&doc), wrappers);
    assert_eq!(
        markup::serialize(&doc),
        "<div style=\"direction: rtl\">Hello<br></div>\
         <div style=\"direction: rtl\">big<br></div>\
         <div style=\"direction: rtl\">World</div>"
    );
}

#[test]
fn wrapped_text_reads_the_same_as_before() {
    let source = "one <strong>two</strong> three<br>four";
    let mut doc = markup::parse(source).unwrap();
    let before = doc.text_content(doc.root());
    let config = BidiConfig::default();
    let children = root_children(&doc);
    let last = *children.last().unwrap();
    let root = doc.root();

    let wrappers = with_context(&mut doc, &config, |ctx| {
        repack_inline_run(ctx, children[0], last, root)
    });

    let after: String = wrappers.iter().map(|w| doc.text_content(*w)).collect();
    assert_eq!(after, before);
}

#[test]
fn lone_line_break_gets_a_placeholder() {
    let mut doc = markup::parse("<br>").unwrap();
    let config = BidiConfig::default();
    let br = root_children(&doc)[0];
    let root = doc.root();

    let wrappers = with_context(&mut doc, &config, |ctx| repack_inline_run(ctx, br, br, root));

    assert_eq!(wrappers.len(), 1);
    let children = doc.children(wrappers[0]).to_vec();
    assert_eq!(doc.text(children[0]), NBSP);
    assert_eq!(doc.tag(children[1]), Tag::Br);
}

#[test]
fn comments_are_replaced_by_the_placeholder() {
    let mut doc = markup::parse("<!--note-->").unwrap();
    let config = BidiConfig::default();
    let comment = root_children(&doc)[0];
    let root = doc.root();

    let wrappers = with_context(&mut doc, &config, |ctx| {
        repack_inline_run(ctx, comment, comment, root)
    });

    assert!(!doc.is_alive(comment));
    assert_eq!(doc.text_content(wrappers[0]), NBSP);
}

#[test]
fn adjacent_text_fragments_are_merged() {
    let mut doc = Document::new();
    let root = doc.root();
    let a = doc.create_text("ab");
    let b = doc.create_text("cd");
    doc.append_child(root, a);
    doc.append_child(root, b);
    let config = BidiConfig::default();

    let wrappers = with_context(&mut doc, &config, |ctx| repack_inline_run(ctx, a, b, root));

    assert_eq!(doc.children(wrappers[0]), &[a]);
    assert_eq!(doc.text(a), "abcd");
}

#[test]
fn wrapper_copies_style_of_preceding_element() {
    let mut doc = markup::parse(
        r#"<blockquote><p style="direction: rtl; text-align: center">a</p>tail</blockquote>"#,
    )
    .unwrap();
    let config = BidiConfig::default().with_block_mode(BlockMode::P);
    let quote = root_children(&doc)[0];

    with_context(&mut doc, &config, |ctx| rebuild_block(ctx, quote));

    assert_eq!(
        markup::serialize(&doc),
        "<blockquote><p style=\"direction: rtl; text-align: center\">a</p>\
         <p style=\"direction: rtl; text-align: center\">tail</p></blockquote>"
    );
}

#[test]
fn rebuild_wraps_trailing_run_of_mixed_text_block() {
    let mut doc = markup::parse(r#"<div style="direction: rtl"><p>a</p>tail</div>"#).unwrap();
    let config = BidiConfig::default();
    let div = root_children(&doc)[0];

    with_context(&mut doc, &config, |ctx| rebuild_block(ctx, div));

    let tags: Vec<Tag> = doc.children(div).iter().map(|c| doc.tag(*c)).collect();
    assert_eq!(tags, vec![Tag::P, Tag::Div]);
    let wrapper = doc.children(div)[1];
    assert_eq!(doc.style(wrapper).direction, None);
    assert_eq!(doc.text_content(wrapper), "tail");
}

#[test]
fn rebuild_leaves_plain_text_blocks_alone() {
    let source = "<p>just <em>text</em></p>";
    let mut doc = markup::parse(source).unwrap();
    let config = BidiConfig::default();
    let para = root_children(&doc)[0];

    with_context(&mut doc, &config, |ctx| rebuild_block(ctx, para));

    assert_eq!(markup::serialize(&doc), source);
}

#[test]
fn rebuild_wraps_loose_root_content_between_blocks() {
    let mut doc = markup::parse("lead<p>middle</p>tail").unwrap();
    let config = BidiConfig::default();
    let root = doc.root();

    with_context(&mut doc, &config, |ctx| rebuild_block(ctx, root));

    assert_eq!(
        markup::serialize(&doc),
        "<div style=\"direction: ltr\">lead</div><p>middle</p><div style=\"direction: ltr\">tail</div>"
    );
}
