//! Plain text in and out of a [`Document`]: one paragraph block per line.

use unicode_bidi::{BidiClass, bidi_class};

use crate::{
    config::BidiConfig,
    tree::{Direction, Document, NodeKind},
};

/// Direction of the first strong character in `text`, if there is one.
pub fn detect_direction(text: &str) -> Option<Direction> {
    text.chars().find_map(|ch| match bidi_class(ch) {
        BidiClass::L => Some(Direction::Ltr),
        BidiClass::R | BidiClass::AL => Some(Direction::Rtl),
        _ => None,
    })
}

/// Builds a document holding one block per line of `text`. With `auto_direction` each block
/// gets the direction of its first strong character, or the root direction.
pub fn document_from_plain_text(text: &str, config: &BidiConfig) -> Document {
    let mut doc = Document::new().with_root_direction(config.root_direction);
    let root = doc.root();
    for line in text.lines() {
        let block = doc.create_element(config.block_mode.tag());
        if !line.is_empty() {
            let content = doc.create_text(line);
            doc.append_child(block, content);
        }
        if config.auto_direction {
            doc.style_mut(block).direction =
                Some(detect_direction(line).unwrap_or(config.root_direction));
        }
        doc.append_child(root, block);
    }
    doc
}

/// Text of every top-level node, one line each. Line breaks inside a block become
/// newlines; a break closing a block does not add an empty line.
pub fn plain_text(doc: &Document) -> String {
    let mut out = String::new();
    for &child in doc.children(doc.root()) {
        if doc.kind(child) == NodeKind::Comment {
            continue;
        }
        let content = doc.text_content(child);
        out.push_str(content.strip_suffix('\n').unwrap_or(&content));
        out.push('\n');
    }
    out
}
