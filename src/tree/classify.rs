use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Document, NodeId, NodeKind, Tag};

/// Tag tables deciding how traversal treats a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classifier {
    /// Blocks that hold a line of text and receive paragraph styles.
    pub line_text: BTreeSet<Tag>,
    /// Text blocks whose own style must follow a list item's style.
    pub line_styled: BTreeSet<Tag>,
    pub table_containers: BTreeSet<Tag>,
    pub block_containers: BTreeSet<Tag>,
}

impl Default for Classifier {
    fn default() -> Self {
        let headings = (1..=6).map(Tag::Heading);
        let line_text = [
            Tag::Div,
            Tag::P,
            Tag::Li,
            Tag::Address,
            Tag::Pre,
            Tag::Dt,
            Tag::Dd,
            Tag::Td,
            Tag::Th,
        ]
        .into_iter()
        .chain(headings.clone())
        .collect();
        let line_styled = [Tag::Address, Tag::Pre, Tag::P]
            .into_iter()
            .chain(headings)
            .collect();
        Self {
            line_text,
            line_styled,
            table_containers: [Tag::Table, Tag::Thead, Tag::Tbody, Tag::Tfoot, Tag::Tr]
                .into_iter()
                .collect(),
            block_containers: [Tag::Table, Tag::Ol, Tag::Ul, Tag::Blockquote]
                .into_iter()
                .collect(),
        }
    }
}

impl Classifier {
    /// Paragraph-like, list, list item or cell. Table rows and sections are not blocks.
    pub fn is_block(&self, doc: &Document, node: NodeId) -> bool {
        doc.kind(node) == NodeKind::Block && !self.table_containers.contains(&doc.tag(node))
    }

    pub fn is_inline_or_text(&self, doc: &Document, node: NodeId) -> bool {
        matches!(
            doc.kind(node),
            NodeKind::Inline | NodeKind::Text | NodeKind::Comment
        )
    }

    pub fn is_table_container(&self, doc: &Document, node: NodeId) -> bool {
        self.table_containers.contains(&doc.tag(node))
    }

    pub fn is_block_container(&self, doc: &Document, node: NodeId) -> bool {
        self.block_containers.contains(&doc.tag(node))
    }

    pub fn is_list_container(&self, doc: &Document, node: NodeId) -> bool {
        doc.tag(node).is_list()
    }

    pub fn is_line_text(&self, doc: &Document, node: NodeId) -> bool {
        self.line_text.contains(&doc.tag(node))
    }

    pub fn is_line_styled(&self, doc: &Document, node: NodeId) -> bool {
        self.line_styled.contains(&doc.tag(node))
    }

    /// A text-holding block other than the editing root.
    pub fn is_block_with_text(&self, doc: &Document, node: NodeId) -> bool {
        node != doc.root() && self.is_line_text(doc, node)
    }

    /// Anything an inline run cannot extend across.
    pub fn is_boundary(&self, doc: &Document, node: NodeId) -> bool {
        self.is_block(doc, node)
            || self.is_block_container(doc, node)
            || self.is_table_container(doc, node)
    }

    /// Nearest ancestor-or-self that is a block.
    pub fn block_ancestor(&self, doc: &Document, node: NodeId) -> NodeId {
        let mut current = node;
        while !self.is_block(doc, current) {
            match doc.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Nearest ancestor-or-self list item below the root, if any.
    pub fn list_item_ancestor(&self, doc: &Document, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == doc.root() {
                return None;
            }
            if doc.has_tag(id, Tag::Li) {
                return Some(id);
            }
            current = doc.parent(id);
        }
        None
    }
}
