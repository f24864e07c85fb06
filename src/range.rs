use thiserror::Error;

use crate::tree::{Document, NodeId};

/// A boundary point: a child index inside an element, or a character index inside text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub container: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(container: NodeId, offset: usize) -> Self {
        Self { container, offset }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn collapsed_at(position: Position) -> Self {
        Self::new(position, position)
    }

    /// Range covering every child of `node`.
    pub fn select_contents(doc: &Document, node: NodeId) -> Self {
        let len = if doc.is_text(node) {
            doc.text_len(node)
        } else {
            doc.children(node).len()
        };
        Self::new(Position::new(node, 0), Position::new(node, len))
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn set_start(&mut self, container: NodeId, offset: usize) {
        self.start = Position::new(container, offset);
    }

    pub fn set_end(&mut self, container: NodeId, offset: usize) {
        self.end = Position::new(container, offset);
    }

    pub fn collapse_to_start(&mut self) {
        self.end = self.start;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("range boundary node {0} is no longer attached to the document")]
    Detached(NodeId),
    #[error("tracked range was already released")]
    Released,
}

/// Source and sink of the active selection of an editing surface.
pub trait SelectionProvider {
    /// `None` when the surface has no range at all.
    fn active_range(&self) -> Option<Range>;

    fn set_active_range(&mut self, range: Option<Range>);

    fn clear(&mut self) {
        self.set_active_range(None);
    }
}

/// In-memory selection holding at most one range.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    range: Option<Range>,
}

impl Selection {
    pub fn new(range: Range) -> Self {
        Self { range: Some(range) }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl SelectionProvider for Selection {
    fn active_range(&self) -> Option<Range> {
        self.range
    }

    fn set_active_range(&mut self, range: Option<Range>) {
        self.range = range;
    }
}
