use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::range::{Position, Range, RangeError};

mod classify;
pub mod markup;
mod style;

pub use classify::Classifier;
pub use style::{
    Alignment, Direction, ResolvedStyle, Side, Style, realign_for_direction, refine_alignment,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Block,
    Inline,
    Text,
    Comment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Tag {
    Root,
    Div,
    P,
    Heading(u8),
    Address,
    Pre,
    Dt,
    Dd,
    Center,
    Blockquote,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tfoot,
    Tr,
    Td,
    Th,
    Br,
    Span,
    Strong,
    Em,
    U,
    S,
    Mark,
    Code,
    A,
    /// Zero-content placeholder carrying captured style across a host format primitive.
    Marker,
    Text,
    Comment,
}

impl Tag {
    pub fn kind(self) -> NodeKind {
        match self {
            Tag::Text => NodeKind::Text,
            Tag::Comment => NodeKind::Comment,
            Tag::Br
            | Tag::Span
            | Tag::Strong
            | Tag::Em
            | Tag::U
            | Tag::S
            | Tag::Mark
            | Tag::Code
            | Tag::A
            | Tag::Marker => NodeKind::Inline,
            _ => NodeKind::Block,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::Root => "body",
            Tag::Div => "div",
            Tag::P => "p",
            Tag::Heading(1) => "h1",
            Tag::Heading(2) => "h2",
            Tag::Heading(3) => "h3",
            Tag::Heading(4) => "h4",
            Tag::Heading(5) => "h5",
            Tag::Heading(_) => "h6",
            Tag::Address => "address",
            Tag::Pre => "pre",
            Tag::Dt => "dt",
            Tag::Dd => "dd",
            Tag::Center => "center",
            Tag::Blockquote => "blockquote",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tfoot => "tfoot",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Br => "br",
            Tag::Span => "span",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::U => "u",
            Tag::S => "s",
            Tag::Mark => "mark",
            Tag::Code => "code",
            Tag::A => "a",
            Tag::Marker => "marker",
            Tag::Text => "#text",
            Tag::Comment => "#comment",
        }
    }

    /// Looks a tag up by element name, case-insensitively. Returns `None` for names
    /// outside the vocabulary.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        let tag = match lower.as_str() {
            "body" | "root" => Tag::Root,
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::Heading(1),
            "h2" => Tag::Heading(2),
            "h3" => Tag::Heading(3),
            "h4" => Tag::Heading(4),
            "h5" => Tag::Heading(5),
            "h6" => Tag::Heading(6),
            "address" => Tag::Address,
            "pre" => Tag::Pre,
            "dt" => Tag::Dt,
            "dd" | "de" => Tag::Dd,
            "center" => Tag::Center,
            "blockquote" => Tag::Blockquote,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tfoot" => Tag::Tfoot,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "br" => Tag::Br,
            "span" => Tag::Span,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "u" => Tag::U,
            "s" | "strike" | "del" => Tag::S,
            "mark" => Tag::Mark,
            "code" => Tag::Code,
            "a" => Tag::A,
            "marker" => Tag::Marker,
            "#text" => Tag::Text,
            "#comment" => Tag::Comment,
            _ => return None,
        };
        Some(tag)
    }

    pub fn is_list(self) -> bool {
        matches!(self, Tag::Ul | Tag::Ol)
    }

    pub fn is_cell(self) -> bool {
        matches!(self, Tag::Td | Tag::Th)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for Tag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tag::from_name(&value).ok_or_else(|| format!("unknown tag `{value}`"))
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.name().to_string()
    }
}

/// Which node survives when two adjacent text nodes are merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepNode {
    Previous,
    Next,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Anchor {
    Text { node: NodeId, offset: usize },
    Before(NodeId),
    End(NodeId),
}

#[derive(Clone, Copy, Debug)]
struct LiveRange {
    start: Anchor,
    end: Anchor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeHandle(usize);

#[derive(Clone, Debug)]
struct NodeData {
    tag: Tag,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: String,
    style: Style,
    attributes: BTreeMap<String, String>,
    alive: bool,
}

impl NodeData {
    fn new(tag: Tag) -> Self {
        Self {
            tag,
            kind: tag.kind(),
            parent: None,
            children: Vec::new(),
            text: String::new(),
            style: Style::default(),
            attributes: BTreeMap::new(),
            alive: true,
        }
    }
}

/// Arena-backed rich text tree. The root is the editing surface; every other node is
/// owned by exactly one parent.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
    root_direction: Direction,
    live_ranges: Vec<Option<LiveRange>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(Tag::Root)],
            root: NodeId(0),
            root_direction: Direction::Ltr,
            live_ranges: Vec::new(),
        }
    }

    pub fn with_root_direction(mut self, direction: Direction) -> Self {
        self.root_direction = direction;
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_direction(&self) -> Direction {
        self.root_direction
    }

    pub fn set_root_direction(&mut self, direction: Direction) {
        self.root_direction = direction;
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, tag: Tag) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(tag));
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        let id = self.create_element(Tag::Text);
        self.node_mut(id).text = text.to_string();
        id
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        let id = self.create_element(Tag::Comment);
        self.node_mut(id).text = text.to_string();
        id
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn tag(&self, id: NodeId) -> Tag {
        self.node(id).tag
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn has_tag(&self, id: NodeId, tag: Tag) -> bool {
        self.node(id).tag == tag
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.node(id).kind == NodeKind::Text
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|node| node.alive)
    }

    /// True when `id` is alive and its parent chain reaches the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.node(id).children.is_empty()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|prev| self.children(parent).get(prev).copied())
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            result.push(node);
            current = self.parent(node);
        }
        result
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        result
    }

    /// True when `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> NodeId {
        let mut current = Some(a);
        while let Some(candidate) = current {
            if self.contains(candidate, b) {
                return candidate;
            }
            current = self.parent(candidate);
        }
        self.root
    }

    /// Attached nodes with the given tag, in document order.
    pub fn nodes_with_tag(&self, tag: Tag) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.has_tag(*id, tag))
            .collect()
    }

    /// First attached text node whose text contains `needle`.
    pub fn find_text(&self, needle: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.is_text(*id) && self.text(*id).contains(needle))
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.node(id).text
    }

    pub fn text_len(&self, id: NodeId) -> usize {
        self.node(id).text.chars().count()
    }

    /// Concatenated text of all text descendants. Line breaks contribute `\n`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.tag(id) {
            Tag::Text => out.push_str(self.text(id)),
            Tag::Br => out.push('\n'),
            Tag::Comment => {}
            _ => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn style(&self, id: NodeId) -> &Style {
        &self.node(id).style
    }

    pub fn style_mut(&mut self, id: NodeId) -> &mut Style {
        &mut self.node_mut(id).style
    }

    pub fn set_style(&mut self, id: NodeId, style: Style) {
        self.node_mut(id).style = style;
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self, id: NodeId) -> &BTreeMap<String, String> {
        &self.node(id).attributes
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        self.node_mut(id)
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.node_mut(id).attributes.remove(name)
    }

    /// Changes the tag of an element in place, keeping its children and style.
    pub fn set_tag(&mut self, id: NodeId, tag: Tag) {
        let node = self.node_mut(id);
        node.tag = tag;
        node.kind = tag.kind();
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|child| *child != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Inserts `node` as child `index` of `parent`, moving it out of its previous parent.
    /// Ranges anchored to the moved node move along with it.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, node: NodeId) {
        self.unlink(node);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, node);
        self.node_mut(node).parent = Some(parent);
    }

    pub fn append_child(&mut self, parent: NodeId, node: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, node);
    }

    pub fn prepend_child(&mut self, parent: NodeId, node: NodeId) {
        self.insert_child(parent, 0, node);
    }

    /// Inserts `node` right before `reference`. Does nothing for a detached reference.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.unlink(node);
        if let Some(index) = self.index_in_parent(reference) {
            self.insert_child(parent, index, node);
        }
    }

    /// Inserts `node` right after `reference`. Does nothing for a detached reference.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.unlink(node);
        if let Some(index) = self.index_in_parent(reference) {
            self.insert_child(parent, index + 1, node);
        }
    }

    /// Deletes `id` and its subtree. Range boundaries inside the removed subtree collapse
    /// to the removal point.
    pub fn remove_node(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let replacement = match (self.next_sibling(id), self.parent(id)) {
            (Some(next), _) => Some(Anchor::Before(next)),
            (None, Some(parent)) => Some(Anchor::End(parent)),
            (None, None) => None,
        };
        let mut doomed: HashSet<NodeId> = self.descendants(id).into_iter().collect();
        doomed.insert(id);
        if let Some(replacement) = replacement {
            self.rewrite_anchors(|anchor| {
                if doomed.contains(&anchor_node(anchor)) {
                    Some(replacement)
                } else {
                    None
                }
            });
        }
        self.unlink(id);
        for node in doomed {
            self.node_mut(node).alive = false;
        }
    }

    /// Puts `new` where `old` was and deletes `old`. Ranges referring to `old` itself are
    /// redirected to `new`.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) {
        if old == new || self.parent(old).is_none() {
            return;
        }
        self.insert_before(old, new);
        self.rewrite_anchors(|anchor| match anchor {
            Anchor::Before(node) if node == old => Some(Anchor::Before(new)),
            Anchor::End(node) if node == old => Some(Anchor::End(new)),
            Anchor::Text { node, .. } if node == old => Some(Anchor::Before(new)),
            _ => None,
        });
        self.remove_node(old);
    }

    /// Moves every child of `node` in front of it and deletes the then empty `node`.
    pub fn unwrap_node(&mut self, node: NodeId) {
        while let Some(child) = self.first_child(node) {
            self.insert_before(node, child);
        }
        self.remove_node(node);
    }

    /// Merges the text sibling following `prev` into one node. Returns the survivor, or
    /// `None` when the two nodes are not adjacent text nodes.
    pub fn merge_text_with_next(&mut self, prev: NodeId, keep: KeepNode) -> Option<NodeId> {
        let next = self.next_sibling(prev)?;
        if !self.is_text(prev) || !self.is_text(next) {
            return None;
        }
        let prev_len = self.text_len(prev);
        let merged = format!("{}{}", self.text(prev), self.text(next));
        let (survivor, absorbed) = match keep {
            KeepNode::Previous => (prev, next),
            KeepNode::Next => (next, prev),
        };
        self.rewrite_anchors(|anchor| match (keep, anchor) {
            (KeepNode::Previous, Anchor::Text { node, offset }) if node == next => {
                Some(Anchor::Text {
                    node: prev,
                    offset: prev_len + offset,
                })
            }
            (KeepNode::Previous, Anchor::Before(node)) if node == next => Some(Anchor::Text {
                node: prev,
                offset: prev_len,
            }),
            (KeepNode::Next, Anchor::Text { node, offset }) if node == prev => {
                Some(Anchor::Text { node: next, offset })
            }
            (KeepNode::Next, Anchor::Text { node, offset }) if node == next => {
                Some(Anchor::Text {
                    node: next,
                    offset: prev_len + offset,
                })
            }
            (KeepNode::Next, Anchor::Before(node)) if node == next => Some(Anchor::Text {
                node: next,
                offset: prev_len,
            }),
            (KeepNode::Next, Anchor::Before(node)) if node == prev => Some(Anchor::Before(next)),
            _ => None,
        });
        self.node_mut(survivor).text = merged;
        self.unlink(absorbed);
        self.node_mut(absorbed).alive = false;
        Some(survivor)
    }

    /// Merges every run of adjacent text children of `parent` into its first node.
    pub fn normalize_text(&mut self, parent: NodeId) {
        let mut index = 0;
        while index < self.children(parent).len() {
            let child = self.children(parent)[index];
            if self.merge_text_with_next(child, KeepNode::Previous).is_none() {
                index += 1;
            }
        }
    }

    // ------------------------------------------------------------------
    // Live ranges
    // ------------------------------------------------------------------

    /// Registers `range` so that later structural edits keep it pointing at the
    /// logically equivalent place.
    pub fn track_range(&mut self, range: &Range) -> RangeHandle {
        let live = LiveRange {
            start: self.anchor_for(range.start),
            end: self.anchor_for(range.end),
        };
        self.live_ranges.push(Some(live));
        RangeHandle(self.live_ranges.len() - 1)
    }

    pub fn tracked_range(&self, handle: RangeHandle) -> Result<Range, RangeError> {
        let live = self
            .live_ranges
            .get(handle.0)
            .copied()
            .flatten()
            .ok_or(RangeError::Released)?;
        Ok(Range::new(
            self.position_for(live.start)?,
            self.position_for(live.end)?,
        ))
    }

    /// Overwrites the boundaries of a tracked range.
    pub fn retarget_range(&mut self, handle: RangeHandle, range: &Range) {
        let live = LiveRange {
            start: self.anchor_for(range.start),
            end: self.anchor_for(range.end),
        };
        if let Some(slot) = self.live_ranges.get_mut(handle.0) {
            *slot = Some(live);
        }
    }

    pub fn untrack_range(&mut self, handle: RangeHandle) -> Result<Range, RangeError> {
        let range = self.tracked_range(handle);
        if let Some(slot) = self.live_ranges.get_mut(handle.0) {
            *slot = None;
        }
        while matches!(self.live_ranges.last(), Some(None)) {
            self.live_ranges.pop();
        }
        range
    }

    fn anchor_for(&self, position: Position) -> Anchor {
        let container = position.container;
        if !self.is_alive(container) || self.is_text(container) {
            return Anchor::Text {
                node: container,
                offset: position.offset,
            };
        }
        match self.children(container).get(position.offset) {
            Some(child) => Anchor::Before(*child),
            None => Anchor::End(container),
        }
    }

    fn position_for(&self, anchor: Anchor) -> Result<Position, RangeError> {
        let node = anchor_node(anchor);
        if !self.is_attached(node) {
            return Err(RangeError::Detached(node));
        }
        match anchor {
            Anchor::Text { node, offset } => {
                let limit = if self.is_text(node) {
                    self.text_len(node)
                } else {
                    self.children(node).len()
                };
                Ok(Position::new(node, offset.min(limit)))
            }
            Anchor::Before(node) => {
                let parent = self.parent(node).ok_or(RangeError::Detached(node))?;
                let index = self
                    .index_in_parent(node)
                    .ok_or(RangeError::Detached(node))?;
                Ok(Position::new(parent, index))
            }
            Anchor::End(node) => Ok(Position::new(node, self.children(node).len())),
        }
    }

    fn rewrite_anchors<F>(&mut self, mut rewrite: F)
    where
        F: FnMut(Anchor) -> Option<Anchor>,
    {
        for live in self.live_ranges.iter_mut().flatten() {
            if let Some(anchor) = rewrite(live.start) {
                live.start = anchor;
            }
            if let Some(anchor) = rewrite(live.end) {
                live.end = anchor;
            }
        }
    }
}

fn anchor_node(anchor: Anchor) -> NodeId {
    match anchor {
        Anchor::Text { node, .. } | Anchor::Before(node) | Anchor::End(node) => node,
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tree_tests;
