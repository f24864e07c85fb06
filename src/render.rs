use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::{
    theme::Theme,
    tree::{Alignment, Classifier, Direction, Document, NodeId, NodeKind, Tag},
};

/// Pixels per terminal column when converting margins.
pub const PIXELS_PER_COLUMN: i32 = 8;

/// Columns reserved for the direction tag in front of every line.
pub const GUTTER_WIDTH: usize = 4;

const LIST_INDENT: usize = 2;

/// Lines of one paragraph block in the rendered output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderedBlock {
    pub node: NodeId,
    pub first_line: usize,
    pub line_count: usize,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub blocks: Vec<RenderedBlock>,
    pub total_lines: usize,
}

impl RenderResult {
    /// Index into `blocks` of the block drawn on `line`.
    pub fn block_at_line(&self, line: usize) -> Option<usize> {
        self.blocks.iter().position(|block| {
            (block.first_line..block.first_line + block.line_count).contains(&line)
        })
    }
}

/// Lays out every paragraph of `doc` in `width` columns. Paragraphs in `selected` get the
/// selection style on their gutter.
pub fn render_document(
    doc: &Document,
    classifier: &Classifier,
    width: usize,
    selected: &[NodeId],
    theme: &Theme,
) -> RenderResult {
    let mut renderer = Renderer {
        doc,
        classifier,
        theme,
        selected,
        width: width.max(GUTTER_WIDTH + 1),
        lines: Vec::new(),
        blocks: Vec::new(),
    };
    renderer.render_children(doc.root(), 0);
    renderer.finish()
}

/// Leaf paragraphs in the order [`render_document`] draws them.
pub fn paragraph_blocks(doc: &Document, classifier: &Classifier) -> Vec<NodeId> {
    let mut blocks = Vec::new();
    collect_paragraphs(doc, classifier, doc.root(), &mut blocks);
    blocks
}

fn collect_paragraphs(
    doc: &Document,
    classifier: &Classifier,
    node: NodeId,
    out: &mut Vec<NodeId>,
) {
    let mut holds_inline = false;
    for &child in doc.children(node) {
        match doc.kind(child) {
            NodeKind::Block => collect_paragraphs(doc, classifier, child, out),
            NodeKind::Inline | NodeKind::Text => holds_inline = true,
            NodeKind::Comment => {}
        }
    }
    let is_leaf = !doc.has_children(node) && classifier.is_line_text(doc, node);
    if node != doc.root() && (holds_inline || is_leaf) && !out.contains(&node) {
        out.push(node);
    }
}

struct Renderer<'a> {
    doc: &'a Document,
    classifier: &'a Classifier,
    theme: &'a Theme,
    selected: &'a [NodeId],
    width: usize,
    lines: Vec<Line<'static>>,
    blocks: Vec<RenderedBlock>,
}

impl Renderer<'_> {
    fn render_children(&mut self, node: NodeId, depth: usize) {
        let mut run: Vec<FragmentItem> = Vec::new();
        let mut ordinal = 0;
        for &child in self.doc.children(node) {
            match self.doc.kind(child) {
                NodeKind::Block => {
                    if !run.is_empty() {
                        self.render_paragraph(node, std::mem::take(&mut run), None, depth);
                    }
                    if self.doc.has_tag(child, Tag::Li) {
                        ordinal += 1;
                        self.render_item(child, ordinal, depth + 1);
                    } else {
                        self.render_block(child, depth, None);
                    }
                }
                NodeKind::Inline | NodeKind::Text => {
                    collect_fragments(self.doc, self.theme, child, Style::default(), &mut run);
                }
                NodeKind::Comment => {}
            }
        }
        if !run.is_empty() {
            self.render_paragraph(node, run, None, depth);
        }
    }

    fn render_block(&mut self, block: NodeId, depth: usize, marker: Option<String>) {
        if !self.doc.has_children(block) {
            if self.classifier.is_line_text(self.doc, block) {
                self.render_paragraph(block, Vec::new(), marker, depth);
            }
            return;
        }
        if let Some(marker) = marker
            && self
                .doc
                .first_child(block)
                .is_some_and(|first| self.doc.kind(first) != NodeKind::Block)
        {
            let mut run = Vec::new();
            let mut rest = Vec::new();
            for &child in self.doc.children(block) {
                if self.doc.kind(child) == NodeKind::Block || !rest.is_empty() {
                    rest.push(child);
                } else {
                    collect_fragments(self.doc, self.theme, child, Style::default(), &mut run);
                }
            }
            self.render_paragraph(block, run, Some(marker), depth);
            for child in rest {
                self.render_block(child, depth, None);
            }
            return;
        }
        self.render_children(block, depth);
    }

    fn render_item(&mut self, item: NodeId, ordinal: usize, depth: usize) {
        let label = match self.doc.parent(item).map(|list| self.doc.tag(list)) {
            Some(Tag::Ol) => format!("{ordinal}."),
            _ => "•".to_string(),
        };
        self.render_block(item, depth, Some(label));
    }

    fn render_paragraph(
        &mut self,
        block: NodeId,
        fragments: Vec<FragmentItem>,
        marker: Option<String>,
        depth: usize,
    ) {
        let resolved = self.doc.resolved_style(block);
        let direction = resolved.direction;
        let columns = |px: i32| usize::try_from(px.max(0) / PIXELS_PER_COLUMN).unwrap_or(0);
        let indent = depth * LIST_INDENT;
        let (left_fixed, right_fixed) = match direction {
            Direction::Ltr => (
                columns(resolved.margin_left) + indent,
                columns(resolved.margin_right),
            ),
            Direction::Rtl => (
                columns(resolved.margin_left),
                columns(resolved.margin_right) + indent,
            ),
        };
        let marker_width = marker.as_deref().map_or(0, |m| visible_width(m) + 1);
        let inner = self
            .width
            .saturating_sub(GUTTER_WIDTH + left_fixed + right_fixed + marker_width)
            .max(1);

        let wrapped = wrap_fragments(&fragments, inner);
        let gutter_style = if self.selected.contains(&block) {
            self.theme.selection_style()
        } else {
            self.theme.gutter_style(direction == Direction::Rtl)
        };

        let first_line = self.lines.len();
        for (idx, segments) in wrapped.into_iter().enumerate() {
            let line_width: usize = segments.iter().map(|s| visible_width(&s.text)).sum();
            let slack = inner.saturating_sub(line_width);
            let pad = match resolved.visual_alignment() {
                Alignment::Left => 0,
                Alignment::Right => slack,
                Alignment::Center => slack / 2,
            };
            let marker_span = match (&marker, idx) {
                (Some(marker), 0) => Span::styled(
                    match direction {
                        Direction::Ltr => format!("{marker} "),
                        Direction::Rtl => format!(" {marker}"),
                    },
                    self.theme.list_marker_style(),
                ),
                _ => Span::raw(" ".repeat(marker_width)),
            };

            let mut spans = vec![
                Span::styled(
                    format!("{:<width$}", direction.as_str(), width = GUTTER_WIDTH),
                    gutter_style,
                ),
                Span::raw(" ".repeat(left_fixed)),
            ];
            if direction == Direction::Ltr && marker_width > 0 {
                spans.push(marker_span.clone());
            }
            spans.push(Span::raw(" ".repeat(pad)));
            spans.extend(segments.into_iter().map(|s| Span::styled(s.text, s.style)));
            if direction == Direction::Rtl && marker_width > 0 {
                spans.push(Span::raw(" ".repeat(slack - pad)));
                spans.push(marker_span);
            }
            spans.retain(|span| !span.content.is_empty());
            self.lines.push(Line::from(spans));
        }
        self.blocks.push(RenderedBlock {
            node: block,
            first_line,
            line_count: self.lines.len() - first_line,
        });
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            blocks: self.blocks,
            total_lines,
        }
    }
}

// ============================================================================
// Fragments and wrapping
// ============================================================================

#[derive(Clone, Debug)]
struct Segment {
    text: String,
    style: Style,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone, Debug)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
}

#[derive(Clone, Debug)]
enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

fn collect_fragments(
    doc: &Document,
    theme: &Theme,
    node: NodeId,
    base: Style,
    fragments: &mut Vec<FragmentItem>,
) {
    match doc.tag(node) {
        Tag::Text => tokenize_text(doc.text(node), base, fragments),
        Tag::Br => fragments.push(FragmentItem::LineBreak),
        Tag::Comment | Tag::Marker => {}
        tag => {
            let style = inline_style(theme, base, tag);
            for &child in doc.children(node) {
                collect_fragments(doc, theme, child, style, fragments);
            }
        }
    }
}

fn inline_style(theme: &Theme, base: Style, tag: Tag) -> Style {
    match tag {
        Tag::Strong => base.add_modifier(Modifier::BOLD),
        Tag::Em => base.add_modifier(Modifier::ITALIC),
        Tag::U => base.add_modifier(Modifier::UNDERLINED),
        Tag::S => base.add_modifier(Modifier::CROSSED_OUT),
        Tag::Mark => base.patch(theme.highlight_style()),
        Tag::Code => base.patch(theme.code_style()),
        Tag::A => base.patch(theme.link_style()),
        _ => base,
    }
}

fn tokenize_text(text: &str, style: Style, fragments: &mut Vec<FragmentItem>) {
    let mut current: Option<Fragment> = None;
    for ch in text.chars() {
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            if let Some(token) = current.take() {
                fragments.push(FragmentItem::Token(token));
            }
            fragments.push(FragmentItem::LineBreak);
            continue;
        }
        let (ch, repeat) = if ch == '\t' { (' ', 4) } else { (ch, 1) };
        let kind = if ch.is_whitespace() {
            FragmentKind::Whitespace
        } else {
            FragmentKind::Word
        };
        for _ in 0..repeat {
            match current.as_mut() {
                Some(token) if token.kind == kind => {
                    token.text.push(ch);
                    token.width += char_width(ch);
                }
                _ => {
                    if let Some(token) = current.take() {
                        fragments.push(FragmentItem::Token(token));
                    }
                    current = Some(Fragment {
                        text: ch.to_string(),
                        style,
                        kind,
                        width: char_width(ch),
                    });
                }
            }
        }
    }
    if let Some(token) = current {
        fragments.push(FragmentItem::Token(token));
    }
}

/// Greedy word wrap. Whitespace at a wrap point is dropped; a word wider than `width`
/// gets a line of its own.
fn wrap_fragments(fragments: &[FragmentItem], width: usize) -> Vec<Vec<Segment>> {
    let mut lines = Vec::new();
    let mut line: Vec<Segment> = Vec::new();
    let mut line_width = 0;
    let mut pending_whitespace: Vec<&Fragment> = Vec::new();

    for item in fragments {
        match item {
            FragmentItem::LineBreak => {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
                pending_whitespace.clear();
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => pending_whitespace.push(token),
                FragmentKind::Word => {
                    let whitespace: usize = pending_whitespace.iter().map(|f| f.width).sum();
                    if line_width > 0 && line_width + whitespace + token.width > width {
                        lines.push(std::mem::take(&mut line));
                        line_width = 0;
                        pending_whitespace.clear();
                    }
                    for fragment in pending_whitespace.drain(..) {
                        if line_width > 0 {
                            push_segment(&mut line, fragment);
                            line_width += fragment.width;
                        }
                    }
                    push_segment(&mut line, token);
                    line_width += token.width;
                }
            },
        }
    }
    lines.push(line);
    lines
}

fn push_segment(line: &mut Vec<Segment>, fragment: &Fragment) {
    match line.last_mut() {
        Some(last) if last.style == fragment.style => last.text.push_str(&fragment.text),
        _ => line.push(Segment {
            text: fragment.text.clone(),
            style: fragment.style,
        }),
    }
}

fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

fn visible_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}
