//! Conversion of tdoc documents (FTML or Markdown) into the paragraph tree.

use std::io::Cursor;

use log::debug;
use tdoc::{ChecklistItem, InlineStyle, Paragraph, Span};
use thiserror::Error;

use crate::{
    config::BidiConfig,
    text::detect_direction,
    tree::{Document, NodeId, Tag},
};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to parse FTML: {0}")]
    Ftml(String),
    #[error("failed to parse Markdown: {0}")]
    Markdown(String),
}

pub fn parse_ftml(source: &str, config: &BidiConfig) -> Result<Document, ImportError> {
    let parsed =
        tdoc::parse(Cursor::new(source)).map_err(|err| ImportError::Ftml(err.to_string()))?;
    Ok(document_from_tdoc(&parsed, config))
}

pub fn parse_markdown(source: &str, config: &BidiConfig) -> Result<Document, ImportError> {
    let parsed = tdoc::markdown::parse(Cursor::new(source))
        .map_err(|err| ImportError::Markdown(err.to_string()))?;
    Ok(document_from_tdoc(&parsed, config))
}

pub fn document_from_tdoc(source: &tdoc::Document, config: &BidiConfig) -> Document {
    let mut importer = Importer {
        doc: Document::new().with_root_direction(config.root_direction),
        auto_direction: config.auto_direction,
    };
    let root = importer.doc.root();
    for paragraph in &source.paragraphs {
        importer.paragraph(root, paragraph);
    }
    debug!(
        "imported {} paragraph(s) into {} node(s)",
        source.paragraphs.len(),
        importer.doc.descendants(root).len()
    );
    importer.doc
}

struct Importer {
    doc: Document,
    auto_direction: bool,
}

impl Importer {
    fn paragraph(&mut self, parent: NodeId, paragraph: &Paragraph) {
        match paragraph {
            Paragraph::Text { content } => self.leaf(parent, Tag::P, content),
            Paragraph::Header1 { content } => self.leaf(parent, Tag::Heading(1), content),
            Paragraph::Header2 { content } => self.leaf(parent, Tag::Heading(2), content),
            Paragraph::Header3 { content } => self.leaf(parent, Tag::Heading(3), content),
            Paragraph::CodeBlock { content } => self.leaf(parent, Tag::Pre, content),
            Paragraph::Quote { children } => {
                let quote = self.element(parent, Tag::Blockquote);
                for child in children {
                    self.paragraph(quote, child);
                }
            }
            Paragraph::OrderedList { entries } => self.list(parent, Tag::Ol, entries),
            Paragraph::UnorderedList { entries } => self.list(parent, Tag::Ul, entries),
            Paragraph::Checklist { items } => self.checklist(parent, items),
        }
    }

    fn element(&mut self, parent: NodeId, tag: Tag) -> NodeId {
        let node = self.doc.create_element(tag);
        self.doc.append_child(parent, node);
        node
    }

    fn leaf(&mut self, parent: NodeId, tag: Tag, content: &[Span]) {
        let block = self.element(parent, tag);
        self.spans(block, content);
        self.detect(block);
    }

    /// A list entry made of a single text paragraph becomes bare item content.
    fn list(&mut self, parent: NodeId, tag: Tag, entries: &[Vec<Paragraph>]) {
        let list = self.element(parent, tag);
        for entry in entries {
            let item = self.element(list, Tag::Li);
            match entry.as_slice() {
                [Paragraph::Text { content }] => {
                    self.spans(item, content);
                    self.detect(item);
                }
                paragraphs => {
                    for paragraph in paragraphs {
                        self.paragraph(item, paragraph);
                    }
                }
            }
        }
    }

    fn checklist(&mut self, parent: NodeId, items: &[ChecklistItem]) {
        let list = self.element(parent, Tag::Ul);
        for item in items {
            let node = self.element(list, Tag::Li);
            let mark = if item.checked { "[x] " } else { "[ ] " };
            let text = self.doc.create_text(mark);
            self.doc.append_child(node, text);
            self.spans(node, &item.content);
            self.detect(node);
            if !item.children.is_empty() {
                self.checklist(node, &item.children);
            }
        }
    }

    fn spans(&mut self, parent: NodeId, spans: &[Span]) {
        for span in spans {
            let target = match inline_tag(span.style) {
                Some(tag) => {
                    let node = self.element(parent, tag);
                    if tag == Tag::A
                        && let Some(href) = &span.link_target
                    {
                        self.doc.set_attribute(node, "href", href);
                    }
                    node
                }
                None => parent,
            };
            self.text(target, &span.text);
            self.spans(target, &span.children);
        }
        self.doc.normalize_text(parent);
    }

    /// Appends `text`, turning embedded newlines into line breaks.
    fn text(&mut self, parent: NodeId, text: &str) {
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                self.element(parent, Tag::Br);
            }
            if !line.is_empty() {
                let node = self.doc.create_text(line);
                self.doc.append_child(parent, node);
            }
        }
    }

    fn detect(&mut self, block: NodeId) {
        if !self.auto_direction {
            return;
        }
        if let Some(direction) = detect_direction(&self.doc.text_content(block)) {
            self.doc.style_mut(block).direction = Some(direction);
        }
    }
}

fn inline_tag(style: InlineStyle) -> Option<Tag> {
    match style {
        InlineStyle::None => None,
        InlineStyle::Bold => Some(Tag::Strong),
        InlineStyle::Italic => Some(Tag::Em),
        InlineStyle::Underline => Some(Tag::U),
        InlineStyle::Strike => Some(Tag::S),
        InlineStyle::Highlight => Some(Tag::Mark),
        InlineStyle::Code => Some(Tag::Code),
        InlineStyle::Link => Some(Tag::A),
    }
}
