//! Reading and writing documents as HTML.
//!
//! Parsing goes through html5ever, so the usual HTML recovery rules apply (implied
//! `tbody`, auto-closed paragraphs). Elements must come from the [`Tag`] vocabulary; a
//! `style` attribute is read for `direction`, `text-align`, `margin-left` and
//! `margin-right`. Whitespace-only text containing a newline is treated as source
//! formatting and dropped. The `<body>` attributes describe the root.

use html5ever::{parse_document, tendril::TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use thiserror::Error;

use super::{Document, NodeId, Style, Tag};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unknown tag `{name}`")]
    UnknownTag { name: String },
    #[error("failed to read markup: {0}")]
    Read(String),
}

/// Parses `markup` into a fresh document.
pub fn parse(markup: &str) -> Result<Document, MarkupError> {
    let mut doc = Document::new();
    let root = doc.root();
    parse_into(&mut doc, root, markup)?;
    if let Some(direction) = doc
        .attribute(root, "dir")
        .and_then(|value| value.parse().ok())
        .or(doc.style(root).direction)
    {
        doc.set_root_direction(direction);
    }
    Ok(doc)
}

/// Parses `markup` and appends the resulting nodes to `parent`.
pub fn parse_into(doc: &mut Document, parent: NodeId, markup: &str) -> Result<(), MarkupError> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut markup.as_bytes())
        .map_err(|err| MarkupError::Read(err.to_string()))?;

    let mut builder = TreeBuilder { doc, parent };
    builder.document(&dom.document)
}

/// Copies an html5ever DOM into the arena.
struct TreeBuilder<'a> {
    doc: &'a mut Document,
    parent: NodeId,
}

impl TreeBuilder<'_> {
    fn document(&mut self, handle: &Handle) -> Result<(), MarkupError> {
        for child in handle.children.borrow().iter() {
            match &child.data {
                NodeData::Element { name, .. } if name.local.as_ref() == "html" => {
                    self.html(child)?;
                }
                _ => self.node(self.parent, child)?,
            }
        }
        Ok(())
    }

    /// `head` holds nothing for the tree; `body` content goes under the target parent.
    fn html(&mut self, handle: &Handle) -> Result<(), MarkupError> {
        for child in handle.children.borrow().iter() {
            match &child.data {
                NodeData::Element { name, attrs, .. } => match name.local.as_ref() {
                    "head" => {}
                    "body" => {
                        if self.parent == self.doc.root() {
                            self.attributes(self.parent, &attrs.borrow());
                        }
                        self.children(self.parent, child)?;
                    }
                    _ => self.node(self.parent, child)?,
                },
                _ => self.node(self.parent, child)?,
            }
        }
        Ok(())
    }

    fn children(&mut self, parent: NodeId, handle: &Handle) -> Result<(), MarkupError> {
        for child in handle.children.borrow().iter() {
            self.node(parent, child)?;
        }
        Ok(())
    }

    fn node(&mut self, parent: NodeId, handle: &Handle) -> Result<(), MarkupError> {
        match &handle.data {
            NodeData::Element { name, attrs, .. } => {
                let name = name.local.as_ref();
                let tag = Tag::from_name(name)
                    .filter(|tag| !matches!(tag, Tag::Root | Tag::Text | Tag::Comment))
                    .ok_or_else(|| MarkupError::UnknownTag {
                        name: name.to_string(),
                    })?;
                let node = self.doc.create_element(tag);
                self.attributes(node, &attrs.borrow());
                self.doc.append_child(parent, node);
                self.children(node, handle)
            }
            NodeData::Text { contents } => {
                let text = contents.borrow();
                if text.trim().is_empty() && text.contains('\n') {
                    return Ok(());
                }
                let node = self.doc.create_text(&text);
                self.doc.append_child(parent, node);
                Ok(())
            }
            NodeData::Comment { contents } => {
                let node = self.doc.create_comment(contents);
                self.doc.append_child(parent, node);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn attributes(&mut self, node: NodeId, attrs: &[html5ever::Attribute]) {
        for attr in attrs {
            let name = attr.name.local.as_ref();
            if name == "style" {
                self.doc.set_style(node, Style::parse_declarations(&attr.value));
            } else {
                self.doc.set_attribute(node, name, &attr.value);
            }
        }
    }
}

fn encode_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\u{a0}', "&nbsp;")
}

/// Serializes the children of the root.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    for child in doc.children(doc.root()) {
        write_node(doc, *child, &mut out);
    }
    out
}

/// Serializes `node` including its own tag.
pub fn serialize_node(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, &mut out);
    out
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    match doc.tag(node) {
        Tag::Text => out.push_str(&encode_text(doc.text(node))),
        Tag::Comment => {
            out.push_str("<!--");
            out.push_str(doc.text(node));
            out.push_str("-->");
        }
        tag => {
            out.push('<');
            out.push_str(tag.name());
            for (name, value) in doc.attributes(node) {
                out.push_str(&format!(" {name}=\"{}\"", encode_text(value).replace('"', "&quot;")));
            }
            let style = doc.style(node);
            if !style.is_empty() {
                out.push_str(&format!(" style=\"{}\"", style.to_declarations()));
            }
            out.push('>');
            if tag == Tag::Br {
                return;
            }
            for child in doc.children(node) {
                write_node(doc, *child, out);
            }
            out.push_str("</");
            out.push_str(tag.name());
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Alignment, Direction};

    #[test]
    fn parses_nested_elements_with_style() {
        let doc = parse(r#"<div dir="ltr" style="text-align: center">Hello<br>World</div>"#)
            .unwrap();
        let div = doc.children(doc.root())[0];
        assert_eq!(doc.tag(div), Tag::Div);
        assert_eq!(doc.attribute(div, "dir"), Some("ltr"));
        assert_eq!(doc.style(div).alignment, Some(Alignment::Center));
        let tags: Vec<Tag> = doc.children(div).iter().map(|c| doc.tag(*c)).collect();
        assert_eq!(tags, vec![Tag::Text, Tag::Br, Tag::Text]);
    }

    #[test]
    fn body_sets_root_direction() {
        let doc = parse(r#"<body dir="rtl">abc</body>"#).unwrap();
        assert_eq!(doc.root_direction(), Direction::Rtl);
        assert_eq!(doc.text_content(doc.root()), "abc");
    }

    #[test]
    fn drops_formatting_whitespace_and_keeps_comments() {
        let doc = parse("<ul>\n  <li>one</li>\n  <!--x--><li>two</li>\n</ul>").unwrap();
        let list = doc.children(doc.root())[0];
        let tags: Vec<Tag> = doc.children(list).iter().map(|c| doc.tag(*c)).collect();
        assert_eq!(tags, vec![Tag::Li, Tag::Comment, Tag::Li]);
    }

    #[test]
    fn serializes_what_it_parses() {
        let source = r#"<p align="right" style="direction: rtl; margin-right: 40px">a &amp; b&nbsp;</p><!--c-->"#;
        let doc = parse(source).unwrap();
        assert_eq!(serialize(&doc), source);
    }

    #[test]
    fn recovers_like_a_browser() {
        let doc = parse("<div><p>x</div><table><tr><td>c</td></tr></table>").unwrap();
        assert_eq!(
            serialize(&doc),
            "<div><p>x</p></div><table><tbody><tr><td>c</td></tr></tbody></table>"
        );
    }

    #[test]
    fn leading_comment_lands_under_the_root() {
        let doc = parse("<!--note-->").unwrap();
        let children = doc.children(doc.root());
        assert_eq!(children.len(), 1);
        assert_eq!(doc.tag(children[0]), Tag::Comment);
        assert_eq!(doc.text(children[0]), "note");
    }

    #[test]
    fn rejects_tags_outside_the_vocabulary() {
        assert_eq!(
            parse("<blink>x</blink>").err(),
            Some(MarkupError::UnknownTag {
                name: "blink".to_string()
            })
        );
    }
}
