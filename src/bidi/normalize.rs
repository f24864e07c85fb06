use std::collections::HashMap;

use log::debug;

use crate::tree::{Alignment, Classifier, Direction, Document, NodeId};

/// Style a block had before a host format primitive ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapturedStyle {
    pub direction: Direction,
    pub alignment: Option<Alignment>,
}

/// Post-processing passes that tidy up after block formatting.
#[derive(Debug, Default)]
pub struct Normalizer {
    marked: Vec<NodeId>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `node` for removal by [`Normalizer::cleanup`]. Its children survive.
    pub fn mark(&mut self, node: NodeId) {
        if !self.marked.contains(&node) {
            self.marked.push(node);
        }
    }

    pub fn is_marked(&self, node: NodeId) -> bool {
        self.marked.contains(&node)
    }

    /// Splices every list that directly follows a list of the same kind into it.
    pub fn merge_adjacent_lists(&mut self, doc: &mut Document) -> bool {
        let lists: Vec<NodeId> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|node| doc.tag(*node).is_list())
            .collect();
        let mut merged = false;
        for list in lists {
            if self.is_marked(list) || !doc.is_attached(list) {
                continue;
            }
            let tag = doc.tag(list);
            let mut sibling = doc.next_sibling(list);
            while let Some(next) = sibling.filter(|next| doc.has_tag(*next, tag)) {
                while let Some(child) = doc.first_child(next) {
                    doc.append_child(list, child);
                    merged = true;
                }
                self.mark(next);
                sibling = doc.next_sibling(next);
            }
        }
        if merged {
            debug!("merged adjacent lists");
        }
        merged
    }

    /// Removes marked nodes after moving their children to where they stood, drops
    /// lists left without items, and promotes styles of leftover markers onto the block
    /// they belonged to.
    pub fn cleanup(
        &mut self,
        doc: &mut Document,
        classifier: &Classifier,
        markers: &mut HashMap<NodeId, CapturedStyle>,
    ) {
        let mut touched = Vec::new();
        for node in std::mem::take(&mut self.marked) {
            if !doc.is_alive(node) {
                continue;
            }
            if let Some(parent) = doc.parent(node) {
                touched.push(parent);
            }
            doc.unwrap_node(node);
        }

        let mut leftovers: Vec<(NodeId, CapturedStyle)> = markers.drain().collect();
        leftovers.sort_by_key(|(marker, _)| *marker);
        for (marker, captured) in leftovers {
            if !doc.is_attached(marker) {
                continue;
            }
            if let Some(target) = promotion_target(doc, classifier, marker) {
                let style = doc.style_mut(target);
                if style.direction.is_none() {
                    style.direction = Some(captured.direction);
                }
                if style.alignment.is_none() {
                    style.alignment = captured.alignment;
                }
            }
            if let Some(parent) = doc.parent(marker) {
                touched.push(parent);
            }
            doc.unwrap_node(marker);
        }

        let empty_lists: Vec<NodeId> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|node| classifier.is_list_container(doc, *node) && !doc.has_children(*node))
            .collect();
        for list in empty_lists {
            doc.remove_node(list);
        }

        for parent in touched {
            if doc.is_alive(parent) {
                doc.normalize_text(parent);
            }
        }
    }
}

/// Block whose style a leftover marker describes: the block right after it, or else the
/// element holding it.
fn promotion_target(doc: &Document, classifier: &Classifier, marker: NodeId) -> Option<NodeId> {
    if let Some(next) = doc.next_sibling(marker)
        && classifier.is_block(doc, next)
    {
        return Some(next);
    }
    doc.parent(marker).filter(|parent| *parent != doc.root())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tree::{Tag, markup};

    #[test]
    fn merges_runs_of_same_kind_lists() {
        let mut doc = markup::parse(
            "<ul><li>a</li></ul><ul><li>b</li></ul><ol><li>c</li></ol><ol><li>d</li></ol>",
        )
        .unwrap();
        let mut normalizer = Normalizer::new();
        assert!(normalizer.merge_adjacent_lists(&mut doc));
        normalizer.cleanup(&mut doc, &Classifier::default(), &mut HashMap::new());

        assert_eq!(
            markup::serialize(&doc),
            "<ul><li>a</li><li>b</li></ul><ol><li>c</li><li>d</li></ol>"
        );
    }

    #[test]
    fn cleanup_keeps_children_of_marked_nodes() {
        let mut doc = markup::parse("<div>x<span>y</span>z</div>").unwrap();
        let div = doc.children(doc.root())[0];
        let span = doc.children(div)[1];
        let mut normalizer = Normalizer::new();
        normalizer.mark(span);
        normalizer.cleanup(&mut doc, &Classifier::default(), &mut HashMap::new());

        assert_eq!(markup::serialize(&doc), "<div>xyz</div>");
        assert_eq!(doc.children(div).len(), 1);
    }

    #[test]
    fn leftover_marker_styles_the_following_block_without_overriding() {
        let mut doc = markup::parse(
            r#"<div><marker></marker><p style="text-align: center">a</p></div>"#,
        )
        .unwrap();
        let div = doc.children(doc.root())[0];
        let marker = doc.children(div)[0];
        let para = doc.children(div)[1];
        let mut markers = HashMap::from([(
            marker,
            CapturedStyle {
                direction: Direction::Rtl,
                alignment: Some(Alignment::Left),
            },
        )]);

        Normalizer::new().cleanup(&mut doc, &Classifier::default(), &mut markers);

        assert!(!doc.is_alive(marker));
        assert_eq!(doc.style(para).direction, Some(Direction::Rtl));
        assert_eq!(doc.style(para).alignment, Some(Alignment::Center));
        assert!(markers.is_empty());
    }

    #[test]
    fn removes_lists_left_empty() {
        let mut doc = markup::parse("<ul></ul><p>x</p>").unwrap();
        Normalizer::new().cleanup(&mut doc, &Classifier::default(), &mut HashMap::new());
        let tags: Vec<Tag> = doc.children(doc.root()).iter().map(|c| doc.tag(*c)).collect();
        assert_eq!(tags, vec![Tag::P]);
    }
}
