use std::collections::HashMap;

use log::{debug, trace};

use crate::{
    range::Range,
    tree::{Classifier, Document, NodeId, NodeKind, Tag, refine_alignment},
};

use super::{
    CollectedBlocks, CommandContext,
    normalize::{CapturedStyle, Normalizer},
};

/// The host's "change block tag" primitive.
pub trait FormatBlock {
    /// Turns the paragraph blocks touched by `range` into `tag` blocks.
    fn format_block(
        &mut self,
        doc: &mut Document,
        classifier: &Classifier,
        range: &Range,
        tag: Tag,
    );
}

/// Retags every innermost text block between the range boundaries. List items holding
/// bare content get a new `tag` block around it.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetagBlocks;

impl FormatBlock for RetagBlocks {
    fn format_block(
        &mut self,
        doc: &mut Document,
        classifier: &Classifier,
        range: &Range,
        tag: Tag,
    ) {
        let order = doc.descendants(doc.root());
        let candidates: Vec<NodeId> = order
            .iter()
            .copied()
            .filter(|node| is_format_candidate(doc, classifier, *node))
            .collect();
        let position = |node: NodeId| order.iter().position(|n| *n == node);

        let first = candidates
            .iter()
            .position(|c| doc.contains(*c, range.start.container))
            .or_else(|| match position(range.start.container) {
                Some(index) => candidates
                    .iter()
                    .position(|c| position(*c).is_some_and(|i| i > index)),
                None => (!candidates.is_empty()).then_some(0),
            });
        let last = candidates
            .iter()
            .position(|c| doc.contains(*c, range.end.container))
            .or_else(|| match position(range.end.container) {
                Some(index) => candidates
                    .iter()
                    .rposition(|c| position(*c).is_some_and(|i| i < index)),
                None => candidates.len().checked_sub(1),
            });
        let (Some(first), Some(last)) = (first, last) else {
            return;
        };

        for &block in candidates.iter().take(last + 1).skip(first) {
            if doc.has_tag(block, Tag::Li) {
                if !doc.has_children(block) {
                    continue;
                }
                let wrapper = doc.create_element(tag);
                while let Some(child) = doc.first_child(block) {
                    doc.append_child(wrapper, child);
                }
                doc.append_child(block, wrapper);
            } else if doc.tag(block) != tag {
                doc.set_tag(block, tag);
            }
            trace!("formatted {block} as {tag}");
        }
    }
}

fn is_format_candidate(doc: &Document, classifier: &Classifier, node: NodeId) -> bool {
    classifier.is_line_text(doc, node)
        && !doc.tag(node).is_cell()
        && !doc
            .children(node)
            .iter()
            .any(|child| classifier.is_block(doc, *child))
}

/// Side table carried from `prepare` to `commit`.
#[derive(Debug)]
pub(crate) struct PendingFormat {
    pub tag: Tag,
    indents: HashMap<NodeId, i32>,
    markers: HashMap<NodeId, CapturedStyle>,
}

impl PendingFormat {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            indents: HashMap::new(),
            markers: HashMap::new(),
        }
    }
}

// ============================================================================
// Prepare
// ============================================================================

pub(crate) fn prepare(
    ctx: &mut CommandContext<'_>,
    blocks: &CollectedBlocks,
    pending: &mut PendingFormat,
) {
    for &node in &blocks.nodes {
        if ctx.quirks.merge_prone_list_items && ctx.doc.has_tag(node, Tag::Li) {
            if let Some(first) = ctx.doc.first_child(node)
                && !ctx.classifier.is_block(ctx.doc, first)
            {
                let wrapper = ctx.doc.create_element(pending.tag);
                ctx.doc.insert_before(first, wrapper);
                while let Some(next) = ctx.doc.next_sibling(wrapper) {
                    ctx.doc.append_child(wrapper, next);
                }
                trace!("wrapped content of list item {node} in {}", pending.tag);
            }
            pending.indents.insert(node, ctx.margins.indent(ctx.doc, node));
        }
        if ctx.quirks.style_losing_format {
            let resolved = ctx.doc.resolved_style(node);
            let captured = CapturedStyle {
                direction: resolved.direction,
                alignment: refine_alignment(resolved.direction, resolved.alignment),
            };
            let marker = ctx.doc.create_element(Tag::Marker);
            ctx.doc.prepend_child(node, marker);
            pending.markers.insert(marker, captured);
        }
    }
    debug!(
        "prepared {} block(s) for {} ({} indent(s), {} marker(s))",
        blocks.nodes.len(),
        pending.tag,
        pending.indents.len(),
        pending.markers.len()
    );
}

// ============================================================================
// Commit
// ============================================================================

pub(crate) fn commit(
    ctx: &mut CommandContext<'_>,
    blocks: Option<&CollectedBlocks>,
    mut pending: PendingFormat,
) {
    let mut normalizer = Normalizer::new();
    for &node in blocks.map(|b| b.nodes.as_slice()).unwrap_or_default() {
        if !ctx.doc.is_attached(node) {
            continue;
        }
        if ctx.classifier.is_line_text(ctx.doc, node) {
            unwrap_host_div(ctx, node);
        }
        if ctx.doc.has_tag(node, Tag::Li) {
            restore_list_item(ctx, node, &mut pending);
        }
        if ctx.quirks.style_losing_format {
            restore_captured_style(ctx, node, &mut pending, &mut normalizer);
        }
    }

    normalizer.merge_adjacent_lists(ctx.doc);
    normalizer.cleanup(ctx.doc, ctx.classifier, &mut pending.markers);
    debug!("committed format to {}", pending.tag);
}

/// Strips trailing blank text and line breaks the host leaves in a wrapping div, and
/// replaces a div that only wraps `node` by `node`, keeping the div's style.
fn unwrap_host_div(ctx: &mut CommandContext<'_>, node: NodeId) {
    let Some(parent) = ctx.doc.parent(node) else {
        return;
    };
    if parent == ctx.doc.root() || !ctx.doc.has_tag(parent, Tag::Div) {
        return;
    }
    while let Some(last) = ctx.doc.last_child(parent) {
        if last == node || !(is_blank_text(ctx.doc, last) || ctx.doc.has_tag(last, Tag::Br)) {
            break;
        }
        ctx.doc.remove_node(last);
    }
    if ctx.doc.children(parent).len() != 1 {
        return;
    }

    let div = ctx.doc.resolved_style(parent);
    {
        let style = ctx.doc.style_mut(node);
        style.direction = Some(div.direction);
        style.alignment = refine_alignment(div.direction, div.alignment);
        let side = div.direction.start_side();
        if div.margin(side) != 0 {
            style.set_margin(side, Some(div.margin(side)));
        }
    }
    ctx.doc.insert_before(parent, node);
    ctx.doc.remove_node(parent);
    trace!("dropped host div {parent} around {node}");
}

fn restore_list_item(ctx: &mut CommandContext<'_>, item: NodeId, pending: &mut PendingFormat) {
    let indent = pending.indents.remove(&item).unwrap_or(0);
    ctx.margins.refine(ctx.doc, item);
    if indent != 0 {
        ctx.margins.recount(ctx.doc, item, indent);
    }

    while ctx.doc.children(item).len() > 1 {
        match ctx.doc.last_child(item) {
            Some(last) if is_blank_text(ctx.doc, last) => ctx.doc.remove_node(last),
            _ => break,
        }
    }

    if let Some(first) = ctx.doc.first_child(item)
        && !matches!(ctx.doc.kind(first), NodeKind::Text | NodeKind::Comment)
    {
        if ctx.classifier.is_line_styled(ctx.doc, first) {
            let keeps_child_style =
                ctx.quirks.merge_prone_list_items || ctx.quirks.wraps_unformatted_list_items;
            if !keeps_child_style {
                let resolved = ctx.doc.resolved_style(item);
                let style = ctx.doc.style_mut(first);
                style.direction = Some(resolved.direction);
                style.alignment = refine_alignment(resolved.direction, resolved.alignment);
            }
        } else if ctx.doc.has_tag(first, Tag::Div) {
            ctx.doc.unwrap_node(first);
            ctx.doc.normalize_text(item);
        }
    }

    let formatted = ctx
        .doc
        .first_child(item)
        .is_some_and(|first| ctx.doc.has_tag(first, Tag::P));
    if ctx.quirks.wraps_unformatted_list_items && pending.tag == Tag::P && !formatted {
        let para = ctx.doc.create_element(Tag::P);
        while let Some(child) = ctx.doc.first_child(item) {
            ctx.doc.append_child(para, child);
        }
        ctx.doc.prepend_child(item, para);
    }
}

/// Puts the style captured before the host primitive back onto `node`. A div the host
/// split off after a list item is folded back into that item first.
fn restore_captured_style(
    ctx: &mut CommandContext<'_>,
    node: NodeId,
    pending: &mut PendingFormat,
    normalizer: &mut Normalizer,
) {
    let mut node = node;
    if ctx.doc.has_tag(node, Tag::Div) {
        if normalizer.is_marked(node) {
            return;
        }
        if let Some(previous) = ctx.doc.previous_sibling(node)
            && ctx.doc.has_tag(previous, Tag::Li)
        {
            while let Some(child) = ctx.doc.first_child(node) {
                ctx.doc.append_child(previous, child);
            }
            normalizer.mark(node);
            node = previous;
        }
    }

    let Some(first) = ctx.doc.first_child(node) else {
        return;
    };
    let Some(captured) = pending.markers.remove(&first) else {
        return;
    };
    {
        let style = ctx.doc.style_mut(node);
        style.direction = Some(captured.direction);
        if captured.alignment.is_some() {
            style.alignment = captured.alignment;
        }
    }
    ctx.doc.remove_node(first);
}

fn is_blank_text(doc: &Document, node: NodeId) -> bool {
    doc.is_text(node) && doc.text(node).trim().is_empty()
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod format_tests;
