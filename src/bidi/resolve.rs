use log::debug;

use crate::tree::{KeepNode, NodeId, Tag};

use super::{CommandContext, repack::repack_inline_run};

/// Which end of the selection a block is being resolved for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Edge {
    Start,
    End,
}

/// Blocks bounding the active range, plus their common ancestor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedSelection {
    pub start: NodeId,
    pub end: NodeId,
    pub common: NodeId,
}

/// Turns the tracked range into the first and last paragraph block it touches, wrapping
/// loose inline content on the way. The tracked range is refined to leaf boundaries and
/// keeps pointing at the same content throughout.
pub(crate) fn resolve_selection(ctx: &mut CommandContext<'_>) -> Option<ResolvedSelection> {
    let range = ctx.current_range()?;

    let (mut start_node, mut start_offset) = (range.start.container, range.start.offset);
    if descends(ctx, start_node) {
        while let Some(child) = child_at(ctx, start_node, start_offset) {
            start_node = child;
            start_offset = 0;
        }
    }
    ctx.update_range(|range| range.set_start(start_node, start_offset));
    let start = closest_block(ctx, start_node, Edge::Start);
    let start = outer_list_item(ctx, start);

    // Wrapping the start may have moved the end boundary, so read it again.
    let range = ctx.current_range().unwrap_or(range);
    let (mut end_node, mut end_offset) = (range.end.container, range.end.offset);
    if descends(ctx, end_node) {
        while let Some(child) = child_at(ctx, end_node, end_offset) {
            end_node = child;
            end_offset = if ctx.doc.has_children(child) {
                ctx.doc.children(child).len()
            } else if ctx.doc.is_text(child) {
                ctx.doc.text_len(child)
            } else {
                0
            };
        }
    }
    ctx.update_range(|range| range.set_end(end_node, end_offset));
    let end = closest_block(ctx, end_node, Edge::End);
    let end = outer_list_item(ctx, end);

    let common = ctx.doc.common_ancestor(start, end);
    debug!("resolved selection to blocks {start}..{end} under {common}");
    Some(ResolvedSelection { start, end, common })
}

fn descends(ctx: &CommandContext<'_>, node: NodeId) -> bool {
    ctx.classifier.is_block(ctx.doc, node) || ctx.classifier.is_table_container(ctx.doc, node)
}

/// Child at `offset`, clamped to the last child.
fn child_at(ctx: &CommandContext<'_>, node: NodeId, offset: usize) -> Option<NodeId> {
    let children = ctx.doc.children(node);
    let last = children.len().checked_sub(1)?;
    children.get(offset.min(last)).copied()
}

fn outer_list_item(ctx: &CommandContext<'_>, node: NodeId) -> NodeId {
    ctx.classifier
        .list_item_ancestor(ctx.doc, node)
        .unwrap_or(node)
}

/// The block holding the line `node` belongs to. Inline content with block siblings, or
/// split by line breaks, or sitting in a container that holds no text itself, is wrapped
/// first; the wrapper next to `edge` is returned.
pub(crate) fn closest_block(ctx: &mut CommandContext<'_>, node: NodeId, edge: Edge) -> NodeId {
    if ctx.classifier.is_block(ctx.doc, node) {
        return node;
    }
    let mut node = node;
    let Some(mut parent) = ctx.doc.parent(node) else {
        return node;
    };

    loop {
        let mut first: Option<NodeId> = None;
        let mut last: Option<NodeId> = None;
        let mut create_own_block = false;

        let mut sibling = node;
        loop {
            if ctx.classifier.is_inline_or_text(ctx.doc, sibling) {
                first = Some(sibling);
                last.get_or_insert(sibling);
            }
            let Some(previous) = ctx.doc.previous_sibling(sibling) else {
                break;
            };
            if ctx.classifier.is_boundary(ctx.doc, previous) || ctx.doc.has_tag(previous, Tag::Br) {
                create_own_block = true;
                break;
            }
            if ctx.doc.is_text(previous) && ctx.doc.is_text(sibling) {
                ctx.doc.merge_text_with_next(previous, KeepNode::Next);
                continue;
            }
            sibling = previous;
        }

        let mut sibling = node;
        loop {
            if ctx.classifier.is_inline_or_text(ctx.doc, sibling) {
                first.get_or_insert(sibling);
                last = Some(sibling);
            }
            let Some(next) = ctx.doc.next_sibling(sibling) else {
                break;
            };
            if ctx.classifier.is_boundary(ctx.doc, next) {
                create_own_block = true;
                break;
            }
            if ctx.doc.has_tag(next, Tag::Br)
                && ctx
                    .doc
                    .next_sibling(next)
                    .is_some_and(|after| !ctx.classifier.is_boundary(ctx.doc, after))
            {
                last = Some(next);
                create_own_block = true;
                break;
            }
            if ctx.doc.is_text(next) && ctx.doc.is_text(sibling) {
                ctx.doc.merge_text_with_next(sibling, KeepNode::Previous);
                continue;
            }
            sibling = next;
        }

        let loose_in_container = ctx.classifier.is_block(ctx.doc, parent)
            && !ctx.classifier.is_block_with_text(ctx.doc, parent);
        if let (Some(first), Some(last)) = (first, last)
            && (create_own_block || loose_in_container)
        {
            let wrappers = repack_inline_run(ctx, first, last, parent);
            let chosen = match edge {
                Edge::Start => wrappers.first(),
                Edge::End => wrappers.last(),
            };
            if let Some(wrapper) = chosen {
                return *wrapper;
            }
        }
        if ctx.classifier.is_block(ctx.doc, parent) {
            return parent;
        }
        node = parent;
        match ctx.doc.parent(parent) {
            Some(grandparent) => parent = grandparent,
            None => return node,
        }
    }
}
