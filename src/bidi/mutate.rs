use log::trace;

use crate::tree::{
    Alignment, Direction, NodeId, NodeKind, Side, Tag, realign_for_direction, refine_alignment,
};

use super::{CollectedBlocks, CommandContext, margins::list_level};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DirectionChange {
    Set(Direction),
    Mirror,
}

impl DirectionChange {
    fn target(self, current: Direction) -> Direction {
        match self {
            DirectionChange::Set(direction) => direction,
            DirectionChange::Mirror => current.opposite(),
        }
    }
}

// ============================================================================
// Direction
// ============================================================================

pub(crate) fn apply_direction(
    ctx: &mut CommandContext<'_>,
    blocks: &CollectedBlocks,
    change: DirectionChange,
) {
    for &node in &blocks.nodes {
        set_block_direction(ctx, node, change);
    }
    flip_whole_tables(ctx, blocks, change);
}

fn set_block_direction(ctx: &mut CommandContext<'_>, node: NodeId, change: DirectionChange) {
    let before = ctx.doc.resolved_style(node);
    let previous = before.direction;
    let target = change.target(previous);
    ctx.doc.remove_attribute(node, "dir");
    ctx.doc.remove_attribute(node, "align");
    {
        let style = ctx.doc.style_mut(node);
        style.direction = Some(target);
        style.alignment = None;
    }
    trace!("direction of {node}: {previous} -> {target}");
    if ctx.doc.has_tag(node, Tag::Center) {
        return;
    }

    // Resolved alignment includes the parent's, so a block never picks up a physical side
    // from above once its direction changes.
    ctx.doc.style_mut(node).alignment = realign_for_direction(previous, before.alignment, target);

    if ctx.doc.has_tag(node, Tag::Li) {
        ctx.margins.refine(ctx.doc, node);
        let mut margin = before.start_margin();
        let parent_direction = ctx
            .doc
            .parent(node)
            .map(|parent| ctx.doc.resolved_direction(parent))
            .unwrap_or_else(|| ctx.doc.root_direction());
        if previous != parent_direction {
            margin -= ctx.margins.margin_for_level(list_level(ctx.doc, node));
        }
        let side = target.start_side();
        let current = ctx.doc.style(node).margin(side).unwrap_or(0);
        ctx.doc
            .style_mut(node)
            .set_margin(side, nonzero(current + margin));

        if ctx.quirks.style_losing_format {
            let alignment = ctx.doc.style(node).alignment;
            if alignment != Some(Alignment::Center) {
                ctx.doc.style_mut(node).alignment =
                    Some(alignment.unwrap_or_else(|| Alignment::start_of(target)));
            }
        } else {
            sync_styled_first_child(ctx, node, Some(target));
        }
    } else {
        swap_margins(ctx, node, target, before.margin_left, before.margin_right);
    }
}

fn swap_margins(
    ctx: &mut CommandContext<'_>,
    node: NodeId,
    target: Direction,
    left: i32,
    right: i32,
) {
    let style = ctx.doc.style_mut(node);
    match target {
        Direction::Rtl if left != 0 => {
            style.set_margin(Side::Left, None);
            style.set_margin(Side::Right, Some(left));
        }
        Direction::Ltr if right != 0 => {
            style.set_margin(Side::Right, None);
            style.set_margin(Side::Left, Some(right));
        }
        _ => {}
    }
}

/// Copies the item's direction and meaningful alignment onto a styled text block that
/// opens the list item.
fn sync_styled_first_child(
    ctx: &mut CommandContext<'_>,
    item: NodeId,
    direction: Option<Direction>,
) {
    let Some(first) = ctx.doc.first_child(item) else {
        return;
    };
    if matches!(ctx.doc.kind(first), NodeKind::Text | NodeKind::Comment)
        || !ctx.classifier.is_line_styled(ctx.doc, first)
    {
        return;
    }
    let resolved = ctx.doc.resolved_style(item);
    let alignment = refine_alignment(resolved.direction, resolved.alignment);
    let style = ctx.doc.style_mut(first);
    if let Some(direction) = direction {
        style.direction = Some(direction);
    }
    style.alignment = alignment;
}

/// Flips a table together with all of its cells, but only when the collected cells
/// include both its first and its last cell.
fn flip_whole_tables(
    ctx: &mut CommandContext<'_>,
    blocks: &CollectedBlocks,
    change: DirectionChange,
) {
    for table in ctx.doc.nodes_with_tag(Tag::Table) {
        let cells: Vec<NodeId> = ctx
            .doc
            .descendants(table)
            .into_iter()
            .filter(|node| ctx.doc.tag(*node).is_cell())
            .collect();
        let (Some(first), Some(last)) = (cells.first(), cells.last()) else {
            continue;
        };
        if !blocks.cells.contains(first) || !blocks.cells.contains(last) {
            trace!("table {table} is only partly selected, leaving its direction");
            continue;
        }
        let direction = change.target(ctx.doc.resolved_direction(table));
        ctx.doc.style_mut(table).direction = Some(direction);
        for cell in &cells {
            ctx.doc.style_mut(*cell).direction = Some(direction);
        }
    }
}

fn nonzero(value: i32) -> Option<i32> {
    (value != 0).then_some(value)
}

// ============================================================================
// Alignment and explicit direction
// ============================================================================

pub(crate) fn apply_alignment(
    ctx: &mut CommandContext<'_>,
    blocks: &CollectedBlocks,
    alignment: Alignment,
) {
    for &node in &blocks.nodes {
        if ctx.doc.has_tag(node, Tag::Center) {
            continue;
        }
        ctx.doc.remove_attribute(node, "align");
        ctx.doc.style_mut(node).alignment = Some(alignment);
        if ctx.doc.has_tag(node, Tag::Li) {
            sync_styled_first_child(ctx, node, None);
        }
    }
}

/// Makes the inherited direction of every block explicit.
pub(crate) fn capture_explicit_direction(ctx: &mut CommandContext<'_>, blocks: &CollectedBlocks) {
    for &node in &blocks.nodes {
        let direction = ctx.doc.resolved_direction(node);
        ctx.doc.remove_attribute(node, "dir");
        ctx.doc.style_mut(node).direction = Some(direction);
    }
}
