use log::debug;

use crate::tree::{Document, NodeId, Tag};

use super::{
    CommandContext,
    repack::{rebuild_block, repack_inline_run},
    resolve::{Edge, ResolvedSelection, closest_block},
};

/// Blocks sharing one parent, collected without a break in between.
pub type Group = Vec<NodeId>;

/// Everything a command acts on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectedBlocks {
    /// Paragraph blocks in document order.
    pub nodes: Vec<NodeId>,
    pub groups: Vec<Group>,
    /// Table cells the walk passed through.
    pub cells: Vec<NodeId>,
}

/// List flavour a list command would switch an item to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl CollectedBlocks {
    /// True when all blocks can be handled in one go.
    pub fn is_single_group(&self) -> bool {
        self.groups.len() < 2
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}

/// True when `node` is a list item whose list is of the other kind than `target`.
pub fn is_list_type_change(doc: &Document, node: NodeId, target: ListKind) -> bool {
    if !doc.has_tag(node, Tag::Li) {
        return false;
    }
    match (doc.parent(node).map(|parent| doc.tag(parent)), target) {
        (Some(Tag::Ul), ListKind::Ordered) | (Some(Tag::Ol), ListKind::Unordered) => true,
        _ => false,
    }
}

/// Collects the blocks between the resolved start and end. Returns `None` when there is
/// nothing to act on.
pub(crate) fn collect_blocks(
    ctx: &mut CommandContext<'_>,
    selection: ResolvedSelection,
) -> Option<CollectedBlocks> {
    let root = ctx.doc.root();
    let mut start = selection.start;
    let mut end = selection.end;

    if start == root {
        let first = ctx.doc.first_child(root)?;
        if ctx.classifier.is_inline_or_text(ctx.doc, first) {
            rebuild_block(ctx, root);
        }
        let first = ctx.doc.first_child(root)?;
        start = edge_block(ctx, first, Edge::Start);
    }
    if end == root {
        let last = ctx.doc.last_child(root)?;
        if ctx.classifier.is_inline_or_text(ctx.doc, last) {
            rebuild_block(ctx, root);
        }
        let last = ctx.doc.last_child(root)?;
        end = edge_block(ctx, last, Edge::End);
    }

    let blocks = walk(ctx, start, end, selection.common);
    debug!(
        "collected {} block(s) in {} group(s), {} cell(s)",
        blocks.nodes.len(),
        blocks.groups.len(),
        blocks.cells.len()
    );
    if blocks.is_empty() && blocks.cells.is_empty() {
        return None;
    }
    Some(blocks)
}

/// Block to start or stop at for a child of the root. Falls back to the child itself when
/// only the root would hold it, as for a table.
fn edge_block(ctx: &mut CommandContext<'_>, child: NodeId, edge: Edge) -> NodeId {
    let block = closest_block(ctx, child, edge);
    if block == ctx.doc.root() { child } else { block }
}

struct Collector {
    blocks: CollectedBlocks,
    group: Group,
    group_parent: Option<NodeId>,
}

impl Collector {
    fn save(&mut self, ctx: &CommandContext<'_>, node: NodeId) {
        let parent = ctx.doc.parent(node);
        if parent != self.group_parent && !self.group.is_empty() {
            self.blocks.groups.push(std::mem::take(&mut self.group));
        }
        self.group_parent = parent;
        self.blocks.nodes.push(node);
        self.group.push(node);
    }

    fn finish(mut self, append_last: bool) -> CollectedBlocks {
        if !self.group.is_empty() {
            if append_last || !self.blocks.cells.is_empty() {
                self.blocks.groups.push(self.group);
            } else {
                self.blocks.groups.insert(0, self.group);
            }
        }
        self.blocks
    }
}

fn walk(
    ctx: &mut CommandContext<'_>,
    start: NodeId,
    end: NodeId,
    common: NodeId,
) -> CollectedBlocks {
    let mut collector = Collector {
        blocks: CollectedBlocks::default(),
        group: Vec::new(),
        group_parent: None,
    };
    let mut node = start;
    let Some(mut parent) = ctx.doc.parent(node) else {
        return collector.finish(ctx.quirks.append_last_group);
    };
    rebuild_block(ctx, parent);

    loop {
        if ctx.classifier.is_table_container(ctx.doc, node) {
            if let Some(child) = ctx.doc.first_child(node) {
                parent = node;
                node = child;
                continue;
            }
        } else if ctx.classifier.is_block(ctx.doc, node) {
            if let Some(item) = ctx.classifier.list_item_ancestor(ctx.doc, node)
                && item != node
                && let Some(item_parent) = ctx.doc.parent(item)
            {
                node = item;
                parent = item_parent;
                continue;
            }
            if ctx.doc.tag(node).is_cell() && !collector.blocks.cells.contains(&node) {
                collector.blocks.cells.push(node);
            }
            if !ctx.doc.has_tag(node, Tag::Li) && ctx.doc.has_children(node) {
                rebuild_block(ctx, node);
                if let Some(first) = ctx.doc.first_child(node)
                    && (ctx.classifier.is_block(ctx.doc, first)
                        || ctx.classifier.is_table_container(ctx.doc, first))
                {
                    parent = node;
                    node = first;
                    continue;
                }
            }
            if ctx.classifier.is_line_text(ctx.doc, node) {
                collector.save(ctx, node);
            }
            if node != end && ctx.doc.has_tag(node, Tag::Li) && ctx.doc.contains(node, end) {
                collect_nested_items(ctx, &mut collector, node, end);
                break;
            }
        } else if ctx.classifier.is_inline_or_text(ctx.doc, node)
            && !ctx.classifier.is_table_container(ctx.doc, parent)
        {
            match wrap_inline_runs(ctx, &mut collector, node, parent) {
                RunOutcome::StoppedAt(block) => {
                    node = block;
                    continue;
                }
                RunOutcome::Wrapped(last) => node = last,
            }
        }

        if node == end {
            break;
        }
        if let Some(next) = ctx.doc.next_sibling(node) {
            node = next;
            continue;
        }
        if parent == common {
            break;
        }
        let mut up = parent;
        while up != common && ctx.doc.next_sibling(up).is_none() {
            match ctx.doc.parent(up) {
                Some(above) => up = above,
                None => break,
            }
        }
        if up == common {
            break;
        }
        match (ctx.doc.next_sibling(up), ctx.doc.parent(up)) {
            (Some(next), Some(above)) => {
                node = next;
                parent = above;
            }
            _ => break,
        }
    }

    collector.finish(ctx.quirks.append_last_group)
}

/// Saves the list items nested in `item`, in document order, up to and including `end`.
fn collect_nested_items(
    ctx: &CommandContext<'_>,
    collector: &mut Collector,
    item: NodeId,
    end: NodeId,
) {
    for nested in ctx.doc.descendants(item) {
        if ctx.doc.has_tag(nested, Tag::Li) {
            collector.save(ctx, nested);
        }
        if nested == end {
            break;
        }
    }
}

enum RunOutcome {
    /// The run was wrapped; traversal continues after this wrapper.
    Wrapped(NodeId),
    /// Nothing was left to wrap before this block sibling.
    StoppedAt(NodeId),
}

/// Wraps the inline run starting at `node`, one wrapper per line, stopping at the next
/// block sibling.
fn wrap_inline_runs(
    ctx: &mut CommandContext<'_>,
    collector: &mut Collector,
    node: NodeId,
    parent: NodeId,
) -> RunOutcome {
    let mut first = Some(node);
    let mut last = None;
    let mut last_wrapper = node;
    let mut stopped_at = None;

    let mut cursor = Some(node);
    while let Some(current) = cursor {
        let next = ctx.doc.next_sibling(current);
        if ctx.classifier.is_inline_or_text(ctx.doc, current) {
            last = Some(current);
            let trailing_break = ctx.classifier.is_block(ctx.doc, parent)
                && ctx.doc.last_child(parent) == Some(current);
            if ctx.doc.has_tag(current, Tag::Br)
                && !trailing_break
                && let Some(run_start) = first.take()
            {
                let wrappers = repack_inline_run(ctx, run_start, current, parent);
                for wrapper in &wrappers {
                    collector.save(ctx, *wrapper);
                }
                if let Some(wrapper) = wrappers.last() {
                    last_wrapper = *wrapper;
                }
                last = None;
                first = next.filter(|n| ctx.classifier.is_inline_or_text(ctx.doc, *n));
            }
        } else if ctx.classifier.is_boundary(ctx.doc, current) {
            stopped_at = Some(current);
            break;
        }
        cursor = next;
    }

    match (first, last) {
        (Some(run_start), Some(run_end)) => {
            let wrappers = repack_inline_run(ctx, run_start, run_end, parent);
            for wrapper in &wrappers {
                collector.save(ctx, *wrapper);
            }
            RunOutcome::Wrapped(wrappers.last().copied().unwrap_or(last_wrapper))
        }
        _ => match stopped_at {
            Some(block) => RunOutcome::StoppedAt(block),
            None => RunOutcome::Wrapped(last_wrapper),
        },
    }
}
