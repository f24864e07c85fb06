use log::{debug, trace};

use crate::tree::{KeepNode, NodeId, NodeKind, Style, Tag};

use super::CommandContext;

/// Moves the inline siblings `first..=last` of `parent` into freshly created paragraph
/// wrappers and returns the wrappers in document order.
///
/// A line break that is not the last node of the run ends its wrapper. A wrapper that
/// would start with nothing but a line break or a comment gets the placeholder text.
/// Comments are dropped. Text nodes that end up adjacent are merged.
pub(crate) fn repack_inline_run(
    ctx: &mut CommandContext<'_>,
    first: NodeId,
    last: NodeId,
    parent: NodeId,
) -> Vec<NodeId> {
    let template = wrapper_style(ctx, first, parent);
    let mut wrapper = new_wrapper(ctx, &template);
    ctx.doc.insert_before(first, wrapper);
    let mut wrappers = vec![wrapper];
    let mut moved = 0usize;

    let mut sibling = Some(first);
    while let Some(current) = sibling {
        let next = ctx.doc.next_sibling(current);
        if ctx.classifier.is_inline_or_text(ctx.doc, current) {
            let tag = ctx.doc.tag(current);
            let mut following = None;
            if tag == Tag::Br && current != last {
                let successor = new_wrapper(ctx, &template);
                ctx.doc.insert_before(current, successor);
                wrappers.push(successor);
                following = Some(successor);
            }
            if matches!(tag, Tag::Br | Tag::Comment) && !ctx.doc.has_children(wrapper) {
                let placeholder = ctx.doc.create_text(&ctx.config.placeholder);
                ctx.doc.append_child(wrapper, placeholder);
            }
            if tag == Tag::Comment {
                ctx.doc.remove_node(current);
            } else {
                ctx.doc.append_child(wrapper, current);
                moved += 1;
                if ctx.doc.is_text(current)
                    && let Some(previous) = ctx.doc.previous_sibling(current)
                {
                    ctx.doc.merge_text_with_next(previous, KeepNode::Previous);
                }
            }
            if let Some(successor) = following {
                wrapper = successor;
            }
        }
        if current == last {
            break;
        }
        sibling = next;
    }

    debug!(
        "repacked {moved} inline nodes of {parent} into {} wrapper(s)",
        wrappers.len()
    );
    wrappers
}

fn wrapper_style(ctx: &CommandContext<'_>, first: NodeId, parent: NodeId) -> Style {
    if parent == ctx.doc.root() {
        return Style {
            direction: Some(ctx.doc.resolved_direction(parent)),
            ..Style::default()
        };
    }
    match ctx.doc.previous_sibling(first) {
        Some(previous) if !matches!(ctx.doc.kind(previous), NodeKind::Text | NodeKind::Comment) => {
            ctx.doc.style(previous).clone()
        }
        _ => ctx.doc.style(parent).clone(),
    }
}

fn new_wrapper(ctx: &mut CommandContext<'_>, style: &Style) -> NodeId {
    let wrapper = ctx.doc.create_element(ctx.config.block_mode.tag());
    ctx.doc.set_style(wrapper, style.clone());
    trace!("created wrapper {wrapper}");
    wrapper
}

/// Wraps every inline run of `block` that sits next to block children, or that sits
/// directly in a block which does not hold a line of text itself.
pub(crate) fn rebuild_block(ctx: &mut CommandContext<'_>, block: NodeId) {
    let holds_text = ctx.classifier.is_line_text(ctx.doc, block);
    let mut has_own_block = false;
    let mut run: Option<(NodeId, NodeId)> = None;

    let mut node = ctx.doc.first_child(block);
    while let Some(current) = node {
        let next = ctx.doc.next_sibling(current);
        if ctx.classifier.is_inline_or_text(ctx.doc, current) {
            has_own_block = has_own_block || !holds_text;
            run = Some(match run {
                Some((first, _)) => (first, current),
                None => (current, current),
            });
        } else if ctx.classifier.is_boundary(ctx.doc, current) {
            if let Some((first, last)) = run.take() {
                repack_inline_run(ctx, first, last, block);
            }
            has_own_block = true;
        }
        node = next;
    }

    if has_own_block && let Some((first, last)) = run {
        repack_inline_run(ctx, first, last, block);
    }
}

#[cfg(test)]
#[path = "repack_tests.rs"]
mod repack_tests;
