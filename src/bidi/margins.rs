use crate::{
    profile::Quirks,
    tree::{Direction, Document, NodeId, NodeKind},
};

/// Per-level list indentation of one engine profile, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListMargins {
    base: i32,
    step: i32,
    root_relative: bool,
}

impl ListMargins {
    pub fn new(quirks: Quirks) -> Self {
        Self {
            base: quirks.list_base,
            step: quirks.list_step,
            root_relative: quirks.root_relative_list_margins,
        }
    }

    pub fn margin_for_level(&self, level: usize) -> i32 {
        if level == 0 {
            return 0;
        }
        let extra = i32::try_from(level - 1).unwrap_or(i32::MAX / self.step.max(1));
        self.base + extra * self.step
    }

    /// Direction a list item is measured against when deciding whether it needs the level
    /// offset: its list's, or the root's on engines that ignore the list.
    fn reference_direction(&self, doc: &Document, item: NodeId) -> Direction {
        if self.root_relative {
            return doc.resolved_direction(doc.root());
        }
        parent_direction(doc, item)
    }

    /// Resets the margins of `item` to what its level needs when its direction differs
    /// from the surrounding one.
    pub(crate) fn refine(&self, doc: &mut Document, item: NodeId) {
        let item_dir = doc.resolved_direction(item);
        let reference = self.reference_direction(doc, item);
        let offset = self.margin_for_level(list_level(doc, item));
        let style = doc.style_mut(item);
        style.clear_margins();
        if item_dir != reference {
            style.set_margin(item_dir.start_side(), Some(offset));
        }
    }

    /// User indentation of `item`: its start margin without the level offset.
    pub(crate) fn indent(&self, doc: &Document, item: NodeId) -> i32 {
        let item_dir = doc.resolved_direction(item);
        let margin = doc
            .style(item)
            .margin(item_dir.start_side())
            .unwrap_or(0);
        let level_offset = if item_dir == parent_direction(doc, item) {
            0
        } else {
            self.margin_for_level(list_level(doc, item))
        };
        margin - level_offset
    }

    /// Folds `add` and the start margin of an element first child into the item's own
    /// start margin.
    pub(crate) fn recount(&self, doc: &mut Document, item: NodeId, add: i32) {
        let item_dir = doc.resolved_direction(item);
        let side = item_dir.start_side();
        let mut value = doc.style(item).margin(side).unwrap_or(0) + add;

        if let Some(first) = doc.first_child(item)
            && !matches!(doc.kind(first), NodeKind::Text | NodeKind::Comment)
        {
            value += doc.style(first).margin(side).unwrap_or(0);
            doc.style_mut(first).clear_margins();
        }

        // The level offset is already part of the item's margin after `refine`, so the
        // value is final once the first child's share is folded in.
        if value != 0 {
            doc.style_mut(item).set_margin(side, Some(value));
        }
    }
}

fn parent_direction(doc: &Document, node: NodeId) -> Direction {
    doc.parent(node)
        .map(|parent| doc.resolved_direction(parent))
        .unwrap_or_else(|| doc.root_direction())
}

/// Number of list containers between `node` and the root.
pub fn list_level(doc: &Document, node: NodeId) -> usize {
    doc.ancestors(node)
        .into_iter()
        .take_while(|ancestor| *ancestor != doc.root())
        .filter(|ancestor| doc.tag(*ancestor).is_list())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{profile::EngineProfile, tree::markup};

    #[test]
    fn level_zero_has_no_margin() {
        for profile in EngineProfile::ALL {
            assert_eq!(ListMargins::new(profile.quirks()).margin_for_level(0), 0);
        }
    }

    #[test]
    fn levels_add_one_step_each() {
        let margins = ListMargins::new(EngineProfile::MergeProneList.quirks());
        assert_eq!(margins.margin_for_level(1), 45);
        assert_eq!(margins.margin_for_level(2), 85);
        assert_eq!(margins.margin_for_level(3), 125);
        let legacy = ListMargins::new(EngineProfile::LegacyList.quirks());
        assert_eq!(legacy.margin_for_level(2), 65);
    }

    #[test]
    fn counts_nested_lists() {
        let doc = markup::parse("<ul><li><ol><li>deep</li></ol></li></ul>").unwrap();
        let text = doc.find_text("deep").unwrap();
        let item = doc.parent(text).unwrap();
        assert_eq!(list_level(&doc, item), 2);
    }

    #[test]
    fn refine_sets_offset_only_for_opposite_items() {
        let mut doc = markup::parse(
            r#"<ul><li style="direction: rtl; margin-left: 10px">a</li><li style="margin-left: 10px">b</li></ul>"#,
        )
        .unwrap();
        let margins = ListMargins::new(EngineProfile::Standard.quirks());
        let list = doc.children(doc.root())[0];
        let (rtl_item, ltr_item) = (doc.children(list)[0], doc.children(list)[1]);

        margins.refine(&mut doc, rtl_item);
        margins.refine(&mut doc, ltr_item);

        assert_eq!(doc.style(rtl_item).margin_right, Some(35));
        assert_eq!(doc.style(rtl_item).margin_left, None);
        assert_eq!(doc.style(ltr_item).margin_left, None);
    }

    #[test]
    fn indent_and_recount_never_double_count_the_level_offset() {
        let mut doc = markup::parse(
            r#"<ul><li style="direction: rtl; margin-right: 55px"><p style="margin-right: 5px">a</p></li></ul>"#,
        )
        .unwrap();
        let margins = ListMargins::new(EngineProfile::Standard.quirks());
        let list = doc.children(doc.root())[0];
        let item = doc.children(list)[0];

        let indent = margins.indent(&doc, item);
        assert_eq!(indent, 20);

        margins.refine(&mut doc, item);
        margins.recount(&mut doc, item, indent);
        assert_eq!(doc.style(item).margin_right, Some(35 + 20 + 5));
        let para = doc.children(item)[0];
        assert_eq!(doc.style(para).margin_right, None);

        margins.refine(&mut doc, item);
        margins.recount(&mut doc, item, indent);
        assert_eq!(doc.style(item).margin_right, Some(35 + 20));
    }
}
