use std::{fmt, str::FromStr};

use log::debug;
use thiserror::Error;

use crate::{
    config::BidiConfig,
    profile::Quirks,
    range::{Range, Selection, SelectionProvider},
    text::detect_direction,
    tree::{Alignment, Classifier, Direction, Document, NodeKind, RangeHandle, Tag},
};

mod collect;
mod format;
mod margins;
mod mutate;
mod normalize;
mod repack;
mod resolve;

pub use collect::{CollectedBlocks, Group, ListKind, is_list_type_change};
pub use format::{FormatBlock, RetagBlocks};
pub use margins::{ListMargins, list_level};
pub use normalize::{CapturedStyle, Normalizer};

use collect::collect_blocks;
use format::PendingFormat;
use mutate::{DirectionChange, apply_alignment, apply_direction, capture_explicit_direction};
use resolve::{ResolvedSelection, resolve_selection};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BidiError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("a format to {pending} was already prepared")]
    FormatAlreadyPending { pending: Tag },
    #[error("no format was prepared")]
    NoPendingFormat,
    #[error("format was prepared for {expected} but committed for {found}")]
    FormatTagMismatch { expected: Tag, found: Tag },
    #[error("a format to {pending} is in progress")]
    FormatInProgress { pending: Tag },
    #[error("{0} is not a paragraph tag")]
    InvalidFormatTag(Tag),
}

/// Commands understood by [`BidiEditor::exec`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    SetDirection(Direction),
    MirrorDirection,
    SetAlignment(Alignment),
    CaptureExplicitDirection,
    PrepareFormat(Tag),
    CommitFormat(Tag),
}

impl FromStr for Command {
    type Err = BidiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let (name, argument) = match lowered.split_once(':') {
            Some((name, argument)) => (name, Some(argument)),
            None => (lowered.as_str(), None),
        };
        let unknown = || BidiError::UnknownCommand(s.to_string());
        let tag_argument = || {
            argument
                .map(|arg| arg.trim().trim_start_matches('<').trim_end_matches('>'))
                .and_then(Tag::from_name)
                .ok_or_else(unknown)
        };

        let command = match (name, argument) {
            ("ltr", None) => Command::SetDirection(Direction::Ltr),
            ("rtl", None) => Command::SetDirection(Direction::Rtl),
            ("mirror", None) => Command::MirrorDirection,
            ("left", None) => Command::SetAlignment(Alignment::Left),
            ("right", None) => Command::SetAlignment(Alignment::Right),
            ("center", None) => Command::SetAlignment(Alignment::Center),
            ("explicitdir", None) => Command::CaptureExplicitDirection,
            ("prepareformat", Some(_)) => Command::PrepareFormat(tag_argument()?),
            ("formatblock", Some(_)) => Command::CommitFormat(tag_argument()?),
            _ => return Err(unknown()),
        };
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetDirection(direction) => write!(f, "{direction}"),
            Command::MirrorDirection => write!(f, "mirror"),
            Command::SetAlignment(alignment) => write!(f, "{alignment}"),
            Command::CaptureExplicitDirection => write!(f, "explicitdir"),
            Command::PrepareFormat(tag) => write!(f, "prepareformat:{tag}"),
            Command::CommitFormat(tag) => write!(f, "formatblock:{tag}"),
        }
    }
}

// ============================================================================
// Per-command context
// ============================================================================

/// Everything a single command invocation works with.
pub(crate) struct CommandContext<'a> {
    pub(crate) doc: &'a mut Document,
    pub(crate) classifier: &'a Classifier,
    pub(crate) config: &'a BidiConfig,
    pub(crate) quirks: Quirks,
    pub(crate) margins: ListMargins,
    range: Option<RangeHandle>,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(
        doc: &'a mut Document,
        classifier: &'a Classifier,
        config: &'a BidiConfig,
    ) -> Self {
        let quirks = config.profile.quirks();
        Self {
            doc,
            classifier,
            config,
            quirks,
            margins: ListMargins::new(quirks),
            range: None,
        }
    }

    pub(crate) fn with_range(mut self, handle: RangeHandle) -> Self {
        self.range = Some(handle);
        self
    }

    /// The tracked range as it reads after every edit made so far.
    pub(crate) fn current_range(&self) -> Option<Range> {
        let handle = self.range?;
        match self.doc.tracked_range(handle) {
            Ok(range) => Some(range),
            Err(err) => {
                debug!("tracked range unavailable: {err}");
                None
            }
        }
    }

    pub(crate) fn update_range(&mut self, f: impl FnOnce(&mut Range)) {
        let Some(handle) = self.range else {
            return;
        };
        if let Some(mut range) = self.current_range() {
            f(&mut range);
            self.doc.retarget_range(handle, &range);
        }
    }
}

// ============================================================================
// Editor
// ============================================================================

/// Paragraph direction commands over a document and its selection.
#[derive(Debug)]
pub struct BidiEditor<S: SelectionProvider = Selection> {
    doc: Document,
    selection: S,
    config: BidiConfig,
    classifier: Classifier,
    pending: Option<PendingFormat>,
}

impl BidiEditor<Selection> {
    pub fn new(doc: Document, config: BidiConfig) -> Self {
        Self::with_selection(doc, Selection::empty(), config)
    }
}

impl<S: SelectionProvider> BidiEditor<S> {
    pub fn with_selection(doc: Document, selection: S, config: BidiConfig) -> Self {
        let classifier = config.classifier();
        Self {
            doc,
            selection,
            config,
            classifier,
            pending: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn selection(&self) -> &S {
        &self.selection
    }

    pub fn set_selection(&mut self, range: Option<Range>) {
        self.selection.set_active_range(range);
    }

    pub fn config(&self) -> &BidiConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn is_format_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn exec(&mut self, command: Command) -> Result<Option<CollectedBlocks>, BidiError> {
        debug!("exec {command}");
        match command {
            Command::SetDirection(direction) => self.set_direction(direction),
            Command::MirrorDirection => self.mirror_direction(),
            Command::SetAlignment(alignment) => self.set_alignment(alignment),
            Command::CaptureExplicitDirection => self.capture_explicit_direction(),
            Command::PrepareFormat(tag) => self.prepare_format(tag),
            Command::CommitFormat(tag) => self.commit_format(tag),
        }
    }

    pub fn set_direction(
        &mut self,
        direction: Direction,
    ) -> Result<Option<CollectedBlocks>, BidiError> {
        self.ensure_idle()?;
        Ok(self.run_on_selection(|ctx, blocks| {
            if let Some(blocks) = blocks {
                apply_direction(ctx, blocks, DirectionChange::Set(direction));
            }
        }))
    }

    pub fn mirror_direction(&mut self) -> Result<Option<CollectedBlocks>, BidiError> {
        self.ensure_idle()?;
        Ok(self.run_on_selection(|ctx, blocks| {
            if let Some(blocks) = blocks {
                apply_direction(ctx, blocks, DirectionChange::Mirror);
            }
        }))
    }

    pub fn set_alignment(
        &mut self,
        alignment: Alignment,
    ) -> Result<Option<CollectedBlocks>, BidiError> {
        self.ensure_idle()?;
        Ok(self.run_on_selection(|ctx, blocks| {
            if let Some(blocks) = blocks {
                apply_alignment(ctx, blocks, alignment);
            }
        }))
    }

    pub fn capture_explicit_direction(&mut self) -> Result<Option<CollectedBlocks>, BidiError> {
        self.ensure_idle()?;
        Ok(self.run_on_selection(|ctx, blocks| {
            if let Some(blocks) = blocks {
                capture_explicit_direction(ctx, blocks);
            }
        }))
    }

    /// Makes the direction of every paragraph in the document explicit, ignoring the
    /// selection. Used before handing the document to something that drops inheritance.
    pub fn explicit_direction_filter(&mut self) -> Result<Option<CollectedBlocks>, BidiError> {
        self.ensure_idle()?;
        let mut ctx = CommandContext::new(&mut self.doc, &self.classifier, &self.config);
        let root = ctx.doc.root();
        if !ctx.doc.has_children(root) {
            return Ok(None);
        }
        let whole = ResolvedSelection {
            start: root,
            end: root,
            common: root,
        };
        let blocks = collect_blocks(&mut ctx, whole);
        if let Some(blocks) = &blocks {
            capture_explicit_direction(&mut ctx, blocks);
        }
        Ok(blocks)
    }

    /// Resolved direction of the paragraph holding the selection start.
    pub fn direction_at_selection(&self) -> Option<Direction> {
        let range = self.selection.active_range()?;
        if !self.doc.is_attached(range.start.container) {
            return None;
        }
        let mut node = range.start.container;
        let mut offset = range.start.offset;
        while self.classifier.is_block(&self.doc, node)
            || self.classifier.is_table_container(&self.doc, node)
        {
            let children = self.doc.children(node);
            let Some(last) = children.len().checked_sub(1) else {
                break;
            };
            node = children[offset.min(last)];
            offset = 0;
        }
        let block = self.classifier.block_ancestor(&self.doc, node);
        Some(self.doc.resolved_direction(block))
    }

    /// Sets the direction of the selected paragraphs from the first strong character of
    /// the text at the selection start, falling back to the root direction.
    pub fn apply_typed_direction(&mut self) -> Result<Option<CollectedBlocks>, BidiError> {
        let Some(range) = self.selection.active_range() else {
            return Ok(None);
        };
        if !self.doc.is_attached(range.start.container) {
            return Ok(None);
        }
        let container = range.start.container;
        let text = match self.doc.kind(container) {
            NodeKind::Text => self.doc.text(container).to_string(),
            _ => self
                .doc
                .text_content(self.classifier.block_ancestor(&self.doc, container)),
        };
        let direction = detect_direction(&text).unwrap_or_else(|| self.doc.root_direction());
        self.set_direction(direction)
    }

    // ------------------------------------------------------------------------
    // Two-phase format
    // ------------------------------------------------------------------------

    pub fn prepare_format(&mut self, tag: Tag) -> Result<Option<CollectedBlocks>, BidiError> {
        if let Some(pending) = &self.pending {
            return Err(BidiError::FormatAlreadyPending { pending: pending.tag });
        }
        if !is_paragraph_tag(tag) {
            return Err(BidiError::InvalidFormatTag(tag));
        }
        let mut pending = PendingFormat::new(tag);
        let blocks = self.run_on_selection(|ctx, blocks| {
            if let Some(blocks) = blocks {
                format::prepare(ctx, blocks, &mut pending);
            }
        });
        self.pending = Some(pending);
        Ok(blocks)
    }

    pub fn commit_format(&mut self, tag: Tag) -> Result<Option<CollectedBlocks>, BidiError> {
        let Some(pending) = self.pending.take() else {
            return Err(BidiError::NoPendingFormat);
        };
        if pending.tag != tag {
            let expected = pending.tag;
            self.pending = Some(pending);
            return Err(BidiError::FormatTagMismatch { expected, found: tag });
        }
        Ok(self.run_on_selection(move |ctx, blocks| format::commit(ctx, blocks, pending)))
    }

    /// Prepares, runs the host primitive on the active range, and commits.
    pub fn format_block<F>(
        &mut self,
        tag: Tag,
        host: &mut F,
    ) -> Result<Option<CollectedBlocks>, BidiError>
    where
        F: FormatBlock + ?Sized,
    {
        self.prepare_format(tag)?;
        if let Some(range) = self.selection.active_range() {
            host.format_block(&mut self.doc, &self.classifier, &range, tag);
        }
        self.commit_format(tag)
    }

    fn ensure_idle(&self) -> Result<(), BidiError> {
        match &self.pending {
            Some(pending) => Err(BidiError::FormatInProgress { pending: pending.tag }),
            None => Ok(()),
        }
    }

    /// Resolves and collects the blocks of the active range and hands them to `apply`.
    /// Without a usable range `apply` still runs, with no blocks, and the tree keeps its
    /// shape. The selection is restored afterwards on a best-effort basis.
    fn run_on_selection<F>(&mut self, apply: F) -> Option<CollectedBlocks>
    where
        F: FnOnce(&mut CommandContext<'_>, Option<&CollectedBlocks>),
    {
        let range = self.selection.active_range().filter(|range| {
            self.doc.is_attached(range.start.container) && self.doc.is_attached(range.end.container)
        });
        let Some(range) = range else {
            debug!("no active range, nothing to do");
            let mut ctx = CommandContext::new(&mut self.doc, &self.classifier, &self.config);
            apply(&mut ctx, None);
            return None;
        };

        let collapsed = range.is_collapsed();
        let handle = self.doc.track_range(&range);
        let blocks = {
            let mut ctx = CommandContext::new(&mut self.doc, &self.classifier, &self.config)
                .with_range(handle);
            let blocks =
                resolve_selection(&mut ctx).and_then(|resolved| collect_blocks(&mut ctx, resolved));
            apply(&mut ctx, blocks.as_ref());
            blocks
        };

        let restored = self.doc.untrack_range(handle);
        if blocks.is_none() {
            return None;
        }
        match restored {
            Ok(mut range) => {
                if collapsed {
                    range.collapse_to_start();
                }
                self.selection.set_active_range(Some(range));
            }
            Err(err) => {
                debug!("could not restore the selection: {err}");
                self.selection.set_active_range(None);
            }
        }
        blocks
    }
}

fn is_paragraph_tag(tag: Tag) -> bool {
    tag.kind() == NodeKind::Block
        && !tag.is_list()
        && !tag.is_cell()
        && !matches!(
            tag,
            Tag::Root | Tag::Li | Tag::Table | Tag::Thead | Tag::Tbody | Tag::Tfoot | Tag::Tr
        )
}

#[cfg(test)]
#[path = "bidi_tests.rs"]
mod bidi_tests;
