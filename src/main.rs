use std::{
    env,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, info};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction as LayoutDirection, Layout},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use pure_bidi::{
    bidi::{BidiEditor, CollectedBlocks, Command, RetagBlocks},
    config::BidiConfig,
    import,
    range::{Position, Range},
    render::{RenderResult, paragraph_blocks, render_document},
    text,
    theme::Theme,
    tree::{Alignment, Direction, Document, NodeId, Tag, markup},
};

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const DEFAULT_CONFIG: &str = "pure-bidi.toml";
const LOG_ENV: &str = "PURE_BIDI_LOG";

fn main() -> Result<()> {
    init_logging()?;
    run()
}

/// Logs go to the file named by `PURE_BIDI_LOG`, filtered by `RUST_LOG`. Without it
/// nothing is logged, since the terminal belongs to the preview.
fn init_logging() -> Result<()> {
    let Some(log_path) = env::var_os(LOG_ENV) else {
        return Ok(());
    };
    let file = File::create(&log_path)
        .with_context(|| format!("failed to create log file {}", Path::new(&log_path).display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path_arg) = args.next() else {
        eprintln!("Usage: pure-bidi <file.(ftml|md|html|txt)> [config.toml]");
        return Ok(());
    };
    let path = PathBuf::from(path_arg);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    let config = BidiConfig::load_from_path(&config_path)?.unwrap_or_default();
    info!("engine profile {}", config.profile);

    let (document, initial_status) = load_document(&path, &config)?;
    let mut app = App::new(document, config, path, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn load_document(path: &Path, config: &BidiConfig) -> Result<(Document, Option<String>)> {
    if !path.exists() {
        return Ok((
            Document::new().with_root_direction(config.root_direction),
            Some("New document".to_string()),
        ));
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let parsed = match extension.as_deref() {
        Some("ftml") => import::parse_ftml(&content, config).map_err(anyhow::Error::from),
        Some("md") => import::parse_markdown(&content, config).map_err(anyhow::Error::from),
        Some("html" | "htm") => markup::parse(&content).map_err(anyhow::Error::from),
        _ => Ok(text::document_from_plain_text(&content, config)),
    };

    match parsed {
        Ok(doc) => Ok((doc, None)),
        Err(err) => {
            let message = format!("Parse error: {err:#}. Starting with empty document.");
            Ok((Document::new().with_root_direction(config.root_direction), Some(message)))
        }
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    while !app.should_quit() {
        terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw frame")?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// Paragraphs between `anchor` and `cursor` (inclusive) form the block selection.
struct App {
    editor: BidiEditor,
    theme: Theme,
    file_path: PathBuf,
    blocks: Vec<NodeId>,
    anchor: usize,
    cursor: usize,
    scroll_top: usize,
    last_view_height: usize,
    should_quit: bool,
    dirty: bool,
    status_message: Option<(String, Instant)>,
}

impl App {
    fn new(
        document: Document,
        config: BidiConfig,
        path: PathBuf,
        initial_status: Option<String>,
    ) -> Self {
        let mut app = Self {
            editor: BidiEditor::new(document, config),
            theme: Theme::new(),
            file_path: path,
            blocks: Vec::new(),
            anchor: 0,
            cursor: 0,
            scroll_top: 0,
            last_view_height: 1,
            should_quit: false,
            dirty: false,
            status_message: initial_status.map(|msg| (msg, Instant::now())),
        };
        app.refresh_blocks(None);
        app
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn selected_blocks(&self) -> &[NodeId] {
        if self.blocks.is_empty() {
            return &[];
        }
        let (from, to) = self.selection_bounds();
        &self.blocks[from..=to]
    }

    fn selection_bounds(&self) -> (usize, usize) {
        (self.anchor.min(self.cursor), self.anchor.max(self.cursor))
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let status_height = if area.height > 1 { 2 } else { 1 };
        let vertical = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(status_height)])
            .split(area);
        let horizontal = Layout::default()
            .direction(LayoutDirection::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(vertical[0]);
        let text_area = horizontal[0];
        let scrollbar_area = horizontal[1];

        let render = render_document(
            self.editor.document(),
            self.editor.classifier(),
            text_area.width.max(1) as usize,
            self.selected_blocks(),
            &self.theme,
        );

        let viewport_height = text_area.height as usize;
        self.last_view_height = viewport_height.max(1);
        self.adjust_scroll(&render, viewport_height);

        let preview = Paragraph::new(Text::from(render.lines.clone()))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(preview, text_area);

        let mut scrollbar_state = ScrollbarState::new(render.total_lines).position(self.scroll_top);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);

        let status = self.status_line();
        let status_widget = Paragraph::new(status)
            .style(self.theme.status_bar_style())
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(status_widget, vertical[1]);
    }

    fn status_line(&mut self) -> Line<'static> {
        self.prune_status_message();
        let (from, to) = self.selection_bounds();
        let position = if self.blocks.is_empty() {
            "[-]".to_string()
        } else if from == to {
            format!("[{}/{}]", from + 1, self.blocks.len())
        } else {
            format!("[{}-{}/{}]", from + 1, to + 1, self.blocks.len())
        };
        let direction = self
            .editor
            .direction_at_selection()
            .map(|direction| direction.to_string())
            .unwrap_or_else(|| "-".to_string());

        let mut spans = vec![Span::raw(format!("{position} {direction} | "))];
        if let Some((message, _)) = &self.status_message {
            spans.push(Span::raw(message.clone()));
            return Line::from(spans);
        }

        let marker = if self.dirty { "*" } else { "" };
        spans.push(Span::styled(
            format!("{}{}", self.file_path.display(), marker),
            self.theme.filename_style(),
        ));
        spans.push(Span::raw(format!(
            " | {} | l/r dir  m mirror  [ ] c align  p para  e explicit  s save  q quit",
            self.editor.config().profile
        )));
        Line::from(spans)
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    /// Keeps the paragraph under the cursor inside the viewport.
    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if let Some(node) = self.blocks.get(self.cursor)
            && let Some(block) = render.blocks.iter().find(|block| block.node == *node)
        {
            let last_line = block.first_line + block.line_count.max(1) - 1;
            if block.first_line < self.scroll_top {
                self.scroll_top = block.first_line;
            } else if last_line >= self.scroll_top + viewport {
                self.scroll_top = (last_line + 1).saturating_sub(viewport);
            }
        }
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return Ok(());
        };

        match (code, modifiers) {
            (KeyCode::Char('q'), _) => self.should_quit = true,
            (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => self.should_quit = true,
            (KeyCode::Char('s'), _) => self.save()?,
            (KeyCode::Char('l'), _) => self.exec(Command::SetDirection(Direction::Ltr)),
            (KeyCode::Char('r'), _) => self.exec(Command::SetDirection(Direction::Rtl)),
            (KeyCode::Char('m'), _) => self.exec(Command::MirrorDirection),
            (KeyCode::Char('['), _) => self.exec(Command::SetAlignment(Alignment::Left)),
            (KeyCode::Char(']'), _) => self.exec(Command::SetAlignment(Alignment::Right)),
            (KeyCode::Char('c'), _) => self.exec(Command::SetAlignment(Alignment::Center)),
            (KeyCode::Char('p'), _) => self.format_paragraph(),
            (KeyCode::Char('e'), _) => self.explicit_direction_filter(),
            (KeyCode::Up, m) => self.move_cursor(-1, m.contains(KeyModifiers::SHIFT)),
            (KeyCode::Down, m) => self.move_cursor(1, m.contains(KeyModifiers::SHIFT)),
            (KeyCode::PageUp, _) => {
                self.scroll_top = self.scroll_top.saturating_sub(self.last_view_height);
            }
            (KeyCode::PageDown, _) => {
                self.scroll_top += self.last_view_height;
            }
            _ => {}
        }
        Ok(())
    }

    fn move_cursor(&mut self, delta: isize, extend: bool) {
        if self.blocks.is_empty() {
            return;
        }
        let last = self.blocks.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
        if !extend {
            self.anchor = self.cursor;
        }
        self.sync_selection();
    }

    /// Points the editor's range at the selected paragraphs, from the start of the first
    /// to the end of the last.
    fn sync_selection(&mut self) {
        let range = match (self.selected_blocks().first(), self.selected_blocks().last()) {
            (Some(&first), Some(&last)) => {
                let end = self.editor.document().children(last).len();
                Some(Range::new(Position::new(first, 0), Position::new(last, end)))
            }
            _ => None,
        };
        self.editor.set_selection(range);
    }

    fn exec(&mut self, command: Command) {
        let label = command.to_string();
        let result = self.editor.exec(command);
        self.finish_command(&label, result);
    }

    fn format_paragraph(&mut self) {
        let result = self.editor.format_block(Tag::P, &mut RetagBlocks);
        self.finish_command("formatblock:p", result);
    }

    fn explicit_direction_filter(&mut self) {
        let result = self.editor.explicit_direction_filter();
        self.finish_command("explicit direction filter", result);
    }

    fn finish_command<E: std::fmt::Display>(
        &mut self,
        label: &str,
        result: Result<Option<CollectedBlocks>, E>,
    ) {
        match result {
            Ok(blocks) => {
                let count = blocks.as_ref().map_or(0, CollectedBlocks::len);
                debug!("{label} touched {count} block(s)");
                self.mark_dirty();
                self.refresh_blocks(blocks.as_ref());
                self.set_status(format!("{label}: {count} paragraph(s)"));
            }
            Err(err) => self.set_status(format!("{label} failed: {err}")),
        }
    }

    /// Rebuilds the paragraph list after the tree changed shape. The selection follows
    /// the blocks a command reported, and is clamped otherwise.
    fn refresh_blocks(&mut self, touched: Option<&CollectedBlocks>) {
        self.blocks = paragraph_blocks(self.editor.document(), self.editor.classifier());
        let position_of = |node: &NodeId| self.blocks.iter().position(|block| block == node);
        let reported = touched.and_then(|touched| {
            let first = touched.nodes.iter().find_map(position_of)?;
            let last = touched.nodes.iter().rev().find_map(position_of)?;
            Some((first, last))
        });

        let last = self.blocks.len().saturating_sub(1);
        match reported {
            Some((first, end)) if self.anchor <= self.cursor => {
                self.anchor = first;
                self.cursor = end;
            }
            Some((first, end)) => {
                self.anchor = end;
                self.cursor = first;
            }
            None => {
                self.anchor = self.anchor.min(last);
                self.cursor = self.cursor.min(last);
            }
        }
        self.sync_selection();
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }

    /// Writes the tree as markup next to the source file, or over it when it already is
    /// markup.
    fn save(&mut self) -> Result<()> {
        let target = self.file_path.with_extension("html");
        let contents = markup::serialize(self.editor.document());
        fs::write(&target, contents)
            .with_context(|| format!("failed to write {}", target.display()))?;

        self.dirty = false;
        self.set_status(format!("Saved {}", target.display()));
        Ok(())
    }

    fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
