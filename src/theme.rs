use ratatui::style::{Color, Modifier, Style};

/// Colors of the preview and its status bar.
#[derive(Clone, Debug)]
pub struct Theme {
    pub status_bar_fg: Color,
    pub status_bar_bg: Color,

    /// File name shown in the status bar
    pub filename_color: Color,

    /// Paragraphs inside the block selection
    pub selection_fg: Color,
    pub selection_bg: Color,

    /// Gutter tag of right-to-left paragraphs
    pub rtl_gutter_fg: Color,

    /// Gutter tag of left-to-right paragraphs
    pub ltr_gutter_fg: Color,

    /// Bullets and numbers of list items
    pub list_marker_fg: Color,

    pub highlight_fg: Color,
    pub highlight_bg: Color,

    pub link_color: Color,

    pub code_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            rtl_gutter_fg: Color::LightMagenta,
            ltr_gutter_fg: Color::DarkGray,
            list_marker_fg: Color::Cyan,
            highlight_fg: Color::Black,
            highlight_bg: Color::LightYellow,
            link_color: Color::Blue,
            code_fg: Color::Green,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    /// Style of the gutter tag naming a paragraph's direction
    pub fn gutter_style(&self, rtl: bool) -> Style {
        let color = if rtl {
            self.rtl_gutter_fg
        } else {
            self.ltr_gutter_fg
        };
        Style::default().fg(color)
    }

    pub fn list_marker_style(&self) -> Style {
        Style::default()
            .fg(self.list_marker_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().fg(self.highlight_fg).bg(self.highlight_bg)
    }

    pub fn link_style(&self) -> Style {
        Style::default()
            .fg(self.link_color)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code_fg)
    }
}
