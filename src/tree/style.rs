use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{Document, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Ltr => Direction::Rtl,
            Direction::Rtl => Direction::Ltr,
        }
    }

    /// The physical side a line starts on.
    pub fn start_side(self) -> Side {
        match self {
            Direction::Ltr => Side::Left,
            Direction::Rtl => Side::Right,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ltr" => Ok(Direction::Ltr),
            "rtl" => Ok(Direction::Rtl),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    Center,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
        }
    }

    /// Alignment that puts lines on the start side of `direction`.
    pub fn start_of(direction: Direction) -> Self {
        match direction {
            Direction::Ltr => Alignment::Left,
            Direction::Rtl => Alignment::Right,
        }
    }

    /// Alignment that puts lines on the end side of `direction`.
    pub fn end_of(direction: Direction) -> Self {
        match direction {
            Direction::Ltr => Alignment::Right,
            Direction::Rtl => Alignment::Left,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alignment {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Alignment::Left),
            "right" => Ok(Alignment::Right),
            "center" | "middle" => Ok(Alignment::Center),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Explicit paragraph-level style of a node. Unset values inherit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Style {
    pub direction: Option<Direction>,
    pub alignment: Option<Alignment>,
    pub margin_left: Option<i32>,
    pub margin_right: Option<i32>,
}

impl Style {
    pub fn is_empty(&self) -> bool {
        self.direction.is_none()
            && self.alignment.is_none()
            && self.margin_left.is_none()
            && self.margin_right.is_none()
    }

    pub fn margin(&self, side: Side) -> Option<i32> {
        match side {
            Side::Left => self.margin_left,
            Side::Right => self.margin_right,
        }
    }

    pub fn set_margin(&mut self, side: Side, value: Option<i32>) {
        match side {
            Side::Left => self.margin_left = value,
            Side::Right => self.margin_right = value,
        }
    }

    pub fn clear_margins(&mut self) {
        self.margin_left = None;
        self.margin_right = None;
    }

    /// Parses a `style` attribute value (`direction: rtl; text-align: center; ...`).
    /// Unknown declarations are ignored.
    pub fn parse_declarations(css: &str) -> Self {
        let mut style = Style::default();
        for declaration in css.split(';') {
            let Some((name, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "direction" => style.direction = value.parse().ok(),
                "text-align" => style.alignment = value.parse().ok(),
                "margin-left" => style.margin_left = parse_pixels(value),
                "margin-right" => style.margin_right = parse_pixels(value),
                _ => {}
            }
        }
        style
    }

    pub fn to_declarations(&self) -> String {
        let mut parts = Vec::new();
        if let Some(direction) = self.direction {
            parts.push(format!("direction: {direction}"));
        }
        if let Some(alignment) = self.alignment {
            parts.push(format!("text-align: {alignment}"));
        }
        if let Some(margin) = self.margin_left {
            parts.push(format!("margin-left: {margin}px"));
        }
        if let Some(margin) = self.margin_right {
            parts.push(format!("margin-right: {margin}px"));
        }
        parts.join("; ")
    }
}

fn parse_pixels(value: &str) -> Option<i32> {
    let digits = value.trim().trim_end_matches("px").trim();
    digits.parse::<i32>().ok()
}

/// Effective style of a node after inheritance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub direction: Direction,
    /// `None` means the natural start alignment of `direction`.
    pub alignment: Option<Alignment>,
    pub margin_left: i32,
    pub margin_right: i32,
}

impl ResolvedStyle {
    pub fn visual_alignment(&self) -> Alignment {
        self.alignment
            .unwrap_or_else(|| Alignment::start_of(self.direction))
    }

    pub fn margin(&self, side: Side) -> i32 {
        match side {
            Side::Left => self.margin_left,
            Side::Right => self.margin_right,
        }
    }

    /// Margin on the start side of the resolved direction.
    pub fn start_margin(&self) -> i32 {
        self.margin(self.direction.start_side())
    }
}

/// Keeps an alignment only where it differs from what `direction` implies on its own:
/// left survives under rtl, right under ltr, center always.
pub fn refine_alignment(direction: Direction, alignment: Option<Alignment>) -> Option<Alignment> {
    match (alignment?, direction) {
        (Alignment::Left, Direction::Rtl) => Some(Alignment::Left),
        (Alignment::Right, Direction::Ltr) => Some(Alignment::Right),
        (Alignment::Center, _) => Some(Alignment::Center),
        _ => None,
    }
}

/// Carries an alignment across a direction change, keeping its relation to the
/// paragraph's start and end rather than its physical side.
pub fn realign_for_direction(
    previous: Direction,
    alignment: Option<Alignment>,
    next: Direction,
) -> Option<Alignment> {
    match alignment? {
        Alignment::Center => Some(Alignment::Center),
        aligned if aligned == Alignment::end_of(previous) => Some(Alignment::end_of(next)),
        _ => Some(Alignment::start_of(next)),
    }
}

impl Document {
    /// Computed style of `node`: explicit style, then `dir`/`align` attributes, then the
    /// parent chain, then the configured root direction.
    pub fn resolved_style(&self, node: NodeId) -> ResolvedStyle {
        let explicit = self.style(node);
        ResolvedStyle {
            direction: self.resolved_direction(node),
            alignment: self.resolved_alignment(node),
            margin_left: explicit.margin_left.unwrap_or(0),
            margin_right: explicit.margin_right.unwrap_or(0),
        }
    }

    pub fn resolved_direction(&self, node: NodeId) -> Direction {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(direction) = self.style(id).direction {
                return direction;
            }
            if let Some(direction) = self.attribute(id, "dir").and_then(|v| v.parse().ok()) {
                return direction;
            }
            current = self.parent(id);
        }
        self.root_direction()
    }

    pub fn resolved_alignment(&self, node: NodeId) -> Option<Alignment> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(alignment) = self.style(id).alignment {
                return Some(alignment);
            }
            if let Some(alignment) = self.attribute(id, "align").and_then(|v| v.parse().ok()) {
                return Some(alignment);
            }
            current = self.parent(id);
        }
        None
    }
}
