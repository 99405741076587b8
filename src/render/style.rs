//! Styles, the named-style theme, and the default palette

use colored::{Color, ColoredString, Colorize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// Palette shared by the level table and the default theme
pub mod palette {
    use colored::Color;

    pub const BACKGROUND: Color = Color::TrueColor { r: 0x27, g: 0x28, b: 0x22 };
    pub const BLACK: Color = Color::TrueColor { r: 0x1A, g: 0x1A, b: 0x1A };
    pub const DARK_GREY: Color = Color::TrueColor { r: 0x36, g: 0x35, b: 0x37 };
    pub const LIGHT_GREY: Color = Color::TrueColor { r: 0x69, g: 0x67, b: 0x6C };
    pub const GREY: Color = Color::TrueColor { r: 0x59, g: 0x59, b: 0x59 };
    pub const RED: Color = Color::TrueColor { r: 0xFF, g: 0x61, b: 0x88 };
    pub const BRIGHT_RED: Color = Color::TrueColor { r: 0xFF, g: 0x8A, b: 0xA1 };
    pub const MAGENTA: Color = Color::TrueColor { r: 0xFC, g: 0x61, b: 0xD3 };
    pub const GREEN: Color = Color::TrueColor { r: 0x7B, g: 0xD8, b: 0x8F };
    pub const BRIGHT_GREEN: Color = Color::TrueColor { r: 0x8F, g: 0xEC, b: 0xB3 };
    pub const YELLOW: Color = Color::TrueColor { r: 0xFF, g: 0xD8, b: 0x66 };
    pub const ORANGE: Color = Color::TrueColor { r: 0xFC, g: 0x98, b: 0x67 };
    pub const PURPLE: Color = Color::TrueColor { r: 0xAB, g: 0x9D, b: 0xF2 };
    pub const BLUE: Color = Color::TrueColor { r: 0x81, g: 0xA1, b: 0xC1 };
    pub const BRIGHT_BLUE: Color = Color::TrueColor { r: 0x94, g: 0xBF, b: 0xF3 };
    pub const CYAN: Color = Color::TrueColor { r: 0x78, g: 0xDC, b: 0xE8 };
    pub const WHITE: Color = Color::TrueColor { r: 0xE5, g: 0xE9, b: 0xF0 };
    pub const HIGHLIGHT: Color = Color::TrueColor { r: 0x49, g: 0x48, b: 0x3E };
}

/// Visual attributes applied to a run of text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub color: Option<Color>,
    pub bgcolor: Option<Color>,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub blink: bool,
    pub reverse: bool,
    pub strike: bool,
    /// Hyperlink target, emitted as an OSC 8 sequence
    pub link: Option<String>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fg(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn bg(mut self, color: Color) -> Self {
        self.bgcolor = Some(color);
        self
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub fn dim(mut self) -> Self {
        self.dim = true;
        self
    }

    #[must_use]
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    #[must_use]
    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    #[must_use]
    pub fn blink(mut self) -> Self {
        self.blink = true;
        self
    }

    #[must_use]
    pub fn link(mut self, target: impl Into<String>) -> Self {
        self.link = Some(target.into());
        self
    }

    pub fn is_null(&self) -> bool {
        *self == Style::default()
    }

    /// Parse a style definition such as `"bold red on black"` or `"link file:///tmp/x.rs"`
    ///
    /// Returns `None` when any word is not a known attribute or color, so the
    /// caller can treat the definition as a theme name instead.
    pub fn parse(definition: &str) -> Option<Style> {
        let mut style = Style::default();
        let mut words = definition.split_whitespace().peekable();
        words.peek()?;

        while let Some(word) = words.next() {
            match word {
                "bold" | "b" => style.bold = true,
                "dim" | "d" => style.dim = true,
                "italic" | "i" => style.italic = true,
                "underline" | "u" => style.underline = true,
                "blink" | "blink2" => style.blink = true,
                "reverse" | "r" => style.reverse = true,
                "strike" | "s" => style.strike = true,
                "link" => style.link = Some(words.next()?.to_string()),
                "on" => style.bgcolor = Some(parse_color(words.next()?)?),
                other => style.color = Some(parse_color(other)?),
            }
        }
        Some(style)
    }

    /// Layer `other` on top of this style; attributes set in `other` win
    #[must_use]
    pub fn combine(&self, other: &Style) -> Style {
        Style {
            color: other.color.or(self.color),
            bgcolor: other.bgcolor.or(self.bgcolor),
            bold: self.bold || other.bold,
            dim: self.dim || other.dim,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
            blink: self.blink || other.blink,
            reverse: self.reverse || other.reverse,
            strike: self.strike || other.strike,
            link: other.link.clone().or_else(|| self.link.clone()),
        }
    }

    /// Render `text` with ANSI escapes for this style
    pub fn paint(&self, text: &str) -> String {
        if self.is_null() {
            return text.to_string();
        }
        let mut out: ColoredString = text.normal();
        if let Some(color) = self.color {
            out = out.color(color);
        }
        if let Some(color) = self.bgcolor {
            out = out.on_color(color);
        }
        if self.bold {
            out = out.bold();
        }
        if self.dim {
            out = out.dimmed();
        }
        if self.italic {
            out = out.italic();
        }
        if self.underline {
            out = out.underline();
        }
        if self.blink {
            out = out.blink();
        }
        if self.reverse {
            out = out.reversed();
        }
        if self.strike {
            out = out.strikethrough();
        }
        match &self.link {
            Some(target) => format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", target, out),
            None => out.to_string(),
        }
    }
}

fn parse_color(word: &str) -> Option<Color> {
    if let Some(hex) = word.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return Some(Color::TrueColor {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        });
    }
    word.replace('_', " ").parse::<Color>().ok()
}

/// Reference to a style, either by theme name or inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleRef {
    Named(Cow<'static, str>),
    Inline(Style),
}

impl StyleRef {
    /// Interpret a markup tag: inline when it parses as a style, otherwise a theme name
    pub fn from_definition(definition: &str) -> StyleRef {
        match Style::parse(definition) {
            Some(style) => StyleRef::Inline(style),
            None => StyleRef::Named(Cow::Owned(definition.trim().to_string())),
        }
    }
}

impl From<&'static str> for StyleRef {
    fn from(name: &'static str) -> Self {
        StyleRef::Named(Cow::Borrowed(name))
    }
}

impl From<String> for StyleRef {
    fn from(name: String) -> Self {
        StyleRef::Named(Cow::Owned(name))
    }
}

impl From<Style> for StyleRef {
    fn from(style: Style) -> Self {
        StyleRef::Inline(style)
    }
}

impl fmt::Display for StyleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleRef::Named(name) => write!(f, "{}", name),
            StyleRef::Inline(style) => write!(f, "{:?}", style),
        }
    }
}

/// Named style table consulted when output is painted
#[derive(Debug, Clone, Default)]
pub struct Theme {
    styles: HashMap<String, Style>,
}

impl Theme {
    /// An empty theme; every named style resolves to the null style
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, style: Style) {
        self.styles.insert(name.into(), style);
    }

    #[must_use]
    pub fn with_style(mut self, name: impl Into<String>, style: Style) -> Self {
        self.insert(name, style);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }

    pub fn resolve(&self, style: &StyleRef) -> Style {
        match style {
            StyleRef::Named(name) => self.styles.get(name.as_ref()).cloned().unwrap_or_default(),
            StyleRef::Inline(style) => style.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl Theme {
    /// The default console theme, including one entry per standard level
    pub fn standard() -> Self {
        use palette::*;

        let mut theme = Theme::empty();
        let entries: Vec<(&str, Style)> = vec![
            ("log.time", Style::new().fg(CYAN).bold()),
            ("log.level", Style::new()),
            ("log.message", Style::new()),
            ("log.path", Style::new().dim()),
            ("log.line_no", Style::new().fg(CYAN).bold().dim()),
            ("logging.keyword", Style::new().fg(ORANGE).bold()),
            ("repr.number", Style::new().fg(CYAN).bold()),
            ("repr.str", Style::new().fg(GREEN)),
            ("repr.brace", Style::new().bold()),
            ("repr.bool_true", Style::new().fg(BRIGHT_GREEN).italic()),
            ("repr.bool_false", Style::new().fg(BRIGHT_RED).italic()),
            ("repr.none", Style::new().fg(MAGENTA).italic()),
            ("repr.url", Style::new().fg(BRIGHT_BLUE).underline()),
            ("repr.path", Style::new().fg(MAGENTA)),
            ("repr.ellipsis", Style::new().fg(YELLOW)),
            ("scope.border", Style::new().fg(BLUE)),
            ("scope.key", Style::new().fg(YELLOW).italic()),
            ("scope.key.special", Style::new().fg(YELLOW).italic().dim()),
            ("scope.equals", Style::new().fg(RED)),
            ("traceback.error", Style::new().fg(RED).italic()),
            ("traceback.border.syntax_error", Style::new().fg(BRIGHT_RED)),
            ("traceback.border", Style::new().fg(RED)),
            ("traceback.title", Style::new().fg(RED).bold()),
            ("traceback.exc_type", Style::new().fg(BRIGHT_RED).bold()),
            ("traceback.offset", Style::new().fg(BRIGHT_RED).bold()),
            ("traceback.note", Style::new().italic()),
            ("pygments.text", Style::new().fg(WHITE)),
            ("pygments.string", Style::new().fg(YELLOW)),
            ("pygments.number", Style::new().fg(PURPLE)),
            ("pygments.function", Style::new().fg(GREEN)),
            ("pygments.keyword", Style::new().fg(RED)),
            ("pygments.comment", Style::new().fg(LIGHT_GREY)),
            ("source.lineno", Style::new().fg(LIGHT_GREY)),
            ("source.highlight", Style::new().bg(HIGHLIGHT)),
            ("source.marker", Style::new().fg(BRIGHT_RED).bold()),
        ];
        for (name, style) in entries {
            theme.insert(name, style);
        }
        for level in crate::core::level::LevelTable::standard().levels() {
            theme.insert(level.style_name(), level.style().clone());
        }
        theme
    }
}
