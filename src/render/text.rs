//! Styled text with overlapping style spans and console markup

use super::style::StyleRef;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Horizontal alignment of text inside a cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Justify {
    #[default]
    Left,
    Right,
    Center,
}

/// A style applied to the byte range `start..end` of a [`Text`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub style: StyleRef,
}

impl Span {
    pub fn new(start: usize, end: usize, style: impl Into<StyleRef>) -> Self {
        Self {
            start,
            end,
            style: style.into(),
        }
    }
}

/// Plain text plus style spans
///
/// Span offsets are byte offsets into `plain` and always fall on char
/// boundaries. Later spans are painted over earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text {
    plain: String,
    spans: Vec<Span>,
    style: Option<StyleRef>,
    justify: Justify,
    no_wrap: bool,
}

impl Text {
    pub fn new(plain: impl Into<String>) -> Self {
        Self {
            plain: plain.into(),
            ..Self::default()
        }
    }

    /// Text with a base style covering the whole string
    pub fn styled(plain: impl Into<String>, style: impl Into<StyleRef>) -> Self {
        Self {
            plain: plain.into(),
            style: Some(style.into()),
            ..Self::default()
        }
    }

    /// Build text from `(fragment, style)` parts
    pub fn assemble<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<StyleRef>)>,
        S: AsRef<str>,
    {
        let mut text = Text::default();
        for (fragment, style) in parts {
            text.append(fragment.as_ref(), style);
        }
        text
    }

    /// Blank text of `width` spaces
    pub fn blank(width: usize) -> Self {
        Text::new(" ".repeat(width))
    }

    #[must_use]
    pub fn with_justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    #[must_use]
    pub fn with_no_wrap(mut self, no_wrap: bool) -> Self {
        self.no_wrap = no_wrap;
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: impl Into<StyleRef>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn plain(&self) -> &str {
        &self.plain
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn base_style(&self) -> Option<&StyleRef> {
        self.style.as_ref()
    }

    pub fn justify(&self) -> Justify {
        self.justify
    }

    pub fn no_wrap(&self) -> bool {
        self.no_wrap
    }

    /// Display width in terminal cells
    pub fn cell_len(&self) -> usize {
        cell_width(&self.plain)
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_empty()
    }

    pub fn append(&mut self, fragment: &str, style: Option<StyleRef>) {
        let start = self.plain.len();
        self.plain.push_str(fragment);
        if let Some(style) = style {
            if !fragment.is_empty() {
                self.spans.push(Span::new(start, self.plain.len(), style));
            }
        }
    }

    /// Append another text, keeping its spans and base style
    pub fn append_text(&mut self, other: &Text) {
        let offset = self.plain.len();
        self.plain.push_str(&other.plain);
        if let Some(style) = &other.style {
            if !other.plain.is_empty() {
                self.spans
                    .push(Span::new(offset, offset + other.plain.len(), style.clone()));
            }
        }
        self.spans.extend(other.spans.iter().map(|span| Span {
            start: span.start + offset,
            end: span.end + offset,
            style: span.style.clone(),
        }));
    }

    /// Apply a style to the byte range `start..end`
    pub fn stylize(&mut self, style: impl Into<StyleRef>, start: usize, end: usize) {
        let end = end.min(self.plain.len());
        if start < end {
            self.spans.push(Span::new(start, end, style));
        }
    }

    /// Apply a style between two char offsets
    pub fn stylize_chars(&mut self, style: impl Into<StyleRef>, start: usize, end: usize) {
        let start = self.byte_offset(start);
        let end = self.byte_offset(end);
        self.stylize(style, start, end);
    }

    /// Highlight every occurrence of each word, in order; returns the match count
    pub fn highlight_words<S: AsRef<str>>(&mut self, words: &[S], style: &StyleRef) -> usize {
        let mut count = 0;
        for word in words {
            let word = word.as_ref();
            if word.is_empty() {
                continue;
            }
            let matches: Vec<(usize, usize)> = self
                .plain
                .match_indices(word)
                .map(|(start, found)| (start, start + found.len()))
                .collect();
            for (start, end) in matches {
                self.stylize(style.clone(), start, end);
                count += 1;
            }
        }
        count
    }

    /// Highlight every match of `pattern`; returns the match count
    pub fn highlight_regex(&mut self, pattern: &Regex, style: &StyleRef) -> usize {
        let matches: Vec<(usize, usize)> = pattern
            .find_iter(&self.plain)
            .map(|m| (m.start(), m.end()))
            .collect();
        for &(start, end) in &matches {
            self.stylize(style.clone(), start, end);
        }
        matches.len()
    }

    /// Sub-text between two char offsets, with spans clipped to the range
    pub fn slice_chars(&self, start: usize, end: usize) -> Text {
        let start = self.byte_offset(start);
        let end = self.byte_offset(end).max(start);
        self.slice_bytes(start, end)
    }

    fn slice_bytes(&self, start: usize, end: usize) -> Text {
        let spans = self
            .spans
            .iter()
            .filter(|span| span.start < end && span.end > start)
            .map(|span| Span {
                start: span.start.max(start) - start,
                end: span.end.min(end) - start,
                style: span.style.clone(),
            })
            .collect();
        Text {
            plain: self.plain[start..end].to_string(),
            spans,
            style: self.style.clone(),
            justify: self.justify,
            no_wrap: self.no_wrap,
        }
    }

    /// Byte offset of the longest grapheme prefix that fits in `cells`
    fn cell_offset(&self, cells: usize) -> usize {
        let mut used = 0;
        for (idx, grapheme) in self.plain.grapheme_indices(true) {
            used += grapheme.width();
            if used > cells {
                return idx;
            }
        }
        self.plain.len()
    }

    /// Crop to at most `width` cells without splitting a grapheme
    pub fn crop(&self, width: usize) -> Text {
        self.slice_bytes(0, self.cell_offset(width))
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.plain
            .char_indices()
            .nth(chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.plain.len())
    }

    /// Split on newlines, keeping spans
    pub fn split_lines(&self) -> Vec<Text> {
        let mut lines = Vec::new();
        let mut start = 0;
        for (idx, _) in self.plain.match_indices('\n') {
            lines.push(self.slice_bytes(start, idx));
            start = idx + 1;
        }
        lines.push(self.slice_bytes(start, self.plain.len()));
        lines
    }

    /// Wrap into lines no wider than `width`
    ///
    /// Breaks at the last space inside the width when there is one, and
    /// folds long words otherwise. `no_wrap` text is cropped instead.
    pub fn wrap(&self, width: usize) -> Vec<Text> {
        let width = width.max(1);
        let mut out = Vec::new();
        for line in self.split_lines() {
            if line.no_wrap {
                out.push(line.crop(width));
                continue;
            }
            let mut rest = line;
            while rest.cell_len() > width {
                // A grapheme wider than the line still moves to its own line
                let first = rest.plain.graphemes(true).next().map_or(0, str::len);
                let limit = rest.cell_offset(width).max(first);
                let cut = rest.plain[..limit]
                    .rfind(' ')
                    .filter(|pos| *pos > 0)
                    .map(|pos| pos + 1)
                    .unwrap_or(limit);
                let head = rest.slice_bytes(0, cut);
                let tail = rest.slice_bytes(cut, rest.plain.len());
                out.push(head.trim_end());
                rest = tail;
            }
            out.push(rest);
        }
        out
    }

    fn trim_end(self) -> Text {
        let trimmed = self.plain.trim_end_matches(' ').len();
        self.slice_bytes(0, trimmed)
    }

    /// Pad (or crop) to exactly `width` cells according to `justify`
    pub fn fit(&self, width: usize, justify: Justify) -> Text {
        let len = self.cell_len();
        if len == width {
            return self.clone();
        }
        if len > width {
            let cropped = self.crop(width);
            // A wide grapheme cut at the edge leaves a cell to fill
            let gap = width - cropped.cell_len();
            return cropped.padded_right(gap);
        }
        let gap = width - len;
        let (left, right) = match justify {
            Justify::Left => (0, gap),
            Justify::Right => (gap, 0),
            Justify::Center => (gap / 2, gap - gap / 2),
        };
        let mut out = Text::blank(left);
        out.append_text(self);
        out.append(&" ".repeat(right), None);
        out.justify = self.justify;
        out.no_wrap = self.no_wrap;
        out
    }

    fn padded_right(mut self, cells: usize) -> Text {
        if cells > 0 {
            self.plain.push_str(&" ".repeat(cells));
        }
        self
    }

    /// Parse console markup such as `"[bold red]alert[/] done"`
    ///
    /// Tags must start with a lower-case letter, `#`, `@` or `/`; anything
    /// else in brackets is literal text. `\[` escapes a bracket. `[/]` closes
    /// the innermost open tag, `[/name]` the innermost tag with that name.
    /// Unclosed tags run to the end of the text.
    pub fn from_markup(markup: &str) -> Text {
        let mut text = Text::default();
        let mut open: Vec<(String, usize)> = Vec::new();
        let mut rest = markup;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("\\[") {
                text.plain.push('[');
                rest = after;
                continue;
            }
            if rest.starts_with('[') {
                if let Some(close) = rest.find(']') {
                    let tag = &rest[1..close];
                    if is_tag(tag) {
                        if let Some(name) = tag.strip_prefix('/') {
                            let name = name.trim();
                            let position = if name.is_empty() {
                                open.len().checked_sub(1)
                            } else {
                                open.iter().rposition(|(open_name, _)| open_name == name)
                            };
                            if let Some(position) = position {
                                let (name, start) = open.remove(position);
                                text.stylize(StyleRef::from_definition(&name), start, text.plain.len());
                            }
                        } else {
                            open.push((tag.trim().to_string(), text.plain.len()));
                        }
                        rest = &rest[close + 1..];
                        continue;
                    }
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                text.plain.push(c);
            }
            rest = chars.as_str();
        }

        while let Some((name, start)) = open.pop() {
            let end = text.plain.len();
            text.stylize(StyleRef::from_definition(&name), start, end);
        }
        text
    }
}

fn is_tag(tag: &str) -> bool {
    !tag.contains('[')
        && tag
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || matches!(c, '#' | '@' | '/'))
}

/// Display width of `s` in terminal cells, summed per grapheme
pub fn cell_width(s: &str) -> usize {
    s.graphemes(true).map(UnicodeWidthStr::width).sum()
}

/// Escape text so [`Text::from_markup`] renders it verbatim
pub fn escape_markup(text: &str) -> String {
    text.replace('[', "\\[")
}

impl From<&str> for Text {
    fn from(plain: &str) -> Self {
        Text::new(plain)
    }
}

impl From<String> for Text {
    fn from(plain: String) -> Self {
        Text::new(plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::style::Style;

    #[test]
    fn test_markup_applies_styles() {
        let text = Text::from_markup("[bold]alert[/bold] ok");
        assert_eq!(text.plain(), "alert ok");
        assert_eq!(text.spans().len(), 1);
        assert_eq!(text.spans()[0].start, 0);
        assert_eq!(text.spans()[0].end, 5);
        assert_eq!(
            text.spans()[0].style,
            StyleRef::Inline(Style::new().bold())
        );
    }

    #[test]
    fn test_markup_theme_names_and_implicit_close() {
        let text = Text::from_markup("[logging.keyword]kw[/] [red]tail");
        assert_eq!(text.plain(), "kw tail");
        assert_eq!(text.spans()[0].style, StyleRef::from("logging.keyword"));
        assert_eq!(text.spans()[1].start, 3);
        assert_eq!(text.spans()[1].end, 7);
    }

    #[test]
    fn test_markup_leaves_non_tags_literal() {
        let text = Text::from_markup("values [1, 2] and \\[bold] stay");
        assert_eq!(text.plain(), "values [1, 2] and [bold] stay");
        assert!(text.spans().is_empty());
    }

    #[test]
    fn test_escape_round_trip() {
        let raw = "[red]not a tag[/red]";
        let text = Text::from_markup(&escape_markup(raw));
        assert_eq!(text.plain(), raw);
    }

    #[test]
    fn test_highlight_words_counts_matches() {
        let mut text = Text::new("GET /a then GET /b");
        let count = text.highlight_words(&["GET"], &StyleRef::from("logging.keyword"));
        assert_eq!(count, 2);
        assert_eq!(text.spans()[1].start, 12);
    }

    #[test]
    fn test_wrap_breaks_at_spaces_and_folds() {
        let text = Text::new("alpha beta gamma");
        let lines: Vec<String> = text.wrap(11).iter().map(|l| l.plain().to_string()).collect();
        assert_eq!(lines, vec!["alpha beta", "gamma"]);

        let text = Text::new("abcdefgh");
        let lines: Vec<String> = text.wrap(3).iter().map(|l| l.plain().to_string()).collect();
        assert_eq!(lines, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_fit_justifies() {
        let text = Text::new("ab");
        assert_eq!(text.fit(5, Justify::Right).plain(), "   ab");
        assert_eq!(text.fit(5, Justify::Center).plain(), " ab  ");
        assert_eq!(Text::new("abcdef").fit(3, Justify::Left).plain(), "abc");
    }

    #[test]
    fn test_cell_len_counts_terminal_cells() {
        assert_eq!(Text::new("日本語").cell_len(), 6);
        assert_eq!(Text::new("🐛").cell_len(), 2);
        assert_eq!(Text::new("⚠️").cell_len(), 2);
        assert_eq!(Text::new("abc").cell_len(), 3);
        assert_eq!(cell_width("e\u{301}"), 1);
    }

    #[test]
    fn test_fit_pads_wide_text_by_cells() {
        assert_eq!(Text::new("🐛").fit(2, Justify::Left).plain(), "🐛");
        assert_eq!(Text::new("⚠️").fit(3, Justify::Left).plain(), "⚠️ ");
        assert_eq!(Text::new("日本").fit(6, Justify::Right).plain(), "  日本");

        // Cropping never splits a wide char; the freed cell becomes a space
        let cropped = Text::new("日本語").fit(5, Justify::Left);
        assert_eq!(cropped.plain(), "日本 ");
        assert_eq!(cropped.cell_len(), 5);
    }

    #[test]
    fn test_wrap_measures_wide_chars() {
        let text = Text::new("日本語のテキスト");
        let lines = text.wrap(5);
        let plain: Vec<&str> = lines.iter().map(Text::plain).collect();
        assert_eq!(plain, vec!["日本", "語の", "テキ", "スト"]);
        assert!(lines.iter().all(|line| line.cell_len() <= 5));

        let lines = Text::new("ok 日本語").wrap(4);
        let plain: Vec<&str> = lines.iter().map(Text::plain).collect();
        assert_eq!(plain, vec!["ok", "日本", "語"]);

        let cropped = Text::new("日本語").with_no_wrap(true).wrap(3);
        assert_eq!(cropped[0].plain(), "日");
    }

    #[test]
    fn test_slice_keeps_clipped_spans() {
        let mut text = Text::new("hello world");
        text.stylize("repr.str", 3, 8);
        let slice = text.slice_chars(5, 11);
        assert_eq!(slice.plain(), " world");
        assert_eq!(slice.spans()[0].start, 0);
        assert_eq!(slice.spans()[0].end, 3);
    }
}
