//! Console output target
//!
//! Lays display blocks out at a fixed width and paints them with ANSI styles
//! resolved from a [`Theme`].

use crate::core::sink::OutputTarget;
use crate::render::text::cell_width;
use crate::render::{Block, Column, Grid, Justify, Panel, Style, Text, Theme};
use std::fmt;
use std::io::{self, IsTerminal, Write};

/// Width used when `COLUMNS` is unset or invalid
pub const DEFAULT_WIDTH: usize = 100;

pub struct Console {
    writer: Box<dyn Write + Send>,
    theme: Theme,
    use_colors: bool,
    width: usize,
    quiet: bool,
}

impl Console {
    /// Console over any writer; colors are off until enabled
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
            theme: Theme::standard(),
            use_colors: false,
            width: detect_width(),
            quiet: false,
        }
    }

    pub fn stdout() -> Self {
        let colors = io::stdout().is_terminal() && colors_allowed();
        Self::new(io::stdout()).with_colors(colors)
    }

    pub fn stderr() -> Self {
        let colors = io::stderr().is_terminal() && colors_allowed();
        Self::new(io::stderr()).with_colors(colors)
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn use_colors(&self) -> bool {
        self.use_colors
    }

    /// Painted output lines, trailing spaces removed
    pub fn render_lines(&self, blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .flat_map(|block| render_block(block, self.width))
            .map(|line| self.paint_line(&line))
            .collect()
    }

    pub fn render_to_string(&self, blocks: &[Block]) -> String {
        self.render_lines(blocks)
            .into_iter()
            .map(|line| line + "\n")
            .collect()
    }

    fn paint_line(&self, line: &Text) -> String {
        let trimmed = line.plain().trim_end();
        if !self.use_colors {
            return trimmed.to_string();
        }

        let end = trimmed.len();
        let mut cuts = vec![0, end];
        for span in line.spans() {
            cuts.extend([span.start, span.end].into_iter().filter(|cut| *cut < end));
        }
        cuts.sort_unstable();
        cuts.dedup();

        let base = line
            .base_style()
            .map(|style| self.theme.resolve(style))
            .unwrap_or_default();

        let mut out = String::new();
        let mut pending: Option<(Style, usize)> = None;
        for window in cuts.windows(2) {
            let (start, stop) = (window[0], window[1]);
            let style = line
                .spans()
                .iter()
                .filter(|span| span.start <= start && span.end >= stop)
                .fold(base.clone(), |acc, span| {
                    acc.combine(&self.theme.resolve(&span.style))
                });

            let same = matches!(&pending, Some((current, _)) if *current == style);
            if !same {
                if let Some((current, from)) = pending.take() {
                    out.push_str(&current.paint(&trimmed[from..start]));
                }
                pending = Some((style, start));
            }
        }
        if let Some((current, from)) = pending {
            out.push_str(&current.paint(&trimmed[from..end]));
        }
        out
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("theme_styles", &self.theme.len())
            .field("use_colors", &self.use_colors)
            .field("width", &self.width)
            .field("quiet", &self.quiet)
            .finish()
    }
}

impl OutputTarget for Console {
    fn print(&mut self, blocks: &[Block]) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        for line in self.render_lines(blocks) {
            writeln!(self.writer, "{}", line)?;
        }
        self.writer.flush()
    }

    fn width(&self) -> usize {
        self.width
    }

    fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    fn is_quiet(&self) -> bool {
        self.quiet
    }
}

fn detect_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|width| *width > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

fn colors_allowed() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Lay a block out as lines no wider than `width`
fn render_block(block: &Block, width: usize) -> Vec<Text> {
    match block {
        Block::Text(text) => render_text(text, width),
        Block::Group(blocks) => blocks
            .iter()
            .flat_map(|block| render_block(block, width))
            .collect(),
        Block::Grid(grid) => render_grid(grid, width),
        Block::Panel(panel) => render_panel(panel, width),
    }
}

fn render_text(text: &Text, width: usize) -> Vec<Text> {
    text.wrap(width)
        .into_iter()
        .map(|line| match line.justify() {
            Justify::Left => line,
            justify => line.fit(width, justify),
        })
        .collect()
}

/// Natural width of a block
fn measure(block: &Block) -> usize {
    match block {
        Block::Text(text) => text
            .plain()
            .split('\n')
            .map(cell_width)
            .max()
            .unwrap_or(0),
        Block::Group(blocks) => blocks.iter().map(measure).max().unwrap_or(0),
        Block::Grid(grid) => {
            let count = column_count(grid);
            if count == 0 {
                return 0;
            }
            let columns: usize = (0..count)
                .map(|idx| {
                    grid.columns
                        .get(idx)
                        .and_then(|column| column.width)
                        .unwrap_or_else(|| natural_width(grid, idx))
                })
                .sum();
            columns + grid.gap * (count - 1) + 2 * grid.edge
        }
        Block::Panel(panel) => panel.width.unwrap_or_else(|| {
            panel.body.iter().map(measure).max().unwrap_or(0) + panel_frame(panel)
        }),
    }
}

fn column_count(grid: &Grid) -> usize {
    grid.rows
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .max(grid.columns.len())
}

fn natural_width(grid: &Grid, idx: usize) -> usize {
    grid.rows
        .iter()
        .filter_map(|row| row.get(idx))
        .map(measure)
        .max()
        .unwrap_or(0)
}

fn column_widths(grid: &Grid, columns: &[&Column], width: usize) -> Vec<usize> {
    let count = columns.len();
    let available = width.saturating_sub(2 * grid.edge + grid.gap * count.saturating_sub(1));

    let mut widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(idx, column)| match (column.width, column.ratio) {
            (Some(width), _) => width,
            (None, Some(_)) => 0,
            (None, None) => natural_width(grid, idx),
        })
        .collect();

    let flexible: Vec<usize> = (0..count)
        .filter(|idx| columns[*idx].width.is_none() && columns[*idx].ratio.is_none())
        .collect();
    let mut used: usize = widths.iter().sum();
    while used > available {
        let Some(&widest) = flexible
            .iter()
            .filter(|idx| widths[**idx] > 1)
            .max_by_key(|idx| widths[**idx])
        else {
            break;
        };
        let cut = (used - available).min(widths[widest] - 1);
        widths[widest] -= cut;
        used -= cut;
    }

    let ratio_columns: Vec<(usize, usize)> = columns
        .iter()
        .enumerate()
        .filter_map(|(idx, column)| match (column.width, column.ratio) {
            (None, Some(ratio)) => Some((idx, ratio.max(1))),
            _ => None,
        })
        .collect();
    let total_ratio: usize = ratio_columns.iter().map(|(_, ratio)| ratio).sum();
    if total_ratio > 0 {
        let remaining = available.saturating_sub(used);
        let mut left = remaining;
        for (position, (idx, ratio)) in ratio_columns.iter().enumerate() {
            let share = if position + 1 == ratio_columns.len() {
                left
            } else {
                remaining * ratio / total_ratio
            };
            left = left.saturating_sub(share);
            widths[*idx] = share.max(1);
        }
    }
    widths
}

fn render_cell(cell: &Block, column: &Column, width: usize) -> Vec<Text> {
    match cell {
        Block::Text(text) if column.no_wrap => render_text(&text.clone().with_no_wrap(true), width),
        other => render_block(other, width),
    }
}

fn render_grid(grid: &Grid, width: usize) -> Vec<Text> {
    let mut lines = vec![Text::default(); grid.top];
    let count = column_count(grid);
    if count == 0 {
        return lines;
    }

    let fallback = Column::new();
    let columns: Vec<&Column> = (0..count)
        .map(|idx| grid.columns.get(idx).unwrap_or(&fallback))
        .collect();
    let widths = column_widths(grid, &columns, width);
    let gap = " ".repeat(grid.gap);
    let edge = " ".repeat(grid.edge);

    for row in &grid.rows {
        let cells: Vec<Vec<Text>> = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| match row.get(idx) {
                Some(cell) => render_cell(cell, column, widths[idx]),
                None => Vec::new(),
            })
            .collect();
        let height = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);

        for index in 0..height {
            let mut line = Text::new(edge.clone());
            for (idx, column) in columns.iter().enumerate() {
                if idx > 0 {
                    line.append(&gap, None);
                }
                let source = cells[idx].get(index).cloned().unwrap_or_default();
                let justify = match column.justify {
                    Justify::Left => source.justify(),
                    justify => justify,
                };
                let fitted = source.fit(widths[idx], justify);
                let mut cell = match &column.style {
                    Some(style) => Text::styled("", style.clone()),
                    None => Text::default(),
                };
                cell.append_text(&fitted);
                line.append_text(&cell);
            }
            line.append(&edge, None);
            lines.push(line);
        }
    }
    lines
}

fn panel_frame(panel: &Panel) -> usize {
    2 + 2 * panel.padding
}

fn render_panel(panel: &Panel, width: usize) -> Vec<Text> {
    let frame = panel_frame(panel);
    let outer = panel
        .width
        .unwrap_or_else(|| panel.body.iter().map(measure).max().unwrap_or(0) + frame)
        .min(width)
        .max(frame + 1);
    let inner = outer - frame;
    let rule = outer - 2;
    let border = panel.border_style.clone();

    let mut top = Text::default();
    top.append("╭", border.clone());
    match &panel.title {
        Some(title) if rule >= 4 => {
            let title = title.crop(rule - 2);
            let label = title.cell_len() + 2;
            let left = (rule - label) / 2;
            top.append(&"─".repeat(left), border.clone());
            top.append(" ", None);
            top.append_text(&title);
            top.append(" ", None);
            top.append(&"─".repeat(rule - label - left), border.clone());
        }
        _ => top.append(&"─".repeat(rule), border.clone()),
    }
    top.append("╮", border.clone());

    let mut lines = vec![top];
    let pad = " ".repeat(panel.padding);
    for block in &panel.body {
        for line in render_block(block, inner) {
            let mut row = Text::default();
            row.append("│", border.clone());
            row.append(&pad, None);
            row.append_text(&line.fit(inner, line.justify()));
            row.append(&pad, None);
            row.append("│", border.clone());
            lines.push(row);
        }
    }

    let mut bottom = Text::default();
    bottom.append(&format!("╰{}╯", "─".repeat(rule)), border);
    lines.push(bottom);
    lines
}
