//! Assembles the time, level, message and path columns of one log line

use super::block::{Block, Column, Grid};
use super::style::Style;
use super::text::{Justify, Text};
use crate::core::config::RenderConfig;
use crate::core::level::Level;
use chrono::{DateTime, Duration, Local};
use std::fmt::Write as _;

/// Everything the layout needs to know about one record
#[derive(Debug, Clone)]
pub struct LayoutInput<'a> {
    pub level: &'a Level,
    pub time: DateTime<Local>,
    /// Overrides the configured time pattern
    pub time_format: Option<&'a str>,
    pub message: Option<Text>,
    pub traceback: Vec<Block>,
    pub path: Option<&'a str>,
    pub line: Option<u32>,
    /// Target for path hyperlinks; `None` disables them
    pub link_path: Option<&'a str>,
}

impl<'a> LayoutInput<'a> {
    pub fn new(level: &'a Level, time: DateTime<Local>) -> Self {
        Self {
            level,
            time,
            time_format: None,
            message: None,
            traceback: Vec::new(),
            path: None,
            line: None,
            link_path: None,
        }
    }
}

/// Stateful renderer for log lines
///
/// Remembers the last time it displayed so that bursts of records within
/// the configured interval show the time once.
#[derive(Debug)]
pub struct LayoutRenderer {
    config: RenderConfig,
    last_displayed_time: Option<DateTime<Local>>,
}

impl LayoutRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            last_displayed_time: None,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn last_displayed_time(&self) -> Option<DateTime<Local>> {
        self.last_displayed_time
    }

    /// Ordered blocks for one record: an optional time header and the main row
    ///
    /// `restricted` disables hyperlinks regardless of `link_path`.
    pub fn render(&mut self, input: LayoutInput<'_>, restricted: bool) -> Vec<Block> {
        let config = &self.config;
        let link_path = input.link_path.filter(|_| !restricted);

        let mut time_header: Option<Grid> = None;
        let mut main = Grid::new().with_edge(1);

        if config.show_time {
            if config.newline_time {
                let mut header = Grid::new().with_edge(1).with_top(1);
                header.add_column(Column::new().style("log.time"));
                time_header = Some(header);
            } else {
                main.add_column(Column::new().style("log.time"));
            }
        }
        if config.show_level_icon {
            main.add_column(Column::new().width(2));
        }
        if config.show_level {
            main.add_column(
                Column::new()
                    .style("log.level")
                    .width(config.resolved_level_width())
                    .justify(Justify::Left),
            );
        }
        main.add_column(Column::new().ratio(1).style("log.message"));
        let show_path = config.show_path && input.path.is_some();
        if show_path {
            main.add_column(Column::new().justify(Justify::Right));
        }

        let mut row: Vec<Block> = Vec::new();
        if config.show_time {
            let display = self.format_time(&input);
            if self.is_repeated(input.time) {
                let blank = Text::blank(display.cell_len());
                if !self.config.newline_time {
                    row.push(blank.into());
                }
            } else {
                self.last_displayed_time = Some(input.time);
                match time_header.as_mut() {
                    Some(header) => header.add_row(vec![display.into()]),
                    None => row.push(display.into()),
                }
            }
        }

        let level = input.level;
        if self.config.show_level_icon {
            row.push(Text::new(level.icon()).into());
        }
        if self.config.show_level {
            row.push(Text::styled(level.name(), level.style_name()).into());
        }

        let mut cell = Vec::new();
        if let Some(message) = input.message {
            cell.push(Block::Text(message));
        }
        cell.extend(input.traceback);
        row.push(Block::Group(cell));

        if show_path {
            if let Some(path) = input.path {
                row.push(path_cell(path, input.line, link_path));
            }
        }
        main.add_row(row);

        [time_header.map(Block::Grid), Some(Block::Grid(main))]
            .into_iter()
            .flatten()
            .filter(|block| !block.is_empty())
            .collect()
    }

    fn format_time(&self, input: &LayoutInput<'_>) -> Text {
        if input.time_format.is_none() {
            if let Some(format_time) = &self.config.format_time {
                return format_time(&input.time);
            }
        }
        let pattern = input.time_format.unwrap_or(&self.config.time_format);
        let mut out = String::new();
        if write!(out, "{}", input.time.format(pattern)).is_err() {
            // Invalid strftime items: show the pattern rather than fail the record
            out = pattern.to_string();
        }
        Text::new(out)
    }

    fn is_repeated(&self, time: DateTime<Local>) -> bool {
        if !self.config.omit_repeated_times {
            return false;
        }
        let interval = Duration::microseconds((self.config.omit_interval * 1_000_000.0) as i64);
        self.last_displayed_time
            .is_some_and(|last| time - last <= interval)
    }
}

fn path_cell(path: &str, line: Option<u32>, link_path: Option<&str>) -> Block {
    let path_style = match link_path {
        Some(target) => Style::new().link(format!("file://{}", target)),
        None => Style::new(),
    };
    let path_text = Text::styled(path, path_style);
    let Some(line) = line.filter(|line| *line > 0) else {
        return path_text.into();
    };

    let line_style = match link_path {
        Some(target) => Style::new().link(format!("file://{}#{}", target, line)),
        None => Style::new(),
    };
    let mut grid = Grid::new().with_gap(0);
    grid.add_column(Column::new().style("log.path").justify(Justify::Right));
    grid.add_column(Column::new());
    grid.add_column(Column::new().style("log.line_no").justify(Justify::Left));
    grid.add_row(vec![
        path_text.into(),
        ":".into(),
        Text::styled(line.to_string(), line_style).into(),
    ]);
    grid.into()
}
