//! Renders exception chains as bordered panels of frames and source windows

use super::block::{Block, Column, Grid, Panel};
use super::highlighter::{Highlighter, ReprHighlighter};
use super::source::{FileSourceService, SourceService};
use super::style::Style;
use super::text::{cell_width, Justify, Text};
use crate::core::config::TracebackConfig;
use crate::core::error::{LogError, Result};
use crate::core::host;
use crate::core::trace::{Frame, Stack, SyntaxErrorDetail, Trace};
use std::ops::Range;
use std::sync::Arc;

pub const CAUSE_TRANSITION: &str =
    "The above exception was the direct cause of the following exception:";
pub const CONTEXT_TRANSITION: &str =
    "During handling of the above exception, another exception occurred:";

/// Builds display blocks for a [`Trace`]
pub struct TracebackRenderer {
    config: TracebackConfig,
    source: Arc<dyn SourceService>,
    highlighter: Arc<dyn Highlighter>,
    restricted: bool,
}

impl TracebackRenderer {
    pub fn new(config: TracebackConfig) -> Self {
        Self {
            config,
            source: Arc::new(FileSourceService::new()),
            highlighter: Arc::new(ReprHighlighter),
            restricted: host::is_restricted_host(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_source_service(mut self, source: Arc<dyn SourceService>) -> Self {
        self.source = source;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.highlighter = highlighter;
        self
    }

    /// Override restricted-host detection; restricted hosts get no hyperlinks
    #[must_use = "builder methods return a new value"]
    pub fn with_restricted_host(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    pub fn config(&self) -> &TracebackConfig {
        &self.config
    }

    /// Newest exception first, each exception's frames oldest first
    pub fn render(&self, trace: &Trace) -> Result<Vec<Block>> {
        trace.validate()?;

        let width = self.config.resolved_width();
        let mut out = Vec::new();
        let count = trace.stacks.len();

        for (position, stack) in trace.stacks.iter().rev().enumerate() {
            if !stack.frames().is_empty() {
                let panel = Panel::new(self.render_stack(stack))
                    .with_title(Text::styled("Traceback", "traceback.title"))
                    .with_border_style("traceback.border")
                    .with_width(Some(width));
                out.push(panel.into());
            }

            if let Some(detail) = &stack.syntax_error {
                let panel = Panel::new(self.render_syntax_error(detail))
                    .with_border_style("traceback.border.syntax_error")
                    .with_width(Some(width));
                out.push(panel.into());
                out.push(self.summary(&stack.exc_type, Some(&detail.msg)).into());
            } else if !stack.exc_value.is_empty() {
                out.push(self.summary(&stack.exc_type, Some(&stack.exc_value)).into());
            } else {
                out.push(self.summary(&stack.exc_type, None).into());
            }

            if position + 1 < count {
                let transition = if stack.is_cause {
                    CAUSE_TRANSITION
                } else {
                    CONTEXT_TRANSITION
                };
                out.push(Text::new("").into());
                out.push(Text::styled(transition, Style::new().italic()).into());
                out.push(Text::new("").into());
            }
        }
        Ok(out)
    }

    fn summary(&self, exc_type: &str, value: Option<&str>) -> Text {
        match value {
            Some(value) => {
                let mut text = Text::default();
                text.append(&format!("{}: ", exc_type), Some("traceback.exc_type".into()));
                text.append_text(&self.highlighter.apply(value));
                text
            }
            None => Text::styled(exc_type, "traceback.exc_type"),
        }
    }

    /// Frames skipped by elision, if any
    pub fn elided_range(&self, frame_count: usize) -> Option<Range<usize>> {
        let max = self.config.max_frames;
        (max > 0 && frame_count > max).then(|| max / 2..frame_count - max / 2)
    }

    fn render_stack(&self, stack: &Stack) -> Vec<Block> {
        let frames = stack.frames();
        let elided = self.elided_range(frames.len());
        let mut out = Vec::new();

        for (index, frame) in frames.iter().enumerate() {
            if let Some(range) = &elided {
                if index == range.start {
                    out.push(Text::new("").into());
                    out.push(
                        Text::styled(
                            format!("... {} frames hidden ...", range.len()),
                            "traceback.error",
                        )
                        .with_justify(Justify::Center)
                        .into(),
                    );
                }
                if range.contains(&index) {
                    continue;
                }
            }

            let locals = self.render_locals(frame);

            if index > 0 && !frame.is_synthetic() {
                out.push(Text::new("").into());
            }
            out.push(self.frame_header(frame).into());

            if frame.is_synthetic() || self.is_suppressed(frame) {
                out.extend(locals);
                continue;
            }

            match self.render_source(frame) {
                Ok(code) => match locals {
                    Some(locals) => {
                        let mut grid = Grid::new();
                        grid.add_column(Column::new().width(self.config.code_width));
                        grid.add_column(Column::new().ratio(1));
                        grid.add_row(vec![code, locals]);
                        out.push(grid.into());
                    }
                    None => out.push(code),
                },
                Err(error) => {
                    out.push(Text::styled(error.to_string(), "traceback.error").into());
                    out.extend(locals);
                }
            }
        }
        out
    }

    fn is_suppressed(&self, frame: &Frame) -> bool {
        self.config
            .suppress
            .iter()
            .any(|prefix| frame.filename.starts_with(prefix.as_str()))
    }

    fn frame_header(&self, frame: &Frame) -> Text {
        let lineno = frame.lineno.to_string();
        if self.source.exists(&frame.filename) {
            let mut text = Text::default().with_style("pygments.text");
            text.append(&frame.filename, Some("pygments.string".into()));
            if !self.restricted {
                let link = format!("file://{}", absolute(&frame.filename));
                text.stylize(Style::new().link(link), 0, frame.filename.len());
            }
            text.append(":", Some("pygments.text".into()));
            text.append(&lineno, Some("pygments.number".into()));
            text.append(" in ", None);
            text.append(&frame.name, Some("pygments.function".into()));
            text
        } else {
            Text::assemble([
                ("in ", None),
                (frame.name.as_str(), Some("pygments.function".into())),
                (":", Some("pygments.text".into())),
                (lineno.as_str(), Some("pygments.number".into())),
            ])
            .with_style("pygments.text")
        }
    }

    /// Source window around the failing line
    fn render_source(&self, frame: &Frame) -> Result<Block> {
        let code = self.source.read_code(&frame.filename)?;
        let lexer = self.source.guess_lexer(&frame.filename, &code);
        let lines = self.source.highlight_lines(&code, lexer);

        let target = frame.lineno as usize;
        if target == 0 || target > lines.len() {
            return Err(LogError::source_unavailable(
                &frame.filename,
                format!("line {} is outside the file ({} lines)", target, lines.len()),
            ));
        }
        let first = target.saturating_sub(self.config.extra_lines).max(1);
        let last = (target + self.config.extra_lines).min(lines.len());
        let number_width = last.to_string().len();

        let mut grid = Grid::new();
        grid.add_column(Column::new().width(1).style("source.marker"));
        grid.add_column(
            Column::new()
                .width(number_width)
                .justify(Justify::Right)
                .style("source.lineno"),
        );
        let mut code_column = Column::new().ratio(1);
        if !self.config.word_wrap {
            code_column = code_column.no_wrap();
        }
        grid.add_column(code_column);

        for number in first..=last {
            let mut line = lines[number - 1].clone().with_no_wrap(!self.config.word_wrap);
            let marker = if number == target {
                let end = line.plain().len();
                line.stylize("source.highlight", 0, end);
                "❱"
            } else {
                " "
            };
            grid.add_row(vec![
                marker.into(),
                Text::new(number.to_string()).into(),
                line.into(),
            ]);
        }
        Ok(grid.into())
    }

    fn render_locals(&self, frame: &Frame) -> Option<Block> {
        if !self.config.show_locals {
            return None;
        }
        let locals = frame.locals.as_ref()?;
        let limits = &self.config.locals;

        let visible: Vec<&(String, String)> = locals
            .iter()
            .filter(|(name, _)| !(limits.hide_dunder && name.starts_with("__")))
            .filter(|(name, _)| {
                !(limits.hide_sunder && name.starts_with('_') && !name.starts_with("__"))
            })
            .collect();

        let shown = if limits.max_length > 0 {
            visible.len().min(limits.max_length)
        } else {
            visible.len()
        };

        let mut grid = Grid::new().with_gap(1);
        grid.add_column(Column::new().justify(Justify::Right));
        grid.add_column(Column::new());
        grid.add_column(Column::new().ratio(1));

        for (name, value) in visible.iter().take(shown) {
            let key_style = if name.starts_with("__") {
                "scope.key.special"
            } else {
                "scope.key"
            };
            grid.add_row(vec![
                Text::styled(name.as_str(), key_style).into(),
                Text::styled("=", "scope.equals").into(),
                self.render_value(value).into(),
            ]);
        }

        let mut body = vec![Block::Grid(grid)];
        if visible.len() > shown {
            body.push(
                Text::styled(format!("… +{}", visible.len() - shown), "repr.ellipsis").into(),
            );
        }

        Some(
            Panel::new(body)
                .with_title(Text::styled("locals", Style::new().bold()))
                .with_border_style("scope.border")
                .into(),
        )
    }

    fn render_value(&self, value: &str) -> Text {
        let max = self.config.locals.max_string;
        let length = value.chars().count();
        if max == 0 || length <= max {
            return self.highlighter.apply(value);
        }
        let head: String = value.chars().take(max).collect();
        let mut text = self.highlighter.apply(&head);
        text.append(&format!("+{}", length - max), Some("repr.ellipsis".into()));
        text
    }

    fn render_syntax_error(&self, detail: &SyntaxErrorDetail) -> Vec<Block> {
        let location = Text::assemble([
            (detail.filename.as_str(), Some("pygments.string".into())),
            (":", Some("pygments.text".into())),
            (detail.lineno.to_string().as_str(), Some("pygments.number".into())),
        ])
        .with_style("pygments.text");

        let source = detail.line.trim_end();
        let mut line = self.highlighter.apply(source).with_no_wrap(true);
        let length = source.chars().count();
        let column = detail.offset.saturating_sub(1).min(length.saturating_sub(1));
        if length > 0 {
            line.stylize_chars(Style::new().bold().underline(), column, column + 1);
        }

        let lead: String = source.chars().take(column).collect();
        let mut caret = Text::blank(cell_width(&lead));
        caret.append("▲", Some("traceback.offset".into()));

        vec![location.into(), line.into(), caret.into()]
    }
}

fn absolute(path: &str) -> String {
    std::path::absolute(path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LocalsConfig;
    use crate::render::block::blocks_to_plain;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn renderer(config: TracebackConfig) -> TracebackRenderer {
        TracebackRenderer::new(config).with_restricted_host(true)
    }

    fn synthetic_frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame::new(format!("/nowhere/f{}.rs", i), 10, format!("f{}", i)))
            .collect()
    }

    fn panel_body(blocks: &[Block]) -> &Vec<Block> {
        match &blocks[0] {
            Block::Panel(panel) => &panel.body,
            other => panic!("expected panel, got {:?}", other),
        }
    }

    #[test]
    fn test_elision_hides_middle_frames() {
        let trace = Trace::new(vec![Stack::new("E", "x").with_frames(synthetic_frames(30))]);
        let blocks = renderer(TracebackConfig::default()).render(&trace).unwrap();
        let plain = blocks_to_plain(panel_body(&blocks));

        assert_eq!(plain.matches("frames hidden").count(), 1);
        assert!(plain.contains("... 10 frames hidden ..."));
        assert_eq!(plain.matches("in f").count(), 20);
        assert!(plain.contains("in f9:10"));
        assert!(!plain.contains("in f10:10"));
        assert!(plain.contains("in f20:10"));
    }

    #[test]
    fn test_no_elision_when_disabled() {
        let trace = Trace::new(vec![Stack::new("E", "x").with_frames(synthetic_frames(30))]);
        let config = TracebackConfig::default().with_max_frames(0);
        let blocks = renderer(config).render(&trace).unwrap();
        let plain = blocks_to_plain(panel_body(&blocks));

        assert!(!plain.contains("frames hidden"));
        assert_eq!(plain.matches("in f").count(), 30);
    }

    #[test]
    fn test_missing_source_is_rendered_inline() {
        let trace = Trace::new(vec![Stack::new("E", "x").with_frames(synthetic_frames(1))]);
        let blocks = renderer(TracebackConfig::default()).render(&trace).unwrap();
        let plain = blocks_to_plain(panel_body(&blocks));

        assert!(plain.starts_with("in f0:10"));
        assert!(plain.contains("Source unavailable for '/nowhere/f0.rs'"));
    }

    #[test]
    fn test_synthetic_frames_keep_their_header() {
        let trace = Trace::new(vec![Stack::new("E", "x").with_frames(vec![
            Frame::new("<stdin>", 3, "main"),
            Frame::new("<string>", 1, "eval"),
        ])]);
        let blocks = renderer(TracebackConfig::default()).render(&trace).unwrap();
        let body = panel_body(&blocks);

        let lines: Vec<String> = body.iter().map(Block::to_plain).collect();
        assert_eq!(lines, vec!["in main:3", "in eval:1"]);
        assert!(!blocks_to_plain(body).contains("Source unavailable"));
    }

    #[test]
    fn test_source_window_marks_failing_line() {
        let mut file = NamedTempFile::new().unwrap();
        for i in 1..=10 {
            writeln!(file, "let line{} = {};", i, i).unwrap();
        }
        let path = file.path().to_string_lossy().into_owned();
        let trace = Trace::new(vec![
            Stack::new("ValueError", "bad").with_frames(vec![Frame::new(path.clone(), 5, "compute")])
        ]);

        let config = TracebackConfig::default().with_extra_lines(1);
        let blocks = renderer(config).render(&trace).unwrap();
        let body = panel_body(&blocks);

        assert_eq!(body[0].to_plain(), format!("{}:5 in compute", path));
        let Block::Grid(window) = &body[1] else {
            panic!("expected source grid")
        };
        assert_eq!(window.rows.len(), 3);
        assert_eq!(window.rows[1][0].to_plain(), "❱");
        assert_eq!(window.rows[1][1].to_plain(), "5");
        assert_eq!(window.rows[1][2].to_plain(), "let line5 = 5;");
        assert_eq!(window.rows[0][0].to_plain(), " ");
        assert_eq!(blocks[1].to_plain(), "ValueError: bad");
    }

    #[test]
    fn test_locals_filtering_and_truncation() {
        let locals = vec![
            ("__dunder", "1"),
            ("_sunder", "2"),
            ("a", "3"),
            ("b", "'xxxxxxxxxx'"),
            ("c", "5"),
            ("d", "6"),
        ];
        let frame = Frame::new("<stdin>", 1, "main").with_locals(locals);
        let trace = Trace::new(vec![Stack::new("E", "").with_frames(vec![frame])]);

        let config = TracebackConfig::default().with_locals(LocalsConfig {
            max_length: 3,
            max_string: 5,
            hide_dunder: true,
            hide_sunder: false,
        });
        let blocks = renderer(config).render(&trace).unwrap();
        let body = panel_body(&blocks);
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].to_plain(), "in main:1");

        let plain = body[1].to_plain();
        assert!(!plain.contains("__dunder"));
        assert!(plain.contains("_sunder = 2"));
        assert!(plain.contains("b = 'xxxx+7"));
        assert!(!plain.contains("c = 5"));
        assert!(plain.contains("… +2"));
        assert_eq!(blocks[1].to_plain(), "E");
    }

    #[test]
    fn test_suppressed_frame_has_no_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "boom()").unwrap();
        let path = file.path().to_string_lossy().into_owned();
        let frame = Frame::new(path.clone(), 1, "boom");
        let trace = Trace::new(vec![Stack::new("E", "x").with_frames(vec![frame])]);

        let config = TracebackConfig::default().with_suppress(path.clone());
        let blocks = renderer(config).render(&trace).unwrap();
        let body = panel_body(&blocks);
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].to_plain(), format!("{}:1 in boom", path));
    }

    #[test]
    fn test_chain_order_and_transitions() {
        let trace = Trace::new(vec![
            Stack::new("KeyError", "'user'"),
            Stack::new("LookupFailed", "no user").with_cause(true),
            Stack::new("RequestFailed", "500"),
        ]);
        let blocks = renderer(TracebackConfig::default()).render(&trace).unwrap();
        let plain = blocks_to_plain(&blocks);

        let newest = plain.find("RequestFailed: 500").unwrap();
        let middle = plain.find("LookupFailed: no user").unwrap();
        let oldest = plain.find("KeyError: 'user'").unwrap();
        assert!(newest < middle && middle < oldest);

        let context = plain.find(CONTEXT_TRANSITION).unwrap();
        let cause = plain.find(CAUSE_TRANSITION).unwrap();
        assert!(newest < context && context < middle);
        assert!(middle < cause && cause < oldest);
        assert!(!plain.contains("Traceback"), "stacks without frames get no panel");
    }

    #[test]
    fn test_syntax_error_panel() {
        let detail = SyntaxErrorDetail {
            filename: "<config>".to_string(),
            lineno: 3,
            offset: 7,
            line: "key = = value\n".to_string(),
            msg: "invalid syntax".to_string(),
        };
        let trace = Trace::new(vec![Stack::new("SyntaxError", "invalid syntax")
            .without_frames()
            .with_syntax_error(detail)]);
        let blocks = renderer(TracebackConfig::default()).render(&trace).unwrap();

        assert_eq!(blocks.len(), 2);
        let body = panel_body(&blocks);
        assert_eq!(body[0].to_plain(), "<config>:3");
        assert_eq!(body[1].to_plain(), "key = = value");
        assert_eq!(body[2].to_plain(), "      ▲");
        assert_eq!(blocks[1].to_plain(), "SyntaxError: invalid syntax");
    }

    #[test]
    fn test_malformed_chain_is_rejected() {
        let trace = Trace::new(vec![
            Stack::new("A", "").without_frames(),
            Stack::new("B", ""),
        ]);
        assert!(matches!(
            renderer(TracebackConfig::default()).render(&trace),
            Err(LogError::MalformedTrace { .. })
        ));
    }
}
