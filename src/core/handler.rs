//! Handler: turns records into display blocks and fans them out to sinks

use super::config::{HandlerConfig, LevelSpec, RenderConfig, TracebackConfig};
use super::diagnostics::{panic_message, Diagnostics};
use super::error::Result;
use super::formatter::{FormatStyle, Formatter};
use super::host;
use super::level::{Level, LevelKey};
use super::metrics::HandlerMetrics;
use super::record::Record;
use super::sink::Sink;
use crate::render::block::Block;
use crate::render::highlighter::{Highlighter, ReprHighlighter};
use crate::render::layout::{LayoutInput, LayoutRenderer};
use crate::render::source::SourceService;
use crate::render::style::StyleRef;
use crate::render::text::Text;
use crate::render::traceback::TracebackRenderer;
use crate::sinks::StandardSink;
use parking_lot::Mutex;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Arc;

/// Handler shared between threads; emission is serialized by the mutex
pub type SharedHandler = Arc<Mutex<Handler>>;

pub struct Handler {
    level: Level,
    sinks: Vec<Box<dyn Sink>>,
    formatter: Formatter,
    format_style: FormatStyle,
    markup: bool,
    rich_tracebacks: bool,
    enable_link_path: bool,
    keywords: Vec<String>,
    datefmt: Option<String>,
    highlighter: Arc<dyn Highlighter>,
    layout: LayoutRenderer,
    tracebacks: TracebackRenderer,
    restricted: bool,
    diagnostics: Diagnostics,
    /// Metrics for observability (emitted, filtered, sink failures)
    metrics: Arc<HandlerMetrics>,
    shut_down: bool,
}

impl Handler {
    /// Handler with no sinks, a NOTSET threshold and default rendering
    #[must_use]
    pub fn new() -> Self {
        let restricted = host::is_restricted_host();
        Self {
            level: Level::notset(),
            sinks: Vec::new(),
            formatter: Formatter::default(),
            format_style: FormatStyle::default(),
            markup: false,
            rich_tracebacks: false,
            enable_link_path: true,
            keywords: Vec::new(),
            datefmt: None,
            highlighter: Arc::new(ReprHighlighter),
            layout: LayoutRenderer::new(RenderConfig::default()),
            tracebacks: TracebackRenderer::new(TracebackConfig::default())
                .with_restricted_host(restricted),
            restricted,
            diagnostics: Diagnostics::default(),
            metrics: Arc::new(HandlerMetrics::new()),
            shut_down: false,
        }
    }

    pub fn builder() -> HandlerBuilder {
        HandlerBuilder::new()
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Replace the threshold; accepts a name, alias, rank or level
    pub fn set_level<'a>(&mut self, level: impl Into<LevelKey<'a>>) -> Result<()> {
        self.level = Level::lookup(level)?;
        Ok(())
    }

    pub fn add_sink(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn sinks(&self) -> &[Box<dyn Sink>] {
        &self.sinks
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn is_enabled_for(&self, level: &Level) -> bool {
        level.is_enabled_for(&self.level)
    }

    /// Get the handler metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```
    /// use richlog::Handler;
    ///
    /// let handler = Handler::new();
    /// let metrics = handler.metrics();
    /// println!("Emitted: {}", metrics.emitted());
    /// println!("Sink failure rate: {:.2}%", metrics.failure_rate());
    /// ```
    pub fn metrics(&self) -> &HandlerMetrics {
        &self.metrics
    }

    /// Emit `record` unless it is below the threshold
    pub fn handle(&mut self, record: &Record) -> Result<()> {
        if !self.is_enabled_for(&record.level) {
            self.metrics.record_filtered();
            return Ok(());
        }
        self.emit(record)
    }

    /// Render `record` and deliver it to every sink
    ///
    /// Formatting errors are returned. Delivery errors are not: they go to
    /// the diagnostics channel and the remaining sinks still run.
    pub fn emit(&mut self, record: &Record) -> Result<()> {
        let message = record.message(self.format_style)?;
        let mut text = self.formatter.format(record, message)?;

        let mut traceback = Vec::new();
        if self.rich_tracebacks {
            if let Some(trace) = &record.exception {
                match self.tracebacks.render(trace) {
                    Ok(blocks) => {
                        traceback = blocks;
                        text = self.formatter.format_message(record, message)?;
                    }
                    Err(error) => {
                        self.metrics.record_traceback_failure();
                        self.diagnostics.report_error("Traceback rendering", &error);
                    }
                }
            }
        }

        let message = self.render_message(record, &text);
        let path = record.display_path();
        let link = record.link_target().filter(|_| self.enable_link_path);

        let mut input = LayoutInput::new(&record.level, record.timestamp);
        input.time_format = self.datefmt.as_deref();
        input.message = (!text.is_empty()).then_some(message);
        input.traceback = traceback;
        input.path = path.as_deref();
        input.line = record.line;
        input.link_path = link.as_deref();

        let blocks = self.layout.render(input, self.restricted);
        self.metrics.record_emitted();
        self.dispatch(&blocks);
        Ok(())
    }

    /// Message text after markup, highlighting and keyword styling
    pub fn render_message(&self, record: &Record, message: &str) -> Text {
        let use_markup = record.markup.unwrap_or(self.markup);
        let text = if use_markup {
            Text::from_markup(message)
        } else {
            Text::styled(message, record.level.style_name())
        };

        let highlighter = record
            .highlighter
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.highlighter));
        let mut text = highlighter.highlight(text);

        if !self.keywords.is_empty() {
            text.highlight_words(&self.keywords, &StyleRef::from("logging.keyword"));
        }
        text
    }

    /// Write to every sink in registration order with per-sink isolation
    ///
    /// **Per-Sink Panic Isolation**: each sink is wrapped in catch_unwind so
    /// that one failing sink cannot stop the others from receiving the record.
    fn dispatch(&mut self, blocks: &[Block]) {
        for sink in self.sinks.iter_mut() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| sink.write(blocks)));

            match result {
                Ok(Ok(())) => {
                    self.metrics.record_delivered();
                }
                Ok(Err(e)) => {
                    self.metrics.record_sink_failure();
                    self.diagnostics
                        .report_delivery_failure(sink.name(), blocks, &e);
                }
                Err(panic_info) => {
                    self.metrics.record_sink_failure();
                    self.diagnostics.report_panic(
                        &format!("Sink '{}'", sink.name()),
                        &panic_message(panic_info.as_ref()),
                    );
                }
            }
        }
    }

    /// Wait for pending deliveries on every sink
    ///
    /// Every sink is drained even when one fails; the first failure is
    /// returned.
    pub fn drain(&mut self) -> Result<()> {
        let mut first_error = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.drain() {
                self.diagnostics
                    .report_error(&format!("Sink '{}' drain", sink.name()), &e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Drain, then stop every sink
    pub fn shutdown(&mut self) -> Result<()> {
        let drained = self.drain();
        for sink in self.sinks.iter_mut() {
            sink.stop();
        }
        self.shut_down = true;
        drained
    }

    #[track_caller]
    pub fn log(&mut self, level: Level, message: impl Into<String>) -> Result<()> {
        let location = Location::caller();
        let mut record = Record::new(level, message);
        record.file = Some(location.file().to_string());
        record.line = Some(location.line());
        self.handle(&record)
    }

    #[inline]
    #[track_caller]
    pub fn trace(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(Level::trace(), message)
    }

    #[inline]
    #[track_caller]
    pub fn debug(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(Level::debug(), message)
    }

    #[inline]
    #[track_caller]
    pub fn info(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(Level::info(), message)
    }

    #[inline]
    #[track_caller]
    pub fn success(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(Level::success(), message)
    }

    #[inline]
    #[track_caller]
    pub fn warning(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(Level::warning(), message)
    }

    #[inline]
    #[track_caller]
    pub fn error(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(Level::error(), message)
    }

    #[inline]
    #[track_caller]
    pub fn critical(&mut self, message: impl Into<String>) -> Result<()> {
        self.log(Level::critical(), message)
    }

    /// ERROR record carrying `error` and its source chain
    #[track_caller]
    pub fn exception(
        &mut self,
        message: impl Into<String>,
        error: &(dyn StdError + 'static),
    ) -> Result<()> {
        let location = Location::caller();
        let mut record = Record::new(Level::error(), message).with_error(error);
        record.file = Some(location.file().to_string());
        record.line = Some(location.line());
        self.handle(&record)
    }

    /// Wrap in a mutex for use from several threads
    pub fn shared(self) -> SharedHandler {
        Arc::new(Mutex::new(self))
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Handler {
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        // Errors were already reported by drain
        let _ = self.shutdown();
    }
}

/// Handler with the standard configuration
///
/// NOTSET threshold, rich tracebacks and a console sink on stdout.
pub fn default_handler() -> Handler {
    let mut handler = Handler::new();
    handler.rich_tracebacks = true;
    handler.add_sink(Box::new(StandardSink::stdout()));
    handler
}

/// Builder for constructing a [`Handler`] with a fluent API
///
/// # Example
/// ```
/// use richlog::prelude::*;
///
/// let handler = Handler::builder()
///     .level("INFO")
///     .markup(true)
///     .rich_tracebacks(true)
///     .keywords(["GET", "POST"])
///     .sink(CallableSink::new(|_blocks: &[Block]| Ok(())))
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(handler.level().name(), "INFO");
/// assert_eq!(handler.sinks().len(), 1);
/// ```
pub struct HandlerBuilder {
    config: HandlerConfig,
    sinks: Vec<Box<dyn Sink>>,
    highlighter: Option<Arc<dyn Highlighter>>,
    source_service: Option<Arc<dyn SourceService>>,
    restricted_host: Option<bool>,
    diagnostics: Option<Diagnostics>,
}

impl HandlerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::from_config(HandlerConfig::default())
    }

    /// Start from a loaded configuration
    pub fn from_config(config: HandlerConfig) -> Self {
        Self {
            config,
            sinks: Vec::new(),
            highlighter: None,
            source_service: None,
            restricted_host: None,
            diagnostics: None,
        }
    }

    /// Set the threshold by name, alias or rank
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: impl Into<LevelSpec>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Interpret console markup in messages by default
    #[must_use = "builder methods return a new value"]
    pub fn markup(mut self, markup: bool) -> Self {
        self.config.markup = markup;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn rich_tracebacks(mut self, enabled: bool) -> Self {
        self.config.rich_tracebacks = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn enable_link_path(mut self, enabled: bool) -> Self {
        self.config.enable_link_path = enabled;
        self
    }

    /// Words highlighted in every message, in this order
    #[must_use = "builder methods return a new value"]
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn format_style(mut self, style: FormatStyle) -> Self {
        self.config.format_style = style;
        self
    }

    /// Record template, e.g. `"%(name)s: %(message)s"`
    #[must_use = "builder methods return a new value"]
    pub fn fmt(mut self, template: impl Into<String>) -> Self {
        self.config.fmt = Some(template.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn datefmt(mut self, pattern: impl Into<String>) -> Self {
        self.config.datefmt = Some(pattern.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn render(mut self, render: RenderConfig) -> Self {
        self.config.render = render;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn traceback(mut self, traceback: TracebackConfig) -> Self {
        self.config.traceback = traceback;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn source_service(mut self, source: Arc<dyn SourceService>) -> Self {
        self.source_service = Some(source);
        self
    }

    /// Override restricted-host detection
    #[must_use = "builder methods return a new value"]
    pub fn restricted_host(mut self, restricted: bool) -> Self {
        self.restricted_host = Some(restricted);
        self
    }

    /// Where delivery failures are reported; stderr by default
    #[must_use = "builder methods return a new value"]
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Register a sink; sinks receive records in registration order
    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Build the handler, validating the configuration
    pub fn build(self) -> Result<Handler> {
        let config = self.config;
        config.validate()?;

        let level = config.level.resolve()?;
        let formatter = Formatter::new(
            config.fmt.as_deref(),
            config.datefmt.as_deref(),
            config.format_style,
        )?;
        let restricted = self
            .restricted_host
            .unwrap_or_else(host::is_restricted_host);

        let mut tracebacks =
            TracebackRenderer::new(config.traceback).with_restricted_host(restricted);
        if let Some(source) = self.source_service {
            tracebacks = tracebacks.with_source_service(source);
        }

        Ok(Handler {
            level,
            sinks: self.sinks,
            formatter,
            format_style: config.format_style,
            markup: config.markup,
            rich_tracebacks: config.rich_tracebacks,
            enable_link_path: config.enable_link_path,
            keywords: config.keywords,
            datefmt: config.datefmt,
            highlighter: self
                .highlighter
                .unwrap_or_else(|| Arc::new(ReprHighlighter)),
            layout: LayoutRenderer::new(config.render),
            tracebacks,
            restricted,
            diagnostics: self.diagnostics.unwrap_or_default(),
            metrics: Arc::new(HandlerMetrics::new()),
            shut_down: false,
        })
    }
}

impl Default for HandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
