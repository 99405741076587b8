//! Renderer and handler configuration
//!
//! Every struct here deserializes from JSON with missing fields taking their
//! defaults, so a config file only names what it changes.

use super::error::{LogError, Result};
use super::formatter::FormatStyle;
use super::level::{Level, LevelKey, LevelTable};
use crate::render::text::Text;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Custom time renderer used instead of a strftime pattern
pub type FormatTimeFn = Arc<dyn Fn(&DateTime<Local>) -> Text + Send + Sync>;

/// Layout renderer configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub show_time: bool,
    pub show_level: bool,
    pub show_level_icon: bool,
    pub show_path: bool,
    /// Render the time on its own line above the record
    pub newline_time: bool,
    /// strftime pattern
    pub time_format: String,
    /// Takes precedence over `time_format` when set
    #[serde(skip)]
    pub format_time: Option<FormatTimeFn>,
    /// Blank out times within `omit_interval` of the last shown time
    pub omit_repeated_times: bool,
    /// Seconds
    pub omit_interval: f64,
    /// `None` uses the widest level name, aliases included
    pub level_width: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            show_time: true,
            show_level: true,
            show_level_icon: true,
            show_path: true,
            newline_time: true,
            time_format: "[%y/%m/%d %X]".to_string(),
            format_time: None,
            omit_repeated_times: true,
            omit_interval: 0.5,
            level_width: None,
        }
    }
}

impl RenderConfig {
    #[must_use = "builder methods return a new value"]
    pub fn with_time_format(mut self, pattern: impl Into<String>) -> Self {
        self.time_format = pattern.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_format_time<F>(mut self, format: F) -> Self
    where
        F: Fn(&DateTime<Local>) -> Text + Send + Sync + 'static,
    {
        self.format_time = Some(Arc::new(format));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_newline_time(mut self, newline_time: bool) -> Self {
        self.newline_time = newline_time;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_omit_repeated_times(mut self, omit: bool, interval: f64) -> Self {
        self.omit_repeated_times = omit;
        self.omit_interval = interval;
        self
    }

    /// Show or hide the time, icon, level and path columns
    #[must_use = "builder methods return a new value"]
    pub fn with_columns(mut self, time: bool, icon: bool, level: bool, path: bool) -> Self {
        self.show_time = time;
        self.show_level_icon = icon;
        self.show_level = level;
        self.show_path = path;
        self
    }

    /// Width of the level column
    pub fn resolved_level_width(&self) -> usize {
        self.level_width
            .unwrap_or_else(|| LevelTable::standard().max_name_width())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.omit_interval.is_finite() || self.omit_interval < 0.0 {
            return Err(LogError::config(
                "RenderConfig",
                format!("omit_interval must be a non-negative number, got {}", self.omit_interval),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("show_time", &self.show_time)
            .field("show_level", &self.show_level)
            .field("show_level_icon", &self.show_level_icon)
            .field("show_path", &self.show_path)
            .field("newline_time", &self.newline_time)
            .field("time_format", &self.time_format)
            .field("format_time", &self.format_time.is_some())
            .field("omit_repeated_times", &self.omit_repeated_times)
            .field("omit_interval", &self.omit_interval)
            .field("level_width", &self.level_width)
            .finish()
    }
}

/// Limits applied to local variables shown beside frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalsConfig {
    pub max_length: usize,
    pub max_string: usize,
    /// Drop names starting with `__`
    pub hide_dunder: bool,
    /// Drop names starting with a single `_`
    pub hide_sunder: bool,
}

impl Default for LocalsConfig {
    fn default() -> Self {
        Self {
            max_length: 10,
            max_string: 80,
            hide_dunder: true,
            hide_sunder: false,
        }
    }
}

/// Traceback renderer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracebackConfig {
    /// `None` renders 100 cells wide
    pub width: Option<usize>,
    pub code_width: usize,
    pub extra_lines: usize,
    pub word_wrap: bool,
    pub show_locals: bool,
    /// 0 disables elision
    pub max_frames: usize,
    /// Path prefixes whose source is never shown
    pub suppress: Vec<String>,
    pub locals: LocalsConfig,
}

/// Width used when [`TracebackConfig::width`] is unset
pub const DEFAULT_TRACEBACK_WIDTH: usize = 100;

impl Default for TracebackConfig {
    fn default() -> Self {
        Self {
            width: None,
            code_width: 88,
            extra_lines: 3,
            word_wrap: true,
            show_locals: true,
            max_frames: 20,
            suppress: Vec::new(),
            locals: LocalsConfig::default(),
        }
    }
}

impl TracebackConfig {
    #[must_use = "builder methods return a new value"]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_extra_lines(mut self, extra_lines: usize) -> Self {
        self.extra_lines = extra_lines;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_show_locals(mut self, show_locals: bool) -> Self {
        self.show_locals = show_locals;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_suppress(mut self, prefix: impl Into<String>) -> Self {
        self.suppress.push(prefix.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_locals(mut self, locals: LocalsConfig) -> Self {
        self.locals = locals;
        self
    }

    pub fn resolved_width(&self) -> usize {
        self.width.unwrap_or(DEFAULT_TRACEBACK_WIDTH)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == Some(0) {
            return Err(LogError::config("TracebackConfig", "width must be positive"));
        }
        if self.code_width == 0 {
            return Err(LogError::config("TracebackConfig", "code_width must be positive"));
        }
        Ok(())
    }
}

/// Threshold as written in a config file: a name, an alias or a rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelSpec {
    Name(String),
    Rank(u32),
}

impl Default for LevelSpec {
    fn default() -> Self {
        LevelSpec::Name("NOTSET".to_string())
    }
}

impl From<&str> for LevelSpec {
    fn from(name: &str) -> Self {
        LevelSpec::Name(name.to_string())
    }
}

impl From<u32> for LevelSpec {
    fn from(rank: u32) -> Self {
        LevelSpec::Rank(rank)
    }
}

impl From<&Level> for LevelSpec {
    fn from(level: &Level) -> Self {
        LevelSpec::Name(level.name().to_string())
    }
}

impl LevelSpec {
    pub fn resolve(&self) -> Result<Level> {
        match self {
            LevelSpec::Name(name) => Level::lookup(LevelKey::from(name.as_str())),
            LevelSpec::Rank(rank) => Level::lookup(*rank),
        }
    }
}

/// Serializable handler settings; sinks are registered in code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub level: LevelSpec,
    pub markup: bool,
    pub rich_tracebacks: bool,
    pub enable_link_path: bool,
    pub keywords: Vec<String>,
    pub format_style: FormatStyle,
    /// Record template; `None` renders only the message
    pub fmt: Option<String>,
    /// Overrides the render time pattern and the `asctime` pattern
    pub datefmt: Option<String>,
    pub render: RenderConfig,
    pub traceback: TracebackConfig,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            level: LevelSpec::default(),
            markup: false,
            rich_tracebacks: false,
            enable_link_path: true,
            keywords: Vec::new(),
            format_style: FormatStyle::Percent,
            fmt: None,
            datefmt: None,
            render: RenderConfig::default(),
            traceback: TracebackConfig::default(),
        }
    }
}

impl HandlerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: HandlerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.level.resolve()?;
        self.render.validate()?;
        self.traceback.validate()?;
        Ok(())
    }
}
