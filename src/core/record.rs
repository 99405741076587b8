//! Log record structure

use super::args::{Args, FieldValue};
use super::error::Result;
use super::formatter::{format_args, FormatStyle, DEFAULT_DATEFMT};
use super::level::Level;
use super::trace::Trace;
use crate::render::highlighter::Highlighter;
use chrono::{DateTime, Local};
use std::cell::{OnceCell, RefCell};
use std::error::Error as StdError;
use std::fmt::{self, Write as _};
use std::path::Path;
use std::sync::Arc;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn current_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn current_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// One logged event
///
/// The formatted message and the formatted time are computed at most once
/// and cached, so repeated formatting of the same record agrees with itself.
pub struct Record {
    /// Logger name
    pub name: String,
    pub level: Level,
    pub timestamp: DateTime<Local>,
    /// Raw message template
    pub msg: String,
    pub args: Args,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub module_path: Option<String>,
    pub function: Option<String>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub exception: Option<Trace>,
    /// Overrides the handler's markup setting
    pub markup: Option<bool>,
    /// Overrides the handler's highlighter
    pub highlighter: Option<Arc<dyn Highlighter>>,
    message: OnceCell<String>,
    asctime: OnceCell<String>,
}

impl Record {
    pub fn new(level: Level, msg: impl Into<String>) -> Self {
        Self {
            name: "root".to_string(),
            level,
            timestamp: Local::now(),
            msg: msg.into(),
            args: Args::None,
            file: None,
            line: None,
            module_path: None,
            function: None,
            thread_id: current_thread_id(),
            thread_name: current_thread_name(),
            exception: None,
            markup: None,
            highlighter: None,
            message: OnceCell::new(),
            asctime: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// Positional arguments, e.g. `.with_arg(user).with_arg(count)`
    #[must_use]
    pub fn with_arg(mut self, value: impl Into<FieldValue>) -> Self {
        match &mut self.args {
            Args::Positional(values) => values.push(value.into()),
            _ => self.args = Args::Positional(vec![value.into()]),
        }
        self
    }

    /// Named argument for `%(key)s`, `{key}` or `$key` placeholders
    #[must_use]
    pub fn with_named_arg(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        match &mut self.args {
            Args::Named(values) => {
                values.insert(key.into(), value.into());
            }
            _ => self.args = Args::named([(key.into(), value.into())]),
        }
        self
    }

    #[must_use]
    pub fn with_location(mut self, file: &str, line: u32, module_path: &str) -> Self {
        self.file = Some(file.to_string());
        self.line = Some(line);
        self.module_path = Some(module_path.to_string());
        self
    }

    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_exception(mut self, trace: Trace) -> Self {
        self.exception = Some(trace);
        self
    }

    /// Attach an error and its `source()` chain
    #[must_use]
    pub fn with_error(self, error: &(dyn StdError + 'static)) -> Self {
        self.with_exception(Trace::from_error(error))
    }

    #[must_use]
    pub fn with_markup(mut self, markup: bool) -> Self {
        self.markup = Some(markup);
        self
    }

    #[must_use]
    pub fn with_highlighter(mut self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    /// Message with arguments substituted, cached after the first success
    pub fn message(&self, style: FormatStyle) -> Result<&str> {
        if self.message.get().is_none() {
            let message = format_args(&self.msg, &self.args, style)?;
            let _ = self.message.set(message);
        }
        Ok(self.message.get().map(String::as_str).unwrap_or_default())
    }

    /// Creation time formatted with `datefmt`, cached on first use
    pub fn asctime(&self, datefmt: Option<&str>) -> &str {
        self.asctime.get_or_init(|| {
            let pattern = datefmt.unwrap_or(DEFAULT_DATEFMT);
            let mut out = String::new();
            if write!(out, "{}", self.timestamp.format(pattern)).is_err() {
                out = pattern.to_string();
            }
            out
        })
    }

    /// Short location shown in the path column
    pub fn display_path(&self) -> Option<String> {
        self.module_path.clone().or_else(|| {
            self.file.as_ref().map(|file| {
                Path::new(file)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.clone())
            })
        })
    }

    /// Absolute file path used as the hyperlink target
    pub fn link_target(&self) -> Option<String> {
        let file = self.file.as_ref()?;
        let absolute = std::path::absolute(file).ok()?;
        Some(absolute.to_string_lossy().into_owned())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.name)
            .field("level", &self.level.name())
            .field("timestamp", &self.timestamp)
            .field("msg", &self.msg)
            .field("args", &self.args)
            .field("file", &self.file)
            .field("line", &self.line)
            .field("module_path", &self.module_path)
            .field("function", &self.function)
            .field("exception", &self.exception.as_ref().map(|t| t.stacks.len()))
            .field("markup", &self.markup)
            .field("highlighter", &self.highlighter.is_some())
            .finish()
    }
}
