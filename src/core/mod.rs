//! Core types: levels, records, formatting, configuration and the handler

pub mod args;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod formatter;
pub mod handler;
pub mod host;
pub mod level;
pub mod metrics;
pub mod record;
pub mod sink;
pub mod trace;

pub use args::{Args, FieldValue};
pub use config::{
    FormatTimeFn, HandlerConfig, LevelSpec, LocalsConfig, RenderConfig, TracebackConfig,
};
pub use diagnostics::{Diagnostics, SharedBuffer};
pub use error::{LogError, Result};
pub use formatter::{format_args, FormatStyle, Formatter, RECORD_FIELDS};
pub use handler::{default_handler, Handler, HandlerBuilder, SharedHandler};
pub use host::is_restricted_host;
pub use level::{Level, LevelKey, LevelTable};
pub use metrics::HandlerMetrics;
pub use record::Record;
pub use sink::{OutputTarget, Sink, SinkState};
pub use trace::{Frame, Stack, SyntaxErrorDetail, Trace};
