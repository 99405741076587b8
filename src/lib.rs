//! # richlog
//!
//! Structured console logging with styled, column-aligned output and
//! readable tracebacks.
//!
//! ## Features
//!
//! - **Level model**: named, ranked levels with aliases and per-level styles
//! - **Column layout**: time, level icon, level, message and source path,
//!   with repeated times blanked out
//! - **Rich tracebacks**: framed source windows, locals and exception chains
//!   with long stacks elided
//! - **Sinks**: synchronous console output, user callables and an async sink
//!   backed by tokio
//! - **Fault isolation**: a failing sink never stops the others
//!
//! ## Example
//!
//! ```
//! use richlog::prelude::*;
//! use richlog::info;
//!
//! let mut handler = Handler::builder()
//!     .level("DEBUG")
//!     .markup(true)
//!     .sink(StandardSink::new(Console::new(std::io::sink())))
//!     .build()
//!     .expect("valid configuration");
//!
//! info!(handler, "listening on [bold]{}[/bold]", "0.0.0.0:8080").unwrap();
//! assert_eq!(handler.metrics().emitted(), 1);
//! ```

pub mod core;
pub mod macros;
pub mod render;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        default_handler, Args, FieldValue, Frame, FormatStyle, Handler, HandlerBuilder,
        HandlerConfig, HandlerMetrics, Level, LogError, Record, RenderConfig, Result, Sink,
        SinkState, Stack, Trace, TracebackConfig,
    };
    pub use crate::render::{Block, Style, Text};
    pub use crate::sinks::{CallableSink, Console, StandardSink};

    #[cfg(feature = "async-sink")]
    pub use crate::sinks::AsyncSink;
}

pub use crate::core::{
    default_handler, Args, Diagnostics, FieldValue, FormatStyle, Formatter, Frame, Handler,
    HandlerBuilder, HandlerConfig, HandlerMetrics, Level, LevelKey, LevelSpec, LocalsConfig,
    LogError, OutputTarget, Record, RenderConfig, Result, SharedHandler, Sink, SinkState, Stack,
    SyntaxErrorDetail, Trace, TracebackConfig,
};
pub use crate::render::{
    Block, Highlighter, LayoutRenderer, NullHighlighter, ReprHighlighter, Style, StyleRef, Text,
    Theme, TracebackRenderer,
};
pub use crate::sinks::{CallableSink, Console, StandardSink};

#[cfg(feature = "async-sink")]
pub use crate::sinks::{AsyncSink, AsyncTarget, BlockingTarget};
