//! Sink implementations and the console output target

pub mod callable;
pub mod console;
pub mod standard;

#[cfg(feature = "async-sink")]
pub mod async_sink;

pub use callable::CallableSink;
pub use console::Console;
pub use standard::StandardSink;

#[cfg(feature = "async-sink")]
pub use async_sink::{AsyncSink, AsyncTarget, BlockingTarget};

pub use crate::core::sink::{OutputTarget, Sink, SinkState};
