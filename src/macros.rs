//! Logging macros for ergonomic message formatting.
//!
//! The macros build a [`Record`](crate::Record) carrying the caller's file,
//! line and module path, format the message like `format!`, and pass the
//! record to [`Handler::handle`](crate::Handler::handle).
//!
//! # Examples
//!
//! ```
//! use richlog::prelude::*;
//! use richlog::info;
//!
//! let mut handler = Handler::new();
//!
//! // Basic logging
//! info!(handler, "Server started").unwrap();
//!
//! // With format arguments
//! let port = 8080;
//! info!(handler, "Server listening on port {}", port).unwrap();
//! ```

/// Log a message at any level.
///
/// # Examples
///
/// ```
/// # use richlog::prelude::*;
/// # let mut handler = Handler::new();
/// use richlog::log;
/// log!(handler, Level::info(), "Simple message").unwrap();
/// log!(handler, Level::lookup("warn").unwrap(), "Retry {} of {}", 1, 3).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($handler:expr, $level:expr, $($arg:tt)+) => {
        $handler.handle(
            &$crate::Record::new($level, format!($($arg)+))
                .with_location(file!(), line!(), module_path!()),
        )
    };
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($handler:expr, $($arg:tt)+) => {
        $crate::log!($handler, $crate::Level::trace(), $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($handler:expr, $($arg:tt)+) => {
        $crate::log!($handler, $crate::Level::debug(), $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use richlog::prelude::*;
/// # let mut handler = Handler::new();
/// use richlog::info;
/// info!(handler, "Processing {} items", 100).unwrap();
/// ```
#[macro_export]
macro_rules! info {
    ($handler:expr, $($arg:tt)+) => {
        $crate::log!($handler, $crate::Level::info(), $($arg)+)
    };
}

/// Log a success-level message.
#[macro_export]
macro_rules! success {
    ($handler:expr, $($arg:tt)+) => {
        $crate::log!($handler, $crate::Level::success(), $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warning {
    ($handler:expr, $($arg:tt)+) => {
        $crate::log!($handler, $crate::Level::warning(), $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($handler:expr, $($arg:tt)+) => {
        $crate::log!($handler, $crate::Level::error(), $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($handler:expr, $($arg:tt)+) => {
        $crate::log!($handler, $crate::Level::critical(), $($arg)+)
    };
}

/// Log an error-level message with an error and its source chain attached.
///
/// # Examples
///
/// ```
/// # use richlog::prelude::*;
/// # let mut handler = Handler::new();
/// use richlog::exception;
/// let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
/// exception!(handler, &err, "Failed to load {}", "settings").unwrap();
/// ```
#[macro_export]
macro_rules! exception {
    ($handler:expr, $err:expr, $($arg:tt)+) => {
        $handler.handle(
            &$crate::Record::new($crate::Level::error(), format!($($arg)+))
                .with_location(file!(), line!(), module_path!())
                .with_error($err),
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Handler, Level, LogError};
    use crate::render::Block;
    use crate::sinks::CallableSink;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn capturing() -> (Arc<Mutex<Vec<Vec<Block>>>>, Handler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let handler = Handler::builder()
            .restricted_host(true)
            .sink(CallableSink::new(move |blocks: &[Block]| {
                sink_seen.lock().push(blocks.to_vec());
                Ok(())
            }))
            .build()
            .unwrap();
        (seen, handler)
    }

    #[test]
    fn test_log_macro() {
        let (seen, mut handler) = capturing();
        log!(handler, Level::info(), "Test message").unwrap();
        log!(handler, Level::info(), "Formatted: {}", 42).unwrap();
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_level_macros() {
        let (seen, mut handler) = capturing();
        handler.set_level("DEBUG").unwrap();

        trace!(handler, "Value: {}", 10).unwrap();
        debug!(handler, "Count: {}", 5).unwrap();
        info!(handler, "Items: {}", 100).unwrap();
        success!(handler, "Deployed").unwrap();
        warning!(handler, "Retry {} of {}", 1, 3).unwrap();
        error!(handler, "Code: {}", 500).unwrap();
        critical!(handler, "Critical failure: {}", "system").unwrap();

        assert_eq!(seen.lock().len(), 6);
        assert_eq!(handler.metrics().filtered(), 1);
    }

    #[test]
    fn test_percent_in_message_is_literal() {
        let (seen, mut handler) = capturing();
        info!(handler, "disk at {}%d", 93).unwrap();
        assert!(seen.lock()[0]
            .iter()
            .any(|block| block.to_plain().contains("disk at 93%d")));
    }

    #[test]
    fn test_exception_macro() {
        let (seen, mut handler) = capturing();
        let err = LogError::other("connection reset");
        exception!(handler, &err, "request {} failed", 7).unwrap();

        let output: String = seen.lock()[0].iter().map(Block::to_plain).collect();
        assert!(output.contains("request 7 failed"));
        assert!(output.contains("connection reset"));
    }
}
