//! Side channel for the library's own failures
//!
//! Delivery problems never reach the caller of `emit`; they are written
//! here instead, to stderr unless a test or integrator redirects them.

use super::error::LogError;
use crate::render::block::{blocks_to_plain, Block};
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Cloneable handle to the diagnostics writer
#[derive(Clone)]
pub struct Diagnostics {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Diagnostics {
    pub fn stderr() -> Self {
        Self::to_writer(io::stderr())
    }

    pub fn to_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Write one line; failures to write diagnostics are ignored
    pub fn report(&self, line: &str) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "{}", line);
        let _ = writer.flush();
    }

    pub fn report_error(&self, context: &str, error: &LogError) {
        self.report(&format!("[LOGGER ERROR] {}: {}", context, error));
    }

    pub fn report_panic(&self, context: &str, message: &str) {
        self.report(&format!(
            "[LOGGER CRITICAL] {} panicked: {}. Other sinks continue to function.",
            context, message
        ));
    }

    /// Full dump for output a sink could not deliver
    pub fn report_delivery_failure(&self, sink: &str, blocks: &[Block], error: &LogError) {
        let record = blocks_to_plain(blocks);
        let mut writer = self.writer.lock();
        let _ = write!(
            writer,
            "--- Logging Error ---\nSink: {}\nRecord was: {}\n{}\n--- End of logging error ---\n",
            sink, record, error
        );
        let _ = writer.flush();
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// In-memory writer, handy for capturing console output and diagnostics
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
