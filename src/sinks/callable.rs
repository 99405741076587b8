//! Sink backed by a user function

use crate::core::error::Result;
use crate::core::sink::{Sink, SinkState};
use crate::render::Block;
use std::fmt;

type DeliverFn = Box<dyn FnMut(&[Block]) -> Result<()> + Send>;

/// Calls a function synchronously for every record
///
/// `stop` only marks the sink stopped and `drain` does nothing. Whatever the
/// function sets up is the caller's to tear down.
pub struct CallableSink {
    func: DeliverFn,
    name: String,
    state: SinkState,
}

impl CallableSink {
    pub fn new<F>(func: F) -> Self
    where
        F: FnMut(&[Block]) -> Result<()> + Send + 'static,
    {
        Self {
            func: Box::new(func),
            name: "callable".to_string(),
            state: SinkState::Active,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Debug for CallableSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableSink")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Sink for CallableSink {
    fn write(&mut self, blocks: &[Block]) -> Result<()> {
        (self.func)(blocks)
    }

    fn stop(&mut self) {
        self.state = SinkState::Stopped;
    }

    fn drain(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> SinkState {
        self.state
    }
}
