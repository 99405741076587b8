//! Sink and output target traits

use super::error::Result;
use crate::render::block::Block;
use std::fmt;
use std::io;

/// Lifecycle of a sink; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkState {
    Active,
    Stopped,
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkState::Active => write!(f, "active"),
            SinkState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Destination for the rendered blocks of one record
pub trait Sink: Send {
    /// Deliver or schedule delivery of `blocks`
    fn write(&mut self, blocks: &[Block]) -> Result<()>;

    /// Stop accepting output; does not wait for pending work
    fn stop(&mut self);

    /// Block until pending work scheduled from the caller's context is done
    fn drain(&mut self) -> Result<()>;

    /// Name used in diagnostics
    fn name(&self) -> &str {
        "unnamed"
    }

    fn state(&self) -> SinkState;
}

/// Styled-text output engine a standard sink delivers to
pub trait OutputTarget: Send {
    fn print(&mut self, blocks: &[Block]) -> io::Result<()>;

    /// Width in cells
    fn width(&self) -> usize;

    /// A quiet target discards everything it is given
    fn set_quiet(&mut self, quiet: bool);

    fn is_quiet(&self) -> bool;
}
