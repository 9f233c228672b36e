//! Channel layer for the interactive terminal session.
//!
//! A [`TerminalChannel`] is the raw byte pipe to the device shell. The
//! [`PtyChannel`] wrapper adds the accumulation buffer and the
//! deadline-bounded read loop everything above it relies on.

mod buffer;
#[cfg(test)]
pub(crate) mod mock;
pub mod patterns;
mod pty;

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

pub use buffer::PatternBuffer;
pub use patterns::SessionPatterns;
pub use pty::{PtyChannel, PtyConfig, ReadResult};

/// Byte-oriented interactive session to a device shell.
///
/// Implementations only move bytes. Timeouts are applied by the caller.
pub trait TerminalChannel: Send {
    /// Write `line` followed by a newline.
    fn send_line(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output.
    ///
    /// A chunk may be empty. End of stream is reported as
    /// [`ChannelError::Closed`](crate::error::ChannelError::Closed).
    fn read_chunk(&mut self) -> impl Future<Output = Result<Bytes>> + Send;

    /// Tear the channel down.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the underlying connection is still up.
    fn is_alive(&self) -> bool;
}

/// Factory for terminal channels, called once per `open()`.
pub trait Connector: Send + Sync {
    /// The channel type produced.
    type Channel: TerminalChannel;

    /// Establish a new channel to the device.
    fn connect(&self) -> impl Future<Output = Result<Self::Channel>> + Send;
}
