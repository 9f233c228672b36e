//! Buffered PTY channel with a deadline-bounded read loop.

use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use tokio::time::Instant;

use super::TerminalChannel;
use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Search depth for prompt matching.
    pub search_depth: usize,

    /// Pause after an empty read before polling again.
    pub empty_read_backoff: Duration,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            search_depth: 1000,
            empty_read_backoff: Duration::from_millis(10),
        }
    }
}

/// High-level PTY channel for interactive device sessions.
///
/// Wraps a [`TerminalChannel`] and accumulates its output until a caller
/// supplied condition holds or the deadline passes. The deadline is the only
/// thing that ends an unsuccessful read; empty and partial reads are retried.
pub struct PtyChannel<C> {
    inner: C,
    config: PtyConfig,
    buffer: PatternBuffer,
}

impl<C: TerminalChannel> PtyChannel<C> {
    /// Create a new PTY channel with the given configuration.
    pub fn new(inner: C, config: PtyConfig) -> Self {
        Self {
            buffer: PatternBuffer::new(config.search_depth),
            inner,
            config,
        }
    }

    /// Send a line to the device.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!("send: {} bytes", line.len());
        self.inner.send_line(line).await
    }

    /// Discard anything buffered so far.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Read until `matcher` reports a hit, or fail once `timeout` elapses.
    ///
    /// `matcher` is evaluated against the whole buffer after every non-empty
    /// chunk and returns the index of the condition that matched.
    pub async fn read_until<F>(&mut self, timeout: Duration, mut matcher: F) -> Result<ReadResult>
    where
        F: FnMut(&PatternBuffer) -> Option<usize> + Send,
    {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(matched) = matcher(&self.buffer) {
                return Ok(ReadResult {
                    data: self.buffer.take(),
                    matched,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(timeout));
            }

            let chunk = match tokio::time::timeout_at(deadline, self.inner.read_chunk()).await {
                Ok(chunk) => chunk?,
                Err(_) => return Err(self.timed_out(timeout)),
            };

            if chunk.is_empty() {
                trace!("empty read, retrying");
                let resume = (now + self.config.empty_read_backoff).min(deadline);
                tokio::time::sleep_until(resume).await;
                continue;
            }

            trace!("read {} bytes, buffer {} bytes", chunk.len(), self.buffer.len());
            self.buffer.extend(&chunk);
        }
    }

    /// Read until any of `patterns` matches the buffer tail.
    pub async fn read_until_any(
        &mut self,
        patterns: &[&Regex],
        timeout: Duration,
    ) -> Result<ReadResult> {
        self.read_until(timeout, |buffer| {
            patterns.iter().position(|p| buffer.tail_contains(p))
        })
        .await
    }

    /// Close the underlying channel.
    pub async fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.inner.close().await
    }

    /// Whether the underlying connection is still up.
    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    fn timed_out(&mut self, timeout: Duration) -> crate::error::Error {
        debug!(
            "read timed out after {:?} with {} bytes buffered: {:?}",
            timeout,
            self.buffer.len(),
            self.buffer.as_str_lossy()
        );
        self.buffer.clear();
        ChannelError::PatternTimeout(timeout).into()
    }
}

/// Result of a read operation.
#[derive(Debug)]
pub struct ReadResult {
    /// The data that was read.
    pub data: Vec<u8>,

    /// Index of the condition that ended the read.
    pub matched: usize,
}

impl ReadResult {
    /// Get the data as a string (lossy UTF-8).
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}
