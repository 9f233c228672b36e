//! Scripted terminal channel standing in for a device in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::{Connector, TerminalChannel};
use crate::error::{ChannelError, Result};

/// One step of scripted output.
#[derive(Debug, Clone)]
pub(crate) enum Chunk {
    Data(Bytes),
    Eof,
}

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Chunk::Data(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk::Data(Bytes::from(s))
    }
}

type Responder = Box<dyn FnMut(&str) -> Vec<Chunk> + Send>;

/// Lines written to a [`MockChannel`], shared with the test.
#[derive(Debug, Clone, Default)]
pub(crate) struct SentLog(Arc<Mutex<Vec<String>>>);

impl SentLog {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count_containing(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }

    fn push(&self, line: &str) {
        self.0.lock().unwrap().push(line.to_string());
    }
}

/// A channel that answers each written line with scripted chunks.
///
/// Queued replies are consumed first, one per line written; once they run
/// out the responder, if any, produces the answer. With neither, the device
/// stays silent.
pub(crate) struct MockChannel {
    pending: VecDeque<Chunk>,
    replies: VecDeque<Vec<Chunk>>,
    responder: Option<Responder>,
    endless_empty: bool,
    sent: SentLog,
    closed: Arc<AtomicBool>,
}

impl MockChannel {
    pub(crate) fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            replies: VecDeque::new(),
            responder: None,
            endless_empty: false,
            sent: SentLog::default(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Output available before anything is written (banners, prompts).
    pub(crate) fn with_output<I, T>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Chunk>,
    {
        self.pending.extend(chunks.into_iter().map(Into::into));
        self
    }

    /// End the stream once pending output is drained.
    pub(crate) fn with_eof(mut self) -> Self {
        self.pending.push_back(Chunk::Eof);
        self
    }

    /// Return empty chunks forever instead of blocking.
    pub(crate) fn with_endless_empty_reads(mut self) -> Self {
        self.endless_empty = true;
        self
    }

    /// Queue the answer to the next line written.
    pub(crate) fn reply<I, T>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Chunk>,
    {
        self.replies
            .push_back(chunks.into_iter().map(Into::into).collect());
        self
    }

    /// Queue silence as the answer to the next line written.
    pub(crate) fn reply_nothing(mut self) -> Self {
        self.replies.push_back(Vec::new());
        self
    }

    /// Answer every line not covered by a queued reply.
    pub(crate) fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: FnMut(&str) -> Vec<Chunk> + Send + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    pub(crate) fn sent(&self) -> SentLog {
        self.sent.clone()
    }

    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

impl TerminalChannel for MockChannel {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed.into());
        }
        self.sent.push(line);
        let answer = match self.replies.pop_front() {
            Some(chunks) => chunks,
            None => match self.responder.as_mut() {
                Some(responder) => responder(line),
                None => Vec::new(),
            },
        };
        self.pending.extend(answer);
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Bytes> {
        match self.pending.pop_front() {
            Some(Chunk::Data(data)) => Ok(data),
            Some(Chunk::Eof) => {
                self.pending.push_front(Chunk::Eof);
                Err(ChannelError::Closed.into())
            }
            None if self.endless_empty => Ok(Bytes::new()),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

/// Hands out a single prepared [`MockChannel`].
pub(crate) struct MockConnector {
    channel: Mutex<Option<MockChannel>>,
}

impl MockConnector {
    pub(crate) fn new(channel: MockChannel) -> Self {
        Self {
            channel: Mutex::new(Some(channel)),
        }
    }
}

impl Connector for MockConnector {
    type Channel = MockChannel;

    async fn connect(&self) -> Result<MockChannel> {
        self.channel
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ChannelError::PtyOpenFailed.into())
    }
}
