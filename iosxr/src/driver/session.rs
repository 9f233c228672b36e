//! Session lifecycle: login, XML agent entry, locking and teardown.

use std::fmt;
use std::time::Duration;

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;

use super::builder::SessionBuilder;
use crate::channel::patterns::{AGENT_NOT_STARTED_MARKER, INVALID_INPUT_MARKER};
use crate::channel::{Connector, PtyChannel, PtyConfig, SessionPatterns, TerminalChannel};
use crate::error::{ChannelError, ConnectError, DriverError, Error, Result, XmlCliError};
use crate::transport::SshConfig;
use crate::xml::RpcRequest;

/// Tunables fixed when the session is built.
#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub(crate) host: String,
    pub(crate) username: String,
    pub(crate) timeout: Duration,
    pub(crate) lock_on_open: bool,
    pub(crate) config_trim_lines: usize,
    pub(crate) pty: PtyConfig,
}

/// A driver session with one device's XML agent.
///
/// The session owns its terminal channel exclusively. Every operation takes
/// `&mut self` and completes (or fails) before the next can start, matching
/// the agent's one-request-at-a-time model.
///
/// # Example
///
/// ```rust,no_run
/// use iosxr::{CommitOptions, Session};
///
/// # async fn example() -> Result<(), iosxr::Error> {
/// let mut session = Session::builder("edge-01.example.net")
///     .username("admin")
///     .password("secret")
///     .build()?;
/// session.open().await?;
///
/// session.load_candidate_config("hostname edge-01").await?;
/// println!("{}", session.compare_config().await?);
/// session.commit_config(&CommitOptions::new().label("rename")).await?;
///
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session<K: Connector = SshConfig> {
    pub(crate) connector: K,
    pub(crate) settings: SessionSettings,
    password: Option<SecretString>,
    patterns: SessionPatterns,
    pub(crate) channel: Option<PtyChannel<K::Channel>>,
    pub(crate) locked: bool,
    pub(crate) xml_agent_acquired: bool,
    /// A timed-out request may still be answered.
    pub(crate) late_reply_pending: bool,
    cli_prompt: String,
}

impl<K: Connector> fmt::Debug for Session<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.settings.host)
            .field("username", &self.settings.username)
            .field("open", &self.channel.is_some())
            .field("locked", &self.locked)
            .field("xml_agent_acquired", &self.xml_agent_acquired)
            .finish_non_exhaustive()
    }
}

impl Session<SshConfig> {
    /// Start building a session over SSH to `host`.
    pub fn builder(host: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(host)
    }
}

impl<K: Connector> Session<K> {
    pub(crate) fn new(
        connector: K,
        settings: SessionSettings,
        password: Option<SecretString>,
    ) -> Result<Self> {
        Ok(Self {
            connector,
            settings,
            password,
            patterns: SessionPatterns::new().map_err(ChannelError::InvalidPattern)?,
            channel: None,
            locked: false,
            xml_agent_acquired: false,
            late_reply_pending: false,
            cli_prompt: String::new(),
        })
    }

    /// Connect, log in and enter the XML agent.
    ///
    /// The whole handshake is bounded by the session timeout. When the
    /// session was built with `lock_on_open`, the configuration is locked
    /// before returning; a lock failure is returned with the session left
    /// open.
    pub async fn open(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let timeout = self.settings.timeout;
        let deadline = Instant::now() + timeout;
        debug!("opening session to {}", self.settings.host);

        let inner = tokio::time::timeout_at(deadline, self.connector.connect())
            .await
            .map_err(|_| ConnectError::Timeout(timeout))??;
        let mut channel = PtyChannel::new(inner, self.settings.pty.clone());

        let handshake = Handshake {
            patterns: &self.patterns,
            password: self.password.as_ref(),
            settings: &self.settings,
        };
        let outcome = async {
            let prompt = handshake.login(&mut channel, deadline).await?;
            handshake.enter_xml_agent(&mut channel, deadline).await?;
            Ok::<_, Error>(prompt)
        }
        .await;

        let prompt = match outcome {
            Ok(prompt) => prompt,
            Err(e) => {
                if let Err(close_err) = channel.close().await {
                    debug!("closing failed handshake: {}", close_err);
                }
                return Err(e);
            }
        };

        debug!("XML agent ready on {} (prompt {:?})", self.settings.host, prompt);
        self.cli_prompt = prompt;
        self.channel = Some(channel);
        self.locked = false;
        self.xml_agent_acquired = false;
        self.late_reply_pending = false;

        if self.settings.lock_on_open {
            self.lock().await?;
        }

        Ok(())
    }

    /// Unlock if needed and release the channel.
    ///
    /// Unlock failures are logged and ignored so teardown always completes.
    /// Closing a session that is not open does nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.channel.is_none() {
            return Ok(());
        }

        if self.locked || self.settings.lock_on_open {
            if let Err(e) = self.unlock().await {
                warn!("unlock during close of {} failed: {}", self.settings.host, e);
            }
        }

        let result = match self.channel.take() {
            Some(mut channel) => channel.close().await,
            None => Ok(()),
        };

        self.locked = false;
        self.xml_agent_acquired = false;
        self.late_reply_pending = false;
        self.cli_prompt.clear();
        debug!("session to {} closed", self.settings.host);
        result
    }

    /// Lock the configuration for this session.
    ///
    /// Does nothing when the lock is already held.
    pub async fn lock(&mut self) -> Result<()> {
        if self.locked {
            return Ok(());
        }

        match self.execute(&RpcRequest::lock()).await {
            Ok(_) => {
                self.locked = true;
                debug!("configuration locked on {}", self.settings.host);
                Ok(())
            }
            Err(Error::XmlCli(e)) => Err(XmlCliError::LockFailed {
                message: e.to_string(),
            }
            .into()),
            Err(e) => Err(e),
        }
    }

    /// Release the configuration lock.
    ///
    /// Does nothing when the lock is not held.
    pub async fn unlock(&mut self) -> Result<()> {
        if !self.locked {
            return Ok(());
        }

        match self.execute(&RpcRequest::unlock()).await {
            Ok(_) => {
                self.locked = false;
                debug!("configuration unlocked on {}", self.settings.host);
                Ok(())
            }
            Err(Error::XmlCli(e)) => Err(XmlCliError::UnlockFailed {
                message: e.to_string(),
            }
            .into()),
            Err(e) => Err(e),
        }
    }

    /// Whether `open()` succeeded and `close()` has not been called.
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Whether the session is open and its connection still up.
    pub fn is_alive(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_alive())
    }

    /// Whether this session holds the configuration lock.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether a request is outstanding on the XML agent.
    pub fn is_xml_agent_acquired(&self) -> bool {
        self.xml_agent_acquired
    }

    /// The exec prompt seen at login.
    pub fn cli_prompt(&self) -> &str {
        &self.cli_prompt
    }

    /// The device this session talks to.
    pub fn host(&self) -> &str {
        &self.settings.host
    }

    /// The per-operation timeout.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }
}

/// Borrowed view of what the login handshake needs.
struct Handshake<'a> {
    patterns: &'a SessionPatterns,
    password: Option<&'a SecretString>,
    settings: &'a SessionSettings,
}

impl Handshake<'_> {
    /// Answer login prompts in whatever order they come until the CLI prompt.
    async fn login<C: TerminalChannel>(
        &self,
        channel: &mut PtyChannel<C>,
        deadline: Instant,
    ) -> Result<String> {
        let patterns = self.patterns;
        let mut password_sent = false;

        loop {
            let read = channel
                .read_until_any(
                    &[
                        &patterns.host_key,
                        &patterns.password,
                        &patterns.cli_prompt,
                        &patterns.denied,
                    ],
                    deadline.saturating_duration_since(Instant::now()),
                )
                .await
                .map_err(|e| self.handshake_error(e))?;

            match read.matched {
                0 => {
                    debug!("confirming host key");
                    channel.send_line("yes").await?;
                }
                1 if password_sent => {
                    return Err(self.rejected());
                }
                1 => {
                    let password = self.password.ok_or_else(|| {
                        ConnectError::LoginFailed {
                            message: "device asked for a password but none was configured"
                                .to_string(),
                        }
                    })?;
                    debug!("answering password prompt");
                    channel.send_line(password.expose_secret()).await?;
                    password_sent = true;
                }
                2 => {
                    let output = read.as_str();
                    let prompt = output.trim_end().lines().last().unwrap_or_default();
                    return Ok(prompt.trim().to_string());
                }
                _ => return Err(self.rejected()),
            }
        }
    }

    /// Issue `xml` and wait for the agent prompt.
    async fn enter_xml_agent<C: TerminalChannel>(
        &self,
        channel: &mut PtyChannel<C>,
        deadline: Instant,
    ) -> Result<()> {
        let patterns = self.patterns;
        channel.send_line("xml").await?;

        let read = channel
            .read_until(deadline.saturating_duration_since(Instant::now()), |buffer| {
                if buffer.tail_contains(&patterns.xml_prompt) {
                    Some(0)
                } else if buffer.find_literal(AGENT_NOT_STARTED_MARKER.as_bytes()).is_some()
                    || buffer.find_literal(INVALID_INPUT_MARKER.as_bytes()).is_some()
                    || buffer.tail_contains(&patterns.cli_prompt)
                {
                    Some(1)
                } else {
                    None
                }
            })
            .await
            .map_err(|e| self.handshake_error(e))?;

        if read.matched != 0 {
            debug!("xml agent entry failed: {:?}", read.as_str());
            return Err(ConnectError::XmlAgentUnavailable.into());
        }
        Ok(())
    }

    fn handshake_error(&self, error: Error) -> Error {
        match error {
            Error::Channel(ChannelError::PatternTimeout(_)) => {
                ConnectError::Timeout(self.settings.timeout).into()
            }
            other => other,
        }
    }

    fn rejected(&self) -> Error {
        ConnectError::AuthenticationRejected {
            user: self.settings.username.clone(),
        }
        .into()
    }
}
