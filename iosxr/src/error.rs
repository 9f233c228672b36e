//! Error types for iosxr.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for iosxr operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Login and XML agent entry errors
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    /// Responses the driver cannot make sense of
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Errors reported by the device for an otherwise valid exchange
    #[error("XML CLI error: {0}")]
    XmlCli(#[from] XmlCliError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl Error {
    /// Whether this error is a read or handshake timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Channel(ChannelError::PatternTimeout(_))
                | Error::Connect(ConnectError::Timeout(_))
                | Error::Transport(TransportError::Timeout(_))
        )
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// The host is not present in known_hosts (strict checking)
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// The host key differs from the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// Failed to request shell
    #[error("Failed to request shell")]
    ShellRequestFailed,

    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Errors raised while logging in and entering the XML agent.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The interactive login did not reach a command prompt
    #[error("Login failed: {message}")]
    LoginFailed { message: String },

    /// The device rejected the supplied password
    #[error("Authentication rejected for user '{user}'")]
    AuthenticationRejected { user: String },

    /// The login handshake did not complete in time
    #[error("Connect timed out after {0:?}")]
    Timeout(Duration),

    /// The device has no XML TTY agent running
    #[error("XML agent is not available, configure 'xml agent tty iteration off' on the device")]
    XmlAgentUnavailable,

    /// A previous request never resolved, the channel is out of sync
    #[error("XML agent already acquired by an unfinished request")]
    XmlAgentAlreadyAcquired,
}

/// Errors in the shape of what the device sent back.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The device could not parse the request document
    #[error("Device reported malformed XML for request: {request}")]
    MalformedXml { request: String },

    /// The device is serving another XML request
    #[error("XML agent is busy with another request")]
    AgentBusy,

    /// Iteration mode is enabled on the agent
    #[error(
        "Iterator mode is enabled on the XML agent, configure 'xml agent tty iteration off' on the device"
    )]
    IteratorMode,

    /// The response could not be parsed
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

/// Errors reported by the device for a well-formed exchange.
#[derive(Error, Debug)]
pub enum XmlCliError {
    /// Generic nonzero error count
    #[error("{message}")]
    Cli { message: String },

    /// The CLI rejected the input text
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The configuration database is locked by another session
    #[error("Unable to lock the configuration: {message}")]
    LockFailed { message: String },

    /// The device refused to release the lock
    #[error("Unable to unlock the configuration: {message}")]
    UnlockFailed { message: String },

    /// Commit issued with no candidate changes
    #[error("No configuration changes to commit")]
    NoChangesToCommit,

    /// Confirmed-commit window outside the range the device accepts
    #[error("Confirmed commit timeout must be between 30 and 300 seconds, got {0}")]
    ConfirmedOutOfRange(u32),
}

/// Driver layer errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Session not connected
    #[error("Session not connected - call open() first")]
    NotConnected,

    /// Session already connected
    #[error("Session already connected")]
    AlreadyConnected,

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The dispatcher only forwards show commands
    #[error("Unknown command '{name}', only show commands can be dispatched")]
    CommandNotFound { name: String },

    /// A configuration file could not be read
    #[error("Failed to read configuration file {path:?}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using iosxr's Error.
pub type Result<T> = std::result::Result<T, Error>;
