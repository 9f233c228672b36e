//! Builder for creating sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::session::{Session, SessionSettings};
use crate::channel::{Connector, PtyConfig};
use crate::error::{DriverError, Result};
use crate::transport::config::{AuthMethod, HostKeyVerification, SshConfig};

/// Credentials as given to the builder.
enum Credentials {
    None,
    Password(String),
    PrivateKey {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

/// Builder for constructing sessions.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use iosxr::SessionBuilder;
///
/// # async fn example() -> Result<(), iosxr::Error> {
/// let mut session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .timeout(Duration::from_secs(30))
///     .lock_on_open(false)
///     .build()?;
/// session.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    credentials: Credentials,
    timeout: Duration,
    lock_on_open: bool,
    config_trim_lines: usize,
    terminal_width: u32,
    terminal_height: u32,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            credentials: Credentials::None,
            timeout: Duration::from_secs(60),
            lock_on_open: true,
            config_trim_lines: 2,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    ///
    /// The password also answers password prompts seen during login.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.credentials = Credentials::Password(password.into());
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.credentials = Credentials::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.credentials = Credentials::PrivateKey {
            path: key_path.into(),
            passphrase: Some(passphrase.into()),
        };
        self
    }

    /// Bound on connecting plus login, and on each request (default: 60s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Lock the configuration as part of `open()` (default: true).
    pub fn lock_on_open(mut self, lock: bool) -> Self {
        self.lock_on_open = lock;
        self
    }

    /// Lines of banner and footer around configuration output (default: 2).
    pub fn config_trim_lines(mut self, lines: usize) -> Self {
        self.config_trim_lines = lines;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set the host key verification mode (default: [`HostKeyVerification::AcceptNew`]).
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than `~/.ssh/known_hosts`.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Accept any host key. For lab use only.
    pub fn danger_disable_host_key_verification(mut self) -> Self {
        self.host_key_verification = HostKeyVerification::Disabled;
        self
    }

    /// Build a session over SSH.
    ///
    /// This does not connect. Call `open()` on the returned session.
    pub fn build(self) -> Result<Session<SshConfig>> {
        let settings = self.settings()?;
        let password = self.login_password();

        let auth = match self.credentials {
            Credentials::None => AuthMethod::None,
            Credentials::Password(password) => AuthMethod::Password(SecretString::from(password)),
            Credentials::PrivateKey { path, passphrase } => AuthMethod::PrivateKey {
                path,
                passphrase: passphrase.map(SecretString::from),
            },
        };

        let config = SshConfig {
            host: self.host,
            port: self.port,
            username: settings.username.clone(),
            auth,
            timeout: self.timeout,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        Session::new(config, settings, password)
    }

    /// Build a session that gets its channel from `connector`.
    ///
    /// Transport options (port, key files, host keys, terminal size) are
    /// the connector's business and ignored here.
    pub fn build_with_connector<K: Connector>(self, connector: K) -> Result<Session<K>> {
        let settings = self.settings()?;
        let password = self.login_password();
        Session::new(connector, settings, password)
    }

    fn settings(&self) -> Result<SessionSettings> {
        let username = self.username.clone().ok_or_else(|| DriverError::InvalidConfig {
            message: "username is required".to_string(),
        })?;

        if self.timeout.is_zero() {
            return Err(DriverError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(SessionSettings {
            host: self.host.clone(),
            username,
            timeout: self.timeout,
            lock_on_open: self.lock_on_open,
            config_trim_lines: self.config_trim_lines,
            pty: PtyConfig::default(),
        })
    }

    fn login_password(&self) -> Option<SecretString> {
        match &self.credentials {
            Credentials::Password(password) => Some(SecretString::from(password.clone())),
            _ => None,
        }
    }
}
