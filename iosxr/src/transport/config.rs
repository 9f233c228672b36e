//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

/// SSH connection configuration.
#[derive(Debug)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Connection timeout.
    pub timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Get the socket address for connection.
    ///
    /// Bare IPv6 literals are bracketed so the port stays separable.
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The password, if password authentication is configured.
    ///
    /// Also answers in-band password prompts during login.
    pub fn password(&self) -> Option<&SecretString> {
        match &self.auth {
            AuthMethod::Password(password) => Some(password),
            _ => None,
        }
    }
}

/// Authentication method for SSH connections.
#[derive(Debug)]
pub enum AuthMethod {
    /// No authentication (for testing only).
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn config(host: &str, auth: AuthMethod) -> SshConfig {
        SshConfig {
            host: host.to_string(),
            port: 830,
            username: "admin".to_string(),
            auth,
            timeout: Duration::from_secs(5),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        assert_eq!(config("edge-01", AuthMethod::None).socket_addr(), "edge-01:830");
        assert_eq!(config("10.0.0.1", AuthMethod::None).socket_addr(), "10.0.0.1:830");
        assert_eq!(config("2001:db8::1", AuthMethod::None).socket_addr(), "[2001:db8::1]:830");
        assert_eq!(config("[2001:db8::1]", AuthMethod::None).socket_addr(), "[2001:db8::1]:830");
    }

    #[test]
    fn test_password_only_for_password_auth() {
        let with_password = config("edge-01", AuthMethod::Password("s3cret".into()));
        assert_eq!(with_password.password().unwrap().expose_secret(), "s3cret");

        let with_key = config(
            "edge-01",
            AuthMethod::PrivateKey {
                path: PathBuf::from("/home/admin/.ssh/id_ed25519"),
                passphrase: Some("unlock".into()),
            },
        );
        assert!(with_key.password().is_none());
        assert!(config("edge-01", AuthMethod::None).password().is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let shown = format!("{:?}", config("edge-01", AuthMethod::Password("s3cret".into())));
        assert!(shown.contains("edge-01"));
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn test_default_host_key_verification_accepts_new() {
        assert!(matches!(HostKeyVerification::default(), HostKeyVerification::AcceptNew));
    }
}
