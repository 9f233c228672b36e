//! Candidate configuration operations.
//!
//! The XML agent keeps one candidate configuration per session. Text loaded
//! with [`Session::load_candidate_config`] is merged into it; the candidate is
//! then inspected with [`Session::compare_config`] and either committed or
//! discarded.
//!
//! # Example
//!
//! ```rust,no_run
//! use iosxr::{CommitOptions, Session};
//!
//! # async fn example() -> Result<(), iosxr::Error> {
//! let mut session = Session::builder("192.168.1.1")
//!     .username("admin")
//!     .password("secret")
//!     .build()?;
//! session.open().await?;
//!
//! session.load_candidate_config("interface Loopback100\n description lab").await?;
//! let diff = session.compare_config().await?;
//! if diff.is_empty() {
//!     session.discard_config().await?;
//! } else {
//!     session
//!         .commit_config(&CommitOptions::new().comment("loopback").confirmed(120))
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use log::{debug, warn};
use similar::TextDiff;

use super::session::Session;
use crate::channel::Connector;
use crate::error::{DriverError, Error, Result, XmlCliError};
use crate::xml::{CommitOptions, Element, RpcRequest, classify};

impl<K: Connector> Session<K> {
    /// Merge `config` into the candidate configuration.
    ///
    /// If the device rejects any line the candidate is discarded before the
    /// error is returned, so a failed load never leaves a partial candidate.
    pub async fn load_candidate_config(&mut self, config: &str) -> Result<()> {
        debug!("loading {} bytes of candidate configuration", config.len());

        match self.execute(&RpcRequest::configuration(config)).await {
            Ok(_) => Ok(()),
            Err(e @ Error::XmlCli(XmlCliError::InvalidInput { .. })) => {
                if let Err(discard) = self.discard_config().await {
                    warn!(
                        "discarding rejected candidate on {} failed: {}",
                        self.settings.host, discard
                    );
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Read `path` and merge its contents into the candidate configuration.
    pub async fn load_candidate_config_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DriverError::ConfigFile {
                path: path.to_path_buf(),
                source,
            })?;
        self.load_candidate_config(&config).await
    }

    /// Diff the running configuration against the merged candidate.
    ///
    /// Returns a unified diff without context lines, running first, or an
    /// empty string when the candidate changes nothing.
    pub async fn compare_config(&mut self) -> Result<String> {
        let merge = self.show_configuration("show configuration merge").await?;
        let running = self.show_configuration("show running-config").await?;

        if running == merge {
            return Ok(String::new());
        }

        Ok(TextDiff::from_lines(&running, &merge)
            .unified_diff()
            .context_radius(0)
            .missing_newline_hint(false)
            .header("", "")
            .to_string())
    }

    /// The device's own diff of a pending replace.
    pub async fn compare_replace_config(&mut self) -> Result<String> {
        self.show_configuration("show configuration changes diff")
            .await
    }

    /// Commit the candidate configuration.
    ///
    /// An out-of-range confirmed window fails before anything is sent.
    pub async fn commit_config(&mut self, options: &CommitOptions) -> Result<()> {
        let request = RpcRequest::commit(options, false)?;
        self.execute(&request).await?;
        debug!("candidate committed on {}", self.settings.host);
        Ok(())
    }

    /// Commit the candidate configuration, replacing the running one.
    pub async fn commit_replace_config(&mut self, options: &CommitOptions) -> Result<()> {
        let request = RpcRequest::commit(options, true)?;
        self.execute(&request).await?;
        debug!("candidate committed as replace on {}", self.settings.host);
        Ok(())
    }

    /// Throw away the candidate configuration.
    pub async fn discard_config(&mut self) -> Result<()> {
        self.execute(&RpcRequest::clear()).await?;
        Ok(())
    }

    /// Roll back the last commit.
    pub async fn rollback(&mut self) -> Result<()> {
        self.rollback_to(1).await
    }

    /// Roll back the last `previous` commits.
    ///
    /// Rollback only runs while the configuration is unlocked. A locked
    /// session releases and retakes the lock in the same request. If that
    /// request fails, the session counts as locked only when the device
    /// confirmed the trailing `<Lock/>`.
    pub async fn rollback_to(&mut self, previous: u32) -> Result<()> {
        let relock = self.locked;
        let request = RpcRequest::rollback(previous, relock);

        let result = match self.send_rpc(&request).await {
            Ok(response) => {
                let result = classify(&response, &request);
                if relock && result.is_err() {
                    self.locked = relocked(response.root());
                }
                result
            }
            Err(e) => {
                if relock {
                    self.locked = false;
                }
                Err(e)
            }
        };

        if relock && !self.locked {
            warn!("configuration lock on {} lost during rollback", self.settings.host);
        }
        result?;
        debug!("rolled back {} commit(s) on {}", previous, self.settings.host);
        Ok(())
    }

    /// Run a configuration-context show and strip the banner around it.
    async fn show_configuration(&mut self, command: &str) -> Result<String> {
        let output = self.execute(&RpcRequest::configuration(command)).await?;
        Ok(trim_banner(&output, self.settings.config_trim_lines))
    }
}

/// Whether a bracketed rollback response shows the lock retaken.
fn relocked(root: &Element) -> bool {
    root.child("Lock")
        .is_some_and(|lock| lock.error_count() == 0 && lock.attr("ErrorMsg").is_none())
}

/// Drop `lines` lines from each end of `text`.
///
/// Configuration output is wrapped in a fixed number of header and footer
/// lines ("Building configuration...", the version comment, `end`).
pub(crate) fn trim_banner(text: &str, lines: usize) -> String {
    let text = text.replace('\r', "");
    let all: Vec<&str> = text.split_inclusive('\n').collect();
    if all.len() <= lines * 2 {
        return String::new();
    }
    all[lines..all.len() - lines].concat()
}
