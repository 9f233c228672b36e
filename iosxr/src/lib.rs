//! # iosxr
//!
//! Async driver for the Cisco IOS-XR XML agent.
//!
//! The XML agent is a sub-mode of the router's CLI shell: requests are
//! written as XML documents and answered with XML documents on the same
//! interactive SSH session. This crate drives that conversation, turning
//! device answers into typed results and errors.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Candidate configuration load, compare, commit (with confirm window),
//!   discard and rollback
//! - Show commands in exec or configuration context
//! - Raw XML RPCs
//! - One request in flight per session, bounded by a timeout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iosxr::{Session, ShowCommand};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), iosxr::Error> {
//!     let mut session = Session::builder("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .lock_on_open(false)
//!         .build()?;
//!
//!     session.open().await?;
//!
//!     let output = session.show(&ShowCommand::parse("show_version")).await?;
//!     println!("{}", output);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod transport;
pub mod xml;

// Re-export main types for convenience
pub use channel::{Connector, TerminalChannel};
pub use driver::{RpcResponse, Session, SessionBuilder, ShowCommand, ShowContext};
pub use error::{Error, Result};
pub use transport::{AuthMethod, HostKeyVerification, SshConfig};
pub use xml::{CommitOptions, RpcRequest};
