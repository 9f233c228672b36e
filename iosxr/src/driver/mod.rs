//! High-level session API.
//!
//! A [`Session`] owns one terminal channel to one device. It logs in, enters
//! the XML agent and then exchanges one request at a time: configuration
//! operations, show commands and raw RPCs.

mod builder;
mod config_session;
#[cfg(test)]
pub(crate) mod fixtures;
mod response;
mod rpc;
mod session;
mod show;

pub use builder::SessionBuilder;
pub use response::RpcResponse;
pub use session::Session;
pub use show::{ShowCommand, ShowContext};
