//! Parsed XML agent response.

use std::time::Duration;

use crate::error::{ProtocolError, Result};
use crate::xml::Element;

/// A complete response document read back from the XML agent.
#[derive(Debug, Clone)]
pub struct RpcResponse {
    /// The response document, with terminal noise removed.
    raw: String,

    /// Parsed root element.
    root: Element,

    /// Time between writing the request and reading the closing tag.
    elapsed: Duration,
}

impl RpcResponse {
    /// Parse a response document.
    ///
    /// A document that fails to parse but names an `IteratorID` comes from an
    /// agent in iteration mode, which only sends partial documents.
    pub fn parse(raw: impl Into<String>, elapsed: Duration) -> Result<Self> {
        let raw = raw.into();
        let root = match Element::parse(&raw) {
            Ok(root) => root,
            Err(_) if raw.contains("IteratorID=\"") => {
                return Err(ProtocolError::IteratorMode.into());
            }
            Err(e) => return Err(e),
        };
        Ok(Self { raw, root, elapsed })
    }

    /// The response document text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Root element of the document.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Round-trip time.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Consume the response, returning the document text.
    pub fn into_raw(self) -> String {
        self.raw
    }
}

impl std::fmt::Display for RpcResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}
