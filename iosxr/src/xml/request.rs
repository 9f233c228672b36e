//! XML agent request construction.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{Result, XmlCliError};

/// Opening of every request document.
pub const ENVELOPE_OPEN: &str =
    r#"<?xml version="1.0" encoding="UTF-8"?><Request MajorVersion="1" MinorVersion="0">"#;

/// Closing of every request document.
pub const ENVELOPE_CLOSE: &str = "</Request>";

/// Smallest confirmed-commit window the device accepts, in seconds.
pub const CONFIRMED_MIN: u32 = 30;

/// Largest confirmed-commit window the device accepts, in seconds.
pub const CONFIRMED_MAX: u32 = 300;

/// Longest commit comment the device stores.
pub const COMMENT_MAX_CHARS: usize = 60;

/// What a request asks the device to do.
///
/// The classifier uses this to pick the error kind for a failed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Lock,
    Unlock,
    Clear,
    Commit,
    Rollback,
    /// `<CLI><Exec>`
    Exec,
    /// `<CLI><Configuration>`
    Configuration,
    /// Caller-supplied body.
    Raw,
}

/// A complete XML agent request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcRequest {
    kind: RequestKind,
    body: String,
}

impl RpcRequest {
    /// `<Lock/>`
    pub fn lock() -> Self {
        Self::new(RequestKind::Lock, "<Lock/>")
    }

    /// `<Unlock/>`
    pub fn unlock() -> Self {
        Self::new(RequestKind::Unlock, "<Unlock/>")
    }

    /// `<Clear/>`, discarding the candidate configuration.
    pub fn clear() -> Self {
        Self::new(RequestKind::Clear, "<Clear/>")
    }

    /// `<Commit .../>`, validating the options first.
    pub fn commit(options: &CommitOptions, replace: bool) -> Result<Self> {
        let mut body = String::from("<Commit");
        if replace {
            body.push_str(r#" Replace="true""#);
        }
        if let Some(label) = &options.label {
            let _ = write!(body, r#" Label="{}""#, escape_attr(label));
        }
        if let Some(comment) = &options.comment {
            let comment: String = comment.chars().take(COMMENT_MAX_CHARS).collect();
            let _ = write!(body, r#" Comment="{}""#, escape_attr(&comment));
        }
        if let Some(confirmed) = options.confirmed {
            if !(CONFIRMED_MIN..=CONFIRMED_MAX).contains(&confirmed) {
                return Err(XmlCliError::ConfirmedOutOfRange(confirmed).into());
            }
            let _ = write!(body, r#" Confirmed="{}""#, confirmed);
        }
        body.push_str("/>");
        Ok(Self::new(RequestKind::Commit, body))
    }

    /// Roll back `previous` commits.
    ///
    /// The device only rolls back while unlocked, so a locked session
    /// brackets the rollback with `<Unlock/>` and `<Lock/>`.
    pub fn rollback(previous: u32, relock: bool) -> Self {
        let rollback = format!("<Rollback><Previous>{}</Previous></Rollback>", previous);
        let body = if relock {
            format!("<Unlock/>{}<Lock/>", rollback)
        } else {
            rollback
        };
        Self::new(RequestKind::Rollback, body)
    }

    /// `<CLI><Exec>command</Exec></CLI>`
    pub fn exec(command: &str) -> Self {
        Self::new(
            RequestKind::Exec,
            format!("<CLI><Exec>{}</Exec></CLI>", escape_text(command)),
        )
    }

    /// `<CLI><Configuration>text</Configuration></CLI>`
    pub fn configuration(text: &str) -> Self {
        Self::new(
            RequestKind::Configuration,
            format!(
                "<CLI><Configuration>{}</Configuration></CLI>",
                escape_text(text)
            ),
        )
    }

    /// A body passed through untouched.
    pub fn raw(body: impl Into<String>) -> Self {
        Self::new(RequestKind::Raw, body)
    }

    fn new(kind: RequestKind, body: impl Into<String>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }

    /// The request kind.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// The inner body, without the envelope.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The full document as written to the device.
    pub fn to_wire(&self) -> String {
        let mut wire =
            String::with_capacity(ENVELOPE_OPEN.len() + self.body.len() + ENVELOPE_CLOSE.len());
        wire.push_str(ENVELOPE_OPEN);
        wire.push_str(&self.body);
        wire.push_str(ENVELOPE_CLOSE);
        wire
    }
}

/// Options for `commit_config` and `commit_replace_config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOptions {
    /// Commit label.
    pub label: Option<String>,

    /// Commit comment, truncated to 60 characters.
    pub comment: Option<String>,

    /// Confirmed-commit window in seconds, 30 to 300.
    pub confirmed: Option<u32>,
}

impl CommitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Roll back automatically unless confirmed within `seconds`.
    pub fn confirmed(mut self, seconds: u32) -> Self {
        self.confirmed = Some(seconds);
        self
    }
}

/// Escape character data.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value.
pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
