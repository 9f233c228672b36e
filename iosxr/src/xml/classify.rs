//! Response classification.
//!
//! Turns a parsed response into either the text payload the caller asked
//! for or the specific error the device reported. Rules apply in order:
//! iterator mode, nonzero error counts, the CLI "Invalid input" marker,
//! and finally success.

use log::debug;

use super::element::Element;
use super::request::{RequestKind, RpcRequest};
use crate::channel::patterns::{INVALID_INPUT_MARKER, NO_CHANGES_ERROR_CODE};
use crate::driver::RpcResponse;
use crate::error::{ProtocolError, Result, XmlCliError};

/// Children that carry the error for CLI and commit requests.
const ERROR_CARRIERS: [&str; 2] = ["CLI", "Commit"];

/// Classify `response` to `request`, returning the payload text on success.
///
/// The payload is the text of `CLI/Configuration` or `CLI/Exec` with leading
/// whitespace removed, or empty for requests without one.
pub fn classify(response: &RpcResponse, request: &RpcRequest) -> Result<String> {
    let root = response.root();

    if root.attr("IteratorID").is_some() {
        return Err(ProtocolError::IteratorMode.into());
    }

    if let Some(failure) = find_failure(root) {
        debug!(
            "device reported {} error(s) for {:?}: {}",
            failure.count,
            request.kind(),
            failure.message
        );

        if request.kind() == RequestKind::Commit && failure.code == Some(NO_CHANGES_ERROR_CODE) {
            return Err(XmlCliError::NoChangesToCommit.into());
        }

        let message = format!(
            "{}\nOriginal call was: {}",
            failure.message,
            request.to_wire()
        );
        let error = match request.kind() {
            RequestKind::Configuration => XmlCliError::InvalidInput { message },
            _ => XmlCliError::Cli { message },
        };
        return Err(error.into());
    }

    let payload = root
        .find(&["CLI", "Configuration"])
        .or_else(|| root.find(&["CLI", "Exec"]))
        .map(|el| el.text.as_str())
        .unwrap_or_default();

    if payload.contains(INVALID_INPUT_MARKER) {
        return Err(XmlCliError::InvalidInput {
            message: format!("Invalid input entered:\n{}", payload),
        }
        .into());
    }

    Ok(payload.trim_start().to_string())
}

struct Failure<'a> {
    count: u64,
    message: &'a str,
    code: Option<&'a str>,
}

fn find_failure(root: &Element) -> Option<Failure<'_>> {
    let count = root
        .children
        .iter()
        .map(Element::error_count)
        .chain(std::iter::once(root.error_count()))
        .max()
        .unwrap_or(0);

    if count == 0 {
        return None;
    }

    // Prefer the element the request targeted, then any child, then the root
    let carrier = ERROR_CARRIERS
        .iter()
        .filter_map(|name| root.child(name))
        .chain(root.children.iter())
        .chain(std::iter::once(root))
        .find(|el| el.attr("ErrorMsg").is_some());

    Some(Failure {
        count,
        message: carrier
            .and_then(|el| el.attr("ErrorMsg"))
            .unwrap_or("XML agent reported an error without a message"),
        code: carrier.and_then(|el| el.attr("ErrorCode")),
    })
}
