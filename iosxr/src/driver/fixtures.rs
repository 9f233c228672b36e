//! Canned device conversations shared by the driver tests.

use std::time::Duration;

use super::builder::SessionBuilder;
use super::session::Session;
use crate::channel::mock::{Chunk, MockChannel, MockConnector};

/// Exec prompt after login.
pub(crate) const CLI_PROMPT: &str = "RP/0/RSP0/CPU0:xr-lab#";

/// Reply to the `xml` command.
pub(crate) const XML_ENTRY: &str = "xml\r\nXML> ";

/// Wrap `inner` in a successful response document.
pub(crate) fn ok_doc(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response MajorVersion="1" MinorVersion="0">{inner}<ResultSummary ErrorCount="0"/></Response>"#
    )
}

/// A response document followed by the agent prompt.
pub(crate) fn answer(doc: &str) -> Vec<Chunk> {
    vec![format!("{doc}\r\nXML> ").into()]
}

/// Response to an `<Exec>` or `<Configuration>` request carrying `text`.
pub(crate) fn cli_doc(context: &str, text: &str) -> String {
    ok_doc(&format!("<CLI><{context}>{text}</{context}></CLI>"))
}

/// The terminal echo of a written line.
pub(crate) fn echo(line: &str) -> Chunk {
    format!("{line}\r\n").into()
}

/// A device that echoes and accepts every request.
fn cooperative(line: &str) -> Vec<Chunk> {
    let doc = if line.contains("<Exec>") {
        cli_doc("Exec", "\n")
    } else if line.contains("<Configuration>") {
        cli_doc("Configuration", "")
    } else if line.contains("<Commit") {
        ok_doc(r#"<Commit CommitID="1000000042"/>"#)
    } else if line.starts_with("<?xml") {
        ok_doc("")
    } else {
        return Vec::new();
    };

    let mut chunks = vec![echo(line)];
    chunks.extend(answer(&doc));
    chunks
}

/// Logged in, answers `xml`, then agrees with everything not scripted.
///
/// Chain `.reply(...)` to script the answers to the requests after `xml`.
pub(crate) fn device() -> MockChannel {
    MockChannel::new()
        .with_output([format!("\r\nLast login: never\r\n{CLI_PROMPT}")])
        .reply([XML_ENTRY])
        .with_responder(cooperative)
}

/// An unopened session over `channel`.
pub(crate) fn session(channel: MockChannel, lock_on_open: bool) -> Session<MockConnector> {
    SessionBuilder::new("xr-lab")
        .username("admin")
        .password("admin")
        .timeout(Duration::from_millis(300))
        .lock_on_open(lock_on_open)
        .build_with_connector(MockConnector::new(channel))
        .unwrap()
}

/// An opened session over `channel`, without auto-lock.
pub(crate) async fn open_session(channel: MockChannel) -> Session<MockConnector> {
    let mut session = session(channel, false);
    session.open().await.unwrap();
    session
}
