//! RPC transport: write one request, read back one complete response.

use std::ops::Range;
use std::time::Duration;

use log::{debug, trace};
use memchr::memmem;
use tokio::time::Instant;

use super::response::RpcResponse;
use super::session::Session;
use crate::channel::patterns::{
    AGENT_BUSY_MARKER, MALFORMED_XML_MARKER, REQUEST_END, RESPONSE_END, RESPONSE_START,
};
use crate::channel::{Connector, PtyChannel, TerminalChannel};
use crate::error::{ConnectError, DriverError, ProtocolError, Result};
use crate::xml::{RpcRequest, classify};

/// What ended the read loop.
const COMPLETE: usize = 0;
const MALFORMED: usize = 1;
const BUSY: usize = 2;

/// Longer than any marker the read loop looks for.
const MARKER_OVERLAP: usize = 32;

impl<K: Connector> Session<K> {
    /// Send `request` and read back the parsed response, unclassified.
    ///
    /// The XML agent is marked acquired for the duration of the exchange and
    /// released on every exit path. A session whose previous request future
    /// was dropped before completing stays acquired; its channel is out of
    /// step with the device and must be closed and reopened.
    ///
    /// After a timeout the reply to the abandoned request may still arrive.
    /// Until a later request succeeds, a response only counts once the
    /// terminal has echoed the new request back.
    pub async fn send_rpc(&mut self, request: &RpcRequest) -> Result<RpcResponse> {
        let timeout = self.settings.timeout;
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;

        if self.xml_agent_acquired {
            return Err(ConnectError::XmlAgentAlreadyAcquired.into());
        }

        self.xml_agent_acquired = true;
        let result = exchange(channel, request, timeout, self.late_reply_pending).await;
        self.xml_agent_acquired = false;

        match &result {
            Ok(_) => self.late_reply_pending = false,
            Err(e) if e.is_timeout() => self.late_reply_pending = true,
            Err(_) => {}
        }
        result
    }

    /// Send `request` and classify the response, returning its payload text.
    pub async fn execute(&mut self, request: &RpcRequest) -> Result<String> {
        let response = self.send_rpc(request).await?;
        classify(&response, request)
    }

    /// Send an arbitrary request body and return the response document.
    ///
    /// The body is wrapped in the request envelope and the response is
    /// classified like any other, so device errors surface as errors.
    pub async fn make_rpc_call(&mut self, body: &str) -> Result<String> {
        let request = RpcRequest::raw(body);
        let response = self.send_rpc(&request).await?;
        classify(&response, &request)?;
        Ok(response.into_raw())
    }
}

async fn exchange<C: TerminalChannel>(
    channel: &mut PtyChannel<C>,
    request: &RpcRequest,
    timeout: Duration,
    require_echo: bool,
) -> Result<RpcResponse> {
    let wire = request.to_wire();
    debug!("rpc {:?}: {}", request.kind(), request.body());

    channel.clear_buffer();
    let start = Instant::now();
    channel.send_line(&wire).await?;

    let mut scanner = ResponseScanner::new(require_echo);
    let read = channel
        .read_until(timeout, |buffer| scanner.scan(buffer.as_slice()))
        .await?;

    match read.matched {
        MALFORMED => return Err(ProtocolError::MalformedXml { request: wire }.into()),
        BUSY => return Err(ProtocolError::AgentBusy.into()),
        _ => {}
    }

    let document = scanner
        .document
        .ok_or_else(|| ProtocolError::InvalidResponse {
            message: "response is missing its closing tag".to_string(),
        })?;

    let elapsed = start.elapsed();
    trace!("rpc {:?} answered in {:?}", request.kind(), elapsed);
    RpcResponse::parse(String::from_utf8_lossy(&read.data[document]), elapsed)
}

/// Finds the response document in the output following a request.
///
/// Anything up to the echoed request is terminal noise, or the late reply
/// to an abandoned request. So is any prompt text before the document and
/// the agent prompt after it. The root may be self-closing.
///
/// Each call only searches what arrived since the previous one, plus enough
/// overlap to catch a marker split across chunks.
#[derive(Debug)]
struct ResponseScanner {
    /// Ignore documents until the echo has been seen.
    require_echo: bool,
    echo_seen: bool,
    echo_from: usize,
    /// Documents start at or after this offset.
    base: usize,
    /// Offset of the `<Response` tag being read.
    open: Option<usize>,
    end_from: usize,
    markers_from: usize,
    document: Option<Range<usize>>,
}

impl ResponseScanner {
    fn new(require_echo: bool) -> Self {
        Self {
            require_echo,
            echo_seen: false,
            echo_from: 0,
            base: 0,
            open: None,
            end_from: 0,
            markers_from: 0,
            document: None,
        }
    }

    /// Which condition, if any, ends the read.
    fn scan(&mut self, data: &[u8]) -> Option<usize> {
        if self.find_document(data) {
            return Some(COMPLETE);
        }

        let from = self.markers_from.saturating_sub(MARKER_OVERLAP);
        self.markers_from = data.len();
        let seen = |marker: &str| memmem::find(&data[from..], marker.as_bytes()).is_some();

        if seen(MALFORMED_XML_MARKER) {
            Some(MALFORMED)
        } else if seen(AGENT_BUSY_MARKER) {
            Some(BUSY)
        } else {
            None
        }
    }

    fn find_document(&mut self, data: &[u8]) -> bool {
        if !self.echo_seen {
            let from = self.echo_from.saturating_sub(REQUEST_END.len());
            match memmem::find(&data[from..], REQUEST_END.as_bytes()) {
                Some(i) => {
                    self.echo_seen = true;
                    self.base = from + i + REQUEST_END.len();
                    self.open = None;
                }
                None => {
                    self.echo_from = data.len();
                    if self.require_echo {
                        return false;
                    }
                }
            }
        }

        let open = match self.open {
            Some(open) => open,
            None => match memmem::find(&data[self.base..], RESPONSE_START.as_bytes()) {
                Some(i) => {
                    let open = self.base + i;
                    self.open = Some(open);
                    self.end_from = open;
                    open
                }
                None => return false,
            },
        };

        let Some(tag_end) = start_tag_end(&data[open..]).map(|i| open + i) else {
            return false;
        };

        let end = if data[tag_end - 1] == b'/' {
            tag_end + 1
        } else {
            let from = self.end_from.max(tag_end);
            match memmem::find(&data[from..], RESPONSE_END.as_bytes()) {
                Some(i) => from + i + RESPONSE_END.len(),
                None => {
                    self.end_from = data.len().saturating_sub(RESPONSE_END.len()).max(tag_end);
                    return false;
                }
            }
        };

        // Keep the XML declaration if the device sent one
        let start = memmem::rfind(&data[self.base..open], b"<?xml").map_or(open, |i| self.base + i);
        self.document = Some(start..end);
        true
    }
}

/// Offset of the `>` closing the start tag at the beginning of `tag`.
fn start_tag_end(tag: &[u8]) -> Option<usize> {
    let mut quote = None;
    for (i, &b) in tag.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;
    use crate::channel::mock::Chunk;
    use crate::driver::fixtures::{answer, cli_doc, device, echo, ok_doc, open_session, session};
    use crate::error::{Error, XmlCliError};

    /// Run a scanner over `data` as one read.
    fn locate(data: &[u8], require_echo: bool) -> Option<&str> {
        let mut scanner = ResponseScanner::new(require_echo);
        match scanner.scan(data) {
            Some(COMPLETE) => scanner.document.map(|doc| std::str::from_utf8(&data[doc]).unwrap()),
            _ => None,
        }
    }

    const LOCK_ECHO: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Request MajorVersion="1" MinorVersion="0"><Lock/></Request>"#;

    #[test]
    fn test_locate_strips_echo_banner_and_prompt() {
        let data = format!(
            "{LOCK_ECHO}\r\nXML> noise {}\r\nXML> ",
            ok_doc("<Lock/>")
        );
        assert_eq!(locate(data.as_bytes(), false), Some(ok_doc("<Lock/>").as_str()));
    }

    #[test]
    fn test_locate_without_echo() {
        let data = b"\r\nXML> <Response><Clear/></Response>\r\nXML> ";
        assert_eq!(locate(data, false), Some("<Response><Clear/></Response>"));
        assert_eq!(locate(data, true), None);
    }

    #[test]
    fn test_locate_self_closing_root() {
        let data = format!(
            "{LOCK_ECHO}\r\n<Response MajorVersion=\"1\" MinorVersion=\"0\" ErrorCount=\"1\" ErrorMsg=\"bad syntax\"/>\r\nXML> "
        );
        assert_eq!(
            locate(data.as_bytes(), true),
            Some(r#"<Response MajorVersion="1" MinorVersion="0" ErrorCount="1" ErrorMsg="bad syntax"/>"#)
        );
    }

    #[test]
    fn test_locate_quoted_angle_bracket_in_root() {
        let data = br#"<Response ErrorMsg="expected '/>' here"><Lock/></Response>"#;
        assert_eq!(locate(data, false), Some(r#"<Response ErrorMsg="expected '/>' here"><Lock/></Response>"#));
    }

    #[test]
    fn test_locate_skips_document_before_echo() {
        let data = format!(
            "{}\r\nXML> {LOCK_ECHO}\r\n<Response><Lock/><ResultSummary ErrorCount=\"0\"/></Response>\r\nXML> ",
            ok_doc("<Clear/>")
        );
        assert_eq!(
            locate(data.as_bytes(), true),
            Some(r#"<Response><Lock/><ResultSummary ErrorCount="0"/></Response>"#)
        );
        assert_eq!(
            locate(data.as_bytes(), false),
            Some(r#"<Response><Lock/><ResultSummary ErrorCount="0"/></Response>"#)
        );
    }

    #[test]
    fn test_scanner_waits_for_split_tags() {
        let data = format!("{LOCK_ECHO}\r\n<Response ErrorCount=\"1\"/>\r\nXML> ");
        let split = LOCK_ECHO.len() - 4;
        let mut scanner = ResponseScanner::new(true);

        assert_eq!(scanner.scan(&data.as_bytes()[..split]), None);
        let self_closing = data.rfind("/>").unwrap();
        assert_eq!(scanner.scan(&data.as_bytes()[..self_closing]), None);
        assert_eq!(scanner.scan(data.as_bytes()), Some(COMPLETE));
        assert_eq!(
            &data[scanner.document.unwrap()],
            r#"<Response ErrorCount="1"/>"#
        );
    }

    #[test]
    fn test_scanner_marker_split_across_reads() {
        let data = b"XML> ERROR: 0xa367a600 'XML-TTY' busy\r\nXML> ";
        let mut scanner = ResponseScanner::new(false);
        assert_eq!(scanner.scan(&data[..12]), None);
        assert_eq!(scanner.scan(data), Some(BUSY));
    }

    #[tokio::test]
    async fn test_lock_round_trip() {
        let channel = device().reply(answer(&ok_doc("<Lock/>")));
        let sent = channel.sent();
        let mut session = open_session(channel).await;

        let response = session.send_rpc(&RpcRequest::lock()).await.unwrap();
        assert_ok!(classify(&response, &RpcRequest::lock()));
        assert_eq!(
            sent.lines()[1],
            r#"<?xml version="1.0" encoding="UTF-8"?><Request MajorVersion="1" MinorVersion="0"><Lock/></Request>"#
        );
    }

    #[tokio::test]
    async fn test_response_split_across_reads_with_echo() {
        let request = RpcRequest::exec("show clock");
        let doc = cli_doc("Exec", "\n12:00:00.000 UTC Sun Oct 18 2026\n");
        let (head, tail) = doc.split_at(40);
        let channel = device().reply([
            format!("{}\r\n", request.to_wire()),
            String::new(),
            head.to_string(),
            String::new(),
            format!("{tail}\r\nXML> "),
        ]);
        let mut session = open_session(channel).await;

        let payload = session.execute(&request).await.unwrap();
        assert_eq!(payload, "12:00:00.000 UTC Sun Oct 18 2026\n");
    }

    #[tokio::test]
    async fn test_timeout_releases_agent() {
        let channel = device().reply_nothing();
        let mut session = open_session(channel).await;

        let started = std::time::Instant::now();
        let err = session.send_rpc(&RpcRequest::lock()).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() >= session.timeout());
        assert!(!session.is_xml_agent_acquired());

        assert_ok!(session.execute(&RpcRequest::lock()).await);
    }

    #[tokio::test]
    async fn test_malformed_xml_releases_agent() {
        let channel = device().reply([
            "ERROR: 0xa3679e00 'XML Service Library' detected the 'fatal' condition 'The XML document is not well-formed'\r\nXML> ",
        ]);
        let mut session = open_session(channel).await;

        let err = session.execute(&RpcRequest::raw("<Lock>")).await.unwrap_err();
        match err {
            Error::Protocol(ProtocolError::MalformedXml { request }) => {
                assert!(request.contains("<Lock>"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!session.is_xml_agent_acquired());
        assert_ok!(session.execute(&RpcRequest::lock()).await);
    }

    #[tokio::test]
    async fn test_application_error_releases_agent() {
        let channel = device().reply(answer(
            r#"<Response MajorVersion="1" MinorVersion="0" ErrorCount="1" ErrorMsg="bad syntax"/>"#,
        ));
        let mut session = open_session(channel).await;

        let err = session
            .execute(&RpcRequest::configuration("ntp beer 1.2.3.4"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::XmlCli(XmlCliError::InvalidInput { .. })));
        assert!(!session.is_xml_agent_acquired());
        assert_ok!(session.execute(&RpcRequest::unlock()).await);
    }

    #[tokio::test]
    async fn test_channel_closed_mid_response() {
        let channel = device().reply([Chunk::from("<Response MajorVersion=\"1\""), Chunk::Eof]);
        let mut session = open_session(channel).await;

        let err = session.send_rpc(&RpcRequest::lock()).await.unwrap_err();
        assert!(matches!(err, Error::Channel(crate::error::ChannelError::Closed)));
        assert!(!session.is_xml_agent_acquired());
    }

    #[tokio::test]
    async fn test_not_connected() {
        let mut session = session(device(), false);
        let err = session.send_rpc(&RpcRequest::lock()).await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::NotConnected)));
    }

    #[tokio::test]
    async fn test_stuck_agent_refuses_requests() {
        let mut session = open_session(device()).await;
        session.xml_agent_acquired = true;

        let err = session.send_rpc(&RpcRequest::lock()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connect(ConnectError::XmlAgentAlreadyAcquired)
        ));

        session.close().await.unwrap();
        assert!(!session.is_xml_agent_acquired());
    }

    #[tokio::test]
    async fn test_echoed_request_with_self_closing_error_root() {
        let request = RpcRequest::configuration("ntp beer 1.2.3.4");
        let channel = device().reply([
            echo(&request.to_wire()),
            Chunk::from(
                "<Response MajorVersion=\"1\" MinorVersion=\"0\" ErrorCount=\"1\" ErrorMsg=\"bad syntax\"/>\r\nXML> ",
            ),
        ]);
        let mut session = open_session(channel).await;

        let err = session.execute(&request).await.unwrap_err();
        assert!(matches!(err, Error::XmlCli(XmlCliError::InvalidInput { .. })));
        assert!(!session.is_xml_agent_acquired());
    }

    #[tokio::test]
    async fn test_late_reply_after_timeout_is_not_taken_for_the_next() {
        let show = RpcRequest::exec("show version");
        let channel = device().reply_nothing().reply([
            Chunk::from(format!("{}\r\nXML> ", ok_doc("<Lock/>"))),
            echo(&show.to_wire()),
            Chunk::from(format!(
                "{}\r\nXML> ",
                cli_doc("Exec", "\nCisco IOS XR Software, Version 7.3.2\n")
            )),
        ]);
        let mut session = open_session(channel).await;

        let err = session.send_rpc(&RpcRequest::lock()).await.unwrap_err();
        assert!(err.is_timeout());

        let output = session.execute(&show).await.unwrap();
        assert_eq!(output, "Cisco IOS XR Software, Version 7.3.2\n");
    }

    #[tokio::test]
    async fn test_success_after_timeout_accepts_unechoed_replies_again() {
        let lock = RpcRequest::lock();
        let channel = device()
            .reply_nothing()
            .reply([echo(&lock.to_wire())].into_iter().chain(answer(&ok_doc("<Lock/>"))))
            .reply(answer(&ok_doc("<Unlock/>")));
        let mut session = open_session(channel).await;

        assert!(session.send_rpc(&lock).await.unwrap_err().is_timeout());
        assert_ok!(session.execute(&lock).await);
        assert_ok!(session.execute(&RpcRequest::unlock()).await);
    }

    #[tokio::test]
    async fn test_make_rpc_call_returns_document() {
        let doc = ok_doc(r#"<Get><Operational><PlatformInventory/></Operational></Get>"#);
        let channel = device().reply(answer(&doc));
        let mut session = open_session(channel).await;

        let raw = session
            .make_rpc_call("<Get><Operational><PlatformInventory/></Operational></Get>")
            .await
            .unwrap();
        assert_eq!(raw, doc);
    }
}
