//! Patterns recognised in the interactive stream.
//!
//! Login prompts are matched with regexes against the buffer tail. Device
//! markers are literal strings that may show up anywhere in the output.

use regex::bytes::Regex;

/// Device marker printed when the request document is not well-formed.
pub const MALFORMED_XML_MARKER: &str = "ERROR: 0xa3679e00";

/// Device marker printed by `xml` when the TTY agent is not running.
pub const AGENT_NOT_STARTED_MARKER: &str = "ERROR: 0x24319600";

/// Device marker printed when another request holds the agent.
pub const AGENT_BUSY_MARKER: &str = "ERROR: 0xa367a600";

/// Commit error code meaning the candidate holds no changes.
pub const NO_CHANGES_ERROR_CODE: &str = "0x41866c00";

/// Text the CLI prints when a configuration line is rejected.
pub const INVALID_INPUT_MARKER: &str = "Invalid input detected";

/// Start of the response root element.
pub const RESPONSE_START: &str = "<Response";

/// Closing tag of a complete response.
pub const RESPONSE_END: &str = "</Response>";

/// Closing tag of the request, as echoed back by the terminal.
pub const REQUEST_END: &str = "</Request>";

/// Compiled prompt patterns used during login and XML agent entry.
#[derive(Debug, Clone)]
pub struct SessionPatterns {
    /// SSH host key confirmation, `(yes/no)?`.
    pub host_key: Regex,

    /// Password prompt.
    pub password: Regex,

    /// Exec-mode CLI prompt, e.g. `RP/0/RSP0/CPU0:router#`.
    pub cli_prompt: Regex,

    /// XML agent prompt.
    pub xml_prompt: Regex,

    /// Authentication rejected by the device.
    pub denied: Regex,
}

impl SessionPatterns {
    /// Compile the default pattern set.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            host_key: Regex::new(r"(?i)\(yes/no(/\[fingerprint\])?\)\?\s*$")?,
            password: Regex::new(r"(?i)password:\s*$")?,
            cli_prompt: Regex::new(r"(?m)^[\w\-/:.@()]+#\s?$")?,
            xml_prompt: Regex::new(r"XML>\s?$")?,
            denied: Regex::new(r"(?i)(permission denied|authentication failed|access denied)")?,
        })
    }
}
