//! Show-command dispatch.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use super::session::Session;
use crate::channel::Connector;
use crate::error::{DriverError, Result};
use crate::xml::RpcRequest;

/// Marks the start of configuration text inside show output.
const CONFIGURATION_BLOCK: &str = "!! IOS XR Configuration";

/// CLI mode a show command runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowContext {
    /// `<CLI><Exec>`
    #[default]
    Exec,
    /// `<CLI><Configuration>`, for `show configuration ...` and friends.
    Configuration,
}

/// A show command as a token sequence plus the context to run it in.
///
/// ```
/// use iosxr::{ShowCommand, ShowContext};
///
/// let cmd = ShowCommand::parse("show_interfaces_brief");
/// assert_eq!(cmd.command_line(), "show interfaces brief");
///
/// let cmd = ShowCommand::parse("show_configuration_commit_list").arg("5").configuration();
/// assert_eq!(cmd.command_line(), "show configuration commit list 5");
/// assert_eq!(cmd.context(), ShowContext::Configuration);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowCommand {
    tokens: Vec<String>,
    #[serde(default)]
    context: ShowContext,
}

impl ShowCommand {
    /// A command from explicit tokens, in exec context.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            context: ShowContext::Exec,
        }
    }

    /// A command from a name whose words are joined by `_` or whitespace.
    pub fn parse(name: &str) -> Self {
        Self::new(
            name.split(|c: char| c == '_' || c.is_whitespace())
                .filter(|t| !t.is_empty()),
        )
    }

    /// Append an argument, taken verbatim.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.tokens.push(arg.into());
        self
    }

    /// Run in configuration context.
    pub fn configuration(mut self) -> Self {
        self.context = ShowContext::Configuration;
        self
    }

    pub fn context(&self) -> ShowContext {
        self.context
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The command as typed at the CLI.
    pub fn command_line(&self) -> String {
        self.tokens.join(" ")
    }

    /// Whether this names a show command at all.
    pub fn is_show(&self) -> bool {
        self.tokens.first().is_some_and(|t| t == "show")
    }

    fn request(&self) -> RpcRequest {
        let line = self.command_line();
        match self.context {
            ShowContext::Exec => RpcRequest::exec(&line),
            ShowContext::Configuration => RpcRequest::configuration(&line),
        }
    }
}

impl fmt::Display for ShowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

impl<K: Connector> Session<K> {
    /// Run a show command and return its output.
    ///
    /// Anything that is not a show command is refused without contacting
    /// the device. When the output embeds a configuration block, only that
    /// block is returned.
    pub async fn show(&mut self, command: &ShowCommand) -> Result<String> {
        if !command.is_show() {
            return Err(DriverError::CommandNotFound {
                name: command.command_line(),
            }
            .into());
        }

        debug!("{:?} show: {}", command.context(), command);
        let output = self.execute(&command.request()).await?;

        Ok(match output.find(CONFIGURATION_BLOCK) {
            Some(start) => output[start..].to_string(),
            None => output,
        })
    }
}
