//! [`WindowManager`] implementation backed by `i3-msg`.

use crate::migration::{self, MigrationCommand};
use crate::output::Workspace;
use crate::process::{self, ProcessError};
use crate::traits::{ToolError, WindowManager};
use log::info;
use serde::Deserialize;

/// i3-backed window manager.
///
/// Every call spawns a short-lived `i3-msg` process.  i3 can only move the
/// focused workspace, so the default
/// [`MoveCapability::FocusedOnly`](crate::migration::MoveCapability) is kept.
pub struct I3 {
    program: String,
}

/// Errors that can occur when talking to i3.
#[derive(Debug, thiserror::Error)]
pub enum I3Error {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("unexpected i3 reply: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i3 rejected command: {0}")]
    Rejected(String),
}

impl ToolError for I3Error {
    fn exit_code(&self) -> Option<i32> {
        match self {
            I3Error::Process(e) => e.exit_code(),
            _ => None,
        }
    }
}

/// One element of the reply to `i3-msg <command>`.
#[derive(Deserialize)]
struct CommandReply {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Check the reply to a command sequence; i3 answers with one entry per
/// command.
fn check_reply(json: &str) -> Result<(), I3Error> {
    let replies: Vec<CommandReply> = serde_json::from_str(json)?;
    match replies.into_iter().find(|r| !r.success) {
        Some(failed) => Err(I3Error::Rejected(
            failed.error.unwrap_or_else(|| "unknown error".to_string()),
        )),
        None => Ok(()),
    }
}

impl I3 {
    /// Create a handle that runs `program` (normally `"i3-msg"`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl WindowManager for I3 {
    type Error = I3Error;

    fn workspaces(&self) -> Result<Vec<Workspace>, Self::Error> {
        let json = process::run(&self.program, ["-t", "get_workspaces"])?;
        Ok(serde_json::from_str(&json)?)
    }

    fn run_commands(&self, commands: &[MigrationCommand]) -> Result<(), Self::Error> {
        let script = migration::render(commands);
        info!("{} {:?}", self.program, script);
        let reply = process::run(&self.program, [script.as_str()])?;
        check_reply(&reply)
    }
}
