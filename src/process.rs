//! Running external tools.
//!
//! xrandr and i3-msg are driven as plain subprocesses.  A tool that cannot
//! be started, exits non-zero or prints non-UTF-8 output yields a
//! [`ProcessError`] carrying the exit code when there is one, so the binary
//! can exit with the same code.

use log::debug;
use std::process::Command;

/// Error from running an external tool.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {}: {detail}", describe_status(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        detail: String,
    },
    #[error("{program} printed invalid UTF-8")]
    Utf8 { program: String },
}

fn describe_status(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "a signal".to_string(),
    }
}

impl ProcessError {
    /// Exit code reported by the tool, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

/// Run `program` with `args` and return its standard output.
pub fn run<I, S>(program: &str, args: I) -> Result<String, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);
    debug!("running {:?}", cmd);

    let output = cmd.output().map_err(|source| ProcessError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(ProcessError::Failed {
            program: program.to_string(),
            code: output.status.code(),
            detail,
        });
    }

    String::from_utf8(output.stdout).map_err(|_| ProcessError::Utf8 {
        program: program.to_string(),
    })
}
