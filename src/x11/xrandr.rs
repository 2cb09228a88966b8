//! [`DisplayServer`] implementation backed by the `xrandr` tool.

use crate::layout::OutputClause;
use crate::process::{self, ProcessError};
use crate::traits::DisplayServer;
use log::info;

/// xrandr-backed display server.
///
/// Every call spawns a short-lived `xrandr` process.
pub struct Xrandr {
    program: String,
}

impl Xrandr {
    /// Create a handle that runs `program` (normally `"xrandr"`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full argument list for applying `clauses`.
    pub fn layout_args(clauses: &[OutputClause]) -> Vec<String> {
        clauses.iter().flat_map(OutputClause::to_args).collect()
    }
}

impl DisplayServer for Xrandr {
    type Error = ProcessError;

    fn query_topology(&self) -> Result<String, Self::Error> {
        process::run(&self.program, ["--query"])
    }

    fn apply_layout(&self, clauses: &[OutputClause]) -> Result<(), Self::Error> {
        let args = Self::layout_args(clauses);
        info!("{} {}", self.program, args.join(" "));
        process::run(&self.program, &args).map(|_| ())
    }
}
