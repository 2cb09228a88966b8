//! Core traits that decouple screenkeep from the concrete tools it drives.
//!
//! Every backend (xrandr, sysfs, i3-msg, a test harness, …) implements one
//! of these traits.  The [`ReconciliationPass`](crate::pass::ReconciliationPass)
//! only depends on these abstractions.
//!
//! The three query methods run concurrently on scoped threads, hence the
//! `Sync` bounds.

use crate::layout::OutputClause;
use crate::migration::{MigrationCommand, MoveCapability};
use crate::output::Workspace;
use crate::process::ProcessError;

/// An error produced by an external tool.
///
/// Tools that exit with a status report it here so the binary can exit
/// with the same code.
pub trait ToolError: std::error::Error + Send + 'static {
    fn exit_code(&self) -> Option<i32> {
        None
    }
}

impl ToolError for ProcessError {
    fn exit_code(&self) -> Option<i32> {
        ProcessError::exit_code(self)
    }
}

/// Abstraction over the display-configuration tool.
pub trait DisplayServer: Sync {
    /// The error type produced by this backend.
    type Error: ToolError;

    /// Return the raw connector report (xrandr `--query` format).
    ///
    /// Parsing happens in [`topology`](crate::topology) so that malformed
    /// output is reported as a parse failure rather than a query failure.
    fn query_topology(&self) -> Result<String, Self::Error>;

    /// Apply all clauses in a single invocation.
    ///
    /// The tool may reject an infeasible layout; that rejection is
    /// returned as-is.
    fn apply_layout(&self, clauses: &[OutputClause]) -> Result<(), Self::Error>;
}

/// Source of raw EDID blobs.
pub trait IdentitySource: Sync {
    /// The error type produced by this source.
    type Error: ToolError;

    /// Return `(output_name, edid_bytes)` for every connector that exposes
    /// EDID data.  Blobs may be empty or short; the caller decides what is
    /// usable.
    fn edid_blobs(&self) -> Result<Vec<(String, Vec<u8>)>, Self::Error>;
}

/// Abstraction over a window manager that can relocate workspaces.
pub trait WindowManager: Sync {
    /// The error type produced by this window manager.
    type Error: ToolError;

    /// Return every workspace with its output and focus flag.
    fn workspaces(&self) -> Result<Vec<Workspace>, Self::Error>;

    /// How workspaces can be moved.  Defaults to the i3 behaviour where
    /// only the focused workspace can be moved.
    fn move_capability(&self) -> MoveCapability {
        MoveCapability::FocusedOnly
    }

    /// Execute a migration plan as one command sequence.
    fn run_commands(&self, commands: &[MigrationCommand]) -> Result<(), Self::Error>;
}
