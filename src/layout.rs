//! xrandr layout instructions.
//!
//! [`LayoutInstruction`] is the per-output part of an xrandr command line
//! (`--primary --rotate left --mode 1920x1080 --pos 0x0`).  Its string form
//! is what the identity store persists as a record's `args`.
//!
//! Nothing here checks that a layout is physically possible; xrandr rejects
//! what it cannot apply.

use crate::output::{Output, Position, Transition};
use crate::reconcile::Reconciliation;
use crate::store::IdentityStore;
use std::fmt;

/// Mode, placement and flags for one output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutInstruction {
    pub primary: bool,
    pub rotation: Option<String>,
    /// `(width, height)`.
    pub mode: Option<(u32, u32)>,
    pub position: Option<Position>,
}

impl LayoutInstruction {
    /// Build the instruction that reproduces `output`'s current state.
    ///
    /// The mode is included when either dimension is nonzero; the position
    /// only when it is known, i.e. the output is driving a mode.
    pub fn for_output(output: &Output) -> Self {
        let geometry = output.geometry.as_ref();
        Self {
            primary: output.primary,
            rotation: output.rotation.clone().filter(|r| !r.is_empty()),
            mode: geometry
                .filter(|g| g.width != 0 || g.height != 0)
                .map(|g| (g.width, g.height)),
            position: geometry.and_then(|g| g.position),
        }
    }

    /// The instruction as separate command-line arguments.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.primary {
            args.push("--primary".to_string());
        }
        if let Some(rotation) = &self.rotation {
            args.push("--rotate".to_string());
            args.push(rotation.clone());
        }
        if let Some((width, height)) = self.mode {
            args.push("--mode".to_string());
            args.push(format!("{}x{}", width, height));
        }
        if let Some(Position { left, top }) = self.position {
            args.push("--pos".to_string());
            args.push(format!("{}x{}", left, top));
        }
        args
    }
}

impl fmt::Display for LayoutInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_args().join(" "))
    }
}

/// What to do with one output in the applied layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputClause {
    /// `--output <name> <args>`.  `args` is a serialized instruction, either
    /// freshly generated or restored from the store.
    Configure { output: String, args: String },
    /// `--output <name> --off`.
    Off { output: String },
}

impl OutputClause {
    /// Command-line arguments for this clause.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            OutputClause::Configure { output, args } => {
                let mut v = vec!["--output".to_string(), output.clone()];
                v.extend(args.split_whitespace().map(str::to_string));
                v
            }
            OutputClause::Off { output } => {
                vec!["--output".to_string(), output.clone(), "--off".to_string()]
            }
        }
    }
}

impl fmt::Display for OutputClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_args().join(" "))
    }
}

/// Build the full layout: one clause per reconciled output, in report
/// order.
///
/// A plugged output whose identity has a saved record gets the saved
/// `args`, which is how a re-attached monitor returns to its old mode and
/// position.  Every other connected output keeps its current state;
/// disconnected outputs are switched off.
pub fn layout_plan(reconciliation: &Reconciliation, store: &IdentityStore) -> Vec<OutputClause> {
    reconciliation
        .outputs
        .iter()
        .map(|r| {
            let output = &r.output;
            if !output.is_connected() {
                return OutputClause::Off {
                    output: output.name.clone(),
                };
            }
            let saved = match r.transition {
                Transition::Plugged if !output.identity.is_empty() => store
                    .record(&output.identity)
                    .and_then(|record| record.args)
                    .filter(|args| !args.trim().is_empty()),
                _ => None,
            };
            OutputClause::Configure {
                output: output.name.clone(),
                args: saved.unwrap_or_else(|| LayoutInstruction::for_output(output).to_string()),
            }
        })
        .collect()
}
