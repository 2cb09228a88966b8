//! Workspace migration plans.
//!
//! After a monitor comes back, its workspaces have to be moved onto it.
//! i3 can only move the *focused* workspace, so each move is two commands:
//! focus the workspace, then move it.  A window manager that can move a
//! workspace by name advertises [`MoveCapability::Named`] and gets a single
//! command per workspace instead.
//!
//! Focus commands pass `--no-auto-back-and-forth`, so focusing the workspace
//! that is already focused does not jump back to the previous one.

use crate::reconcile::Reconciliation;
use std::fmt;

/// How the window manager can relocate a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveCapability {
    /// Only the focused workspace can be moved (i3).
    #[default]
    FocusedOnly,
    /// Any workspace can be moved by name.
    Named,
}

/// One step of a migration plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationCommand {
    /// Focus the named workspace.
    Focus(String),
    /// Move the focused workspace to the named output.
    MoveFocusedTo(String),
    /// Move a workspace by name.  i3 has no such command, so the i3
    /// rendering is the equivalent focus-then-move pair.
    MoveNamed { workspace: String, output: String },
}

/// Quote a workspace or output name for the i3 command parser when it
/// contains characters that would otherwise split the command.
fn quote(name: &str) -> String {
    if name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ';' | ',' | '"' | '\''))
    {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_string()
    }
}

impl fmt::Display for MigrationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationCommand::Focus(ws) => {
                write!(f, "workspace --no-auto-back-and-forth {}", quote(ws))
            }
            MigrationCommand::MoveFocusedTo(output) => {
                write!(f, "move workspace to output {}", quote(output))
            }
            MigrationCommand::MoveNamed { workspace, output } => write!(
                f,
                "workspace --no-auto-back-and-forth {}; move workspace to output {}",
                quote(workspace),
                quote(output)
            ),
        }
    }
}

/// Join a plan into a single i3 command string.
pub fn render(commands: &[MigrationCommand]) -> String {
    commands
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Plan the moves that put every workspace on its reconciled output, then
/// give focus back to `focused`.
///
/// Workspaces still listed on a disconnected output go to the primary
/// connected output, or the first connected one when none is primary.
pub fn plan(
    reconciliation: &Reconciliation,
    focused: &str,
    capability: MoveCapability,
) -> Vec<MigrationCommand> {
    let connected = || {
        reconciliation
            .outputs
            .iter()
            .map(|r| &r.output)
            .filter(|o| o.is_connected())
    };
    let fallback = connected()
        .find(|o| o.primary)
        .or_else(|| connected().next())
        .map(|o| o.name.as_str());

    let mut commands = Vec::new();

    for r in &reconciliation.outputs {
        let output = &r.output;
        let target = if output.is_connected() {
            output.name.as_str()
        } else {
            match fallback {
                Some(name) if !output.workspaces.is_empty() => name,
                _ => continue,
            }
        };
        for ws in &output.workspaces {
            match capability {
                MoveCapability::FocusedOnly => {
                    commands.push(MigrationCommand::Focus(ws.clone()));
                    commands.push(MigrationCommand::MoveFocusedTo(target.to_string()));
                }
                MoveCapability::Named => commands.push(MigrationCommand::MoveNamed {
                    workspace: ws.clone(),
                    output: target.to_string(),
                }),
            }
        }
    }

    commands.push(MigrationCommand::Focus(focused.to_string()));
    commands
}
