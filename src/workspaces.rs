//! Output → workspace assignments as reported by the window manager.
//!
//! The [`WorkspaceIndex`] keeps the window manager's order: workspaces are
//! listed per output in the order they appeared in the source list.

use crate::output::Workspace;
use log::warn;
use std::collections::HashMap;

/// Errors raised by the workspace index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("no focused workspace")]
    NoFocusedWorkspace,
}

/// Read-only view over the window manager's workspaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceIndex {
    /// All workspaces, in source order.
    workspaces: Vec<Workspace>,
    /// `output_name -> [workspace_name]`, in source order.
    by_output: HashMap<String, Vec<String>>,
    focused: Option<String>,
}

impl WorkspaceIndex {
    /// Build an index from a workspace list.
    pub fn new(workspaces: Vec<Workspace>) -> Self {
        let mut by_output: HashMap<String, Vec<String>> = HashMap::new();
        let mut focused: Option<String> = None;

        for ws in &workspaces {
            by_output
                .entry(ws.output.clone())
                .or_default()
                .push(ws.name.clone());
            if ws.focused {
                match &focused {
                    None => focused = Some(ws.name.clone()),
                    Some(first) => warn!(
                        "workspace {} also reported focused, keeping {}",
                        ws.name, first
                    ),
                }
            }
        }

        Self {
            workspaces,
            by_output,
            focused,
        }
    }

    /// Workspace names on `output`, in source order.
    pub fn workspaces_on(&self, output: &str) -> &[String] {
        self.by_output
            .get(output)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Name of the output currently holding `workspace`.
    pub fn output_of(&self, workspace: &str) -> Option<&str> {
        self.workspaces
            .iter()
            .find(|ws| ws.name == workspace)
            .map(|ws| ws.output.as_str())
    }

    pub fn contains(&self, workspace: &str) -> bool {
        self.output_of(workspace).is_some()
    }

    /// Every workspace name, in source order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.workspaces.iter().map(|ws| ws.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }

    /// The focused workspace.
    ///
    /// The migration step needs it to restore focus; its absence is an
    /// error.
    pub fn focused(&self) -> Result<&str, IndexError> {
        self.focused.as_deref().ok_or(IndexError::NoFocusedWorkspace)
    }
}
