//! Types used throughout screenkeep.
//!
//! This module defines the vocabulary that all components share:
//! [`Output`] describes one display connector after identity and workspace
//! resolution, [`Geometry`] / [`Position`] its mode and placement, and
//! [`Transition`] how it changed relative to persisted state.

use serde::Deserialize;
use std::fmt;

/// Whether a monitor is physically attached to a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Top-left corner of an output on the virtual screen (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub left: i32,
    pub top: i32,
}

/// Mode and placement of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// Horizontal resolution in pixels.
    pub width: u32,
    /// Vertical resolution in pixels.
    pub height: u32,
    /// Only known when the output is driving a mode.  Outputs that are
    /// connected but inactive report their preferred mode without a
    /// position.
    pub position: Option<Position>,
}

/// How an output changed relative to the previous run.
///
/// Derived on every pass by the
/// [`reconcile`](crate::reconcile::reconcile) engine and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Unchanged,
    /// Connected, but no mode applied yet: a monitor that was just attached.
    Plugged,
    /// Disconnected while still holding a mode: a monitor that just went away.
    Unplugged,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Unchanged => write!(f, "unchanged"),
            Transition::Plugged => write!(f, "plugged"),
            Transition::Unplugged => write!(f, "unplugged"),
        }
    }
}

/// One display connector, connected or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Connector label, e.g. `"HDMI-1"`.  Unique within a run.
    pub name: String,
    /// Stable key derived from the monitor's EDID, empty when unknown.
    pub identity: String,
    pub connection: ConnectionStatus,
    /// Whether a mode is currently applied.
    pub active: bool,
    pub geometry: Option<Geometry>,
    pub primary: bool,
    pub rotation: Option<String>,
    /// Workspace names assigned to this output, in window-manager order.
    pub workspaces: Vec<String>,
}

impl Output {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionStatus::Connected
    }

    /// Classify the output from its connection and activity flags.
    pub fn transition(&self) -> Transition {
        match (self.connection, self.active) {
            (ConnectionStatus::Connected, false) => Transition::Plugged,
            (ConnectionStatus::Disconnected, true) => Transition::Unplugged,
            _ => Transition::Unchanged,
        }
    }
}

/// A workspace as reported by the window manager.
///
/// Only the fields screenkeep needs are deserialized; i3 sends many more.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Workspace {
    pub name: String,
    /// Name of the output currently showing this workspace.
    pub output: String,
    #[serde(default)]
    pub focused: bool,
}
