//! **screenkeep** — remembers where your monitors and workspaces were.
//!
//! Each run is one reconciliation pass.  It reads the connector report from
//! xrandr, the EDID blobs from sysfs and the workspace list from i3, then
//! decides what changed since the last run:
//!
//! * a monitor that was **plugged** gets its saved mode, position and
//!   workspaces back;
//! * a monitor that was **unplugged** has its layout saved before it is
//!   switched off;
//! * when nothing changed, the current state is saved.
//!
//! Monitors are recognised by an identity derived from their EDID
//! ([`identity`]), not by connector name, so a monitor moved to another
//! port is still recognised.
//!
//! # Architecture
//!
//! The decision logic ([`topology`], [`reconcile`], [`layout`],
//! [`migration`], [`store`]) is pure.  The tools it drives sit behind the
//! traits in [`traits`]:
//!
//! * [`traits::DisplayServer`] — query and apply the output layout.
//! * [`traits::IdentitySource`] — raw EDID blobs.
//! * [`traits::WindowManager`] — list and move workspaces.
//!
//! Concrete implementations live in [`x11`] (xrandr, sysfs) and [`i3`]
//! (i3-msg).  [`pass::ReconciliationPass`] ties them together.

pub mod config;
pub mod i3;
pub mod identity;
pub mod layout;
pub mod migration;
pub mod output;
pub mod pass;
pub mod process;
pub mod reconcile;
pub mod store;
pub mod topology;
pub mod traits;
pub mod workspaces;
pub mod x11;
