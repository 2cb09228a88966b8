//! i3-specific implementations.
//!
//! This module provides the concrete backend for the
//! [`WindowManager`](crate::traits::WindowManager) trait, powered by the
//! `i3-msg` tool.
//!
//! Nothing outside this module should reference i3 directly.

pub mod wm;
