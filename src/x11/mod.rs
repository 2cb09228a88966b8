//! X11 backends.
//!
//! [`xrandr`] drives the display configuration through the `xrandr` tool;
//! [`edid`] reads monitor EDID data from sysfs.
//!
//! Nothing outside this module should reference xrandr or sysfs directly.

pub mod edid;
pub mod xrandr;
