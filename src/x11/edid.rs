//! [`IdentitySource`] reading EDID blobs from sysfs.
//!
//! The kernel exposes one directory per DRM connector under
//! `/sys/class/drm` (`card0-HDMI-A-1`, `card0-DP-2`, …), each with an
//! `edid` file that is empty when nothing is attached.

use crate::identity::connector_name;
use crate::traits::{IdentitySource, ToolError};
use log::debug;
use std::path::{Path, PathBuf};

/// Reads `<root>/*/edid`.
pub struct SysfsEdid {
    root: PathBuf,
}

/// Error listing the connector directory.
#[derive(Debug, thiserror::Error)]
#[error("failed to list {path}: {source}")]
pub struct SysfsEdidError {
    path: String,
    source: std::io::Error,
}

impl ToolError for SysfsEdidError {}

impl SysfsEdid {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl IdentitySource for SysfsEdid {
    type Error = SysfsEdidError;

    fn edid_blobs(&self) -> Result<Vec<(String, Vec<u8>)>, Self::Error> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| SysfsEdidError {
            path: self.root.display().to_string(),
            source,
        })?;

        let mut blobs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path().join("edid");
            if !path.is_file() {
                continue;
            }
            let Some(name) = connector_name(&path.to_string_lossy()) else {
                debug!("skipping {}: unrecognised connector name", path.display());
                continue;
            };
            match std::fs::read(&path) {
                Ok(bytes) => blobs.push((name, bytes)),
                Err(e) => debug!("skipping {}: {}", path.display(), e),
            }
        }
        blobs.sort();
        Ok(blobs)
    }
}
