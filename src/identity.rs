//! Stable monitor identity from EDID data.
//!
//! Connector names (`HDMI-1`, `DP-2`, …) are assigned by the driver and can
//! change between reboots or when a monitor moves to another port.  The
//! EDID blob, on the other hand, describes the monitor itself.  An identity
//! is built from two regions of it:
//!
//! * bytes `8..18`: manufacturer id, product code, serial number and date,
//!   base64 encoded without the trailing padding;
//! * bytes `54..126`: the four 18-byte descriptor blocks, reduced to their
//!   ASCII letters and digits so the monitor name and serial string show up
//!   in the key.
//!
//! Two distinct monitors could in theory produce the same identity; that
//! case is not detected.

use base64::{engine::general_purpose, Engine as _};

/// Minimum EDID length needed to build an identity.
pub const MIN_EDID_LEN: usize = 126;

const VENDOR_RANGE: std::ops::Range<usize> = 8..18;
const DESCRIPTOR_RANGE: std::ops::Range<usize> = 54..126;

/// Build the identity for an EDID blob.
///
/// Returns `None` when the blob is shorter than [`MIN_EDID_LEN`]; sysfs
/// exposes an empty `edid` file for connectors with nothing attached.
pub fn edid_identity(edid: &[u8]) -> Option<String> {
    if edid.len() < MIN_EDID_LEN {
        return None;
    }

    // Ten bytes always encode to 16 characters ending in `==`.
    let mut vendor = general_purpose::STANDARD.encode(&edid[VENDOR_RANGE]);
    vendor.truncate(vendor.len() - 2);

    let descriptors: String = edid[DESCRIPTOR_RANGE]
        .iter()
        .map(|b| (b & 0x7f) as char)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    Some(vendor + &descriptors)
}

/// Derive the xrandr output name from a sysfs EDID path.
///
/// `/sys/class/drm/card0-HDMI-A-1/edid` → `HDMI-1`.  The DRM connector
/// directory is `card<N>-<kind>[-<sub>]-<index>`; xrandr names the same
/// connector `<kind>-<index>`.
pub fn connector_name(edid_path: &str) -> Option<String> {
    let mut segments = edid_path.trim_end_matches('/').rsplit('/');
    segments.next()?;
    let connector = segments.next()?;

    let (_card, rest) = connector.split_once('-')?;
    let kind: String = rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let index_len = rest
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if kind.is_empty() || index_len == 0 || kind.len() + index_len > rest.len() {
        return None;
    }
    let index = &rest[rest.len() - index_len..];
    Some(format!("{}-{}", kind, index))
}
