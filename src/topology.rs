//! Parser for the `xrandr --query` report.
//!
//! The report has one header line per connector followed by indented mode
//! lines:
//!
//! ```text
//! Screen 0: minimum 8 x 8, current 5360 x 1440, maximum 32767 x 32767
//! DP-2 connected primary 3440x1440+1920+0 (normal left inverted right x axis y axis) 800mm x 335mm
//!    3440x1440     59.97*+  49.99
//! HDMI-1 connected (normal left inverted right x axis y axis)
//!    1920x1080     60.00 +  50.00
//! DP-1 disconnected (normal left inverted right x axis y axis)
//! ```
//!
//! Everything from the first `(` of a header is ignored.  A `WxH+L+T` token
//! means the output is driving a mode; a connected output without one takes
//! its size from the first (preferred) mode line.

use crate::output::{ConnectionStatus, Geometry, Position};

/// One connector as reported by xrandr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputReport {
    pub name: String,
    pub connection: ConnectionStatus,
    pub active: bool,
    pub geometry: Option<Geometry>,
    pub primary: bool,
    pub rotation: Option<String>,
}

/// Error from parsing the topology report.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed header line: {0:?}")]
    Header(String),
    #[error("output {output}: unknown connection status {status:?}")]
    Status { output: String, status: String },
    #[error("output {output}: malformed geometry {token:?}")]
    Geometry { output: String, token: String },
    #[error("output {output}: malformed mode {token:?}")]
    Mode { output: String, token: String },
}

/// Rotation names xrandr accepts for `--rotate`.
const ROTATIONS: [&str; 4] = ["normal", "left", "right", "inverted"];

/// Parse a complete `xrandr --query` report.
///
/// A malformed geometry or mode token fails the whole parse; no partial
/// record is produced.
pub fn parse_report(report: &str) -> Result<Vec<OutputReport>, ParseError> {
    let lines: Vec<&str> = report.lines().collect();
    let mut outputs = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() || is_mode_line(line) || line.starts_with("Screen ") {
            continue;
        }
        let next_mode = lines.get(i + 1).copied().filter(|l| is_mode_line(l));
        outputs.push(parse_output(line, next_mode)?);
    }

    Ok(outputs)
}

fn is_mode_line(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

/// Parse a single header line.  `mode_line` is the indented line directly
/// below it, if any.
pub fn parse_output(header: &str, mode_line: Option<&str>) -> Result<OutputReport, ParseError> {
    let head = header.split('(').next().unwrap_or_default();
    let mut tokens = head.split_whitespace().peekable();

    let name = tokens
        .next()
        .ok_or_else(|| ParseError::Header(header.to_string()))?
        .to_string();
    let status = tokens
        .next()
        .ok_or_else(|| ParseError::Header(header.to_string()))?;

    let connection = match status {
        "connected" => ConnectionStatus::Connected,
        "disconnected" => ConnectionStatus::Disconnected,
        "unknown" => {
            // `VIRTUAL1 unknown connection ...`
            tokens.next_if_eq(&"connection");
            ConnectionStatus::Disconnected
        }
        other => {
            return Err(ParseError::Status {
                output: name,
                status: other.to_string(),
            })
        }
    };

    let primary = tokens.next_if_eq(&"primary").is_some();

    let mut report = OutputReport {
        name,
        connection,
        active: false,
        geometry: None,
        primary,
        rotation: None,
    };

    if let Some(token) = tokens.next() {
        let geometry = parse_geometry(token).ok_or_else(|| ParseError::Geometry {
            output: report.name.clone(),
            token: token.to_string(),
        })?;
        report.geometry = Some(geometry);
        report.active = true;
        // Reflection (`X axis`, `Y axis`) may follow in place of a rotation.
        report.rotation = tokens
            .next()
            .filter(|t| ROTATIONS.contains(t))
            .map(str::to_string);
    } else if connection == ConnectionStatus::Connected {
        if let Some(token) = mode_line.and_then(|l| l.split_whitespace().next()) {
            let (width, height) = parse_size(token).ok_or_else(|| ParseError::Mode {
                output: report.name.clone(),
                token: token.to_string(),
            })?;
            report.geometry = Some(Geometry {
                width,
                height,
                position: None,
            });
        }
    }

    Ok(report)
}

/// `3440x1440+1920+0` → geometry with position.
fn parse_geometry(token: &str) -> Option<Geometry> {
    let mut parts = token.split('+');
    let (width, height) = parse_size(parts.next()?)?;
    let left = parse_offset(parts.next()?)?;
    let top = parse_offset(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(Geometry {
        width,
        height,
        position: Some(Position { left, top }),
    })
}

/// `1920x1080` → `(1920, 1080)`.
fn parse_size(token: &str) -> Option<(u32, u32)> {
    let (w, h) = token.split_once('x')?;
    Some((parse_unsigned(w)?, parse_unsigned(h)?))
}

fn parse_offset(s: &str) -> Option<i32> {
    parse_unsigned(s).and_then(|n| i32::try_from(n).ok())
}

/// Digits only: `str::parse` would also accept a leading `+`.
fn parse_unsigned(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
