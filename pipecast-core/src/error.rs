//! Domain-specific error types for pipecast.
//!
//! Transport and framing failures surface as [`PipecastError`].
//! Colour conversion has its own [`ConvertError`] because a failed
//! conversion is recovered locally and never ends a session.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the pipecast stream client.
#[derive(Debug, Error)]
pub enum PipecastError {
    // ── Framing Errors ───────────────────────────────────────────
    /// A header declared a body larger than the configured cap.
    #[error("frame body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// A buffer was too short to hold a complete header.
    #[error("header too short: {actual} bytes (need {expected})")]
    ShortHeader { expected: usize, actual: usize },

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The server address could not be resolved.
    #[error("host not found: {0}")]
    HostNotFound(String),
}

impl PipecastError {
    /// Short, user-facing reason used in status messages.
    pub fn status_reason(&self) -> String {
        match self {
            PipecastError::HostNotFound(_) => "Host not found".into(),
            PipecastError::Connection(e) => match e.kind() {
                std::io::ErrorKind::ConnectionRefused => "Connection refused".into(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::UnexpectedEof => {
                    "Remote host closed connection".into()
                }
                _ => e.to_string(),
            },
            other => other.to_string(),
        }
    }
}

// ── ConvertError ─────────────────────────────────────────────────

/// Reasons an NV12 buffer could not be turned into an RGB image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// Width or height is zero.
    #[error("invalid dimensions: {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    /// NV12 chroma is subsampled 2x2, so both dimensions must be even.
    #[error("odd dimensions not supported by NV12: {width}x{height}")]
    OddDimension { width: u32, height: u32 },

    /// `width * height * 3 / 2` does not fit in memory.
    #[error("frame size overflows: {width}x{height}")]
    SizeOverflow { width: u32, height: u32 },

    /// The buffer holds fewer bytes than the frame needs.
    #[error("NV12 data size insufficient: got {actual}, needed {expected}")]
    Truncated { expected: usize, actual: usize },
}
