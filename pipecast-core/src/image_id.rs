//! Parsing of image identifiers of the form `pipe<N>/<suffix>`.
//!
//! The suffix only exists so consumers that cache by identifier fetch a
//! fresh image; it is ignored here.

/// Extract the pipe id from an image identifier.
pub fn parse_image_id(id: &str) -> Option<u32> {
    let head = id.split('/').next()?;
    head.strip_prefix("pipe")?.parse().ok()
}
