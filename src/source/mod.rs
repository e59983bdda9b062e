//! Input resolution: classify what the caller handed in and load the SVG bytes.

/// Pluggable URL fetching.
pub mod fetch;
/// Input classification and loading.
pub mod resolve;
