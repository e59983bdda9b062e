//! Image reference resolution: fetch what the rasterizer could not load itself.

/// Concurrent fetch of remote `<image>` references.
pub mod images;
