//! End-to-end conversion: input resolution, rasterization, image resolution and transcode.

/// Conversion entry points.
pub mod pipeline;
