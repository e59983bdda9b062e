//! Output transcoding.

/// PNG → JPEG transcode.
pub mod jpeg;
