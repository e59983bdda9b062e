//! Conversion options and the rasterizer sub-configuration.
//!
//! Options are plain serde structs so they can be loaded from JSON (keys follow the camelCase
//! spelling used by the resvg JS binding, with the rasterizer block under `resvg`).

/// Option types and JSON loading.
pub mod options;
