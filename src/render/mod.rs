//! Rasterization: the `usvg`/`resvg` wrapper that parses SVG, reports remote image references,
//! accepts substitutes for them and renders to premultiplied RGBA8.

pub(crate) mod fonts;
/// Rasterizer and rendered image.
pub mod raster;
