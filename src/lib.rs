//! Convert SVG into PNG or JPEG bytes.
//!
//! The input may be raw markup, a base64 `data:image/svg+xml` URI, an `http(s)` URL or a file
//! path. Remote `<image>` references inside the document are fetched in parallel before
//! rendering; a reference that fails to load is skipped and the rest of the image still renders.
//!
//! ```no_run
//! let png = svg2img::convert_default(r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"/>"#)?;
//! let jpeg = svg2img::convert("logo.svg", &svg2img::ConvertOptions::jpeg(90))?;
//! # let _ = (png, jpeg);
//! # Ok::<(), svg2img::Svg2ImgError>(())
//! ```
#![forbid(unsafe_code)]

mod foundation;

pub mod config;
pub mod convert;
pub mod encode;
pub mod render;
pub mod resolve;
pub mod source;

pub use config::options::{
    ConvertOptions, CropRect, FitTo, FontOptions, ImageRendering, OutputFormat, RasterOptions,
    ShapeRendering, TextRendering,
};
pub use convert::pipeline::{
    convert, convert_async, convert_async_with_fetcher, convert_default, convert_with_callback,
    convert_with_fetcher, render_svg_to_png,
};
pub use encode::jpeg::transcode_png_to_jpeg;
pub use foundation::color::Rgba8;
pub use foundation::error::{Svg2ImgError, Svg2ImgResult};
pub use render::raster::{MAX_DIM, Rasterizer, RenderedImage, SubstituteFormat};
pub use resolve::images::{DEFAULT_FETCH_THREADS, MAX_NESTING_DEPTH, ResolveReport, resolve_images};
pub use source::fetch::{DEFAULT_USER_AGENT, FetchedResource, HttpFetcher, ResourceFetcher};
pub use source::resolve::{
    SVG_BASE64_PREFIX, SvgContent, SvgData, SvgInput, SvgSource, classify, decode_base64_svg,
    resolve_source,
};
