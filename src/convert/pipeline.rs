use std::sync::Arc;

use crate::{
    config::options::{ConvertOptions, RasterOptions},
    encode::jpeg::transcode_png_to_jpeg,
    foundation::error::{Svg2ImgError, Svg2ImgResult},
    render::raster::Rasterizer,
    resolve::images::{ResolveContext, resolve_images_with},
    source::{
        fetch::{HttpFetcher, ResourceFetcher},
        resolve::{SvgInput, classify, resolve_source},
    },
};

/// Convert `source` to PNG or JPEG bytes, fetching URLs with a default [`HttpFetcher`].
///
/// Blocking; from async code use [`convert_async`].
pub fn convert(source: impl Into<SvgInput>, options: &ConvertOptions) -> Svg2ImgResult<Vec<u8>> {
    convert_with_fetcher(source, options, &HttpFetcher::new())
}

/// [`convert`] with [`ConvertOptions::default`] (PNG output).
pub fn convert_default(source: impl Into<SvgInput>) -> Svg2ImgResult<Vec<u8>> {
    convert(source, &ConvertOptions::default())
}

/// [`convert`], reporting the outcome to `callback` exactly once.
pub fn convert_with_callback<C>(source: impl Into<SvgInput>, options: &ConvertOptions, callback: C)
where
    C: FnOnce(Svg2ImgResult<Vec<u8>>),
{
    callback(convert(source, options));
}

/// Awaitable [`convert`]; the work runs on tokio's blocking pool.
pub async fn convert_async(
    source: impl Into<SvgInput>,
    options: ConvertOptions,
) -> Svg2ImgResult<Vec<u8>> {
    convert_async_with_fetcher(source, options, Arc::new(HttpFetcher::new())).await
}

/// [`convert_async`] with a caller-provided fetcher.
pub async fn convert_async_with_fetcher<F>(
    source: impl Into<SvgInput>,
    options: ConvertOptions,
    fetcher: Arc<F>,
) -> Svg2ImgResult<Vec<u8>>
where
    F: ResourceFetcher + ?Sized + 'static,
{
    let input = source.into();
    tokio::task::spawn_blocking(move || convert_with_fetcher(input, &options, &*fetcher))
        .await
        .map_err(|e| Svg2ImgError::Other(anyhow::anyhow!("conversion task failed: {e}")))?
}

/// [`convert`] with a caller-provided fetcher for the primary URL and image references.
///
/// Any fatal error returns immediately; later steps do not run.
#[tracing::instrument(skip_all, fields(format = %options.format))]
pub fn convert_with_fetcher<F>(
    source: impl Into<SvgInput>,
    options: &ConvertOptions,
    fetcher: &F,
) -> Svg2ImgResult<Vec<u8>>
where
    F: ResourceFetcher + ?Sized,
{
    options.validate()?;
    let content = resolve_source(classify(source.into()), fetcher)?;

    let mut raster = options.effective_raster();
    if raster.resources_dir.is_none() {
        raster.resources_dir = content.resources_dir.clone();
    }

    let png = render_with_context(
        content.as_bytes(),
        &raster,
        fetcher,
        ResolveContext::top_level(options.fetch_threads),
    )?;

    if options.format.is_jpeg() {
        transcode_png_to_jpeg(&png, options.jpeg_quality())
    } else {
        Ok(png)
    }
}

/// Render already-loaded SVG bytes to PNG, resolving remote image references through `fetcher`.
pub fn render_svg_to_png<F>(
    svg: &[u8],
    raster: &RasterOptions,
    fetcher: &F,
) -> Svg2ImgResult<Vec<u8>>
where
    F: ResourceFetcher + ?Sized,
{
    render_with_context(svg, raster, fetcher, ResolveContext::default())
}

pub(crate) fn render_with_context<F>(
    svg: &[u8],
    raster: &RasterOptions,
    fetcher: &F,
    ctx: ResolveContext,
) -> Svg2ImgResult<Vec<u8>>
where
    F: ResourceFetcher + ?Sized,
{
    let mut rasterizer = Rasterizer::new(svg, raster)?;
    // Every fetch has settled once this returns; rendering must not start earlier.
    let report = resolve_images_with(&mut rasterizer, fetcher, ctx);
    if !report.failed.is_empty() {
        tracing::debug!(
            resolved = report.resolved.len(),
            failed = report.failed.len(),
            "rendering with unresolved images"
        );
    }

    let image = rasterizer.render()?;
    tracing::debug!(width = image.width, height = image.height, "svg rendered");
    image.as_png()
}

#[cfg(test)]
#[path = "../../tests/unit/convert/pipeline.rs"]
mod tests;
