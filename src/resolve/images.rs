use rayon::prelude::*;

use crate::{
    config::options::RasterOptions,
    convert::pipeline::render_with_context,
    foundation::error::{Svg2ImgError, Svg2ImgResult},
    render::raster::Rasterizer,
    source::fetch::ResourceFetcher,
};

/// How many SVG-in-SVG levels are followed before a reference is given up on.
pub const MAX_NESTING_DEPTH: usize = 4;

/// Fetch workers used when the caller sets no bound.
pub const DEFAULT_FETCH_THREADS: usize = 16;

/// Outcome of one resolution round. Failures were already logged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// URLs whose bytes were handed to the rasterizer.
    pub resolved: Vec<String>,
    /// URLs left unresolved.
    pub failed: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ResolveContext {
    pub(crate) depth: usize,
    pub(crate) fetch_threads: Option<usize>,
}

impl ResolveContext {
    pub(crate) fn top_level(fetch_threads: Option<usize>) -> Self {
        Self {
            depth: 0,
            fetch_threads,
        }
    }

    fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }
}

/// Fetch every reference reported by `rasterizer` and hand the bytes back to it.
///
/// Fetches run concurrently and independently; a failing URL is logged and skipped without
/// affecting the others. Returns after every attempt has settled.
pub fn resolve_images<F>(rasterizer: &mut Rasterizer, fetcher: &F) -> ResolveReport
where
    F: ResourceFetcher + ?Sized,
{
    resolve_images_with(rasterizer, fetcher, ResolveContext::default())
}

pub(crate) fn resolve_images_with<F>(
    rasterizer: &mut Rasterizer,
    fetcher: &F,
    ctx: ResolveContext,
) -> ResolveReport
where
    F: ResourceFetcher + ?Sized,
{
    let urls = rasterizer.images_to_resolve().to_vec();
    if urls.is_empty() {
        return ResolveReport::default();
    }

    tracing::debug!(count = urls.len(), depth = ctx.depth, "resolving image references");
    let outcomes = fetch_all(&urls, fetcher, ctx);

    let mut report = ResolveReport::default();
    for (url, outcome) in urls.into_iter().zip(outcomes) {
        match outcome.and_then(|bytes| rasterizer.resolve_image(&url, bytes)) {
            Ok(()) => report.resolved.push(url),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "failed to load referenced image, rendering without it");
                report.failed.push(url);
            }
        }
    }
    report
}

fn fetch_all<F>(urls: &[String], fetcher: &F, ctx: ResolveContext) -> Vec<Svg2ImgResult<Vec<u8>>>
where
    F: ResourceFetcher + ?Sized,
{
    let threads = urls
        .len()
        .min(ctx.fetch_threads.unwrap_or(DEFAULT_FETCH_THREADS))
        .max(1);

    match build_fetch_pool(threads) {
        Ok(pool) => pool.install(|| {
            urls.par_iter()
                .map(|url| fetch_image(url, fetcher, ctx))
                .collect::<Vec<_>>()
        }),
        Err(err) => {
            tracing::warn!(error = %err, "fetch pool unavailable, fetching sequentially");
            urls.iter()
                .map(|url| fetch_image(url, fetcher, ctx))
                .collect()
        }
    }
}

/// Raster bytes for one reference. SVG responses are rendered to PNG first.
fn fetch_image<F>(url: &str, fetcher: &F, ctx: ResolveContext) -> Svg2ImgResult<Vec<u8>>
where
    F: ResourceFetcher + ?Sized,
{
    let fetched = fetcher.fetch(url)?;
    if !fetched.is_svg() {
        return Ok(fetched.bytes);
    }

    if ctx.depth + 1 > MAX_NESTING_DEPTH {
        return Err(Svg2ImgError::render(format!(
            "svg image nesting deeper than {MAX_NESTING_DEPTH} levels"
        )));
    }
    let markup = String::from_utf8(fetched.bytes)
        .map_err(|e| Svg2ImgError::render(format!("svg image is not utf-8: {e}")))?;

    tracing::debug!(url, depth = ctx.depth + 1, "rendering svg image reference");
    render_with_context(
        markup.as_bytes(),
        &RasterOptions::default(),
        fetcher,
        ctx.nested(),
    )
}

fn build_fetch_pool(threads: usize) -> Svg2ImgResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("svg2img-fetch-{i}"))
        .build()
        .map_err(|e| Svg2ImgError::fetch(format!("failed to build fetch thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/images.rs"]
mod tests;
