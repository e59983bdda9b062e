use std::{
    collections::HashMap,
    io::Cursor,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::Context;

use crate::{
    config::options::{
        CropRect, FitTo, ImageRendering, RasterOptions, ShapeRendering, TextRendering,
    },
    foundation::error::{Svg2ImgError, Svg2ImgResult},
    render::fonts,
};

/// Largest accepted output side, in pixels.
pub const MAX_DIM: u32 = 16_384;

/// Raster formats the rasterizer accepts as image substitutes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubstituteFormat {
    /// PNG data.
    Png,
    /// JPEG data.
    Jpeg,
    /// GIF data (first frame).
    Gif,
    /// WebP data.
    WebP,
}

impl SubstituteFormat {
    /// Sniff the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct Substitute {
    format: SubstituteFormat,
    data: Arc<Vec<u8>>,
}

impl Substitute {
    fn image_kind(&self) -> usvg::ImageKind {
        match self.format {
            SubstituteFormat::Png => usvg::ImageKind::PNG(self.data.clone()),
            SubstituteFormat::Jpeg => usvg::ImageKind::JPEG(self.data.clone()),
            SubstituteFormat::Gif => usvg::ImageKind::GIF(self.data.clone()),
            SubstituteFormat::WebP => usvg::ImageKind::WEBP(self.data.clone()),
        }
    }
}

/// One SVG document prepared for rendering.
///
/// Construction parses the document and records every `http://`/`https://` image reference the
/// parser cannot load by itself. Callers fetch those, hand the bytes back through
/// [`Rasterizer::resolve_image`], then call [`Rasterizer::render`].
pub struct Rasterizer {
    svg: Vec<u8>,
    options: RasterOptions,
    fontdb: Arc<usvg::fontdb::Database>,
    tree: usvg::Tree,
    unresolved: Vec<String>,
    resolved: HashMap<String, Substitute>,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("svg_len", &self.svg.len())
            .field("unresolved", &self.unresolved)
            .field("resolved", &self.resolved.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Rasterizer {
    /// Parse `svg` (markup or SVGZ bytes) with `options`.
    pub fn new(svg: &[u8], options: &RasterOptions) -> Svg2ImgResult<Self> {
        options.validate()?;
        let fontdb = fonts::fontdb_for(&options.font);

        let seen = Mutex::new(Vec::<String>::new());
        let tree = {
            let opts = usvg_options(options, fontdb.clone(), recording_resolver(&seen));
            usvg::Tree::from_data(svg, &opts)
                .map_err(|e| Svg2ImgError::render(format!("parse svg: {e}")))?
        };
        let unresolved = seen.into_inner().unwrap_or_else(PoisonError::into_inner);

        tracing::debug!(
            width = tree.size().width(),
            height = tree.size().height(),
            unresolved = unresolved.len(),
            "svg parsed"
        );

        Ok(Self {
            svg: svg.to_vec(),
            options: options.clone(),
            fontdb,
            tree,
            unresolved,
            resolved: HashMap::new(),
        })
    }

    /// Remote image URLs referenced by the document, distinct, in document order.
    pub fn images_to_resolve(&self) -> &[String] {
        &self.unresolved
    }

    /// Supply the raw bytes behind `url`.
    ///
    /// The bytes must be PNG, JPEG, GIF or WebP; anything else is rejected and the reference
    /// stays unresolved.
    pub fn resolve_image(&mut self, url: &str, bytes: Vec<u8>) -> Svg2ImgResult<()> {
        let format = SubstituteFormat::sniff(&bytes).ok_or_else(|| {
            Svg2ImgError::render(format!("unrecognized image data for '{url}'"))
        })?;
        self.resolved.insert(
            url.to_owned(),
            Substitute {
                format,
                data: Arc::new(bytes),
            },
        );
        Ok(())
    }

    /// Number of references resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Render the document with every substitute supplied so far.
    pub fn render(&self) -> Svg2ImgResult<RenderedImage> {
        let reparsed;
        let tree = if self.resolved.is_empty() {
            &self.tree
        } else {
            let opts = usvg_options(
                &self.options,
                self.fontdb.clone(),
                substituting_resolver(&self.resolved),
            );
            reparsed = usvg::Tree::from_data(&self.svg, &opts)
                .map_err(|e| Svg2ImgError::render(format!("parse svg: {e}")))?;
            &reparsed
        };

        let (width, height, transform) = raster_params(tree, self.options.fit_to)?;
        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| Svg2ImgError::render("failed to allocate svg pixmap"))?;
        if let Some(bg) = self.options.background {
            pixmap.fill(resvg::tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
        }
        resvg::render(tree, transform, &mut pixmap.as_mut());

        let image = RenderedImage {
            width,
            height,
            rgba8_premul: pixmap.take(),
        };
        match self.options.crop {
            Some(crop) => image.crop(crop),
            None => Ok(image),
        }
    }
}

/// Rendered pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major premultiplied RGBA8.
    pub rgba8_premul: Vec<u8>,
}

impl RenderedImage {
    /// Straight-alpha copy of the pixels.
    pub fn to_rgba8(&self) -> Svg2ImgResult<image::RgbaImage> {
        let mut data = self.rgba8_premul.clone();
        unpremultiply_rgba8_in_place(&mut data);
        image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| Svg2ImgError::render("pixel buffer does not match image size"))
    }

    /// Encode as PNG.
    pub fn as_png(&self) -> Svg2ImgResult<Vec<u8>> {
        let rgba = self.to_rgba8()?;
        let mut buf = Vec::new();
        rgba.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(buf)
    }

    fn crop(self, crop: CropRect) -> Svg2ImgResult<Self> {
        let right = crop.right.unwrap_or(self.width).min(self.width);
        let bottom = crop.bottom.unwrap_or(self.height).min(self.height);
        if crop.left >= right || crop.top >= bottom {
            return Err(Svg2ImgError::render(format!(
                "crop rectangle lies outside the {}x{} image",
                self.width, self.height
            )));
        }

        let (w, h) = (right - crop.left, bottom - crop.top);
        let stride = self.width as usize * 4;
        let mut out = Vec::with_capacity(w as usize * h as usize * 4);
        for y in crop.top..bottom {
            let start = y as usize * stride + crop.left as usize * 4;
            out.extend_from_slice(&self.rgba8_premul[start..start + w as usize * 4]);
        }
        Ok(Self {
            width: w,
            height: h,
            rgba8_premul: out,
        })
    }
}

fn is_remote(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

fn recording_resolver(seen: &Mutex<Vec<String>>) -> usvg::ImageHrefResolver<'_> {
    let fallback = usvg::ImageHrefResolver::default_string_resolver();
    usvg::ImageHrefResolver {
        resolve_data: usvg::ImageHrefResolver::default_data_resolver(),
        resolve_string: Box::new(move |href: &str, opts: &usvg::Options| {
            if is_remote(href) {
                let mut seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
                if !seen.iter().any(|u| u == href) {
                    seen.push(href.to_owned());
                }
                return None;
            }
            fallback(href, opts)
        }),
    }
}

fn substituting_resolver(
    resolved: &HashMap<String, Substitute>,
) -> usvg::ImageHrefResolver<'_> {
    let fallback = usvg::ImageHrefResolver::default_string_resolver();
    usvg::ImageHrefResolver {
        resolve_data: usvg::ImageHrefResolver::default_data_resolver(),
        resolve_string: Box::new(move |href: &str, opts: &usvg::Options| {
            if let Some(sub) = resolved.get(href) {
                return Some(sub.image_kind());
            }
            if is_remote(href) {
                return None;
            }
            fallback(href, opts)
        }),
    }
}

fn usvg_options<'a>(
    options: &RasterOptions,
    fontdb: Arc<usvg::fontdb::Database>,
    image_href_resolver: usvg::ImageHrefResolver<'a>,
) -> usvg::Options<'a> {
    usvg::Options {
        resources_dir: options.resources_dir.clone(),
        dpi: options.dpi,
        font_family: options.font.default_font_family.clone(),
        font_size: options.font.default_font_size,
        languages: options.languages.clone(),
        shape_rendering: match options.shape_rendering {
            ShapeRendering::OptimizeSpeed => usvg::ShapeRendering::OptimizeSpeed,
            ShapeRendering::CrispEdges => usvg::ShapeRendering::CrispEdges,
            ShapeRendering::GeometricPrecision => usvg::ShapeRendering::GeometricPrecision,
        },
        text_rendering: match options.text_rendering {
            TextRendering::OptimizeSpeed => usvg::TextRendering::OptimizeSpeed,
            TextRendering::OptimizeLegibility => usvg::TextRendering::OptimizeLegibility,
            TextRendering::GeometricPrecision => usvg::TextRendering::GeometricPrecision,
        },
        image_rendering: match options.image_rendering {
            ImageRendering::OptimizeQuality => usvg::ImageRendering::OptimizeQuality,
            ImageRendering::OptimizeSpeed => usvg::ImageRendering::OptimizeSpeed,
        },
        image_href_resolver,
        fontdb,
        ..Default::default()
    }
}

/// Output size and scale for `tree` under `fit_to`.
fn raster_params(
    tree: &usvg::Tree,
    fit_to: FitTo,
) -> Svg2ImgResult<(u32, u32, resvg::tiny_skia::Transform)> {
    fn to_px(v: f32) -> Svg2ImgResult<u32> {
        if !v.is_finite() || v <= 0.0 {
            return Err(Svg2ImgError::render("svg has invalid width/height"));
        }
        Ok((v.ceil() as u32).max(1))
    }

    let size = tree.size();
    let (sw, sh) = (size.width(), size.height());
    let (w, h) = match fit_to {
        FitTo::Original => (to_px(sw)?, to_px(sh)?),
        FitTo::Width(w) => (w, to_px(sh * w as f32 / sw)?),
        FitTo::Height(h) => (to_px(sw * h as f32 / sh)?, h),
        FitTo::Zoom(z) => (to_px(sw * z)?, to_px(sh * z)?),
    };

    if w > MAX_DIM || h > MAX_DIM {
        return Err(Svg2ImgError::render(format!(
            "svg raster size too large: {w}x{h} (max {MAX_DIM}x{MAX_DIM})"
        )));
    }

    let transform = resvg::tiny_skia::Transform::from_scale(w as f32 / sw, h as f32 / sh);
    Ok((w, h, transform))
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
