use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::foundation::{
    color::Rgba8,
    error::{Svg2ImgError, Svg2ImgResult},
};

/// Output encoding of a conversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// PNG, straight from the rasterizer.
    #[default]
    Png,
    /// JPEG, transcoded from the rendered PNG.
    Jpeg,
}

impl OutputFormat {
    /// Whether this format needs the JPEG transcode step.
    pub fn is_jpeg(self) -> bool {
        matches!(self, Self::Jpeg)
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// Infer a format from a file extension (`png`, `jpg`, `jpeg`; case-insensitive).
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Svg2ImgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            other => Err(Svg2ImgError::validation(format!(
                "unsupported output format \"{other}\" (expected png, jpg or jpeg)"
            ))),
        }
    }
}

impl Serialize for OutputFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Top-level options of a conversion call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ConvertOptions {
    /// Output encoding; PNG when omitted.
    pub format: OutputFormat,
    /// JPEG quality in `0..=100`; [`ConvertOptions::DEFAULT_QUALITY`] when omitted.
    ///
    /// JSON accepts a number or a numeric string (`"80"`).
    #[serde(deserialize_with = "deserialize_quality")]
    pub quality: Option<u8>,
    /// Rasterizer sub-configuration, forwarded to the rasterizer as-is.
    #[serde(rename = "resvg")]
    pub raster: RasterOptions,
    /// Upper bound on concurrent auxiliary image fetches.
    pub fetch_threads: Option<usize>,
}

impl ConvertOptions {
    /// JPEG quality used when none is given.
    pub const DEFAULT_QUALITY: u8 = 75;

    /// Options producing a JPEG at `quality`.
    pub fn jpeg(quality: u8) -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Some(quality),
            ..Self::default()
        }
    }

    /// Parse options from a JSON document.
    pub fn from_json_str(json: &str) -> Svg2ImgResult<Self> {
        let opts: Self = serde_json::from_str(json)
            .map_err(|e| Svg2ImgError::validation(format!("invalid options json: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read and parse options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Svg2ImgResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read options from '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Reject option combinations the rasterizer cannot honor.
    pub fn validate(&self) -> Svg2ImgResult<()> {
        if let Some(q) = self.quality
            && q > 100
        {
            return Err(Svg2ImgError::validation(format!(
                "quality must be within 0..=100, got {q}"
            )));
        }
        if let Some(n) = self.fetch_threads
            && n == 0
        {
            return Err(Svg2ImgError::validation(
                "fetchThreads must be >= 1 when set",
            ));
        }
        self.raster.validate()
    }

    /// Effective JPEG quality, clamped to the encoder's `1..=100` range.
    pub fn jpeg_quality(&self) -> u8 {
        self.quality.unwrap_or(Self::DEFAULT_QUALITY).clamp(1, 100)
    }

    /// Rasterizer options with the output-format defaults applied.
    ///
    /// JPEG has no alpha channel, so an unset background becomes opaque white.
    pub fn effective_raster(&self) -> RasterOptions {
        let mut raster = self.raster.clone();
        if self.format.is_jpeg() && raster.background.is_none() {
            raster.background = Some(Rgba8::WHITE);
        }
        raster
    }
}

fn deserialize_quality<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(i64),
        Text(String),
    }

    let value = match Option::<Repr>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Repr::Int(n)) => n,
        // Leading digits only, so "80" and "80%" both read as 80.
        Some(Repr::Text(s)) => {
            let s = s.trim();
            let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            s[..digits].parse::<i64>().map_err(|_| {
                serde::de::Error::custom(format!("quality must be an integer, got {s:?}"))
            })?
        }
    };
    u8::try_from(value)
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("quality must be within 0..=100, got {value}")))
}

/// How the SVG's intrinsic size maps to the output pixel size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum FitTo {
    /// Keep the intrinsic size.
    #[default]
    Original,
    /// Scale to this width, keeping the aspect ratio.
    Width(u32),
    /// Scale to this height, keeping the aspect ratio.
    Height(u32),
    /// Multiply the intrinsic size by this factor.
    Zoom(f32),
}

/// Pixel rectangle cut out of the rendered image.
///
/// `right`/`bottom` default to the image edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CropRect {
    /// Left edge (inclusive).
    pub left: u32,
    /// Top edge (inclusive).
    pub top: u32,
    /// Right edge (exclusive).
    pub right: Option<u32>,
    /// Bottom edge (exclusive).
    pub bottom: Option<u32>,
}

/// Shape anti-aliasing mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeRendering {
    /// No anti-aliasing.
    OptimizeSpeed,
    /// No anti-aliasing, pixel-aligned edges.
    CrispEdges,
    /// Anti-aliased.
    #[default]
    GeometricPrecision,
}

/// Text rendering mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextRendering {
    /// No anti-aliasing.
    OptimizeSpeed,
    /// Anti-aliased, hinted for legibility.
    #[default]
    OptimizeLegibility,
    /// Anti-aliased outlines.
    GeometricPrecision,
}

/// Raster image scaling quality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageRendering {
    /// Smooth scaling.
    #[default]
    OptimizeQuality,
    /// Nearest-neighbor scaling.
    OptimizeSpeed,
}

/// Font database setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct FontOptions {
    /// Load fonts installed on the system.
    pub load_system_fonts: bool,
    /// Extra font files (`.ttf`, `.otf`, `.ttc`).
    pub font_files: Vec<PathBuf>,
    /// Directories scanned (non-recursively) for extra fonts.
    pub font_dirs: Vec<PathBuf>,
    /// Family used when an element specifies none.
    pub default_font_family: String,
    /// Size used when an element specifies none.
    pub default_font_size: f32,
    /// Family behind the generic `serif`.
    pub serif_family: String,
    /// Family behind the generic `sans-serif`.
    pub sans_serif_family: String,
    /// Family behind the generic `cursive`.
    pub cursive_family: String,
    /// Family behind the generic `fantasy`.
    pub fantasy_family: String,
    /// Family behind the generic `monospace`.
    pub monospace_family: String,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            load_system_fonts: true,
            font_files: Vec::new(),
            font_dirs: Vec::new(),
            default_font_family: "Times New Roman".to_owned(),
            default_font_size: 12.0,
            serif_family: "Times New Roman".to_owned(),
            sans_serif_family: "Arial".to_owned(),
            cursive_family: "Comic Sans MS".to_owned(),
            fantasy_family: "Impact".to_owned(),
            monospace_family: "Courier New".to_owned(),
        }
    }
}

/// Rasterizer sub-configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RasterOptions {
    /// Output size policy.
    pub fit_to: FitTo,
    /// Fill painted under the SVG; transparent when unset.
    pub background: Option<Rgba8>,
    /// Optional crop applied after rendering.
    pub crop: Option<CropRect>,
    /// Font database setup.
    pub font: FontOptions,
    /// Resolution used for unit conversion (`in`, `cm`, ...).
    pub dpi: f32,
    /// Languages matched against `systemLanguage`.
    pub languages: Vec<String>,
    /// Shape anti-aliasing.
    pub shape_rendering: ShapeRendering,
    /// Text anti-aliasing.
    pub text_rendering: TextRendering,
    /// Raster image scaling.
    pub image_rendering: ImageRendering,
    /// Directory that relative `<image>` paths resolve against.
    pub resources_dir: Option<PathBuf>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            fit_to: FitTo::Original,
            background: None,
            crop: None,
            font: FontOptions::default(),
            dpi: 96.0,
            languages: vec!["en".to_owned()],
            shape_rendering: ShapeRendering::default(),
            text_rendering: TextRendering::default(),
            image_rendering: ImageRendering::default(),
            resources_dir: None,
        }
    }
}

impl RasterOptions {
    /// Reject values the rasterizer cannot honor.
    pub fn validate(&self) -> Svg2ImgResult<()> {
        match self.fit_to {
            FitTo::Width(0) | FitTo::Height(0) => {
                return Err(Svg2ImgError::validation("fitTo value must be >= 1"));
            }
            FitTo::Zoom(z) if !z.is_finite() || z <= 0.0 => {
                return Err(Svg2ImgError::validation(
                    "fitTo zoom must be finite and > 0",
                ));
            }
            _ => {}
        }
        if !self.dpi.is_finite() || self.dpi <= 0.0 {
            return Err(Svg2ImgError::validation("dpi must be finite and > 0"));
        }
        if !self.font.default_font_size.is_finite() || self.font.default_font_size <= 0.0 {
            return Err(Svg2ImgError::validation(
                "defaultFontSize must be finite and > 0",
            ));
        }
        if let Some(crop) = self.crop {
            if crop.right.is_some_and(|r| r <= crop.left)
                || crop.bottom.is_some_and(|b| b <= crop.top)
            {
                return Err(Svg2ImgError::validation("crop rectangle is empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/options.rs"]
mod tests;
