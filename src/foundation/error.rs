/// Convenience result type used across svg2img.
pub type Svg2ImgResult<T> = Result<T, Svg2ImgError>;

/// Error taxonomy for conversion calls.
///
/// The variant names the step that failed; no step re-wraps another step's error.
#[derive(thiserror::Error, Debug)]
pub enum Svg2ImgError {
    /// Invalid user-provided options (format names, colors, sizes).
    #[error("validation error: {0}")]
    Validation(String),

    /// The primary SVG source could not be loaded.
    #[error("source error: {0}")]
    Source(String),

    /// A fetcher failed to retrieve a URL.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The rasterizer rejected the SVG or failed to produce pixels.
    #[error("render error: {0}")]
    Render(String),

    /// JPEG transcoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Svg2ImgError {
    /// Build a [`Svg2ImgError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`Svg2ImgError::Source`] value (the input failed to load).
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`Svg2ImgError::Fetch`] value.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Build a [`Svg2ImgError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`Svg2ImgError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
