use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

use crate::{
    foundation::error::{Svg2ImgError, Svg2ImgResult},
    source::fetch::ResourceFetcher,
};

/// Prefix marking a base64-wrapped SVG document.
pub const SVG_BASE64_PREFIX: &str = "data:image/svg+xml;base64,";

const BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// What the caller handed to a conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SvgInput {
    /// Markup, a data URI, a URL or a file path; see [`classify`].
    Text(String),
    /// Raw SVG (or SVGZ) bytes.
    Bytes(Vec<u8>),
}

impl From<&str> for SvgInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for SvgInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for SvgInput {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<&Path> for SvgInput {
    fn from(p: &Path) -> Self {
        Self::Text(p.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for SvgInput {
    fn from(p: PathBuf) -> Self {
        Self::from(p.as_path())
    }
}

impl From<Vec<u8>> for SvgInput {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<&[u8]> for SvgInput {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

/// Classified input; exactly one form per call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SvgSource {
    /// Base64 payload following [`SVG_BASE64_PREFIX`].
    Base64(String),
    /// Already-loaded markup.
    Markup(String),
    /// Remote document to fetch.
    Url(String),
    /// Local file to read.
    Path(PathBuf),
    /// Raw bytes handed to the rasterizer unchanged.
    Bytes(Vec<u8>),
}

impl SvgSource {
    /// Short name of the form, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Base64(_) => "base64",
            Self::Markup(_) => "markup",
            Self::Url(_) => "url",
            Self::Path(_) => "path",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// Loaded SVG document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SvgContent {
    /// Document data.
    pub data: SvgData,
    /// Directory relative `<image>` paths resolve against, when the input was a file.
    pub resources_dir: Option<PathBuf>,
}

/// Document data as produced by the loader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SvgData {
    /// Markup text (inline or base64-decoded).
    Text(String),
    /// Bytes read from a file, a URL or the caller.
    Bytes(Vec<u8>),
}

impl SvgContent {
    fn text(s: String) -> Self {
        Self {
            data: SvgData::Text(s),
            resources_dir: None,
        }
    }

    fn bytes(b: Vec<u8>) -> Self {
        Self {
            data: SvgData::Bytes(b),
            resources_dir: None,
        }
    }

    /// Borrow the document as bytes for the rasterizer.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            SvgData::Text(s) => s.as_bytes(),
            SvgData::Bytes(b) => b,
        }
    }
}

/// Decide which form `input` takes. First match wins:
///
/// 1. contains [`SVG_BASE64_PREFIX`] and does not start with `<svg` → [`SvgSource::Base64`].
///    A leading XML declaration, processing instructions, comments and a DOCTYPE are skipped
///    before the `<svg` check.
/// 2. contains `<svg` → [`SvgSource::Markup`]
/// 3. contains `http://` or `https://` → [`SvgSource::Url`]
/// 4. anything else → [`SvgSource::Path`]
///
/// The `<svg` guard in rule 1 keeps markup that merely embeds a data URI (for example in an
/// `<image href>`) classified as markup.
pub fn classify(input: SvgInput) -> SvgSource {
    let text = match input {
        SvgInput::Bytes(b) => return SvgSource::Bytes(b),
        SvgInput::Text(t) => t,
    };

    if let Some(idx) = text.find(SVG_BASE64_PREFIX)
        && !skip_prolog(&text).starts_with("<svg")
    {
        return SvgSource::Base64(text[idx + SVG_BASE64_PREFIX.len()..].to_owned());
    }
    if text.contains("<svg") {
        return SvgSource::Markup(text);
    }
    if text.contains("http://") || text.contains("https://") {
        return SvgSource::Url(text.trim().to_owned());
    }
    SvgSource::Path(PathBuf::from(text))
}

/// `text` past leading whitespace, `<?..?>`, `<!--..-->` and `<!DOCTYPE ..>` blocks.
fn skip_prolog(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        let end = if rest.starts_with("<?") {
            rest.find("?>").map(|i| i + 2)
        } else if rest.starts_with("<!--") {
            rest.find("-->").map(|i| i + 3)
        } else if rest.starts_with("<!DOCTYPE") || rest.starts_with("<!doctype") {
            // An internal subset `[..]` may itself contain `>`.
            match (rest.find('['), rest.find('>')) {
                (Some(open), Some(close)) if open < close => rest.find("]>").map(|i| i + 2),
                (_, close) => close.map(|i| i + 1),
            }
        } else {
            return rest;
        };
        match end {
            Some(end) => rest = rest[end..].trim_start(),
            None => return rest,
        }
    }
}

/// Load the document behind `source`.
///
/// File and URL failures are returned without retry.
pub fn resolve_source<F>(source: SvgSource, fetcher: &F) -> Svg2ImgResult<SvgContent>
where
    F: ResourceFetcher + ?Sized,
{
    tracing::debug!(kind = source.kind(), "resolve svg source");
    match source {
        SvgSource::Base64(payload) => decode_base64_svg(&payload).map(SvgContent::text),
        SvgSource::Markup(markup) => Ok(SvgContent::text(markup)),
        SvgSource::Bytes(bytes) => Ok(SvgContent::bytes(bytes)),
        SvgSource::Url(url) => {
            let fetched = fetcher
                .fetch(&url)
                .map_err(|e| Svg2ImgError::load(format!("load svg from '{url}': {e}")))?;
            Ok(SvgContent::bytes(fetched.bytes))
        }
        SvgSource::Path(path) => {
            let bytes = read_svg_file(&path)?;
            let mut content = SvgContent::bytes(bytes);
            content.resources_dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf);
            Ok(content)
        }
    }
}

fn read_svg_file(path: &Path) -> Svg2ImgResult<Vec<u8>> {
    std::fs::read(path)
        .with_context(|| format!("read svg from '{}'", path.display()))
        .map_err(|e| Svg2ImgError::load(format!("{e:#}")))
}

/// Decode a base64 payload into markup.
///
/// ASCII whitespace is ignored and padding is optional.
pub fn decode_base64_svg(payload: &str) -> Svg2ImgResult<String> {
    let cleaned = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect::<Vec<_>>();
    let bytes = BASE64_LENIENT
        .decode(&cleaned)
        .map_err(|e| Svg2ImgError::load(format!("invalid base64 svg payload: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Svg2ImgError::load(format!("base64 svg payload is not utf-8: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/source/resolve.rs"]
mod tests;
