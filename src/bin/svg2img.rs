use std::path::PathBuf;

use anyhow::Context as _;
use clap::{ArgGroup, Parser};
use svg2img::{ConvertOptions, FitTo, OutputFormat, Rgba8};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "svg2img", version, about = "Convert SVG to PNG or JPEG")]
#[command(group(ArgGroup::new("fit").args(["width", "height", "zoom"])))]
struct Cli {
    /// SVG markup, `data:image/svg+xml;base64,` URI, http(s) URL or file path.
    input: String,

    /// Output image path.
    #[arg(long, short)]
    out: PathBuf,

    /// Output format (png, jpg, jpeg). Defaults to the output file extension.
    #[arg(long, short)]
    format: Option<OutputFormat>,

    /// JPEG quality (0-100).
    #[arg(long, short)]
    quality: Option<u8>,

    /// Scale to this width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Scale to this height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Multiply the intrinsic size.
    #[arg(long)]
    zoom: Option<f32>,

    /// Background color, e.g. `#fff`, `rgba(0,0,0,0.5)` or `white`.
    #[arg(long)]
    background: Option<Rgba8>,

    /// JSON options file; flags given on the command line take precedence.
    #[arg(long)]
    options: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = build_options(&cli)?;

    let bytes = svg2img::convert(cli.input.as_str(), &options)
        .with_context(|| format!("convert '{}'", shorten(&cli.input)))?;

    if let Some(parent) = cli.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&cli.out, &bytes)
        .with_context(|| format!("write {} '{}'", options.format, cli.out.display()))?;

    eprintln!("wrote {}", cli.out.display());
    Ok(())
}

fn build_options(cli: &Cli) -> anyhow::Result<ConvertOptions> {
    let mut options = match &cli.options {
        Some(path) => ConvertOptions::from_path(path)?,
        None => ConvertOptions::default(),
    };

    if let Some(format) = cli.format.or_else(|| OutputFormat::from_extension(&cli.out)) {
        options.format = format;
    }
    if cli.quality.is_some() {
        options.quality = cli.quality;
    }
    if let Some(w) = cli.width {
        options.raster.fit_to = FitTo::Width(w);
    } else if let Some(h) = cli.height {
        options.raster.fit_to = FitTo::Height(h);
    } else if let Some(z) = cli.zoom {
        options.raster.fit_to = FitTo::Zoom(z);
    }
    if cli.background.is_some() {
        options.raster.background = cli.background;
    }

    options.validate()?;
    Ok(options)
}

// Inline markup and data URIs can be huge; keep error messages readable.
fn shorten(input: &str) -> String {
    const MAX: usize = 80;
    match input.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &input[..idx]),
        None => input.to_owned(),
    }
}
