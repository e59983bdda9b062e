use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::*;
use crate::{config::options::FontOptions, foundation::color::Rgba8};

fn opts() -> RasterOptions {
    RasterOptions {
        font: FontOptions {
            load_system_fonts: false,
            ..FontOptions::default()
        },
        // Nearest-neighbor keeps scaled substitutes exact.
        image_rendering: ImageRendering::OptimizeSpeed,
        ..RasterOptions::default()
    }
}

fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(px));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn pixel(img: &RenderedImage, x: u32, y: u32) -> [u8; 4] {
    img.to_rgba8().unwrap().get_pixel(x, y).0
}

const RECT: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><rect x="0" y="0" width="10" height="10" fill="#ff0000"/></svg>"##;

fn image_svg(href: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="10" height="10"><image x="0" y="0" width="10" height="10" xlink:href="{href}"/></svg>"#
    )
}

#[test]
fn renders_intrinsic_size_with_transparent_default() {
    let r = Rasterizer::new(RECT.as_bytes(), &opts()).unwrap();
    assert!(r.images_to_resolve().is_empty());
    let img = r.render().unwrap();
    assert_eq!((img.width, img.height), (20, 10));
    assert_eq!(pixel(&img, 5, 5), [255, 0, 0, 255]);
    assert_eq!(pixel(&img, 15, 5)[3], 0);
}

#[test]
fn background_fills_unpainted_pixels() {
    let mut o = opts();
    o.background = Some(Rgba8::WHITE);
    let img = Rasterizer::new(RECT.as_bytes(), &o).unwrap().render().unwrap();
    assert_eq!(pixel(&img, 15, 5), [255, 255, 255, 255]);
    assert_eq!(pixel(&img, 5, 5), [255, 0, 0, 255]);
}

#[test]
fn fit_to_scales_output() {
    let mut o = opts();
    o.fit_to = FitTo::Width(40);
    let img = Rasterizer::new(RECT.as_bytes(), &o).unwrap().render().unwrap();
    assert_eq!((img.width, img.height), (40, 20));

    o.fit_to = FitTo::Height(5);
    let img = Rasterizer::new(RECT.as_bytes(), &o).unwrap().render().unwrap();
    assert_eq!((img.width, img.height), (10, 5));

    o.fit_to = FitTo::Zoom(3.0);
    let img = Rasterizer::new(RECT.as_bytes(), &o).unwrap().render().unwrap();
    assert_eq!((img.width, img.height), (60, 30));

    o.fit_to = FitTo::Width(MAX_DIM + 1);
    let r = Rasterizer::new(RECT.as_bytes(), &o).unwrap();
    assert!(matches!(r.render(), Err(Svg2ImgError::Render(_))));
}

#[test]
fn crop_cuts_the_requested_rectangle() {
    let mut o = opts();
    o.crop = Some(CropRect {
        left: 8,
        top: 2,
        right: Some(12),
        bottom: None,
    });
    let img = Rasterizer::new(RECT.as_bytes(), &o).unwrap().render().unwrap();
    assert_eq!((img.width, img.height), (4, 8));
    assert_eq!(pixel(&img, 0, 0), [255, 0, 0, 255]);
    assert_eq!(pixel(&img, 3, 0)[3], 0);

    o.crop = Some(CropRect {
        left: 30,
        top: 0,
        right: None,
        bottom: None,
    });
    let r = Rasterizer::new(RECT.as_bytes(), &o).unwrap();
    assert!(r.render().is_err());
}

#[test]
fn malformed_svg_is_a_render_error() {
    let err = Rasterizer::new(b"<svg", &opts()).unwrap_err();
    assert!(matches!(err, Svg2ImgError::Render(_)));
    assert!(Rasterizer::new(b"not svg at all", &opts()).is_err());
}

#[test]
fn remote_references_are_reported_once_in_order() {
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="10" height="10">
<image width="5" height="5" xlink:href="https://img.test/b.png"/>
<image width="5" height="5" xlink:href="http://img.test/a.png"/>
<image width="5" height="5" xlink:href="https://img.test/b.png"/>
<image width="5" height="5" xlink:href="data:image/png;base64,{}"/>
</svg>"#,
        STANDARD.encode(png_bytes(1, 1, [0, 0, 255, 255]))
    );
    let r = Rasterizer::new(svg.as_bytes(), &opts()).unwrap();
    assert_eq!(
        r.images_to_resolve(),
        ["https://img.test/b.png", "http://img.test/a.png"]
    );
}

#[test]
fn resolved_image_is_drawn() {
    let svg = image_svg("https://img.test/red.png");
    let mut r = Rasterizer::new(svg.as_bytes(), &opts()).unwrap();

    let before = r.render().unwrap();
    assert_eq!(pixel(&before, 5, 5)[3], 0);

    r.resolve_image("https://img.test/red.png", png_bytes(2, 2, [255, 0, 0, 255]))
        .unwrap();
    assert_eq!(r.resolved_count(), 1);
    let after = r.render().unwrap();
    assert_eq!(pixel(&after, 5, 5), [255, 0, 0, 255]);
}

#[test]
fn unrecognized_substitute_bytes_are_rejected() {
    let svg = image_svg("https://img.test/x.png");
    let mut r = Rasterizer::new(svg.as_bytes(), &opts()).unwrap();
    let err = r
        .resolve_image("https://img.test/x.png", b"<html>404</html>".to_vec())
        .unwrap_err();
    assert!(matches!(err, Svg2ImgError::Render(_)));
    assert_eq!(r.resolved_count(), 0);
}

#[test]
fn as_png_has_signature_and_straight_alpha() {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="2" height="2"><rect width="2" height="2" fill="#ff0000" fill-opacity="0.5"/></svg>"##;
    let img = Rasterizer::new(svg.as_bytes(), &opts()).unwrap().render().unwrap();
    let png = img.as_png().unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    let px = decoded.get_pixel(0, 0).0;
    assert!(px[0] >= 250, "red should be un-premultiplied, got {px:?}");
    assert!((126..=129).contains(&px[3]), "alpha {px:?}");
}

#[test]
fn sniffs_supported_substitute_formats() {
    assert_eq!(
        SubstituteFormat::sniff(&png_bytes(1, 1, [0, 0, 0, 255])),
        Some(SubstituteFormat::Png)
    );
    assert_eq!(SubstituteFormat::sniff(b"GIF89a\x01\x00"), Some(SubstituteFormat::Gif));
    assert_eq!(SubstituteFormat::sniff(b"\xff\xd8\xff\xe0"), Some(SubstituteFormat::Jpeg));
    assert_eq!(SubstituteFormat::sniff(b"<svg/>"), None);
}
