use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD;

use super::*;
use crate::source::fetch::FetchedResource;

const MARKUP: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect width="4" height="4" fill="red"/></svg>"#;

struct RecordingFetcher {
    urls: Mutex<Vec<String>>,
}

impl ResourceFetcher for RecordingFetcher {
    fn fetch(&self, url: &str) -> Svg2ImgResult<FetchedResource> {
        self.urls.lock().unwrap().push(url.to_owned());
        if url.ends_with("/missing.svg") {
            return Err(Svg2ImgError::fetch("404"));
        }
        Ok(FetchedResource::new(
            MARKUP.as_bytes().to_vec(),
            Some("image/svg+xml".to_owned()),
        ))
    }
}

fn fetcher() -> RecordingFetcher {
    RecordingFetcher {
        urls: Mutex::new(Vec::new()),
    }
}

#[test]
fn classify_covers_every_form() {
    let encoded = format!("{SVG_BASE64_PREFIX}{}", STANDARD.encode(MARKUP));
    assert!(matches!(classify(encoded.into()), SvgSource::Base64(_)));
    assert_eq!(
        classify(MARKUP.into()),
        SvgSource::Markup(MARKUP.to_owned())
    );
    assert_eq!(
        classify("https://example.com/a.svg".into()),
        SvgSource::Url("https://example.com/a.svg".to_owned())
    );
    assert_eq!(
        classify("http://example.com/a.svg".into()),
        SvgSource::Url("http://example.com/a.svg".to_owned())
    );
    assert_eq!(
        classify("assets/logo.svg".into()),
        SvgSource::Path(PathBuf::from("assets/logo.svg"))
    );
    assert_eq!(
        classify(SvgInput::from(vec![1u8, 2, 3])),
        SvgSource::Bytes(vec![1, 2, 3])
    );
}

#[test]
fn markup_embedding_data_uri_text_stays_markup() {
    let inner = STANDARD.encode(MARKUP);
    let outer = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="4" height="4"><image width="4" height="4" xlink:href="{SVG_BASE64_PREFIX}{inner}"/></svg>"#
    );
    assert_eq!(classify(outer.clone().into()), SvgSource::Markup(outer.clone()));

    let indented = format!("\n  {outer}");
    assert!(matches!(classify(indented.into()), SvgSource::Markup(_)));
}

#[test]
fn markup_with_prolog_embedding_data_uri_stays_markup() {
    let inner = STANDARD.encode(MARKUP);
    let body = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="4" height="4"><image width="4" height="4" xlink:href="{SVG_BASE64_PREFIX}{inner}"/></svg>"#
    );
    for prolog in [
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        "<!-- exported -->\n",
        r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">"#,
        "<?xml version=\"1.0\"?>\n<!DOCTYPE svg [ <!ENTITY fill \"red\"> ]>\n<!-- a -->",
    ] {
        let doc = format!("{prolog}{body}");
        assert_eq!(classify(doc.clone().into()), SvgSource::Markup(doc.clone()));

        let content = resolve_source(classify(doc.clone().into()), &fetcher()).unwrap();
        assert_eq!(content.as_bytes(), doc.as_bytes());
    }
}

#[test]
fn markup_mentioning_urls_is_not_fetched() {
    // The xmlns attribute contains "http://", but "<svg" wins.
    assert!(matches!(classify(MARKUP.into()), SvgSource::Markup(_)));
}

#[test]
fn base64_decodes_to_original_markup() {
    let f = fetcher();
    for payload in [
        STANDARD.encode(MARKUP),
        STANDARD.encode(MARKUP).trim_end_matches('=').to_owned(),
    ] {
        let encoded = format!("{SVG_BASE64_PREFIX}{payload}");
        let content = resolve_source(classify(encoded.into()), &f).unwrap();
        assert_eq!(content.data, SvgData::Text(MARKUP.to_owned()));
    }

    let wrapped = format!(
        "{SVG_BASE64_PREFIX}{}",
        STANDARD
            .encode(MARKUP)
            .as_bytes()
            .chunks(16)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    );
    let content = resolve_source(classify(wrapped.into()), &f).unwrap();
    assert_eq!(content.as_bytes(), MARKUP.as_bytes());
    assert!(f.urls.lock().unwrap().is_empty());
}

#[test]
fn invalid_base64_is_a_source_error() {
    let err = resolve_source(
        SvgSource::Base64("!!not base64!!".to_owned()),
        &fetcher(),
    )
    .unwrap_err();
    assert!(matches!(err, Svg2ImgError::Source(_)));
}

#[test]
fn url_is_fetched_once_and_errors_propagate() {
    let f = fetcher();
    let content = resolve_source(SvgSource::Url("http://mock/a.svg".to_owned()), &f).unwrap();
    assert_eq!(content.as_bytes(), MARKUP.as_bytes());

    let err =
        resolve_source(SvgSource::Url("http://mock/missing.svg".to_owned()), &f).unwrap_err();
    assert!(matches!(err, Svg2ImgError::Source(_)));
    assert_eq!(
        *f.urls.lock().unwrap(),
        vec!["http://mock/a.svg", "http://mock/missing.svg"]
    );
}

#[test]
fn path_reads_bytes_and_records_resources_dir() {
    let dir = PathBuf::from("target").join("unit_source_resolve");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("in.svg");
    std::fs::write(&path, MARKUP).unwrap();

    let content = resolve_source(classify(path.clone().into()), &fetcher()).unwrap();
    assert_eq!(content.data, SvgData::Bytes(MARKUP.as_bytes().to_vec()));
    assert_eq!(content.resources_dir, Some(dir));
}

#[test]
fn missing_file_is_a_source_error() {
    let err = resolve_source(
        classify("target/definitely/not/here.svg".into()),
        &fetcher(),
    )
    .unwrap_err();
    assert!(matches!(err, Svg2ImgError::Source(_)));
    assert!(err.to_string().contains("not/here.svg"));
}
