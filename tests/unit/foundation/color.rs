use serde_json::json;

use super::*;

#[test]
fn parses_hex_forms() {
    assert_eq!(Rgba8::parse("#fff").unwrap(), Rgba8::WHITE);
    assert_eq!(Rgba8::parse("#ff000080").unwrap(), Rgba8::rgba(255, 0, 0, 128));
    assert_eq!(Rgba8::parse("#00ff00").unwrap(), Rgba8::rgba(0, 255, 0, 255));
    assert_eq!(Rgba8::parse("#0000").unwrap(), Rgba8::TRANSPARENT);
    assert!(Rgba8::parse("#12345").is_err());
    assert!(Rgba8::parse("#gg0000").is_err());
}

#[test]
fn parses_rgb_functions_and_names() {
    assert_eq!(
        Rgba8::parse("rgb(10, 20, 30)").unwrap(),
        Rgba8::rgba(10, 20, 30, 255)
    );
    assert_eq!(
        Rgba8::parse("RGBA(10,20,30,0.5)").unwrap(),
        Rgba8::rgba(10, 20, 30, 128)
    );
    assert_eq!(Rgba8::parse(" White ").unwrap(), Rgba8::WHITE);
    assert!(Rgba8::parse("rgb(1,2)").is_err());
    assert!(Rgba8::parse("chartreuse-ish").is_err());
}

#[test]
fn serde_accepts_strings_and_arrays() {
    let c: Rgba8 = serde_json::from_value(json!("#336699")).unwrap();
    assert_eq!(c, Rgba8::rgba(0x33, 0x66, 0x99, 255));

    let c: Rgba8 = serde_json::from_value(json!([1, 2, 3])).unwrap();
    assert_eq!(c, Rgba8::rgba(1, 2, 3, 255));

    assert!(serde_json::from_value::<Rgba8>(json!([1, 2])).is_err());
    assert_eq!(serde_json::to_value(Rgba8::WHITE).unwrap(), json!("#ffffffff"));
}
