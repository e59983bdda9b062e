use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{Svg2ImgError, Svg2ImgResult};

/// Straight (non-premultiplied) RGBA8 color.
///
/// Parsed from `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`, `rgba(r, g, b, a)`
/// (alpha as `0..=1`) and a small set of named colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque white, the JPEG background default.
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Build a color from its four channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS-like color string.
    pub fn parse(s: &str) -> Svg2ImgResult<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }

        let lower = s.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_fn(args);
        }

        named(&lower).ok_or_else(|| Svg2ImgError::validation(format!("unknown color \"{s}\"")))
    }

    /// Format as `#rrggbbaa`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl FromStr for Rgba8 {
    type Err = Svg2ImgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Rgba8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Css(String),
            Arr(Vec<u8>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Css(s) => Self::parse(&s).map_err(serde::de::Error::custom),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgba(*r, *g, *b, 255)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "color array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

fn parse_hex(s: &str) -> Svg2ImgResult<Rgba8> {
    fn hex_byte(pair: &str) -> Svg2ImgResult<u8> {
        u8::from_str_radix(pair, 16)
            .map_err(|_| Svg2ImgError::validation(format!("invalid hex byte \"{pair}\"")))
    }

    fn hex_nibble(c: &str) -> Svg2ImgResult<u8> {
        let v = hex_byte(c)?;
        Ok(v * 16 + v)
    }

    if !s.is_ascii() {
        return Err(Svg2ImgError::validation("hex color must be ASCII"));
    }

    match s.len() {
        3 | 4 => {
            let r = hex_nibble(&s[0..1])?;
            let g = hex_nibble(&s[1..2])?;
            let b = hex_nibble(&s[2..3])?;
            let a = if s.len() == 4 {
                hex_nibble(&s[3..4])?
            } else {
                255
            };
            Ok(Rgba8::rgba(r, g, b, a))
        }
        6 | 8 => {
            let r = hex_byte(&s[0..2])?;
            let g = hex_byte(&s[2..4])?;
            let b = hex_byte(&s[4..6])?;
            let a = if s.len() == 8 {
                hex_byte(&s[6..8])?
            } else {
                255
            };
            Ok(Rgba8::rgba(r, g, b, a))
        }
        _ => Err(Svg2ImgError::validation(
            "hex color must be #rgb, #rgba, #rrggbb or #rrggbbaa",
        )),
    }
}

fn parse_rgb_fn(args: &str) -> Svg2ImgResult<Rgba8> {
    let parts = args.split(',').map(str::trim).collect::<Vec<_>>();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(Svg2ImgError::validation(
            "rgb()/rgba() takes 3 or 4 comma-separated arguments",
        ));
    }

    let channel = |p: &str| -> Svg2ImgResult<u8> {
        let v = p
            .parse::<f64>()
            .map_err(|_| Svg2ImgError::validation(format!("invalid color channel \"{p}\"")))?;
        Ok(v.clamp(0.0, 255.0).round() as u8)
    };

    let r = channel(parts[0])?;
    let g = channel(parts[1])?;
    let b = channel(parts[2])?;
    let a = match parts.get(3) {
        Some(p) => {
            let v = p
                .parse::<f64>()
                .map_err(|_| Svg2ImgError::validation(format!("invalid alpha \"{p}\"")))?;
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        None => 255,
    };
    Ok(Rgba8::rgba(r, g, b, a))
}

fn named(s: &str) -> Option<Rgba8> {
    Some(match s {
        "white" => Rgba8::WHITE,
        "black" => Rgba8::BLACK,
        "transparent" => Rgba8::TRANSPARENT,
        "red" => Rgba8::rgba(255, 0, 0, 255),
        "green" => Rgba8::rgba(0, 128, 0, 255),
        "lime" => Rgba8::rgba(0, 255, 0, 255),
        "blue" => Rgba8::rgba(0, 0, 255, 255),
        "yellow" => Rgba8::rgba(255, 255, 0, 255),
        "gray" | "grey" => Rgba8::rgba(128, 128, 128, 255),
        "silver" => Rgba8::rgba(192, 192, 192, 255),
        _ => return None,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
