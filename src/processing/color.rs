use std::fmt;

use image::Rgba;
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Straight (non-premultiplied) RGBA colour.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().strip_prefix('#')?;
        let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => Some(Self::rgb(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
            )),
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Linear interpolation per channel, `t` in `[0, 1]`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut out = [0u8; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            let a = self.0[i] as f32;
            let b = other.0[i] as f32;
            *slot = (a + (b - a) * t).round().clamp(0.0, 255.0) as u8;
        }
        Self(out)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Hex(String),
            Rgb([u8; 3]),
            Rgba([u8; 4]),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Hex(s) => Color::from_hex(&s)
                .ok_or_else(|| de::Error::custom(format!("invalid hex colour {s:?}"))),
            Raw::Rgb([r, g, b]) => Ok(Color::rgb(r, g, b)),
            Raw::Rgba(c) => Ok(Color(c)),
        }
    }
}

/// Source-over blend of `src` onto `dst` with an extra coverage factor.
#[inline]
pub fn blend_over(dst: &mut Rgba<u8>, src: [u8; 4], coverage: f32) {
    let sa = (src[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= f32::EPSILON {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let s = src[c] as f32;
        let d = dst[c] as f32;
        let v = (s * sa + d * da * (1.0 - sa)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Color::from_hex("#FF1493"), Some(Color::rgb(255, 20, 147)));
        assert_eq!(Color::from_hex("#999"), Some(Color::rgb(153, 153, 153)));
        assert_eq!(
            Color::from_hex("#00000033"),
            Some(Color::rgba(0, 0, 0, 0x33))
        );
        assert_eq!(Color::from_hex("FF1493"), None);
        assert_eq!(Color::from_hex("#12345"), None);
    }

    #[test]
    fn deserializes_hex_and_arrays() {
        let c: Color = serde_yaml::from_str("\"#111111\"").unwrap();
        assert_eq!(c, Color::rgb(17, 17, 17));
        let c: Color = serde_yaml::from_str("[1, 2, 3]").unwrap();
        assert_eq!(c, Color::rgb(1, 2, 3));
        let c: Color = serde_yaml::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(c, Color::rgba(1, 2, 3, 4));
    }

    #[test]
    fn opaque_source_replaces_destination() {
        let mut px = Rgba([10, 20, 30, 255]);
        blend_over(&mut px, [200, 100, 50, 255], 1.0);
        assert_eq!(px, Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn half_coverage_mixes() {
        let mut px = Rgba([0, 0, 0, 255]);
        blend_over(&mut px, [255, 255, 255, 255], 0.5);
        assert_eq!(px[0], 128);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Color::rgb(0, 0, 0);
        let b = Color::rgb(255, 255, 255);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }
}
