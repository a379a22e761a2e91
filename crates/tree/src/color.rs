use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("hex color '{0}' must use the #RRGGBB form")]
    MalformedHex(String),
    #[error("packed color {0:#x} does not fit in 24 bits")]
    PackedOutOfRange(u64),
    #[error("interpolation needs at least one step")]
    ZeroSteps,
}

/// An 8-bit RGB triple as sent down the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const ORANGE: Rgb = Rgb::new(252, 81, 8);
    pub const AMBER: Rgb = Rgb::new(251, 136, 10);
    pub const YELLOW: Rgb = Rgb::new(234, 163, 8);
    pub const LIME: Rgb = Rgb::new(107, 202, 3);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const EMERALD: Rgb = Rgb::new(23, 178, 106);
    pub const TEAL: Rgb = Rgb::new(23, 175, 150);
    pub const CYAN: Rgb = Rgb::new(21, 170, 210);
    pub const SKY: Rgb = Rgb::new(20, 146, 241);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const INDIGO: Rgb = Rgb::new(78, 64, 255);
    pub const VIOLET: Rgb = Rgb::new(122, 47, 255);
    pub const PURPLE: Rgb = Rgb::new(155, 30, 255);
    pub const FUCHSIA: Rgb = Rgb::new(215, 0, 250);
    pub const PINK: Rgb = Rgb::new(240, 15, 137);
    pub const ROSE: Rgb = Rgb::new(251, 0, 69);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from wide integers, clamping each channel into 0..=255.
    pub fn from_clamped(r: i64, g: i64, b: i64) -> Self {
        Self::new(clamp_channel(r), clamp_channel(g), clamp_channel(b))
    }

    /// Looks up one of the palette colors by its lowercase name.
    pub fn named(name: &str) -> Option<Self> {
        let color = match name.trim().to_ascii_lowercase().as_str() {
            "black" | "off" => Self::BLACK,
            "white" | "on" => Self::WHITE,
            "red" => Self::RED,
            "orange" => Self::ORANGE,
            "amber" => Self::AMBER,
            "yellow" => Self::YELLOW,
            "lime" => Self::LIME,
            "green" => Self::GREEN,
            "emerald" => Self::EMERALD,
            "teal" => Self::TEAL,
            "cyan" => Self::CYAN,
            "sky" => Self::SKY,
            "blue" => Self::BLUE,
            "indigo" => Self::INDIGO,
            "violet" => Self::VIOLET,
            "purple" => Self::PURPLE,
            "fuchsia" => Self::FUCHSIA,
            "pink" => Self::PINK,
            "rose" => Self::ROSE,
            _ => return None,
        };
        Some(color)
    }

    /// Parses `#RRGGBB`. Case-insensitive; the leading `#` is required.
    pub fn from_hex(input: &str) -> Result<Self, ColorError> {
        let malformed = || ColorError::MalformedHex(input.to_string());
        let digits = input.trim().strip_prefix('#').ok_or_else(malformed)?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(malformed());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| malformed())
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Decodes the 24-bit wire word laid out as `GGGGGGGG RRRRRRRR BBBBBBBB`.
    pub fn from_packed(word: u64) -> Result<Self, ColorError> {
        if word > 0x00ff_ffff {
            return Err(ColorError::PackedOutOfRange(word));
        }
        let word = word as u32;
        Ok(Self::new(
            ((word >> 8) & 0xff) as u8,
            ((word >> 16) & 0xff) as u8,
            (word & 0xff) as u8,
        ))
    }

    /// Encodes into the 24-bit wire word (green high, red middle, blue low).
    pub const fn to_packed(self) -> u32 {
        ((self.g as u32) << 16) | ((self.r as u32) << 8) | (self.b as u32)
    }

    /// Hue, saturation and value in `0.0..=1.0`.
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let (r, g, b) = hsv_to_rgb(
            hue.rem_euclid(1.0),
            saturation.clamp(0.0, 1.0),
            value.clamp(0.0, 1.0),
        );
        Self::new(unit_to_channel(r), unit_to_channel(g), unit_to_channel(b))
    }

    pub fn to_hsv(self) -> (f64, f64, f64) {
        rgb_to_hsv(
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }

    /// Random hue at the given saturation and value.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, saturation: f64, value: f64) -> Self {
        Self::from_hsv(rng.gen::<f64>(), saturation, value)
    }

    /// Keeps saturation and value but rotates the hue by 40 to 220 degrees.
    pub fn different_from<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let (hue, saturation, value) = self.to_hsv();
        let degrees = hue * 360.0 + f64::from(rng.gen_range(0..=180u16)) + 40.0;
        Self::from_hsv(degrees.rem_euclid(360.0) / 360.0, saturation, value)
    }

    /// Divides every channel by `factor`, saturating at 0 and 255.
    pub fn scaled_down(self, factor: f64) -> Self {
        let scale = |channel: u8| clamp_unit(f64::from(channel) / factor);
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

fn clamp_channel(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

fn clamp_unit(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0) as u8
}

fn unit_to_channel(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return (0.0, 0.0, max);
    }
    let span = max - min;
    let saturation = span / max;
    let rc = (max - r) / span;
    let gc = (max - g) / span;
    let bc = (max - b) / span;
    let hue = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((hue / 6.0).rem_euclid(1.0), saturation, max)
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(color) = Self::named(s) {
            return Ok(color);
        }
        Self::from_hex(s)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl Serialize for Rgb {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Channels([i64; 3]),
            Packed(u64),
            Text(String),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Channels([r, g, b]) => Ok(Rgb::from_clamped(r, g, b)),
            Helper::Packed(word) => Rgb::from_packed(word).map_err(de::Error::custom),
            Helper::Text(raw) => raw.parse().map_err(de::Error::custom),
        }
    }
}
