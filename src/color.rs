//! Color values: parsing, RGB/HSL conversion and adjustment

use crate::value::format_number;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

static NAMED_COLORS: Lazy<HashMap<&'static str, (u8, u8, u8)>> = Lazy::new(|| {
    HashMap::from([
        ("black", (0, 0, 0)),
        ("silver", (192, 192, 192)),
        ("gray", (128, 128, 128)),
        ("grey", (128, 128, 128)),
        ("white", (255, 255, 255)),
        ("maroon", (128, 0, 0)),
        ("red", (255, 0, 0)),
        ("purple", (128, 0, 128)),
        ("fuchsia", (255, 0, 255)),
        ("magenta", (255, 0, 255)),
        ("green", (0, 128, 0)),
        ("lime", (0, 255, 0)),
        ("olive", (128, 128, 0)),
        ("yellow", (255, 255, 0)),
        ("navy", (0, 0, 128)),
        ("blue", (0, 0, 255)),
        ("teal", (0, 128, 128)),
        ("aqua", (0, 255, 255)),
        ("cyan", (0, 255, 255)),
        ("orange", (255, 165, 0)),
        ("pink", (255, 192, 203)),
        ("brown", (165, 42, 42)),
        ("gold", (255, 215, 0)),
        ("indigo", (75, 0, 130)),
        ("violet", (238, 130, 238)),
        ("coral", (255, 127, 80)),
        ("tomato", (255, 99, 71)),
        ("salmon", (250, 128, 114)),
        ("khaki", (240, 230, 140)),
        ("crimson", (220, 20, 60)),
        ("orchid", (218, 112, 214)),
        ("beige", (245, 245, 220)),
        ("ivory", (255, 255, 240)),
        ("lavender", (230, 230, 250)),
        ("turquoise", (64, 224, 208)),
        ("tan", (210, 180, 140)),
        ("chocolate", (210, 105, 30)),
        ("darkgray", (169, 169, 169)),
        ("lightgray", (211, 211, 211)),
        ("whitesmoke", (245, 245, 245)),
    ])
});

/// An RGBA color. Channels are kept as floats so chained arithmetic does not
/// accumulate rounding; they are rounded when printed.
#[derive(Debug, Clone, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
    /// Source spelling (`#FFF`, `red`), dropped once the color is modified
    pub repr: Option<String>,
}

impl Color {
    pub fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red: red.clamp(0.0, 255.0),
            green: green.clamp(0.0, 255.0),
            blue: blue.clamp(0.0, 255.0),
            alpha: alpha.clamp(0.0, 1.0),
            repr: None,
        }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`; the leading `#` is optional
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#').unwrap_or(text);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(f64::from);
        let (r, g, b, a) = match hex.len() {
            3 | 4 => {
                let doubled: Vec<String> = hex.chars().map(|c| c.to_string().repeat(2)).collect();
                let alpha = match doubled.get(3) {
                    Some(a) => channel(a)? / 255.0,
                    None => 1.0,
                };
                (channel(&doubled[0])?, channel(&doubled[1])?, channel(&doubled[2])?, alpha)
            }
            6 | 8 => {
                let alpha = if hex.len() == 8 { channel(&hex[6..8])? / 255.0 } else { 1.0 };
                (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, alpha)
            }
            _ => return None,
        };
        let mut color = Self::rgba(r, g, b, a);
        color.repr = Some(format!("#{}", hex));
        Some(color)
    }

    pub fn named(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("transparent") {
            let mut color = Self::rgba(0.0, 0.0, 0.0, 0.0);
            color.repr = Some(name.to_string());
            return Some(color);
        }
        NAMED_COLORS
            .get(name.to_ascii_lowercase().as_str())
            .map(|&(r, g, b)| {
                let mut color = Self::rgba(r.into(), g.into(), b.into(), 1.0);
                color.repr = Some(name.to_string());
                color
            })
    }

    /// Hue in degrees, saturation and lightness in percent
    pub fn from_hsla(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Self {
        let h = (hue % 360.0 + 360.0) % 360.0 / 360.0;
        let s = saturation.clamp(0.0, 100.0) / 100.0;
        let l = lightness.clamp(0.0, 100.0) / 100.0;

        let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
        let m1 = l * 2.0 - m2;
        let to_rgb = |mut h: f64| {
            if h < 0.0 {
                h += 1.0;
            }
            if h > 1.0 {
                h -= 1.0;
            }
            let v = if h * 6.0 < 1.0 {
                m1 + (m2 - m1) * h * 6.0
            } else if h * 2.0 < 1.0 {
                m2
            } else if h * 3.0 < 2.0 {
                m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
            } else {
                m1
            };
            v * 255.0
        };

        Self::rgba(to_rgb(h + 1.0 / 3.0), to_rgb(h), to_rgb(h - 1.0 / 3.0), alpha)
    }

    /// Returns (hue in degrees, saturation %, lightness %)
    pub fn to_hsl(&self) -> (f64, f64, f64) {
        let r = self.red / 255.0;
        let g = self.green / 255.0;
        let b = self.blue / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (g - b) / delta
        } else if max == g {
            60.0 * (b - r) / delta + 120.0
        } else {
            60.0 * (r - g) / delta + 240.0
        };
        let lightness = (max + min) / 2.0;
        let saturation = if delta == 0.0 {
            0.0
        } else if lightness < 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };

        ((hue + 360.0) % 360.0, saturation * 100.0, lightness * 100.0)
    }

    /// Shift lightness by `amount` percentage points, clamped to 0..=100
    pub fn adjust_lightness(&self, amount: f64) -> Self {
        let (h, s, l) = self.to_hsl();
        Self::from_hsla(h, s, (l + amount).clamp(0.0, 100.0), self.alpha)
    }

    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self::rgba(self.red, self.green, self.blue, alpha)
    }

    /// Apply `op` to each RGB channel pair; alpha must match
    pub fn combine(&self, other: &Color, op: impl Fn(f64, f64) -> f64) -> Option<Self> {
        if (self.alpha - other.alpha).abs() > f64::EPSILON {
            return None;
        }
        Some(Self::rgba(
            op(self.red, other.red),
            op(self.green, other.green),
            op(self.blue, other.blue),
            self.alpha,
        ))
    }

    pub fn map_channels(&self, op: impl Fn(f64) -> f64) -> Self {
        Self::rgba(op(self.red), op(self.green), op(self.blue), self.alpha)
    }

    fn channel_bytes(&self) -> (u8, u8, u8) {
        let byte = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        (byte(self.red), byte(self.green), byte(self.blue))
    }

    /// Compare by channel value, ignoring spelling
    pub fn same_color(&self, other: &Color) -> bool {
        self.channel_bytes() == other.channel_bytes() && (self.alpha - other.alpha).abs() < 1e-6
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(repr) = &self.repr {
            return write!(f, "{}", repr);
        }
        let (r, g, b) = self.channel_bytes();
        if self.alpha >= 1.0 {
            write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", r, g, b, format_number(self.alpha))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing_keeps_spelling() {
        let color = Color::from_hex("#FFF").unwrap();
        assert_eq!(color.red, 255.0);
        assert_eq!(color.to_string(), "#FFF");

        let color = Color::from_hex("#00000080").unwrap();
        assert!((color.alpha - 128.0 / 255.0).abs() < 1e-9);

        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#main").is_none());
    }

    #[test]
    fn test_modified_color_prints_hex() {
        let color = Color::from_hex("#336699").unwrap().map_channels(|c| c);
        assert_eq!(color.to_string(), "#336699");
        assert_eq!(Color::rgba(0.0, 0.0, 0.0, 0.5).to_string(), "rgba(0, 0, 0, 0.5)");
    }

    #[test]
    fn test_hsl_round_trip_of_primary() {
        let red = Color::named("red").unwrap();
        let (h, s, l) = red.to_hsl();
        assert_eq!((h, s, l), (0.0, 100.0, 50.0));
        let back = Color::from_hsla(h, s, l, 1.0);
        assert!(back.same_color(&red));
    }

    #[test]
    fn test_darken_clamps() {
        let color = Color::from_hex("#800000").unwrap();
        assert_eq!(color.adjust_lightness(-10.0).to_string(), "#4d0000");
        assert_eq!(color.adjust_lightness(-200.0).to_string(), "#000000");
        assert_eq!(color.adjust_lightness(200.0).to_string(), "#ffffff");
    }
}
