//! Color interpolation and value formatting.
//!
//! Heat-map cells get a color interpolated linearly (per RGB channel)
//! between the definition's two gradient endpoints; legends get magnitude-
//! abbreviated labels (`1.5M`, `2.5K`, `42`).

use crate::model::{DEFAULT_COLOR_MAX, DEFAULT_COLOR_MIN};

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse `#RRGGBB` (or the `#RGB` shorthand). Case-insensitive.
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        let expanded: String = match digits.len() {
            6 => digits.to_string(),
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            _ => return None,
        };
        if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            r: u8::from_str_radix(&expanded[0..2], 16).ok()?,
            g: u8::from_str_radix(&expanded[2..4], 16).ok()?,
            b: u8::from_str_radix(&expanded[4..6], 16).ok()?,
        })
    }

    /// Like [`Rgb::parse_hex`], falling back to a default on bad input.
    pub fn parse_or(hex: &str, default: &str) -> Self {
        Self::parse_hex(hex)
            .or_else(|| Self::parse_hex(default))
            .unwrap_or(Self { r: 0, g: 0, b: 0 })
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// CSS `rgba(r, g, b, a)` string, for chart series colors.
    pub fn to_rgba(self, alpha: f64) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
    }

    /// Linear blend toward `other`, with `t` clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let channel = |a: u8, b: u8| (a as f64 + t * (b as f64 - a as f64)).round() as u8;
        Rgb {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }
}

/// Map `value` in [min, max] to an interpolated hex color.
///
/// A degenerate range (`max <= min`) always yields `color_max`: there is no
/// gradient to place the value on, and "uniform/maximum" reads better than
/// a divide-by-zero artifact.
pub fn interpolate(color_min: &str, color_max: &str, min: f64, max: f64, value: f64) -> String {
    let lo = Rgb::parse_or(color_min, DEFAULT_COLOR_MIN);
    let hi = Rgb::parse_or(color_max, DEFAULT_COLOR_MAX);
    let t = if max <= min {
        1.0
    } else {
        (value - min) / (max - min)
    };
    lo.lerp(hi, t).to_hex()
}

/// Abbreviate a value for legend and cell labels.
///
/// |v| ≥ 1 000 000 → `N.NM`; |v| ≥ 1 000 → `N.NK`; otherwise a grouped
/// integer.
pub fn format_number(value: f64) -> String {
    if value.abs() >= 1_000_000.0 {
        format!("{}M", format_grouped(value / 1_000_000.0, 1))
    } else if value.abs() >= 1_000.0 {
        format!("{}K", format_grouped(value / 1_000.0, 1))
    } else {
        format_grouped(value, 0)
    }
}

/// Fixed-point formatting with thousands grouping of the integer part.
fn format_grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (number, fraction) = match formatted.split_once('.') {
        Some((n, f)) => (n, Some(f)),
        None => (formatted.as_str(), None),
    };
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// A two-point gradient legend with abbreviated range labels.
///
/// Built from the full (pre-truncation) value range so it stays truthful
/// even when the display window hides rows or columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub color_min: String,
    pub color_max: String,
    pub min_label: String,
    pub max_label: String,
}

impl Legend {
    pub fn new(color_min: &str, color_max: &str, min_value: f64, max_value: f64) -> Self {
        Self {
            color_min: Rgb::parse_or(color_min, DEFAULT_COLOR_MIN).to_hex(),
            color_max: Rgb::parse_or(color_max, DEFAULT_COLOR_MAX).to_hex(),
            min_label: format_number(min_value),
            max_label: format_number(max_value),
        }
    }

    /// CSS background for the gradient bar.
    pub fn gradient_css(&self) -> String {
        format!(
            "linear-gradient(90deg, {}, {})",
            self.color_min, self.color_max
        )
    }
}
