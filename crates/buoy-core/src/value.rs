//! Parsing of literal style values into comparable numeric forms.

use serde::{Deserialize, Serialize};

pub const DEFAULT_REM_BASE_PX: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn to_hex(self) -> String {
        if self.a == u8::MAX {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Euclidean distance in RGB space, 0.0 ..= ~441.7. Alpha is ignored.
    pub fn distance(self, other: Rgba) -> f64 {
        let dr = f64::from(self.r) - f64::from(other.r);
        let dg = f64::from(self.g) - f64::from(other.g);
        let db = f64::from(self.b) - f64::from(other.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// Parses `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(..)` and `rgba(..)`.
pub fn parse_color(raw: &str) -> Option<Rgba> {
    let value = raw.trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    let inner = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts = inner
        .split(|ch: char| ch == ',' || ch == '/' || ch.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |part: &str| -> Option<u8> {
        let number = part.parse::<f64>().ok()?;
        (0.0..=255.0)
            .contains(&number)
            .then(|| number.round() as u8)
    };
    let alpha = match parts.get(3) {
        Some(part) => {
            let number = match part.strip_suffix('%') {
                Some(percent) => percent.parse::<f64>().ok()? / 100.0,
                None => part.parse::<f64>().ok()?,
            };
            (number.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        None => u8::MAX,
    };
    Some(Rgba {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
        a: alpha,
    })
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let expanded = match hex.len() {
        3 | 4 => hex.chars().flat_map(|ch| [ch, ch]).collect::<String>(),
        6 | 8 => hex.to_owned(),
        _ => return None,
    };
    let byte = |index: usize| u8::from_str_radix(&expanded[index..index + 2], 16).ok();
    Some(Rgba {
        r: byte(0)?,
        g: byte(2)?,
        b: byte(4)?,
        a: if expanded.len() == 8 { byte(6)? } else { u8::MAX },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacingUnit {
    Px,
    Rem,
    Em,
}

impl SpacingUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Px => "px",
            Self::Rem => "rem",
            Self::Em => "em",
        }
    }
}

/// Parses `16px`, `1rem`, `1.5em` or a bare number (pixels) into pixels.
pub fn parse_spacing_px(raw: &str, rem_base_px: f64) -> Option<f64> {
    let value = raw.trim().to_ascii_lowercase();
    let (number, unit) = if let Some(number) = value.strip_suffix("rem") {
        (number, SpacingUnit::Rem)
    } else if let Some(number) = value.strip_suffix("em") {
        (number, SpacingUnit::Em)
    } else if let Some(number) = value.strip_suffix("px") {
        (number, SpacingUnit::Px)
    } else {
        (value.as_str(), SpacingUnit::Px)
    };
    let number = number.trim().parse::<f64>().ok()?;
    if !number.is_finite() {
        return None;
    }
    Some(to_px(number, unit, rem_base_px))
}

pub fn to_px(value: f64, unit: SpacingUnit, rem_base_px: f64) -> f64 {
    match unit {
        SpacingUnit::Px => value,
        SpacingUnit::Rem | SpacingUnit::Em => value * rem_base_px,
    }
}
