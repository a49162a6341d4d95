use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{DEFAULT_REM_BASE_PX, SpacingUnit, parse_color, to_px};
use crate::{EntityId, ModelError, normalize_path, stable_entity_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum TokenCategory {
    Color,
    Spacing,
    Typography,
    Shadow,
    Border,
    Other,
}

impl TokenCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Spacing => "spacing",
            Self::Typography => "typography",
            Self::Shadow => "shadow",
            Self::Border => "border",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenValue {
    Color {
        hex: String,
    },
    Spacing {
        value: f64,
        unit: SpacingUnit,
    },
    Typography {
        font_family: String,
        font_size: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_weight: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line_height: Option<f64>,
    },
    Shadow {
        offset_x: f64,
        offset_y: f64,
        blur: f64,
        #[serde(default)]
        spread: f64,
        color: String,
    },
    Border {
        width: f64,
        style: String,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius: Option<f64>,
    },
    Raw {
        value: String,
    },
}

impl TokenValue {
    /// Canonical text used to decide whether two tokens carry the same value,
    /// with `rem`/`em` resolved against the default 16px base.
    pub fn normalized(&self) -> String {
        self.normalized_with(DEFAULT_REM_BASE_PX)
    }

    pub fn normalized_with(&self, rem_base_px: f64) -> String {
        match self {
            Self::Color { hex } => normalize_color(hex),
            Self::Spacing { value, unit } => {
                format!("{}px", trim_float(to_px(*value, *unit, rem_base_px)))
            }
            Self::Typography {
                font_family,
                font_size,
                font_weight,
                line_height,
            } => format!(
                "{}|{}|{}|{}",
                font_family.trim().to_ascii_lowercase(),
                trim_float(*font_size),
                font_weight.map(|weight| weight.to_string()).unwrap_or_default(),
                line_height.map(trim_float).unwrap_or_default()
            ),
            Self::Shadow {
                offset_x,
                offset_y,
                blur,
                spread,
                color,
            } => format!(
                "{} {} {} {} {}",
                trim_float(*offset_x),
                trim_float(*offset_y),
                trim_float(*blur),
                trim_float(*spread),
                normalize_color(color)
            ),
            Self::Border {
                width,
                style,
                color,
                radius,
            } => format!(
                "{} {} {} {}",
                trim_float(*width),
                style.trim().to_ascii_lowercase(),
                normalize_color(color),
                radius.map(trim_float).unwrap_or_default()
            ),
            Self::Raw { value } => value.trim().to_ascii_lowercase(),
        }
    }

    /// Human-readable form for messages and reports.
    pub fn display(&self) -> String {
        match self {
            Self::Color { hex } => hex.clone(),
            Self::Spacing { value, unit } => format!("{}{}", trim_float(*value), unit.as_str()),
            Self::Raw { value } => value.clone(),
            _ => self.normalized(),
        }
    }
}

fn normalize_color(raw: &str) -> String {
    parse_color(raw)
        .map(|color| color.to_hex())
        .unwrap_or_else(|| raw.trim().to_ascii_lowercase())
}

fn trim_float(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenSource {
    Css { path: String },
    Json { path: String },
    DesignTool { file_key: String },
}

impl TokenSource {
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Self::Css { .. } => "css",
            Self::Json { .. } => "json",
            Self::DesignTool { .. } => "design_tool",
        }
    }

    pub fn location_key(&self) -> String {
        match self {
            Self::Css { path } | Self::Json { path } => normalize_path(path),
            Self::DesignTool { file_key } => file_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignToken {
    pub id: EntityId,
    pub name: String,
    pub value: TokenValue,
    pub category: TokenCategory,
    pub source: TokenSource,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub used_by: Vec<String>,
    #[serde(default)]
    pub metadata: TokenMetadata,
    pub scanned_at: i64,
}

impl DesignToken {
    pub fn new(
        name: impl Into<String>,
        value: TokenValue,
        category: TokenCategory,
        source: TokenSource,
        scanned_at: i64,
    ) -> Self {
        let name = name.into();
        let id = stable_entity_id(source.kind_tag(), &source.location_key(), &name);
        Self {
            id,
            name,
            value,
            category,
            source,
            aliases: Vec::new(),
            used_by: Vec::new(),
            metadata: TokenMetadata::default(),
            scanned_at,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.trim().is_empty() {
            return Err(ModelError::InvalidRecord {
                kind: "token",
                name: self.name.clone(),
                reason: "token has no name".to_owned(),
            });
        }
        if self.id.trim().is_empty() {
            return Err(ModelError::InvalidRecord {
                kind: "token",
                name: self.name.clone(),
                reason: "token has no id".to_owned(),
            });
        }
        Ok(())
    }

    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }

    pub fn usage_count(&self) -> usize {
        self.used_by.len()
    }
}
