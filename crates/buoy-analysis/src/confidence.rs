use std::cmp::Ordering;

use buoy_config::{ConfidenceConfig, ConfidenceLevel};
use buoy_core::value::{parse_color, parse_spacing_px, to_px};
use buoy_core::{DesignToken, HardcodedKind, HardcodedValue, TokenCandidate, TokenValue};
use serde::{Deserialize, Serialize};

const SCALE_BASES: [f64; 3] = [8.0, 4.0, 2.0];
const DEFAULT_SCALE_BASE: f64 = 4.0;
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    pub level: ConfidenceLevel,
    /// 0.0 ..= 1.0, higher is closer.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<TokenCandidate>,
    pub reason: String,
}

impl ConfidenceResult {
    fn unmatched(reason: impl Into<String>) -> Self {
        Self {
            level: ConfidenceLevel::Low,
            score: 0.0,
            suggestion: None,
            reason: reason.into(),
        }
    }

    pub fn meets(&self, minimum: ConfidenceLevel) -> bool {
        self.suggestion.is_some() && self.level >= minimum
    }
}

/// Rates how well a literal value maps onto the closest design token.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    config: ConfidenceConfig,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::from_config(&ConfidenceConfig::default())
    }
}

struct Ranked<'a> {
    token: &'a DesignToken,
    distance: f64,
}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ConfidenceConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &ConfidenceConfig {
        &self.config
    }

    pub fn score_confidence(&self, value: &HardcodedValue, tokens: &[DesignToken]) -> ConfidenceResult {
        match value.kind {
            HardcodedKind::Color => self.score_color_confidence(&value.value, tokens),
            HardcodedKind::Spacing => self.score_spacing_confidence(&value.value, tokens),
            HardcodedKind::FontSize => self.score_font_size_confidence(&value.value, tokens),
            other => ConfidenceResult::unmatched(format!("no scorer for {} values", other.as_str())),
        }
    }

    pub fn score_color_confidence(&self, raw: &str, tokens: &[DesignToken]) -> ConfidenceResult {
        let Some(ranked) = self.rank_colors(raw, tokens) else {
            return ConfidenceResult::unmatched(format!("'{raw}' is not a color"));
        };
        let Some(best) = ranked.first() else {
            return ConfidenceResult::unmatched("no color tokens to compare against");
        };

        let level = if best.distance <= self.config.color_high_distance {
            ConfidenceLevel::High
        } else if best.distance <= self.config.color_medium_distance {
            ConfidenceLevel::Medium
        } else if best.distance <= self.config.color_max_distance {
            ConfidenceLevel::Low
        } else {
            return ConfidenceResult::unmatched(format!(
                "nearest color token '{}' is {:.1} away",
                best.token.name, best.distance
            ));
        };

        let score = 1.0 - best.distance / self.config.color_max_distance.max(EPSILON);
        ConfidenceResult {
            level,
            score: score.clamp(0.0, 1.0),
            suggestion: Some(candidate(best, level)),
            reason: format!(
                "color distance {:.1} to '{}'",
                best.distance, best.token.name
            ),
        }
    }

    pub fn score_spacing_confidence(&self, raw: &str, tokens: &[DesignToken]) -> ConfidenceResult {
        let Some(px) = parse_spacing_px(raw, self.config.rem_base_px) else {
            return ConfidenceResult::unmatched(format!("'{raw}' is not a spacing value"));
        };
        let scale = tokens
            .iter()
            .filter_map(|token| self.spacing_px(token).map(|value| (token, value)))
            .collect::<Vec<_>>();
        self.score_on_scale(px, &scale, "spacing")
    }

    fn score_font_size_confidence(&self, raw: &str, tokens: &[DesignToken]) -> ConfidenceResult {
        let Some(px) = parse_spacing_px(raw, self.config.rem_base_px) else {
            return ConfidenceResult::unmatched(format!("'{raw}' is not a font size"));
        };
        let scale = tokens
            .iter()
            .filter_map(|token| match token.value {
                TokenValue::Typography { font_size, .. } => Some((token, font_size)),
                _ => None,
            })
            .collect::<Vec<_>>();
        self.score_on_scale(px, &scale, "font size")
    }

    /// Candidates for a literal, nearest first, limited to those inside the
    /// scorer's acceptance window.
    pub fn candidates(
        &self,
        value: &HardcodedValue,
        tokens: &[DesignToken],
        limit: usize,
    ) -> Vec<TokenCandidate> {
        let ranked = match value.kind {
            HardcodedKind::Color => self
                .rank_colors(&value.value, tokens)
                .unwrap_or_default()
                .into_iter()
                .filter(|entry| entry.distance <= self.config.color_max_distance)
                .map(|entry| {
                    let level = self.color_level(entry.distance);
                    candidate(&entry, level)
                })
                .collect::<Vec<_>>(),
            HardcodedKind::Spacing => {
                let Some(px) = parse_spacing_px(&value.value, self.config.rem_base_px) else {
                    return Vec::new();
                };
                let scale = tokens
                    .iter()
                    .filter_map(|token| self.spacing_px(token).map(|value| (token, value)))
                    .collect::<Vec<_>>();
                let base = infer_scale_base(&scale);
                let window = self.config.spacing_max_steps * base;
                rank_numeric(px, &scale)
                    .into_iter()
                    .filter(|entry| entry.distance <= window + EPSILON)
                    .map(|entry| {
                        let level = scale_level(entry.distance, base);
                        candidate(&entry, level)
                    })
                    .collect()
            }
            _ => {
                let result = self.score_confidence(value, tokens);
                result.suggestion.into_iter().collect()
            }
        };
        ranked.into_iter().take(limit).collect()
    }

    fn score_on_scale(
        &self,
        px: f64,
        scale: &[(&DesignToken, f64)],
        label: &str,
    ) -> ConfidenceResult {
        let base = infer_scale_base(scale);
        let ranked = rank_numeric(px, scale);
        let Some(best) = ranked.first() else {
            return ConfidenceResult::unmatched(format!("no {label} tokens to compare against"));
        };

        let window = self.config.spacing_max_steps * base;
        if best.distance > window + EPSILON {
            return ConfidenceResult::unmatched(format!(
                "nearest {label} token '{}' is {}px away on a {}px scale",
                best.token.name, best.distance, base
            ));
        }
        let level = scale_level(best.distance, base);
        let score = 1.0 - best.distance / window.max(EPSILON);
        ConfidenceResult {
            level,
            score: score.clamp(0.0, 1.0),
            suggestion: Some(candidate(best, level)),
            reason: format!(
                "{}px off '{}' on a {}px {label} scale",
                best.distance, best.token.name, base
            ),
        }
    }

    fn rank_colors<'a>(&self, raw: &str, tokens: &'a [DesignToken]) -> Option<Vec<Ranked<'a>>> {
        let color = parse_color(raw)?;
        let mut ranked = tokens
            .iter()
            .filter_map(|token| {
                let token_color = match &token.value {
                    TokenValue::Color { hex } => parse_color(hex),
                    TokenValue::Raw { value } => parse_color(value),
                    _ => None,
                }?;
                Some(Ranked {
                    token,
                    distance: color.distance(token_color),
                })
            })
            .collect::<Vec<_>>();
        ranked.sort_by(compare_ranked);
        Some(ranked)
    }

    fn color_level(&self, distance: f64) -> ConfidenceLevel {
        if distance <= self.config.color_high_distance {
            ConfidenceLevel::High
        } else if distance <= self.config.color_medium_distance {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    fn spacing_px(&self, token: &DesignToken) -> Option<f64> {
        match &token.value {
            TokenValue::Spacing { value, unit } => Some(to_px(*value, *unit, self.config.rem_base_px)),
            TokenValue::Raw { value } => parse_spacing_px(value, self.config.rem_base_px),
            _ => None,
        }
    }
}

fn rank_numeric<'a>(px: f64, scale: &[(&'a DesignToken, f64)]) -> Vec<Ranked<'a>> {
    let mut ranked = scale
        .iter()
        .map(|(token, value)| Ranked {
            token: *token,
            distance: (px - value).abs(),
        })
        .collect::<Vec<_>>();
    ranked.sort_by(compare_ranked);
    ranked
}

/// Nearest first; equal distances prefer the more-used token, then the name.
fn compare_ranked(left: &Ranked<'_>, right: &Ranked<'_>) -> Ordering {
    left.distance
        .total_cmp(&right.distance)
        .then_with(|| right.token.usage_count().cmp(&left.token.usage_count()))
        .then_with(|| left.token.name.cmp(&right.token.name))
}

/// Largest of 8, 4, 2 that divides every non-zero value on the scale.
fn infer_scale_base(scale: &[(&DesignToken, f64)]) -> f64 {
    let values = scale
        .iter()
        .map(|(_, value)| *value)
        .filter(|value| value.abs() > EPSILON)
        .collect::<Vec<_>>();
    if values.is_empty() {
        return DEFAULT_SCALE_BASE;
    }
    SCALE_BASES
        .into_iter()
        .find(|base| {
            values
                .iter()
                .all(|value| (value / base - (value / base).round()).abs() < EPSILON)
        })
        .unwrap_or(DEFAULT_SCALE_BASE)
}

fn scale_level(distance: f64, base: f64) -> ConfidenceLevel {
    if distance < EPSILON {
        ConfidenceLevel::High
    } else if distance <= base / 2.0 + EPSILON {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

fn candidate(entry: &Ranked<'_>, level: ConfidenceLevel) -> TokenCandidate {
    TokenCandidate {
        token_id: entry.token.id.clone(),
        token_name: entry.token.name.clone(),
        value: entry.token.value.display(),
        confidence: level.as_str().to_owned(),
        distance: entry.distance,
    }
}
