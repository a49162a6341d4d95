use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUOY_DIR_NAME: &str = ".buoy";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_BACKUP_EXTENSION: &str = "bak";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    #[default]
    High,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for ConfidenceLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!(
                "invalid confidence '{other}', expected one of: low, medium, high"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BuoyConfig {
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub fix: FixConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default)]
    pub fuzzy_matching: bool,
    #[serde(default = "default_naming_majority_share")]
    pub naming_majority_share: f64,
    /// Extra UI framework names appended to the built-in list.
    #[serde(default)]
    pub ui_frameworks: Vec<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            fuzzy_matching: false,
            naming_majority_share: default_naming_majority_share(),
            ui_frameworks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    #[serde(default = "default_color_high_distance")]
    pub color_high_distance: f64,
    #[serde(default = "default_color_medium_distance")]
    pub color_medium_distance: f64,
    #[serde(default = "default_color_max_distance")]
    pub color_max_distance: f64,
    #[serde(default = "default_rem_base_px")]
    pub rem_base_px: f64,
    /// Spacing candidates further than this many scale steps are not suggested.
    #[serde(default = "default_spacing_max_steps")]
    pub spacing_max_steps: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            color_high_distance: default_color_high_distance(),
            color_medium_distance: default_color_medium_distance(),
            color_max_distance: default_color_max_distance(),
            rem_base_px: default_rem_base_px(),
            spacing_max_steps: default_spacing_max_steps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_impact_max_depth")]
    pub impact_max_depth: u32,
    #[serde(default = "default_impact_medium_dependents")]
    pub impact_medium_dependents: usize,
    #[serde(default = "default_impact_high_dependents")]
    pub impact_high_dependents: usize,
    #[serde(default = "default_repeat_offender_threshold")]
    pub repeat_offender_threshold: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            impact_max_depth: default_impact_max_depth(),
            impact_medium_dependents: default_impact_medium_dependents(),
            impact_high_dependents: default_impact_high_dependents(),
            repeat_offender_threshold: default_repeat_offender_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixConfig {
    #[serde(default)]
    pub min_confidence: ConfidenceLevel,
    #[serde(default = "default_max_edits_per_file")]
    pub max_edits_per_file: usize,
    #[serde(default = "default_backup_extension")]
    pub backup_extension: String,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            min_confidence: ConfidenceLevel::High,
            max_edits_per_file: default_max_edits_per_file(),
            backup_extension: default_backup_extension(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn buoy_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(BUOY_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    buoy_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(workspace_root: impl AsRef<Path>) -> Result<BuoyConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(BuoyConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: BuoyConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<BuoyConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(buoy_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = BuoyConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

/// Returns one message per setting that cannot be honored.
pub fn validate_config(config: &BuoyConfig) -> Vec<String> {
    let mut problems = Vec::new();
    let confidence = &config.confidence;
    if confidence.color_high_distance > confidence.color_medium_distance {
        problems.push(format!(
            "confidence.color_high_distance ({}) must not exceed color_medium_distance ({})",
            confidence.color_high_distance, confidence.color_medium_distance
        ));
    }
    if confidence.color_medium_distance > confidence.color_max_distance {
        problems.push(format!(
            "confidence.color_medium_distance ({}) must not exceed color_max_distance ({})",
            confidence.color_medium_distance, confidence.color_max_distance
        ));
    }
    if confidence.rem_base_px <= 0.0 {
        problems.push("confidence.rem_base_px must be positive".to_owned());
    }
    if config.graph.impact_medium_dependents > config.graph.impact_high_dependents {
        problems.push(format!(
            "graph.impact_medium_dependents ({}) must not exceed impact_high_dependents ({})",
            config.graph.impact_medium_dependents, config.graph.impact_high_dependents
        ));
    }
    if config.fix.max_edits_per_file == 0 {
        problems.push("fix.max_edits_per_file must be at least 1".to_owned());
    }
    problems
}

fn normalize_config(mut config: BuoyConfig) -> BuoyConfig {
    config.diff.naming_majority_share = config.diff.naming_majority_share.clamp(0.0, 1.0);
    config.diff.ui_frameworks = config
        .diff
        .ui_frameworks
        .iter()
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    config.confidence.color_high_distance = config.confidence.color_high_distance.max(0.0);
    config.confidence.color_medium_distance = config.confidence.color_medium_distance.max(0.0);
    config.confidence.color_max_distance = config.confidence.color_max_distance.max(0.0);
    config.confidence.spacing_max_steps = config.confidence.spacing_max_steps.max(0.0);

    config.graph.impact_max_depth = config.graph.impact_max_depth.max(1);

    let extension = config.fix.backup_extension.trim().trim_start_matches('.');
    if extension.is_empty() {
        config.fix.backup_extension = default_backup_extension();
    } else {
        config.fix.backup_extension = extension.to_owned();
    }

    config
}

fn default_naming_majority_share() -> f64 {
    0.6
}

fn default_color_high_distance() -> f64 {
    5.0
}

fn default_color_medium_distance() -> f64 {
    25.0
}

fn default_color_max_distance() -> f64 {
    60.0
}

fn default_rem_base_px() -> f64 {
    16.0
}

fn default_spacing_max_steps() -> f64 {
    2.0
}

fn default_impact_max_depth() -> u32 {
    3
}

fn default_impact_medium_dependents() -> usize {
    5
}

fn default_impact_high_dependents() -> usize {
    15
}

fn default_repeat_offender_threshold() -> usize {
    3
}

fn default_max_edits_per_file() -> usize {
    50
}

fn default_backup_extension() -> String {
    DEFAULT_BACKUP_EXTENSION.to_owned()
}
