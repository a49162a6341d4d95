use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

mod component;
mod signal;
mod token;
pub mod value;

pub use component::{
    Component, ComponentMetadata, ComponentSource, HardcodedKind, HardcodedValue, PropDefinition,
    Variant,
};
pub use signal::{
    DriftDetails, DriftSignal, DriftType, EntityRef, EntityType, GitContext, Resolution,
    ResolutionKind, Severity, TokenCandidate,
};
pub use token::{DesignToken, TokenCategory, TokenMetadata, TokenSource, TokenValue};

pub type EntityId = String;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid {kind} record '{name}': {reason}")]
    InvalidRecord {
        kind: &'static str,
        name: String,
        reason: String,
    },
}

pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Stable id for a scanned entity. Identical inputs always produce the same id.
pub fn stable_entity_id(source_kind: &str, location_key: &str, name: &str) -> EntityId {
    let material = format!(
        "{}\n{}\n{}",
        source_kind.trim(),
        normalize_path(location_key.trim()),
        name.trim()
    );
    blake3_hex(material.as_bytes())
}

/// Stable id for a drift signal, so re-detecting the same drift across scans is idempotent.
pub fn stable_signal_id(drift_type: DriftType, source_key: &str, target_key: Option<&str>) -> EntityId {
    let material = format!(
        "drift\n{}\n{}\n{}",
        drift_type.as_str(),
        source_key,
        target_key.unwrap_or_default()
    );
    blake3_hex(material.as_bytes())
}

pub fn content_hash(content: &str) -> String {
    blake3_hex(content.as_bytes())
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_millis() as i64)
        .unwrap_or(0)
}

fn blake3_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
