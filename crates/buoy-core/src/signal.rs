use serde::{Deserialize, Serialize};

use crate::{EntityId, stable_signal_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "kebab-case")]
pub enum DriftType {
    DeprecatedPattern,
    AccessibilityConflict,
    SemanticMismatch,
    OrphanedComponent,
    OrphanedToken,
    ValueDivergence,
    NamingInconsistency,
    MissingDocumentation,
    HardcodedValue,
    FrameworkSprawl,
    RepeatedPattern,
}

impl DriftType {
    pub const ALL: [DriftType; 11] = [
        Self::DeprecatedPattern,
        Self::AccessibilityConflict,
        Self::SemanticMismatch,
        Self::OrphanedComponent,
        Self::OrphanedToken,
        Self::ValueDivergence,
        Self::NamingInconsistency,
        Self::MissingDocumentation,
        Self::HardcodedValue,
        Self::FrameworkSprawl,
        Self::RepeatedPattern,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeprecatedPattern => "deprecated-pattern",
            Self::AccessibilityConflict => "accessibility-conflict",
            Self::SemanticMismatch => "semantic-mismatch",
            Self::OrphanedComponent => "orphaned-component",
            Self::OrphanedToken => "orphaned-token",
            Self::ValueDivergence => "value-divergence",
            Self::NamingInconsistency => "naming-inconsistency",
            Self::MissingDocumentation => "missing-documentation",
            Self::HardcodedValue => "hardcoded-value",
            Self::FrameworkSprawl => "framework-sprawl",
            Self::RepeatedPattern => "repeated-pattern",
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            Self::AccessibilityConflict => Severity::Critical,
            Self::DeprecatedPattern
            | Self::SemanticMismatch
            | Self::ValueDivergence
            | Self::HardcodedValue
            | Self::FrameworkSprawl => Severity::Warning,
            Self::OrphanedComponent
            | Self::OrphanedToken
            | Self::NamingInconsistency
            | Self::MissingDocumentation
            | Self::RepeatedPattern => Severity::Info,
        }
    }
}

impl std::str::FromStr for DriftType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown drift type '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Component,
    Token,
    File,
    Project,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Token => "token",
            Self::File => "file",
            Self::Project => "project",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub entity_name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCandidate {
    pub token_id: EntityId,
    pub token_name: String,
    pub value: String,
    pub confidence: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DriftDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(default)]
    pub affected_files: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub token_candidates: Vec<TokenCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_context: Option<GitContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    Ignored,
    Fixed,
    Documented,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub kind: ResolutionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSignal {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub drift_type: DriftType,
    pub severity: Severity,
    pub source: EntityRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityRef>,
    pub message: String,
    #[serde(default)]
    pub details: DriftDetails,
    pub detected_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl DriftSignal {
    /// Builds a signal with the type's default severity. The id is derived from
    /// the type, the source entity id and the target entity id.
    pub fn new(
        drift_type: DriftType,
        source: EntityRef,
        target: Option<EntityRef>,
        message: impl Into<String>,
        detected_at: i64,
    ) -> Self {
        let id = stable_signal_id(
            drift_type,
            source.entity_id.as_str(),
            target.as_ref().map(|target| target.entity_id.as_str()),
        );
        Self::with_id(id, drift_type, source, target, message, detected_at)
    }

    /// Same as [`DriftSignal::new`] but with an explicit identity key for the source,
    /// for checks that can fire more than once per entity.
    pub fn keyed(
        drift_type: DriftType,
        source_key: &str,
        source: EntityRef,
        target: Option<EntityRef>,
        message: impl Into<String>,
        detected_at: i64,
    ) -> Self {
        let id = stable_signal_id(
            drift_type,
            source_key,
            target.as_ref().map(|target| target.entity_id.as_str()),
        );
        Self::with_id(id, drift_type, source, target, message, detected_at)
    }

    fn with_id(
        id: EntityId,
        drift_type: DriftType,
        source: EntityRef,
        target: Option<EntityRef>,
        message: impl Into<String>,
        detected_at: i64,
    ) -> Self {
        Self {
            id,
            drift_type,
            severity: drift_type.default_severity(),
            source,
            target,
            message: message.into(),
            details: DriftDetails::default(),
            detected_at,
            resolved_at: None,
            resolution: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_details(mut self, details: DriftDetails) -> Self {
        self.details = details;
        self
    }

    /// Records a resolution. The signal keeps its id and detection time.
    pub fn resolve(mut self, resolution: Resolution, resolved_at: i64) -> Self {
        self.resolved_at = Some(resolved_at);
        self.resolution = Some(resolution);
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// File the signal points at, taken from the source location.
    pub fn source_file(&self) -> Option<String> {
        let location = self.source.location.trim();
        if location.is_empty() || self.source.entity_type == EntityType::Project {
            return None;
        }
        let path = match location.split_once(':') {
            Some((path, rest)) if rest.split(':').all(|part| part.parse::<u32>().is_ok()) => path,
            _ => location,
        };
        Some(path.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component_ref(id: &str) -> EntityRef {
        EntityRef {
            entity_type: EntityType::Component,
            entity_id: id.to_owned(),
            entity_name: "Button".to_owned(),
            location: "src/Button.tsx:4:2".to_owned(),
        }
    }

    #[test]
    fn severity_defaults_follow_drift_type() {
        let signal = DriftSignal::new(
            DriftType::OrphanedComponent,
            component_ref("cmp-1"),
            None,
            "orphan",
            10,
        );
        assert_eq!(signal.severity, Severity::Info);
        let overridden = signal.with_severity(Severity::Critical);
        assert_eq!(overridden.severity, Severity::Critical);
        assert!(Severity::Info < Severity::Warning && Severity::Warning < Severity::Critical);
    }

    #[test]
    fn resolving_keeps_identity_and_detection_time() {
        let signal = DriftSignal::new(
            DriftType::DeprecatedPattern,
            component_ref("cmp-1"),
            None,
            "deprecated",
            10,
        );
        let id = signal.id.clone();
        let resolved = signal.resolve(
            Resolution {
                kind: ResolutionKind::Documented,
                reason: Some("kept for legacy pages".to_owned()),
                resolved_by: Some("dana".to_owned()),
            },
            99,
        );
        assert!(resolved.is_resolved());
        assert_eq!(resolved.id, id);
        assert_eq!(resolved.detected_at, 10);
        assert_eq!(resolved.resolved_at, Some(99));
    }

    #[test]
    fn drift_type_round_trips_through_kebab_names() {
        for kind in DriftType::ALL {
            assert_eq!(kind.as_str().parse::<DriftType>(), Ok(kind));
        }
        let json = serde_json::to_string(&DriftType::HardcodedValue).expect("serialize");
        assert_eq!(json, "\"hardcoded-value\"");
    }

    #[test]
    fn source_file_strips_line_and_column() {
        let signal = DriftSignal::new(
            DriftType::HardcodedValue,
            component_ref("cmp-1"),
            None,
            "hardcoded",
            1,
        );
        assert_eq!(signal.source_file().as_deref(), Some("src/Button.tsx"));
    }
}
