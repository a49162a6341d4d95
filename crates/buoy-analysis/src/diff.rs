use std::collections::{HashMap, HashSet};
use std::path::Path;

use buoy_config::{BuoyConfig, DiffConfig, load_workspace_config};
use buoy_core::{
    Component, DesignToken, DriftDetails, DriftSignal, DriftType, EntityRef, EntityType,
    HardcodedValue, now_millis,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::AnalysisError;
use crate::confidence::ConfidenceScorer;

/// UI libraries and the meta-frameworks built on them. Server-side libraries
/// never count towards sprawl.
const UI_FRAMEWORKS: &[&str] = &[
    "react",
    "react-native",
    "preact",
    "vue",
    "svelte",
    "angular",
    "solid",
    "lit",
    "stencil",
    "qwik",
    "ember",
    "alpine",
    "next",
    "nextjs",
    "nuxt",
    "sveltekit",
    "remix",
    "astro",
    "gatsby",
    "expo",
];

const NORMALIZED_MATCH_CONFIDENCE: f64 = 0.9;
const MAX_TOKEN_CANDIDATES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl FrameworkInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropDifferenceKind {
    MissingInTarget,
    MissingInSource,
    TypeChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropDifference {
    pub prop: String,
    pub kind: PropDifferenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMatch {
    pub source_id: String,
    pub target_id: String,
    pub name: String,
    pub match_type: MatchType,
    pub confidence: f64,
    #[serde(default)]
    pub differences: Vec<PropDifference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ComponentComparison {
    pub matches: Vec<ComponentMatch>,
    pub orphaned_source: Vec<Component>,
    pub orphaned_target: Vec<Component>,
    pub drift_signals: Vec<DriftSignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMatch {
    pub source_id: String,
    pub target_id: String,
    pub name: String,
    pub match_type: MatchType,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TokenComparison {
    pub matches: Vec<TokenMatch>,
    pub orphaned_source: Vec<DesignToken>,
    pub orphaned_target: Vec<DesignToken>,
    pub drift_signals: Vec<DriftSignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    #[serde(default)]
    pub check_deprecated: bool,
    #[serde(default)]
    pub check_hardcoded: bool,
    #[serde(default)]
    pub check_naming: bool,
    #[serde(default)]
    pub check_documentation: bool,
    /// Tokens offered as replacements for hardcoded values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_tokens: Option<Vec<DesignToken>>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            check_deprecated: true,
            check_hardcoded: true,
            check_naming: false,
            check_documentation: false,
            available_tokens: None,
        }
    }
}

impl AnalysisOptions {
    pub fn all() -> Self {
        Self {
            check_deprecated: true,
            check_hardcoded: true,
            check_naming: true,
            check_documentation: true,
            available_tokens: None,
        }
    }

    pub fn with_tokens(mut self, tokens: Vec<DesignToken>) -> Self {
        self.available_tokens = Some(tokens);
        self
    }
}

/// A record the engine refused to analyze. The rest of the batch still runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub entity_id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisResult {
    pub signals: Vec<DriftSignal>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingConvention {
    PascalCase,
    CamelCase,
    KebabCase,
    SnakeCase,
    /// A single lower-case word such as `button`, valid camelCase, kebab-case and snake_case alike.
    Lowercase,
    Other,
}

impl NamingConvention {
    pub fn detect(name: &str) -> Self {
        let name = name.trim();
        let Some(first) = name.chars().next() else {
            return Self::Other;
        };
        let alphanumeric = |extra: char| name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == extra);
        if name.contains('-') {
            if alphanumeric('-') && !name.chars().any(|ch| ch.is_ascii_uppercase()) {
                return Self::KebabCase;
            }
            return Self::Other;
        }
        if name.contains('_') {
            if alphanumeric('_') && !name.chars().any(|ch| ch.is_ascii_uppercase()) {
                return Self::SnakeCase;
            }
            return Self::Other;
        }
        if !name.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Self::Other;
        }
        if first.is_ascii_uppercase() {
            Self::PascalCase
        } else if !first.is_ascii_lowercase() {
            Self::Other
        } else if name.chars().any(|ch| ch.is_ascii_uppercase()) {
            Self::CamelCase
        } else {
            Self::Lowercase
        }
    }

    /// Whether a name written in `self` also satisfies `other`.
    pub fn is_compatible_with(self, other: Self) -> bool {
        self == other
            || (self == Self::Lowercase
                && matches!(other, Self::CamelCase | Self::KebabCase | Self::SnakeCase))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PascalCase => "PascalCase",
            Self::CamelCase => "camelCase",
            Self::KebabCase => "kebab-case",
            Self::SnakeCase => "snake_case",
            Self::Lowercase => "lowercase",
            Self::Other => "mixed",
        }
    }

    /// Rewrites `name` in this convention. `Other` leaves it unchanged.
    pub fn apply(self, name: &str) -> String {
        let words = split_words(name);
        let capitalize = |word: &String| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        };
        match self {
            Self::PascalCase => words.iter().map(capitalize).collect(),
            Self::CamelCase => words
                .iter()
                .enumerate()
                .map(|(index, word)| if index == 0 { word.clone() } else { capitalize(word) })
                .collect(),
            Self::KebabCase => words.join("-"),
            Self::SnakeCase => words.join("_"),
            Self::Lowercase => words.concat(),
            Self::Other => name.to_owned(),
        }
    }
}

fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for ch in name.chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if ch.is_ascii_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        current.push(ch.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Lower-cased with `-`, `_` and whitespace removed.
fn normalized_name(name: &str) -> String {
    name.chars()
        .filter(|ch| *ch != '-' && *ch != '_' && !ch.is_whitespace())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Matches component and token populations and turns what it finds into drift signals.
#[derive(Debug, Clone)]
pub struct SemanticDiffEngine {
    config: DiffConfig,
    scorer: ConfidenceScorer,
    detected_at: Option<i64>,
}

impl Default for SemanticDiffEngine {
    fn default() -> Self {
        Self::from_config(&BuoyConfig::default())
    }
}

impl SemanticDiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BuoyConfig) -> Self {
        Self {
            config: config.diff.clone(),
            scorer: ConfidenceScorer::from_config(&config.confidence),
            detected_at: None,
        }
    }

    pub fn from_workspace(workspace: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let config = load_workspace_config(workspace)?;
        Ok(Self::from_config(&config))
    }

    /// Pins the detection timestamp stamped on emitted signals.
    pub fn at(mut self, detected_at: i64) -> Self {
        self.detected_at = Some(detected_at);
        self
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    fn detected_at(&self) -> i64 {
        self.detected_at.unwrap_or_else(now_millis)
    }

    fn is_ui_framework(&self, name: &str) -> bool {
        UI_FRAMEWORKS.contains(&name)
            || self
                .config
                .ui_frameworks
                .iter()
                .any(|extra| extra.trim().eq_ignore_ascii_case(name))
    }

    pub fn check_framework_sprawl(&self, frameworks: &[FrameworkInfo]) -> Option<DriftSignal> {
        let mut seen = HashSet::new();
        let mut ui = Vec::new();
        for framework in frameworks {
            let name = framework.name.trim();
            let key = name.to_ascii_lowercase();
            if name.is_empty() || !self.is_ui_framework(&key) {
                continue;
            }
            if seen.insert(key) {
                ui.push(name.to_owned());
            }
        }
        debug!(declared = frameworks.len(), ui = ui.len(), "checked framework sprawl");
        if ui.len() < 2 {
            return None;
        }

        let listed = ui.join(", ");
        let source = EntityRef {
            entity_type: EntityType::Project,
            entity_id: "project".to_owned(),
            entity_name: "project".to_owned(),
            location: String::new(),
        };
        let key = format!("project@{}", listed.to_ascii_lowercase());
        let signal = DriftSignal::keyed(
            DriftType::FrameworkSprawl,
            &key,
            source,
            None,
            format!("Framework sprawl: {} UI frameworks detected: {listed}", ui.len()),
            self.detected_at(),
        )
        .with_details(DriftDetails {
            actual: Some(listed),
            suggestions: vec!["Consolidate on a single UI framework".to_owned()],
            ..DriftDetails::default()
        });
        Some(signal)
    }

    pub fn compare_components(&self, source: &[Component], target: &[Component]) -> ComponentComparison {
        let detected_at = self.detected_at();
        let mut target_used = vec![false; target.len()];
        let mut source_matched = vec![None::<(usize, MatchType)>; source.len()];

        let mut by_name = HashMap::<&str, Vec<usize>>::new();
        for (index, component) in target.iter().enumerate() {
            by_name.entry(component.name.as_str()).or_default().push(index);
        }
        for (index, component) in source.iter().enumerate() {
            let candidate = by_name.get(component.name.as_str()).and_then(|indices| {
                indices.iter().copied().find(|target_index| !target_used[*target_index])
            });
            if let Some(target_index) = candidate {
                target_used[target_index] = true;
                source_matched[index] = Some((target_index, MatchType::Exact));
            }
        }

        if self.config.fuzzy_matching {
            for (index, component) in source.iter().enumerate() {
                if source_matched[index].is_some() {
                    continue;
                }
                let wanted = normalized_name(&component.name);
                let candidate = target.iter().enumerate().position(|(target_index, other)| {
                    !target_used[target_index] && normalized_name(&other.name) == wanted
                });
                if let Some(target_index) = candidate {
                    target_used[target_index] = true;
                    source_matched[index] = Some((target_index, MatchType::Normalized));
                }
            }
        }

        let mut comparison = ComponentComparison::default();
        for (index, component) in source.iter().enumerate() {
            match source_matched[index] {
                Some((target_index, match_type)) => {
                    let other = &target[target_index];
                    comparison.matches.push(ComponentMatch {
                        source_id: component.id.clone(),
                        target_id: other.id.clone(),
                        name: component.name.clone(),
                        match_type,
                        confidence: match match_type {
                            MatchType::Exact => 1.0,
                            MatchType::Normalized => NORMALIZED_MATCH_CONFIDENCE,
                        },
                        differences: prop_differences(component, other),
                    });
                }
                None => {
                    comparison.drift_signals.push(DriftSignal::new(
                        DriftType::OrphanedComponent,
                        component_ref(component),
                        None,
                        format!(
                            "Component '{}' has no counterpart in the compared set",
                            component.name
                        ),
                        detected_at,
                    ));
                    comparison.orphaned_source.push(component.clone());
                }
            }
        }
        comparison.orphaned_target = target
            .iter()
            .zip(&target_used)
            .filter(|(_, used)| !**used)
            .map(|(component, _)| component.clone())
            .collect();

        debug!(
            matches = comparison.matches.len(),
            orphaned_source = comparison.orphaned_source.len(),
            orphaned_target = comparison.orphaned_target.len(),
            "compared components"
        );
        comparison
    }

    pub fn compare_tokens(&self, source: &[DesignToken], target: &[DesignToken]) -> TokenComparison {
        let detected_at = self.detected_at();
        let mut target_used = vec![false; target.len()];
        let mut by_name = HashMap::<&str, Vec<usize>>::new();
        for (index, token) in target.iter().enumerate() {
            by_name.entry(token.name.as_str()).or_default().push(index);
        }

        let mut comparison = TokenComparison::default();
        for token in source {
            let candidate = by_name.get(token.name.as_str()).and_then(|indices| {
                indices.iter().copied().find(|target_index| !target_used[*target_index])
            });
            let Some(target_index) = candidate else {
                comparison.drift_signals.push(DriftSignal::new(
                    DriftType::OrphanedToken,
                    token_ref(token),
                    None,
                    format!("Token '{}' has no counterpart in the compared set", token.name),
                    detected_at,
                ));
                comparison.orphaned_source.push(token.clone());
                continue;
            };
            target_used[target_index] = true;
            let other = &target[target_index];
            comparison.matches.push(TokenMatch {
                source_id: token.id.clone(),
                target_id: other.id.clone(),
                name: token.name.clone(),
                match_type: MatchType::Exact,
                confidence: 1.0,
            });

            let rem_base_px = self.scorer.config().rem_base_px;
            if token.value.normalized_with(rem_base_px) != other.value.normalized_with(rem_base_px) {
                let expected = other.value.display();
                let actual = token.value.display();
                comparison.drift_signals.push(
                    DriftSignal::new(
                        DriftType::ValueDivergence,
                        token_ref(token),
                        Some(token_ref(other)),
                        format!(
                            "Token '{}' diverges: expected {expected}, found {actual}",
                            token.name
                        ),
                        detected_at,
                    )
                    .with_details(DriftDetails {
                        expected: Some(expected.clone()),
                        actual: Some(actual.clone()),
                        diff: Some(format!("- {expected}\n+ {actual}")),
                        ..DriftDetails::default()
                    }),
                );
            }
        }
        comparison.orphaned_target = target
            .iter()
            .zip(&target_used)
            .filter(|(_, used)| !**used)
            .map(|(token, _)| token.clone())
            .collect();

        debug!(
            matches = comparison.matches.len(),
            orphaned_source = comparison.orphaned_source.len(),
            orphaned_target = comparison.orphaned_target.len(),
            divergent = comparison
                .drift_signals
                .iter()
                .filter(|signal| signal.drift_type == DriftType::ValueDivergence)
                .count(),
            "compared tokens"
        );
        comparison
    }

    /// Runs the enabled checks over each component. Each check emits its own
    /// signals; nothing is merged.
    pub fn analyze_components(&self, components: &[Component], options: &AnalysisOptions) -> AnalysisResult {
        let detected_at = self.detected_at();
        let mut result = AnalysisResult::default();
        let mut valid = Vec::with_capacity(components.len());

        for component in components {
            if let Err(err) = component.validate() {
                warn!(component = %component.name, error = %err, "rejected component record");
                result.rejected.push(RejectedRecord {
                    entity_id: component.id.clone(),
                    name: component.name.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
            valid.push(component);
        }

        for component in &valid {
            if options.check_deprecated && component.metadata.deprecated {
                result.signals.push(self.deprecated_signal(component, detected_at));
            }
            if options.check_hardcoded {
                for finding in &component.metadata.hardcoded_values {
                    result.signals.push(self.hardcoded_signal(
                        component,
                        finding,
                        options.available_tokens.as_deref(),
                        detected_at,
                    ));
                }
            }
            if options.check_documentation && !component.metadata.has_documentation() {
                result.signals.push(DriftSignal::new(
                    DriftType::MissingDocumentation,
                    component_ref(component),
                    None,
                    format!("Component '{}' has no documentation", component.name),
                    detected_at,
                ));
            }
        }

        if options.check_naming {
            result
                .signals
                .extend(self.naming_signals(&valid, detected_at));
        }

        debug!(
            components = components.len(),
            rejected = result.rejected.len(),
            signals = result.signals.len(),
            "analyzed components"
        );
        result
    }

    fn deprecated_signal(&self, component: &Component, detected_at: i64) -> DriftSignal {
        let mut suggestions = Vec::new();
        if let Some(reason) = component
            .metadata
            .deprecation_reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
        {
            suggestions.push(reason.to_owned());
        }
        suggestions.push(format!("Migrate usages of '{}' before removal", component.name));

        DriftSignal::new(
            DriftType::DeprecatedPattern,
            component_ref(component),
            None,
            format!("Component '{}' is deprecated", component.name),
            detected_at,
        )
        .with_details(DriftDetails {
            affected_files: component.source.file_path().into_iter().collect(),
            suggestions,
            ..DriftDetails::default()
        })
    }

    fn hardcoded_signal(
        &self,
        component: &Component,
        finding: &HardcodedValue,
        tokens: Option<&[DesignToken]>,
        detected_at: i64,
    ) -> DriftSignal {
        let file = finding
            .parse_location()
            .map(|(path, _, _)| path)
            .or_else(|| component.source.file_path());
        let mut details = DriftDetails {
            actual: Some(finding.value.clone()),
            affected_files: file.into_iter().collect(),
            ..DriftDetails::default()
        };
        if let Some(tokens) = tokens {
            let candidates = self.scorer.candidates(finding, tokens, MAX_TOKEN_CANDIDATES);
            if let Some(best) = candidates.first() {
                details.expected = Some(best.value.clone());
            }
            details.suggestions = candidates
                .iter()
                .map(|candidate| {
                    format!(
                        "Replace with token '{}' ({} confidence)",
                        candidate.token_name, candidate.confidence
                    )
                })
                .collect();
            details.token_candidates = candidates;
        }

        let property = finding
            .property
            .as_deref()
            .map(|property| format!(" in '{property}'"))
            .unwrap_or_default();
        let source = EntityRef {
            location: finding.location.clone(),
            ..component_ref(component)
        };
        DriftSignal::keyed(
            DriftType::HardcodedValue,
            &format!("{}@{}", component.id, finding.location),
            source,
            None,
            format!(
                "Hardcoded {} '{}'{property} in component '{}'",
                finding.kind.as_str(),
                finding.value,
                component.name
            ),
            detected_at,
        )
        .with_details(details)
    }

    fn naming_signals(&self, components: &[&Component], detected_at: i64) -> Vec<DriftSignal> {
        if components.len() < 2 {
            return Vec::new();
        }
        let conventions = components
            .iter()
            .map(|component| NamingConvention::detect(&component.name))
            .collect::<Vec<_>>();

        let mut counts = Vec::<(NamingConvention, usize)>::new();
        for convention in &conventions {
            match counts.iter_mut().find(|(seen, _)| seen == convention) {
                Some((_, count)) => *count += 1,
                None => counts.push((*convention, 1)),
            }
        }
        let Some((majority, _)) = counts
            .iter()
            .copied()
            .filter(|(convention, _)| {
                !matches!(convention, NamingConvention::Other | NamingConvention::Lowercase)
            })
            .fold(None::<(NamingConvention, usize)>, |best, entry| match best {
                Some(current) if current.1 >= entry.1 => Some(current),
                _ => Some(entry),
            })
        else {
            return Vec::new();
        };
        let conforming = conventions
            .iter()
            .filter(|convention| convention.is_compatible_with(majority))
            .count();
        let share = conforming as f64 / components.len() as f64;
        if share < self.config.naming_majority_share {
            return Vec::new();
        }

        components
            .iter()
            .zip(conventions)
            .filter(|(_, convention)| !convention.is_compatible_with(majority))
            .map(|(component, convention)| {
                let suggestion = majority.apply(&component.name);
                DriftSignal::new(
                    DriftType::NamingInconsistency,
                    component_ref(component),
                    None,
                    format!(
                        "Component '{}' uses {} naming; most components use {}",
                        component.name,
                        convention.as_str(),
                        majority.as_str()
                    ),
                    detected_at,
                )
                .with_details(DriftDetails {
                    expected: Some(suggestion.clone()),
                    actual: Some(component.name.clone()),
                    suggestions: vec![format!("Rename to '{suggestion}'")],
                    ..DriftDetails::default()
                })
            })
            .collect()
    }
}

fn prop_differences(source: &Component, target: &Component) -> Vec<PropDifference> {
    let mut differences = Vec::new();
    for prop in &source.props {
        match target.prop(&prop.name) {
            None => differences.push(PropDifference {
                prop: prop.name.clone(),
                kind: PropDifferenceKind::MissingInTarget,
                source_type: Some(prop.prop_type.clone()),
                target_type: None,
            }),
            Some(other) if other.prop_type != prop.prop_type => differences.push(PropDifference {
                prop: prop.name.clone(),
                kind: PropDifferenceKind::TypeChanged,
                source_type: Some(prop.prop_type.clone()),
                target_type: Some(other.prop_type.clone()),
            }),
            Some(_) => {}
        }
    }
    for prop in &target.props {
        if source.prop(&prop.name).is_none() {
            differences.push(PropDifference {
                prop: prop.name.clone(),
                kind: PropDifferenceKind::MissingInSource,
                source_type: None,
                target_type: Some(prop.prop_type.clone()),
            });
        }
    }
    differences
}

fn component_ref(component: &Component) -> EntityRef {
    EntityRef {
        entity_type: EntityType::Component,
        entity_id: component.id.clone(),
        entity_name: component.name.clone(),
        location: component.source.location(),
    }
}

fn token_ref(token: &DesignToken) -> EntityRef {
    EntityRef {
        entity_type: EntityType::Token,
        entity_id: token.id.clone(),
        entity_name: token.name.clone(),
        location: token.source.location_key(),
    }
}
