use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EntityId, ModelError, normalize_path, stable_entity_id};

/// Where a component was discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentSource {
    Framework {
        framework: String,
        path: String,
        export_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
    },
    DesignTool {
        file_key: String,
        node_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        page: Option<String>,
    },
    Story {
        path: String,
        story_id: String,
    },
}

impl ComponentSource {
    pub fn kind_tag(&self) -> &str {
        match self {
            Self::Framework { framework, .. } => framework.as_str(),
            Self::DesignTool { .. } => "design_tool",
            Self::Story { .. } => "story",
        }
    }

    pub fn location_key(&self) -> String {
        match self {
            Self::Framework { path, .. } | Self::Story { path, .. } => normalize_path(path),
            Self::DesignTool { file_key, node_id, .. } => format!("{file_key}/{node_id}"),
        }
    }

    /// Source file on disk, when the source has one.
    pub fn file_path(&self) -> Option<String> {
        match self {
            Self::Framework { path, .. } | Self::Story { path, .. } => Some(normalize_path(path)),
            Self::DesignTool { .. } => None,
        }
    }

    pub fn location(&self) -> String {
        match self {
            Self::Framework {
                path,
                line: Some(line),
                ..
            } => format!("{}:{line}", normalize_path(path)),
            _ => self.location_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub prop_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardcodedKind {
    Color,
    Spacing,
    FontSize,
    FontFamily,
    Shadow,
    Border,
}

impl HardcodedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Spacing => "spacing",
            Self::FontSize => "font size",
            Self::FontFamily => "font family",
            Self::Shadow => "shadow",
            Self::Border => "border",
        }
    }
}

/// A literal style value found where a token reference was expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardcodedValue {
    pub kind: HardcodedKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// `path:line[:column]`
    pub location: String,
}

impl HardcodedValue {
    /// Splits `location` into `(path, line, column)`.
    pub fn parse_location(&self) -> Option<(String, u32, Option<u32>)> {
        let (head, last) = self.location.rsplit_once(':')?;
        let last = last.parse::<u32>().ok()?;
        let with_column = head
            .rsplit_once(':')
            .and_then(|(path, line)| line.parse::<u32>().ok().map(|line| (path, line)));
        match with_column {
            Some((path, line)) => Some((normalize_path(path), line, Some(last))),
            None => Some((normalize_path(head), last, None)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentMetadata {
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hardcoded_values: Vec<HardcodedValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl ComponentMetadata {
    pub fn has_documentation(&self) -> bool {
        self.documentation
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: EntityId,
    pub name: String,
    pub source: ComponentSource,
    #[serde(default)]
    pub props: Vec<PropDefinition>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metadata: ComponentMetadata,
    pub scanned_at: i64,
}

impl Component {
    pub fn new(name: impl Into<String>, source: ComponentSource, scanned_at: i64) -> Self {
        let name = name.into();
        let id = stable_entity_id(source.kind_tag(), &source.location_key(), &name);
        Self {
            id,
            name,
            source,
            props: Vec::new(),
            variants: Vec::new(),
            tokens: Vec::new(),
            dependencies: Vec::new(),
            metadata: ComponentMetadata::default(),
            scanned_at,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |reason: &str| ModelError::InvalidRecord {
            kind: "component",
            name: self.name.clone(),
            reason: reason.to_owned(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("component has no name"));
        }
        if self.id.trim().is_empty() {
            return Err(invalid("component has no id"));
        }
        if let Some(prop) = self.props.iter().find(|prop| prop.name.trim().is_empty()) {
            return Err(invalid(&format!(
                "prop of type '{}' has no name",
                prop.prop_type
            )));
        }
        Ok(())
    }

    pub fn prop(&self, name: &str) -> Option<&PropDefinition> {
        self.props.iter().find(|prop| prop.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn react_source(path: &str) -> ComponentSource {
        ComponentSource::Framework {
            framework: "react".to_owned(),
            path: path.to_owned(),
            export_name: "Button".to_owned(),
            line: Some(3),
        }
    }

    #[test]
    fn component_id_is_derived_from_source_and_name() {
        let a = Component::new("Button", react_source("src/Button.tsx"), 1);
        let b = Component::new("Button", react_source("src/Button.tsx"), 2);
        let c = Component::new("Button", react_source("src/ui/Button.tsx"), 1);
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn validate_rejects_nameless_components() {
        let component = Component::new("  ", react_source("src/Button.tsx"), 1);
        let err = component.validate().expect_err("nameless component");
        assert!(err.to_string().contains("has no name"));
    }

    #[test]
    fn hardcoded_location_parses_line_and_column() {
        let finding = HardcodedValue {
            kind: HardcodedKind::Color,
            value: "#ff0000".to_owned(),
            property: Some("color".to_owned()),
            location: "src/Button.tsx:12:8".to_owned(),
        };
        assert_eq!(
            finding.parse_location(),
            Some(("src/Button.tsx".to_owned(), 12, Some(8)))
        );

        let line_only = HardcodedValue {
            location: "src/Button.tsx:12".to_owned(),
            ..finding
        };
        assert_eq!(
            line_only.parse_location(),
            Some(("src/Button.tsx".to_owned(), 12, None))
        );
    }
}
