use serde::{Deserialize, Serialize};

use crate::node::{GraphEntity, NodeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    Uses,
    Renders,
    TestedBy,
    DocumentedBy,
    Authored,
    Changed,
    Affects,
    DriftsFrom,
    FlaggedIn,
    Includes,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uses => "USES",
            Self::Renders => "RENDERS",
            Self::TestedBy => "TESTED_BY",
            Self::DocumentedBy => "DOCUMENTED_BY",
            Self::Authored => "AUTHORED",
            Self::Changed => "CHANGED",
            Self::Affects => "AFFECTS",
            Self::DriftsFrom => "DRIFTS_FROM",
            Self::FlaggedIn => "FLAGGED_IN",
            Self::Includes => "INCLUDES",
        }
    }

    /// Node types a bare endpoint key is tried against, in order.
    pub fn source_types(self) -> &'static [NodeType] {
        match self {
            Self::Uses => &[NodeType::File, NodeType::Component],
            Self::Renders => &[NodeType::Component, NodeType::File],
            Self::TestedBy | Self::DocumentedBy => &[NodeType::Component],
            Self::Authored => &[NodeType::Developer],
            Self::Changed => &[NodeType::Commit],
            Self::Affects | Self::FlaggedIn => &[NodeType::DriftSignal],
            Self::DriftsFrom => &[NodeType::Token, NodeType::Component],
            Self::Includes => &[NodeType::PullRequest],
        }
    }

    pub fn target_types(self) -> &'static [NodeType] {
        match self {
            Self::Uses => &[NodeType::Token, NodeType::Component],
            Self::Renders => &[NodeType::Component],
            Self::TestedBy => &[NodeType::Test],
            Self::DocumentedBy => &[NodeType::Story],
            Self::Authored | Self::Includes => &[NodeType::Commit],
            Self::Changed => &[NodeType::File],
            Self::Affects => &[NodeType::File, NodeType::Component, NodeType::Token],
            Self::DriftsFrom => &[NodeType::Token],
            Self::FlaggedIn => &[NodeType::PullRequest],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeAttrs {
    #[default]
    None,
    Uses {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property: Option<String>,
    },
    DriftsFrom {
        expected_value: String,
        actual_value: String,
    },
    Changed {
        additions: u32,
        deletions: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub relation: Relation,
    pub from_id: String,
    pub to_id: String,
    pub attrs: EdgeAttrs,
    pub created_at: i64,
}

impl GraphEntity for Edge {
    fn id(&self) -> String {
        format!("{}->{}:{}", self.from_id, self.to_id, self.relation.as_str())
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}
