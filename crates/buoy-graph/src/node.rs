use buoy_core::{DriftType, Severity};
use serde::{Deserialize, Serialize};

/// Fields every graph element exposes regardless of its variant.
pub trait GraphEntity {
    fn id(&self) -> String;
    fn created_at(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub enum NodeType {
    Token,
    Component,
    File,
    Developer,
    Commit,
    Test,
    Story,
    DriftSignal,
    #[serde(rename = "PR")]
    PullRequest,
}

impl NodeType {
    pub const ALL: [NodeType; 9] = [
        Self::Token,
        Self::Component,
        Self::File,
        Self::Developer,
        Self::Commit,
        Self::Test,
        Self::Story,
        Self::DriftSignal,
        Self::PullRequest,
    ];

    /// Lower-cased prefix used in `type:key` ids.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Component => "component",
            Self::File => "file",
            Self::Developer => "developer",
            Self::Commit => "commit",
            Self::Test => "test",
            Self::Story => "story",
            Self::DriftSignal => "driftsignal",
            Self::PullRequest => "pr",
        }
    }

    pub fn parse_prefix(prefix: &str) -> Option<Self> {
        let prefix = prefix.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|node_type| node_type.as_str() == prefix)
    }

    pub fn node_id(self, key: &str) -> String {
        format!("{}:{key}", self.as_str())
    }
}

/// Splits `token:primary` into its type and key. Bare keys, and prefixes that
/// are not node types, yield `None` for the type.
pub fn split_reference(reference: &str) -> (Option<NodeType>, &str) {
    let reference = reference.trim();
    match reference.split_once(':') {
        Some((prefix, key)) => match NodeType::parse_prefix(prefix) {
            Some(node_type) => (Some(node_type), key),
            None => (None, reference),
        },
        None => (None, reference),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeAttrs {
    Token {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default)]
        deprecated: bool,
    },
    Component {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        framework: Option<String>,
    },
    File {
        path: String,
    },
    Developer {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
    Commit {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<String>,
        timestamp: i64,
    },
    Test {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    Story {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    DriftSignal {
        drift_type: DriftType,
        severity: Severity,
        message: String,
    },
    PullRequest {
        number: u64,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<String>,
    },
}

impl NodeAttrs {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Token { .. } => NodeType::Token,
            Self::Component { .. } => NodeType::Component,
            Self::File { .. } => NodeType::File,
            Self::Developer { .. } => NodeType::Developer,
            Self::Commit { .. } => NodeType::Commit,
            Self::Test { .. } => NodeType::Test,
            Self::Story { .. } => NodeType::Story,
            Self::DriftSignal { .. } => NodeType::DriftSignal,
            Self::PullRequest { .. } => NodeType::PullRequest,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Token { name, .. }
            | Self::Component { name, .. }
            | Self::Developer { name, .. }
            | Self::Test { name, .. }
            | Self::Story { name, .. } => name,
            Self::File { path } => path,
            Self::Commit { message, .. } => message,
            Self::DriftSignal { message, .. } => message,
            Self::PullRequest { title, .. } => title,
        }
    }

    pub fn token(name: impl Into<String>) -> Self {
        Self::Token {
            name: name.into(),
            value: None,
            category: None,
            deprecated: false,
        }
    }

    pub fn component(name: impl Into<String>) -> Self {
        Self::Component {
            name: name.into(),
            file: None,
            framework: None,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::File { path: path.into() }
    }

    pub fn developer(name: impl Into<String>) -> Self {
        Self::Developer {
            name: name.into(),
            email: None,
        }
    }

    pub fn commit(message: impl Into<String>, timestamp: i64) -> Self {
        Self::Commit {
            message: message.into(),
            author: None,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: String,
    pub attrs: NodeAttrs,
    pub created_at: i64,
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        self.attrs.node_type()
    }

    pub fn name(&self) -> &str {
        self.attrs.name()
    }
}

impl GraphEntity for Node {
    fn id(&self) -> String {
        self.node_type().node_id(&self.key)
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}
