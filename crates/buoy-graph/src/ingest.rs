//! Loading scanned records and version-control facts into a [`Graph`].

use buoy_core::{
    Component, ComponentSource, DesignToken, DriftSignal, DriftType, EntityType, normalize_path,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::edge::{EdgeAttrs, Relation};
use crate::node::{NodeAttrs, NodeType};
use crate::store::{Graph, NodeHandle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IngestReport {
    pub nodes: usize,
    pub edges: usize,
    /// One entry per record or relation that could not be loaded, with the reason.
    pub skipped: Vec<String>,
}

impl IngestReport {
    fn merge(&mut self, other: IngestReport) {
        self.nodes += other.nodes;
        self.edges += other.edges;
        self.skipped.extend(other.skipped);
    }
}

/// A commit as supplied by the git-history layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFact {
    pub hash: String,
    pub message: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub timestamp: i64,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

/// One file touched by a commit, with its line counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
}

impl FileChange {
    pub fn new(path: impl Into<String>, additions: u32, deletions: u32) -> Self {
        Self {
            path: path.into(),
            additions,
            deletions,
        }
    }
}

/// A pull request as supplied by the code-hosting integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestFact {
    pub number: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub commits: Vec<String>,
    /// Drift signal ids raised against this pull request.
    #[serde(default)]
    pub flagged_signals: Vec<String>,
}

pub fn ingest_tokens(graph: &mut Graph, tokens: &[DesignToken]) -> IngestReport {
    let mut report = IngestReport::default();
    for token in tokens {
        if let Err(err) = token.validate() {
            warn!(token_id = %token.id, error = %err, "skipping invalid token");
            report.skipped.push(err.to_string());
            continue;
        }
        graph.add_node(
            token.name.clone(),
            NodeAttrs::Token {
                name: token.name.clone(),
                value: Some(token.value.display()),
                category: Some(token.category.as_str().to_owned()),
                deprecated: token.metadata.deprecated,
            },
        );
        report.nodes += 1;
    }
    debug!(tokens = report.nodes, "ingested tokens");
    report
}

/// Adds component and file nodes, then USES / RENDERS / DOCUMENTED_BY edges.
/// A component's source file USES the component it declares.
/// Token and dependency references that are not in the graph are skipped.
pub fn ingest_components(graph: &mut Graph, components: &[Component]) -> IngestReport {
    let mut report = IngestReport::default();
    let mut loaded = Vec::<(NodeHandle, &Component)>::new();
    let mut stories = Vec::<(&str, &str)>::new();

    for component in components {
        if let Err(err) = component.validate() {
            warn!(component_id = %component.id, error = %err, "skipping invalid component");
            report.skipped.push(err.to_string());
            continue;
        }
        let file = component.source.file_path();
        let framework = match &component.source {
            ComponentSource::Framework { framework, .. } => Some(framework.clone()),
            _ => None,
        };
        if let ComponentSource::Story { path, story_id } = &component.source {
            graph.add_node(
                story_id.clone(),
                NodeAttrs::Story {
                    name: component.name.clone(),
                    file: Some(normalize_path(path)),
                },
            );
            report.nodes += 1;
            stories.push((component.name.as_str(), story_id.as_str()));
            continue;
        }

        let handle = graph.add_node(
            component.name.clone(),
            NodeAttrs::Component {
                name: component.name.clone(),
                file: file.clone(),
                framework,
            },
        );
        report.nodes += 1;
        if let Some(file) = file {
            let component_id = graph.node_id(handle);
            graph.add_node(file.clone(), NodeAttrs::file(file.clone()));
            report.nodes += 1;
            let line = match &component.source {
                ComponentSource::Framework { line, .. } => *line,
                _ => None,
            };
            link(
                graph,
                &mut report,
                Relation::Uses,
                &NodeType::File.node_id(&file),
                &component_id,
                EdgeAttrs::Uses {
                    line,
                    property: None,
                },
            );
        }
        loaded.push((handle, component));
    }

    for (handle, component) in loaded {
        let component_id = graph.node_id(handle);
        for token in &component.tokens {
            if graph.resolve(token, NodeType::Token).is_none() {
                report
                    .skipped
                    .push(format!("{}: unknown token '{token}'", component.name));
                continue;
            }
            link(
                graph,
                &mut report,
                Relation::Uses,
                &component_id,
                &NodeType::Token.node_id(token),
                EdgeAttrs::None,
            );
        }
        for dependency in &component.dependencies {
            if graph.resolve(dependency, NodeType::Component).is_none() {
                report
                    .skipped
                    .push(format!("{}: unknown dependency '{dependency}'", component.name));
                continue;
            }
            link(
                graph,
                &mut report,
                Relation::Renders,
                &component_id,
                &NodeType::Component.node_id(dependency),
                EdgeAttrs::None,
            );
        }
    }
    // A story documents the component of the same name, when one was loaded.
    for (name, story_id) in stories {
        if graph.resolve(name, NodeType::Component).is_none() {
            report
                .skipped
                .push(format!("story '{story_id}': no component named '{name}'"));
            continue;
        }
        link(
            graph,
            &mut report,
            Relation::DocumentedBy,
            &NodeType::Component.node_id(name),
            &NodeType::Story.node_id(story_id),
            EdgeAttrs::None,
        );
    }
    debug!(
        nodes = report.nodes,
        edges = report.edges,
        skipped = report.skipped.len(),
        "ingested components"
    );
    report
}

/// Adds a node per signal and an AFFECTS edge to the file (and entity) it points at.
/// Value divergences between two known tokens also become DRIFTS_FROM edges.
pub fn ingest_drift_signals(graph: &mut Graph, signals: &[DriftSignal]) -> IngestReport {
    let mut report = IngestReport::default();
    for signal in signals {
        graph.add_node(
            signal.id.clone(),
            NodeAttrs::DriftSignal {
                drift_type: signal.drift_type,
                severity: signal.severity,
                message: signal.message.clone(),
            },
        );
        report.nodes += 1;
        let signal_id = NodeType::DriftSignal.node_id(&signal.id);

        let mut files = Vec::<String>::new();
        for file in signal
            .source_file()
            .into_iter()
            .chain(signal.details.affected_files.iter().cloned())
        {
            let file = normalize_path(&file);
            if !files.contains(&file) {
                files.push(file);
            }
        }
        for file in files {
            graph.add_node(file.clone(), NodeAttrs::file(file.clone()));
            link(
                graph,
                &mut report,
                Relation::Affects,
                &signal_id,
                &NodeType::File.node_id(&file),
                EdgeAttrs::None,
            );
        }

        let entity = match signal.source.entity_type {
            EntityType::Component => Some(NodeType::Component),
            EntityType::Token => Some(NodeType::Token),
            EntityType::File | EntityType::Project => None,
        };
        if let Some(node_type) = entity {
            if graph.resolve(&signal.source.entity_name, node_type).is_some() {
                link(
                    graph,
                    &mut report,
                    Relation::Affects,
                    &signal_id,
                    &node_type.node_id(&signal.source.entity_name),
                    EdgeAttrs::None,
                );
            }
        }

        if signal.drift_type == DriftType::ValueDivergence {
            if let Some(target) = &signal.target {
                let source_token = graph.resolve(&signal.source.entity_name, NodeType::Token);
                let target_token = graph.resolve(&target.entity_name, NodeType::Token);
                if let (Some(from), Some(to)) = (source_token, target_token) {
                    graph.add_edge_between(
                        Relation::DriftsFrom,
                        from,
                        to,
                        EdgeAttrs::DriftsFrom {
                            expected_value: signal.details.expected.clone().unwrap_or_default(),
                            actual_value: signal.details.actual.clone().unwrap_or_default(),
                        },
                    );
                    report.edges += 1;
                }
            }
        }
    }
    debug!(signals = signals.len(), edges = report.edges, "ingested drift signals");
    report
}

/// Adds the commit, its developer, and CHANGED edges to every touched file.
pub fn ingest_commit(graph: &mut Graph, commit: &CommitFact) -> IngestReport {
    let mut report = IngestReport::default();
    let hash = commit.hash.trim().to_ascii_lowercase();
    if hash.is_empty() {
        report.skipped.push("commit has no hash".to_owned());
        return report;
    }

    graph.add_node(
        hash.clone(),
        NodeAttrs::Commit {
            message: commit.message.clone(),
            author: Some(commit.author.clone()).filter(|author| !author.trim().is_empty()),
            timestamp: commit.timestamp,
        },
    );
    report.nodes += 1;
    let commit_id = NodeType::Commit.node_id(&hash);

    let author = commit.author.trim();
    if !author.is_empty() {
        graph.add_node(
            author.to_owned(),
            NodeAttrs::Developer {
                name: author.to_owned(),
                email: commit.email.clone(),
            },
        );
        report.nodes += 1;
        link(
            graph,
            &mut report,
            Relation::Authored,
            &NodeType::Developer.node_id(author),
            &commit_id,
            EdgeAttrs::None,
        );
    }

    for change in &commit.files {
        let file = normalize_path(change.path.trim());
        if file.is_empty() {
            continue;
        }
        graph.add_node(file.clone(), NodeAttrs::file(file.clone()));
        report.nodes += 1;
        link(
            graph,
            &mut report,
            Relation::Changed,
            &commit_id,
            &NodeType::File.node_id(&file),
            EdgeAttrs::Changed {
                additions: change.additions,
                deletions: change.deletions,
            },
        );
    }
    report
}

pub fn ingest_commits(graph: &mut Graph, commits: &[CommitFact]) -> IngestReport {
    let mut report = IngestReport::default();
    for commit in commits {
        report.merge(ingest_commit(graph, commit));
    }
    report
}

/// Adds the pull request with INCLUDES edges to known commits and FLAGGED_IN
/// edges from known drift signals.
pub fn ingest_pull_request(graph: &mut Graph, pr: &PullRequestFact) -> IngestReport {
    let mut report = IngestReport::default();
    let key = pr.number.to_string();
    graph.add_node(
        key.clone(),
        NodeAttrs::PullRequest {
            number: pr.number,
            title: pr.title.clone(),
            author: pr.author.clone(),
        },
    );
    report.nodes += 1;
    let pr_id = NodeType::PullRequest.node_id(&key);

    for commit in &pr.commits {
        let hash = commit.trim().to_ascii_lowercase();
        link(
            graph,
            &mut report,
            Relation::Includes,
            &pr_id,
            &hash,
            EdgeAttrs::None,
        );
    }
    for signal in &pr.flagged_signals {
        link(
            graph,
            &mut report,
            Relation::FlaggedIn,
            signal,
            &pr_id,
            EdgeAttrs::None,
        );
    }
    report
}

fn link(
    graph: &mut Graph,
    report: &mut IngestReport,
    relation: Relation,
    from: &str,
    to: &str,
    attrs: EdgeAttrs,
) {
    match graph.add_edge(relation, from, to, attrs) {
        Ok(_) => report.edges += 1,
        Err(err) => report.skipped.push(err.to_string()),
    }
}
