use std::collections::{HashMap, HashSet};

use buoy_config::GraphConfig;
use buoy_core::{DriftType, Severity};
use serde::{Deserialize, Serialize};

use crate::edge::{EdgeAttrs, Relation};
use crate::node::{NodeAttrs, NodeType};
use crate::store::{Graph, NodeHandle};

const DEPRECATED_NAME_PREFIXES: [&str; 3] = ["_", "deprecated-", "deprecated_"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub from_id: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsages {
    pub token_id: String,
    pub usage_count: usize,
    pub usages: Vec<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftingToken {
    pub token_id: String,
    pub drifts_from: String,
    pub expected_value: String,
    pub actual_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCommits {
    pub developer: String,
    pub commits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub file_id: String,
    pub primary_author: String,
    pub total_commits: usize,
    pub authors: Vec<AuthorCommits>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftAuthor {
    pub developer: String,
    pub file_id: String,
    pub commit_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatOffender {
    pub file_id: String,
    pub drift_count: usize,
    pub drift_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecatedUsage {
    pub token_id: String,
    pub usage_count: usize,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrDrift {
    pub drift_id: String,
    pub drift_type: DriftType,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub token_coverage: f64,
    /// Always 1.0: a component counts as covered by existing.
    pub component_coverage: f64,
    pub test_coverage: f64,
    pub story_coverage: f64,
    pub total_tokens: usize,
    pub used_tokens: usize,
    pub total_components: usize,
    pub tested_components: usize,
    pub documented_components: usize,
}

pub fn find_token_usages(graph: &Graph, token: &str) -> TokenUsages {
    let Some(handle) = graph.resolve(token, NodeType::Token) else {
        return TokenUsages {
            token_id: NodeType::Token.node_id(crate::node::split_reference(token).1),
            ..TokenUsages::default()
        };
    };

    let usages = graph
        .incoming(handle, Relation::Uses)
        .map(|(edge, source)| TokenUsage {
            from_id: edge.from_id.clone(),
            file: file_of(graph, source),
            line: match &edge.attrs {
                EdgeAttrs::Uses { line, .. } => *line,
                _ => None,
            },
        })
        .collect::<Vec<_>>();

    TokenUsages {
        token_id: graph.node_id(handle),
        usage_count: usages.len(),
        usages,
    }
}

pub fn find_unused_tokens(graph: &Graph) -> Vec<String> {
    graph
        .nodes_of_type(NodeType::Token)
        .filter(|(handle, _)| !graph.has_incoming(*handle, Relation::Uses))
        .map(|(handle, _)| graph.node_id(handle))
        .collect()
}

pub fn find_drifting_tokens(graph: &Graph) -> Vec<DriftingToken> {
    let mut drifting = Vec::new();
    for (handle, _) in graph.nodes_of_type(NodeType::Token) {
        for (edge, _) in graph.outgoing(handle, Relation::DriftsFrom) {
            let (expected_value, actual_value) = match &edge.attrs {
                EdgeAttrs::DriftsFrom {
                    expected_value,
                    actual_value,
                } => (expected_value.clone(), actual_value.clone()),
                _ => (String::new(), String::new()),
            };
            drifting.push(DriftingToken {
                token_id: edge.from_id.clone(),
                drifts_from: edge.to_id.clone(),
                expected_value,
                actual_value,
            });
        }
    }
    drifting
}

pub fn find_component_renderers(graph: &Graph, component: &str) -> Vec<String> {
    let Some(handle) = graph.resolve(component, NodeType::Component) else {
        return Vec::new();
    };
    graph
        .incoming(handle, Relation::Renders)
        .map(|(edge, _)| edge.from_id.clone())
        .collect()
}

pub fn find_untested_components(graph: &Graph) -> Vec<String> {
    components_without(graph, Relation::TestedBy)
}

pub fn find_undocumented_components(graph: &Graph) -> Vec<String> {
    components_without(graph, Relation::DocumentedBy)
}

fn components_without(graph: &Graph, relation: Relation) -> Vec<String> {
    graph
        .nodes_of_type(NodeType::Component)
        .filter(|(handle, _)| !graph.has_outgoing(*handle, relation))
        .map(|(handle, _)| graph.node_id(handle))
        .collect()
}

/// Attributes a file's commits to developers and picks the one with the most.
/// Ties go to the developer seen first.
pub fn find_ownership(graph: &Graph, file: &str) -> Option<Ownership> {
    let file_handle = graph.resolve(file, NodeType::File)?;
    let commits = commits_touching(graph, file_handle);
    if commits.is_empty() {
        return None;
    }

    let mut order = Vec::<String>::new();
    let mut counts = HashMap::<String, usize>::new();
    for commit in &commits {
        let Some(developer) = commit_author(graph, *commit) else {
            continue;
        };
        let count = counts.entry(developer.clone()).or_insert_with(|| {
            order.push(developer.clone());
            0
        });
        *count += 1;
    }

    let mut authors = order
        .into_iter()
        .map(|developer| AuthorCommits {
            commits: counts.get(&developer).copied().unwrap_or(0),
            developer,
        })
        .collect::<Vec<_>>();
    // Stable sort keeps first-seen order among equal counts.
    authors.sort_by(|left, right| right.commits.cmp(&left.commits));
    let primary_author = authors.first()?.developer.clone();

    Some(Ownership {
        file_id: graph.node_id(file_handle),
        primary_author,
        total_commits: commits.len(),
        authors,
    })
}

/// Developer behind the most recent change to a file the drift signal affects.
pub fn find_drift_author(graph: &Graph, drift: &str) -> Option<DriftAuthor> {
    let drift_handle = graph.resolve(drift, NodeType::DriftSignal)?;

    let mut best: Option<DriftAuthor> = None;
    for (_, target) in graph.outgoing(drift_handle, Relation::Affects) {
        let Some(file_handle) = file_node_for(graph, target) else {
            continue;
        };
        for commit in commits_touching(graph, file_handle) {
            let Some(developer) = commit_author(graph, commit) else {
                continue;
            };
            let timestamp = match graph.node(commit).attrs {
                NodeAttrs::Commit { timestamp, .. } => timestamp,
                _ => 0,
            };
            if best
                .as_ref()
                .is_some_and(|current| current.timestamp >= timestamp)
            {
                continue;
            }
            best = Some(DriftAuthor {
                developer,
                file_id: graph.node_id(file_handle),
                commit_id: graph.node_id(commit),
                timestamp,
            });
        }
    }
    best
}

pub fn find_repeat_offenders(graph: &Graph, threshold: usize) -> Vec<RepeatOffender> {
    let mut offenders = graph
        .nodes_of_type(NodeType::File)
        .filter_map(|(handle, _)| {
            let drift_ids = graph
                .incoming(handle, Relation::Affects)
                .filter(|(_, source)| graph.node(*source).node_type() == NodeType::DriftSignal)
                .map(|(edge, _)| edge.from_id.clone())
                .collect::<Vec<_>>();
            (!drift_ids.is_empty() && drift_ids.len() >= threshold).then(|| RepeatOffender {
                file_id: graph.node_id(handle),
                drift_count: drift_ids.len(),
                drift_ids,
            })
        })
        .collect::<Vec<_>>();
    offenders.sort_by(|left, right| right.drift_count.cmp(&left.drift_count));
    offenders
}

/// Repeat offenders at the workspace's `[graph] repeat_offender_threshold`.
pub fn find_configured_repeat_offenders(graph: &Graph, config: &GraphConfig) -> Vec<RepeatOffender> {
    find_repeat_offenders(graph, config.repeat_offender_threshold)
}

pub fn find_deprecated_usages(graph: &Graph) -> Vec<DeprecatedUsage> {
    graph
        .nodes_of_type(NodeType::Token)
        .filter(|(_, node)| match &node.attrs {
            NodeAttrs::Token {
                deprecated, name, ..
            } => *deprecated || has_deprecated_prefix(&node.key) || has_deprecated_prefix(name),
            _ => false,
        })
        .filter_map(|(handle, _)| {
            let mut files = Vec::new();
            let mut usage_count = 0;
            for (_, source) in graph.incoming(handle, Relation::Uses) {
                usage_count += 1;
                let file = file_of(graph, source);
                if !files.contains(&file) {
                    files.push(file);
                }
            }
            (usage_count > 0).then(|| DeprecatedUsage {
                token_id: graph.node_id(handle),
                usage_count,
                files,
            })
        })
        .collect()
}

fn has_deprecated_prefix(name: &str) -> bool {
    let lowered = name.trim().to_ascii_lowercase();
    DEPRECATED_NAME_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

pub fn find_drift_in_pr(graph: &Graph, pr: &str) -> Vec<PrDrift> {
    let Some(pr_handle) = graph.resolve(pr, NodeType::PullRequest) else {
        return Vec::new();
    };
    graph
        .incoming(pr_handle, Relation::FlaggedIn)
        .filter_map(|(edge, source)| match &graph.node(source).attrs {
            NodeAttrs::DriftSignal {
                drift_type,
                severity,
                message,
            } => Some(PrDrift {
                drift_id: edge.from_id.clone(),
                drift_type: *drift_type,
                severity: *severity,
                message: message.clone(),
            }),
            _ => None,
        })
        .collect()
}

pub fn find_files_changed_in_pr(graph: &Graph, pr: &str) -> Vec<String> {
    let Some(pr_handle) = graph.resolve(pr, NodeType::PullRequest) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for (_, commit) in graph.outgoing(pr_handle, Relation::Includes) {
        for (edge, file) in graph.outgoing(commit, Relation::Changed) {
            if seen.insert(file) {
                files.push(edge.to_id.clone());
            }
        }
    }
    files
}

pub fn calculate_coverage(graph: &Graph) -> Coverage {
    let tokens = graph.nodes_of_type(NodeType::Token).collect::<Vec<_>>();
    let used_tokens = tokens
        .iter()
        .filter(|(handle, _)| graph.has_incoming(*handle, Relation::Uses))
        .count();

    let components = graph.nodes_of_type(NodeType::Component).collect::<Vec<_>>();
    let tested_components = components
        .iter()
        .filter(|(handle, _)| graph.has_outgoing(*handle, Relation::TestedBy))
        .count();
    let documented_components = components
        .iter()
        .filter(|(handle, _)| graph.has_outgoing(*handle, Relation::DocumentedBy))
        .count();

    Coverage {
        token_coverage: ratio(used_tokens, tokens.len()),
        component_coverage: 1.0,
        test_coverage: ratio(tested_components, components.len()),
        story_coverage: ratio(documented_components, components.len()),
        total_tokens: tokens.len(),
        used_tokens,
        total_components: components.len(),
        tested_components,
        documented_components,
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    part as f64 / total as f64
}

/// Commits with a CHANGED edge into the file, in insertion order, de-duplicated.
fn commits_touching(graph: &Graph, file: NodeHandle) -> Vec<NodeHandle> {
    let mut seen = HashSet::new();
    graph
        .incoming(file, Relation::Changed)
        .map(|(_, commit)| commit)
        .filter(|commit| seen.insert(*commit))
        .collect()
}

/// Developer node with an AUTHORED edge to the commit, else the commit's author attribute.
fn commit_author(graph: &Graph, commit: NodeHandle) -> Option<String> {
    if let Some((edge, _)) = graph.incoming(commit, Relation::Authored).next() {
        return Some(edge.from_id.clone());
    }
    match &graph.node(commit).attrs {
        NodeAttrs::Commit {
            author: Some(author),
            ..
        } if !author.trim().is_empty() => Some(NodeType::Developer.node_id(author.trim())),
        _ => None,
    }
}

fn file_node_for(graph: &Graph, handle: NodeHandle) -> Option<NodeHandle> {
    match &graph.node(handle).attrs {
        NodeAttrs::File { .. } => Some(handle),
        NodeAttrs::Component {
            file: Some(file), ..
        } => graph.resolve(file, NodeType::File),
        _ => None,
    }
}

/// File a usage belongs to: the file node itself, or the declaring file of a component.
fn file_of(graph: &Graph, handle: NodeHandle) -> String {
    let node = graph.node(handle);
    match &node.attrs {
        NodeAttrs::File { path } => path.clone(),
        NodeAttrs::Component {
            file: Some(file), ..
        } => file.clone(),
        _ => node.key.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drift_attrs(message: &str) -> NodeAttrs {
        NodeAttrs::DriftSignal {
            drift_type: DriftType::HardcodedValue,
            severity: Severity::Warning,
            message: message.to_owned(),
        }
    }

    #[test]
    fn ownership_counts_commits_per_developer() {
        let mut graph = Graph::at(1);
        graph.add_node("src/Button.tsx", NodeAttrs::file("src/Button.tsx"));
        graph.add_node("alice", NodeAttrs::developer("alice"));
        graph.add_node("bob", NodeAttrs::developer("bob"));
        for (hash, author, at) in [("c1", "alice", 10), ("c2", "bob", 20), ("c3", "bob", 30)] {
            graph.add_node(hash, NodeAttrs::commit(format!("commit {hash}"), at));
            graph
                .add_edge(Relation::Authored, author, hash, EdgeAttrs::None)
                .expect("authored");
            graph
                .add_edge(Relation::Changed, hash, "src/Button.tsx", EdgeAttrs::None)
                .expect("changed");
        }

        let ownership = find_ownership(&graph, "src/Button.tsx").expect("ownership");
        assert_eq!(ownership.primary_author, "developer:bob");
        assert_eq!(ownership.total_commits, 3);
        assert_eq!(
            find_ownership(&graph, "file:src/Button.tsx"),
            Some(ownership)
        );
        assert_eq!(find_ownership(&graph, "src/Unknown.tsx"), None);
    }

    #[test]
    fn ownership_ties_go_to_first_seen_developer() {
        let mut graph = Graph::at(1);
        graph.add_node("a.css", NodeAttrs::file("a.css"));
        graph.add_node("zed", NodeAttrs::developer("zed"));
        graph.add_node("amy", NodeAttrs::developer("amy"));
        for (hash, author) in [("c1", "zed"), ("c2", "amy")] {
            graph.add_node(hash, NodeAttrs::commit(hash, 1));
            graph
                .add_edge(Relation::Authored, author, hash, EdgeAttrs::None)
                .expect("authored");
            graph
                .add_edge(Relation::Changed, hash, "a.css", EdgeAttrs::None)
                .expect("changed");
        }
        let ownership = find_ownership(&graph, "a.css").expect("ownership");
        assert_eq!(ownership.primary_author, "developer:zed");
    }

    #[test]
    fn drift_author_is_most_recent_committer_of_affected_file() {
        let mut graph = Graph::at(1);
        graph.add_node("src/Card.tsx", NodeAttrs::file("src/Card.tsx"));
        graph.add_node("sig-1", drift_attrs("hardcoded color"));
        graph
            .add_edge(Relation::Affects, "sig-1", "src/Card.tsx", EdgeAttrs::None)
            .expect("affects");
        graph.add_node(
            "c1",
            NodeAttrs::Commit {
                message: "old".to_owned(),
                author: Some("carol".to_owned()),
                timestamp: 100,
            },
        );
        graph.add_node(
            "c2",
            NodeAttrs::Commit {
                message: "new".to_owned(),
                author: Some("dan".to_owned()),
                timestamp: 200,
            },
        );
        for hash in ["c2", "c1"] {
            graph
                .add_edge(Relation::Changed, hash, "src/Card.tsx", EdgeAttrs::None)
                .expect("changed");
        }

        let author = find_drift_author(&graph, "driftsignal:sig-1").expect("author");
        assert_eq!(author.developer, "developer:dan");
        assert_eq!(author.commit_id, "commit:c2");
        assert_eq!(find_drift_author(&graph, "sig-1"), Some(author));
        assert_eq!(find_drift_author(&graph, "sig-missing"), None);
    }

    #[test]
    fn deprecated_usages_include_flagged_and_prefixed_tokens() {
        let mut graph = Graph::at(1);
        graph.add_node("_old-blue", NodeAttrs::token("_old-blue"));
        graph.add_node(
            "legacy-gray",
            NodeAttrs::Token {
                name: "legacy-gray".to_owned(),
                value: None,
                category: None,
                deprecated: true,
            },
        );
        graph.add_node("_unused", NodeAttrs::token("_unused"));
        graph.add_node("primary", NodeAttrs::token("primary"));
        graph.add_node("a.tsx", NodeAttrs::file("a.tsx"));
        graph.add_node("b.tsx", NodeAttrs::file("b.tsx"));
        for (file, token) in [
            ("a.tsx", "_old-blue"),
            ("b.tsx", "_old-blue"),
            ("a.tsx", "legacy-gray"),
            ("a.tsx", "primary"),
        ] {
            graph
                .add_edge(Relation::Uses, file, token, EdgeAttrs::None)
                .expect("uses");
        }

        let usages = find_deprecated_usages(&graph);
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].token_id, "token:_old-blue");
        assert_eq!(usages[0].usage_count, 2);
        assert_eq!(usages[0].files, vec!["a.tsx".to_owned(), "b.tsx".to_owned()]);
        assert_eq!(usages[1].token_id, "token:legacy-gray");
    }

    #[test]
    fn pr_queries_follow_flags_and_included_commits() {
        let mut graph = Graph::at(1);
        graph.add_node(
            "42",
            NodeAttrs::PullRequest {
                number: 42,
                title: "Restyle buttons".to_owned(),
                author: None,
            },
        );
        graph.add_node("sig-1", drift_attrs("hardcoded color"));
        graph
            .add_edge(Relation::FlaggedIn, "sig-1", "42", EdgeAttrs::None)
            .expect("flagged");
        graph.add_node("a.tsx", NodeAttrs::file("a.tsx"));
        graph.add_node("b.tsx", NodeAttrs::file("b.tsx"));
        for hash in ["c1", "c2"] {
            graph.add_node(hash, NodeAttrs::commit(hash, 1));
            graph
                .add_edge(Relation::Includes, "pr:42", hash, EdgeAttrs::None)
                .expect("includes");
            graph
                .add_edge(Relation::Changed, hash, "a.tsx", EdgeAttrs::None)
                .expect("changed a");
        }
        graph
            .add_edge(Relation::Changed, "c2", "b.tsx", EdgeAttrs::None)
            .expect("changed b");

        let drift = find_drift_in_pr(&graph, "42");
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].drift_id, "driftsignal:sig-1");
        assert_eq!(find_drift_in_pr(&graph, "pr:42"), drift);
        assert_eq!(
            find_files_changed_in_pr(&graph, "pr:42"),
            vec!["file:a.tsx".to_owned(), "file:b.tsx".to_owned()]
        );
        assert!(find_files_changed_in_pr(&graph, "pr:7").is_empty());
    }

    #[test]
    fn drifting_tokens_report_expected_and_actual_values() {
        let mut graph = Graph::at(1);
        graph.add_node("primary", NodeAttrs::token("primary"));
        graph.add_node("brand-primary", NodeAttrs::token("brand-primary"));
        graph
            .add_edge(
                Relation::DriftsFrom,
                "primary",
                "brand-primary",
                EdgeAttrs::DriftsFrom {
                    expected_value: "#3b82f6".to_owned(),
                    actual_value: "#2563eb".to_owned(),
                },
            )
            .expect("drifts from");

        let drifting = find_drifting_tokens(&graph);
        assert_eq!(drifting.len(), 1);
        assert_eq!(drifting[0].token_id, "token:primary");
        assert_eq!(drifting[0].expected_value, "#3b82f6");
        assert_eq!(drifting[0].actual_value, "#2563eb");
    }

    #[test]
    fn empty_graph_is_vacuously_covered() {
        let graph = Graph::at(1);
        let coverage = calculate_coverage(&graph);
        assert_eq!(coverage.token_coverage, 1.0);
        assert_eq!(coverage.component_coverage, 1.0);
        assert_eq!(coverage.test_coverage, 1.0);
        assert_eq!(coverage.story_coverage, 1.0);
    }
}
