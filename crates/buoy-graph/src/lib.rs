use thiserror::Error;

mod edge;
mod impact;
pub mod ingest;
mod node;
mod query;
mod store;

pub use edge::{Edge, EdgeAttrs, Relation};
pub use impact::{ImpactAnalysis, ImpactThresholds, RiskLevel, analyze_impact, analyze_impact_with};
pub use node::{GraphEntity, Node, NodeAttrs, NodeType, split_reference};
pub use query::{
    AuthorCommits, Coverage, DeprecatedUsage, DriftAuthor, DriftingToken, Ownership, PrDrift,
    RepeatOffender, TokenUsage, TokenUsages, calculate_coverage, find_component_renderers,
    find_configured_repeat_offenders, find_deprecated_usages, find_drift_author,
    find_drift_in_pr, find_drifting_tokens, find_files_changed_in_pr, find_ownership,
    find_repeat_offenders, find_token_usages, find_undocumented_components,
    find_untested_components, find_unused_tokens,
};
pub use store::{EdgeHandle, Graph, NodeHandle, create_graph};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("{relation} edge endpoint '{reference}' does not resolve to a node")]
    UnknownNode {
        reference: String,
        relation: &'static str,
    },
}
