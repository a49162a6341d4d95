use std::collections::{HashSet, VecDeque};

use buoy_config::GraphConfig;
use serde::{Deserialize, Serialize};

use crate::edge::Relation;
use crate::node::{NodeAttrs, NodeType, split_reference};
use crate::store::Graph;

pub const DEFAULT_IMPACT_DEPTH: u32 = 3;

const IMPACT_RELATIONS: [Relation; 2] = [Relation::Uses, Relation::Renders];
const IMPACT_TARGETS: [NodeType; 2] = [NodeType::Token, NodeType::Component];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Dependent counts at which impact risk escalates, plus the walk depth used
/// when a caller passes `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpactThresholds {
    pub medium: usize,
    pub high: usize,
    pub depth: u32,
}

impl Default for ImpactThresholds {
    fn default() -> Self {
        Self::from(&GraphConfig::default())
    }
}

impl From<&GraphConfig> for ImpactThresholds {
    fn from(config: &GraphConfig) -> Self {
        Self {
            medium: config.impact_medium_dependents,
            high: config.impact_high_dependents,
            depth: config.impact_max_depth,
        }
    }
}

impl ImpactThresholds {
    pub fn risk_for(&self, dependents: usize) -> RiskLevel {
        if dependents >= self.high {
            return RiskLevel::High;
        }
        if dependents >= self.medium {
            return RiskLevel::Medium;
        }
        RiskLevel::Low
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ImpactAnalysis {
    pub entity_id: String,
    pub direct_dependents: Vec<String>,
    pub transitive_dependents: Vec<String>,
    pub affected_files: Vec<String>,
    pub risk_level: RiskLevel,
}

impl ImpactAnalysis {
    pub fn total_dependents(&self) -> usize {
        self.direct_dependents.len() + self.transitive_dependents.len()
    }
}

pub fn analyze_impact(graph: &Graph, entity: &str, max_depth: u32) -> ImpactAnalysis {
    analyze_impact_with(graph, entity, max_depth, &ImpactThresholds::default())
}

/// Breadth-first walk over incoming USES/RENDERS edges, i.e. everything that
/// would notice a change to `entity`, up to `max_depth` hops.
pub fn analyze_impact_with(
    graph: &Graph,
    entity: &str,
    max_depth: u32,
    thresholds: &ImpactThresholds,
) -> ImpactAnalysis {
    let Some(start) = graph.resolve_prefixed_or(entity, &IMPACT_TARGETS) else {
        let (node_type, key) = split_reference(entity);
        return ImpactAnalysis {
            entity_id: node_type.unwrap_or(IMPACT_TARGETS[0]).node_id(key),
            ..ImpactAnalysis::default()
        };
    };
    let max_depth = match (max_depth, thresholds.depth) {
        (0, 0) => DEFAULT_IMPACT_DEPTH,
        (0, configured) => configured,
        (requested, _) => requested,
    };

    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 0u32)]);
    let mut direct_dependents = Vec::new();
    let mut transitive_dependents = Vec::new();
    let mut affected_files = Vec::new();

    while let Some((handle, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for relation in IMPACT_RELATIONS {
            for (_, dependent) in graph.incoming(handle, relation) {
                if !visited.insert(dependent) {
                    continue;
                }
                let node = graph.node(dependent);
                let id = graph.node_id(dependent);
                if depth == 0 {
                    direct_dependents.push(id.clone());
                } else {
                    transitive_dependents.push(id.clone());
                }
                if let NodeAttrs::File { .. } = node.attrs {
                    affected_files.push(id);
                }
                queue.push_back((dependent, depth + 1));
            }
        }
    }

    let risk_level = thresholds.risk_for(direct_dependents.len() + transitive_dependents.len());
    ImpactAnalysis {
        entity_id: graph.node_id(start),
        direct_dependents,
        transitive_dependents,
        affected_files,
        risk_level,
    }
}
