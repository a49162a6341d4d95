use buoy_config::BuoyConfig;
use buoy_graph::{
    EdgeAttrs, Graph, NodeAttrs, Relation, RiskLevel, analyze_impact, calculate_coverage,
    find_component_renderers, find_configured_repeat_offenders, find_drift_author,
    find_drift_in_pr, find_files_changed_in_pr, find_ownership, find_repeat_offenders,
    find_token_usages, find_undocumented_components, find_untested_components,
    find_unused_tokens,
};

fn token_graph() -> Graph {
    let mut graph = Graph::at(1_000);
    graph.add_node("primary", NodeAttrs::token("primary"));
    graph.add_node("secondary", NodeAttrs::token("secondary"));
    for file in ["Button.tsx", "Card.tsx"] {
        graph.add_node(file, NodeAttrs::file(file));
        graph
            .add_edge(Relation::Uses, file, "primary", EdgeAttrs::None)
            .expect("file uses primary");
    }
    graph
}

fn component_graph() -> Graph {
    let mut graph = Graph::at(1_000);
    for name in ["Button", "Card", "Modal"] {
        graph.add_node(name, NodeAttrs::component(name));
    }
    graph.add_node(
        "button-test",
        NodeAttrs::Test {
            name: "renders button".to_owned(),
            file: Some("Button.test.tsx".to_owned()),
        },
    );
    graph.add_node(
        "card-test",
        NodeAttrs::Test {
            name: "renders card".to_owned(),
            file: Some("Card.test.tsx".to_owned()),
        },
    );
    graph.add_node(
        "button-story",
        NodeAttrs::Story {
            name: "Button/Primary".to_owned(),
            file: Some("Button.stories.tsx".to_owned()),
        },
    );
    graph
        .add_edge(Relation::TestedBy, "Button", "button-test", EdgeAttrs::None)
        .expect("button tested");
    graph
        .add_edge(Relation::TestedBy, "Card", "card-test", EdgeAttrs::None)
        .expect("card tested");
    graph
        .add_edge(
            Relation::DocumentedBy,
            "Button",
            "button-story",
            EdgeAttrs::None,
        )
        .expect("button documented");
    graph
        .add_edge(Relation::Renders, "Modal", "Button", EdgeAttrs::None)
        .expect("modal renders button");
    graph
}

#[test]
fn token_usage_and_unused_tokens() {
    let graph = token_graph();
    let usages = find_token_usages(&graph, "primary");
    assert_eq!(usages.usage_count, 2);
    let files = usages
        .usages
        .iter()
        .map(|usage| usage.file.as_str())
        .collect::<Vec<_>>();
    assert_eq!(files, vec!["Button.tsx", "Card.tsx"]);

    let unused = find_unused_tokens(&graph);
    assert!(unused.contains(&"token:secondary".to_owned()));
    assert!(!unused.contains(&"token:primary".to_owned()));
}

#[test]
fn untested_and_undocumented_components() {
    let graph = component_graph();
    assert_eq!(
        find_untested_components(&graph),
        vec!["component:Modal".to_owned()]
    );
    assert_eq!(
        find_undocumented_components(&graph),
        vec!["component:Card".to_owned(), "component:Modal".to_owned()]
    );

    let coverage = calculate_coverage(&graph);
    assert!((coverage.test_coverage - 2.0 / 3.0).abs() < 1e-9);
    assert!((coverage.story_coverage - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(coverage.component_coverage, 1.0);
    assert_eq!(coverage.token_coverage, 1.0);
}

#[test]
fn repeat_offenders_respect_threshold() {
    let mut graph = Graph::at(1_000);
    graph.add_node("src/Card.tsx", NodeAttrs::file("src/Card.tsx"));
    graph.add_node("src/Button.tsx", NodeAttrs::file("src/Button.tsx"));
    for (signal, file) in [
        ("sig-1", "src/Card.tsx"),
        ("sig-2", "src/Card.tsx"),
        ("sig-3", "src/Button.tsx"),
    ] {
        graph.add_node(
            signal,
            NodeAttrs::DriftSignal {
                drift_type: buoy_core::DriftType::HardcodedValue,
                severity: buoy_core::Severity::Warning,
                message: "Hardcoded color".to_owned(),
            },
        );
        graph
            .add_edge(Relation::Affects, signal, file, EdgeAttrs::None)
            .expect("affects");
    }

    let offenders = find_repeat_offenders(&graph, 2);
    assert_eq!(offenders.len(), 1);
    assert_eq!(offenders[0].file_id, "file:src/Card.tsx");
    assert_eq!(offenders[0].drift_count, 2);

    assert!(find_repeat_offenders(&graph, 5).is_empty());

    let all = find_repeat_offenders(&graph, 1);
    assert_eq!(all.len(), 2);
    assert!(all[0].drift_count >= all[1].drift_count);
}

#[test]
fn repeat_offender_threshold_comes_from_config() {
    let mut graph = Graph::at(1_000);
    graph.add_node("src/Card.tsx", NodeAttrs::file("src/Card.tsx"));
    for signal in ["sig-1", "sig-2"] {
        graph.add_node(
            signal,
            NodeAttrs::DriftSignal {
                drift_type: buoy_core::DriftType::HardcodedValue,
                severity: buoy_core::Severity::Warning,
                message: "Hardcoded color".to_owned(),
            },
        );
        graph
            .add_edge(Relation::Affects, signal, "src/Card.tsx", EdgeAttrs::None)
            .expect("affects");
    }

    // The default threshold is 3.
    assert!(find_configured_repeat_offenders(&graph, &BuoyConfig::default().graph).is_empty());

    let config: BuoyConfig =
        toml::from_str("[graph]\nrepeat_offender_threshold = 2\n").expect("parse config");
    let offenders = find_configured_repeat_offenders(&graph, &config.graph);
    assert_eq!(offenders.len(), 1);
    assert_eq!(offenders[0].file_id, "file:src/Card.tsx");
}

#[test]
fn impact_of_missing_entity_is_low_and_empty() {
    let graph = token_graph();
    let impact = analyze_impact(&graph, "does-not-exist", 3);
    assert_eq!(impact.risk_level, RiskLevel::Low);
    assert!(impact.direct_dependents.is_empty());
    assert!(impact.transitive_dependents.is_empty());
    assert!(impact.affected_files.is_empty());
}

#[test]
fn queries_treat_bare_and_prefixed_references_alike() {
    let mut graph = component_graph();
    graph.add_node("primary", NodeAttrs::token("primary"));
    graph.add_node("Button.tsx", NodeAttrs::file("Button.tsx"));
    graph
        .add_edge(Relation::Uses, "Button.tsx", "primary", EdgeAttrs::None)
        .expect("uses");
    graph.add_node("c1", NodeAttrs::commit("init", 5));
    graph.add_node("erin", NodeAttrs::developer("erin"));
    graph
        .add_edge(Relation::Authored, "erin", "c1", EdgeAttrs::None)
        .expect("authored");
    graph
        .add_edge(Relation::Changed, "c1", "Button.tsx", EdgeAttrs::None)
        .expect("changed");
    graph.add_node(
        "sig-1",
        NodeAttrs::DriftSignal {
            drift_type: buoy_core::DriftType::HardcodedValue,
            severity: buoy_core::Severity::Warning,
            message: "Hardcoded color".to_owned(),
        },
    );
    graph
        .add_edge(Relation::Affects, "sig-1", "Button.tsx", EdgeAttrs::None)
        .expect("affects");
    graph.add_node(
        "12",
        NodeAttrs::PullRequest {
            number: 12,
            title: "Buttons".to_owned(),
            author: None,
        },
    );
    graph
        .add_edge(Relation::Includes, "12", "c1", EdgeAttrs::None)
        .expect("includes");
    graph
        .add_edge(Relation::FlaggedIn, "sig-1", "12", EdgeAttrs::None)
        .expect("flagged");

    assert_eq!(
        find_token_usages(&graph, "primary"),
        find_token_usages(&graph, "token:primary")
    );
    assert_eq!(
        analyze_impact(&graph, "primary", 2),
        analyze_impact(&graph, "token:primary", 2)
    );
    assert_eq!(
        analyze_impact(&graph, "Button", 2),
        analyze_impact(&graph, "component:Button", 2)
    );
    assert_eq!(
        find_component_renderers(&graph, "Button"),
        find_component_renderers(&graph, "component:Button")
    );
    assert_eq!(
        find_ownership(&graph, "Button.tsx"),
        find_ownership(&graph, "file:Button.tsx")
    );
    assert!(find_ownership(&graph, "Button.tsx").is_some());
    assert_eq!(
        find_drift_author(&graph, "sig-1"),
        find_drift_author(&graph, "driftsignal:sig-1")
    );
    assert_eq!(
        find_drift_in_pr(&graph, "12"),
        find_drift_in_pr(&graph, "pr:12")
    );
    assert_eq!(
        find_files_changed_in_pr(&graph, "12"),
        find_files_changed_in_pr(&graph, "pr:12")
    );
    assert_eq!(find_files_changed_in_pr(&graph, "12").len(), 1);

    assert_eq!(
        find_token_usages(&graph, "nope"),
        find_token_usages(&graph, "token:nope")
    );
    assert_eq!(
        analyze_impact(&graph, "nope", 2),
        analyze_impact(&graph, "token:nope", 2)
    );
    assert_eq!(
        find_component_renderers(&graph, "Nope"),
        find_component_renderers(&graph, "component:Nope")
    );
    assert_eq!(
        find_ownership(&graph, "nope.tsx"),
        find_ownership(&graph, "file:nope.tsx")
    );
    assert_eq!(
        find_drift_author(&graph, "sig-9"),
        find_drift_author(&graph, "driftsignal:sig-9")
    );
    assert_eq!(find_drift_in_pr(&graph, "99"), find_drift_in_pr(&graph, "pr:99"));
}
