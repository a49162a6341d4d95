use std::fs;

use buoy_analysis::{
    AnalysisOptions, ApplyOptions, FixPipeline, FixStatus, FrameworkInfo, GenerateOptions,
    SemanticDiffEngine,
};
use buoy_config::{BuoyConfig, ConfidenceLevel};
use buoy_core::{
    Component, ComponentSource, DesignToken, DriftSignal, DriftType, HardcodedKind,
    HardcodedValue, Severity, TokenCategory, TokenSource, TokenValue,
};
use tempfile::tempdir;

fn component(name: &str, path: &str) -> Component {
    Component::new(
        name,
        ComponentSource::Framework {
            framework: "react".to_owned(),
            path: path.to_owned(),
            export_name: name.to_owned(),
            line: Some(1),
        },
        1,
    )
}

fn color_token(name: &str, hex: &str) -> DesignToken {
    DesignToken::new(
        name,
        TokenValue::Color {
            hex: hex.to_owned(),
        },
        TokenCategory::Color,
        TokenSource::Css {
            path: "src/tokens.css".to_owned(),
        },
        1,
    )
}

fn with_hardcoded(mut component: Component, findings: &[(&str, &str)]) -> Component {
    component.metadata.hardcoded_values = findings
        .iter()
        .map(|(value, location)| HardcodedValue {
            kind: HardcodedKind::Color,
            value: (*value).to_owned(),
            property: Some("color".to_owned()),
            location: (*location).to_owned(),
        })
        .collect();
    component
}

fn ids(signals: &[DriftSignal]) -> Vec<String> {
    signals.iter().map(|signal| signal.id.clone()).collect()
}

#[test]
fn two_ui_frameworks_raise_one_sprawl_warning() {
    let engine = SemanticDiffEngine::new();
    let signal = engine
        .check_framework_sprawl(&[FrameworkInfo::new("react"), FrameworkInfo::new("vue")])
        .expect("sprawl signal");
    assert_eq!(signal.drift_type, DriftType::FrameworkSprawl);
    assert_eq!(signal.severity, Severity::Warning);
    assert!(signal.message.contains("2 UI frameworks"));
}

#[test]
fn repeated_analysis_yields_identical_signal_ids() {
    let components = vec![
        with_hardcoded(
            component("Button", "src/Button.tsx"),
            &[("#3b82f6", "src/Button.tsx:3:10"), ("#111827", "src/Button.tsx:4:10")],
        ),
        component("card_list", "src/CardList.tsx"),
        component("Modal", "src/Modal.tsx"),
        component("Tooltip", "src/Tooltip.tsx"),
    ];
    let options = AnalysisOptions::all().with_tokens(vec![color_token("blue-500", "#3b82f6")]);

    // Different engines and clocks: ids depend only on the inputs.
    let first = SemanticDiffEngine::new().at(1).analyze_components(&components, &options);
    let second = SemanticDiffEngine::new().at(99).analyze_components(&components, &options);
    assert!(!first.signals.is_empty());
    assert_eq!(ids(&first.signals), ids(&second.signals));

    let source = [color_token("primary", "#3b82f6"), color_token("muted", "#6b7280")];
    let target = [color_token("primary", "#2563eb")];
    let engine = SemanticDiffEngine::new();
    assert_eq!(
        ids(&engine.compare_tokens(&source, &target).drift_signals),
        ids(&engine.compare_tokens(&source, &target).drift_signals)
    );
}

#[test]
fn comparisons_account_for_every_entity() {
    let engine = SemanticDiffEngine::new().at(1);
    let source = vec![
        component("Button", "src/Button.tsx"),
        component("Button", "src/legacy/Button.tsx"),
        component("Card", "src/Card.tsx"),
        component("Badge", "src/Badge.tsx"),
    ];
    let target = vec![
        component("Button", "design/Button"),
        component("Card", "design/Card"),
        component("Avatar", "design/Avatar"),
    ];

    let comparison = engine.compare_components(&source, &target);
    assert_eq!(
        comparison.matches.len() + comparison.orphaned_source.len(),
        source.len()
    );
    assert_eq!(
        comparison.matches.len() + comparison.orphaned_target.len(),
        target.len()
    );
    assert_eq!(comparison.orphaned_source.len(), 2);
    assert_eq!(
        comparison
            .drift_signals
            .iter()
            .filter(|signal| signal.drift_type == DriftType::OrphanedComponent)
            .count(),
        2
    );

    let tokens = engine.compare_tokens(
        &[color_token("primary", "#3b82f6"), color_token("primary", "#3b82f6")],
        &[color_token("primary", "#3b82f6")],
    );
    assert_eq!(tokens.matches.len() + tokens.orphaned_source.len(), 2);
    assert_eq!(tokens.matches.len() + tokens.orphaned_target.len(), 1);
}

#[test]
fn fixes_apply_once_with_backup() {
    let dir = tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("src")).expect("create src");
    let button = "export const Button = () => (\n  <button style={{ color: '#3b82f6' }} />\n);\n";
    fs::write(dir.path().join("src/Button.tsx"), button).expect("write button");

    let tokens = vec![color_token("blue-500", "#3b82f6")];
    let components = vec![with_hardcoded(
        component("Button", "src/Button.tsx"),
        &[("#3b82f6", "src/Button.tsx:2:28")],
    )];
    let engine = SemanticDiffEngine::new().at(1);
    let analysis = engine.analyze_components(
        &components,
        &AnalysisOptions::default().with_tokens(tokens.clone()),
    );

    let pipeline = FixPipeline::with_config(dir.path(), &BuoyConfig::default());
    let fixes = pipeline
        .generate_fixes(&analysis.signals, &tokens, &GenerateOptions::default())
        .expect("generate fixes");
    assert_eq!(fixes.len(), 1);
    assert_eq!(fixes[0].confidence, ConfidenceLevel::High);

    let validation = pipeline.validate_fix_targets(&fixes);
    assert_eq!(validation.valid.len(), 1, "{:?}", validation.invalid);
    assert!(pipeline.run_safety_checks(&fixes).safe);

    let dry = pipeline.apply_fixes(
        &fixes,
        &ApplyOptions {
            dry_run: true,
            ..ApplyOptions::default()
        },
    );
    assert_eq!(dry.applied, 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("src/Button.tsx")).expect("read"),
        button
    );

    let options = ApplyOptions {
        backup: true,
        ..ApplyOptions::default()
    };
    let applied = pipeline.apply_fixes(&fixes, &options);
    assert_eq!(applied.applied, 1);
    assert_eq!(applied.failed, 0);
    let rewritten = fs::read_to_string(dir.path().join("src/Button.tsx")).expect("read");
    assert!(rewritten.contains("color: 'var(--blue-500)'"));
    assert_eq!(
        fs::read_to_string(dir.path().join("src/Button.tsx.bak")).expect("read backup"),
        button
    );

    let again = pipeline.apply_fixes(&fixes, &options);
    assert_eq!(again.applied, 0);
    assert_eq!(again.skipped, 1);
    assert_eq!(again.outcomes[0].reason.as_deref(), Some("already applied"));
    assert_eq!(
        fs::read_to_string(dir.path().join("src/Button.tsx")).expect("read"),
        rewritten
    );
}

#[test]
fn failures_are_reported_per_fix_without_rollback() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("a.css"), ".a {\n  color: #3b82f6;\n}\n").expect("write a");

    let tokens = vec![color_token("blue-500", "#3b82f6")];
    let components = vec![
        with_hardcoded(component("A", "a.css"), &[("#3b82f6", "a.css:2:10")]),
        with_hardcoded(component("B", "missing.css"), &[("#3b82f6", "missing.css:1:1")]),
    ];
    let analysis = SemanticDiffEngine::new()
        .at(1)
        .analyze_components(&components, &AnalysisOptions::default());

    let pipeline = FixPipeline::with_config(dir.path(), &BuoyConfig::default());
    let fixes = pipeline
        .generate_fixes(&analysis.signals, &tokens, &GenerateOptions::default())
        .expect("generate fixes");
    assert_eq!(fixes.len(), 2);

    let validation = pipeline.validate_fix_targets(&fixes);
    assert_eq!(validation.valid.len(), 1);
    assert_eq!(validation.invalid.len(), 1);
    assert_eq!(validation.invalid[0].fix.file, "missing.css");

    let result = pipeline.apply_fixes(&fixes, &ApplyOptions::default());
    assert_eq!(result.applied, 1);
    assert_eq!(result.failed, 1);
    let failed = result
        .outcomes
        .iter()
        .find(|outcome| outcome.status == FixStatus::Failed)
        .expect("failed outcome");
    assert_eq!(failed.file, "missing.css");
    assert_eq!(
        fs::read_to_string(dir.path().join("a.css")).expect("read a"),
        ".a {\n  color: var(--blue-500);\n}\n"
    );
}

#[test]
fn low_confidence_fixes_are_skipped_on_apply() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("a.css"), "color: #3b82c8;\n").expect("write");
    let tokens = vec![color_token("blue-500", "#3b82f6")];
    let components = vec![with_hardcoded(
        component("A", "a.css"),
        &[("#3b82c8", "a.css:1:8")],
    )];
    let analysis = SemanticDiffEngine::new()
        .at(1)
        .analyze_components(&components, &AnalysisOptions::default());

    let pipeline = FixPipeline::with_config(dir.path(), &BuoyConfig::default());
    assert!(
        pipeline
            .generate_fixes(&analysis.signals, &tokens, &GenerateOptions::default())
            .expect("generate")
            .is_empty()
    );

    let fixes = pipeline
        .generate_fixes(
            &analysis.signals,
            &tokens,
            &GenerateOptions {
                min_confidence: Some(ConfidenceLevel::Low),
                ..GenerateOptions::default()
            },
        )
        .expect("generate");
    assert_eq!(fixes.len(), 1);
    assert!(!pipeline.run_safety_checks(&fixes).warnings.is_empty());

    let result = pipeline.apply_fixes(&fixes, &ApplyOptions::default());
    assert_eq!(result.skipped, 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("a.css")).expect("read"),
        "color: #3b82c8;\n"
    );
}
