use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use buoy_config::{BuoyConfig, ConfidenceLevel, FixConfig, load_workspace_config};
use buoy_core::value::{parse_color, parse_spacing_px};
use buoy_core::{
    DesignToken, DriftSignal, DriftType, HardcodedKind, HardcodedValue, content_hash,
    normalize_path,
};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::AnalysisError;
use crate::confidence::ConfidenceScorer;

/// Renders the source text that refers to a token.
pub trait TokenReference: Send + Sync {
    fn reference(&self, token_name: &str) -> String;
}

/// `var(--name)`
#[derive(Debug, Clone, Copy, Default)]
pub struct CssVariableReference;

impl TokenReference for CssVariableReference {
    fn reference(&self, token_name: &str) -> String {
        let name = token_name.trim();
        let name = name.strip_prefix("--").unwrap_or(name);
        format!("var(--{name})")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub id: String,
    pub drift_id: String,
    pub file: String,
    /// 1-based.
    pub line: u32,
    /// 1-based byte column of `original`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub original: String,
    pub replacement: String,
    pub token_name: String,
    pub confidence: ConfidenceLevel,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Drift types to consider. Empty means all.
    #[serde(default)]
    pub types: Vec<DriftType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<ConfidenceLevel>,
    #[serde(default)]
    pub include_files: Vec<String>,
    #[serde(default)]
    pub exclude_files: Vec<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            types: vec![DriftType::HardcodedValue],
            min_confidence: None,
            include_files: Vec::new(),
            exclude_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidFix {
    pub fix: Fix,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FixValidation {
    pub valid: Vec<Fix>,
    pub invalid: Vec<InvalidFix>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SafetyReport {
    pub safe: bool,
    /// Conditions that make the batch unsafe to apply.
    pub errors: Vec<String>,
    /// Advisories that do not block application.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApplyOptions {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub backup: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<ConfidenceLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Applied,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixOutcome {
    pub fix_id: String,
    pub file: String,
    pub status: FixStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApplyResult {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<FixOutcome>,
}

impl ApplyResult {
    fn record(&mut self, fix: &Fix, status: FixStatus, reason: Option<String>) {
        match status {
            FixStatus::Applied => self.applied += 1,
            FixStatus::Skipped => self.skipped += 1,
            FixStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(FixOutcome {
            fix_id: fix.id.clone(),
            file: fix.file.clone(),
            status,
            reason,
        });
    }
}

/// Byte range on one line plus the text that replaces it.
struct PlannedEdit<'a> {
    fix: &'a Fix,
    line: usize,
    start: usize,
    end: usize,
}

enum Located {
    At(usize),
    AlreadyApplied,
    Missing(String),
}

pub struct FixPipeline {
    workspace: PathBuf,
    config: FixConfig,
    scorer: ConfidenceScorer,
    reference: Box<dyn TokenReference>,
}

impl FixPipeline {
    pub fn new(workspace: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let workspace = workspace.as_ref().to_path_buf();
        let config = load_workspace_config(&workspace)?;
        Ok(Self::with_config(workspace, &config))
    }

    pub fn with_config(workspace: impl AsRef<Path>, config: &BuoyConfig) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
            config: config.fix.clone(),
            scorer: ConfidenceScorer::from_config(&config.confidence),
            reference: Box::new(CssVariableReference),
        }
    }

    pub fn with_reference(mut self, reference: Box<dyn TokenReference>) -> Self {
        self.reference = reference;
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn config(&self) -> &FixConfig {
        &self.config
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Proposes a token replacement for every eligible hardcoded-value signal.
    pub fn generate_fixes(
        &self,
        signals: &[DriftSignal],
        tokens: &[DesignToken],
        options: &GenerateOptions,
    ) -> Result<Vec<Fix>, AnalysisError> {
        let include = build_globset(&options.include_files)?;
        let exclude = build_globset(&options.exclude_files)?;
        let min_confidence = options.min_confidence.unwrap_or(self.config.min_confidence);

        let mut fixes = Vec::new();
        for signal in signals {
            if signal.is_resolved() {
                continue;
            }
            if !options.types.is_empty() && !options.types.contains(&signal.drift_type) {
                continue;
            }
            if signal.drift_type != DriftType::HardcodedValue {
                continue;
            }
            let Some(original) = signal.details.actual.as_deref().map(str::trim) else {
                continue;
            };
            let Some(kind) = infer_kind(original) else {
                debug!(drift_id = %signal.id, value = original, "no scorer for hardcoded value");
                continue;
            };
            let finding = HardcodedValue {
                kind,
                value: original.to_owned(),
                property: None,
                location: signal.source.location.clone(),
            };
            let Some((file, line, column)) = finding.parse_location() else {
                debug!(drift_id = %signal.id, location = %signal.source.location, "signal has no line location");
                continue;
            };
            if include
                .as_ref()
                .is_some_and(|include| !include.is_match(&file))
            {
                continue;
            }
            if exclude.as_ref().is_some_and(|exclude| exclude.is_match(&file)) {
                continue;
            }

            let result = self.scorer.score_confidence(&finding, tokens);
            if !result.meets(min_confidence) {
                debug!(
                    drift_id = %signal.id,
                    level = result.level.as_str(),
                    reason = %result.reason,
                    "fix below minimum confidence"
                );
                continue;
            }
            let Some(suggestion) = result.suggestion else {
                continue;
            };
            let replacement = self.reference.reference(&suggestion.token_name);
            fixes.push(Fix {
                id: content_hash(&format!(
                    "{}\n{file}\n{line}\n{}\n{replacement}",
                    signal.id,
                    column.unwrap_or_default()
                )),
                drift_id: signal.id.clone(),
                file,
                line,
                column,
                original: original.to_owned(),
                replacement,
                token_name: suggestion.token_name,
                confidence: result.level,
                score: result.score,
            });
        }
        debug!(signals = signals.len(), fixes = fixes.len(), "generated fixes");
        Ok(fixes)
    }

    /// Splits fixes by whether their target line still exists and holds the
    /// original text unambiguously.
    pub fn validate_fix_targets(&self, fixes: &[Fix]) -> FixValidation {
        let mut contents = HashMap::<String, Result<String, String>>::new();
        let mut validation = FixValidation::default();
        for fix in fixes {
            let content = contents.entry(fix.file.clone()).or_insert_with(|| {
                fs::read_to_string(self.resolve(&fix.file))
                    .map_err(|err| format!("cannot read {}: {err}", fix.file))
            });
            let verdict = match content {
                Err(reason) => Err(reason.clone()),
                Ok(text) => match nth_line(text, fix.line) {
                    None => Err(format!("line {} no longer exists", fix.line)),
                    Some(line) => match locate(line, fix) {
                        Located::At(_) => Ok(()),
                        Located::AlreadyApplied => Err("fix is already applied".to_owned()),
                        Located::Missing(reason) => Err(reason),
                    },
                },
            };
            match verdict {
                Ok(()) => validation.valid.push(fix.clone()),
                Err(reason) => validation.invalid.push(InvalidFix {
                    fix: fix.clone(),
                    reason,
                }),
            }
        }
        validation
    }

    pub fn run_safety_checks(&self, fixes: &[Fix]) -> SafetyReport {
        let mut report = SafetyReport::default();
        let mut by_file = Vec::<(&str, Vec<&Fix>)>::new();
        for fix in fixes {
            match by_file.iter_mut().find(|(file, _)| *file == fix.file) {
                Some((_, group)) => group.push(fix),
                None => by_file.push((fix.file.as_str(), vec![fix])),
            }
        }

        for (file, group) in &by_file {
            if group.len() > self.config.max_edits_per_file {
                report.errors.push(format!(
                    "{file}: {} edits exceed the limit of {}",
                    group.len(),
                    self.config.max_edits_per_file
                ));
            }
            for (index, left) in group.iter().enumerate() {
                for right in &group[index + 1..] {
                    if overlaps(left, right) {
                        report.errors.push(format!(
                            "{file}:{}: fixes for '{}' and '{}' overlap",
                            left.line, left.original, right.original
                        ));
                    }
                }
            }
        }

        for fix in fixes {
            if fix.confidence < ConfidenceLevel::High {
                report.warnings.push(format!(
                    "{}:{}: '{}' -> '{}' has {} confidence",
                    fix.file,
                    fix.line,
                    fix.original,
                    fix.replacement,
                    fix.confidence.as_str()
                ));
            }
        }
        report.safe = report.errors.is_empty();
        report
    }

    /// Applies fixes file by file. Each file is rewritten atomically; a failure
    /// in one file leaves files already written untouched.
    pub fn apply_fixes(&self, fixes: &[Fix], options: &ApplyOptions) -> ApplyResult {
        let min_confidence = options.min_confidence.unwrap_or(self.config.min_confidence);
        let mut result = ApplyResult::default();
        let mut by_file = Vec::<(&str, Vec<&Fix>)>::new();
        for fix in fixes {
            if fix.confidence < min_confidence {
                result.record(fix, FixStatus::Skipped, Some("below minimum confidence".to_owned()));
                continue;
            }
            match by_file.iter_mut().find(|(file, _)| *file == fix.file) {
                Some((_, group)) => group.push(fix),
                None => by_file.push((fix.file.as_str(), vec![fix])),
            }
        }

        for (file, group) in by_file {
            self.apply_file(file, &group, options, &mut result);
        }
        if !options.dry_run {
            info!(
                applied = result.applied,
                failed = result.failed,
                skipped = result.skipped,
                "applied fixes"
            );
        }
        result
    }

    fn apply_file(&self, file: &str, fixes: &[&Fix], options: &ApplyOptions, result: &mut ApplyResult) {
        let path = self.resolve(file);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                warn!(file, error = %err, "cannot read fix target");
                for fix in fixes {
                    result.record(fix, FixStatus::Failed, Some(format!("cannot read file: {err}")));
                }
                return;
            }
        };
        let mut lines = content
            .split_inclusive('\n')
            .map(str::to_owned)
            .collect::<Vec<_>>();

        let mut planned = Vec::<PlannedEdit<'_>>::new();
        for &fix in fixes {
            let Some(line_index) = (fix.line as usize).checked_sub(1).filter(|index| *index < lines.len())
            else {
                result.record(fix, FixStatus::Failed, Some(format!("line {} no longer exists", fix.line)));
                continue;
            };
            match locate(&lines[line_index], fix) {
                Located::AlreadyApplied => {
                    result.record(fix, FixStatus::Skipped, Some("already applied".to_owned()));
                }
                Located::Missing(reason) => result.record(fix, FixStatus::Failed, Some(reason)),
                Located::At(start) => {
                    let end = start + fix.original.len();
                    let clashes = planned.iter().any(|edit| {
                        edit.line == line_index && start < edit.end && edit.start < end
                    });
                    if clashes {
                        result.record(
                            fix,
                            FixStatus::Failed,
                            Some("overlaps another fix in this batch".to_owned()),
                        );
                        continue;
                    }
                    planned.push(PlannedEdit {
                        fix,
                        line: line_index,
                        start,
                        end,
                    });
                }
            }
        }
        if planned.is_empty() {
            return;
        }

        if options.dry_run {
            for edit in &planned {
                result.record(edit.fix, FixStatus::Applied, Some("dry run".to_owned()));
            }
            return;
        }

        if options.backup {
            let backup = backup_path(&path, &self.config.backup_extension);
            if let Err(err) = fs::copy(&path, &backup) {
                warn!(file, backup = %backup.display(), error = %err, "backup failed, file left untouched");
                for edit in &planned {
                    result.record(edit.fix, FixStatus::Failed, Some(format!("backup failed: {err}")));
                }
                return;
            }
        }

        // Right to left so earlier byte offsets on a line stay valid.
        let mut order = (0..planned.len()).collect::<Vec<_>>();
        order.sort_by(|left, right| {
            let (left, right) = (&planned[*left], &planned[*right]);
            (right.line, right.start).cmp(&(left.line, left.start))
        });
        for index in order {
            let edit = &planned[index];
            lines[edit.line].replace_range(edit.start..edit.end, &edit.fix.replacement);
        }

        match write_atomic(&path, &lines.concat()) {
            Ok(()) => {
                info!(file, edits = planned.len(), "rewrote file");
                for edit in &planned {
                    result.record(edit.fix, FixStatus::Applied, None);
                }
            }
            Err(err) => {
                warn!(file, error = %err, "write failed, file left untouched");
                for edit in &planned {
                    result.record(edit.fix, FixStatus::Failed, Some(format!("write failed: {err}")));
                }
            }
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, AnalysisError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(pattern.trim())
                .literal_separator(true)
                .build()?,
        );
    }
    Ok(Some(builder.build()?))
}

fn infer_kind(value: &str) -> Option<HardcodedKind> {
    if parse_color(value).is_some() {
        return Some(HardcodedKind::Color);
    }
    parse_spacing_px(value, buoy_core::value::DEFAULT_REM_BASE_PX).map(|_| HardcodedKind::Spacing)
}

fn nth_line(text: &str, line: u32) -> Option<&str> {
    let index = (line as usize).checked_sub(1)?;
    text.split_inclusive('\n').nth(index)
}

/// Byte offset of the fix's original text on `line`. A column that still points
/// at the original wins; otherwise the original must occur exactly once outside
/// any text that already holds the replacement.
fn locate(line: &str, fix: &Fix) -> Located {
    if fix.original.is_empty() {
        return Located::Missing("fix has no original text".to_owned());
    }
    if let Some(start) = fix
        .column
        .and_then(|column| (column as usize).checked_sub(1))
        .filter(|start| line.is_char_boundary(*start))
    {
        // The replacement may itself contain the original.
        if !fix.replacement.is_empty() && line[start..].starts_with(&fix.replacement) {
            return Located::AlreadyApplied;
        }
        if line[start..].starts_with(&fix.original) {
            return Located::At(start);
        }
    }
    let applied = if fix.replacement.is_empty() {
        Vec::new()
    } else {
        line.match_indices(&fix.replacement)
            .map(|(start, text)| start..start + text.len())
            .collect::<Vec<_>>()
    };
    let occurrences = line
        .match_indices(&fix.original)
        .map(|(start, _)| start)
        .filter(|start| {
            let end = start + fix.original.len();
            !applied
                .iter()
                .any(|span| span.start <= *start && end <= span.end)
        })
        .collect::<Vec<_>>();
    match occurrences.as_slice() {
        [start] => Located::At(*start),
        [] if !applied.is_empty() => Located::AlreadyApplied,
        [] => Located::Missing(format!("'{}' not found on line {}", fix.original, fix.line)),
        many => Located::Missing(format!(
            "'{}' occurs {} times on line {}",
            fix.original,
            many.len(),
            fix.line
        )),
    }
}

fn overlaps(left: &Fix, right: &Fix) -> bool {
    if normalize_path(&left.file) != normalize_path(&right.file) || left.line != right.line {
        return false;
    }
    match (left.column, right.column) {
        (Some(left_column), Some(right_column)) => {
            let left_end = left_column as usize + left.original.len();
            let right_end = right_column as usize + right.original.len();
            (left_column as usize) < right_end && (right_column as usize) < left_end
        }
        // Without columns both resolve by search, so the same text is the same span.
        _ => left.original == right.original,
    }
}

fn backup_path(path: &Path, extension: &str) -> PathBuf {
    let extension = extension.trim().trim_start_matches('.');
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(if extension.is_empty() { "bak" } else { extension });
    PathBuf::from(name)
}

fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
