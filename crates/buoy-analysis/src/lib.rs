use thiserror::Error;

mod confidence;
mod diff;
mod fix;

pub use confidence::{ConfidenceResult, ConfidenceScorer};
pub use diff::{
    AnalysisOptions, AnalysisResult, ComponentComparison, ComponentMatch, FrameworkInfo, MatchType,
    NamingConvention, PropDifference, PropDifferenceKind, RejectedRecord, SemanticDiffEngine,
    TokenComparison, TokenMatch,
};
pub use fix::{
    ApplyOptions, ApplyResult, CssVariableReference, Fix, FixOutcome, FixPipeline, FixStatus,
    FixValidation, GenerateOptions, InvalidFix, SafetyReport, TokenReference,
};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("config error: {0}")]
    Config(#[from] buoy_config::ConfigError),
    #[error("invalid file pattern: {0}")]
    Glob(#[from] globset::Error),
}
