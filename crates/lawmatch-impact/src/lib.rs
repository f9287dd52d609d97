//! Impact engine: resolves amended laws to dependent ordinances, writes
//! classified reviews, and guards the operator review lifecycle.

mod analyzer;
mod error;
mod index;
mod review;

pub use analyzer::{AnalysisOutcome, AnalysisSummary, BatchReport, ImpactAnalyzer};
pub use error::ImpactError;
pub use index::{LinkSource, ParentLawIndex};
pub use review::ReviewLifecycle;
