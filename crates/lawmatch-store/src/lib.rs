//! Storage layer: DuckDB tables for ordinances, parent-law links, amendments,
//! and reviews, plus the read projections built on them.

mod duck;
mod error;
mod projection;
mod reviews;

pub use duck::{DuckStore, Session, Upserted};
pub use error::StoreError;
pub use projection::{
    DashboardOptions, DashboardSummary, PendingReview, RecentAmendment, ReportRow, RevisionReport,
};
pub use reviews::{Assessment, ReviewPatch};
