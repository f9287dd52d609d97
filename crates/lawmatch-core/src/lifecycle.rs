//! Review status transitions.
//!
//! ```text
//! PENDING ──► IN_REVIEW ──► COMPLETED
//!    │            └───────► DISMISSED
//!    ├──────────────────────► COMPLETED   (fast path)
//!    └──────────────────────► DISMISSED
//! ```
//!
//! COMPLETED and DISMISSED are terminal. Re-analysis may only refresh a
//! review that is still PENDING.

use thiserror::Error;

use crate::model::ReviewStatus;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("invalid review transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ReviewStatus,
    pub to: ReviewStatus,
}

pub fn can_transition(from: ReviewStatus, to: ReviewStatus) -> bool {
    use ReviewStatus::*;
    matches!(
        (from, to),
        (Pending, InReview | Completed | Dismissed) | (InReview, Completed | Dismissed)
    )
}

/// Validate `from -> to` and return the new status.
pub fn transition(from: ReviewStatus, to: ReviewStatus) -> Result<ReviewStatus, TransitionError> {
    if can_transition(from, to) {
        Ok(to)
    } else {
        Err(TransitionError { from, to })
    }
}

/// Whether an automated re-analysis may overwrite a review in this state.
pub fn reanalysis_may_refresh(status: ReviewStatus) -> bool {
    status == ReviewStatus::Pending
}
