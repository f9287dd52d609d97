use lawmatch_core::{AmendmentId, TransitionError};
use lawmatch_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImpactError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The amendment was analyzed already. Use reanalysis to run it again.
    #[error("amendment {0} already processed")]
    AlreadyProcessed(AmendmentId),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// A concurrent writer changed the review first; re-read and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("parent law index unavailable: {0}")]
    IndexUnavailable(#[source] StoreError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl ImpactError {
    /// Whether the caller may retry the same request unchanged.
    ///
    /// Infrastructure failures happen before any mutation or inside a rolled
    /// back transaction.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IndexUnavailable(_) | Self::StoreUnavailable(_))
    }

    /// Map a store failure hit while resolving parent-law links.
    pub(crate) fn from_index(err: StoreError) -> Self {
        if err.is_infrastructure() {
            Self::IndexUnavailable(err)
        } else {
            Self::from(err)
        }
    }
}

impl From<StoreError> for ImpactError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Invalid(msg) => Self::Invalid(msg),
            other => Self::StoreUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lawmatch_core::ReviewStatus;

    #[test]
    fn store_errors_map_to_taxonomy() {
        let err = ImpactError::from(StoreError::NotFound {
            entity: "review",
            id: "7".into(),
        });
        assert!(matches!(err, ImpactError::NotFound { entity: "review", .. }));
        assert_eq!(err.to_string(), "review not found: 7");

        let err = ImpactError::from(StoreError::Unavailable("lock poisoned".into()));
        assert!(matches!(err, ImpactError::StoreUnavailable(_)));
        assert!(err.is_retryable());

        let err = ImpactError::from_index(StoreError::NoResults);
        assert!(matches!(err, ImpactError::IndexUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn domain_errors_are_not_retryable() {
        assert!(!ImpactError::AlreadyProcessed(1).is_retryable());
        assert!(!ImpactError::Conflict("stale".into()).is_retryable());
        let err = ImpactError::from(TransitionError {
            from: ReviewStatus::Completed,
            to: ReviewStatus::Pending,
        });
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "invalid review transition COMPLETED -> PENDING");
    }
}
