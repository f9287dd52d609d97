//! Operator-driven review transitions.

use chrono::Utc;
use tracing::info;

use lawmatch_core::{Review, ReviewFilter, ReviewId, ReviewUpdate, lifecycle};
use lawmatch_store::{DuckStore, ReviewPatch};

use crate::ImpactError;

pub struct ReviewLifecycle<'a> {
    store: &'a DuckStore,
}

impl<'a> ReviewLifecycle<'a> {
    pub fn new(store: &'a DuckStore) -> Self {
        Self { store }
    }

    pub fn get(&self, id: ReviewId) -> Result<Review, ImpactError> {
        Ok(self.store.get_review(id)?)
    }

    pub fn list(&self, filter: &ReviewFilter) -> Result<Vec<Review>, ImpactError> {
        Ok(self.store.list_reviews(filter)?)
    }

    /// Apply an operator update and return the review as stored afterwards.
    ///
    /// The status change is validated against the status read inside the
    /// write transaction, and written only if that status is still current.
    /// Notes and reviewer are last-writer-wins. Naming a reviewer stamps
    /// `reviewed_at`.
    pub fn update(&self, id: ReviewId, update: &ReviewUpdate) -> Result<Review, ImpactError> {
        let now = Utc::now();
        if update.reviewed_by.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(ImpactError::Invalid("reviewer name is empty".into()));
        }

        self.store.transaction(|s| -> Result<Review, ImpactError> {
            let current = s.get_review(id)?;
            if let Some(expected) = update.expected_status {
                if expected != current.status {
                    return Err(ImpactError::Conflict(format!(
                        "review {id} is {}, expected {expected}",
                        current.status
                    )));
                }
            }
            if update.is_empty() {
                return Ok(current);
            }

            let status = match update.status {
                Some(to) => lifecycle::transition(current.status, to)?,
                None => current.status,
            };
            let reviewed_by = update
                .reviewed_by
                .as_deref()
                .map(|r| r.trim().to_string())
                .or_else(|| current.reviewed_by.clone());
            let reviewed_at = if update.reviewed_by.is_some() {
                Some(now)
            } else {
                current.reviewed_at
            };
            let patch = ReviewPatch {
                status,
                notes: update.notes.clone().or_else(|| current.notes.clone()),
                reviewed_by,
                reviewed_at,
            };

            if !s.update_review(id, current.status, &patch, now)? {
                return Err(ImpactError::Conflict(format!(
                    "review {id} changed while updating"
                )));
            }
            if status != current.status {
                info!(review_id = id, from = %current.status, to = %status, "review status changed");
            }
            Ok(s.get_review(id)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lawmatch_core::{
        AmendmentFact, ArticleRef, Category, ChangeType, OrdinanceFact, ReviewStatus, Urgency,
    };
    use lawmatch_store::Assessment;

    fn store_with_review() -> (DuckStore, ReviewId) {
        let store = DuckStore::open().unwrap();
        let ord = store
            .upsert_ordinance(&OrdinanceFact {
                code: "C-1".into(),
                name: "조례".into(),
                category: Some(Category::Rule),
                department: None,
                status: None,
                enacted_date: None,
                enforced_date: None,
            })
            .unwrap()
            .id();
        let amd = store
            .upsert_amendment(&AmendmentFact {
                law_id: "L1".into(),
                law_name: "법".into(),
                change_type: ChangeType::Amended,
                detected_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
                revision_id: None,
                proclaimed_date: None,
                effective_date: None,
                description: None,
            })
            .unwrap()
            .id();
        let assessment = Assessment {
            urgency: Urgency::Medium,
            need_revision: true,
            reason: None,
            affected_articles: vec![ArticleRef::new(1, 0)],
        };
        let id = store
            .session(|s| s.insert_review(ord, amd, &assessment, Utc::now()))
            .unwrap();
        (store, id)
    }

    fn to(status: ReviewStatus) -> ReviewUpdate {
        ReviewUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    #[test]
    fn walk_to_completion() {
        let (store, id) = store_with_review();
        let lifecycle = ReviewLifecycle::new(&store);

        let r = lifecycle.update(id, &to(ReviewStatus::InReview)).unwrap();
        assert_eq!(r.status, ReviewStatus::InReview);

        let r = lifecycle
            .update(
                id,
                &ReviewUpdate {
                    status: Some(ReviewStatus::Completed),
                    notes: Some("제5조 개정".into()),
                    reviewed_by: Some(" lee ".into()),
                    expected_status: Some(ReviewStatus::InReview),
                },
            )
            .unwrap();
        assert_eq!(r.status, ReviewStatus::Completed);
        assert_eq!(r.notes.as_deref(), Some("제5조 개정"));
        assert_eq!(r.reviewed_by.as_deref(), Some("lee"));
        assert!(r.reviewed_at.is_some());
        // Classifier fields are never touched by operator updates.
        assert_eq!(r.urgency, Urgency::Medium);
        assert_eq!(r.affected_articles, vec![ArticleRef::new(1, 0)]);
    }

    #[test]
    fn fast_path_and_dismissal() {
        let (store, id) = store_with_review();
        let lifecycle = ReviewLifecycle::new(&store);
        let r = lifecycle.update(id, &to(ReviewStatus::Dismissed)).unwrap();
        assert_eq!(r.status, ReviewStatus::Dismissed);
        assert!(r.need_revision);
    }

    #[test]
    fn illegal_transitions_rejected_and_nothing_written() {
        let (store, id) = store_with_review();
        let lifecycle = ReviewLifecycle::new(&store);
        lifecycle.update(id, &to(ReviewStatus::InReview)).unwrap();
        let before = lifecycle.get(id).unwrap();

        let err = lifecycle
            .update(
                id,
                &ReviewUpdate {
                    status: Some(ReviewStatus::Pending),
                    notes: Some("되돌림".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ImpactError::InvalidTransition(_)));
        assert_eq!(lifecycle.get(id).unwrap(), before);

        lifecycle.update(id, &to(ReviewStatus::Completed)).unwrap();
        for target in ReviewStatus::ALL {
            assert!(matches!(
                lifecycle.update(id, &to(target)),
                Err(ImpactError::InvalidTransition(_))
            ));
        }
    }

    #[test]
    fn notes_without_status_change() {
        let (store, id) = store_with_review();
        let lifecycle = ReviewLifecycle::new(&store);
        lifecycle.update(id, &to(ReviewStatus::Completed)).unwrap();
        let r = lifecycle
            .update(
                id,
                &ReviewUpdate {
                    notes: Some("후속 조치 없음".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(r.status, ReviewStatus::Completed);
        assert_eq!(r.notes.as_deref(), Some("후속 조치 없음"));
        assert!(r.reviewed_at.is_none());
    }

    #[test]
    fn stale_expected_status_conflicts() {
        let (store, id) = store_with_review();
        let lifecycle = ReviewLifecycle::new(&store);
        lifecycle.update(id, &to(ReviewStatus::InReview)).unwrap();

        let err = lifecycle
            .update(
                id,
                &ReviewUpdate {
                    status: Some(ReviewStatus::Dismissed),
                    expected_status: Some(ReviewStatus::Pending),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ImpactError::Conflict(_)));
        assert_eq!(lifecycle.get(id).unwrap().status, ReviewStatus::InReview);
    }

    #[test]
    fn concurrent_transitions_from_same_state() {
        let (store, id) = store_with_review();
        let lifecycle = ReviewLifecycle::new(&store);
        let update = ReviewUpdate {
            status: Some(ReviewStatus::InReview),
            expected_status: Some(ReviewStatus::Pending),
            ..Default::default()
        };

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| lifecycle.update(id, &update)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, ImpactError::Conflict(_)))
        );
    }

    #[test]
    fn blank_reviewer_rejected() {
        let (store, id) = store_with_review();
        let err = ReviewLifecycle::new(&store)
            .update(
                id,
                &ReviewUpdate {
                    reviewed_by: Some("   ".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ImpactError::Invalid(_)));
    }

    #[test]
    fn unknown_review() {
        let store = DuckStore::open().unwrap();
        let err = ReviewLifecycle::new(&store).update(3, &to(ReviewStatus::Completed)).unwrap_err();
        assert!(matches!(err, ImpactError::NotFound { entity: "review", .. }));
    }
}
