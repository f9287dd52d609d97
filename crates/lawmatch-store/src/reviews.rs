//! Review rows: one per (ordinance, amendment) pair, ever.

use chrono::{DateTime, Utc};
use duckdb::types::Value;
use duckdb::{Params, Row};

use lawmatch_core::{
    AmendmentId, ArticleRef, OrdinanceId, Review, ReviewFilter, ReviewId, ReviewStatus, Urgency,
};

use crate::StoreError;
use crate::duck::{REVIEW_COLUMNS, Session, parse_ts, ts};

/// Classifier output written into a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub urgency: Urgency,
    pub need_revision: bool,
    pub reason: Option<String>,
    pub affected_articles: Vec<ArticleRef>,
}

impl Assessment {
    /// Whether `review` already carries exactly this verdict.
    pub fn matches(&self, review: &Review) -> bool {
        review.urgency == self.urgency
            && review.need_revision == self.need_revision
            && review.reason == self.reason
            && review.affected_articles == self.affected_articles
    }
}

/// Resolved column values for an operator edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPatch {
    pub status: ReviewStatus,
    pub notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Session<'_> {
    pub fn review_for_pair(
        &self,
        ordinance_id: OrdinanceId,
        amendment_id: AmendmentId,
    ) -> Result<Option<Review>, StoreError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE ordinance_id = ? AND amendment_id = ?"
        );
        Ok(self
            .query_reviews(&sql, [ordinance_id, amendment_id])?
            .into_iter()
            .next())
    }

    /// Insert a PENDING review. The ordinance must exist and the pair must be new.
    pub fn insert_review(
        &self,
        ordinance_id: OrdinanceId,
        amendment_id: AmendmentId,
        assessment: &Assessment,
        now: DateTime<Utc>,
    ) -> Result<ReviewId, StoreError> {
        if !self.ordinance_exists(ordinance_id)? {
            return Err(StoreError::not_found("ordinance", ordinance_id));
        }
        if self.review_for_pair(ordinance_id, amendment_id)?.is_some() {
            return Err(StoreError::Conflict(format!(
                "review already exists for ordinance {ordinance_id}, amendment {amendment_id}"
            )));
        }

        let id = self.next_id("review_id_seq")?;
        let articles = serde_json::to_string(&assessment.affected_articles)?;
        let now = ts(&now);
        self.conn.execute(
            "INSERT INTO reviews (id, ordinance_id, amendment_id, urgency, need_revision, status, \
             reason, affected_articles, notes, reviewed_by, reviewed_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?)",
            duckdb::params![
                id,
                ordinance_id,
                amendment_id,
                assessment.urgency.as_str(),
                assessment.need_revision,
                ReviewStatus::Pending.as_str(),
                assessment.reason,
                articles,
                now,
                now,
            ],
        )?;
        Ok(id)
    }

    /// Overwrite the classifier fields of a review that is still PENDING.
    ///
    /// Returns `false` (and writes nothing) once an operator has moved it on.
    pub fn refresh_review(
        &self,
        id: ReviewId,
        assessment: &Assessment,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let articles = serde_json::to_string(&assessment.affected_articles)?;
        let n = self.conn.execute(
            "UPDATE reviews SET urgency = ?, need_revision = ?, reason = ?, \
             affected_articles = ?, updated_at = ? WHERE id = ? AND status = ?",
            duckdb::params![
                assessment.urgency.as_str(),
                assessment.need_revision,
                assessment.reason,
                articles,
                ts(&now),
                id,
                ReviewStatus::Pending.as_str(),
            ],
        )?;
        Ok(n == 1)
    }

    /// Apply an operator edit if the stored status is still `expected`.
    ///
    /// Returns `false` when another writer changed the status first.
    pub fn update_review(
        &self,
        id: ReviewId,
        expected: ReviewStatus,
        patch: &ReviewPatch,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let n = self.conn.execute(
            "UPDATE reviews SET status = ?, notes = ?, reviewed_by = ?, reviewed_at = ?, \
             updated_at = ? WHERE id = ? AND status = ?",
            duckdb::params![
                patch.status.as_str(),
                patch.notes,
                patch.reviewed_by,
                patch.reviewed_at.as_ref().map(ts),
                ts(&now),
                id,
                expected.as_str(),
            ],
        )?;
        Ok(n == 1)
    }

    pub fn get_review(&self, id: ReviewId) -> Result<Review, StoreError> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?");
        self.query_reviews(&sql, [id])?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found("review", id))
    }

    /// Newest first; every filter field is optional.
    pub fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, StoreError> {
        let mut sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE 1 = 1");
        let mut args: Vec<Value> = Vec::new();
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            args.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(urgency) = filter.urgency {
            sql.push_str(" AND urgency = ?");
            args.push(Value::Text(urgency.as_str().to_string()));
        }
        if let Some(ordinance_id) = filter.ordinance_id {
            sql.push_str(" AND ordinance_id = ?");
            args.push(Value::BigInt(ordinance_id));
        }
        if let Some(amendment_id) = filter.amendment_id {
            sql.push_str(" AND amendment_id = ?");
            args.push(Value::BigInt(amendment_id));
        }
        if let Some(need_revision) = filter.need_revision {
            sql.push_str(" AND need_revision = ?");
            args.push(Value::Boolean(need_revision));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        self.query_reviews(&sql, duckdb::params_from_iter(args))
    }

    fn query_reviews(&self, sql: &str, params: impl Params) -> Result<Vec<Review>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, ReviewRow::read)?;
        rows.map(|r| r.map_err(StoreError::from).and_then(ReviewRow::decode))
            .collect()
    }
}

struct ReviewRow {
    id: i64,
    ordinance_id: i64,
    amendment_id: i64,
    urgency: String,
    need_revision: bool,
    status: String,
    reason: Option<String>,
    affected_articles: String,
    notes: Option<String>,
    reviewed_by: Option<String>,
    reviewed_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ReviewRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ordinance_id: row.get(1)?,
            amendment_id: row.get(2)?,
            urgency: row.get(3)?,
            need_revision: row.get(4)?,
            status: row.get(5)?,
            reason: row.get(6)?,
            affected_articles: row.get(7)?,
            notes: row.get(8)?,
            reviewed_by: row.get(9)?,
            reviewed_at: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn decode(self) -> Result<Review, StoreError> {
        Ok(Review {
            id: self.id,
            ordinance_id: self.ordinance_id,
            amendment_id: self.amendment_id,
            urgency: self
                .urgency
                .parse()
                .map_err(|e: lawmatch_core::ParseError| StoreError::Decode(e.to_string()))?,
            need_revision: self.need_revision,
            status: self
                .status
                .parse()
                .map_err(|e: lawmatch_core::ParseError| StoreError::Decode(e.to_string()))?,
            reason: self.reason,
            affected_articles: serde_json::from_str(&self.affected_articles)?,
            notes: self.notes,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at.as_deref().map(parse_ts).transpose()?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DuckStore;
    use crate::duck::tests::{amendment, ordinance};
    use lawmatch_core::ChangeType;

    fn assessment(urgency: Urgency) -> Assessment {
        Assessment {
            urgency,
            need_revision: urgency != Urgency::Low,
            reason: Some("test".into()),
            affected_articles: vec![ArticleRef::new(3, 0), ArticleRef::new(5, 2)],
        }
    }

    fn seeded() -> (DuckStore, OrdinanceId, AmendmentId) {
        let store = DuckStore::open().unwrap();
        let ord = store.upsert_ordinance(&ordinance("C-1", "조례")).unwrap().id();
        let amd = store
            .upsert_amendment(&amendment("L1", ChangeType::Amended, 1))
            .unwrap()
            .id();
        (store, ord, amd)
    }

    #[test]
    fn insert_and_read_back() {
        let (store, ord, amd) = seeded();
        let now = Utc::now();
        let id = store
            .session(|s| s.insert_review(ord, amd, &assessment(Urgency::High), now))
            .unwrap();

        let review = store.get_review(id).unwrap();
        assert_eq!(review.status, ReviewStatus::Pending);
        assert_eq!(review.urgency, Urgency::High);
        assert!(review.need_revision);
        assert_eq!(review.affected_articles, assessment(Urgency::High).affected_articles);
        assert!(review.reviewed_at.is_none());
        assert!(assessment(Urgency::High).matches(&review));
        assert!(!assessment(Urgency::Medium).matches(&review));

        let pair = store.session(|s| s.review_for_pair(ord, amd)).unwrap();
        assert_eq!(pair.map(|r| r.id), Some(id));
    }

    #[test]
    fn pair_is_unique() {
        let (store, ord, amd) = seeded();
        let now = Utc::now();
        store
            .session(|s| s.insert_review(ord, amd, &assessment(Urgency::High), now))
            .unwrap();
        let again = store.session(|s| s.insert_review(ord, amd, &assessment(Urgency::Low), now));
        assert!(matches!(again, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn insert_requires_ordinance() {
        let (store, _, amd) = seeded();
        let result =
            store.session(|s| s.insert_review(404, amd, &assessment(Urgency::High), Utc::now()));
        assert!(matches!(result, Err(StoreError::NotFound { entity: "ordinance", .. })));
    }

    #[test]
    fn refresh_only_touches_pending() {
        let (store, ord, amd) = seeded();
        let now = Utc::now();
        let id = store
            .session(|s| s.insert_review(ord, amd, &assessment(Urgency::Medium), now))
            .unwrap();
        assert!(
            store
                .session(|s| s.refresh_review(id, &assessment(Urgency::High), now))
                .unwrap()
        );
        assert_eq!(store.get_review(id).unwrap().urgency, Urgency::High);

        let patch = ReviewPatch {
            status: ReviewStatus::Completed,
            notes: Some("개정 완료".into()),
            reviewed_by: Some("kim".into()),
            reviewed_at: Some(now),
        };
        assert!(
            store
                .session(|s| s.update_review(id, ReviewStatus::Pending, &patch, now))
                .unwrap()
        );
        assert!(
            !store
                .session(|s| s.refresh_review(id, &assessment(Urgency::Low), now))
                .unwrap()
        );

        let review = store.get_review(id).unwrap();
        assert_eq!(review.status, ReviewStatus::Completed);
        assert_eq!(review.urgency, Urgency::High);
        assert_eq!(review.notes.as_deref(), Some("개정 완료"));
        assert_eq!(review.reviewed_by.as_deref(), Some("kim"));
        assert!(review.reviewed_at.is_some());
    }

    #[test]
    fn update_with_stale_status_writes_nothing() {
        let (store, ord, amd) = seeded();
        let now = Utc::now();
        let id = store
            .session(|s| s.insert_review(ord, amd, &assessment(Urgency::Medium), now))
            .unwrap();
        let patch = ReviewPatch {
            status: ReviewStatus::Dismissed,
            notes: None,
            reviewed_by: None,
            reviewed_at: None,
        };
        let applied = store
            .session(|s| s.update_review(id, ReviewStatus::InReview, &patch, now))
            .unwrap();
        assert!(!applied);
        assert_eq!(store.get_review(id).unwrap().status, ReviewStatus::Pending);
    }

    #[test]
    fn list_filters() {
        let store = DuckStore::open().unwrap();
        let amd = store
            .upsert_amendment(&amendment("L1", ChangeType::Amended, 1))
            .unwrap()
            .id();
        let now = Utc::now();
        let mut ids = Vec::new();
        for (code, urgency) in [("C-1", Urgency::High), ("C-2", Urgency::Medium), ("C-3", Urgency::Low)] {
            let ord = store.upsert_ordinance(&ordinance(code, code)).unwrap().id();
            ids.push(
                store
                    .session(|s| s.insert_review(ord, amd, &assessment(urgency), now))
                    .unwrap(),
            );
        }

        let all = store.list_reviews(&ReviewFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        // Same created_at: ties broken by id, newest first.
        assert_eq!(all[0].id, ids[2]);

        let high = store
            .list_reviews(&ReviewFilter {
                urgency: Some(Urgency::High),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(high.len(), 1);

        let needing = store
            .list_reviews(&ReviewFilter {
                need_revision: Some(true),
                status: Some(ReviewStatus::Pending),
                amendment_id: Some(amd),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(needing.len(), 2);

        let none = store
            .list_reviews(&ReviewFilter {
                status: Some(ReviewStatus::Completed),
                ..Default::default()
            })
            .unwrap();
        assert!(none.is_empty());

        let for_amendment = store
            .list_reviews(&ReviewFilter {
                amendment_id: Some(amd),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(for_amendment.len(), 3);
    }

    #[test]
    fn missing_review_not_found() {
        let store = DuckStore::open().unwrap();
        assert!(matches!(
            store.get_review(9),
            Err(StoreError::NotFound { entity: "review", .. })
        ));
    }
}
