//! Read-only aggregates for dashboard cards and the revision report.
//!
//! Everything here is computed on demand from the base tables.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Builder, StringBuilder, TimestampMicrosecondBuilder, UInt32Builder};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, TimeDelta, Utc};
use duckdb::Row;
use serde::Serialize;

use lawmatch_core::{
    Amendment, AmendmentId, ArticleRef, ChangeType, OrdinanceId, ReviewId, ReviewStatus, Urgency,
    model::ORDINANCE_ACTIVE, report,
};

use crate::StoreError;
use crate::duck::{AMENDMENT_COLUMNS, AmendmentRow, DuckStore, Session, parse_ts, ts};

const URGENCY_RANK: &str =
    "CASE r.urgency WHEN 'HIGH' THEN 0 WHEN 'MEDIUM' THEN 1 ELSE 2 END";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    /// Amendments detected within this many days count as recent.
    pub recent_window_days: i64,
}

impl DashboardOptions {
    /// Longest accepted recent window, in days.
    pub const MAX_WINDOW_DAYS: i64 = 36_500;

    /// Start of the recent window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
        let days = self.recent_window_days;
        if !(1..=Self::MAX_WINDOW_DAYS).contains(&days) {
            return Err(StoreError::Invalid(format!(
                "recent window must be 1..={} days, got {days}",
                Self::MAX_WINDOW_DAYS
            )));
        }
        TimeDelta::try_days(days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| StoreError::Invalid(format!("recent window of {days} days is out of range")))
    }
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            recent_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub active_ordinances: u64,
    /// Distinct `law_id`s referenced by any link.
    pub parent_laws: u64,
    pub recent_amendments: u64,
    pub pending_reviews: u64,
    /// `need_revision` and still PENDING.
    pub need_revision: u64,
    pub unprocessed_amendments: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentAmendment {
    pub amendment: Amendment,
    /// Reviews recorded against this amendment.
    pub affected_ordinances: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingReview {
    pub review_id: ReviewId,
    pub ordinance_id: OrdinanceId,
    pub ordinance_name: String,
    pub amendment_id: AmendmentId,
    pub law_name: String,
    pub change_type: ChangeType,
    pub urgency: Urgency,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub review_id: ReviewId,
    pub ordinance_name: String,
    pub department: Option<String>,
    pub law_name: String,
    pub change_type: ChangeType,
    pub urgency: Urgency,
    /// Number of cited articles on the review.
    pub affected_count: u32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionReport {
    pub generated_at: DateTime<Utc>,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub rows: Vec<ReportRow>,
}

impl RevisionReport {
    pub fn total(&self) -> u64 {
        self.rows.len() as u64
    }

    /// Export the rows as a single batch in [`report::review_report_schema`].
    pub fn to_record_batch(&self) -> Result<RecordBatch, StoreError> {
        let n = self.rows.len();
        let mut review_id = Int64Builder::with_capacity(n);
        let mut ordinance_name = StringBuilder::new();
        let mut department = StringBuilder::new();
        let mut law_name = StringBuilder::new();
        let mut change_type = StringBuilder::new();
        let mut urgency = StringBuilder::new();
        let mut affected_count = UInt32Builder::with_capacity(n);
        let mut reason = StringBuilder::new();
        let mut created_at = TimestampMicrosecondBuilder::with_capacity(n).with_timezone("UTC");

        for row in &self.rows {
            review_id.append_value(row.review_id);
            ordinance_name.append_value(&row.ordinance_name);
            department.append_option(row.department.as_deref());
            law_name.append_value(&row.law_name);
            change_type.append_value(row.change_type.as_str());
            urgency.append_value(row.urgency.as_str());
            affected_count.append_value(row.affected_count);
            reason.append_option(row.reason.as_deref());
            created_at.append_value(row.created_at.timestamp_micros());
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(review_id.finish()),
            Arc::new(ordinance_name.finish()),
            Arc::new(department.finish()),
            Arc::new(law_name.finish()),
            Arc::new(change_type.finish()),
            Arc::new(urgency.finish()),
            Arc::new(affected_count.finish()),
            Arc::new(reason.finish()),
            Arc::new(created_at.finish()),
        ];
        Ok(RecordBatch::try_new(
            Arc::new(report::review_report_schema()),
            columns,
        )?)
    }
}

impl Session<'_> {
    pub fn dashboard_summary(
        &self,
        now: DateTime<Utc>,
        options: &DashboardOptions,
    ) -> Result<DashboardSummary, StoreError> {
        let since = ts(&options.window_start(now)?);
        let pending = ReviewStatus::Pending.as_str();
        Ok(DashboardSummary {
            active_ordinances: self.count(
                "SELECT count(*)::BIGINT FROM ordinances WHERE status = ?",
                [ORDINANCE_ACTIVE],
            )?,
            parent_laws: self.count(
                "SELECT count(DISTINCT law_id)::BIGINT FROM parent_laws",
                [],
            )?,
            recent_amendments: self.count(
                "SELECT count(*)::BIGINT FROM amendments WHERE detected_at >= ?",
                [since.as_str()],
            )?,
            pending_reviews: self.count(
                "SELECT count(*)::BIGINT FROM reviews WHERE status = ?",
                [pending],
            )?,
            need_revision: self.count(
                "SELECT count(*)::BIGINT FROM reviews WHERE need_revision AND status = ?",
                [pending],
            )?,
            unprocessed_amendments: self.count(
                "SELECT count(*)::BIGINT FROM amendments WHERE NOT processed",
                [],
            )?,
        })
    }

    pub fn recent_amendments(&self, limit: usize) -> Result<Vec<RecentAmendment>, StoreError> {
        let sql = format!(
            "SELECT {AMENDMENT_COLUMNS}, \
             (SELECT count(*) FROM reviews r WHERE r.amendment_id = a.id)::BIGINT \
             FROM amendments a ORDER BY detected_at DESC, id DESC LIMIT {limit}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((AmendmentRow::read(row)?, row.get::<_, i64>(10)?))
        })?;
        rows.map(|r| -> Result<RecentAmendment, StoreError> {
            let (amendment, affected) = r?;
            Ok(RecentAmendment {
                amendment: amendment.decode()?,
                affected_ordinances: affected.max(0) as u64,
            })
        })
        .collect()
    }

    /// Reviews that need revision and are still PENDING, newest first.
    pub fn pending_reviews(&self, limit: usize) -> Result<Vec<PendingReview>, StoreError> {
        let sql = format!(
            "SELECT r.id, r.ordinance_id, o.name, r.amendment_id, a.law_name, a.change_type, \
             r.urgency, r.created_at \
             FROM reviews r \
             JOIN ordinances o ON o.id = r.ordinance_id \
             JOIN amendments a ON a.id = r.amendment_id \
             WHERE r.need_revision AND r.status = ? \
             ORDER BY r.created_at DESC, r.id DESC LIMIT {limit}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([ReviewStatus::Pending.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;
        rows.map(|r| -> Result<PendingReview, StoreError> {
            let (review_id, ordinance_id, ordinance_name, amendment_id, law_name, change, urg, at) =
                r?;
            Ok(PendingReview {
                review_id,
                ordinance_id,
                ordinance_name,
                amendment_id,
                law_name,
                change_type: decode_change_type(&change)?,
                urgency: decode_urgency(&urg)?,
                created_at: parse_ts(&at)?,
            })
        })
        .collect()
    }

    /// Reviews needing revision that no operator has picked up yet,
    /// most urgent first.
    pub fn revision_report(&self, now: DateTime<Utc>) -> Result<RevisionReport, StoreError> {
        let sql = format!(
            "SELECT r.id, o.name, o.department, a.law_name, a.change_type, r.urgency, \
             r.affected_articles, r.reason, r.created_at \
             FROM reviews r \
             JOIN ordinances o ON o.id = r.ordinance_id \
             JOIN amendments a ON a.id = r.amendment_id \
             WHERE r.need_revision AND r.status = ? \
             ORDER BY {URGENCY_RANK}, r.created_at DESC, r.id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([ReviewStatus::Pending.as_str()], ReportRecord::read)?;
        let rows: Vec<ReportRow> = rows
            .map(|r| r.map_err(StoreError::from).and_then(ReportRecord::decode))
            .collect::<Result<_, _>>()?;

        let tally = |u: Urgency| rows.iter().filter(|r| r.urgency == u).count() as u64;
        Ok(RevisionReport {
            generated_at: now,
            high: tally(Urgency::High),
            medium: tally(Urgency::Medium),
            low: tally(Urgency::Low),
            rows,
        })
    }
}

impl DuckStore {
    pub fn dashboard_summary(
        &self,
        now: DateTime<Utc>,
        options: &DashboardOptions,
    ) -> Result<DashboardSummary, StoreError> {
        self.session(|s| s.dashboard_summary(now, options))
    }

    pub fn recent_amendments(&self, limit: usize) -> Result<Vec<RecentAmendment>, StoreError> {
        self.session(|s| s.recent_amendments(limit))
    }

    pub fn pending_reviews(&self, limit: usize) -> Result<Vec<PendingReview>, StoreError> {
        self.session(|s| s.pending_reviews(limit))
    }

    pub fn revision_report(&self, now: DateTime<Utc>) -> Result<RevisionReport, StoreError> {
        self.session(|s| s.revision_report(now))
    }
}

struct ReportRecord {
    review_id: i64,
    ordinance_name: String,
    department: Option<String>,
    law_name: String,
    change_type: String,
    urgency: String,
    affected_articles: String,
    reason: Option<String>,
    created_at: String,
}

impl ReportRecord {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            review_id: row.get(0)?,
            ordinance_name: row.get(1)?,
            department: row.get(2)?,
            law_name: row.get(3)?,
            change_type: row.get(4)?,
            urgency: row.get(5)?,
            affected_articles: row.get(6)?,
            reason: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<ReportRow, StoreError> {
        let articles: Vec<ArticleRef> = serde_json::from_str(&self.affected_articles)?;
        Ok(ReportRow {
            review_id: self.review_id,
            ordinance_name: self.ordinance_name,
            department: self.department,
            law_name: self.law_name,
            change_type: decode_change_type(&self.change_type)?,
            urgency: decode_urgency(&self.urgency)?,
            affected_count: u32::try_from(articles.len()).unwrap_or(u32::MAX),
            reason: self.reason,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

fn decode_change_type(s: &str) -> Result<ChangeType, StoreError> {
    s.parse().map_err(|e: lawmatch_core::ParseError| StoreError::Decode(e.to_string()))
}

fn decode_urgency(s: &str) -> Result<Urgency, StoreError> {
    s.parse().map_err(|e: lawmatch_core::ParseError| StoreError::Decode(e.to_string()))
}
