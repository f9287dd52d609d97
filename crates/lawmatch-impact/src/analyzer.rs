//! Amendment impact analysis.
//!
//! One run resolves the amendment's law to the ordinances that cite it,
//! classifies each pair, and writes one review per pair. A run is a single
//! store transaction. For a first analysis the transaction opens with the
//! conditional `processed` flip, which is the per-amendment gate: a second
//! caller finds the flag already set and gets [`ImpactError::AlreadyProcessed`].
//! Any failure rolls back the flip together with every review write.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanBuilder, Int64Builder, StringBuilder, UInt32Builder};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use lawmatch_core::{AmendmentId, ClassificationInput, OrdinanceId, classify, lifecycle, report};
use lawmatch_store::{Assessment, DuckStore, Session};

use crate::{ImpactError, ParentLawIndex};

/// Caller-visible result of one successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub amendment_id: AmendmentId,
    /// Ordinances whose parent-law links name the amended law.
    pub affected_ordinance_count: usize,
    pub reviews_created: usize,
    /// PENDING reviews whose verdict changed.
    pub reviews_updated: usize,
    /// PENDING reviews that already carried the same verdict.
    pub reviews_unchanged: usize,
    /// Reviews an operator has moved past PENDING; left untouched.
    pub reviews_skipped: usize,
    /// Pairs classified as needing revision.
    pub need_revision_count: usize,
}

impl AnalysisSummary {
    fn new(amendment_id: AmendmentId, affected: usize) -> Self {
        Self {
            amendment_id,
            affected_ordinance_count: affected,
            ..Default::default()
        }
    }

    /// No tracked ordinance references the amended law.
    pub fn is_noop(&self) -> bool {
        self.affected_ordinance_count == 0
    }
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub amendment_id: AmendmentId,
    pub result: Result<AnalysisSummary, ImpactError>,
}

/// Per-amendment outcomes of a batch run, in the order attempted.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<AnalysisOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Export as a batch in [`report::analysis_outcome_schema`].
    pub fn to_record_batch(&self) -> Result<RecordBatch, arrow::error::ArrowError> {
        let n = self.outcomes.len();
        let mut amendment_id = Int64Builder::with_capacity(n);
        let mut succeeded = BooleanBuilder::with_capacity(n);
        let mut affected = UInt32Builder::with_capacity(n);
        let mut created = UInt32Builder::with_capacity(n);
        let mut updated = UInt32Builder::with_capacity(n);
        let mut error = StringBuilder::new();

        for outcome in &self.outcomes {
            amendment_id.append_value(outcome.amendment_id);
            match &outcome.result {
                Ok(summary) => {
                    succeeded.append_value(true);
                    affected.append_value(to_u32(summary.affected_ordinance_count));
                    created.append_value(to_u32(summary.reviews_created));
                    updated.append_value(to_u32(summary.reviews_updated));
                    error.append_null();
                }
                Err(e) => {
                    succeeded.append_value(false);
                    affected.append_null();
                    created.append_null();
                    updated.append_null();
                    error.append_value(e.to_string());
                }
            }
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(amendment_id.finish()),
            Arc::new(succeeded.finish()),
            Arc::new(affected.finish()),
            Arc::new(created.finish()),
            Arc::new(updated.finish()),
            Arc::new(error.finish()),
        ];
        RecordBatch::try_new(Arc::new(report::analysis_outcome_schema()), columns)
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    First,
    Reanalysis,
}

pub struct ImpactAnalyzer<'a> {
    store: &'a DuckStore,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(store: &'a DuckStore) -> Self {
        Self { store }
    }

    /// Analyze an amendment that has not been processed yet.
    pub fn analyze(&self, amendment_id: AmendmentId) -> Result<AnalysisSummary, ImpactError> {
        self.run(amendment_id, Mode::First)
    }

    /// Re-run analysis regardless of the processed flag.
    ///
    /// PENDING reviews are refreshed, missing ones created, and reviews an
    /// operator has already taken up are left exactly as they are.
    pub fn reanalyze(&self, amendment_id: AmendmentId) -> Result<AnalysisSummary, ImpactError> {
        self.run(amendment_id, Mode::Reanalysis)
    }

    /// Analyze every unprocessed amendment, oldest detection first.
    ///
    /// Failures are recorded per amendment and never stop the batch.
    pub fn analyze_pending(&self) -> Result<BatchReport, ImpactError> {
        let pending = self.store.pending_amendments()?;
        let mut report = BatchReport::default();
        for amendment in pending {
            let result = self.analyze(amendment.id);
            if let Err(e) = &result {
                warn!(amendment_id = amendment.id, law_id = %amendment.law_id, error = %e, "analysis failed");
            }
            report.outcomes.push(AnalysisOutcome {
                amendment_id: amendment.id,
                result,
            });
        }
        info!(
            attempted = report.outcomes.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch analysis finished"
        );
        Ok(report)
    }

    fn run(&self, amendment_id: AmendmentId, mode: Mode) -> Result<AnalysisSummary, ImpactError> {
        let now = Utc::now();

        let summary = self.store.transaction(|s| -> Result<_, ImpactError> {
            let amendment = s.get_amendment(amendment_id)?;
            if mode == Mode::First && !s.mark_processed_if_pending(amendment_id)? {
                return Err(ImpactError::AlreadyProcessed(amendment_id));
            }

            let links = ParentLawIndex::new(s).resolve_links(&amendment.law_id)?;
            let mut summary = AnalysisSummary::new(amendment_id, links.len());

            for (ordinance_id, link) in &links {
                let verdict = classify(&ClassificationInput {
                    change_type: amendment.change_type,
                    related_articles: link.related_articles.as_deref(),
                    effective_date: amendment.effective_date,
                });
                if verdict.need_revision {
                    summary.need_revision_count += 1;
                }
                let assessment = Assessment {
                    urgency: verdict.urgency,
                    need_revision: verdict.need_revision,
                    reason: Some(verdict.reason),
                    affected_articles: link.cited_articles(),
                };
                upsert_review(s, *ordinance_id, amendment_id, &assessment, now, &mut summary)?;
            }

            if mode == Mode::Reanalysis {
                s.mark_processed(amendment_id)?;
            }
            Ok((amendment.law_id, summary))
        });

        let (law_id, summary) = summary?;
        let reanalysis = mode == Mode::Reanalysis;
        info!(
            amendment_id,
            law_id = %law_id,
            affected = summary.affected_ordinance_count,
            created = summary.reviews_created,
            updated = summary.reviews_updated,
            skipped = summary.reviews_skipped,
            reanalysis,
            "amendment analyzed"
        );
        Ok(summary)
    }
}

fn upsert_review(
    s: &Session<'_>,
    ordinance_id: OrdinanceId,
    amendment_id: AmendmentId,
    assessment: &Assessment,
    now: DateTime<Utc>,
    summary: &mut AnalysisSummary,
) -> Result<(), ImpactError> {
    match s.review_for_pair(ordinance_id, amendment_id)? {
        None => {
            s.insert_review(ordinance_id, amendment_id, assessment, now)?;
            summary.reviews_created += 1;
        }
        Some(review) if !lifecycle::reanalysis_may_refresh(review.status) => {
            summary.reviews_skipped += 1;
        }
        Some(review) if assessment.matches(&review) => {
            summary.reviews_unchanged += 1;
        }
        Some(review) => {
            if s.refresh_review(review.id, assessment, now)? {
                summary.reviews_updated += 1;
            } else {
                summary.reviews_skipped += 1;
            }
        }
    }
    Ok(())
}
