//! Apply a batch of supplier facts to the store.
//!
//! Ordinances go first so that links in the same batch can name them by
//! code, then links, then amendments. Each fact is written on its own; a bad
//! fact is recorded in the report and the rest of the batch still applies.

use tracing::{info, warn};

use lawmatch_core::{AmendmentId, FeedBatch};
use lawmatch_store::{DuckStore, StoreError, Upserted};

/// Per-kind counts for one ingest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub created: usize,
    pub updated: usize,
    /// Already stored and left as is (duplicate detections).
    pub existing: usize,
    pub failed: usize,
}

impl Tally {
    fn record(&mut self, outcome: &Result<Upserted, StoreError>) {
        match outcome {
            Ok(Upserted::Created(_)) => self.created += 1,
            Ok(Upserted::Updated(_)) => self.updated += 1,
            Ok(Upserted::Existing(_)) => self.existing += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.existing + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestFailure {
    pub kind: &'static str,
    /// Natural key of the rejected fact.
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub ordinances: Tally,
    pub parent_laws: Tally,
    pub amendments: Tally,
    /// Amendments created by this ingest, ready for analysis.
    pub new_amendments: Vec<AmendmentId>,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    fn fail(&mut self, kind: &'static str, key: String, error: &StoreError) {
        warn!(kind, key = %key, error = %error, "fact rejected");
        self.failures.push(IngestFailure {
            kind,
            key,
            error: error.to_string(),
        });
    }
}

pub fn ingest_batch(store: &DuckStore, batch: &FeedBatch) -> IngestReport {
    let mut report = IngestReport::default();

    for fact in &batch.ordinances {
        let outcome = store.upsert_ordinance(fact);
        report.ordinances.record(&outcome);
        if let Err(e) = &outcome {
            report.fail("ordinance", fact.code.clone(), e);
        }
    }

    for fact in &batch.parent_laws {
        let key = format!("{}→{}", fact.ordinance_code, fact.link.law_id);
        let outcome = store
            .find_ordinance_by_code(&fact.ordinance_code)
            .and_then(|found| {
                found.ok_or_else(|| StoreError::NotFound {
                    entity: "ordinance",
                    id: fact.ordinance_code.clone(),
                })
            })
            .and_then(|ordinance| store.upsert_parent_law(ordinance.id, &fact.link));
        report.parent_laws.record(&outcome);
        if let Err(e) = &outcome {
            report.fail("parent_law", key, e);
        }
    }

    for fact in &batch.amendments {
        let outcome = store.upsert_amendment(fact);
        report.amendments.record(&outcome);
        match &outcome {
            Ok(upserted) if upserted.is_created() => report.new_amendments.push(upserted.id()),
            Ok(_) => {}
            Err(e) => report.fail("amendment", fact.dedupe_key(), e),
        }
    }

    info!(
        ordinances = report.ordinances.total(),
        parent_laws = report.parent_laws.total(),
        amendments = report.amendments.total(),
        new_amendments = report.new_amendments.len(),
        failed = report.failures.len(),
        "feed batch ingested"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lawmatch_core::{
        AmendmentFact, AmendmentFilter, ChangeType, LawLink, LawType, OrdinanceFact, ParentLawFact,
    };

    fn ordinance(code: &str) -> OrdinanceFact {
        OrdinanceFact {
            code: code.into(),
            name: format!("{code} 조례"),
            category: None,
            department: None,
            status: None,
            enacted_date: None,
            enforced_date: None,
        }
    }

    fn parent_law(code: &str, law_id: &str) -> ParentLawFact {
        ParentLawFact {
            ordinance_code: code.into(),
            link: LawLink {
                law_id: law_id.into(),
                law_name: "도로교통법".into(),
                law_type: LawType::Act,
                related_articles: None,
                proclaimed_date: None,
                enforced_date: None,
            },
        }
    }

    fn amendment(law_id: &str, hour: u32) -> AmendmentFact {
        AmendmentFact {
            law_id: law_id.into(),
            law_name: "도로교통법".into(),
            change_type: ChangeType::Amended,
            detected_at: Utc.with_ymd_and_hms(2026, 2, 21, hour, 0, 0).unwrap(),
            revision_id: None,
            proclaimed_date: None,
            effective_date: None,
            description: None,
        }
    }

    #[test]
    fn applies_in_dependency_order() {
        let store = DuckStore::open().unwrap();
        let batch = FeedBatch {
            ordinances: vec![ordinance("C-1"), ordinance("C-2")],
            parent_laws: vec![parent_law("C-1", "L1"), parent_law("C-2", "L1")],
            amendments: vec![amendment("L1", 9)],
        };
        let report = ingest_batch(&store, &batch);
        assert_eq!(report.ordinances.created, 2);
        assert_eq!(report.parent_laws.created, 2);
        assert_eq!(report.amendments.created, 1);
        assert_eq!(report.new_amendments.len(), 1);
        assert!(report.failures.is_empty());
        assert_eq!(store.parent_laws_for_law("L1").unwrap().len(), 2);
    }

    #[test]
    fn repeated_poll_is_idempotent() {
        let store = DuckStore::open().unwrap();
        let batch = FeedBatch {
            ordinances: vec![ordinance("C-1")],
            parent_laws: vec![parent_law("C-1", "L1")],
            amendments: vec![amendment("L1", 9)],
        };
        ingest_batch(&store, &batch);

        // Same change seen again later the same day.
        let mut again = batch.clone();
        again.amendments = vec![amendment("L1", 17)];
        let report = ingest_batch(&store, &again);
        assert_eq!(report.ordinances.updated, 1);
        assert_eq!(report.parent_laws.updated, 1);
        assert_eq!(report.amendments.existing, 1);
        assert!(report.new_amendments.is_empty());
        assert_eq!(
            store.list_amendments(&AmendmentFilter::default()).unwrap().len(),
            1
        );
    }

    #[test]
    fn bad_facts_are_collected_not_fatal() {
        let store = DuckStore::open().unwrap();
        let batch = FeedBatch {
            ordinances: vec![ordinance(""), ordinance("C-1")],
            parent_laws: vec![parent_law("C-404", "L1"), parent_law("C-1", "L1")],
            amendments: vec![amendment(" ", 9), amendment("L1", 9)],
        };
        let report = ingest_batch(&store, &batch);
        assert_eq!(report.ordinances, Tally { created: 1, failed: 1, ..Default::default() });
        assert_eq!(report.parent_laws, Tally { created: 1, failed: 1, ..Default::default() });
        assert_eq!(report.amendments, Tally { created: 1, failed: 1, ..Default::default() });
        assert_eq!(report.failures.len(), 3);
        assert_eq!(report.failures[1].kind, "parent_law");
        assert!(report.failures[1].error.contains("C-404"));
    }

    #[test]
    fn empty_batch() {
        let store = DuckStore::open().unwrap();
        let report = ingest_batch(&store, &FeedBatch::default());
        assert_eq!(report, IngestReport::default());
    }

    #[test]
    fn feed_file_json() {
        let json = r#"{
            "ordinances": [{"code": "3220000-1", "name": "주차장 조례", "category": "조례"}],
            "parent_laws": [{"ordinance_code": "3220000-1", "law_id": "001823",
                             "law_name": "주차장법", "law_type": "법률", "related_articles": "제12조"}],
            "amendments": [{"law_id": "001823", "law_name": "주차장법", "change_type": "폐지",
                            "detected_at": "2026-02-21T10:00:00Z"}]
        }"#;
        let batch: FeedBatch = serde_json::from_str(json).unwrap();
        let store = DuckStore::open().unwrap();
        let report = ingest_batch(&store, &batch);
        assert!(report.failures.is_empty());
        let amendment = store.get_amendment(report.new_amendments[0]).unwrap();
        assert_eq!(amendment.change_type, ChangeType::Abolished);
    }
}
