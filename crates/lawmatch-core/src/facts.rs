//! Normalized facts delivered by the statute registry feed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Category, ChangeType, LawType};

/// An ordinance as registered upstream. Keyed by `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinanceFact {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub department: Option<String>,
    /// Defaults to `ACTIVE`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub enacted_date: Option<NaiveDate>,
    #[serde(default)]
    pub enforced_date: Option<NaiveDate>,
}

/// Link attributes for one ordinance → law dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawLink {
    pub law_id: String,
    pub law_name: String,
    pub law_type: LawType,
    #[serde(default)]
    pub related_articles: Option<String>,
    #[serde(default)]
    pub proclaimed_date: Option<NaiveDate>,
    #[serde(default)]
    pub enforced_date: Option<NaiveDate>,
}

/// A link as delivered by the feed, naming the ordinance by registry code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLawFact {
    pub ordinance_code: String,
    #[serde(flatten)]
    pub link: LawLink,
}

/// One detected change to a law.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentFact {
    pub law_id: String,
    pub law_name: String,
    pub change_type: ChangeType,
    pub detected_at: DateTime<Utc>,
    /// Upstream revision identifier (법령일련번호), preferred for dedupe.
    #[serde(default)]
    pub revision_id: Option<String>,
    #[serde(default)]
    pub proclaimed_date: Option<NaiveDate>,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AmendmentFact {
    /// Identity of the change event across repeated polls.
    ///
    /// `rev:<revision_id>` when upstream supplies one, otherwise
    /// `<law_id>|<CHANGE_TYPE>|<detected date>`.
    pub fn dedupe_key(&self) -> String {
        match self.revision_id.as_deref().map(str::trim) {
            Some(rev) if !rev.is_empty() => format!("rev:{rev}"),
            _ => format!(
                "{}|{}|{}",
                self.law_id.trim(),
                self.change_type.as_str(),
                self.detected_at.date_naive()
            ),
        }
    }
}

/// One poll's worth of facts. Applied in field order: ordinances, links, amendments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedBatch {
    #[serde(default)]
    pub ordinances: Vec<OrdinanceFact>,
    #[serde(default)]
    pub parent_laws: Vec<ParentLawFact>,
    #[serde(default)]
    pub amendments: Vec<AmendmentFact>,
}

impl FeedBatch {
    pub fn is_empty(&self) -> bool {
        self.ordinances.is_empty() && self.parent_laws.is_empty() && self.amendments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fact(revision_id: Option<&str>) -> AmendmentFact {
        AmendmentFact {
            law_id: "001823".into(),
            law_name: "주차장법".into(),
            change_type: ChangeType::Amended,
            detected_at: Utc.with_ymd_and_hms(2026, 2, 21, 10, 0, 0).unwrap(),
            revision_id: revision_id.map(String::from),
            proclaimed_date: None,
            effective_date: None,
            description: None,
        }
    }

    #[test]
    fn dedupe_key_without_revision() {
        assert_eq!(fact(None).dedupe_key(), "001823|AMENDED|2026-02-21");
    }

    #[test]
    fn dedupe_key_ignores_time_of_day() {
        let mut later = fact(None);
        later.detected_at = Utc.with_ymd_and_hms(2026, 2, 21, 23, 59, 0).unwrap();
        assert_eq!(fact(None).dedupe_key(), later.dedupe_key());
    }

    #[test]
    fn dedupe_key_prefers_revision() {
        assert_eq!(fact(Some("263041")).dedupe_key(), "rev:263041");
        assert_eq!(fact(Some("  ")).dedupe_key(), "001823|AMENDED|2026-02-21");
    }

    #[test]
    fn parent_law_fact_flattened_json() {
        let json = r#"{
            "ordinance_code": "3220000-12",
            "law_id": "001823",
            "law_name": "주차장법",
            "law_type": "법률",
            "related_articles": "제12조"
        }"#;
        let parsed: ParentLawFact = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.ordinance_code, "3220000-12");
        assert_eq!(parsed.link.law_type, LawType::Act);
        assert_eq!(parsed.link.related_articles.as_deref(), Some("제12조"));
        assert!(parsed.link.proclaimed_date.is_none());
    }

    #[test]
    fn feed_batch_sections_default_to_empty() {
        let json = r#"{
            "amendments": [{
                "law_id": "001823",
                "law_name": "주차장법",
                "change_type": "일부개정",
                "detected_at": "2026-02-21T10:00:00Z",
                "effective_date": "2026-08-21"
            }]
        }"#;
        let batch: FeedBatch = serde_json::from_str(json).unwrap();
        assert!(batch.ordinances.is_empty());
        assert_eq!(batch.amendments.len(), 1);
        assert_eq!(batch.amendments[0].change_type, ChangeType::Amended);
        assert_eq!(
            batch.amendments[0].effective_date,
            NaiveDate::from_ymd_opt(2026, 8, 21)
        );
        assert!(!batch.is_empty());
    }
}
