//! Persisted records: ordinances, parent-law links, amendments, and reviews.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::articles::{self, ArticleRef};

pub type OrdinanceId = i64;
pub type ParentLawId = i64;
pub type AmendmentId = i64;
pub type ReviewId = i64;

/// Ordinance status counted as "in force" by the dashboard.
pub const ORDINANCE_ACTIVE: &str = "ACTIVE";

/// A string did not name a known variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ── Enumerations ──

/// Kind of local regulation: statute (조례) or rule (규칙).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "조례")]
    Ordinance,
    #[serde(rename = "규칙")]
    Rule,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ordinance => "조례",
            Self::Rule => "규칙",
        }
    }
}

impl FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "조례" => Ok(Self::Ordinance),
            "규칙" => Ok(Self::Rule),
            other => Err(ParseError::new("category", other)),
        }
    }
}

/// Rank of a parent law. Values outside the three canonical ranks
/// (대통령령, 총리령, 부령, ...) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LawType {
    /// 법률
    Act,
    /// 시행령
    EnforcementDecree,
    /// 시행규칙
    EnforcementRule,
    Other(String),
}

impl LawType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Act => "법률",
            Self::EnforcementDecree => "시행령",
            Self::EnforcementRule => "시행규칙",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for LawType {
    fn from(s: String) -> Self {
        match s.trim() {
            "법률" => Self::Act,
            "시행령" => Self::EnforcementDecree,
            "시행규칙" => Self::EnforcementRule,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<LawType> for String {
    fn from(t: LawType) -> Self {
        t.as_str().to_string()
    }
}

/// What happened to a law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    #[serde(alias = "제정")]
    Enacted,
    #[serde(alias = "REVISION", alias = "일부개정", alias = "전부개정")]
    Amended,
    #[serde(alias = "폐지")]
    Abolished,
}

impl ChangeType {
    pub const ALL: [ChangeType; 3] = [Self::Enacted, Self::Amended, Self::Abolished];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enacted => "ENACTED",
            Self::Amended => "AMENDED",
            Self::Abolished => "ABOLISHED",
        }
    }
}

impl FromStr for ChangeType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ENACTED" | "enacted" | "제정" => Ok(Self::Enacted),
            "AMENDED" | "amended" | "REVISION" | "일부개정" | "전부개정" => Ok(Self::Amended),
            "ABOLISHED" | "abolished" | "폐지" => Ok(Self::Abolished),
            other => Err(ParseError::new("change type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub const ALL: [Urgency; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl FromStr for Urgency {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => Err(ParseError::new("urgency", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    InReview,
    Completed,
    Dismissed,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 4] = [
        Self::Pending,
        Self::InReview,
        Self::Completed,
        Self::Dismissed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InReview => "IN_REVIEW",
            Self::Completed => "COMPLETED",
            Self::Dismissed => "DISMISSED",
        }
    }

    /// COMPLETED and DISMISSED admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Dismissed)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl FromStr for ReviewStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_REVIEW" => Ok(Self::InReview),
            "COMPLETED" => Ok(Self::Completed),
            "DISMISSED" => Ok(Self::Dismissed),
            _ => Err(ParseError::new("review status", s)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Category, LawType, ChangeType, Urgency, ReviewStatus);

// ── Records ──

/// A municipal regulation (자치법규).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordinance {
    pub id: OrdinanceId,
    /// Registry identifier (자치법규ID), unique.
    pub code: String,
    pub name: String,
    pub category: Option<Category>,
    pub department: Option<String>,
    pub status: String,
    pub enacted_date: Option<NaiveDate>,
    pub enforced_date: Option<NaiveDate>,
}

/// Link asserting that an ordinance derives its authority from law `law_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLaw {
    pub id: ParentLawId,
    pub ordinance_id: OrdinanceId,
    pub law_id: String,
    pub law_name: String,
    pub law_type: LawType,
    pub proclaimed_date: Option<NaiveDate>,
    pub enforced_date: Option<NaiveDate>,
    /// Free-text article citations, e.g. `"제3조, 제5조"`.
    pub related_articles: Option<String>,
}

impl ParentLaw {
    pub fn is_scoped(&self) -> bool {
        articles::is_scoped(self.related_articles.as_deref())
    }

    pub fn cited_articles(&self) -> Vec<ArticleRef> {
        self.related_articles
            .as_deref()
            .map(articles::parse_articles)
            .unwrap_or_default()
    }
}

/// A detected enactment, amendment, or repeal of a law.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amendment {
    pub id: AmendmentId,
    pub law_id: String,
    pub law_name: String,
    pub change_type: ChangeType,
    pub detected_at: DateTime<Utc>,
    /// Upstream revision identifier, when the supplier provides one.
    pub revision_id: Option<String>,
    pub proclaimed_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub description: Option<String>,
    /// Monotonic: set once an analysis run completes, never cleared.
    pub processed: bool,
}

/// Operator work item for one (ordinance, amendment) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub ordinance_id: OrdinanceId,
    pub amendment_id: AmendmentId,
    pub urgency: Urgency,
    pub need_revision: bool,
    pub status: ReviewStatus,
    /// Rationale recorded by the classifier.
    pub reason: Option<String>,
    pub affected_articles: Vec<ArticleRef>,
    /// Operator-entered.
    pub notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Operator request against a review. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewUpdate {
    pub status: Option<ReviewStatus>,
    pub notes: Option<String>,
    pub reviewed_by: Option<String>,
    /// Status the caller last saw; a mismatch is a conflict.
    pub expected_status: Option<ReviewStatus>,
}

impl ReviewUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none() && self.reviewed_by.is_none()
    }
}

// ── Filters ──

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
    pub urgency: Option<Urgency>,
    pub ordinance_id: Option<OrdinanceId>,
    pub amendment_id: Option<AmendmentId>,
    pub need_revision: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmendmentFilter {
    pub processed: Option<bool>,
    pub law_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_type_accepts_source_spellings() {
        assert_eq!("제정".parse::<ChangeType>().unwrap(), ChangeType::Enacted);
        assert_eq!("일부개정".parse::<ChangeType>().unwrap(), ChangeType::Amended);
        assert_eq!("REVISION".parse::<ChangeType>().unwrap(), ChangeType::Amended);
        assert_eq!("폐지".parse::<ChangeType>().unwrap(), ChangeType::Abolished);
        assert!("MERGED".parse::<ChangeType>().is_err());
    }

    #[test]
    fn change_type_serde_aliases() {
        let parsed: ChangeType = serde_json::from_str("\"전부개정\"").unwrap();
        assert_eq!(parsed, ChangeType::Amended);
        assert_eq!(serde_json::to_string(&ChangeType::Abolished).unwrap(), "\"ABOLISHED\"");
    }

    #[test]
    fn law_type_keeps_unknown_ranks() {
        assert_eq!(LawType::from("시행령".to_string()), LawType::EnforcementDecree);
        let other = LawType::from("대통령령".to_string());
        assert_eq!(other, LawType::Other("대통령령".into()));
        assert_eq!(other.as_str(), "대통령령");
        let json = serde_json::to_string(&LawType::Act).unwrap();
        assert_eq!(json, "\"법률\"");
    }

    #[test]
    fn review_status_strings() {
        for status in ReviewStatus::ALL {
            assert_eq!(status.as_str().parse::<ReviewStatus>().unwrap(), status);
        }
        assert_eq!("in_review".parse::<ReviewStatus>().unwrap(), ReviewStatus::InReview);
        assert!(ReviewStatus::Dismissed.is_terminal());
        assert!(ReviewStatus::InReview.is_active());
    }

    #[test]
    fn category_uses_korean_labels() {
        assert_eq!("규칙".parse::<Category>().unwrap(), Category::Rule);
        assert_eq!(serde_json::to_string(&Category::Ordinance).unwrap(), "\"조례\"");
    }

    #[test]
    fn parent_law_scope_and_citations() {
        let mut link = ParentLaw {
            id: 1,
            ordinance_id: 7,
            law_id: "L1".into(),
            law_name: "주차장법".into(),
            law_type: LawType::Act,
            proclaimed_date: None,
            enforced_date: None,
            related_articles: Some("제12조의2, 제3조".into()),
        };
        assert!(link.is_scoped());
        assert_eq!(
            link.cited_articles(),
            vec![ArticleRef::new(3, 0), ArticleRef::new(12, 2)]
        );

        link.related_articles = Some("  ".into());
        assert!(!link.is_scoped());
        assert!(link.cited_articles().is_empty());
    }

    #[test]
    fn empty_update() {
        assert!(ReviewUpdate::default().is_empty());
        let update = ReviewUpdate {
            expected_status: Some(ReviewStatus::Pending),
            ..Default::default()
        };
        assert!(update.is_empty());
    }
}
