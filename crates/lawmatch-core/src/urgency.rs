//! Urgency classification for (amendment, parent-law link) pairs.
//!
//! The policy is an ordered rule table keyed on the change type and on
//! whether the link cites specific articles. Every input matches exactly one
//! rule; [`Rule::select`] is an exhaustive match, so adding a change type
//! without extending the table is a compile error.
//!
//! | precedence | change type | articles cited | urgency | need revision |
//! |---|---|---|---|---|
//! | 1 | ABOLISHED | any | HIGH | yes |
//! | 2 | AMENDED | yes | HIGH | yes |
//! | 3 | AMENDED | no | MEDIUM | yes |
//! | 4 | ENACTED | any | LOW | no |
//!
//! The amendment's effective date never changes the verdict. When known it
//! is folded into the recorded reason as a calendar date, so the same inputs
//! give the same reason on any day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::articles;
use crate::model::{ChangeType, Urgency};

/// Inputs for one classification.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationInput<'a> {
    pub change_type: ChangeType,
    /// The link's `related_articles` text.
    pub related_articles: Option<&'a str>,
    pub effective_date: Option<NaiveDate>,
}

/// One row of the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Abolished,
    AmendedScoped,
    AmendedUnscoped,
    Enacted,
}

impl Rule {
    /// Rules in precedence order, highest first.
    pub const PRECEDENCE: [Rule; 4] = [
        Self::Abolished,
        Self::AmendedScoped,
        Self::AmendedUnscoped,
        Self::Enacted,
    ];

    /// The unique rule for a change type and article scope.
    pub fn select(change_type: ChangeType, scoped: bool) -> Rule {
        match (change_type, scoped) {
            (ChangeType::Abolished, _) => Self::Abolished,
            (ChangeType::Amended, true) => Self::AmendedScoped,
            (ChangeType::Amended, false) => Self::AmendedUnscoped,
            (ChangeType::Enacted, _) => Self::Enacted,
        }
    }

    /// Whether this rule's condition holds.
    pub fn matches(&self, change_type: ChangeType, scoped: bool) -> bool {
        match self {
            Self::Abolished => change_type == ChangeType::Abolished,
            Self::AmendedScoped => change_type == ChangeType::Amended && scoped,
            Self::AmendedUnscoped => change_type == ChangeType::Amended && !scoped,
            Self::Enacted => change_type == ChangeType::Enacted,
        }
    }

    pub fn urgency(&self) -> Urgency {
        match self {
            Self::Abolished | Self::AmendedScoped => Urgency::High,
            Self::AmendedUnscoped => Urgency::Medium,
            Self::Enacted => Urgency::Low,
        }
    }

    pub fn need_revision(&self) -> bool {
        !matches!(self, Self::Enacted)
    }

    fn summary(&self) -> &'static str {
        match self {
            Self::Abolished => "parent law abolished; legal basis must be revisited",
            Self::AmendedScoped => "amended law is cited article by article",
            Self::AmendedUnscoped => "whole-law dependency on an amended law",
            Self::Enacted => "new law enacted; flagged for awareness",
        }
    }
}

/// Verdict for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub rule: Rule,
    pub urgency: Urgency,
    pub need_revision: bool,
    pub reason: String,
}

/// Classify one (amendment, link) pair. Pure and deterministic.
pub fn classify(input: &ClassificationInput<'_>) -> Classification {
    let scoped = articles::is_scoped(input.related_articles);
    let rule = Rule::select(input.change_type, scoped);

    let mut reason = rule.summary().to_string();
    if rule == Rule::AmendedScoped {
        if let Some(text) = input.related_articles {
            reason.push_str(&format!(" ({})", text.trim()));
        }
    }
    if let Some(effective) = input.effective_date {
        reason.push_str(&format!("; effective {effective}"));
    }

    Classification {
        rule,
        urgency: rule.urgency(),
        need_revision: rule.need_revision(),
        reason,
    }
}
