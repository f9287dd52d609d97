//! Terminal rendering for reviews, amendments, and dashboard cards.
//!
//! Cards are grouped into sections; a section with no populated field is
//! skipped entirely.

use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};

use lawmatch_core::{Amendment, Ordinance, OrdinanceId, ParentLaw, Review};
use lawmatch_impact::{AnalysisSummary, BatchReport};
use lawmatch_store::{DashboardSummary, PendingReview, RecentAmendment};
use lawmatch_sync::{IngestReport, Tally};

const MAX_LIST_ITEMS: usize = 10;
const MAX_TEXT: usize = 60;

type Field<'a> = (&'a str, Option<String>);

// ── Cards ──

/// Print one review as a vertical card, with its ordinance, the ordinance's
/// parent laws, and the amendment when they could be loaded.
pub fn print_review_card(
    review: &Review,
    ordinance: Option<&Ordinance>,
    links: &[ParentLaw],
    amendment: Option<&Amendment>,
) {
    let title = ordinance.map(|o| o.name.as_str()).unwrap_or("(unknown ordinance)");
    println!("=== Review #{} ===", review.id);
    println!("{title}");
    println!();

    print_section(
        "Verdict",
        &[
            ("urgency", Some(review.urgency.to_string())),
            ("need_revision", Some(yes_no(review.need_revision).into())),
            ("status", Some(review.status.to_string())),
            ("reason", review.reason.clone()),
            ("affected_articles", articles(review)),
        ],
    );
    if let Some(o) = ordinance {
        print_section(
            "Ordinance",
            &[
                ("code", Some(o.code.clone())),
                ("category", o.category.map(|c| c.to_string())),
                ("department", o.department.clone()),
                ("status", Some(o.status.clone())),
                ("enforced_date", o.enforced_date.map(|d| d.to_string())),
            ],
        );
    }
    if !links.is_empty() {
        println!("Parent laws");
        for link in links.iter().take(MAX_LIST_ITEMS) {
            let marker = if amendment.is_some_and(|a| a.law_id == link.law_id) { "*" } else { " " };
            println!(
                " {marker}{:<12} {:<8} {}  {}",
                link.law_id,
                link.law_type.as_str(),
                shorten(&link.law_name),
                link.related_articles.as_deref().map(str::trim).unwrap_or(""),
            );
        }
        println!();
    }
    if let Some(a) = amendment {
        print_section(
            "Amendment",
            &[
                ("law", Some(format!("{} ({})", a.law_name, a.law_id))),
                ("change_type", Some(a.change_type.to_string())),
                ("detected_at", Some(a.detected_at.to_rfc3339())),
                (
                    "effective_date",
                    a.effective_date.map(|d| effective(d, Utc::now().date_naive())),
                ),
                ("description", a.description.as_deref().map(shorten)),
            ],
        );
    }
    print_section(
        "Operator",
        &[
            ("notes", review.notes.clone()),
            ("reviewed_by", review.reviewed_by.clone()),
            ("reviewed_at", review.reviewed_at.map(|t| t.to_rfc3339())),
        ],
    );
    print_section(
        "Timestamps",
        &[
            ("created_at", Some(review.created_at.to_rfc3339())),
            ("updated_at", Some(review.updated_at.to_rfc3339())),
        ],
    );
}

fn print_section(header: &str, fields: &[Field<'_>]) {
    if fields.iter().all(|(_, v)| v.is_none()) {
        return;
    }
    println!("{header}");
    for (name, value) in fields {
        if let Some(v) = value {
            println!("  {name:<20} {v}");
        }
    }
    println!();
}

// ── Tables ──

pub fn print_reviews(reviews: &[Review]) {
    if reviews.is_empty() {
        println!("No reviews.");
        return;
    }
    println!(
        "{:>6}  {:>9}  {:>9}  {:<7}  {:<9}  {:<5}  articles",
        "id", "ordinance", "amendment", "urgency", "status", "rev"
    );
    for r in reviews {
        println!(
            "{:>6}  {:>9}  {:>9}  {:<7}  {:<9}  {:<5}  {}",
            r.id,
            r.ordinance_id,
            r.amendment_id,
            r.urgency.as_str(),
            r.status.as_str(),
            yes_no(r.need_revision),
            articles(r).unwrap_or_else(|| "-".into()),
        );
    }
    println!("{} review(s)", reviews.len());
}

pub fn print_amendments(amendments: &[Amendment]) {
    if amendments.is_empty() {
        println!("No amendments.");
        return;
    }
    for a in amendments {
        println!(
            "{:>6}  {}  {:<9}  {:<12} {}{}",
            a.id,
            a.detected_at.format("%Y-%m-%d %H:%M"),
            a.change_type.as_str(),
            a.law_id,
            a.law_name,
            if a.processed { "" } else { "  [unprocessed]" },
        );
    }
    println!("{} amendment(s)", amendments.len());
}

pub fn print_dashboard(summary: &DashboardSummary, recent: &[RecentAmendment], pending: &[PendingReview]) {
    println!("=== Dashboard ===");
    println!("  {:<26} {}", "active ordinances", summary.active_ordinances);
    println!("  {:<26} {}", "parent laws", summary.parent_laws);
    println!("  {:<26} {}", "recent amendments", summary.recent_amendments);
    println!("  {:<26} {}", "pending reviews", summary.pending_reviews);
    println!("  {:<26} {}", "need revision", summary.need_revision);
    println!("  {:<26} {}", "unprocessed amendments", summary.unprocessed_amendments);
    println!();

    if !recent.is_empty() {
        println!("Recent amendments");
        for item in recent.iter().take(MAX_LIST_ITEMS) {
            let a = &item.amendment;
            println!(
                "  {}  {:<9}  {:<30}  {} ordinance(s)",
                a.detected_at.format("%Y-%m-%d"),
                a.change_type.as_str(),
                shorten(&a.law_name),
                item.affected_ordinances,
            );
        }
        println!();
    }

    if !pending.is_empty() {
        println!("Awaiting review");
        for p in pending.iter().take(MAX_LIST_ITEMS) {
            println!(
                "  #{:<5} {:<7} {:<30} ← {}",
                p.review_id,
                p.urgency.as_str(),
                shorten(&p.ordinance_name),
                p.law_name,
            );
        }
        if pending.len() > MAX_LIST_ITEMS {
            println!("  ... and {} more", pending.len() - MAX_LIST_ITEMS);
        }
        println!();
    }
}

/// Every referenced law with the number of ordinances that depend on it.
pub fn print_laws(groups: &BTreeMap<String, BTreeSet<OrdinanceId>>) {
    if groups.is_empty() {
        println!("No parent-law links.");
        return;
    }
    println!("{:<14} ordinances", "law_id");
    for (law_id, ordinances) in groups {
        println!("{law_id:<14} {}", ordinances.len());
    }
    println!("{} law(s)", groups.len());
}

// ── Run summaries ──

pub fn print_analysis(summary: &AnalysisSummary) {
    if summary.is_noop() {
        println!(
            "Amendment {}: no tracked ordinance references this law.",
            summary.amendment_id
        );
        return;
    }
    println!(
        "Amendment {}: {} ordinance(s) affected, {} need revision",
        summary.amendment_id, summary.affected_ordinance_count, summary.need_revision_count
    );
    println!(
        "  reviews: {} created, {} updated, {} unchanged, {} skipped",
        summary.reviews_created,
        summary.reviews_updated,
        summary.reviews_unchanged,
        summary.reviews_skipped
    );
}

pub fn print_batch(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(summary) => print_analysis(summary),
            Err(e) => println!("Amendment {}: FAILED: {e}", outcome.amendment_id),
        }
    }
    println!(
        "{} attempted, {} succeeded, {} failed",
        report.outcomes.len(),
        report.succeeded(),
        report.failed()
    );
}

pub fn print_ingest(report: &IngestReport) {
    print_tally("ordinances", &report.ordinances);
    print_tally("parent laws", &report.parent_laws);
    print_tally("amendments", &report.amendments);
    for f in report.failures.iter().take(MAX_LIST_ITEMS) {
        eprintln!("  rejected {} {}: {}", f.kind, f.key, f.error);
    }
    if report.failures.len() > MAX_LIST_ITEMS {
        eprintln!("  ... and {} more", report.failures.len() - MAX_LIST_ITEMS);
    }
}

fn print_tally(label: &str, t: &Tally) {
    println!(
        "  {label:<12} {} created, {} updated, {} existing, {} failed",
        t.created, t.updated, t.existing, t.failed
    );
}

// ── Helpers ──

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn articles(review: &Review) -> Option<String> {
    if review.affected_articles.is_empty() {
        return None;
    }
    let list: Vec<String> = review.affected_articles.iter().map(|a| a.to_string()).collect();
    Some(list.join(", "))
}

/// Effective date with its distance from `today`.
fn effective(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        d if d > 0 => format!("{date} (in {d} days)"),
        0 => format!("{date} (today)"),
        d => format!("{date} ({} days ago)", -d),
    }
}

fn shorten(text: &str) -> String {
    if text.chars().count() > MAX_TEXT {
        let head: String = text.chars().take(MAX_TEXT - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorten_counts_characters() {
        let korean = "가".repeat(70);
        let short = shorten(&korean);
        assert_eq!(short.chars().count(), MAX_TEXT);
        assert!(short.ends_with("..."));
        assert_eq!(shorten("주차장법"), "주차장법");
    }

    #[test]
    fn effective_date_relative_to_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        assert_eq!(effective(date, today), "2026-04-01 (in 31 days)");
        assert_eq!(effective(today, today), "2026-03-01 (today)");
        assert_eq!(effective(today, date), "2026-03-01 (31 days ago)");
    }
}
