mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use lawmatch_core::{
    AmendmentFilter, FeedBatch, ReviewFilter, ReviewStatus, ReviewUpdate, Urgency,
};
use lawmatch_impact::{ImpactAnalyzer, ParentLawIndex, ReviewLifecycle};
use lawmatch_store::{DashboardOptions, DuckStore};
use lawmatch_sync::{FeedClient, ingest_batch};

const LIST_LIMIT: usize = 20;

#[derive(Parser)]
#[command(name = "lawmatch", version, about = "Track ordinances against changes to their parent laws")]
struct Cli {
    /// DuckDB database file, or `:memory:` for a throwaway store.
    #[arg(long, env = "LAWMATCH_DB", default_value = "lawmatch.duckdb", global = true)]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and its tables.
    Init,
    /// Load a JSON feed batch (ordinances, parent_laws, amendments).
    Ingest {
        file: PathBuf,
        /// Analyze every unprocessed amendment afterwards.
        #[arg(long)]
        analyze: bool,
    },
    /// Pull the statute feed over HTTP and ingest it.
    Sync {
        #[arg(long, env = "LAWMATCH_FEED_URL")]
        feed_url: String,
        /// Only amendments detected after this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        #[arg(long)]
        analyze: bool,
    },
    /// Analyze one amendment, or every unprocessed one with --all.
    Analyze {
        #[arg(required_unless_present = "all")]
        id: Option<i64>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
        /// Print the batch outcome as an Arrow table.
        #[arg(long, requires = "all")]
        table: bool,
    },
    /// Re-run analysis; reviews already taken up by an operator are left alone.
    Reanalyze { id: i64 },
    /// List reviews, newest first.
    Reviews {
        #[arg(long)]
        status: Option<ReviewStatus>,
        #[arg(long)]
        urgency: Option<Urgency>,
        #[arg(long)]
        ordinance: Option<i64>,
        #[arg(long)]
        amendment: Option<i64>,
        #[arg(long)]
        need_revision: Option<bool>,
    },
    /// Show one review.
    Review { id: i64 },
    /// Change a review's status, notes, or reviewer.
    ReviewUpdate {
        id: i64,
        #[arg(long)]
        status: Option<ReviewStatus>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        reviewer: Option<String>,
        /// Fail unless the review is currently in this status.
        #[arg(long)]
        expect: Option<ReviewStatus>,
    },
    /// Parent laws with the number of ordinances citing each.
    Laws,
    /// List amendments, newest first.
    Amendments {
        #[arg(long)]
        processed: Option<bool>,
        #[arg(long)]
        law: Option<String>,
    },
    /// Summary counts, recent amendments, and reviews awaiting action.
    Dashboard {
        #[arg(
            long,
            env = "LAWMATCH_RECENT_DAYS",
            default_value_t = 30,
            value_parser = clap::value_parser!(i64).range(1..=DashboardOptions::MAX_WINDOW_DAYS)
        )]
        recent_days: i64,
    },
    /// Reviews needing revision that nobody has picked up yet.
    Report,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    tracing::debug!("lawmatch v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&cli.db)?;

    match cli.command {
        Command::Init => {
            println!("Store ready at {}", cli.db);
        }
        Command::Ingest { file, analyze } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let batch: FeedBatch = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;
            ingest_and_report(&store, &batch, analyze)?;
        }
        Command::Sync {
            feed_url,
            since,
            analyze,
        } => {
            let client = FeedClient::new(&feed_url);
            let batch = client
                .pull_batch(since)
                .await
                .with_context(|| format!("pulling from {feed_url}"))?;
            ingest_and_report(&store, &batch, analyze)?;
        }
        Command::Analyze { id, all, table } => {
            let analyzer = ImpactAnalyzer::new(&store);
            if all {
                let report = analyzer.analyze_pending().context("listing pending amendments")?;
                if table {
                    let batch = report.to_record_batch()?;
                    arrow::util::pretty::print_batches(&[batch])?;
                } else {
                    display::print_batch(&report);
                }
            } else if let Some(id) = id {
                let summary = analyzer
                    .analyze(id)
                    .with_context(|| format!("analyzing amendment {id}"))?;
                display::print_analysis(&summary);
            }
        }
        Command::Reanalyze { id } => {
            let summary = ImpactAnalyzer::new(&store)
                .reanalyze(id)
                .with_context(|| format!("re-analyzing amendment {id}"))?;
            display::print_analysis(&summary);
        }
        Command::Reviews {
            status,
            urgency,
            ordinance,
            amendment,
            need_revision,
        } => {
            let filter = ReviewFilter {
                status,
                urgency,
                ordinance_id: ordinance,
                amendment_id: amendment,
                need_revision,
            };
            let reviews = ReviewLifecycle::new(&store).list(&filter)?;
            display::print_reviews(&reviews);
        }
        Command::Review { id } => {
            let review = ReviewLifecycle::new(&store).get(id)?;
            let ordinance = store.get_ordinance(review.ordinance_id).ok();
            let links = store
                .parent_laws_for_ordinance(review.ordinance_id)
                .unwrap_or_default();
            let amendment = store.get_amendment(review.amendment_id).ok();
            display::print_review_card(&review, ordinance.as_ref(), &links, amendment.as_ref());
        }
        Command::ReviewUpdate {
            id,
            status,
            notes,
            reviewer,
            expect,
        } => {
            let update = ReviewUpdate {
                status,
                notes,
                reviewed_by: reviewer,
                expected_status: expect,
            };
            if update.is_empty() {
                anyhow::bail!("nothing to update: pass --status, --notes, or --reviewer");
            }
            let review = ReviewLifecycle::new(&store)
                .update(id, &update)
                .with_context(|| format!("updating review {id}"))?;
            println!("Review {} is {}", review.id, review.status);
        }
        Command::Laws => {
            let groups = ParentLawIndex::new(&store).grouped()?;
            display::print_laws(&groups);
        }
        Command::Amendments { processed, law } => {
            let amendments = store.list_amendments(&AmendmentFilter {
                processed,
                law_id: law,
            })?;
            display::print_amendments(&amendments);
        }
        Command::Dashboard { recent_days } => {
            let now = Utc::now();
            let options = DashboardOptions {
                recent_window_days: recent_days,
            };
            let summary = store.dashboard_summary(now, &options)?;
            let since = options.window_start(now)?;
            let recent: Vec<_> = store
                .recent_amendments(LIST_LIMIT)?
                .into_iter()
                .filter(|r| r.amendment.detected_at >= since)
                .collect();
            let pending = store.pending_reviews(LIST_LIMIT)?;
            display::print_dashboard(&summary, &recent, &pending);
        }
        Command::Report => {
            let report = store.revision_report(Utc::now())?;
            println!(
                "Revision report {}: {} review(s) need revision (HIGH {}, MEDIUM {}, LOW {})",
                report.generated_at.format("%Y-%m-%d %H:%M"),
                report.total(),
                report.high,
                report.medium,
                report.low
            );
            if report.total() > 0 {
                let batch = report.to_record_batch()?;
                arrow::util::pretty::print_batches(&[batch])?;
            }
        }
    }

    Ok(())
}

fn open_store(db: &str) -> anyhow::Result<DuckStore> {
    if db == ":memory:" {
        return DuckStore::open().context("opening in-memory store");
    }
    DuckStore::open_persistent(Path::new(db)).with_context(|| format!("opening {db}"))
}

fn ingest_and_report(store: &DuckStore, batch: &FeedBatch, analyze: bool) -> anyhow::Result<()> {
    let report = ingest_batch(store, batch);
    display::print_ingest(&report);
    if analyze {
        let outcomes = ImpactAnalyzer::new(store).analyze_pending()?;
        display::print_batch(&outcomes);
    }
    Ok(())
}
