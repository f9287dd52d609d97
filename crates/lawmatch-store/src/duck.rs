//! DuckDB storage for ordinances, parent-law links, amendments, and reviews.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use arrow::array::Int64Array;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use duckdb::{Connection, Params, Row};
use tracing::{debug, info};

use lawmatch_core::{
    Amendment, AmendmentFact, AmendmentFilter, AmendmentId, Category, ChangeType, LawLink, LawType,
    Ordinance, OrdinanceFact, OrdinanceId, ParentLaw, Review, ReviewFilter, ReviewId,
    model::ORDINANCE_ACTIVE,
};

use crate::StoreError;

const SCHEMA: &str = "
CREATE SEQUENCE IF NOT EXISTS ordinance_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS parent_law_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS amendment_id_seq START 1;
CREATE SEQUENCE IF NOT EXISTS review_id_seq START 1;

CREATE TABLE IF NOT EXISTS ordinances (
    id            BIGINT PRIMARY KEY,
    code          VARCHAR NOT NULL UNIQUE,
    name          VARCHAR NOT NULL,
    category      VARCHAR,
    department    VARCHAR,
    status        VARCHAR NOT NULL,
    enacted_date  VARCHAR,
    enforced_date VARCHAR,
    created_at    VARCHAR NOT NULL,
    updated_at    VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS parent_laws (
    id               BIGINT PRIMARY KEY,
    ordinance_id     BIGINT NOT NULL,
    law_id           VARCHAR NOT NULL,
    law_name         VARCHAR NOT NULL,
    law_type         VARCHAR NOT NULL,
    proclaimed_date  VARCHAR,
    enforced_date    VARCHAR,
    related_articles VARCHAR,
    created_at       VARCHAR NOT NULL,
    updated_at       VARCHAR NOT NULL,
    UNIQUE (ordinance_id, law_id)
);

CREATE TABLE IF NOT EXISTS amendments (
    id              BIGINT PRIMARY KEY,
    dedupe_key      VARCHAR NOT NULL UNIQUE,
    law_id          VARCHAR NOT NULL,
    law_name        VARCHAR NOT NULL,
    change_type     VARCHAR NOT NULL,
    detected_at     VARCHAR NOT NULL,
    revision_id     VARCHAR,
    proclaimed_date VARCHAR,
    effective_date  VARCHAR,
    description     VARCHAR,
    processed       BOOLEAN NOT NULL DEFAULT false
);

CREATE TABLE IF NOT EXISTS reviews (
    id                BIGINT PRIMARY KEY,
    ordinance_id      BIGINT NOT NULL,
    amendment_id      BIGINT NOT NULL,
    urgency           VARCHAR NOT NULL,
    need_revision     BOOLEAN NOT NULL,
    status            VARCHAR NOT NULL,
    reason            VARCHAR,
    affected_articles VARCHAR NOT NULL,
    notes             VARCHAR,
    reviewed_by       VARCHAR,
    reviewed_at       VARCHAR,
    created_at        VARCHAR NOT NULL,
    updated_at        VARCHAR NOT NULL,
    UNIQUE (ordinance_id, amendment_id)
);
";

const ORDINANCE_COLUMNS: &str =
    "id, code, name, category, department, status, enacted_date, enforced_date";
const PARENT_LAW_COLUMNS: &str = "id, ordinance_id, law_id, law_name, law_type, \
     proclaimed_date, enforced_date, related_articles";
pub(crate) const AMENDMENT_COLUMNS: &str = "id, law_id, law_name, change_type, detected_at, revision_id, \
     proclaimed_date, effective_date, description, processed";
pub(crate) const REVIEW_COLUMNS: &str = "id, ordinance_id, amendment_id, urgency, need_revision, \
     status, reason, affected_articles, notes, reviewed_by, reviewed_at, created_at, updated_at";

/// Outcome of an idempotent write keyed by a natural identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// A new row was inserted.
    Created(i64),
    /// An existing row was refreshed in place.
    Updated(i64),
    /// An identical fact was already stored; nothing changed.
    Existing(i64),
}

impl Upserted {
    pub fn id(&self) -> i64 {
        match self {
            Self::Created(id) | Self::Updated(id) | Self::Existing(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// DuckDB store for the legal record set.
///
/// The connection sits behind a mutex: every [`session`](Self::session) and
/// [`transaction`](Self::transaction) holds it for its whole duration, so a
/// transaction is also a critical section against every other caller of the
/// same store.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for file-backed storage that survives across process restarts.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database with the schema created.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    ///
    /// Tables are created on first open and reused afterwards.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened persistent store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))
    }

    /// Run `f` against the connection without opening a transaction.
    pub fn session<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Session<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let guard = self.lock()?;
        f(&Session { conn: &guard })
    }

    /// Run `f` inside one DuckDB transaction.
    ///
    /// Commits when `f` returns `Ok`; any error rolls every write back.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Session<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(StoreError::from)?;
        let out = f(&Session { conn: &tx })?;
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }

    // ── Convenience wrappers ──

    pub fn upsert_ordinance(&self, fact: &OrdinanceFact) -> Result<Upserted, StoreError> {
        self.transaction(|s| s.upsert_ordinance(fact, Utc::now()))
    }

    pub fn upsert_parent_law(
        &self,
        ordinance_id: OrdinanceId,
        link: &LawLink,
    ) -> Result<Upserted, StoreError> {
        self.transaction(|s| s.upsert_parent_law(ordinance_id, link, Utc::now()))
    }

    pub fn upsert_amendment(&self, fact: &AmendmentFact) -> Result<Upserted, StoreError> {
        self.transaction(|s| s.upsert_amendment(fact))
    }

    pub fn get_ordinance(&self, id: OrdinanceId) -> Result<Ordinance, StoreError> {
        self.session(|s| s.get_ordinance(id))
    }

    pub fn find_ordinance_by_code(&self, code: &str) -> Result<Option<Ordinance>, StoreError> {
        self.session(|s| s.find_ordinance_by_code(code))
    }

    pub fn list_ordinances(&self) -> Result<Vec<Ordinance>, StoreError> {
        self.session(|s| s.list_ordinances())
    }

    pub fn parent_laws_for_law(&self, law_id: &str) -> Result<Vec<ParentLaw>, StoreError> {
        self.session(|s| s.parent_laws_for_law(law_id))
    }

    pub fn parent_laws_for_ordinance(
        &self,
        ordinance_id: OrdinanceId,
    ) -> Result<Vec<ParentLaw>, StoreError> {
        self.session(|s| s.parent_laws_for_ordinance(ordinance_id))
    }

    pub fn get_amendment(&self, id: AmendmentId) -> Result<Amendment, StoreError> {
        self.session(|s| s.get_amendment(id))
    }

    pub fn list_amendments(&self, filter: &AmendmentFilter) -> Result<Vec<Amendment>, StoreError> {
        self.session(|s| s.list_amendments(filter))
    }

    pub fn pending_amendments(&self) -> Result<Vec<Amendment>, StoreError> {
        self.session(|s| s.pending_amendments())
    }

    pub fn get_review(&self, id: ReviewId) -> Result<Review, StoreError> {
        self.session(|s| s.get_review(id))
    }

    pub fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, StoreError> {
        self.session(|s| s.list_reviews(filter))
    }

    // ── Escape hatches ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        self.session(|s| s.query_arrow(sql, []))
    }

    /// Execute arbitrary SQL statements with no result.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.session(|s| Ok(s.conn.execute_batch(sql)?))
    }
}

/// A locked view of the connection, transactional or not.
///
/// All row-level reads and writes live here so that the same code runs both
/// standalone and inside [`DuckStore::transaction`].
pub struct Session<'c> {
    pub(crate) conn: &'c Connection,
}

impl Session<'_> {
    pub(crate) fn next_id(&self, sequence: &str) -> Result<i64, StoreError> {
        let sql = format!("SELECT nextval('{sequence}')");
        Ok(self.conn.query_row(&sql, [], |row| row.get::<_, i64>(0))?)
    }

    /// Run a `count(*)::BIGINT` query through the Arrow interface.
    pub(crate) fn count(&self, sql: &str, params: impl Params) -> Result<u64, StoreError> {
        let batches = self.query_arrow(sql, params)?;
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| StoreError::Decode("count column not i64".into()))?;
        Ok(col.value(0).max(0) as u64)
    }

    pub(crate) fn query_arrow(
        &self,
        sql: &str,
        params: impl Params,
    ) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow(params)?.collect();
        Ok(batches)
    }

    // ── Ordinances ──

    pub fn upsert_ordinance(
        &self,
        fact: &OrdinanceFact,
        now: DateTime<Utc>,
    ) -> Result<Upserted, StoreError> {
        let code = fact.code.trim();
        if code.is_empty() {
            return Err(StoreError::Invalid("ordinance code is empty".into()));
        }
        let status = fact.status.as_deref().unwrap_or(ORDINANCE_ACTIVE);
        let category = fact.category.map(|c| c.as_str());
        let now = ts(&now);

        if let Some(existing) = self.find_ordinance_by_code(code)? {
            self.conn.execute(
                "UPDATE ordinances SET name = ?, category = ?, department = ?, status = ?, \
                 enacted_date = ?, enforced_date = ?, updated_at = ? WHERE id = ?",
                duckdb::params![
                    fact.name,
                    category,
                    fact.department,
                    status,
                    date(fact.enacted_date),
                    date(fact.enforced_date),
                    now,
                    existing.id,
                ],
            )?;
            return Ok(Upserted::Updated(existing.id));
        }

        let id = self.next_id("ordinance_id_seq")?;
        self.conn.execute(
            "INSERT INTO ordinances (id, code, name, category, department, status, \
             enacted_date, enforced_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                id,
                code,
                fact.name,
                category,
                fact.department,
                status,
                date(fact.enacted_date),
                date(fact.enforced_date),
                now,
                now,
            ],
        )?;
        debug!(id, code, "ordinance created");
        Ok(Upserted::Created(id))
    }

    pub fn get_ordinance(&self, id: OrdinanceId) -> Result<Ordinance, StoreError> {
        let sql = format!("SELECT {ORDINANCE_COLUMNS} FROM ordinances WHERE id = ?");
        self.query_ordinances(&sql, [id])?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found("ordinance", id))
    }

    pub fn ordinance_exists(&self, id: OrdinanceId) -> Result<bool, StoreError> {
        let n = self.count(
            "SELECT count(*)::BIGINT AS cnt FROM ordinances WHERE id = ?",
            [id],
        )?;
        Ok(n > 0)
    }

    pub fn find_ordinance_by_code(&self, code: &str) -> Result<Option<Ordinance>, StoreError> {
        let sql = format!("SELECT {ORDINANCE_COLUMNS} FROM ordinances WHERE code = ?");
        Ok(self.query_ordinances(&sql, [code.trim()])?.into_iter().next())
    }

    pub fn list_ordinances(&self) -> Result<Vec<Ordinance>, StoreError> {
        let sql = format!("SELECT {ORDINANCE_COLUMNS} FROM ordinances ORDER BY name, id");
        self.query_ordinances(&sql, [])
    }

    fn query_ordinances(&self, sql: &str, params: impl Params) -> Result<Vec<Ordinance>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, OrdinanceRow::read)?;
        rows.map(|r| r.map_err(StoreError::from).and_then(OrdinanceRow::decode))
            .collect()
    }

    // ── Parent-law links ──

    pub fn upsert_parent_law(
        &self,
        ordinance_id: OrdinanceId,
        link: &LawLink,
        now: DateTime<Utc>,
    ) -> Result<Upserted, StoreError> {
        let law_id = link.law_id.trim();
        if law_id.is_empty() {
            return Err(StoreError::Invalid("parent law link without law_id".into()));
        }
        if !self.ordinance_exists(ordinance_id)? {
            return Err(StoreError::not_found("ordinance", ordinance_id));
        }
        let now = ts(&now);

        let sql = format!(
            "SELECT {PARENT_LAW_COLUMNS} FROM parent_laws WHERE ordinance_id = ? AND law_id = ?"
        );
        let existing = self
            .query_parent_laws(&sql, duckdb::params![ordinance_id, law_id])?
            .into_iter()
            .next();

        if let Some(existing) = existing {
            self.conn.execute(
                "UPDATE parent_laws SET law_name = ?, law_type = ?, proclaimed_date = ?, \
                 enforced_date = ?, related_articles = ?, updated_at = ? WHERE id = ?",
                duckdb::params![
                    link.law_name,
                    link.law_type.as_str(),
                    date(link.proclaimed_date),
                    date(link.enforced_date),
                    link.related_articles,
                    now,
                    existing.id,
                ],
            )?;
            return Ok(Upserted::Updated(existing.id));
        }

        let id = self.next_id("parent_law_id_seq")?;
        self.conn.execute(
            "INSERT INTO parent_laws (id, ordinance_id, law_id, law_name, law_type, \
             proclaimed_date, enforced_date, related_articles, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                id,
                ordinance_id,
                law_id,
                link.law_name,
                link.law_type.as_str(),
                date(link.proclaimed_date),
                date(link.enforced_date),
                link.related_articles,
                now,
                now,
            ],
        )?;
        debug!(id, ordinance_id, law_id, "parent law link created");
        Ok(Upserted::Created(id))
    }

    /// Every link whose `law_id` matches, ordered by ordinance.
    pub fn parent_laws_for_law(&self, law_id: &str) -> Result<Vec<ParentLaw>, StoreError> {
        let sql = format!(
            "SELECT {PARENT_LAW_COLUMNS} FROM parent_laws WHERE law_id = ? ORDER BY ordinance_id, id"
        );
        self.query_parent_laws(&sql, [law_id.trim()])
    }

    pub fn parent_laws_for_ordinance(
        &self,
        ordinance_id: OrdinanceId,
    ) -> Result<Vec<ParentLaw>, StoreError> {
        let sql = format!(
            "SELECT {PARENT_LAW_COLUMNS} FROM parent_laws WHERE ordinance_id = ? ORDER BY law_id, id"
        );
        self.query_parent_laws(&sql, [ordinance_id])
    }

    pub fn all_parent_laws(&self) -> Result<Vec<ParentLaw>, StoreError> {
        let sql = format!("SELECT {PARENT_LAW_COLUMNS} FROM parent_laws ORDER BY law_id, ordinance_id");
        self.query_parent_laws(&sql, [])
    }

    fn query_parent_laws(&self, sql: &str, params: impl Params) -> Result<Vec<ParentLaw>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, ParentLawRow::read)?;
        rows.map(|r| r.map_err(StoreError::from).and_then(ParentLawRow::decode))
            .collect()
    }

    // ── Amendments ──

    /// Record a detected change once. A repeat of the same change event
    /// (same dedupe key) returns [`Upserted::Existing`] and writes nothing.
    pub fn upsert_amendment(&self, fact: &AmendmentFact) -> Result<Upserted, StoreError> {
        let law_id = fact.law_id.trim();
        if law_id.is_empty() {
            return Err(StoreError::Invalid("amendment without law_id".into()));
        }
        let key = fact.dedupe_key();
        let existing: Vec<i64> = {
            let mut stmt = self.conn.prepare("SELECT id FROM amendments WHERE dedupe_key = ?")?;
            let rows = stmt.query_map([key.as_str()], |row| row.get::<_, i64>(0))?;
            rows.collect::<Result<_, _>>()?
        };
        if let Some(&id) = existing.first() {
            debug!(id, key = %key, "duplicate amendment detection ignored");
            return Ok(Upserted::Existing(id));
        }

        let id = self.next_id("amendment_id_seq")?;
        self.conn.execute(
            "INSERT INTO amendments (id, dedupe_key, law_id, law_name, change_type, detected_at, \
             revision_id, proclaimed_date, effective_date, description, processed) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, false)",
            duckdb::params![
                id,
                key,
                law_id,
                fact.law_name,
                fact.change_type.as_str(),
                ts(&fact.detected_at),
                fact.revision_id,
                date(fact.proclaimed_date),
                date(fact.effective_date),
                fact.description,
            ],
        )?;
        info!(id, law_id, change_type = %fact.change_type, "amendment recorded");
        Ok(Upserted::Created(id))
    }

    pub fn get_amendment(&self, id: AmendmentId) -> Result<Amendment, StoreError> {
        let sql = format!("SELECT {AMENDMENT_COLUMNS} FROM amendments WHERE id = ?");
        self.query_amendments(&sql, [id])?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found("amendment", id))
    }

    /// Newest detections first.
    pub fn list_amendments(&self, filter: &AmendmentFilter) -> Result<Vec<Amendment>, StoreError> {
        let mut sql = format!("SELECT {AMENDMENT_COLUMNS} FROM amendments WHERE 1 = 1");
        let mut args: Vec<duckdb::types::Value> = Vec::new();
        if let Some(processed) = filter.processed {
            sql.push_str(" AND processed = ?");
            args.push(duckdb::types::Value::Boolean(processed));
        }
        if let Some(law_id) = &filter.law_id {
            sql.push_str(" AND law_id = ?");
            args.push(duckdb::types::Value::Text(law_id.trim().to_string()));
        }
        sql.push_str(" ORDER BY detected_at DESC, id DESC");
        self.query_amendments(&sql, duckdb::params_from_iter(args))
    }

    /// Unprocessed amendments in detection order (oldest first).
    pub fn pending_amendments(&self) -> Result<Vec<Amendment>, StoreError> {
        let sql = format!(
            "SELECT {AMENDMENT_COLUMNS} FROM amendments WHERE NOT processed \
             ORDER BY detected_at ASC, id ASC"
        );
        self.query_amendments(&sql, [])
    }

    /// Atomic gate: flip `processed` to true only if it is currently false.
    ///
    /// Returns `false` when the amendment was already processed.
    pub fn mark_processed_if_pending(&self, id: AmendmentId) -> Result<bool, StoreError> {
        let n = self.conn.execute(
            "UPDATE amendments SET processed = true WHERE id = ? AND NOT processed",
            [id],
        )?;
        Ok(n == 1)
    }

    /// Set `processed` regardless of its current value. Never clears it.
    pub fn mark_processed(&self, id: AmendmentId) -> Result<(), StoreError> {
        let n = self
            .conn
            .execute("UPDATE amendments SET processed = true WHERE id = ?", [id])?;
        if n == 0 {
            return Err(StoreError::not_found("amendment", id));
        }
        Ok(())
    }

    fn query_amendments(&self, sql: &str, params: impl Params) -> Result<Vec<Amendment>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, AmendmentRow::read)?;
        rows.map(|r| r.map_err(StoreError::from).and_then(AmendmentRow::decode))
            .collect()
    }
}

// ── Row decoding ──

struct OrdinanceRow {
    id: i64,
    code: String,
    name: String,
    category: Option<String>,
    department: Option<String>,
    status: String,
    enacted_date: Option<String>,
    enforced_date: Option<String>,
}

impl OrdinanceRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            department: row.get(4)?,
            status: row.get(5)?,
            enacted_date: row.get(6)?,
            enforced_date: row.get(7)?,
        })
    }

    fn decode(self) -> Result<Ordinance, StoreError> {
        Ok(Ordinance {
            id: self.id,
            code: self.code,
            name: self.name,
            category: self
                .category
                .as_deref()
                .map(str::parse::<Category>)
                .transpose()
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            department: self.department,
            status: self.status,
            enacted_date: parse_date(self.enacted_date.as_deref())?,
            enforced_date: parse_date(self.enforced_date.as_deref())?,
        })
    }
}

struct ParentLawRow {
    id: i64,
    ordinance_id: i64,
    law_id: String,
    law_name: String,
    law_type: String,
    proclaimed_date: Option<String>,
    enforced_date: Option<String>,
    related_articles: Option<String>,
}

impl ParentLawRow {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ordinance_id: row.get(1)?,
            law_id: row.get(2)?,
            law_name: row.get(3)?,
            law_type: row.get(4)?,
            proclaimed_date: row.get(5)?,
            enforced_date: row.get(6)?,
            related_articles: row.get(7)?,
        })
    }

    fn decode(self) -> Result<ParentLaw, StoreError> {
        Ok(ParentLaw {
            id: self.id,
            ordinance_id: self.ordinance_id,
            law_id: self.law_id,
            law_name: self.law_name,
            law_type: LawType::from(self.law_type),
            proclaimed_date: parse_date(self.proclaimed_date.as_deref())?,
            enforced_date: parse_date(self.enforced_date.as_deref())?,
            related_articles: self.related_articles,
        })
    }
}

pub(crate) struct AmendmentRow {
    id: i64,
    law_id: String,
    law_name: String,
    change_type: String,
    detected_at: String,
    revision_id: Option<String>,
    proclaimed_date: Option<String>,
    effective_date: Option<String>,
    description: Option<String>,
    processed: bool,
}

impl AmendmentRow {
    pub(crate) fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            law_id: row.get(1)?,
            law_name: row.get(2)?,
            change_type: row.get(3)?,
            detected_at: row.get(4)?,
            revision_id: row.get(5)?,
            proclaimed_date: row.get(6)?,
            effective_date: row.get(7)?,
            description: row.get(8)?,
            processed: row.get(9)?,
        })
    }

    pub(crate) fn decode(self) -> Result<Amendment, StoreError> {
        Ok(Amendment {
            id: self.id,
            law_id: self.law_id,
            law_name: self.law_name,
            change_type: self
                .change_type
                .parse::<ChangeType>()
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            detected_at: parse_ts(&self.detected_at)?,
            revision_id: self.revision_id,
            proclaimed_date: parse_date(self.proclaimed_date.as_deref())?,
            effective_date: parse_date(self.effective_date.as_deref())?,
            description: self.description,
            processed: self.processed,
        })
    }
}

// ── Value encoding ──
//
// Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
// order equals time order; dates as YYYY-MM-DD.

pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("timestamp {s:?}: {e}")))
}

fn date(d: Option<NaiveDate>) -> Option<String> {
    d.map(|d| d.format("%Y-%m-%d").to_string())
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>, StoreError> {
    s.map(|s| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| StoreError::Decode(format!("date {s:?}: {e}")))
    })
    .transpose()
}
