//! SQLite repository
//!
//! The `entities` table is the persistence collaborator and `drafts` is
//! the append-only ledger. A unit of work is one `BEGIN IMMEDIATE`
//! transaction on the repository's connection, so an entity write and its
//! draft insert commit together, and a second writer (in this process or
//! another) waits for the lock instead of racing on the next sequence.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use drafter_core::codec::Snapshot;
use drafter_core::config::DrafterConfig;
use drafter_core::errors::{ExError, ExErrorKind};
use drafter_core::model::{AttributeMap, Draft, Entity, OperationType};
use drafter_core::store::{DraftRepository, DraftStore, EntityPersistence, UnitOfWork};
use rusqlite::{Connection, OptionalExtension};

use crate::db;
use crate::errors::{corrupt_row, from_rusqlite, Result};
use crate::migrations::apply_migrations;

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (creating if needed) a database file and migrate it
    ///
    /// # Errors
    ///
    /// Open, pragma or migration failures.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(db::open(path)?, db::DEFAULT_BUSY_TIMEOUT_MS)
    }

    /// Private in-memory database, migrated
    ///
    /// # Errors
    ///
    /// Pragma or migration failures.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?, db::DEFAULT_BUSY_TIMEOUT_MS)
    }

    /// Open the configured database (in memory when no path is set)
    ///
    /// # Errors
    ///
    /// Open, pragma or migration failures.
    pub fn from_config(config: &DrafterConfig) -> Result<Self> {
        let conn = match &config.database_path {
            Some(path) => db::open(path)?,
            None => db::open_in_memory()?,
        };
        Self::from_connection(conn, config.busy_timeout_ms)
    }

    fn from_connection(mut conn: Connection, busy_timeout_ms: u64) -> Result<Self> {
        db::configure(&conn, busy_timeout_ms)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` against the underlying connection
    ///
    /// # Errors
    ///
    /// Whatever `f` returns.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock();
        f(&conn)
    }

    /// Number of committed drafts for the entity
    ///
    /// # Errors
    ///
    /// Backend read failures.
    pub fn draft_count(&self, entity_id: &str) -> Result<u64> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM drafts WHERE entity_id = ?1",
                [entity_id],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Check every stored snapshot of the entity against its digest
    ///
    /// # Errors
    ///
    /// `IntegrityViolation` naming the first draft whose snapshot does not
    /// match its recorded digest.
    pub fn verify_integrity(&self, entity_id: &str) -> Result<()> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT sequence, snapshot_json, snapshot_digest FROM drafts
                 WHERE entity_id = ?1 ORDER BY sequence",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([entity_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        for (sequence, snapshot_json, digest) in rows {
            let snapshot = Snapshot::from_json(&snapshot_json)
                .map_err(|e| e.with_entity_id(entity_id))?;
            if snapshot.digest() != digest || !snapshot.verify() {
                return Err(ExError::new(ExErrorKind::IntegrityViolation)
                    .with_op("verify_integrity")
                    .with_entity_id(entity_id)
                    .with_message(format!("Draft {} does not match its digest", sequence)));
            }
        }
        Ok(())
    }

    /// A hook panicking inside a unit of work poisons the mutex. The unit's
    /// drop normally rolled back already; a transaction still open is rolled
    /// back here before the connection is reused.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            self.conn.clear_poison();
            let conn = poisoned.into_inner();
            tracing::warn!(
                component = module_path!(),
                op = "recover_lock",
                in_transaction = !conn.is_autocommit(),
                "SQLite connection lock was poisoned by a panic"
            );
            if !conn.is_autocommit() {
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    tracing::warn!(component = module_path!(), op = "rollback", error = %e);
                }
            }
            conn
        })
    }

    fn unit(&self) -> Result<SqliteUnitOfWork<'_>> {
        let conn = self.lock();
        conn.execute_batch("BEGIN IMMEDIATE").map_err(from_rusqlite)?;
        Ok(SqliteUnitOfWork { conn, open: true })
    }
}

impl DraftStore for SqliteRepository {
    fn append(
        &self,
        entity_id: &str,
        operation: OperationType,
        snapshot: Snapshot,
    ) -> Result<Draft> {
        let mut unit = self.unit()?;
        let draft = unit.append(entity_id, operation, snapshot)?;
        Box::new(unit).commit()?;
        Ok(draft)
    }

    fn get_latest(&self, entity_id: &str) -> Result<Option<Draft>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT entity_id, sequence, operation, snapshot_json, created_at FROM drafts
                 WHERE entity_id = ?1 ORDER BY sequence DESC LIMIT 1",
                [entity_id],
                DraftRow::from_row,
            )
            .optional()
            .map_err(from_rusqlite)?;
        row.map(DraftRow::into_draft).transpose()
    }

    fn drafts_page(
        &self,
        entity_id: &str,
        after_sequence: u64,
        limit: usize,
    ) -> Result<Vec<Draft>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT entity_id, sequence, operation, snapshot_json, created_at FROM drafts
                 WHERE entity_id = ?1 AND sequence > ?2 ORDER BY sequence LIMIT ?3",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(
                rusqlite::params![
                    entity_id,
                    i64::try_from(after_sequence).unwrap_or(i64::MAX),
                    i64::try_from(limit).unwrap_or(i64::MAX),
                ],
                DraftRow::from_row,
            )
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter().map(DraftRow::into_draft).collect()
    }
}

impl EntityPersistence for SqliteRepository {
    fn persist(&self, entity: &Entity) -> Result<()> {
        let mut unit = self.unit()?;
        unit.persist(entity)?;
        Box::new(unit).commit()
    }

    fn has_prior_identity(&self, entity: &Entity) -> Result<bool> {
        let conn = self.lock();
        entity_exists(&conn, entity.id())
    }

    fn load_attributes(&self, entity_id: &str) -> Result<Option<AttributeMap>> {
        let conn = self.lock();
        read_attributes(&conn, entity_id)
    }

    fn load_latest_snapshot(&self, entity_id: &str) -> Result<Option<Snapshot>> {
        Ok(self
            .get_latest(entity_id)?
            .map(|draft| draft.snapshot().clone()))
    }
}

impl DraftRepository for SqliteRepository {
    fn begin(&self) -> Result<Box<dyn UnitOfWork + '_>> {
        Ok(Box::new(self.unit()?))
    }
}

/// An open `BEGIN IMMEDIATE` transaction; rolled back on drop unless committed
struct SqliteUnitOfWork<'r> {
    conn: MutexGuard<'r, Connection>,
    open: bool,
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn has_prior_identity(&self, entity_id: &str) -> Result<bool> {
        entity_exists(&self.conn, entity_id)
    }

    fn load_attributes(&self, entity_id: &str) -> Result<Option<AttributeMap>> {
        read_attributes(&self.conn, entity_id)
    }

    fn persist(&mut self, entity: &Entity) -> Result<()> {
        let attributes_json = serde_json::to_string(entity.attributes())?;
        let now = Utc::now().timestamp_millis();
        self.conn
            .execute(
                "INSERT INTO entities (id, entity_type, attributes_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    entity_type = excluded.entity_type,
                    attributes_json = excluded.attributes_json,
                    updated_at = excluded.updated_at",
                rusqlite::params![entity.id(), entity.entity_type(), attributes_json, now],
            )
            .map_err(|e| from_rusqlite(e).with_op("persist_entity").with_entity_id(entity.id()))?;
        Ok(())
    }

    fn append(
        &mut self,
        entity_id: &str,
        operation: OperationType,
        snapshot: Snapshot,
    ) -> Result<Draft> {
        let append_error =
            |e: rusqlite::Error| from_rusqlite(e).with_op("append_draft").with_entity_id(entity_id);

        let sequence: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(sequence), 0) + 1 FROM drafts WHERE entity_id = ?1",
                [entity_id],
                |row| row.get(0),
            )
            .map_err(append_error)?;
        let created_at = now_millis();
        let snapshot_json = snapshot.to_json()?;

        self.conn
            .execute(
                "INSERT INTO drafts (entity_id, sequence, operation, entity_type, snapshot_json,
                                     snapshot_version, snapshot_digest, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    entity_id,
                    sequence,
                    operation.as_str(),
                    snapshot.entity_type(),
                    snapshot_json,
                    snapshot.version(),
                    snapshot.digest(),
                    created_at.timestamp_millis(),
                ],
            )
            .map_err(append_error)?;

        tracing::debug!(
            component = module_path!(),
            op = "append_draft",
            entity_id = entity_id,
            operation = operation.as_str(),
            sequence = sequence,
        );

        Ok(Draft::new(
            entity_id,
            operation,
            u64::try_from(sequence).unwrap_or(0),
            snapshot,
            created_at,
        ))
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(from_rusqlite)?;
        self.open = false;
        Ok(())
    }
}

impl Drop for SqliteUnitOfWork<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(
                    component = module_path!(),
                    op = "rollback",
                    error = %e,
                );
            }
        }
    }
}

struct DraftRow {
    entity_id: String,
    sequence: i64,
    operation: String,
    snapshot_json: String,
    created_at_ms: i64,
}

impl DraftRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entity_id: row.get(0)?,
            sequence: row.get(1)?,
            operation: row.get(2)?,
            snapshot_json: row.get(3)?,
            created_at_ms: row.get(4)?,
        })
    }

    fn into_draft(self) -> Result<Draft> {
        let operation = OperationType::parse(&self.operation).ok_or_else(|| {
            corrupt_row(
                "read_draft",
                &self.entity_id,
                format!("unknown operation '{}'", self.operation),
            )
        })?;
        let sequence = u64::try_from(self.sequence).map_err(|_| {
            corrupt_row(
                "read_draft",
                &self.entity_id,
                format!("negative sequence {}", self.sequence),
            )
        })?;
        let created_at = Utc
            .timestamp_millis_opt(self.created_at_ms)
            .single()
            .ok_or_else(|| {
                corrupt_row(
                    "read_draft",
                    &self.entity_id,
                    format!("invalid timestamp {}", self.created_at_ms),
                )
            })?;
        let snapshot = Snapshot::from_json(&self.snapshot_json)
            .map_err(|e| e.with_entity_id(self.entity_id.as_str()))?;
        Ok(Draft::new(self.entity_id, operation, sequence, snapshot, created_at))
    }
}

fn entity_exists(conn: &Connection, entity_id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM entities WHERE id = ?1", [entity_id], |_| Ok(()))
        .optional()
        .map_err(from_rusqlite)?;
    Ok(found.is_some())
}

fn read_attributes(conn: &Connection, entity_id: &str) -> Result<Option<AttributeMap>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT attributes_json FROM entities WHERE id = ?1",
            [entity_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;
    json.map(|json| {
        serde_json::from_str::<AttributeMap>(&json)
            .map_err(|e| corrupt_row("load_attributes", entity_id, e))
    })
    .transpose()
}

/// Current time truncated to the millisecond precision stored in `drafts`
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}
