use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[cfg(test)]
use mockall::automock;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, Transaction};
use tracing::{debug, info, warn};

use crate::version::error::StoreError;
use crate::version::types::{InvalidVersionRecord, VersionRecord};

/// SQLite caps the number of bound parameters per statement
const LOOKUP_CHUNK_SIZE: usize = 500;

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: owning project of invalid versions
    &["ALTER TABLE invalid_versions ADD COLUMN project_id TEXT"],
];

/// Records found by [`VersionStore::lookup`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredVersions {
    pub valid: HashMap<String, VersionRecord>,
    pub invalid: HashMap<String, InvalidVersionRecord>,
}

impl StoredVersions {
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty() && self.invalid.is_empty()
    }
}

/// Persistent cache of resolved versions, partitioned into valid and invalid
///
/// An id is stored in at most one partition. Writes are idempotent; only
/// [`VersionStore::invalidate`] moves an id from valid to invalid.
#[cfg_attr(test, automock)]
pub trait VersionStore: Send + Sync + 'static {
    /// Look up the given ids; ids not stored are absent from both maps
    fn lookup(&self, ids: &HashSet<String>) -> Result<StoredVersions, StoreError>;

    /// Insert or overwrite records within their own partition
    ///
    /// A valid record whose id is stored as invalid is skipped, and so is an
    /// invalid record whose id is stored as valid.
    fn upsert(
        &self,
        valid: &[VersionRecord],
        invalid: &[InvalidVersionRecord],
    ) -> Result<(), StoreError>;

    /// Demote `id` to invalid, keeping the owning project of the valid row
    fn invalidate(&self, id: &str) -> Result<(), StoreError>;

    /// [`VersionStore::upsert`] then [`VersionStore::invalidate`] of every id
    /// in `invalidated`, committed together
    fn apply(
        &self,
        valid: &[VersionRecord],
        invalid: &[InvalidVersionRecord],
        invalidated: &[String],
    ) -> Result<(), StoreError>;
}

pub struct SqliteVersionStore {
    conn: Mutex<Connection>,
}

impl SqliteVersionStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing version store at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // WAL lets concurrent processes read while one writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        info!("Version store initialized successfully");

        Ok(store)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS versions (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                name TEXT NOT NULL,
                version_number TEXT NOT NULL,
                loaders TEXT NOT NULL,
                game_versions TEXT NOT NULL,
                dependencies TEXT NOT NULL,
                version_type TEXT NOT NULL,
                date_published TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_versions_project_id ON versions(project_id)",
            [],
        )?;

        // Base table predates the project_id column, see MIGRATIONS
        conn.execute(
            "CREATE TABLE IF NOT EXISTS invalid_versions (id TEXT PRIMARY KEY)",
            [],
        )?;

        Self::apply_migrations(&conn)?;

        debug!("Database schema created successfully");
        Ok(())
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    match conn.execute(sql, []) {
                        Ok(_) => {}
                        Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                            if msg.contains("duplicate column name") =>
                        {
                            debug!("Column already exists, skipping: {}", sql);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    fn placeholders(count: usize) -> String {
        (1..=count)
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn read_version(row: &Row<'_>) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            id: row.get(0)?,
            project_id: row.get(1)?,
            name: row.get(2)?,
            version_number: row.get(3)?,
            loaders: row.get(4)?,
            game_versions: row.get(5)?,
            dependencies: row.get(6)?,
            version_type: row.get(7)?,
            date_published: row.get(8)?,
        })
    }

    fn upsert_valid(tx: &Transaction<'_>, version: &VersionRecord) -> Result<(), StoreError> {
        let encode = |column: &'static str, values: &[String]| {
            serde_json::to_string(values).map_err(|e| StoreError::CorruptColumn {
                id: version.id.clone(),
                column,
                reason: e.to_string(),
            })
        };

        tx.execute(
            r#"
            INSERT INTO versions (
                id, project_id, name, version_number, loaders,
                game_versions, dependencies, version_type, date_published
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
            WHERE NOT EXISTS (SELECT 1 FROM invalid_versions WHERE id = ?1)
            ON CONFLICT(id) DO UPDATE SET
                project_id = excluded.project_id,
                name = excluded.name,
                version_number = excluded.version_number,
                loaders = excluded.loaders,
                game_versions = excluded.game_versions,
                dependencies = excluded.dependencies,
                version_type = excluded.version_type,
                date_published = excluded.date_published
            "#,
            (
                &version.id,
                &version.project_id,
                &version.name,
                &version.version_number,
                encode("loaders", &version.loaders)?,
                encode("game_versions", &version.game_versions)?,
                encode("dependencies", &version.dependencies)?,
                version.channel.as_str(),
                version.published.to_rfc3339(),
            ),
        )?;

        Ok(())
    }

    fn upsert_invalid(
        tx: &Transaction<'_>,
        version: &InvalidVersionRecord,
    ) -> Result<(), StoreError> {
        tx.execute(
            r#"
            INSERT INTO invalid_versions (id, project_id)
            SELECT ?1, ?2
            WHERE NOT EXISTS (SELECT 1 FROM versions WHERE id = ?1)
            ON CONFLICT(id) DO UPDATE SET
                project_id = COALESCE(excluded.project_id, invalid_versions.project_id)
            "#,
            (&version.id, &version.project_id),
        )?;

        Ok(())
    }

    fn invalidate_in(tx: &Transaction<'_>, id: &str) -> Result<(), StoreError> {
        tx.execute(
            r#"
            INSERT INTO invalid_versions (id, project_id)
            VALUES (?1, (SELECT project_id FROM versions WHERE id = ?1))
            ON CONFLICT(id) DO UPDATE SET
                project_id = COALESCE(excluded.project_id, invalid_versions.project_id)
            "#,
            [id],
        )?;
        tx.execute("DELETE FROM versions WHERE id = ?1", [id])?;

        Ok(())
    }
}

/// Undecoded `versions` row
struct RawRow {
    id: String,
    project_id: String,
    name: String,
    version_number: String,
    loaders: String,
    game_versions: String,
    dependencies: String,
    version_type: String,
    date_published: String,
}

impl RawRow {
    fn decode(self) -> Result<VersionRecord, StoreError> {
        let corrupt = |column: &'static str, reason: String| StoreError::CorruptColumn {
            id: self.id.clone(),
            column,
            reason,
        };
        let list = |column: &'static str, raw: &str| {
            serde_json::from_str::<Vec<String>>(raw).map_err(|e| corrupt(column, e.to_string()))
        };

        let loaders = list("loaders", &self.loaders)?;
        let game_versions = list("game_versions", &self.game_versions)?;
        let dependencies = list("dependencies", &self.dependencies)?;
        let channel = self
            .version_type
            .parse()
            .map_err(|_| corrupt("version_type", format!("unknown channel {:?}", self.version_type)))?;
        let published = DateTime::parse_from_rfc3339(&self.date_published)
            .map_err(|e| corrupt("date_published", e.to_string()))?
            .with_timezone(&Utc);

        Ok(VersionRecord {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            version_number: self.version_number,
            loaders,
            game_versions,
            dependencies,
            channel,
            published,
        })
    }
}

impl VersionStore for SqliteVersionStore {
    fn lookup(&self, ids: &HashSet<String>) -> Result<StoredVersions, StoreError> {
        let mut found = StoredVersions::default();
        if ids.is_empty() {
            return Ok(found);
        }

        let ids: Vec<&String> = ids.iter().collect();
        let conn = self.lock_conn()?;

        for chunk in ids.chunks(LOOKUP_CHUNK_SIZE) {
            let placeholders = Self::placeholders(chunk.len());
            let params = rusqlite::params_from_iter(chunk.iter());

            let mut stmt = conn.prepare(&format!(
                r#"
                SELECT id, project_id, name, version_number, loaders,
                       game_versions, dependencies, version_type, date_published
                FROM versions WHERE id IN ({})
                "#,
                placeholders
            ))?;
            let rows = stmt
                .query_map(params, Self::read_version)?
                .collect::<Result<Vec<_>, _>>()?;
            for row in rows {
                match row.decode() {
                    Ok(version) => {
                        found.valid.insert(version.id.clone(), version);
                    }
                    Err(e) => {
                        // Evicted so the next fetch can store it again
                        warn!("Dropping unreadable cached version: {}", e);
                        if let StoreError::CorruptColumn { id, .. } = e {
                            conn.execute("DELETE FROM versions WHERE id = ?1", [&id])?;
                        }
                    }
                }
            }

            let mut stmt = conn.prepare(&format!(
                "SELECT id, project_id FROM invalid_versions WHERE id IN ({})",
                placeholders
            ))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                    Ok(InvalidVersionRecord {
                        id: row.get(0)?,
                        project_id: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for version in rows {
                found.invalid.insert(version.id.clone(), version);
            }
        }

        debug!(
            "Store lookup of {} ids: {} valid, {} invalid",
            ids.len(),
            found.valid.len(),
            found.invalid.len()
        );
        Ok(found)
    }

    fn upsert(
        &self,
        valid: &[VersionRecord],
        invalid: &[InvalidVersionRecord],
    ) -> Result<(), StoreError> {
        self.apply(valid, invalid, &[])
    }

    fn invalidate(&self, id: &str) -> Result<(), StoreError> {
        self.apply(&[], &[], &[id.to_string()])
    }

    fn apply(
        &self,
        valid: &[VersionRecord],
        invalid: &[InvalidVersionRecord],
        invalidated: &[String],
    ) -> Result<(), StoreError> {
        if valid.is_empty() && invalid.is_empty() && invalidated.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        for version in valid {
            Self::upsert_valid(&tx, version)?;
        }
        for version in invalid {
            Self::upsert_invalid(&tx, version)?;
        }
        for id in invalidated {
            Self::invalidate_in(&tx, id)?;
        }

        tx.commit()?;

        debug!(
            "Saved {} valid and {} invalid versions, invalidated {}",
            valid.len(),
            invalid.len(),
            invalidated.len()
        );
        Ok(())
    }
}
