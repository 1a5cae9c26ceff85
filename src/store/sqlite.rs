//! SQLite implementation of `EntityStore`.
//!
//! Entities are stored with explicit relational columns and upserted with
//! `ON CONFLICT ... DO UPDATE ... RETURNING`, keyed on each entity's natural
//! identity. The set-once pull request timestamps are written with a
//! conditional `UPDATE ... WHERE <field> IS NULL`, which SQLite executes
//! atomically; the rows-changed count tells the caller whether its write won.
//!
//! # Schema Versioning
//!
//! The database uses SQLite's `user_version` pragma to track schema versions.
//! When the schema changes, increment `SCHEMA_VERSION` and add a migration
//! function in `run_migrations`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{
    CommitUpsert, EntityStore, PrTimestampField, PullRequestUpsert, ReviewUpsert, StoreError,
};
use crate::model::{
    Commit, Contributor, Organization, PrReview, PullRequest, PullRequestState, Repository,
};

/// Current schema version. Increment when making schema changes.
const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed entity store.
///
/// Uses a `Mutex<Connection>` because `rusqlite::Connection` is not `Sync`;
/// each operation runs whole inside one `tokio::task::spawn_blocking`
/// closure while holding the lock, so operations never interleave.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database file at the given path and run any
    /// pending migrations.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| {
            StoreError::storage("open database", format!("{}: {}", path.display(), e))
        })?;
        Self::from_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::storage("open database", e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        // WAL for crash safety and better concurrency. In-memory databases
        // report "memory" here, which is fine; they are ephemeral by design.
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| StoreError::storage("set journal_mode", e.to_string()))?;
        if !journal_mode.eq_ignore_ascii_case("wal") && !journal_mode.eq_ignore_ascii_case("memory")
        {
            return Err(StoreError::storage(
                "set journal_mode",
                format!("expected WAL journal mode, SQLite returned '{journal_mode}'"),
            ));
        }

        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .map_err(|e| StoreError::storage("configure pragmas", e.to_string()))?;

        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|e| StoreError::storage("read schema version", e.to_string()))?;

        if current_version > SCHEMA_VERSION {
            return Err(StoreError::storage(
                "schema version",
                format!(
                    "database schema version {} is newer than supported version {}; \
                     please upgrade the application",
                    current_version, SCHEMA_VERSION
                ),
            ));
        }

        if current_version < SCHEMA_VERSION {
            Self::run_migrations(conn, current_version)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(|e| StoreError::storage("update schema version", e.to_string()))?;
        }

        Ok(())
    }

    fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StoreError> {
        if from_version < 1 {
            Self::migrate_v0_to_v1(conn)?;
        }

        // Future migrations go here.

        Ok(())
    }

    fn migrate_v0_to_v1(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS organizations (
                local_id TEXT PRIMARY KEY,
                github_id INTEGER NOT NULL UNIQUE,
                login TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS repositories (
                local_id TEXT PRIMARY KEY,
                github_id INTEGER NOT NULL UNIQUE,
                organization_id TEXT NOT NULL REFERENCES organizations(local_id),
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contributors (
                local_id TEXT PRIMARY KEY,
                github_id INTEGER UNIQUE,
                login TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_contributors_login
                ON contributors(login);

            CREATE TABLE IF NOT EXISTS pull_requests (
                local_id TEXT PRIMARY KEY,
                github_id INTEGER NOT NULL UNIQUE,
                repository_id TEXT NOT NULL REFERENCES repositories(local_id),
                author_id TEXT NOT NULL REFERENCES contributors(local_id),
                number INTEGER NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                state TEXT NOT NULL CHECK(state IN ('open', 'closed', 'merged')),
                additions INTEGER NOT NULL,
                deletions INTEGER NOT NULL,
                changed_files INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                merged_at TEXT,
                first_review_at TEXT,
                approved_at TEXT,
                UNIQUE (repository_id, number)
            );

            CREATE TABLE IF NOT EXISTS pr_reviews (
                local_id TEXT PRIMARY KEY,
                github_id INTEGER NOT NULL UNIQUE,
                pull_request_id TEXT NOT NULL REFERENCES pull_requests(local_id),
                reviewer_id TEXT NOT NULL REFERENCES contributors(local_id),
                state TEXT NOT NULL,
                submitted_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS commits (
                sha TEXT PRIMARY KEY,
                repository_id TEXT NOT NULL REFERENCES repositories(local_id),
                author_id TEXT REFERENCES contributors(local_id),
                message TEXT NOT NULL,
                committed_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| StoreError::storage("migration v0 -> v1", e.to_string()))?;

        Ok(())
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().expect("mutex poisoned");
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::storage(operation, e.to_string()))?
    }
}

// =============================================================================
// Row decoding helpers
// =============================================================================

fn parse_uuid(value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|_| StoreError::corruption(format!("invalid uuid '{value}'")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::corruption(format!("invalid timestamp '{value}'")))
}

fn parse_opt_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    value.as_deref().map(parse_timestamp).transpose()
}

fn storage_err(operation: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |e| StoreError::storage(operation, e.to_string())
}

fn organization_from_row(row: &Row<'_>) -> rusqlite::Result<(String, u64, String, bool)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_organization(raw: (String, u64, String, bool)) -> Result<Organization, StoreError> {
    Ok(Organization {
        local_id: parse_uuid(&raw.0)?,
        github_id: raw.1,
        login: raw.2,
        is_active: raw.3,
    })
}

fn contributor_from_row(row: &Row<'_>) -> rusqlite::Result<(String, Option<u64>, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode_contributor(raw: (String, Option<u64>, String)) -> Result<Contributor, StoreError> {
    Ok(Contributor {
        local_id: parse_uuid(&raw.0)?,
        github_id: raw.1,
        login: raw.2,
    })
}

/// Intermediate tuple for reading pull request rows.
type PullRequestRaw = (
    String,         // local_id
    u64,            // github_id
    String,         // repository_id
    String,         // author_id
    u64,            // number
    String,         // title
    String,         // url
    String,         // state
    u64,            // additions
    u64,            // deletions
    u64,            // changed_files
    String,         // created_at
    Option<String>, // merged_at
    Option<String>, // first_review_at
    Option<String>, // approved_at
);

const PULL_REQUEST_COLUMNS: &str = "local_id, github_id, repository_id, author_id, number, \
     title, url, state, additions, deletions, changed_files, \
     created_at, merged_at, first_review_at, approved_at";

fn pull_request_from_row(row: &Row<'_>) -> rusqlite::Result<PullRequestRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
        row.get(13)?,
        row.get(14)?,
    ))
}

fn decode_pull_request(raw: PullRequestRaw) -> Result<PullRequest, StoreError> {
    let state = PullRequestState::parse(&raw.7)
        .ok_or_else(|| StoreError::corruption(format!("invalid pull request state '{}'", raw.7)))?;
    Ok(PullRequest {
        local_id: parse_uuid(&raw.0)?,
        github_id: raw.1,
        repository_id: parse_uuid(&raw.2)?,
        author_id: parse_uuid(&raw.3)?,
        number: raw.4,
        title: raw.5,
        url: raw.6,
        state,
        additions: raw.8,
        deletions: raw.9,
        changed_files: raw.10,
        created_at: parse_timestamp(&raw.11)?,
        merged_at: parse_opt_timestamp(raw.12)?,
        first_review_at: parse_opt_timestamp(raw.13)?,
        approved_at: parse_opt_timestamp(raw.14)?,
    })
}

// =============================================================================
// EntityStore trait implementation
// =============================================================================

#[async_trait]
impl EntityStore for SqliteStore {
    async fn upsert_organization(
        &self,
        github_id: u64,
        login: &str,
    ) -> Result<Organization, StoreError> {
        let login = login.to_string();
        self.with_conn("upsert_organization", move |conn| {
            let raw = conn
                .query_row(
                    "INSERT INTO organizations (local_id, github_id, login, is_active)
                     VALUES (?1, ?2, ?3, 1)
                     ON CONFLICT(github_id) DO UPDATE SET login = excluded.login
                     RETURNING local_id, github_id, login, is_active",
                    params![Uuid::new_v4().to_string(), github_id, login],
                    organization_from_row,
                )
                .map_err(storage_err("upsert_organization"))?;
            decode_organization(raw)
        })
        .await
    }

    async fn deactivate_organization(&self, github_id: u64) -> Result<(), StoreError> {
        self.with_conn("deactivate_organization", move |conn| {
            conn.execute(
                "UPDATE organizations SET is_active = 0 WHERE github_id = ?1",
                params![github_id],
            )
            .map_err(storage_err("deactivate_organization"))?;
            Ok(())
        })
        .await
    }

    async fn find_organization(&self, github_id: u64) -> Result<Option<Organization>, StoreError> {
        self.with_conn("find_organization", move |conn| {
            let raw = conn
                .query_row(
                    "SELECT local_id, github_id, login, is_active
                     FROM organizations WHERE github_id = ?1",
                    params![github_id],
                    organization_from_row,
                )
                .optional()
                .map_err(storage_err("find_organization"))?;
            raw.map(decode_organization).transpose()
        })
        .await
    }

    async fn upsert_repository(
        &self,
        github_id: u64,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Repository, StoreError> {
        let name = name.to_string();
        self.with_conn("upsert_repository", move |conn| {
            let raw: (String, u64, String, String) = conn
                .query_row(
                    "INSERT INTO repositories (local_id, github_id, organization_id, name)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(github_id) DO UPDATE SET
                         organization_id = excluded.organization_id,
                         name = excluded.name
                     RETURNING local_id, github_id, organization_id, name",
                    params![
                        Uuid::new_v4().to_string(),
                        github_id,
                        organization_id.to_string(),
                        name
                    ],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .map_err(storage_err("upsert_repository"))?;
            Ok(Repository {
                local_id: parse_uuid(&raw.0)?,
                github_id: raw.1,
                organization_id: parse_uuid(&raw.2)?,
                name: raw.3,
            })
        })
        .await
    }

    async fn delete_repository(&self, github_id: u64) -> Result<bool, StoreError> {
        self.with_conn("delete_repository", move |conn| {
            let rows = conn
                .execute(
                    "DELETE FROM repositories WHERE github_id = ?1",
                    params![github_id],
                )
                .map_err(storage_err("delete_repository"))?;
            Ok(rows > 0)
        })
        .await
    }

    async fn find_repository(&self, github_id: u64) -> Result<Option<Repository>, StoreError> {
        self.with_conn("find_repository", move |conn| {
            let raw: Option<(String, u64, String, String)> = conn
                .query_row(
                    "SELECT local_id, github_id, organization_id, name
                     FROM repositories WHERE github_id = ?1",
                    params![github_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()
                .map_err(storage_err("find_repository"))?;
            raw.map(|raw| {
                Ok(Repository {
                    local_id: parse_uuid(&raw.0)?,
                    github_id: raw.1,
                    organization_id: parse_uuid(&raw.2)?,
                    name: raw.3,
                })
            })
            .transpose()
        })
        .await
    }

    async fn upsert_contributor(
        &self,
        github_id: u64,
        login: &str,
    ) -> Result<Contributor, StoreError> {
        let login = login.to_string();
        self.with_conn("upsert_contributor", move |conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(storage_err("upsert_contributor"))?;

            let updated = tx
                .execute(
                    "UPDATE contributors SET login = ?2 WHERE github_id = ?1",
                    params![github_id, login],
                )
                .map_err(storage_err("upsert_contributor"))?;

            if updated == 0 {
                // Claim a login-only row left behind by commit authorship.
                let claimed = tx
                    .execute(
                        "UPDATE contributors SET github_id = ?1
                         WHERE github_id IS NULL AND login = ?2",
                        params![github_id, login],
                    )
                    .map_err(storage_err("upsert_contributor"))?;

                if claimed == 0 {
                    tx.execute(
                        "INSERT INTO contributors (local_id, github_id, login)
                         VALUES (?1, ?2, ?3)",
                        params![Uuid::new_v4().to_string(), github_id, login],
                    )
                    .map_err(storage_err("upsert_contributor"))?;
                }
            }

            let raw = tx
                .query_row(
                    "SELECT local_id, github_id, login FROM contributors WHERE github_id = ?1",
                    params![github_id],
                    contributor_from_row,
                )
                .map_err(storage_err("upsert_contributor"))?;

            tx.commit().map_err(storage_err("upsert_contributor"))?;
            decode_contributor(raw)
        })
        .await
    }

    async fn upsert_contributor_by_login(&self, login: &str) -> Result<Contributor, StoreError> {
        let login = login.to_string();
        self.with_conn("upsert_contributor_by_login", move |conn| {
            // Prefer a row that already carries the provider identity.
            let existing = conn
                .query_row(
                    "SELECT local_id, github_id, login FROM contributors
                     WHERE login = ?1
                     ORDER BY (github_id IS NOT NULL) DESC
                     LIMIT 1",
                    params![login],
                    contributor_from_row,
                )
                .optional()
                .map_err(storage_err("upsert_contributor_by_login"))?;

            if let Some(raw) = existing {
                return decode_contributor(raw);
            }

            let local_id = Uuid::new_v4();
            conn.execute(
                "INSERT INTO contributors (local_id, github_id, login) VALUES (?1, NULL, ?2)",
                params![local_id.to_string(), login],
            )
            .map_err(storage_err("upsert_contributor_by_login"))?;

            Ok(Contributor {
                local_id,
                github_id: None,
                login,
            })
        })
        .await
    }

    async fn find_contributor_by_login(
        &self,
        login: &str,
    ) -> Result<Option<Contributor>, StoreError> {
        let login = login.to_string();
        self.with_conn("find_contributor_by_login", move |conn| {
            let raw = conn
                .query_row(
                    "SELECT local_id, github_id, login FROM contributors
                     WHERE login = ?1
                     ORDER BY (github_id IS NOT NULL) DESC
                     LIMIT 1",
                    params![login],
                    contributor_from_row,
                )
                .optional()
                .map_err(storage_err("find_contributor_by_login"))?;
            raw.map(decode_contributor).transpose()
        })
        .await
    }

    async fn upsert_pull_request(
        &self,
        upsert: PullRequestUpsert,
    ) -> Result<PullRequest, StoreError> {
        self.with_conn("upsert_pull_request", move |conn| {
            let sql = format!(
                "INSERT INTO pull_requests (local_id, github_id, repository_id, author_id,
                     number, title, url, state, additions, deletions, changed_files,
                     created_at, merged_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(repository_id, number) DO UPDATE SET
                     author_id = excluded.author_id,
                     title = excluded.title,
                     url = excluded.url,
                     state = excluded.state,
                     additions = excluded.additions,
                     deletions = excluded.deletions,
                     changed_files = excluded.changed_files,
                     merged_at = excluded.merged_at
                 RETURNING {PULL_REQUEST_COLUMNS}"
            );
            let raw = conn
                .query_row(
                    &sql,
                    params![
                        Uuid::new_v4().to_string(),
                        upsert.github_id,
                        upsert.repository_id.to_string(),
                        upsert.author_id.to_string(),
                        upsert.number,
                        upsert.title,
                        upsert.url,
                        upsert.state.as_str(),
                        upsert.additions,
                        upsert.deletions,
                        upsert.changed_files,
                        upsert.created_at.to_rfc3339(),
                        upsert.merged_at.map(|ts| ts.to_rfc3339()),
                    ],
                    pull_request_from_row,
                )
                .map_err(storage_err("upsert_pull_request"))?;
            decode_pull_request(raw)
        })
        .await
    }

    async fn find_pull_request(
        &self,
        repository_id: Uuid,
        number: u64,
    ) -> Result<Option<PullRequest>, StoreError> {
        self.with_conn("find_pull_request", move |conn| {
            let sql = format!(
                "SELECT {PULL_REQUEST_COLUMNS} FROM pull_requests
                 WHERE repository_id = ?1 AND number = ?2"
            );
            let raw = conn
                .query_row(
                    &sql,
                    params![repository_id.to_string(), number],
                    pull_request_from_row,
                )
                .optional()
                .map_err(storage_err("find_pull_request"))?;
            raw.map(decode_pull_request).transpose()
        })
        .await
    }

    async fn upsert_review(&self, upsert: ReviewUpsert) -> Result<PrReview, StoreError> {
        self.with_conn("upsert_review", move |conn| {
            let raw: (String, u64, String, String, String, String) = conn
                .query_row(
                    "INSERT INTO pr_reviews (local_id, github_id, pull_request_id,
                         reviewer_id, state, submitted_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(github_id) DO UPDATE SET
                         state = excluded.state,
                         submitted_at = excluded.submitted_at
                     RETURNING local_id, github_id, pull_request_id, reviewer_id,
                         state, submitted_at",
                    params![
                        Uuid::new_v4().to_string(),
                        upsert.github_id,
                        upsert.pull_request_id.to_string(),
                        upsert.reviewer_id.to_string(),
                        upsert.state,
                        upsert.submitted_at.to_rfc3339(),
                    ],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    },
                )
                .map_err(storage_err("upsert_review"))?;
            Ok(PrReview {
                local_id: parse_uuid(&raw.0)?,
                github_id: raw.1,
                pull_request_id: parse_uuid(&raw.2)?,
                reviewer_id: parse_uuid(&raw.3)?,
                state: raw.4,
                submitted_at: parse_timestamp(&raw.5)?,
            })
        })
        .await
    }

    async fn set_pr_timestamp_if_absent(
        &self,
        pull_request_id: Uuid,
        field: PrTimestampField,
        value: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.with_conn("set_pr_timestamp_if_absent", move |conn| {
            // Single conditional UPDATE; SQLite executes it atomically, so
            // two racing writers cannot both observe the field as null.
            let sql = format!(
                "UPDATE pull_requests SET {column} = ?2
                 WHERE local_id = ?1 AND {column} IS NULL",
                column = field.column()
            );
            let rows = conn
                .execute(
                    &sql,
                    params![pull_request_id.to_string(), value.to_rfc3339()],
                )
                .map_err(storage_err("set_pr_timestamp_if_absent"))?;
            Ok(rows > 0)
        })
        .await
    }

    async fn upsert_commit(&self, upsert: CommitUpsert) -> Result<Commit, StoreError> {
        self.with_conn("upsert_commit", move |conn| {
            let raw: (String, String, Option<String>, String, String) = conn
                .query_row(
                    "INSERT INTO commits (sha, repository_id, author_id, message, committed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(sha) DO UPDATE SET
                         repository_id = excluded.repository_id,
                         author_id = excluded.author_id,
                         message = excluded.message,
                         committed_at = excluded.committed_at
                     RETURNING sha, repository_id, author_id, message, committed_at",
                    params![
                        upsert.sha,
                        upsert.repository_id.to_string(),
                        upsert.author_id.map(|id| id.to_string()),
                        upsert.message,
                        upsert.committed_at.to_rfc3339(),
                    ],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                        ))
                    },
                )
                .map_err(storage_err("upsert_commit"))?;
            Ok(Commit {
                sha: raw.0,
                repository_id: parse_uuid(&raw.1)?,
                author_id: raw.2.as_deref().map(parse_uuid).transpose()?,
                message: raw.3,
                committed_at: parse_timestamp(&raw.4)?,
            })
        })
        .await
    }

    async fn find_commit(&self, sha: &str) -> Result<Option<Commit>, StoreError> {
        let sha = sha.to_string();
        self.with_conn("find_commit", move |conn| {
            let raw: Option<(String, String, Option<String>, String, String)> = conn
                .query_row(
                    "SELECT sha, repository_id, author_id, message, committed_at
                     FROM commits WHERE sha = ?1",
                    params![sha],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                        ))
                    },
                )
                .optional()
                .map_err(storage_err("find_commit"))?;
            raw.map(|raw| {
                Ok(Commit {
                    sha: raw.0,
                    repository_id: parse_uuid(&raw.1)?,
                    author_id: raw.2.as_deref().map(parse_uuid).transpose()?,
                    message: raw.3,
                    committed_at: parse_timestamp(&raw.4)?,
                })
            })
            .transpose()
        })
        .await
    }
}
