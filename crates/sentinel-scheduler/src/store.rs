use libsql::{Connection, Database};
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::types::{new_id, now_unix, ScheduledJob};

fn db_err(e: libsql::Error) -> SentinelError {
    SentinelError::Database(e.to_string())
}

/// Read a nullable TEXT column as Option<String>.
fn get_optional_string(row: &libsql::Row, idx: i32) -> Result<Option<String>> {
    let val = row.get::<libsql::Value>(idx).map_err(db_err)?;
    match val {
        libsql::Value::Null => Ok(None),
        libsql::Value::Text(s) => Ok(Some(s)),
        other => Err(SentinelError::Database(format!(
            "expected text or null at column {idx}, got: {other:?}"
        ))),
    }
}

/// Durable queue of deferred moderation commands, keyed by execution time.
///
/// Rows are immutable once written. Removal happens exactly once per job:
/// either through an explicit delete or through the execution callback,
/// whichever reaches the row first. `remove` reports whether a row was
/// actually deleted so the loser of that race can treat the job as
/// already handled.
pub struct JobStore {
    db: Database,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a fresh database connection.
    fn conn(&self) -> Result<Connection> {
        self.db.connect().map_err(db_err)
    }

    /// Create the scheduled_jobs table.
    pub async fn init(&self) -> Result<()> {
        self.conn()?
            .execute(
                "CREATE TABLE IF NOT EXISTS scheduled_jobs (
                    id TEXT PRIMARY KEY,
                    command TEXT NOT NULL,
                    parameters TEXT,
                    moderator TEXT NOT NULL,
                    execute_at INTEGER NOT NULL,
                    created_at INTEGER NOT NULL
                )",
                (),
            )
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Persist a new job and return it with its store-assigned identifier.
    pub async fn schedule(
        &self,
        command: &str,
        parameters: Option<&str>,
        moderator: &str,
        execute_at: i64,
    ) -> Result<ScheduledJob> {
        let id = new_id();
        let now = now_unix();

        self.conn()?
            .execute(
                "INSERT INTO scheduled_jobs (id, command, parameters, moderator, execute_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    id.clone(),
                    command.to_string(),
                    parameters.map(|s| s.to_string()),
                    moderator.to_string(),
                    execute_at,
                    now
                ],
            )
            .await
            .map_err(db_err)?;

        Ok(ScheduledJob {
            id,
            command: command.to_string(),
            parameters: parameters.map(|s| s.to_string()),
            moderator: moderator.to_string(),
            execute_at,
            created_at: now,
        })
    }

    /// Get a single job by ID. None means the row no longer exists.
    pub async fn get(&self, job_id: &str) -> Result<Option<ScheduledJob>> {
        let mut rows = self
            .conn()?
            .query(
                "SELECT id, command, parameters, moderator, execute_at, created_at FROM scheduled_jobs WHERE id = ?1",
                libsql::params![job_id.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_job(&row)?)),
            None => Ok(None),
        }
    }

    /// List jobs, optionally narrowed to one command name, ordered by
    /// ascending execution time.
    pub async fn list(&self, command: Option<&str>) -> Result<Vec<ScheduledJob>> {
        let conn = self.conn()?;

        let mut rows = if let Some(command) = command {
            conn.query(
                "SELECT id, command, parameters, moderator, execute_at, created_at FROM scheduled_jobs WHERE command = ?1 ORDER BY execute_at ASC",
                libsql::params![command.to_string()],
            )
            .await
            .map_err(db_err)?
        } else {
            conn.query(
                "SELECT id, command, parameters, moderator, execute_at, created_at FROM scheduled_jobs ORDER BY execute_at ASC",
                (),
            )
            .await
            .map_err(db_err)?
        };

        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            jobs.push(row_to_job(&row)?);
        }

        Ok(jobs)
    }

    /// Delete a job row. Returns false when no row matched: the job was
    /// already removed by a concurrent path, which is not an error.
    pub async fn remove(&self, job_id: &str) -> Result<bool> {
        let affected = self
            .conn()?
            .execute(
                "DELETE FROM scheduled_jobs WHERE id = ?1",
                libsql::params![job_id.to_string()],
            )
            .await
            .map_err(db_err)?;

        Ok(affected > 0)
    }

    /// Jobs whose execution time has arrived, ordered by ascending
    /// execution time.
    pub async fn due(&self, now: i64) -> Result<Vec<ScheduledJob>> {
        let mut rows = self
            .conn()?
            .query(
                "SELECT id, command, parameters, moderator, execute_at, created_at FROM scheduled_jobs WHERE execute_at <= ?1 ORDER BY execute_at ASC",
                libsql::params![now],
            )
            .await
            .map_err(db_err)?;

        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            jobs.push(row_to_job(&row)?);
        }

        Ok(jobs)
    }
}

/// Extract a ScheduledJob from a libsql Row. Expects columns in the
/// standard order: id, command, parameters, moderator, execute_at, created_at
fn row_to_job(row: &libsql::Row) -> Result<ScheduledJob> {
    Ok(ScheduledJob {
        id: row.get::<String>(0).map_err(db_err)?,
        command: row.get::<String>(1).map_err(db_err)?,
        parameters: get_optional_string(row, 2)?,
        moderator: row.get::<String>(3).map_err(db_err)?,
        execute_at: row.get::<i64>(4).map_err(db_err)?,
        created_at: row.get::<i64>(5).map_err(db_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // libsql reopens a fresh private database on every `:memory:`
    // connection, so a store that opens a new connection per call never
    // sees the table created by `init`. Back each test with its own
    // temp file, where connections share storage as they do in prod.
    fn temp_db_path() -> String {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir()
            .join(format!("sentinel-store-test-{}-{}.db", std::process::id(), n));
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
        path.to_string_lossy().into_owned()
    }

    async fn memory_store() -> JobStore {
        let db = libsql::Builder::new_local(temp_db_path())
            .build()
            .await
            .unwrap();
        let store = JobStore::new(db);
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_schedule_and_get_roundtrip() {
        let store = memory_store().await;
        let job = store
            .schedule("ban", Some("42 spamming"), "mod-1", now_unix() + 60)
            .await
            .unwrap();

        let found = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(found.command, "ban");
        assert_eq!(found.parameters.as_deref(), Some("42 spamming"));
        assert_eq!(found.moderator, "mod-1");
    }

    #[tokio::test]
    async fn test_list_orders_by_execution_time() {
        let store = memory_store().await;
        let now = now_unix();
        store.schedule("warn", None, "mod-1", now + 300).await.unwrap();
        store.schedule("ban", None, "mod-1", now + 60).await.unwrap();
        store.schedule("warn", None, "mod-2", now + 120).await.unwrap();

        let all = store.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].execute_at <= all[1].execute_at);
        assert!(all[1].execute_at <= all[2].execute_at);
    }

    #[tokio::test]
    async fn test_list_filters_by_command() {
        let store = memory_store().await;
        let now = now_unix();
        store.schedule("warn", None, "mod-1", now + 300).await.unwrap();
        store.schedule("ban", None, "mod-1", now + 60).await.unwrap();
        store.schedule("warn", None, "mod-2", now + 120).await.unwrap();

        let warns = store.list(Some("warn")).await.unwrap();
        assert_eq!(warns.len(), 2);
        assert!(warns.iter().all(|j| j.command == "warn"));
        assert!(warns[0].execute_at <= warns[1].execute_at);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = memory_store().await;
        let job = store
            .schedule("ban", None, "mod-1", now_unix() + 60)
            .await
            .unwrap();

        assert!(store.remove(&job.id).await.unwrap());
        // Second removal finds nothing and reports it without erroring.
        assert!(!store.remove(&job.id).await.unwrap());
        assert!(store.get(&job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_due_excludes_future_jobs() {
        let store = memory_store().await;
        let now = now_unix();
        store.schedule("ban", None, "mod-1", now - 5).await.unwrap();
        store.schedule("warn", None, "mod-1", now + 600).await.unwrap();

        let due = store.due(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].command, "ban");
    }
}
