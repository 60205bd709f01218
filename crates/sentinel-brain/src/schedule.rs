use sentinel_core::error::{Result, SentinelError};
use sentinel_core::types::{now_unix, ScheduledJob};
use sentinel_scheduler::store::JobStore;

use crate::moderation::ModCommand;

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * 1000;
const MS_PER_HOUR: i64 = 60 * 60 * 1000;
const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Parse a `<integer><unit>` timer token into milliseconds. Units are
/// s/m/h/d, case-insensitive. Returns None when the token does not start
/// with digits.
pub fn parse_duration_ms(token: &str) -> Option<i64> {
    let digits: String = token
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    let value: i64 = digits.parse().ok()?;

    let suffix = token[digits.len()..]
        .chars()
        .next()
        .map(|c| c.to_ascii_lowercase());

    let ms = match suffix {
        Some('s') => value * MS_PER_SECOND,
        Some('h') => value * MS_PER_HOUR,
        Some('d') => value * MS_PER_DAY,
        // TODO: a missing or unrecognized suffix silently scales as
        // minutes, same as 'm'. Confirm with the mods whether a bare
        // number should be an error instead.
        _ => value * MS_PER_MINUTE,
    };

    Some(ms)
}

/// The `.schedule` command surface: parse, validate against the
/// allow-list, and read/write the durable job store. The store assigns
/// identifiers; jobs fire through the scheduler runtime, not through
/// this service.
pub struct ScheduleService {
    store: JobStore,
}

impl ScheduleService {
    pub fn new(store: JobStore) -> Self {
        Self { store }
    }

    /// `add <timer> <command> [parameters]`: validate and enqueue.
    /// Nothing is written unless both tokens parse and the command is in
    /// the allow-list.
    pub async fn add(&self, args: &str, moderator: &str) -> Result<ScheduledJob> {
        let args = args.trim();
        let mut tokens = args.split_whitespace();

        let timer = tokens.next().ok_or(SentinelError::MissingTimer)?;
        let duration_ms = parse_duration_ms(timer).ok_or(SentinelError::MissingTimer)?;

        let command = tokens.next().ok_or(SentinelError::MissingCommand)?;
        if ModCommand::parse(command).is_none() {
            return Err(SentinelError::UnsupportedCommand(command.to_string()));
        }

        // Remainder of the input, verbatim
        let rest = args[timer.len()..].trim_start();
        let rest = rest[command.len()..].trim_start();
        let parameters = if rest.is_empty() { None } else { Some(rest) };

        let execute_at = now_unix() + duration_ms / 1000;

        self.store
            .schedule(command, parameters, moderator, execute_at)
            .await
    }

    /// `delete <id>`: read the row first (removal discards its data, and
    /// the audit record needs it), then remove it.
    pub async fn delete(&self, args: &str) -> Result<ScheduledJob> {
        let id = args
            .split_whitespace()
            .next()
            .ok_or_else(|| SentinelError::JobNotFound(String::new()))?;

        let job = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SentinelError::JobNotFound(id.to_string()))?;

        // A false here means the executor won the race in the moment
        // between read and remove; the job is gone either way.
        if !self.store.remove(id).await? {
            return Err(SentinelError::JobNotFound(id.to_string()));
        }

        Ok(job)
    }

    /// `list [command]`: all pending jobs, ascending by execution time.
    pub async fn list(&self, command: Option<&str>) -> Result<Vec<ScheduledJob>> {
        self.store.list(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_units() {
        assert_eq!(parse_duration_ms("30s"), Some(30_000));
        assert_eq!(parse_duration_ms("5m"), Some(300_000));
        assert_eq!(parse_duration_ms("2h"), Some(7_200_000));
        assert_eq!(parse_duration_ms("1d"), Some(86_400_000));
    }

    #[test]
    fn test_duration_units_are_case_insensitive() {
        assert_eq!(parse_duration_ms("30S"), Some(30_000));
        assert_eq!(parse_duration_ms("2H"), Some(7_200_000));
    }

    #[test]
    fn test_bare_number_scales_as_minutes() {
        // Current (surprising) behavior: no suffix falls through to the
        // minute conversion, as does any unrecognized suffix.
        assert_eq!(parse_duration_ms("7"), Some(420_000));
        assert_eq!(parse_duration_ms("7x"), Some(420_000));
    }

    #[test]
    fn test_non_numeric_token_is_rejected() {
        assert_eq!(parse_duration_ms("soon"), None);
        assert_eq!(parse_duration_ms(""), None);
    }

    // libsql reopens a fresh private database on every `:memory:`
    // connection, so a store that opens a new connection per call never
    // sees the table created by `init`. Back each test with its own
    // temp file, where connections share storage as they do in prod.
    fn temp_db_path() -> String {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir()
            .join(format!("sentinel-schedule-test-{}-{}.db", std::process::id(), n));
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
        path.to_string_lossy().into_owned()
    }

    async fn service() -> ScheduleService {
        let db = libsql::Builder::new_local(temp_db_path())
            .build()
            .await
            .unwrap();
        let store = JobStore::new(db);
        store.init().await.unwrap();
        ScheduleService::new(store)
    }

    #[tokio::test]
    async fn test_add_writes_a_job() {
        let svc = service().await;
        let before = now_unix();

        let job = svc
            .add("30m warn 42 cool it with the memes", "mod-1")
            .await
            .unwrap();

        assert_eq!(job.command, "warn");
        assert_eq!(job.parameters.as_deref(), Some("42 cool it with the memes"));
        assert_eq!(job.moderator, "mod-1");
        assert!(job.execute_at >= before + 1800);
        assert!(job.execute_at <= now_unix() + 1800);

        let listed = svc.list(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, job.id);
    }

    #[tokio::test]
    async fn test_add_without_parameters() {
        let svc = service().await;
        let job = svc.add("1h unban 42", "mod-1").await.unwrap();
        assert_eq!(job.parameters, None);
    }

    #[tokio::test]
    async fn test_add_missing_timer() {
        let svc = service().await;
        assert!(matches!(
            svc.add("", "mod-1").await,
            Err(SentinelError::MissingTimer)
        ));
        assert!(matches!(
            svc.add("soon ban 42", "mod-1").await,
            Err(SentinelError::MissingTimer)
        ));
    }

    #[tokio::test]
    async fn test_add_missing_command() {
        let svc = service().await;
        assert!(matches!(
            svc.add("30m", "mod-1").await,
            Err(SentinelError::MissingCommand)
        ));
    }

    #[tokio::test]
    async fn test_add_unsupported_command_writes_nothing() {
        let svc = service().await;
        assert!(matches!(
            svc.add("30m selfdestruct now", "mod-1").await,
            Err(SentinelError::UnsupportedCommand(_))
        ));
        assert!(svc.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_returns_the_removed_job() {
        let svc = service().await;
        let job = svc.add("30m ban 42 spam", "mod-1").await.unwrap();

        let removed = svc.delete(&job.id).await.unwrap();
        assert_eq!(removed.id, job.id);
        assert_eq!(removed.parameters.as_deref(), Some("42 spam"));
        assert!(svc.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id() {
        let svc = service().await;
        assert!(matches!(
            svc.delete("nope").await,
            Err(SentinelError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filter_and_order() {
        let svc = service().await;
        svc.add("3h warn 1", "mod-1").await.unwrap();
        svc.add("1h ban 2", "mod-1").await.unwrap();
        svc.add("2h warn 3", "mod-2").await.unwrap();

        let warns = svc.list(Some("warn")).await.unwrap();
        assert_eq!(warns.len(), 2);
        assert!(warns.iter().all(|j| j.command == "warn"));
        assert!(warns[0].execute_at <= warns[1].execute_at);
    }
}
