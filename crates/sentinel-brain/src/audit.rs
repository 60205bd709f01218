use std::sync::Arc;

use sentinel_core::error::Result;
use sentinel_core::types::ScheduledJob;
use sentinel_telegram::bot::TelegramBot;

/// One record for the moderation log: who scheduled what, when it fires,
/// and how the add/delete/execute turned out.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: &'static str,
    pub job_id: String,
    pub moderator: String,
    pub command: String,
    pub parameters: Option<String>,
    pub execute_at: i64,
    /// Extra line for failure details; absent on clean outcomes.
    pub note: Option<String>,
}

impl AuditEvent {
    pub fn for_job(action: &'static str, job: &ScheduledJob) -> Self {
        Self {
            action,
            job_id: job.id.clone(),
            moderator: job.moderator.clone(),
            command: job.command.clone(),
            parameters: job.parameters.clone(),
            execute_at: job.execute_at,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Scheduled Command - {}\nID: {}\nCommand: {}\nParameters: {}\nExecution time: {}\nModerator: {}",
            self.action,
            self.job_id,
            self.command,
            self.parameters.as_deref().unwrap_or(""),
            format_utc(self.execute_at),
            self.moderator,
        );
        if let Some(note) = &self.note {
            out.push('\n');
            out.push_str(note);
        }
        out
    }
}

/// Destination for audit records. Failures are the caller's to downgrade:
/// an unreachable log never rolls back the action it describes.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Posts audit records to the moderation-log chat.
pub struct ModLog {
    bot: Arc<TelegramBot>,
    chat_id: i64,
}

impl ModLog {
    pub fn new(bot: Arc<TelegramBot>, chat_id: i64) -> Self {
        Self { bot, chat_id }
    }
}

impl AuditSink for ModLog {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        self.bot.send_message(self.chat_id, &event.render()).await
    }
}

/// Format a unix timestamp as "YYYY-MM-DD HH:MM UTC".
pub fn format_utc(ts: i64) -> String {
    let days = ts.div_euclid(86400);
    let remainder = ts.rem_euclid(86400);
    let (y, m, d) = unix_days_to_date(days);
    let h = remainder / 3600;
    let min = (remainder % 3600) / 60;
    format!("{y:04}-{m:02}-{d:02} {h:02}:{min:02} UTC")
}

/// Convert a count of days since Unix epoch to (year, month, day).
fn unix_days_to_date(days: i64) -> (i64, i64, i64) {
    // Algorithm adapted from Howard Hinnant's civil_from_days
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64; // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // year of era [0, 399]
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // day of year [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let d = doy - (153 * mp + 2) / 5 + 1; // [1, 31]
    let m = if mp < 10 { mp + 3 } else { mp - 9 }; // [1, 12]
    let y = if m <= 2 { y + 1 } else { y };
    (y, m as i64, d as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_utc_epoch() {
        assert_eq!(format_utc(0), "1970-01-01 00:00 UTC");
    }

    #[test]
    fn test_format_utc_known_date() {
        // 2024-03-01 12:30:00 UTC
        assert_eq!(format_utc(1_709_296_200), "2024-03-01 12:30 UTC");
    }

    #[test]
    fn test_render_includes_all_fields() {
        let job = ScheduledJob {
            id: "abc123".to_string(),
            command: "warn".to_string(),
            parameters: Some("42 spam".to_string()),
            moderator: "@mod".to_string(),
            execute_at: 0,
            created_at: 0,
        };

        let text = AuditEvent::for_job("Add", &job).render();
        assert!(text.starts_with("Scheduled Command - Add"));
        assert!(text.contains("ID: abc123"));
        assert!(text.contains("Command: warn"));
        assert!(text.contains("Parameters: 42 spam"));
        assert!(text.contains("Moderator: @mod"));
    }

    #[test]
    fn test_render_appends_note() {
        let job = ScheduledJob {
            id: "abc123".to_string(),
            command: "slowmode".to_string(),
            parameters: None,
            moderator: "@mod".to_string(),
            execute_at: 0,
            created_at: 0,
        };

        let text = AuditEvent::for_job("Execution", &job)
            .with_note("Failed Execution: command is not supported")
            .render();
        assert!(text.ends_with("Failed Execution: command is not supported"));
    }
}
