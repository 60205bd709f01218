use std::sync::Arc;

use sentinel_core::config::Config;
use sentinel_core::error::{Result, SentinelError};
use sentinel_llm::openai::{OpenAiEmbedding, OpenAiLlm};
use sentinel_telegram::bot::TelegramBot;
use sentinel_telegram::types::{TelegramMessage, User};
use sentinel_vector::index::VectorIndex;

use crate::audit::{format_utc, AuditEvent, AuditSink, ModLog};
use crate::qa::{QaOutcome, QaPipeline};
use crate::query::{screen, Screened};
use crate::schedule::ScheduleService;

const STATUS_MESSAGE: &str = "Processing... Please stand by.";
const NO_PERMISSION: &str = "You do not have permission to use this command.";
const UNSAFE_REPLY: &str =
    "Providing URLs to the documentation search command is not allowed.";
const PROFANE_REPLY: &str = "Please do not use profane language with this command.";
const AUDIT_DOWN_NOTICE: &str =
    "The command was successful, but no message to the mod log was sent. Please check the channel still exists.";

/// The command surface: long-polls for updates and routes `.chat` and
/// `.schedule` invocations. Everything else in the chat is ignored.
pub struct Bot {
    bot: Arc<TelegramBot>,
    qa: QaPipeline<OpenAiEmbedding, VectorIndex, OpenAiLlm>,
    schedule: ScheduleService,
    mod_log: ModLog,
    config: Config,
}

impl Bot {
    pub fn new(
        bot: Arc<TelegramBot>,
        qa: QaPipeline<OpenAiEmbedding, VectorIndex, OpenAiLlm>,
        schedule: ScheduleService,
        mod_log: ModLog,
        config: Config,
    ) -> Self {
        Self {
            bot,
            qa,
            schedule,
            mod_log,
            config,
        }
    }

    /// The main run loop: long-poll Telegram for updates, handle each
    /// message on its own task.
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let me = self.bot.get_me().await?;
        log!(
            "bot started as @{}",
            me.username.as_deref().unwrap_or("unknown")
        );

        let mut offset: i64 = 0;

        loop {
            let updates = match self.bot.get_updates(offset, 30).await {
                Ok(u) => u,
                Err(e) => {
                    log!(" error polling updates: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates {
                if update.update_id >= offset {
                    offset = update.update_id + 1;
                }

                if let Some(msg) = update.message {
                    let bot = Arc::clone(self);
                    tokio::spawn(async move {
                        if let Err(e) = bot.handle_message(&msg).await {
                            log!(" error handling message: {e}");
                        }
                    });
                }
            }
        }
    }

    /// Route an incoming message. Unrecognized text is not ours to answer.
    async fn handle_message(&self, msg: &TelegramMessage) -> Result<()> {
        let Some(text) = msg.text.as_deref() else {
            return Ok(());
        };
        let text = text.trim();

        let (command, args) = match text.split_once(char::is_whitespace) {
            Some((c, rest)) => (c, rest.trim()),
            None => (text, ""),
        };

        match command {
            ".chat" => self.handle_chat(msg.chat.id, args).await,
            ".schedule" | ".schedulecommand" => self.handle_schedule(msg, args).await,
            _ => Ok(()),
        }
    }

    /// The `.chat` command: screen offline, then run the QA pipeline with
    /// an ephemeral status message around the network phase.
    async fn handle_chat(&self, chat_id: i64, args: &str) -> Result<()> {
        let query = match screen(args) {
            Screened::Empty => {
                return self
                    .bot
                    .send_message(
                        chat_id,
                        &format!(
                            "Community Docs Bot - Documentation\nFind the full documentation here: <{}>",
                            self.config.qa.docs_url
                        ),
                    )
                    .await;
            }
            Screened::Unsafe => {
                log!(" [chat] rejected query containing a URL");
                return self.bot.send_message(chat_id, UNSAFE_REPLY).await;
            }
            Screened::Profane => {
                return self.bot.send_message(chat_id, PROFANE_REPLY).await;
            }
            Screened::Query(q) => q,
        };

        log!(" [chat] query: {query}");

        // The status message is cosmetic: failing to post or delete it
        // never fails the request.
        let status_id = match self.bot.send_message_with_id(chat_id, STATUS_MESSAGE).await {
            Ok(id) => Some(id),
            Err(e) => {
                log!(" [chat] failed to post status message: {e}");
                None
            }
        };
        let _ = self.bot.send_typing(chat_id).await;

        let outcome = self.qa.run(&query).await;

        if let Some(message_id) = status_id {
            if let Err(e) = self.bot.delete_message(chat_id, message_id).await {
                log!(" [chat] failed to delete status message: {e}");
            }
        }

        match outcome {
            QaOutcome::Answer { text, .. } => self.bot.send_message(chat_id, &text).await,
            QaOutcome::NoAnswer { .. } => {
                self.bot
                    .send_message(chat_id, &self.qa.no_answer_line())
                    .await
            }
            QaOutcome::QueryFailed => {
                self.bot
                    .send_message(
                        chat_id,
                        &format!(
                            "The query failed, please check the full documentation here: <{}> and use the regular search functionality.",
                            self.config.qa.docs_url
                        ),
                    )
                    .await
            }
        }
    }

    /// The `.schedule` command: add/delete/list over the job store,
    /// moderators only.
    async fn handle_schedule(&self, msg: &TelegramMessage, args: &str) -> Result<()> {
        let chat_id = msg.chat.id;

        let Some(from) = msg.from.as_ref() else {
            return self.bot.send_message(chat_id, NO_PERMISSION).await;
        };
        if !self.config.telegram.moderator_ids.contains(&from.id) {
            log!(" [schedule] denied user {}", from.id);
            return self.bot.send_message(chat_id, NO_PERMISSION).await;
        }

        let args = args.trim();
        if args.is_empty() || args == "help" {
            return self.bot.send_message(chat_id, &help_text()).await;
        }

        let (sub_command, sub_args) = match args.split_once(char::is_whitespace) {
            Some((c, rest)) => (c, rest.trim()),
            None => (args, ""),
        };

        // Anything that isn't a known subcommand is treated as a list
        // filter, so `.schedule warn` shows the pending warns.
        let (sub_command, sub_args) = match sub_command {
            "add" | "delete" | "list" => (sub_command, sub_args),
            _ => ("list", args),
        };

        match sub_command {
            "add" => {
                let moderator = display_name(from);
                match self.schedule.add(sub_args, &moderator).await {
                    Ok(job) => {
                        log!(" [schedule] added job {} ({})", job.id, job.command);
                        self.record_or_notify(chat_id, AuditEvent::for_job("Add", &job))
                            .await;
                        self.confirm(msg).await;
                        Ok(())
                    }
                    Err(e) => {
                        log!(" [schedule] add failed: {e}");
                        self.bot
                            .send_message(chat_id, &add_error_reply(&e))
                            .await
                    }
                }
            }
            "delete" => match self.schedule.delete(sub_args).await {
                Ok(job) => {
                    log!(" [schedule] deleted job {} ({})", job.id, job.command);
                    self.record_or_notify(chat_id, AuditEvent::for_job("Delete", &job))
                        .await;
                    self.confirm(msg).await;
                    Ok(())
                }
                Err(SentinelError::JobNotFound(id)) => {
                    self.bot
                        .send_message(
                            chat_id,
                            &format!("Scheduled command with '{id}' can not be found."),
                        )
                        .await
                }
                Err(e) => {
                    log!(" [schedule] delete failed: {e}");
                    self.bot
                        .send_message(chat_id, "Failed to delete the scheduled command.")
                        .await
                }
            },
            _ => {
                let filter = sub_args.split_whitespace().next();
                match self.schedule.list(filter).await {
                    Ok(jobs) => self.bot.send_message(chat_id, &render_list(&jobs)).await,
                    Err(e) => {
                        log!(" [schedule] list failed: {e}");
                        self.bot
                            .send_message(chat_id, "Failed to list the scheduled commands.")
                            .await
                    }
                }
            }
        }
    }

    /// Record an audit event; when the mod log is unreachable, downgrade
    /// to a secondary notice instead of failing the committed action.
    async fn record_or_notify(&self, chat_id: i64, event: AuditEvent) {
        if let Err(e) = self.mod_log.record(&event).await {
            log!(" [schedule] mod log unreachable: {e}");
            if let Err(e) = self.bot.send_message(chat_id, AUDIT_DOWN_NOTICE).await {
                log!(" [schedule] failed to send audit notice: {e}");
            }
        }
    }

    /// Best-effort ✅ on the invoking message.
    async fn confirm(&self, msg: &TelegramMessage) {
        if let Err(e) = self
            .bot
            .set_message_reaction(msg.chat.id, msg.message_id, "\u{2705}")
            .await
        {
            log!(" [schedule] failed to react: {e}");
        }
    }
}

fn display_name(user: &User) -> String {
    match user.username.as_deref() {
        Some(name) => format!("@{name}"),
        None => format!("{} ({})", user.first_name, user.id),
    }
}

fn help_text() -> String {
    String::new()
        + "Schedule Commands - Help\n"
        + "Manage the execution of moderation commands at a scheduled time.\n\n"
        + "Timer parameter: in what time to execute the command, from the current moment. Use an s, m, h or d suffix for seconds, minutes, hours or days.\n"
        + "Command parameter: the command to execute, without the leading '.', for instance 'warn'.\n"
        + "Options parameter: the options that command expects.\n\n"
        + ".schedule add <timer> <command> [options] - schedule a command to run after the timer expires.\n"
        + ".schedule delete <ID> - delete a scheduled command by its ID (see list).\n"
        + ".schedule list [command] - list scheduled commands, optionally only those matching a command."
}

fn add_error_reply(e: &SentinelError) -> String {
    match e {
        SentinelError::MissingTimer => {
            "Schedule Command - Add - missing information: you must provide a timer.".to_string()
        }
        SentinelError::MissingCommand => {
            "Schedule Command - Add - missing information: you must provide a command.".to_string()
        }
        SentinelError::UnsupportedCommand(name) => format!(
            "The provided '{name}' command is not a supported command for scheduling."
        ),
        _ => "Failed to add a scheduled command.".to_string(),
    }
}

fn render_list(jobs: &[sentinel_core::types::ScheduledJob]) -> String {
    let mut out = format!(
        "Scheduled Commands - List\n{} scheduled command(s) matching the search.",
        jobs.len()
    );

    for job in jobs {
        out.push_str(&format!(
            "\n\nID: {}\nCommand: {}\nParameters: {}\nExecution time: {}\nModerator: {}",
            job.id,
            job.command,
            job.parameters.as_deref().unwrap_or(""),
            format_utc(job.execute_at),
            job.moderator,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::types::ScheduledJob;

    #[test]
    fn test_add_error_replies() {
        assert!(add_error_reply(&SentinelError::MissingTimer).contains("provide a timer"));
        assert!(add_error_reply(&SentinelError::MissingCommand).contains("provide a command"));
        assert!(
            add_error_reply(&SentinelError::UnsupportedCommand("selfdestruct".to_string()))
                .contains("'selfdestruct'")
        );
        // Infra details never reach the user
        let reply = add_error_reply(&SentinelError::Database("disk io".to_string()));
        assert!(!reply.contains("disk io"));
    }

    #[test]
    fn test_render_list() {
        let jobs = vec![ScheduledJob {
            id: "abc".to_string(),
            command: "warn".to_string(),
            parameters: Some("42 spam".to_string()),
            moderator: "@mod".to_string(),
            execute_at: 0,
            created_at: 0,
        }];

        let text = render_list(&jobs);
        assert!(text.contains("1 scheduled command(s)"));
        assert!(text.contains("ID: abc"));
        assert!(text.contains("Execution time: 1970-01-01 00:00 UTC"));
    }

    #[test]
    fn test_render_empty_list() {
        assert!(render_list(&[]).starts_with("Scheduled Commands - List\n0 scheduled"));
    }
}
