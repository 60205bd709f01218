use std::sync::Arc;

use sentinel_core::error::{Result, SentinelError};
use sentinel_core::types::now_unix;
use sentinel_telegram::bot::TelegramBot;

use crate::schedule::parse_duration_ms;

const DEFAULT_TIMEOUT_MS: i64 = 60 * 60 * 1000;

/// The moderation primitives a schedulable command can dispatch.
/// Implemented against the community chat; mocked in tests.
pub trait ModerationGateway: Send + Sync {
    fn ban(&self, user_id: i64) -> impl std::future::Future<Output = Result<()>> + Send;
    fn unban(&self, user_id: i64) -> impl std::future::Future<Output = Result<()>> + Send;
    fn mute(&self, user_id: i64, until: i64)
        -> impl std::future::Future<Output = Result<()>> + Send;
    fn unmute(&self, user_id: i64) -> impl std::future::Future<Output = Result<()>> + Send;
    fn warn(&self, user_id: i64, reason: &str)
        -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Gateway bound to the community chat the bot moderates.
pub struct CommunityGateway {
    bot: Arc<TelegramBot>,
    chat_id: i64,
}

impl CommunityGateway {
    pub fn new(bot: Arc<TelegramBot>, chat_id: i64) -> Self {
        Self { bot, chat_id }
    }
}

impl ModerationGateway for CommunityGateway {
    async fn ban(&self, user_id: i64) -> Result<()> {
        self.bot.ban_chat_member(self.chat_id, user_id).await
    }

    async fn unban(&self, user_id: i64) -> Result<()> {
        self.bot.unban_chat_member(self.chat_id, user_id).await
    }

    async fn mute(&self, user_id: i64, until: i64) -> Result<()> {
        self.bot
            .restrict_chat_member(self.chat_id, user_id, false, until)
            .await
    }

    async fn unmute(&self, user_id: i64) -> Result<()> {
        self.bot
            .restrict_chat_member(self.chat_id, user_id, true, 0)
            .await
    }

    async fn warn(&self, user_id: i64, reason: &str) -> Result<()> {
        self.bot
            .send_message(
                self.chat_id,
                &format!("\u{26a0} Warning for user {user_id}: {reason}"),
            )
            .await
    }
}

/// The closed allow-list of commands that may be scheduled. Adding a
/// command means adding a variant here; there is no dynamic dispatch by
/// name anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModCommand {
    Ban,
    Unban,
    Timeout,
    Untimeout,
    Warn,
}

impl ModCommand {
    pub const SUPPORTED: [ModCommand; 5] = [
        ModCommand::Ban,
        ModCommand::Unban,
        ModCommand::Timeout,
        ModCommand::Untimeout,
        ModCommand::Warn,
    ];

    /// Resolve a stored command name, case-insensitively. None means the
    /// name is not schedulable.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "ban" => Some(Self::Ban),
            "unban" => Some(Self::Unban),
            "timeout" => Some(Self::Timeout),
            "untimeout" => Some(Self::Untimeout),
            "warn" => Some(Self::Warn),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Unban => "unban",
            Self::Timeout => "timeout",
            Self::Untimeout => "untimeout",
            Self::Warn => "warn",
        }
    }

    /// Dispatch the action with its stored parameter string.
    pub async fn execute<G: ModerationGateway>(
        self,
        gateway: &G,
        parameters: Option<&str>,
    ) -> Result<()> {
        let params = parameters.unwrap_or("");
        let (user_id, rest) = parse_target(params)?;

        match self {
            Self::Ban => gateway.ban(user_id).await,
            Self::Unban => gateway.unban(user_id).await,
            Self::Timeout => {
                // Optional duration right after the user id; 1h when absent
                let duration_ms = rest
                    .split_whitespace()
                    .next()
                    .and_then(parse_duration_ms)
                    .unwrap_or(DEFAULT_TIMEOUT_MS);
                let until = now_unix() + duration_ms / 1000;
                gateway.mute(user_id, until).await
            }
            Self::Untimeout => gateway.unmute(user_id).await,
            Self::Warn => {
                let reason = if rest.is_empty() {
                    "no reason given"
                } else {
                    rest
                };
                gateway.warn(user_id, reason).await
            }
        }
    }
}

/// Split a parameter string into the target user id and the remainder.
fn parse_target(params: &str) -> Result<(i64, &str)> {
    let params = params.trim();
    let token = params
        .split_whitespace()
        .next()
        .ok_or_else(|| SentinelError::InvalidParameters("missing target user id".to_string()))?;

    let user_id: i64 = token.parse().map_err(|_| {
        SentinelError::InvalidParameters(format!("'{token}' is not a user id"))
    })?;

    let rest = params[token.len()..].trim_start();
    Ok((user_id, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ModCommand::parse("Ban"), Some(ModCommand::Ban));
        assert_eq!(ModCommand::parse("WARN"), Some(ModCommand::Warn));
        assert_eq!(ModCommand::parse("slowmode"), None);
    }

    #[test]
    fn test_names_roundtrip() {
        for cmd in ModCommand::SUPPORTED {
            assert_eq!(ModCommand::parse(cmd.name()), Some(cmd));
        }
    }

    #[test]
    fn test_parse_target() {
        let (id, rest) = parse_target("42 posting spam links").unwrap();
        assert_eq!(id, 42);
        assert_eq!(rest, "posting spam links");

        let (id, rest) = parse_target("  99  ").unwrap();
        assert_eq!(id, 99);
        assert_eq!(rest, "");
    }

    #[test]
    fn test_parse_target_rejects_garbage() {
        assert!(parse_target("").is_err());
        assert!(parse_target("bob spam").is_err());
    }
}
