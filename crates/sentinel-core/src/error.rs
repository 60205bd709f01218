use std::fmt;

#[derive(Debug)]
pub enum SentinelError {
    /// The query contained a URL token; rejected before any network call.
    UnsafeInput,
    /// The query contained profane language; rejected before any network call.
    ProfaneInput,
    Embedding(String),
    Retrieval(String),
    Generation(String),
    Telegram(String),
    Database(String),
    Config(String),
    Http { status: u16, body: String },
    /// Schedule `add` was missing the duration token.
    MissingTimer,
    /// Schedule `add` was missing the command token.
    MissingCommand,
    /// The named command is not in the schedulable allow-list.
    UnsupportedCommand(String),
    /// A moderation action could not make sense of its stored parameters.
    InvalidParameters(String),
    /// Schedule `delete` found no job with the given identifier.
    JobNotFound(String),
}

impl fmt::Display for SentinelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsafeInput => write!(f, "query contains a URL"),
            Self::ProfaneInput => write!(f, "query contains profane language"),
            Self::Embedding(msg) => write!(f, "embedding error: {msg}"),
            Self::Retrieval(msg) => write!(f, "retrieval error: {msg}"),
            Self::Generation(msg) => write!(f, "generation error: {msg}"),
            Self::Telegram(msg) => write!(f, "telegram error: {msg}"),
            Self::Database(msg) => write!(f, "database error: {msg}"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Http { status, body } => write!(f, "http error ({status}): {body}"),
            Self::MissingTimer => write!(f, "missing timer token"),
            Self::MissingCommand => write!(f, "missing command token"),
            Self::UnsupportedCommand(name) => {
                write!(f, "command '{name}' is not supported for scheduling")
            }
            Self::InvalidParameters(msg) => write!(f, "invalid parameters: {msg}"),
            Self::JobNotFound(id) => write!(f, "scheduled command '{id}' not found"),
        }
    }
}

impl std::error::Error for SentinelError {}

pub type Result<T> = std::result::Result<T, SentinelError>;
