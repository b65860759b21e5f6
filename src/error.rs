use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Coarse failure class, used by callers to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or timeout before a response arrived.
    Transport,
    /// Non-2xx status, malformed JSON, or a payload that did not match its type.
    Protocol,
    /// Well-formed response carrying a GraphQL `errors` array.
    RemoteApi,
    /// Invalid or missing configuration.
    Config,
    /// Local persistence failure.
    Storage,
    /// Gateway misuse or an internal task failure.
    Internal,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("transport error: {message}")]
    Transport { message: String, timed_out: bool },

    #[error("protocol error: {message}")]
    Protocol { status: Option<u16>, message: String },

    #[error("remote API error: {message}")]
    RemoteApi { message: String, error_count: usize },

    #[error("failed to decode {entity}: {reason}")]
    Decode { entity: &'static str, reason: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("task failed: {0}")]
    Task(String),

    #[error("gateway is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a transport error for a request that exceeded its deadline.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            timed_out: true,
        }
    }

    /// Failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Protocol { .. } | Self::Decode { .. } => ErrorKind::Protocol,
            Self::RemoteApi { .. } => ErrorKind::RemoteApi,
            Self::Config(_) | Self::Url(_) => ErrorKind::Config,
            Self::Json(_) | Self::Io(_) => ErrorKind::Storage,
            Self::Task(_) | Self::Closed => ErrorKind::Internal,
        }
    }

    /// Whether a retry policy may try the same request again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::RemoteApi)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Protocol {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return Self::Protocol {
                status: Some(status.as_u16()),
                message: err.to_string(),
            };
        }
        Self::Transport {
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }
}
