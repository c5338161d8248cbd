use teloxide::dispatching::dialogue::InMemStorageError;
use thiserror::Error;

/// Centralised error type shared by both bots.
#[derive(Debug, Error)]
pub enum BotError {
    /// Video conversion failures
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),
    /// Telegram API failures
    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),
    /// File download from Telegram failed
    #[error("Download error: {0}")]
    Download(#[from] teloxide::DownloadError),
    /// Dialogue storage failures
    #[error("Dialogue storage error: {0}")]
    Dialogue(#[from] InMemStorageError),
    /// Database failures
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Schema migration failures
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    /// Filesystem failures
    #[error("Filesystem error: {0}")]
    FileSystem(#[from] std::io::Error),
    /// Malformed data
    #[error("Parse error: {0}")]
    Parse(String),
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
    /// Record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// Transition not allowed from the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// Bad user-supplied parameters
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    /// External command exited with an error
    #[error("Command {command} failed: {stderr}")]
    ExternalCommand { command: String, stderr: String },
    #[error("{0}")]
    General(String),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("path is not valid UTF-8")]
    NonUtf8Path,
    #[error("failed to spawn ffmpeg: {0}")]
    IOError(#[from] std::io::Error),
    #[error("ffmpeg exited with {0} - stderr: {1}")]
    FfmpegFailed(std::process::ExitStatus, String),
    #[error("ffmpeg produced no output at {0}")]
    EmptyOutput(String),
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Parse(format!("JSON parsing error: {}", err))
    }
}

impl From<strum::ParseError> for BotError {
    fn from(err: strum::ParseError) -> Self {
        BotError::Parse(format!("Enum parsing error: {}", err))
    }
}

impl From<url::ParseError> for BotError {
    fn from(err: url::ParseError) -> Self {
        BotError::Parse(format!("URL parsing error: {}", err))
    }
}

impl BotError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    pub fn external_command_error(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::ExternalCommand {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}

/// Result of bot operations
pub type BotResult<T> = Result<T, BotError>;

/// Result for handlers
pub type HandlerResult = BotResult<()>;
