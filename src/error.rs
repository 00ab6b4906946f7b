use std::path::PathBuf;
use thiserror::Error;

/// Main engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot open {}: {source}", path.display())]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            EngineError::FileUnavailable { path, source } => match source.kind() {
                std::io::ErrorKind::NotFound => format!("File not found: {}", path.display()),
                std::io::ErrorKind::PermissionDenied => {
                    format!("Permission denied - cannot read {}", path.display())
                }
                _ => format!("Cannot open {}: {}", path.display(), source),
            },
            EngineError::Container(err) => err.user_message(),
            EngineError::Output(err) => err.user_message(),
            EngineError::Config(err) => err.user_message(),
            EngineError::Io(err) => format!("File system error: {}", err),
        }
    }

    /// Check if this error allows playback to continue
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::FileUnavailable { .. } => false,
            EngineError::Container(_) => true, // playback proceeds under the last known format
            EngineError::Output(OutputError::Stream(_)) => true,
            EngineError::Output(OutputError::NoDevice) => false,
            EngineError::Config(_) => true, // defaults are used instead
            EngineError::Io(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EngineError::FileUnavailable { .. } => ErrorSeverity::Error,
            EngineError::Container(_) => ErrorSeverity::Warning,
            EngineError::Output(OutputError::NoDevice) => ErrorSeverity::Critical,
            EngineError::Output(_) => ErrorSeverity::Error,
            EngineError::Config(_) => ErrorSeverity::Warning,
            EngineError::Io(_) => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Chunked container discovery failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("missing RIFF/WAVE signature")]
    NotRiffWave,

    #[error("chunk header at offset {offset} extends past the buffered window")]
    Truncated { offset: usize },
}

impl ContainerError {
    pub fn user_message(&self) -> String {
        match self {
            ContainerError::NotRiffWave => {
                "File is not a RIFF/WAVE container - playing bytes as raw PCM".to_string()
            }
            ContainerError::Truncated { offset } => format!(
                "Header chunk at byte {} does not fit the read buffer - using previous format",
                offset
            ),
        }
    }
}

/// Audio output device errors
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No output device available")]
    NoDevice,

    #[error("Stream error: {0}")]
    Stream(String),
}

impl OutputError {
    pub fn user_message(&self) -> String {
        match self {
            OutputError::NoDevice => "No audio output device is available".to_string(),
            OutputError::Stream(msg) => format!("Audio output interrupted: {}", msg),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot locate a home directory for the configuration file".to_string()
            }
            ConfigError::IoError(err) => format!("Cannot access configuration file: {}", err),
            ConfigError::DeserializationError(err) => {
                format!("Configuration file is malformed: {}", err)
            }
            ConfigError::SerializationError(err) => {
                format!("Cannot write configuration: {}", err)
            }
            ConfigError::Invalid(msg) => format!("Invalid configuration value: {}", msg),
        }
    }
}
