use std::path::PathBuf;

/// Central error type for hlscan.
#[derive(Debug, thiserror::Error)]
pub enum HlError {
    #[error("config error: {message}")]
    Config { message: String },

    #[error("required parameters not in the config: {}", keys.join(", "))]
    MissingKeys { keys: Vec<String> },

    #[error("{key} folder -> {} does not exist", path.display())]
    FolderNotFound { key: String, path: PathBuf },

    #[error("{key} file -> {} does not exist", path.display())]
    FileNotFound { key: String, path: PathBuf },

    #[error("the URL '{url}' is not valid")]
    InvalidUrl { url: String },

    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("duplicate application IDs found: {}", ids.join(", "))]
    DuplicateAppIds { ids: Vec<String> },

    #[error("malformed line {line} in {}: {message}", path.display())]
    MalformedInput {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("scanner error: {message}")]
    Scanner { message: String },

    #[error("archive error: {message}")]
    Archive { message: String },

    #[error("csv error: {0}")]
    Csv(String),

    #[error("credential error: {message}")]
    CredentialError { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}
