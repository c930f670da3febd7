use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubtranslateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("File not found: {0}")]
    PathNotFound(String),

    #[error("Model '{0}' is not available on the inference endpoint")]
    ModelUnavailable(String),

    #[error("No subtitle entries could be parsed from {0}")]
    ParseFailure(String),

    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Could not decode subtitle file: {0}")]
    Decode(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SubtranslateError {
    /// Process exit code reported by the CLI for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::PathNotFound(_) => 2,
            Self::ModelUnavailable(_) => 3,
            Self::ParseFailure(_) => 4,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubtranslateError>;
