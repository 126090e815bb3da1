use thiserror::Error;

/// Main error type for chbench
#[derive(Error, Debug)]
pub enum ChBenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error at line {line}: {message}")]
    Format { line: u64, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChBenchError {
    pub fn format(line: u64, message: impl Into<String>) -> Self {
        ChBenchError::Format {
            line,
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the error category
    pub fn kind(&self) -> &'static str {
        match self {
            ChBenchError::Io(_) => "io",
            ChBenchError::Format { .. } | ChBenchError::Csv(_) => "format",
            ChBenchError::Config(_) => "config",
            ChBenchError::InsufficientData(_) => "insufficient-data",
            ChBenchError::Domain(_) => "domain",
            ChBenchError::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for ChBenchError {
    fn from(error: serde_json::Error) -> Self {
        ChBenchError::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for ChBenchError {
    fn from(error: toml::de::Error) -> Self {
        ChBenchError::Serialization(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChBenchError>;
