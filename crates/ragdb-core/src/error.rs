use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported format: {}", describe_extension(.extension))]
    UnsupportedFormat { extension: String },

    #[error("Failed to load '{format}' document: {source:#}")]
    Loader {
        format: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Corrupt index record: {0}")]
    CorruptRecord(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn loader(format: &str, source: impl Into<anyhow::Error>) -> Self {
        Error::Loader { format: format.to_string(), source: source.into() }
    }
}

/// `'.pdf'` for a named extension, `(none)` when the filename had none.
pub fn describe_extension(extension: &str) -> String {
    if extension.is_empty() {
        "(none)".to_string()
    } else {
        format!("'.{extension}'")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
