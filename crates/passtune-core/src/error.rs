use thiserror::Error;

#[derive(Error, Debug)]
pub enum PassTuneError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Pass Catalog Error: {0}")]
    Catalog(String),

    #[error(
        "Fitness archive '{path}' was built against a different pass catalog \
         (expected fingerprint {expected}, found {found})"
    )]
    ArchiveMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

pub type PtResult<T> = Result<T, PassTuneError>;
