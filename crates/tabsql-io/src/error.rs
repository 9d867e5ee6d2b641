use tabsql_core::{EngineError, Position};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("file {path} does not exist")]
    NotFound { path: String },

    #[error("file {path} already exists")]
    AlreadyExists { path: String },

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("row {row} has {actual} field(s), header declares {expected}")]
    RowArityMismatch { row: usize, expected: usize, actual: usize },

    #[error("could not decode {path} as {encoding}")]
    Decode { path: String, encoding: &'static str },
}

impl From<IoError> for EngineError {
    fn from(value: IoError) -> Self {
        match value {
            IoError::NotFound { path } => EngineError::FileNotFound {
                pos: Position::UNKNOWN,
                path,
            },
            IoError::AlreadyExists { path } => EngineError::FileAlreadyExists {
                pos: Position::UNKNOWN,
                path,
            },
            other => EngineError::Io {
                pos: Position::UNKNOWN,
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, IoError>;
