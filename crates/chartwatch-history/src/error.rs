#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("history could not be (de)serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
