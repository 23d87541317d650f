#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("property cell holds {actual}, expected {expected}")]
    PropertyTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("codec engine rejected the stream header")]
    OpenRejected,

    #[error("codec engine module not found ({searched} locations searched)")]
    ModuleNotFound { searched: usize },

    #[error("codec engine not initialized")]
    NotInitialized,

    #[error("codec engine call failed: {0}")]
    Engine(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
