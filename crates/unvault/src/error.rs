use std::io;
use std::path::PathBuf;

use unvault_engine::{OperationResult, PropId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input not found: {0}")]
    NotFound(PathBuf),

    #[error("neither extension nor signature matched a known archive format")]
    UnknownFormat,

    #[error("codec engine rejected the stream header")]
    OpenFailed,

    #[error("session is closed")]
    SessionClosed,

    #[error("entry index {0} out of range")]
    InvalidIndex(u32),

    #[error("entry {index} failed to extract: {result:?}")]
    Entry { index: u32, result: OperationResult },

    #[error("codec engine failure")]
    Engine {
        #[source]
        source: unvault_engine::Error,
    },

    #[error("property {prop:?} of entry {index}")]
    Property {
        index: u32,
        prop: PropId,
        #[source]
        source: unvault_engine::Error,
    },

    #[error("failed to create directory {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create output {path}")]
    SinkCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
