use thiserror::Error;

/// Result type alias for filesystem operations
pub type Result<T> = std::result::Result<T, FsError>;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Source(#[from] diskimg::ImgError),

    #[error("invalid {fs} volume: {reason}")]
    InvalidVolume { fs: &'static str, reason: String },

    #[error("invalid B-tree: {0}")]
    InvalidBTree(String),

    #[error("extent continuity error: record declares file block {declared} but {running} blocks precede it")]
    ExtentContinuity { declared: u32, running: u32 },

    #[error("offset {0} beyond the last extent")]
    OutOfRange(u64),

    #[error("'{0}' already has a parent")]
    AlreadyParented(String),

    #[error("attaching '{0}' would create a folder cycle")]
    FolderCycle(String),
}
