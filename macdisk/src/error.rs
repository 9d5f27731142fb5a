use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, DiskError>;

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("container error: {0}")]
    Container(#[from] diskimg::ImgError),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] macfs::FsError),

    #[error("resource fork error: {0}")]
    Resource(#[from] macrsrc::RsrcError),
}
