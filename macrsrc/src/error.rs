use thiserror::Error;

/// Result type alias for resource fork operations
pub type Result<T> = std::result::Result<T, RsrcError>;

#[derive(Error, Debug)]
pub enum RsrcError {
    #[error("invalid resource fork: {0}")]
    InvalidFormat(String),

    #[error("short read at offset {offset}: wanted {wanted} bytes, got {got}")]
    ShortRead { offset: u32, wanted: u32, got: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
