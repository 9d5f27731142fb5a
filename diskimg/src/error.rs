use thiserror::Error;

/// Result type alias for data source operations
pub type Result<T> = std::result::Result<T, ImgError>;

#[derive(Error, Debug)]
pub enum ImgError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("read out of range: offset {offset} + length {length} exceeds size {size}")]
    OutOfRange {
        offset: u64,
        length: u64,
        size: u64,
    },
}
