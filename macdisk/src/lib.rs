//! Vintage Macintosh disk image pipeline.
//!
//! Walks the full stack: image file → container expansion (DC42, CD-ROM
//! BIN, Apple Partition Map) → MFS/HFS volume mounts → folder trees whose
//! files expose fork readers and, through [`macrsrc`], parsed resources.

pub mod error;

pub use error::{DiskError, Result};

// Re-export underlying crates
pub use diskimg;
pub use macfs;
pub use macrsrc;

use std::path::{Path, PathBuf};

use diskimg::DataSource;
use macfs::Partition;

/// An opened image file and every filesystem found inside it.
pub struct DiskImage {
    path: PathBuf,
    partitions: Vec<Partition>,
}

impl DiskImage {
    /// Open an image file, unwrap its containers and mount every volume.
    ///
    /// A source that matches no filesystem contributes nothing; a source
    /// whose mount fails is logged and skipped so sibling partitions in
    /// the same container still come up.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = DataSource::open(path)?;
        log::debug!("analyzing disk image {} ({} bytes)", path.display(), source.size());

        let sources = diskimg::expand(source)?;
        log::debug!("expanded to {} data source(s)", sources.len());

        let mut partitions = Vec::new();
        for source in &sources {
            match Partition::detect(source) {
                Ok(Some(partition)) => partitions.push(partition),
                Ok(None) => log::debug!("no filesystem in {}", source.description()),
                Err(error) => {
                    log::warn!("cannot mount {}: {}", source.description(), error)
                }
            }
        }

        Ok(DiskImage {
            path: path.to_path_buf(),
            partitions,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn into_partitions(self) -> Vec<Partition> {
        self.partitions
    }
}
