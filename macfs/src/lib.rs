//! Read-only MFS and HFS filesystem parsers for vintage Macintosh volumes.
//!
//! Given a [`diskimg::DataSource`] holding a volume, [`Partition::detect`]
//! probes for HFS (hierarchical, B-tree catalog) and MFS (flat directory)
//! and mounts whichever matches, producing a [`tree::Tree`] of folders and
//! files whose forks can be read through [`fork::ForkReader`] handles.

use std::fmt;

mod btree;
mod catalog;
pub mod error;
pub mod fork;
pub mod hfs;
pub mod mfs;
pub mod partition;
pub mod tree;

pub use error::{FsError, Result};
pub use fork::ForkReader;
pub use hfs::HfsPartition;
pub use mfs::MfsPartition;
pub use partition::Partition;
pub use tree::{visit_folder, Disk, File, FileId, FileVisitor, Folder, FolderId, Tree};

/// A four-character code, used for file types, creators and resource types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FourCC(pub u32);

impl FourCC {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        FourCC(u32::from_be_bytes(bytes))
    }

    pub fn as_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            if (0x20..0x7F).contains(&byte) {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, ".")?;
            }
        }
        Ok(())
    }
}

/// Slice a Pascal string (length byte then bytes) out of a buffer,
/// capping the length at `max`.
pub(crate) fn pascal_str(buf: &[u8], max: usize) -> &[u8] {
    if buf.is_empty() {
        return &[];
    }
    let len = (buf[0] as usize).min(max).min(buf.len() - 1);
    &buf[1..1 + len]
}

#[cfg(test)]
pub(crate) mod testsup {
    use std::io::Write;

    use diskimg::DataSource;

    /// A file-backed source over the given bytes.
    pub(crate) fn mem(bytes: &[u8]) -> DataSource {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(bytes).unwrap();
        DataSource::from_file(file, "mem").unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_display() {
        assert_eq!(FourCC::from_bytes(*b"TEXT").to_string(), "TEXT");
        assert_eq!(FourCC::from_bytes(*b"STR ").to_string(), "STR ");
        assert_eq!(FourCC::from_bytes([0x00, b'A', 0xFF, b'Z']).to_string(), ".A.Z");
    }

    #[test]
    fn fourcc_orders_lexicographically() {
        assert!(FourCC::from_bytes(*b"ICN#") < FourCC::from_bytes(*b"STR "));
    }

    #[test]
    fn pascal_str_caps_length() {
        assert_eq!(pascal_str(&[4, b'T', b'e', b's', b't', 0, 0], 27), b"Test");
        assert_eq!(pascal_str(&[10, b'a', b'b'], 27), b"ab");
        assert_eq!(pascal_str(&[5, b'a', b'b', b'c', b'd', b'e'], 3), b"abc");
        assert_eq!(pascal_str(&[], 27), b"");
    }
}
