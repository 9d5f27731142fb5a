//! Fork content access.
//!
//! MFS forks are contiguous and small, so they are buffered whole at mount
//! time. HFS forks are extent-mapped and read on demand through the
//! volume they live on.

use crate::error::Result;
use crate::hfs::LazyFork;

pub enum ForkReader {
    /// Entire fork buffered in memory.
    Eager(Vec<u8>),
    /// Extent-mapped fork computed per read.
    Lazy(LazyFork),
}

impl ForkReader {
    pub fn size(&self) -> u32 {
        match self {
            ForkReader::Eager(bytes) => bytes.len() as u32,
            ForkReader::Lazy(fork) => fork.size(),
        }
    }

    /// Read up to `length` bytes at `offset`, clamped to the fork size.
    /// Reads at or past the end return an empty buffer.
    pub fn read(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        match self {
            ForkReader::Eager(bytes) => {
                let size = bytes.len() as u32;
                if offset >= size {
                    return Ok(Vec::new());
                }
                let end = offset.saturating_add(length).min(size);
                Ok(bytes[offset as usize..end as usize].to_vec())
            }
            ForkReader::Lazy(fork) => fork.read(offset, length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eager_reads_are_clamped() {
        let fork = ForkReader::Eager(vec![1, 2, 3, 4, 5]);
        assert_eq!(fork.size(), 5);
        assert_eq!(fork.read(0, 5).unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(fork.read(3, 10).unwrap(), vec![4, 5]);
        assert_eq!(fork.read(5, 1).unwrap(), Vec::<u8>::new());
        assert_eq!(fork.read(100, 1).unwrap(), Vec::<u8>::new());
        // offset + length saturates instead of wrapping
        assert_eq!(fork.read(1, u32::MAX).unwrap(), vec![2, 3, 4, 5]);
    }
}
