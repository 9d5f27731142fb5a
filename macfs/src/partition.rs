//! Filesystem probing and the partition factory.
//!
//! Exactly two filesystems exist in this universe, so a closed sum stands
//! in for dynamic dispatch. Probes read a fixed prefix and check a
//! signature plus minimal sanity; only a signature match commits to a
//! mount.

use diskimg::DataSource;

use crate::error::Result;
use crate::hfs::{self, HfsPartition};
use crate::mfs::{self, MfsPartition};
use crate::tree::Tree;

/// Minimum source size a probe considers: two 512-byte boot blocks plus
/// the master directory block.
const PROBE_PREFIX: u64 = 1536;

pub enum Partition {
    Hfs(HfsPartition),
    Mfs(MfsPartition),
}

impl Partition {
    /// Probe `source` for HFS, then MFS, mounting the first match.
    /// `Ok(None)` means the source holds neither.
    pub fn detect(source: &DataSource) -> Result<Option<Partition>> {
        if probe_hfs(source)? {
            log::debug!("HFS signature at {}", source.description());
            return Ok(Some(Partition::Hfs(HfsPartition::mount(source)?)));
        }
        if probe_mfs(source)? {
            log::debug!("MFS signature at {}", source.description());
            return Ok(Some(Partition::Mfs(MfsPartition::mount(source)?)));
        }
        Ok(None)
    }

    pub fn tree(&self) -> &Tree {
        match self {
            Partition::Hfs(partition) => partition.tree(),
            Partition::Mfs(partition) => partition.tree(),
        }
    }

    pub fn volume_name(&self) -> &str {
        match self {
            Partition::Hfs(partition) => partition.volume_name(),
            Partition::Mfs(partition) => partition.volume_name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Partition::Hfs(_) => "HFS",
            Partition::Mfs(_) => "MFS",
        }
    }
}

fn probe_hfs(source: &DataSource) -> Result<bool> {
    if source.size() < PROBE_PREFIX {
        return Ok(false);
    }
    let block = source.read(hfs::MDB_OFFSET, 512)?;
    if u16::from_be_bytes([block[0], block[1]]) != hfs::SIGNATURE {
        return Ok(false);
    }
    let alloc_block_size = u32::from_be_bytes([block[20], block[21], block[22], block[23]]);
    Ok(alloc_block_size != 0 && alloc_block_size % 512 == 0)
}

fn probe_mfs(source: &DataSource) -> Result<bool> {
    if source.size() < PROBE_PREFIX {
        return Ok(false);
    }
    let block = source.read(mfs::MDB_OFFSET, 2)?;
    Ok(u16::from_be_bytes([block[0], block[1]]) == mfs::SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsup::mem;

    #[test]
    fn detects_hfs() {
        let source = mem(&crate::hfs::fixtures::standard_image());
        let partition = Partition::detect(&source).unwrap().expect("HFS expected");
        assert_eq!(partition.kind(), "HFS");
        assert_eq!(partition.volume_name(), "Test");
        assert_eq!(partition.tree().file_count(), 2);
    }

    #[test]
    fn detects_mfs() {
        let source = mem(&crate::mfs::fixtures::standard_image());
        let partition = Partition::detect(&source).unwrap().expect("MFS expected");
        assert_eq!(partition.kind(), "MFS");
        assert_eq!(partition.volume_name(), "MacVol");
    }

    #[test]
    fn unknown_sources_probe_as_none() {
        assert!(Partition::detect(&mem(&[0u8; 4096])).unwrap().is_none());
        // Too small for any probe.
        assert!(Partition::detect(&mem(&[0u8; 512])).unwrap().is_none());
    }

    #[test]
    fn hfs_probe_requires_sane_block_size() {
        let mut image = crate::hfs::fixtures::standard_image();
        // Signature intact, allocation block size not a multiple of 512.
        image[1024 + 20..1024 + 24].copy_from_slice(&100u32.to_be_bytes());
        assert!(Partition::detect(&mem(&image)).unwrap().is_none());
    }
}
