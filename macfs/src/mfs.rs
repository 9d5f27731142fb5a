//! MFS volume mounting.
//!
//! MFS is flat: one directory, no subfolders. The Master Directory Block
//! at offset 1024 locates the directory blocks and the allocation area;
//! forks are contiguous runs of allocation blocks, so fork content is read
//! whole at mount time.

use std::io::Cursor;
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt};
use diskimg::DataSource;

use crate::error::{FsError, Result};
use crate::fork::ForkReader;
use crate::pascal_str;
use crate::tree::{Disk, File, Tree};
use crate::FourCC;

pub(crate) const MDB_OFFSET: u64 = 1024;
pub(crate) const SIGNATURE: u16 = 0xD2D7;

/// Fixed part of a directory entry, up to and including the name length.
const ENTRY_FIXED: usize = 51;

/// Entry flag bit 7: entry in use. Clear means end of block.
const FLAG_IN_USE: u8 = 0x80;

struct Mdb {
    name_raw: Vec<u8>,
    dir_start: u16,
    dir_len: u16,
    alloc_block_size: u32,
    alloc_start: u16,
}

impl Mdb {
    fn parse(block: &[u8]) -> Result<Self> {
        if block.len() < 64 {
            return Err(FsError::InvalidVolume {
                fs: "MFS",
                reason: "master directory block truncated".into(),
            });
        }

        let mut cursor = Cursor::new(block);
        let signature = cursor.read_u16::<BigEndian>()?;
        if signature != SIGNATURE {
            return Err(FsError::InvalidVolume {
                fs: "MFS",
                reason: format!("bad signature 0x{signature:04X}"),
            });
        }

        cursor.set_position(14); // drDirSt
        let dir_start = cursor.read_u16::<BigEndian>()?;
        let dir_len = cursor.read_u16::<BigEndian>()?;
        cursor.set_position(20); // drAlBlkSiz
        let alloc_block_size = cursor.read_u32::<BigEndian>()?;
        if alloc_block_size == 0 {
            return Err(FsError::InvalidVolume {
                fs: "MFS",
                reason: "zero allocation block size".into(),
            });
        }
        cursor.set_position(28); // drAlBlSt
        let alloc_start = cursor.read_u16::<BigEndian>()?;

        let name_raw = pascal_str(&block[36..64], 27).to_vec();

        Ok(Mdb {
            name_raw,
            dir_start,
            dir_len,
            alloc_block_size,
            alloc_start,
        })
    }
}

/// A mounted MFS volume.
pub struct MfsPartition {
    name: String,
    tree: Tree,
}

impl MfsPartition {
    /// Mount the volume held by `source`, reading every fork eagerly.
    pub fn mount(source: &DataSource) -> Result<Self> {
        let mdb = Mdb::parse(&source.read(MDB_OFFSET, 512)?)?;
        let name = macroman::decode(&mdb.name_raw);
        log::debug!(
            "mounting MFS volume '{}' (directory at block {}, {} blocks)",
            name,
            mdb.dir_start,
            mdb.dir_len
        );

        let disk = Arc::new(Disk::new(name.clone(), source.description()));
        let mut tree = Tree::new(disk.clone(), &mdb.name_raw);
        let root = tree.root();

        for block_index in 0..mdb.dir_len {
            let block_offset = (mdb.dir_start as u64 + block_index as u64) * 512;
            let block = source.read(block_offset, 512)?;

            let mut offset = 0usize;
            while offset + ENTRY_FIXED <= 512 {
                let entry = &block[offset..];
                if entry[0] & FLAG_IN_USE == 0 {
                    break;
                }

                let name_len = entry[50] as usize;
                let mut entry_size = ENTRY_FIXED + name_len;
                if entry_size % 2 == 1 {
                    entry_size += 1;
                }
                // Entries never straddle a directory block.
                if offset + entry_size > 512 {
                    break;
                }

                if name_len > 0 && name_len <= 63 {
                    let file = Self::parse_entry(source, &mdb, &disk, entry, name_len)?;
                    tree.add_file(root, file)?;
                }

                offset += entry_size;
            }
        }

        log::debug!("MFS volume '{}': {} files", name, tree.file_count());
        Ok(MfsPartition { name, tree })
    }

    fn parse_entry(
        source: &DataSource,
        mdb: &Mdb,
        disk: &Arc<Disk>,
        entry: &[u8],
        name_len: usize,
    ) -> Result<File> {
        let mut cursor = Cursor::new(entry);
        cursor.set_position(2);
        let file_type = FourCC(cursor.read_u32::<BigEndian>()?);
        let creator = FourCC(cursor.read_u32::<BigEndian>()?);
        cursor.set_position(22);
        let data_start = cursor.read_u16::<BigEndian>()?;
        let data_len = cursor.read_u32::<BigEndian>()?;
        cursor.set_position(32);
        let rsrc_start = cursor.read_u16::<BigEndian>()?;
        let rsrc_len = cursor.read_u32::<BigEndian>()?;

        let data_fork = Self::read_fork(source, mdb, data_start, data_len)?;
        let rsrc_fork = Self::read_fork(source, mdb, rsrc_start, rsrc_len)?;

        Ok(File::new(
            disk.clone(),
            &entry[ENTRY_FIXED..ENTRY_FIXED + name_len],
            file_type,
            creator,
            data_len,
            rsrc_len,
            data_fork,
            rsrc_fork,
        ))
    }

    /// Read a fork as one contiguous run. Allocation blocks are numbered
    /// from 2, so fork byte zero lives at
    /// `drAlBlSt * 512 + (start - 2) * drAlBlkSiz`.
    fn read_fork(
        source: &DataSource,
        mdb: &Mdb,
        start_block: u16,
        length: u32,
    ) -> Result<Option<ForkReader>> {
        if length == 0 {
            return Ok(None);
        }
        let block = start_block.saturating_sub(2) as u64;
        let offset = mdb.alloc_start as u64 * 512 + block * mdb.alloc_block_size as u64;
        let content = source.read(offset, length as usize)?;
        Ok(Some(ForkReader::Eager(content)))
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn volume_name(&self) -> &str {
        &self.name
    }
}
