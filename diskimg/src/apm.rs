//! Apple Partition Map.
//!
//! Block 1 of a partitioned disk holds the first map entry; `pmMapBlkCnt`
//! in that entry says how many blocks the map spans. Every valid entry
//! describes one partition as a start block and block count.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::Result;
use crate::source::DataSource;

/// Entry signature, "PM".
pub const ENTRY_SIGNATURE: u16 = 0x504D;

/// Partition type of the map itself.
const MAP_TYPE: &[u8] = b"Apple_partition_map";

const BLOCK_SIZE: u64 = 512;

/// Expand a partitioned disk into one range source per partition entry.
/// Returns `Ok(None)` when block 1 carries no map signature.
///
/// Entries with a bad signature are skipped, as are partitions extending
/// past the end of the source. The map's own partition is not emitted:
/// it starts one block into the disk, so re-expanding it would find the
/// second map entry at its block 1 and recurse.
pub fn unwrap(source: &DataSource) -> Result<Option<Vec<DataSource>>> {
    if source.size() < 2 * BLOCK_SIZE {
        return Ok(None);
    }

    let first = source.read(BLOCK_SIZE, BLOCK_SIZE as usize)?;
    let mut cursor = Cursor::new(&first[..]);
    if cursor.read_u16::<BigEndian>()? != ENTRY_SIGNATURE {
        return Ok(None);
    }
    let _pad = cursor.read_u16::<BigEndian>()?;
    let map_blocks = cursor.read_u32::<BigEndian>()?;

    log::debug!("Apple Partition Map with {} map blocks", map_blocks);

    let mut partitions = Vec::new();
    for index in 1..=map_blocks as u64 {
        if (index + 1) * BLOCK_SIZE > source.size() {
            break;
        }
        let entry = source.read(index * BLOCK_SIZE, BLOCK_SIZE as usize)?;
        let mut cursor = Cursor::new(&entry[..]);
        if cursor.read_u16::<BigEndian>()? != ENTRY_SIGNATURE {
            continue;
        }
        let _pad = cursor.read_u16::<BigEndian>()?;
        let _map_blocks = cursor.read_u32::<BigEndian>()?;
        let start = cursor.read_u32::<BigEndian>()? as u64 * BLOCK_SIZE;
        let count = cursor.read_u32::<BigEndian>()? as u64 * BLOCK_SIZE;

        let part_type = &entry[0x30..0x50];
        if part_type.starts_with(MAP_TYPE)
            && part_type.get(MAP_TYPE.len()) == Some(&0)
        {
            continue;
        }

        if start + count <= source.size() {
            partitions.push(source.range(start, count)?);
        } else {
            log::warn!(
                "partition entry {} exceeds disk size ({} + {} > {}), skipping",
                index,
                start,
                count,
                source.size()
            );
        }
    }

    Ok(Some(partitions))
}

#[cfg(test)]
pub(crate) fn entry_fixture(
    map_blocks: u32,
    start_block: u32,
    block_count: u32,
    name: &str,
    part_type: &str,
) -> Vec<u8> {
    let mut entry = vec![0u8; BLOCK_SIZE as usize];
    entry[0..2].copy_from_slice(&ENTRY_SIGNATURE.to_be_bytes());
    entry[4..8].copy_from_slice(&map_blocks.to_be_bytes());
    entry[8..12].copy_from_slice(&start_block.to_be_bytes());
    entry[12..16].copy_from_slice(&block_count.to_be_bytes());
    entry[0x10..0x10 + name.len()].copy_from_slice(name.as_bytes());
    entry[0x30..0x30 + part_type.len()].copy_from_slice(part_type.as_bytes());
    entry
}
