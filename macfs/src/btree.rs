//! HFS B-tree leaf walking.
//!
//! The catalog and extents overflow trees live inside files whose extents
//! come from the MDB (plus overflow records for the catalog). Node 0 is
//! the header node; leaves form a chain through `fLink`. Records inside a
//! node are sliced through the reverse-ordered offset table that occupies
//! the last `2 * (numRecords + 1)` bytes.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{FsError, Result};
use crate::hfs::{Extent, HfsFile, Volume};

pub(crate) const NODE_KIND_HEADER: i8 = 1;
pub(crate) const NODE_KIND_LEAF: i8 = -1;

/// The 14-byte descriptor at the start of every node.
pub(crate) struct NodeDescriptor {
    pub f_link: u32,
    pub kind: i8,
    pub num_records: u16,
}

impl NodeDescriptor {
    pub(crate) fn parse(node: &[u8]) -> Result<Self> {
        if node.len() < 14 {
            return Err(FsError::InvalidBTree("node shorter than descriptor".into()));
        }
        let mut cursor = Cursor::new(node);
        let f_link = cursor.read_u32::<BigEndian>()?;
        let _b_link = cursor.read_u32::<BigEndian>()?;
        let kind = cursor.read_i8()?;
        let _height = cursor.read_u8()?;
        let num_records = cursor.read_u16::<BigEndian>()?;
        Ok(NodeDescriptor {
            f_link,
            kind,
            num_records,
        })
    }
}

/// A B-tree held in an HFS file, ready for leaf iteration.
pub(crate) struct BTree<'a> {
    volume: &'a Volume,
    file: &'a HfsFile,
    node_size: u16,
    first_leaf: u32,
}

impl<'a> BTree<'a> {
    /// Bootstrap from the header node: read 512 bytes, learn the real node
    /// size, then re-read at that size.
    pub(crate) fn open(volume: &'a Volume, file: &'a HfsFile) -> Result<Self> {
        let first = volume.read_file(file, 0, 512)?;
        let descriptor = NodeDescriptor::parse(&first)?;
        if descriptor.kind != NODE_KIND_HEADER {
            return Err(FsError::InvalidBTree(format!(
                "expected header node, got kind {}",
                descriptor.kind
            )));
        }

        // Header record follows the descriptor; firstLeafNode at +10,
        // nodeSize at +18.
        let mut cursor = Cursor::new(&first[14..]);
        let _tree_depth = cursor.read_u16::<BigEndian>()?;
        let _root_node = cursor.read_u32::<BigEndian>()?;
        let _leaf_records = cursor.read_u32::<BigEndian>()?;
        let mut first_leaf = cursor.read_u32::<BigEndian>()?;
        let _last_leaf = cursor.read_u32::<BigEndian>()?;
        let node_size = cursor.read_u16::<BigEndian>()?;

        if node_size < 512 {
            return Err(FsError::InvalidBTree(format!(
                "node size {node_size} below minimum"
            )));
        }

        if node_size != 512 {
            let full = volume.read_file(file, 0, node_size as usize)?;
            let descriptor = NodeDescriptor::parse(&full)?;
            if descriptor.kind != NODE_KIND_HEADER {
                return Err(FsError::InvalidBTree(
                    "header node changed kind on re-read".into(),
                ));
            }
            let mut cursor = Cursor::new(&full[24..]);
            first_leaf = cursor.read_u32::<BigEndian>()?;
        }

        Ok(BTree {
            volume,
            file,
            node_size,
            first_leaf,
        })
    }

    /// Walk the leaf chain, handing every record slice to `f`.
    pub(crate) fn for_each_record(
        &self,
        mut f: impl FnMut(&[u8]) -> Result<()>,
    ) -> Result<()> {
        let node_size = self.node_size as usize;
        let mut node_index = self.first_leaf;

        while node_index != 0 {
            let node = self.volume.read_file(
                self.file,
                node_index as u64 * node_size as u64,
                node_size,
            )?;
            let descriptor = NodeDescriptor::parse(&node)?;
            if descriptor.kind != NODE_KIND_LEAF {
                return Err(FsError::InvalidBTree(format!(
                    "expected leaf node, got kind {}",
                    descriptor.kind
                )));
            }

            let count = descriptor.num_records as usize;
            let table = node_size
                .checked_sub(2 * (count + 1))
                .filter(|&table| table >= 14)
                .ok_or_else(|| {
                    FsError::InvalidBTree(format!("offset table for {count} records overflows node"))
                })?;

            let offset_at = |slot: usize| -> u16 {
                u16::from_be_bytes([node[table + 2 * slot], node[table + 2 * slot + 1]])
            };
            for record in 0..count {
                let start = offset_at(record + 1) as usize;
                let end = offset_at(record) as usize;
                if start < 14 || start > end || end > table {
                    return Err(FsError::InvalidBTree(format!(
                        "bad record offsets {start}..{end} in node {node_index}"
                    )));
                }
                f(&node[start..end])?;
            }

            node_index = descriptor.f_link;
        }
        Ok(())
    }
}

/// A record of the extents overflow tree: fixed 20 bytes.
pub(crate) struct ExtentsRecord {
    pub fork_type: u8,
    pub file_id: u32,
    /// File-relative allocation block where this record's extents begin.
    pub start_block: u16,
    pub extents: [Extent; 3],
}

impl ExtentsRecord {
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 20 {
            return Err(FsError::InvalidBTree(format!(
                "extents record of {} bytes",
                data.len()
            )));
        }
        let mut cursor = Cursor::new(data);
        let _key_length = cursor.read_u8()?;
        let fork_type = cursor.read_u8()?;
        let file_id = cursor.read_u32::<BigEndian>()?;
        let start_block = cursor.read_u16::<BigEndian>()?;
        let mut extents = [Extent::default(); 3];
        for extent in &mut extents {
            extent.start = cursor.read_u16::<BigEndian>()?;
            extent.count = cursor.read_u16::<BigEndian>()?;
        }
        Ok(ExtentsRecord {
            fork_type,
            file_id,
            start_block,
            extents,
        })
    }
}
