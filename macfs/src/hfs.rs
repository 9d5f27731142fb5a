//! HFS volume mounting.
//!
//! The Master Directory Block at offset 1024 names the volume and locates
//! two B-tree files: the extents overflow tree and the catalog. Mounting
//! scans the extents tree first (the catalog may need overflow extents),
//! then materializes the folder hierarchy from the catalog in two passes.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt};
use diskimg::DataSource;

use crate::btree::{BTree, ExtentsRecord};
use crate::catalog::{self, CatalogBody};
use crate::error::{FsError, Result};
use crate::fork::ForkReader;
use crate::pascal_str;
use crate::tree::{Disk, File, Tree};

pub(crate) const MDB_OFFSET: u64 = 1024;
pub(crate) const SIGNATURE: u16 = 0x4244;

/// Fork type codes used by the extents overflow tree.
pub const FORK_DATA: u8 = 0x00;
pub const FORK_RSRC: u8 = 0xFF;

/// A contiguous run of allocation blocks belonging to one fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub start: u16,
    pub count: u16,
}

/// Ordered extent list plus logical size for one fork of one file.
#[derive(Debug, Clone, Default)]
pub struct HfsFile {
    extents: Vec<Extent>,
    logical_size: u32,
}

impl HfsFile {
    pub(crate) fn new(logical_size: u32) -> Self {
        HfsFile {
            extents: Vec::new(),
            logical_size,
        }
    }

    pub fn logical_size(&self) -> u32 {
        self.logical_size
    }

    pub fn total_blocks(&self) -> u32 {
        self.extents.iter().map(|e| e.count as u32).sum()
    }

    pub(crate) fn push(&mut self, extent: Extent) {
        self.extents.push(extent);
    }

    /// Append an extent that claims to begin at file block `file_block`.
    /// The claim must match the blocks already present.
    pub(crate) fn push_at(&mut self, file_block: u32, extent: Extent) -> Result<()> {
        let running = self.total_blocks();
        if running != file_block {
            return Err(FsError::ExtentContinuity {
                declared: file_block,
                running,
            });
        }
        self.extents.push(extent);
        Ok(())
    }

    /// Map a byte offset within the file to `(offset in the allocation
    /// area, bytes left in the containing extent)`.
    fn locate(&self, block_size: u32, offset: u64) -> Result<(u64, u64)> {
        let block_size = block_size as u64;
        let mut remaining = offset;
        for extent in &self.extents {
            let extent_bytes = extent.count as u64 * block_size;
            if remaining < extent_bytes {
                return Ok((
                    extent.start as u64 * block_size + remaining,
                    extent_bytes - remaining,
                ));
            }
            remaining -= extent_bytes;
        }
        Err(FsError::OutOfRange(offset))
    }

    /// Byte offset within the allocation area for a byte offset within the
    /// file.
    pub fn allocation_offset(&self, block_size: u32, offset: u64) -> Result<u64> {
        self.locate(block_size, offset).map(|(alloc, _)| alloc)
    }
}

/// Shared internals of a mounted volume: the data source plus the
/// allocation geometry every read goes through.
pub(crate) struct Volume {
    source: DataSource,
    alloc_block_size: u32,
    alloc_start: u16,
}

impl Volume {
    pub(crate) fn block_size(&self) -> u32 {
        self.alloc_block_size
    }

    /// Read from the allocation area. `offset` is in bytes from the start
    /// of the area (`drAlBlSt` 512-byte blocks into the partition).
    pub(crate) fn read_allocation(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        Ok(self
            .source
            .read(self.alloc_start as u64 * 512 + offset, length)?)
    }

    /// Read a span of a file, one underlying read per touched extent so no
    /// read straddles an extent boundary.
    pub(crate) fn read_file(&self, file: &HfsFile, offset: u64, length: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(length);
        let mut pos = offset;
        let mut remaining = length as u64;
        while remaining > 0 {
            let (alloc_offset, left_in_extent) = file.locate(self.alloc_block_size, pos)?;
            let chunk = remaining.min(left_in_extent);
            out.extend_from_slice(&self.read_allocation(alloc_offset, chunk as usize)?);
            pos += chunk;
            remaining -= chunk;
        }
        Ok(out)
    }
}

/// An HFS fork read on demand through its extent run. Holds the volume
/// alive for as long as the reader exists.
pub struct LazyFork {
    volume: Arc<Volume>,
    file: Arc<HfsFile>,
}

impl LazyFork {
    pub(crate) fn new(volume: Arc<Volume>, file: Arc<HfsFile>) -> Self {
        LazyFork { volume, file }
    }

    pub fn size(&self) -> u32 {
        self.file.logical_size()
    }

    pub fn read(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        let size = self.size();
        if offset >= size {
            return Ok(Vec::new());
        }
        let end = offset.saturating_add(length).min(size);
        self.volume
            .read_file(&self.file, offset as u64, (end - offset) as usize)
    }
}

/// Fields of the Master Directory Block the mount needs.
struct Mdb {
    name_raw: Vec<u8>,
    alloc_block_size: u32,
    alloc_start: u16,
    extents_overflow: [Extent; 3],
    catalog: [Extent; 3],
}

impl Mdb {
    fn parse(block: &[u8]) -> Result<Self> {
        if block.len() < 162 {
            return Err(FsError::InvalidVolume {
                fs: "HFS",
                reason: "master directory block truncated".into(),
            });
        }

        let mut cursor = Cursor::new(block);
        let signature = cursor.read_u16::<BigEndian>()?;
        if signature != SIGNATURE {
            return Err(FsError::InvalidVolume {
                fs: "HFS",
                reason: format!("bad signature 0x{signature:04X}"),
            });
        }

        cursor.set_position(20); // drAlBlkSiz
        let alloc_block_size = cursor.read_u32::<BigEndian>()?;
        if alloc_block_size == 0 || alloc_block_size % 512 != 0 {
            return Err(FsError::InvalidVolume {
                fs: "HFS",
                reason: format!("unreasonable allocation block size {alloc_block_size}"),
            });
        }

        cursor.set_position(28); // drAlBlSt
        let alloc_start = cursor.read_u16::<BigEndian>()?;

        let name_raw = pascal_str(&block[36..64], 27).to_vec();

        cursor.set_position(134); // drXTExtRec
        let extents_overflow = read_extent_triple(&mut cursor)?;
        cursor.set_position(150); // drCTExtRec
        let catalog = read_extent_triple(&mut cursor)?;

        Ok(Mdb {
            name_raw,
            alloc_block_size,
            alloc_start,
            extents_overflow,
            catalog,
        })
    }
}

fn read_extent_triple(cursor: &mut Cursor<&[u8]>) -> Result<[Extent; 3]> {
    let mut extents = [Extent::default(); 3];
    for extent in &mut extents {
        extent.start = cursor.read_u16::<BigEndian>()?;
        extent.count = cursor.read_u16::<BigEndian>()?;
    }
    Ok(extents)
}

/// Overflow extents gathered from the extents B-tree, keyed per fork and
/// carrying the file-relative block each extent begins at.
type OverflowMap = HashMap<(u32, u8), Vec<(u32, Extent)>>;

/// A mounted HFS volume.
pub struct HfsPartition {
    volume: Arc<Volume>,
    name: String,
    tree: Tree,
}

impl HfsPartition {
    /// Mount the volume held by `source` and materialize its hierarchy.
    pub fn mount(source: &DataSource) -> Result<Self> {
        let mdb = Mdb::parse(&source.read(MDB_OFFSET, 512)?)?;
        let name = macroman::decode(&mdb.name_raw);
        log::debug!(
            "mounting HFS volume '{}' (allocation block {} bytes, area at block {})",
            name,
            mdb.alloc_block_size,
            mdb.alloc_start
        );

        let volume = Arc::new(Volume {
            source: source.clone(),
            alloc_block_size: mdb.alloc_block_size,
            alloc_start: mdb.alloc_start,
        });

        // Seed the two B-tree files from the MDB. The three extents are
        // always enough for the extents tree itself; the catalog may grow
        // past them and is augmented from the scan below.
        let mut extents_file = HfsFile::new(0);
        for extent in mdb.extents_overflow {
            if extent.count > 0 {
                extents_file.push(extent);
            }
        }
        let mut catalog_file = HfsFile::new(0);
        for extent in mdb.catalog {
            if extent.count > 0 {
                catalog_file.push(extent);
            }
        }

        let mut overflow: OverflowMap = HashMap::new();
        {
            let extents_btree = BTree::open(&volume, &extents_file)?;
            extents_btree.for_each_record(|record| {
                let record = ExtentsRecord::parse(record)?;
                let mut file_block = record.start_block as u32;
                for extent in record.extents {
                    if extent.count == 0 {
                        continue;
                    }
                    overflow
                        .entry((record.file_id, record.fork_type))
                        .or_default()
                        .push((file_block, extent));
                    file_block += extent.count as u32;
                }
                Ok(())
            })?;
        }

        if let Some(records) = overflow.get(&(catalog::CNID_CATALOG_FILE, FORK_DATA)) {
            let mut records = records.clone();
            records.sort_by_key(|&(file_block, _)| file_block);
            for (file_block, extent) in records {
                catalog_file.push_at(file_block, extent)?;
            }
        }

        let disk = Arc::new(Disk::new(name.clone(), source.description()));
        let mut tree = Tree::new(disk.clone(), &mdb.name_raw);
        let mut folders = HashMap::new();
        folders.insert(catalog::CNID_ROOT_FOLDER, tree.root());
        let mut hierarchy: Vec<(u32, u32)> = Vec::new();

        let catalog_btree = BTree::open(&volume, &catalog_file)?;

        // Folder pass: create every folder so files can attach regardless
        // of catalog order.
        catalog_btree.for_each_record(|record| {
            let (key, body) = catalog::parse_record(record)?;
            if key.parent_id == catalog::CNID_ROOT_PARENT {
                return Ok(());
            }
            if let CatalogBody::Folder(folder) = body {
                let id = tree.add_folder(&key.name_raw);
                folders.insert(folder.folder_id, id);
                hierarchy.push((key.parent_id, folder.folder_id));
            }
            Ok(())
        })?;

        // File pass: assemble each fork's extent run and attach the file.
        catalog_btree.for_each_record(|record| {
            let (key, body) = catalog::parse_record(record)?;
            if key.parent_id == catalog::CNID_ROOT_PARENT {
                return Ok(());
            }
            if let CatalogBody::File(file) = body {
                let data_fork = assemble_fork(
                    &volume,
                    &overflow,
                    file.file_id,
                    FORK_DATA,
                    file.data_logical_size,
                    &file.data_extents,
                )?;
                let rsrc_fork = assemble_fork(
                    &volume,
                    &overflow,
                    file.file_id,
                    FORK_RSRC,
                    file.rsrc_logical_size,
                    &file.rsrc_extents,
                )?;

                let entry = File::new(
                    disk.clone(),
                    &key.name_raw,
                    file.file_type,
                    file.creator,
                    file.data_logical_size,
                    file.rsrc_logical_size,
                    data_fork,
                    rsrc_fork,
                );
                match folders.get(&key.parent_id) {
                    Some(&parent) => {
                        tree.add_file(parent, entry)?;
                    }
                    None => log::warn!(
                        "parent folder {} not found for file '{}'",
                        key.parent_id,
                        macroman::decode(&key.name_raw)
                    ),
                }
            }
            Ok(())
        })?;

        // Wire the folder hierarchy now that every folder exists.
        for (parent_id, child_id) in hierarchy {
            match (folders.get(&parent_id), folders.get(&child_id)) {
                (Some(&parent), Some(&child)) => tree.attach_folder(parent, child)?,
                _ => log::warn!(
                    "parent folder {} not found for folder {}",
                    parent_id,
                    child_id
                ),
            }
        }

        Ok(HfsPartition { volume, name, tree })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn volume_name(&self) -> &str {
        &self.name
    }

    pub fn allocation_block_size(&self) -> u32 {
        self.volume.block_size()
    }
}

/// Build the complete extent run for one fork of one catalog file record:
/// the three in-catalog extents first, then overflow records in file-block
/// order under the continuity guard.
fn assemble_fork(
    volume: &Arc<Volume>,
    overflow: &OverflowMap,
    file_id: u32,
    fork_type: u8,
    logical_size: u32,
    catalog_extents: &[Extent; 3],
) -> Result<Option<ForkReader>> {
    if logical_size == 0 {
        return Ok(None);
    }

    let mut run = HfsFile::new(logical_size);
    for extent in catalog_extents {
        if extent.count > 0 {
            run.push(*extent);
        }
    }
    if let Some(records) = overflow.get(&(file_id, fork_type)) {
        let mut records = records.clone();
        records.sort_by_key(|&(file_block, _)| file_block);
        for (file_block, extent) in records {
            run.push_at(file_block, extent)?;
        }
    }

    Ok(Some(ForkReader::Lazy(LazyFork::new(
        volume.clone(),
        Arc::new(run),
    ))))
}

/// A bare volume over `source` with the fixture geometry (512-byte
/// allocation blocks, allocation area at 512-byte block 16).
#[cfg(test)]
pub(crate) fn test_volume(source: DataSource) -> Volume {
    Volume {
        source,
        alloc_block_size: 512,
        alloc_start: 16,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsup::mem;

    #[test]
    fn extent_offsets_are_monotonic_and_bounded() {
        let mut file = HfsFile::new(0);
        file.push(Extent { start: 10, count: 2 });
        file.push(Extent { start: 20, count: 1 });

        assert_eq!(file.allocation_offset(512, 0).unwrap(), 10 * 512);
        assert_eq!(file.allocation_offset(512, 512).unwrap(), 10 * 512 + 512);
        assert_eq!(file.allocation_offset(512, 1024).unwrap(), 20 * 512);
        assert_eq!(file.allocation_offset(512, 1535).unwrap(), 20 * 512 + 511);
        assert!(matches!(
            file.allocation_offset(512, 1536),
            Err(FsError::OutOfRange(1536))
        ));
    }

    #[test]
    fn push_at_guards_continuity() {
        let mut file = HfsFile::new(0);
        file.push(Extent { start: 4, count: 3 });
        file.push_at(3, Extent { start: 9, count: 1 }).unwrap();
        assert!(matches!(
            file.push_at(5, Extent { start: 11, count: 1 }),
            Err(FsError::ExtentContinuity {
                declared: 5,
                running: 4
            })
        ));
    }

    #[test]
    fn mount_builds_hierarchy() {
        let source = mem(&fixtures::standard_image());
        let partition = HfsPartition::mount(&source).unwrap();
        assert_eq!(partition.volume_name(), "Test");
        assert_eq!(partition.allocation_block_size(), 512);

        let tree = partition.tree();
        let root = tree.root();
        assert_eq!(tree.folder(root).name(), "Test");
        assert_eq!(tree.folder(root).files().len(), 1);
        assert_eq!(tree.folder(root).folders().len(), 1);

        let readme = tree.file(tree.folder(root).files()[0]);
        assert_eq!(readme.name(), "Readme");
        assert_eq!(readme.file_type().to_string(), "TEXT");
        assert_eq!(readme.creator().to_string(), "MSWD");
        assert_eq!(readme.data_size(), 14);
        assert_eq!(readme.rsrc_size(), 0);

        let docs = tree.folder(tree.folder(root).folders()[0]);
        assert_eq!(docs.name(), "Docs");
        assert_eq!(docs.files().len(), 1);
        assert_eq!(tree.file(docs.files()[0]).name(), "Big");
    }

    #[test]
    fn small_file_reads_and_clamps() {
        let source = mem(&fixtures::standard_image());
        let partition = HfsPartition::mount(&source).unwrap();
        let tree = partition.tree();
        let readme = tree.file(tree.folder(tree.root()).files()[0]);

        assert_eq!(readme.read_data(0, 14).unwrap(), b"Hello, Readme!");
        assert_eq!(readme.read_data(0, 100).unwrap(), b"Hello, Readme!");
        assert_eq!(readme.read_data(7, 7).unwrap(), b"Readme!");
        assert_eq!(readme.read_data(14, 4).unwrap(), Vec::<u8>::new());
        assert_eq!(readme.read_rsrc(0, 16).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn overflow_extents_read_in_order() {
        let source = mem(&fixtures::standard_image());
        let partition = HfsPartition::mount(&source).unwrap();
        let tree = partition.tree();
        let docs = tree.folder(tree.root()).folders()[0];
        let big = tree.file(tree.folder(docs).files()[0]);

        assert_eq!(big.data_size(), 5120);
        let content = big.read_data(0, 5120).unwrap();
        assert_eq!(content.len(), 5120);
        // Each 512-byte block is tagged with its allocation block number.
        let tags: Vec<u8> = content.chunks(512).map(|chunk| chunk[0]).collect();
        assert_eq!(tags, vec![5, 6, 8, 9, 12, 13, 16, 18, 19, 20]);

        // A read straddling the first extent boundary stitches blocks 6
        // and 8 together.
        let span = big.read_data(2 * 512 - 1, 2).unwrap();
        assert_eq!(span.len(), 2);
        assert_eq!(span[1], 8);
    }

    #[test]
    fn overflow_discontinuity_fails_the_mount() {
        let source = mem(&fixtures::standard_image_with_overflow_start(7));
        assert!(matches!(
            HfsPartition::mount(&source),
            Err(FsError::ExtentContinuity {
                declared: 7,
                running: 6
            })
        ));
    }

    #[test]
    fn bad_signature_is_rejected() {
        let mut image = fixtures::standard_image();
        image[1024] = 0;
        assert!(matches!(
            HfsPartition::mount(&mem(&image)),
            Err(FsError::InvalidVolume { fs: "HFS", .. })
        ));
    }
}
