//! HFS catalog record decoding.
//!
//! Every catalog record starts with a variable-length key (key length,
//! reserved byte, parent CNID, Pascal node name) followed by word-aligned
//! padding and a two-byte record type. Folder and file bodies carry the
//! fields the mount needs; thread records are ignored.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{FsError, Result};
use crate::hfs::Extent;
use crate::FourCC;

/// Well-known catalog node ids.
pub(crate) const CNID_ROOT_PARENT: u32 = 1;
pub(crate) const CNID_ROOT_FOLDER: u32 = 2;
pub(crate) const CNID_CATALOG_FILE: u32 = 4;

pub(crate) const RECORD_TYPE_FOLDER: u16 = 0x0100;
pub(crate) const RECORD_TYPE_FILE: u16 = 0x0200;
pub(crate) const RECORD_TYPE_FOLDER_THREAD: u16 = 0x0300;
pub(crate) const RECORD_TYPE_FILE_THREAD: u16 = 0x0400;

pub(crate) struct CatalogKey {
    pub parent_id: u32,
    pub name_raw: Vec<u8>,
}

pub(crate) struct FolderRecord {
    pub folder_id: u32,
}

pub(crate) struct FileRecord {
    pub file_id: u32,
    pub file_type: FourCC,
    pub creator: FourCC,
    pub data_logical_size: u32,
    pub rsrc_logical_size: u32,
    pub data_extents: [Extent; 3],
    pub rsrc_extents: [Extent; 3],
}

pub(crate) enum CatalogBody {
    Folder(FolderRecord),
    File(FileRecord),
    /// Thread records and anything else the mount does not consume.
    Other,
}

/// Split a raw catalog record into its key and body.
pub(crate) fn parse_record(data: &[u8]) -> Result<(CatalogKey, CatalogBody)> {
    if data.len() < 7 {
        return Err(FsError::InvalidBTree("catalog key truncated".into()));
    }

    let key_length = data[0] as usize;
    let parent_id = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);
    let name_len = data[6] as usize;
    if name_len > 31 || 7 + name_len > data.len() {
        return Err(FsError::InvalidBTree(format!(
            "catalog name of {name_len} bytes does not fit the record"
        )));
    }
    let name_raw = data[7..7 + name_len].to_vec();

    // The body follows the key, padded to an even offset.
    let mut body_offset = 1 + key_length;
    if body_offset % 2 == 1 {
        body_offset += 1;
    }
    if body_offset + 2 > data.len() {
        return Err(FsError::InvalidBTree("catalog record body missing".into()));
    }

    let key = CatalogKey {
        parent_id,
        name_raw,
    };
    let body = &data[body_offset..];
    let record_type = u16::from_be_bytes([body[0], body[1]]);

    match record_type {
        RECORD_TYPE_FOLDER => {
            if body.len() < 70 {
                return Err(FsError::InvalidBTree("folder record truncated".into()));
            }
            let folder_id = u32::from_be_bytes([body[6], body[7], body[8], body[9]]);
            Ok((key, CatalogBody::Folder(FolderRecord { folder_id })))
        }
        RECORD_TYPE_FILE => {
            if body.len() < 102 {
                return Err(FsError::InvalidBTree("file record truncated".into()));
            }
            let mut cursor = Cursor::new(body);
            cursor.set_position(4);
            let file_type = FourCC(cursor.read_u32::<BigEndian>()?);
            let creator = FourCC(cursor.read_u32::<BigEndian>()?);
            cursor.set_position(20);
            let file_id = cursor.read_u32::<BigEndian>()?;
            cursor.set_position(26);
            let data_logical_size = cursor.read_u32::<BigEndian>()?;
            cursor.set_position(36);
            let rsrc_logical_size = cursor.read_u32::<BigEndian>()?;
            cursor.set_position(74);
            let data_extents = read_extent_triple(&mut cursor)?;
            let rsrc_extents = read_extent_triple(&mut cursor)?;

            Ok((
                key,
                CatalogBody::File(FileRecord {
                    file_id,
                    file_type,
                    creator,
                    data_logical_size,
                    rsrc_logical_size,
                    data_extents,
                    rsrc_extents,
                }),
            ))
        }
        RECORD_TYPE_FOLDER_THREAD | RECORD_TYPE_FILE_THREAD => Ok((key, CatalogBody::Other)),
        other => {
            log::warn!("unknown catalog record type 0x{other:04X}, ignoring");
            Ok((key, CatalogBody::Other))
        }
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
