//! Disk Copy 4.2 floppy image envelope.
//!
//! A DC42 file is an 84-byte header followed by the raw disk data and an
//! optional tag area. The header carries a Pascal image name, the data and
//! tag sizes, checksums, and a format byte.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::Result;
use crate::source::DataSource;

/// Size of the header preceding the disk data.
pub const HEADER_SIZE: u64 = 84;

/// Unwrap a Disk Copy 4.2 image, exposing exactly the disk data that
/// follows the header (tags are ignored). Returns `Ok(None)` when the
/// source does not look like DC42.
pub fn unwrap(source: &DataSource) -> Result<Option<DataSource>> {
    if source.size() < HEADER_SIZE {
        return Ok(None);
    }

    let header = source.read(0, HEADER_SIZE as usize)?;
    let name_len = header[0];
    let mut cursor = Cursor::new(&header[0x40..0x48]);
    let data_size = cursor.read_u32::<BigEndian>()? as u64;
    let tag_size = cursor.read_u32::<BigEndian>()? as u64;
    let format = header[0x50];

    if name_len > 63 {
        return Ok(None);
    }
    if data_size % 512 != 0 {
        return Ok(None);
    }
    if tag_size != 0 && tag_size % 12 != 0 {
        return Ok(None);
    }
    if source.size() != HEADER_SIZE + data_size + tag_size {
        return Ok(None);
    }
    // A zero format byte never occurs in real DC42 images.
    if format == 0 {
        return Ok(None);
    }

    log::debug!(
        "DC42 image: {} data bytes, {} tag bytes",
        data_size,
        tag_size
    );
    Ok(Some(source.range(HEADER_SIZE, data_size)?))
}

#[cfg(test)]
pub(crate) fn wrap_fixture(name: &str, payload: &[u8], tag_size: u32) -> Vec<u8> {
    // Builds a header the unwrapper accepts; checksums are left zero.
    let mut image = vec![0u8; HEADER_SIZE as usize];
    image[0] = name.len() as u8;
    image[1..1 + name.len()].copy_from_slice(name.as_bytes());
    image[0x40..0x44].copy_from_slice(&(payload.len() as u32).to_be_bytes());
    image[0x44..0x48].copy_from_slice(&tag_size.to_be_bytes());
    image[0x50] = 0x02;
    image.extend_from_slice(payload);
    image.extend(std::iter::repeat_n(0u8, tag_size as usize));
    image
}
