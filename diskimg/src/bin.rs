//! Raw CD-ROM track images (Mode 1, 2352-byte sectors).
//!
//! Each sector is 12 bytes of sync pattern, 4 bytes of header, 2048 bytes
//! of user data and 288 bytes of EDC/ECC. Only the user data survives
//! unwrapping.

use crate::error::Result;
use crate::source::DataSource;

pub const SECTOR_SIZE: u64 = 2352;
pub const SYNC_HEADER_SIZE: u64 = 16;
pub const DATA_SIZE: u64 = 2048;

/// Fixed prefix of every Mode 1 sector.
const SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

/// Unwrap a BIN track image into a stripped source holding only the
/// per-sector user data. Returns `Ok(None)` when the source is not BIN.
pub fn unwrap(source: &DataSource) -> Result<Option<DataSource>> {
    let size = source.size();
    if size == 0 || size % SECTOR_SIZE != 0 {
        return Ok(None);
    }
    if source.read(0, SYNC_PATTERN.len())? != SYNC_PATTERN {
        return Ok(None);
    }

    log::debug!("CD-ROM BIN image: {} sectors", size / SECTOR_SIZE);
    Ok(Some(source.stripped(SECTOR_SIZE, SYNC_HEADER_SIZE, DATA_SIZE)))
}

#[cfg(test)]
pub(crate) fn sector_fixture(payloads: &[&[u8]]) -> Vec<u8> {
    let mut image = Vec::new();
    for payload in payloads {
        assert!(payload.len() <= DATA_SIZE as usize);
        image.extend_from_slice(&SYNC_PATTERN);
        image.extend_from_slice(&[0u8; 4]); // header: address + mode
        image.extend_from_slice(payload);
        image.resize(image.len() + DATA_SIZE as usize - payload.len(), 0);
        image.resize(image.len() + 288, 0); // EDC/ECC
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsup::mem;

    #[test]
    fn unwrap_strips_sector_framing() {
        let image = sector_fixture(&[b"first sector", b"second sector"]);
        let src = mem(&image);
        let data = unwrap(&src).unwrap().expect("should detect BIN");
        assert_eq!(data.size(), 2 * DATA_SIZE);
        assert_eq!(data.read(0, 12).unwrap(), b"first sector");
        assert_eq!(data.read(DATA_SIZE, 13).unwrap(), b"second sector");
    }

    #[test]
    fn per_sector_byte_mapping() {
        let image = sector_fixture(&[&[0xAA; 2048], &[0xBB; 2048]]);
        let src = mem(&image);
        let data = unwrap(&src).unwrap().unwrap();
        for (sector, k) in [(0u64, 0u64), (0, 2047), (1, 0), (1, 1000)] {
            assert_eq!(
                data.read(sector * DATA_SIZE + k, 1).unwrap(),
                src.read(sector * SECTOR_SIZE + SYNC_HEADER_SIZE + k, 1).unwrap()
            );
        }
    }

    #[test]
    fn rejects_non_bin() {
        // Right size, wrong sync pattern.
        assert!(unwrap(&mem(&vec![0u8; SECTOR_SIZE as usize])).unwrap().is_none());

        // Sync pattern, size not a sector multiple.
        let mut image = sector_fixture(&[b"x"]);
        image.pop();
        assert!(unwrap(&mem(&image)).unwrap().is_none());

        assert!(unwrap(&mem(&[])).unwrap().is_none());
    }
}
