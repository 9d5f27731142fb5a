//! Read-only Macintosh resource fork parser.
//!
//! A resource fork is a 16-byte header, a data area of length-prefixed
//! payloads, and a map holding a type list, per-type reference lists and a
//! name list. All integers are big-endian; counts are stored minus one;
//! data offsets in reference lists are 3 bytes, relative to the data area.
//!
//! The parser reads through a caller-supplied callback so the fork can
//! live anywhere (a buffered fork, a lazy extent-mapped fork, a plain
//! slice) and buffers only the bytes it copies out.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

pub mod error;

pub use error::{Result, RsrcError};

/// Size of the resource fork header.
pub const HEADER_SIZE: u32 = 16;

/// `name_offset` value marking an unnamed resource.
const NO_NAME: u16 = 0xFFFF;

/// A four-character code, used for resource types.
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

/// A typed, identified, optionally named payload from a resource fork.
#[derive(Debug, Clone)]
pub struct Resource {
    type_code: FourCC,
    id: i16,
    name: String,
    data: Arc<[u8]>,
}

impl Resource {
    pub fn type_code(&self) -> FourCC {
        self.type_code
    }

    pub fn id(&self) -> i16 {
        self.id
    }

    /// Resource name, decoded from MacRoman. Empty when unnamed.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    /// Shared payload bytes.
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.type_code == other.type_code && self.id == other.id
    }
}

impl Eq for Resource {}

impl PartialOrd for Resource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Resource {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_code
            .cmp(&other.type_code)
            .then(self.id.cmp(&other.id))
    }
}

struct Header {
    data_offset: u32,
    map_offset: u32,
    data_length: u32,
    map_length: u32,
}

/// Parser over a resource fork of `size` bytes read through `read`.
///
/// The callback receives `(offset, length)` and returns the bytes it
/// could produce; short returns surface as [`RsrcError::ShortRead`].
pub struct RsrcParser<F: Fn(u32, u32) -> Vec<u8>> {
    size: u32,
    read: F,
    header: Option<Header>,
}

impl<'a> RsrcParser<Box<dyn Fn(u32, u32) -> Vec<u8> + 'a>> {
    /// Parse a fork held in a byte slice.
    pub fn from_slice(data: &'a [u8]) -> Self {
        let read: Box<dyn Fn(u32, u32) -> Vec<u8> + 'a> = Box::new(|offset, length| {
            let offset = offset as usize;
            let end = offset.saturating_add(length as usize).min(data.len());
            if offset >= data.len() {
                return Vec::new();
            }
            data[offset..end].to_vec()
        });
        RsrcParser::new(data.len() as u32, read)
    }
}

impl<F: Fn(u32, u32) -> Vec<u8>> RsrcParser<F> {
    /// Validate the header. An invalid header leaves the parser usable
    /// only for [`is_valid`](Self::is_valid); resource enumeration fails.
    pub fn new(size: u32, read: F) -> Self {
        let mut parser = RsrcParser {
            size,
            read,
            header: None,
        };
        parser.header = parser.validate_header();
        parser
    }

    pub fn is_valid(&self) -> bool {
        self.header.is_some()
    }

    fn validate_header(&self) -> Option<Header> {
        if self.size < HEADER_SIZE {
            return None;
        }
        let raw = (self.read)(0, HEADER_SIZE);
        if raw.len() != HEADER_SIZE as usize {
            return None;
        }
        let mut cursor = Cursor::new(&raw[..]);
        let header = Header {
            data_offset: cursor.read_u32::<BigEndian>().ok()?,
            map_offset: cursor.read_u32::<BigEndian>().ok()?,
            data_length: cursor.read_u32::<BigEndian>().ok()?,
            map_length: cursor.read_u32::<BigEndian>().ok()?,
        };

        let size = self.size as u64;
        let data_start = header.data_offset as u64;
        let data_end = data_start + header.data_length as u64;
        let map_start = header.map_offset as u64;
        let map_end = map_start + header.map_length as u64;

        let offsets_sane = data_start >= HEADER_SIZE as u64
            && data_start < size
            && map_start >= HEADER_SIZE as u64
            && map_start < size
            && data_end <= size
            && map_end <= size;
        if !offsets_sane {
            return None;
        }

        // The data and map areas must not overlap.
        let overlap = header.data_length > 0
            && header.map_length > 0
            && data_start < map_end
            && map_start < data_end;
        if overlap {
            return None;
        }

        Some(header)
    }

    fn read_exact(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        let bytes = (self.read)(offset, length);
        if bytes.len() != length as usize {
            return Err(RsrcError::ShortRead {
                offset,
                wanted: length,
                got: bytes.len() as u32,
            });
        }
        Ok(bytes)
    }

    /// Enumerate every resource in the fork, sorted by `(type, id)`.
    pub fn resources(&self) -> Result<Vec<Resource>> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| RsrcError::InvalidFormat("header failed validation".into()))?;

        // Map: 16-byte header copy, 8 reserved bytes, then the two list
        // offsets, both relative to the start of the map.
        let fixed = self.read_exact(header.map_offset + 24, 4)?;
        let mut cursor = Cursor::new(&fixed[..]);
        let type_list_offset = cursor.read_u16::<BigEndian>()? as u32;
        let name_list_offset = cursor.read_u16::<BigEndian>()? as u32;
        let type_list = header.map_offset + type_list_offset;
        let name_list = header.map_offset + name_list_offset;

        let raw = self.read_exact(type_list, 2)?;
        let num_types = u16::from_be_bytes([raw[0], raw[1]]).wrapping_add(1) as u32;

        let mut resources = Vec::new();
        for type_index in 0..num_types {
            let entry = self.read_exact(type_list + 2 + type_index * 8, 8)?;
            let mut cursor = Cursor::new(&entry[..]);
            let type_code = FourCC(cursor.read_u32::<BigEndian>()?);
            let num_resources = cursor.read_u16::<BigEndian>()?.wrapping_add(1) as u32;
            let ref_list_offset = cursor.read_u16::<BigEndian>()? as u32;

            let ref_list = type_list + ref_list_offset;
            for ref_index in 0..num_resources {
                let reference = self.read_exact(ref_list + ref_index * 12, 12)?;
                let mut cursor = Cursor::new(&reference[..]);
                let id = cursor.read_i16::<BigEndian>()?;
                let name_offset = cursor.read_u16::<BigEndian>()?;
                let _attributes = cursor.read_u8()?;
                let data_offset = u32::from_be_bytes([
                    0,
                    reference[5],
                    reference[6],
                    reference[7],
                ]);

                let data = self.read_data(header.data_offset + data_offset)?;
                let name = if name_offset == NO_NAME {
                    String::new()
                } else {
                    self.read_name(name_list + name_offset as u32)?
                };

                resources.push(Resource {
                    type_code,
                    id,
                    name,
                    data,
                });
            }
        }

        resources.sort();
        Ok(resources)
    }

    /// A resource body: big-endian length, then that many payload bytes.
    fn read_data(&self, offset: u32) -> Result<Arc<[u8]>> {
        let raw = self.read_exact(offset, 4)?;
        let length = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let payload = self.read_exact(offset + 4, length)?;
        Ok(payload.into())
    }

    /// A Pascal string from the name list. An empty string and a missing
    /// name read the same.
    fn read_name(&self, offset: u32) -> Result<String> {
        let len = self.read_exact(offset, 1)?[0] as u32;
        if len == 0 {
            return Ok(String::new());
        }
        let raw = self.read_exact(offset + 1, len)?;
        Ok(macroman::decode(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
        buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Two types: `ICN#` 128 (unnamed, 4 bytes) and `STR ` 256 (named
    /// "Hi", 3 bytes). Data at 256, map at 512.
    fn two_type_fork() -> Vec<u8> {
        let mut fork = vec![0u8; 600];
        put(&mut fork, 0, &256u32.to_be_bytes());
        put(&mut fork, 4, &512u32.to_be_bytes());
        put(&mut fork, 8, &15u32.to_be_bytes());
        put(&mut fork, 12, &73u32.to_be_bytes());

        // Data area.
        put(&mut fork, 256, &4u32.to_be_bytes());
        put(&mut fork, 260, &[0xAA, 0xBB, 0xCC, 0xDD]);
        put(&mut fork, 264, &3u32.to_be_bytes());
        put(&mut fork, 268, b"abc");

        // Map: header copy and reserved bytes stay zero.
        put(&mut fork, 512 + 24, &28u16.to_be_bytes()); // type list offset
        put(&mut fork, 512 + 26, &70u16.to_be_bytes()); // name list offset

        // Type list at 540.
        put(&mut fork, 540, &1u16.to_be_bytes()); // two types, minus one
        put(&mut fork, 542, b"ICN#");
        put(&mut fork, 546, &0u16.to_be_bytes());
        put(&mut fork, 548, &18u16.to_be_bytes());
        put(&mut fork, 550, b"STR ");
        put(&mut fork, 554, &0u16.to_be_bytes());
        put(&mut fork, 556, &30u16.to_be_bytes());

        // Reference lists at 558 and 570.
        put(&mut fork, 558, &128i16.to_be_bytes());
        put(&mut fork, 560, &0xFFFFu16.to_be_bytes());
        put(&mut fork, 562, &[0, 0, 0, 0]); // attributes + data offset 0
        put(&mut fork, 570, &256i16.to_be_bytes());
        put(&mut fork, 572, &0u16.to_be_bytes());
        put(&mut fork, 574, &[0, 0, 0, 8]); // attributes + data offset 8

        // Name list at 582.
        put(&mut fork, 582, &[2, b'H', b'i']);
        fork
    }

    #[test]
    fn enumerates_sorted_resources() {
        let fork = two_type_fork();
        let parser = RsrcParser::from_slice(&fork);
        assert!(parser.is_valid());

        let resources = parser.resources().unwrap();
        assert_eq!(resources.len(), 2);

        assert_eq!(resources[0].type_code().to_string(), "ICN#");
        assert_eq!(resources[0].id(), 128);
        assert!(!resources[0].has_name());
        assert_eq!(&resources[0].data()[..], &[0xAA, 0xBB, 0xCC, 0xDD]);

        assert_eq!(resources[1].type_code().to_string(), "STR ");
        assert_eq!(resources[1].id(), 256);
        assert_eq!(resources[1].name(), "Hi");
        assert_eq!(&resources[1].data()[..], b"abc");
    }

    #[test]
    fn resources_sort_by_id_within_a_type() {
        let mut fork = two_type_fork();
        // Swap the ICN# id above the STR id; order must still come out
        // (ICN#, STR ) by type first.
        put(&mut fork, 558, &999i16.to_be_bytes());
        let parser = RsrcParser::from_slice(&fork);
        let resources = parser.resources().unwrap();
        assert_eq!(resources[0].type_code().to_string(), "ICN#");
        assert_eq!(resources[0].id(), 999);
    }

    #[test]
    fn overlapping_data_and_map_invalidate_the_fork() {
        let mut fork = vec![0u8; 400];
        put(&mut fork, 0, &100u32.to_be_bytes()); // data offset
        put(&mut fork, 4, &200u32.to_be_bytes()); // map offset
        put(&mut fork, 8, &200u32.to_be_bytes()); // data length: runs into the map
        put(&mut fork, 12, &50u32.to_be_bytes());

        let parser = RsrcParser::from_slice(&fork);
        assert!(!parser.is_valid());
        assert!(matches!(
            parser.resources(),
            Err(RsrcError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_offsets_outside_the_fork() {
        // Header pointing past the end.
        let mut fork = vec![0u8; 64];
        put(&mut fork, 0, &16u32.to_be_bytes());
        put(&mut fork, 4, &4096u32.to_be_bytes());
        assert!(!RsrcParser::from_slice(&fork).is_valid());

        // Offsets inside the header area.
        let mut fork = vec![0u8; 64];
        put(&mut fork, 0, &8u32.to_be_bytes());
        put(&mut fork, 4, &32u32.to_be_bytes());
        assert!(!RsrcParser::from_slice(&fork).is_valid());

        // Smaller than a header.
        assert!(!RsrcParser::from_slice(&[0u8; 8]).is_valid());
    }

    #[test]
    fn truncated_body_is_a_short_read() {
        let mut fork = two_type_fork();
        // Claim more payload bytes for the STR resource than the fork
        // holds; the callback can only produce what exists.
        put(&mut fork, 264, &400u32.to_be_bytes());
        let parser = RsrcParser::from_slice(&fork);
        assert!(parser.is_valid());
        assert!(matches!(
            parser.resources(),
            Err(RsrcError::ShortRead { .. })
        ));
    }
}
