//! Random-access byte windows over disk images.
//!
//! A [`DataSource`] is a cheaply clonable handle to one of three backings:
//! a regular file, a sub-range of another source, or a periodic "stripped"
//! window (used to peel the sync/ECC framing off CD-ROM sectors). Handles
//! share their backing, so container layers compose as a DAG rooted at a
//! file.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{ImgError, Result};

#[derive(Clone)]
pub struct DataSource {
    inner: Arc<Inner>,
}

enum Inner {
    File {
        file: Mutex<fs::File>,
        size: u64,
        description: String,
    },
    Range {
        parent: DataSource,
        offset: u64,
        size: u64,
    },
    Stripped {
        parent: DataSource,
        sector_size: u64,
        skip: u64,
        data: u64,
        size: u64,
    },
}

impl DataSource {
    /// Open a regular file read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;
        Self::from_file(file, path.display().to_string())
    }

    /// Wrap an already-open file. The handle's read position is irrelevant;
    /// every read seeks to an absolute offset.
    pub fn from_file(file: fs::File, description: impl Into<String>) -> Result<Self> {
        let size = file.metadata()?.len();
        Ok(DataSource {
            inner: Arc::new(Inner::File {
                file: Mutex::new(file),
                size,
                description: description.into(),
            }),
        })
    }

    /// A sub-window of this source. The window must lie entirely within the
    /// parent.
    pub fn range(&self, offset: u64, size: u64) -> Result<Self> {
        let parent_size = self.size();
        if offset.checked_add(size).is_none_or(|end| end > parent_size) {
            return Err(ImgError::OutOfRange {
                offset,
                length: size,
                size: parent_size,
            });
        }
        Ok(DataSource {
            inner: Arc::new(Inner::Range {
                parent: self.clone(),
                offset,
                size,
            }),
        })
    }

    /// A periodic window: `data` payload bytes out of every `sector_size`
    /// bytes, starting `skip` bytes into each sector. A trailing partial
    /// sector contributes whatever lies beyond `skip`.
    pub fn stripped(&self, sector_size: u64, skip: u64, data: u64) -> Self {
        let parent_size = self.size();
        let mut size = (parent_size / sector_size) * data;
        let tail = parent_size % sector_size;
        if tail > skip {
            size += (tail - skip).min(data);
        }
        DataSource {
            inner: Arc::new(Inner::Stripped {
                parent: self.clone(),
                sector_size,
                skip,
                data,
                size,
            }),
        }
    }

    /// Exact size of this window in bytes.
    pub fn size(&self) -> u64 {
        match &*self.inner {
            Inner::File { size, .. } => *size,
            Inner::Range { size, .. } => *size,
            Inner::Stripped { size, .. } => *size,
        }
    }

    /// Human-readable provenance, for diagnostics only.
    pub fn description(&self) -> String {
        match &*self.inner {
            Inner::File { description, .. } => description.clone(),
            Inner::Range { parent, offset, size } => {
                format!("{} [{}..+{}]", parent.description(), offset, size)
            }
            Inner::Stripped {
                parent,
                sector_size,
                skip,
                data,
                ..
            } => format!(
                "{} [sector={} skip={} data={}]",
                parent.description(),
                sector_size,
                skip,
                data
            ),
        }
    }

    /// Read exactly `length` bytes at `offset`.
    pub fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let size = self.size();
        if offset.checked_add(length as u64).is_none_or(|end| end > size) {
            return Err(ImgError::OutOfRange {
                offset,
                length: length as u64,
                size,
            });
        }

        match &*self.inner {
            Inner::File { file, .. } => {
                let mut buf = vec![0u8; length];
                let mut file = file.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut buf)?;
                Ok(buf)
            }
            Inner::Range { parent, offset: base, .. } => parent.read(base + offset, length),
            Inner::Stripped {
                parent,
                sector_size,
                skip,
                data,
                ..
            } => {
                // A logical span may cross sector boundaries; issue one
                // parent read per touched sector.
                let mut out = Vec::with_capacity(length);
                let mut pos = offset;
                let mut remaining = length as u64;
                while remaining > 0 {
                    let sector = pos / data;
                    let in_sector = pos % data;
                    let chunk = (data - in_sector).min(remaining);
                    let parent_offset = sector * sector_size + skip + in_sector;
                    out.extend_from_slice(&parent.read(parent_offset, chunk as usize)?);
                    pos += chunk;
                    remaining -= chunk;
                }
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsup::mem;

    #[test]
    fn file_read_exact_length() {
        let src = mem(&[0u8, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(src.size(), 8);
        assert_eq!(src.read(2, 3).unwrap(), vec![2, 3, 4]);
        assert_eq!(src.read(0, 8).unwrap().len(), 8);
        assert_eq!(src.read(8, 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn file_read_out_of_range() {
        let src = mem(&[0u8; 8]);
        assert!(matches!(
            src.read(4, 5),
            Err(ImgError::OutOfRange { offset: 4, length: 5, size: 8 })
        ));
        assert!(src.read(9, 0).is_err());
    }

    #[test]
    fn range_forwards_with_offset() {
        let bytes: Vec<u8> = (0u8..64).collect();
        let src = mem(&bytes);
        let win = src.range(16, 32).unwrap();
        assert_eq!(win.size(), 32);
        // Range(d, o, l).read(o', l') == d.read(o + o', l')
        assert_eq!(win.read(4, 8).unwrap(), src.read(20, 8).unwrap());
        assert!(win.read(30, 4).is_err());
    }

    #[test]
    fn range_rejects_window_beyond_parent() {
        let src = mem(&[0u8; 16]);
        assert!(src.range(8, 9).is_err());
        assert!(src.range(0, 16).is_ok());
    }

    #[test]
    fn stripped_size_and_mapping() {
        // Three 10-byte sectors: 2 bytes header, 6 payload, 2 trailer.
        let mut bytes = Vec::new();
        for sector in 0u8..3 {
            bytes.extend_from_slice(&[0xEE, 0xEE]);
            bytes.extend((0..6).map(|i| sector * 10 + i));
            bytes.extend_from_slice(&[0xCC, 0xCC]);
        }
        let src = mem(&bytes);
        let stripped = src.stripped(10, 2, 6);
        assert_eq!(stripped.size(), 18);

        // Per-byte equivalence with the parent.
        for sector in 0..3u64 {
            for k in 0..6u64 {
                assert_eq!(
                    stripped.read(sector * 6 + k, 1).unwrap(),
                    src.read(sector * 10 + 2 + k, 1).unwrap()
                );
            }
        }

        // A read crossing sector boundaries is stitched together.
        assert_eq!(
            stripped.read(4, 8).unwrap(),
            vec![4, 5, 10, 11, 12, 13, 14, 15]
        );
    }

    #[test]
    fn stripped_partial_tail_sector() {
        // One full 10-byte sector plus a 5-byte tail (2 skip + 3 payload).
        let mut bytes = vec![0xEE, 0xEE, 0, 1, 2, 3, 4, 5, 0xCC, 0xCC];
        bytes.extend_from_slice(&[0xEE, 0xEE, 6, 7, 8]);
        let src = mem(&bytes);
        let stripped = src.stripped(10, 2, 6);
        assert_eq!(stripped.size(), 9);
        assert_eq!(stripped.read(0, 9).unwrap(), vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
