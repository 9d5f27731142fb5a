//! Iterative container expansion.
//!
//! A disk image may be wrapped several layers deep; a CD-ROM image is
//! `BIN → raw track → APM → volumes`, a floppy image `DC42 → volume`.
//! Expansion applies every unwrapper to every source until a full pass
//! changes nothing.

use crate::error::Result;
use crate::source::DataSource;
use crate::{apm, bin, dc42};

/// Unwrap `source` to a fixed point, returning the filesystem-bearing
/// byte ranges found inside it.
pub fn expand(source: DataSource) -> Result<Vec<DataSource>> {
    let mut sources = vec![source];
    loop {
        let mut changed = false;
        let mut next = Vec::with_capacity(sources.len());
        for source in &sources {
            changed |= expand_one(source, &mut next)?;
        }
        if !changed {
            return Ok(sources);
        }
        sources = next;
    }
}

/// Try BIN, then DC42, then APM. Pushes either the unwrapped result(s) or
/// the source itself; returns whether anything was unwrapped.
fn expand_one(source: &DataSource, out: &mut Vec<DataSource>) -> Result<bool> {
    if let Some(track) = bin::unwrap(source)? {
        out.push(track);
        return Ok(true);
    }
    if let Some(payload) = dc42::unwrap(source)? {
        out.push(payload);
        return Ok(true);
    }
    if let Some(partitions) = apm::unwrap(source)? {
        out.extend(partitions);
        return Ok(true);
    }
    out.push(source.clone());
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsup::mem;

    #[test]
    fn plain_source_passes_through() {
        let src = mem(&[0u8; 4096]);
        let sources = expand(src.clone()).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].size(), 4096);
    }

    #[test]
    fn dc42_unwraps_to_payload() {
        let payload: Vec<u8> = (0..1024u32).map(|i| i as u8).collect();
        let src = mem(&crate::dc42::wrap_fixture("Disk", &payload, 0));
        let sources = expand(src).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].read(0, 1024).unwrap(), payload);
    }

    #[test]
    fn dc42_around_apm_expands_twice() {
        // DC42 envelope around a partitioned disk.
        let entries = [
            crate::apm::entry_fixture(2, 1, 2, "Apple", "Apple_partition_map"),
            crate::apm::entry_fixture(2, 4, 2, "Vol", "Apple_HFS"),
        ];
        let mut disk = vec![0u8; 512];
        for entry in &entries {
            disk.extend_from_slice(entry);
        }
        disk.resize(8 * 512, 0);
        disk[4 * 512] = 0x42;

        let src = mem(&crate::dc42::wrap_fixture("Partitioned", &disk, 0));
        let sources = expand(src).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].size(), 1024);
        assert_eq!(sources[0].read(0, 1).unwrap(), vec![0x42]);
    }

    #[test]
    fn bin_track_with_raw_payload_is_terminal() {
        let image = crate::bin::sector_fixture(&[&[0x55u8; 2048]]);
        let sources = expand(mem(&image)).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].size(), 2048);
        assert_eq!(sources[0].read(0, 1).unwrap(), vec![0x55]);
    }
}
