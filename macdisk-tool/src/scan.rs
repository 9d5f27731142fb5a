//! Image discovery and file collection shared by the commands.
//!
//! Commands outlive the images they scan, so the visitor snapshots each
//! matching file into an owned [`FileEntry`] (optionally with a content
//! digest) instead of holding borrows into the trees.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use macdisk::macfs::{visit_folder, File, FileVisitor, Tree};
use macdisk::DiskImage;
use sha2::{Digest, Sha256};

use crate::style::{RED, RESET};

/// Split `--key=value` / `--key` flags from positional paths.
pub(crate) fn parse_flags(args: &[String]) -> (BTreeMap<String, String>, Vec<PathBuf>) {
    let mut flags = BTreeMap::new();
    let mut paths = Vec::new();
    for arg in args {
        if let Some(rest) = arg.strip_prefix("--") {
            match rest.split_once('=') {
                Some((key, value)) => flags.insert(key.to_string(), value.to_string()),
                None => flags.insert(rest.to_string(), "true".to_string()),
            };
        } else {
            paths.push(PathBuf::from(arg));
        }
    }
    (flags, paths)
}

/// A file filter compiled from the common flags. `--type=XXXX/CCCC`
/// splits into a type and a creator filter.
pub(crate) enum Filter {
    Name(String),
    Type(String),
    Creator(String),
}

impl Filter {
    pub(crate) fn from_flags(flags: &BTreeMap<String, String>) -> Vec<Filter> {
        let mut filters = Vec::new();
        if let Some(name) = flags.get("name") {
            filters.push(Filter::Name(name.to_lowercase()));
        }
        if let Some(type_code) = flags.get("type") {
            match type_code.split_once('/') {
                Some((file_type, creator)) => {
                    filters.push(Filter::Type(file_type.to_string()));
                    filters.push(Filter::Creator(creator.to_string()));
                }
                None => filters.push(Filter::Type(type_code.to_string())),
            }
        }
        if let Some(creator) = flags.get("creator") {
            filters.push(Filter::Creator(creator.to_string()));
        }
        filters
    }

    fn matches(&self, file: &File) -> bool {
        match self {
            Filter::Name(substring) => file.name().to_lowercase().contains(substring),
            Filter::Type(code) => file.file_type().to_string() == *code,
            Filter::Creator(code) => file.creator().to_string() == *code,
        }
    }
}

pub(crate) fn matches_all(filters: &[Filter], file: &File) -> bool {
    filters.iter().all(|filter| filter.matches(file))
}

/// Owned snapshot of a file, usable after its image is closed.
pub(crate) struct FileEntry {
    pub image: PathBuf,
    pub folder: String,
    pub name: String,
    pub file_type: String,
    pub creator: String,
    pub data_size: u32,
    pub rsrc_size: u32,
    pub digest: Option<String>,
}

impl FileEntry {
    /// Weak identity: name, codes and fork sizes.
    pub(crate) fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.name, self.file_type, self.creator, self.data_size, self.rsrc_size
        )
    }

    /// Strong identity: the weak key plus fork content digests.
    pub(crate) fn content_key(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{}|{}", self.key(), digest),
            None => self.key(),
        }
    }

    pub(crate) fn describe(&self) -> String {
        format!(
            "{} {}/{} {}",
            self.name,
            self.file_type,
            self.creator,
            fork_sizes(self.data_size, self.data_size, self.rsrc_size, self.rsrc_size)
        )
    }
}

/// Canonical fork-size blurb; ranges collapse when min equals max.
pub(crate) fn fork_sizes(dmin: u32, dmax: u32, rmin: u32, rmax: u32) -> String {
    fn span(min: u32, max: u32) -> String {
        if min == max {
            format!("{min}")
        } else {
            format!("{min} to {max}")
        }
    }

    if dmax == 0 && rmax == 0 {
        "(empty file)".to_string()
    } else if rmax == 0 {
        format!("(DATA: {} bytes)", span(dmin, dmax))
    } else if dmax == 0 {
        format!("(RSRC: {} bytes)", span(rmin, rmax))
    } else {
        format!(
            "(DATA: {} bytes, RSRC: {} bytes)",
            span(dmin, dmax),
            span(rmin, rmax)
        )
    }
}

/// Apply `f` to every image file under `paths`; directories are walked
/// recursively. Unreadable images are reported and skipped.
pub(crate) fn for_each_image(paths: &[PathBuf], f: &mut impl FnMut(&DiskImage)) {
    for path in paths {
        visit_path(path, f);
    }
}

fn visit_path(path: &Path, f: &mut impl FnMut(&DiskImage)) {
    if path.is_dir() {
        let mut children: Vec<PathBuf> = match std::fs::read_dir(path) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(error) => {
                eprintln!("{RED}error:{RESET} cannot read {}: {error}", path.display());
                return;
            }
        };
        children.sort();
        for child in children {
            visit_path(&child, f);
        }
    } else if path.is_file() {
        match DiskImage::open(path) {
            Ok(image) => f(&image),
            Err(error) => {
                eprintln!("{RED}error:{RESET} cannot open {}: {error}", path.display())
            }
        }
    } else {
        eprintln!(
            "{RED}error:{RESET} {} is not a file or directory",
            path.display()
        );
    }
}

/// Collect matching files from every image under `paths`.
pub(crate) fn collect_files(
    paths: &[PathBuf],
    filters: &[Filter],
    with_digest: bool,
) -> Vec<FileEntry> {
    struct Collector<'a> {
        filters: &'a [Filter],
        with_digest: bool,
        image: PathBuf,
        entries: &'a mut Vec<FileEntry>,
    }

    impl FileVisitor for Collector<'_> {
        fn visit_file(&mut self, tree: &Tree, file: &File) {
            if !matches_all(self.filters, file) {
                return;
            }
            let folder = file
                .parent()
                .map(|id| tree.path_string(id))
                .unwrap_or_default();
            let digest = self.with_digest.then(|| fork_digest(file));
            self.entries.push(FileEntry {
                image: self.image.clone(),
                folder,
                name: file.name().to_string(),
                file_type: file.file_type().to_string(),
                creator: file.creator().to_string(),
                data_size: file.data_size(),
                rsrc_size: file.rsrc_size(),
                digest,
            });
        }
    }

    let mut entries = Vec::new();
    for_each_image(paths, &mut |image| {
        for partition in image.partitions() {
            let tree = partition.tree();
            let mut collector = Collector {
                filters,
                with_digest,
                image: image.path().to_path_buf(),
                entries: &mut entries,
            };
            visit_folder(tree, tree.root(), &mut collector);
        }
    });
    entries
}

/// SHA-256 over both forks, read in chunks.
fn fork_digest(file: &File) -> String {
    const CHUNK: u32 = 64 * 1024;

    let mut hasher = Sha256::new();
    for (size, read) in [
        (file.data_size(), true),
        (file.rsrc_size(), false),
    ] {
        let mut offset = 0u32;
        while offset < size {
            let want = CHUNK.min(size - offset);
            let chunk = if read {
                file.read_data(offset, want)
            } else {
                file.read_rsrc(offset, want)
            };
            match chunk {
                Ok(bytes) if !bytes.is_empty() => {
                    offset += bytes.len() as u32;
                    hasher.update(&bytes);
                }
                Ok(_) => break,
                Err(error) => {
                    eprintln!("{RED}error:{RESET} reading fork of {}: {error}", file.name());
                    break;
                }
            }
        }
    }

    let hash = hasher.finalize();
    let mut out = String::with_capacity(hash.len() * 2);
    for byte in hash {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
