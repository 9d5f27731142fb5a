//! The file/folder data model shared by both filesystems.
//!
//! A mounted partition materializes into a [`Tree`]: an arena of folder and
//! file records addressed by [`FolderId`]/[`FileId`]. Parent links and
//! child lists are indices into the arena, so the hierarchy cannot form
//! reference cycles and needs no back-pointer bookkeeping.

use std::sync::Arc;

use crate::error::{FsError, Result};
use crate::fork::ForkReader;
use crate::FourCC;

/// Identity of the volume a file came from.
#[derive(Debug, Clone)]
pub struct Disk {
    name: String,
    source: String,
}

impl Disk {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Disk {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Volume name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description of the data source the volume was read from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(usize);

/// A Macintosh file: name, type/creator codes, and up to two forks.
pub struct File {
    disk: Arc<Disk>,
    name_raw: Vec<u8>,
    name: String,
    file_type: FourCC,
    creator: FourCC,
    data_size: u32,
    rsrc_size: u32,
    data_fork: Option<ForkReader>,
    rsrc_fork: Option<ForkReader>,
    parent: Option<FolderId>,
}

impl File {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        disk: Arc<Disk>,
        name_raw: &[u8],
        file_type: FourCC,
        creator: FourCC,
        data_size: u32,
        rsrc_size: u32,
        data_fork: Option<ForkReader>,
        rsrc_fork: Option<ForkReader>,
    ) -> Self {
        File {
            disk,
            name_raw: name_raw.to_vec(),
            name: macroman::decode(name_raw),
            file_type,
            creator,
            data_size,
            rsrc_size,
            data_fork,
            rsrc_fork,
            parent: None,
        }
    }

    pub fn disk(&self) -> &Arc<Disk> {
        &self.disk
    }

    /// Filename decoded from MacRoman.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename as stored on disk.
    pub fn name_raw(&self) -> &[u8] {
        &self.name_raw
    }

    pub fn file_type(&self) -> FourCC {
        self.file_type
    }

    pub fn creator(&self) -> FourCC {
        self.creator
    }

    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    pub fn rsrc_size(&self) -> u32 {
        self.rsrc_size
    }

    pub fn parent(&self) -> Option<FolderId> {
        self.parent
    }

    /// Read from the data fork, clamped to its size. A file without a data
    /// fork reads as empty.
    pub fn read_data(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        match &self.data_fork {
            Some(fork) => fork.read(offset, length),
            None => Ok(Vec::new()),
        }
    }

    /// Read from the resource fork, clamped to its size.
    pub fn read_rsrc(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        match &self.rsrc_fork {
            Some(fork) => fork.read(offset, length),
            None => Ok(Vec::new()),
        }
    }

    /// Weak identity: name, codes and fork sizes.
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.name, self.file_type, self.creator, self.data_size, self.rsrc_size
        )
    }
}

/// A folder with ordered children.
pub struct Folder {
    name_raw: Vec<u8>,
    name: String,
    parent: Option<FolderId>,
    files: Vec<FileId>,
    folders: Vec<FolderId>,
}

impl Folder {
    fn new(name_raw: &[u8]) -> Self {
        Folder {
            name_raw: name_raw.to_vec(),
            name: macroman::decode(name_raw),
            parent: None,
            files: Vec::new(),
            folders: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_raw(&self) -> &[u8] {
        &self.name_raw
    }

    pub fn parent(&self) -> Option<FolderId> {
        self.parent
    }

    pub fn files(&self) -> &[FileId] {
        &self.files
    }

    pub fn folders(&self) -> &[FolderId] {
        &self.folders
    }
}

/// Arena holding one partition's folder hierarchy. Immutable once a mount
/// returns it.
pub struct Tree {
    disk: Arc<Disk>,
    folders: Vec<Folder>,
    files: Vec<File>,
}

impl Tree {
    /// A tree with a single detached-from-nothing root folder.
    pub fn new(disk: Arc<Disk>, root_name_raw: &[u8]) -> Self {
        Tree {
            disk,
            folders: vec![Folder::new(root_name_raw)],
            files: Vec::new(),
        }
    }

    pub fn disk(&self) -> &Arc<Disk> {
        &self.disk
    }

    pub fn root(&self) -> FolderId {
        FolderId(0)
    }

    pub fn folder(&self, id: FolderId) -> &Folder {
        &self.folders[id.0]
    }

    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.0]
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Create a new folder, not yet attached to a parent.
    pub fn add_folder(&mut self, name_raw: &[u8]) -> FolderId {
        self.folders.push(Folder::new(name_raw));
        FolderId(self.folders.len() - 1)
    }

    /// Wire `child` under `parent`. Rejects a child that already has a
    /// parent and wiring that would close a cycle.
    pub fn attach_folder(&mut self, parent: FolderId, child: FolderId) -> Result<()> {
        if self.folders[child.0].parent.is_some() {
            return Err(FsError::AlreadyParented(
                self.folders[child.0].name.clone(),
            ));
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(FsError::FolderCycle(self.folders[child.0].name.clone()));
            }
            cursor = self.folders[id.0].parent;
        }
        self.folders[child.0].parent = Some(parent);
        self.folders[parent.0].folders.push(child);
        Ok(())
    }

    /// Add a file under `parent`. Rejects a file that already has a parent.
    pub fn add_file(&mut self, parent: FolderId, mut file: File) -> Result<FileId> {
        if file.parent.is_some() {
            return Err(FsError::AlreadyParented(file.name.clone()));
        }
        file.parent = Some(parent);
        self.files.push(file);
        let id = FileId(self.files.len() - 1);
        self.folders[parent.0].files.push(id);
        Ok(id)
    }

    /// Folder chain from the root down to `folder`, inclusive.
    pub fn path(&self, folder: FolderId) -> Vec<FolderId> {
        let mut chain = vec![folder];
        let mut cursor = self.folders[folder.0].parent;
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.folders[id.0].parent;
        }
        chain.reverse();
        chain
    }

    /// Colon-joined path in the classic Mac style, e.g. `Disk:System Folder`.
    pub fn path_string(&self, folder: FolderId) -> String {
        let names: Vec<&str> = self
            .path(folder)
            .into_iter()
            .map(|id| self.folders[id.0].name())
            .collect();
        names.join(":")
    }

    /// All file ids, in arena order.
    pub fn files(&self) -> impl Iterator<Item = FileId> + '_ {
        (0..self.files.len()).map(FileId)
    }
}

/// Traversal callbacks. The driver visits a folder's files before its
/// subfolders and descends only when `pre_visit_folder` returns true.
pub trait FileVisitor {
    fn pre_visit_folder(&mut self, _tree: &Tree, _folder: FolderId) -> bool {
        true
    }
    fn visit_file(&mut self, tree: &Tree, file: &File);
    fn post_visit_folder(&mut self, _tree: &Tree, _folder: FolderId) {}
}

/// Depth-first walk starting at `folder`.
pub fn visit_folder(tree: &Tree, folder: FolderId, visitor: &mut dyn FileVisitor) {
    if visitor.pre_visit_folder(tree, folder) {
        for &file in tree.folder(folder).files() {
            visitor.visit_file(tree, tree.file(file));
        }
        for &sub in tree.folder(folder).folders() {
            visit_folder(tree, sub, visitor);
        }
        visitor.post_visit_folder(tree, folder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tree() -> Tree {
        let disk = Arc::new(Disk::new("Test", "fixture"));
        Tree::new(disk, b"Test")
    }

    fn test_file(tree: &Tree, name: &str) -> File {
        File::new(
            tree.disk().clone(),
            name.as_bytes(),
            FourCC::from_bytes(*b"TEXT"),
            FourCC::from_bytes(*b"ttxt"),
            0,
            0,
            None,
            None,
        )
    }

    #[test]
    fn attach_rejects_second_parent() {
        let mut tree = test_tree();
        let a = tree.add_folder(b"A");
        let b = tree.add_folder(b"B");
        tree.attach_folder(tree.root(), a).unwrap();
        tree.attach_folder(tree.root(), b).unwrap();
        assert!(matches!(
            tree.attach_folder(a, b),
            Err(FsError::AlreadyParented(_))
        ));
    }

    #[test]
    fn attach_rejects_cycles() {
        let mut tree = test_tree();
        let a = tree.add_folder(b"A");
        let b = tree.add_folder(b"B");
        tree.attach_folder(a, b).unwrap();
        assert!(matches!(
            tree.attach_folder(b, a),
            Err(FsError::FolderCycle(_))
        ));
        assert!(matches!(
            tree.attach_folder(a, a),
            Err(FsError::FolderCycle(_))
        ));
    }

    #[test]
    fn files_get_exactly_one_parent() {
        let mut tree = test_tree();
        let file = test_file(&tree, "Readme");
        let id = tree.add_file(tree.root(), file).unwrap();
        assert_eq!(tree.file(id).parent(), Some(tree.root()));
        assert_eq!(tree.folder(tree.root()).files(), &[id]);
    }

    #[test]
    fn path_string_runs_root_first() {
        let mut tree = test_tree();
        let a = tree.add_folder(b"System Folder");
        let b = tree.add_folder(b"Extensions");
        tree.attach_folder(tree.root(), a).unwrap();
        tree.attach_folder(a, b).unwrap();
        assert_eq!(tree.path_string(b), "Test:System Folder:Extensions");
    }

    #[test]
    fn visitor_sees_files_before_subfolders() {
        let mut tree = test_tree();
        let sub = tree.add_folder(b"Sub");
        tree.attach_folder(tree.root(), sub).unwrap();
        let f1 = test_file(&tree, "top");
        tree.add_file(tree.root(), f1).unwrap();
        let f2 = test_file(&tree, "inner");
        tree.add_file(sub, f2).unwrap();

        struct Recorder(Vec<String>);
        impl FileVisitor for Recorder {
            fn pre_visit_folder(&mut self, tree: &Tree, folder: FolderId) -> bool {
                self.0.push(format!("+{}", tree.folder(folder).name()));
                true
            }
            fn visit_file(&mut self, _tree: &Tree, file: &File) {
                self.0.push(file.name().to_string());
            }
            fn post_visit_folder(&mut self, tree: &Tree, folder: FolderId) {
                self.0.push(format!("-{}", tree.folder(folder).name()));
            }
        }

        let mut recorder = Recorder(Vec::new());
        visit_folder(&tree, tree.root(), &mut recorder);
        assert_eq!(
            recorder.0,
            vec!["+Test", "top", "+Sub", "inner", "-Sub", "-Test"]
        );
    }

    #[test]
    fn pruned_folder_is_not_descended() {
        let mut tree = test_tree();
        let sub = tree.add_folder(b"Sub");
        tree.attach_folder(tree.root(), sub).unwrap();
        let f = test_file(&tree, "inner");
        tree.add_file(sub, f).unwrap();

        struct Pruner(usize);
        impl FileVisitor for Pruner {
            fn pre_visit_folder(&mut self, tree: &Tree, folder: FolderId) -> bool {
                tree.folder(folder).name() != "Sub"
            }
            fn visit_file(&mut self, _tree: &Tree, _file: &File) {
                self.0 += 1;
            }
        }

        let mut pruner = Pruner(0);
        visit_folder(&tree, tree.root(), &mut pruner);
        assert_eq!(pruner.0, 0);
    }
}
