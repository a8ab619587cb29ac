//! The four tree-entry sources a `TreeWalk` column can be backed by.
//!
//! Mirrors the shape of a tagged sum — `Canonical | DirCache | FileTree |
//! Empty` — behind one capability trait, so `TreeWalk` never needs to know
//! which kind of source a column holds.

use std::fs;
use std::path::PathBuf;

use bstr::{BStr, BString, ByteSlice};
use git_hash::ObjectId;
use git_index::IndexEntry;
use git_object::{FileMode, Object};
use git_odb::ObjectDatabase;

use crate::TraverseError;

/// Shared capability of anything that can play one column of a `TreeWalk`:
/// a tree object, a slice of the index, or a directory on disk.
pub trait TreeSource {
    fn current_name(&self) -> Option<&BStr>;
    fn current_mode(&self) -> Option<FileMode>;
    fn current_id(&self) -> Option<ObjectId>;
    fn at_eof(&self) -> bool;
    fn advance(&mut self);
    fn enter_subtree(&self, odb: &ObjectDatabase) -> Result<TreeIter, TraverseError>;
}

/// Git's tree-entry ordering: directories compare as if they had a trailing
/// `/`, so `"foo"` (a blob) sorts before `"foo.txt"` but after `"foo/"`.
fn path_component_cmp(a: &[u8], a_is_dir: bool, b: &[u8], b_is_dir: bool) -> std::cmp::Ordering {
    let min_len = a.len().min(b.len());
    let cmp = a[..min_len].cmp(&b[..min_len]);
    if cmp != std::cmp::Ordering::Equal {
        return cmp;
    }
    let ca = if a.len() > min_len {
        a[min_len]
    } else if a_is_dir {
        b'/'
    } else {
        0
    };
    let cb = if b.len() > min_len {
        b[min_len]
    } else if b_is_dir {
        b'/'
    } else {
        0
    };
    ca.cmp(&cb)
}

/// A column backed by a parsed tree object.
#[derive(Debug, Clone)]
pub struct CanonicalIter {
    entries: Vec<git_object::TreeEntry>,
    pos: usize,
}

impl CanonicalIter {
    pub fn new(entries: Vec<git_object::TreeEntry>) -> Self {
        Self { entries, pos: 0 }
    }

    /// Start a walk rooted at the given tree object.
    pub fn from_tree_oid(odb: &ObjectDatabase, oid: &ObjectId) -> Result<Self, TraverseError> {
        match odb.read(oid)?.ok_or(git_odb::OdbError::NotFound(*oid))? {
            Object::Tree(tree) => Ok(Self::new(tree.entries)),
            _ => Err(TraverseError::NotATree(BString::from(oid.to_hex()))),
        }
    }
}

impl TreeSource for CanonicalIter {
    fn current_name(&self) -> Option<&BStr> {
        self.entries.get(self.pos).map(|e| e.name.as_bstr())
    }

    fn current_mode(&self) -> Option<FileMode> {
        self.entries.get(self.pos).map(|e| e.mode)
    }

    fn current_id(&self) -> Option<ObjectId> {
        self.entries.get(self.pos).map(|e| e.oid)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.entries.len()
    }

    fn advance(&mut self) {
        if !self.at_eof() {
            self.pos += 1;
        }
    }

    fn enter_subtree(&self, odb: &ObjectDatabase) -> Result<TreeIter, TraverseError> {
        match self.entries.get(self.pos) {
            Some(entry) if entry.mode.is_tree() => {
                Ok(TreeIter::Canonical(CanonicalIter::from_tree_oid(odb, &entry.oid)?))
            }
            _ => Ok(TreeIter::Empty),
        }
    }
}

/// A column backed by a contiguous, sorted slice of index entries, grouped
/// into synthetic directories by common path prefix.
#[derive(Debug, Clone)]
pub struct DirCacheIter {
    entries: Vec<IndexEntry>,
    prefix_len: usize,
    pos: usize,
}

impl DirCacheIter {
    /// `entries` must be stage-0 entries sorted by path and already
    /// restricted to the given `prefix` (or the whole index, with an empty
    /// prefix, for the root column).
    pub fn new(entries: Vec<IndexEntry>, prefix_len: usize) -> Self {
        Self {
            entries,
            prefix_len,
            pos: 0,
        }
    }

    fn rest(&self, idx: usize) -> Option<&[u8]> {
        self.entries.get(idx).map(|e| &e.path.as_slice()[self.prefix_len..])
    }

    /// The current entry's immediate path component below `prefix`, and
    /// whether it is a synthesized directory (more path follows the `/`).
    fn current_component(&self) -> Option<(&[u8], bool)> {
        let rest = self.rest(self.pos)?;
        match rest.find_byte(b'/') {
            Some(slash) => Some((&rest[..slash], true)),
            None => Some((rest, false)),
        }
    }

    fn group_end(&self) -> usize {
        let Some((name, _)) = self.current_component() else {
            return self.pos;
        };
        let mut end = self.pos + 1;
        while let Some(rest) = self.rest(end) {
            let this_name = match rest.find_byte(b'/') {
                Some(slash) => &rest[..slash],
                None => rest,
            };
            if this_name != name {
                break;
            }
            end += 1;
        }
        end
    }
}

impl TreeSource for DirCacheIter {
    fn current_name(&self) -> Option<&BStr> {
        self.current_component().map(|(name, _)| name.as_bstr())
    }

    fn current_mode(&self) -> Option<FileMode> {
        let (_, is_dir) = self.current_component()?;
        if is_dir {
            Some(FileMode::Tree)
        } else {
            self.entries.get(self.pos).map(|e| e.mode)
        }
    }

    fn current_id(&self) -> Option<ObjectId> {
        let (_, is_dir) = self.current_component()?;
        if is_dir {
            None
        } else {
            self.entries.get(self.pos).map(|e| e.oid)
        }
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.entries.len()
    }

    fn advance(&mut self) {
        self.pos = self.group_end();
    }

    fn enter_subtree(&self, _odb: &ObjectDatabase) -> Result<TreeIter, TraverseError> {
        match self.current_component() {
            Some((name, true)) => {
                let new_prefix_len = self.prefix_len + name.len() + 1;
                let end = self.group_end();
                let sub_entries = self.entries[self.pos..end].to_vec();
                Ok(TreeIter::DirCache(DirCacheIter::new(sub_entries, new_prefix_len)))
            }
            _ => Ok(TreeIter::Empty),
        }
    }
}

/// A column backed by a real directory on disk.
#[derive(Debug, Clone)]
pub struct FileTreeIter {
    dir: PathBuf,
    entries: Vec<(BString, bool)>,
    pos: usize,
}

impl FileTreeIter {
    pub fn new(dir: PathBuf) -> Result<Self, TraverseError> {
        let mut entries = Vec::new();
        for dirent in fs::read_dir(&dir)? {
            let dirent = dirent?;
            let name = dirent.file_name();
            if name == ".git" {
                continue;
            }
            let is_dir = dirent.file_type()?.is_dir();
            entries.push((BString::from(name.to_string_lossy().as_bytes()), is_dir));
        }
        entries.sort_by(|(a, a_dir), (b, b_dir)| path_component_cmp(a, *a_dir, b, *b_dir));
        Ok(Self { dir, entries, pos: 0 })
    }

    fn mode_for(&self, name: &BStr, is_dir: bool) -> FileMode {
        if is_dir {
            return FileMode::Tree;
        }
        let path = self.dir.join(name.to_str_lossy().as_ref());
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.file_type().is_symlink() => FileMode::Symlink,
            Ok(meta) => {
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    if meta.permissions().mode() & 0o111 != 0 {
                        return FileMode::Executable;
                    }
                }
                let _ = meta;
                FileMode::Regular
            }
            Err(_) => FileMode::Regular,
        }
    }
}

impl TreeSource for FileTreeIter {
    fn current_name(&self) -> Option<&BStr> {
        self.entries.get(self.pos).map(|(name, _)| name.as_bstr())
    }

    fn current_mode(&self) -> Option<FileMode> {
        self.entries
            .get(self.pos)
            .map(|(name, is_dir)| self.mode_for(name, *is_dir))
    }

    fn current_id(&self) -> Option<ObjectId> {
        // Hashing working-tree content is a caller concern; the walk only
        // reports paths and modes for this source.
        None
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.entries.len()
    }

    fn advance(&mut self) {
        if !self.at_eof() {
            self.pos += 1;
        }
    }

    fn enter_subtree(&self, _odb: &ObjectDatabase) -> Result<TreeIter, TraverseError> {
        match self.entries.get(self.pos) {
            Some((name, true)) => Ok(TreeIter::FileTree(FileTreeIter::new(
                self.dir.join(name.to_str_lossy().as_ref()),
            )?)),
            _ => Ok(TreeIter::Empty),
        }
    }
}

/// One column of a `TreeWalk`.
#[derive(Debug, Clone)]
pub enum TreeIter {
    Canonical(CanonicalIter),
    DirCache(DirCacheIter),
    FileTree(FileTreeIter),
    Empty,
}

impl TreeSource for TreeIter {
    fn current_name(&self) -> Option<&BStr> {
        match self {
            TreeIter::Canonical(i) => i.current_name(),
            TreeIter::DirCache(i) => i.current_name(),
            TreeIter::FileTree(i) => i.current_name(),
            TreeIter::Empty => None,
        }
    }

    fn current_mode(&self) -> Option<FileMode> {
        match self {
            TreeIter::Canonical(i) => i.current_mode(),
            TreeIter::DirCache(i) => i.current_mode(),
            TreeIter::FileTree(i) => i.current_mode(),
            TreeIter::Empty => None,
        }
    }

    fn current_id(&self) -> Option<ObjectId> {
        match self {
            TreeIter::Canonical(i) => i.current_id(),
            TreeIter::DirCache(i) => i.current_id(),
            TreeIter::FileTree(i) => i.current_id(),
            TreeIter::Empty => None,
        }
    }

    fn at_eof(&self) -> bool {
        match self {
            TreeIter::Canonical(i) => i.at_eof(),
            TreeIter::DirCache(i) => i.at_eof(),
            TreeIter::FileTree(i) => i.at_eof(),
            TreeIter::Empty => true,
        }
    }

    fn advance(&mut self) {
        match self {
            TreeIter::Canonical(i) => i.advance(),
            TreeIter::DirCache(i) => i.advance(),
            TreeIter::FileTree(i) => i.advance(),
            TreeIter::Empty => {}
        }
    }

    fn enter_subtree(&self, odb: &ObjectDatabase) -> Result<TreeIter, TraverseError> {
        match self {
            TreeIter::Canonical(i) => i.enter_subtree(odb),
            TreeIter::DirCache(i) => i.enter_subtree(odb),
            TreeIter::FileTree(i) => i.enter_subtree(odb),
            TreeIter::Empty => Ok(TreeIter::Empty),
        }
    }
}
