//! The entry a single column of a `TreeWalk` exposes at the current path.

use git_hash::ObjectId;
use git_object::FileMode;

/// A source's view of the current path: its mode and, where one is known,
/// its object id. Working-tree columns leave `id` unset since computing it
/// requires hashing file content, which is a caller concern, not a
/// traversal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkEntry {
    pub mode: FileMode,
    pub id: Option<ObjectId>,
}

impl WalkEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }
}
