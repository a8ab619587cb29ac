//! Racy-clean reclassification.
//!
//! `write::write_entry` smudges any entry whose mtime is at or after the
//! moment of writing by recording size 0, since the worktree file could
//! have been touched within the same clock tick the index was written in.
//! This module is the read-side counterpart: once enough time has passed
//! that a fresh stat is trustworthy, a smudged entry whose content still
//! hashes to its recorded oid is reclassified as clean.

use std::path::Path;

use git_hash::hasher::Hasher;
use git_hash::HashAlgorithm;

use crate::{Index, IndexError};

impl Index {
    /// Reclassify smudged entries against the worktree rooted at `work_tree`.
    ///
    /// For every entry with stored size 0, re-read the file, hash it as a
    /// blob, and compare against the entry's oid. A match means the file is
    /// unchanged, so the entry's stat is refreshed from the filesystem and
    /// it is no longer smudged. A mismatch or missing file is left as-is —
    /// the change is real and belongs to status reporting, not this pass.
    pub fn refresh_smudged(&mut self, work_tree: &Path) -> Result<(), IndexError> {
        for entry in self.entries.iter_mut() {
            if entry.stat.size != 0 {
                continue;
            }

            let abs = work_tree.join(entry.path.to_str_lossy().as_ref());
            let content = match std::fs::read(&abs) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let meta = match std::fs::symlink_metadata(&abs) {
                Ok(m) => m,
                Err(_) => continue,
            };

            let hash = Hasher::hash_object(HashAlgorithm::Sha1, "blob", &content)
                .map_err(|_| IndexError::InvalidHeader("failed to hash worktree blob".into()))?;
            if hash != entry.oid {
                continue;
            }

            entry.stat = crate::entry::StatData::from_metadata(&meta);
        }
        Ok(())
    }
}
