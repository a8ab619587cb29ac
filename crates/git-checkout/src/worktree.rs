//! Worktree-side helpers: does a path exist, and does its content match
//! what the index expects.

use std::path::Path;

use git_hash::ObjectId;

use crate::CheckoutError;

/// True if nothing occupies `path` in the worktree yet.
pub fn path_is_free(work_tree: &Path, rel_path: &str) -> bool {
    !work_tree.join(rel_path).exists()
}

/// True if the worktree's content at `rel_path` no longer matches
/// `expected`. A missing file counts as dirty only when the index expected
/// one to be there; callers that already know the path is untracked should
/// not call this.
///
/// This hashes the file on every call rather than trusting cached stat
/// data — the racy-clean optimisation real git performs (comparing mtimes
/// before falling back to a hash) is a performance concern, not a
/// correctness one, and is left to the index layer.
pub fn is_worktree_dirty(
    work_tree: &Path,
    rel_path: &str,
    expected: Option<ObjectId>,
) -> Result<bool, CheckoutError> {
    let abs = work_tree.join(rel_path);
    let content = match std::fs::read(&abs) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(expected.is_some());
        }
        Err(e) => return Err(e.into()),
    };

    let Some(expected) = expected else {
        return Ok(true);
    };

    let actual = git_hash::Hasher::hash_object(expected.algorithm(), "blob", &content)
        .map_err(|e| CheckoutError::Io(std::io::Error::other(e)))?;
    Ok(actual != expected)
}
