//! The blob-level three-way classification table.
//!
//! `H` = HEAD's entry at this path, `I` = the index's, `M` = the target
//! (merge) tree's. Presence/absence and object-id equality between them,
//! plus whether the worktree copy has been locally modified, decide
//! whether the path is kept as-is, updated to `M`, removed, or left as a
//! conflict for the caller to resolve by hand.

use git_hash::ObjectId;

/// What to do with a path once it's been classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Leave the worktree and index untouched.
    Keep,
    /// Write `M`'s content to the worktree and stage it.
    Update,
    /// Delete the worktree copy and unstage it.
    Remove,
    /// Conflicting change; left for the caller to resolve.
    Conflict,
}

/// The three-way state of a single path, ignoring file mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlobState {
    pub head: Option<ObjectId>,
    pub index: Option<ObjectId>,
    pub merge: Option<ObjectId>,
}

/// Classifies one path per the three-way checkout rules table.
///
/// `worktree_free` is only consulted when `I` is absent and `M` is present
/// (the path has no tracked history yet); `worktree_dirty` is only
/// consulted when the index side is on the table (the path is tracked).
pub fn classify_blob(state: &BlobState, worktree_free: bool, worktree_dirty: bool) -> Verdict {
    let BlobState { head, index, merge } = *state;

    match (head, index, merge) {
        // – – –
        (None, None, None) => Verdict::Keep,

        // – – M
        (None, None, Some(_)) => {
            if worktree_free {
                Verdict::Update
            } else {
                Verdict::Conflict
            }
        }

        // – I –
        (None, Some(_), None) => Verdict::Keep,

        // – I M, M == I or M != I
        (None, Some(i), Some(m)) => {
            if m == i {
                Verdict::Keep
            } else {
                Verdict::Conflict
            }
        }

        // H – –
        (Some(_), None, None) => {
            if worktree_dirty {
                Verdict::Conflict
            } else {
                Verdict::Keep
            }
        }

        // H – M
        (Some(h), None, Some(m)) => {
            if m == h {
                // Unlisted in the source table: M re-asserts H's own
                // content, so there is nothing to reconcile.
                Verdict::Keep
            } else {
                Verdict::Conflict
            }
        }

        // H I=H –
        (Some(h), Some(i), None) if i == h => Verdict::Remove,

        // H I=H M
        (Some(h), Some(i), Some(m)) if i == h => {
            if m == h {
                Verdict::Keep
            } else if worktree_dirty {
                Verdict::Conflict
            } else {
                Verdict::Update
            }
        }

        // H I≠H –
        (Some(_), Some(_), None) => {
            // Unlisted: the index has already diverged from HEAD and the
            // target wants the path gone entirely. Conservative default.
            Verdict::Conflict
        }

        // H I≠H M
        (Some(_), Some(i), Some(m)) => {
            if m == i {
                Verdict::Keep
            } else {
                Verdict::Conflict
            }
        }
    }
}
