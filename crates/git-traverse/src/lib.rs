//! N-way synchronized tree traversal.
//!
//! `TreeWalk` adapts a tree-object iterator, an index iterator, and a
//! working-tree iterator behind a single position cursor, always exposing the
//! lexicographically minimum current path across whichever sources are
//! loaded into it. Checkout and diff consume this to compare up to three
//! snapshots of a repository (HEAD, index, worktree) path by path without
//! materialising any of them in full.

mod entry;
mod filter;
mod source;
mod walk;

pub use entry::WalkEntry;
pub use filter::{AndFilter, FilterDecision, NotFilter, OrFilter, PathFilter, PathspecFilter};
pub use source::{CanonicalIter, DirCacheIter, FileTreeIter, TreeIter, TreeSource};
pub use walk::{Row, TreeWalk, WalkMode};

use bstr::BString;

/// Errors produced by tree traversal.
#[derive(Debug, thiserror::Error)]
pub enum TraverseError {
    #[error("{0} is not a tree")]
    NotATree(BString),

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
