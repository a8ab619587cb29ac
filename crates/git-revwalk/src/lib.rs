//! Revision walking: commit traversal and merge-base computation.
//!
//! This crate provides the core `RevWalk` iterator for traversing commit
//! history in various orders (chronological, topological, author-date,
//! reverse), merge-base computation via the paint algorithm, and reachable
//! object enumeration used by pack generation and ref fast-forward checks.

mod walk;
mod merge_base;
mod objects;
mod filter;

pub use walk::{RevWalk, SortOrder, WalkOptions};
pub use merge_base::{merge_base, merge_base_one, is_ancestor};
pub use objects::list_objects;
pub use filter::ObjectFilter;

use git_hash::ObjectId;

/// Errors produced by revision walking operations.
#[derive(Debug, thiserror::Error)]
pub enum RevWalkError {
    #[error("invalid revision: {0}")]
    InvalidRevision(String),

    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    #[error("object is not a commit: {0}")]
    NotACommit(ObjectId),

    #[error("no merge base found")]
    NoMergeBase,

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] git_ref::RefError),

    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
