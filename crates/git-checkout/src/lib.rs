//! Three-way merge checkout (`HEAD`, the index, and a target tree) against
//! the working tree.
//!
//! Walks all three trees in lockstep via [`git_traverse::TreeWalk`],
//! classifies each path into keep/update/remove/conflict per the checkout
//! rules table, and applies the resulting migration to disk.

mod classify;
mod migration;
mod report;
mod run;
mod worktree;

pub use classify::{BlobState, Verdict};
pub use migration::Migration;
pub use report::CheckoutReport;
pub use run::{CheckoutOptions, CheckoutOutcome, DirCacheCheckout};

use bstr::BString;

/// Errors produced by checkout.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("checkout aborted: {0} conflicting path(s)")]
    Conflicts(Vec<BString>),

    #[error(transparent)]
    Traverse(#[from] git_traverse::TraverseError),

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Index(#[from] git_index::IndexError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
