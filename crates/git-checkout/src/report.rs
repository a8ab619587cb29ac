//! Reporting buckets surfaced to the caller after a checkout run.

use bstr::BString;

/// Buckets a checkout (or a plain status comparison) sorts every touched
/// path into, mirroring the categories a porcelain status command reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutReport {
    /// Tracked paths whose worktree content was overwritten to match the
    /// target tree.
    pub modified: Vec<BString>,
    /// Tracked paths whose mode changed without a content change.
    pub changed: Vec<BString>,
    /// Paths removed from both the worktree and the index.
    pub removed: Vec<BString>,
    /// Tracked paths absent from the worktree.
    pub missing: Vec<BString>,
    /// Paths present on disk but not tracked by the index.
    pub untracked: Vec<BString>,
    /// Paths left unresolved because of a three-way conflict.
    pub conflicting: Vec<BString>,
}

impl CheckoutReport {
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty()
            && self.changed.is_empty()
            && self.removed.is_empty()
            && self.missing.is_empty()
            && self.untracked.is_empty()
            && self.conflicting.is_empty()
    }
}
