//! Filters consulted by a `TreeWalk` before it descends into a path.

use bstr::BStr;

use crate::WalkEntry;

/// What a filter wants the walk to do with the current path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Emit this path (and descend into it, in recursive mode).
    Keep,
    /// Skip this path without emitting it or descending into it.
    Skip,
    /// End iteration entirely, for every column, starting here.
    StopWalk,
}

/// A predicate over the current path and the per-column entries found there.
pub trait PathFilter {
    fn decide(&self, path: &BStr, row: &[Option<WalkEntry>]) -> FilterDecision;
}

impl<F> PathFilter for F
where
    F: Fn(&BStr, &[Option<WalkEntry>]) -> FilterDecision,
{
    fn decide(&self, path: &BStr, row: &[Option<WalkEntry>]) -> FilterDecision {
        self(path, row)
    }
}

/// Keeps a path only if both inner filters keep it; a `StopWalk` from either
/// short-circuits and propagates.
pub struct AndFilter<A, B> {
    pub left: A,
    pub right: B,
}

impl<A: PathFilter, B: PathFilter> PathFilter for AndFilter<A, B> {
    fn decide(&self, path: &BStr, row: &[Option<WalkEntry>]) -> FilterDecision {
        match self.left.decide(path, row) {
            FilterDecision::Keep => self.right.decide(path, row),
            other => other,
        }
    }
}

/// Keeps a path if either inner filter keeps it.
pub struct OrFilter<A, B> {
    pub left: A,
    pub right: B,
}

impl<A: PathFilter, B: PathFilter> PathFilter for OrFilter<A, B> {
    fn decide(&self, path: &BStr, row: &[Option<WalkEntry>]) -> FilterDecision {
        match self.left.decide(path, row) {
            FilterDecision::Keep => FilterDecision::Keep,
            FilterDecision::StopWalk => FilterDecision::StopWalk,
            FilterDecision::Skip => self.right.decide(path, row),
        }
    }
}

/// Inverts `Keep`/`Skip`; a `StopWalk` passes through unchanged.
pub struct NotFilter<A> {
    pub inner: A,
}

impl<A: PathFilter> PathFilter for NotFilter<A> {
    fn decide(&self, path: &BStr, row: &[Option<WalkEntry>]) -> FilterDecision {
        match self.inner.decide(path, row) {
            FilterDecision::Keep => FilterDecision::Skip,
            FilterDecision::Skip => FilterDecision::Keep,
            FilterDecision::StopWalk => FilterDecision::StopWalk,
        }
    }
}

/// Restricts a walk to paths matching a pathspec.
pub struct PathspecFilter {
    pub pathspec: git_index::Pathspec,
}

impl PathFilter for PathspecFilter {
    fn decide(&self, path: &BStr, _row: &[Option<WalkEntry>]) -> FilterDecision {
        if self.pathspec.matches(path, false) {
            FilterDecision::Keep
        } else {
            FilterDecision::Skip
        }
    }
}
