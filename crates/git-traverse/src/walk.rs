//! The core n-way synchronized walk.

use bstr::{BString, ByteSlice, ByteVec};
use git_odb::ObjectDatabase;

use crate::filter::{FilterDecision, PathFilter};
use crate::source::{TreeIter, TreeSource};
use crate::{TraverseError, WalkEntry};

/// What each column reports at the current path; `None` means that column
/// has no entry there.
pub type Row = Vec<Option<WalkEntry>>;

/// How a `TreeWalk` handles directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Never auto-descend; the caller calls `enter_subtree()` explicitly.
    Flat,
    /// Auto-descend into every directory as it's reached.
    Recursive,
    /// Like `Recursive`, but a directory is re-emitted after its
    /// descendants instead of before them.
    PostOrder,
}

struct Level {
    prefix: BString,
    columns: Vec<TreeIter>,
    /// Set when, in post-order mode, this level's parent entry still needs
    /// to be re-emitted after this level finishes.
    reemit: Option<(BString, Row)>,
}

impl Level {
    fn min_name(&self) -> Option<bstr::BString> {
        self.columns
            .iter()
            .filter(|c| !c.at_eof())
            .filter_map(|c| c.current_name())
            .map(BString::from)
            .min()
    }

    fn row_at(&self, name: &bstr::BStr) -> Row {
        self.columns
            .iter()
            .map(|c| {
                if c.current_name() == Some(name) {
                    Some(WalkEntry {
                        mode: c.current_mode().expect("name implies mode"),
                        id: c.current_id(),
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    fn advance_at(&mut self, name: &bstr::BStr) {
        for c in &mut self.columns {
            if c.current_name() == Some(name) {
                c.advance();
            }
        }
    }
}

fn join_path(prefix: &bstr::BStr, name: &bstr::BStr) -> BString {
    if prefix.is_empty() {
        BString::from(name.to_vec())
    } else {
        let mut out = BString::from(prefix.to_vec());
        out.push_byte(b'/');
        out.push_str(name);
        out
    }
}

/// Maintains K iterators in parallel, always exposing the lexicographically
/// minimum current path across them.
pub struct TreeWalk<'a> {
    odb: &'a ObjectDatabase,
    mode: WalkMode,
    filter: Option<Box<dyn PathFilter>>,
    stack: Vec<Level>,
    stopped: bool,
}

impl<'a> TreeWalk<'a> {
    /// Start a new walk over the given columns, at the root.
    pub fn new(odb: &'a ObjectDatabase, columns: Vec<TreeIter>, mode: WalkMode) -> Self {
        Self {
            odb,
            mode,
            filter: None,
            stack: vec![Level {
                prefix: BString::from(""),
                columns,
                reemit: None,
            }],
            stopped: false,
        }
    }

    pub fn set_filter(&mut self, filter: Box<dyn PathFilter>) {
        self.filter = Some(filter);
    }

    /// The path the iterator is currently positioned at, without advancing.
    pub fn current_path(&self) -> Option<BString> {
        let level = self.stack.last()?;
        let name = level.min_name()?;
        Some(join_path(level.prefix.as_bstr(), name.as_bstr()))
    }

    /// Replace the iterator at the current position, in every column, with
    /// its subtree iterator (an empty iterator for columns lacking the
    /// path). Used in `Flat` mode to descend explicitly.
    pub fn enter_subtree(&mut self) -> Result<(), TraverseError> {
        let level = self.stack.last().expect("walk not exhausted");
        let Some(name) = level.min_name() else {
            return Ok(());
        };
        let prefix = join_path(level.prefix.as_bstr(), name.as_bstr());
        let row = level.row_at(name.as_bstr());

        let mut sub_columns = Vec::with_capacity(level.columns.len());
        for column in &level.columns {
            let sub = if column.current_name() == Some(name.as_bstr()) {
                column.enter_subtree(self.odb)?
            } else {
                TreeIter::Empty
            };
            sub_columns.push(sub);
        }

        let level = self.stack.last_mut().expect("walk not exhausted");
        level.advance_at(name.as_bstr());

        self.stack.push(Level {
            prefix,
            columns: sub_columns,
            reemit: if self.mode == WalkMode::PostOrder {
                Some((join_path(level.prefix.as_bstr(), name.as_bstr()), row))
            } else {
                None
            },
        });
        Ok(())
    }
}

impl<'a> Iterator for TreeWalk<'a> {
    type Item = Result<(BString, Row), TraverseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }

        loop {
            let level = self.stack.last()?;

            let Some(name) = level.min_name() else {
                // This level is exhausted. If it was waiting to re-emit its
                // parent directory entry (post-order), do so now.
                let finished = self.stack.pop()?;
                if let Some((path, row)) = finished.reemit {
                    return Some(Ok((path, row)));
                }
                if self.stack.is_empty() {
                    return None;
                }
                continue;
            };

            let path = join_path(level.prefix.as_bstr(), name.as_bstr());
            let row = level.row_at(name.as_bstr());

            let decision = self
                .filter
                .as_ref()
                .map(|f| f.decide(path.as_bstr(), &row))
                .unwrap_or(FilterDecision::Keep);

            match decision {
                FilterDecision::StopWalk => {
                    self.stopped = true;
                    return None;
                }
                FilterDecision::Skip => {
                    let level = self.stack.last_mut().expect("checked above");
                    level.advance_at(name.as_bstr());
                    continue;
                }
                FilterDecision::Keep => {}
            }

            let is_dir = row.iter().flatten().any(|e| e.is_tree());

            if is_dir && matches!(self.mode, WalkMode::Recursive | WalkMode::PostOrder) {
                match self.enter_subtree() {
                    Ok(()) => {
                        if self.mode == WalkMode::Recursive {
                            // Pre-order: emit the directory itself, then its
                            // descendants on subsequent calls.
                            return Some(Ok((path, row)));
                        }
                        // Post-order: descendants emit first; this level's
                        // `reemit` slot will surface `(path, row)` once the
                        // pushed level is exhausted.
                        continue;
                    }
                    Err(e) => return Some(Err(e)),
                }
            }

            let level = self.stack.last_mut().expect("checked above");
            level.advance_at(name.as_bstr());
            return Some(Ok((path, row)));
        }
    }
}
