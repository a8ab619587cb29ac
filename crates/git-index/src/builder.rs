//! Two ways to construct or update an index's entry array:
//!
//! - [`IndexBuilder`] takes entries in any order and sorts once at
//!   `finish()` — the shape a directory walk or pack-to-index conversion
//!   naturally produces.
//! - [`IndexEditor`] takes `PathEdit`/`DeletePath`-style commands against an
//!   existing sorted index and applies all of them in one merge pass,
//!   rather than one `Index::add`/`remove` call (and one re-sort) per edit.

use bstr::BString;

use crate::entry::IndexEntry;
use crate::{cmp_entries, Index, Stage};

/// A single queued change for an [`IndexEditor`].
#[derive(Debug, Clone)]
pub enum Edit {
    /// Insert the entry, or replace whatever already occupies its
    /// `(path, stage)`.
    Update(IndexEntry),
    /// Remove whatever occupies this `(path, stage)`, if anything does.
    Delete { path: BString, stage: Stage },
}

fn edit_key(edit: &Edit) -> (&BString, Stage) {
    match edit {
        Edit::Update(entry) => (&entry.path, entry.stage),
        Edit::Delete { path, stage } => (path, *stage),
    }
}

fn cmp_entry_edit(entry: &IndexEntry, edit: &Edit) -> std::cmp::Ordering {
    let (path, stage) = edit_key(edit);
    entry
        .path
        .cmp(path)
        .then(entry.stage.as_u8().cmp(&stage.as_u8()))
}

/// Accepts entries in unsorted order and sorts them once at `finish()`.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    entries: Vec<IndexEntry>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an entry. Order doesn't matter; duplicates at the same
    /// `(path, stage)` are not deduplicated here — the caller is expected
    /// to build from a source (directory walk, pack conversion) that
    /// doesn't produce them.
    pub fn add(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    /// Sort the accumulated entries and produce the finished index.
    pub fn finish(mut self) -> Index {
        self.entries.sort_by(cmp_entries);
        Index::from_sorted_entries(self.entries)
    }
}

/// Applies a batch of [`Edit`]s against an existing index in one merge
/// pass over its sorted entry array.
pub struct IndexEditor<'a> {
    index: &'a mut Index,
    edits: Vec<Edit>,
}

impl<'a> IndexEditor<'a> {
    pub fn new(index: &'a mut Index) -> Self {
        Self {
            index,
            edits: Vec::new(),
        }
    }

    pub fn queue(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Apply every queued edit, merging them against the current entries
    /// in a single sorted pass, then invalidate the cache tree for every
    /// touched path.
    pub fn apply(mut self) {
        self.edits.sort_by(|a, b| {
            let (pa, sa) = edit_key(a);
            let (pb, sb) = edit_key(b);
            pa.cmp(pb).then(sa.as_u8().cmp(&sb.as_u8()))
        });

        let touched_paths: Vec<BString> = self
            .edits
            .iter()
            .map(|edit| edit_key(edit).0.clone())
            .collect();

        let mut current = self.index.take_entries().into_iter().peekable();
        let mut edits = self.edits.into_iter().peekable();
        let mut merged = Vec::new();

        loop {
            match (current.peek(), edits.peek()) {
                (Some(entry), Some(edit)) => match cmp_entry_edit(entry, edit) {
                    std::cmp::Ordering::Less => merged.push(current.next().unwrap()),
                    std::cmp::Ordering::Greater => {
                        if let Edit::Update(entry) = edits.next().unwrap() {
                            merged.push(entry);
                        }
                    }
                    std::cmp::Ordering::Equal => {
                        current.next();
                        if let Edit::Update(entry) = edits.next().unwrap() {
                            merged.push(entry);
                        }
                    }
                },
                (Some(_), None) => merged.push(current.next().unwrap()),
                (None, Some(_)) => {
                    if let Edit::Update(entry) = edits.next().unwrap() {
                        merged.push(entry);
                    }
                }
                (None, None) => break,
            }
        }

        self.index.replace_entries(merged);

        for path in &touched_paths {
            if let Some(tree) = self.index.cache_tree_mut() {
                tree.invalidate(bstr::BStr::new(path));
            }
        }
    }
}
