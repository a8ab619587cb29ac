//! The set of filesystem operations a checkout run produces, applied only
//! once every path has been classified.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bstr::BString;
use git_hash::ObjectId;
use git_object::{FileMode, Object};
use git_odb::ObjectDatabase;

use crate::CheckoutError;

/// Filesystem operations to apply, split by kind the way the checkout
/// algorithm discovers them: whole-subtree removals, single-file removals,
/// and single-file creations.
#[derive(Debug, Default)]
pub struct Migration {
    pub rms: Vec<BString>,
    pub creates: Vec<(BString, FileMode, ObjectId)>,
}

impl Migration {
    pub fn is_empty(&self) -> bool {
        self.rms.is_empty() && self.creates.is_empty()
    }

    /// Applies every operation to `work_tree`, reading blob content for
    /// creates from `odb`. Parent directories for creates are made as
    /// needed; directories left empty by a removal are pruned afterward.
    pub fn apply(&self, odb: &ObjectDatabase, work_tree: &Path) -> Result<(), CheckoutError> {
        for path in &self.rms {
            let abs = work_tree.join(path.to_str_lossy().as_ref());
            match fs::remove_file(&abs) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        for (path, mode, oid) in &self.creates {
            let abs = work_tree.join(path.to_str_lossy().as_ref());
            if let Some(parent) = abs.parent() {
                fs::create_dir_all(parent)?;
            }

            let content = match odb.read(oid)?.ok_or(git_odb::OdbError::NotFound(*oid))? {
                Object::Blob(blob) => blob.data,
                other => {
                    return Err(CheckoutError::Io(std::io::Error::other(format!(
                        "expected blob at {path}, found {other:?}",
                        path = path.to_str_lossy()
                    ))))
                }
            };

            write_worktree_file(&abs, *mode, &content)?;
        }

        prune_empty_parents(work_tree, self.rms.iter().chain(self.creates.iter().map(|(p, _, _)| p)));

        Ok(())
    }
}

#[cfg(unix)]
fn write_worktree_file(path: &Path, mode: FileMode, content: &[u8]) -> Result<(), CheckoutError> {
    use std::os::unix::fs::PermissionsExt;

    if mode == FileMode::Symlink {
        let target = std::str::from_utf8(content).unwrap_or_default();
        std::os::unix::fs::symlink(target, path)?;
        return Ok(());
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(content)?;
    if mode == FileMode::Executable {
        file.set_permissions(fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn write_worktree_file(path: &Path, _mode: FileMode, content: &[u8]) -> Result<(), CheckoutError> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(content)?;
    Ok(())
}

/// Git trees never record empty directories, so removals are the only
/// source of directories that might need pruning: walk up from each
/// touched path's parent and remove directories left with no entries.
fn prune_empty_parents<'a>(work_tree: &Path, paths: impl Iterator<Item = &'a BString>) {
    let mut dirs: Vec<PathBuf> = paths
        .filter_map(|p| {
            work_tree
                .join(p.to_str_lossy().as_ref())
                .parent()
                .map(Path::to_path_buf)
        })
        .collect();
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    dirs.dedup();

    for dir in dirs {
        let mut dir = dir;
        while dir != work_tree && dir.starts_with(work_tree) {
            match fs::read_dir(&dir) {
                Ok(mut entries) if entries.next().is_none() => {
                    if fs::remove_dir(&dir).is_err() {
                        break;
                    }
                    match dir.parent() {
                        Some(parent) => dir = parent.to_path_buf(),
                        None => break,
                    }
                }
                _ => break,
            }
        }
    }
}
