//! Batch ref updates, the core of receive-pack: a list of proposed
//! `(old, new, name)` commands is classified against current ref state and
//! applied as a unit.
//!
//! Fast-forward classification needs commit-graph reachability, which lives
//! above this crate (`git-revwalk` depends on `git-repository`, which depends
//! on `git-ref`), so it is injected by the caller through [`FastForwardCheck`]
//! rather than pulled in as a dependency.

use git_hash::ObjectId;

use crate::error::RefError;
use crate::files::FilesRefStore;
use crate::name::RefName;
use crate::store::{RefStore, RefTransaction};

/// The kind of change a command represents, inferred from its old/new ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Create,
    Update,
    Delete,
}

/// A single proposed ref update, as read off a receive-pack command line.
#[derive(Debug, Clone)]
pub struct ReceiveCommand {
    pub name: RefName,
    pub old_oid: ObjectId,
    pub new_oid: ObjectId,
}

impl ReceiveCommand {
    pub fn new(name: RefName, old_oid: ObjectId, new_oid: ObjectId) -> Self {
        Self {
            name,
            old_oid,
            new_oid,
        }
    }

    pub fn kind(&self) -> CommandKind {
        if self.old_oid.is_null() {
            CommandKind::Create
        } else if self.new_oid.is_null() {
            CommandKind::Delete
        } else {
            CommandKind::Update
        }
    }
}

/// Per-command outcome of a batch update, matching the codes a receive-pack
/// status report surfaces to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    NotAttempted,
    Ok,
    RejectedNonFastForward,
    RejectedNoCreate,
    RejectedNoDelete,
    RejectedCurrentBranch,
    RejectedMissingObject,
    RejectedOtherReason,
    LockFailure,
}

/// Injected ancestor-reachability check: is `old` an ancestor of `new`?
pub trait FastForwardCheck {
    fn is_fast_forward(&self, old: &ObjectId, new: &ObjectId) -> Result<bool, RefError>;
}

impl<F> FastForwardCheck for F
where
    F: Fn(&ObjectId, &ObjectId) -> Result<bool, RefError>,
{
    fn is_fast_forward(&self, old: &ObjectId, new: &ObjectId) -> Result<bool, RefError> {
        self(old, new)
    }
}

/// Policy controlling how a batch is classified and applied.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub allow_non_fast_forward: bool,
    pub allow_deletes: bool,
    pub allow_creates: bool,
    /// All-or-nothing: if any command is rejected, none are applied and the
    /// commands that would otherwise have succeeded are reported as
    /// `RejectedOtherReason`.
    pub atomic: bool,
    /// Classify every command but touch no storage; `NotAttempted` commands
    /// become whatever they would have resolved to.
    pub dry_run: bool,
    /// The ref HEAD currently points at, if any; deleting it is rejected
    /// regardless of `allow_deletes`.
    pub current_branch: Option<RefName>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            allow_non_fast_forward: false,
            allow_deletes: true,
            allow_creates: true,
            atomic: false,
            dry_run: false,
            current_branch: None,
        }
    }
}

/// Applies a batch of [`ReceiveCommand`]s against a [`FilesRefStore`].
pub struct BatchRefUpdate<'a> {
    store: &'a FilesRefStore,
}

impl<'a> BatchRefUpdate<'a> {
    pub fn new(store: &'a FilesRefStore) -> Self {
        Self { store }
    }

    /// Classify and apply `commands`. `object_exists` is consulted for the
    /// `new_oid` of create/update commands; `ff_check` is consulted only for
    /// updates when `allow_non_fast_forward` is false.
    pub fn execute(
        &self,
        commands: &[ReceiveCommand],
        ff_check: &dyn FastForwardCheck,
        object_exists: &dyn Fn(&ObjectId) -> bool,
        opts: &BatchOptions,
    ) -> Result<Vec<CommandResult>, RefError> {
        let mut results = Vec::with_capacity(commands.len());
        for cmd in commands {
            results.push(self.classify(cmd, ff_check, object_exists, opts)?);
        }

        if opts.atomic && results.iter().any(|r| *r != CommandResult::Ok) {
            for r in results.iter_mut() {
                if *r == CommandResult::Ok {
                    *r = CommandResult::RejectedOtherReason;
                }
            }
            return Ok(results);
        }

        if opts.dry_run {
            return Ok(results);
        }

        if opts.atomic {
            let mut tx = RefTransaction::new();
            for cmd in commands {
                append_action(&mut tx, cmd);
            }
            if let Err(e) = self.store.commit_transaction(tx) {
                for r in results.iter_mut() {
                    *r = CommandResult::LockFailure;
                }
                return Err(e);
            }
        } else {
            for (i, cmd) in commands.iter().enumerate() {
                if results[i] != CommandResult::Ok {
                    continue;
                }
                let mut tx = RefTransaction::new();
                append_action(&mut tx, cmd);
                if self.store.commit_transaction(tx).is_err() {
                    results[i] = CommandResult::RejectedOtherReason;
                }
            }
        }

        Ok(results)
    }

    fn classify(
        &self,
        cmd: &ReceiveCommand,
        ff_check: &dyn FastForwardCheck,
        object_exists: &dyn Fn(&ObjectId) -> bool,
        opts: &BatchOptions,
    ) -> Result<CommandResult, RefError> {
        let kind = cmd.kind();

        if kind == CommandKind::Delete {
            if let Some(current) = &opts.current_branch {
                if *current == cmd.name {
                    return Ok(CommandResult::RejectedCurrentBranch);
                }
            }
            if !opts.allow_deletes {
                return Ok(CommandResult::RejectedNoDelete);
            }
        }

        if kind == CommandKind::Create && !opts.allow_creates {
            return Ok(CommandResult::RejectedNoCreate);
        }

        if kind != CommandKind::Delete && !object_exists(&cmd.new_oid) {
            return Ok(CommandResult::RejectedMissingObject);
        }

        let actual = self
            .store
            .resolve_to_oid(&cmd.name)?
            .unwrap_or(ObjectId::NULL_SHA1);
        if actual != cmd.old_oid {
            return Ok(CommandResult::LockFailure);
        }

        if kind == CommandKind::Update
            && !opts.allow_non_fast_forward
            && !ff_check.is_fast_forward(&cmd.old_oid, &cmd.new_oid)?
        {
            return Ok(CommandResult::RejectedNonFastForward);
        }

        Ok(CommandResult::Ok)
    }
}

fn append_action(tx: &mut RefTransaction, cmd: &ReceiveCommand) {
    match cmd.kind() {
        CommandKind::Create => tx.create(cmd.name.clone(), cmd.new_oid, "update by push"),
        CommandKind::Update => {
            tx.update(cmd.name.clone(), cmd.old_oid, cmd.new_oid, "update by push")
        }
        CommandKind::Delete => tx.delete(cmd.name.clone(), cmd.old_oid, "deleted by push"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BString;
    use git_utils::date::{GitDate, Signature};

    fn store(dir: &std::path::Path) -> FilesRefStore {
        let mut s = FilesRefStore::new(dir);
        s.set_committer(Signature {
            name: BString::from("Test User"),
            email: BString::from("test@example.com"),
            date: GitDate::new(1234567890, 0),
        });
        s
    }

    fn always_ff(_old: &ObjectId, _new: &ObjectId) -> Result<bool, RefError> {
        Ok(true)
    }

    fn always_exists(_: &ObjectId) -> bool {
        true
    }

    #[test]
    fn new_branch_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let batch = BatchRefUpdate::new(&store);

        let new = ObjectId::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let cmd = ReceiveCommand::new(
            RefName::new("refs/heads/feature").unwrap(),
            ObjectId::NULL_SHA1,
            new,
        );

        let results = batch
            .execute(
                &[cmd],
                &always_ff,
                &always_exists,
                &BatchOptions::default(),
            )
            .unwrap();
        assert_eq!(results, vec![CommandResult::Ok]);
        assert_eq!(
            store.resolve_to_oid(&RefName::new("refs/heads/feature").unwrap()).unwrap(),
            Some(new)
        );
    }

    #[test]
    fn non_fast_forward_rejected_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let name = RefName::new("refs/heads/main").unwrap();
        let old = ObjectId::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let new = ObjectId::from_hex("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb").unwrap();
        store.write_ref(&name, &old).unwrap();

        let batch = BatchRefUpdate::new(&store);
        let cmd = ReceiveCommand::new(name.clone(), old, new);

        let results = batch
            .execute(
                &[cmd],
                &(|_: &ObjectId, _: &ObjectId| Ok(false)),
                &always_exists,
                &BatchOptions::default(),
            )
            .unwrap();
        assert_eq!(results, vec![CommandResult::RejectedNonFastForward]);
        assert_eq!(store.resolve_to_oid(&name).unwrap(), Some(old));
    }

    #[test]
    fn stale_old_oid_is_lock_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let name = RefName::new("refs/heads/main").unwrap();
        let real_old = ObjectId::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let claimed_old = ObjectId::from_hex("cccccccccccccccccccccccccccccccccccccccc").unwrap();
        let new = ObjectId::from_hex("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb").unwrap();
        store.write_ref(&name, &real_old).unwrap();

        let batch = BatchRefUpdate::new(&store);
        let cmd = ReceiveCommand::new(name, claimed_old, new);

        let results = batch
            .execute(
                &[cmd],
                &always_ff,
                &always_exists,
                &BatchOptions::default(),
            )
            .unwrap();
        assert_eq!(results, vec![CommandResult::LockFailure]);
    }

    #[test]
    fn current_branch_delete_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let name = RefName::new("refs/heads/main").unwrap();
        let oid = ObjectId::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        store.write_ref(&name, &oid).unwrap();

        let batch = BatchRefUpdate::new(&store);
        let cmd = ReceiveCommand::new(name.clone(), oid, ObjectId::NULL_SHA1);
        let opts = BatchOptions {
            current_branch: Some(name),
            ..BatchOptions::default()
        };

        let results = batch
            .execute(&[cmd], &always_ff, &always_exists, &opts)
            .unwrap();
        assert_eq!(results, vec![CommandResult::RejectedCurrentBranch]);
    }

    #[test]
    fn atomic_batch_aborts_entirely_on_one_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let good_name = RefName::new("refs/heads/good").unwrap();
        let bad_name = RefName::new("refs/heads/main").unwrap();
        let old = ObjectId::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let new = ObjectId::from_hex("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb").unwrap();
        store.write_ref(&bad_name, &old).unwrap();

        let batch = BatchRefUpdate::new(&store);
        let good_cmd = ReceiveCommand::new(good_name.clone(), ObjectId::NULL_SHA1, new);
        let bad_cmd = ReceiveCommand::new(bad_name, old, new);

        let opts = BatchOptions {
            atomic: true,
            ..BatchOptions::default()
        };
        let results = batch
            .execute(
                &[good_cmd, bad_cmd],
                &(|_: &ObjectId, _: &ObjectId| Ok(false)),
                &always_exists,
                &opts,
            )
            .unwrap();

        assert_eq!(results[0], CommandResult::RejectedOtherReason);
        assert_eq!(results[1], CommandResult::RejectedNonFastForward);
        assert_eq!(store.resolve_to_oid(&good_name).unwrap(), None);
    }

    #[test]
    fn dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let name = RefName::new("refs/heads/feature").unwrap();
        let new = ObjectId::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        let cmd = ReceiveCommand::new(name.clone(), ObjectId::NULL_SHA1, new);

        let batch = BatchRefUpdate::new(&store);
        let opts = BatchOptions {
            dry_run: true,
            ..BatchOptions::default()
        };
        let results = batch
            .execute(&[cmd], &always_ff, &always_exists, &opts)
            .unwrap();
        assert_eq!(results, vec![CommandResult::Ok]);
        assert_eq!(store.resolve_to_oid(&name).unwrap(), None);
    }
}
