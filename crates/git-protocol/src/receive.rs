//! Receive-pack: the server side of push.
//!
//! Reads the client's pkt-line command list, unpacks the pack stream that
//! follows into the object database, runs a pre-receive hook chain, then
//! classifies and applies the commands as a single [`BatchRefUpdate`].

use std::collections::HashMap;
use std::io::Read;

use bstr::{BString, ByteSlice};
use flate2::read::ZlibDecoder;
use git_hash::ObjectId;
use git_object::{Object, ObjectType};
use git_odb::ObjectDatabase;
use git_pack::entry::parse_entry_header;
use git_pack::{delta, PackEntryType};
use git_ref::{BatchOptions, BatchRefUpdate, CommandResult, FastForwardCheck, RefName, ReceiveCommand};

use crate::pktline::{PktLineReader, PktLineWriter};
use crate::ProtocolError;

/// A single `old new name` line off the client's command list, before its
/// name has been validated into a [`RefName`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCommandLine {
    pub old_oid: ObjectId,
    pub new_oid: ObjectId,
    pub ref_name: BString,
}

/// A hook consulted before any ref is touched. Returning `Err` aborts the
/// whole push with every command reported as rejected.
pub trait PreReceiveHook {
    fn run(&self, commands: &[PushCommandLine]) -> Result<(), String>;
}

impl<F> PreReceiveHook for F
where
    F: Fn(&[PushCommandLine]) -> Result<(), String>,
{
    fn run(&self, commands: &[PushCommandLine]) -> Result<(), String> {
        self(commands)
    }
}

/// Options controlling a receive-pack run.
#[derive(Debug, Clone)]
pub struct ReceiveOptions {
    pub allow_non_fast_forward: bool,
    pub allow_deletes: bool,
    pub atomic: bool,
    pub dry_run: bool,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            allow_non_fast_forward: false,
            allow_deletes: true,
            atomic: false,
            dry_run: false,
        }
    }
}

/// Outcome of a receive-pack run: the unpack status plus a per-command
/// result, in the same order the commands were read in.
#[derive(Debug)]
pub struct ReceiveReport {
    pub unpack_ok: bool,
    pub commands: Vec<(BString, CommandResult)>,
    /// Set when a pre-receive hook rejected the whole push.
    pub hook_rejection: Option<String>,
}

/// Parse the `old new name[\0caps]...` command list out of pkt-lines already
/// split on the terminating flush packet.
pub fn parse_command_list(lines: &[Vec<u8>]) -> Result<Vec<PushCommandLine>, ProtocolError> {
    let mut commands = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let text = String::from_utf8_lossy(line);
        let text = text.trim_end_matches(['\n', '\0']);
        // The first line may carry a NUL-separated capability list.
        let body = text.split('\0').next().unwrap_or(text);
        let mut parts = body.splitn(3, ' ');
        let old = parts
            .next()
            .ok_or_else(|| ProtocolError::Protocol(format!("command {i}: missing old-oid")))?;
        let new = parts
            .next()
            .ok_or_else(|| ProtocolError::Protocol(format!("command {i}: missing new-oid")))?;
        let name = parts
            .next()
            .ok_or_else(|| ProtocolError::Protocol(format!("command {i}: missing ref name")))?;

        let old_oid = ObjectId::from_hex(old)
            .map_err(|_| ProtocolError::Protocol(format!("command {i}: bad old-oid")))?;
        let new_oid = ObjectId::from_hex(new)
            .map_err(|_| ProtocolError::Protocol(format!("command {i}: bad new-oid")))?;

        commands.push(PushCommandLine {
            old_oid,
            new_oid,
            ref_name: BString::from(name),
        });
    }
    Ok(commands)
}

/// Sequentially unpack every object in a raw (non-side-band) pack stream
/// into `odb`, resolving OFS_DELTA/REF_DELTA entries as they're encountered.
/// REF_DELTA bases absent from the stream (thin packs) are looked up in
/// `odb` directly.
///
/// Objects are always unpacked to loose storage rather than kept as a
/// standalone indexed pack; see the commit history for why.
pub fn unpack_objects(data: &[u8], odb: &ObjectDatabase) -> Result<Vec<ObjectId>, ProtocolError> {
    if data.len() < 12 || &data[0..4] != b"PACK" {
        return Err(ProtocolError::Protocol("not a pack stream".into()));
    }
    let num_objects = u32::from_be_bytes([data[8], data[9], data[10], data[11]]) as usize;

    let mut by_offset: HashMap<u64, (ObjectType, Vec<u8>)> = HashMap::with_capacity(num_objects);
    let mut by_oid: HashMap<ObjectId, (ObjectType, Vec<u8>)> = HashMap::with_capacity(num_objects);
    let mut inserted = Vec::with_capacity(num_objects);

    let mut offset = 12u64;
    for i in 0..num_objects {
        let entry = parse_entry_header(data, offset)
            .map_err(|e| ProtocolError::Protocol(format!("entry {i}: {e}")))?;

        let compressed_start = entry.data_offset as usize;
        let mut decoder = ZlibDecoder::new(&data[compressed_start..]);
        let mut payload = Vec::with_capacity(entry.uncompressed_size);
        decoder
            .read_to_end(&mut payload)
            .map_err(ProtocolError::Io)?;
        let consumed = decoder.total_in();

        let (obj_type, content) = match entry.entry_type {
            PackEntryType::OfsDelta { base_offset } => {
                let (base_type, base_data) = by_offset.get(&base_offset).cloned().ok_or_else(|| {
                    ProtocolError::Protocol(format!("entry {i}: ofs-delta base not found"))
                })?;
                let resolved = delta::apply::apply_delta(&base_data, &payload)
                    .map_err(|e| ProtocolError::Protocol(format!("entry {i}: {e}")))?;
                (base_type, resolved)
            }
            PackEntryType::RefDelta { base_oid } => {
                let (base_type, base_data) = resolve_ref_delta_base(odb, &by_oid, &base_oid, i)?;
                let resolved = delta::apply::apply_delta(&base_data, &payload)
                    .map_err(|e| ProtocolError::Protocol(format!("entry {i}: {e}")))?;
                (base_type, resolved)
            }
            other => (
                other
                    .to_object_type()
                    .expect("non-delta entries carry a concrete object type"),
                payload,
            ),
        };

        let oid = odb
            .write_raw(obj_type, &content)
            .map_err(|e| ProtocolError::Protocol(format!("entry {i}: write failed: {e}")))?;
        by_offset.insert(offset, (obj_type, content.clone()));
        by_oid.insert(oid, (obj_type, content));
        inserted.push(oid);

        offset = compressed_start as u64 + consumed;
    }

    Ok(inserted)
}

fn resolve_ref_delta_base(
    odb: &ObjectDatabase,
    by_oid: &HashMap<ObjectId, (ObjectType, Vec<u8>)>,
    base_oid: &ObjectId,
    entry_index: usize,
) -> Result<(ObjectType, Vec<u8>), ProtocolError> {
    if let Some(found) = by_oid.get(base_oid) {
        return Ok(found.clone());
    }
    match odb.read(base_oid) {
        Ok(Some(obj)) => Ok((obj.object_type(), obj.serialize_content())),
        Ok(None) => Err(ProtocolError::Protocol(format!(
            "entry {entry_index}: missing ref-delta base {base_oid}"
        ))),
        Err(e) => Err(ProtocolError::Protocol(format!(
            "entry {entry_index}: {e}"
        ))),
    }
}

/// Drive a complete receive-pack exchange over `reader`/`writer`: read the
/// command list and pack stream, run `hooks`, classify every command through
/// `ff_check`, and apply the result via `refs`.
pub fn receive_pack(
    reader: impl Read,
    mut writer: impl std::io::Write,
    odb: &ObjectDatabase,
    refs: &git_ref::FilesRefStore,
    current_branch: Option<RefName>,
    hooks: &[Box<dyn PreReceiveHook>],
    ff_check: &dyn FastForwardCheck,
    opts: &ReceiveOptions,
) -> Result<ReceiveReport, ProtocolError> {
    let mut pkt_reader = PktLineReader::new(reader);
    let command_lines = pkt_reader.read_until_flush()?;
    let commands = parse_command_list(&command_lines)?;

    let mut pack_data = Vec::new();
    pkt_reader.inner_mut().read_to_end(&mut pack_data)?;

    let unpack_ok = if pack_data.is_empty() {
        true
    } else {
        unpack_objects(&pack_data, odb).is_ok()
    };

    let report = if !unpack_ok {
        ReceiveReport {
            unpack_ok: false,
            commands: commands
                .iter()
                .map(|c| (c.ref_name.clone(), CommandResult::RejectedOtherReason))
                .collect(),
            hook_rejection: None,
        }
    } else if let Err(reason) = run_hooks(hooks, &commands) {
        ReceiveReport {
            unpack_ok: true,
            commands: commands
                .iter()
                .map(|c| (c.ref_name.clone(), CommandResult::RejectedOtherReason))
                .collect(),
            hook_rejection: Some(reason),
        }
    } else {
        classify_and_apply(&commands, odb, refs, current_branch, ff_check, opts)?
    };

    write_status_report(&mut writer, &report)?;
    Ok(report)
}

fn run_hooks(hooks: &[Box<dyn PreReceiveHook>], commands: &[PushCommandLine]) -> Result<(), String> {
    for hook in hooks {
        hook.run(commands)?;
    }
    Ok(())
}

fn classify_and_apply(
    commands: &[PushCommandLine],
    odb: &ObjectDatabase,
    refs: &git_ref::FilesRefStore,
    current_branch: Option<RefName>,
    ff_check: &dyn FastForwardCheck,
    opts: &ReceiveOptions,
) -> Result<ReceiveReport, ProtocolError> {
    let mut receive_commands = Vec::with_capacity(commands.len());
    for cmd in commands {
        let name = RefName::new(cmd.ref_name.clone())
            .map_err(|e| ProtocolError::InvalidRefSpec(e.to_string()))?;
        receive_commands.push(ReceiveCommand::new(name, cmd.old_oid, cmd.new_oid));
    }

    let batch_opts = BatchOptions {
        allow_non_fast_forward: opts.allow_non_fast_forward,
        allow_deletes: opts.allow_deletes,
        allow_creates: true,
        atomic: opts.atomic,
        dry_run: opts.dry_run,
        current_branch,
    };

    let batch = BatchRefUpdate::new(refs);
    let results = batch.execute(
        &receive_commands,
        ff_check,
        &|oid: &ObjectId| odb.contains(oid),
        &batch_opts,
    )?;

    Ok(ReceiveReport {
        unpack_ok: true,
        commands: commands
            .iter()
            .zip(results)
            .map(|(cmd, result)| (cmd.ref_name.clone(), result))
            .collect(),
        hook_rejection: None,
    })
}

fn write_status_report(
    writer: &mut impl std::io::Write,
    report: &ReceiveReport,
) -> Result<(), ProtocolError> {
    let mut pkt_writer = PktLineWriter::new(writer);
    pkt_writer.write_text(if report.unpack_ok {
        "unpack ok"
    } else {
        "unpack error"
    })?;
    for (name, result) in &report.commands {
        let name = name.to_str_lossy();
        match result {
            CommandResult::Ok => pkt_writer.write_text(&format!("ok {name}"))?,
            other => pkt_writer.write_text(&format!("ng {name} {}", reject_reason(*other)))?,
        }
    }
    pkt_writer.write_flush()?;
    Ok(())
}

fn reject_reason(result: CommandResult) -> &'static str {
    match result {
        CommandResult::Ok => "ok",
        CommandResult::NotAttempted => "not attempted",
        CommandResult::RejectedNonFastForward => "non-fast-forward",
        CommandResult::RejectedNoCreate => "creation forbidden",
        CommandResult::RejectedNoDelete => "deletion forbidden",
        CommandResult::RejectedCurrentBranch => "branch is currently checked out",
        CommandResult::RejectedMissingObject => "missing object",
        CommandResult::RejectedOtherReason => "hook declined",
        CommandResult::LockFailure => "failed to lock",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_hash::HashAlgorithm;
    use git_object::Blob;

    fn odb_in(dir: &std::path::Path) -> ObjectDatabase {
        let objects_dir = dir.join("objects");
        std::fs::create_dir_all(objects_dir.join("pack")).unwrap();
        ObjectDatabase::open(&objects_dir).unwrap()
    }

    #[test]
    fn parses_single_command_with_capabilities() {
        let line = b"0000000000000000000000000000000000000000 aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa refs/heads/main\0report-status\n".to_vec();
        let parsed = parse_command_list(&[line]).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].ref_name, BString::from("refs/heads/main"));
        assert!(parsed[0].old_oid.is_null());
    }

    #[test]
    fn unpacks_single_blob_pack() {
        let dir = tempfile::tempdir().unwrap();
        let odb = odb_in(dir.path());
        let (pack_path, _idx, _checksum) =
            git_pack::write::create_pack(dir.path(), "incoming", &[(ObjectType::Blob, b"hi".to_vec())])
                .unwrap();
        let pack_bytes = std::fs::read(pack_path).unwrap();

        let oids = unpack_objects(&pack_bytes, &odb).unwrap();
        assert_eq!(oids.len(), 1);

        let expected = git_hash::hasher::Hasher::hash_object(HashAlgorithm::Sha1, "blob", b"hi").unwrap();
        assert_eq!(oids[0], expected);
        let stored = odb.read(&expected).unwrap().unwrap();
        assert_eq!(stored, Object::Blob(Blob::new(b"hi".to_vec())));
    }

    #[test]
    fn reject_reason_strings_cover_every_variant() {
        for variant in [
            CommandResult::Ok,
            CommandResult::NotAttempted,
            CommandResult::RejectedNonFastForward,
            CommandResult::RejectedNoCreate,
            CommandResult::RejectedNoDelete,
            CommandResult::RejectedCurrentBranch,
            CommandResult::RejectedMissingObject,
            CommandResult::RejectedOtherReason,
            CommandResult::LockFailure,
        ] {
            assert!(!reject_reason(variant).is_empty());
        }
    }
}
