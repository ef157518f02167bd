//! Tar archive helpers
//!
//! Entry names inside builder layers are absolute (`/buildpacks/...`), which
//! `tar::Header::set_path` refuses, so names are written into the header
//! verbatim here. Names longer than the header field get a GNU long-name
//! record in front of the entry.

use std::io::{self, Read, Write};

use tar::{EntryType, Header};

use crate::error::{BuilderError, BuilderResult};

const GNU_LONG_LINK: &[u8] = b"././@LongLink";

/// Lexically clean a slash-separated path.
///
/// Collapses repeated separators, drops `.` elements and resolves `..`
/// against the preceding element. Rooted paths stay rooted, `..` at the root
/// is dropped, and an empty result becomes `.`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join `name` onto `base` and clean the result.
pub fn join_clean(base: &str, name: &str) -> String {
    clean_path(&format!("{}/{}", base, name))
}

/// Strip the single top-level directory from an archive entry name.
///
/// Returns the file name when the cleaned entry path is exactly one
/// directory component followed by one file component (`lifecycle/detector`),
/// and `None` for every other shape.
pub fn top_level_rebase(entry_name: &str) -> Option<String> {
    let cleaned = clean_path(entry_name);
    let (dir, file) = cleaned.split_once('/')?;
    if dir.is_empty() || file.is_empty() || file.contains('/') {
        return None;
    }
    Some(file.to_string())
}

/// Entry path as written in the archive (long names resolved by `tar`).
pub fn entry_name<R: Read>(entry: &tar::Entry<'_, R>) -> String {
    String::from_utf8_lossy(&entry.path_bytes()).into_owned()
}

/// Read the contents of the entry named `name` from a tar stream.
///
/// Names are compared after cleaning, so `./buildpack.toml` matches
/// `buildpack.toml`. Returns `None` when no such entry exists.
pub fn read_tar_entry<R: Read>(reader: R, name: &str) -> BuilderResult<Option<Vec<u8>>> {
    let wanted = clean_path(name);
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| BuilderError::io("reading tar entries", e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| BuilderError::io("failed to get next tar entry", e))?;
        if clean_path(&entry_name(&entry)) != wanted {
            continue;
        }

        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|e| BuilderError::io(format!("reading tar entry '{}'", wanted), e))?;
        return Ok(Some(buf));
    }

    Ok(None)
}

/// Header for a directory entry.
pub fn dir_header(mtime: u64, uid: u64, gid: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Directory);
    header.set_mode(0o755);
    header.set_size(0);
    header.set_mtime(mtime);
    header.set_uid(uid);
    header.set_gid(gid);
    header
}

/// Header for a regular file entry of `size` bytes.
pub fn file_header(size: u64, mode: u32, mtime: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(mtime);
    header.set_uid(0);
    header.set_gid(0);
    header
}

/// Header for a symbolic link entry owned by root.
///
/// The target is supplied to [`append_link`].
pub fn symlink_header(mtime: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Symlink);
    header.set_mode(0o644);
    header.set_size(0);
    header.set_mtime(mtime);
    header.set_uid(0);
    header.set_gid(0);
    header
}

/// Copy the fields of a source entry header into a fresh GNU header.
///
/// Name and link target are left empty; they are supplied to
/// [`append_entry`] or [`append_link`].
pub fn copy_header<R: Read>(entry: &tar::Entry<'_, R>) -> io::Result<Header> {
    let src = entry.header();
    let mut header = Header::new_gnu();
    header.set_entry_type(src.entry_type());
    header.set_mode(src.mode()?);
    header.set_size(src.size()?);
    header.set_mtime(src.mtime()?);
    header.set_uid(src.uid()?);
    header.set_gid(src.gid()?);
    Ok(header)
}

/// Link target of an entry (long targets resolved by `tar`).
pub fn entry_link<R: Read>(entry: &tar::Entry<'_, R>) -> Option<String> {
    entry
        .link_name_bytes()
        .map(|link| String::from_utf8_lossy(&link).into_owned())
}

/// Append `data` under `name`, writing the name into the header verbatim.
pub fn append_entry<W: Write, R: Read>(
    tw: &mut tar::Builder<W>,
    header: &mut Header,
    name: &str,
    data: R,
) -> io::Result<()> {
    let bytes = name.as_bytes();

    if bytes.len() > header.as_old().name.len() {
        append_long_record(tw, EntryType::GNULongName, bytes)?;
    }

    if let Some(ustar) = header.as_ustar_mut() {
        ustar.prefix = [0; 155];
    }

    write_field(&mut header.as_old_mut().name, bytes);

    header.set_cksum();
    tw.append(header, data)
}

/// Append a link entry under `name` pointing at `target`, both verbatim.
///
/// Targets longer than the header field get a GNU long-link record.
pub fn append_link<W: Write>(
    tw: &mut tar::Builder<W>,
    header: &mut Header,
    name: &str,
    target: &str,
) -> io::Result<()> {
    let bytes = target.as_bytes();

    if bytes.len() > header.as_old().linkname.len() {
        append_long_record(tw, EntryType::GNULongLink, bytes)?;
    }
    write_field(&mut header.as_old_mut().linkname, bytes);

    append_entry(tw, header, name, io::empty())
}

fn append_long_record<W: Write>(
    tw: &mut tar::Builder<W>,
    kind: EntryType,
    bytes: &[u8],
) -> io::Result<()> {
    let mut long = Header::new_gnu();
    long.as_old_mut().name[..GNU_LONG_LINK.len()].copy_from_slice(GNU_LONG_LINK);
    long.set_mode(0o644);
    long.set_uid(0);
    long.set_gid(0);
    long.set_mtime(0);
    long.set_size(bytes.len() as u64 + 1);
    long.set_entry_type(kind);
    long.set_cksum();
    tw.append(&long, bytes.chain(io::repeat(0).take(1)))
}

// Truncates; the full value travels in the long record.
fn write_field(slot: &mut [u8], bytes: &[u8]) {
    slot.fill(0);
    let len = bytes.len().min(slot.len());
    slot[..len].copy_from_slice(&bytes[..len]);
}

/// Seconds since the epoch, captured once per archive.
pub fn capture_time() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
