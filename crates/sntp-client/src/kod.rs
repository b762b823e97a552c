// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Persistent Kiss-o'-Death store.
//!
//! Records which servers told this client to go away, so that later runs do
//! not contact them again. The file holds one record per line:
//!
//! ```text
//! 0000000065920080 DENY time.example.com
//! ```
//!
//! that is, a 16-digit lowercase hex Unix timestamp, the kiss code, and the
//! hostname, separated by single spaces.
//!
//! Loading never fails: an unreadable or corrupt file is logged and yields an
//! empty (or truncated) store. A store with unsaved changes writes itself
//! back when dropped.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sntp_proto::protocol::KissCode;
use tracing::{debug, warn};

/// Default location of the KoD file.
pub const DEFAULT_KOD_PATH: &str = "/var/db/ntp-kod";

/// Longest hostname kept in a record, in bytes.
pub const MAX_HOSTNAME_LEN: usize = 254;

/// One "do not contact" advisory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KodEntry {
    /// The server hostname as given on the command line.
    pub hostname: String,
    /// The kiss code the server sent.
    pub kind: KissCode,
    /// When the advisory was recorded, in Unix seconds.
    pub timestamp: u64,
}

/// Kiss-o'-Death records, sorted by hostname, backed by a file.
#[derive(Debug)]
pub struct KodStore {
    path: Option<PathBuf>,
    entries: Vec<KodEntry>,
    dirty: bool,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Whether writes to `path` are discarded by the system.
fn is_sink(path: &Path) -> bool {
    if cfg!(windows) {
        path.as_os_str().eq_ignore_ascii_case("NUL")
    } else {
        path == Path::new("/dev/null")
    }
}

fn truncate_hostname(hostname: &str) -> &str {
    if hostname.len() <= MAX_HOSTNAME_LEN {
        return hostname;
    }
    let mut end = MAX_HOSTNAME_LEN;
    while !hostname.is_char_boundary(end) {
        end -= 1;
    }
    &hostname[..end]
}

impl KodStore {
    /// A store that lives only in memory and is never written.
    pub fn in_memory() -> Self {
        KodStore {
            path: None,
            entries: Vec::new(),
            dirty: false,
        }
    }

    /// Load the store from `path`.
    ///
    /// A null device yields an empty store whose writes are discarded. A
    /// missing file yields an empty store that will be created on persist.
    /// Read errors and corrupt files are logged and yield an empty store; a
    /// malformed record stops the load, keeping the records before it.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if is_sink(path) {
            debug!(path = %path.display(), "KoD store is a null device");
            return KodStore::in_memory();
        }

        let mut store = KodStore {
            path: Some(path.to_path_buf()),
            entries: Vec::new(),
            dirty: false,
        };

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no KoD file, starting empty");
                return store;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read KoD file");
                return store;
            }
        };

        // First pass: every line must be complete before any record is trusted.
        let expected = text.lines().filter(|l| !l.trim().is_empty()).count();
        if !text.is_empty() && !text.ends_with('\n') {
            warn!(path = %path.display(), "KoD file corrupt: last line is incomplete");
            return store;
        }

        // Second pass: parse exactly the counted records.
        for (idx, line) in text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .take(expected)
        {
            match parse_record(line) {
                Some(entry) => store.entries.push(entry),
                None => {
                    warn!(
                        path = %path.display(),
                        line = idx + 1,
                        "malformed KoD record, ignoring the rest of the file"
                    );
                    break;
                }
            }
        }

        store.entries.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        debug!(path = %path.display(), entries = store.entries.len(), "loaded KoD file");
        store
    }

    /// The backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All records, sorted by hostname.
    pub fn entries(&self) -> &[KodEntry] {
        &self.entries
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether there are changes not yet written to the file.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn range_of(&self, hostname: &str) -> std::ops::Range<usize> {
        let start = self
            .entries
            .partition_point(|e| e.hostname.as_str() < hostname);
        let end = self
            .entries
            .partition_point(|e| e.hostname.as_str() <= hostname);
        start..end
    }

    /// All records for exactly `hostname`.
    pub fn search(&self, hostname: &str) -> Vec<&KodEntry> {
        let hostname = truncate_hostname(hostname);
        self.entries[self.range_of(hostname)].iter().collect()
    }

    /// Record `kind` for `hostname` at the current time.
    pub fn add(&mut self, hostname: &str, kind: KissCode) -> bool {
        self.add_at(hostname, kind, unix_now())
    }

    /// Record `kind` for `hostname` at `timestamp`.
    ///
    /// An existing record for the host is updated in place rather than
    /// duplicated. Returns `false`, leaving the store unchanged, if the
    /// hostname is empty or contains whitespace, since such a record could
    /// not be read back from the file.
    pub fn add_at(&mut self, hostname: &str, kind: KissCode, timestamp: u64) -> bool {
        let hostname = truncate_hostname(hostname);
        if hostname.is_empty() || hostname.contains(char::is_whitespace) {
            warn!(hostname, %kind, "refusing KoD record for unstorable hostname");
            return false;
        }
        let range = self.range_of(hostname);
        if !range.is_empty() {
            let existing = &mut self.entries[range.start];
            existing.kind = kind;
            existing.timestamp = timestamp;
        } else {
            self.entries.insert(
                range.start,
                KodEntry {
                    hostname: hostname.to_string(),
                    kind,
                    timestamp,
                },
            );
        }
        self.dirty = true;
        true
    }

    /// Remove the first record matching both `hostname` and `kind`.
    ///
    /// Returns whether a record was removed.
    pub fn delete(&mut self, hostname: &str, kind: KissCode) -> bool {
        let hostname = truncate_hostname(hostname);
        let range = self.range_of(hostname);
        let found = self.entries[range.clone()]
            .iter()
            .position(|e| e.kind == kind)
            .map(|pos| range.start + pos);
        match found {
            Some(idx) => {
                self.entries.remove(idx);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Write all records to the backing file.
    ///
    /// A store without a file (in memory, or a null device) succeeds
    /// without writing.
    pub fn persist(&mut self) -> io::Result<()> {
        let Some(path) = &self.path else {
            self.dirty = false;
            return Ok(());
        };

        let mut out = String::new();
        for entry in &self.entries {
            // Writing to a String cannot fail.
            let _ = writeln!(
                out,
                "{:016x} {} {}",
                entry.timestamp, entry.kind, entry.hostname
            );
        }
        std::fs::write(path, out)?;
        debug!(path = %path.display(), entries = self.entries.len(), "wrote KoD file");
        self.dirty = false;
        Ok(())
    }
}

impl Drop for KodStore {
    fn drop(&mut self) {
        if self.dirty {
            if let Err(e) = self.persist() {
                warn!(error = %e, "cannot write KoD file");
            }
        }
    }
}

/// Parse `<hex timestamp> <kiss code> <hostname>`.
fn parse_record(line: &str) -> Option<KodEntry> {
    let mut fields = line.split_whitespace();
    let timestamp = u64::from_str_radix(fields.next()?, 16).ok()?;
    let kind: KissCode = fields.next()?.parse().ok()?;
    let hostname = fields.next()?;
    if hostname.len() > MAX_HOSTNAME_LEN {
        return None;
    }
    Some(KodEntry {
        hostname: hostname.to_string(),
        kind,
        timestamp,
    })
}
