//! Append-only event journal with checksums
//!
//! Every accepted insert is framed and appended here before it becomes
//! visible in the in-memory tables, so a restarted process rebuilds the
//! exact table state by replay. A torn tail entry (crash mid-append) is
//! detected by length/checksum mismatch and dropped, not treated as fatal.
//!
//! # Binary Format (per entry)
//! ```text
//! [payload_len: u32]
//! [payload: bincode(JournalRecord)]
//! [checksum: u32]  // CRC32C over payload
//! ```

use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use types::events::{
    CommitmentProcessed, EncryptedCommitment, OpenedCommitment, SettlementTransaction,
};

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ── Records ─────────────────────────────────────────────────────────

/// One durably accepted insert, tagged by table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalRecord {
    Encrypted(EncryptedCommitment),
    Opened(OpenedCommitment),
    Processed(CommitmentProcessed),
    Settlement(SettlementTransaction),
}

// ── Writer ──────────────────────────────────────────────────────────

const JOURNAL_FILE: &str = "events.journal";

/// Append-only journal writer. One instance owns the file handle.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
    entries_written: u64,
}

impl Journal {
    /// Open (or create) the journal inside `dir` for appending.
    pub fn open(dir: &Path) -> Result<Self, JournalError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(JOURNAL_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            entries_written: 0,
        })
    }

    /// Append one record and make it durable before returning.
    pub fn append(&mut self, record: &JournalRecord) -> Result<(), JournalError> {
        let payload =
            bincode::serialize(record).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let checksum = crc32c(&payload);

        self.writer
            .write_all(&(payload.len() as u32).to_le_bytes())?;
        self.writer.write_all(&payload)?;
        self.writer.write_all(&checksum.to_le_bytes())?;
        self.sync()?;

        self.entries_written += 1;
        Ok(())
    }

    /// Flush buffered bytes and fsync the file.
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay every intact record from the journal in `dir`.
    ///
    /// Stops at the first torn or corrupt entry; everything before it is
    /// returned. A missing file is an empty journal.
    pub fn replay(dir: &Path) -> Result<Vec<JournalRecord>, JournalError> {
        let path = dir.join(JOURNAL_FILE);
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset + 4 <= buf.len() {
            let len = u32::from_le_bytes([
                buf[offset],
                buf[offset + 1],
                buf[offset + 2],
                buf[offset + 3],
            ]) as usize;
            let payload_start = offset + 4;
            let checksum_start = payload_start + len;
            let entry_end = checksum_start + 4;
            if entry_end > buf.len() {
                warn!(offset, "torn journal tail, dropping partial entry");
                break;
            }

            let payload = &buf[payload_start..checksum_start];
            let stored_checksum = u32::from_le_bytes([
                buf[checksum_start],
                buf[checksum_start + 1],
                buf[checksum_start + 2],
                buf[checksum_start + 3],
            ]);
            if crc32c(payload) != stored_checksum {
                warn!(offset, "journal checksum mismatch, stopping replay");
                break;
            }

            match bincode::deserialize::<JournalRecord>(payload) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(offset, error = %e, "undecodable journal entry, stopping replay");
                    break;
                }
            }
            offset = entry_end;
        }

        info!(
            path = %path.display(),
            entries = records.len(),
            "journal replay complete"
        );
        Ok(records)
    }
}
