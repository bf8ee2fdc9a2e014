//! File-backed credential store
//!
//! Credential file layout, repeated records with no header or index:
//! ```text
//! <username bytes> LF <32-byte Argon2i hash><16-byte salt> LF
//! ```
//! Lookup is a linear scan from the start of the file: read a username
//! line, then unconditionally the 48-byte hash+salt block and its trailing
//! terminator, then compare. The block is raw binary and may itself contain
//! LF bytes, which is why it is read by length and never scanned.
//!
//! Password changes overwrite the fixed-length block in place at the byte
//! offset tracked during the scan; the username line and record boundaries
//! are never rewritten. Usernames are compared case-sensitively, byte for
//! byte.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Result, StoreError};
use crate::{BLOCK_LEN, HASH_LEN, SALT_LEN};

/// Argon2i passes
const T_COST: u32 = 2;

/// Argon2i memory cost in KiB (64 MiB)
const M_COST: u32 = 64 * 1024;

/// Argon2i lanes
const P_COST: u32 = 1;

/// A record located by the scan: its hash, salt, and the byte offset of
/// the hash+salt block within the file.
#[derive(Debug)]
pub struct FoundRecord {
    /// Byte offset of the hash+salt block (immediately after the
    /// username's terminator)
    pub block_offset: u64,
    /// Stored digest
    pub hash: [u8; HASH_LEN],
    /// Stored salt
    pub salt: [u8; SALT_LEN],
}

/// The credential store.
///
/// Every operation opens the file, performs its scan (and write, if any),
/// and closes it; no handle is held between operations. The in-process
/// mutex serializes the read-scan-write sequences, since the file itself
/// carries no lock.
pub struct PasswdStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PasswdStore {
    /// Create a store backed by the credential file at `path`.
    ///
    /// The file is not touched until the first operation; `add_user`
    /// creates it on demand.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing credential file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether a record with exactly this username exists.
    pub fn user_exists(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.find_user(name)?.is_some())
    }

    /// Verify a password candidate against the stored record.
    ///
    /// Returns false both for an unknown user and for a mismatched
    /// password; the two cases are indistinguishable to callers.
    pub fn verify_password(&self, name: &str, candidate: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(record) = self.find_user(name)? else {
            return Ok(false);
        };

        let candidate = Zeroizing::new(candidate.as_bytes().to_vec());
        let computed = hash_password(&candidate, &record.salt)?;
        Ok(computed.ct_eq(&record.hash).into())
    }

    /// Replace the user's hash+salt block with a freshly salted hash of
    /// `new_password`, in place.
    ///
    /// Returns false if the user was not found. The record keeps its byte
    /// offset and username; only the 48-byte block and its trailing
    /// terminator are rewritten.
    pub fn change_password(&self, name: &str, new_password: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(record) = self.find_user(name)? else {
            return Ok(false);
        };

        let salt = fresh_salt();
        let password = Zeroizing::new(new_password.as_bytes().to_vec());
        let hash = hash_password(&password, &salt)?;

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(record.block_offset))?;
        file.write_all(&hash)?;
        file.write_all(&salt)?;
        file.write_all(b"\n")?;
        file.flush()?;

        debug!(user = name, offset = record.block_offset, "Rewrote credential block");
        Ok(true)
    }

    /// Append a new record for `name`.
    ///
    /// Does not check for a pre-existing username; callers that need
    /// uniqueness must call [`user_exists`](Self::user_exists) first.
    pub fn add_user(&self, name: &str, password: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let salt = fresh_salt();
        let password = Zeroizing::new(password.as_bytes().to_vec());
        let hash = hash_password(&password, &salt)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(name.as_bytes())?;
        file.write_all(b"\n")?;
        file.write_all(&hash)?;
        file.write_all(&salt)?;
        file.write_all(b"\n")?;
        file.flush()?;

        debug!(user = name, "Appended credential record");
        Ok(())
    }

    /// Scan the file for `name`. Must be called with the lock held.
    fn find_user(&self, name: &str) -> Result<Option<FoundRecord>> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        scan_for_user(&mut reader, name.as_bytes())
    }
}

/// Linear scan over the record stream for a username.
///
/// End-of-input where a username line was expected terminates the scan as
/// "not found"; a truncated block or missing terminator anywhere else is
/// corruption.
pub fn scan_for_user<R: BufRead>(reader: &mut R, name: &[u8]) -> Result<Option<FoundRecord>> {
    let mut offset: u64 = 0;

    loop {
        let mut username = Vec::new();
        let n = reader.read_until(b'\n', &mut username)?;
        if n == 0 {
            // Clean EOF at a record boundary
            return Ok(None);
        }
        if username.last() != Some(&b'\n') {
            return Err(StoreError::Corrupt(
                "username line missing terminator".to_string(),
            ));
        }
        username.pop();
        offset += n as u64;
        let block_offset = offset;

        let mut hash = [0u8; HASH_LEN];
        let mut salt = [0u8; SALT_LEN];
        read_exact_or_corrupt(reader, &mut hash)?;
        read_exact_or_corrupt(reader, &mut salt)?;
        offset += BLOCK_LEN as u64;

        let mut terminator = [0u8; 1];
        read_exact_or_corrupt(reader, &mut terminator)?;
        if terminator[0] != b'\n' {
            return Err(StoreError::Corrupt(
                "record missing trailing terminator".to_string(),
            ));
        }
        offset += 1;

        if username == name {
            return Ok(Some(FoundRecord {
                block_offset,
                hash,
                salt,
            }));
        }
    }
}

/// Read exactly `buf.len()` bytes, mapping a short read to `Corrupt`.
fn read_exact_or_corrupt<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            StoreError::Corrupt("truncated record".to_string())
        } else {
            StoreError::Unavailable(e)
        }
    })
}

/// Compute the 32-byte Argon2i digest of (password, salt) with the store's
/// fixed cost parameters.
fn hash_password(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<[u8; HASH_LEN]> {
    let params = Params::new(M_COST, T_COST, P_COST, Some(HASH_LEN))
        .map_err(|e| StoreError::Hash(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2i, Version::V0x13, params);

    let mut hash = [0u8; HASH_LEN];
    argon2
        .hash_password_into(password, salt, &mut hash)
        .map_err(|e| StoreError::Hash(e.to_string()))?;
    Ok(hash)
}

/// Draw a full-range 16-byte salt from the OS random source.
fn fresh_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(name: &[u8], hash: u8, salt: u8) -> Vec<u8> {
        let mut bytes = name.to_vec();
        bytes.push(b'\n');
        bytes.extend_from_slice(&[hash; HASH_LEN]);
        bytes.extend_from_slice(&[salt; SALT_LEN]);
        bytes.push(b'\n');
        bytes
    }

    #[test]
    fn test_scan_finds_exact_username() {
        let mut data = record(b"alice", 0x11, 0x22);
        data.extend_from_slice(&record(b"bob", 0x33, 0x44));

        let found = scan_for_user(&mut Cursor::new(&data), b"bob")
            .unwrap()
            .unwrap();
        assert_eq!(found.hash, [0x33; HASH_LEN]);
        assert_eq!(found.salt, [0x44; SALT_LEN]);
        assert_eq!(found.block_offset, (record(b"alice", 0, 0).len() + 4) as u64);
    }

    #[test]
    fn test_scan_is_case_sensitive() {
        let data = record(b"Alice", 0x11, 0x22);
        let found = scan_for_user(&mut Cursor::new(&data), b"alice").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_scan_past_block_containing_lf() {
        // The first record's block is all 0x0A bytes; the scan must not
        // treat them as line terminators.
        let mut data = record(b"alice", 0x0A, 0x0A);
        data.extend_from_slice(&record(b"bob", 0x33, 0x44));

        let found = scan_for_user(&mut Cursor::new(&data), b"bob").unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_scan_empty_input_is_not_found() {
        let found = scan_for_user(&mut Cursor::new(&[] as &[u8]), b"alice").unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_truncated_block_is_corrupt() {
        let mut data = b"alice\n".to_vec();
        data.extend_from_slice(&[0u8; 20]); // short of the 48-byte block

        let result = scan_for_user(&mut Cursor::new(&data), b"alice");
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_missing_trailing_terminator_is_corrupt() {
        let mut data = b"alice\n".to_vec();
        data.extend_from_slice(&[0u8; BLOCK_LEN]);
        // No trailing LF

        let result = scan_for_user(&mut Cursor::new(&data), b"alice");
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_wrong_terminator_byte_is_corrupt() {
        let mut data = b"alice\n".to_vec();
        data.extend_from_slice(&[0u8; BLOCK_LEN]);
        data.push(b'X');

        let result = scan_for_user(&mut Cursor::new(&data), b"alice");
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let store = PasswdStore::new("/nonexistent/dir/passwd");
        let result = store.user_exists("alice");
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_fresh_salts_differ() {
        // Probabilistic, but a collision here means the RNG is broken.
        let a = fresh_salt();
        let b = fresh_salt();
        assert_ne!(a, b);
    }
}
