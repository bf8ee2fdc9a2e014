//! Append-only audit log
//!
//! Each entry is one human-readable line: the message, a space, and a
//! timestamp. The file is opened for append on every entry and closed
//! again, so a crashed server never holds it hostage.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Local;

use crate::error::Result;

/// Events recorded to the audit file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    /// The daemon came up
    ServerStarted,
    /// A peer not on the allow-list attempted to connect
    ConnectionRejected { peer: String },
    /// A peer on the allow-list was admitted
    ConnectionAccepted { peer: String },
    /// A username with no credential record was submitted
    UnknownUsername { username: String, peer: String },
    /// Two consecutive password failures forced a disconnect
    PasswordFailedTwice { username: String, peer: String },
    /// Password verified
    LoginSucceeded { username: String, peer: String },
    /// The connection closed, for any reason
    Disconnected { username: String, peer: String },
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::ServerStarted => write!(f, "Server started,"),
            AuditEvent::ConnectionRejected { peer } => write!(
                f,
                "IP address \"{peer}\" NOT on whitelist attempted to connect,"
            ),
            AuditEvent::ConnectionAccepted { peer } => {
                write!(f, "IP address \"{peer}\" on whitelist connected,")
            }
            AuditEvent::UnknownUsername { username, peer } => write!(
                f,
                "Username \"{username}\" NOT recognized, IP: \"{peer}\","
            ),
            AuditEvent::PasswordFailedTwice { username, peer } => write!(
                f,
                "Username \"{username}\" failed password twice, IP: \"{peer}\""
            ),
            AuditEvent::LoginSucceeded { username, peer } => write!(
                f,
                "Username \"{username}\" successful login, IP: \"{peer}\""
            ),
            AuditEvent::Disconnected { username, peer } => write!(
                f,
                "Username \"{username}\" disconnected, IP: \"{peer}\""
            ),
        }
    }
}

/// Timestamped append-only line writer
pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    /// Create a log writer for the file at `path`.
    ///
    /// The file is created on the first entry if it does not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry: the event message, a space, and a timestamp.
    pub fn record(&self, event: &AuditEvent) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{} {}", event, Local::now().format("%a %b %e %H:%M:%S %Y"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_entries_are_appended_with_timestamp() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path().join("server.log"));

        log.record(&AuditEvent::ServerStarted).unwrap();
        log.record(&AuditEvent::LoginSucceeded {
            username: "bob".to_string(),
            peer: "127.0.0.1".to_string(),
        })
        .unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Server started,"));
        assert!(lines[1].starts_with("Username \"bob\" successful login, IP: \"127.0.0.1\""));
        // Message and timestamp are separated by a space and the year is present
        assert!(lines[0].len() > "Server started, ".len());
    }

    #[test]
    fn test_rejection_entry_names_the_peer() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path().join("server.log"));

        log.record(&AuditEvent::ConnectionRejected {
            peer: "10.0.0.99".to_string(),
        })
        .unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("\"10.0.0.99\" NOT on whitelist"));
    }
}
