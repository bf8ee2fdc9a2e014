//! IP allow-list admission control
//!
//! The allow-list is a flat text file with one IP address literal per
//! line. A connecting peer is admitted only when its address exactly
//! matches a line; no CIDR ranges, no wildcards.

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;

use crate::error::Result;

/// Loaded allow-list entries
#[derive(Debug)]
pub struct AllowList {
    entries: HashSet<String>,
}

impl AllowList {
    /// Load the allow-list from a file, one address per line.
    ///
    /// Blank lines are skipped; surrounding whitespace is trimmed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        Ok(Self { entries })
    }

    /// Whether the peer address exactly matches an allow-list entry
    pub fn permits(&self, addr: &IpAddr) -> bool {
        self.entries.contains(&addr.to_string())
    }

    /// Number of loaded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty (admitting nobody)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load_from(contents: &str) -> AllowList {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("whitelist");
        std::fs::write(&path, contents).unwrap();
        AllowList::load(&path).unwrap()
    }

    #[test]
    fn test_exact_match_admits() {
        let list = load_from("127.0.0.1\n192.168.1.10\n");
        assert!(list.permits(&"127.0.0.1".parse().unwrap()));
        assert!(list.permits(&"192.168.1.10".parse().unwrap()));
        assert!(!list.permits(&"192.168.1.11".parse().unwrap()));
    }

    #[test]
    fn test_blank_lines_and_whitespace_ignored() {
        let list = load_from("\n  127.0.0.1  \n\n");
        assert_eq!(list.len(), 1);
        assert!(list.permits(&"127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_empty_list_admits_nobody() {
        let list = load_from("");
        assert!(list.is_empty());
        assert!(!list.permits(&"127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(AllowList::load(&dir.path().join("no-such-file")).is_err());
    }
}
