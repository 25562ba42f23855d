//! OpenSSH client config file: search, append, backup.
//!
//! The file is treated as opaque text except for `Host` and `IdentityFile`
//! directives. Mutation is append-only: existing blocks are never rewritten,
//! and a byte-exact `.bak` snapshot is taken immediately before each append.
//! Duplicate aliases are allowed; OpenSSH resolves them by using the first
//! matching block, and the scanner here mirrors that first-occurrence rule.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::paths::expand_tilde;
use crate::permissions;
use crate::KeywayError;

// ---------------------------------------------------------------------------
// HostEntry
// ---------------------------------------------------------------------------

/// One config entry collected from the user. Persisted as a text block.
#[derive(Debug, Clone)]
pub struct HostEntry {
    pub alias: String,
    pub hostname: String,
    pub user: String,
    pub identity_file: PathBuf,
    pub port: u16,
}

impl HostEntry {
    pub fn uses_default_port(&self) -> bool {
        self.port == 22
    }

    /// Renders the canonical config block, ending in a blank line.
    /// The `Port` line is present only for non-default ports.
    pub fn config_block(&self) -> String {
        let mut block = String::new();
        block.push_str("# Added by keyway\n");
        block.push_str(&format!("Host {}\n", self.alias));
        block.push_str(&format!("  HostName {}\n", self.hostname));
        block.push_str(&format!("  User {}\n", self.user));
        block.push_str(&format!("  IdentityFile {}\n", self.identity_file.display()));
        if !self.uses_default_port() {
            block.push_str(&format!("  Port {}\n", self.port));
        }
        block.push('\n');
        block
    }
}

// ---------------------------------------------------------------------------
// Line scanner
// ---------------------------------------------------------------------------

/// Scanner position while walking the config line by line.
enum ScanState {
    /// Not inside any `Host` block yet, or inside one for another alias.
    Outside,
    /// Inside the block for the alias we are looking for.
    InMatchingBlock,
}

/// Splits a config line into `(keyword, first value)` if it has both.
/// Only the first token after the keyword is considered; multiple aliases on
/// one `Host` line are not supported.
fn directive(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let keyword = parts.next()?;
    if keyword.starts_with('#') {
        return None;
    }
    let value = parts.next()?;
    Some((keyword, value))
}

/// Scans config text for the first `IdentityFile` inside the first `Host`
/// block whose alias matches exactly. Stops at the next `Host` line.
fn scan_identity_file(text: &str, alias: &str) -> Option<String> {
    let mut state = ScanState::Outside;
    for line in text.lines() {
        let Some((keyword, value)) = directive(line) else {
            continue;
        };
        if keyword.eq_ignore_ascii_case("Host") {
            if let ScanState::InMatchingBlock = state {
                // Left the matching block without finding the directive.
                return None;
            }
            state = if value == alias {
                ScanState::InMatchingBlock
            } else {
                ScanState::Outside
            };
        } else if let ScanState::InMatchingBlock = state {
            if keyword.eq_ignore_ascii_case("IdentityFile") {
                return Some(value.to_string());
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// ConfigStore
// ---------------------------------------------------------------------------

/// Read/append access to one OpenSSH client config file.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        ConfigStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path the pre-append snapshot is written to.
    pub fn backup_path(&self) -> PathBuf {
        let mut s = self.path.as_os_str().to_os_string();
        s.push(".bak");
        PathBuf::from(s)
    }

    /// Returns the `IdentityFile` configured for `alias`, with a leading `~`
    /// expanded to the home directory. `Ok(None)` when the alias is absent,
    /// its block has no `IdentityFile`, or the config file does not exist.
    pub fn find_identity_file(&self, alias: &str) -> Result<Option<PathBuf>, KeywayError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(scan_identity_file(&text, alias).map(|v| expand_tilde(&v)))
    }

    /// Appends the canonical block for `entry` to the config file.
    ///
    /// If the file already exists it is first copied to `.bak` (best-effort;
    /// a failed backup is logged and does not abort). The containing
    /// directory is created owner-only if absent, and the file is tightened
    /// to owner read/write after the append.
    pub fn append_host_block(&self, entry: &HostEntry) -> Result<(), KeywayError> {
        if let Some(parent) = self.path.parent() {
            permissions::secure_dir(parent);
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, self.backup_path()) {
                log::warn!(
                    "cannot back up {} to {}: {e}",
                    self.path.display(),
                    self.backup_path().display()
                );
            }
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.config_block().as_bytes())?;

        permissions::secure_config_file(&self.path);
        Ok(())
    }

    /// Full current contents, or `None` when the file does not exist.
    pub fn view(&self) -> Result<Option<String>, KeywayError> {
        match fs::read_to_string(&self.path) {
            Ok(t) => Ok(Some(t)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::home_dir;
    use std::fs::File;

    fn tmp(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("keyway_test_store_{suffix}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn entry(alias: &str, port: u16) -> HostEntry {
        HostEntry {
            alias: alias.to_string(),
            hostname: "192.168.1.50".to_string(),
            user: "root".to_string(),
            identity_file: PathBuf::from("~/.ssh/id_ed25519"),
            port,
        }
    }

    // ── Block rendering ─────────────────────────────────────────────────────

    #[test]
    fn block_omits_port_line_for_default_port() {
        let block = entry("myserver", 22).config_block();
        assert!(block.contains("Host myserver\n"));
        assert!(block.contains("  HostName 192.168.1.50\n"));
        assert!(block.contains("  User root\n"));
        assert!(block.contains("  IdentityFile ~/.ssh/id_ed25519\n"));
        assert!(!block.contains("Port"));
        assert!(block.ends_with("\n\n"));
    }

    #[test]
    fn block_includes_port_line_for_custom_port() {
        let block = entry("myserver", 2222).config_block();
        assert!(block.contains("  Port 2222\n"));
    }

    #[test]
    fn block_starts_with_provenance_comment() {
        let block = entry("a", 22).config_block();
        assert!(block.starts_with("# Added by keyway\n"));
    }

    // ── Scanner: find_identity_file ─────────────────────────────────────────

    #[test]
    fn finds_identity_file_in_matching_block() {
        let text = "Host existing\n  HostName h\n  IdentityFile /home/u/.ssh/id_rsa\n";
        assert_eq!(
            scan_identity_file(text, "existing"),
            Some("/home/u/.ssh/id_rsa".to_string())
        );
    }

    #[test]
    fn alias_match_is_whole_token_not_substring() {
        let text = "Host production\n  IdentityFile /keys/prod\n";
        assert_eq!(scan_identity_file(text, "prod"), None);
        assert_eq!(
            scan_identity_file(text, "production"),
            Some("/keys/prod".to_string())
        );
    }

    #[test]
    fn scan_stops_at_next_host_line() {
        let text = "Host first\n  User a\nHost second\n  IdentityFile /keys/second\n";
        assert_eq!(scan_identity_file(text, "first"), None);
        assert_eq!(
            scan_identity_file(text, "second"),
            Some("/keys/second".to_string())
        );
    }

    #[test]
    fn first_identity_file_in_block_wins() {
        let text = "Host dup\n  IdentityFile /keys/one\n  IdentityFile /keys/two\n";
        assert_eq!(scan_identity_file(text, "dup"), Some("/keys/one".to_string()));
    }

    #[test]
    fn first_matching_block_shadows_later_duplicates() {
        let text = "Host dup\n  IdentityFile /keys/first\n\nHost dup\n  IdentityFile /keys/shadowed\n";
        assert_eq!(scan_identity_file(text, "dup"), Some("/keys/first".to_string()));
    }

    #[test]
    fn directive_keyword_is_case_insensitive() {
        let text = "host box\n  identityfile /keys/box\n";
        assert_eq!(scan_identity_file(text, "box"), Some("/keys/box".to_string()));
    }

    #[test]
    fn comment_lines_are_ignored() {
        let text = "# Host box\nHost box\n  # IdentityFile /keys/commented\n  IdentityFile /keys/real\n";
        assert_eq!(scan_identity_file(text, "box"), Some("/keys/real".to_string()));
    }

    #[test]
    fn absent_alias_returns_none() {
        let text = "Host other\n  IdentityFile /keys/other\n";
        assert_eq!(scan_identity_file(text, "missing"), None);
    }

    #[test]
    fn tilde_in_identity_file_is_expanded() {
        let dir = tmp("tilde");
        let config = dir.join("config");
        fs::write(&config, "Host box\n  IdentityFile ~/.ssh/id_ed25519\n").unwrap();

        let store = ConfigStore::new(config);
        let found = store.find_identity_file("box").unwrap().unwrap();
        assert_eq!(found, home_dir().join(".ssh/id_ed25519"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_config_file_is_not_found() {
        let dir = tmp("no_file");
        let store = ConfigStore::new(dir.join("config"));
        assert!(store.find_identity_file("any").unwrap().is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    // ── Append ──────────────────────────────────────────────────────────────

    #[test]
    fn append_creates_file_and_directory() {
        let dir = tmp("append_create");
        let config = dir.join("ssh").join("config");
        let store = ConfigStore::new(config.clone());

        store.append_host_block(&entry("myserver", 22)).unwrap();

        let text = fs::read_to_string(&config).unwrap();
        assert_eq!(text, entry("myserver", 22).config_block());
        assert!(!store.backup_path().exists(), "no backup for a fresh file");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn append_is_pure_concatenation() {
        let dir = tmp("append_concat");
        let config = dir.join("config");
        let existing = "Host old\n  HostName old.example.com\n\n";
        fs::write(&config, existing).unwrap();

        let store = ConfigStore::new(config.clone());
        store.append_host_block(&entry("new", 2222)).unwrap();

        let text = fs::read_to_string(&config).unwrap();
        assert_eq!(text, format!("{existing}{}", entry("new", 2222).config_block()));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn backup_is_byte_exact_pre_append_snapshot() {
        let dir = tmp("backup");
        let config = dir.join("config");
        let existing = "Host old\n  User root\n";
        fs::write(&config, existing).unwrap();

        let store = ConfigStore::new(config);
        store.append_host_block(&entry("new", 22)).unwrap();

        let backup = fs::read_to_string(store.backup_path()).unwrap();
        assert_eq!(backup, existing);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn backup_is_refreshed_on_each_append() {
        let dir = tmp("backup_refresh");
        let config = dir.join("config");
        let store = ConfigStore::new(config.clone());

        store.append_host_block(&entry("one", 22)).unwrap();
        let after_first = fs::read_to_string(&config).unwrap();
        store.append_host_block(&entry("two", 22)).unwrap();

        let backup = fs::read_to_string(store.backup_path()).unwrap();
        assert_eq!(backup, after_first);

        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn appended_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tmp("append_mode");
        let config = dir.join("config");
        let store = ConfigStore::new(config.clone());

        store.append_host_block(&entry("box", 22)).unwrap();

        let mode = fs::metadata(&config).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o600);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_alias_is_appended_not_merged() {
        let dir = tmp("dup_append");
        let config = dir.join("config");
        let store = ConfigStore::new(config.clone());

        store.append_host_block(&entry("dup", 22)).unwrap();
        store.append_host_block(&entry("dup", 2222)).unwrap();

        let text = fs::read_to_string(&config).unwrap();
        assert_eq!(text.matches("Host dup\n").count(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    // ── View ────────────────────────────────────────────────────────────────

    #[test]
    fn view_returns_contents() {
        let dir = tmp("view");
        let config = dir.join("config");
        fs::write(&config, "Host a\n").unwrap();

        let store = ConfigStore::new(config);
        assert_eq!(store.view().unwrap(), Some("Host a\n".to_string()));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn view_of_missing_file_is_none() {
        let dir = tmp("view_missing");
        let store = ConfigStore::new(dir.join("config"));
        assert_eq!(store.view().unwrap(), None);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn view_of_empty_file_is_empty_string() {
        let dir = tmp("view_empty");
        let config = dir.join("config");
        File::create(&config).unwrap();

        let store = ConfigStore::new(config);
        assert_eq!(store.view().unwrap(), Some(String::new()));

        let _ = fs::remove_dir_all(&dir);
    }
}
