//! Filesystem locations the tool operates on.
//!
//! Every component receives an explicit [`SshPaths`] rather than reaching for
//! `~/.ssh` on its own, so tests can point the whole tool at a temporary
//! directory.

use std::path::{Path, PathBuf};

/// Returns the user's home directory, with a `.` fallback.
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}

/// Shortens a path for display: replaces the home-directory prefix with `~`.
pub fn display_path(path: &Path) -> String {
    let home = home_dir();
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix(&*home.to_string_lossy()) {
        if home != Path::new(".") {
            return format!("~{rest}");
        }
    }
    s.into_owned()
}

// ---------------------------------------------------------------------------
// SshPaths
// ---------------------------------------------------------------------------

/// The SSH directory and the client config file inside it.
#[derive(Debug, Clone)]
pub struct SshPaths {
    pub ssh_dir: PathBuf,
}

impl SshPaths {
    pub fn new(ssh_dir: PathBuf) -> Self {
        SshPaths { ssh_dir }
    }

    /// Path to the OpenSSH client config file.
    pub fn config_file(&self) -> PathBuf {
        self.ssh_dir.join("config")
    }

    /// Path to a key file inside the SSH directory.
    pub fn key_file(&self, name: &str) -> PathBuf {
        self.ssh_dir.join(name)
    }
}

impl Default for SshPaths {
    fn default() -> Self {
        SshPaths::new(home_dir().join(".ssh"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
