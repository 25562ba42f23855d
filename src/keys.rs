//! Key algorithm selection and discovery of existing key files.

use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// KeyAlgorithm
// ---------------------------------------------------------------------------

/// Key types the tool offers. Anything else falls back to ed25519.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Ed25519,
    Rsa,
}

impl KeyAlgorithm {
    /// Parses a user-supplied algorithm name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ed25519" => Some(KeyAlgorithm::Ed25519),
            "rsa" => Some(KeyAlgorithm::Rsa),
            _ => None,
        }
    }

    /// The value passed to `ssh-keygen -t`.
    pub fn keygen_type(self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
            KeyAlgorithm::Rsa => "rsa",
        }
    }

    /// Conventional private key filename for this algorithm.
    pub fn default_filename(self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "id_ed25519",
            KeyAlgorithm::Rsa => "id_rsa",
        }
    }

    /// Conventional private key path inside the given SSH directory.
    pub fn default_key_path(self, ssh_dir: &Path) -> PathBuf {
        ssh_dir.join(self.default_filename())
    }
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        KeyAlgorithm::Ed25519
    }
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keygen_type())
    }
}

// ---------------------------------------------------------------------------
// Key locator
// ---------------------------------------------------------------------------

/// Candidate private key filenames, in priority order.
const CANDIDATE_KEYS: [&str; 2] = ["id_ed25519", "id_rsa"];

/// Returns the first known private key present in the SSH directory,
/// preferring ed25519 over rsa. Pure function of the filesystem.
pub fn find_existing_key(ssh_dir: &Path) -> Option<PathBuf> {
    CANDIDATE_KEYS
        .iter()
        .map(|name| ssh_dir.join(name))
        .find(|path| path.is_file())
}

/// Public key path for a private key: same path with `.pub` appended.
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut s = private_key.as_os_str().to_os_string();
    s.push(".pub");
    PathBuf::from(s)
}

/// Default key comment: `user@host`, best effort from the environment.
pub fn default_comment() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string());
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    format!("{user}@{host}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
