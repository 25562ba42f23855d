//! Filesystem permission enforcement for the SSH directory and key files.
//!
//! OpenSSH refuses keys and configs that are group/other readable, so every
//! file this tool creates or touches is tightened right after the write.
//! All operations are best-effort: a failure is logged and never aborts the
//! calling operation, which covers platforms without POSIX permission
//! semantics.

use std::path::Path;

/// SSH directory: owner read/write/execute only.
pub const MODE_SSH_DIR: u32 = 0o700;
/// Private key: owner read/write only.
pub const MODE_PRIVATE_KEY: u32 = 0o600;
/// Public key: owner read/write, group/other read.
pub const MODE_PUBLIC_KEY: u32 = 0o644;
/// Client config file: owner read/write only.
pub const MODE_CONFIG_FILE: u32 = 0o600;

/// Ensures the directory exists and is owner-only.
pub fn secure_dir(path: &Path) {
    if !path.is_dir() {
        if let Err(e) = std::fs::create_dir_all(path) {
            log::warn!("cannot create directory {}: {e}", path.display());
            return;
        }
    }
    set_mode(path, MODE_SSH_DIR);
}

/// Restricts a private key file to owner read/write.
pub fn secure_private_key(path: &Path) {
    set_mode(path, MODE_PRIVATE_KEY);
}

/// Sets a public key file to owner read/write, others read.
pub fn secure_public_key(path: &Path) {
    set_mode(path, MODE_PUBLIC_KEY);
}

/// Restricts the client config file to owner read/write.
pub fn secure_config_file(path: &Path) {
    set_mode(path, MODE_CONFIG_FILE);
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
        log::warn!("cannot chmod {:04o} {}: {e}", mode, path.display());
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
