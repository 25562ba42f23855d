//! CLI entry point for the `keyway` binary.
//!
//! The tool is menu-driven: there are no flags beyond the standard
//! `--help`/`--version`, and no machine-readable output mode. Settings come
//! from the config file and `KEYWAY_*` environment variables.
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0    | Normal quit (including end of input) |
//! | 1    | Startup or unrecoverable I/O failure |

use std::io;

use clap::Parser;

use crate::paths::SshPaths;
use crate::session::Session;
use crate::settings::Settings;
use crate::tools::SystemRunner;

const EXIT_OK: i32 = 0;
const EXIT_ERROR: i32 = 1;

/// keyway - interactive SSH setup helper
#[derive(Parser)]
#[command(
    name = "keyway",
    version,
    about = "Walks you through generating SSH keys, writing ~/.ssh/config entries, \
             copying keys to remote hosts, and testing the connection"
)]
struct Cli {}

/// Parse CLI arguments and run the interactive session. Returns an exit code.
pub fn run() -> i32 {
    let _cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("keyway error: {e}");
            return EXIT_ERROR;
        }
    };

    let paths = settings
        .ssh_dir
        .clone()
        .map(SshPaths::new)
        .unwrap_or_default();

    let stdin = io::stdin();
    let mut session = Session::new(paths, &settings, SystemRunner, stdin.lock());
    match session.run() {
        Ok(()) => EXIT_OK,
        Err(e) => {
            eprintln!("keyway error: {e}");
            EXIT_ERROR
        }
    }
}
