//! Subprocess wrappers around the OpenSSH command-line tools.
//!
//! Two execution modes: interactive invocations inherit the console streams
//! so the external tool's own prompts (passphrase entry, host key
//! confirmation, passwords) reach the user; batch invocations capture output
//! and are used only for the non-interactive connectivity probe.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::keys::KeyAlgorithm;
use crate::KeywayError;

// ---------------------------------------------------------------------------
// ToolRunner
// ---------------------------------------------------------------------------

/// Capability interface for running external tools, substitutable in tests.
pub trait ToolRunner {
    /// Runs a program with inherited stdin/stdout/stderr. Returns the exit
    /// code, `-1` when the process was terminated by a signal.
    fn run_interactive(&self, program: &str, args: &[String]) -> Result<i32, KeywayError>;

    /// Runs a program with captured output, discarding it. Used for probes
    /// that must never prompt.
    fn run_batch(&self, program: &str, args: &[String]) -> Result<i32, KeywayError>;

    /// Returns `true` if the program can be found on the search path.
    fn is_available(&self, program: &str) -> bool {
        find_on_path(program).is_some()
    }
}

/// Production runner backed by `std::process::Command`.
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run_interactive(&self, program: &str, args: &[String]) -> Result<i32, KeywayError> {
        let status = Command::new(program).args(args).status()?;
        Ok(status.code().unwrap_or(-1))
    }

    fn run_batch(&self, program: &str, args: &[String]) -> Result<i32, KeywayError> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output()?;
        Ok(output.status.code().unwrap_or(-1))
    }
}

/// Scans `$PATH` for an executable with the given name.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let candidate = dir.join(program);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ---------------------------------------------------------------------------
// SshTools
// ---------------------------------------------------------------------------

/// Outcome of one external tool invocation.
#[derive(Debug)]
pub struct ToolInvocation {
    /// The exact command line that was run, for error reporting.
    pub command: String,
    pub exit_code: i32,
}

impl ToolInvocation {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// High-level operations over `ssh-keygen`, `ssh-copy-id`, and `ssh`.
pub struct SshTools<R: ToolRunner> {
    runner: R,
    connect_timeout_secs: u64,
}

impl<R: ToolRunner> SshTools<R> {
    pub fn new(runner: R, connect_timeout_secs: u64) -> Self {
        SshTools {
            runner,
            connect_timeout_secs,
        }
    }

    fn ensure_tool(&self, tool: &str) -> Result<(), KeywayError> {
        if self.runner.is_available(tool) {
            return Ok(());
        }
        let hint = match tool {
            "ssh-copy-id" => {
                "Install the OpenSSH client package \
                 (Debian/Ubuntu: apt install openssh-client, macOS: brew install ssh-copy-id)."
            }
            _ => {
                "Install the OpenSSH client package \
                 (Debian/Ubuntu: apt install openssh-client, Fedora: dnf install openssh-clients)."
            }
        };
        Err(KeywayError::MissingTool {
            tool: tool.to_string(),
            hint: hint.to_string(),
        })
    }

    fn run_interactive(&self, program: &str, args: Vec<String>) -> Result<ToolInvocation, KeywayError> {
        self.ensure_tool(program)?;
        let command = render_command(program, &args);
        log::debug!("running (interactive): {command}");
        let exit_code = self.runner.run_interactive(program, &args)?;
        Ok(ToolInvocation { command, exit_code })
    }

    /// Generates a key pair with `ssh-keygen`. The tool handles its own
    /// passphrase prompting and file writing.
    pub fn generate_key(
        &self,
        algorithm: KeyAlgorithm,
        path: &Path,
        comment: &str,
    ) -> Result<ToolInvocation, KeywayError> {
        let mut args = vec!["-t".to_string(), algorithm.keygen_type().to_string()];
        if algorithm == KeyAlgorithm::Rsa {
            args.push("-b".to_string());
            args.push("4096".to_string());
        }
        args.push("-f".to_string());
        args.push(path.display().to_string());
        args.push("-C".to_string());
        args.push(comment.to_string());
        self.run_interactive("ssh-keygen", args)
    }

    /// Installs a public key on the remote host with `ssh-copy-id`,
    /// authenticating interactively as needed.
    pub fn copy_public_key(
        &self,
        public_key: &Path,
        alias: &str,
    ) -> Result<ToolInvocation, KeywayError> {
        let args = vec![
            "-i".to_string(),
            public_key.display().to_string(),
            alias.to_string(),
        ];
        self.run_interactive("ssh-copy-id", args)
    }

    /// Non-interactive connectivity probe: fails immediately instead of
    /// prompting, so a non-zero exit means "no passwordless access yet".
    pub fn probe_connection(&self, alias: &str) -> Result<ToolInvocation, KeywayError> {
        self.ensure_tool("ssh")?;
        let args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            alias.to_string(),
            "exit".to_string(),
        ];
        let command = render_command("ssh", &args);
        log::debug!("running (batch): {command}");
        let exit_code = self.runner.run_batch("ssh", &args)?;
        Ok(ToolInvocation { command, exit_code })
    }

    /// Verbose interactive connection attempt, streamed live until the
    /// remote session ends or the user interrupts.
    pub fn verbose_connect(&self, alias: &str) -> Result<ToolInvocation, KeywayError> {
        let args = vec!["-v".to_string(), alias.to_string()];
        self.run_interactive("ssh", args)
    }
}

fn render_command(program: &str, args: &[String]) -> String {
    let mut out = program.to_string();
    for arg in args {
        out.push(' ');
        if arg.contains(char::is_whitespace) {
            out.push_str(&format!("'{arg}'"));
        } else {
            out.push_str(arg);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
