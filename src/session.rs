//! Interactive menu loop.
//!
//! `MainMenu` is both the initial state and the return target after every
//! workflow completes or is cancelled. Each workflow is a linear
//! prompt → validate → confirm → act sequence; a negative confirmation
//! returns to the menu with no further side effects (effects already
//! committed, such as a key generation that already ran, stay).
//!
//! End of input at any prompt terminates the session as if quit had been
//! chosen.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::keys::{self, KeyAlgorithm};
use crate::paths::{display_path, expand_tilde, SshPaths};
use crate::permissions;
use crate::settings::Settings;
use crate::store::{ConfigStore, HostEntry};
use crate::tools::{SshTools, ToolInvocation, ToolRunner};
use crate::KeywayError;

/// What the menu loop does after a workflow returns.
enum Outcome {
    Continue,
    Quit,
}

pub struct Session<R: ToolRunner, I: BufRead> {
    paths: SshPaths,
    store: ConfigStore,
    tools: SshTools<R>,
    default_algorithm: KeyAlgorithm,
    input: I,
}

impl<R: ToolRunner, I: BufRead> Session<R, I> {
    pub fn new(paths: SshPaths, settings: &Settings, runner: R, input: I) -> Self {
        let store = ConfigStore::new(paths.config_file());
        let tools = SshTools::new(runner, settings.connect_timeout_secs);
        Session {
            paths,
            store,
            tools,
            default_algorithm: settings.default_algorithm,
            input,
        }
    }

    // ── Menu loop ───────────────────────────────────────────────────────────

    pub fn run(&mut self) -> Result<(), KeywayError> {
        println!("keyway — interactive SSH setup helper");
        println!("SSH directory: {}", display_path(&self.paths.ssh_dir));

        loop {
            self.print_menu();
            let Some(choice) = self.prompt("Select an option")? else {
                break;
            };
            let outcome = match choice.as_str() {
                "1" => self.generate_key_flow()?,
                "2" => self.add_config_flow()?,
                "3" => self.copy_key_flow()?,
                "4" => self.test_connection_flow()?,
                "5" => self.view_config_flow()?,
                "q" | "Q" => Outcome::Quit,
                "" => Outcome::Continue,
                other => {
                    println!("keyway: unknown option '{other}'");
                    Outcome::Continue
                }
            };
            if let Outcome::Quit = outcome {
                break;
            }
        }

        println!("Bye.");
        Ok(())
    }

    fn print_menu(&self) {
        println!();
        println!("  1) Generate a new SSH key pair");
        println!("  2) Add a host entry to the SSH config");
        println!("  3) Copy a public key to a remote host");
        println!("  4) Test a connection");
        println!("  5) View the SSH config");
        println!("  q) Quit");
    }

    // ── Prompt helpers ──────────────────────────────────────────────────────

    /// Prints `label: ` and reads one line. `Ok(None)` on end of input or an
    /// unrecoverable read error; both end the session as quit.
    fn prompt(&mut self, label: &str) -> Result<Option<String>, KeywayError> {
        print!("{label}: ");
        io::stdout().flush()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim().to_string())),
            Err(e) => {
                log::debug!("input stream failed: {e}");
                Ok(None)
            }
        }
    }

    /// Re-prompts until the answer is non-empty.
    fn prompt_nonempty(&mut self, label: &str) -> Result<Option<String>, KeywayError> {
        loop {
            let Some(answer) = self.prompt(label)? else {
                return Ok(None);
            };
            if !answer.is_empty() {
                return Ok(Some(answer));
            }
            println!("keyway: this field is required");
        }
    }

    /// Prompts with a pre-filled default, returned when the answer is empty.
    fn prompt_with_default(
        &mut self,
        label: &str,
        default: &str,
    ) -> Result<Option<String>, KeywayError> {
        let Some(answer) = self.prompt(&format!("{label} [{default}]"))? else {
            return Ok(None);
        };
        if answer.is_empty() {
            Ok(Some(default.to_string()))
        } else {
            Ok(Some(answer))
        }
    }

    /// Asks a yes/no question, defaulting to no.
    fn confirm(&mut self, question: &str) -> Result<Option<bool>, KeywayError> {
        let Some(answer) = self.prompt(&format!("{question} [y/N]"))? else {
            return Ok(None);
        };
        Ok(Some(matches!(
            answer.to_lowercase().as_str(),
            "y" | "yes"
        )))
    }

    /// Prompts for a port. Non-numeric or out-of-range values are reset to
    /// 22 with a warning rather than re-prompting.
    fn prompt_port(&mut self) -> Result<Option<u16>, KeywayError> {
        let Some(answer) = self.prompt_with_default("Port", "22")? else {
            return Ok(None);
        };
        match answer.parse::<u32>() {
            Ok(n) if (1..=65535).contains(&n) => Ok(Some(n as u16)),
            _ => {
                println!("keyway: invalid port '{answer}', using 22");
                Ok(Some(22))
            }
        }
    }

    /// Prompts for a key algorithm. Unrecognized values fall back to ed25519
    /// with a warning.
    fn prompt_algorithm(&mut self) -> Result<Option<KeyAlgorithm>, KeywayError> {
        let default = self.default_algorithm;
        let Some(answer) =
            self.prompt_with_default("Key type (ed25519/rsa)", default.keygen_type())?
        else {
            return Ok(None);
        };
        match KeyAlgorithm::parse(&answer) {
            Some(algo) => Ok(Some(algo)),
            None => {
                println!("keyway: unknown key type '{answer}', using ed25519");
                Ok(Some(KeyAlgorithm::Ed25519))
            }
        }
    }

    fn cancelled(&self) -> Outcome {
        println!("keyway: cancelled");
        Outcome::Continue
    }

    // ── 1) Generate key ─────────────────────────────────────────────────────

    fn generate_key_flow(&mut self) -> Result<Outcome, KeywayError> {
        if let Some(existing) = keys::find_existing_key(&self.paths.ssh_dir) {
            println!("Existing key found: {}", display_path(&existing));
        }

        let Some(algorithm) = self.prompt_algorithm()? else {
            return Ok(Outcome::Quit);
        };

        let default_path = algorithm.default_key_path(&self.paths.ssh_dir);
        let Some(path_answer) = self.prompt_with_default("Key file", &display_path(&default_path))?
        else {
            return Ok(Outcome::Quit);
        };
        let key_path = expand_tilde(&path_answer);

        let Some(comment) = self.prompt_with_default("Comment", &keys::default_comment())? else {
            return Ok(Outcome::Quit);
        };

        if key_path.exists() {
            match self.confirm(&format!(
                "Key file {} already exists. Overwrite?",
                display_path(&key_path)
            ))? {
                None => return Ok(Outcome::Quit),
                Some(false) => return Ok(self.cancelled()),
                Some(true) => {}
            }
        }

        match self.confirm(&format!(
            "Generate a {algorithm} key at {}?",
            display_path(&key_path)
        ))? {
            None => return Ok(Outcome::Quit),
            Some(false) => return Ok(self.cancelled()),
            Some(true) => {}
        }

        match self.tools.generate_key(algorithm, &key_path, &comment) {
            Ok(inv) if inv.succeeded() => {
                permissions::secure_dir(&self.paths.ssh_dir);
                permissions::secure_private_key(&key_path);
                permissions::secure_public_key(&keys::public_key_path(&key_path));
                println!("Key pair created:");
                println!("  private: {}", display_path(&key_path));
                println!("  public:  {}", display_path(&keys::public_key_path(&key_path)));
            }
            Ok(inv) => report_failure("key generation", &inv),
            Err(e) => println!("keyway: {e}"),
        }
        Ok(Outcome::Continue)
    }

    // ── 2) Add config entry ─────────────────────────────────────────────────

    fn add_config_flow(&mut self) -> Result<Outcome, KeywayError> {
        let Some(alias) = self.prompt_nonempty("Host alias")? else {
            return Ok(Outcome::Quit);
        };
        let Some(hostname) = self.prompt_nonempty("HostName (address)")? else {
            return Ok(Outcome::Quit);
        };
        let Some(user) = self.prompt_nonempty("User")? else {
            return Ok(Outcome::Quit);
        };
        let Some(port) = self.prompt_port()? else {
            return Ok(Outcome::Quit);
        };

        let default_identity = keys::find_existing_key(&self.paths.ssh_dir)
            .unwrap_or_else(|| KeyAlgorithm::Ed25519.default_key_path(&self.paths.ssh_dir));
        let Some(identity_answer) =
            self.prompt_with_default("IdentityFile", &display_path(&default_identity))?
        else {
            return Ok(Outcome::Quit);
        };

        let entry = HostEntry {
            alias,
            hostname,
            user,
            identity_file: PathBuf::from(identity_answer),
            port,
        };

        println!();
        print!("{}", entry.config_block());
        match self.confirm(&format!(
            "Append this entry to {}?",
            display_path(self.store.path())
        ))? {
            None => return Ok(Outcome::Quit),
            Some(false) => return Ok(self.cancelled()),
            Some(true) => {}
        }

        match self.store.append_host_block(&entry) {
            Ok(()) => println!(
                "Entry added. Connect with: ssh {}",
                entry.alias
            ),
            Err(e) => println!("keyway: cannot update config: {e}"),
        }
        Ok(Outcome::Continue)
    }

    // ── 3) Copy key to remote host ──────────────────────────────────────────

    fn copy_key_flow(&mut self) -> Result<Outcome, KeywayError> {
        let Some(alias) = self.prompt_nonempty("Host alias (or user@host)")? else {
            return Ok(Outcome::Quit);
        };

        // Prefer the identity configured for this alias, then any known key.
        let identity = match self.store.find_identity_file(&alias) {
            Ok(Some(path)) => Some(path),
            Ok(None) => keys::find_existing_key(&self.paths.ssh_dir),
            Err(e) => {
                println!("keyway: cannot read config: {e}");
                None
            }
        };
        let identity = match identity {
            Some(path) => path,
            None => {
                let Some(answer) = self.prompt_nonempty("Private key file")? else {
                    return Ok(Outcome::Quit);
                };
                expand_tilde(&answer)
            }
        };

        let public_key = keys::public_key_path(&identity);
        if !public_key.is_file() {
            println!(
                "keyway: public key {} not found — generate a key pair first",
                display_path(&public_key)
            );
            return Ok(Outcome::Continue);
        }

        match self.confirm(&format!(
            "Copy {} to '{alias}'?",
            display_path(&public_key)
        ))? {
            None => return Ok(Outcome::Quit),
            Some(false) => return Ok(self.cancelled()),
            Some(true) => {}
        }

        match self.tools.copy_public_key(&public_key, &alias) {
            Ok(inv) if inv.succeeded() => {
                println!("Public key installed on '{alias}'.");
                println!("Try option 4 to verify passwordless login.");
            }
            Ok(inv) => {
                report_failure("key copy", &inv);
                print_manual_copy_instructions(&public_key, &alias);
            }
            Err(e) => {
                println!("keyway: {e}");
                print_manual_copy_instructions(&public_key, &alias);
            }
        }
        Ok(Outcome::Continue)
    }

    // ── 4) Test connection ──────────────────────────────────────────────────

    fn test_connection_flow(&mut self) -> Result<Outcome, KeywayError> {
        let Some(alias) = self.prompt_nonempty("Host alias (or user@host)")? else {
            return Ok(Outcome::Quit);
        };

        println!("Testing passwordless connection to '{alias}'...");
        let probe_ok = match self.tools.probe_connection(&alias) {
            Ok(inv) if inv.succeeded() => {
                println!("Connection OK — passwordless login works.");
                true
            }
            Ok(inv) => {
                println!(
                    "keyway: test failed or requires interaction (exit {}): {}",
                    inv.exit_code, inv.command
                );
                false
            }
            Err(e) => {
                println!("keyway: {e}");
                return Ok(Outcome::Continue);
            }
        };

        if !probe_ok {
            match self.confirm("Run a verbose interactive attempt?")? {
                None => return Ok(Outcome::Quit),
                Some(false) => return Ok(Outcome::Continue),
                Some(true) => {}
            }
            match self.tools.verbose_connect(&alias) {
                Ok(inv) if inv.succeeded() => println!("Interactive connection succeeded."),
                Ok(inv) => report_failure("connection", &inv),
                Err(e) => println!("keyway: {e}"),
            }
        }
        Ok(Outcome::Continue)
    }

    // ── 5) View config ──────────────────────────────────────────────────────

    fn view_config_flow(&mut self) -> Result<Outcome, KeywayError> {
        match self.store.view() {
            Ok(Some(text)) => {
                println!("--- {} ---", display_path(self.store.path()));
                print!("{text}");
                if !text.ends_with('\n') {
                    println!();
                }
            }
            Ok(None) => println!(
                "keyway: {} does not exist yet",
                display_path(self.store.path())
            ),
            Err(e) => println!("keyway: cannot read config: {e}"),
        }
        Ok(Outcome::Continue)
    }
}

fn report_failure(what: &str, inv: &ToolInvocation) {
    println!(
        "keyway: {what} failed (exit {}): {}",
        inv.exit_code, inv.command
    );
}

fn print_manual_copy_instructions(public_key: &std::path::Path, alias: &str) {
    println!("Manual alternative:");
    println!(
        "  cat {} | ssh {alias} 'mkdir -p ~/.ssh && cat >> ~/.ssh/authorized_keys'",
        display_path(public_key)
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
