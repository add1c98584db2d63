//! Microphone capability checks and the consent flow.
//!
//! The gate is deliberately minimal: if the capability is already
//! there it closes immediately, otherwise it asks once, reports the
//! outcome, and closes. It keeps no state of its own; grants live in
//! the platform permission store behind [`GrantStore`].

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{error, info};

/// Query side of the platform permission store.
pub trait MicCapability {
    fn is_granted(&self) -> bool;
}

/// The platform permission store: query plus recording the user's
/// decision.
pub trait GrantStore: MicCapability {
    fn record_grant(&mut self) -> Result<()>;
}

/// The platform consent dialog: ask once, report the user's choice.
pub trait ConsentPrompt {
    fn request(&mut self) -> Result<bool>;
}

/// Short-lived confirmation shown when the flow finishes.
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Fire-and-forget hop from the session into the consent flow.
pub trait ConsentLauncher {
    fn launch(&self) -> Result<()>;
}

/// Outcome of one consent flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    AlreadyGranted,
    Granted,
    Denied,
}

/// Single-purpose screen around the consent prompt.
pub struct PermissionGate;

impl PermissionGate {
    pub fn run(
        store: &mut dyn GrantStore,
        prompt: &mut dyn ConsentPrompt,
        notifier: &dyn Notifier,
    ) -> GateOutcome {
        if store.is_granted() {
            info!("microphone capability already granted");
            return GateOutcome::AlreadyGranted;
        }

        match prompt.request() {
            Ok(true) => {
                if let Err(e) = store.record_grant() {
                    error!("failed to record microphone grant: {e:#}");
                }
                notifier.notify("Microphone permission granted");
                GateOutcome::Granted
            }
            Ok(false) => {
                notifier.notify("Microphone permission is required for voice input");
                GateOutcome::Denied
            }
            Err(e) => {
                error!("consent prompt failed: {e:#}");
                notifier.notify("Microphone permission is required for voice input");
                GateOutcome::Denied
            }
        }
    }
}

/// File-flag stand-in for the platform permission store.
pub struct FileGrantStore {
    path: PathBuf,
}

impl FileGrantStore {
    pub fn new() -> Result<Self> {
        let dir = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .context("no state directory for this platform")?;
        Ok(Self {
            path: dir.join("voxkey").join("mic-granted"),
        })
    }

    /// Store rooted at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MicCapability for FileGrantStore {
    fn is_granted(&self) -> bool {
        self.path.exists()
    }
}

impl GrantStore for FileGrantStore {
    fn record_grant(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&self.path, b"granted\n")
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

/// Console consent dialog: one y/n question on stdin.
pub struct TerminalPrompt;

impl ConsentPrompt for TerminalPrompt {
    fn request(&mut self) -> Result<bool> {
        let mut stdout = io::stdout();
        write!(
            stdout,
            "voxkey needs access to the microphone for voice input.\nAllow? [y/N] "
        )?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let answer = line.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

/// Prints the closing confirmation to the console.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        println!("{message}");
    }
}
