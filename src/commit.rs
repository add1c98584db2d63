//! Commit backends - append recognized text to the active input target.
//!
//! Two backends: **echo** writes the text to stdout (always available),
//! **keystroke** (feature `typing`) synthesizes real input into the
//! focused application, either directly or via clipboard + paste.

use std::fmt;
use std::io::Write;

/// Appends text to whatever currently has focus.
pub trait TextCommitter {
    fn commit(&mut self, text: &str) -> Result<(), CommitError>;
}

/// Error type for commit operations
#[derive(Debug)]
pub enum CommitError {
    Keystroke(String),
    Clipboard(String),
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::Keystroke(msg) => write!(f, "Keystroke error: {}", msg),
            CommitError::Clipboard(msg) => write!(f, "Clipboard error: {}", msg),
        }
    }
}

impl std::error::Error for CommitError {}

/// How committed text reaches the target application.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CommitMethod {
    /// Print to stdout (default, always available)
    #[default]
    Echo,
    /// Synthesize keystrokes directly
    Direct,
    /// Copy to clipboard, then paste
    Clipboard,
}

impl CommitMethod {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "direct" => CommitMethod::Direct,
            "clipboard" => CommitMethod::Clipboard,
            _ => CommitMethod::Echo,
        }
    }
}

/// Fallback target: committed text lands on stdout.
pub struct EchoCommitter;

impl TextCommitter for EchoCommitter {
    fn commit(&mut self, text: &str) -> Result<(), CommitError> {
        print!("\r\x1b[K> {}\r\n", text);
        std::io::stdout()
            .flush()
            .map_err(|e| CommitError::Keystroke(e.to_string()))
    }
}

#[cfg(feature = "typing")]
pub use keystroke::KeystrokeCommitter;

#[cfg(feature = "typing")]
mod keystroke {
    use std::thread;
    use std::time::Duration;

    use arboard::Clipboard;
    use enigo::{Direction, Enigo, Key, Keyboard, Settings};

    use super::{CommitError, CommitMethod, TextCommitter};

    /// Types committed text into the focused application.
    pub struct KeystrokeCommitter {
        enigo: Enigo,
        clipboard: Clipboard,
        method: CommitMethod,
    }

    impl KeystrokeCommitter {
        pub fn new(method: CommitMethod) -> Result<Self, CommitError> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| CommitError::Keystroke(format!("Failed to initialize Enigo: {}", e)))?;
            let clipboard = Clipboard::new().map_err(|e| {
                CommitError::Clipboard(format!("Failed to initialize clipboard: {}", e))
            })?;

            Ok(Self {
                enigo,
                clipboard,
                method,
            })
        }

        /// Platform-specific paste modifier (Cmd on macOS, Ctrl elsewhere)
        fn modifier_key() -> Key {
            #[cfg(target_os = "macos")]
            {
                Key::Meta
            }
            #[cfg(not(target_os = "macos"))]
            {
                Key::Control
            }
        }

        fn send_paste(&mut self) -> Result<(), CommitError> {
            self.enigo
                .key(Self::modifier_key(), Direction::Press)
                .map_err(|e| CommitError::Keystroke(format!("Failed to press modifier: {}", e)))?;
            thread::sleep(Duration::from_millis(10));
            self.enigo
                .key(Key::Unicode('v'), Direction::Click)
                .map_err(|e| CommitError::Keystroke(format!("Failed to send paste: {}", e)))?;
            thread::sleep(Duration::from_millis(50));
            self.enigo
                .key(Self::modifier_key(), Direction::Release)
                .map_err(|e| CommitError::Keystroke(format!("Failed to release modifier: {}", e)))
        }

        fn commit_via_clipboard(&mut self, text: &str) -> Result<(), CommitError> {
            // Save current clipboard content (best effort)
            let previous = self.clipboard.get_text().ok();

            self.clipboard
                .set_text(text)
                .map_err(|e| CommitError::Clipboard(format!("Failed to set clipboard: {}", e)))?;
            thread::sleep(Duration::from_millis(50));

            let pasted = self.send_paste();
            thread::sleep(Duration::from_millis(100));

            // Restore old clipboard content (best effort)
            if let Some(previous) = previous {
                let _ = self.clipboard.set_text(previous);
            }

            pasted
        }
    }

    impl TextCommitter for KeystrokeCommitter {
        fn commit(&mut self, text: &str) -> Result<(), CommitError> {
            if text.is_empty() {
                return Ok(());
            }

            match self.method {
                CommitMethod::Clipboard => self.commit_via_clipboard(text),
                _ => self
                    .enigo
                    .text(text)
                    .map_err(|e| CommitError::Keystroke(format!("Failed to type text: {}", e))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_method_from_str() {
        assert_eq!(CommitMethod::from_str("echo"), CommitMethod::Echo);
        assert_eq!(CommitMethod::from_str("direct"), CommitMethod::Direct);
        assert_eq!(CommitMethod::from_str("Direct"), CommitMethod::Direct);
        assert_eq!(CommitMethod::from_str("clipboard"), CommitMethod::Clipboard);
        assert_eq!(CommitMethod::from_str("unknown"), CommitMethod::Echo);
    }

    #[test]
    fn commit_error_display() {
        let e = CommitError::Clipboard("no display".into());
        assert_eq!(e.to_string(), "Clipboard error: no display");
    }
}
