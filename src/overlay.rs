//! Terminal stand-in for the keyboard surface: a voice panel with a
//! status line and a result line, or the normal key-hint row.

use std::io::{self, Write};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Which surface the keyboard shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    Voice,
    Normal,
}

/// Switches the visible keyboard surface.
pub trait KeyboardDisplay {
    fn set_mode(&mut self, mode: DisplayMode);
}

/// One line of display text.
pub trait TextSink {
    fn set_text(&self, text: &str);
}

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayEvent {
    Mode(DisplayMode),
    Status(String),
    Result(String),
}

/// Clonable handle to the overlay. The renderer on the other end of
/// the channel is the single consumer.
#[derive(Clone)]
pub struct Overlay {
    tx: flume::Sender<OverlayEvent>,
}

impl Overlay {
    pub fn new() -> (Self, flume::Receiver<OverlayEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    pub fn status_line(&self) -> StatusLine {
        StatusLine(self.tx.clone())
    }

    pub fn result_line(&self) -> ResultLine {
        ResultLine(self.tx.clone())
    }
}

impl KeyboardDisplay for Overlay {
    fn set_mode(&mut self, mode: DisplayMode) {
        let _ = self.tx.send(OverlayEvent::Mode(mode));
    }
}

pub struct StatusLine(flume::Sender<OverlayEvent>);

impl TextSink for StatusLine {
    fn set_text(&self, text: &str) {
        let _ = self.0.send(OverlayEvent::Status(text.to_string()));
    }
}

pub struct ResultLine(flume::Sender<OverlayEvent>);

impl TextSink for ResultLine {
    fn set_text(&self, text: &str) {
        let _ = self.0.send(OverlayEvent::Result(text.to_string()));
    }
}

pub struct OverlayRenderer {
    mode: DisplayMode,
    status: String,
    result: String,
    width: usize,
}

impl OverlayRenderer {
    pub fn new(width: usize) -> Self {
        Self {
            mode: DisplayMode::Normal,
            status: String::new(),
            result: String::new(),
            width,
        }
    }

    pub fn handle(&mut self, event: OverlayEvent) {
        match event {
            OverlayEvent::Mode(mode) => {
                if mode == DisplayMode::Normal {
                    self.status.clear();
                    self.result.clear();
                }
                self.mode = mode;
            }
            OverlayEvent::Status(text) => self.status = text,
            OverlayEvent::Result(text) => self.result = text,
        }
        self.draw();
    }

    fn draw(&self) {
        match self.mode {
            DisplayMode::Voice => {
                // Glyph, status, separator. The rest goes to the result.
                let used = self.status.width() + 5;
                let room = self.width.saturating_sub(used);
                let result = truncate_to_width(&self.result, room);
                print!(
                    "\r\x1b[K\x1b[33m\u{1f3a4} {}\x1b[0m  \x1b[90m{}\x1b[0m",
                    self.status, result
                );
            }
            DisplayMode::Normal => {
                print!("\r\x1b[K\x1b[90m[v] dictate  [s] stop  [q] quit\x1b[0m");
            }
        }
        io::stdout().flush().ok();
    }
}

fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        // Reserve one column for the ellipsis.
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('\u{2026}');
    out
}
