//! Scripted recognizer: replays canned transcript lines through the
//! full event contract. Stands in for a real engine in the demo binary
//! and drives the integration tests at zero pacing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use log::info;

use crate::recognizer::{
    ErrorCode, RecognitionRequest, RecognizerEvent, RecognizerFactory, SpeechRecognizer,
};

#[derive(Clone, Debug)]
pub struct ReplayScript {
    /// Transcript lines, one per listening attempt.
    pub lines: Vec<String>,
    /// Pacing between events. Zero for tests.
    pub delay: Duration,
}

impl ReplayScript {
    pub fn new(lines: Vec<String>, delay: Duration) -> Self {
        Self { lines, delay }
    }
}

pub struct ReplayRecognizer {
    script: ReplayScript,
    next_line: usize,
    events: flume::Sender<RecognizerEvent>,
    /// Cleared to silence the in-flight worker.
    current: Option<Arc<AtomicBool>>,
}

impl ReplayRecognizer {
    pub fn new(script: ReplayScript, events: flume::Sender<RecognizerEvent>) -> Self {
        Self {
            script,
            next_line: 0,
            events,
            current: None,
        }
    }
}

impl SpeechRecognizer for ReplayRecognizer {
    fn start_listening(&mut self, request: &RecognitionRequest) -> Result<()> {
        let line = match self.script.lines.get(self.next_line) {
            Some(line) => line.clone(),
            None => {
                // Script exhausted: report it the way an engine that
                // heard nothing would.
                let _ = self
                    .events
                    .send(RecognizerEvent::Error(ErrorCode::SpeechTimeout));
                return Ok(());
            }
        };
        self.next_line += 1;

        let live = Arc::new(AtomicBool::new(true));
        self.current = Some(live.clone());

        let events = self.events.clone();
        let delay = self.script.delay;
        let max_alternatives = request.max_alternatives;
        let partials = request.partial_results;

        thread::spawn(move || {
            let send = |event: RecognizerEvent| -> bool {
                live.load(Ordering::SeqCst) && events.send(event).is_ok()
            };

            if !send(RecognizerEvent::ReadyForSpeech) {
                return;
            }
            thread::sleep(delay);
            if !send(RecognizerEvent::BeginningOfSpeech) {
                return;
            }

            let mut spoken = String::new();
            for word in line.split_whitespace() {
                thread::sleep(delay);
                if !spoken.is_empty() {
                    spoken.push(' ');
                }
                spoken.push_str(word);
                if partials && !send(RecognizerEvent::Partial(vec![spoken.clone()])) {
                    return;
                }
            }

            thread::sleep(delay);
            if !send(RecognizerEvent::EndOfSpeech) {
                return;
            }

            thread::sleep(delay);
            let mut candidates = vec![line.clone()];
            let lowered = line.to_lowercase();
            if lowered != line {
                candidates.push(lowered);
            }
            candidates.truncate(max_alternatives);
            send(RecognizerEvent::Results(candidates));
        });

        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(live) = self.current.take() {
            live.store(false, Ordering::SeqCst);
        }
    }

    fn destroy(&mut self) {
        self.cancel();
    }
}

pub struct ReplayFactory {
    script: ReplayScript,
}

impl ReplayFactory {
    pub fn new(script: ReplayScript) -> Self {
        Self { script }
    }
}

impl RecognizerFactory for ReplayFactory {
    fn create(
        &mut self,
        events: flume::Sender<RecognizerEvent>,
    ) -> Result<Box<dyn SpeechRecognizer>> {
        info!(
            "creating replay recognizer ({} scripted lines)",
            self.script.lines.len()
        );
        Ok(Box::new(ReplayRecognizer::new(self.script.clone(), events)))
    }
}
