//! One recognition attempt at a time: start, recognizer events, text
//! commit, teardown.
//!
//! The session is not thread-safe and does not need to be: recognizer
//! adapters send their events onto the session queue, and whoever owns
//! the queue's receiving end is the only caller of [`VoiceSession`]
//! methods. UI writes happen inline on that task.

use std::time::Duration;

use log::{error, info, warn};

use crate::commit::TextCommitter;
use crate::overlay::{DisplayMode, KeyboardDisplay, TextSink};
use crate::permission::{ConsentLauncher, MicCapability};
use crate::recognizer::{
    RecognitionRequest, RecognizerEvent, RecognizerFactory, SpeechRecognizer,
};

/// Messages consumed by the session's event loop.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionMsg {
    Recognizer(RecognizerEvent),
    /// Deferred switch of the keyboard display back to normal mode.
    RevertDisplay,
}

/// Deferred delivery back into the session queue.
///
/// A posted message always fires; nothing unschedules it. A revert
/// posted by one attempt can land after a newer attempt has started
/// and flip its display back to normal mode.
pub trait DelayQueue {
    fn post_delayed(&self, msg: SessionMsg, delay: Duration);
}

/// Display reversion delay after a recognition error.
pub const ERROR_REVERT_DELAY: Duration = Duration::from_millis(1500);
/// Display reversion delay after a final result.
pub const RESULT_REVERT_DELAY: Duration = Duration::from_millis(800);
/// Display reversion delay after the on-keyboard permission hint.
pub const PERMISSION_HINT_DELAY: Duration = Duration::from_millis(3000);

/// Owns the lifecycle of one listening attempt: checks the microphone
/// capability, switches the keyboard display, drives the recognizer,
/// mirrors status/result text, and commits final text into the active
/// input target.
pub struct VoiceSession {
    recognizers: Box<dyn RecognizerFactory>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    events: flume::Sender<RecognizerEvent>,
    capability: Box<dyn MicCapability>,
    consent: Box<dyn ConsentLauncher>,
    display: Box<dyn KeyboardDisplay>,
    committer: Box<dyn TextCommitter>,
    delay_queue: Box<dyn DelayQueue>,
    status: Option<Box<dyn TextSink>>,
    result: Option<Box<dyn TextSink>>,
    listening: bool,
}

impl VoiceSession {
    pub fn new(
        recognizers: Box<dyn RecognizerFactory>,
        events: flume::Sender<RecognizerEvent>,
        capability: Box<dyn MicCapability>,
        consent: Box<dyn ConsentLauncher>,
        display: Box<dyn KeyboardDisplay>,
        committer: Box<dyn TextCommitter>,
        delay_queue: Box<dyn DelayQueue>,
    ) -> Self {
        Self {
            recognizers,
            recognizer: None,
            events,
            capability,
            consent,
            display,
            committer,
            delay_queue,
            status: None,
            result: None,
            listening: false,
        }
    }

    /// Attach the status and result display lines.
    pub fn set_view(&mut self, status: Box<dyn TextSink>, result: Box<dyn TextSink>) {
        self.status = Some(status);
        self.result = Some(result);
    }

    /// Detach both display lines.
    pub fn clear_view(&mut self) {
        self.status = None;
        self.result = None;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Begin a listening attempt.
    ///
    /// No-op while an attempt is in flight. Without the microphone
    /// capability the attempt is aborted and the consent flow launched
    /// instead. The recognizer is created on first use and reused.
    pub fn start(&mut self) {
        if self.listening {
            warn!("already listening, ignoring start request");
            return;
        }

        if !self.capability.is_granted() {
            warn!("microphone capability not granted, requesting");
            self.request_capability();
            return;
        }

        info!("starting voice recognition");
        self.display.set_mode(DisplayMode::Voice);

        if self.recognizer.is_none() {
            match self.recognizers.create(self.events.clone()) {
                Ok(recognizer) => self.recognizer = Some(recognizer),
                Err(e) => {
                    error!("failed to create recognizer: {e:#}");
                    self.update_status("Failed to start");
                    return;
                }
            }
        }
        let Some(recognizer) = self.recognizer.as_mut() else {
            return;
        };

        let request = RecognitionRequest::free_form();
        match recognizer.start_listening(&request) {
            Ok(()) => {
                self.listening = true;
                self.update_status("Initializing...");
                info!("voice recognition started");
            }
            Err(e) => {
                error!("failed to start voice recognition: {e:#}");
                self.update_status("Failed to start");
                self.listening = false;
            }
        }
    }

    /// Cancel the in-flight attempt, if any.
    pub fn stop(&mut self) {
        if !self.listening {
            return;
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            info!("stopping voice recognition");
            recognizer.cancel();
        }
        self.listening = false;
    }

    /// Release the recognizer handle. Safe to call repeatedly and when
    /// no attempt was ever started.
    pub fn destroy(&mut self) {
        if let Some(mut recognizer) = self.recognizer.take() {
            recognizer.destroy();
        }
        self.listening = false;
    }

    /// Dispatch one queued message.
    pub fn handle(&mut self, msg: SessionMsg) {
        match msg {
            SessionMsg::Recognizer(event) => self.handle_event(event),
            SessionMsg::RevertDisplay => self.display.set_mode(DisplayMode::Normal),
        }
    }

    fn handle_event(&mut self, event: RecognizerEvent) {
        match event {
            RecognizerEvent::ReadyForSpeech => {
                info!("ready for speech");
                self.update_status("Listening...");
            }
            RecognizerEvent::BeginningOfSpeech => {
                info!("beginning of speech");
                self.update_status("Speak now");
            }
            RecognizerEvent::RmsChanged(_) => {}
            RecognizerEvent::EndOfSpeech => {
                info!("end of speech");
                self.update_status("Processing...");
                self.listening = false;
            }
            RecognizerEvent::Error(code) => {
                error!("speech recognition error: {code:?}");
                self.update_status(&format!("Error: {}", code.message()));
                self.listening = false;
                self.delay_queue
                    .post_delayed(SessionMsg::RevertDisplay, ERROR_REVERT_DELAY);
            }
            RecognizerEvent::Partial(candidates) => {
                if let Some(text) = candidates.first() {
                    self.update_result(text);
                }
            }
            RecognizerEvent::Results(candidates) => {
                info!("speech recognition results received");
                if let Some(text) = candidates.first() {
                    info!("recognized text: {text}");
                    self.update_result(text);
                    self.insert_text(text);
                    self.delay_queue
                        .post_delayed(SessionMsg::RevertDisplay, RESULT_REVERT_DELAY);
                }
                self.listening = false;
            }
        }
    }

    fn request_capability(&mut self) {
        match self.consent.launch() {
            Ok(()) => info!("launched consent flow"),
            Err(e) => {
                error!("failed to launch consent flow: {e:#}");
                // Fall back to an on-keyboard hint.
                self.display.set_mode(DisplayMode::Voice);
                self.update_status("Permission needed");
                self.update_result("Please enable Microphone permission in Settings");
                self.delay_queue
                    .post_delayed(SessionMsg::RevertDisplay, PERMISSION_HINT_DELAY);
            }
        }
    }

    fn insert_text(&mut self, text: &str) {
        match self.committer.commit(&format!("{text} ")) {
            Ok(()) => info!("inserted text: {text}"),
            Err(e) => warn!("no input target available: {e}"),
        }
    }

    fn update_status(&self, text: &str) {
        if let Some(sink) = &self.status {
            sink.set_text(text);
        }
    }

    fn update_result(&self, text: &str) {
        if let Some(sink) = &self.result {
            sink.set_text(text);
        }
    }
}
