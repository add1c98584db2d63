//! Recognizer port - the narrow seam between the session and whatever
//! speech engine sits behind it.
//!
//! Adapters deliver [`RecognizerEvent`]s from their own threads by
//! sending on the channel the factory was given; the session's event
//! loop is the single consumer.

use anyhow::Result;

/// Language model hint carried by a recognition request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LanguageModel {
    /// Free-form dictation (default)
    #[default]
    FreeForm,
    /// Short query-style utterances
    WebSearch,
}

/// Upper bound on candidate transcriptions per result.
pub const MAX_ALTERNATIVES: usize = 5;

/// Options for one listening attempt. The session always issues
/// [`RecognitionRequest::free_form`]; the struct exists so adapters see
/// the full option set rather than hardcoded behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognitionRequest {
    pub language_model: LanguageModel,
    pub max_alternatives: usize,
    pub partial_results: bool,
}

impl RecognitionRequest {
    /// Free-form dictation: partials on, a bounded number of
    /// alternatives, best candidate first.
    pub fn free_form() -> Self {
        Self {
            language_model: LanguageModel::FreeForm,
            max_alternatives: MAX_ALTERNATIVES,
            partial_results: true,
        }
    }
}

/// Events a recognizer delivers while an attempt is in flight.
#[derive(Clone, Debug, PartialEq)]
pub enum RecognizerEvent {
    ReadyForSpeech,
    BeginningOfSpeech,
    /// Input level changed. Currently unused; kept for level metering.
    RmsChanged(f32),
    EndOfSpeech,
    /// Candidate transcriptions so far, best first. Nothing is committed.
    Partial(Vec<String>),
    /// Final candidates, best first. Ends the attempt.
    Results(Vec<String>),
    /// Terminal failure. Ends the attempt.
    Error(ErrorCode),
}

/// The closed set of engine error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    NetworkTimeout,
    Network,
    Audio,
    Server,
    Client,
    SpeechTimeout,
    NoMatch,
    RecognizerBusy,
    InsufficientPermissions,
    /// Anything the engine reports that we don't recognize.
    Unknown,
}

impl ErrorCode {
    /// Map a raw engine error code onto the closed set.
    pub fn from_raw(code: u32) -> Self {
        match code {
            1 => ErrorCode::NetworkTimeout,
            2 => ErrorCode::Network,
            3 => ErrorCode::Audio,
            4 => ErrorCode::Server,
            5 => ErrorCode::Client,
            6 => ErrorCode::SpeechTimeout,
            7 => ErrorCode::NoMatch,
            8 => ErrorCode::RecognizerBusy,
            9 => ErrorCode::InsufficientPermissions,
            _ => ErrorCode::Unknown,
        }
    }

    /// Fixed display string for the status line.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::NetworkTimeout => "Network timeout",
            ErrorCode::Network => "Network error",
            ErrorCode::Audio => "Audio error",
            ErrorCode::Server => "Server error",
            ErrorCode::Client => "Client error",
            ErrorCode::SpeechTimeout => "No speech detected",
            ErrorCode::NoMatch => "No match found",
            ErrorCode::RecognizerBusy => "Recognizer busy",
            ErrorCode::InsufficientPermissions => "Insufficient permissions",
            ErrorCode::Unknown => "Unknown error",
        }
    }
}

/// One recognizer handle. Created lazily by the session on first use
/// and reused across attempts until destroyed.
pub trait SpeechRecognizer: Send {
    /// Begin listening for one utterance. Events for the attempt arrive
    /// on the sender the factory was given.
    fn start_listening(&mut self, request: &RecognitionRequest) -> Result<()>;

    /// Cancel the in-flight attempt. No further events are delivered
    /// for it.
    fn cancel(&mut self);

    /// Release the underlying engine handle.
    fn destroy(&mut self);
}

/// Builds the recognizer behind the port.
pub trait RecognizerFactory {
    fn create(
        &mut self,
        events: flume::Sender<RecognizerEvent>,
    ) -> Result<Box<dyn SpeechRecognizer>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_form_request_defaults() {
        let request = RecognitionRequest::free_form();
        assert_eq!(request.language_model, LanguageModel::FreeForm);
        assert_eq!(request.max_alternatives, 5);
        assert!(request.partial_results);
    }

    #[test]
    fn known_codes_map_to_fixed_messages() {
        let expected = [
            (1, "Network timeout"),
            (2, "Network error"),
            (3, "Audio error"),
            (4, "Server error"),
            (5, "Client error"),
            (6, "No speech detected"),
            (7, "No match found"),
            (8, "Recognizer busy"),
            (9, "Insufficient permissions"),
        ];
        for (raw, message) in expected {
            assert_eq!(ErrorCode::from_raw(raw).message(), message);
        }
    }

    #[test]
    fn unrecognized_codes_fall_back_to_unknown() {
        for raw in [0, 10, 42, u32::MAX] {
            assert_eq!(ErrorCode::from_raw(raw), ErrorCode::Unknown);
        }
        assert_eq!(ErrorCode::Unknown.message(), "Unknown error");
    }
}
