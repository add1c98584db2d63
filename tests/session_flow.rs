//! End-to-end session flow: replay recognizer events drive the session
//! queue and the recognized line lands in the commit backend.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use voxkey::commit::{CommitError, TextCommitter};
use voxkey::overlay::{DisplayMode, KeyboardDisplay, TextSink};
use voxkey::permission::{ConsentLauncher, MicCapability};
use voxkey::recognizer::RecognizerEvent;
use voxkey::replay::{ReplayFactory, ReplayScript};
use voxkey::session::{
    DelayQueue, ERROR_REVERT_DELAY, RESULT_REVERT_DELAY, SessionMsg, VoiceSession,
};

struct SharedCommits(Arc<Mutex<Vec<String>>>);

impl TextCommitter for SharedCommits {
    fn commit(&mut self, text: &str) -> Result<(), CommitError> {
        self.0.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct Granted;

impl MicCapability for Granted {
    fn is_granted(&self) -> bool {
        true
    }
}

struct NoConsent;

impl ConsentLauncher for NoConsent {
    fn launch(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Modes(Arc<Mutex<Vec<DisplayMode>>>);

impl KeyboardDisplay for Modes {
    fn set_mode(&mut self, mode: DisplayMode) {
        self.0.lock().unwrap().push(mode);
    }
}

struct Line(Arc<Mutex<String>>);

impl TextSink for Line {
    fn set_text(&self, text: &str) {
        *self.0.lock().unwrap() = text.to_string();
    }
}

struct Posted(Arc<Mutex<Vec<(SessionMsg, Duration)>>>);

impl DelayQueue for Posted {
    fn post_delayed(&self, msg: SessionMsg, delay: Duration) {
        self.0.lock().unwrap().push((msg, delay));
    }
}

struct Flow {
    session: VoiceSession,
    event_rx: flume::Receiver<RecognizerEvent>,
    commits: Arc<Mutex<Vec<String>>>,
    status: Arc<Mutex<String>>,
    result: Arc<Mutex<String>>,
    posted: Arc<Mutex<Vec<(SessionMsg, Duration)>>>,
}

fn flow(lines: &[&str]) -> Flow {
    let (event_tx, event_rx) = flume::unbounded();
    let commits = Arc::new(Mutex::new(Vec::new()));
    let status = Arc::new(Mutex::new(String::new()));
    let result = Arc::new(Mutex::new(String::new()));
    let posted = Arc::new(Mutex::new(Vec::new()));

    let script = ReplayScript::new(
        lines.iter().map(|l| l.to_string()).collect(),
        Duration::ZERO,
    );
    let mut session = VoiceSession::new(
        Box::new(ReplayFactory::new(script)),
        event_tx,
        Box::new(Granted),
        Box::new(NoConsent),
        Box::new(Modes(Arc::new(Mutex::new(Vec::new())))),
        Box::new(SharedCommits(commits.clone())),
        Box::new(Posted(posted.clone())),
    );
    session.set_view(Box::new(Line(status.clone())), Box::new(Line(result.clone())));

    Flow {
        session,
        event_rx,
        commits,
        status,
        result,
        posted,
    }
}

/// Feed recognizer events into the session until the attempt ends.
fn pump_attempt(flow: &mut Flow) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let event = flow
            .event_rx
            .recv_timeout(remaining)
            .expect("recognizer went quiet");
        let terminal = matches!(
            event,
            RecognizerEvent::Results(_) | RecognizerEvent::Error(_)
        );
        flow.session.handle(SessionMsg::Recognizer(event));
        if terminal {
            break;
        }
    }
}

#[test]
fn replayed_line_is_committed_with_trailing_space() {
    let mut flow = flow(&["hello world"]);

    flow.session.start();
    assert!(flow.session.is_listening());
    pump_attempt(&mut flow);

    assert!(!flow.session.is_listening());
    assert_eq!(flow.commits.lock().unwrap().as_slice(), ["hello world "]);
    assert_eq!(flow.result.lock().unwrap().as_str(), "hello world");
    assert_eq!(flow.status.lock().unwrap().as_str(), "Processing...");
    assert_eq!(
        flow.posted.lock().unwrap().as_slice(),
        [(SessionMsg::RevertDisplay, RESULT_REVERT_DELAY)]
    );
}

#[test]
fn attempts_replay_successive_lines() {
    let mut flow = flow(&["first line", "second line"]);

    flow.session.start();
    pump_attempt(&mut flow);
    flow.session.start();
    pump_attempt(&mut flow);

    assert_eq!(
        flow.commits.lock().unwrap().as_slice(),
        ["first line ", "second line "]
    );
}

#[test]
fn exhausted_script_surfaces_speech_timeout() {
    let mut flow = flow(&["only line"]);

    flow.session.start();
    pump_attempt(&mut flow);
    flow.session.start();
    pump_attempt(&mut flow);

    assert!(!flow.session.is_listening());
    assert_eq!(
        flow.status.lock().unwrap().as_str(),
        "Error: No speech detected"
    );
    assert_eq!(
        flow.posted.lock().unwrap().last(),
        Some(&(SessionMsg::RevertDisplay, ERROR_REVERT_DELAY))
    );
    assert_eq!(flow.commits.lock().unwrap().len(), 1);
}

#[test]
fn destroy_after_flow_is_safe() {
    let mut flow = flow(&["hello"]);

    flow.session.start();
    pump_attempt(&mut flow);
    flow.session.destroy();
    flow.session.destroy();

    assert!(!flow.session.is_listening());
}
