use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::{info, warn};

#[cfg(feature = "typing")]
use voxkey::commit::KeystrokeCommitter;
use voxkey::commit::{CommitMethod, EchoCommitter, TextCommitter};
use voxkey::config::Config;
use voxkey::overlay::{DisplayMode, Overlay, OverlayEvent, OverlayRenderer};
use voxkey::permission::{
    ConsentLauncher, FileGrantStore, PermissionGate, TerminalNotifier, TerminalPrompt,
};
use voxkey::recognizer::RecognizerEvent;
use voxkey::replay::{ReplayFactory, ReplayScript};
use voxkey::session::{DelayQueue, SessionMsg, VoiceSession};

#[derive(Parser)]
#[command(name = "voxkey")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the microphone consent flow and exit
    Permission,
}

/// User actions from the terminal.
#[derive(Clone, Copy, Debug)]
enum KeyCommand {
    Start,
    Stop,
    /// Host the consent prompt on the run loop, outside raw mode.
    Consent,
    Quit,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if matches!(cli.command, Some(Command::Permission)) {
        return run_permission_gate();
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

fn run_permission_gate() -> anyhow::Result<()> {
    let mut store = FileGrantStore::new()?;
    let outcome = PermissionGate::run(&mut store, &mut TerminalPrompt, &TerminalNotifier);
    info!("consent flow finished: {outcome:?}");
    Ok(())
}

async fn async_main() -> anyhow::Result<()> {
    let config = Config::load();

    // Session queue: recognizer events and deferred reverts.
    let (queue_tx, queue_rx) = flume::unbounded::<SessionMsg>();

    // Recognizer adapters send plain events; bridge them onto the queue.
    let (event_tx, event_rx) = flume::unbounded::<RecognizerEvent>();
    {
        let queue_tx = queue_tx.clone();
        thread::spawn(move || {
            while let Ok(event) = event_rx.recv() {
                if queue_tx.send(SessionMsg::Recognizer(event)).is_err() {
                    break;
                }
            }
        });
    }

    let (key_tx, key_rx) = flume::unbounded::<KeyCommand>();
    {
        let key_tx = key_tx.clone();
        ctrlc::set_handler(move || {
            let _ = key_tx.send(KeyCommand::Quit);
        })?;
    }
    spawn_key_listener(key_tx.clone());

    let (overlay, overlay_rx) = Overlay::new();
    let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
    let mut renderer = OverlayRenderer::new(width);

    let script = ReplayScript::new(
        config.replay.lines.clone(),
        Duration::from_millis(config.replay.delay_ms),
    );
    let mut session = VoiceSession::new(
        Box::new(ReplayFactory::new(script)),
        event_tx,
        Box::new(FileGrantStore::new()?),
        Box::new(PumpConsent { tx: key_tx }),
        Box::new(overlay.clone()),
        build_committer(&config),
        Box::new(TokioDelayQueue { tx: queue_tx }),
    );
    session.set_view(
        Box::new(overlay.status_line()),
        Box::new(overlay.result_line()),
    );

    terminal::enable_raw_mode()?;
    renderer.handle(OverlayEvent::Mode(DisplayMode::Normal));

    let result = run_loop(&mut session, &mut renderer, &queue_rx, &key_rx, &overlay_rx).await;

    session.destroy();
    terminal::disable_raw_mode()?;
    println!();
    result
}

async fn run_loop(
    session: &mut VoiceSession,
    renderer: &mut OverlayRenderer,
    queue_rx: &flume::Receiver<SessionMsg>,
    key_rx: &flume::Receiver<KeyCommand>,
    overlay_rx: &flume::Receiver<OverlayEvent>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            Ok(msg) = queue_rx.recv_async() => {
                session.handle(msg);
            }
            Ok(cmd) = key_rx.recv_async() => match cmd {
                KeyCommand::Start => session.start(),
                KeyCommand::Stop => session.stop(),
                KeyCommand::Consent => {
                    // The prompt reads stdin lines; leave raw mode for it.
                    terminal::disable_raw_mode()?;
                    println!();
                    let mut store = FileGrantStore::new()?;
                    let outcome =
                        PermissionGate::run(&mut store, &mut TerminalPrompt, &TerminalNotifier);
                    info!("consent flow finished: {outcome:?}");
                    terminal::enable_raw_mode()?;
                    renderer.handle(OverlayEvent::Mode(DisplayMode::Normal));
                }
                KeyCommand::Quit => break,
            },
            Ok(ev) = overlay_rx.recv_async() => {
                renderer.handle(ev);
            }
        }
    }
    Ok(())
}

fn spawn_key_listener(tx: flume::Sender<KeyCommand>) {
    thread::spawn(move || {
        loop {
            if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                continue;
            }
            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let cmd = match key.code {
                KeyCode::Char('v') => KeyCommand::Start,
                KeyCode::Char('s') => KeyCommand::Stop,
                KeyCode::Char('q') | KeyCode::Esc => KeyCommand::Quit,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    KeyCommand::Quit
                }
                _ => continue,
            };
            if tx.send(cmd).is_err() {
                break;
            }
        }
    });
}

fn build_committer(config: &Config) -> Box<dyn TextCommitter> {
    let method = CommitMethod::from_str(&config.input.method);
    match method {
        CommitMethod::Echo => Box::new(EchoCommitter),
        #[cfg(feature = "typing")]
        CommitMethod::Direct | CommitMethod::Clipboard => match KeystrokeCommitter::new(method) {
            Ok(committer) => Box::new(committer),
            Err(e) => {
                warn!("keystroke committer unavailable ({e}), falling back to echo");
                Box::new(EchoCommitter)
            }
        },
        #[cfg(not(feature = "typing"))]
        CommitMethod::Direct | CommitMethod::Clipboard => {
            warn!(
                "input method {:?} needs the typing feature, falling back to echo",
                config.input.method
            );
            Box::new(EchoCommitter)
        }
    }
}

/// Routes the session's consent request onto the key-command channel so
/// the run loop can host the prompt.
struct PumpConsent {
    tx: flume::Sender<KeyCommand>,
}

impl ConsentLauncher for PumpConsent {
    fn launch(&self) -> anyhow::Result<()> {
        self.tx
            .send(KeyCommand::Consent)
            .map_err(|_| anyhow::anyhow!("run loop is gone"))
    }
}

/// Posts deferred messages back onto the session queue.
struct TokioDelayQueue {
    tx: flume::Sender<SessionMsg>,
}

impl DelayQueue for TokioDelayQueue {
    fn post_delayed(&self, msg: SessionMsg, delay: Duration) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(msg);
        });
    }
}
