use anyhow::{Context, Result};
use clap::Parser;
use pixelface_core::demo::run_demo;
use pixelface_core::{SharedMapper, StateMapper, ToolCallDispatcher, UiCommand};
use pixelface_renderer::{AnimationCue, Face, Side, VisualTree};
use pixelface_service::bridge_adapter::BridgeProvider;
use pixelface_service::config::{BRIDGE_CHANNEL_CAPACITY, Config, UI_CHANNEL_CAPACITY};
use pixelface_service::console::{self, ConsoleCommand};
use pixelface_service::join::join_room;
use pixelface_session::{SessionClient, SessionConfig, UserIdentity, room_and_identity};
use pixelface_types::{EmotionState, ThreadRandom};
use std::path::PathBuf;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Expressive pixel face for a realtime voice agent")]
struct Cli {
    /// Cycle through the demo sequence instead of joining a room
    #[arg(long)]
    demo: bool,
    /// Pin the face to one emotion (neutral, happy, sad, confused, thinking, listening, talking)
    #[arg(long, value_parser = console::parse_emotion)]
    emotion: Option<EmotionState>,
    /// Signed-in user id; the room name is derived from it
    #[arg(long)]
    user_id: Option<String>,
    /// Signed-in user's email; its local part becomes the participant identity
    #[arg(long, requires = "user_id")]
    email: Option<String>,
    /// Read room settings from this file instead of .env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

/// One line of stdout output per visible change of the face.
#[derive(serde::Serialize)]
struct FaceFrame<'a> {
    at_ms: u128,
    emotion: EmotionState,
    cue: AnimationCue,
    /// Eye openness sampled at `at_ms`
    eyes: Vec<EyeSample>,
    tree: &'a VisualTree,
}

#[derive(serde::Serialize)]
struct EyeSample {
    side: Side,
    scale_y: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    // stdout carries face frames; logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded successfully. Starting face agent...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. State Mapper and Overlays ---
    let (ui_tx, mut ui_rx) = mpsc::channel::<UiCommand>(UI_CHANNEL_CAPACITY);
    let mapper = StateMapper::new(ThreadRandom::new(), ToolCallDispatcher::new(ui_tx)).shared();
    if let Some(state) = args.emotion {
        tracing::info!("holding face at {}", state);
        lock(&mapper).hold(Some(state));
    }

    let ui_handle = tokio::spawn(async move {
        while let Some(command) = ui_rx.recv().await {
            match serde_json::to_string(&command) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!("failed to serialize ui command: {}", e),
            }
        }
    });

    // --- 5. Face ---
    let (face_stop_tx, face_stop_rx) = oneshot::channel();
    let emotion_rx = lock(&mapper).subscribe();
    let face_handle = tokio::spawn(run_face(emotion_rx, config.frame_interval(), face_stop_rx));

    // --- 6. Room Session ---
    let session_config = match &args.env_file {
        Some(path) => SessionConfig::from_env_file(path),
        None => SessionConfig::from_env(),
    }
    .context("Failed to load session configuration")?;
    let provider = Arc::new(BridgeProvider::new(&config.bridge_url, BRIDGE_CHANNEL_CAPACITY));
    let client = SessionClient::from_config(session_config, provider, mapper.clone());

    let user = args.user_id.as_deref().map(|id| match &args.email {
        Some(email) => UserIdentity::new(id).with_email(email),
        None => UserIdentity::new(id),
    });
    let (room, identity) = room_and_identity(user.as_ref());

    let mut demo: Option<JoinHandle<()>> = None;
    if args.demo {
        demo = Some(tokio::spawn(run_demo(mapper.clone())));
    } else {
        join_room(&client, &room, &identity).await;
    }

    // --- 7. Debug Console ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    tracing::info!("{}", console::HELP);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::debug!("stdin closed, console disabled");
                        stdin_open = false;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!("failed to read console input: {}", e);
                        stdin_open = false;
                        continue;
                    }
                };
                let command = match console::parse_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        continue;
                    }
                };
                match command {
                    ConsoleCommand::Emotion(state) => lock(&mapper).set_emotion(state),
                    ConsoleCommand::Hold(state) => lock(&mapper).hold(Some(state)),
                    ConsoleCommand::Release => lock(&mapper).hold(None),
                    ConsoleCommand::ToggleMute => {
                        client.toggle_mute().await;
                        let state = if client.is_muted() { "muted" } else { "live" };
                        tracing::info!("microphone {}", state);
                    }
                    ConsoleCommand::Connect => {
                        join_room(&client, &room, &identity).await;
                    }
                    ConsoleCommand::Disconnect => client.disconnect().await,
                    ConsoleCommand::Dismiss(kind) => {
                        if !lock(&mapper).dispatcher_mut().dismiss(kind) {
                            tracing::info!("{:?} overlay was not open", kind);
                        }
                    }
                    ConsoleCommand::ToggleDemo => match demo.take() {
                        Some(handle) => {
                            handle.abort();
                            tracing::info!("demo loop stopped");
                        }
                        None => demo = Some(tokio::spawn(run_demo(mapper.clone()))),
                    },
                    ConsoleCommand::Status => {
                        let guard = lock(&mapper);
                        tracing::info!(
                            "status={:?} muted={} sinks={} emotion={} held={:?} overlays={:?}",
                            client.status(),
                            client.is_muted(),
                            client.active_sinks(),
                            guard.emotion(),
                            guard.held(),
                            guard.dispatcher().overlays()
                        );
                    }
                    ConsoleCommand::Help => tracing::info!("{}", console::HELP),
                    ConsoleCommand::Quit => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, shutting down.");
                break;
            }
        }
    }

    // --- 8. Shutdown ---
    if let Some(handle) = demo.take() {
        handle.abort();
    }
    client.disconnect().await;
    let _ = face_stop_tx.send(());
    if let Err(e) = face_handle.await {
        tracing::warn!("face task ended abnormally: {}", e);
    }
    ui_handle.abort();
    tracing::info!("Face agent stopped.");
    Ok(())
}

fn lock(mapper: &SharedMapper) -> MutexGuard<'_, StateMapper> {
    mapper.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the face for the lifetime of the process: follows the mapper's
/// emotion, drives the face clock from a frame ticker and prints a frame
/// whenever what is on screen changes.
async fn run_face(
    mut emotion_rx: watch::Receiver<EmotionState>,
    frame: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut face = Face::new(ThreadRandom::new());
    face.set_emotion(*emotion_rx.borrow_and_update());

    let mut ticker = tokio::time::interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();
    let mut shown: Option<(EmotionState, AnimationCue)> = None;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            changed = emotion_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *emotion_rx.borrow_and_update();
                face.set_emotion(state);
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                face.advance(now - last_tick);
                last_tick = now;
            }
        }

        let current = (face.emotion(), face.cue());
        if shown != Some(current) {
            shown = Some(current);
            let tree = face.render();
            let elapsed = face.now().as_secs_f32();
            let frame = FaceFrame {
                at_ms: face.now().as_millis(),
                emotion: current.0,
                cue: current.1,
                eyes: tree
                    .eyes()
                    .map(|eye| EyeSample {
                        side: eye.side,
                        scale_y: eye.scale_y.sample(elapsed),
                    })
                    .collect(),
                tree: &tree,
            };
            match serde_json::to_string(&frame) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!("failed to serialize face frame: {}", e),
            }
        }
    }

    face.teardown();
    tracing::debug!("face torn down, {} timers pending", face.pending_timers());
}
