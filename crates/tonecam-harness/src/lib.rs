//! Headless soak harness for the tone-mapped preview engine.
//!
//! Wires the engine to synthetic collaborators, drives it from a camera
//! thread at a fixed frame rate, and records a clip on a timeline while the
//! render thread keeps presenting.

pub mod config;
pub mod file_encoder;
pub mod synthetic;

pub use config::HarnessConfig;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use tonecam_engine::{
    create_engine, wake_channel, Collaborators, EngineError, EngineHandle, RenderThread,
};
use tonecam_recorder::CollectingIndexer;
use tonecam_types::{EngineEvent, EngineMetrics, RenderStatus};

use crate::file_encoder::FileEncoderFactory;
use crate::synthetic::{
    CountingDisplay, FixedOrientation, SleepingTransform, SwitchableGeometry, TickingSurface,
};

/// How long to keep retrying a recording request while the first frame has
/// not produced a render instance yet.
const INSTANCE_WAIT: Duration = Duration::from_secs(2);

/// One recording made during the run.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedClip {
    pub path: PathBuf,
    pub frames_encoded: u64,
}

/// What a soak run observed.
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub metrics: EngineMetrics,
    pub draws: u64,
    pub encoder_dropped_frames: u64,
    pub clips: Vec<RecordedClip>,
    pub indexed: Vec<PathBuf>,
    pub recording_failures: Vec<String>,
    pub final_status: RenderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Action {
    StartRecording,
    Resize,
    StopRecording,
}

fn timeline(config: &HarnessConfig) -> Vec<(Duration, Action)> {
    let mut actions = Vec::new();
    if let Some(at) = config.record_after_ms {
        actions.push((Duration::from_millis(at), Action::StartRecording));
        actions.push((
            Duration::from_millis(at + config.record_for_ms),
            Action::StopRecording,
        ));
    }
    if let Some(at) = config.resize_after_ms {
        actions.push((Duration::from_millis(at), Action::Resize));
    }
    actions.retain(|(at, _)| at.as_millis() < u128::from(config.duration_ms));
    actions.sort();
    actions
}

fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if deadline > now {
        thread::sleep(deadline - now);
    }
}

/// Retry while the engine has not rendered its first frame yet.
fn start_recording(handle: &EngineHandle, path: PathBuf, delay: Duration) -> anyhow::Result<()> {
    let deadline = Instant::now() + INSTANCE_WAIT;
    loop {
        match handle.start_recording(path.clone(), delay) {
            Err(EngineError::NoRenderInstance) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(10));
            }
            result => return result.context("starting recording"),
        }
    }
}

/// Run one soak session and report what happened.
pub fn run(config: &HarnessConfig) -> anyhow::Result<HarnessReport> {
    let geometry = Arc::new(SwitchableGeometry::new(config.preview()));
    let indexer = Arc::new(CollectingIndexer::new());
    let draws = Arc::new(AtomicU64::new(0));
    let encoders = FileEncoderFactory::new(
        Duration::from_millis(config.encode_latency_ms),
        config.encoder_queue,
    );
    let encoder_dropped = encoders.dropped_frames();
    let (waker, wake_rx) = wake_channel();

    let collaborators = Collaborators {
        surface: Box::new(TickingSurface::default()),
        transform: Box::new(SleepingTransform::new(Duration::from_millis(
            config.transform_latency_ms,
        ))),
        display: Box::new(CountingDisplay::new(Arc::clone(&draws))),
        encoders: Box::new(encoders),
        indexer: indexer.clone(),
        geometry: geometry.clone(),
        orientation: Arc::new(FixedOrientation(config.orientation_degrees)),
        waker: waker.clone(),
    };

    let (event_tx, event_rx) = tonecam_types::event_channel();
    let (handle, renderer) = create_engine(config.engine.clone(), collaborators, event_tx);
    let render = RenderThread::spawn(
        renderer,
        waker,
        wake_rx,
        (config.surface_width, config.surface_height),
        config.engine.render.clone(),
    )
    .context("spawning render thread")?;

    let running = Arc::new(AtomicBool::new(true));
    let camera = {
        let handle = handle.clone();
        let running = Arc::clone(&running);
        let interval = config.frame_interval();
        thread::Builder::new()
            .name("tonecam-camera".into())
            .spawn(move || {
                let mut next = Instant::now();
                while running.load(Ordering::Relaxed) {
                    handle.on_frame_available();
                    next += interval;
                    sleep_until(next);
                }
            })
            .context("spawning camera thread")?
    };

    let started = Instant::now();
    info!(
        duration_ms = config.duration_ms,
        camera_fps = config.camera_fps,
        "Soak run started"
    );

    let mut events = Vec::new();
    let mut clip = 0u32;
    for (at, action) in timeline(config) {
        sleep_until(started + at);
        events.extend(event_rx.try_iter());
        match action {
            Action::StartRecording => {
                clip += 1;
                let path = config.output_dir.join(format!("tonecam-{}.rec", clip));
                start_recording(
                    &handle,
                    path,
                    Duration::from_millis(config.start_delay_ms),
                )?;
            }
            Action::Resize => {
                info!(to = %config.resized(), "Switching preview geometry");
                geometry.set(config.resized());
            }
            Action::StopRecording => {
                if let Some(summary) = handle.stop_recording().context("stopping recording")? {
                    info!(
                        path = %summary.path.display(),
                        frames = summary.frames_encoded,
                        "Clip finished"
                    );
                }
            }
        }
    }
    sleep_until(started + Duration::from_millis(config.duration_ms));

    running.store(false, Ordering::Relaxed);
    if camera.join().is_err() {
        warn!("Camera thread panicked");
    }
    render.shutdown();
    events.extend(event_rx.try_iter());

    let mut clips = Vec::new();
    let mut recording_failures = Vec::new();
    for event in events {
        match event {
            EngineEvent::RecordingStopped {
                path,
                frames_encoded,
            } => clips.push(RecordedClip {
                path,
                frames_encoded,
            }),
            EngineEvent::RecordingFailed { message } => recording_failures.push(message),
            EngineEvent::RecordingExpired { path } => {
                recording_failures.push(format!("{} expired before starting", path.display()))
            }
            _ => {}
        }
    }

    Ok(HarnessReport {
        metrics: handle.metrics(),
        draws: draws.load(Ordering::Relaxed),
        encoder_dropped_frames: encoder_dropped.load(Ordering::Relaxed),
        clips,
        indexed: indexer.paths(),
        recording_failures,
        final_status: handle.status(),
    })
}
