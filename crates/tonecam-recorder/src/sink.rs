//! Recording sink state machine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use tonecam_types::{Geometry, RecordingPolicy, RecordingState, TextureId};

use crate::{
    EncoderFactory, MediaIndexer, RecorderError, RecorderResult, RecordingSession, VideoEncoder,
};

/// Longest start delay honoured; larger requests are clamped.
pub const MAX_START_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSummary {
    /// Output file handed to the media indexer.
    pub path: PathBuf,

    /// Frames fed to the encoder.
    pub frames_encoded: u64,
}

/// Something the engine should report after a render tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// An encoder session was constructed.
    Started(RecordingSession),

    /// An armed request waited too long for a render instance.
    Expired { path: PathBuf },
}

struct ArmedRequest {
    path: PathBuf,
    armed_at: Instant,
    waited: u32,
}

struct ActiveSession {
    session: RecordingSession,
    encoder: Box<dyn VideoEncoder>,
    frames_encoded: u64,
}

enum SinkState {
    Idle,
    Armed(ArmedRequest),
    Encoding(ActiveSession),
}

/// Optional encoder session fed with the output texture.
pub struct RecordingSink {
    factory: Box<dyn EncoderFactory>,
    indexer: Arc<dyn MediaIndexer>,
    policy: RecordingPolicy,
    state: SinkState,
}

impl RecordingSink {
    /// Create an idle sink.
    pub fn new(
        factory: Box<dyn EncoderFactory>,
        indexer: Arc<dyn MediaIndexer>,
        policy: RecordingPolicy,
    ) -> Self {
        Self {
            factory,
            indexer,
            policy,
            state: SinkState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> RecordingState {
        match self.state {
            SinkState::Idle => RecordingState::Idle,
            SinkState::Armed(_) => RecordingState::Armed,
            SinkState::Encoding(_) => RecordingState::Encoding,
        }
    }

    /// Accept a recording request. Frames are fed only after `now + delay`.
    #[instrument(name = "recording_arm", skip(self, path, now), fields(path = %path.display()))]
    pub fn arm(&mut self, path: PathBuf, delay: Duration, now: Instant) -> RecorderResult<()> {
        if !matches!(self.state, SinkState::Idle) {
            return Err(RecorderError::AlreadyRecording);
        }

        let delay = delay.min(MAX_START_DELAY);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        info!(delay_ms, "Recording armed");
        self.state = SinkState::Armed(ArmedRequest {
            path,
            armed_at: now + delay,
            waited: 0,
        });
        Ok(())
    }

    /// Count one render tick against an armed request.
    ///
    /// Returns `SinkEvent::Expired` once the request has waited more than
    /// `RecordingPolicy::max_pending_passes` ticks without being constructed.
    pub fn tick(&mut self) -> Option<SinkEvent> {
        let SinkState::Armed(request) = &mut self.state else {
            return None;
        };

        request.waited += 1;
        if request.waited <= self.policy.max_pending_passes {
            return None;
        }

        let SinkState::Armed(request) = std::mem::replace(&mut self.state, SinkState::Idle) else {
            return None;
        };
        warn!(
            path = %request.path.display(),
            waited = request.waited - 1,
            "Armed recording expired without a render instance"
        );
        Some(SinkEvent::Expired { path: request.path })
    }

    /// Construct the encoder for an armed request.
    ///
    /// Called on a render pass that has a render instance for `geometry`.
    /// `orientation` is queried only when a session is actually built. On
    /// failure the request is dropped and the sink returns to idle.
    pub fn activate(
        &mut self,
        geometry: Geometry,
        orientation: impl FnOnce() -> u32,
    ) -> RecorderResult<Option<SinkEvent>> {
        if !matches!(self.state, SinkState::Armed(_)) {
            return Ok(None);
        }
        let SinkState::Armed(request) = std::mem::replace(&mut self.state, SinkState::Idle) else {
            return Ok(None);
        };

        let session = RecordingSession {
            output_path: request.path,
            width: geometry.width,
            height: geometry.height,
            frame_rate: self.policy.frame_rate,
            bitrate: self.policy.bitrate,
            orientation_degrees: orientation() % 360,
            armed_at: request.armed_at,
        };

        let encoder = self.factory.create(&session)?;
        info!(
            path = %session.output_path.display(),
            %geometry,
            fps = session.frame_rate,
            bitrate = session.bitrate,
            orientation = session.orientation_degrees,
            "Encoder session started"
        );

        self.state = SinkState::Encoding(ActiveSession {
            session: session.clone(),
            encoder,
            frames_encoded: 0,
        });
        Ok(Some(SinkEvent::Started(session)))
    }

    /// Feed the output texture to the encoder once the start delay elapsed.
    ///
    /// Returns whether a frame was encoded. An encode failure closes the
    /// encoder and clears the session.
    pub fn feed(&mut self, texture: TextureId, now: Instant) -> RecorderResult<bool> {
        let SinkState::Encoding(active) = &mut self.state else {
            return Ok(false);
        };

        if now <= active.session.armed_at {
            return Ok(false);
        }

        match active.encoder.encode(texture) {
            Ok(()) => {
                active.frames_encoded += 1;
                Ok(true)
            }
            Err(e) => {
                warn!("Encode failed, closing recording: {}", e);
                self.abort();
                Err(e)
            }
        }
    }

    /// Stop recording.
    ///
    /// Closes the encoder and indexes the file when encoding; disarms a
    /// pending request; does nothing when idle.
    #[instrument(name = "recording_stop", skip(self))]
    pub fn stop(&mut self) -> RecorderResult<Option<RecordingSummary>> {
        match std::mem::replace(&mut self.state, SinkState::Idle) {
            SinkState::Idle => {
                debug!("Not recording, stop ignored");
                Ok(None)
            }
            SinkState::Armed(request) => {
                info!(path = %request.path.display(), "Armed recording cancelled");
                Ok(None)
            }
            SinkState::Encoding(mut active) => {
                let path = active.encoder.path().to_path_buf();
                active.encoder.close()?;
                self.indexer.index(&path);
                info!(
                    path = %path.display(),
                    frames = active.frames_encoded,
                    "Recording stopped"
                );
                Ok(Some(RecordingSummary {
                    path,
                    frames_encoded: active.frames_encoded,
                }))
            }
        }
    }

    /// Drop the current session without indexing its file.
    fn abort(&mut self) {
        if let SinkState::Encoding(mut active) = std::mem::replace(&mut self.state, SinkState::Idle)
        {
            if let Err(e) = active.encoder.close() {
                warn!("Failed to close encoder after error: {}", e);
            }
        }
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        if matches!(self.state, SinkState::Encoding(_)) {
            if let Err(e) = self.stop() {
                warn!("Failed to finalize recording at drop: {}", e);
            }
        }
    }
}
