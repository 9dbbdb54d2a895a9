//! State guarded by the engine lock and the render pass.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use tonecam_present::{DisplayBackend, PresentationStage};
use tonecam_recorder::{RecordingSink, RecordingSummary, SinkEvent};
use tonecam_source::FrameSource;
use tonecam_transform::{TransformError, TransformStage};
use tonecam_types::{
    EngineEvent, Geometry, RecordingState, RenderStatus, TransformState,
};

use crate::events::EventSender;
use crate::metrics::MetricsCollector;
use crate::settings::ToneMapSettings;
use crate::{EngineError, EngineResult, GeometryProvider, OrientationProvider};

/// What a call to `Renderer::on_draw_frame` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// No frame was pending, or the surface could not deliver it.
    NoFrame,

    /// The engine is paused; any pending frame was dropped.
    Paused,

    /// The preview geometry had a zero dimension; the frame was dropped and
    /// the render instance left as it was.
    InvalidGeometry(Geometry),

    /// A frame was transformed and presented.
    Rendered(PassReport),
}

/// Details of a completed render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// Acquisition number of the frame.
    pub sequence: u64,

    /// Preview geometry the frame was rendered at.
    pub geometry: Geometry,

    /// Whether the transform call recomputed all temporal state.
    pub forced: bool,

    /// Whether the frame was handed to the encoder.
    pub encoded: bool,

    /// Time spent in the transform engine.
    pub transform_time: Duration,
}

/// Everything a render pass or lifecycle request may mutate.
///
/// Dropping the core tears down like `pause`: the recording is finalized
/// before the render instance feeding it is released.
pub(crate) struct EngineCore {
    frames: FrameSource,
    sink: RecordingSink,
    transform: TransformStage,
    presenter: PresentationStage,
    display: Box<dyn DisplayBackend>,
    geometry: Arc<dyn GeometryProvider>,
    orientation: Arc<dyn OrientationProvider>,
    status: RenderStatus,
}

/// Shared read-only services a pass reports to.
pub(crate) struct PassContext<'a> {
    pub settings: &'a ToneMapSettings,
    pub metrics: &'a MetricsCollector,
    pub events: &'a EventSender,
}

impl EngineCore {
    pub(crate) fn new(
        frames: FrameSource,
        transform: TransformStage,
        display: Box<dyn DisplayBackend>,
        sink: RecordingSink,
        geometry: Arc<dyn GeometryProvider>,
        orientation: Arc<dyn OrientationProvider>,
    ) -> Self {
        Self {
            frames,
            sink,
            transform,
            presenter: PresentationStage::new(),
            display,
            geometry,
            orientation,
            status: RenderStatus::Running,
        }
    }

    pub(crate) fn status(&self) -> &RenderStatus {
        &self.status
    }

    pub(crate) fn recording_state(&self) -> RecordingState {
        self.sink.state()
    }

    pub(crate) fn transform_state(&self) -> TransformState {
        self.transform.state()
    }

    /// A new display surface exists: allocate GPU resources for it.
    pub(crate) fn surface_created(&mut self, ctx: &PassContext<'_>) -> EngineResult<()> {
        let output = self.presenter.init(self.display.as_mut())?;
        self.transform.set_output(output);
        self.frames.signal().reset();
        ctx.metrics.flush();

        if matches!(self.status, RenderStatus::Paused) {
            info!("Resuming after pause");
            self.status = RenderStatus::Running;
        }
        Ok(())
    }

    pub(crate) fn surface_changed(&mut self, width: u32, height: u32) {
        self.presenter.resize(width, height);
    }

    /// One render pass: consume frame, transform, present, encode.
    pub(crate) fn render_pass(&mut self, ctx: &PassContext<'_>) -> EngineResult<PassOutcome> {
        if let RenderStatus::Faulted { message } = &self.status {
            return Err(EngineError::Faulted(message.clone()));
        }
        if matches!(self.status, RenderStatus::Paused) {
            self.frames.signal().reset();
            return Ok(PassOutcome::Paused);
        }

        if let Some(SinkEvent::Expired { path }) = self.sink.tick() {
            ctx.events.send(EngineEvent::RecordingExpired { path });
        }

        let Some(frame) = self.frames.acquire() else {
            return Ok(PassOutcome::NoFrame);
        };

        let geometry = self.geometry.preview_geometry();
        if !geometry.is_valid() {
            debug!(%geometry, "Preview geometry not ready, frame skipped");
            return Ok(PassOutcome::InvalidGeometry(geometry));
        }

        match self.transform.prepare(geometry) {
            Ok(prepared) => {
                if let Some(released) = prepared.released {
                    ctx.events.send(EngineEvent::InstanceReleased { geometry: released });
                }
                if let Some(created) = prepared.created {
                    ctx.metrics.record_instance_created();
                    ctx.events.send(EngineEvent::InstanceCreated { geometry: created });
                }
            }
            Err(e) if e.is_fatal() => return Err(self.fault(e, ctx)),
            Err(e) => return Err(e.into()),
        }

        self.activate_recording(geometry, ctx);

        let config = ctx.settings.snapshot();
        let output = match self.transform.render(frame.texture, &frame.transform, &config) {
            Ok(output) => output,
            Err(e) if e.is_fatal() => return Err(self.fault(e, ctx)),
            Err(e) => {
                warn!("Transform failed, frame dropped: {}", e);
                if config.force_update {
                    // Carry the one-shot recompute over to the next frame.
                    ctx.settings.request_full_recompute();
                }
                return Err(e.into());
            }
        };
        ctx.metrics.record_transform(output.duration);

        self.presenter.present(self.display.as_mut(), output.texture)?;
        let now = Instant::now();
        ctx.metrics.record_presented(now);

        let encoded = match self.sink.feed(output.texture, now) {
            Ok(encoded) => encoded,
            Err(e) => {
                ctx.events.send(EngineEvent::RecordingFailed {
                    message: e.to_string(),
                });
                false
            }
        };
        if encoded {
            ctx.metrics.record_encoded();
        }

        Ok(PassOutcome::Rendered(PassReport {
            sequence: frame.sequence,
            geometry,
            forced: output.forced,
            encoded,
            transform_time: output.duration,
        }))
    }

    /// Construct the encoder for an armed request on a pass with an instance.
    fn activate_recording(&mut self, geometry: Geometry, ctx: &PassContext<'_>) {
        let orientation = &self.orientation;
        match self
            .sink
            .activate(geometry, || orientation.display_orientation())
        {
            Ok(Some(SinkEvent::Started(session))) => {
                ctx.events.send(EngineEvent::RecordingStarted {
                    geometry: session.geometry(),
                    orientation_degrees: session.orientation_degrees,
                    path: session.output_path,
                });
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to start encoder: {}", e);
                ctx.events.send(EngineEvent::RecordingFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    /// Arm a recording. Rejected unless a render instance exists.
    #[instrument(name = "start_recording", skip(self, path), fields(path = %path.display()))]
    pub(crate) fn start_recording(
        &mut self,
        path: PathBuf,
        delay: Duration,
        requested_at: Instant,
    ) -> EngineResult<()> {
        if let RenderStatus::Faulted { message } = &self.status {
            return Err(EngineError::Faulted(message.clone()));
        }
        if !self.transform.has_instance() {
            warn!("Recording requested before a render instance exists");
            return Err(EngineError::NoRenderInstance);
        }

        self.sink.arm(path, delay, requested_at)?;
        Ok(())
    }

    /// Stop recording. Idempotent.
    pub(crate) fn stop_recording(
        &mut self,
        ctx: &PassContext<'_>,
    ) -> EngineResult<Option<RecordingSummary>> {
        let summary = self.sink.stop()?;
        if let Some(summary) = &summary {
            ctx.events.send(EngineEvent::RecordingStopped {
                path: summary.path.clone(),
                frames_encoded: summary.frames_encoded,
            });
        }
        Ok(summary)
    }

    /// Stop recording, then release the render instance.
    #[instrument(name = "pause", skip_all)]
    pub(crate) fn pause(&mut self, ctx: &PassContext<'_>) -> EngineResult<()> {
        let stopped = self.stop_recording(ctx);
        if let Err(e) = &stopped {
            warn!("Recording did not finalize cleanly: {}", e);
        }

        if let Some(geometry) = self.transform.release() {
            ctx.events.send(EngineEvent::InstanceReleased { geometry });
        }
        self.frames.signal().reset();
        self.status = RenderStatus::Paused;
        info!("Engine paused");

        stopped.map(|_| ())
    }

    /// Record a fatal error: stop recording cleanly and refuse further passes.
    fn fault(&mut self, err: TransformError, ctx: &PassContext<'_>) -> EngineError {
        let message = err.to_string();
        error!("Fatal render error: {}", message);

        if let Err(e) = self.stop_recording(ctx) {
            warn!("Failed to finalize recording after fatal error: {}", e);
        }

        self.status = RenderStatus::Faulted {
            message: message.clone(),
        };
        ctx.events.send(EngineEvent::Fatal { message });
        debug!("Render passes disabled until pause and surface recreation");
        err.into()
    }
}

impl Drop for EngineCore {
    fn drop(&mut self) {
        if let Err(e) = self.sink.stop() {
            warn!("Recording did not finalize cleanly at teardown: {}", e);
        }
        if self.transform.has_instance() {
            self.transform.release();
        }
    }
}
