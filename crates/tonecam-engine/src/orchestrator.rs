//! Control handle and render-context driver.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use tonecam_recorder::{RecordingSink, RecordingSummary};
use tonecam_source::{FrameSignal, FrameSource, RenderWaker};
use tonecam_transform::TransformStage;
use tonecam_types::{
    EngineConfig, EngineEvent, EngineMetrics, RecordingState, RenderStatus, ToneMapConfig,
    TransformState,
};

use crate::events::EventSender;
use crate::metrics::MetricsCollector;
use crate::settings::ToneMapSettings;
use crate::state::{EngineCore, PassContext, PassOutcome};
use crate::{Collaborators, EngineError, EngineResult};

/// Capacity of the render-context task queue.
pub const RENDER_TASK_CAPACITY: usize = 16;

/// Unit of work executed on the render context under the engine lock.
type RenderTask = Box<dyn FnOnce(&mut EngineCore, &PassContext<'_>) + Send>;

/// State shared by the control handle and the render context.
struct Shared {
    /// The single mutual-exclusion section over all render and recording state.
    core: Mutex<EngineCore>,
    signal: Arc<FrameSignal>,
    waker: Arc<dyn RenderWaker>,
    settings: ToneMapSettings,
    metrics: MetricsCollector,
    events: EventSender,
    render_thread: Mutex<Option<ThreadId>>,
}

impl Shared {
    fn context(&self) -> PassContext<'_> {
        PassContext {
            settings: &self.settings,
            metrics: &self.metrics,
            events: &self.events,
        }
    }

    fn on_render_thread(&self) -> bool {
        *self.render_thread.lock() == Some(thread::current().id())
    }

    fn run_locked<T>(&self, f: impl FnOnce(&mut EngineCore, &PassContext<'_>) -> T) -> T {
        let ctx = self.context();
        let mut core = self.core.lock();
        f(&mut core, &ctx)
    }
}

pub(crate) fn build(
    config: EngineConfig,
    collaborators: Collaborators,
    event_tx: Sender<EngineEvent>,
) -> (EngineHandle, Renderer) {
    let Collaborators {
        surface,
        transform,
        display,
        encoders,
        indexer,
        geometry,
        orientation,
        waker,
    } = collaborators;

    let signal = Arc::new(FrameSignal::new(Arc::clone(&waker)));
    let core = EngineCore::new(
        FrameSource::new(Arc::clone(&signal), surface),
        TransformStage::new(transform),
        display,
        RecordingSink::new(encoders, indexer, config.recording.clone()),
        geometry,
        orientation,
    );

    let shared = Arc::new(Shared {
        core: Mutex::new(core),
        signal,
        waker,
        settings: ToneMapSettings::new(config.tone_map.clone()),
        metrics: MetricsCollector::new(config.render.fps_window),
        events: EventSender::new(event_tx),
        render_thread: Mutex::new(None),
    });

    let (task_tx, task_rx) = crossbeam_channel::bounded(RENDER_TASK_CAPACITY);

    let renderer = Renderer {
        shared,
        task_tx,
        task_rx,
    };
    (renderer.handle(), renderer)
}

/// Control-context handle. Cheap to clone; usable from any thread.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<Shared>,
    task_tx: Sender<RenderTask>,
}

impl EngineHandle {
    /// Request a recording to `path`; frames are encoded once `delay` has
    /// passed. Blocks until the render context has accepted the request.
    pub fn start_recording(&self, path: impl Into<PathBuf>, delay: Duration) -> EngineResult<()> {
        self.start_recording_inner(path.into(), delay, None)
    }

    /// Like `start_recording`, giving up on the acknowledgement after
    /// `timeout`.
    pub fn start_recording_timeout(
        &self,
        path: impl Into<PathBuf>,
        delay: Duration,
        timeout: Duration,
    ) -> EngineResult<()> {
        self.start_recording_inner(path.into(), delay, Some(timeout))
    }

    fn start_recording_inner(
        &self,
        path: PathBuf,
        delay: Duration,
        timeout: Option<Duration>,
    ) -> EngineResult<()> {
        let requested_at = Instant::now();
        self.request(timeout, move |core, _ctx| {
            core.start_recording(path, delay, requested_at)
        })
    }

    /// Stop recording. When this returns `Ok`, the file is finalized and the
    /// media indexer has been notified. Stopping while idle is a no-op.
    pub fn stop_recording(&self) -> EngineResult<Option<RecordingSummary>> {
        self.request(None, |core, ctx| core.stop_recording(ctx))
    }

    /// Like `stop_recording`, giving up on the acknowledgement after `timeout`.
    pub fn stop_recording_timeout(
        &self,
        timeout: Duration,
    ) -> EngineResult<Option<RecordingSummary>> {
        self.request(Some(timeout), |core, ctx| core.stop_recording(ctx))
    }

    /// Stop recording and release the render instance.
    pub fn pause(&self) -> EngineResult<()> {
        self.request(None, |core, ctx| core.pause(ctx))
    }

    /// Like `pause`, giving up on the acknowledgement after `timeout`.
    pub fn pause_timeout(&self, timeout: Duration) -> EngineResult<()> {
        self.request(Some(timeout), |core, ctx| core.pause(ctx))
    }

    /// Camera frame arrival callback. Never blocks.
    pub fn on_frame_available(&self) {
        self.shared.signal.notify();
    }

    /// Current tone-mapping knobs.
    pub fn tone_map(&self) -> ToneMapConfig {
        self.shared.settings.get()
    }

    /// Replace the tone-mapping knobs from the next pass on.
    pub fn set_tone_map(&self, config: ToneMapConfig) {
        self.shared.settings.set(config);
    }

    /// Modify the tone-mapping knobs from the next pass on.
    pub fn update_tone_map(&self, f: impl FnOnce(&mut ToneMapConfig)) {
        self.shared.settings.update(f);
    }

    /// Force the next transform call to recompute all temporal state.
    pub fn request_full_recompute(&self) {
        self.shared.settings.request_full_recompute();
    }

    /// Get current metrics snapshot.
    pub fn metrics(&self) -> EngineMetrics {
        let signal = &self.shared.signal;
        self.shared
            .metrics
            .snapshot(signal.dropped(), signal.coalesced())
    }

    /// Current render status. Waits for an in-flight pass.
    pub fn status(&self) -> RenderStatus {
        self.shared.core.lock().status().clone()
    }

    /// Current recording state. Waits for an in-flight pass.
    pub fn recording_state(&self) -> RecordingState {
        self.shared.core.lock().recording_state()
    }

    /// Current transform state. Waits for an in-flight pass.
    pub fn transform_state(&self) -> TransformState {
        self.shared.core.lock().transform_state()
    }

    /// Marshal `f` onto the render context and wait for its result.
    ///
    /// Called from the render thread itself, `f` runs inline instead.
    fn request<T, F>(&self, timeout: Option<Duration>, f: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut EngineCore, &PassContext<'_>) -> EngineResult<T> + Send + 'static,
    {
        if self.shared.on_render_thread() {
            trace!("Request issued on the render thread, running inline");
            return self.shared.run_locked(f);
        }

        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        let task: RenderTask = Box::new(move |core: &mut EngineCore, ctx: &PassContext<'_>| {
            let result = f(core, ctx);
            // The requester may have given up waiting.
            let _ = ack_tx.send(result);
        });

        self.task_tx
            .send(task)
            .map_err(|_| EngineError::RenderContextGone)?;
        self.shared.waker.request_render();

        wait_for_ack(&ack_rx, timeout)
    }
}

fn wait_for_ack<T>(
    ack_rx: &Receiver<EngineResult<T>>,
    timeout: Option<Duration>,
) -> EngineResult<T> {
    match timeout {
        None => ack_rx.recv().map_err(|_| EngineError::RenderContextGone)?,
        Some(timeout) => match ack_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(?timeout, "Render context did not acknowledge in time");
                Err(EngineError::AckTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::RenderContextGone),
        },
    }
}

/// Render-context side of the engine.
///
/// Owned by the thread that owns the GPU context; every method must be
/// called from that thread.
pub struct Renderer {
    shared: Arc<Shared>,
    task_tx: Sender<RenderTask>,
    task_rx: Receiver<RenderTask>,
}

impl Renderer {
    /// A control handle for this engine.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shared: Arc::clone(&self.shared),
            task_tx: self.task_tx.clone(),
        }
    }

    fn enter(&self) {
        let current = thread::current().id();
        let mut render_thread = self.shared.render_thread.lock();
        if *render_thread != Some(current) {
            debug!(?current, "Render context bound to thread");
            *render_thread = Some(current);
        }
    }

    /// The display surface was created (or recreated).
    #[instrument(name = "surface_created", skip(self))]
    pub fn on_surface_created(&mut self) -> EngineResult<()> {
        self.enter();
        self.shared.run_locked(|core, ctx| core.surface_created(ctx))
    }

    /// The display surface changed size.
    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.enter();
        self.shared.core.lock().surface_changed(width, height);
    }

    /// One display refresh: run queued requests, then a render pass if a
    /// frame is pending.
    pub fn on_draw_frame(&mut self) -> EngineResult<PassOutcome> {
        self.enter();
        self.run_pending_tasks();
        self.shared.run_locked(|core, ctx| core.render_pass(ctx))
    }

    /// Run every queued control request. Returns how many ran.
    pub fn run_pending_tasks(&mut self) -> usize {
        self.enter();
        let mut ran = 0;
        while let Ok(task) = self.task_rx.try_recv() {
            self.shared.run_locked(task);
            ran += 1;
        }
        ran
    }

    /// Current metrics, also sent to the host as an event.
    pub fn emit_metrics(&self) -> EngineMetrics {
        let signal = &self.shared.signal;
        let metrics = self
            .shared
            .metrics
            .snapshot(signal.dropped(), signal.coalesced());
        self.shared.events.send(EngineEvent::Metrics(metrics.clone()));
        metrics
    }

    /// Current render status.
    pub fn status(&self) -> RenderStatus {
        self.shared.core.lock().status().clone()
    }

    /// Final teardown: run queued requests, stop recording, release the
    /// render instance.
    #[instrument(name = "renderer_shutdown", skip(self))]
    pub fn shutdown(&mut self) -> EngineResult<()> {
        self.run_pending_tasks();
        info!("Render context shutting down");
        self.shared.run_locked(|core, ctx| core.pause(ctx))
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Dropping queued tasks unrun disconnects their acks, so waiting
        // callers see `RenderContextGone`.
        let abandoned = self.task_rx.try_iter().count();
        if abandoned > 0 {
            warn!(abandoned, "Render context dropped with queued requests");
        }
        *self.shared.render_thread.lock() = None;
    }
}
