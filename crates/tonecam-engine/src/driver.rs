//! Dedicated render thread for hosts without their own render loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, warn};

use tonecam_source::RenderWaker;
use tonecam_types::RenderLoopConfig;

use crate::orchestrator::Renderer;
use crate::state::PassOutcome;
use crate::{EngineError, EngineResult};

/// Waker that nudges a `RenderThread`. Wake-ups coalesce.
#[derive(Clone)]
pub struct ChannelWaker {
    tx: Sender<()>,
}

impl RenderWaker for ChannelWaker {
    fn request_render(&self) {
        // A full slot already guarantees a wake-up.
        let _ = self.tx.try_send(());
    }
}

/// Create a waker and the receiver a `RenderThread` waits on.
pub fn wake_channel() -> (Arc<ChannelWaker>, Receiver<()>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (Arc::new(ChannelWaker { tx }), rx)
}

/// Runs a `Renderer` on its own thread, one pass per wake-up or refresh tick.
pub struct RenderThread {
    handle: Option<JoinHandle<()>>,
    should_stop: Arc<AtomicBool>,
    waker: Arc<ChannelWaker>,
}

impl RenderThread {
    /// Spawn the render thread. It creates a surface of `width` x `height`
    /// before the first pass.
    pub fn spawn(
        renderer: Renderer,
        waker: Arc<ChannelWaker>,
        wake_rx: Receiver<()>,
        surface: (u32, u32),
        config: RenderLoopConfig,
    ) -> EngineResult<Self> {
        let should_stop = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&should_stop);

        let handle = thread::Builder::new()
            .name("tonecam-render".into())
            .spawn(move || render_loop(renderer, wake_rx, stop, surface, config))
            .map_err(EngineError::Spawn)?;

        Ok(Self {
            handle: Some(handle),
            should_stop,
            waker,
        })
    }

    /// Returns true while the render thread is running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop, tear down render state and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.should_stop.store(true, Ordering::SeqCst);
        self.waker.request_render();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Render thread panicked");
            }
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn render_loop(
    mut renderer: Renderer,
    wake_rx: Receiver<()>,
    should_stop: Arc<AtomicBool>,
    surface: (u32, u32),
    config: RenderLoopConfig,
) {
    info!("Render loop starting");

    let (width, height) = surface;
    if let Err(e) = renderer.on_surface_created() {
        error!("Surface setup failed: {}", e);
    }
    renderer.on_surface_changed(width, height);

    let interval = config.refresh_interval();
    let metrics_interval = config.metrics_interval();
    let mut last_metrics = Instant::now();
    let mut passes: u64 = 0;
    let mut fatal_reported = false;

    while !should_stop.load(Ordering::SeqCst) {
        match wake_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Wake channel disconnected, stopping render loop");
                break;
            }
        }
        if should_stop.load(Ordering::SeqCst) {
            break;
        }

        match renderer.on_draw_frame() {
            Ok(PassOutcome::Rendered(report)) => {
                passes += 1;
                fatal_reported = false;
                if passes <= 3 || passes % 300 == 0 {
                    debug!(
                        passes,
                        sequence = report.sequence,
                        geometry = %report.geometry,
                        encoded = report.encoded,
                        "Frame rendered"
                    );
                }
            }
            Ok(PassOutcome::NoFrame | PassOutcome::Paused | PassOutcome::InvalidGeometry(_)) => {}
            Err(e) if e.is_fatal() => {
                // Keep draining control requests so pause/stop still complete.
                if !fatal_reported {
                    error!("Rendering halted: {}", e);
                    fatal_reported = true;
                }
            }
            Err(e) => debug!("Render pass failed: {}", e),
        }

        if let Some(every) = metrics_interval {
            if last_metrics.elapsed() >= every {
                renderer.emit_metrics();
                last_metrics = Instant::now();
            }
        }
    }

    if let Err(e) = renderer.shutdown() {
        warn!("Render teardown incomplete: {}", e);
    }
    info!(passes, "Render loop stopped");
}
