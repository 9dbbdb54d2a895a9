//! Frame arrival signalling and acquisition.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use tonecam_types::{TextureId, TransformMatrix};

use crate::{RenderWaker, SurfaceTexture};

/// Pending-frame flag shared between the arrival callback and the render
/// context. At most one frame is ever pending; later arrivals overwrite it.
pub struct FrameSignal {
    pending: AtomicBool,
    coalesced: AtomicU64,
    dropped: AtomicU64,
    waker: Arc<dyn RenderWaker>,
}

impl FrameSignal {
    /// Create a new signal that wakes the render context through `waker`.
    pub fn new(waker: Arc<dyn RenderWaker>) -> Self {
        Self {
            pending: AtomicBool::new(false),
            coalesced: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            waker,
        }
    }

    /// Mark a new frame as available and request a render pass.
    ///
    /// Callable from any thread.
    pub fn notify(&self) {
        if self.pending.swap(true, Ordering::AcqRel) {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
        }
        self.waker.request_render();
    }

    /// Read and clear the pending flag.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Returns true if a frame is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Drop any pending frame.
    pub fn reset(&self) {
        self.pending.store(false, Ordering::Release);
    }

    /// Number of notifications folded into an already pending frame.
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Number of consumed frames the surface failed to deliver.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A camera frame pulled into the external texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquiredFrame {
    /// External texture holding the frame.
    pub texture: TextureId,

    /// Sampling transform for the texture.
    pub transform: TransformMatrix,

    /// Monotonically increasing acquisition number.
    pub sequence: u64,
}

/// Render-context side of the surface adapter.
pub struct FrameSource {
    signal: Arc<FrameSignal>,
    surface: Box<dyn SurfaceTexture>,
    sequence: u64,
}

impl FrameSource {
    /// Create a frame source around a camera surface.
    pub fn new(signal: Arc<FrameSignal>, surface: Box<dyn SurfaceTexture>) -> Self {
        Self {
            signal,
            surface,
            sequence: 0,
        }
    }

    /// Consume the pending frame, if any, and pull its content.
    ///
    /// Surface failures are reported as "no frame" and leave no state behind.
    pub fn acquire(&mut self) -> Option<AcquiredFrame> {
        if !self.signal.take() {
            return None;
        }

        let pulled = self
            .surface
            .update_tex_image()
            .and_then(|()| self.surface.transform_matrix());

        match pulled {
            Ok(transform) => {
                self.sequence += 1;
                trace!(sequence = self.sequence, "Frame acquired");
                Some(AcquiredFrame {
                    texture: self.surface.texture(),
                    transform,
                    sequence: self.sequence,
                })
            }
            Err(e) => {
                self.signal.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Skipping pass, frame acquisition failed: {}", e);
                None
            }
        }
    }

    /// The shared arrival signal.
    pub fn signal(&self) -> &Arc<FrameSignal> {
        &self.signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SourceError, SourceResult};
    use std::sync::atomic::AtomicUsize;
    use tonecam_types::IDENTITY_MATRIX;

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl RenderWaker for CountingWaker {
        fn request_render(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeSurface {
        released: bool,
        updates: usize,
    }

    impl SurfaceTexture for FakeSurface {
        fn update_tex_image(&mut self) -> SourceResult<()> {
            if self.released {
                return Err(SourceError::SurfaceReleased);
            }
            self.updates += 1;
            Ok(())
        }

        fn transform_matrix(&self) -> SourceResult<TransformMatrix> {
            Ok(IDENTITY_MATRIX)
        }

        fn texture(&self) -> TextureId {
            TextureId(7)
        }
    }

    fn source(released: bool) -> (Arc<CountingWaker>, FrameSource) {
        let waker = Arc::new(CountingWaker::default());
        let signal = Arc::new(FrameSignal::new(waker.clone()));
        let surface = Box::new(FakeSurface {
            released,
            updates: 0,
        });
        (waker, FrameSource::new(signal, surface))
    }

    #[test]
    fn test_notifications_coalesce_into_one_frame() {
        let (waker, mut source) = source(false);

        for _ in 0..5 {
            source.signal().notify();
        }

        assert_eq!(waker.0.load(Ordering::SeqCst), 5);
        assert_eq!(source.signal().coalesced(), 4);

        let frame = source.acquire().expect("one frame pending");
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.texture, TextureId(7));
        assert!(source.acquire().is_none());
    }

    #[test]
    fn test_no_frame_without_notification() {
        let (_waker, mut source) = source(false);
        assert!(source.acquire().is_none());
    }

    #[test]
    fn test_released_surface_is_no_frame() {
        let (_waker, mut source) = source(true);
        source.signal().notify();

        assert!(source.acquire().is_none());
        assert_eq!(source.signal().dropped(), 1);
        assert!(!source.signal().is_pending());
    }

    #[test]
    fn test_reset_drops_pending_frame() {
        let (_waker, mut source) = source(false);
        source.signal().notify();
        source.signal().reset();
        assert!(source.acquire().is_none());
    }
}
