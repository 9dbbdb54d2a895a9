//! Instrumented collaborators that record every call in order.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use tonecam_engine::{
    create_engine, Collaborators, EngineHandle, GeometryProvider, OrientationProvider, Renderer,
};
use tonecam_present::{DisplayBackend, PresentResult, ProgramId, Quad, TextureParams, Viewport};
use tonecam_recorder::{
    EncoderFactory, MediaIndexer, RecorderError, RecorderResult, RecordingSession, VideoEncoder,
};
use tonecam_source::{RenderWaker, SourceError, SourceResult, SurfaceTexture};
use tonecam_transform::{RawInstance, RenderRequest, TransformEngine, TransformError, TransformResult};
use tonecam_types::{
    EngineConfig, EngineEvent, Geometry, TextureId, TransformMatrix, IDENTITY_MATRIX,
};

pub const CAMERA_TEXTURE: TextureId = TextureId(1);
pub const OUTPUT_TEXTURE: TextureId = TextureId(2);
pub const HD: Geometry = Geometry::new(1920, 1080);
pub const SD: Geometry = Geometry::new(1280, 720);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init(Geometry),
    Release(u32),
    RenderBegin,
    Render { instance: u32, forced: bool, gamma: f32 },
    Present,
    EncoderCreated { path: PathBuf, geometry: Geometry, orientation: u32 },
    Encode(TextureId),
    EncoderClosed(PathBuf),
    Indexed(PathBuf),
    Marker(&'static str),
}

pub type Log = Arc<Mutex<Vec<Call>>>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn count(log: &Log, pred: impl Fn(&Call) -> bool) -> usize {
    log.lock().iter().filter(|c| pred(c)).count()
}

pub fn position(log: &Log, pred: impl Fn(&Call) -> bool) -> Option<usize> {
    log.lock().iter().position(|c| pred(c))
}

/// Switches the tests flip at runtime.
#[derive(Default)]
pub struct Faults {
    pub surface_released: AtomicBool,
    pub fail_init: AtomicBool,
    pub fail_render: AtomicBool,
    pub fail_encode: AtomicBool,
}

pub struct MockSurface {
    faults: Arc<Faults>,
}

impl SurfaceTexture for MockSurface {
    fn update_tex_image(&mut self) -> SourceResult<()> {
        if self.faults.surface_released.load(Ordering::SeqCst) {
            return Err(SourceError::SurfaceReleased);
        }
        Ok(())
    }

    fn transform_matrix(&self) -> SourceResult<TransformMatrix> {
        Ok(IDENTITY_MATRIX)
    }

    fn texture(&self) -> TextureId {
        CAMERA_TEXTURE
    }
}

/// Blocks render calls until the test releases them.
pub struct Gate {
    pub entered: Sender<()>,
    pub release: Receiver<()>,
}

pub struct MockTransform {
    log: Log,
    faults: Arc<Faults>,
    next: u32,
    live: Arc<AtomicUsize>,
    gate: Option<Gate>,
}

impl TransformEngine for MockTransform {
    fn initialize(&mut self, geometry: Geometry) -> TransformResult<RawInstance> {
        self.log.lock().push(Call::Init(geometry));
        if self.faults.fail_init.load(Ordering::SeqCst) {
            return Err(TransformError::InstanceCreation {
                geometry,
                message: "allocation failed".into(),
            });
        }
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(live <= 1, "two render instances alive at once");
        self.next += 1;
        Ok(RawInstance::new(self.next).expect("non-zero handle"))
    }

    fn release(&mut self, instance: RawInstance) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.log.lock().push(Call::Release(instance.get()));
    }

    fn render(&mut self, request: &RenderRequest<'_>) -> TransformResult<()> {
        if self.faults.fail_render.load(Ordering::SeqCst) {
            return Err(TransformError::Render("device busy".into()));
        }
        self.log.lock().push(Call::RenderBegin);
        if let Some(gate) = &self.gate {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }
        assert_eq!(request.input, CAMERA_TEXTURE);
        assert_eq!(request.output, OUTPUT_TEXTURE);
        self.log.lock().push(Call::Render {
            instance: request.instance.get(),
            forced: request.config.force_update,
            gamma: request.config.gamma,
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

pub struct MockDisplay {
    log: Log,
}

impl DisplayBackend for MockDisplay {
    fn compile_program(&mut self, _vertex: &str, _fragment: &str) -> PresentResult<ProgramId> {
        Ok(ProgramId(1))
    }

    fn create_texture(&mut self, _params: &TextureParams) -> PresentResult<TextureId> {
        Ok(OUTPUT_TEXTURE)
    }

    fn bind_default_target(&mut self) {}

    fn clear(&mut self) {}

    fn set_viewport(&mut self, _viewport: Viewport) {}

    fn use_program(&mut self, _program: ProgramId) {}

    fn bind_texture(&mut self, _unit: u32, _texture: TextureId, _sampler: &str) {}

    fn draw_quad(&mut self, _quad: &Quad) {
        self.log.lock().push(Call::Present);
    }
}

pub struct MockEncoder {
    log: Log,
    faults: Arc<Faults>,
    path: PathBuf,
}

impl VideoEncoder for MockEncoder {
    fn encode(&mut self, texture: TextureId) -> RecorderResult<()> {
        if self.faults.fail_encode.load(Ordering::SeqCst) {
            return Err(RecorderError::Encoding("codec stalled".into()));
        }
        self.log.lock().push(Call::Encode(texture));
        Ok(())
    }

    fn close(&mut self) -> RecorderResult<()> {
        self.log.lock().push(Call::EncoderClosed(self.path.clone()));
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

pub struct MockEncoderFactory {
    log: Log,
    faults: Arc<Faults>,
}

impl EncoderFactory for MockEncoderFactory {
    fn create(&mut self, session: &RecordingSession) -> RecorderResult<Box<dyn VideoEncoder>> {
        self.log.lock().push(Call::EncoderCreated {
            path: session.output_path.clone(),
            geometry: session.geometry(),
            orientation: session.orientation_degrees,
        });
        Ok(Box::new(MockEncoder {
            log: self.log.clone(),
            faults: self.faults.clone(),
            path: session.output_path.clone(),
        }))
    }
}

pub struct MockIndexer {
    log: Log,
}

impl MediaIndexer for MockIndexer {
    fn index(&self, path: &Path) {
        self.log.lock().push(Call::Indexed(path.to_path_buf()));
    }
}

pub struct SharedGeometry(Mutex<Geometry>);

impl SharedGeometry {
    pub fn set(&self, geometry: Geometry) {
        *self.0.lock() = geometry;
    }
}

impl GeometryProvider for SharedGeometry {
    fn preview_geometry(&self) -> Geometry {
        *self.0.lock()
    }
}

pub struct FixedOrientation(pub u32);

impl OrientationProvider for FixedOrientation {
    fn display_orientation(&self) -> u32 {
        self.0
    }
}

#[derive(Default)]
pub struct CountingWaker(pub AtomicUsize);

impl RenderWaker for CountingWaker {
    fn request_render(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Rig {
    pub log: Log,
    pub faults: Arc<Faults>,
    pub geometry: Arc<SharedGeometry>,
    pub live_instances: Arc<AtomicUsize>,
    pub handle: EngineHandle,
    pub renderer: Renderer,
    pub events: Receiver<EngineEvent>,
}

pub struct RigOptions {
    pub config: EngineConfig,
    pub waker: Arc<dyn RenderWaker>,
    pub gate: Option<Gate>,
    pub orientation: u32,
}

impl Default for RigOptions {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            waker: Arc::new(CountingWaker::default()),
            gate: None,
            orientation: 90,
        }
    }
}

impl Rig {
    pub fn new() -> Self {
        Self::with(RigOptions::default())
    }

    pub fn with(options: RigOptions) -> Self {
        init_tracing();

        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let faults = Arc::new(Faults::default());
        let geometry = Arc::new(SharedGeometry(Mutex::new(HD)));
        let live_instances = Arc::new(AtomicUsize::new(0));

        let collaborators = Collaborators {
            surface: Box::new(MockSurface {
                faults: faults.clone(),
            }),
            transform: Box::new(MockTransform {
                log: log.clone(),
                faults: faults.clone(),
                next: 0,
                live: live_instances.clone(),
                gate: options.gate,
            }),
            display: Box::new(MockDisplay { log: log.clone() }),
            encoders: Box::new(MockEncoderFactory {
                log: log.clone(),
                faults: faults.clone(),
            }),
            indexer: Arc::new(MockIndexer { log: log.clone() }),
            geometry: geometry.clone(),
            orientation: Arc::new(FixedOrientation(options.orientation)),
            waker: options.waker,
        };

        let (event_tx, events) = tonecam_types::event_channel();
        let (handle, renderer) = create_engine(options.config, collaborators, event_tx);

        Self {
            log,
            faults,
            geometry,
            live_instances,
            handle,
            renderer,
            events,
        }
    }

    /// Create the surface the way a host does before its first frame.
    pub fn started(mut self) -> Self {
        self.renderer.on_surface_created().expect("surface created");
        self.renderer.on_surface_changed(1080, 1920);
        self
    }

    /// Deliver one frame and draw it.
    pub fn frame(&mut self) -> tonecam_engine::EngineResult<tonecam_engine::PassOutcome> {
        self.handle.on_frame_available();
        self.renderer.on_draw_frame()
    }

    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.events.try_iter().collect()
    }
}
