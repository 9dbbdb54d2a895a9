//! Recording sink for the composited preview.
//!
//! Recording requests are armed first and turned into an encoder session on
//! the next render pass that has a render instance, so the encoder is built
//! against the final preview geometry.

mod error;
mod sink;

pub use error::RecorderError;
pub use sink::{RecordingSink, RecordingSummary, SinkEvent, MAX_START_DELAY};

use std::path::{Path, PathBuf};
use std::time::Instant;

use parking_lot::Mutex;

use tonecam_types::{Geometry, TextureId};

/// Result type for recording operations.
pub type RecorderResult<T> = Result<T, RecorderError>;

/// Parameters of one encoder session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    /// Output file.
    pub output_path: PathBuf,

    /// Encoded width in pixels.
    pub width: u32,

    /// Encoded height in pixels.
    pub height: u32,

    /// Target frames per second.
    pub frame_rate: u32,

    /// Target bitrate in bits per second.
    pub bitrate: u32,

    /// Display orientation in degrees (0 - 359).
    pub orientation_degrees: u32,

    /// Frames are fed only after this instant.
    pub armed_at: Instant,
}

impl RecordingSession {
    /// Encoded geometry.
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.width, self.height)
    }
}

/// Trait for a video encoder session fed from GPU textures.
pub trait VideoEncoder: Send {
    /// Encode the current content of `texture` as the next frame.
    fn encode(&mut self, texture: TextureId) -> RecorderResult<()>;

    /// Flush pending frames and finalize the file.
    fn close(&mut self) -> RecorderResult<()>;

    /// Output file of this session.
    fn path(&self) -> &Path;
}

/// Trait for constructing encoder sessions.
pub trait EncoderFactory: Send {
    /// Build an encoder for the session.
    fn create(&mut self, session: &RecordingSession) -> RecorderResult<Box<dyn VideoEncoder>>;
}

/// Trait for announcing finished files to the platform media index.
pub trait MediaIndexer: Send + Sync {
    /// Fire-and-forget notification. Must not block.
    fn index(&self, path: &Path);
}

/// Indexer that remembers every path, for hosts that batch index requests.
#[derive(Debug, Default)]
pub struct CollectingIndexer {
    paths: Mutex<Vec<PathBuf>>,
}

impl CollectingIndexer {
    /// Create an empty indexer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths collected so far.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().clone()
    }
}

impl MediaIndexer for CollectingIndexer {
    fn index(&self, path: &Path) {
        self.paths.lock().push(path.to_path_buf());
    }
}
