//! Encoder that writes one line per frame from a background writer thread.
//!
//! Frames are handed over through a bounded queue; when the writer falls
//! behind, new frames are dropped instead of stalling the render thread.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use tonecam_recorder::{
    EncoderFactory, RecorderError, RecorderResult, RecordingSession, VideoEncoder,
};
use tonecam_types::TextureId;

struct FrameRecord {
    index: u64,
    texture: TextureId,
    offset: Duration,
}

/// Builds a `FileEncoder` per recording session.
pub struct FileEncoderFactory {
    latency: Duration,
    queue: usize,
    dropped: Arc<AtomicU64>,
}

impl FileEncoderFactory {
    /// `latency` is the simulated cost per frame, `queue` the number of
    /// frames buffered before dropping.
    pub fn new(latency: Duration, queue: usize) -> Self {
        Self {
            latency,
            queue: queue.max(1),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Frames dropped across all sessions because the writer was behind.
    pub fn dropped_frames(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl EncoderFactory for FileEncoderFactory {
    fn create(&mut self, session: &RecordingSession) -> RecorderResult<Box<dyn VideoEncoder>> {
        let encoder = FileEncoder::open(session, self.latency, self.queue, Arc::clone(&self.dropped))?;
        Ok(Box::new(encoder))
    }
}

/// File-backed encoder with a dedicated writer thread.
pub struct FileEncoder {
    path: PathBuf,
    tx: Option<Sender<FrameRecord>>,
    writer: Option<JoinHandle<io::Result<u64>>>,
    submitted: u64,
    started: Instant,
    dropped: Arc<AtomicU64>,
}

impl FileEncoder {
    fn open(
        session: &RecordingSession,
        latency: Duration,
        queue: usize,
        dropped: Arc<AtomicU64>,
    ) -> RecorderResult<Self> {
        let mut out = BufWriter::new(File::create(&session.output_path)?);
        let header = serde_json::json!({
            "width": session.width,
            "height": session.height,
            "frame_rate": session.frame_rate,
            "bitrate": session.bitrate,
            "orientation_degrees": session.orientation_degrees,
        });
        serde_json::to_writer(&mut out, &header)
            .map_err(|e| RecorderError::Initialization(e.to_string()))?;
        out.write_all(b"\n")?;

        let (tx, rx) = crossbeam_channel::bounded(queue);
        let writer = thread::Builder::new()
            .name("tonecam-encoder".into())
            .spawn(move || write_frames(out, rx, latency))?;

        debug!(path = %session.output_path.display(), queue, "File encoder opened");
        Ok(Self {
            path: session.output_path.clone(),
            tx: Some(tx),
            writer: Some(writer),
            submitted: 0,
            started: Instant::now(),
            dropped,
        })
    }
}

fn write_frames(
    mut out: BufWriter<File>,
    rx: Receiver<FrameRecord>,
    latency: Duration,
) -> io::Result<u64> {
    let mut written = 0;
    for record in rx.iter() {
        if !latency.is_zero() {
            thread::sleep(latency);
        }
        writeln!(
            out,
            "{} {} {}",
            record.index,
            record.texture,
            record.offset.as_micros()
        )?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

impl VideoEncoder for FileEncoder {
    fn encode(&mut self, texture: TextureId) -> RecorderResult<()> {
        let Some(tx) = &self.tx else {
            return Err(RecorderError::Encoding("encoder already closed".into()));
        };

        let record = FrameRecord {
            index: self.submitted,
            texture,
            offset: self.started.elapsed(),
        };
        match tx.try_send(record) {
            Ok(()) => {
                self.submitted += 1;
                Ok(())
            }
            Err(TrySendError::Full(record)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Encoder queue full, dropping frame #{}", record.index);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(RecorderError::Encoding("writer thread exited".into()))
            }
        }
    }

    fn close(&mut self) -> RecorderResult<()> {
        // Dropping the sender ends the writer loop.
        self.tx.take();
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };

        match writer.join() {
            Ok(Ok(written)) => {
                info!(path = %self.path.display(), written, "Recording file closed");
                Ok(())
            }
            Ok(Err(e)) => Err(RecorderError::Io(e)),
            Err(_) => Err(RecorderError::Finalize("writer thread panicked".into())),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileEncoder {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(e) = self.close() {
                warn!("Failed to close recording file at drop: {}", e);
            }
        }
    }
}
