use crate::error::SessionError;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A live microphone feed handed out by a [`MicrophoneSource`].
///
/// Mono f32 chunks arrive on `chunks`. The hardware is released when
/// [`CaptureStream::release`] is called or the stream is dropped, whichever
/// comes first.
pub struct CaptureStream {
    sample_rate: u32,
    chunks: mpsc::UnboundedReceiver<Vec<f32>>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl CaptureStream {
    pub fn new(
        sample_rate: u32,
        chunks: mpsc::UnboundedReceiver<Vec<f32>>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            sample_rate,
            chunks,
            release: Some(Box::new(release)),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!("Microphone released");
        }
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Hands out microphone access.
#[async_trait]
pub trait MicrophoneSource: Send + Sync {
    async fn acquire(&self) -> Result<CaptureStream>;
}

/// Samples recorded for one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl RecordingBuffer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
        }
    }

    pub fn push(&mut self, chunk: &[f32]) {
        self.samples.extend_from_slice(chunk);
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Encodes the recording as a base64 WAV payload. Empty recordings give an empty payload.
    pub fn into_payload(self) -> Result<String> {
        interview_utils::audio::encode_answer(&self.samples, self.sample_rate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStart {
    Started,
    AlreadyRecording,
}

struct ActiveCapture {
    stream: CaptureStream,
    buffer: RecordingBuffer,
    source_closed: bool,
}

/// Owns at most one microphone capture at a time.
pub struct CaptureController {
    source: Arc<dyn MicrophoneSource>,
    active: Option<ActiveCapture>,
}

impl CaptureController {
    pub fn new(source: Arc<dyn MicrophoneSource>) -> Self {
        Self {
            source,
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Starts recording. Calling this while a capture is active changes nothing.
    pub async fn start(&mut self) -> Result<CaptureStart, SessionError> {
        if self.active.is_some() {
            tracing::debug!("Capture already active, ignoring start");
            return Ok(CaptureStart::AlreadyRecording);
        }

        let stream = self
            .source
            .acquire()
            .await
            .map_err(|e| SessionError::CaptureAcquisition(format!("{e:#}")))?;
        tracing::info!("Recording started at {} Hz", stream.sample_rate());

        self.active = Some(ActiveCapture {
            buffer: RecordingBuffer::new(stream.sample_rate()),
            stream,
            source_closed: false,
        });
        Ok(CaptureStart::Started)
    }

    /// Waits for the next chunk and appends it to the recording.
    ///
    /// Returns `false` straight away when nothing is being recorded. Once the
    /// source has run dry this never resolves, so callers must race it against
    /// their stop signal.
    pub async fn next_chunk(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.source_closed {
            std::future::pending::<()>().await;
        }
        match active.stream.chunks.recv().await {
            Some(chunk) => {
                active.buffer.push(&chunk);
                true
            }
            None => {
                tracing::debug!("Microphone feed ended, waiting for stop");
                active.source_closed = true;
                true
            }
        }
    }

    /// Stops recording, releases the microphone and hands the recording over.
    ///
    /// Returns `None` when nothing was being recorded.
    pub fn stop(&mut self) -> Option<RecordingBuffer> {
        let mut active = self.active.take()?;
        active.stream.release();
        while let Ok(chunk) = active.stream.chunks.try_recv() {
            active.buffer.push(&chunk);
        }
        tracing::info!(
            "Recording stopped: {} samples ({:.1}s)",
            active.buffer.len(),
            active.buffer.duration().as_secs_f32()
        );
        Some(active.buffer)
    }
}
