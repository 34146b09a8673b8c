use crate::config::INPUT_CHUNK_SIZE;
use anyhow::{Context, Result};
use async_trait::async_trait;
use interview_core::capture::{CaptureStream, MicrophoneSource};
use interview_utils::audio;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Answers every question with the same pre-recorded WAV file.
pub struct WavFileMicrophone {
    path: PathBuf,
    chunk_size: usize,
}

impl WavFileMicrophone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_size: INPUT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl MicrophoneSource for WavFileMicrophone {
    async fn acquire(&self) -> Result<CaptureStream> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read answer file {}", self.path.display()))?;
        let decoded = audio::decode_wav(&bytes)?;
        tracing::debug!(
            "Streaming {} samples from {}",
            decoded.samples.len(),
            self.path.display()
        );

        let (tx, rx) = mpsc::unbounded_channel();
        for chunk in decoded.samples.chunks(self.chunk_size) {
            // The receiver is still in scope, so this cannot fail.
            let _ = tx.send(chunk.to_vec());
        }
        let path = self.path.clone();
        Ok(CaptureStream::new(decoded.sample_rate, rx, move || {
            tracing::debug!("Closed answer file {}", path.display());
        }))
    }
}

#[cfg(feature = "native-audio")]
pub use native::CpalMicrophone;

#[cfg(feature = "native-audio")]
mod native {
    use crate::config::INPUT_CHUNK_SIZE;
    use crate::device;
    use anyhow::{Context, Result, anyhow};
    use async_trait::async_trait;
    use cpal::traits::{DeviceTrait, StreamTrait};
    use cpal::{FrameCount, StreamConfig};
    use interview_core::capture::{CaptureStream, MicrophoneSource};
    use interview_utils::audio;
    use std::sync::mpsc as std_mpsc;
    use tokio::sync::mpsc;

    /// Records from an input device. Each acquisition opens a fresh stream,
    /// which is closed again when the capture is released.
    pub struct CpalMicrophone {
        device_name: Option<String>,
    }

    impl CpalMicrophone {
        pub fn new(device_name: Option<String>) -> Self {
            Self { device_name }
        }
    }

    fn build_input_stream(
        device_name: Option<String>,
        chunks: mpsc::UnboundedSender<Vec<f32>>,
    ) -> Result<(cpal::Stream, u32)> {
        let input = device::get_or_default_input(device_name)
            .context("Failed to get default audio input device")?;
        tracing::info!("Using input device: {:?}", input.name()?);

        let default_config = input
            .default_input_config()
            .context("Failed to get default input config")?;
        let input_config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: default_config.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
        };
        let channels = input_config.channels as usize;
        tracing::info!("Input stream config: {:?}", &input_config);

        let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if let Err(e) = chunks.send(audio::downmix(data, channels)) {
                tracing::debug!("Capture receiver gone: {:?}", e);
            }
        };
        let stream = input.build_input_stream(
            &input_config,
            input_data_fn,
            move |err| tracing::error!("An error occurred on input stream: {}", err),
            None,
        )?;
        stream.play()?;
        Ok((stream, input_config.sample_rate.0))
    }

    #[async_trait]
    impl MicrophoneSource for CpalMicrophone {
        async fn acquire(&self) -> Result<CaptureStream> {
            let device_name = self.device_name.clone();
            let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
            let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<Result<u32>>();
            let (release_tx, release_rx) = std_mpsc::channel::<()>();

            std::thread::spawn(move || {
                let (stream, rate) = match build_input_stream(device_name, chunk_tx) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if ready_tx.send(Ok(rate)).is_err() {
                    return;
                }
                let _ = release_rx.recv();
                drop(stream);
            });

            let sample_rate = ready_rx
                .await
                .map_err(|_| anyhow!("input stream thread exited"))??;
            Ok(CaptureStream::new(sample_rate, chunk_rx, move || {
                let _ = release_tx.send(());
            }))
        }
    }
}
