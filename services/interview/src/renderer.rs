use anyhow::Result;
use async_trait::async_trait;
use interview_core::renderer::AvatarRenderer;
use interview_core::segment::Segment;
use interview_utils::audio;
use std::time::Duration;

/// Plays segments without a sound device.
///
/// Each entry is logged and then waited out for as long as its audio lasts,
/// so the session keeps realistic pacing.
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    /// Upper bound on the wait per entry. `None` waits the full clip.
    max_entry_wait: Option<Duration>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entry_wait(mut self, wait: Duration) -> Self {
        self.max_entry_wait = Some(wait);
        self
    }

    fn entry_wait(&self, payload: &str) -> Duration {
        let duration = match audio::decode_payload(payload) {
            Ok(decoded) => decoded.duration(),
            Err(e) => {
                tracing::warn!("Could not decode entry audio, not waiting: {:?}", e);
                Duration::ZERO
            }
        };
        match self.max_entry_wait {
            Some(max) => duration.min(max),
            None => duration,
        }
    }
}

#[async_trait]
impl AvatarRenderer for HeadlessRenderer {
    async fn play(&self, segment: &Segment) -> Result<()> {
        for entry in segment.entries() {
            tracing::info!("Avatar: \"{}\"", entry.text);
            tokio::time::sleep(self.entry_wait(&entry.audio)).await;
        }
        Ok(())
    }
}

#[cfg(feature = "native-audio")]
pub use native::CpalRenderer;

#[cfg(feature = "native-audio")]
mod native {
    use crate::config::{OUTPUT_CHUNK_SIZE, OUTPUT_LATENCY_MS};
    use crate::device;
    use anyhow::{Context, Result, anyhow};
    use async_trait::async_trait;
    use cpal::traits::{DeviceTrait, StreamTrait};
    use cpal::{FrameCount, StreamConfig};
    use interview_core::renderer::AvatarRenderer;
    use interview_core::segment::Segment;
    use interview_utils::audio;
    use ringbuf::HeapProd;
    use ringbuf::traits::{Consumer, Producer, Split};
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};
    use tokio::sync::Mutex;

    /// Plays segments through the default output device.
    ///
    /// The cpal stream lives on its own thread; this side only feeds the ring
    /// buffer the output callback drains.
    pub struct CpalRenderer {
        producer: Mutex<HeapProd<f32>>,
        sample_rate: u32,
        _shutdown: std_mpsc::Sender<()>,
    }

    impl CpalRenderer {
        pub fn open(device_name: Option<String>) -> Result<Self> {
            let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(HeapProd<f32>, u32)>>();
            let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

            std::thread::spawn(move || {
                let (stream, producer, rate) = match build_output_stream(device_name) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if ready_tx.send(Ok((producer, rate))).is_err() {
                    return;
                }
                // Blocks until the renderer is dropped.
                let _ = shutdown_rx.recv();
                drop(stream);
                tracing::debug!("Output stream closed");
            });

            let (producer, sample_rate) = ready_rx
                .recv()
                .map_err(|_| anyhow!("output stream thread exited"))??;
            Ok(Self {
                producer: Mutex::new(producer),
                sample_rate,
                _shutdown: shutdown_tx,
            })
        }
    }

    fn build_output_stream(
        device_name: Option<String>,
    ) -> Result<(cpal::Stream, HeapProd<f32>, u32)> {
        let output = device::get_or_default_output(device_name)
            .context("Failed to get default audio output device")?;
        tracing::info!("Using output device: {:?}", output.name()?);

        let default_config = output
            .default_output_config()
            .context("Failed to get default output config")?;
        let output_config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: default_config.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
        };
        let channels = output_config.channels as usize;
        let sample_rate = output_config.sample_rate.0;
        tracing::info!("Output stream config: {:?}", &output_config);

        let buffer = audio::shared_buffer(sample_rate as usize * OUTPUT_LATENCY_MS / 1000);
        let (producer, mut consumer) = buffer.split();

        let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                let sample = consumer.try_pop().unwrap_or(0.0);
                for slot in frame.iter_mut() {
                    *slot = sample;
                }
            }
        };
        let stream = output.build_output_stream(
            &output_config,
            output_data_fn,
            move |err| tracing::error!("An error occurred on output stream: {}", err),
            None,
        )?;
        stream.play()?;
        Ok((stream, producer, sample_rate))
    }

    #[async_trait]
    impl AvatarRenderer for CpalRenderer {
        async fn play(&self, segment: &Segment) -> Result<()> {
            let mut producer = self.producer.lock().await;
            for entry in segment.entries() {
                tracing::info!("Avatar: \"{}\"", entry.text);
                let decoded = audio::decode_payload(&entry.audio)?;
                let samples =
                    audio::resample_all(&decoded.samples, decoded.sample_rate, self.sample_rate)?;

                let started = Instant::now();
                let mut rest = samples.as_slice();
                while !rest.is_empty() {
                    let pushed = producer.push_slice(rest);
                    rest = &rest[pushed..];
                    if !rest.is_empty() {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
                // The last samples are still in the buffer; wait for them to drain.
                let clip = Duration::from_secs_f64(samples.len() as f64 / self.sample_rate as f64);
                if let Some(left) = clip.checked_sub(started.elapsed()) {
                    tokio::time::sleep(left).await;
                }
            }
            Ok(())
        }
    }
}
