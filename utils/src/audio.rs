use anyhow::Context;
use base64::Engine;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::io::Cursor;
use std::time::Duration;

/// Sample rate answers are recorded at before being encoded.
pub const ANSWER_SAMPLE_RATE: u32 = 16000;

/// Mono PCM audio decoded from an encoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits a slice of audio samples into fixed size chunks, zero padding the last one.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Resamples a whole clip in one go. Returns the input untouched when the rates already match.
pub fn resample_all(samples: &[f32], from_rate: u32, to_rate: u32) -> anyhow::Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    let chunk_size = 1024;
    let mut resampler = create_resampler(from_rate as f64, to_rate as f64, chunk_size)?;
    let mut out = Vec::with_capacity(samples.len() * to_rate as usize / from_rate as usize + 1);
    for chunk in split_for_chunks(samples, chunk_size) {
        let resampled = resampler
            .process(&[chunk.as_slice()], None)
            .context("Failed to resample audio chunk")?;
        if let Some(channel) = resampled.first() {
            out.extend_from_slice(channel);
        }
    }
    Ok(out)
}

/// Creates a new ring buffer on the heap for shared audio data.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Averages interleaved frames down to a single channel.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|c| c.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Encodes mono f32 samples as a 16-bit PCM WAV file held in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)
            .context("Failed to create WAV writer")?;
        for &sample in samples {
            let v = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            writer.write_sample(v)?;
        }
        writer.finalize().context("Failed to finalize WAV data")?;
    }
    Ok(bytes)
}

/// Decodes a WAV file into mono f32 samples.
pub fn decode_wav(bytes: &[u8]) -> anyhow::Result<DecodedAudio> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).context("Not a WAV payload")?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to read float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v as f32 / scale).clamp(-1.0, 1.0)))
                .collect::<Result<_, _>>()
                .context("Failed to read integer samples")?
        }
    };
    Ok(DecodedAudio {
        samples: downmix(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

/// Encodes raw bytes into a base64 string.
pub fn to_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decodes a base64 string into raw bytes.
pub fn from_base64(payload: &str) -> anyhow::Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("Failed to decode base64 payload")
}

/// Encodes mono samples into the text payload sent to the validation endpoint.
///
/// Recordings are resampled to [`ANSWER_SAMPLE_RATE`] first. An empty
/// recording produces an empty payload.
pub fn encode_answer(samples: &[f32], sample_rate: u32) -> anyhow::Result<String> {
    if samples.is_empty() {
        return Ok(String::new());
    }
    anyhow::ensure!(sample_rate > 0, "recording has no sample rate");
    let samples = resample_all(samples, sample_rate, ANSWER_SAMPLE_RATE)?;
    let wav = encode_wav(&samples, ANSWER_SAMPLE_RATE)?;
    Ok(to_base64(&wav))
}

/// Decodes a base64 WAV payload. Payloads in any other container fail here.
pub fn decode_payload(payload: &str) -> anyhow::Result<DecodedAudio> {
    let bytes = from_base64(payload)?;
    decode_wav(&bytes)
}
