use anyhow::Context;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

pub fn wav_duration_seconds(path: &Path) -> anyhow::Result<f64> {
    let reader = WavReader::open(path).with_context(|| format!("open wav {}", path.display()))?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    let duration = frames / spec.sample_rate as f64;
    Ok(duration)
}

pub fn wav_spec(path: &Path) -> anyhow::Result<WavSpec> {
    let reader = WavReader::open(path).with_context(|| format!("open wav {}", path.display()))?;
    Ok(reader.spec())
}

/// Writes `seconds` of digital silence in the given format.
pub fn write_silence(path: &Path, spec: WavSpec, seconds: f64) -> anyhow::Result<()> {
    let frames = (seconds.max(0.0) * spec.sample_rate as f64).round() as u64;
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("create wav {}", path.display()))?;
    for _ in 0..frames * spec.channels as u64 {
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, _) => writer.write_sample(0.0f32)?,
            (SampleFormat::Int, 8) => writer.write_sample(0i8)?,
            (SampleFormat::Int, 16) => writer.write_sample(0i16)?,
            (SampleFormat::Int, _) => writer.write_sample(0i32)?,
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Wraps raw little-endian 16-bit mono PCM into a WAV file.
pub fn write_pcm16_wav(path: &Path, pcm: &[u8], sample_rate: u32) -> anyhow::Result<()> {
    if pcm.len() < 2 {
        anyhow::bail!("no audio data returned");
    }
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("create wav {}", path.display()))?;
    for pair in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
    }
    writer.finalize()?;
    Ok(())
}
