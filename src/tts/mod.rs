pub mod elevenlabs;
pub mod piper;
pub mod system;

use crate::audio::wav_duration_seconds;
use crate::config::{BackendKind, Config, RandomScope, VoiceChoice};
use crate::error::{PipelineError, Result};
use crate::model::{NarrationClip, TextChunk};
use crate::utils::sanitize_text;
use anyhow::{Context, bail};
use rand::Rng;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub trait TtsBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Speaks `text` into a WAV file at `out` and returns the clip length in seconds.
    fn synthesize(&self, text: &str, voice: Option<&str>, out: &Path) -> anyhow::Result<f64>;
}

pub fn build_backend(kind: BackendKind, config: &Config) -> Box<dyn TtsBackend> {
    let tts = &config.settings.tts;
    match kind {
        BackendKind::Piper => Box::new(piper::PiperBackend::new(tts)),
        BackendKind::Elevenlabs => Box::new(elevenlabs::ElevenLabsBackend::new(tts)),
        BackendKind::System => Box::new(system::SystemVoice::new(tts)),
    }
}

fn configured_voice(kind: BackendKind, config: &Config) -> Option<String> {
    let tts = &config.settings.tts;
    match kind {
        BackendKind::Piper => None,
        BackendKind::Elevenlabs => Some(tts.elevenlabs_voice_name.clone()),
        BackendKind::System => tts.system_voice.clone(),
    }
}

/// The backends a run may speak with, and the policy for choosing between them.
pub struct Narrator {
    voices: Vec<(Box<dyn TtsBackend>, Option<String>)>,
    per_chunk: bool,
}

impl Narrator {
    pub fn from_config(config: &Config) -> Self {
        let tts = &config.settings.tts;
        let kinds = match tts.voice_choice {
            VoiceChoice::Piper => vec![BackendKind::Piper],
            VoiceChoice::Elevenlabs => vec![BackendKind::Elevenlabs],
            VoiceChoice::System => vec![BackendKind::System],
            VoiceChoice::Random => tts.random_pool.clone(),
        };
        debug!(
            "TTS voice pool: {}",
            kinds.iter().map(BackendKind::as_str).collect::<Vec<_>>().join(", ")
        );
        let voices = kinds
            .into_iter()
            .map(|kind| (build_backend(kind, config), configured_voice(kind, config)))
            .collect();
        let per_chunk =
            tts.voice_choice == VoiceChoice::Random && tts.random_scope == RandomScope::Chunk;
        Self::new(voices, per_chunk)
    }

    /// `per_chunk` re-draws the backend for every chunk; otherwise each run
    /// draws once and keeps that backend for all of its chunks.
    pub fn new(voices: Vec<(Box<dyn TtsBackend>, Option<String>)>, per_chunk: bool) -> Self {
        Self { voices, per_chunk }
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> usize {
        if self.voices.len() > 1 {
            rng.gen_range(0..self.voices.len())
        } else {
            0
        }
    }

    fn pick<R: Rng>(
        &self,
        run_choice: usize,
        rng: &mut R,
    ) -> Option<&(Box<dyn TtsBackend>, Option<String>)> {
        if self.per_chunk {
            self.voices.get(self.draw(rng))
        } else {
            self.voices.get(run_choice)
        }
    }

    /// Synthesizes every chunk into `dir/NNN.wav`. A failed chunk does not stop
    /// the others; all outcomes are reported. Each call is one run and draws
    /// its own backend from `rng`.
    pub fn synthesize_chunks<R: Rng>(
        &self,
        chunks: &[TextChunk],
        dir: &Path,
        rng: &mut R,
    ) -> SynthesisOutcome {
        let mut outcome = SynthesisOutcome::default();
        let run_choice = self.draw(rng);
        if !self.per_chunk {
            if let Some((backend, _)) = self.voices.get(run_choice) {
                info!("Narrating with {}", backend.name());
            }
        }
        for chunk in chunks {
            let Some((backend, voice)) = self.pick(run_choice, rng) else {
                outcome.failures.push(SynthesisFailure {
                    chunk: chunk.index,
                    backend: "none".to_string(),
                    error: anyhow::anyhow!("no tts backend configured"),
                });
                continue;
            };
            let out = dir.join(format!("{:03}.wav", chunk.index));
            info!(
                "Generating TTS chunk {}/{} with {} ({} chars)",
                chunk.index + 1,
                chunks.len(),
                backend.name(),
                chunk.text.len()
            );
            debug!("Chunk text: {}", chunk.text);

            match speak(backend.as_ref(), &chunk.text, voice.as_deref(), &out) {
                Ok(duration) => {
                    info!("Chunk {} duration: {:.2} seconds", chunk.index, duration);
                    outcome.clips.push(NarrationClip {
                        index: chunk.index,
                        duration,
                        path: out,
                        backend: backend.name().to_string(),
                    });
                }
                Err(e) => {
                    error!("Failed to generate TTS chunk {}: {:?}", chunk.index, e);
                    outcome.failures.push(SynthesisFailure {
                        chunk: chunk.index,
                        backend: backend.name().to_string(),
                        error: e,
                    });
                }
            }
        }
        outcome
    }
}

fn speak(backend: &dyn TtsBackend, text: &str, voice: Option<&str>, out: &Path) -> anyhow::Result<f64> {
    let spoken = sanitize_text(text);
    if spoken.is_empty() {
        bail!("chunk has no speakable text");
    }
    let duration = backend.synthesize(&spoken, voice, out)?;
    if !(duration > 0.0 && duration.is_finite()) {
        bail!("backend produced an empty clip ({:.3}s)", duration);
    }
    if !out.exists() {
        bail!("backend reported success but wrote no audio to {}", out.display());
    }
    Ok(duration)
}

#[derive(Debug)]
pub struct SynthesisFailure {
    pub chunk: usize,
    pub backend: String,
    pub error: anyhow::Error,
}

#[derive(Debug, Default)]
pub struct SynthesisOutcome {
    pub clips: Vec<NarrationClip>,
    pub failures: Vec<SynthesisFailure>,
}

impl SynthesisOutcome {
    /// The clips in chunk order, or the first failure as a `Synthesis` error.
    pub fn into_result(mut self) -> Result<Vec<NarrationClip>> {
        if self.failures.is_empty() {
            self.clips.sort_by_key(|c| c.index);
            return Ok(self.clips);
        }
        self.failures.sort_by_key(|f| f.chunk);
        let first = self.failures.remove(0);
        Err(PipelineError::Synthesis {
            chunk: first.chunk,
            backend: first.backend,
            source: first.error,
        })
    }
}

/// Runs a TTS process, feeding `stdin` if given, killing it past `timeout`.
/// A zero timeout waits indefinitely.
pub(crate) fn run_with_deadline(
    mut cmd: Command,
    stdin: Option<&str>,
    timeout: Duration,
) -> anyhow::Result<()> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::null())
    .stderr(Stdio::inherit());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {}", program))?;

    if let Some(text) = stdin {
        let mut pipe = child
            .stdin
            .take()
            .with_context(|| format!("failed to open stdin of {}", program))?;
        pipe.write_all(text.as_bytes())?;
    }

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().context("poll tts process")? {
            if !status.success() {
                bail!("{} exited with status {}", program, status);
            }
            return Ok(());
        }
        if !timeout.is_zero() && start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            bail!("{} timed out after {}s", program, timeout.as_secs());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

/// Duration of a WAV a backend just wrote.
pub(crate) fn clip_duration(out: &Path) -> anyhow::Result<f64> {
    wav_duration_seconds(out).with_context(|| format!("measure clip {}", out.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::write_pcm16_wav;
    use crate::model::ChunkKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Mutex;

    struct Tone {
        name: &'static str,
        spoken: Mutex<Vec<String>>,
    }

    impl Tone {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                spoken: Mutex::new(Vec::new()),
            }
        }
    }

    impl TtsBackend for Tone {
        fn name(&self) -> &str {
            self.name
        }

        fn synthesize(&self, text: &str, _voice: Option<&str>, out: &Path) -> anyhow::Result<f64> {
            self.spoken.lock().unwrap().push(text.to_string());
            write_pcm16_wav(out, &vec![0u8; 1600], 8000)?;
            clip_duration(out)
        }
    }

    fn chunks(n: usize) -> Vec<TextChunk> {
        (0..n)
            .map(|i| TextChunk::new(i, ChunkKind::Body, format!("Chunk number {}.", i), 0..1))
            .collect()
    }

    fn three_tones() -> Vec<(Box<dyn TtsBackend>, Option<String>)> {
        vec![
            (Box::new(Tone::new("a")), None),
            (Box::new(Tone::new("b")), None),
            (Box::new(Tone::new("c")), None),
        ]
    }

    #[test]
    fn run_scope_uses_one_backend_for_every_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let narrator = Narrator::new(three_tones(), false);
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let clips = narrator
                .synthesize_chunks(&chunks(6), dir.path(), &mut rng)
                .into_result()
                .unwrap();
            let first = clips[0].backend.clone();
            assert!(clips.iter().all(|c| c.backend == first));
        }
    }

    #[test]
    fn run_scope_draws_again_for_each_run() {
        let dir = tempfile::tempdir().unwrap();
        let narrator = Narrator::new(three_tones(), false);
        let mut rng = StdRng::seed_from_u64(11);
        let mut used = std::collections::HashSet::new();
        for _ in 0..30 {
            let clips = narrator
                .synthesize_chunks(&chunks(2), dir.path(), &mut rng)
                .into_result()
                .unwrap();
            assert_eq!(clips[0].backend, clips[1].backend);
            used.insert(clips[0].backend.clone());
        }
        assert!(used.len() > 1, "every run used {:?}", used);
    }

    #[test]
    fn chunk_scope_can_vary_backends() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let voices: Vec<(Box<dyn TtsBackend>, Option<String>)> = vec![
            (Box::new(Tone::new("a")), None),
            (Box::new(Tone::new("b")), None),
        ];
        let narrator = Narrator::new(voices, true);
        let clips = narrator
            .synthesize_chunks(&chunks(30), dir.path(), &mut rng)
            .into_result()
            .unwrap();
        let used: std::collections::HashSet<_> = clips.iter().map(|c| c.backend.as_str()).collect();
        assert_eq!(used.len(), 2);
    }

    #[test]
    fn backends_receive_sanitized_text() {
        let dir = tempfile::tempdir().unwrap();
        let tone = Tone::new("a");
        let chunk = TextChunk::new(0, ChunkKind::Body, "see https://x.com now & later".into(), 0..1);
        let clip = speak(&tone, &chunk.text, None, &dir.path().join("x.wav")).unwrap();
        assert!((clip - 0.1).abs() < 1e-6);
        assert_eq!(tone.spoken.lock().unwrap()[0], "see now and later");
    }

    #[test]
    fn missing_process_is_an_error_not_a_hang() {
        let cmd = Command::new("definitely-not-a-real-tts-binary");
        assert!(run_with_deadline(cmd, Some("hi"), Duration::from_secs(1)).is_err());
    }
}
