use super::{TtsBackend, clip_duration, run_with_deadline};
use crate::config::TtsConfig;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, error};

/// Local neural voice: the `piper` binary reads text on stdin and writes a WAV.
pub struct PiperBackend {
    binary: String,
    model: PathBuf,
    timeout: Duration,
}

impl PiperBackend {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            binary: config.piper_binary.clone(),
            model: config.piper_model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn command(&self, voice: Option<&str>, out: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--model")
            .arg(&self.model)
            .arg("--output_file")
            .arg(out);
        // multi-speaker models take a numeric speaker id
        if let Some(speaker) = voice.filter(|v| v.parse::<u32>().is_ok()) {
            cmd.args(["--speaker", speaker]);
        }
        cmd
    }
}

impl TtsBackend for PiperBackend {
    fn name(&self) -> &str {
        "piper"
    }

    fn synthesize(&self, text: &str, voice: Option<&str>, out: &Path) -> anyhow::Result<f64> {
        debug!("Calling Piper TTS for output file {}", out.display());
        if let Err(e) = run_with_deadline(self.command(voice, out), Some(text), self.timeout) {
            error!("Piper TTS command failed for chunk: {}", out.display());
            return Err(e.context("TTS engine failed for chunk"));
        }
        clip_duration(out)
    }
}
