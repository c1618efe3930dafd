use super::{TtsBackend, clip_duration, run_with_deadline};
use crate::config::TtsConfig;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// The operating system's own voice: `say` on macOS, `espeak-ng` elsewhere.
pub struct SystemVoice {
    rate: u32,
    timeout: Duration,
}

impl SystemVoice {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            rate: config.system_rate,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    fn command(&self, text: &str, voice: Option<&str>, out: &Path) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("say");
            cmd.arg("-o")
                .arg(out)
                .args(["--file-format=WAVE", "--data-format=LEI16@22050"])
                .args(["-r", &self.rate.to_string()]);
            if let Some(voice) = voice {
                cmd.args(["-v", voice]);
            }
            cmd.arg(text);
            cmd
        } else {
            let mut cmd = Command::new("espeak-ng");
            cmd.arg("-w").arg(out).args(["-s", &self.rate.to_string()]);
            if let Some(voice) = voice {
                cmd.args(["-v", voice]);
            }
            cmd.arg(text);
            cmd
        }
    }
}

impl TtsBackend for SystemVoice {
    fn name(&self) -> &str {
        "system"
    }

    fn synthesize(&self, text: &str, voice: Option<&str>, out: &Path) -> anyhow::Result<f64> {
        run_with_deadline(self.command(text, voice, out), None, self.timeout)?;
        clip_duration(out)
    }
}
