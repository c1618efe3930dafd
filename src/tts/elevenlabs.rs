use super::{TtsBackend, clip_duration};
use crate::audio::write_pcm16_wav;
use crate::config::TtsConfig;
use crate::utils::truncate_at_word;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

const API: &str = "https://api.elevenlabs.io/v1";
const SAMPLE_RATE: u32 = 44100;
const MAX_CHARS: usize = 2500;
const FALLBACK_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

#[derive(Debug, Deserialize)]
struct VoiceList {
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// Cloud voices over the ElevenLabs HTTP API. Audio is requested as raw PCM
/// and wrapped into WAV locally.
pub struct ElevenLabsBackend {
    api_key: String,
    model: String,
    stability: f32,
    similarity_boost: f32,
    timeout: Duration,
    voice_id: OnceLock<String>,
}

impl ElevenLabsBackend {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            api_key: config.elevenlabs_api_key.clone(),
            model: config.elevenlabs_model.clone(),
            stability: config.elevenlabs_stability,
            similarity_boost: config.elevenlabs_similarity_boost,
            timeout: Duration::from_secs(config.timeout_seconds.max(1)),
            voice_id: OnceLock::new(),
        }
    }

    fn client(&self) -> anyhow::Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("building elevenlabs client")
    }

    fn resolve_voice(&self, client: &reqwest::blocking::Client, name: Option<&str>) -> String {
        if let Some(id) = self.voice_id.get() {
            return id.clone();
        }
        let id = match self.lookup_voice(client, name) {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not list ElevenLabs voices, using default voice: {:?}", e);
                FALLBACK_VOICE_ID.to_string()
            }
        };
        self.voice_id.get_or_init(|| id).clone()
    }

    fn lookup_voice(
        &self,
        client: &reqwest::blocking::Client,
        name: Option<&str>,
    ) -> anyhow::Result<String> {
        let list: VoiceList = client
            .get(format!("{}/voices", API))
            .header("xi-api-key", &self.api_key)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(pick_voice(&list.voices, name))
    }
}

/// Voice id for `name` (case-insensitive), else the account's first voice.
fn pick_voice(voices: &[VoiceEntry], name: Option<&str>) -> String {
    name.and_then(|name| voices.iter().find(|v| v.name.eq_ignore_ascii_case(name.trim())))
        .or_else(|| voices.first())
        .map(|v| v.voice_id.clone())
        .unwrap_or_else(|| FALLBACK_VOICE_ID.to_string())
}

impl TtsBackend for ElevenLabsBackend {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    fn synthesize(&self, text: &str, voice: Option<&str>, out: &Path) -> anyhow::Result<f64> {
        let client = self.client()?;
        let voice_id = self.resolve_voice(&client, voice);
        let text = if text.chars().count() > MAX_CHARS {
            warn!("Text too long ({} chars), truncating to {}", text.chars().count(), MAX_CHARS);
            truncate_at_word(text, MAX_CHARS)
        } else {
            text.to_string()
        };
        debug!("Requesting ElevenLabs speech with voice {}", voice_id);

        let body = SpeechRequest {
            text: &text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: self.stability,
                similarity_boost: self.similarity_boost,
            },
        };
        let pcm = client
            .post(format!("{}/text-to-speech/{}", API, voice_id))
            .query(&[("output_format", format!("pcm_{}", SAMPLE_RATE))])
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .context("elevenlabs request failed")?
            .error_for_status()
            .context("elevenlabs rejected the request")?
            .bytes()?;

        write_pcm16_wav(out, &pcm, SAMPLE_RATE)?;
        clip_duration(out)
    }
}
