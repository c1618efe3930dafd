use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reddit: RedditConfig,
    pub ai: AiConfig,
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub creds: Credentials,
    pub thread: ThreadConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    #[serde(rename = "2fa", alias = "two_fa")]
    pub two_fa: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    pub subreddit: String,
    pub post_id: String,
    pub allow_nsfw: bool,
    pub min_comments: u64,
    pub min_comment_length: usize,
    pub max_comment_length: usize,
    pub post_lang: String,
    pub blocked_words: Vec<String>,
    pub fetch_limit: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub ai_similarity_enabled: bool,
    pub ai_similarity_keywords: String,
    pub tie_break: TieBreak,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    ProviderOrder,
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storymode: bool,
    pub times_to_run: u32,
    pub resolution_w: u32,
    pub resolution_h: u32,
    pub theme: Theme,
    pub opacity: f32,
    pub zoom: f32,
    pub max_chunk_length: usize,
    pub channel_name: String,
    pub font_path: PathBuf,
    pub font_size: f32,
    pub subtitles: bool,
    pub results_dir: PathBuf,
    pub used_posts_path: PathBuf,
    pub background: BackgroundConfig,
    pub tts: TtsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Transparent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub video: PathBuf,
    pub audio: Option<PathBuf>,
    pub background_audio_volume: f32,
    pub thumbnail: bool,
    pub thumbnail_image: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Piper,
    Elevenlabs,
    System,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Piper => "piper",
            BackendKind::Elevenlabs => "elevenlabs",
            BackendKind::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceChoice {
    #[default]
    Piper,
    Elevenlabs,
    System,
    Random,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomScope {
    #[default]
    Run,
    Chunk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub voice_choice: VoiceChoice,
    pub random_pool: Vec<BackendKind>,
    pub random_scope: RandomScope,
    pub silence_duration: f64,
    pub timeout_seconds: u64,
    pub piper_model: PathBuf,
    pub piper_binary: String,
    pub elevenlabs_api_key: String,
    pub elevenlabs_voice_name: String,
    pub elevenlabs_model: String,
    pub elevenlabs_stability: f32,
    pub elevenlabs_similarity_boost: f32,
    pub system_voice: Option<String>,
    pub system_rate: u32,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            subreddit: String::new(),
            post_id: String::new(),
            allow_nsfw: false,
            min_comments: 20,
            min_comment_length: 1,
            max_comment_length: 500,
            post_lang: String::new(),
            blocked_words: Vec::new(),
            fetch_limit: 50,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storymode: false,
            times_to_run: 1,
            resolution_w: 1080,
            resolution_h: 1920,
            theme: Theme::Dark,
            opacity: 0.9,
            zoom: 1.0,
            max_chunk_length: 250,
            channel_name: "Reddit Tales".to_string(),
            font_path: PathBuf::from("fonts/Roboto-Regular.ttf"),
            font_size: 64.0,
            subtitles: false,
            results_dir: PathBuf::from("results"),
            used_posts_path: PathBuf::from("results/used_posts.json"),
            background: BackgroundConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            video: PathBuf::new(),
            audio: None,
            background_audio_volume: 0.15,
            thumbnail: true,
            thumbnail_image: None,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice_choice: VoiceChoice::Piper,
            random_pool: vec![BackendKind::Piper, BackendKind::System],
            random_scope: RandomScope::Run,
            silence_duration: 0.3,
            timeout_seconds: 60,
            piper_model: PathBuf::from("./tts/en_US-hfc_male-medium.onnx"),
            piper_binary: "piper".to_string(),
            elevenlabs_api_key: String::new(),
            elevenlabs_voice_name: "Rachel".to_string(),
            elevenlabs_model: "eleven_multilingual_v2".to_string(),
            elevenlabs_stability: 0.5,
            elevenlabs_similarity_boost: 0.75,
            system_voice: None,
            system_rate: 175,
        }
    }
}

impl Config {
    /// Reads, parses and normalizes. Call `validate` after applying overrides.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env_overrides();
        config.normalize();
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates without touching the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        let creds = &mut self.reddit.creds;
        for (var, slot) in [
            ("REDDIT_CLIENT_ID", &mut creds.client_id),
            ("REDDIT_CLIENT_SECRET", &mut creds.client_secret),
            ("REDDIT_USERNAME", &mut creds.username),
            ("REDDIT_PASSWORD", &mut creds.password),
            ("ELEVENLABS_API_KEY", &mut self.settings.tts.elevenlabs_api_key),
        ] {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    *slot = value;
                }
            }
        }
    }

    fn normalize(&mut self) {
        let thread = &mut self.reddit.thread;
        thread.subreddit = strip_prefix_ci(thread.subreddit.trim(), "r/").to_string();
        thread.post_id = thread.post_id.trim().to_string();
        let creds = &mut self.reddit.creds;
        creds.username = strip_prefix_ci(creds.username.trim(), "u/").to_string();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let thread = &self.reddit.thread;
        if thread.subreddit.is_empty() && thread.post_id.is_empty() {
            return Err(ConfigError::Missing("reddit.thread.subreddit"));
        }
        if thread.min_comment_length > thread.max_comment_length {
            return Err(invalid(
                "reddit.thread.min_comment_length",
                "must not exceed max_comment_length",
            ));
        }
        if thread.fetch_limit == 0 {
            return Err(invalid("reddit.thread.fetch_limit", "must be greater than 0"));
        }

        let creds = &self.reddit.creds;
        let filled = [
            &creds.client_id,
            &creds.client_secret,
            &creds.username,
            &creds.password,
        ]
        .iter()
        .filter(|v| !v.trim().is_empty())
        .count();
        if filled != 0 && filled != 4 {
            return Err(invalid(
                "reddit.creds",
                "client_id, client_secret, username and password must be set together",
            ));
        }

        let s = &self.settings;
        if s.times_to_run == 0 {
            return Err(invalid("settings.times_to_run", "must be at least 1"));
        }
        if s.resolution_w == 0 || s.resolution_h == 0 {
            return Err(invalid("settings.resolution", "width and height must be non-zero"));
        }
        if s.resolution_w % 2 != 0 || s.resolution_h % 2 != 0 {
            return Err(invalid("settings.resolution", "width and height must be even"));
        }
        if s.max_chunk_length == 0 {
            return Err(invalid("settings.max_chunk_length", "must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&s.opacity) {
            return Err(invalid("settings.opacity", "must be between 0.0 and 1.0"));
        }
        if !(s.zoom >= 1.0 && s.zoom.is_finite()) {
            return Err(invalid("settings.zoom", "must be at least 1.0"));
        }
        if s.font_size <= 0.0 {
            return Err(invalid("settings.font_size", "must be positive"));
        }
        if s.background.video.as_os_str().is_empty() {
            return Err(ConfigError::Missing("settings.background.video"));
        }
        if !(0.0..=1.0).contains(&s.background.background_audio_volume) {
            return Err(invalid(
                "settings.background.background_audio_volume",
                "must be between 0.0 and 1.0",
            ));
        }

        let tts = &s.tts;
        if tts.silence_duration < 0.0 || !tts.silence_duration.is_finite() {
            return Err(invalid("settings.tts.silence_duration", "must be non-negative"));
        }
        match tts.voice_choice {
            VoiceChoice::Piper => self.validate_backend(BackendKind::Piper)?,
            VoiceChoice::Elevenlabs => self.validate_backend(BackendKind::Elevenlabs)?,
            VoiceChoice::System => self.validate_backend(BackendKind::System)?,
            VoiceChoice::Random => {
                if tts.random_pool.is_empty() {
                    return Err(invalid(
                        "settings.tts.random_pool",
                        "voice_choice = \"random\" needs at least one backend",
                    ));
                }
                for kind in &tts.random_pool {
                    self.validate_backend(*kind)?;
                }
            }
        }

        Ok(())
    }

    fn validate_backend(&self, kind: BackendKind) -> Result<(), ConfigError> {
        let tts = &self.settings.tts;
        match kind {
            BackendKind::Piper => {
                if tts.piper_model.as_os_str().is_empty() {
                    return Err(ConfigError::Missing("settings.tts.piper_model"));
                }
            }
            BackendKind::Elevenlabs => {
                if tts.elevenlabs_api_key.trim().is_empty() {
                    return Err(ConfigError::Missing("settings.tts.elevenlabs_api_key"));
                }
                if !(0.0..=1.0).contains(&tts.elevenlabs_stability)
                    || !(0.0..=1.0).contains(&tts.elevenlabs_similarity_boost)
                {
                    return Err(invalid(
                        "settings.tts.elevenlabs",
                        "stability and similarity_boost must be between 0.0 and 1.0",
                    ));
                }
            }
            BackendKind::System => {}
        }
        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        !self.reddit.creds.client_id.trim().is_empty()
    }

    /// Post ids queued in `reddit.thread.post_id`, `+`-separated.
    pub fn post_ids(&self) -> Vec<String> {
        self.reddit
            .thread
            .post_id
            .split('+')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn similarity_keywords(&self) -> Vec<String> {
        self.ai
            .ai_similarity_keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}

fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> &'a str {
    match value.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &value[prefix.len()..],
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[reddit.thread]
subreddit = "r/AskReddit"

[settings.background]
video = "assets/bg.mp4"
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.reddit.thread.subreddit, "AskReddit");
        assert_eq!(config.reddit.thread.min_comments, 20);
        assert_eq!(config.settings.resolution_w, 1080);
        assert_eq!(config.settings.resolution_h, 1920);
        assert_eq!(config.settings.theme, Theme::Dark);
        assert_eq!(config.settings.tts.voice_choice, VoiceChoice::Piper);
        assert!(!config.has_credentials());
    }

    #[test]
    fn missing_subreddit_is_a_typed_error() {
        let raw = r#"
[settings.background]
video = "bg.mp4"
"#;
        let err = Config::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("reddit.thread.subreddit")));
    }

    #[test]
    fn missing_background_video_is_rejected() {
        let raw = r#"
[reddit.thread]
subreddit = "tifu"
"#;
        let err = Config::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("settings.background.video")));
    }

    #[test]
    fn elevenlabs_requires_api_key() {
        let raw = format!("{MINIMAL}\n[settings.tts]\nvoice_choice = \"elevenlabs\"\n");
        let err = Config::from_toml_str(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("settings.tts.elevenlabs_api_key")));
    }

    #[test]
    fn random_pool_members_are_validated() {
        let raw = format!(
            "{MINIMAL}\n[settings.tts]\nvoice_choice = \"random\"\nrandom_pool = [\"system\", \"elevenlabs\"]\n"
        );
        assert!(Config::from_toml_str(&raw).is_err());

        let raw = format!(
            "{MINIMAL}\n[settings.tts]\nvoice_choice = \"random\"\nrandom_pool = [\"system\", \"piper\"]\nrandom_scope = \"chunk\"\n"
        );
        let config = Config::from_toml_str(&raw).unwrap();
        assert_eq!(config.settings.tts.random_scope, RandomScope::Chunk);
    }

    #[test]
    fn unknown_backend_fails_to_parse() {
        let raw = format!("{MINIMAL}\n[settings.tts]\nvoice_choice = \"tiktok\"\n");
        assert!(matches!(
            Config::from_toml_str(&raw).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn partial_credentials_are_rejected() {
        let raw = format!("{MINIMAL}\n[reddit.creds]\nclient_id = \"abc\"\n");
        assert!(matches!(
            Config::from_toml_str(&raw).unwrap_err(),
            ConfigError::Invalid { key: "reddit.creds", .. }
        ));
    }

    #[test]
    fn odd_resolution_is_rejected() {
        let raw = MINIMAL.replace("[settings.background]", "[settings]\nresolution_w = 1081\n\n[settings.background]");
        assert!(Config::from_toml_str(&raw).is_err());
    }

    #[test]
    fn post_ids_and_keywords_are_split() {
        let raw = r#"
[reddit.thread]
post_id = " abc+def + "

[ai]
ai_similarity_enabled = true
ai_similarity_keywords = "dream, nightmare ,,lucid"

[settings.background]
video = "bg.mp4"
"#;
        let config = Config::from_toml_str(raw).unwrap();
        assert_eq!(config.post_ids(), vec!["abc", "def"]);
        assert_eq!(config.similarity_keywords(), vec!["dream", "nightmare", "lucid"]);
    }
}
