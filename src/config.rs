use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::caption::CaptionStyle;
use crate::ffmpeg::RenderSettings;

pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
pub const ELEVENLABS_KEY_ENV: &str = "ELEVENLABS_API_KEY";

const DEFAULT_PROMPT: &str = "Write a 25-30 second viral TikTok script about a 'Mind-Blowing Fact' or 'Life Hack'.
STYLE: High energy, punchy, and fast-paced.
CONTEXT: This will play over high-intensity parkour and BMX stunt footage.
STRUCTURE: Start with a 2-second hook, followed by 3 fast facts, and end with a call to action.
Output spoken text ONLY. No emojis, no stage directions.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub gemini_key: String,
    pub gemini_model: String,
    pub prompt: String,
    pub tts: TtsConfig,
    pub background_dir: PathBuf,
    pub background_exts: Vec<String>,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    /// Narration file; defaults to `voiceover.<ext>` for the TTS backend.
    pub audio_path: Option<PathBuf>,
    pub cleanup: CleanupPolicy,
    pub caption: CaptionStyle,
    pub render: RenderSettings,
    pub archive_path: PathBuf,
    pub upload: UploadConfig,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_key: String::new(),
            gemini_model: "gemini-2.5-flash".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            tts: TtsConfig::default(),
            background_dir: PathBuf::from("assets/backgrounds"),
            background_exts: vec!["mp4".to_string(), "mov".to_string()],
            output_dir: PathBuf::from("output"),
            output_prefix: "stunt_video".to_string(),
            audio_path: None,
            cleanup: CleanupPolicy::RemoveAudio,
            caption: CaptionStyle::default(),
            render: RenderSettings::default(),
            archive_path: PathBuf::from("index.html"),
            upload: UploadConfig::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackend {
    Piper,
    ElevenLabs,
}

impl TtsBackend {
    /// Container the backend writes: piper emits WAV, ElevenLabs MP3.
    pub fn audio_extension(self) -> &'static str {
        match self {
            TtsBackend::Piper => "wav",
            TtsBackend::ElevenLabs => "mp3",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub backend: TtsBackend,
    pub piper_model: PathBuf,
    pub elevenlabs_voice: String,
    #[serde(rename = "elevenlabs_api_key")]
    pub elevenlabs_key: String,
    pub elevenlabs_model: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: TtsBackend::Piper,
            piper_model: PathBuf::from("en_US-amy-medium.onnx"),
            elevenlabs_voice: "JBFqnCBsd6RMkjVDRZzb".to_string(),
            elevenlabs_key: String::new(),
            elevenlabs_model: "eleven_multilingual_v2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    Keep,
    RemoveAudio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadTarget {
    TikTok,
    YouTube,
}

impl UploadTarget {
    pub fn label(self) -> &'static str {
        match self {
            UploadTarget::TikTok => "TikTok",
            UploadTarget::YouTube => "YouTube Shorts",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub enabled: bool,
    pub target: UploadTarget,
    pub cookies: PathBuf,
    pub description: String,
    /// Upload URL accepting the multipart post. Required when `enabled`.
    pub endpoint: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target: UploadTarget::TikTok,
            cookies: PathBuf::from("cookies.txt"),
            description: "Wait for the end! 🤯 #stunts #parkour #facts #ai #automation".to_string(),
            endpoint: None,
        }
    }
}

impl UploadConfig {
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

impl Config {
    /// Reads `path` if it exists (every field is optional), then applies the
    /// environment credentials.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if fs::metadata(path).await.is_ok() {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Self::from_json(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.gemini_key = lookup(GEMINI_KEY_ENV).unwrap_or_default().trim().to_string();
        if self.gemini_key.is_empty() {
            anyhow::bail!("{} missing", GEMINI_KEY_ENV);
        }

        if let Some(key) = lookup(ELEVENLABS_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.tts.elevenlabs_key = key.trim().to_string();
        }
        if self.tts.backend == TtsBackend::ElevenLabs && self.tts.elevenlabs_key.is_empty() {
            anyhow::bail!("tts.backend is elevenlabs but {} missing", ELEVENLABS_KEY_ENV);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.upload.enabled && self.upload.endpoint().is_none() {
            anyhow::bail!(
                "upload.enabled is true but upload.endpoint is not set; \
                 set the {} upload URL or set upload.enabled to false",
                self.upload.target.label()
            );
        }
        Ok(())
    }

    pub fn audio_path(&self) -> PathBuf {
        self.audio_path.clone().unwrap_or_else(|| {
            PathBuf::from(format!("voiceover.{}", self.tts.backend.audio_extension()))
        })
    }

    pub fn output_file_name(&self, now: chrono::DateTime<chrono::Local>) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.mp4",
            self.output_prefix,
            now.format("%Y%m%d_%H%M%S")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn env_with(gemini: Option<&'static str>) -> impl Fn(&str) -> Option<String> {
        move |key| match key {
            GEMINI_KEY_ENV => gemini.map(str::to_string),
            _ => None,
        }
    }

    #[test]
    fn empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.gemini_model, "gemini-2.5-flash");
        assert_eq!(cfg.background_dir, PathBuf::from("assets/backgrounds"));
        assert_eq!(cfg.tts.backend, TtsBackend::Piper);
        assert_eq!(cfg.cleanup, CleanupPolicy::RemoveAudio);
        assert_eq!(cfg.upload.endpoint(), None);
        assert_eq!(cfg.audio_path(), PathBuf::from("voiceover.wav"));
    }

    #[test]
    fn enabled_upload_requires_endpoint() {
        let cfg = Config::default();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("upload.endpoint is not set"));

        let cfg = Config::from_json(r#"{"upload":{"endpoint":"   "}}"#).unwrap();
        assert!(cfg.validate().is_err());

        let cfg = Config::from_json(r#"{"upload":{"enabled":false}}"#).unwrap();
        cfg.validate().unwrap();

        let cfg =
            Config::from_json(r#"{"upload":{"endpoint":"https://uploads.example.net/post"}}"#)
                .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.upload.endpoint(), Some("https://uploads.example.net/post"));
    }

    #[test]
    fn narration_extension_follows_backend() {
        let cfg = Config::from_json(r#"{"tts":{"backend":"elevenlabs"}}"#).unwrap();
        assert_eq!(cfg.audio_path(), PathBuf::from("voiceover.mp3"));

        let cfg = Config::from_json(r#"{"audio_path":"tmp/narration.flac"}"#).unwrap();
        assert_eq!(cfg.audio_path(), PathBuf::from("tmp/narration.flac"));
    }

    #[test]
    fn partial_json_overrides_fields() {
        let cfg = Config::from_json(
            r#"{"output_prefix":"clip","cleanup":"keep","upload":{"target":"youtube"},"seed":7}"#,
        )
        .unwrap();
        assert_eq!(cfg.output_prefix, "clip");
        assert_eq!(cfg.cleanup, CleanupPolicy::Keep);
        assert_eq!(cfg.upload.target, UploadTarget::YouTube);
        assert!(cfg.upload.enabled);
        assert_eq!(cfg.seed, Some(7));
    }

    #[test]
    fn missing_gemini_key_is_rejected() {
        let mut cfg = Config::default();
        assert!(cfg.apply_env(env_with(None)).is_err());
        assert!(cfg.apply_env(env_with(Some("   "))).is_err());
        cfg.apply_env(env_with(Some("abc"))).unwrap();
        assert_eq!(cfg.gemini_key, "abc");
    }

    #[test]
    fn elevenlabs_backend_requires_key() {
        let mut cfg = Config::from_json(r#"{"tts":{"backend":"elevenlabs"}}"#).unwrap();
        assert!(cfg.apply_env(env_with(Some("abc"))).is_err());

        cfg.apply_env(|key| match key {
            GEMINI_KEY_ENV => Some("abc".to_string()),
            ELEVENLABS_KEY_ENV => Some("xi".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.tts.elevenlabs_key, "xi");
    }

    #[test]
    fn output_name_embeds_timestamp() {
        let cfg = Config::default();
        let now = chrono::Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            cfg.output_file_name(now),
            PathBuf::from("output/stunt_video_20260304_050607.mp4")
        );
    }
}
