use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod elevenlabs;
pub mod gemini;
pub mod piper;
pub mod upload;

#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn generate_script(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Writes the spoken `text` to `out_path`.
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()>;
}

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, video: &Path, description: &str) -> Result<()>;
}

pub(crate) fn body_snippet(raw: &str) -> String {
    raw.chars().take(800).collect()
}
