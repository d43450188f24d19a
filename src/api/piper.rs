use crate::api::SpeechSynthesizer;
use crate::logi;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Local text-to-speech through the `piper` command line tool.
pub struct PiperSynthesizer {
    program: PathBuf,
    model: PathBuf,
}

impl PiperSynthesizer {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("piper"),
            model: model.into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperSynthesizer {
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()> {
        logi(format!("Calling piper ({}) -> {}", self.model.display(), out_path.display()));

        let mut child = Command::new(&self.program)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_file")
            .arg(out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.program.display()))?;

        {
            let mut stdin = child.stdin.take().context("piper stdin unavailable")?;
            stdin.write_all(text.as_bytes()).await?;
            stdin.shutdown().await.ok();
        }

        let status = child.wait().await.context("piper wait failed")?;
        if !status.success() {
            anyhow::bail!("piper exited with {}", status);
        }
        if tokio::fs::metadata(out_path).await.is_err() {
            anyhow::bail!("piper produced no audio: {}", out_path.display());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_piper(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("piper");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn pipes_text_into_output_file() {
        let dir = tempfile::tempdir().unwrap();
        // args: --model M --output_file OUT
        let program = fake_piper(dir.path(), r#"cat > "$4""#);
        let out = dir.path().join("voice.wav");

        PiperSynthesizer::new("voice.onnx")
            .with_program(&program)
            .synthesize("three fast facts", &out)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "three fast facts");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_piper(dir.path(), "cat > /dev/null; exit 3");
        let out = dir.path().join("voice.wav");

        let err = PiperSynthesizer::new("voice.onnx")
            .with_program(&program)
            .synthesize("hello", &out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("piper exited"));
    }
}
