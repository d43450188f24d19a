use crate::config::Config;
use crate::logi;
use anyhow::{Context, Result};
use tokio::fs;

pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    for dir in [&cfg.background_dir, &cfg.output_dir] {
        if fs::metadata(dir).await.is_err() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create dir {}", dir.display()))?;
            logi(format!("Created directory: {}", dir.display()));
        }
    }
    Ok(())
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            background_dir: dir.path().join("assets/backgrounds"),
            output_dir: dir.path().join("output"),
            ..Config::default()
        };
        ensure_directories(&cfg).await.unwrap();
        assert!(cfg.background_dir.is_dir());
        assert!(cfg.output_dir.is_dir());
        ensure_directories(&cfg).await.unwrap();
    }
}
