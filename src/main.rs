use anyhow::Result;
use stunt_shorts::config::Config;
use stunt_shorts::generator::run_generation;
use stunt_shorts::init;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config.json").await?;
    init::ensure_directories(&cfg).await?;

    if !init::check_ffmpeg().await {
        tracing::warn!("FFmpeg not found in PATH. Please install FFmpeg.");
    }

    let report = run_generation(cfg).await?;
    if report.warnings.is_empty() {
        tracing::info!("Done: {}", report.video.display());
    } else {
        tracing::warn!(
            "Done with {} warning(s): {}",
            report.warnings.len(),
            report.video.display()
        );
    }
    Ok(())
}
