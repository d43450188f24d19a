use crate::caption::CaptionStyle;
use crate::clip_plan::{self, ClipPlan, TARGET_HEIGHT, TARGET_WIDTH};
use crate::logi;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u32,
    pub audio_bitrate: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "ultrafast".to_string(),
            crf: 23,
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Everything ffmpeg needs to produce one composite video.
#[derive(Debug, Clone)]
pub struct CompositeJob<'a> {
    pub background: &'a Path,
    pub background_size: (u32, u32),
    pub plan: &'a ClipPlan,
    pub audio: &'a Path,
    pub caption_lines: &'a [String],
    pub style: &'a CaptionStyle,
    pub settings: &'a RenderSettings,
    pub out_mp4: &'a Path,
}

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd.status().await.context("Command execution failed")?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed: {:?}", args));
    }

    Ok(())
}

pub async fn ffprobe_video_dimensions(path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe execution failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed: {}", path.display()));
    }

    parse_dimensions(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| anyhow::anyhow!("Invalid dimensions: {}", path.display()))
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed: {}", path.display()));
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| anyhow::anyhow!("Invalid duration: {}", path.display()))
}

fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let line = text.lines().next()?.trim();
    let (w, h) = line.split_once('x')?;
    let w = w.trim().parse::<u32>().ok()?;
    let h = h.trim().parse::<u32>().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

fn parse_duration(text: &str) -> Option<f64> {
    let duration = text.trim().parse::<f64>().ok()?;
    if !duration.is_finite() || duration <= 0.1 {
        return None;
    }
    Some(duration)
}

/// Escapes a value for use inside a single-quoted filtergraph option.
fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("'\\''"),
            ':' => out.push_str("\\:"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn caption_line_path(dir: &Path, idx: usize) -> PathBuf {
    dir.join(format!("caption_{:02}.txt", idx))
}

/// Caption text is drawn literally (`expansion=none`), so a `%` or `\` in a
/// script never reaches drawtext's `%{...}` expander.
fn caption_filters(lines: &[String], style: &CaptionStyle, text_dir: &Path) -> Vec<String> {
    let line_h = style.line_height();
    let block_h = line_h * lines.len() as u32;
    let font = style
        .font_file
        .as_ref()
        .map(|f| format!(":fontfile='{}'", escape_filter_value(&f.display().to_string())))
        .unwrap_or_default();

    (0..lines.len())
        .map(|idx| {
            let path = caption_line_path(text_dir, idx);
            format!(
                "drawtext=textfile='{}'{}:expansion=none:fontsize={}:fontcolor={}:borderw={}:bordercolor={}:x=(w-text_w)/2:y=(h-{})/2+{}",
                escape_filter_value(&path.display().to_string()),
                font,
                style.font_size,
                style.fill,
                style.stroke_width,
                style.stroke,
                block_h,
                idx as u32 * line_h
            )
        })
        .collect()
}

/// The full ffmpeg argument vector for a composite render. Caption text is
/// read from `caption_line_path(text_dir, i)`.
pub fn composite_args(job: &CompositeJob<'_>, text_dir: &Path) -> Vec<String> {
    let (bw, bh) = job.background_size;
    let (sw, sh) = clip_plan::cover_scale(bw, bh);
    let (cx, cy) = clip_plan::center_crop_offset(sw, sh);

    let mut chain = vec![
        format!("scale={}:{}", sw, sh),
        format!("crop={}:{}:{}:{}", TARGET_WIDTH, TARGET_HEIGHT, cx, cy),
        "setsar=1".to_string(),
        format!("fps={}", job.settings.fps),
    ];
    chain.extend(caption_filters(job.caption_lines, job.style, text_dir));
    let filter = format!("[0:v]{}[v]", chain.join(","));

    let mut args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];

    if job.plan.is_looped() {
        args.push("-stream_loop".to_string());
        args.push((job.plan.loops - 1).to_string());
    } else if job.plan.source_start > 0.0 {
        args.push("-ss".to_string());
        args.push(format!("{:.3}", job.plan.source_start));
    }

    args.extend([
        "-i".to_string(),
        job.background.display().to_string(),
        "-i".to_string(),
        job.audio.display().to_string(),
        "-filter_complex".to_string(),
        filter,
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
        "-t".to_string(),
        format!("{:.3}", job.plan.duration),
        "-r".to_string(),
        job.settings.fps.to_string(),
        "-c:v".to_string(),
        job.settings.video_codec.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        job.settings.preset.clone(),
        "-crf".to_string(),
        job.settings.crf.to_string(),
        "-c:a".to_string(),
        job.settings.audio_codec.clone(),
        "-b:a".to_string(),
        job.settings.audio_bitrate.clone(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        job.out_mp4.display().to_string(),
    ]);
    args
}

pub async fn render_composite(job: &CompositeJob<'_>) -> Result<()> {
    let text_dir = tempfile::tempdir().context("Failed to create caption temp dir")?;
    for (idx, line) in job.caption_lines.iter().enumerate() {
        let path = caption_line_path(text_dir.path(), idx);
        fs::write(&path, line.as_bytes())
            .await
            .with_context(|| format!("Failed to write caption line {}", path.display()))?;
    }

    if let Some(parent) = job.out_mp4.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }

    logi(format!(
        "Rendering {}x{} @ {}fps ({:.2}s, {} caption lines) -> {}",
        TARGET_WIDTH,
        TARGET_HEIGHT,
        job.settings.fps,
        job.plan.duration,
        job.caption_lines.len(),
        job.out_mp4.display()
    ));

    let args = composite_args(job, text_dir.path());
    run_cmd(&args).await?;

    if fs::metadata(job.out_mp4).await.is_err() {
        anyhow::bail!("ffmpeg produced no output: {}", job.out_mp4.display());
    }
    Ok(())
}
