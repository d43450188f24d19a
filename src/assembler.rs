use crate::background;
use crate::caption::CaptionStyle;
use crate::clip_plan::{self, ClipPlan, TARGET_WIDTH};
use crate::config::Config;
use crate::ffmpeg::{self, CompositeJob, RenderSettings};
use crate::logi;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct AssembledVideo {
    pub path: PathBuf,
    pub background: PathBuf,
    pub plan: ClipPlan,
}

#[async_trait]
pub trait ClipAssembler: Send + Sync {
    async fn assemble(&self, audio: &Path, script: &str, out_mp4: &Path) -> Result<AssembledVideo>;
}

/// Fixed seed for reproducible runs, OS entropy otherwise.
fn run_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Times, crops and captions a random background clip with ffmpeg.
pub struct FfmpegAssembler {
    background_dir: PathBuf,
    background_exts: Vec<String>,
    caption: CaptionStyle,
    render: RenderSettings,
    rng: Mutex<StdRng>,
}

impl FfmpegAssembler {
    pub fn new(cfg: &Config) -> Self {
        Self {
            background_dir: cfg.background_dir.clone(),
            background_exts: cfg.background_exts.clone(),
            caption: cfg.caption.clone(),
            render: cfg.render.clone(),
            rng: Mutex::new(run_rng(cfg.seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

#[async_trait]
impl ClipAssembler for FfmpegAssembler {
    async fn assemble(&self, audio: &Path, script: &str, out_mp4: &Path) -> Result<AssembledVideo> {
        let candidates =
            background::list_candidates(&self.background_dir, &self.background_exts).await?;
        let selected = self
            .with_rng(|rng| clip_plan::select_candidate(&candidates, &self.background_dir, rng))?
            .clone();
        logi(format!(
            "Selected background {} ({} candidates)",
            selected.display(),
            candidates.len()
        ));

        let audio_dur = ffmpeg::ffprobe_duration_seconds(audio)
            .await
            .context("Bad narration duration")?;
        let bg_dur = ffmpeg::ffprobe_duration_seconds(&selected)
            .await
            .context("Bad background duration")?;
        let bg_size = ffmpeg::ffprobe_video_dimensions(&selected)
            .await
            .context("Bad background dimensions")?;

        let plan = self.with_rng(|rng| clip_plan::plan_segment(bg_dur, audio_dur, rng))?;
        if plan.is_looped() {
            logi(format!(
                "Background {:.2}s < narration {:.2}s: looping {}x then trimming",
                bg_dur, audio_dur, plan.loops
            ));
        } else {
            logi(format!(
                "Background window {:.2}s-{:.2}s of {:.2}s",
                plan.source_start,
                plan.source_start + plan.duration,
                bg_dur
            ));
        }

        let lines = self.caption.layout(script, TARGET_WIDTH);
        let job = CompositeJob {
            background: &selected,
            background_size: bg_size,
            plan: &plan,
            audio,
            caption_lines: &lines,
            style: &self.caption,
            settings: &self.render,
            out_mp4,
        };
        ffmpeg::render_composite(&job).await?;

        Ok(AssembledVideo {
            path: out_mp4.to_path_buf(),
            background: selected,
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip_plan::PlanError;
    use rand::Rng;

    #[test]
    fn seeded_runs_draw_the_same_plan() {
        let draw = |seed| {
            let mut rng = run_rng(seed);
            clip_plan::plan_segment(60.0, 10.0, &mut rng).unwrap().source_start
        };
        assert_eq!(draw(Some(42)), draw(Some(42)));

        let start = draw(None);
        assert!((10.0..=35.0).contains(&start));
        assert_ne!(run_rng(None).r#gen::<u64>(), run_rng(None).r#gen::<u64>());
    }

    #[tokio::test]
    async fn empty_pool_fails_before_probing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            background_dir: dir.path().to_path_buf(),
            seed: Some(1),
            ..Config::default()
        };
        std::fs::write(dir.path().join("readme.txt"), b"not a clip").unwrap();

        let err = FfmpegAssembler::new(&cfg)
            .assemble(Path::new("missing.mp3"), "script", &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlanError>(),
            Some(PlanError::NoCandidates(_))
        ));
    }
}
