use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TARGET_WIDTH: u32 = 1080;
pub const TARGET_HEIGHT: u32 = 1920;

/// Window of the usable start range `[0, L - D]` the start offset is drawn from.
const START_BIAS_LO: f64 = 0.2;
const START_BIAS_HI: f64 = 0.7;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("no background clips found in {}", .0.display())]
    NoCandidates(PathBuf),
    #[error("invalid duration: {name}={value}")]
    InvalidDuration { name: &'static str, value: f64 },
}

/// How a background clip is cut to match the narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipPlan {
    pub source_start: f64,
    pub duration: f64,
    /// Total plays of the source; 1 means a single window with no looping.
    pub loops: u32,
}

impl ClipPlan {
    pub fn is_looped(&self) -> bool {
        self.loops > 1
    }
}

pub fn select_candidate<'a, R: Rng + ?Sized>(
    candidates: &'a [PathBuf],
    pool_dir: &Path,
    rng: &mut R,
) -> Result<&'a PathBuf, PlanError> {
    if candidates.is_empty() {
        return Err(PlanError::NoCandidates(pool_dir.to_path_buf()));
    }
    let idx = rng.gen_range(0..candidates.len());
    Ok(&candidates[idx])
}

pub fn plan_segment<R: Rng + ?Sized>(
    source_len: f64,
    target: f64,
    rng: &mut R,
) -> Result<ClipPlan, PlanError> {
    if !target.is_finite() || target <= 0.0 {
        return Err(PlanError::InvalidDuration {
            name: "target",
            value: target,
        });
    }
    if !source_len.is_finite() || source_len <= 0.0 {
        return Err(PlanError::InvalidDuration {
            name: "source",
            value: source_len,
        });
    }

    if source_len >= target {
        let max_start = source_len - target;
        let lo = max_start * START_BIAS_LO;
        let hi = max_start * START_BIAS_HI;
        let start = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
        return Ok(ClipPlan {
            source_start: start,
            duration: target,
            loops: 1,
        });
    }

    let loops = (target / source_len).ceil().max(1.0) as u32;
    Ok(ClipPlan {
        source_start: 0.0,
        duration: target,
        loops,
    })
}

/// Frame size after scaling `(w, h)` to cover the target frame, before the
/// center crop. Rounded up to even sizes for 4:2:0 chroma.
pub fn cover_scale(w: u32, h: u32) -> (u32, u32) {
    let w = w.max(1) as f64;
    let h = h.max(1) as f64;
    let scale = (TARGET_HEIGHT as f64 / h).max(TARGET_WIDTH as f64 / w);
    let sw = ((w * scale).round() as u32).max(TARGET_WIDTH);
    let sh = ((h * scale).round() as u32).max(TARGET_HEIGHT);
    ((sw + 1) & !1, (sh + 1) & !1)
}

/// Center crop offsets into a frame produced by `cover_scale`.
pub fn center_crop_offset(scaled_w: u32, scaled_h: u32) -> (u32, u32) {
    (
        scaled_w.saturating_sub(TARGET_WIDTH) / 2,
        scaled_h.saturating_sub(TARGET_HEIGHT) / 2,
    )
}
