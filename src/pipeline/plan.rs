use crate::foundation::core::FrameIndex;
use crate::foundation::error::{EffectgenError, EffectgenResult};
use crate::media::background::BackgroundKind;

/// How many frames a run will produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TotalFrames {
    /// Exactly this many frames.
    Bounded(u64),
    /// Until the background source is exhausted.
    Unbounded,
}

/// Timing inputs for [`resolve_run_plan`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanSettings {
    /// Output frame rate.
    pub fps: u32,
    /// Explicit output duration in seconds.
    pub duration: Option<f64>,
    /// Fade-in/fade-out length in seconds.
    pub fade: f64,
    /// Seconds of effect simulation to run before the first output frame.
    pub warmup: f64,
}

/// Frame counts derived once before any stage starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunPlan {
    /// Planned output length.
    pub total: TotalFrames,
    /// Number of `update()` calls per effect before rendering.
    pub warmup_frames: u64,
    /// Length of each fade ramp in frames.
    pub fade_frames: u64,
}

/// Work out the output length and ramp lengths.
///
/// An explicit duration wins. Otherwise a video background is probed through `probe`; when that
/// fails the run is unbounded and ends when the video does. With neither, the run has no end and
/// is rejected.
pub fn resolve_run_plan(
    settings: &PlanSettings,
    background: Option<BackgroundKind>,
    probe: impl FnOnce() -> Option<f64>,
) -> EffectgenResult<RunPlan> {
    if settings.fps == 0 {
        return Err(EffectgenError::setup("fps must be non-zero"));
    }
    if !settings.fade.is_finite() || settings.fade < 0.0 {
        return Err(EffectgenError::setup("fade must be a non-negative number of seconds"));
    }
    if !settings.warmup.is_finite() || settings.warmup < 0.0 {
        return Err(EffectgenError::setup("warmup must be a non-negative number of seconds"));
    }
    let fps = f64::from(settings.fps);

    let total = match settings.duration {
        Some(duration) => {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(EffectgenError::setup("duration must be positive"));
            }
            let frames = (fps * duration).round() as u64;
            if frames == 0 {
                return Err(EffectgenError::setup(format!(
                    "duration {duration}s is shorter than one frame at {} fps",
                    settings.fps
                )));
            }
            TotalFrames::Bounded(frames)
        }
        None if background == Some(BackgroundKind::Video) => match probe() {
            Some(secs) if (secs * fps).round() >= 1.0 => {
                let frames = (secs * fps).round() as u64;
                tracing::info!(seconds = secs, frames, "using background video duration");
                TotalFrames::Bounded(frames)
            }
            _ => {
                tracing::warn!(
                    "could not determine background video duration; rendering until it ends"
                );
                TotalFrames::Unbounded
            }
        },
        None => {
            return Err(EffectgenError::setup(
                "no duration given and no background video to take it from",
            ));
        }
    };

    Ok(RunPlan {
        total,
        warmup_frames: (settings.warmup * fps).round() as u64,
        fade_frames: (settings.fade * fps).trunc() as u64,
    })
}

impl RunPlan {
    /// Planned frame count, if the run is bounded.
    pub fn bounded_total(&self) -> Option<u64> {
        match self.total {
            TotalFrames::Bounded(n) => Some(n),
            TotalFrames::Unbounded => None,
        }
    }

    /// The value effects see as "total" in `post_process`: the planned count, or `index + 1`
    /// while the length is unknown.
    pub fn total_or_current(&self, index: FrameIndex) -> u64 {
        self.bounded_total().unwrap_or(index.0 + 1)
    }

    /// Fade ramp at `index` in `[0, 1]`. Unbounded runs only fade in.
    pub fn fade_envelope(&self, index: FrameIndex) -> f32 {
        let f = self.fade_frames;
        if f == 0 {
            return 1.0;
        }
        let i = index.0;
        if i < f {
            return i as f32 / f as f32;
        }
        if let Some(total) = self.bounded_total()
            && i >= total.saturating_sub(f)
        {
            return total.saturating_sub(i) as f32 / f as f32;
        }
        1.0
    }

    /// Multiplier handed to `render_frame`.
    ///
    /// Over a background the effect itself fades; without one the effect renders at `max_fade`
    /// and the whole frame is faded at the collector.
    pub fn stage_fade(&self, index: FrameIndex, has_background: bool, max_fade: f32) -> f32 {
        if has_background {
            self.fade_envelope(index) * max_fade
        } else {
            max_fade
        }
    }

    /// Brightness applied to the finished frame, if any.
    pub fn collector_fade(&self, index: FrameIndex, has_background: bool) -> Option<f32> {
        if has_background || self.fade_frames == 0 || self.bounded_total().is_none() {
            return None;
        }
        Some(self.fade_envelope(index))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/plan.rs"]
mod tests;
