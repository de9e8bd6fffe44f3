use crate::effects::{Effect, EffectOption, EffectParams, PostProcess};
use crate::foundation::core::{FrameIndex, RawFrame};
use crate::foundation::error::{EffectgenError, EffectgenResult};
use crate::foundation::math::unit_to_u8;

/// Turns a background video into a seamless loop.
///
/// The first `crossfade` seconds are captured and dropped from the output; the same frames are
/// then blended over the tail so the last output frame leads straight into the first one.
#[derive(Clone, Debug)]
pub struct LoopFade {
    crossfade_secs: f32,
    crossfade_frames: u64,
    total: Option<u64>,
    // Slot `i` holds head frame `i`; a slot stays empty if that frame was dropped upstream.
    captured: Vec<Option<RawFrame>>,
    has_background: bool,
    warned: bool,
    warned_gap: bool,
}

impl Default for LoopFade {
    fn default() -> Self {
        Self {
            crossfade_secs: 1.5,
            crossfade_frames: 0,
            total: None,
            captured: Vec::new(),
            has_background: false,
            warned: false,
            warned_gap: false,
        }
    }
}

impl LoopFade {
    /// Frames in the crossfade window.
    pub fn crossfade_frames(&self) -> u64 {
        self.crossfade_frames
    }
}

impl Effect for LoopFade {
    fn name(&self) -> &'static str {
        "loopfade"
    }

    fn description(&self) -> &'static str {
        "Seamless loop with crossfade (requires a background video and a known duration)"
    }

    fn options(&self) -> Vec<EffectOption> {
        vec![EffectOption::float(
            "crossfade-duration",
            0.0,
            60.0,
            "1.5",
            "Crossfade duration in seconds",
        )]
    }

    fn configure(&mut self, params: &EffectParams) -> EffectgenResult<()> {
        self.crossfade_secs = params.f32_or("crossfade-duration", self.crossfade_secs)?;
        Ok(())
    }

    fn set_total_frames(&mut self, total: u64) {
        self.total = Some(total);
    }

    fn initialize(&mut self, _width: u32, _height: u32, fps: u32) -> EffectgenResult<()> {
        let Some(total) = self.total else {
            return Err(EffectgenError::effect_init(
                "loopfade needs a known output length (pass a duration)",
            ));
        };
        self.crossfade_frames = (self.crossfade_secs * fps as f32) as u64;
        if self.crossfade_frames.saturating_mul(2) > total {
            return Err(EffectgenError::effect_init(format!(
                "loopfade crossfade of {} frames does not fit twice into {total} frames",
                self.crossfade_frames
            )));
        }
        self.captured = vec![None; self.crossfade_frames as usize];
        self.warned_gap = false;
        tracing::info!(
            crossfade_frames = self.crossfade_frames,
            fade_start = total - self.crossfade_frames,
            "loopfade configured"
        );
        Ok(())
    }

    fn render_frame(&mut self, _frame: &mut RawFrame, has_background: bool, _fade: f32) {
        self.has_background = has_background;
        if !has_background && !self.warned {
            tracing::warn!("loopfade has nothing to loop without a background video");
            self.warned = true;
        }
    }

    fn update(&mut self) {}

    fn post_process(
        &mut self,
        frame: &mut RawFrame,
        index: FrameIndex,
        total_or_current: u64,
    ) -> PostProcess {
        let f = self.crossfade_frames;
        if !self.has_background || f == 0 {
            return PostProcess::Keep;
        }
        let i = index.0;
        if i < f {
            if let Some(slot) = self.captured.get_mut(i as usize) {
                *slot = Some(frame.clone());
            }
            return PostProcess::Drop;
        }

        let total = self.total.unwrap_or(total_or_current);
        let fade_start = total.saturating_sub(f);
        if i < fade_start || i >= total {
            return PostProcess::Keep;
        }
        let k = (i - fade_start) as usize;
        let Some(head) = self.captured.get(k).and_then(Option::as_ref) else {
            if !self.warned_gap {
                tracing::warn!(
                    head_frame = k,
                    "loopfade never saw this head frame; its tail frame is not blended"
                );
                self.warned_gap = true;
            }
            return PostProcess::Keep;
        };
        let alpha = (k + 1) as f32 / f as f32;
        for (dst, &src) in frame.data_mut().iter_mut().zip(head.data()) {
            let cur = f32::from(*dst) / 255.0;
            let begin = f32::from(src) / 255.0;
            *dst = unit_to_u8(cur * (1.0 - alpha) + begin * alpha);
        }
        PostProcess::Keep
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/loopfade.rs"]
mod tests;
