use rayon::prelude::*;

use crate::effects::{Effect, EffectOption, EffectParams};
use crate::foundation::core::{RGB_CHANNELS, RawFrame};
use crate::foundation::error::{EffectgenError, EffectgenResult};
use crate::foundation::math::{hash2, lerp, smoothstep, unit_to_u8};

const BASE_COLOR: [f32; 3] = [0.92, 0.94, 0.96];

/// Drifting mist built from domain-warped value noise, screened over the frame.
#[derive(Clone, Debug)]
pub struct Mist {
    opacity: f32,
    scale: f32,
    speed: (f32, f32),
    threshold: f32,
    warp_scale: f32,
    warp_strength: f32,
    warp_speed: f32,
    height_bias: f32,
    tint: f32,

    color: [f32; 3],
    fps: u32,
    frame_count: u64,
}

impl Default for Mist {
    fn default() -> Self {
        Self {
            opacity: 0.7,
            scale: 0.002,
            speed: (0.15, 0.08),
            threshold: 0.55,
            warp_scale: 0.0015,
            warp_strength: 0.35,
            warp_speed: 0.005,
            height_bias: 0.25,
            tint: 0.0,
            color: BASE_COLOR,
            fps: 30,
            frame_count: 0,
        }
    }
}

impl Mist {
    fn time(&self) -> f32 {
        if self.fps == 0 {
            0.0
        } else {
            self.frame_count as f32 / self.fps as f32
        }
    }

    /// Mist coverage in `[0, 1]` at pixel `(x, y)` and time `t`, before opacity and fade.
    fn coverage(&self, x: f32, y: f32, t: f32) -> f32 {
        let (wx, wy) = (x * self.warp_scale, y * self.warp_scale);
        let drift = t * self.warp_speed;
        let warp_x = (value_noise(wx + drift, wy + drift) - 0.5) * self.warp_strength;
        let warp_y =
            (value_noise(wx + 17.1 + drift, wy + 43.2 + drift) - 0.5) * self.warp_strength;

        let n = fbm(
            x * self.scale + warp_x + t * self.speed.0,
            y * self.scale + warp_y + t * self.speed.1,
        );
        smoothstep((n - self.threshold) / (1.0 - self.threshold).max(1e-4))
    }
}

impl Effect for Mist {
    fn name(&self) -> &'static str {
        "mist"
    }

    fn description(&self) -> &'static str {
        "Soft mist/smoke drift using layered noise"
    }

    fn options(&self) -> Vec<EffectOption> {
        vec![
            EffectOption::float("opacity", 0.0, 2.0, "0.7", "Mist opacity multiplier"),
            EffectOption::float(
                "scale",
                0.0001,
                0.05,
                "0.002",
                "Noise scale (lower is larger features)",
            ),
            EffectOption::float("speed-x", -1.0, 1.0, "0.15", "Horizontal drift in noise units/sec"),
            EffectOption::float("speed-y", -1.0, 1.0, "0.08", "Vertical drift in noise units/sec"),
            EffectOption::float("threshold", 0.0, 0.99, "0.55", "Threshold for mist coverage"),
            EffectOption::float("warp-scale", 0.0001, 0.05, "0.0015", "Scale of the warp field"),
            EffectOption::float("warp-strength", 0.0, 2.0, "0.35", "Warp strength in noise units"),
            EffectOption::float("warp-speed", -1.0, 1.0, "0.005", "Warp drift in noise units/sec"),
            EffectOption::float("height-bias", 0.0, 1.0, "0.25", "Bias density toward the bottom"),
            EffectOption::float("tint", -1.0, 1.0, "0.0", "Tint (-1 cool, 0 neutral, 1 warm)"),
        ]
    }

    fn configure(&mut self, params: &EffectParams) -> EffectgenResult<()> {
        let d = Self::default();
        self.opacity = params.f32_or("opacity", d.opacity)?;
        self.scale = params.f32_or("scale", d.scale)?;
        self.speed = (
            params.f32_or("speed-x", d.speed.0)?,
            params.f32_or("speed-y", d.speed.1)?,
        );
        self.threshold = params.f32_or("threshold", d.threshold)?;
        self.warp_scale = params.f32_or("warp-scale", d.warp_scale)?;
        self.warp_strength = params.f32_or("warp-strength", d.warp_strength)?;
        self.warp_speed = params.f32_or("warp-speed", d.warp_speed)?;
        self.height_bias = params.f32_or("height-bias", d.height_bias)?;
        self.tint = params.f32_or("tint", d.tint)?;
        Ok(())
    }

    fn initialize(&mut self, _width: u32, _height: u32, fps: u32) -> EffectgenResult<()> {
        if fps == 0 {
            return Err(EffectgenError::effect_init("mist needs a non-zero frame rate"));
        }
        self.fps = fps;
        self.frame_count = 0;
        let tint = self.tint.clamp(-1.0, 1.0);
        self.color = [
            (BASE_COLOR[0] + tint * 0.06).clamp(0.0, 1.0),
            (BASE_COLOR[1] + tint * 0.02).clamp(0.0, 1.0),
            (BASE_COLOR[2] - tint * 0.06).clamp(0.0, 1.0),
        ];
        Ok(())
    }

    fn render_frame(&mut self, frame: &mut RawFrame, _has_background: bool, fade: f32) {
        let width = frame.width() as usize;
        let height = frame.height();
        if width == 0 {
            return;
        }
        let t = self.time();
        let inv_height = if height > 1 {
            1.0 / (height - 1) as f32
        } else {
            0.0
        };
        let this = &*self;

        frame
            .data_mut()
            .par_chunks_mut(width * RGB_CHANNELS)
            .enumerate()
            .for_each(|(y, row)| {
                let yf = y as f32;
                let height_factor =
                    (1.0 - this.height_bias) + this.height_bias * (yf * inv_height);
                let row_gain = this.opacity * height_factor * fade;
                if row_gain <= 0.0 {
                    return;
                }
                for (x, px) in row.chunks_exact_mut(RGB_CHANNELS).enumerate() {
                    let a = this.coverage(x as f32, yf, t) * row_gain;
                    if a <= 0.0005 {
                        continue;
                    }
                    for (c, sample) in px.iter_mut().enumerate() {
                        let dst = f32::from(*sample) / 255.0;
                        *sample = unit_to_u8(1.0 - (1.0 - dst) * (1.0 - this.color[c] * a));
                    }
                }
            });
    }

    fn update(&mut self) {
        self.frame_count += 1;
    }
}

fn value_noise(x: f32, y: f32) -> f32 {
    let (xf, yf) = (x.floor(), y.floor());
    let (xi, yi) = (xf as i32, yf as i32);
    let u = smoothstep(x - xf);
    let v = smoothstep(y - yf);

    let top = lerp(hash2(xi, yi), hash2(xi.wrapping_add(1), yi), u);
    let bottom = lerp(
        hash2(xi, yi.wrapping_add(1)),
        hash2(xi.wrapping_add(1), yi.wrapping_add(1)),
        u,
    );
    lerp(top, bottom, v)
}

// Three octaves, normalized back to [0, 1].
fn fbm(x: f32, y: f32) -> f32 {
    let mut sum = 0.0;
    let mut amp = 0.5;
    let mut freq = 1.0;
    let mut norm = 0.0;
    for _ in 0..3 {
        sum += value_noise(x * freq, y * freq) * amp;
        norm += amp;
        amp *= 0.5;
        freq *= 2.0;
    }
    sum / norm
}

#[cfg(test)]
#[path = "../../tests/unit/effects/mist.rs"]
mod tests;
