use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use crate::effects::{Effect, EffectOption, EffectParams};
use crate::foundation::core::RawFrame;
use crate::foundation::error::{EffectgenError, EffectgenResult};
use crate::foundation::math::{SplitMix64, unit_to_u8};

const DEFAULT_SEED: u64 = 0x5EED_57A2;

/// How each star is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StarShape {
    /// Soft disc.
    Round,
    /// Disc plus a horizontal and a vertical spike.
    Cross4,
    /// Disc plus three spikes (six rays).
    Rays6,
}

impl StarShape {
    fn parse(raw: &str) -> EffectgenResult<Self> {
        match raw.trim() {
            "round" | "circle" => Ok(Self::Round),
            "4" => Ok(Self::Cross4),
            "6" => Ok(Self::Rays6),
            other => Err(EffectgenError::config(format!(
                "starfield shape must be round, 4 or 6, got '{other}'"
            ))),
        }
    }

    fn spike_angles(self) -> &'static [f32] {
        match self {
            Self::Round => &[],
            Self::Cross4 => &[0.0, FRAC_PI_2],
            Self::Rays6 => &[0.0, FRAC_PI_4, -FRAC_PI_4],
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Star {
    x: f32,
    y: f32,
    base_size: f32,
    brightness: f32,
    color: f32,
}

/// Stars streaming outward from a center point, accelerating toward the edges.
#[derive(Clone, Debug)]
pub struct Starfield {
    count: u32,
    speed: f32,
    speed_jitter: f32,
    base_size: f32,
    max_size: f32,
    center: (Option<f32>, Option<f32>),
    shape: StarShape,
    seed: u64,

    width: f32,
    height: f32,
    origin: (f32, f32),
    stars: Vec<Star>,
    rng: SplitMix64,
}

impl Default for Starfield {
    fn default() -> Self {
        Self {
            count: 200,
            speed: 8.0,
            speed_jitter: 0.35,
            base_size: 1.0,
            max_size: 8.0,
            center: (None, None),
            shape: StarShape::Round,
            seed: DEFAULT_SEED,
            width: 0.0,
            height: 0.0,
            origin: (0.0, 0.0),
            stars: Vec::new(),
            rng: SplitMix64::new(DEFAULT_SEED),
        }
    }
}

impl Starfield {
    fn diagonal(&self) -> f32 {
        self.width.hypot(self.height).max(1.0)
    }

    fn spawn_star(&mut self) -> Star {
        let x = self.rng.range_f32(0.0, self.width);
        let y = self.rng.range_f32(0.0, self.height);
        let base_size = self
            .rng
            .range_f32(self.base_size * 0.4, self.base_size * 0.9);
        let brightness = self.rng.range_f32(0.08, 0.35);
        let color = (0.9 + self.rng.range_f32(-0.08, 0.08)).clamp(0.6, 1.0);
        Star {
            x,
            y,
            base_size,
            brightness,
            color,
        }
    }

    fn direction_from_origin(&mut self, x: f32, y: f32) -> (f32, f32, f32) {
        let (dx, dy) = (x - self.origin.0, y - self.origin.1);
        let dist = dx.hypot(dy);
        if dist < 1e-3 {
            let a = self.rng.range_f32(0.0, TAU);
            (a.cos(), a.sin(), dist)
        } else {
            (dx / dist, dy / dist, dist)
        }
    }

    /// Visual size and brightness of a star at its current position.
    fn appearance(&self, star: &Star) -> (f32, f32) {
        let dist = (star.x - self.origin.0).hypot(star.y - self.origin.1);
        let t = dist / self.diagonal();
        let size = (star.base_size + t * (self.max_size - star.base_size) * 1.6).min(self.max_size);
        let brightness = (star.brightness + t * 0.9).clamp(0.0, 1.0);
        (size, brightness)
    }
}

impl Effect for Starfield {
    fn name(&self) -> &'static str {
        "starfield"
    }

    fn description(&self) -> &'static str {
        "Starfield: simulate flying through space from a center point"
    }

    fn options(&self) -> Vec<EffectOption> {
        vec![
            EffectOption::int("stars", 1.0, 20_000.0, "200", "Number of stars"),
            EffectOption::float("speed", 0.0, 200.0, "8.0", "Base speed in pixels/frame"),
            EffectOption::float("speed-jitter", 0.0, 1.0, "0.35", "Fractional jitter on speed"),
            EffectOption::float("size", 0.1, 64.0, "1.0", "Base star size in pixels"),
            EffectOption::float(
                "max-size",
                0.1,
                128.0,
                "8.0",
                "Max visual size as a star moves outward",
            ),
            EffectOption::float("center-x", 0.0, 100_000.0, "", "Center X in pixels (default: middle)"),
            EffectOption::float("center-y", 0.0, 100_000.0, "", "Center Y in pixels (default: middle)"),
            EffectOption::string("shape", "round", "Star shape: round, 4 (cross) or 6 (three lines)"),
            EffectOption::int("seed", 0.0, 4_294_967_295.0, "1592612770", "Random seed"),
        ]
    }

    fn configure(&mut self, params: &EffectParams) -> EffectgenResult<()> {
        let d = Self::default();
        self.count = params.u32_or("stars", d.count)?;
        self.speed = params.f32_or("speed", d.speed)?;
        self.speed_jitter = params.f32_or("speed-jitter", d.speed_jitter)?;
        self.base_size = params.f32_or("size", d.base_size)?;
        self.max_size = params.f32_or("max-size", d.max_size)?;
        self.center = (
            params
                .get("center-x")
                .map(|_| params.f32_or("center-x", 0.0))
                .transpose()?,
            params
                .get("center-y")
                .map(|_| params.f32_or("center-y", 0.0))
                .transpose()?,
        );
        self.shape = StarShape::parse(&params.string_or("shape", "round"))?;
        self.seed = u64::from(params.u32_or("seed", DEFAULT_SEED as u32)?);
        Ok(())
    }

    fn initialize(&mut self, width: u32, height: u32, _fps: u32) -> EffectgenResult<()> {
        if self.max_size < self.base_size {
            return Err(EffectgenError::effect_init(
                "starfield max-size must be at least size",
            ));
        }
        self.width = width as f32;
        self.height = height as f32;
        self.origin = (
            self.center.0.unwrap_or(self.width * 0.5),
            self.center.1.unwrap_or(self.height * 0.5),
        );
        self.rng = SplitMix64::new(self.seed);
        self.stars.clear();
        self.stars.reserve(self.count as usize);
        for _ in 0..self.count {
            let mut star = self.spawn_star();
            star.x += self.rng.range_f32(-2.0, 2.0);
            star.y += self.rng.range_f32(-2.0, 2.0);
            self.stars.push(star);
        }
        Ok(())
    }

    fn render_frame(&mut self, frame: &mut RawFrame, _has_background: bool, fade: f32) {
        if fade <= 0.0 {
            return;
        }
        let diagonal = self.diagonal();
        for star in &self.stars {
            let (size, brightness) = self.appearance(star);
            let brightness = brightness * fade;
            let (cx, cy) = (star.x.round(), star.y.round());
            if self.shape == StarShape::Round {
                draw_disc(frame, cx, cy, size, brightness, star.color);
            } else {
                draw_disc(frame, cx, cy, size * 0.6, brightness * 1.1, star.color);
                let dist = (star.x - self.origin.0).hypot(star.y - self.origin.1);
                let spike = Spike {
                    width: (size * 0.35).max(0.5),
                    length: (120.0 + dist * 0.8).min(diagonal),
                    angles: self.shape.spike_angles(),
                };
                draw_spikes(frame, cx, cy, &spike, brightness * 0.9, star.color);
            }
        }
    }

    fn update(&mut self) {
        let diagonal = self.diagonal();
        let margin = 16.0 + self.max_size * 2.0;
        for i in 0..self.stars.len() {
            let star = self.stars[i];
            let (dir_x, dir_y, dist) = self.direction_from_origin(star.x, star.y);
            let norm = (dist / diagonal).clamp(0.0, 1.0);
            let target = self.speed * (1.0 + 6.0 * norm * norm);
            let jitter = self
                .rng
                .range_f32(1.0 - self.speed_jitter, 1.0 + self.speed_jitter);
            let speed = target * jitter;

            let mut next = star;
            next.x += dir_x * speed;
            next.y += dir_y * speed;
            next.brightness = (next.brightness + norm * 0.9).min(1.0);

            let outside = next.x < -margin
                || next.x > self.width + margin
                || next.y < -margin
                || next.y > self.height + margin;
            self.stars[i] = if outside { self.spawn_star() } else { next };
        }
    }
}

/// Additive blend of `color * alpha` into the pixel at `(x, y)`.
fn add_pixel(frame: &mut RawFrame, x: u32, y: u32, alpha: f32, color: f32) {
    let i = frame.offset(x, y);
    for sample in &mut frame.data_mut()[i..i + 3] {
        let cur = f32::from(*sample) / 255.0;
        *sample = unit_to_u8(cur + alpha * color);
    }
}

/// Pixel bounds `[min, max]` of a square of half-size `reach` around `(cx, cy)`, clipped.
fn clip_box(frame: &RawFrame, cx: f32, cy: f32, reach: f32) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (frame.width() as f32, frame.height() as f32);
    let min_x = (cx - reach).floor().max(0.0);
    let max_x = (cx + reach).ceil().min(w - 1.0);
    let min_y = (cy - reach).floor().max(0.0);
    let max_y = (cy + reach).ceil().min(h - 1.0);
    if min_x > max_x || min_y > max_y {
        return None;
    }
    Some((min_x as u32, max_x as u32, min_y as u32, max_y as u32))
}

fn draw_disc(frame: &mut RawFrame, cx: f32, cy: f32, radius: f32, opacity: f32, color: f32) {
    let Some((x0, x1, y0, y1)) = clip_box(frame, cx, cy, radius + 2.0) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let d = (x as f32 + 0.5 - cx).hypot(y as f32 + 0.5 - cy);
            let alpha = if d <= radius {
                1.0 - (d / radius.max(1e-4)) * 0.15
            } else {
                (0.9 * (1.0 - (d - radius) / 2.0)).max(0.0)
            };
            let alpha = (alpha * opacity).clamp(0.0, 1.0);
            if alpha > 0.003 {
                add_pixel(frame, x, y, alpha, color);
            }
        }
    }
}

struct Spike {
    width: f32,
    length: f32,
    angles: &'static [f32],
}

fn draw_spikes(frame: &mut RawFrame, cx: f32, cy: f32, spike: &Spike, opacity: f32, color: f32) {
    let len = spike.length.min(220.0 + spike.width * 10.0).max(1.0);
    let Some((x0, x1, y0, y1)) = clip_box(frame, cx, cy, len + 3.0 + spike.width) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
            let mut sum = 0.0;
            for &a in spike.angles {
                let (sa, ca) = a.sin_cos();
                let along = (dx * ca + dy * sa).abs();
                if along > len {
                    continue;
                }
                let taper = 1.0 - along / len;
                let w = spike.width * taper;
                if w <= 0.01 {
                    continue;
                }
                let perp = -dx * sa + dy * ca;
                sum += (-(perp * perp) / (2.0 * w * w)).exp() * taper;
            }
            if sum > 1e-5 {
                add_pixel(frame, x, y, (sum * opacity).clamp(0.0, 1.0), color);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/starfield.rs"]
mod tests;
