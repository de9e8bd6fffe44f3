//! Run configuration, loadable from JSON and overridable from the command line.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::effects::EffectParams;
use crate::encode::ffmpeg::DEFAULT_CRF;
use crate::encode::sink::OutputTarget;
use crate::foundation::core::Resolution;
use crate::foundation::error::{EffectgenError, EffectgenResult};
use crate::media::background::BackgroundKind;
use crate::pipeline::plan::PlanSettings;
use crate::pipeline::queue::DEFAULT_QUEUE_CAPACITY;
use crate::pipeline::stages::PipelineSettings;

/// Highest CRF any built-in profile accepts (VP9's scale).
pub const MAX_CRF: u8 = 63;

/// One entry of the effect chain.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectSpec {
    /// Registry name.
    pub name: String,
    /// Effect parameters by option name.
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl EffectSpec {
    /// A chain entry with default parameters.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Parameters in the form effects consume.
    pub fn effect_params(&self) -> EffectParams {
        EffectParams::from_map(self.params.clone())
    }
}

/// Everything needed for one generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: u32,
    /// Output length in seconds; taken from the background video when absent.
    pub duration: Option<f64>,
    /// Fade-in/fade-out length in seconds.
    pub fade: f64,
    /// Upper bound of the fade multiplier (0..=1).
    pub max_fade: f64,
    /// Seconds of effect simulation before the first frame.
    pub warmup: f64,
    /// Still image drawn under every frame.
    pub background_image: Option<PathBuf>,
    /// Video drawn under the frames, one decoded frame per output frame.
    pub background_video: Option<PathBuf>,
    /// Constant rate factor for the built-in codec profiles.
    pub crf: u8,
    /// Copy the background video's audio using this codec.
    pub audio_codec: Option<String>,
    /// Audio bitrate in kbit/s.
    pub audio_bitrate: Option<u32>,
    /// Packets buffered between stages.
    pub queue_capacity: usize,
    /// Output file, or `-` for raw frames on stdout.
    pub output: Option<String>,
    /// Replace an existing output file.
    pub overwrite: bool,
    /// Effect chain, applied in order.
    pub effects: Vec<EffectSpec>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            duration: None,
            fade: 0.0,
            max_fade: 1.0,
            warmup: 0.0,
            background_image: None,
            background_video: None,
            crf: DEFAULT_CRF,
            audio_codec: None,
            audio_bitrate: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            output: None,
            overwrite: false,
            effects: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> EffectgenResult<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open config JSON '{}'", path.display()))?;
        let cfg = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            EffectgenError::config(format!("parse config JSON '{}': {e}", path.display()))
        })?;
        Ok(cfg)
    }

    /// Parse a JSON config from a string.
    pub fn from_json_str(s: &str) -> EffectgenResult<Self> {
        serde_json::from_str(s).map_err(|e| EffectgenError::config(format!("parse config JSON: {e}")))
    }

    /// Check ranges and combinations that the types alone do not rule out.
    pub fn validate(&self) -> EffectgenResult<()> {
        let bad = |msg: String| Err(EffectgenError::config(msg));
        if self.width == 0 || self.height == 0 {
            return bad(format!("invalid resolution {}x{}", self.width, self.height));
        }
        if self.fps == 0 {
            return bad("fps must be non-zero".to_owned());
        }
        if let Some(d) = self.duration
            && !(d.is_finite() && d > 0.0)
        {
            return bad(format!("duration must be positive, got {d}"));
        }
        if !(self.fade.is_finite() && self.fade >= 0.0) {
            return bad(format!("fade must be non-negative, got {}", self.fade));
        }
        if !(0.0..=1.0).contains(&self.max_fade) {
            return bad(format!("max_fade must be within 0..=1, got {}", self.max_fade));
        }
        if !(self.warmup.is_finite() && self.warmup >= 0.0) {
            return bad(format!("warmup must be non-negative, got {}", self.warmup));
        }
        if self.crf > MAX_CRF {
            return bad(format!("crf must be at most {MAX_CRF}, got {}", self.crf));
        }
        if self.queue_capacity == 0 {
            return bad("queue_capacity must be at least 1".to_owned());
        }
        if self.background_image.is_some() && self.background_video.is_some() {
            return bad("use either a background image or a background video, not both".to_owned());
        }
        if self.effects.is_empty() {
            return bad("no effects configured".to_owned());
        }
        if self.output.as_deref().is_none_or(|o| o.trim().is_empty()) {
            return bad("no output given".to_owned());
        }
        Ok(())
    }

    /// Output resolution.
    pub fn resolution(&self) -> EffectgenResult<Resolution> {
        Resolution::new(self.width, self.height)
    }

    /// Parsed output target.
    pub fn output_target(&self) -> Option<OutputTarget> {
        self.output.as_deref().map(OutputTarget::parse)
    }

    /// Configured background and its kind.
    pub fn background(&self) -> Option<(BackgroundKind, &Path)> {
        match (&self.background_image, &self.background_video) {
            (Some(p), _) => Some((BackgroundKind::Image, p.as_path())),
            (None, Some(p)) => Some((BackgroundKind::Video, p.as_path())),
            (None, None) => None,
        }
    }

    /// Timing inputs for run planning.
    pub fn plan_settings(&self) -> PlanSettings {
        PlanSettings {
            fps: self.fps,
            duration: self.duration,
            fade: self.fade,
            warmup: self.warmup,
        }
    }

    /// Stage settings for the pipeline.
    pub fn pipeline_settings(&self) -> EffectgenResult<PipelineSettings> {
        Ok(PipelineSettings {
            resolution: self.resolution()?,
            fps: self.fps,
            max_fade: self.max_fade as f32,
            warmup_secs: self.warmup,
            queue_capacity: self.queue_capacity,
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
