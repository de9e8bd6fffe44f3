//! Effect capability: the [`Effect`] trait, typed parameters, and the name -> factory registry.
//!
//! An effect is one stage of the pipeline. It owns its simulation state, draws onto frames in
//! place, and advances one tick per produced frame.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::foundation::core::{FrameIndex, RawFrame};
use crate::foundation::error::{EffectgenError, EffectgenResult};

pub mod loopfade;
pub mod mist;
pub mod starfield;

/// Whether a frame continues downstream after [`Effect::post_process`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostProcess {
    /// Forward the frame.
    Keep,
    /// Discard the frame. Effect time still advances.
    Drop,
}

/// Value type of an [`EffectOption`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    /// Whole number.
    Int,
    /// Floating point number.
    Float,
    /// `true`/`false`.
    Boolean,
    /// Free text or a fixed set of words.
    String,
}

/// Machine-readable description of one effect parameter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EffectOption {
    /// Parameter key as used in `params` and `--param EFFECT.KEY=VALUE`.
    pub name: &'static str,
    /// Value type.
    pub kind: OptionKind,
    /// Inclusive numeric range, when the parameter has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
    /// One-line help text.
    pub description: &'static str,
    /// Default, rendered as text.
    pub default: &'static str,
}

impl EffectOption {
    pub(crate) const fn float(
        name: &'static str,
        low: f64,
        high: f64,
        default: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: OptionKind::Float,
            range: Some((low, high)),
            description,
            default,
        }
    }

    pub(crate) const fn int(
        name: &'static str,
        low: f64,
        high: f64,
        default: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: OptionKind::Int,
            range: Some((low, high)),
            description,
            default,
        }
    }

    pub(crate) const fn string(
        name: &'static str,
        default: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: OptionKind::String,
            range: None,
            description,
            default,
        }
    }
}

/// One procedural effect stage.
///
/// Call order for a run: `configure`, then `set_total_frames`/`set_global_warmup_seconds` (bounded
/// runs only), then `initialize`, then `update` once per warmup frame, then per frame
/// `render_frame`, `post_process`, `update`. `update` runs even when the frame is dropped.
pub trait Effect: Send {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// One-line human description.
    fn description(&self) -> &'static str;

    /// Parameters accepted by [`Effect::configure`].
    fn options(&self) -> Vec<EffectOption> {
        Vec::new()
    }

    /// Apply user parameters. Keys have already been checked against [`Effect::options`].
    fn configure(&mut self, params: &EffectParams) -> EffectgenResult<()> {
        let _ = params;
        Ok(())
    }

    /// Prepare for frames of `width`x`height` at `fps`.
    fn initialize(&mut self, width: u32, height: u32, fps: u32) -> EffectgenResult<()>;

    /// Draw onto `frame`. `fade` scales the effect's own contribution.
    fn render_frame(&mut self, frame: &mut RawFrame, has_background: bool, fade: f32);

    /// Advance simulation time by one frame.
    fn update(&mut self);

    /// Inspect or rewrite a rendered frame knowing its position in the run.
    ///
    /// `total_or_current` is the planned frame count, or `index + 1` while it is unknown.
    fn post_process(
        &mut self,
        frame: &mut RawFrame,
        index: FrameIndex,
        total_or_current: u64,
    ) -> PostProcess {
        let _ = (frame, index, total_or_current);
        PostProcess::Keep
    }

    /// Planned output length, only called when it is known.
    fn set_total_frames(&mut self, total: u64) {
        let _ = total;
    }

    /// Warmup length in seconds, only called when the output length is known.
    fn set_global_warmup_seconds(&mut self, seconds: f64) {
        let _ = seconds;
    }
}

/// User parameters for one effect, keyed by option name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectParams {
    values: BTreeMap<String, JsonValue>,
}

impl EffectParams {
    /// Empty parameter set (all defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing map.
    pub fn from_map(values: BTreeMap<String, JsonValue>) -> Self {
        Self { values }
    }

    /// Set `key`, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Keys present.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    /// Number parameter. Numeric strings (as produced by `--param`) are accepted.
    pub fn f64_or(&self, key: &str, default: f64) -> EffectgenResult<f64> {
        let Some(v) = self.values.get(key) else {
            return Ok(default);
        };
        number_of(v).ok_or_else(|| {
            EffectgenError::config(format!("parameter '{key}' must be a number, got {v}"))
        })
    }

    /// `f32` convenience over [`EffectParams::f64_or`].
    pub fn f32_or(&self, key: &str, default: f32) -> EffectgenResult<f32> {
        Ok(self.f64_or(key, f64::from(default))? as f32)
    }

    /// Non-negative integer parameter.
    pub fn u32_or(&self, key: &str, default: u32) -> EffectgenResult<u32> {
        let Some(v) = self.values.get(key) else {
            return Ok(default);
        };
        number_of(v)
            .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX))
            .map(|n| n as u32)
            .ok_or_else(|| {
                EffectgenError::config(format!(
                    "parameter '{key}' must be a non-negative integer, got {v}"
                ))
            })
    }

    /// Text parameter; numbers and booleans are rendered as text.
    pub fn string_or(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => default.to_owned(),
        }
    }
}

fn number_of(v: &JsonValue) -> Option<f64> {
    match v {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Name, description, and options of a registered effect.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EffectInfo {
    /// Registry name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Accepted parameters.
    pub options: Vec<EffectOption>,
}

/// Constructor stored in the registry.
pub type EffectFactory = fn() -> Box<dyn Effect>;

/// Explicit table of available effects.
#[derive(Clone, Default)]
pub struct EffectRegistry {
    factories: BTreeMap<&'static str, EffectFactory>,
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl EffectRegistry {
    /// Registry with no effects.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in effect.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        reg.register(|| Box::new(loopfade::LoopFade::default()));
        reg.register(|| Box::new(mist::Mist::default()));
        reg.register(|| Box::new(starfield::Starfield::default()));
        reg
    }

    /// Add an effect under the name it reports. A later registration with the same name wins.
    pub fn register(&mut self, factory: EffectFactory) {
        let name = factory().name();
        self.factories.insert(name, factory);
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Metadata for `name`.
    pub fn describe(&self, name: &str) -> Option<EffectInfo> {
        let effect = (self.factories.get(name)?)();
        Some(EffectInfo {
            name: effect.name(),
            description: effect.description(),
            options: effect.options(),
        })
    }

    /// Instantiate `name` and apply `params`.
    ///
    /// Unknown effects, unknown keys, and numbers outside an option's range are config errors.
    pub fn create(&self, name: &str, params: &EffectParams) -> EffectgenResult<Box<dyn Effect>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            EffectgenError::config(format!(
                "unknown effect '{name}' (available: {})",
                self.names().join(", ")
            ))
        })?;
        let mut effect = factory();
        let options = effect.options();
        for key in params.keys() {
            let Some(opt) = options.iter().find(|o| o.name == key) else {
                return Err(EffectgenError::config(format!(
                    "effect '{name}' has no parameter '{key}'"
                )));
            };
            if let Some((low, high)) = opt.range {
                let v = params.f64_or(key, low)?;
                if v < low || v > high {
                    return Err(EffectgenError::config(format!(
                        "parameter '{name}.{key}' = {v} is outside [{low}, {high}]"
                    )));
                }
            }
        }
        effect.configure(params)?;
        Ok(effect)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/registry.rs"]
mod tests;
