//! effectgen synthesizes video by running procedural effects over raw RGB frames.
//!
//! A run is a chain of effect stages, one thread each, connected by bounded queues:
//!
//! - Describe the run with a [`GeneratorConfig`] (or build a [`Pipeline`] directly)
//! - Pick effects from an [`EffectRegistry`]
//! - Stream frames into a [`FrameSink`]: `ffmpeg`, raw stdout, or memory
//!
//! Backgrounds are decoded, and output encoded, by external `ffmpeg`/`ffprobe` processes.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

pub mod config;
pub mod effects;
pub mod encode;
pub mod media;
pub mod pipeline;
pub mod process;

pub use crate::foundation::core::{FrameIndex, RGB_CHANNELS, RawFrame, Resolution};
pub use crate::foundation::error::{EffectgenError, EffectgenResult};

pub use crate::config::{EffectSpec, GeneratorConfig};
pub use crate::effects::{Effect, EffectParams, EffectRegistry, PostProcess};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{FrameSink, InMemorySink, OutputTarget, RawStdoutSink, SinkConfig};
pub use crate::media::background::{BackgroundKind, BackgroundSource};
pub use crate::media::tools::ToolPaths;
pub use crate::pipeline::generator::{generate, generate_into};
pub use crate::pipeline::plan::{PlanSettings, RunPlan, TotalFrames, resolve_run_plan};
pub use crate::pipeline::stages::{Pipeline, PipelineSettings, RunReport};
