use crate::config::GeneratorConfig;
use crate::effects::{Effect, EffectRegistry};
use crate::encode::ffmpeg::{AudioPassthrough, FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{FrameSink, OutputTarget, RawStdoutSink};
use crate::foundation::error::{EffectgenError, EffectgenResult};
use crate::media::background::{BackgroundKind, BackgroundSource};
use crate::media::probe::probe_duration;
use crate::media::tools::ToolPaths;
use crate::pipeline::plan::resolve_run_plan;
use crate::pipeline::stages::{Pipeline, RunReport};

/// Run `config` end to end, writing to the configured output.
#[tracing::instrument(skip_all, fields(output = config.output.as_deref().unwrap_or("")))]
pub fn generate(
    config: &GeneratorConfig,
    registry: &EffectRegistry,
    tools: &ToolPaths,
) -> EffectgenResult<RunReport> {
    config.validate()?;
    let mut sink = open_sink(config, tools)?;
    generate_into(config, registry, tools, sink.as_mut())
}

/// Run `config` into a caller-supplied sink; `config.output` is only checked for presence.
///
/// Order: plan the run, build and initialize every effect, open the background, then stream.
/// Nothing is written to `sink` if planning or effect setup fails.
pub fn generate_into(
    config: &GeneratorConfig,
    registry: &EffectRegistry,
    tools: &ToolPaths,
    sink: &mut dyn FrameSink,
) -> EffectgenResult<RunReport> {
    config.validate()?;
    let resolution = config.resolution()?;
    let background = config.background();

    let plan = resolve_run_plan(&config.plan_settings(), background.map(|(k, _)| k), || {
        background.and_then(|(_, path)| probe_duration(tools, path))
    })?;

    let effects = config
        .effects
        .iter()
        .map(|spec| registry.create(&spec.name, &spec.effect_params()))
        .collect::<EffectgenResult<Vec<Box<dyn Effect>>>>()?;
    tracing::info!(
        effects = ?config.effects.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        "effect chain"
    );

    let mut pipeline = Pipeline::new(effects, plan, config.pipeline_settings()?)?;
    pipeline.prepare()?;

    let source = match background {
        None => None,
        Some((BackgroundKind::Image, path)) => {
            Some(BackgroundSource::open_image(tools, path, resolution)?)
        }
        Some((BackgroundKind::Video, path)) => Some(BackgroundSource::open_video(
            tools, path, resolution, config.fps,
        )?),
    };

    pipeline.run(source, sink)
}

/// Build the sink for the configured output target.
pub fn open_sink(
    config: &GeneratorConfig,
    tools: &ToolPaths,
) -> EffectgenResult<Box<dyn FrameSink>> {
    let target = config
        .output_target()
        .ok_or_else(|| EffectgenError::config("no output given"))?;
    match target {
        OutputTarget::Stdout => {
            if config.audio_codec.is_some() {
                tracing::warn!("audio passthrough is ignored for raw stdout output");
            }
            Ok(Box::new(RawStdoutSink::new()))
        }
        OutputTarget::File(out_path) => {
            let audio = match (&config.audio_codec, &config.background_video) {
                (Some(codec), Some(video)) => Some(AudioPassthrough {
                    source: video.clone(),
                    codec: codec.clone(),
                    bitrate_kbps: config.audio_bitrate,
                }),
                (Some(_), None) => {
                    tracing::warn!("audio passthrough needs a background video; ignoring");
                    None
                }
                (None, _) => None,
            };
            Ok(Box::new(FfmpegSink::new(FfmpegSinkOpts {
                ffmpeg: tools.ffmpeg.clone(),
                out_path,
                overwrite: config.overwrite,
                crf: config.crf,
                encoder_params: tools.encoder_params.clone(),
                audio,
            })))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/generator.rs"]
mod tests;
