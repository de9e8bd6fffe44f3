use crate::effects::{Effect, PostProcess};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{FrameIndex, RawFrame, Resolution};
use crate::foundation::error::{EffectgenError, EffectgenResult};
use crate::media::background::{BackgroundKind, BackgroundSource, SourceRead};
use crate::pipeline::plan::{RunPlan, TotalFrames};
use crate::pipeline::queue::{DEFAULT_QUEUE_CAPACITY, StageQueue};

/// Unit of transfer between stages.
#[derive(Debug)]
pub enum FramePacket {
    /// A frame and its output position.
    Frame {
        /// Assigned once by the first stage.
        index: FrameIndex,
        /// Pixel data, owned by whichever stage holds the packet.
        frame: RawFrame,
    },
    /// No more frames will follow.
    End,
}

/// Run-wide settings shared by every stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineSettings {
    /// Output resolution.
    pub resolution: Resolution,
    /// Output frame rate.
    pub fps: u32,
    /// Upper bound of the fade multiplier handed to effects.
    pub max_fade: f32,
    /// Warmup length in seconds, forwarded to effects on bounded runs.
    pub warmup_secs: f64,
    /// Packets buffered between two stages.
    pub queue_capacity: usize,
}

impl PipelineSettings {
    /// Settings with no warmup, full fade range and the default queue size.
    pub fn new(resolution: Resolution, fps: u32) -> Self {
        Self {
            resolution,
            fps,
            max_fade: 1.0,
            warmup_secs: 0.0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Per-stage counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Effect name.
    pub name: &'static str,
    /// Frames rendered (and updates performed).
    pub processed: u64,
    /// Frames this stage dropped in `post_process`.
    pub dropped: u64,
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Planned length.
    pub planned: TotalFrames,
    /// Frames delivered to the sink.
    pub frames_written: u64,
    /// Counters in stage order.
    pub stages: Vec<StageReport>,
    /// First frame index for which the background video had no fresh frame.
    pub exhausted_at: Option<FrameIndex>,
}

/// Ordered chain of effect stages between a background source and a sink.
pub struct Pipeline {
    effects: Vec<Box<dyn Effect>>,
    plan: RunPlan,
    settings: PipelineSettings,
    prepared: bool,
}

impl Pipeline {
    /// Chain `effects` in order. At least one effect is required.
    pub fn new(
        effects: Vec<Box<dyn Effect>>,
        plan: RunPlan,
        settings: PipelineSettings,
    ) -> EffectgenResult<Self> {
        if effects.is_empty() {
            return Err(EffectgenError::setup("at least one effect is required"));
        }
        if settings.fps == 0 {
            return Err(EffectgenError::setup("fps must be non-zero"));
        }
        Ok(Self {
            effects,
            plan,
            settings,
            prepared: false,
        })
    }

    /// The plan this pipeline runs.
    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Hand run facts to every effect, initialize them, then run the warmup ticks.
    ///
    /// Must succeed before any output is opened. Calling it again is a no-op.
    pub fn prepare(&mut self) -> EffectgenResult<()> {
        if self.prepared {
            return Ok(());
        }
        let Resolution { width, height } = self.settings.resolution;
        for (i, effect) in self.effects.iter_mut().enumerate() {
            if let TotalFrames::Bounded(total) = self.plan.total {
                effect.set_total_frames(total);
                effect.set_global_warmup_seconds(self.settings.warmup_secs);
            }
            effect
                .initialize(width, height, self.settings.fps)
                .map_err(|e| match e {
                    EffectgenError::EffectInit(_) => e,
                    other => EffectgenError::effect_init(format!(
                        "stage {i} ({}): {other}",
                        effect.name()
                    )),
                })?;
            tracing::debug!(stage = i, effect = effect.name(), "effect initialized");
        }

        if self.plan.warmup_frames > 0 {
            tracing::info!(frames = self.plan.warmup_frames, "warming up effects");
            for effect in &mut self.effects {
                for _ in 0..self.plan.warmup_frames {
                    effect.update();
                }
            }
        }
        self.prepared = true;
        Ok(())
    }

    /// Stream the run into `sink`.
    ///
    /// One thread per stage; the calling thread collects. The sink is always ended once begun,
    /// and the background is closed before returning. The first error wins.
    #[tracing::instrument(skip_all, fields(stages = self.effects.len()))]
    pub fn run(
        mut self,
        mut source: Option<BackgroundSource>,
        sink: &mut dyn FrameSink,
    ) -> EffectgenResult<RunReport> {
        if let Err(e) = self.prepare() {
            close_source(&mut source);
            return Err(e);
        }
        let background = source.as_ref().map(BackgroundSource::kind);
        if self.plan.total == TotalFrames::Unbounded && background != Some(BackgroundKind::Video) {
            close_source(&mut source);
            return Err(EffectgenError::setup(
                "an unbounded run needs a background video to end it",
            ));
        }
        if let Some(src) = source.as_ref()
            && src.current().resolution() != self.settings.resolution
        {
            close_source(&mut source);
            return Err(EffectgenError::setup(
                "background resolution does not match the output resolution",
            ));
        }

        let Resolution { width, height } = self.settings.resolution;
        if let Err(e) = sink.begin(SinkConfig {
            width,
            height,
            fps: self.settings.fps,
        }) {
            close_source(&mut source);
            return Err(e);
        }
        tracing::info!(
            width,
            height,
            fps = self.settings.fps,
            total = ?self.plan.total,
            ?background,
            "generating"
        );

        let stage_count = self.effects.len();
        let queues: Vec<StageQueue<FramePacket>> = (0..stage_count)
            .map(|_| StageQueue::new(self.settings.queue_capacity))
            .collect();
        let ctx = StageContext {
            plan: self.plan,
            settings: self.settings,
            has_background: source.is_some(),
        };

        let mut first_source = source.as_mut();
        let outcome = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(stage_count);
            for (k, effect) in self.effects.iter_mut().enumerate() {
                let output = &queues[k];
                let input = k.checked_sub(1).map(|j| &queues[j]);
                let ctx = &ctx;
                let src = if k == 0 { first_source.take() } else { None };
                let name = effect.name();
                let handle = std::thread::Builder::new()
                    .name(format!("stage-{k}-{name}"))
                    .spawn_scoped(scope, move || {
                        let _guard = CloseOnDrop { input, output };
                        let mut worker = StageWorker::new(&mut **effect, ctx);
                        match input {
                            None => worker.produce(src, output),
                            Some(input) => worker.relay(input, output),
                        }
                        worker.finish()
                    });
                match handle {
                    Ok(h) => handles.push((k, name, h)),
                    Err(e) => {
                        queues.iter().for_each(StageQueue::close);
                        for (_, _, started) in handles {
                            let _ = started.join();
                        }
                        return (
                            Err(EffectgenError::setup(format!(
                                "failed to start stage thread {k}: {e}"
                            ))),
                            Vec::new(),
                            None,
                        );
                    }
                }
            }

            let collected = collect(&ctx, &queues[stage_count - 1], &mut *sink);
            if collected.is_err() {
                queues.iter().for_each(StageQueue::close);
            }

            let mut reports = Vec::with_capacity(stage_count);
            let mut exhausted_at = None;
            let mut panicked = None;
            for (k, name, h) in handles {
                match h.join() {
                    Ok(done) => {
                        if k == 0 {
                            exhausted_at = done.exhausted_at;
                        }
                        reports.push(done.report);
                    }
                    Err(_) => {
                        if panicked.is_none() {
                            panicked = Some(EffectgenError::Other(anyhow::anyhow!(
                                "stage {k} ({name}) panicked"
                            )));
                        }
                        reports.push(StageReport {
                            name,
                            ..StageReport::default()
                        });
                    }
                }
            }
            let result = match (collected, panicked) {
                (Err(e), _) => Err(e),
                (Ok(_), Some(e)) => Err(e),
                (Ok(n), None) => Ok(n),
            };
            (result, reports, exhausted_at)
        });

        let (collected, stages, exhausted_at) = outcome;
        let ended = sink.end();
        close_source(&mut source);

        let frames_written = collected?;
        ended?;

        if let Some(at) = exhausted_at {
            let secs = at.0 as f64 / f64::from(self.settings.fps);
            match self.plan.total {
                TotalFrames::Bounded(total) => tracing::info!(
                    frames = at.0,
                    seconds = secs,
                    planned = total,
                    "background video ended early; held its last frame"
                ),
                TotalFrames::Unbounded => tracing::info!(
                    frames = at.0,
                    seconds = secs,
                    "background video ended"
                ),
            }
        }
        tracing::info!(frames = frames_written, "generation finished");

        Ok(RunReport {
            planned: self.plan.total,
            frames_written,
            stages,
            exhausted_at,
        })
    }
}

fn close_source(source: &mut Option<BackgroundSource>) {
    if let Some(src) = source.as_mut() {
        src.close();
    }
}

struct StageContext {
    plan: RunPlan,
    settings: PipelineSettings,
    has_background: bool,
}

// Closes both neighbouring queues when a worker exits, including by panic, so no other stage
// stays blocked on it.
struct CloseOnDrop<'a> {
    input: Option<&'a StageQueue<FramePacket>>,
    output: &'a StageQueue<FramePacket>,
}

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.output.close();
        if let Some(input) = self.input {
            input.close();
        }
    }
}

struct StageDone {
    report: StageReport,
    exhausted_at: Option<FrameIndex>,
}

struct StageWorker<'a> {
    effect: &'a mut dyn Effect,
    ctx: &'a StageContext,
    report: StageReport,
    exhausted_at: Option<FrameIndex>,
}

impl<'a> StageWorker<'a> {
    fn new(effect: &'a mut dyn Effect, ctx: &'a StageContext) -> Self {
        let report = StageReport {
            name: effect.name(),
            ..StageReport::default()
        };
        Self {
            effect,
            ctx,
            report,
            exhausted_at: None,
        }
    }

    /// fade -> render -> post-process -> update. Time advances even for dropped frames.
    fn process(&mut self, index: FrameIndex, frame: &mut RawFrame) -> PostProcess {
        let plan = &self.ctx.plan;
        let fade = plan.stage_fade(index, self.ctx.has_background, self.ctx.settings.max_fade);
        self.effect.render_frame(frame, self.ctx.has_background, fade);
        let verdict = self
            .effect
            .post_process(frame, index, plan.total_or_current(index));
        self.effect.update();
        self.report.processed += 1;
        if verdict == PostProcess::Drop {
            self.report.dropped += 1;
        }
        verdict
    }

    fn forward(
        &mut self,
        index: FrameIndex,
        mut frame: RawFrame,
        out: &StageQueue<FramePacket>,
    ) -> bool {
        match self.process(index, &mut frame) {
            PostProcess::Keep => out.push(FramePacket::Frame { index, frame }),
            PostProcess::Drop => true,
        }
    }

    /// First stage: pull from the background (or a black canvas) and assign indices.
    fn produce(
        &mut self,
        mut source: Option<&mut BackgroundSource>,
        out: &StageQueue<FramePacket>,
    ) {
        let bounded = self.ctx.plan.bounded_total();
        let resolution = self.ctx.settings.resolution;
        let mut next = 0u64;
        loop {
            if bounded.is_some_and(|total| next >= total) {
                break;
            }
            let index = FrameIndex(next);
            let frame = match source.as_deref_mut() {
                None => RawFrame::black(resolution),
                Some(src) if src.kind() == BackgroundKind::Image => src.current().clone(),
                Some(src) => {
                    if src.read_frame() == SourceRead::Exhausted && self.exhausted_at.is_none() {
                        self.exhausted_at = Some(index);
                        match bounded {
                            None => break,
                            Some(total) => tracing::warn!(
                                frame = index.0,
                                planned = total,
                                "background video ended early; holding its last frame"
                            ),
                        }
                    }
                    src.current().clone()
                }
            };
            if !self.forward(index, frame, out) {
                return;
            }
            next += 1;
        }
        let _ = out.push(FramePacket::End);
    }

    /// Later stages: transform packets in arrival order.
    fn relay(&mut self, input: &StageQueue<FramePacket>, out: &StageQueue<FramePacket>) {
        while let Some(packet) = input.pop() {
            match packet {
                FramePacket::End => {
                    let _ = out.push(FramePacket::End);
                    return;
                }
                FramePacket::Frame { index, frame } => {
                    if !self.forward(index, frame, out) {
                        return;
                    }
                }
            }
        }
    }

    fn finish(self) -> StageDone {
        StageDone {
            report: self.report,
            exhausted_at: self.exhausted_at,
        }
    }
}

/// Drain the last queue into the sink, applying the whole-frame fade where it belongs.
fn collect(
    ctx: &StageContext,
    last: &StageQueue<FramePacket>,
    sink: &mut dyn FrameSink,
) -> EffectgenResult<u64> {
    let fps = u64::from(ctx.settings.fps);
    let mut written = 0u64;
    while let Some(packet) = last.pop() {
        let FramePacket::Frame { index, mut frame } = packet else {
            break;
        };
        if let Some(m) = ctx.plan.collector_fade(index, ctx.has_background) {
            frame.scale_brightness(m);
        }
        sink.push_frame(index, &frame)?;
        written += 1;
        if written.is_multiple_of(fps) {
            match ctx.plan.bounded_total() {
                Some(total) => tracing::debug!(
                    seconds = written / fps,
                    frame = index.0 + 1,
                    total,
                    "progress"
                ),
                None => tracing::debug!(seconds = written / fps, frame = index.0 + 1, "progress"),
            }
        }
    }
    Ok(written)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/stages.rs"]
mod tests;
