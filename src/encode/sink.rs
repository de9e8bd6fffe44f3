use std::io::Write as _;
use std::path::PathBuf;

use crate::foundation::core::{FrameIndex, RawFrame};
use crate::foundation::error::{EffectgenError, EffectgenResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: u32,
}

impl SinkConfig {
    /// Size of one packed RGB8 frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Where the finished stream goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Encode into a file through `ffmpeg`.
    File(PathBuf),
    /// Raw RGB frames on this process's stdout.
    Stdout,
}

impl OutputTarget {
    /// Sentinel meaning "raw frames on stdout".
    pub const STDOUT_SENTINEL: &'static str = "-";

    /// Parse a user-supplied output argument.
    pub fn parse(raw: &str) -> Self {
        if raw == Self::STDOUT_SENTINEL {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(raw))
        }
    }
}

/// Sink contract for consuming finished frames.
///
/// Ordering contract: `push_frame` is called with strictly increasing `FrameIndex` values. Indices
/// may skip values when a stage dropped frames.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> EffectgenResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &RawFrame) -> EffectgenResult<()>;
    /// Called once after the last frame, also after a failed run.
    fn end(&mut self) -> EffectgenResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    ended: bool,
    pub(crate) frames: Vec<(FrameIndex, RawFrame)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, RawFrame)] {
        &self.frames
    }

    /// `true` once `end` has been called.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> EffectgenResult<()> {
        self.cfg = Some(cfg);
        self.ended = false;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RawFrame) -> EffectgenResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> EffectgenResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Writes packed RGB frames to stdout for a downstream consumer.
///
/// Framing: `rgb24`, row-major, no padding, exactly `width*height*3` bytes per frame, at the
/// resolution and rate given in [`SinkConfig`]. Nothing else is written to stdout.
#[derive(Debug, Default)]
pub struct RawStdoutSink {
    out: Option<std::io::BufWriter<std::io::Stdout>>,
    frame_bytes: usize,
}

impl RawStdoutSink {
    /// Create a sink bound to this process's stdout.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for RawStdoutSink {
    fn begin(&mut self, cfg: SinkConfig) -> EffectgenResult<()> {
        tracing::info!(
            width = cfg.width,
            height = cfg.height,
            fps = cfg.fps,
            "writing raw rgb24 frames to stdout"
        );
        self.frame_bytes = cfg.frame_bytes();
        self.out = Some(std::io::BufWriter::new(std::io::stdout()));
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, frame: &RawFrame) -> EffectgenResult<()> {
        if frame.data().len() != self.frame_bytes {
            return Err(EffectgenError::encode(
                "frame size mismatch with width*height*3",
            ));
        }
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| EffectgenError::encode("stdout sink not started"))?;
        out.write_all(frame.data())
            .map_err(|e| EffectgenError::encode(format!("failed to write frame to stdout: {e}")))
    }

    fn end(&mut self) -> EffectgenResult<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()
                .map_err(|e| EffectgenError::encode(format!("failed to flush stdout: {e}")))?;
        }
        Ok(())
    }
}
