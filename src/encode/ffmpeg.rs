use std::ffi::OsString;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{FrameIndex, RawFrame};
use crate::foundation::error::{EffectgenError, EffectgenResult};
use crate::process::{self, Direction, ProcessHandle};

/// Default constant rate factor, matching `ffmpeg`'s own x264 default.
pub const DEFAULT_CRF: u8 = 23;

/// Codec/container arguments chosen from the output file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecProfile {
    /// H.264 in yuv420p; `faststart` moves the index up front for MP4/MOV.
    H264 {
        /// Add `-movflags +faststart`.
        faststart: bool,
    },
    /// VP9 in constant-quality mode for WebM.
    Vp9,
    /// Palette-based animated GIF.
    Gif,
}

impl CodecProfile {
    /// Select a profile from the extension of `path` (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp4" | "m4v" | "mov" => Self::H264 { faststart: true },
            "webm" => Self::Vp9,
            "gif" => Self::Gif,
            _ => Self::H264 { faststart: false },
        }
    }

    /// Whether the output pixel format needs even dimensions.
    pub fn needs_even_dimensions(self) -> bool {
        !matches!(self, Self::Gif)
    }

    /// Video codec arguments for this profile.
    pub fn video_args(self, crf: u8) -> Vec<String> {
        let crf = crf.to_string();
        let mut args: Vec<String> = match self {
            Self::H264 { .. } => ["-c:v", "libx264", "-preset", "medium", "-crf", &crf]
                .map(String::from)
                .to_vec(),
            Self::Vp9 => ["-c:v", "libvpx-vp9", "-crf", &crf, "-b:v", "0"]
                .map(String::from)
                .to_vec(),
            Self::Gif => {
                return ["-vf", "split[a][b];[a]palettegen[p];[b][p]paletteuse", "-loop", "0"]
                    .map(String::from)
                    .to_vec();
            }
        };
        args.extend(["-pix_fmt", "yuv420p"].map(String::from));
        if let Self::H264 { faststart: true } = self {
            args.extend(["-movflags", "+faststart"].map(String::from));
        }
        args
    }
}

/// Audio copied from a media file into the encoded output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioPassthrough {
    /// File whose first audio stream is mapped (missing audio is tolerated).
    pub source: PathBuf,
    /// Encoder for the audio stream, e.g. `aac`.
    pub codec: String,
    /// Optional audio bitrate in kbit/s.
    pub bitrate_kbps: Option<u32>,
}

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// `ffmpeg` executable.
    pub ffmpeg: PathBuf,
    /// Output file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Constant rate factor for the built-in profiles.
    pub crf: u8,
    /// Replacement for the profile's codec arguments (`FFMPEG_PARAMETERS`).
    pub encoder_params: Option<String>,
    /// Optional audio passthrough.
    pub audio: Option<AudioPassthrough>,
}

impl FfmpegSinkOpts {
    /// Create options for encoding to `out_path` with the default profile settings.
    pub fn new(ffmpeg: impl Into<PathBuf>, out_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            out_path: out_path.into(),
            overwrite: false,
            crf: DEFAULT_CRF,
            encoder_params: None,
            audio: None,
        }
    }
}

/// Sink that spawns `ffmpeg` and streams raw RGB frames to its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    handle: Option<ProcessHandle>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new sink; the encoder starts in [`FrameSink::begin`].
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            handle: None,
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> EffectgenResult<()> {
        if cfg.fps == 0 {
            return Err(EffectgenError::setup("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(EffectgenError::setup(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        let profile = CodecProfile::from_path(&self.opts.out_path);
        if self.opts.encoder_params.is_none()
            && profile.needs_even_dimensions()
            && (!cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2))
        {
            return Err(EffectgenError::setup(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(EffectgenError::setup(format!(
                "output file '{}' already exists (pass --overwrite to replace it)",
                self.opts.out_path.display()
            )));
        }

        let argv = encoder_args(&self.opts, &cfg);
        if self.opts.encoder_params.is_some() {
            tracing::info!("using custom encoder parameters from FFMPEG_PARAMETERS");
        }
        self.handle = Some(process::spawn(&argv, Direction::Write, false)?);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &RawFrame) -> EffectgenResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| EffectgenError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(EffectgenError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width() != cfg.width || frame.height() != cfg.height {
            return Err(EffectgenError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }

        let Some(handle) = self.handle.as_mut() else {
            return Err(EffectgenError::encode("ffmpeg sink is already finalized"));
        };
        handle.write_all(frame.data()).map_err(|e| {
            EffectgenError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })
    }

    fn end(&mut self) -> EffectgenResult<()> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };
        self.cfg = None;
        match handle.close()? {
            Some(status) if !status.success() => Err(EffectgenError::encode(format!(
                "ffmpeg exited with status {status}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Full encoder command line: tool, fixed raw-input framing, optional audio input, codec
/// arguments (profile or override), output path.
pub(crate) fn encoder_args(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<OsString> {
    let mut argv: Vec<OsString> = vec![opts.ffmpeg.clone().into_os_string()];
    argv.push(if opts.overwrite { "-y" } else { "-n" }.into());
    argv.extend(process::argv([
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pixel_format".to_string(),
        "rgb24".to_string(),
        "-video_size".to_string(),
        format!("{}x{}", cfg.width, cfg.height),
        "-framerate".to_string(),
        cfg.fps.to_string(),
        "-i".to_string(),
        "-".to_string(),
    ]));

    if let Some(audio) = opts.audio.as_ref() {
        argv.push("-i".into());
        argv.push(audio.source.clone().into_os_string());
        argv.extend(process::argv(["-map", "0:v:0", "-map", "1:a:0?"]));
    }

    match opts.encoder_params.as_deref() {
        Some(custom) => argv.extend(process::argv(split_params(custom))),
        None => {
            let profile = CodecProfile::from_path(&opts.out_path);
            argv.extend(process::argv(profile.video_args(opts.crf)));
            if let Some(audio) = opts.audio.as_ref() {
                argv.extend(process::argv(["-c:a", audio.codec.as_str()]));
                if let Some(kbps) = audio.bitrate_kbps {
                    argv.extend(process::argv(["-b:a".to_string(), format!("{kbps}k")]));
                }
            }
        }
    }
    if opts.audio.is_some() {
        argv.push("-shortest".into());
    }

    argv.push(opts.out_path.clone().into_os_string());
    argv
}

/// Split an argument string on whitespace, keeping single- or double-quoted runs together.
///
/// Quotes are removed; there are no escape sequences. An unterminated quote extends to the end.
pub fn split_params(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => cur.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    out.push(std::mem::take(&mut cur));
                    in_token = false;
                }
            }
            None => {
                cur.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        out.push(cur);
    }
    out
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> EffectgenResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
