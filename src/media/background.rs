use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;

use crate::foundation::core::{RawFrame, Resolution};
use crate::foundation::error::{EffectgenError, EffectgenResult};
use crate::media::tools::ToolPaths;
use crate::process::{self, Direction};

/// What the background was decoded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackgroundKind {
    /// One decoded frame reused for every output frame.
    Image,
    /// A continuous decoded stream, one frame per output frame.
    Video,
}

/// Outcome of [`BackgroundSource::read_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceRead {
    /// [`BackgroundSource::current`] holds a fresh frame.
    Frame,
    /// The stream ended; `current` still holds the last complete frame.
    Exhausted,
}

/// Decoded background frames at the output resolution.
///
/// Only the first pipeline stage touches a source, so the frame buffers are never shared.
pub struct BackgroundSource {
    kind: BackgroundKind,
    current: RawFrame,
    scratch: RawFrame,
    stream: Option<Box<dyn Read + Send>>,
    frames_read: u64,
    exhausted: bool,
}

impl BackgroundSource {
    /// Decode a still image, scaled and cropped to `resolution`.
    pub fn open_image(
        tools: &ToolPaths,
        path: &Path,
        resolution: Resolution,
    ) -> EffectgenResult<Self> {
        let argv = image_decode_args(&tools.ffmpeg, path, resolution);
        let mut handle = process::spawn(&argv, Direction::Read, false)?;
        let source = Self::still_from_reader(resolution, &mut handle);
        handle.close()?;
        let source = source?;
        tracing::info!(path = %path.display(), "background image loaded");
        Ok(source)
    }

    /// Start decoding a video as a continuous raw stream at `resolution` and `fps`.
    pub fn open_video(
        tools: &ToolPaths,
        path: &Path,
        resolution: Resolution,
        fps: u32,
    ) -> EffectgenResult<Self> {
        let argv = video_decode_args(&tools.ffmpeg, path, resolution, fps);
        let handle = process::spawn(&argv, Direction::Read, false)?;
        tracing::info!(path = %path.display(), "background video opened");
        Ok(Self::video_from_reader(resolution, Box::new(handle)))
    }

    /// Read exactly one frame from `reader`; fewer bytes is [`EffectgenError::ShortRead`].
    pub fn still_from_reader(
        resolution: Resolution,
        reader: &mut dyn Read,
    ) -> EffectgenResult<Self> {
        let mut frame = RawFrame::black(resolution);
        let got = read_full(reader, frame.data_mut())
            .map_err(|e| EffectgenError::Other(anyhow::Error::new(e)))?;
        let expected = resolution.frame_bytes();
        if got != expected {
            return Err(EffectgenError::ShortRead { expected, got });
        }
        Ok(Self {
            kind: BackgroundKind::Image,
            scratch: RawFrame::black(resolution),
            current: frame,
            stream: None,
            frames_read: 1,
            exhausted: false,
        })
    }

    /// Treat `reader` as a stream of packed RGB frames at `resolution`.
    pub fn video_from_reader(resolution: Resolution, reader: Box<dyn Read + Send>) -> Self {
        Self {
            kind: BackgroundKind::Video,
            current: RawFrame::black(resolution),
            scratch: RawFrame::black(resolution),
            stream: Some(reader),
            frames_read: 0,
            exhausted: false,
        }
    }

    /// Source kind.
    pub fn kind(&self) -> BackgroundKind {
        self.kind
    }

    /// The most recent complete frame (black before the first read of a video).
    pub fn current(&self) -> &RawFrame {
        &self.current
    }

    /// Complete frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// `true` once a video stream has ended.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Advance to the next frame.
    ///
    /// Still images always report [`SourceRead::Frame`]. For video, a short or failed read ends
    /// the stream and leaves the previous frame in place.
    pub fn read_frame(&mut self) -> SourceRead {
        if self.kind == BackgroundKind::Image {
            return SourceRead::Frame;
        }
        if self.exhausted {
            return SourceRead::Exhausted;
        }
        let Some(stream) = self.stream.as_mut() else {
            self.exhausted = true;
            return SourceRead::Exhausted;
        };

        let expected = self.scratch.data().len();
        match read_full(stream.as_mut(), self.scratch.data_mut()) {
            Ok(n) if n == expected => {
                std::mem::swap(&mut self.current, &mut self.scratch);
                self.frames_read += 1;
                SourceRead::Frame
            }
            Ok(n) => {
                if n > 0 {
                    tracing::debug!(bytes = n, "discarding partial trailing background frame");
                }
                self.exhausted = true;
                SourceRead::Exhausted
            }
            Err(e) => {
                tracing::warn!("background read failed, treating as end of stream: {e}");
                self.exhausted = true;
                SourceRead::Exhausted
            }
        }
    }

    /// Tear down the decoder, if any.
    pub fn close(&mut self) {
        self.stream = None;
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_full(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn scale_crop_filter(resolution: Resolution) -> String {
    let (w, h) = (resolution.width, resolution.height);
    format!("scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}")
}

pub(crate) fn image_decode_args(ffmpeg: &Path, input: &Path, resolution: Resolution) -> Vec<OsString> {
    let mut argv = decode_prefix(ffmpeg, input, resolution);
    argv.extend(process::argv(["-frames:v", "1"]));
    argv.extend(raw_rgb_output());
    argv
}

pub(crate) fn video_decode_args(
    ffmpeg: &Path,
    input: &Path,
    resolution: Resolution,
    fps: u32,
) -> Vec<OsString> {
    let mut argv = decode_prefix(ffmpeg, input, resolution);
    argv.extend(process::argv(["-r".to_string(), fps.to_string(), "-an".to_string()]));
    argv.extend(raw_rgb_output());
    argv
}

fn decode_prefix(ffmpeg: &Path, input: &Path, resolution: Resolution) -> Vec<OsString> {
    let mut argv = vec![ffmpeg.as_os_str().to_os_string()];
    argv.extend(process::argv(["-nostdin", "-v", "error", "-i"]));
    argv.push(input.as_os_str().to_os_string());
    argv.push("-vf".into());
    argv.push(scale_crop_filter(resolution).into());
    argv
}

fn raw_rgb_output() -> Vec<OsString> {
    process::argv(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
}

#[cfg(test)]
#[path = "../../tests/unit/media/background.rs"]
mod tests;
