use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::process::{NativeChannel, ProcessChannel};

/// Executable override for the decoder/encoder.
pub const FFMPEG_PATH_ENV: &str = "FFMPEG_PATH";
/// Executable override for the duration prober.
pub const FFPROBE_PATH_ENV: &str = "FFPROBE_PATH";
/// Full replacement for the encoder's codec arguments.
pub const FFMPEG_PARAMETERS_ENV: &str = "FFMPEG_PARAMETERS";

/// Resolved external tool locations plus the encoder argument override.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolPaths {
    /// Decoder/encoder executable.
    pub ffmpeg: PathBuf,
    /// Duration probe executable.
    pub ffprobe: PathBuf,
    /// Raw `FFMPEG_PARAMETERS` value, if set and non-empty.
    pub encoder_params: Option<String>,
}

impl ToolPaths {
    /// Resolve tools from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve tools using `lookup` in place of the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ffmpeg = match non_empty(FFMPEG_PATH_ENV) {
            Some(p) => PathBuf::from(p),
            None => locate_tool("ffmpeg"),
        };
        let ffprobe = match non_empty(FFPROBE_PATH_ENV) {
            Some(p) => PathBuf::from(p),
            None => sibling_tool(&ffmpeg, "ffprobe").unwrap_or_else(|| locate_tool("ffprobe")),
        };

        Self {
            ffmpeg,
            ffprobe,
            encoder_params: non_empty(FFMPEG_PARAMETERS_ENV),
        }
    }
}

/// Find `tool` on `PATH`, then in the platform fallback directories.
///
/// Falls back to the bare name so the eventual spawn reports a clear "not found".
pub fn locate_tool(tool: &str) -> PathBuf {
    locate_tool_in(tool, std::env::var_os("PATH"), &NativeChannel::default())
}

pub(crate) fn locate_tool_in(
    tool: &str,
    path_var: Option<OsString>,
    channel: &dyn ProcessChannel,
) -> PathBuf {
    let exe = channel.executable_name(tool);
    let path_dirs = path_var
        .as_deref()
        .map(|p| std::env::split_paths(p).collect::<Vec<_>>())
        .unwrap_or_default();
    let fallback_dirs = channel.fallback_dirs().iter().map(PathBuf::from);

    path_dirs
        .into_iter()
        .chain(fallback_dirs)
        .map(|dir| dir.join(&exe))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(tool))
}

fn sibling_tool(anchor: &Path, tool: &str) -> Option<PathBuf> {
    let dir = anchor.parent().filter(|d| !d.as_os_str().is_empty())?;
    let candidate = dir.join(NativeChannel::default().executable_name(tool));
    candidate.is_file().then_some(candidate)
}

/// Return `true` when `tool -version` runs successfully.
pub fn is_tool_available(tool: &Path) -> bool {
    is_tool_available_via(tool, &NativeChannel::default())
}

pub(crate) fn is_tool_available_via(tool: &Path, channel: &dyn ProcessChannel) -> bool {
    let mut cmd = Command::new(tool);
    cmd.arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    channel.prepare(&mut cmd);
    cmd.status().map(|s| s.success()).unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/media/tools.rs"]
mod tests;
