use std::ffi::OsString;
use std::io::Read as _;
use std::path::Path;

use crate::media::tools::ToolPaths;
use crate::process::{self, Direction};

/// Query the container duration of `path` in seconds.
///
/// Every failure mode (prober missing, non-zero exit, empty or non-numeric output, a
/// non-positive duration) yields `None`; callers fall back to an unbounded run.
#[tracing::instrument(skip(tools), fields(path = %path.display()))]
pub fn probe_duration(tools: &ToolPaths, path: &Path) -> Option<f64> {
    let argv = probe_args(&tools.ffprobe, path);
    let mut handle = match process::spawn(&argv, Direction::Read, true) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!("duration probe unavailable: {e}");
            return None;
        }
    };

    let mut out = String::new();
    let read_res = handle.read_to_string(&mut out);
    let status = handle.close();
    if let Err(e) = read_res {
        tracing::warn!("failed to read probe output: {e}");
        return None;
    }
    match status {
        Ok(Some(s)) if !s.success() => {
            tracing::warn!(%s, "duration probe exited with failure");
            return None;
        }
        Err(e) => {
            tracing::warn!("duration probe did not exit cleanly: {e}");
            return None;
        }
        _ => {}
    }

    let secs = parse_probe_output(&out);
    match secs {
        Some(s) => tracing::info!(seconds = s, "probed background duration"),
        None => tracing::warn!(output = out.trim(), "could not parse probed duration"),
    }
    secs
}

/// Parse the first line of `ffprobe` `default=noprint_wrappers=1:nokey=1` output.
pub(crate) fn parse_probe_output(out: &str) -> Option<f64> {
    let line = out.lines().map(str::trim).find(|l| !l.is_empty())?;
    let secs = line.parse::<f64>().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

pub(crate) fn probe_args(ffprobe: &Path, input: &Path) -> Vec<OsString> {
    let mut argv = vec![ffprobe.as_os_str().to_os_string()];
    argv.extend(process::argv([
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ]));
    argv.push(input.as_os_str().to_os_string());
    argv
}

#[cfg(test)]
#[path = "../../tests/unit/media/probe.rs"]
mod tests;
