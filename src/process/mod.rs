//! Child processes exposed as one-directional byte streams.
//!
//! A [`ProcessHandle`] owns a live child and exactly one of its standard streams. Platform
//! differences (command preparation, executable suffix, well-known install locations) live behind
//! [`ProcessChannel`]; callers only ever see [`spawn`].

use std::ffi::{OsStr, OsString};
use std::io::{self, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};

use crate::foundation::error::{EffectgenError, EffectgenResult};

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixChannel as NativeChannel;
#[cfg(windows)]
pub use windows::WindowsChannel as NativeChannel;

/// Pipe capacity used for the buffered write side.
const WRITE_BUFFER_BYTES: usize = 1 << 20;

/// Which standard stream of the child is connected to the handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Child stdout is readable; stdin is null.
    Read,
    /// Child stdin is writable; stdout is null.
    Write,
}

/// Platform hooks for spawning tool subprocesses.
pub trait ProcessChannel {
    /// Adjust a command before it is spawned.
    fn prepare(&self, cmd: &mut Command);

    /// Directories searched for a tool after `PATH`.
    fn fallback_dirs(&self) -> &'static [&'static str];

    /// File name of the executable for `tool` on this platform.
    fn executable_name(&self, tool: &str) -> OsString {
        let mut name = OsString::from(tool);
        name.push(std::env::consts::EXE_SUFFIX);
        name
    }

    /// Spawn `argv[0]` with `argv[1..]`, connecting one stream according to `direction`.
    fn spawn(
        &self,
        argv: &[OsString],
        direction: Direction,
        suppress_stderr: bool,
    ) -> EffectgenResult<ProcessHandle> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| EffectgenError::spawn("empty command line"))?;
        let program_name = program.to_string_lossy().into_owned();

        let mut cmd = Command::new(program);
        cmd.args(args);
        match direction {
            Direction::Read => cmd.stdin(Stdio::null()).stdout(Stdio::piped()),
            Direction::Write => cmd.stdin(Stdio::piped()).stdout(Stdio::null()),
        };
        if suppress_stderr {
            cmd.stderr(Stdio::null());
        } else {
            cmd.stderr(Stdio::inherit());
        }
        self.prepare(&mut cmd);

        tracing::debug!(program = %program_name, ?direction, args = ?args, "spawning");
        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                EffectgenError::spawn(format!("'{program_name}' was not found"))
            }
            _ => EffectgenError::spawn(format!("failed to start '{program_name}': {e}")),
        })?;

        let stream = match direction {
            Direction::Read => child.stdout.take().map(Stream::Reader),
            Direction::Write => child
                .stdin
                .take()
                .map(|stdin| Stream::Writer(BufWriter::with_capacity(WRITE_BUFFER_BYTES, stdin))),
        };
        let Some(stream) = stream else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EffectgenError::spawn(format!(
                "failed to open pipe to '{program_name}'"
            )));
        };

        Ok(ProcessHandle {
            program: program_name,
            child: Some(child),
            stream,
        })
    }
}

/// Spawn through the channel for the current platform.
pub fn spawn(
    argv: &[OsString],
    direction: Direction,
    suppress_stderr: bool,
) -> EffectgenResult<ProcessHandle> {
    NativeChannel::default().spawn(argv, direction, suppress_stderr)
}

/// Build an argv vector from anything string-like.
pub fn argv<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    items.into_iter().map(|s| s.as_ref().to_os_string()).collect()
}

enum Stream {
    Reader(ChildStdout),
    Writer(BufWriter<ChildStdin>),
    Closed,
}

/// A live child process and its connected stream.
///
/// Dropping the handle closes it; [`ProcessHandle::close`] does the same but reports errors and
/// the exit status.
pub struct ProcessHandle {
    program: String,
    child: Option<Child>,
    stream: Stream,
}

impl ProcessHandle {
    /// Connected direction, or `None` once closed.
    pub fn direction(&self) -> Option<Direction> {
        match self.stream {
            Stream::Reader(_) => Some(Direction::Read),
            Stream::Writer(_) => Some(Direction::Write),
            Stream::Closed => None,
        }
    }

    /// `true` until [`close`](Self::close) has run.
    pub fn is_open(&self) -> bool {
        self.child.is_some()
    }

    /// Flush and close the stream, then wait for the child to exit.
    ///
    /// Returns the exit status on the first call and `Ok(None)` afterwards. The child is reaped
    /// even when flushing fails; the flush error is returned after the wait.
    pub fn close(&mut self) -> EffectgenResult<Option<ExitStatus>> {
        let flush_res = match std::mem::replace(&mut self.stream, Stream::Closed) {
            Stream::Writer(mut w) => w.flush(),
            Stream::Reader(_) | Stream::Closed => Ok(()),
        };

        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        let status = child.wait().map_err(|e| {
            EffectgenError::spawn(format!("failed to wait for '{}': {e}", self.program))
        })?;
        tracing::debug!(program = %self.program, %status, "child exited");

        flush_res.map_err(|e| {
            EffectgenError::encode(format!("failed to flush pipe to '{}': {e}", self.program))
        })?;
        Ok(Some(status))
    }
}

impl Read for ProcessHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            Stream::Reader(r) => r.read(buf),
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "process handle is not open for reading",
            )),
        }
    }
}

impl Write for ProcessHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.stream {
            Stream::Writer(w) => w.write(buf),
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "process handle is not open for writing",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.stream {
            Stream::Writer(w) => w.flush(),
            _ => Ok(()),
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(program = %self.program, "closing child process failed: {e}");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/process/channel.rs"]
mod tests;
