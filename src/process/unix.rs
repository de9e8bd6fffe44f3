use std::os::unix::process::CommandExt as _;
use std::process::Command;

use super::ProcessChannel;

/// fork/exec spawning via `std::process`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnixChannel;

impl ProcessChannel for UnixChannel {
    fn prepare(&self, cmd: &mut Command) {
        // Own process group: a terminal ^C reaches us, and the encoder finalizes on stdin EOF.
        cmd.process_group(0);
    }

    fn fallback_dirs(&self) -> &'static [&'static str] {
        &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"]
    }
}
