use std::os::windows::process::CommandExt as _;
use std::process::Command;

use super::ProcessChannel;

const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// `CreateProcess` spawning via `std::process`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowsChannel;

impl ProcessChannel for WindowsChannel {
    fn prepare(&self, cmd: &mut Command) {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    fn fallback_dirs(&self) -> &'static [&'static str] {
        &["C:\\Program Files\\ffmpeg\\bin", "C:\\ffmpeg\\bin"]
    }
}
