//! Output sinks.
//!
//! Sinks consume finished frames in increasing frame-index order from the pipeline collector.

/// `ffmpeg`-based encoder sink and codec profiles.
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
