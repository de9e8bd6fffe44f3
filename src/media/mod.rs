//! ffmpeg-backed media ingestion: tool lookup, background decode and duration probing.

pub mod background;
pub mod probe;
pub mod tools;
