/// Convenience result type used across effectgen.
pub type EffectgenResult<T> = Result<T, EffectgenError>;

/// Top-level error taxonomy used by the pipeline and its media adapters.
///
/// Running out of background video is not represented here: it is reported through
/// [`SourceRead::Exhausted`](crate::media::background::SourceRead::Exhausted) and is the normal end of an unbounded run.
#[derive(thiserror::Error, Debug)]
pub enum EffectgenError {
    /// Invalid run setup: resolution, duration, or an unresolvable run length.
    #[error("setup error: {0}")]
    Setup(String),

    /// A decoder, encoder or prober could not be started.
    #[error("spawn error: {0}")]
    Spawn(String),

    /// A still-image decode produced fewer bytes than one frame.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead {
        /// Bytes in one frame.
        expected: usize,
        /// Bytes actually produced by the decoder.
        got: usize,
    },

    /// An effect rejected its parameters or failed to initialize.
    #[error("effect init error: {0}")]
    EffectInit(String),

    /// Errors while streaming frames into the output.
    #[error("encode error: {0}")]
    Encode(String),

    /// Invalid configuration file or command-line values.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EffectgenError {
    /// Build a [`EffectgenError::Setup`] value.
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Build a [`EffectgenError::Spawn`] value.
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Build a [`EffectgenError::EffectInit`] value.
    pub fn effect_init(msg: impl Into<String>) -> Self {
        Self::EffectInit(msg.into())
    }

    /// Build a [`EffectgenError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`EffectgenError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
