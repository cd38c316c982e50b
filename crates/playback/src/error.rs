use platform::storage::PathTooLong;
use store::StoreError;

/// Audio pipeline errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PipelineError {
    /// No book is open.
    #[error("no book open")]
    NoBook,
    /// The decoder refused the stream or the I2S setup.
    #[error("decoder error")]
    Decoder,
    /// The DAC power pin could not be driven.
    #[error("DAC power error")]
    Dac,
    /// The SD card reported an error (rename, bookmark).
    #[error("SD card error")]
    Io,
    /// A path did not fit the path buffer.
    #[error("path too long")]
    PathTooLong,
    /// Bookmark persistence failed.
    #[error("bookmark: {0}")]
    Store(StoreError),
}

impl PipelineError {
    /// Short text for the on-screen banner.
    pub fn banner(&self) -> &'static str {
        match self {
            Self::NoBook => "No book open",
            Self::Decoder => "Cannot play file",
            Self::Dac => "Audio hardware error",
            Self::Io => "SD card error",
            Self::PathTooLong => "Path too long",
            Self::Store(e) => e.banner(),
        }
    }
}

impl From<PathTooLong> for PipelineError {
    fn from(_: PathTooLong) -> Self {
        Self::PathTooLong
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

pub(crate) fn io<E: core::fmt::Debug>(err: E) -> PipelineError {
    tracing::warn!("audio: sd {:?}", err);
    PipelineError::Io
}
