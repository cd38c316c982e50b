//! Errors a screen action can end in.
//!
//! None of these are fatal: the runtime logs the error, shows
//! [`AppError::banner`] on the hint row and keeps running.

use library::CacheError;
use playback::PipelineError;
use store::StoreError;
use text::EditorError;
use web::FetchError;

/// Failure of one user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppError {
    /// Persistence failed.
    #[error("store: {0}")]
    Store(StoreError),
    /// Directory scan failed.
    #[error("library: {0}")]
    Library(CacheError),
    /// Audio pipeline failed.
    #[error("audio: {0}")]
    Audio(PipelineError),
    /// Web fetch failed.
    #[error("web: {0}")]
    Fetch(FetchError),
    /// The note editor refused the content.
    #[error("editor: {0}")]
    Editor(EditorError),
    /// A boot-time buffer was never handed out.
    #[error("out of memory")]
    OutOfMemory,
    /// The SD card reported an error.
    #[error("SD card error")]
    Sd,
    /// The radio refused new parameters.
    #[error("radio error")]
    Radio,
    /// WiFi association failed.
    #[error("WiFi error")]
    Wifi,
}

impl AppError {
    /// Short text for the hint row.
    pub fn banner(&self) -> &'static str {
        match self {
            Self::Store(e) => e.banner(),
            Self::Library(e) => e.banner(),
            Self::Audio(e) => e.banner(),
            Self::Fetch(e) => e.banner(),
            Self::Editor(EditorError::Full) => "Note is full",
            Self::Editor(EditorError::TooLarge) => "Note too large",
            Self::OutOfMemory => "Out of memory",
            Self::Sd => "SD card error",
            Self::Radio => "Radio error",
            Self::Wifi => "WiFi connect failed",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        Self::Library(e)
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        Self::Audio(e)
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<EditorError> for AppError {
    fn from(e: EditorError) -> Self {
        Self::Editor(e)
    }
}

impl From<platform::storage::PathTooLong> for AppError {
    fn from(_: platform::storage::PathTooLong) -> Self {
        Self::Store(StoreError::PathTooLong)
    }
}

/// Map a backend storage error to [`AppError::Sd`], logging the detail.
pub(crate) fn sd<E: core::fmt::Debug>(err: E) -> AppError {
    tracing::warn!("sd: {:?}", err);
    AppError::Sd
}
