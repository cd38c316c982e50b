use platform::storage::PathTooLong;
use store::StoreError;

/// Listing and cache errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CacheError {
    /// The SD card reported an error while listing.
    #[error("SD card error")]
    Io,
    /// A path did not fit the path buffer.
    #[error("path too long")]
    PathTooLong,
    /// Reading or writing the cache file failed.
    #[error("cache: {0}")]
    Store(StoreError),
}

impl CacheError {
    /// Short text for the on-screen banner.
    pub fn banner(&self) -> &'static str {
        match self {
            Self::Io => "SD card error",
            Self::PathTooLong => "Path too long",
            Self::Store(e) => e.banner(),
        }
    }
}

impl From<PathTooLong> for CacheError {
    fn from(_: PathTooLong) -> Self {
        Self::PathTooLong
    }
}

impl From<StoreError> for CacheError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

pub(crate) fn io<E: core::fmt::Debug>(err: E) -> CacheError {
    tracing::warn!("library: sd {:?}", err);
    CacheError::Io
}
