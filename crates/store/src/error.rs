use platform::storage::PathTooLong;

/// Persistence errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The SD card reported an error.
    #[error("SD card error")]
    Io,
    /// A path did not fit the path buffer.
    #[error("path too long")]
    PathTooLong,
    /// A user-supplied name is empty or contains forbidden characters.
    #[error("invalid name")]
    InvalidName,
    /// The target name is already taken.
    #[error("name already exists")]
    Exists,
    /// The file does not exist.
    #[error("not found")]
    NotFound,
    /// A record failed its size or checksum check.
    #[error("corrupt record")]
    Corrupt,
    /// The file does not fit the caller's buffer.
    #[error("file too large")]
    TooLarge,
    /// A bounded list is full.
    #[error("list full")]
    Full,
}

impl StoreError {
    /// Short text for the on-screen banner.
    pub fn banner(&self) -> &'static str {
        match self {
            Self::Io => "SD card error",
            Self::PathTooLong => "Name too long",
            Self::InvalidName => "Invalid name",
            Self::Exists => "Name already exists",
            Self::NotFound => "File not found",
            Self::Corrupt => "File damaged",
            Self::TooLarge => "File too large",
            Self::Full => "List is full",
        }
    }
}

impl From<PathTooLong> for StoreError {
    fn from(_: PathTooLong) -> Self {
        Self::PathTooLong
    }
}

/// Map a backend error to [`StoreError::Io`], logging the detail.
pub(crate) fn io<E: core::fmt::Debug>(err: E) -> StoreError {
    tracing::warn!("sd: {:?}", err);
    StoreError::Io
}
