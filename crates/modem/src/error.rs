/// AT exchange failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtError {
    /// No final result code within the command timeout.
    #[error("modem timeout")]
    Timeout,
    /// The modem answered `ERROR` or `+CME ERROR`.
    #[error("command rejected")]
    Rejected,
    /// `+CMS ERROR: <code>` (message service).
    #[error("message service error {0}")]
    Cms(u16),
    /// `AT+CMGS` never produced the `> ` prompt.
    #[error("no send prompt")]
    NoPrompt,
    /// Registration did not reach home or roaming in time.
    #[error("not registered")]
    NotRegistered,
    /// The UART reported an error.
    #[error("UART error")]
    Transport,
    /// A command did not fit the line buffer.
    #[error("command too long")]
    TooLong,
}

impl AtError {
    /// Short text for the status line.
    pub fn banner(&self) -> &'static str {
        match self {
            Self::Timeout => "Modem not responding",
            Self::Rejected => "Modem error",
            Self::Cms(_) => "SMS failed",
            Self::NoPrompt => "SMS failed",
            Self::NotRegistered => "No network",
            Self::Transport => "Modem link error",
            Self::TooLong => "Message too long",
        }
    }
}

pub(crate) fn transport<E: core::fmt::Debug>(err: E) -> AtError {
    tracing::warn!("modem: uart {:?}", err);
    AtError::Transport
}
