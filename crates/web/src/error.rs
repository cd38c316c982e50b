/// Fetch pipeline errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FetchError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("invalid URL")]
    BadUrl,
    /// The connection (or TLS handshake) was refused.
    #[error("connection refused")]
    ConnectionRefused,
    /// Writing the request failed.
    #[error("send failed")]
    SendFailed,
    /// The peer closed the connection mid-response.
    #[error("connection lost")]
    Disconnected,
    /// No bytes arrived within the idle timeout.
    #[error("read timeout")]
    Timeout,
    /// The response was not valid HTTP.
    #[error("bad response")]
    Payload,
    /// More than the allowed number of redirects.
    #[error("too many redirects")]
    TooManyRedirects,
    /// The response did not fit the page buffer.
    #[error("page too large")]
    OutOfMemory,
    /// The server answered with an error status.
    #[error("HTTP {0}")]
    Status(u16),
}

impl FetchError {
    /// Short text for the error banner.
    pub fn banner(&self) -> &'static str {
        match self {
            Self::BadUrl => "Invalid URL",
            Self::ConnectionRefused => "Connection refused",
            Self::SendFailed => "Send failed",
            Self::Disconnected => "Connection lost",
            Self::Timeout => "Timed out",
            Self::Payload => "Bad response",
            Self::TooManyRedirects => "Too many redirects",
            Self::OutOfMemory => "Page too large",
            Self::Status(404) => "Not found (404)",
            Self::Status(s) if *s >= 500 => "Server error",
            Self::Status(_) => "Request rejected",
        }
    }
}
