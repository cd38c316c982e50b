//! Network abstractions: WiFi association and TCP/TLS connections.
//!
//! Connections are plain `embedded-io-async` byte streams; TLS is the
//! connector's concern (`embedded-tls` on hardware).

/// A visible access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiNetwork {
    /// Network name.
    pub ssid: heapless::String<32>,
    /// Signal strength in dBm.
    pub rssi: i8,
    /// `true` if a password is required.
    pub secured: bool,
}

/// WiFi station interface.
pub trait WifiLink {
    /// Error type
    type Error: core::fmt::Debug;

    /// Associate and obtain an address, giving up after `timeout_ms`.
    fn connect(
        &mut self,
        ssid: &str,
        password: &str,
        timeout_ms: u32,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// `true` while associated.
    fn is_connected(&self) -> bool;

    /// Drop the association.
    fn disconnect(&mut self);

    /// Blocking scan (3–5 s).
    fn scan(
        &mut self,
        out: &mut heapless::Vec<WifiNetwork, 16>,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;
}

/// Opens byte-stream connections to remote hosts.
pub trait Connector {
    /// An open connection.
    type Connection: embedded_io_async::Read + embedded_io_async::Write;
    /// Error type
    type Error: core::fmt::Debug;

    /// Connect to `host:port`, wrapping the stream in TLS when `tls` is set.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        tls: bool,
    ) -> impl core::future::Future<Output = Result<Self::Connection, Self::Error>>;
}
