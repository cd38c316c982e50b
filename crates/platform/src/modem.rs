//! Cellular modem abstraction (A7682E-class, AT command set over UART).
//!
//! The worker owns both halves exclusively: the control GPIOs and the UART.

/// Longest AT response line the worker keeps.
pub const AT_LINE_LEN: usize = 256;

/// One response line without its CR/LF.
pub type AtLine = heapless::String<AT_LINE_LEN>;

/// Modem power and control lines.
pub trait ModemPower {
    /// Enable or cut the modem supply rail.
    fn set_rail(&mut self, on: bool);
    /// Drive RESET (`false` = low = asserted).
    fn set_reset(&mut self, high: bool);
    /// Drive PWRKEY.
    fn set_pwrkey(&mut self, high: bool);
    /// Drive DTR (`false` = low keeps the modem awake).
    fn set_dtr(&mut self, high: bool);
}

/// Line-oriented UART transport for AT commands.
pub trait AtPort {
    /// Error type
    type Error: core::fmt::Debug;

    /// Open the UART (baud rate etc. are board concerns).
    fn open(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Write raw bytes.
    fn write(&mut self, data: &[u8]) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Read one non-empty line into `line`.
    ///
    /// Returns `Ok(false)` if nothing arrived within `timeout_ms`. The `> `
    /// prompt that follows `AT+CMGS` counts as a line.
    fn read_line(
        &mut self,
        line: &mut AtLine,
        timeout_ms: u32,
    ) -> impl core::future::Future<Output = Result<bool, Self::Error>>;

    /// Close the UART.
    fn close(&mut self);
}
