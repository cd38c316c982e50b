//! Small configuration files: `modem.cfg` and `wifi.cfg`.

use heapless::String;
use platform::Storage;

use crate::fs::{atomic_write, ensure_dir, read_file};
use crate::paths::{MODEM_CFG, WIFI_CFG};
use crate::StoreError;

/// Longest SSID (802.11).
pub const MAX_SSID: usize = 32;
/// Longest WPA passphrase.
pub const MAX_PASSWORD: usize = 64;

/// Whether the modem worker starts at boot. A missing or unreadable file
/// means enabled.
pub async fn load_modem_enabled<S: Storage>(sd: &mut S) -> bool {
    let mut buf = [0u8; 4];
    match read_file(sd, MODEM_CFG, &mut buf).await {
        Ok(Some(n)) if n > 0 => buf.first() != Some(&b'0'),
        _ => true,
    }
}

/// Persist the modem enable flag as `'1'` or `'0'`.
pub async fn save_modem_enabled<S: Storage>(sd: &mut S, enabled: bool) -> Result<(), StoreError> {
    ensure_dir(sd, platform::config::SMS_ROOT).await?;
    atomic_write(sd, MODEM_CFG, if enabled { b"1" } else { b"0" }).await
}

/// Saved WiFi network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    /// Network name.
    pub ssid: String<MAX_SSID>,
    /// Passphrase (may be empty for open networks).
    pub password: String<MAX_PASSWORD>,
}

/// Read `wifi.cfg`: SSID on the first line, password on the second.
pub async fn load_wifi<S: Storage>(sd: &mut S) -> Result<Option<WifiCredentials>, StoreError> {
    let mut buf = [0u8; MAX_SSID + MAX_PASSWORD + 4];
    let Some(n) = read_file(sd, WIFI_CFG, &mut buf).await? else {
        return Ok(None);
    };
    let text = core::str::from_utf8(buf.get(..n).unwrap_or(&[])).map_err(|_| StoreError::Corrupt)?;
    let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));
    let ssid = lines.next().unwrap_or("");
    if ssid.is_empty() {
        return Ok(None);
    }
    let password = lines.next().unwrap_or("");
    Ok(Some(WifiCredentials {
        ssid: String::try_from(ssid).map_err(|_| StoreError::Corrupt)?,
        password: String::try_from(password).map_err(|_| StoreError::Corrupt)?,
    }))
}

/// Write `wifi.cfg`.
pub async fn save_wifi<S: Storage>(sd: &mut S, creds: &WifiCredentials) -> Result<(), StoreError> {
    let mut out: heapless::Vec<u8, { MAX_SSID + MAX_PASSWORD + 2 }> = heapless::Vec::new();
    let _ = out.extend_from_slice(creds.ssid.as_bytes());
    let _ = out.push(b'\n');
    let _ = out.extend_from_slice(creds.password.as_bytes());
    let _ = out.push(b'\n');
    ensure_dir(sd, platform::config::WEB_ROOT).await?;
    atomic_write(sd, WIFI_CFG, &out).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MemStorage;

    #[tokio::test]
    async fn test_modem_flag_defaults_to_enabled() {
        let fs = MemStorage::new();
        let mut sd = fs.clone();
        assert!(load_modem_enabled(&mut sd).await);
        save_modem_enabled(&mut sd, false).await.unwrap();
        assert_eq!(fs.get("/sms/modem.cfg").unwrap(), b"0");
        assert!(!load_modem_enabled(&mut sd).await);
        save_modem_enabled(&mut sd, true).await.unwrap();
        assert!(load_modem_enabled(&mut sd).await);
    }

    #[tokio::test]
    async fn test_wifi_round_trip() {
        let fs = MemStorage::new();
        let mut sd = fs.clone();
        assert_eq!(load_wifi(&mut sd).await, Ok(None));
        let creds = WifiCredentials {
            ssid: String::try_from("HomeNet").unwrap(),
            password: String::try_from("hunter22").unwrap(),
        };
        save_wifi(&mut sd, &creds).await.unwrap();
        assert_eq!(fs.get_string("/web/wifi.cfg").unwrap(), "HomeNet\nhunter22\n");
        assert_eq!(load_wifi(&mut sd).await, Ok(Some(creds)));
    }

    #[tokio::test]
    async fn test_wifi_crlf_file() {
        let fs = MemStorage::new();
        fs.insert("/web/wifi.cfg", b"Cafe\r\nlatte\r\n");
        let mut sd = fs.clone();
        let creds = load_wifi(&mut sd).await.unwrap().unwrap();
        assert_eq!(creds.ssid.as_str(), "Cafe");
        assert_eq!(creds.password.as_str(), "latte");
    }
}
