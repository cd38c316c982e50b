//! Well-known file locations under the SD roots in [`platform::config`].

use core::fmt::Write as _;

use platform::config::{AUDIOBOOK_ROOT, NOTES_ROOT, SMS_ROOT, WEB_ROOT};
use platform::storage::{join, stem, PathBuf, PathTooLong};

/// Directory holding audiobook bookmarks.
pub const BOOKMARK_DIR: &str = "/audiobooks/.bookmarks";

/// File name of the per-directory metadata cache.
pub const METACACHE_NAME: &str = ".metacache";

/// Contacts list.
pub const CONTACTS: &str = "/sms/contacts.txt";

/// Modem enable flag.
pub const MODEM_CFG: &str = "/sms/modem.cfg";

/// WiFi credentials.
pub const WIFI_CFG: &str = "/web/wifi.cfg";

/// Saved web bookmarks.
pub const WEB_BOOKMARKS: &str = "/web/bookmarks.txt";

/// Visited-page history.
pub const WEB_HISTORY: &str = "/web/history.txt";

/// Bookmark file for the audiobook file `name` (any directory).
pub fn bookmark_path(name: &str) -> Result<PathBuf, PathTooLong> {
    let mut out = join(BOOKMARK_DIR, stem(name))?;
    out.push_str(".bmk").map_err(|_| PathTooLong)?;
    Ok(out)
}

/// Metadata cache for directory `dir`.
pub fn metacache_path(dir: &str) -> Result<PathBuf, PathTooLong> {
    join(dir, METACACHE_NAME)
}

/// Note file `file_name` (already carrying its `.txt`).
pub fn note_path(file_name: &str) -> Result<PathBuf, PathTooLong> {
    join(NOTES_ROOT, file_name)
}

/// Conversation file for a normalized phone number.
pub fn sms_path(phone: &str) -> Result<PathBuf, PathTooLong> {
    let mut out = PathBuf::new();
    write!(out, "{SMS_ROOT}/{phone}.bin").map_err(|_| PathTooLong)?;
    Ok(out)
}

/// Every root directory the device expects on the card.
pub const ROOTS: [&str; 6] = [
    AUDIOBOOK_ROOT,
    BOOKMARK_DIR,
    platform::config::BOOKS_ROOT,
    NOTES_ROOT,
    SMS_ROOT,
    WEB_ROOT,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookmark_uses_stem() {
        assert_eq!(
            bookmark_path("Dune.m4b").unwrap().as_str(),
            "/audiobooks/.bookmarks/Dune.bmk"
        );
    }

    #[test]
    fn test_sms_path() {
        assert_eq!(sms_path("+1234").unwrap().as_str(), "/sms/+1234.bin");
    }

    #[test]
    fn test_metacache_in_subdir() {
        assert_eq!(
            metacache_path("/audiobooks/Sci-Fi").unwrap().as_str(),
            "/audiobooks/Sci-Fi/.metacache"
        );
    }
}
