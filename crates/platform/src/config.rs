//! Application configuration and constants
//!
//! Central naming, SD-card layout and panel geometry. Feature crates build
//! their paths from these roots rather than hardcoding strings.

/// The application name
pub const APP_NAME: &str = "Meshdeck";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── SD-card layout ──────────────────────────────────────────────────────────

/// Audiobook library root (holds `.bookmarks/` and `.metacache`).
pub const AUDIOBOOK_ROOT: &str = "/audiobooks";

/// E-book root.
pub const BOOKS_ROOT: &str = "/books";

/// Plain-text notes.
pub const NOTES_ROOT: &str = "/notes";

/// SMS conversations, contacts and `modem.cfg`.
pub const SMS_ROOT: &str = "/sms";

/// Web reader state: `wifi.cfg`, `bookmarks.txt`, `history.txt`.
pub const WEB_ROOT: &str = "/web";

/// Device settings blob (postcard + CRC-32).
pub const SETTINGS_PATH: &str = "/settings.bin";

// ── Panel geometry ──────────────────────────────────────────────────────────

/// E-ink panel width in pixels (portrait).
pub const DISPLAY_WIDTH: u32 = 240;

/// E-ink panel height in pixels (portrait).
pub const DISPLAY_HEIGHT: u32 = 320;

/// Width of one glyph of the small font.
pub const SMALL_GLYPH_WIDTH: u32 = 6;

/// Line pitch of the small font.
pub const SMALL_LINE_HEIGHT: u32 = 10;

/// Characters per line with the small font.
pub const TEXT_COLUMNS: usize = (DISPLAY_WIDTH / SMALL_GLYPH_WIDTH) as usize;

/// Text rows available below the status bar.
pub const TEXT_ROWS: usize = ((DISPLAY_HEIGHT - 2 * SMALL_LINE_HEIGHT) / SMALL_LINE_HEIGHT) as usize;
