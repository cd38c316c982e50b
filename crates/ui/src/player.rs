//! Audiobook player view-model.
//!
//! Everything the player screen prints is derived here once per render from
//! a snapshot of the pipeline, so the drawing code never recomputes chapter
//! or time state mid-frame.

use core::fmt::Write as _;
use heapless::String;

/// Player state as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
    /// No stream open.
    Stopped,
    /// Decoding.
    Playing,
    /// Stream open, decoder paused.
    Paused,
}

impl PlaybackState {
    /// Label on the status line.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
        }
    }
}

/// Pipeline snapshot the view-model is built from.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSnapshot<'a> {
    /// Current state.
    pub state: PlaybackState,
    /// Position in whole seconds; 0 before the stream starts.
    pub position_s: u32,
    /// Position the chapter indicator refers to. Before play this is the
    /// bookmark the stream will resume from.
    pub chapter_at_s: u32,
    /// Duration in whole seconds; 0 while the header is unparsed.
    pub duration_s: u32,
    /// Chapter start offsets in seconds, ascending.
    pub chapters: &'a [u32],
    /// Volume step (0..=21).
    pub volume: u8,
    /// Remaining sleep-timer time, if armed.
    pub sleep_remaining_ms: Option<u64>,
}

/// Strings the player screen draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    /// `"Ch 2/3"`; empty when the book has no chapters.
    pub chapter: String<16>,
    /// State label.
    pub state: &'static str,
    /// `"8:17/20:34"`.
    pub time: String<24>,
    /// `"Sleep 44m"` or empty.
    pub sleep: String<16>,
    /// `"Vol 10"`.
    pub volume: String<8>,
    /// Progress bar fill in 1/1000.
    pub progress_permille: u16,
}

/// One-based index of the chapter containing `position_s`.
pub fn chapter_index(chapters: &[u32], position_s: u32) -> Option<usize> {
    if chapters.is_empty() {
        return None;
    }
    let idx = chapters.iter().rposition(|&start| start <= position_s).unwrap_or(0);
    Some(idx.saturating_add(1))
}

/// Format seconds as `m:ss`, or `h:mm:ss` when `long` is set.
pub fn format_time<const N: usize>(out: &mut String<N>, seconds: u32, long: bool) {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    let _ = if long {
        write!(out, "{}:{:02}:{:02}", h, m, s)
    } else {
        write!(out, "{}:{:02}", seconds / 60, s)
    };
}

impl PlayerView {
    /// Build the view for one frame.
    pub fn build(snap: &PlayerSnapshot<'_>) -> Self {
        let mut chapter = String::new();
        if let Some(i) = chapter_index(snap.chapters, snap.chapter_at_s) {
            let _ = write!(chapter, "Ch {}/{}", i, snap.chapters.len());
        }

        let long = snap.duration_s >= 3600;
        let mut time = String::new();
        format_time(&mut time, snap.position_s, long);
        let _ = time.push('/');
        format_time(&mut time, snap.duration_s, long);

        let mut sleep = String::new();
        if let Some(ms) = snap.sleep_remaining_ms {
            let minutes = ms.div_ceil(60_000);
            let _ = write!(sleep, "Sleep {}m", minutes);
        }

        let mut volume = String::new();
        let _ = write!(volume, "Vol {}", snap.volume);

        let progress_permille = if snap.duration_s == 0 {
            0
        } else {
            let p = u64::from(snap.position_s.min(snap.duration_s)) * 1000 / u64::from(snap.duration_s);
            u16::try_from(p).unwrap_or(1000)
        };

        Self {
            chapter,
            state: snap.state.label(),
            time,
            sleep,
            volume,
            progress_permille,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTERS: [u32; 3] = [0, 400, 900];

    fn snap(state: PlaybackState, position_s: u32) -> PlayerSnapshot<'static> {
        PlayerSnapshot {
            state,
            position_s,
            chapter_at_s: position_s,
            duration_s: 1234,
            chapters: &CHAPTERS,
            volume: 10,
            sleep_remaining_ms: None,
        }
    }

    #[test]
    fn test_opened_book_before_play() {
        let mut s = snap(PlaybackState::Stopped, 0);
        s.chapter_at_s = 497;
        let v = PlayerView::build(&s);
        assert_eq!(v.chapter.as_str(), "Ch 2/3");
        assert_eq!(v.state, "Stopped");
        assert_eq!(v.time.as_str(), "0:00/20:34");
        assert_eq!(v.volume.as_str(), "Vol 10");
        assert!(v.sleep.is_empty());
    }

    #[test]
    fn test_chapter_boundaries() {
        assert_eq!(chapter_index(&CHAPTERS, 399), Some(1));
        assert_eq!(chapter_index(&CHAPTERS, 497), Some(2));
        assert_eq!(chapter_index(&CHAPTERS, 900), Some(3));
        assert_eq!(chapter_index(&[], 10), None);
    }

    #[test]
    fn test_long_durations_use_hours() {
        let mut s: String<16> = String::new();
        format_time(&mut s, 3725, true);
        assert_eq!(s.as_str(), "1:02:05");
        s.clear();
        format_time(&mut s, 3725, false);
        assert_eq!(s.as_str(), "62:05");
    }

    #[test]
    fn test_sleep_label_rounds_up() {
        let mut s = snap(PlaybackState::Playing, 500);
        s.sleep_remaining_ms = Some(45 * 60_000 - 1);
        let v = PlayerView::build(&s);
        assert_eq!(v.sleep.as_str(), "Sleep 45m");
        assert_eq!(v.state, "Playing");
        assert_eq!(v.chapter.as_str(), "Ch 2/3");
    }

    #[test]
    fn test_progress_clamped() {
        let v = PlayerView::build(&snap(PlaybackState::Paused, 5000));
        assert_eq!(v.progress_permille, 1000);
        let mut s = snap(PlaybackState::Paused, 10);
        s.duration_s = 0;
        assert_eq!(PlayerView::build(&s).progress_permille, 0);
    }
}
