//! Key bytes and sticky modifiers.
//!
//! The keyboard delivers one byte per key. Modifier keys latch: the next key
//! is combined with the latched modifier and the latch clears. Combining
//! happens here, before routing, so screens only ever see final bytes.

/// Backspace.
pub const KEY_BACKSPACE: u8 = 0x08;
/// Enter.
pub const KEY_ENTER: u8 = 0x0D;
/// Shift+Backspace.
pub const KEY_SHIFT_BACKSPACE: u8 = 0x18;
/// Emoji picker key.
pub const KEY_EMOJI: u8 = 0x01;
/// Escape: emergency exit to Home.
pub const KEY_ESCAPE: u8 = 0x1B;
/// Arrow down.
pub const KEY_DOWN: u8 = 0xF1;
/// Arrow up.
pub const KEY_UP: u8 = 0xF2;
/// Arrow left.
pub const KEY_LEFT: u8 = 0xF3;
/// Arrow right.
pub const KEY_RIGHT: u8 = 0xF4;
/// Power button.
pub const KEY_POWER: u8 = 0xF5;
/// Home button.
pub const KEY_HOME: u8 = 0xF6;

/// Direction of an arrow or WASD key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Nav {
    /// Up / `W`.
    Up,
    /// Down / `S`.
    Down,
    /// Left / `A`.
    Left,
    /// Right / `D`.
    Right,
}

/// Coarse class of a key byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyClass {
    /// 0x20..=0x7E.
    Printable(u8),
    /// 0x08.
    Backspace,
    /// 0x0D.
    Enter,
    /// 0x18.
    ShiftBackspace,
    /// 0xF1..=0xF4.
    Arrow(Nav),
    /// 0x01.
    Emoji,
    /// Anything else.
    Other(u8),
}

/// Classify a key byte.
pub fn classify(key: u8) -> KeyClass {
    match key {
        0x20..=0x7E => KeyClass::Printable(key),
        KEY_BACKSPACE => KeyClass::Backspace,
        KEY_ENTER => KeyClass::Enter,
        KEY_SHIFT_BACKSPACE => KeyClass::ShiftBackspace,
        KEY_DOWN => KeyClass::Arrow(Nav::Down),
        KEY_UP => KeyClass::Arrow(Nav::Up),
        KEY_LEFT => KeyClass::Arrow(Nav::Left),
        KEY_RIGHT => KeyClass::Arrow(Nav::Right),
        KEY_EMOJI => KeyClass::Emoji,
        other => KeyClass::Other(other),
    }
}

/// Navigation meaning of a key: arrows, and `W/A/S/D` in either case.
///
/// Screens with a text field must check for text input first.
pub fn nav(key: u8) -> Option<Nav> {
    match key {
        KEY_UP | b'w' | b'W' => Some(Nav::Up),
        KEY_DOWN | b's' | b'S' => Some(Nav::Down),
        KEY_LEFT | b'a' | b'A' => Some(Nav::Left),
        KEY_RIGHT | b'd' | b'D' => Some(Nav::Right),
        _ => None,
    }
}

/// Arrow keys only (for screens where WASD are text).
pub fn arrow(key: u8) -> Option<Nav> {
    match classify(key) {
        KeyClass::Arrow(n) => Some(n),
        _ => None,
    }
}

/// `true` for `q`/`Q`, the back key.
pub fn is_back(key: u8) -> bool {
    key == b'q' || key == b'Q'
}

/// A latching modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Modifier {
    /// Upper case; turns backspace into 0x18.
    Shift,
    /// Symbol layer.
    Alt,
    /// Arrow layer on WASD; symbol layer elsewhere.
    Sym,
}

/// Raw byte a matrix scanner emits for the shift key.
pub const RAW_SHIFT: u8 = 0xE0;
/// Raw byte for the alt key.
pub const RAW_ALT: u8 = 0xE1;
/// Raw byte for the sym key.
pub const RAW_SYM: u8 = 0xE2;

/// Symbols printed on the keys (alt layer), indexed by letter.
const ALT_LAYER: [u8; 26] = [
    b'*', b'!', b'9', b'5', b'2', b'6', b'/', b':', b'-', b';', b'\'', b'"', b'.', // a..m
    b',', b'+', b'@', b'#', b'3', b'4', b'(', b'_', b'?', b'1', b'8', b')', b'7', // n..z
];

/// Sticky modifier latches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    shift: bool,
    alt: bool,
    sym: bool,
}

impl Modifiers {
    /// Nothing latched.
    pub const fn new() -> Self {
        Self {
            shift: false,
            alt: false,
            sym: false,
        }
    }

    /// Latch a modifier; pressing it again while latched releases it.
    pub fn latch(&mut self, m: Modifier) {
        let flag = match m {
            Modifier::Shift => &mut self.shift,
            Modifier::Alt => &mut self.alt,
            Modifier::Sym => &mut self.sym,
        };
        *flag = !*flag;
    }

    /// Feed one raw byte: modifier keys latch and yield nothing, any other
    /// key comes back combined.
    pub fn feed(&mut self, raw: u8) -> Option<u8> {
        match raw {
            RAW_SHIFT => self.latch(Modifier::Shift),
            RAW_ALT => self.latch(Modifier::Alt),
            RAW_SYM => self.latch(Modifier::Sym),
            _ => return Some(self.apply(raw)),
        }
        None
    }

    /// `true` if any latch is set.
    pub fn any(&self) -> bool {
        self.shift || self.alt || self.sym
    }

    /// Combine `base` with the latches and clear them.
    pub fn apply(&mut self, base: u8) -> u8 {
        let out = self.combine(base);
        *self = Self::new();
        out
    }

    fn combine(&self, base: u8) -> u8 {
        let lower = base.to_ascii_lowercase();
        if self.sym {
            match lower {
                b'w' => return KEY_UP,
                b'a' => return KEY_LEFT,
                b's' => return KEY_DOWN,
                b'd' => return KEY_RIGHT,
                _ => {}
            }
        }
        if self.alt || self.sym {
            if lower.is_ascii_lowercase() {
                let idx = usize::from(lower.saturating_sub(b'a'));
                return ALT_LAYER.get(idx).copied().unwrap_or(base);
            }
            if base == b' ' {
                return b'\t';
            }
        }
        if self.shift {
            return match base {
                KEY_BACKSPACE => KEY_SHIFT_BACKSPACE,
                b if b.is_ascii_lowercase() => b.to_ascii_uppercase(),
                b => b,
            };
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(b'a'), KeyClass::Printable(b'a'));
        assert_eq!(classify(0x18), KeyClass::ShiftBackspace);
        assert_eq!(classify(0xF1), KeyClass::Arrow(Nav::Down));
        assert_eq!(classify(0xF2), KeyClass::Arrow(Nav::Up));
        assert_eq!(classify(0x01), KeyClass::Emoji);
        assert_eq!(classify(0xF6), KeyClass::Other(0xF6));
    }

    #[test]
    fn test_wasd_navigation() {
        assert_eq!(nav(b'W'), Some(Nav::Up));
        assert_eq!(nav(b'd'), Some(Nav::Right));
        assert_eq!(nav(b'x'), None);
        assert_eq!(arrow(b'w'), None);
    }

    #[test]
    fn test_shift_consumed_by_next_key() {
        let mut m = Modifiers::new();
        m.latch(Modifier::Shift);
        assert_eq!(m.apply(b'h'), b'H');
        assert!(!m.any());
        assert_eq!(m.apply(b'i'), b'i');
    }

    #[test]
    fn test_shift_backspace() {
        let mut m = Modifiers::new();
        m.latch(Modifier::Shift);
        assert_eq!(m.apply(KEY_BACKSPACE), KEY_SHIFT_BACKSPACE);
    }

    #[test]
    fn test_alt_layer_and_sym_arrows() {
        let mut m = Modifiers::new();
        m.latch(Modifier::Alt);
        assert_eq!(m.apply(b'q'), b'#');
        m.latch(Modifier::Alt);
        assert_eq!(m.apply(b'p'), b'@');
        m.latch(Modifier::Sym);
        assert_eq!(m.apply(b's'), KEY_DOWN);
        m.latch(Modifier::Sym);
        assert_eq!(m.apply(b'z'), b'7');
    }

    #[test]
    fn test_feed_raw_stream() {
        let mut m = Modifiers::new();
        let out: Vec<u8> = [RAW_SHIFT, b'a', b'b', RAW_ALT, b'w']
            .into_iter()
            .filter_map(|k| m.feed(k))
            .collect();
        assert_eq!(out, [b'A', b'b', b'1']);
    }

    #[test]
    fn test_double_latch_releases() {
        let mut m = Modifiers::new();
        m.latch(Modifier::Shift);
        m.latch(Modifier::Shift);
        assert!(!m.any());
    }
}
