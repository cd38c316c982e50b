//! Unicode → CP437 folding for the bitmap font.
//!
//! ASCII passes through. Accented Latin letters and a few symbols map to
//! their CP437 code points. Typographic punctuation folds to the nearest
//! ASCII or CP437 glyph. Zero-width and combining characters are dropped;
//! anything else becomes a space.

/// CP437 code points 0x80..=0xFF that have a Unicode counterpart we emit.
const HIGH: [(char, u8); 56] = [
    ('Ç', 0x80),
    ('ü', 0x81),
    ('é', 0x82),
    ('â', 0x83),
    ('ä', 0x84),
    ('à', 0x85),
    ('å', 0x86),
    ('ç', 0x87),
    ('ê', 0x88),
    ('ë', 0x89),
    ('è', 0x8A),
    ('ï', 0x8B),
    ('î', 0x8C),
    ('ì', 0x8D),
    ('Ä', 0x8E),
    ('Å', 0x8F),
    ('É', 0x90),
    ('æ', 0x91),
    ('Æ', 0x92),
    ('ô', 0x93),
    ('ö', 0x94),
    ('ò', 0x95),
    ('û', 0x96),
    ('ù', 0x97),
    ('ÿ', 0x98),
    ('Ö', 0x99),
    ('Ü', 0x9A),
    ('¢', 0x9B),
    ('£', 0x9C),
    ('¥', 0x9D),
    ('ƒ', 0x9F),
    ('á', 0xA0),
    ('í', 0xA1),
    ('ó', 0xA2),
    ('ú', 0xA3),
    ('ñ', 0xA4),
    ('Ñ', 0xA5),
    ('ª', 0xA6),
    ('º', 0xA7),
    ('¿', 0xA8),
    ('¬', 0xAA),
    ('½', 0xAB),
    ('¼', 0xAC),
    ('¡', 0xAD),
    ('«', 0xAE),
    ('»', 0xAF),
    ('ß', 0xE1),
    ('µ', 0xE6),
    ('±', 0xF1),
    ('÷', 0xF6),
    ('°', 0xF8),
    ('·', 0xFA),
    ('²', 0xFD),
    ('■', 0xFE),
    ('Σ', 0xE4),
    ('π', 0xE3),
];

/// CP437 bullet glyph (0x07 in the font's low range).
pub const BULLET: u8 = 0x07;

/// Fold one character onto the font's glyph set.
///
/// Returns `None` for characters that take no space on screen.
pub fn fold(c: char) -> Option<u8> {
    if c.is_ascii() {
        return match c {
            '\t' => Some(b' '),
            c if c.is_ascii_control() && c != '\n' && c != '\r' => None,
            c => Some(c as u8),
        };
    }
    if let Some((_, b)) = HIGH.iter().find(|(u, _)| *u == c) {
        return Some(*b);
    }
    let folded = match c {
        '\u{00A0}' | '\u{2002}'..='\u{200A}' | '\u{202F}' | '\u{3000}' => b' ',
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' | '\u{00B4}' => b'\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => b'"',
        '\u{2010}'..='\u{2015}' | '\u{2212}' => b'-',
        '\u{2026}' => b'.',
        '\u{2022}' | '\u{25CF}' | '\u{2023}' => BULLET,
        '\u{2039}' => b'<',
        '\u{203A}' => b'>',
        '\u{00D7}' => b'x',
        '\u{00A9}' => b'c',
        '\u{00AE}' => b'r',
        '\u{2122}' => b't',
        '\u{00C0}'..='\u{00C3}' => b'A',
        '\u{00C8}' | '\u{00CA}' | '\u{00CB}' => b'E',
        '\u{00CC}'..='\u{00CF}' => b'I',
        '\u{00D2}'..='\u{00D5}' | '\u{00D8}' => b'O',
        '\u{00D9}'..='\u{00DB}' => b'U',
        '\u{00DD}' => b'Y',
        '\u{00E3}' => 0x83,
        '\u{00F5}' | '\u{00F8}' => 0x94,
        '\u{00FD}' => 0x98,
        // Zero-width, combining and byte-order marks.
        '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}' | '\u{0300}'..='\u{036F}' => {
            return None
        }
        _ => b' ',
    };
    Some(folded)
}

/// Fold a string, calling `emit` for each output byte.
pub fn fold_str(s: &str, mut emit: impl FnMut(u8)) {
    for c in s.chars() {
        if let Some(b) = fold(c) {
            emit(b);
        }
    }
}

/// Fold a string into a fixed buffer, truncating when full.
pub fn fold_into<const N: usize>(s: &str, out: &mut heapless::Vec<u8, N>) {
    fold_str(s, |b| {
        let _ = out.push(b);
    });
}

/// The character drawn for CP437 byte `b`.
///
/// Inverse of [`fold`] on the bytes it produces; unknown high bytes render
/// as `?`.
pub fn glyph(b: u8) -> char {
    if b.is_ascii() {
        return if b == BULLET { '\u{2022}' } else { b as char };
    }
    HIGH.iter()
        .find(|(_, code)| *code == b)
        .map_or('?', |(u, _)| *u)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        for b in 0x20u8..0x7F {
            assert_eq!(fold(b as char), Some(b));
        }
    }

    #[test]
    fn test_accented_latin() {
        assert_eq!(fold('é'), Some(0x82));
        assert_eq!(fold('Ñ'), Some(0xA5));
        assert_eq!(fold('ß'), Some(0xE1));
    }

    #[test]
    fn test_typography_folds() {
        assert_eq!(fold('\u{201C}'), Some(b'"'));
        assert_eq!(fold('\u{2019}'), Some(b'\''));
        assert_eq!(fold('\u{2014}'), Some(b'-'));
        assert_eq!(fold('\u{2013}'), Some(b'-'));
        assert_eq!(fold('\u{2026}'), Some(b'.'));
        assert_eq!(fold('\u{2022}'), Some(BULLET));
        assert_eq!(fold('\u{00A0}'), Some(b' '));
    }

    #[test]
    fn test_unmappable_is_space_or_dropped() {
        assert_eq!(fold('漢'), Some(b' '));
        assert_eq!(fold('\u{200B}'), None);
        assert_eq!(fold('\u{0301}'), None);
    }

    #[test]
    fn test_glyph_inverts_table() {
        for (u, b) in HIGH {
            assert_eq!(glyph(b), u);
        }
        assert_eq!(glyph(b'A'), 'A');
    }

    #[test]
    fn test_fold_into_truncates() {
        let mut out: heapless::Vec<u8, 4> = heapless::Vec::new();
        fold_into("café au lait", &mut out);
        assert_eq!(out.as_slice(), &[b'c', b'a', b'f', 0x82]);
    }
}
