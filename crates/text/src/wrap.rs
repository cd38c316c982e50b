//! Greedy line breaker.
//!
//! Works on UTF-8 bytes and counts columns in characters: continuation bytes
//! (`0b10xx_xxxx`) occupy no column. A line ends at `\n`, `\r` or `\r\n`, or
//! when the column limit is reached. Overlong lines break after the last
//! space/tab, or just after a `-` inside a word; a token with no break
//! opportunity is cut mid-token. Spaces and tabs at the start of a wrapped
//! continuation line are skipped.

/// One displayed line: `text[start..end]`, with the following line
/// beginning at `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    /// First byte of the line.
    pub start: usize,
    /// One past the last displayed byte (excludes the line terminator).
    pub end: usize,
    /// First byte of the following line.
    pub next: usize,
}

#[inline]
fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

#[inline]
fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn skip_blanks(text: &[u8], mut i: usize) -> usize {
    while text.get(i).copied().is_some_and(is_blank) {
        i += 1;
    }
    i
}

/// Number of displayed columns in `bytes`.
pub fn columns(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| !is_continuation(**b)).count()
}

/// Lay out the line that begins at `start`.
///
/// `cols` is clamped to at least one. When `start` is at or past the end of
/// `text` the returned span is empty with `next == text.len()`.
#[allow(clippy::arithmetic_side_effects)] // indices bounded by text.len()
pub fn next_line(text: &[u8], start: usize, cols: usize) -> LineSpan {
    let cols = cols.max(1);
    let len = text.len();
    if start >= len {
        return LineSpan {
            start: len,
            end: len,
            next: len,
        };
    }

    let mut col = 0usize;
    // (end of this line, start of the next) at the last break opportunity.
    let mut last_break: Option<(usize, usize)> = None;
    let mut i = start;

    while let Some(&b) = text.get(i) {
        match b {
            b'\n' => {
                return LineSpan {
                    start,
                    end: i,
                    next: i + 1,
                }
            }
            b'\r' => {
                let next = if text.get(i + 1) == Some(&b'\n') { i + 2 } else { i + 1 };
                return LineSpan { start, end: i, next };
            }
            _ if is_continuation(b) => {
                i += 1;
                continue;
            }
            _ => {}
        }

        if col == cols {
            if is_blank(b) {
                return LineSpan {
                    start,
                    end: i,
                    next: skip_blanks(text, i),
                };
            }
            return match last_break {
                Some((end, next)) => LineSpan {
                    start,
                    end,
                    next: skip_blanks(text, next),
                },
                None => LineSpan {
                    start,
                    end: i,
                    next: i,
                },
            };
        }

        if is_blank(b) {
            last_break = Some((i, i + 1));
        } else if b == b'-' && col > 0 {
            let prev_word = i > start && text.get(i - 1).is_some_and(|p| !is_blank(*p));
            let next_word = text
                .get(i + 1)
                .is_some_and(|n| !is_blank(*n) && *n != b'\n' && *n != b'\r');
            if prev_word && next_word {
                last_break = Some((i + 1, i + 1));
            }
        }
        col += 1;
        i += 1;
    }

    LineSpan {
        start,
        end: len,
        next: len,
    }
}

/// Iterator over the displayed lines of a buffer.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    text: &'a [u8],
    pos: usize,
    cols: usize,
}

impl Iterator for Lines<'_> {
    type Item = LineSpan;

    fn next(&mut self) -> Option<LineSpan> {
        if self.pos >= self.text.len() {
            return None;
        }
        let span = next_line(self.text, self.pos, self.cols);
        // Guarantee progress even for pathological input.
        self.pos = if span.next > self.pos { span.next } else { self.pos + 1 };
        Some(span)
    }
}

/// All displayed lines of `text` at `cols` columns.
pub fn lines(text: &[u8], cols: usize) -> Lines<'_> {
    Lines { text, pos: 0, cols }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(text: &str, cols: usize) -> Vec<&str> {
        lines(text.as_bytes(), cols)
            .map(|l| &text[l.start..l.end])
            .collect()
    }

    #[test]
    fn test_wraps_at_last_space() {
        assert_eq!(render("the quick brown fox", 10), ["the quick", "brown fox"]);
    }

    #[test]
    fn test_skips_leading_blanks_on_continuation() {
        assert_eq!(render("aaaa    bbbb", 4), ["aaaa", "bbbb"]);
    }

    #[test]
    fn test_breaks_after_hyphen_inside_word() {
        assert_eq!(render("well-known fact", 8), ["well-", "known", "fact"]);
    }

    #[test]
    fn test_leading_hyphen_is_not_a_break() {
        assert_eq!(render("-abcdef", 4), ["-abc", "def"]);
    }

    #[test]
    fn test_hard_break_without_opportunity() {
        assert_eq!(render("abcdefghij", 4), ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_newline_variants() {
        assert_eq!(render("a\nb\r\nc\rd", 10), ["a", "b", "c", "d"]);
        assert_eq!(render("a\n\nb", 10), ["a", "", "b"]);
    }

    #[test]
    fn test_continuation_bytes_take_no_column() {
        // "é" is two bytes, one column.
        assert_eq!(render("ééé ééé", 3), ["ééé", "ééé"]);
        assert_eq!(columns("añb".as_bytes()), 3);
    }

    #[test]
    fn test_exact_fit_followed_by_newline() {
        assert_eq!(render("abcd\nef", 4), ["abcd", "ef"]);
    }

    #[test]
    fn test_empty_input_has_no_lines() {
        assert_eq!(render("", 10).len(), 0);
        let span = next_line(b"", 0, 10);
        assert_eq!((span.start, span.end, span.next), (0, 0, 0));
    }

    #[test]
    fn test_zero_columns_is_clamped() {
        assert_eq!(render("ab", 0), ["a", "b"]);
    }
}
