//! Property tests for the line breaker, page index and CP437 fold.

use proptest::prelude::*;
use text::cp437::fold;
use text::wrap::{columns, lines};
use text::PageIndex;

fn prose() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-z]{1,12}",
            Just(" ".to_string()),
            Just("-".to_string()),
            Just("\n".to_string()),
            Just("\r\n".to_string()),
            Just("é".to_string()),
            Just("\u{201C}".to_string()),
        ],
        0..200,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn repaginating_yields_same_offsets(text in prose(), cols in 1usize..60, rows in 1usize..40) {
        let a = PageIndex::build(text.as_bytes(), cols, rows);
        let b = PageIndex::build(text.as_bytes(), cols, rows);
        prop_assert_eq!(a.offsets(), b.offsets());
        prop_assert!(a.offsets().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn no_line_exceeds_column_limit(text in prose(), cols in 1usize..60) {
        let bytes = text.as_bytes();
        let mut prev_next = 0;
        for line in lines(bytes, cols) {
            prop_assert!(columns(&bytes[line.start..line.end]) <= cols);
            prop_assert!(line.start >= prev_next);
            prop_assert!(line.next > line.start || line.next == bytes.len());
            prev_next = line.next;
        }
    }

    #[test]
    fn fold_is_a_function(c in any::<char>()) {
        prop_assert_eq!(fold(c), fold(c));
        if c.is_ascii_graphic() {
            prop_assert_eq!(fold(c), Some(c as u8));
        }
    }
}
