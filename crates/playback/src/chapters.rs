//! Chapter navigation over a sorted list of start offsets.

/// Index of the chapter containing `pos_s`.
pub fn index_at(starts: &[u32], pos_s: u32) -> Option<usize> {
    if starts.is_empty() {
        return None;
    }
    Some(starts.iter().rposition(|s| *s <= pos_s).unwrap_or(0))
}

/// Start of the chapter after the one containing `pos_s`.
pub fn next_start(starts: &[u32], pos_s: u32) -> Option<u32> {
    let i = index_at(starts, pos_s)?;
    starts.get(i.checked_add(1)?).copied()
}

/// Start of the chapter before the one containing `pos_s` (the first
/// chapter's start when already in it).
pub fn prev_start(starts: &[u32], pos_s: u32) -> Option<u32> {
    let i = index_at(starts, pos_s)?;
    starts.get(i.saturating_sub(1)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTS: [u32; 3] = [0, 400, 900];

    #[test]
    fn test_next_and_prev() {
        assert_eq!(next_start(&STARTS, 497), Some(900));
        assert_eq!(next_start(&STARTS, 900), None);
        assert_eq!(prev_start(&STARTS, 497), Some(0));
        assert_eq!(prev_start(&STARTS, 10), Some(0));
        assert_eq!(next_start(&[], 10), None);
    }
}
