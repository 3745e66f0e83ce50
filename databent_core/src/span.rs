use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open byte range `[start, end)` removed from a buffer.
///
/// Offsets refer to the buffer as it was immediately before this removal,
/// i.e. after every earlier removal of the same call has been applied. To map
/// a list of ranges back onto the untouched input use [`original_spans`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemovedRange {
    pub start: usize,
    pub end: usize,
}

impl RemovedRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start {start} past end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for RemovedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Total number of bytes removed by `ranges`.
pub fn removed_len(ranges: &[RemovedRange]) -> usize {
    ranges.iter().map(RemovedRange::len).sum()
}

/// Re-applies `ranges` in order to `original`, reproducing the corrupted
/// output. Ranges that do not fit the intermediate buffer are clamped.
pub fn replay(original: &[u8], ranges: &[RemovedRange]) -> Vec<u8> {
    let mut data = original.to_vec();
    for range in ranges {
        let end = range.end.min(data.len());
        let start = range.start.min(end);
        data.drain(start..end);
    }
    data
}

/// For each range, the span(s) of the original buffer it removed.
///
/// A later removal can straddle the cut left by an earlier one, in which case
/// it maps to several disjoint original spans, listed in ascending order.
pub fn original_spans(original_len: usize, ranges: &[RemovedRange]) -> Vec<Vec<RemovedRange>> {
    // Surviving pieces of the original, as original-coordinate ranges.
    let mut kept = vec![RemovedRange::new(0, original_len)];
    let mut mapped = Vec::with_capacity(ranges.len());

    for range in ranges {
        let mut spans = Vec::new();
        let mut next_kept = Vec::with_capacity(kept.len() + 1);
        let mut cursor = 0usize;

        for piece in kept {
            let piece_start = cursor;
            let piece_end = cursor + piece.len();
            cursor = piece_end;

            let cut_start = range.start.clamp(piece_start, piece_end);
            let cut_end = range.end.clamp(piece_start, piece_end);
            if cut_start >= cut_end {
                next_kept.push(piece);
                continue;
            }

            let orig_cut_start = piece.start + (cut_start - piece_start);
            let orig_cut_end = piece.start + (cut_end - piece_start);
            spans.push(RemovedRange::new(orig_cut_start, orig_cut_end));

            if piece.start < orig_cut_start {
                next_kept.push(RemovedRange::new(piece.start, orig_cut_start));
            }
            if orig_cut_end < piece.end {
                next_kept.push(RemovedRange::new(orig_cut_end, piece.end));
            }
        }

        kept = next_kept;
        mapped.push(spans);
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    #[test]
    fn replay_applies_ranges_against_shrinking_buffer() {
        let original = numbered(10);
        // Second range is relative to the 8-byte buffer left by the first.
        let ranges = [RemovedRange::new(2, 4), RemovedRange::new(2, 3)];
        assert_eq!(replay(&original, &ranges), vec![0, 1, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn replay_tolerates_empty_and_out_of_bounds_ranges() {
        let original = numbered(4);
        let ranges = [RemovedRange::new(1, 1), RemovedRange::new(3, 10)];
        assert_eq!(replay(&original, &ranges), vec![0, 1, 2]);
        assert_eq!(removed_len(&[RemovedRange::new(1, 1)]), 0);
    }

    #[test]
    fn original_spans_follow_shifted_offsets() {
        let ranges = [RemovedRange::new(2, 4), RemovedRange::new(2, 3)];
        let spans = original_spans(10, &ranges);
        assert_eq!(spans[0], vec![RemovedRange::new(2, 4)]);
        assert_eq!(spans[1], vec![RemovedRange::new(4, 5)]);
    }

    #[test]
    fn original_spans_split_when_straddling_an_earlier_cut() {
        // [3, 5) then [1, 5) in the 8-byte buffer covers original 1..3 and 5..7.
        let ranges = [RemovedRange::new(3, 5), RemovedRange::new(1, 5)];
        let spans = original_spans(10, &ranges);
        assert_eq!(
            spans[1],
            vec![RemovedRange::new(1, 3), RemovedRange::new(5, 7)]
        );

        for (range, pieces) in ranges.iter().zip(&spans) {
            assert_eq!(removed_len(pieces), range.len());
        }

        let original = numbered(10);
        let survivors = replay(&original, &ranges);
        assert_eq!(survivors, vec![0, 7, 8, 9]);
    }

    #[test]
    fn display_uses_rust_range_notation() {
        assert_eq!(RemovedRange::new(3, 7).to_string(), "3..7");
    }
}
