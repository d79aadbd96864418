//! Byte-ordered key ranges.
//!
//! Every scan against a [`Storage`](crate::Storage) backend is expressed as a
//! [`BytesRange`]. Keys compare by their raw bytes, so prefix scans are
//! bounded above by the lexicographic successor of the prefix.

use std::ops::Bound::{self, Excluded, Included, Unbounded};
use std::ops::RangeBounds;

use bytes::{Bytes, BytesMut};

/// Returns the smallest byte string that sorts after every string starting
/// with `data`, or `None` when no such bound exists (empty or all `0xFF`).
///
/// Trailing `0xFF` bytes are dropped and the last remaining byte is bumped:
///
/// - `b"ab"` → `b"ac"`
/// - `[0x00, 0x61, 0x00]` → `[0x00, 0x61, 0x01]`
/// - `[0x61, 0xFF]` → `[0x62]`
pub fn lex_increment(data: &[u8]) -> Option<Bytes> {
    let last = data.iter().rposition(|&b| b != 0xFF)?;
    let mut successor = BytesMut::from(&data[..=last]);
    successor[last] += 1;
    Some(successor.freeze())
}

/// A range over byte keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesRange {
    pub start: Bound<Bytes>,
    pub end: Bound<Bytes>,
}

impl BytesRange {
    pub fn new(start: Bound<Bytes>, end: Bound<Bytes>) -> Self {
        Self { start, end }
    }

    /// The half-open range `[start, end)`.
    pub fn half_open(start: Bytes, end: Bytes) -> Self {
        Self::new(Included(start), Excluded(end))
    }

    /// All keys that start with `prefix`. An empty prefix covers everything.
    pub fn prefix(prefix: Bytes) -> Self {
        if prefix.is_empty() {
            return Self::unbounded();
        }
        let end = match lex_increment(&prefix) {
            Some(successor) => Excluded(successor),
            None => Unbounded,
        };
        Self::new(Included(prefix), end)
    }

    pub fn unbounded() -> Self {
        Self::new(Unbounded, Unbounded)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let above_start = match &self.start {
            Included(s) => key >= s.as_ref(),
            Excluded(s) => key > s.as_ref(),
            Unbounded => true,
        };
        let below_end = match &self.end {
            Included(e) => key <= e.as_ref(),
            Excluded(e) => key < e.as_ref(),
            Unbounded => true,
        };
        above_start && below_end
    }

    /// Returns true if no key can fall inside the range.
    ///
    /// Ordered maps panic when asked for an inverted range, so backends check
    /// this before iterating.
    pub fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Unbounded, _) | (_, Unbounded) => false,
            (Included(s), Included(e)) => s > e,
            (Included(s), Excluded(e)) | (Excluded(s), Included(e)) => s >= e,
            (Excluded(s), Excluded(e)) => s >= e,
        }
    }
}

impl RangeBounds<Bytes> for BytesRange {
    fn start_bound(&self) -> Bound<&Bytes> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&Bytes> {
        self.end.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn should_bound_every_extension_of_a_prefix(prefix: Vec<u8>, suffix: Vec<u8>) {
            prop_assume!(!prefix.is_empty());

            let range = BytesRange::prefix(Bytes::from(prefix.clone()));
            let mut extended = prefix.clone();
            extended.extend(&suffix);

            prop_assert!(range.contains(&prefix));
            prop_assert!(range.contains(&extended));
        }

        #[test]
        fn should_exclude_keys_without_the_prefix(prefix: Vec<u8>, other: Vec<u8>) {
            prop_assume!(!prefix.is_empty() && !other.starts_with(&prefix));

            let range = BytesRange::prefix(Bytes::from(prefix));

            prop_assert!(!range.contains(&other));
        }
    }

    #[test]
    fn should_increment_last_byte() {
        assert_eq!(lex_increment(b"key07").unwrap().as_ref(), b"key08");
        assert_eq!(lex_increment(&[0x00, 0x61, 0x00]).unwrap().as_ref(), &[0x00, 0x61, 0x01]);
    }

    #[test]
    fn should_drop_trailing_ff_when_incrementing() {
        assert_eq!(lex_increment(&[0x61, 0xFF, 0xFF]).unwrap().as_ref(), &[0x62]);
    }

    #[test]
    fn should_not_increment_empty_or_saturated_input() {
        assert!(lex_increment(&[]).is_none());
        assert!(lex_increment(&[0xFF, 0xFF]).is_none());
    }

    #[test]
    fn should_treat_half_open_range_end_as_exclusive() {
        // given
        let range = BytesRange::half_open(Bytes::from("key07"), Bytes::from("key14"));

        // then
        assert!(range.contains(b"key07"));
        assert!(range.contains(b"key13"));
        assert!(!range.contains(b"key14"));
        assert!(!range.contains(b"key06"));
    }

    #[test]
    fn should_leave_saturated_prefix_unbounded_above() {
        let range = BytesRange::prefix(Bytes::from_static(&[0xFF]));

        assert_eq!(range.end, Unbounded);
        assert!(range.contains(&[0xFF, 0xFF, 0x01]));
        assert!(!range.contains(&[0xFE]));
    }

    #[test]
    fn should_detect_empty_and_inverted_ranges() {
        let a = Bytes::from("a");
        let b = Bytes::from("b");

        assert!(BytesRange::half_open(b.clone(), a.clone()).is_empty());
        assert!(BytesRange::half_open(a.clone(), a.clone()).is_empty());
        assert!(!BytesRange::new(Included(a.clone()), Included(a.clone())).is_empty());
        assert!(!BytesRange::half_open(a, b).is_empty());
        assert!(!BytesRange::unbounded().is_empty());
    }
}
