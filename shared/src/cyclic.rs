//! Unbounded cursor over a finite, mutable collection.
//!
//! The stored cursor is never wrapped. It only gets folded into `[0, len)`
//! when read, so the sign of a difference between two cursor values always
//! tells the direction of travel, however many laps have been made.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("cannot index into an empty collection")]
    EmptyCollection,
}

/// Folds any signed index into `[0, len)`.
pub fn wrap(index: i64, len: usize) -> Result<usize, IndexError> {
    if len == 0 {
        return Err(IndexError::EmptyCollection);
    }
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let wrapped = index.rem_euclid(len);
    // rem_euclid with a positive modulus is always in [0, len)
    Ok(usize::try_from(wrapped).unwrap_or(0))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclicCardIndex {
    cursor: i64,
}

impl CyclicCardIndex {
    #[must_use]
    pub const fn new(cursor: i64) -> Self {
        Self { cursor }
    }

    #[must_use]
    pub const fn raw(self) -> i64 {
        self.cursor
    }

    pub fn advance(&mut self, by: i64) {
        self.cursor = self.cursor.saturating_add(by);
    }

    pub fn set(&mut self, cursor: i64) {
        self.cursor = cursor;
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn position(self, len: usize) -> Result<usize, IndexError> {
        wrap(self.cursor, len)
    }

    /// Collection position of the card `relative_offset` steps from the cursor.
    pub fn position_at(self, relative_offset: i64, len: usize) -> Result<usize, IndexError> {
        wrap(self.cursor.saturating_add(relative_offset), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_empty_is_error() {
        assert_eq!(wrap(0, 0), Err(IndexError::EmptyCollection));
        assert_eq!(wrap(-7, 0), Err(IndexError::EmptyCollection));
    }

    #[test]
    fn test_wrap_negative_indices() {
        assert_eq!(wrap(-1, 3), Ok(2));
        assert_eq!(wrap(-3, 3), Ok(0));
        assert_eq!(wrap(-4, 3), Ok(2));
        assert_eq!(wrap(7, 3), Ok(1));
    }

    #[test]
    fn test_advance_does_not_wrap_stored_cursor() {
        let mut index = CyclicCardIndex::default();
        index.advance(1);
        index.advance(1);
        index.advance(1);
        assert_eq!(index.raw(), 3);
        assert_eq!(index.position(3), Ok(0));

        index.advance(-5);
        assert_eq!(index.raw(), -2);
        assert_eq!(index.position(3), Ok(1));
    }

    #[test]
    fn test_position_at_offset() {
        let index = CyclicCardIndex::new(4);
        assert_eq!(index.position_at(-1, 5), Ok(3));
        assert_eq!(index.position_at(1, 5), Ok(0));
        assert_eq!(index.position_at(2, 0), Err(IndexError::EmptyCollection));
    }

    proptest! {
        #[test]
        fn wrap_is_in_range(index in any::<i64>(), len in 1usize..10_000) {
            let wrapped = wrap(index, len).unwrap();
            prop_assert!(wrapped < len);
        }

        #[test]
        fn wrap_is_periodic(index in -1_000_000i64..1_000_000, len in 1usize..1_000) {
            let len_i = i64::try_from(len).unwrap();
            prop_assert_eq!(wrap(index, len), wrap(index + len_i, len));
        }
    }
}
