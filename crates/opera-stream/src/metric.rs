// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Event count and byte size, measured together.

use serde::{Deserialize, Serialize};

/// Number of events and their total encoded size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metric {
    /// Event count.
    pub num: u32,
    /// Total size in bytes.
    pub size: u64,
}

impl Metric {
    /// Construct a metric.
    pub const fn new(num: u32, size: u64) -> Self {
        Self { num, size }
    }

    /// Component-wise sum, `None` if either component overflows.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        Some(Self {
            num: self.num.checked_add(other.num)?,
            size: self.size.checked_add(other.size)?,
        })
    }

    /// Component-wise sum, clamped at the maximum.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self {
            num: self.num.saturating_add(other.num),
            size: self.size.saturating_add(other.size),
        }
    }

    /// Component-wise difference, `None` if either component would underflow.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        Some(Self {
            num: self.num.checked_sub(other.num)?,
            size: self.size.checked_sub(other.size)?,
        })
    }

    /// `true` when neither component exceeds the matching component of `limit`.
    pub const fn fits_within(self, limit: Self) -> bool {
        self.num <= limit.num && self.size <= limit.size
    }

    /// `true` when both components are zero.
    pub const fn is_zero(self) -> bool {
        self.num == 0 && self.size == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_fails_when_any_component_underflows() {
        let a = Metric::new(5, 100);
        assert_eq!(a.checked_sub(Metric::new(5, 100)), Some(Metric::default()));
        assert_eq!(a.checked_sub(Metric::new(6, 0)), None);
        assert_eq!(a.checked_sub(Metric::new(0, 101)), None);
    }

    #[test]
    fn fits_within_checks_both_components() {
        let limit = Metric::new(10, 1_000);
        assert!(Metric::new(10, 1_000).fits_within(limit));
        assert!(!Metric::new(11, 1).fits_within(limit));
        assert!(!Metric::new(1, 1_001).fits_within(limit));
    }

    #[test]
    fn add_overflow() {
        let big = Metric::new(u32::MAX, 1);
        assert_eq!(big.checked_add(Metric::new(1, 0)), None);
        assert_eq!(
            big.saturating_add(Metric::new(1, 1)),
            Metric::new(u32::MAX, 2)
        );
    }
}
