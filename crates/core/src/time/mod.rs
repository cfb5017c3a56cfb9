//! Hybrid logical timestamps and timespan algebra.

use core::fmt::{self, Display, Formatter};

pub mod span;

/// A hybrid logical clock reading: wall-clock nanoseconds plus a logical
/// tiebreaker, ordered lexicographically.
///
/// [`Timestamp::MIN`] and [`Timestamp::MAX`] bound open intervals and render
/// as `<min>` / `<max>`. [`Timestamp::ZERO`] sorts below `MIN` and is used as
/// the anchor for writes that never materialized.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub wall: i64,
    pub logical: i32,
}

impl Timestamp {
    pub const ZERO: Self = Self::new(0, 0);
    pub const MIN: Self = Self::new(0, 1);
    pub const MAX: Self = Self::new(i64::MAX, i32::MAX);

    #[must_use]
    pub const fn new(wall: i64, logical: i32) -> Self {
        Self { wall, logical }
    }

    /// Timestamp at the given wall-clock nanoseconds with logical zero.
    #[must_use]
    pub const fn from_nanos(wall: i64) -> Self {
        Self::new(wall, 0)
    }

    /// The smallest timestamp strictly greater than `self`.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.logical == i32::MAX {
            Self::new(self.wall + 1, 0)
        } else {
            Self::new(self.wall, self.logical + 1)
        }
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.wall == 0 && self.logical == 0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if *self == Self::MIN {
            return f.write_str("<min>");
        }
        if *self == Self::MAX {
            return f.write_str("<max>");
        }
        let secs = self.wall / 1_000_000_000;
        let nanos = self.wall % 1_000_000_000;
        if nanos == 0 {
            write!(f, "{secs},{}", self.logical)
        } else {
            write!(f, "{secs}.{nanos:09},{}", self.logical)
        }
    }
}
