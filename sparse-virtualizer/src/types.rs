use alloc::string::String;
use core::cmp;
use core::fmt;
use core::ops::RangeInclusive;

use crate::RangeError;

/// An inclusive span of item indexes (`start..=end`).
///
/// A range always holds at least one index; "no range" is expressed as `Option<ItemRange>`.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemRange {
    pub start: usize,
    pub end: usize, // inclusive
}

impl ItemRange {
    /// Returns `None` when `start > end`.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(index: usize) -> Self {
        Self {
            start: index,
            end: index,
        }
    }

    /// Validates a requested span against `total` instead of clamping it.
    pub fn checked(start: usize, end: usize, total: usize) -> Result<Self, RangeError> {
        if start > end || end >= total {
            return Err(RangeError { start, end, total });
        }
        Ok(Self { start, end })
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }

    pub fn contains_range(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Clamps the range into `[0, total - 1]`.
    ///
    /// Returns `None` when nothing of the range survives (including `total == 0`).
    pub fn clamp_to(&self, total: usize) -> Option<Self> {
        if total == 0 || self.start >= total {
            return None;
        }
        Some(Self {
            start: self.start,
            end: cmp::min(self.end, total - 1),
        })
    }

    /// Grows the range by `before`/`after` indexes, clamped to `[0, total - 1]`.
    pub fn expand(&self, before: usize, after: usize, total: usize) -> Self {
        let last = total.saturating_sub(1);
        Self {
            start: cmp::min(self.start.saturating_sub(before), last),
            end: cmp::min(self.end.saturating_add(after), last),
        }
    }

    pub fn iter(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl fmt::Display for ItemRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// A unique item identifier: either an integer or a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum ItemId {
    Int(u64),
    Str(String),
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// A borrowed view of one item field, used for structural sampling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Bool(bool),
    Null,
}

/// An opaque record stored in the virtualized list.
///
/// Only `id` is required. `visit_fields` lets the placeholder generator learn the shape of
/// loaded items; items that do not expose fields get the fallback placeholder.
pub trait Item {
    fn id(&self) -> ItemId;

    fn visit_fields(&self, visit: &mut dyn FnMut(&str, FieldValue<'_>)) {
        let _ = visit;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollDirection {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Start,
    Center,
    End,
    Auto,
}
