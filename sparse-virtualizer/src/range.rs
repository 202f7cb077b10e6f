use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp;

use crate::fenwick::Fenwick;
use crate::{ItemRange, ItemSize, SizeFn};

/// Item sizes along the scroll axis.
///
/// Fixed sizes answer every query with arithmetic. Variable sizes cache each index's size and
/// keep prefix sums in a Fenwick tree: `O(log n)` offset lookup, offset → index descent, single
/// size updates, and growth when the list gets longer.
#[derive(Clone)]
pub struct SizeModel {
    len: usize,
    kind: SizeKind,
}

#[derive(Clone)]
enum SizeKind {
    Fixed(u32),
    Variable {
        size_of: SizeFn,
        sizes: Vec<u32>,
        sums: Fenwick,
    },
}

impl SizeModel {
    pub fn fixed(len: usize, size: u32) -> Self {
        Self {
            len,
            kind: SizeKind::Fixed(size),
        }
    }

    pub fn variable(len: usize, size_of: SizeFn) -> Self {
        let sizes: Vec<u32> = (0..len).map(|i| size_of(i)).collect();
        let sums = Fenwick::from_sizes(&sizes);
        Self {
            len,
            kind: SizeKind::Variable {
                size_of,
                sizes,
                sums,
            },
        }
    }

    pub fn from_item_size(len: usize, item_size: &ItemSize) -> Self {
        match item_size {
            ItemSize::Fixed(size) => Self::fixed(len, *size),
            ItemSize::Variable(size_of) => Self::variable(len, Arc::clone(size_of)),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.kind, SizeKind::Fixed(_))
    }

    /// Size of `index`, or 0 past the end.
    pub fn size(&self, index: usize) -> u32 {
        if index >= self.len {
            return 0;
        }
        match &self.kind {
            SizeKind::Fixed(size) => *size,
            SizeKind::Variable { sizes, .. } => sizes[index],
        }
    }

    /// Start offset of `index`. Indexes past the end clamp to the total extent.
    pub fn offset(&self, index: usize) -> u64 {
        let index = cmp::min(index, self.len);
        match &self.kind {
            SizeKind::Fixed(size) => index as u64 * *size as u64,
            SizeKind::Variable { sums, .. } => sums.prefix_sum(index),
        }
    }

    pub fn total_extent(&self) -> u64 {
        self.offset(self.len)
    }

    /// The item containing `offset`, clamped to the last item. `None` for an empty list.
    pub fn index_at(&self, offset: u64) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let index = match &self.kind {
            SizeKind::Fixed(size) => {
                let size = cmp::max(*size, 1) as u64;
                usize::try_from(offset / size).unwrap_or(usize::MAX)
            }
            SizeKind::Variable { sums, .. } => sums.lower_bound(offset),
        };
        Some(cmp::min(index, self.len - 1))
    }

    /// Grows or shrinks the model. New variable-size indexes are measured by the size function.
    pub fn set_len(&mut self, len: usize) {
        if len == self.len {
            return;
        }
        if let SizeKind::Variable {
            size_of,
            sizes,
            sums,
        } = &mut self.kind
        {
            if len < self.len {
                sizes.truncate(len);
                sums.truncate(len);
            } else {
                sizes.reserve(len - self.len);
                for i in self.len..len {
                    let size = size_of(i);
                    sizes.push(size);
                    sums.push(size);
                }
            }
        }
        self.len = len;
    }

    /// Overrides one variable size (for example after measuring it).
    ///
    /// Returns the size delta; always 0 for fixed models and out-of-range indexes.
    pub fn set_size(&mut self, index: usize, size: u32) -> i64 {
        if index >= self.len {
            return 0;
        }
        match &mut self.kind {
            SizeKind::Fixed(_) => 0,
            SizeKind::Variable { sizes, sums, .. } => {
                let delta = size as i64 - sizes[index] as i64;
                sizes[index] = size;
                sums.add(index, delta);
                delta
            }
        }
    }

    /// Re-reads every size from the size function and rebuilds the prefix sums.
    pub fn invalidate(&mut self) {
        if let SizeKind::Variable {
            size_of,
            sizes,
            sums,
        } = &mut self.kind
        {
            sizes.clear();
            sizes.extend((0..self.len).map(|i| size_of(i)));
            *sums = Fenwick::from_sizes(sizes);
        }
    }

    /// Replaces the size function of a variable model and rebuilds it.
    pub fn set_size_fn(&mut self, size_of: SizeFn) {
        *self = Self::variable(self.len, size_of);
    }
}

impl core::fmt::Debug for SizeModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct("SizeModel");
        s.field("len", &self.len);
        match &self.kind {
            SizeKind::Fixed(size) => s.field("fixed", size),
            SizeKind::Variable { sums, .. } => s.field("total_extent", &sums.total()),
        };
        s.finish()
    }
}

/// The visible range and the overscanned render range for one scroll position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ranges {
    pub visible: Option<ItemRange>,
    pub render: Option<ItemRange>,
}

/// Computes the ranges for a logical (uncompressed) scroll offset.
///
/// - `total == 0` yields no ranges.
/// - `container_size == 0` yields a single-item range at the scroll offset.
/// - Offsets past the end are clamped to the last full viewport.
pub fn compute_ranges(
    scroll_offset: u64,
    container_size: u32,
    sizes: &SizeModel,
    overscan: usize,
) -> Ranges {
    let total = sizes.len();
    let view = container_size as u64;
    let max_scroll = sizes.total_extent().saturating_sub(view);
    let scroll_offset = cmp::min(scroll_offset, max_scroll);

    let Some(start) = sizes.index_at(scroll_offset) else {
        return Ranges::default();
    };
    let end = if view == 0 {
        start
    } else {
        let last_visible = scroll_offset.saturating_add(view - 1);
        cmp::max(sizes.index_at(last_visible).unwrap_or(start), start)
    };

    let visible = ItemRange { start, end };
    Ranges {
        visible: Some(visible),
        render: Some(visible.expand(overscan, overscan, total)),
    }
}
