use alloc::vec::Vec;
use core::cmp;

/// Prefix sums over per-item sizes.
///
/// `tree[i]` holds the sum of the `lsb(i)` sizes ending at item `i - 1` (1-indexed).
#[derive(Clone, Debug)]
pub(crate) struct Fenwick {
    tree: Vec<u64>,
    total: u64,
    max_bit: usize,
}

impl Fenwick {
    /// Builds the tree in `O(n)`.
    pub(crate) fn from_sizes(sizes: &[u32]) -> Self {
        let n = sizes.len();
        let mut tree = alloc::vec![0u64; n + 1];
        let mut total = 0u64;
        for i in 1..=n {
            let v = sizes[i - 1] as u64;
            total = total.saturating_add(v);
            tree[i] = tree[i].saturating_add(v);
            let parent = i + lsb(i);
            if parent <= n {
                tree[parent] = tree[parent].saturating_add(tree[i]);
            }
        }
        Self {
            tree,
            total,
            max_bit: highest_power_of_two_leq(n),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len() - 1
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len() {
            return;
        }
        self.total = self.prefix_sum(new_len);
        self.tree.truncate(new_len + 1);
        self.max_bit = highest_power_of_two_leq(new_len);
    }

    /// Appends one size in `O(log n)`.
    pub(crate) fn push(&mut self, size: u32) {
        let value = size as u64;
        let new_len = self.len() + 1;
        // The new node covers `lsb(new_len)` items ending at the appended one; everything but
        // the appended item is already accounted for in existing prefix sums.
        let covered_before = self
            .prefix_sum(new_len - 1)
            .saturating_sub(self.prefix_sum(new_len - lsb(new_len)));
        self.tree.push(covered_before.saturating_add(value));
        self.total = self.total.saturating_add(value);
        self.max_bit = highest_power_of_two_leq(new_len);
    }

    pub(crate) fn add(&mut self, index: usize, delta: i64) {
        let n = self.len();
        if index >= n || delta == 0 {
            return;
        }
        self.total = apply_delta(self.total, delta);
        let mut i = index + 1;
        while i <= n {
            self.tree[i] = apply_delta(self.tree[i], delta);
            i += lsb(i);
        }
    }

    /// Sum of the first `count` sizes.
    pub(crate) fn prefix_sum(&self, count: usize) -> u64 {
        let mut i = cmp::min(count, self.len());
        let mut sum = 0u64;
        while i > 0 {
            sum = sum.saturating_add(self.tree[i]);
            i &= i - 1;
        }
        sum
    }

    /// Returns the number of items whose prefix sum is `<= target`, i.e. the index of the item
    /// containing offset `target` (or `len` past the end).
    pub(crate) fn lower_bound(&self, mut target: u64) -> usize {
        let n = self.len();
        let mut idx = 0usize;
        let mut bit = self.max_bit;
        while bit != 0 {
            let next = idx + bit;
            if next <= n && self.tree[next] <= target {
                target -= self.tree[next];
                idx = next;
            }
            bit >>= 1;
        }
        idx
    }
}

fn apply_delta(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

fn lsb(i: usize) -> usize {
    i & i.wrapping_neg()
}

fn highest_power_of_two_leq(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    1usize << (usize::BITS - 1 - n.leading_zeros())
}
