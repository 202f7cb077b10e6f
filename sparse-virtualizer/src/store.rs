use alloc::vec::Vec;
use core::cmp;

use crate::key::ChunkMap;
use crate::{ConfigError, ItemRange, StoreOptions};

/// Occupancy statistics for a [`SparseStore`].
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreStats {
    pub total: usize,
    pub cached: usize,
    pub chunks: usize,
    /// `1 - cached / total`; `1.0` for an empty list.
    pub memory_efficiency: f64,
}

#[derive(Clone, Debug)]
struct Chunk<T> {
    slots: Vec<Option<T>>,
    filled: usize,
    last_access: u64,
}

impl<T> Chunk<T> {
    fn new(chunk_size: usize, now: u64) -> Self {
        let mut slots = Vec::with_capacity(chunk_size);
        slots.resize_with(chunk_size, || None);
        Self {
            slots,
            filled: 0,
            last_access: now,
        }
    }
}

/// Chunked storage for a list whose items are only partially loaded.
///
/// Items live in index-aligned chunks of `chunk_size` slots, created on first write. Every
/// operation outside `[0, total)` is a no-op. Eviction always removes whole chunks.
#[derive(Clone, Debug)]
pub struct SparseStore<T> {
    options: StoreOptions,
    total: usize,
    cached: usize,
    chunks: ChunkMap<Chunk<T>>,
    clock: u64,
}

impl<T> SparseStore<T> {
    pub fn new(options: StoreOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            total: 0,
            cached: 0,
            chunks: ChunkMap::new(),
            clock: 0,
        })
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of items currently held across all chunks.
    pub fn cached(&self) -> usize {
        self.cached
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk_index(&self, index: usize) -> usize {
        index / self.options.chunk_size
    }

    /// The full index span of a chunk, ignoring `total`.
    pub fn chunk_range(&self, chunk: usize) -> ItemRange {
        let start = chunk.saturating_mul(self.options.chunk_size);
        ItemRange {
            start,
            end: start.saturating_add(self.options.chunk_size - 1),
        }
    }

    /// Sets the item count. Items at or past a shrunken total are dropped.
    pub fn set_total(&mut self, total: usize) {
        if total < self.total {
            let chunk_size = self.options.chunk_size;
            let mut dropped = 0;
            self.chunks.retain(|&c, chunk| {
                let start = c * chunk_size;
                if start >= total {
                    dropped += chunk.filled;
                    return false;
                }
                for slot in chunk.slots.iter_mut().skip(total - start) {
                    if slot.take().is_some() {
                        chunk.filled -= 1;
                        dropped += 1;
                    }
                }
                chunk.filled > 0
            });
            self.cached -= dropped;
        }
        vtrace!(from = self.total, to = total, "SparseStore::set_total");
        self.total = total;
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.total {
            return None;
        }
        let chunk = self.chunks.get(&self.chunk_index(index))?;
        chunk.slots[index % self.options.chunk_size].as_ref()
    }

    pub fn has(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Stores one item, returning `false` when `index` is out of range.
    pub fn set(&mut self, index: usize, item: T) -> bool {
        if index >= self.total {
            return false;
        }
        let now = self.tick();
        self.write(index, item, now);
        true
    }

    /// Stores `items` starting at `offset`. Items past `total` are dropped.
    ///
    /// Returns the number of items stored.
    pub fn set_range(&mut self, offset: usize, items: impl IntoIterator<Item = T>) -> usize {
        let now = self.tick();
        let mut stored = 0;
        for (i, item) in items.into_iter().enumerate() {
            let index = offset.saturating_add(i);
            if index >= self.total {
                break;
            }
            self.write(index, item, now);
            stored += 1;
        }
        stored
    }

    fn write(&mut self, index: usize, item: T, now: u64) {
        let chunk_size = self.options.chunk_size;
        let chunk = self
            .chunks
            .entry(index / chunk_size)
            .or_insert_with(|| Chunk::new(chunk_size, now));
        chunk.last_access = now;
        let slot = &mut chunk.slots[index % chunk_size];
        if slot.is_none() {
            chunk.filled += 1;
            self.cached += 1;
        }
        *slot = Some(item);
    }

    /// Removes one item. A chunk left empty is dropped.
    pub fn delete(&mut self, index: usize) -> Option<T> {
        if index >= self.total {
            return None;
        }
        let c = self.chunk_index(index);
        let chunk = self.chunks.get_mut(&c)?;
        let item = chunk.slots[index % self.options.chunk_size].take()?;
        chunk.filled -= 1;
        self.cached -= 1;
        if chunk.filled == 0 {
            self.chunks.remove(&c);
        }
        Some(item)
    }

    /// Items in `start..=end` (clamped to `total`), `None` for unloaded slots.
    pub fn get_range(&self, start: usize, end: usize) -> Vec<Option<&T>> {
        let Some(range) = ItemRange::new(start, end).and_then(|r| r.clamp_to(self.total)) else {
            return Vec::new();
        };
        range.iter().map(|i| self.get(i)).collect()
    }

    /// Whether every slot of `chunk` inside `[0, total)` is loaded.
    pub fn is_chunk_resident(&self, chunk: usize) -> bool {
        let start = chunk.saturating_mul(self.options.chunk_size);
        if start >= self.total {
            return false;
        }
        let expected = cmp::min(self.options.chunk_size, self.total - start);
        self.chunks
            .get(&chunk)
            .is_some_and(|c| c.filled >= expected)
    }

    /// Chunk-aligned spans of `start..=end` that are not fully loaded, clamped to `total`.
    ///
    /// Adjacent missing chunks are merged into one span.
    pub fn find_unloaded_ranges(&self, start: usize, end: usize) -> Vec<ItemRange> {
        let mut out: Vec<ItemRange> = Vec::new();
        let Some(range) = ItemRange::new(start, end).and_then(|r| r.clamp_to(self.total)) else {
            return out;
        };
        let last = self.total - 1;
        for c in self.chunk_index(range.start)..=self.chunk_index(range.end) {
            if self.is_chunk_resident(c) {
                continue;
            }
            let span = self.chunk_range(c);
            let span = ItemRange {
                start: span.start,
                end: cmp::min(span.end, last),
            };
            match out.last_mut() {
                Some(prev) if prev.end + 1 == span.start => prev.end = span.end,
                _ => out.push(span),
            }
        }
        out
    }

    /// Marks every existing chunk overlapping `start..=end` as used now.
    pub fn touch_chunks_for_range(&mut self, start: usize, end: usize) {
        let Some(range) = ItemRange::new(start, end).and_then(|r| r.clamp_to(self.total)) else {
            return;
        };
        let now = self.tick();
        for c in self.chunk_index(range.start)..=self.chunk_index(range.end) {
            if let Some(chunk) = self.chunks.get_mut(&c) {
                chunk.last_access = now;
            }
        }
    }

    /// Evicts least recently used chunks outside the keep zone until the store fits its budget.
    ///
    /// The keep zone is the visible range widened by `eviction_buffer` on both sides. Returns the
    /// number of items evicted.
    pub fn evict_distant(&mut self, visible_start: usize, visible_end: usize) -> usize {
        if self.cached <= self.options.max_cached_items {
            return 0;
        }
        let buffer = self.options.eviction_buffer;
        let keep = ItemRange {
            start: visible_start.saturating_sub(buffer),
            end: cmp::max(visible_start, visible_end).saturating_add(buffer),
        };
        let mut candidates: Vec<(u64, usize)> = self
            .chunks
            .iter()
            .filter(|&(&c, _)| !self.chunk_range(c).intersects(&keep))
            .map(|(&c, chunk)| (chunk.last_access, c))
            .collect();
        candidates.sort_unstable();
        let evicted = self.evict_in_order(candidates);
        if evicted > 0 {
            vdebug!(
                evicted,
                cached = self.cached,
                keep_start = keep.start,
                keep_end = keep.end,
                "SparseStore::evict_distant"
            );
        }
        evicted
    }

    /// Evicts in pure LRU order until the store fits its budget.
    ///
    /// Chunks carrying the most recent touch are never evicted, even if that leaves the store
    /// over budget. Returns the number of items evicted.
    pub fn evict_to_limit(&mut self) -> usize {
        if self.cached <= self.options.max_cached_items {
            return 0;
        }
        let newest = self.chunks.values().map(|c| c.last_access).max().unwrap_or(0);
        let mut candidates: Vec<(u64, usize)> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.last_access < newest)
            .map(|(&c, chunk)| (chunk.last_access, c))
            .collect();
        candidates.sort_unstable();
        let evicted = self.evict_in_order(candidates);
        if evicted > 0 {
            vdebug!(evicted, cached = self.cached, "SparseStore::evict_to_limit");
        }
        evicted
    }

    fn evict_in_order(&mut self, candidates: Vec<(u64, usize)>) -> usize {
        let mut evicted = 0;
        for (_, c) in candidates {
            if self.cached <= self.options.max_cached_items {
                break;
            }
            if let Some(chunk) = self.chunks.remove(&c) {
                self.cached -= chunk.filled;
                evicted += chunk.filled;
            }
        }
        evicted
    }

    pub fn stats(&self) -> StoreStats {
        let memory_efficiency = if self.total == 0 {
            1.0
        } else {
            1.0 - self.cached as f64 / self.total as f64
        };
        StoreStats {
            total: self.total,
            cached: self.cached,
            chunks: self.chunks.len(),
            memory_efficiency,
        }
    }

    /// Drops every item but keeps `total`.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.cached = 0;
    }

    /// Drops every item and forgets `total`.
    pub fn reset(&mut self) {
        self.clear();
        self.total = 0;
        self.clock = 0;
    }

    /// Up to `limit` loaded items in index order.
    pub fn sample(&self, limit: usize) -> Vec<&T> {
        let mut keys: Vec<usize> = self.chunks.keys().copied().collect();
        keys.sort_unstable();
        keys.iter()
            .filter_map(|c| self.chunks.get(c))
            .flat_map(|chunk| chunk.slots.iter().flatten())
            .take(limit)
            .collect()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}
