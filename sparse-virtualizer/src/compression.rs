//! Mapping between the logical scroll space and a bounded native scroll extent.
//!
//! Native scroll surfaces stop behaving (or silently clamp) somewhere in the tens of millions of
//! units. When the logical extent exceeds `max_extent`, every logical position is scaled by
//! `ratio = max_extent / actual_extent` before it reaches the host.

/// A cached compression ratio for one logical extent.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressionState {
    /// `<= 1`; exactly `1` when compression is inactive.
    pub ratio: f64,
    pub actual_extent: u64,
    /// The extent exposed to the host scroll surface.
    pub bounded_extent: u64,
}

impl CompressionState {
    pub fn new(actual_extent: u64, max_extent: u64) -> Self {
        if max_extent == 0 || actual_extent <= max_extent {
            return Self::identity(actual_extent);
        }
        Self {
            ratio: max_extent as f64 / actual_extent as f64,
            actual_extent,
            bounded_extent: max_extent,
        }
    }

    pub fn identity(extent: u64) -> Self {
        Self {
            ratio: 1.0,
            actual_extent: extent,
            bounded_extent: extent,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.ratio < 1.0
    }

    /// Maps a logical position into the bounded space. Identity when inactive.
    pub fn compress(&self, actual: u64) -> f64 {
        if !self.is_compressed() {
            return actual as f64;
        }
        actual as f64 * self.ratio
    }

    /// Maps a bounded position back to logical space, rounded to the nearest unit.
    ///
    /// The result is within one unit of the original position for any round trip.
    pub fn decompress(&self, bounded: f64) -> u64 {
        if !self.is_compressed() {
            return bounded as u64;
        }
        (bounded / self.ratio + 0.5) as u64
    }

    /// Largest native scroll position for a container of `container_size` units.
    pub fn max_native_scroll(&self, container_size: u32) -> f64 {
        self.bounded_extent.saturating_sub(container_size as u64) as f64
    }

    /// Largest logical scroll offset for a container of `container_size` units.
    pub fn max_logical_scroll(&self, container_size: u32) -> f64 {
        self.actual_extent.saturating_sub(container_size as u64) as f64
    }

    /// Converts a native scroll position into a logical scroll offset.
    ///
    /// Uses the uniform ratio, except over the last container-height of native travel: there the
    /// remaining logical tail is interpolated linearly so the final items can reach the viewport.
    pub fn to_logical_scroll(&self, native: f64, container_size: u32) -> f64 {
        let tail = self.tail(container_size);
        let native = clamp_non_negative(native, tail.native_max);
        if !self.is_compressed() {
            return native;
        }
        if native <= tail.native_start || tail.native_max <= tail.native_start {
            return (native / self.ratio).min(tail.logical_max);
        }
        let progress = (native - tail.native_start) / (tail.native_max - tail.native_start);
        tail.logical_start + progress * (tail.logical_max - tail.logical_start)
    }

    /// Exact inverse of [`Self::to_logical_scroll`].
    pub fn to_native_scroll(&self, logical: f64, container_size: u32) -> f64 {
        let tail = self.tail(container_size);
        let logical = clamp_non_negative(logical, tail.logical_max);
        if !self.is_compressed() {
            return logical;
        }
        if logical <= tail.logical_start || tail.logical_max <= tail.logical_start {
            return (logical * self.ratio).min(tail.native_max);
        }
        let progress = (logical - tail.logical_start) / (tail.logical_max - tail.logical_start);
        tail.native_start + progress * (tail.native_max - tail.native_start)
    }

    fn tail(&self, container_size: u32) -> Tail {
        let native_max = self.max_native_scroll(container_size);
        let logical_max = self.max_logical_scroll(container_size);
        let native_start = (native_max - container_size as f64).max(0.0);
        Tail {
            native_start,
            native_max,
            logical_start: (native_start / self.ratio).min(logical_max),
            logical_max,
        }
    }
}

struct Tail {
    native_start: f64,
    native_max: f64,
    logical_start: f64,
    logical_max: f64,
}

fn clamp_non_negative(v: f64, max: f64) -> f64 {
    // NaN compares false everywhere and falls through to 0.
    if v > 0.0 { v.min(max) } else { 0.0 }
}

/// A per-instance compression cache.
///
/// The state is recomputed only when the item count or the logical extent changes, so several
/// lists never share a compression context.
#[derive(Clone, Debug)]
pub struct Compression {
    max_extent: u64,
    cached: Option<CacheEntry>,
}

#[derive(Clone, Copy, Debug)]
struct CacheEntry {
    total: usize,
    state: CompressionState,
}

impl Compression {
    pub fn new(max_extent: u64) -> Self {
        Self {
            max_extent,
            cached: None,
        }
    }

    pub fn max_extent(&self) -> u64 {
        self.max_extent
    }

    pub fn state(&mut self, total: usize, actual_extent: u64) -> CompressionState {
        if let Some(entry) = self.cached {
            if entry.total == total && entry.state.actual_extent == actual_extent {
                return entry.state;
            }
        }
        let state = CompressionState::new(actual_extent, self.max_extent);
        if state.is_compressed() {
            vdebug!(
                total,
                actual_extent,
                bounded_extent = state.bounded_extent,
                ratio = state.ratio,
                "compression active"
            );
        }
        self.cached = Some(CacheEntry { total, state });
        state
    }

    /// The last computed state, if any.
    pub fn cached(&self) -> Option<CompressionState> {
        self.cached.map(|entry| entry.state)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
