use alloc::sync::Arc;

use crate::ConfigError;

pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_MAX_CACHED_ITEMS: usize = 10_000;
pub const DEFAULT_EVICTION_BUFFER: usize = 200;
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Units per millisecond above which loads are skipped until idle.
pub const DEFAULT_CANCEL_THRESHOLD: f64 = 25.0;
/// Units per millisecond above which loads are extended in the scroll direction.
pub const DEFAULT_PRELOAD_THRESHOLD: f64 = 2.0;
pub const DEFAULT_PRELOAD_AHEAD: usize = 50;
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 150;
/// A native scroll extent every mainstream scroll surface handles without precision loss.
pub const DEFAULT_MAX_SCROLL_EXTENT: u64 = 16_000_000;
pub const DEFAULT_OVERSCAN: usize = 3;

/// Per-index item size in the scroll axis.
pub type SizeFn = Arc<dyn Fn(usize) -> u32 + Send + Sync>;

/// The item size model: one size for every item, or a per-index function.
#[derive(Clone)]
pub enum ItemSize {
    Fixed(u32),
    Variable(SizeFn),
}

impl core::fmt::Debug for ItemSize {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            Self::Variable(_) => f.write_str("Variable(..)"),
        }
    }
}

/// Configuration for [`crate::Viewport`].
///
/// Cheap to clone: the variable size function is stored in an `Arc`.
#[derive(Clone, Debug)]
pub struct ViewportOptions {
    pub total: usize,
    pub item_size: ItemSize,
    /// Items rendered beyond each edge of the visible range.
    pub overscan: usize,
    /// The largest native scroll extent exposed to the host before compression kicks in.
    pub max_scroll_extent: u64,
    pub container_size: u32,
    /// Initial native scroll position.
    pub initial_scroll: f64,
}

impl ViewportOptions {
    /// Options for a list where every item has the same size.
    pub fn fixed(total: usize, item_size: u32) -> Self {
        Self::with_item_size(total, ItemSize::Fixed(item_size))
    }

    /// Options for a list sized by `size_of(index)`.
    ///
    /// Sizes are read once per index and kept in a prefix-sum tree; call
    /// [`crate::Viewport::invalidate_sizes`] when previously returned sizes change.
    pub fn variable(total: usize, size_of: impl Fn(usize) -> u32 + Send + Sync + 'static) -> Self {
        Self::with_item_size(total, ItemSize::Variable(Arc::new(size_of)))
    }

    fn with_item_size(total: usize, item_size: ItemSize) -> Self {
        Self {
            total,
            item_size,
            overscan: DEFAULT_OVERSCAN,
            max_scroll_extent: DEFAULT_MAX_SCROLL_EXTENT,
            container_size: 0,
            initial_scroll: 0.0,
        }
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_max_scroll_extent(mut self, max_scroll_extent: u64) -> Self {
        self.max_scroll_extent = max_scroll_extent;
        self
    }

    pub fn with_container_size(mut self, container_size: u32) -> Self {
        self.container_size = container_size;
        self
    }

    pub fn with_initial_scroll(mut self, initial_scroll: f64) -> Self {
        self.initial_scroll = initial_scroll;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.item_size, ItemSize::Fixed(0)) {
            return Err(ConfigError::ZeroItemSize);
        }
        if self.max_scroll_extent == 0 {
            return Err(ConfigError::ZeroScrollExtent);
        }
        Ok(())
    }
}

/// Chunking and capacity policy for [`crate::SparseStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreOptions {
    /// Items per chunk; also the alignment of every fetch.
    pub chunk_size: usize,
    pub max_cached_items: usize,
    /// Items protected from eviction on each side of the visible range.
    pub eviction_buffer: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_cached_items: DEFAULT_MAX_CACHED_ITEMS,
            eviction_buffer: DEFAULT_EVICTION_BUFFER,
        }
    }
}

impl StoreOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_cached_items(mut self, max_cached_items: usize) -> Self {
        self.max_cached_items = max_cached_items;
        self
    }

    pub fn with_eviction_buffer(mut self, eviction_buffer: usize) -> Self {
        self.eviction_buffer = eviction_buffer;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.max_cached_items < self.chunk_size {
            return Err(ConfigError::CapacityBelowChunk {
                max_cached_items: self.max_cached_items,
                chunk_size: self.chunk_size,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VelocityOptions {
    /// No samples for this long ends the gesture.
    pub idle_timeout_ms: u64,
    /// Samples required before the estimate is trusted.
    pub min_samples: usize,
}

impl Default for VelocityOptions {
    fn default() -> Self {
        Self {
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            min_samples: 3,
        }
    }
}

impl VelocityOptions {
    pub fn with_idle_timeout_ms(mut self, idle_timeout_ms: u64) -> Self {
        self.idle_timeout_ms = idle_timeout_ms;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_samples < 2 {
            return Err(ConfigError::TooFewSamples(self.min_samples));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaceholderOptions {
    pub mask_char: char,
    /// Loaded items inspected when learning the item shape.
    pub sample_size: usize,
    /// Vary text lengths between the sampled minimum and maximum.
    pub randomize_lengths: bool,
    /// Text length of the fallback placeholder used before any item was seen.
    pub fallback_length: usize,
}

impl Default for PlaceholderOptions {
    fn default() -> Self {
        Self {
            mask_char: '█',
            sample_size: 20,
            randomize_lengths: true,
            fallback_length: 12,
        }
    }
}

impl PlaceholderOptions {
    pub fn with_mask_char(mut self, mask_char: char) -> Self {
        self.mask_char = mask_char;
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_randomize_lengths(mut self, randomize_lengths: bool) -> Self {
        self.randomize_lengths = randomize_lengths;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_size == 0 {
            return Err(ConfigError::ZeroSampleSize);
        }
        Ok(())
    }
}

/// Configuration for the load coordinator and everything it owns.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoaderOptions {
    pub store: StoreOptions,
    pub velocity: VelocityOptions,
    pub placeholder: PlaceholderOptions,
    /// Items requested per sequential page (`load_more`, first page of a reload).
    pub page_size: usize,
    pub cancel_threshold: f64,
    pub preload_threshold: f64,
    /// Extra items requested in the scroll direction between the two thresholds.
    pub preload_ahead: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            store: StoreOptions::default(),
            velocity: VelocityOptions::default(),
            placeholder: PlaceholderOptions::default(),
            page_size: DEFAULT_PAGE_SIZE,
            cancel_threshold: DEFAULT_CANCEL_THRESHOLD,
            preload_threshold: DEFAULT_PRELOAD_THRESHOLD,
            preload_ahead: DEFAULT_PRELOAD_AHEAD,
        }
    }
}

impl LoaderOptions {
    pub fn with_store(mut self, store: StoreOptions) -> Self {
        self.store = store;
        self
    }

    pub fn with_velocity(mut self, velocity: VelocityOptions) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_placeholder(mut self, placeholder: PlaceholderOptions) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_thresholds(mut self, preload_threshold: f64, cancel_threshold: f64) -> Self {
        self.preload_threshold = preload_threshold;
        self.cancel_threshold = cancel_threshold;
        self
    }

    pub fn with_preload_ahead(mut self, preload_ahead: usize) -> Self {
        self.preload_ahead = preload_ahead;
        self
    }

    pub fn with_idle_timeout_ms(mut self, idle_timeout_ms: u64) -> Self {
        self.velocity.idle_timeout_ms = idle_timeout_ms;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.velocity.validate()?;
        self.placeholder.validate()?;
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        let finite = self.preload_threshold.is_finite() && self.cancel_threshold.is_finite();
        if !finite || self.preload_threshold < 0.0 || self.preload_threshold > self.cancel_threshold
        {
            return Err(ConfigError::InvalidThresholds {
                preload: self.preload_threshold,
                cancel: self.cancel_threshold,
            });
        }
        Ok(())
    }
}
