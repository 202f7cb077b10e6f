use crate::compression::{Compression, CompressionState};
use crate::range::{SizeModel, compute_ranges};
use crate::{
    Align, ConfigError, ItemRange, ItemSize, ScrollSnapshot, ViewportOptions, ViewportState,
};

/// Scroll state for one list: the size model, the compression cache, and the native scroll
/// position reported by the host.
///
/// The host only ever sees native (possibly compressed) positions. Ranges are always computed in
/// logical space, and [`Self::item_position`] maps items back into native space for placement.
#[derive(Clone, Debug)]
pub struct Viewport {
    sizes: SizeModel,
    overscan: usize,
    compression: Compression,
    container_size: u32,
    scroll_position: f64,
    logical_scroll: f64,
    state: ViewportState,
}

impl Viewport {
    pub fn new(options: ViewportOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        vdebug!(
            total = options.total,
            overscan = options.overscan,
            max_scroll_extent = options.max_scroll_extent,
            "Viewport::new"
        );
        let mut v = Self {
            sizes: SizeModel::from_item_size(options.total, &options.item_size),
            overscan: options.overscan,
            compression: Compression::new(options.max_scroll_extent),
            container_size: options.container_size,
            scroll_position: options.initial_scroll,
            logical_scroll: 0.0,
            state: ViewportState::default(),
        };
        v.recompute();
        Ok(v)
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn total(&self) -> usize {
        self.sizes.len()
    }

    pub fn sizes(&self) -> &SizeModel {
        &self.sizes
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    pub fn container_size(&self) -> u32 {
        self.container_size
    }

    /// Native scroll position after clamping.
    pub fn scroll_position(&self) -> f64 {
        self.scroll_position
    }

    /// Logical (uncompressed) scroll offset matching the native position.
    pub fn logical_offset(&self) -> f64 {
        self.logical_scroll
    }

    pub fn visible_range(&self) -> Option<ItemRange> {
        self.state.visible_range
    }

    pub fn render_range(&self) -> Option<ItemRange> {
        self.state.render_range
    }

    pub fn compression_state(&mut self) -> CompressionState {
        self.compression
            .state(self.sizes.len(), self.sizes.total_extent())
    }

    /// Largest native scroll position for the current container.
    pub fn max_scroll_position(&mut self) -> f64 {
        let container = self.container_size;
        self.compression_state().max_native_scroll(container)
    }

    pub fn set_total(&mut self, total: usize) {
        if total == self.sizes.len() {
            return;
        }
        vdebug!(from = self.sizes.len(), to = total, "Viewport::set_total");
        self.sizes.set_len(total);
        self.recompute();
    }

    pub fn set_container_size(&mut self, container_size: u32) {
        if container_size == self.container_size {
            return;
        }
        self.container_size = container_size;
        self.recompute();
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.overscan = overscan;
        self.recompute();
    }

    /// Applies a native scroll position reported by the host. Out-of-bounds values are clamped.
    pub fn set_scroll_position(&mut self, position: f64) {
        self.scroll_position = position;
        self.recompute();
    }

    pub fn set_item_size(&mut self, item_size: ItemSize) -> Result<(), ConfigError> {
        if matches!(item_size, ItemSize::Fixed(0)) {
            return Err(ConfigError::ZeroItemSize);
        }
        self.sizes = SizeModel::from_item_size(self.sizes.len(), &item_size);
        self.recompute();
        Ok(())
    }

    /// Records a measured size for one item of a variable-size list.
    ///
    /// Returns the size delta. Fixed-size lists ignore measurements.
    pub fn measure(&mut self, index: usize, size: u32) -> i64 {
        let delta = self.sizes.set_size(index, size);
        if delta != 0 {
            self.recompute();
        }
        delta
    }

    /// Re-reads every size from the size function.
    ///
    /// Sizes are never re-read automatically; call this when previously returned sizes changed.
    pub fn invalidate_sizes(&mut self) {
        self.sizes.invalidate();
        self.recompute();
    }

    pub fn item_offset(&self, index: usize) -> u64 {
        self.sizes.offset(index)
    }

    pub fn item_size(&self, index: usize) -> u32 {
        self.sizes.size(index)
    }

    /// Native placement of an item relative to the start of the scroll content.
    ///
    /// Under compression, the item keeps its real distance from the logical scroll offset and is
    /// anchored at the native scroll position.
    pub fn item_position(&self, index: usize) -> f64 {
        let offset = self.sizes.offset(index) as f64;
        if !self.state.is_compressed {
            return offset;
        }
        self.scroll_position + (offset - self.logical_scroll)
    }

    /// Native scroll position that brings `index` into view with `align`.
    pub fn scroll_to_index_offset(&mut self, index: usize, align: Align) -> f64 {
        let total = self.sizes.len();
        if total == 0 {
            return 0.0;
        }
        let index = index.min(total - 1);
        let start = self.sizes.offset(index);
        let size = self.sizes.size(index) as u64;
        let end = start.saturating_add(size);
        let view = self.container_size as u64;

        let target = match align {
            Align::Start => start,
            Align::End => end.saturating_sub(view),
            Align::Center => start.saturating_add(size / 2).saturating_sub(view / 2),
            Align::Auto => {
                let cur = self.state.logical_offset;
                let cur_end = cur.saturating_add(view);
                if start >= cur && end <= cur_end {
                    return self.scroll_position;
                } else if start < cur {
                    start
                } else {
                    end.saturating_sub(view)
                }
            }
        };

        let state = self.compression_state();
        state.to_native_scroll(target as f64, self.container_size)
    }

    /// Scrolls so that `index` is in view, returning the new native scroll position.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> f64 {
        let position = self.scroll_to_index_offset(index, align);
        self.set_scroll_position(position);
        self.scroll_position
    }

    /// Captures the scroll position as an item index plus an offset within it.
    pub fn scroll_snapshot(&self) -> ScrollSnapshot {
        let Some(index) = self.sizes.index_at(self.logical_scroll as u64) else {
            return ScrollSnapshot::default();
        };
        let offset_in_item = self.logical_scroll - self.sizes.offset(index) as f64;
        ScrollSnapshot::new(index, offset_in_item.max(0.0))
    }

    /// Restores a snapshot taken with [`Self::scroll_snapshot`], returning the native position.
    ///
    /// Indexes past the end clamp to the last item.
    pub fn restore_scroll(&mut self, snapshot: &ScrollSnapshot) -> f64 {
        let total = self.sizes.len();
        if total == 0 {
            self.set_scroll_position(0.0);
            return self.scroll_position;
        }
        let index = snapshot.index.min(total - 1);
        let offset_in_item = snapshot.offset_in_item.max(0.0);
        let logical = self.sizes.offset(index) as f64 + offset_in_item;
        let native = self
            .compression_state()
            .to_native_scroll(logical, self.container_size);
        self.set_scroll_position(native);
        self.scroll_position
    }

    fn recompute(&mut self) {
        let container = self.container_size;
        let compression = self.compression_state();
        let max = compression.max_native_scroll(container);
        self.scroll_position = if self.scroll_position > 0.0 {
            self.scroll_position.min(max)
        } else {
            0.0
        };
        self.logical_scroll = compression.to_logical_scroll(self.scroll_position, container);

        // Nearest unit: compressed round trips land a hair below integer offsets.
        let logical_offset = (self.logical_scroll + 0.5) as u64;
        let ranges = compute_ranges(logical_offset, container, &self.sizes, self.overscan);
        self.state = ViewportState {
            scroll_position: self.scroll_position,
            logical_offset,
            container_size: container,
            total_size: compression.bounded_extent,
            actual_size: compression.actual_extent,
            is_compressed: compression.is_compressed(),
            compression_ratio: compression.ratio,
            visible_range: ranges.visible,
            render_range: ranges.render,
        };
        vtrace!(
            scroll_position = self.scroll_position,
            logical_offset,
            visible = ?ranges.visible,
            "Viewport::recompute"
        );
    }
}
