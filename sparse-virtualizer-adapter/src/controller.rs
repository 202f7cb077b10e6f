use std::fmt;

use sparse_virtualizer::{
    Align, ConfigError, DataAdapter, DataState, Event, EventEmitter, Item, ItemId, ItemRange,
    LoadCoordinator, LoadFuture, LoaderOptions, RangeRequest, ScrollSnapshot, Viewport,
    ViewportOptions, ViewportState,
};

use crate::{RecycleStats, Recycler, RecyclerOptions, Renderer};

/// The result of a programmatic scroll: where the host should scroll to, and the load (if any)
/// that fills the new render range.
pub struct ScrollOutcome {
    pub position: f64,
    pub load: Option<LoadFuture>,
}

impl fmt::Debug for ScrollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollOutcome")
            .field("position", &self.position)
            .field("pending", &self.load.is_some())
            .finish()
    }
}

/// A framework-neutral controller that wires a [`Viewport`], a [`LoadCoordinator`] and a
/// [`Recycler`] together.
///
/// This type does not hold any UI objects. Adapters drive it by calling:
/// - `on_scroll` / `on_resize` when UI events occur
/// - `tick(now_ms)` from a timer, so deferred loads run once scrolling settles
/// - `render(renderer, now_ms)` when `needs_render` says so
///
/// Every method that may start a load returns the future instead of spawning it; the host owns
/// the executor.
pub struct Controller<T, E> {
    viewport: Viewport,
    loader: LoadCoordinator<T>,
    recycler: Recycler<E>,
    last_range: Option<ItemRange>,
    dirty: bool,
}

impl<T: Item + 'static, E> Controller<T, E> {
    pub fn new(
        adapter: impl DataAdapter<T> + 'static,
        viewport: ViewportOptions,
        loader: LoaderOptions,
        recycler: RecyclerOptions,
    ) -> Result<Self, ConfigError> {
        let viewport = Viewport::new(viewport)?;
        let loader = LoadCoordinator::new(adapter, loader)?;
        if viewport.total() > 0 {
            loader.set_total(viewport.total());
        }
        Ok(Self {
            last_range: viewport.render_range(),
            viewport,
            loader,
            recycler: Recycler::new(recycler),
            dirty: true,
        })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn loader(&self) -> &LoadCoordinator<T> {
        &self.loader
    }

    pub fn recycler(&self) -> &Recycler<E> {
        &self.recycler
    }

    pub fn events(&self) -> &EventEmitter {
        self.loader.events()
    }

    pub fn state(&self) -> ViewportState {
        self.viewport.state()
    }

    pub fn data_state(&self) -> DataState {
        self.loader.data_state()
    }

    /// Call this when the UI reports a native scroll position change.
    pub fn on_scroll(&mut self, position: f64, now_ms: u64) -> Option<LoadFuture> {
        if self.is_destroyed() {
            return None;
        }
        self.viewport.set_scroll_position(position);
        self.loader.record_scroll(self.viewport.logical_offset(), now_ms);
        self.changed();
        self.ensure_visible()
    }

    pub fn on_resize(&mut self, container_size: u32) -> Option<LoadFuture> {
        if self.is_destroyed() {
            return None;
        }
        self.viewport.set_container_size(container_size);
        self.changed();
        self.ensure_visible()
    }

    /// Runs deferred loads once scrolling has been idle long enough.
    pub fn tick(&mut self, now_ms: u64) -> Option<LoadFuture> {
        if self.is_destroyed() {
            return None;
        }
        self.sync_total();
        self.loader.tick(now_ms)
    }

    /// Whether the next `render` would change anything on screen.
    pub fn needs_render(&mut self) -> bool {
        let loaded = self.loader.take_render_needed();
        self.dirty |= loaded;
        self.dirty
    }

    /// Reconciles rendered elements with the current render range.
    ///
    /// Unloaded indexes render as placeholders. Grace periods that ran out by `now_ms` return
    /// their elements to the pool.
    pub fn render<R: Renderer<T, Element = E>>(
        &mut self,
        renderer: &mut R,
        now_ms: u64,
    ) -> RecycleStats {
        if self.is_destroyed() {
            return RecycleStats::default();
        }
        self.sync_total();
        if let Some(visible) = self.viewport.visible_range() {
            self.loader.evict(visible);
        }
        self.dirty = false;

        let range = self.viewport.render_range();
        let viewport = &self.viewport;
        let recycler = &mut self.recycler;
        self.loader.read(|store, placeholders| {
            recycler.reconcile(
                renderer,
                range,
                |index| placeholders.slot(store, index),
                |index| viewport.item_position(index),
                now_ms,
            )
        })
    }

    pub fn set_total(&mut self, total: usize) -> Option<LoadFuture> {
        if self.is_destroyed() {
            return None;
        }
        self.loader.set_total(total);
        self.viewport.set_total(total);
        self.changed();
        self.ensure_visible()
    }

    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> ScrollOutcome {
        if self.is_destroyed() {
            return self.idle_outcome();
        }
        let position = self.viewport.scroll_to_index(index, align);
        self.changed();
        ScrollOutcome {
            position,
            load: self.ensure_visible(),
        }
    }

    /// Captures the scroll position, optionally with the host's selection.
    pub fn scroll_snapshot(&self, selected_ids: Option<Vec<ItemId>>) -> ScrollSnapshot {
        let snapshot = self.viewport.scroll_snapshot();
        match selected_ids {
            Some(ids) => snapshot.with_selected_ids(ids),
            None => snapshot,
        }
    }

    pub fn restore_scroll(&mut self, snapshot: &ScrollSnapshot) -> ScrollOutcome {
        if self.is_destroyed() {
            return self.idle_outcome();
        }
        let position = self.viewport.restore_scroll(snapshot);
        self.changed();
        ScrollOutcome {
            position,
            load: self.ensure_visible(),
        }
    }

    pub fn load_more(&mut self) -> Option<LoadFuture> {
        if self.is_destroyed() {
            return None;
        }
        self.loader.load_more()
    }

    /// Drops every loaded item and reloads the current render range.
    pub fn reload(&mut self) -> Option<LoadFuture> {
        if self.is_destroyed() {
            return None;
        }
        self.dirty = true;
        self.loader.reload(self.viewport.render_range())
    }

    /// Tears everything down and releases all elements through `renderer`.
    ///
    /// Idempotent; every other entry point is a no-op afterwards.
    pub fn destroy<R: Renderer<T, Element = E>>(&mut self, renderer: &mut R) {
        if self.is_destroyed() {
            return;
        }
        self.loader.destroy();
        self.recycler.clear::<T, R>(renderer);
        self.last_range = None;
        self.dirty = false;
        vdebug!("Controller::destroy");
    }

    pub fn is_destroyed(&self) -> bool {
        self.loader.is_destroyed()
    }

    fn ensure_visible(&self) -> Option<LoadFuture> {
        let range = self.viewport.render_range()?;
        match self.loader.ensure_range(range.start, range.end) {
            RangeRequest::Pending(load) => Some(load),
            RangeRequest::Resident | RangeRequest::Deferred => None,
        }
    }

    /// Adopts a total discovered by a load.
    fn sync_total(&mut self) {
        let total = self.loader.total();
        if total != self.viewport.total() {
            vdebug!(total, "Controller: total changed by load");
            self.viewport.set_total(total);
            self.changed();
        }
    }

    fn changed(&mut self) {
        self.dirty = true;
        let range = self.viewport.render_range();
        if range != self.last_range {
            self.last_range = range;
            vtrace!(?range, "range change");
            self.loader.events().emit(&Event::RangeChange { range });
        }
    }

    fn idle_outcome(&self) -> ScrollOutcome {
        ScrollOutcome {
            position: self.viewport.scroll_position(),
            load: None,
        }
    }
}
