use std::cell::RefCell;
use std::mem;
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};

use crate::{
    AdapterError, ConfigError, Event, EventEmitter, Item, ItemRange, LoadError, LoadOperation,
    LoaderOptions, PlaceholderGenerator, ScrollDirection, SparseStore, VelocityTracker,
};

/// A read issued to the data adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadRequest {
    pub offset: usize,
    pub limit: usize,
    /// Opaque continuation token from the previous response, for cursor-paginated sources.
    pub cursor: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReadResponse<T> {
    /// Items starting at the requested offset. May be shorter than `limit`.
    pub items: Vec<T>,
    pub total: Option<usize>,
    pub cursor: Option<String>,
    pub has_more: Option<bool>,
}

impl<T> ReadResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            total: None,
            cursor: None,
            has_more: None,
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_has_more(mut self, has_more: bool) -> Self {
        self.has_more = Some(has_more);
        self
    }
}

/// The external data source.
///
/// Reads are never cancelled: a returned future is either driven to completion or dropped.
pub trait DataAdapter<T> {
    fn read(
        &self,
        request: ReadRequest,
    ) -> LocalBoxFuture<'static, Result<ReadResponse<T>, AdapterError>>;
}

impl<T, A: DataAdapter<T> + ?Sized> DataAdapter<T> for Rc<A> {
    fn read(
        &self,
        request: ReadRequest,
    ) -> LocalBoxFuture<'static, Result<ReadResponse<T>, AdapterError>> {
        (**self).read(request)
    }
}

/// A load shared by every caller that asked for an overlapping range.
///
/// Resolves once the items are committed to the store (or the load failed). Results of loads
/// superseded by [`LoadCoordinator::reload`] resolve to `Ok(())` without being committed.
pub type LoadFuture = Shared<LocalBoxFuture<'static, Result<(), LoadError>>>;

/// Outcome of [`LoadCoordinator::ensure_range`].
#[derive(Clone)]
pub enum RangeRequest {
    /// Every chunk of the range is already loaded.
    Resident,
    /// Scrolling is too fast (or just started); the range is loaded on the next idle tick.
    Deferred,
    Pending(LoadFuture),
}

impl RangeRequest {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// A future that resolves immediately unless a load is pending.
    pub fn into_future(self) -> LocalBoxFuture<'static, Result<(), LoadError>> {
        match self {
            Self::Pending(load) => load.boxed_local(),
            Self::Resident | Self::Deferred => future::ready(Ok(())).boxed_local(),
        }
    }
}

impl std::fmt::Debug for RangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resident => f.write_str("Resident"),
            Self::Deferred => f.write_str("Deferred"),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadState {
    Idle,
    Loading,
    Error,
}

/// A snapshot of the coordinator's data bookkeeping.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataState {
    pub total: usize,
    pub cached: usize,
    pub is_loading: bool,
    /// Reads in flight.
    pub pending_ranges: Vec<ItemRange>,
    /// A range held back by the velocity gate until the next idle tick.
    pub deferred_range: Option<ItemRange>,
    pub has_more: bool,
    pub cursor: Option<String>,
    pub error: Option<LoadError>,
}

struct InFlight {
    id: u64,
    range: ItemRange,
    future: LoadFuture,
}

enum Gate {
    Defer,
    Load(ItemRange),
}

struct Inner<T> {
    options: LoaderOptions,
    store: SparseStore<T>,
    placeholders: PlaceholderGenerator,
    velocity: VelocityTracker,
    total_known: bool,
    in_flight: Vec<InFlight>,
    deferred: Option<ItemRange>,
    deferred_load_more: bool,
    // End of the contiguous prefix loaded so far; where the next page starts.
    next_offset: usize,
    has_more: bool,
    cursor: Option<String>,
    error: Option<LoadError>,
    // Bumped by reload; completions from older epochs are dropped.
    epoch: u64,
    current: Option<ItemRange>,
    render_needed: bool,
    next_id: u64,
    destroyed: bool,
}

impl<T> Inner<T> {
    fn bound(&self) -> usize {
        if self.total_known {
            self.store.total()
        } else {
            usize::MAX
        }
    }

    /// Chunk-aligned spans of `range` that still need loading.
    ///
    /// Below `store.total()` residency comes from the store. With an unknown count, everything
    /// past the loaded end is missing and is requested in whole chunks.
    fn missing(&self, range: ItemRange) -> Vec<ItemRange> {
        let total = self.store.total();
        let mut out = self.store.find_unloaded_ranges(range.start, range.end);
        if (self.total_known && total > 0) || range.end < total {
            return out;
        }
        let chunk_size = self.options.store.chunk_size;
        let from = range.start.max(total);
        let start = (from / chunk_size * chunk_size).max(total);
        let end = (range.end / chunk_size + 1)
            .saturating_mul(chunk_size)
            .saturating_sub(1);
        match out.last_mut() {
            Some(prev) if prev.end + 1 >= start => prev.end = prev.end.max(end),
            _ => out.push(ItemRange { start, end }),
        }
        out
    }

    fn gate(&self, range: ItemRange) -> Gate {
        let velocity = &self.velocity;
        if !velocity.is_active() {
            return Gate::Load(range);
        }
        if !velocity.is_tracking() {
            return Gate::Defer;
        }
        let speed = velocity.speed();
        if speed > self.options.cancel_threshold {
            return Gate::Defer;
        }
        if speed < self.options.preload_threshold {
            return Gate::Load(range);
        }
        let ahead = self.options.preload_ahead;
        let bound = self.bound();
        Gate::Load(match velocity.direction() {
            Some(ScrollDirection::Forward) => range.expand(0, ahead, bound),
            Some(ScrollDirection::Backward) => range.expand(ahead, 0, bound),
            None => range,
        })
    }

    /// Splits `spans` against in-flight loads: what still needs a read, and the loads to join.
    fn subtract_in_flight(&self, spans: &[ItemRange]) -> (Vec<ItemRange>, Vec<LoadFuture>) {
        let mut pieces = spans.to_vec();
        let mut joined = Vec::new();
        for load in &self.in_flight {
            if !pieces.iter().any(|p| p.intersects(&load.range)) {
                continue;
            }
            joined.push(load.future.clone());
            pieces = pieces
                .into_iter()
                .flat_map(|p| split(p, load.range))
                .collect();
        }
        (pieces, joined)
    }
}

/// `piece` minus `cut`.
fn split(piece: ItemRange, cut: ItemRange) -> Vec<ItemRange> {
    if !piece.intersects(&cut) {
        return vec![piece];
    }
    let mut out = Vec::with_capacity(2);
    if piece.start < cut.start {
        out.push(ItemRange {
            start: piece.start,
            end: cut.start - 1,
        });
    }
    if piece.end > cut.end {
        out.push(ItemRange {
            start: cut.end + 1,
            end: piece.end,
        });
    }
    out
}

fn combine(mut loads: Vec<LoadFuture>) -> Option<LoadFuture> {
    match loads.len() {
        0 => None,
        1 => loads.pop(),
        _ => Some(
            future::join_all(loads)
                .map(|results| results.into_iter().collect::<Result<(), LoadError>>())
                .boxed_local()
                .shared(),
        ),
    }
}

#[derive(Clone, Copy)]
struct Completion {
    id: u64,
    epoch: u64,
    operation: LoadOperation,
    offset: usize,
    limit: usize,
}

/// Decides what to fetch and when, and owns the sparse store it fetches into.
///
/// All state lives behind a single-threaded `Rc<RefCell<_>>`; load futures keep a weak handle
/// and commit their results when the host's executor drives them. Do not poll a load future
/// from inside a [`Self::read`] or [`Self::with_store`] closure.
pub struct LoadCoordinator<T> {
    inner: Rc<RefCell<Inner<T>>>,
    adapter: Rc<dyn DataAdapter<T>>,
    events: Rc<EventEmitter>,
}

impl<T: Item + 'static> LoadCoordinator<T> {
    pub fn new(
        adapter: impl DataAdapter<T> + 'static,
        options: LoaderOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        vdebug!(
            chunk_size = options.store.chunk_size,
            max_cached_items = options.store.max_cached_items,
            page_size = options.page_size,
            "LoadCoordinator::new"
        );
        let inner = Inner {
            options,
            store: SparseStore::new(options.store)?,
            placeholders: PlaceholderGenerator::new(options.placeholder)?,
            velocity: VelocityTracker::new(options.velocity)?,
            total_known: false,
            in_flight: Vec::new(),
            deferred: None,
            deferred_load_more: false,
            next_offset: 0,
            has_more: true,
            cursor: None,
            error: None,
            epoch: 0,
            current: None,
            render_needed: false,
            next_id: 0,
            destroyed: false,
        };
        Ok(Self {
            inner: Rc::new(RefCell::new(inner)),
            adapter: Rc::new(adapter),
            events: Rc::new(EventEmitter::new()),
        })
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn options(&self) -> LoaderOptions {
        self.inner.borrow().options
    }

    pub fn total(&self) -> usize {
        self.inner.borrow().store.total()
    }

    pub fn set_total(&self, total: usize) {
        let mut inner = self.inner.borrow_mut();
        if inner.destroyed {
            return;
        }
        vdebug!(total, "LoadCoordinator::set_total");
        inner.store.set_total(total);
        inner.total_known = true;
        inner.next_offset = inner.next_offset.min(total);
    }

    /// Feeds a logical scroll position into the velocity tracker.
    pub fn record_scroll(&self, position: f64, now_ms: u64) {
        let mut inner = self.inner.borrow_mut();
        if inner.destroyed {
            return;
        }
        inner.velocity.add_sample(position, now_ms);
    }

    /// Current scroll velocity in logical units per millisecond.
    pub fn velocity(&self) -> f64 {
        self.inner.borrow().velocity.velocity()
    }

    /// Makes sure `start..=end` gets loaded, subject to velocity gating.
    ///
    /// Missing chunk-aligned spans that overlap an in-flight load join it; only the remainder is
    /// read from the adapter.
    pub fn ensure_range(&self, start: usize, end: usize) -> RangeRequest {
        match ItemRange::new(start, end) {
            Some(range) => self.ensure(range, true),
            None => RangeRequest::Resident,
        }
    }

    fn ensure(&self, range: ItemRange, gated: bool) -> RangeRequest {
        let mut starts = Vec::new();
        let load = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return RangeRequest::Deferred;
            }
            let range = if inner.total_known {
                match range.clamp_to(inner.store.total()) {
                    Some(range) => range,
                    None => return RangeRequest::Resident,
                }
            } else {
                range
            };
            inner.current = Some(range);
            inner.store.touch_chunks_for_range(range.start, range.end);
            if inner.missing(range).is_empty() {
                return RangeRequest::Resident;
            }

            let target = if gated {
                match inner.gate(range) {
                    Gate::Load(target) => target,
                    Gate::Defer => {
                        vtrace!(%range, velocity = inner.velocity.velocity(), "load deferred");
                        inner.deferred = Some(range);
                        return RangeRequest::Deferred;
                    }
                }
            } else {
                range
            };
            inner.deferred = None;

            let missing = inner.missing(target);
            let (pieces, mut loads) = inner.subtract_in_flight(&missing);
            for piece in pieces {
                let (load, start) = self.issue(&mut inner, LoadOperation::EnsureRange, piece, None);
                loads.push(load);
                starts.push(start);
            }
            combine(loads)
        };
        for event in &starts {
            self.events.emit(event);
        }
        match load {
            Some(load) => RangeRequest::Pending(load),
            None => RangeRequest::Resident,
        }
    }

    /// Requests the next sequential page.
    ///
    /// No-op (`None`) when there is nothing more, when any load is in flight, or when scrolling
    /// is too fast; in the last case the page is requested on the next idle tick.
    pub fn load_more(&self) -> Option<LoadFuture> {
        self.load_more_inner(true)
    }

    fn load_more_inner(&self, gated: bool) -> Option<LoadFuture> {
        let (load, start) = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed || !inner.has_more || !inner.in_flight.is_empty() {
                return None;
            }
            let offset = inner.next_offset;
            let mut limit = inner.options.page_size;
            if inner.total_known {
                let total = inner.store.total();
                if offset >= total {
                    inner.has_more = false;
                    return None;
                }
                limit = limit.min(total - offset);
            }
            let range = ItemRange {
                start: offset,
                end: offset + limit - 1,
            };
            if gated && matches!(inner.gate(range), Gate::Defer) {
                vtrace!(%range, "load_more deferred");
                inner.deferred_load_more = true;
                return None;
            }
            let cursor = inner.cursor.clone();
            self.issue(&mut inner, LoadOperation::LoadMore, range, cursor)
        };
        self.events.emit(&start);
        Some(load)
    }

    /// Drops everything loaded so far and loads `range` (or the first page) without gating.
    ///
    /// Loads still in flight from before the reload are ignored when they complete.
    pub fn reload(&self, range: Option<ItemRange>) -> Option<LoadFuture> {
        let mut starts = Vec::new();
        let load = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return None;
            }
            inner.epoch += 1;
            vdebug!(epoch = inner.epoch, "LoadCoordinator::reload");
            inner.store.clear();
            inner.in_flight.clear();
            inner.deferred = None;
            inner.deferred_load_more = false;
            inner.next_offset = 0;
            inner.has_more = true;
            inner.cursor = None;
            inner.error = None;
            inner.render_needed = false;

            let total = inner.store.total();
            let page = ItemRange {
                start: 0,
                end: inner.options.page_size - 1,
            };
            let requested = range.unwrap_or(page);
            let target = if inner.total_known && total > 0 {
                requested
                    .clamp_to(total)
                    .or_else(|| page.clamp_to(total))
                    .unwrap_or(page)
            } else {
                requested
            };
            inner.current = Some(target);

            let mut loads = Vec::new();
            for piece in inner.missing(target) {
                let (load, start) = self.issue(&mut inner, LoadOperation::Reload, piece, None);
                loads.push(load);
                starts.push(start);
            }
            combine(loads)
        };
        for event in &starts {
            self.events.emit(event);
        }
        load
    }

    /// Detects the end of a scroll gesture and flushes deferred work exactly once.
    pub fn tick(&self, now_ms: u64) -> Option<LoadFuture> {
        let (deferred, more) = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed || !inner.velocity.check_idle(now_ms) {
                return None;
            }
            (
                inner.deferred.take(),
                mem::take(&mut inner.deferred_load_more),
            )
        };
        if deferred.is_some() || more {
            vdebug!(?deferred, load_more = more, "idle: flushing deferred loads");
        }
        let mut loads = Vec::new();
        if let Some(range) = deferred {
            if let RangeRequest::Pending(load) = self.ensure(range, false) {
                loads.push(load);
            }
        }
        if more {
            loads.extend(self.load_more_inner(false));
        }
        combine(loads)
    }

    /// The range waiting for the next idle tick, if any.
    pub fn deferred_range(&self) -> Option<ItemRange> {
        self.inner.borrow().deferred
    }

    /// Evicts distant chunks, then falls back to plain LRU while still over budget.
    pub fn evict(&self, visible: ItemRange) -> usize {
        let mut inner = self.inner.borrow_mut();
        let mut evicted = inner.store.evict_distant(visible.start, visible.end);
        if inner.store.cached() > inner.options.store.max_cached_items {
            evicted += inner.store.evict_to_limit();
        }
        evicted
    }

    pub fn touch(&self, range: ItemRange) {
        self.inner
            .borrow_mut()
            .store
            .touch_chunks_for_range(range.start, range.end);
    }

    /// Borrows the store and placeholder generator for a render pass.
    pub fn read<R>(&self, f: impl FnOnce(&SparseStore<T>, &PlaceholderGenerator) -> R) -> R {
        let inner = self.inner.borrow();
        f(&inner.store, &inner.placeholders)
    }

    /// Mutable access to the store, for data the host already has.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut SparseStore<T>) -> R) -> R {
        f(&mut self.inner.borrow_mut().store)
    }

    /// Whether a load that touches the current range completed since the last call.
    pub fn take_render_needed(&self) -> bool {
        mem::take(&mut self.inner.borrow_mut().render_needed)
    }

    pub fn data_state(&self) -> DataState {
        let inner = self.inner.borrow();
        DataState {
            total: inner.store.total(),
            cached: inner.store.cached(),
            is_loading: !inner.in_flight.is_empty(),
            pending_ranges: inner.in_flight.iter().map(|l| l.range).collect(),
            deferred_range: inner.deferred,
            has_more: inner.has_more,
            cursor: inner.cursor.clone(),
            error: inner.error.clone(),
        }
    }

    pub fn load_state(&self) -> LoadState {
        let inner = self.inner.borrow();
        if !inner.in_flight.is_empty() {
            LoadState::Loading
        } else if inner.error.is_some() {
            LoadState::Error
        } else {
            LoadState::Idle
        }
    }

    /// Drops pending and deferred work, the store contents and every event handler.
    ///
    /// Idempotent. Every other entry point is a no-op afterwards.
    pub fn destroy(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            inner.in_flight.clear();
            inner.deferred = None;
            inner.deferred_load_more = false;
            inner.current = None;
            inner.store.clear();
            inner.velocity.reset();
        }
        self.events.clear();
        vdebug!("LoadCoordinator::destroy");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    fn issue(
        &self,
        inner: &mut Inner<T>,
        operation: LoadOperation,
        range: ItemRange,
        cursor: Option<String>,
    ) -> (LoadFuture, Event) {
        let id = inner.next_id;
        inner.next_id += 1;
        let load = Completion {
            id,
            epoch: inner.epoch,
            operation,
            offset: range.start,
            limit: range.len(),
        };
        vdebug!(
            operation = operation.name(),
            offset = load.offset,
            limit = load.limit,
            "load start"
        );

        let read = self.adapter.read(ReadRequest {
            offset: load.offset,
            limit: load.limit,
            cursor,
        });
        let weak = Rc::downgrade(&self.inner);
        let events = Rc::clone(&self.events);
        let future = async move {
            let result = read.await;
            finish(&weak, &events, load, result)
        }
        .boxed_local()
        .shared();

        inner.in_flight.push(InFlight {
            id,
            range,
            future: future.clone(),
        });
        let start = Event::LoadStart {
            operation,
            offset: load.offset,
            limit: load.limit,
        };
        (future, start)
    }
}

/// Commits a completed read. Runs inside the load future, on the host's executor.
fn finish<T: Item>(
    weak: &Weak<RefCell<Inner<T>>>,
    events: &EventEmitter,
    load: Completion,
    result: Result<ReadResponse<T>, AdapterError>,
) -> Result<(), LoadError> {
    let Some(shared) = weak.upgrade() else {
        return Ok(());
    };
    let mut inner = shared.borrow_mut();
    inner.in_flight.retain(|l| l.id != load.id);
    if inner.destroyed || load.epoch != inner.epoch {
        vdebug!(
            operation = load.operation.name(),
            offset = load.offset,
            "discarding superseded load"
        );
        return Ok(());
    }

    let response = match result {
        Ok(response) => response,
        Err(source) => {
            let error = LoadError {
                operation: load.operation,
                source,
            };
            inner.error = Some(error.clone());
            drop(inner);
            vwarn!(
                operation = load.operation.name(),
                offset = load.offset,
                limit = load.limit,
                error = %error,
                "load failed"
            );
            events.emit(&Event::Error {
                error: error.clone(),
                offset: load.offset,
                limit: load.limit,
            });
            return Err(error);
        }
    };

    let count = response.items.len();
    let end = load.offset.saturating_add(count);
    let before = inner.store.total();
    match response.total {
        Some(total) => {
            inner.store.set_total(total);
            inner.total_known = true;
        }
        None if end > before => inner.store.set_total(end),
        None => {}
    }
    let total = inner.store.total();
    inner.store.set_range(load.offset, response.items);

    if load.offset <= inner.next_offset {
        inner.next_offset = inner.next_offset.max(end.min(total));
    }
    if response.cursor.is_some() {
        inner.cursor = response.cursor;
    }
    inner.has_more = response.has_more.unwrap_or(if inner.total_known {
        inner.next_offset < total
    } else {
        count >= load.limit
    });
    inner.error = None;

    if !inner.placeholders.has_analyzed_structure() {
        let Inner {
            store,
            placeholders,
            ..
        } = &mut *inner;
        let sample = store.sample(placeholders.options().sample_size);
        placeholders.analyze_structure(sample);
    }

    let loaded = ItemRange::new(load.offset, end.saturating_sub(1)).filter(|_| count > 0);
    let current = inner.current;
    let touches_current = loaded.is_some_and(|l| current.is_none_or(|c| c.intersects(&l)));
    if total != before || touches_current {
        inner.render_needed = true;
    }
    let reported_total = inner.total_known.then_some(total);
    drop(inner);

    vdebug!(
        operation = load.operation.name(),
        offset = load.offset,
        count,
        total = ?reported_total,
        "load end"
    );
    events.emit(&Event::LoadEnd {
        operation: load.operation,
        offset: load.offset,
        count,
        total: reported_total,
    });
    Ok(())
}
