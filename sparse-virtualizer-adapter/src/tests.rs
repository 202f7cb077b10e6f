use crate::*;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::executor::block_on;
use futures::future::{self, FutureExt, LocalBoxFuture};
use sparse_virtualizer::{
    AdapterError, Align, DEFAULT_IDLE_TIMEOUT_MS, DataAdapter, Event, EventKind, FieldValue, Item,
    ItemId, ItemRange, LoaderOptions, PlaceholderGenerator, PlaceholderOptions, ReadRequest,
    ReadResponse, Slot, SparseStore, StoreOptions, ViewportOptions,
};

#[derive(Clone, Debug, PartialEq)]
struct Row {
    id: u64,
    name: String,
}

impl Item for Row {
    fn id(&self) -> ItemId {
        ItemId::Int(self.id)
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&str, FieldValue<'_>)) {
        visit("name", FieldValue::Text(&self.name));
    }
}

fn rows(offset: usize, limit: usize) -> Vec<Row> {
    (offset..offset + limit)
        .map(|i| Row {
            id: i as u64,
            name: format!("row {i}"),
        })
        .collect()
}

fn range(start: usize, end: usize) -> ItemRange {
    ItemRange { start, end }
}

#[derive(Debug, PartialEq)]
struct Element {
    serial: u32,
    text: String,
    placeholder: bool,
    position: f64,
}

/// Records every renderer call so tests can count them.
#[derive(Default)]
struct Recorder {
    next: u32,
    updates: usize,
    moves: usize,
    released: Vec<u32>,
}

impl Renderer<Row> for Recorder {
    type Element = Element;

    fn create(&mut self) -> Element {
        self.next += 1;
        Element {
            serial: self.next,
            text: String::new(),
            placeholder: false,
            position: -1.0,
        }
    }

    fn update(&mut self, element: &mut Element, _index: usize, slot: &Slot<'_, Row>) {
        self.updates += 1;
        element.placeholder = slot.is_placeholder();
        element.text = match slot {
            Slot::Loaded(row) => row.name.clone(),
            Slot::Placeholder(p) => p
                .fields
                .first()
                .and_then(|(_, v)| v.as_text())
                .unwrap_or_default()
                .to_string(),
        };
    }

    fn position(&mut self, element: &mut Element, position: f64) {
        self.moves += 1;
        element.position = position;
    }

    fn release(&mut self, element: Element) {
        self.released.push(element.serial);
    }
}

struct Fixture {
    store: SparseStore<Row>,
    placeholders: PlaceholderGenerator,
    recycler: Recycler<Element>,
    renderer: Recorder,
}

impl Fixture {
    fn new(options: RecyclerOptions) -> Self {
        let mut store = SparseStore::new(StoreOptions::default()).unwrap();
        store.set_total(1_000);
        Self {
            store,
            placeholders: PlaceholderGenerator::new(PlaceholderOptions::default()).unwrap(),
            recycler: Recycler::new(options),
            renderer: Recorder::default(),
        }
    }

    fn pass(&mut self, range: Option<ItemRange>, now_ms: u64) -> RecycleStats {
        let store = &self.store;
        let placeholders = &self.placeholders;
        self.recycler.reconcile(
            &mut self.renderer,
            range,
            |i| placeholders.slot(store, i),
            |i| i as f64 * 10.0,
            now_ms,
        )
    }
}

#[test]
fn first_pass_creates_and_repeat_pass_is_noop() {
    let mut f = Fixture::new(RecyclerOptions::default());
    let stats = f.pass(Some(range(0, 9)), 0);
    assert_eq!(
        stats,
        RecycleStats {
            created: 10,
            reused: 0,
            updated: 10,
            repositioned: 10,
            released: 0,
        }
    );
    assert_eq!(f.recycler.active_len(), 10);
    assert_eq!(f.recycler.element(3).unwrap().position, 30.0);

    let stats = f.pass(Some(range(0, 9)), 5);
    assert!(stats.is_noop());
    assert_eq!(f.renderer.updates, 10);
    assert_eq!(f.renderer.moves, 10);
}

#[test]
fn overlapping_scroll_only_touches_new_indexes() {
    let mut f = Fixture::new(RecyclerOptions::default());
    f.pass(Some(range(0, 9)), 0);
    let kept = f.recycler.slot_of(7);

    let stats = f.pass(Some(range(5, 14)), 10);
    assert_eq!(stats.created, 5);
    assert_eq!(stats.updated, 5);
    assert_eq!(stats.repositioned, 5);
    assert_eq!(f.recycler.retiring_len(), 5);
    assert_eq!(f.recycler.slot_of(7), kept);
    let indexes: Vec<usize> = f.recycler.iter().map(|(i, _)| i).collect();
    assert_eq!(indexes, (5..=14).collect::<Vec<_>>());
}

#[test]
fn scrolling_back_within_grace_reuses_parked_elements_untouched() {
    let mut f = Fixture::new(RecyclerOptions::default());
    f.pass(Some(range(0, 9)), 0);
    let first = f.recycler.slot_of(0);
    f.pass(Some(range(5, 14)), 10);

    let stats = f.pass(Some(range(0, 9)), 50);
    assert_eq!(
        stats,
        RecycleStats {
            reused: 5,
            ..RecycleStats::default()
        }
    );
    assert_eq!(f.recycler.slot_of(0), first);
    assert_eq!(f.recycler.retiring_len(), 5);
}

#[test]
fn expired_grace_returns_elements_to_pool() {
    let mut f = Fixture::new(RecyclerOptions::default());
    f.pass(Some(range(0, 9)), 0);
    f.pass(Some(range(20, 29)), 10);
    assert_eq!(f.recycler.retiring_len(), 10);
    assert_eq!(f.recycler.pool_len(), 0);

    // 0..=9 expire at 110; 20..=29 start their own grace period.
    let stats = f.pass(Some(range(40, 49)), 200);
    assert_eq!(stats.created, 0);
    assert_eq!(stats.reused, 10);
    assert_eq!(stats.updated, 10);
    assert_eq!(stats.repositioned, 10);
    assert_eq!(f.recycler.pool_len(), 0);
    assert_eq!(f.recycler.retiring_len(), 10);
    assert_eq!(f.renderer.next, 20);
}

#[test]
fn pool_overflow_is_released() {
    let mut f = Fixture::new(RecyclerOptions::default().with_grace_ms(0).with_max_pool(2));
    f.pass(Some(range(0, 4)), 0);
    f.pass(Some(range(10, 14)), 1);

    let stats = f.pass(Some(range(10, 14)), 2);
    assert_eq!(
        stats,
        RecycleStats {
            released: 3,
            ..RecycleStats::default()
        }
    );
    assert_eq!(f.recycler.pool_len(), 2);
    assert_eq!(f.renderer.released.len(), 3);
}

#[test]
fn flush_alone_moves_expired_elements() {
    let mut f = Fixture::new(RecyclerOptions::default());
    f.pass(Some(range(0, 4)), 0);
    f.pass(None, 0);
    assert_eq!(f.recycler.active_len(), 0);
    assert_eq!(f.recycler.retiring_len(), 5);

    assert_eq!(f.recycler.flush::<Row, _>(&mut f.renderer, 99), 0);
    assert_eq!(f.recycler.retiring_len(), 5);
    assert_eq!(f.recycler.flush::<Row, _>(&mut f.renderer, 100), 0);
    assert_eq!(f.recycler.retiring_len(), 0);
    assert_eq!(f.recycler.pool_len(), 5);
}

#[test]
fn placeholder_becomes_loaded_item_in_place() {
    let mut f = Fixture::new(RecyclerOptions::default());
    f.pass(Some(range(0, 2)), 0);
    let slot = f.recycler.slot_of(1);
    assert!(f.recycler.element(1).unwrap().placeholder);

    f.store.set_range(0, rows(0, 3));
    let stats = f.pass(Some(range(0, 2)), 1);
    assert_eq!(stats.updated, 3);
    assert_eq!(stats.repositioned, 0);
    assert_eq!(stats.created + stats.reused, 0);
    assert_eq!(f.recycler.slot_of(1), slot);

    let element = f.recycler.element(1).unwrap();
    assert!(!element.placeholder);
    assert_eq!(element.text, "row 1");
}

#[test]
fn clear_releases_active_parked_and_pooled() {
    let mut f = Fixture::new(RecyclerOptions::default());
    f.pass(Some(range(0, 4)), 0);
    f.pass(Some(range(10, 14)), 0);
    f.pass(Some(range(20, 24)), 150);
    assert_eq!(f.recycler.pool_len(), 0);
    assert_eq!(f.recycler.active_len(), 5);
    assert_eq!(f.recycler.retiring_len(), 5);

    let released = f.recycler.clear::<Row, _>(&mut f.renderer);
    assert_eq!(released, 10);
    assert_eq!(f.renderer.released.len(), 10);
    assert_eq!(f.recycler.active_len() + f.recycler.retiring_len() + f.recycler.pool_len(), 0);
}

/// A data source that answers every read immediately.
struct Directory {
    total: usize,
    calls: Cell<usize>,
}

impl Directory {
    fn new(total: usize) -> Rc<Self> {
        Rc::new(Self {
            total,
            calls: Cell::new(0),
        })
    }
}

impl DataAdapter<Row> for Directory {
    fn read(
        &self,
        request: ReadRequest,
    ) -> LocalBoxFuture<'static, Result<ReadResponse<Row>, AdapterError>> {
        self.calls.set(self.calls.get() + 1);
        let end = (request.offset + request.limit).min(self.total);
        let count = end.saturating_sub(request.offset);
        let response = ReadResponse::new(rows(request.offset, count)).with_total(self.total);
        future::ready(Ok(response)).boxed_local()
    }
}

fn controller(adapter: &Rc<Directory>, viewport: ViewportOptions) -> Controller<Row, Element> {
    Controller::new(
        Rc::clone(adapter),
        viewport,
        LoaderOptions::default(),
        RecyclerOptions::default(),
    )
    .unwrap()
}

#[test]
fn controller_renders_placeholders_then_loaded_rows() {
    let adapter = Directory::new(1_000);
    let mut c = controller(&adapter, ViewportOptions::fixed(1_000, 20).with_container_size(200));
    let mut r = Recorder::default();
    let n = c.viewport().render_range().unwrap().len();

    assert!(c.needs_render());
    let stats = c.render(&mut r, 0);
    assert_eq!(stats.created, n);
    assert!(c.recycler().element(0).unwrap().placeholder);

    let load = c.scroll_to_index(0, Align::Start).load.expect("visible rows are missing");
    block_on(load).unwrap();
    assert_eq!(adapter.calls.get(), 1);
    assert!(c.needs_render());

    let stats = c.render(&mut r, 1);
    assert_eq!(stats.created + stats.reused, 0);
    assert_eq!(stats.updated, n);
    assert_eq!(stats.repositioned, 0);
    assert_eq!(c.recycler().element(0).unwrap().text, "row 0");
    assert!(!c.needs_render());
    assert!(c.render(&mut r, 2).is_noop());

    // Far away rows borrow the shape of the loaded ones.
    let _ = c.scroll_to_index(500, Align::Start);
    c.render(&mut r, 3);
    let far = c.recycler().element(500).unwrap();
    assert!(far.placeholder);
    assert!(!far.text.is_empty());
}

#[test]
fn controller_defers_fast_scroll_until_idle_tick() {
    let adapter = Directory::new(1_000_000);
    let mut c = controller(
        &adapter,
        ViewportOptions::fixed(1_000_000, 20).with_container_size(200),
    );
    for i in 0..4u64 {
        assert!(c.on_scroll(i as f64 * 20_000.0, i * 16).is_none());
    }
    assert_eq!(adapter.calls.get(), 0);
    assert!(c.loader().deferred_range().is_some());

    assert!(c.tick(100).is_none());
    let load = c.tick(48 + 150).expect("deferred range flushes on idle");
    block_on(load).unwrap();
    assert_eq!(adapter.calls.get(), 1);

    let mut r = Recorder::default();
    c.render(&mut r, 200);
    let start = c.viewport().render_range().unwrap().start;
    let element = c.recycler().element(start).unwrap();
    assert_eq!(element.text, format!("row {start}"));
    assert!((element.position - c.viewport().item_position(start)).abs() < 1e-9);
}

#[test]
fn controller_emits_range_change_only_when_range_moves() {
    let adapter = Directory::new(10_000);
    let mut c = controller(&adapter, ViewportOptions::fixed(10_000, 20).with_container_size(200));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    c.events().on(EventKind::RangeChange, move |event| {
        if let Event::RangeChange { range } = event {
            sink.borrow_mut().push(*range);
        }
        Ok(())
    });

    let _ = c.on_scroll(0.0, 0);
    assert!(seen.borrow().is_empty());
    let _ = c.on_scroll(400.0, 10);
    let _ = c.on_scroll(400.0, 20);
    assert_eq!(seen.borrow().len(), 1);
    let _ = c.on_resize(400);
    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(seen.borrow()[1], c.viewport().render_range());
}

#[test]
fn controller_snapshot_restores_into_fresh_controller() {
    let adapter = Directory::new(10_000);
    let options = ViewportOptions::fixed(10_000, 20).with_container_size(200);
    let mut c = controller(&adapter, options.clone());
    let outcome = c.scroll_to_index(1_234, Align::Start);
    assert_eq!(outcome.position, 24_680.0);

    let snapshot = c.scroll_snapshot(Some(vec![ItemId::Int(7)]));
    assert_eq!(snapshot.index, 1_234);
    assert_eq!(snapshot.selected_ids, Some(vec![ItemId::Int(7)]));

    let mut restored = controller(&adapter, options);
    let outcome = restored.restore_scroll(&snapshot);
    assert_eq!(outcome.position, 24_680.0);
    assert!(outcome.load.is_some());
    assert_eq!(restored.state().visible_range.map(|r| r.start), Some(1_234));
}

#[test]
fn controller_learns_total_from_load_more() {
    let adapter = Directory::new(120);
    let mut c = controller(&adapter, ViewportOptions::fixed(0, 20).with_container_size(200));
    assert_eq!(c.viewport().render_range(), None);

    block_on(c.load_more().unwrap()).unwrap();
    assert!(c.tick(0).is_none());
    assert_eq!(c.viewport().total(), 120);
    assert!(c.data_state().has_more);

    let mut r = Recorder::default();
    c.render(&mut r, 0);
    assert_eq!(c.recycler().element(0).unwrap().text, "row 0");
}

/// A cursor-paginated source that never reports a total.
#[derive(Default)]
struct Feed {
    calls: Cell<usize>,
}

impl DataAdapter<Row> for Feed {
    fn read(
        &self,
        request: ReadRequest,
    ) -> LocalBoxFuture<'static, Result<ReadResponse<Row>, AdapterError>> {
        self.calls.set(self.calls.get() + 1);
        let next = request.offset + request.limit;
        let response = ReadResponse::new(rows(request.offset, request.limit))
            .with_cursor(format!("after-{next}"));
        future::ready(Ok(response)).boxed_local()
    }
}

#[test]
fn controller_keeps_loaded_rows_without_total() {
    let feed = Rc::new(Feed::default());
    let mut c: Controller<Row, Element> = Controller::new(
        Rc::clone(&feed),
        ViewportOptions::fixed(0, 20).with_container_size(200),
        LoaderOptions::default(),
        RecyclerOptions::default(),
    )
    .unwrap();
    block_on(c.load_more().unwrap()).unwrap();
    assert!(c.tick(0).is_none());
    assert_eq!(c.viewport().total(), 50);
    assert_eq!(c.data_state().cursor.as_deref(), Some("after-50"));

    for t in [10u64, 20, 30] {
        assert!(c.on_scroll(0.0, t).is_none());
    }
    assert_eq!(c.loader().deferred_range(), None);
    assert!(c.tick(30 + DEFAULT_IDLE_TIMEOUT_MS).is_none());
    assert!(c.scroll_to_index(3, Align::Start).load.is_none());
    assert_eq!(feed.calls.get(), 1);
}

#[test]
fn controller_destroy_releases_everything_once() {
    let adapter = Directory::new(1_000);
    let mut c = controller(&adapter, ViewportOptions::fixed(1_000, 20).with_container_size(200));
    let mut r = Recorder::default();
    c.render(&mut r, 0);
    let _ = c.scroll_to_index(500, Align::Start);
    c.render(&mut r, 1);
    let created = r.next as usize;
    let calls = adapter.calls.get();

    c.destroy(&mut r);
    assert!(c.is_destroyed());
    assert_eq!(r.released.len(), created);

    c.destroy(&mut r);
    assert_eq!(r.released.len(), created);
    assert!(c.on_scroll(100.0, 10).is_none());
    assert!(c.reload().is_none());
    assert!(c.render(&mut r, 20).is_noop());
    assert_eq!(adapter.calls.get(), calls);
}
