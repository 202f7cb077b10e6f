use futures::executor::block_on;
use futures::future::{self, FutureExt, LocalBoxFuture};
use sparse_virtualizer::{
    AdapterError, DataAdapter, FieldValue, Item, ItemId, LoaderOptions, ReadRequest,
    ReadResponse, Slot, ViewportOptions,
};
use sparse_virtualizer_adapter::{Controller, RecyclerOptions, Renderer};

struct Track {
    id: u64,
    title: String,
}

impl Item for Track {
    fn id(&self) -> ItemId {
        ItemId::Int(self.id)
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&str, FieldValue<'_>)) {
        visit("title", FieldValue::Text(&self.title));
    }
}

struct Library;

impl DataAdapter<Track> for Library {
    fn read(
        &self,
        request: ReadRequest,
    ) -> LocalBoxFuture<'static, Result<ReadResponse<Track>, AdapterError>> {
        let items = (request.offset..request.offset + request.limit)
            .map(|i| Track {
                id: i as u64,
                title: format!("Track #{i}"),
            })
            .collect();
        future::ready(Ok(ReadResponse::new(items).with_total(2_000_000))).boxed_local()
    }
}

/// A terminal "renderer": each element is a line buffer with a y coordinate.
#[derive(Default)]
struct Lines {
    created: usize,
}

struct Line {
    y: f64,
    text: String,
}

impl Renderer<Track> for Lines {
    type Element = Line;

    fn create(&mut self) -> Line {
        self.created += 1;
        Line {
            y: 0.0,
            text: String::new(),
        }
    }

    fn update(&mut self, line: &mut Line, index: usize, slot: &Slot<'_, Track>) {
        line.text = match slot {
            Slot::Loaded(track) => format!("{index:>8} {}", track.title),
            Slot::Placeholder(p) => format!(
                "{index:>8} {}",
                p.field("title").and_then(|v| v.as_text()).unwrap_or("...")
            ),
        };
    }

    fn position(&mut self, line: &mut Line, y: f64) {
        line.y = y;
    }

    fn release(&mut self, _line: Line) {}
}

fn main() -> Result<(), sparse_virtualizer::Error> {
    // Example: a two million row list with 24px rows, driven like a UI frame loop would.
    let mut c = Controller::new(
        Library,
        ViewportOptions::fixed(2_000_000, 24).with_container_size(480),
        LoaderOptions::default(),
        RecyclerOptions::default(),
    )?;
    let mut lines = Lines::default();

    if let Some(load) = c.scroll_to_index(0, sparse_virtualizer::Align::Start).load {
        block_on(load)?;
    }
    let stats = c.render(&mut lines, 0);
    println!("first frame: {stats:?}");

    // A fling: samples arrive every frame, loads are held back until the gesture ends.
    let mut now_ms = 0u64;
    for step in 1..=6 {
        now_ms += 16;
        let _ = c.on_scroll(step as f64 * 150_000.0, now_ms);
        c.render(&mut lines, now_ms);
    }
    println!(
        "during fling: deferred={:?} state={:?}",
        c.loader().deferred_range(),
        c.data_state()
    );

    now_ms += 200;
    if let Some(load) = c.tick(now_ms) {
        block_on(load)?;
    }
    if c.needs_render() {
        let stats = c.render(&mut lines, now_ms);
        println!("after idle: {stats:?}");
    }

    let state = c.state();
    println!(
        "compressed={} ratio={:.3} visible={:?}",
        state.is_compressed, state.compression_ratio, state.visible_range
    );
    for (_, line) in c.recycler().iter().take(5) {
        println!("{:>10.1} {}", line.y, line.text);
    }
    println!("elements created: {}", lines.created);

    c.destroy(&mut lines);
    Ok(())
}
