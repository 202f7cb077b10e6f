use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use sparse_virtualizer::{
    AdapterError, Align, ConfigError, DataAdapter, Item, ItemId, LoaderOptions, ReadRequest, ReadResponse,
    ScrollSnapshot, Slot, ViewportOptions,
};
use sparse_virtualizer_adapter::{Controller, RecyclerOptions, Renderer};

struct Message(u64);

impl Item for Message {
    fn id(&self) -> ItemId {
        ItemId::Str(format!("msg-{}", self.0))
    }
}

struct Inbox;

impl DataAdapter<Message> for Inbox {
    fn read(
        &self,
        request: ReadRequest,
    ) -> LocalBoxFuture<'static, Result<ReadResponse<Message>, AdapterError>> {
        let items = (request.offset..request.offset + request.limit)
            .map(|i| Message(i as u64))
            .collect();
        future::ready(Ok(ReadResponse::new(items))).boxed_local()
    }
}

struct Noop;

impl Renderer<Message> for Noop {
    type Element = ();

    fn create(&mut self) {}

    fn update(&mut self, _: &mut (), _: usize, _: &Slot<'_, Message>) {}

    fn position(&mut self, _: &mut (), _: f64) {}

    fn release(&mut self, _: ()) {}
}

fn open(adapter: &Rc<Inbox>) -> Result<Controller<Message, ()>, ConfigError> {
    let viewport = ViewportOptions::variable(50_000, |i| if i % 10 == 0 { 64 } else { 40 })
        .with_container_size(600);
    Controller::new(
        Rc::clone(adapter),
        viewport,
        LoaderOptions::default(),
        RecyclerOptions::default(),
    )
}

fn main() -> Result<(), ConfigError> {
    // Example: keep the reading position across a view being torn down and rebuilt.
    let adapter = Rc::new(Inbox);
    let mut c = open(&adapter)?;
    c.scroll_to_index(31_337, Align::Center);
    let _ = c.on_scroll(c.viewport().scroll_position() + 17.0, 0);

    let snapshot = c.scroll_snapshot(Some(vec![ItemId::from("msg-31337")]));
    println!("snapshot: {snapshot:?}");
    c.destroy(&mut Noop);

    // Persist the snapshot however the host likes; here it is just copied.
    let saved: ScrollSnapshot = snapshot.clone();

    let mut reopened = open(&adapter)?;
    let outcome = reopened.restore_scroll(&saved);
    println!(
        "restored to {:.1}, visible={:?}, load pending={}",
        outcome.position,
        reopened.state().visible_range,
        outcome.load.is_some()
    );
    assert_eq!(reopened.scroll_snapshot(None).index, snapshot.index);
    Ok(())
}
