// Example: a remote source behind the load coordinator.
use futures::executor::block_on;
use futures::future::{self, FutureExt, LocalBoxFuture};
use sparse_virtualizer::{
    AdapterError, DataAdapter, EventKind, FieldValue, Item, ItemId, LoadCoordinator,
    LoaderOptions, RangeRequest, ReadRequest, ReadResponse,
};

#[derive(Clone, Debug)]
struct Contact {
    id: u64,
    name: String,
}

impl Item for Contact {
    fn id(&self) -> ItemId {
        ItemId::Int(self.id)
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&str, FieldValue<'_>)) {
        visit("name", FieldValue::Text(&self.name));
    }
}

/// Pretends to be a paginated HTTP endpoint holding a million contacts.
struct Directory;

impl DataAdapter<Contact> for Directory {
    fn read(
        &self,
        request: ReadRequest,
    ) -> LocalBoxFuture<'static, Result<ReadResponse<Contact>, AdapterError>> {
        println!("  read offset={} limit={}", request.offset, request.limit);
        let items = (request.offset..request.offset + request.limit)
            .map(|i| Contact {
                id: i as u64,
                name: format!("Contact #{i}"),
            })
            .collect();
        future::ready(Ok(ReadResponse::new(items).with_total(1_000_000))).boxed_local()
    }
}

fn main() -> Result<(), sparse_virtualizer::Error> {
    let loader = LoadCoordinator::new(Directory, LoaderOptions::default())?;
    loader.set_total(1_000_000);
    loader.events().on(EventKind::LoadEnd, |event| {
        println!("  event: {event:?}");
        Ok(())
    });

    // Three overlapping requests before anything resolves: one read.
    let requests: Vec<RangeRequest> = (0..3).map(|_| loader.ensure_range(5000, 5050)).collect();
    for request in requests {
        block_on(request.into_future())?;
    }

    // A fast fling defers loading until the gesture goes idle.
    for i in 0..4u64 {
        loader.record_scroll(i as f64 * 20_000.0, i * 16);
    }
    let request = loader.ensure_range(400_000, 400_020);
    println!("during fling: {request:?}");
    if let Some(load) = loader.tick(48 + 150) {
        block_on(load)?;
    }

    loader.read(|store, placeholders| {
        for index in [5000, 400_010, 700_000] {
            let slot = placeholders.slot(store, index);
            println!("{index}: placeholder={} id={}", slot.is_placeholder(), slot.id());
        }
    });
    println!("{:?}", loader.data_state());
    loader.destroy();
    Ok(())
}
