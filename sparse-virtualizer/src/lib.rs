//! A headless list virtualization engine with scroll compression and sparse data.
//!
//! For element recycling and a ready-made controller, see the `sparse-virtualizer-adapter`
//! crate.
//!
//! This crate focuses on the core needed to present millions of logical items through a
//! fixed-size viewport while only materializing the handful that are visible:
//! - range math over fixed or prefix-summed variable item sizes
//! - compression of unbounded logical extents onto a bounded native scroll range
//! - a chunked sparse store with LRU eviction outside a keep zone
//! - placeholders derived from the shape of already loaded items
//! - velocity-gated, deduplicated loading from an external data adapter
//!
//! It is UI-agnostic. A TUI/GUI layer is expected to provide:
//! - container size and native scroll position
//! - timestamps for scroll signals and idle ticks
//! - a [`DataAdapter`] for remote or paginated collections
//! - an executor that drives the returned load futures
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod compression;
mod emitter;
mod error;
mod fenwick;
mod key;
#[cfg(feature = "std")]
mod loader;
mod options;
mod placeholder;
mod range;
mod state;
mod store;
mod types;
mod velocity;
mod viewport;


pub use compression::{Compression, CompressionState};
pub use emitter::{Event, EventEmitter, EventKind, Handler, HandlerError, Subscription};
pub use error::{AdapterError, ConfigError, Error, LoadError, LoadOperation, RangeError};
#[cfg(feature = "std")]
pub use loader::{
    DataAdapter, DataState, LoadCoordinator, LoadFuture, LoadState, RangeRequest, ReadRequest,
    ReadResponse,
};
pub use options::{
    DEFAULT_CANCEL_THRESHOLD, DEFAULT_CHUNK_SIZE, DEFAULT_EVICTION_BUFFER,
    DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_MAX_CACHED_ITEMS, DEFAULT_MAX_SCROLL_EXTENT,
    DEFAULT_OVERSCAN, DEFAULT_PAGE_SIZE, DEFAULT_PRELOAD_AHEAD, DEFAULT_PRELOAD_THRESHOLD,
    ItemSize, LoaderOptions, PlaceholderOptions, SizeFn, StoreOptions, VelocityOptions,
    ViewportOptions,
};
pub use placeholder::{
    FieldKind, FieldProfile, PlaceholderGenerator, PlaceholderItem, PlaceholderValue, Slot,
};
pub use range::{Ranges, SizeModel, compute_ranges};
pub use state::{ScrollSnapshot, ViewportState};
pub use store::{SparseStore, StoreStats};
pub use types::{Align, FieldValue, Item, ItemId, ItemRange, ScrollDirection};
pub use velocity::VelocityTracker;
pub use viewport::Viewport;
