//! Adapter utilities for the `sparse-virtualizer` crate.
//!
//! The `sparse-virtualizer` crate is UI-agnostic and focuses on range math, compression and
//! sparse loading. This crate provides the framework-neutral pieces an adapter needs on top:
//!
//! - Element recycling with a grace period and a bounded pool ([`Recycler`])
//! - A controller that wires viewport, loading and recycling together ([`Controller`])
//!
//! Hosts plug in through [`Renderer`]; no UI toolkit is bound here.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod controller;
mod recycler;

#[cfg(test)]
mod tests;

pub use controller::{Controller, ScrollOutcome};
pub use recycler::{
    DEFAULT_GRACE_MS, DEFAULT_MAX_POOL, RecycleStats, Recycler, RecyclerOptions, Renderer,
};
