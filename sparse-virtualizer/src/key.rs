#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

/// Chunk index → chunk storage.
///
/// Iteration order is never relied upon: eviction sorts its candidates explicitly.
#[cfg(feature = "std")]
pub(crate) type ChunkMap<V> = HashMap<usize, V>;
#[cfg(not(feature = "std"))]
pub(crate) type ChunkMap<V> = BTreeMap<usize, V>;
