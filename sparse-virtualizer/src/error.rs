use alloc::string::String;
use core::fmt;

/// Invalid options passed at construction time.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
    #[error("max_cached_items ({max_cached_items}) must be at least chunk_size ({chunk_size})")]
    CapacityBelowChunk {
        max_cached_items: usize,
        chunk_size: usize,
    },
    #[error("page_size must be greater than zero")]
    ZeroPageSize,
    #[error("fixed item size must be greater than zero")]
    ZeroItemSize,
    #[error("max_scroll_extent must be greater than zero")]
    ZeroScrollExtent,
    #[error("preload_threshold ({preload}) must be finite and not exceed cancel_threshold ({cancel})")]
    InvalidThresholds { preload: f64, cancel: f64 },
    #[error("velocity tracking needs at least 2 samples (got {0})")]
    TooFewSamples(usize),
    #[error("placeholder sample_size must be greater than zero")]
    ZeroSampleSize,
}

/// A rejected read from the data adapter.
///
/// Cloneable so a single failure can be handed to every caller sharing the load.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("data adapter read failed: {message}")]
pub struct AdapterError {
    message: String,
}

impl AdapterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An invalid index range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid range {start}..={end} for {total} items")]
pub struct RangeError {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

/// The coordinator entry point a load was issued from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadOperation {
    EnsureRange,
    LoadMore,
    Reload,
}

impl LoadOperation {
    pub fn name(self) -> &'static str {
        match self {
            Self::EnsureRange => "ensure_range",
            Self::LoadMore => "load_more",
            Self::Reload => "reload",
        }
    }
}

impl fmt::Display for LoadOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An adapter failure tagged with the operation that triggered it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{operation} failed: {source}")]
pub struct LoadError {
    pub operation: LoadOperation,
    #[source]
    pub source: AdapterError,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Adapter(#[from] LoadError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}
