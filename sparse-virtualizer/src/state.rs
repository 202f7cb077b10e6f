use alloc::vec::Vec;

use crate::{ItemId, ItemRange};

/// A serializable snapshot of the viewport after the last scroll/resize signal.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportState {
    /// Native scroll position, in the (possibly compressed) host space.
    pub scroll_position: f64,
    /// Logical scroll offset the ranges were computed from.
    pub logical_offset: u64,
    pub container_size: u32,
    /// Extent exposed to the host scroll surface.
    pub total_size: u64,
    /// Uncompressed extent of every item.
    pub actual_size: u64,
    pub is_compressed: bool,
    pub compression_ratio: f64,
    pub visible_range: Option<ItemRange>,
    pub render_range: Option<ItemRange>,
}

/// A persisted scroll position that survives compression changes.
///
/// `index` is a logical item index; `offset_in_item` is the distance from that item's start.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ScrollSnapshot {
    pub index: usize,
    pub offset_in_item: f64,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub selected_ids: Option<Vec<ItemId>>,
}

impl ScrollSnapshot {
    pub fn new(index: usize, offset_in_item: f64) -> Self {
        Self {
            index,
            offset_in_item,
            selected_ids: None,
        }
    }

    pub fn with_selected_ids(mut self, selected_ids: Vec<ItemId>) -> Self {
        self.selected_ids = Some(selected_ids);
        self
    }
}
