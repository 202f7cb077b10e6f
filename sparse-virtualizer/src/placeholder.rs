use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp;
use core::iter;

use crate::{ConfigError, FieldValue, Item, ItemId, PlaceholderOptions, SparseStore};

const FALLBACK_FIELD: &str = "label";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Null,
}

/// What the generator learned about one field from the sampled items.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldProfile {
    pub name: String,
    /// Kind of the first non-null value seen.
    pub kind: FieldKind,
    /// Text lengths in characters; zero for non-text fields.
    pub min_len: usize,
    pub max_len: usize,
    pub avg_len: usize,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlaceholderValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl PlaceholderValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A synthetic item standing in for a slot that has not been loaded yet.
///
/// Never written into the store.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaceholderItem {
    pub index: usize,
    pub fields: Vec<(String, PlaceholderValue)>,
}

impl PlaceholderItem {
    pub fn is_placeholder(&self) -> bool {
        true
    }

    pub fn field(&self, name: &str) -> Option<&PlaceholderValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Item for PlaceholderItem {
    fn id(&self) -> ItemId {
        ItemId::Str(format!("__placeholder_{}", self.index))
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&str, FieldValue<'_>)) {
        for (name, value) in &self.fields {
            let value = match value {
                PlaceholderValue::Text(s) => FieldValue::Text(s),
                PlaceholderValue::Number(n) => FieldValue::Number(*n),
                PlaceholderValue::Bool(b) => FieldValue::Bool(*b),
                PlaceholderValue::Null => FieldValue::Null,
            };
            visit(name, value);
        }
    }
}

/// What the render path sees for one index: a loaded item or a placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot<'a, T> {
    Loaded(&'a T),
    Placeholder(PlaceholderItem),
}

impl<T: Item> Slot<'_, T> {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    pub fn id(&self) -> ItemId {
        match self {
            Self::Loaded(item) => item.id(),
            Self::Placeholder(p) => p.id(),
        }
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(item) => Some(item),
            Self::Placeholder(_) => None,
        }
    }
}

#[derive(Default)]
struct FieldStats {
    kind: Option<FieldKind>,
    min_len: usize,
    max_len: usize,
    total_len: usize,
    texts: usize,
}

/// Learns the field layout of loaded items and produces masked placeholders with the same shape.
#[derive(Clone, Debug)]
pub struct PlaceholderGenerator {
    options: PlaceholderOptions,
    profile: Vec<FieldProfile>,
    analyzed: bool,
}

impl PlaceholderGenerator {
    pub fn new(options: PlaceholderOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            profile: Vec::new(),
            analyzed: false,
        })
    }

    pub fn options(&self) -> &PlaceholderOptions {
        &self.options
    }

    pub fn has_analyzed_structure(&self) -> bool {
        self.analyzed
    }

    pub fn profile(&self) -> &[FieldProfile] {
        &self.profile
    }

    /// Inspects up to `sample_size` items and records a per-field profile.
    ///
    /// Returns `false` (and keeps any previous profile) when `items` is empty.
    pub fn analyze_structure<'a, T: Item + 'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a T>,
    ) -> bool {
        let mut names: Vec<String> = Vec::new();
        let mut stats: Vec<FieldStats> = Vec::new();
        let mut sampled = 0;
        for item in items.into_iter().take(self.options.sample_size) {
            sampled += 1;
            item.visit_fields(&mut |name: &str, value: FieldValue<'_>| {
                let slot = match names.iter().position(|n| n == name) {
                    Some(i) => i,
                    None => {
                        names.push(name.into());
                        stats.push(FieldStats::default());
                        names.len() - 1
                    }
                };
                let s = &mut stats[slot];
                let kind = match value {
                    FieldValue::Text(text) => {
                        let len = text.chars().count();
                        s.min_len = if s.texts == 0 { len } else { cmp::min(s.min_len, len) };
                        s.max_len = cmp::max(s.max_len, len);
                        s.total_len += len;
                        s.texts += 1;
                        FieldKind::Text
                    }
                    FieldValue::Number(_) => FieldKind::Number,
                    FieldValue::Bool(_) => FieldKind::Bool,
                    FieldValue::Null => FieldKind::Null,
                };
                if s.kind.is_none_or(|k| k == FieldKind::Null) {
                    s.kind = Some(kind);
                }
            });
        }
        if sampled == 0 {
            return false;
        }

        self.profile = names
            .into_iter()
            .zip(stats)
            .map(|(name, s)| FieldProfile {
                name,
                kind: s.kind.unwrap_or(FieldKind::Null),
                min_len: s.min_len,
                max_len: s.max_len,
                avg_len: if s.texts == 0 { 0 } else { s.total_len / s.texts },
            })
            .collect();
        self.analyzed = true;
        vdebug!(
            sampled,
            fields = self.profile.len(),
            "PlaceholderGenerator::analyze_structure"
        );
        true
    }

    /// A placeholder for `index`.
    ///
    /// Text lengths depend only on `(index, field)`, so the same index always renders the same
    /// placeholder. Before any structure is known this is a single masked `label` field.
    pub fn generate(&self, index: usize) -> PlaceholderItem {
        if self.profile.is_empty() {
            let text = self.masked(self.options.fallback_length);
            return PlaceholderItem {
                index,
                fields: alloc::vec![(FALLBACK_FIELD.into(), PlaceholderValue::Text(text))],
            };
        }
        let fields = self
            .profile
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let value = match field.kind {
                    FieldKind::Text => {
                        PlaceholderValue::Text(self.masked(self.text_len(index, i, field)))
                    }
                    FieldKind::Number => PlaceholderValue::Number(0.0),
                    FieldKind::Bool => PlaceholderValue::Bool(false),
                    FieldKind::Null => PlaceholderValue::Null,
                };
                (field.name.clone(), value)
            })
            .collect();
        PlaceholderItem { index, fields }
    }

    /// The loaded item at `index`, or a placeholder when the slot is empty.
    pub fn slot<'a, T>(&self, store: &'a SparseStore<T>, index: usize) -> Slot<'a, T> {
        match store.get(index) {
            Some(item) => Slot::Loaded(item),
            None => Slot::Placeholder(self.generate(index)),
        }
    }

    pub fn reset(&mut self) {
        self.profile.clear();
        self.analyzed = false;
    }

    fn text_len(&self, index: usize, field: usize, profile: &FieldProfile) -> usize {
        if !self.options.randomize_lengths || profile.max_len <= profile.min_len {
            return profile.avg_len;
        }
        let spread = (profile.max_len - profile.min_len + 1) as u64;
        let h = mix((index as u64) ^ ((field as u64) << 48));
        profile.min_len + (h % spread) as usize
    }

    fn masked(&self, len: usize) -> String {
        iter::repeat_n(self.options.mask_char, len).collect()
    }
}

/// splitmix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
