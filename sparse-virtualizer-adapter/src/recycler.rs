use std::collections::BTreeMap;
use std::mem;

use sparse_virtualizer::{Item, ItemId, ItemRange, Slot};

/// Host-side element factory driven by [`Recycler::reconcile`].
///
/// `T` is the item type; `Element` is whatever the host draws with (a widget id, a DOM node
/// handle, a row buffer).
pub trait Renderer<T> {
    type Element;

    fn create(&mut self) -> Self::Element;

    /// Writes the content for `index` into `element`. Called only when the slot shows a
    /// different item (or switches between placeholder and loaded) since the last pass.
    fn update(&mut self, element: &mut Self::Element, index: usize, slot: &Slot<'_, T>);

    /// Moves `element` to a native (possibly compressed) scroll position.
    fn position(&mut self, element: &mut Self::Element, position: f64);

    /// Destroys an element that will not be reused.
    fn release(&mut self, element: Self::Element);
}

pub const DEFAULT_GRACE_MS: u64 = 100;
pub const DEFAULT_MAX_POOL: usize = 64;

/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecyclerOptions {
    /// How long an element that left the render range is kept before it returns to the pool.
    pub grace_ms: u64,
    /// Pooled elements beyond this count are released.
    pub max_pool: usize,
}

impl Default for RecyclerOptions {
    fn default() -> Self {
        Self {
            grace_ms: DEFAULT_GRACE_MS,
            max_pool: DEFAULT_MAX_POOL,
        }
    }
}

impl RecyclerOptions {
    pub fn with_grace_ms(mut self, grace_ms: u64) -> Self {
        self.grace_ms = grace_ms;
        self
    }

    pub fn with_max_pool(mut self, max_pool: usize) -> Self {
        self.max_pool = max_pool;
        self
    }
}

/// Counters for one [`Recycler::reconcile`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecycleStats {
    pub created: usize,
    /// Elements taken back from the grace list or the pool.
    pub reused: usize,
    pub updated: usize,
    pub repositioned: usize,
    pub released: usize,
}

impl RecycleStats {
    /// Whether the pass touched any element.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Rendered {
    index: usize,
    id: ItemId,
    placeholder: bool,
    position: f64,
}

#[derive(Debug)]
struct Active<E> {
    slot: u64,
    element: E,
    rendered: Option<Rendered>,
}

#[derive(Debug)]
struct Retiring<E> {
    active: Active<E>,
    deadline: u64,
}

/// Maps the render range onto a set of reusable elements.
///
/// Elements belong to pool slots, not to items. A slot that keeps showing the same item at the
/// same position is left alone; one that scrolls out is parked for `grace_ms` so scrolling back
/// picks it up unchanged, then goes back to the pool.
#[derive(Debug)]
pub struct Recycler<E> {
    options: RecyclerOptions,
    active: BTreeMap<usize, Active<E>>,
    retiring: Vec<Retiring<E>>,
    pool: Vec<Active<E>>,
    next_slot: u64,
}

impl<E> Default for Recycler<E> {
    fn default() -> Self {
        Self::new(RecyclerOptions::default())
    }
}

impl<E> Recycler<E> {
    pub fn new(options: RecyclerOptions) -> Self {
        Self {
            options,
            active: BTreeMap::new(),
            retiring: Vec::new(),
            pool: Vec::new(),
            next_slot: 0,
        }
    }

    pub fn options(&self) -> RecyclerOptions {
        self.options
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn retiring_len(&self) -> usize {
        self.retiring.len()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// The element currently showing `index`.
    pub fn element(&self, index: usize) -> Option<&E> {
        self.active.get(&index).map(|a| &a.element)
    }

    /// The pool slot currently showing `index`.
    pub fn slot_of(&self, index: usize) -> Option<u64> {
        self.active.get(&index).map(|a| a.slot)
    }

    /// Active `(index, element)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &E)> + '_ {
        self.active.iter().map(|(&i, a)| (i, &a.element))
    }

    /// Brings the active set in line with `range`.
    ///
    /// `slot_at` supplies the loaded item or placeholder for an index; `position_at` its native
    /// position. Grace periods that ran out by `now_ms` are flushed first.
    pub fn reconcile<'a, T: 'a, R>(
        &mut self,
        renderer: &mut R,
        range: Option<ItemRange>,
        mut slot_at: impl FnMut(usize) -> Slot<'a, T>,
        mut position_at: impl FnMut(usize) -> f64,
        now_ms: u64,
    ) -> RecycleStats
    where
        T: Item,
        R: Renderer<T, Element = E>,
    {
        let mut stats = RecycleStats {
            released: self.flush::<T, R>(renderer, now_ms),
            ..RecycleStats::default()
        };

        let leaving: Vec<usize> = self
            .active
            .keys()
            .copied()
            .filter(|&i| !range.is_some_and(|r| r.contains(i)))
            .collect();
        let deadline = now_ms.saturating_add(self.options.grace_ms);
        for index in leaving {
            if let Some(active) = self.active.remove(&index) {
                self.retiring.push(Retiring { active, deadline });
            }
        }

        let Some(range) = range else {
            vtrace!(retiring = self.retiring.len(), "Recycler::reconcile: empty range");
            return stats;
        };

        for index in range.iter() {
            let mut active = match self.active.remove(&index) {
                Some(active) => active,
                None => {
                    let (active, reused) = self.acquire::<T, R>(renderer, index);
                    if reused {
                        stats.reused += 1;
                    } else {
                        stats.created += 1;
                    }
                    active
                }
            };

            let slot = slot_at(index);
            let id = slot.id();
            let placeholder = slot.is_placeholder();
            let position = position_at(index);
            let stale_content = active
                .rendered
                .as_ref()
                .is_none_or(|r| r.index != index || r.id != id || r.placeholder != placeholder);
            let stale_position = active.rendered.as_ref().is_none_or(|r| r.position != position);

            if stale_content {
                renderer.update(&mut active.element, index, &slot);
                stats.updated += 1;
            }
            if stale_position {
                renderer.position(&mut active.element, position);
                stats.repositioned += 1;
            }
            active.rendered = Some(Rendered {
                index,
                id,
                placeholder,
                position,
            });
            self.active.insert(index, active);
        }

        if !stats.is_noop() {
            vtrace!(
                %range,
                created = stats.created,
                reused = stats.reused,
                updated = stats.updated,
                repositioned = stats.repositioned,
                released = stats.released,
                "Recycler::reconcile"
            );
        }
        stats
    }

    /// Moves elements whose grace period ended by `now_ms` into the pool, releasing any that do
    /// not fit. Returns the number released.
    pub fn flush<T, R: Renderer<T, Element = E>>(
        &mut self,
        renderer: &mut R,
        now_ms: u64,
    ) -> usize {
        let mut released = 0;
        let mut i = 0;
        while i < self.retiring.len() {
            if self.retiring[i].deadline > now_ms {
                i += 1;
                continue;
            }
            let Retiring { active, .. } = self.retiring.swap_remove(i);
            if self.pool.len() < self.options.max_pool {
                self.pool.push(active);
            } else {
                renderer.release(active.element);
                released += 1;
            }
        }
        released
    }

    /// Releases every element, active, retiring or pooled. Returns the number released.
    pub fn clear<T, R: Renderer<T, Element = E>>(&mut self, renderer: &mut R) -> usize {
        let active = mem::take(&mut self.active).into_values();
        let retiring = self.retiring.drain(..).map(|r| r.active);
        let pooled = self.pool.drain(..);
        let mut released = 0;
        for a in active.chain(retiring).chain(pooled) {
            renderer.release(a.element);
            released += 1;
        }
        if released > 0 {
            vdebug!(released, "Recycler::clear");
        }
        released
    }

    /// Prefers the element that showed `index` before it scrolled out, then the pool.
    fn acquire<T, R: Renderer<T, Element = E>>(
        &mut self,
        renderer: &mut R,
        index: usize,
    ) -> (Active<E>, bool) {
        let parked = self
            .retiring
            .iter()
            .position(|r| r.active.rendered.as_ref().is_some_and(|x| x.index == index));
        if let Some(pos) = parked {
            return (self.retiring.swap_remove(pos).active, true);
        }
        if let Some(active) = self.pool.pop() {
            return (active, true);
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        let element = renderer.create();
        (
            Active {
                slot,
                element,
                rendered: None,
            },
            false,
        )
    }
}
