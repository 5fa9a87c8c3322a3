//! The `Heap<T>` container itself: two-level storage, trickle operations,
//! and the public insert/delete/reorder/root API.

use tracing::trace;

use super::layout::{children, parent, Layout};

/// Number of element slots per allocated row.
///
/// Rows are allocated and freed as whole units; the outer [`Vec`] of row
/// handles is what may reallocate on growth, never a row's contents, so a
/// live element's slot address is stable across the heap's lifetime.
const ROW_WIDTH: usize = 1024;

const ROOT_IDX: u32 = 1;

/// Capability an element must provide to live in a [`Heap`]: a way for the
/// heap to tell it which slot it currently occupies.
///
/// The heap calls `set_index` on every slot write, including on removal
/// (with [`Heap::<T>::NOIDX`]), so a conforming element can always answer
/// "where am I" without the heap needing to search for it — this is what
/// makes [`Heap::delete`] and [`Heap::reorder`] O(log n).
pub trait HeapElement {
    /// Called whenever this element's slot changes. `index` is
    /// [`Heap::<T>::NOIDX`] when the element has just been removed.
    fn set_index(&mut self, index: u32);
}

type Row<T> = Box<[Option<T>; ROW_WIDTH]>;

/// A VM-aware priority queue over caller-owned elements of type `T`.
///
/// `T` supplies index bookkeeping via [`HeapElement`]; ordering is supplied
/// separately as a comparator closure at construction, since the same
/// element type may need different orderings in different heaps.
///
/// # Examples
///
/// ```rust
/// use logquery::vbh::{Heap, HeapElement};
///
/// struct Item { key: u32, idx: u32 }
///
/// impl HeapElement for Item {
///     fn set_index(&mut self, index: u32) {
///         self.idx = index;
///     }
/// }
///
/// let mut heap = Heap::new(|a: &Item, b: &Item| a.key < b.key);
/// heap.insert(Item { key: 5, idx: 0 });
/// heap.insert(Item { key: 1, idx: 0 });
/// assert_eq!(heap.root().unwrap().key, 1);
/// ```
pub struct Heap<T: HeapElement> {
    cmp: Box<dyn Fn(&T, &T) -> bool>,
    layout: Layout,
    rows: Vec<Option<Row<T>>>,
    /// Total addressable slots (`rows.len() * ROW_WIDTH`, tracked
    /// separately since a row handle can be `None` mid-vector... in
    /// practice rows are only ever released from the tail).
    length: usize,
    next: u32,
}

impl<T: HeapElement> Heap<T> {
    /// Sentinel passed to [`HeapElement::set_index`] when an element is no
    /// longer in the heap.
    pub const NOIDX: u32 = u32::MAX;

    /// Builds an empty heap using the default VM-aware layout.
    ///
    /// `cmp(a, b)` must return `true` iff `a` has strictly higher priority
    /// than `b` (a strict weak ordering); the element with no other element
    /// strictly higher-priority than it becomes [`Heap::root`].
    pub fn new(cmp: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self::with_layout(cmp, Layout::vm_aware_default())
    }

    /// Builds an empty heap using an explicit [`Layout`].
    pub fn with_layout(cmp: impl Fn(&T, &T) -> bool + 'static, layout: Layout) -> Self {
        Self::with_capacity_hint(cmp, layout, 16)
    }

    /// Builds an empty heap with an explicit initial outer-vector capacity
    /// (in rows). Production code should prefer [`Heap::new`]; this
    /// constructor exists mainly so tests can start from the original's
    /// one-row footprint instead of the default sixteen.
    pub fn with_capacity_hint(
        cmp: impl Fn(&T, &T) -> bool + 'static,
        layout: Layout,
        row_capacity_hint: usize,
    ) -> Self {
        let mut heap = Heap {
            cmp: Box::new(cmp),
            layout,
            rows: Vec::with_capacity(row_capacity_hint.max(1)),
            length: 0,
            next: ROOT_IDX,
        };
        heap.add_row();
        heap
    }

    /// Number of live elements in the heap.
    pub fn len(&self) -> usize {
        (self.next - ROOT_IDX) as usize
    }

    /// Whether the heap holds no elements.
    pub fn is_empty(&self) -> bool {
        self.next == ROOT_IDX
    }

    /// Number of rows currently allocated. Exposed for tests that assert
    /// on the shrink-hysteresis policy (see [`Heap::delete`]).
    #[cfg(test)]
    fn row_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_some()).count()
    }

    fn add_row(&mut self) {
        if self.rows.len() * ROW_WIDTH <= self.length {
            let grown = (self.rows.len() * 2).max(1);
            self.rows.resize_with(grown, || None);
        }
        let row_idx = self.length / ROW_WIDTH;
        debug_assert!(self.rows[row_idx].is_none());
        self.rows[row_idx] = Some(Box::new(std::array::from_fn(|_| None)));
        self.length += ROW_WIDTH;
        trace!(rows = self.rows.len(), length = self.length, "vbh: grew heap");
    }

    fn slot(&self, u: u32) -> &Option<T> {
        let u = u as usize;
        &self.rows[u / ROW_WIDTH].as_ref().expect("row allocated")[u % ROW_WIDTH]
    }

    fn slot_mut(&mut self, u: u32) -> &mut Option<T> {
        let u = u as usize;
        &mut self.rows[u / ROW_WIDTH].as_mut().expect("row allocated")[u % ROW_WIDTH]
    }

    fn at(&self, u: u32) -> &T {
        self.slot(u).as_ref().expect("slot occupied")
    }

    fn update(&mut self, u: u32) {
        let idx = u;
        self.slot_mut(u).as_mut().expect("slot occupied").set_index(idx);
    }

    fn swap(&mut self, u: u32, v: u32) {
        debug_assert_ne!(u, v);
        let (lo, hi) = if u < v { (u, v) } else { (v, u) };
        let (lo_row, lo_off) = (lo as usize / ROW_WIDTH, lo as usize % ROW_WIDTH);
        let (hi_row, hi_off) = (hi as usize / ROW_WIDTH, hi as usize % ROW_WIDTH);
        if lo_row == hi_row {
            let row = self.rows[lo_row].as_mut().expect("row allocated");
            row.swap(lo_off, hi_off);
        } else {
            let (left, right) = self.rows.split_at_mut(hi_row);
            let lo_slot = &mut left[lo_row].as_mut().expect("row allocated")[lo_off];
            let hi_slot = &mut right[0].as_mut().expect("row allocated")[hi_off];
            std::mem::swap(lo_slot, hi_slot);
        }
        self.update(u);
        self.update(v);
    }

    fn trickle_up(&mut self, mut u: u32) -> u32 {
        while u > ROOT_IDX {
            let v = parent(self.layout, u);
            if !(self.cmp)(self.at(u), self.at(v)) {
                break;
            }
            self.swap(u, v);
            u = v;
        }
        u
    }

    fn trickle_down(&mut self, mut u: u32) -> u32 {
        loop {
            let (mut v1, v2) = children(self.layout, u);
            if v1 == Self::NOIDX || v1 >= self.next {
                return u;
            }
            if v1 != v2 && v2 < self.next && (self.cmp)(self.at(v2), self.at(v1)) {
                v1 = v2;
            }
            if (self.cmp)(self.at(u), self.at(v1)) {
                return u;
            }
            self.swap(u, v1);
            u = v1;
        }
    }

    /// Inserts `value`, assigning it a slot and sifting it into place.
    /// Returns the slot the element ended up in.
    pub fn insert(&mut self, mut value: T) -> u32 {
        if self.length == self.next as usize {
            self.add_row();
        }
        let u = self.next;
        self.next += 1;
        value.set_index(u);
        *self.slot_mut(u) = Some(value);
        let final_idx = self.trickle_up(u);
        trace!(index = final_idx, "vbh: inserted");
        final_idx
    }

    /// Returns the highest-priority element, if any.
    pub fn root(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            Some(self.at(ROOT_IDX))
        }
    }

    /// Returns a mutable reference to the highest-priority element, if any.
    ///
    /// Mutating the key through this reference without calling
    /// [`Heap::reorder`] afterward violates the heap property.
    pub fn root_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            None
        } else {
            Some(self.slot_mut(ROOT_IDX).as_mut().expect("root occupied"))
        }
    }

    /// Removes and returns the element at `idx`.
    ///
    /// # Panics (debug builds only)
    ///
    /// If `idx` is 0, `>= len()`, or does not currently hold an element.
    pub fn delete(&mut self, idx: u32) -> T {
        debug_assert!(idx > 0 && idx < self.next, "index out of range");
        let removed = {
            let slot = self.slot_mut(idx);
            debug_assert!(slot.is_some(), "slot already empty");
            let mut value = slot.take().unwrap();
            value.set_index(Self::NOIDX);
            value
        };

        self.next -= 1;
        if idx != self.next {
            let tail = self.slot_mut(self.next).take().expect("tail occupied");
            *self.slot_mut(idx) = Some(tail);
            self.update(idx);
            let idx = self.trickle_up(idx);
            self.trickle_down(idx);
        }

        if (self.next as usize) + 2 * ROW_WIDTH <= self.length {
            let last_row = self.length / ROW_WIDTH - 1;
            self.rows[last_row] = None;
            self.length -= ROW_WIDTH;
            trace!(rows = self.rows.len(), length = self.length, "vbh: shrank heap");
        }

        trace!(index = idx, "vbh: deleted");
        removed
    }

    /// Re-establishes the heap property around `idx` after its key has
    /// changed in place (e.g. via [`Heap::root_mut`]).
    pub fn reorder(&mut self, idx: u32) {
        debug_assert!(idx > 0 && idx < self.next, "index out of range");
        debug_assert!(self.slot(idx).is_some(), "slot empty");
        let idx = self.trickle_up(idx);
        self.trickle_down(idx);
    }
}

impl<T: HeapElement> Drop for Heap<T> {
    fn drop(&mut self) {
        debug_assert!(self.is_empty(), "heap dropped while non-empty");
    }
}
