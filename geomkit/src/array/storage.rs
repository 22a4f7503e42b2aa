//! Backing storage shared by [`GrowableArray`](super::GrowableArray) and
//! [`RawArray`](super::RawArray)
use arrayvec::ArrayVec;
use std::sync::Arc;

/// Exactly one of three storage modes
///
/// Growth policy is left to the owning array type; this type only knows how
/// to move its contents into a fresh heap block.
#[derive(Clone, Debug)]
pub(crate) enum Storage<T: 'static, const N: usize> {
    /// Inline buffer embedded in the array object
    Inline(ArrayVec<T, N>),
    /// Reference-counted heap block, shared between clones
    Heap(Arc<Vec<T>>),
    /// Borrowed static data, copied before any mutation
    Raw(&'static [T]),
}

impl<T: 'static, const N: usize> Default for Storage<T, N> {
    fn default() -> Self {
        Storage::Inline(ArrayVec::new())
    }
}

impl<T: Clone + 'static, const N: usize> Storage<T, N> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Storage::Inline(a) => a.as_slice(),
            Storage::Heap(v) => v.as_slice(),
            Storage::Raw(s) => s,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn capacity(&self) -> usize {
        match self {
            Storage::Inline(..) => N,
            Storage::Heap(v) => v.capacity(),
            Storage::Raw(s) => s.len(),
        }
    }

    /// Checks whether the contents may be mutated in place
    pub fn is_unique(&self) -> bool {
        match self {
            Storage::Inline(..) => true,
            Storage::Heap(v) => Arc::strong_count(v) == 1,
            Storage::Raw(..) => false,
        }
    }

    pub fn is_heap(&self) -> bool {
        matches!(self, Storage::Heap(..))
    }

    /// Checks whether both storages point at the same heap block or raw table
    pub fn shares(&self, other: &Self) -> bool {
        match (self, other) {
            (Storage::Heap(a), Storage::Heap(b)) => Arc::ptr_eq(a, b),
            (Storage::Raw(a), Storage::Raw(b)) => {
                a.as_ptr() == b.as_ptr() && a.len() == b.len()
            }
            _ => false,
        }
    }

    /// Moves the contents into a new private heap block
    ///
    /// The block holds at least `capacity` items (and never fewer than the
    /// current length).  Items are moved if we hold the only reference and
    /// cloned otherwise.
    pub fn relocate(&mut self, capacity: usize) {
        let mut v = Vec::with_capacity(capacity.max(self.len()));
        match std::mem::take(self) {
            Storage::Inline(a) => v.extend(a),
            Storage::Heap(h) => match Arc::try_unwrap(h) {
                Ok(old) => v.extend(old),
                Err(h) => v.extend_from_slice(&h),
            },
            Storage::Raw(s) => v.extend_from_slice(s),
        }
        *self = Storage::Heap(Arc::new(v));
    }

    /// Returns a mutable handle to the contents
    ///
    /// The caller must have relocated shared or raw storage beforehand.
    pub fn unique_mut(&mut self) -> Unique<'_, T, N> {
        match self {
            Storage::Inline(a) => Unique::Inline(a),
            Storage::Heap(v) => Unique::Heap(Arc::make_mut(v)),
            Storage::Raw(..) => {
                unreachable!("raw storage must be relocated before mutation")
            }
        }
    }
}

/// Mutable handle to storage that is known to be unshared
pub(crate) enum Unique<'a, T, const N: usize> {
    Inline(&'a mut ArrayVec<T, N>),
    Heap(&'a mut Vec<T>),
}

impl<'a, T: Clone, const N: usize> Unique<'a, T, N> {
    /// Pushes a value; the caller must have reserved room for it
    pub fn push(self, value: T) {
        match self {
            Unique::Inline(a) => a.push(value),
            Unique::Heap(v) => v.push(value),
        }
    }

    pub fn extend_from_slice(self, values: &[T]) {
        match self {
            Unique::Inline(a) => a.extend(values.iter().cloned()),
            Unique::Heap(v) => v.extend_from_slice(values),
        }
    }

    pub fn extend<I: IntoIterator<Item = T>>(self, iter: I) {
        match self {
            Unique::Inline(a) => a.extend(iter),
            Unique::Heap(v) => v.extend(iter),
        }
    }

    pub fn truncate(self, len: usize) {
        match self {
            Unique::Inline(a) => a.truncate(len),
            Unique::Heap(v) => v.truncate(len),
        }
    }

    pub fn into_slice(self) -> &'a mut [T] {
        match self {
            Unique::Inline(a) => a.as_mut_slice(),
            Unique::Heap(v) => v.as_mut_slice(),
        }
    }
}
