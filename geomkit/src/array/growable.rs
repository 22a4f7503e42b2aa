use super::{
    alloc_more, clamp_range,
    storage::Storage,
    view::{ArrayView, ArrayViewMut},
};

/// Copy-on-write dynamic array with `N` items of inline storage
///
/// The array is a value type: [`Clone`] is O(1) for heap-backed arrays, and
/// the first mutation of a shared array copies it into a private block
/// ("detaching").  Arrays of up to `N` items never touch the heap.
///
/// Heap capacity follows [`alloc_more`], so an array grows to 64 items on its
/// first spill, then doubles.  [`resize`](Self::resize) never releases
/// capacity, which makes `resize(0)` the way to reuse a buffer;
/// [`clear`](Self::clear) drops back to inline storage.
///
/// Methods that take signed offsets or lengths (`mid`, `left`, `right`,
/// `remove`, `replace`) clamp them into range instead of failing.
pub struct GrowableArray<T: 'static, const N: usize = 8> {
    storage: Storage<T, N>,
}

impl<T: Clone + 'static, const N: usize> Default for GrowableArray<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static, const N: usize> Clone for GrowableArray<T, N> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<T: Clone + 'static, const N: usize> GrowableArray<T, N> {
    /// Builds a new empty array, using inline storage
    pub fn new() -> Self {
        Self {
            storage: Storage::default(),
        }
    }

    /// Builds an array holding `size` copies of `value`
    pub fn from_elem(size: usize, value: T) -> Self {
        let mut out = Self::new();
        if size > N {
            out.storage.relocate(alloc_more(size, 0));
        }
        out.storage
            .unique_mut()
            .extend(std::iter::repeat_n(value, size));
        out
    }

    /// Wraps a static table without copying it
    ///
    /// The table is copied into a private heap block on the first mutation.
    pub fn from_raw_data(data: &'static [T]) -> Self {
        if data.is_empty() {
            Self::new()
        } else {
            Self {
                storage: Storage::Raw(data),
            }
        }
    }

    /// Returns the number of items in the array
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Checks whether the array is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of items the array can hold without reallocating
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Checks whether the array can be mutated without copying
    ///
    /// This is false for arrays sharing a heap block with a clone, and for
    /// arrays wrapping raw data.
    pub fn is_detached(&self) -> bool {
        self.storage.is_unique()
    }

    /// Returns the array contents as a slice
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Returns a pointer to the first item (`constData` in GL terms)
    pub fn as_ptr(&self) -> *const T {
        self.as_slice().as_ptr()
    }

    /// Returns the array contents as a mutable slice, detaching if shared
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.detach();
        self.storage.unique_mut().into_slice()
    }

    /// Returns the item at the given index, if present
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// Makes room for `needed` more items, detaching if shared
    fn grow(&mut self, needed: usize) {
        let capacity = alloc_more(self.capacity(), needed);
        if !self.storage.is_unique() || self.len() + needed > self.capacity()
        {
            self.storage.relocate(capacity);
        }
    }

    /// Ensures that `needed` items can be appended in place
    fn prepare(&mut self, needed: usize) {
        if self.len() + needed > self.capacity() || !self.storage.is_unique()
        {
            self.grow(needed);
        }
    }

    fn detach(&mut self) {
        if !self.storage.is_unique() {
            self.storage.relocate(alloc_more(self.len(), 0));
        }
    }

    /// Appends a single item
    pub fn append(&mut self, value: T) {
        self.prepare(1);
        self.storage.unique_mut().push(value);
    }

    /// Appends two items, with a single capacity check
    pub fn append2(&mut self, v1: T, v2: T) {
        self.prepare(2);
        self.storage.unique_mut().extend([v1, v2]);
    }

    /// Appends three items, with a single capacity check
    pub fn append3(&mut self, v1: T, v2: T, v3: T) {
        self.prepare(3);
        self.storage.unique_mut().extend([v1, v2, v3]);
    }

    /// Appends four items, with a single capacity check
    pub fn append4(&mut self, v1: T, v2: T, v3: T, v4: T) {
        self.prepare(4);
        self.storage.unique_mut().extend([v1, v2, v3, v4]);
    }

    /// Appends a slice of items
    pub fn append_slice(&mut self, values: &[T]) {
        if values.is_empty() {
            return;
        }
        self.prepare(values.len());
        self.storage.unique_mut().extend_from_slice(values);
    }

    /// Appends the contents of another array
    ///
    /// If `other` shares our storage (i.e. it is a clone of `self`), room for
    /// both halves is reserved in a single allocation.
    pub fn append_array(&mut self, other: &Self) {
        if self.storage.shares(&other.storage) {
            self.grow(self.len());
        }
        self.append_slice(other.as_slice());
    }

    /// Appends `n` default-valued items, returning them for initialization
    ///
    /// The slice borrows the array, so it cannot outlive the next mutation.
    pub fn extend(&mut self, n: usize) -> &mut [T]
    where
        T: Default,
    {
        let start = self.len();
        if n > 0 {
            self.prepare(n);
            self.storage
                .unique_mut()
                .extend(std::iter::repeat_with(T::default).take(n));
        } else {
            self.detach();
        }
        &mut self.storage.unique_mut().into_slice()[start..]
    }

    /// Resizes the array, filling new slots with `T::default()`
    ///
    /// Capacity is never released; `resize(0)` keeps the current allocation
    /// so that the array can be refilled without reallocating.
    pub fn resize(&mut self, size: usize)
    where
        T: Default,
    {
        let len = self.len();
        if size < len {
            self.truncate(size);
        } else if size > len {
            self.extend(size - len);
        }
    }

    fn truncate(&mut self, size: usize) {
        // A shared array keeps its capacity in the copy, like a private one
        if !self.storage.is_unique() {
            self.storage.relocate(self.capacity());
        }
        self.storage.unique_mut().truncate(size);
    }

    /// Grows capacity to at least `size` items, without changing the length
    pub fn reserve(&mut self, size: usize) {
        if size > self.capacity() {
            self.grow(size - self.len());
        }
    }

    /// Removes all items and returns to inline storage
    pub fn clear(&mut self) {
        self.storage = Storage::default();
    }

    /// Shrinks capacity to exactly `size` items
    ///
    /// Trailing items past `size` are dropped.  This is a no-op if `size` is
    /// not below the current capacity, and equivalent to
    /// [`clear`](Self::clear) if `size` is zero.  Inline arrays keep their
    /// storage.  A raw array is left alone unless `size` drops items, in which
    /// case the kept items are copied into a heap block of exactly `size`.
    pub fn squeeze(&mut self, size: usize) {
        if size == 0 {
            self.clear();
            return;
        }
        if size >= self.capacity() {
            return;
        }
        if size < self.len() {
            self.truncate(size);
        }
        if self.storage.is_heap() {
            let mut v = Vec::with_capacity(size);
            v.extend_from_slice(self.as_slice());
            self.storage = Storage::Heap(v.into());
        }
    }

    /// Shrinks capacity to the current length
    pub fn squeeze_to_len(&mut self) {
        self.squeeze(self.len());
    }

    /// Reverses the array in place
    pub fn reverse(&mut self) {
        if !self.is_empty() {
            self.as_mut_slice().reverse();
        }
    }

    /// Returns a reversed copy of the array
    pub fn reversed(&self) -> Self {
        self.as_slice().iter().rev().cloned().collect()
    }

    /// Overwrites items starting at `index`, growing the array if needed
    ///
    /// Negative indices and empty `values` are ignored.
    pub fn replace(&mut self, index: isize, values: &[T])
    where
        T: Default,
    {
        if index < 0 || values.is_empty() {
            return;
        }
        let index = index as usize;
        let end = index + values.len();
        if end > self.len() {
            self.resize(end);
        }
        self.as_mut_slice()[index..end].clone_from_slice(values);
    }

    /// Removes up to `count` items starting at `index`
    ///
    /// The range is clipped to the array: a negative `index` shortens `count`
    /// by the same amount, and a range running off the end stops at the end.
    pub fn remove(&mut self, index: isize, count: isize) {
        let size = self.len() as isize;
        let (mut index, mut count) = (index, count);
        if index < 0 {
            count += index;
            index = 0;
        }
        if count > 0 && index + count > size {
            count = size - index;
        }
        if count <= 0 {
            return;
        }
        if index == 0 && count >= size {
            self.clear();
            return;
        }
        let (index, count) = (index as usize, count as usize);
        self.as_mut_slice()[index..].rotate_left(count);
        self.truncate(size as usize - count);
    }

    /// Removes the item at `index`, if present
    pub fn remove_at(&mut self, index: usize) {
        self.remove(index as isize, 1);
    }

    /// Returns a view of `length` items starting at `index`
    ///
    /// A negative `length` extends the view to the end of the array.
    pub fn mid(&self, index: isize, length: isize) -> ArrayView<'_, T, N> {
        ArrayView::new(self, index, length)
    }

    /// Returns a view of the first `n` items
    pub fn left(&self, n: isize) -> ArrayView<'_, T, N> {
        self.mid(0, n)
    }

    /// Returns a view of the last `n` items
    pub fn right(&self, n: isize) -> ArrayView<'_, T, N> {
        let size = self.len() as isize;
        let n = if n < 0 || n >= size { size } else { n };
        self.mid(size - n, n)
    }

    /// Returns a mutable window of `length` items starting at `index`
    pub fn mid_mut(
        &mut self,
        index: isize,
        length: isize,
    ) -> ArrayViewMut<'_, T, N> {
        let (offset, len) = clamp_range(self.len(), index, length);
        ArrayViewMut::new(self, offset, len)
    }
}

impl<T: Clone + 'static, const N: usize> std::ops::Deref
    for GrowableArray<T, N>
{
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Clone + 'static, const N: usize> std::ops::Index<usize>
    for GrowableArray<T, N>
{
    type Output = T;
    fn index(&self, i: usize) -> &T {
        &self.as_slice()[i]
    }
}

impl<T: Clone + 'static, const N: usize> std::ops::IndexMut<usize>
    for GrowableArray<T, N>
{
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.as_mut_slice()[i]
    }
}

impl<T: Clone + PartialEq + 'static, const N: usize> PartialEq
    for GrowableArray<T, N>
{
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.as_slice(), other.as_slice());
        (a.as_ptr() == b.as_ptr() && a.len() == b.len()) || a == b
    }
}

impl<T: Clone + Eq + 'static, const N: usize> Eq for GrowableArray<T, N> {}

impl<T: Clone + std::hash::Hash + 'static, const N: usize> std::hash::Hash
    for GrowableArray<T, N>
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<T: Clone + std::fmt::Debug + 'static, const N: usize> std::fmt::Debug
    for GrowableArray<T, N>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: Clone + 'static, const N: usize> FromIterator<T>
    for GrowableArray<T, N>
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut out = Self::new();
        for v in iter {
            out.append(v);
        }
        out
    }
}

impl<T: Clone + 'static, const N: usize> Extend<T> for GrowableArray<T, N> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if lower > 0 {
            self.prepare(lower);
        }
        for v in iter {
            self.append(v);
        }
    }
}

impl<T: Clone + 'static, const N: usize> From<&[T]> for GrowableArray<T, N> {
    fn from(values: &[T]) -> Self {
        let mut out = Self::new();
        out.append_slice(values);
        out
    }
}

impl<'a, T: Clone + 'static, const N: usize> IntoIterator
    for &'a GrowableArray<T, N>
{
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}
