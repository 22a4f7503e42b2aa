use super::storage::Storage;
use crate::Error;
use zerocopy::{Immutable, IntoBytes};

/// Reference-counted array of plain-old-data items
///
/// This is the array type used for packed vertex and index buffers.  Items
/// are only ever copied bitwise, and every accessor that hands out mutable
/// access detaches first, so a caller never writes into a buffer shared with
/// another array.
///
/// Growth is geometric: the array grows to at least twice its length (and at
/// least `N` items) whenever it runs out of room.  Cloning an array which
/// still lives in its inline buffer moves the clone onto the heap, so that
/// further clones of the clone are cheap.
pub struct RawArray<T: Copy + Default + 'static, const N: usize = 16> {
    storage: Storage<T, N>,
}

impl<T: Copy + Default + 'static, const N: usize> Default for RawArray<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default + 'static, const N: usize> Clone for RawArray<T, N> {
    fn clone(&self) -> Self {
        let storage = match &self.storage {
            Storage::Inline(a) => {
                let mut v = Vec::with_capacity(N);
                v.extend_from_slice(a);
                Storage::Heap(v.into())
            }
            s => s.clone(),
        };
        Self { storage }
    }
}

impl<T: Copy + Default + 'static, const N: usize> RawArray<T, N> {
    /// Builds a new empty array
    pub fn new() -> Self {
        Self {
            storage: Storage::default(),
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

    /// Checks whether the array owns its storage exclusively
    pub fn is_detached(&self) -> bool {
        self.storage.is_unique()
    }

    /// Returns the contents as a slice
    pub fn as_slice(&self) -> &[T] {
        self.storage.as_slice()
    }

    /// Returns a pointer to the first item, for upload to a buffer object
    pub fn as_ptr(&self) -> *const T {
        self.as_slice().as_ptr()
    }

    /// Returns the contents as mutable slice, detaching if shared
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if !self.storage.is_unique() {
            self.detach();
        }
        self.storage.unique_mut().into_slice()
    }

    /// Returns the contents as raw bytes
    pub fn as_bytes(&self) -> &[u8]
    where
        T: IntoBytes + Immutable,
    {
        self.as_slice().as_bytes()
    }

    fn grow(&mut self, needed: usize) {
        let len = self.len();
        let size = (len + needed).max(len * 2).max(N);
        self.storage.relocate(size);
    }

    fn detach(&mut self) {
        let limit = self.capacity().max(N);
        self.storage.relocate(limit);
    }

    /// Ensures that `needed` items can be written past the end in place
    fn prepare(&mut self, needed: usize) {
        if self.len() + needed > self.capacity() {
            self.grow(needed);
        } else if !self.storage.is_unique() {
            self.detach();
        }
    }

    /// Appends a single item
    pub fn append(&mut self, value: T) {
        self.prepare(1);
        self.storage.unique_mut().push(value);
    }

    /// Appends two items
    pub fn append2(&mut self, v1: T, v2: T) {
        self.prepare(2);
        self.storage.unique_mut().extend_from_slice(&[v1, v2]);
    }

    /// Appends three items
    pub fn append3(&mut self, v1: T, v2: T, v3: T) {
        self.prepare(3);
        self.storage.unique_mut().extend_from_slice(&[v1, v2, v3]);
    }

    /// Appends four items
    pub fn append4(&mut self, v1: T, v2: T, v3: T, v4: T) {
        self.prepare(4);
        self.storage.unique_mut().extend_from_slice(&[v1, v2, v3, v4]);
    }

    /// Appends a slice of items
    pub fn append_slice(&mut self, values: &[T]) {
        if values.is_empty() {
            return;
        }
        self.prepare(values.len());
        self.storage.unique_mut().extend_from_slice(values);
    }

    /// Appends another array
    ///
    /// Appending to an empty array shares `other`'s storage.  Appending a
    /// clone of ourself doubles the contents in a single allocation of twice
    /// the current capacity.
    pub fn append_array(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        } else if self.is_empty() {
            *self = other.clone();
        } else if self.storage.shares(&other.storage) {
            let s = self.as_slice();
            let mut v = Vec::with_capacity(self.capacity() * 2);
            v.extend_from_slice(s);
            v.extend_from_slice(s);
            self.storage = Storage::Heap(v.into());
        } else {
            self.append_slice(other.as_slice());
        }
    }

    /// Overwrites items starting at `index`, growing the array if needed
    ///
    /// Negative indices and empty `values` are ignored.
    pub fn replace(&mut self, index: isize, values: &[T]) {
        if index < 0 || values.is_empty() {
            return;
        }
        let index = index as usize;
        let end = index + values.len();
        let len = self.len();
        if end > self.capacity() {
            self.grow(end - len);
        } else if !self.storage.is_unique() {
            self.detach();
        }
        if end > len {
            self.storage
                .unique_mut()
                .extend(std::iter::repeat_n(T::default(), end - len));
        }
        self.storage.unique_mut().into_slice()[index..end]
            .copy_from_slice(values);
    }

    /// Resizes the array, zero-filling any new items
    pub fn resize(&mut self, size: usize) {
        self.reserve(size);
        let len = self.len();
        if size < len {
            if !self.storage.is_unique() {
                self.detach();
            }
            self.storage.unique_mut().truncate(size);
        } else if size > len {
            self.prepare(size - len);
            self.storage
                .unique_mut()
                .extend(std::iter::repeat_n(T::default(), size - len));
        }
    }

    /// Grows capacity to at least `size` items
    pub fn reserve(&mut self, size: usize) {
        if size > self.capacity() {
            self.grow(size - self.len());
        }
    }

    /// Adopts a static buffer without copying it
    ///
    /// The buffer is copied on the first mutation.
    pub fn set_raw_data(&mut self, values: &'static [T]) {
        self.storage = Storage::Raw(values);
    }

    /// Extracts `size` components at `index` from every `stride`-sized item
    ///
    /// For example, positions can be pulled out of an interleaved
    /// position-normal buffer with `extract(0, 3, 6)`.
    ///
    /// # Panics
    /// If `index + size > stride`
    pub fn extract(&self, index: usize, size: usize, stride: usize) -> Self {
        assert!(index + size <= stride, "component range exceeds stride");
        let count = self.len() / stride;
        let mut out = Self::new();
        out.reserve(count * size);
        for item in self.as_slice().chunks_exact(stride).take(count) {
            out.append_slice(&item[index..index + size]);
        }
        out
    }

    /// Fallible version of [`extract`](Self::extract)
    pub fn try_extract(
        &self,
        index: usize,
        size: usize,
        stride: usize,
    ) -> Result<Self, Error> {
        if stride == 0 || index + size > stride {
            Err(Error::BadStride {
                index,
                size,
                stride,
            })
        } else {
            Ok(self.extract(index, size, stride))
        }
    }

    /// Interleaves this array with another one
    ///
    /// Items of `this_stride` components from `self` alternate with items of
    /// `other_stride` components from `other`.  If one array holds fewer
    /// items, its slots are padded with zeros.
    pub fn interleaved(
        &self,
        this_stride: usize,
        other: &Self,
        other_stride: usize,
    ) -> Self {
        assert!(this_stride > 0 && other_stride > 0, "stride must be nonzero");
        let this_count = self.len() / this_stride;
        let other_count = other.len() / other_stride;
        let max_count = this_count.max(other_count);

        let mut out = Self::new();
        out.reserve(max_count * (this_stride + other_stride));
        let zeros = vec![T::default(); this_stride.max(other_stride)];
        let mut a = self.as_slice().chunks_exact(this_stride);
        let mut b = other.as_slice().chunks_exact(other_stride);
        for _ in 0..max_count {
            out.append_slice(a.next().unwrap_or(&zeros[..this_stride]));
            out.append_slice(b.next().unwrap_or(&zeros[..other_stride]));
        }
        out
    }
}

impl<T: Copy + Default + 'static, const N: usize> std::ops::Deref
    for RawArray<T, N>
{
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Copy + Default + 'static, const N: usize> std::ops::Index<usize>
    for RawArray<T, N>
{
    type Output = T;
    fn index(&self, i: usize) -> &T {
        &self.as_slice()[i]
    }
}

impl<T: Copy + Default + 'static, const N: usize> std::ops::IndexMut<usize>
    for RawArray<T, N>
{
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.as_mut_slice()[i]
    }
}

impl<T: Copy + Default + PartialEq + 'static, const N: usize> PartialEq
    for RawArray<T, N>
{
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.as_slice(), other.as_slice());
        (a.as_ptr() == b.as_ptr() && a.len() == b.len()) || a == b
    }
}

impl<T: Copy + Default + std::fmt::Debug + 'static, const N: usize>
    std::fmt::Debug for RawArray<T, N>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: Copy + Default + 'static, const N: usize> From<&[T]>
    for RawArray<T, N>
{
    fn from(values: &[T]) -> Self {
        let mut out = Self::new();
        out.append_slice(values);
        out
    }
}

impl<T: Copy + Default + 'static, const N: usize> FromIterator<T>
    for RawArray<T, N>
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut out = Self::new();
        for v in iter {
            out.append(v);
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_copy_on_write() {
        let mut a = RawArray::<f32>::new();
        a.append2(1.0, 2.0);
        let b = a.clone();
        a.append(3.0);
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 2);
        assert_ne!(a.as_ptr(), b.as_ptr());

        // A clone of a heap-backed array shares storage until written
        let mut c = b.clone();
        assert_eq!(c.as_ptr(), b.as_ptr());
        c[0] = 10.0;
        assert_ne!(c.as_ptr(), b.as_ptr());
        assert_eq!(b.as_slice(), &[1.0, 2.0]);
        assert_eq!(c.as_slice(), &[10.0, 2.0]);
    }

    #[test]
    fn test_growth() {
        let mut a = RawArray::<u32>::new();
        assert_eq!(a.capacity(), 16);
        for i in 0..16 {
            a.append(i);
        }
        assert_eq!(a.capacity(), 16);
        a.append(16);
        assert_eq!(a.capacity(), 32);
        a.append_slice(&[0; 40]);
        assert_eq!(a.capacity(), 57);
        assert_eq!(a.len(), 57);
    }

    #[test]
    fn test_batched_append() {
        let mut a = RawArray::<u16>::new();
        a.append4(1, 2, 3, 4);
        a.append3(5, 6, 7);
        a.append2(8, 9);
        let b: RawArray<u16> = (1..10).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_append_array() {
        let mut a = RawArray::<u32>::new();
        let inline: RawArray<u32> = (0..4).collect();
        let b = inline.clone(); // moves onto the heap
        a.append_array(&b);
        assert_eq!(a.as_ptr(), b.as_ptr());

        a.append_array(&RawArray::new());
        assert_eq!(a.len(), 4);

        let c = a.clone();
        let capacity = a.capacity();
        a.append_array(&c);
        assert_eq!(a.as_slice(), &[0, 1, 2, 3, 0, 1, 2, 3]);
        assert_eq!(a.capacity(), capacity * 2);
        assert_eq!(c.len(), 4);

        let d: RawArray<u32> = (10..12).collect();
        a.append_array(&d);
        assert_eq!(&a.as_slice()[8..], &[10, 11]);
    }

    #[test]
    fn test_replace() {
        let mut a: RawArray<i32> = (0..4).collect();
        let b = a.clone();
        a.replace(2, &[7, 8, 9]);
        assert_eq!(a.as_slice(), &[0, 1, 7, 8, 9]);
        assert_eq!(b.as_slice(), &[0, 1, 2, 3]);
        a.replace(-1, &[1]);
        a.replace(1, &[]);
        assert_eq!(a.as_slice(), &[0, 1, 7, 8, 9]);
        a.replace(7, &[5]);
        assert_eq!(a.as_slice(), &[0, 1, 7, 8, 9, 0, 0, 5]);
    }

    #[test]
    fn test_resize() {
        let mut a: RawArray<u8> = (1..4).collect();
        a.resize(6);
        assert_eq!(a.as_slice(), &[1, 2, 3, 0, 0, 0]);
        let b = a.clone();
        a.resize(2);
        assert_eq!(a.as_slice(), &[1, 2]);
        assert_eq!(b.len(), 6);
        a.reserve(100);
        assert!(a.capacity() >= 100);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_raw_data() {
        static INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];
        let mut a = RawArray::<u16>::new();
        a.set_raw_data(&INDICES);
        assert_eq!(a.as_ptr(), INDICES.as_ptr());
        assert!(!a.is_detached());

        let b = a.clone();
        assert_eq!(b.as_ptr(), INDICES.as_ptr());

        a.as_mut_slice()[0] = 9;
        assert!(a.is_detached());
        assert_eq!(a[0], 9);
        assert_eq!(b[0], 0);
        assert_eq!(a.capacity(), 16);
    }

    #[test]
    fn test_extract() {
        // Interleaved (x, y, z, nx, ny, nz)
        let a: RawArray<f32> = (0..12).map(|i| i as f32).collect();
        let pos = a.extract(0, 3, 6);
        assert_eq!(pos.as_slice(), &[0.0, 1.0, 2.0, 6.0, 7.0, 8.0]);
        let norm = a.extract(3, 3, 6);
        assert_eq!(norm.as_slice(), &[3.0, 4.0, 5.0, 9.0, 10.0, 11.0]);
        let y = a.extract(1, 1, 6);
        assert_eq!(y.as_slice(), &[1.0, 7.0]);

        assert!(matches!(
            a.try_extract(4, 3, 6),
            Err(Error::BadStride {
                index: 4,
                size: 3,
                stride: 6
            })
        ));
    }

    #[test]
    #[should_panic]
    fn test_extract_bad_stride() {
        let a: RawArray<f32> = (0..12).map(|i| i as f32).collect();
        a.extract(4, 3, 6);
    }

    #[test]
    fn test_interleaved() {
        let pos: RawArray<f32> = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
            .into_iter()
            .collect();
        let tex: RawArray<f32> = [0.5, 0.25].into_iter().collect();
        let out = pos.interleaved(3, &tex, 2);
        assert_eq!(
            out.as_slice(),
            &[1.0, 2.0, 3.0, 0.5, 0.25, 4.0, 5.0, 6.0, 0.0, 0.0]
        );

        let back = out.extract(0, 3, 5);
        assert_eq!(back, pos);
    }

    #[test]
    fn test_as_bytes() {
        let a: RawArray<u32> = [1, 0x0203_0405].into_iter().collect();
        assert_eq!(a.as_bytes().len(), 8);
        assert_eq!(&a.as_bytes()[..4], &1u32.to_ne_bytes());
    }
}
