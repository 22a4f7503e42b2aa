use super::{GrowableArray, clamp_range};

/// Borrowed window into a [`GrowableArray`]
///
/// Views are built with [`GrowableArray::mid`], [`left`](GrowableArray::left)
/// and [`right`](GrowableArray::right), which clamp their bounds to the
/// owner's contents.  A default-constructed view is null: it has no owner and
/// only compares equal to other null views.  Non-null views compare by value,
/// regardless of which arrays they point into.
pub struct ArrayView<'a, T: 'static, const N: usize = 8> {
    owner: Option<&'a GrowableArray<T, N>>,
    offset: usize,
    len: usize,
}

impl<T: 'static, const N: usize> Clone for ArrayView<'_, T, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static, const N: usize> Copy for ArrayView<'_, T, N> {}

impl<T: 'static, const N: usize> Default for ArrayView<'_, T, N> {
    fn default() -> Self {
        Self {
            owner: None,
            offset: 0,
            len: 0,
        }
    }
}

impl<'a, T: Clone + 'static, const N: usize> ArrayView<'a, T, N> {
    /// Builds a view of `length` items of `owner`, starting at `offset`
    ///
    /// `offset` is clamped to the owner's length; a negative or overlong
    /// `length` runs to the end of the owner.
    pub fn new(
        owner: &'a GrowableArray<T, N>,
        offset: isize,
        length: isize,
    ) -> Self {
        let (offset, len) = clamp_range(owner.len(), offset, length);
        Self {
            owner: Some(owner),
            offset,
            len,
        }
    }

    /// Checks whether this view has no owner
    pub fn is_null(&self) -> bool {
        self.owner.is_none()
    }

    /// Returns the array this view points into
    pub fn owner(&self) -> Option<&'a GrowableArray<T, N>> {
        self.owner
    }

    /// Returns the offset of the first item within the owner
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of items in the view
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the view is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the viewed items
    pub fn as_slice(&self) -> &'a [T] {
        match self.owner {
            Some(o) => &o.as_slice()[self.offset..self.offset + self.len],
            None => &[],
        }
    }

    /// Materializes the view as an owned array
    ///
    /// A view covering all of its owner returns a clone that shares the
    /// owner's storage; anything else is copied.
    pub fn to_array(&self) -> GrowableArray<T, N> {
        match self.owner {
            Some(o) if self.offset == 0 && self.len == o.len() => o.clone(),
            _ => GrowableArray::from(self.as_slice()),
        }
    }
}

impl<T: Clone + 'static, const N: usize> std::ops::Deref
    for ArrayView<'_, T, N>
{
    type Target = [T];
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Clone + PartialEq + 'static, const N: usize> PartialEq
    for ArrayView<'_, T, N>
{
    fn eq(&self, other: &Self) -> bool {
        match (self.owner, other.owner) {
            (None, None) => true,
            (Some(..), Some(..)) => self.as_slice() == other.as_slice(),
            _ => false,
        }
    }
}

impl<T: Clone + std::fmt::Debug + 'static, const N: usize> std::fmt::Debug
    for ArrayView<'_, T, N>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "ArrayView(null)")
        } else {
            f.debug_list().entries(self.as_slice()).finish()
        }
    }
}

/// Mutable window into a [`GrowableArray`]
///
/// Writes go through the owner, which detaches from any shared storage first.
pub struct ArrayViewMut<'a, T: 'static, const N: usize = 8> {
    owner: &'a mut GrowableArray<T, N>,
    offset: usize,
    len: usize,
}

impl<'a, T: Clone + 'static, const N: usize> ArrayViewMut<'a, T, N> {
    pub(super) fn new(
        owner: &'a mut GrowableArray<T, N>,
        offset: usize,
        len: usize,
    ) -> Self {
        Self { owner, offset, len }
    }

    /// Returns the number of items in the view
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the view is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the viewed items
    pub fn as_slice(&self) -> &[T] {
        &self.owner.as_slice()[self.offset..self.offset + self.len]
    }

    /// Returns the viewed items for writing, detaching the owner if shared
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.owner.as_mut_slice()[self.offset..self.offset + self.len]
    }
}
