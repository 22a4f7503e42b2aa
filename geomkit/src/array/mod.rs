//! Copy-on-write arrays for bulk vertex and index storage
//!
//! There are two array flavors, plus a borrowed window type:
//!
//! - [`GrowableArray`] is a general-purpose value-semantic array.  Small
//!   arrays live in an inline buffer; larger arrays move to a reference-counted
//!   heap block which is shared between clones until one of them is mutated.
//! - [`RawArray`] is a lighter variant for `Copy` element types, used for
//!   tightly packed buffers that are eventually handed to a GPU.
//! - [`ArrayView`] is a cheap `(owner, offset, len)` window into a
//!   [`GrowableArray`], produced by [`mid`](GrowableArray::mid),
//!   [`left`](GrowableArray::left), and [`right`](GrowableArray::right).
//!
//! ```
//! use geomkit::array::GrowableArray;
//!
//! let mut a = GrowableArray::<f32>::new();
//! a.append2(1.0, 2.0);
//!
//! // Cloning shares storage; the next mutation detaches
//! let b = a.clone();
//! a.append(3.0);
//! assert_eq!(a.as_slice(), &[1.0, 2.0, 3.0]);
//! assert_eq!(b.as_slice(), &[1.0, 2.0]);
//!
//! let view = a.mid(1, -1);
//! assert_eq!(view.to_array().as_slice(), &[2.0, 3.0]);
//! ```
mod growable;
mod raw;
mod storage;
mod view;

pub use growable::GrowableArray;
pub use raw::RawArray;
pub use view::{ArrayView, ArrayViewMut};

/// Picks the capacity of a heap block that must hold `alloc + extra` items
///
/// Below one page (4096 items), capacity starts at 64 and doubles until it
/// covers the request; above it, capacity starts at 4096 and doubles.  Requests
/// near the top of the `i32` range saturate at `i32::MAX`.
pub fn alloc_more(alloc: usize, extra: usize) -> usize {
    if alloc == 0 && extra == 0 {
        return 0;
    }
    const PAGE: usize = 1 << 12;
    const LIMIT: usize = i32::MAX as usize;

    let alloc = alloc.saturating_add(extra);
    if alloc >= LIMIT / 2 {
        return LIMIT;
    }
    let mut nalloc = if alloc < PAGE { 64 } else { PAGE };
    while nalloc < alloc {
        nalloc *= 2;
    }
    nalloc
}

/// Clamps a signed `(offset, length)` pair into a sequence of `size` items
///
/// A negative length means "to the end".
pub(crate) fn clamp_range(
    size: usize,
    offset: isize,
    length: isize,
) -> (usize, usize) {
    let offset = offset.clamp(0, size as isize) as usize;
    let avail = size - offset;
    let len = if length < 0 {
        avail
    } else {
        (length as usize).min(avail)
    };
    (offset, len)
}
