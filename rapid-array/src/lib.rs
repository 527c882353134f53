//! Dense N-dimensional arrays over shared, reference-counted buffers.
//!

use num_traits::{Num, NumCast};
use smallvec::{SmallVec, smallvec};
use std::ops::Range;

mod arith;
pub mod backend;
pub mod broadcast;
mod buffer;
mod config;
mod constructive;
pub mod dispatch;
mod display;
mod element;
mod error;
mod iterator;
pub mod math;
mod matmul;
pub mod reduce;
pub mod shape;
mod transpose;
mod view;

pub use crate::backend::{LinearAlgebraBackend, NoBackend, current_backend, install_backend};
pub use crate::broadcast::BroadcastMode;
pub use crate::buffer::SharedBuffer;
pub use crate::config::ExecutionConfig;
pub use crate::constructive::Nested;
pub use crate::dispatch::ExecutionMode;
pub use crate::element::Element;
pub use crate::error::ArrayError;
pub use crate::iterator::Rows;
pub use crate::matmul::MatmulStrategy;
pub use crate::shape::Dims;

use crate::broadcast::resolve_or_err;
use crate::config::{
    binary_parallel_threshold, forced_mode, transpose_parallel_threshold, unary_parallel_threshold,
    worker_threads,
};
use crate::error::ensure_in_range;
use crate::shape::{checked_prod, index_to_offset, prod, sub_vector};

pub type Result<T> = std::result::Result<T, error::ArrayError>;

/// Reshape sentinel: the extent is inferred from the element count.
pub const AUTO: usize = usize::MAX;

/// A dense, row-major N-dimensional array.
///
/// An array is a window (`offset` and `shape`) into a [`SharedBuffer`]. Subscripting, reshaping
/// and cloning create views that share the buffer and bump its usage count, while arithmetic,
/// reductions, transposition and [`copy`](Array::copy) allocate a fresh buffer. Writes through
/// any view (`fill`, `set_value`, in-place operators) are visible through every other view of the
/// same buffer.
///
/// A zero-dim array holds a single scalar. It is stored with shape `[1]` and a flag, so every
/// initialized array has a rank of at least one. An array created through [`Default`] has no
/// buffer at all until it is [`assign`](Array::assign)-ed or [`rebind`](Array::rebind)-ed.
pub struct Array<T> {
    buffer: Option<SharedBuffer<T>>,
    shape: Dims,
    offset: usize,
    zero_dim: bool,
}

impl<T> Array<T> {
    fn from_parts(buffer: SharedBuffer<T>, shape: Dims, offset: usize, zero_dim: bool) -> Self {
        debug_assert!(offset + prod(&shape) <= buffer.len());
        Self {
            buffer: Some(buffer),
            shape,
            offset,
            zero_dim,
        }
    }

    /// Wraps freshly computed data; `data.len()` must equal `prod(shape)`.
    fn owned(data: Vec<T>, shape: Dims, zero_dim: bool) -> Self {
        Self::from_parts(SharedBuffer::from_vec(data), shape, 0, zero_dim)
    }

    fn buffer(&self) -> Result<&SharedBuffer<T>> {
        self.buffer.as_ref().ok_or_else(|| {
            ArrayError::UninitializedArrayAccess("array has no buffer".to_string())
        })
    }

    fn window(&self) -> Range<usize> {
        self.offset..self.offset + prod(&self.shape)
    }

    /// Runs `f` over the elements of this array under a shared lock.
    fn with_window<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        let guard = self.buffer()?.read();
        Ok(f(&guard[self.window()]))
    }

    /// Runs `f` over the elements of this array under an exclusive lock.
    fn with_window_mut<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R> {
        let mut guard = self.buffer()?.write();
        let window = self.window();
        Ok(f(&mut guard[window]))
    }

    /// Runs `f` over the windows of two arrays, taking one lock per distinct buffer.
    fn with_windows<R>(&self, other: &Array<T>, f: impl FnOnce(&[T], &[T]) -> R) -> Result<R> {
        let (lhs, rhs) = (self.buffer()?, other.buffer()?);
        if SharedBuffer::same_buffer(lhs, rhs) {
            let guard = lhs.read();
            Ok(f(&guard[self.window()], &guard[other.window()]))
        } else {
            let (lhs, rhs) = SharedBuffer::read_both(lhs, rhs);
            Ok(f(&lhs[self.window()], &rhs[other.window()]))
        }
    }

    /// Runs `f` over this window (exclusive) and `src`'s window (shared).
    ///
    /// An aliased `src` is snapshotted first, so `f` never sees overlapping slices.
    fn with_source_mut<R>(&self, src: &Array<T>, f: impl FnOnce(&mut [T], &[T]) -> R) -> Result<R>
    where
        T: Clone,
    {
        let (dst, source) = (self.buffer()?, src.buffer()?);
        if SharedBuffer::same_buffer(dst, source) {
            let snapshot = source.read()[src.window()].to_vec();
            let mut guard = dst.write();
            return Ok(f(&mut guard[self.window()], &snapshot));
        }

        let (source, mut guard) = SharedBuffer::read_write(source, dst);
        Ok(f(&mut guard[self.window()], &source[src.window()]))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements; zero for an uninitialized array.
    pub fn len(&self) -> usize {
        if self.buffer.is_some() { prod(&self.shape) } else { 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_zero_dim(&self) -> bool {
        self.zero_dim
    }

    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    /// Number of arrays sharing this array's buffer, including itself. Zero when uninitialized.
    pub fn usage_count(&self) -> usize {
        self.buffer.as_ref().map_or(0, SharedBuffer::usage_count)
    }

    /// Whether both arrays look into the same buffer.
    pub fn shares_buffer_with(&self, other: &Array<T>) -> bool {
        match (&self.buffer, &other.buffer) {
            (Some(a), Some(b)) => SharedBuffer::same_buffer(a, b),
            _ => false,
        }
    }
}

/// Cloning creates a view: the clone shares the buffer.
impl<T> Clone for Array<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.as_ref().map(SharedBuffer::retain),
            shape: self.shape.clone(),
            offset: self.offset,
            zero_dim: self.zero_dim,
        }
    }
}

/// An uninitialized array without a buffer.
impl<T> Default for Array<T> {
    fn default() -> Self {
        Self {
            buffer: None,
            shape: Dims::new(),
            offset: 0,
            zero_dim: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_are_views() -> Result<()> {
        let a = Array::<i32>::from_vec(vec![1, 2, 3], &[3])?;
        let b = a.clone();

        assert_eq!(a.usage_count(), 2);
        assert!(a.shares_buffer_with(&b));

        b.set_value(&[0], 10)?;
        assert_eq!(a.to_vec()?, vec![10, 2, 3]);

        drop(b);
        assert_eq!(a.usage_count(), 1);

        Ok(())
    }

    #[test]
    fn uninitialized_arrays_refuse_access() {
        let a = Array::<f64>::default();

        assert!(!a.is_initialized());
        assert_eq!(a.len(), 0);
        assert_eq!(a.usage_count(), 0);
        assert!(matches!(a.to_vec(), Err(ArrayError::UninitializedArrayAccess(_))));
        assert!(matches!(a.at(0), Err(ArrayError::UninitializedArrayAccess(_))));
    }
}
