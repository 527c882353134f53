//! Shared, reference-counted element storage.
//!
//! Every [`Array`](crate::Array) that is initialized holds exactly one [`SharedBuffer`] handle,
//! so the usage count of a buffer equals the number of arrays looking into it. Storage is freed
//! when the last handle is dropped.
//!
//! Operations that touch two buffers lock them in address order, so threads updating
//! `a` from `b` and `b` from `a` at the same time cannot wait on each other.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct SharedBuffer<T> {
    inner: Arc<RwLock<Vec<T>>>,
    len: usize,
}

impl<T> SharedBuffer<T> {
    pub fn from_vec(data: Vec<T>) -> Self {
        let len = data.len();
        Self {
            inner: Arc::new(RwLock::new(data)),
            len,
        }
    }

    /// Allocates `len` default (zero) elements.
    pub fn allocate(len: usize) -> Self
    where
        T: Default + Clone,
    {
        Self::from_vec(vec![T::default(); len])
    }

    /// Returns a new handle to the same storage.
    pub fn retain(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            len: self.len,
        }
    }

    /// Number of live handles to this storage.
    pub fn usage_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn same_buffer(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shared access to the whole buffer. Poisoning is ignored: the buffer only holds plain values.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the whole buffer.
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn locks_before(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.inner) < Arc::as_ptr(&other.inner)
    }

    /// Shared access to two distinct buffers.
    pub(crate) fn read_both<'a>(
        a: &'a Self,
        b: &'a Self,
    ) -> (RwLockReadGuard<'a, Vec<T>>, RwLockReadGuard<'a, Vec<T>>) {
        debug_assert!(!Self::same_buffer(a, b));
        if a.locks_before(b) {
            let first = a.read();
            (first, b.read())
        } else {
            let first = b.read();
            (a.read(), first)
        }
    }

    /// Shared access to `src` and exclusive access to a distinct `dst`.
    pub(crate) fn read_write<'a>(
        src: &'a Self,
        dst: &'a Self,
    ) -> (RwLockReadGuard<'a, Vec<T>>, RwLockWriteGuard<'a, Vec<T>>) {
        debug_assert!(!Self::same_buffer(src, dst));
        if src.locks_before(dst) {
            let first = src.read();
            (first, dst.write())
        } else {
            let first = dst.write();
            (src.read(), first)
        }
    }
}

impl<T> Clone for SharedBuffer<T> {
    fn clone(&self) -> Self {
        self.retain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_counted() {
        let buffer = SharedBuffer::<f32>::allocate(8);
        assert_eq!(buffer.usage_count(), 1);

        let view = buffer.retain();
        assert_eq!(buffer.usage_count(), 2);
        assert!(SharedBuffer::same_buffer(&buffer, &view));

        drop(view);
        assert_eq!(buffer.usage_count(), 1);
    }

    #[test]
    fn writes_are_visible_through_every_handle() {
        let buffer = SharedBuffer::from_vec(vec![1, 2, 3]);
        let other = buffer.clone();

        other.write()[1] = 20;

        assert_eq!(buffer.read().as_slice(), &[1, 20, 3]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn crossed_updates_do_not_deadlock() {
        let a = SharedBuffer::from_vec(vec![1u64; 16]);
        let b = SharedBuffer::from_vec(vec![1u64; 16]);

        std::thread::scope(|s| {
            for (src, dst) in [(&a, &b), (&b, &a)] {
                s.spawn(move || {
                    for _ in 0..10_000 {
                        {
                            let (src, mut dst) = SharedBuffer::read_write(src, dst);
                            dst[0] = dst[0].wrapping_add(src[1]);
                        }
                        let (x, y) = SharedBuffer::read_both(src, dst);
                        assert_eq!(x.len(), y.len());
                    }
                });
            }
        });

        assert_eq!(a.read()[0], 10_001);
        assert_eq!(b.read()[0], 10_001);
    }

    #[test]
    fn distinct_allocations_are_not_shared() {
        let a = SharedBuffer::<i32>::allocate(2);
        let b = SharedBuffer::<i32>::allocate(2);
        assert!(!SharedBuffer::same_buffer(&a, &b));
        assert_eq!(a.read().as_slice(), &[0, 0]);
    }
}
