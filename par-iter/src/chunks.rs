use super::*;

/// Immutable, non-overlapping chunks of a slice. The last chunk may be shorter.
#[doc(hidden)]
pub struct Chunks<'a, T: 'a> {
    ptr: *const T,
    len: usize,
    chunk_size: usize,
    _phantom: PhantomData<&'a T>,
}

impl<'a, T: Send + Sync> Chunks<'a, T> {
    pub fn new(slice: &'a [T], chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            ptr: slice.as_ptr(),
            len: slice.len(),
            chunk_size,
            _phantom: PhantomData,
        }
    }
}

impl<'a, T: Send + Sync> ParallelProducer for Chunks<'a, T> {
    type Item = &'a [T];

    fn len(&self) -> usize {
        self.len.div_ceil(self.chunk_size)
    }

    unsafe fn get_item(&self, index: usize) -> Option<Self::Item> {
        let (start, size) = chunk_bounds(index, self.chunk_size, self.len)?;
        // SAFETY: `start + size <= len` and the slice outlives 'a.
        Some(unsafe { std::slice::from_raw_parts(self.ptr.add(start), size) })
    }
}

unsafe impl<'a, T: Send + Sync> Send for Chunks<'a, T> {}
unsafe impl<'a, T: Send + Sync> Sync for Chunks<'a, T> {}

/// Mutable, non-overlapping chunks of a slice.
///
/// Chunks never overlap, so handing distinct indices to distinct workers never aliases.
#[doc(hidden)]
pub struct ChunksMut<'a, T: 'a> {
    ptr: *mut T,
    len: usize,
    chunk_size: usize,
    _phantom: PhantomData<&'a mut T>,
}

impl<'a, T: Send + Sync> ChunksMut<'a, T> {
    pub fn new(slice: &'a mut [T], chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            chunk_size,
            _phantom: PhantomData,
        }
    }
}

impl<'a, T: Send + Sync> ParallelProducer for ChunksMut<'a, T> {
    type Item = &'a mut [T];

    fn len(&self) -> usize {
        self.len.div_ceil(self.chunk_size)
    }

    unsafe fn get_item(&self, index: usize) -> Option<Self::Item> {
        let (start, size) = chunk_bounds(index, self.chunk_size, self.len)?;
        // SAFETY: in bounds, and the caller requests each index once, so chunks are disjoint.
        Some(unsafe { std::slice::from_raw_parts_mut(self.ptr.add(start), size) })
    }
}

unsafe impl<'a, T: Send + Sync> Send for ChunksMut<'a, T> {}
unsafe impl<'a, T: Send + Sync> Sync for ChunksMut<'a, T> {}

fn chunk_bounds(index: usize, chunk_size: usize, len: usize) -> Option<(usize, usize)> {
    let start = index.checked_mul(chunk_size)?;
    if start >= len {
        return None;
    }
    Some((start, chunk_size.min(len - start)))
}
