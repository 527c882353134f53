//! Fork-join parallel iteration over slices.
//!
//! Every terminal operation spawns its workers inside [`std::thread::scope`] and joins them before
//! returning: there is no persistent pool and no work outlives the call that started it. Workers
//! claim contiguous batches of item indices from a shared atomic cursor, so the order in which
//! batches complete is unobservable to the caller.

use std::marker::PhantomData;
use std::thread;

mod chunks;
pub use self::chunks::{Chunks, ChunksMut};
mod enumerate;
pub use self::enumerate::Enumerate;
mod zip;
pub use self::zip::Zip;

mod for_each;
use self::for_each::ForEach;

/// A parallel iterator over the items of a [`ParallelProducer`].
pub struct ParIter<P> {
    producer: P,
    config: ThreadConfig,
}

impl<P> ParIter<P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            config: ThreadConfig::default(),
        }
    }

    /// Limits the number of worker threads. Zero means "all available cores".
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.config.num_threads = (num_threads > 0).then_some(num_threads);
        self
    }

    /// Sets how many items a worker claims at once.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = Some(batch_size.max(1));
        self
    }
}

impl<P: ParallelProducer> ParIter<P> {
    /// Pairs items of two iterators by index. The shorter side decides the length.
    pub fn zip<Q: ParallelProducer>(self, other: ParIter<Q>) -> ParIter<Zip<P, Q>> {
        ParIter {
            producer: Zip::new(self.producer, other.producer),
            config: self.config,
        }
    }

    pub fn enumerate(self) -> ParIter<Enumerate<P>> {
        ParIter {
            producer: Enumerate::new(self.producer),
            config: self.config,
        }
    }

    /// Number of items the iterator will produce.
    pub fn len(&self) -> usize {
        self.producer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producer.len() == 0
    }

    /// Runs `f` on every item and blocks until all workers have finished.
    pub fn for_each<F>(self, f: F)
    where
        F: Fn(P::Item) + Send + Sync,
    {
        ForEach::new(self.producer, self.config).for_each(f);
    }
}

/// Thread and batching parameters of a single parallel region.
#[derive(Debug, Default, Clone, Copy)]
struct ThreadConfig {
    num_threads: Option<usize>,
    batch_size: Option<usize>,
}

impl ThreadConfig {
    /// Threads to spawn for `total_items`; never more threads than items.
    fn threads_for(&self, total_items: usize) -> usize {
        let available = self
            .num_threads
            .unwrap_or_else(|| thread::available_parallelism().map_or(4, |n| n.get()));
        available.min(total_items).max(1)
    }

    fn batch_for(&self, total_items: usize, num_threads: usize) -> usize {
        self.batch_size
            .unwrap_or_else(|| total_items.div_ceil(num_threads * 4).max(1))
    }
}

/// Source of items addressable by index from any worker thread.
pub trait ParallelProducer: Send + Sync {
    type Item;

    /// Returns the total number of items to be processed.
    fn len(&self) -> usize;

    /// Gets a single item by its index.
    ///
    /// # Safety
    ///
    /// Each index may be requested at most once while any item previously returned by this
    /// producer is alive. Mutable producers hand out `&mut` items, and a repeated index would
    /// alias them.
    unsafe fn get_item(&self, index: usize) -> Option<Self::Item>;
}

/// Chunked parallel views of a slice.
pub trait ParallelSlice<T: Send + Sync> {
    fn par_chunks(&self, chunk_size: usize) -> ParIter<Chunks<'_, T>>;
    fn par_chunks_mut(&mut self, chunk_size: usize) -> ParIter<ChunksMut<'_, T>>;
}

impl<T: Send + Sync> ParallelSlice<T> for [T] {
    fn par_chunks(&self, chunk_size: usize) -> ParIter<Chunks<'_, T>> {
        ParIter::new(Chunks::new(self, chunk_size))
    }

    fn par_chunks_mut(&mut self, chunk_size: usize) -> ParIter<ChunksMut<'_, T>> {
        ParIter::new(ChunksMut::new(self, chunk_size))
    }
}

impl<T: Send + Sync> ParallelSlice<T> for Vec<T> {
    fn par_chunks(&self, chunk_size: usize) -> ParIter<Chunks<'_, T>> {
        self.as_slice().par_chunks(chunk_size)
    }

    fn par_chunks_mut(&mut self, chunk_size: usize) -> ParIter<ChunksMut<'_, T>> {
        self.as_mut_slice().par_chunks_mut(chunk_size)
    }
}
