use super::*;

#[doc(hidden)]
pub struct Enumerate<P> {
    inner: P,
}

impl<P> Enumerate<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: ParallelProducer> ParallelProducer for Enumerate<P> {
    type Item = (usize, P::Item);

    fn len(&self) -> usize {
        self.inner.len()
    }

    unsafe fn get_item(&self, index: usize) -> Option<Self::Item> {
        // SAFETY: forwarded from the caller.
        unsafe { self.inner.get_item(index) }.map(|item| (index, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_index_matches_position() {
        let mut data = vec![0usize; 20];

        data.par_chunks_mut(3).enumerate().for_each(|(i, chunk)| {
            chunk.fill(i);
        });

        for (pos, &val) in data.iter().enumerate() {
            assert_eq!(val, pos / 3);
        }
    }
}
