use super::*;

#[doc(hidden)]
pub struct Zip<A, B> {
    a: A,
    b: B,
}

impl<A, B> Zip<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A: ParallelProducer, B: ParallelProducer> ParallelProducer for Zip<A, B> {
    type Item = (A::Item, B::Item);

    fn len(&self) -> usize {
        self.a.len().min(self.b.len())
    }

    unsafe fn get_item(&self, index: usize) -> Option<Self::Item> {
        // SAFETY: the caller's once-per-index contract carries over to both sides.
        unsafe { Some((self.a.get_item(index)?, self.b.get_item(index)?)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sides_are_written() {
        let mut lhs = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let mut rhs = vec![10, 20, 30, 40, 50, 60, 70, 80];

        lhs.par_chunks_mut(2)
            .zip(rhs.par_chunks_mut(2))
            .for_each(|(left, right)| {
                for (a, b) in left.iter_mut().zip(right.iter_mut()) {
                    *a += 100;
                    *b += 200;
                }
            });

        assert_eq!(lhs, vec![101, 102, 103, 104, 105, 106, 107, 108]);
        assert_eq!(rhs, vec![210, 220, 230, 240, 250, 260, 270, 280]);
    }

    #[test]
    fn shorter_side_decides_length() {
        let long = vec![0u8; 10];
        let short = vec![0u8; 4];

        assert_eq!(long.par_chunks(2).zip(short.par_chunks(2)).len(), 2);
    }
}
