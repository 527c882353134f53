use super::*;

/// Views of the sub-arrays along the first axis, in order.
pub struct Rows<'a, T> {
    array: &'a Array<T>,
    current_index: usize,
}

impl<'a, T: Element> IntoIterator for &'a Array<T> {
    type Item = Array<T>;
    type IntoIter = Rows<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows()
    }
}

impl<'a, T: Element> Iterator for Rows<'a, T> {
    type Item = Array<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.array.at(self.current_index).ok()?;
        self.current_index += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = if self.array.is_initialized() { self.array.shape[0] } else { 0 };
        let remaining = total.saturating_sub(self.current_index);
        (remaining, Some(remaining))
    }
}

impl<T: Element> ExactSizeIterator for Rows<'_, T> {}

impl<T: Element> Array<T> {
    /// Iterates over views of `at(0)`, `at(1)`, ... Every view shares the buffer.
    pub fn rows(&self) -> Rows<'_, T> {
        Rows {
            array: self,
            current_index: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_of_a_cube() -> Result<()> {
        let a = Array::<i32>::arange(16)?.reshaped(&[4, 2, 2])?;

        let mut iter = a.into_iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next().unwrap(), Array::from_vec(vec![0, 1, 2, 3], &[2, 2])?);
        assert_eq!(iter.next().unwrap(), Array::from_vec(vec![4, 5, 6, 7], &[2, 2])?);
        assert_eq!(iter.next().unwrap(), Array::from_vec(vec![8, 9, 10, 11], &[2, 2])?);
        assert_eq!(iter.next().unwrap(), Array::from_vec(vec![12, 13, 14, 15], &[2, 2])?);
        assert!(iter.next().is_none());

        Ok(())
    }

    #[test]
    fn rows_are_writable_views() -> Result<()> {
        let a = Array::<i32>::new(&[3, 2]);
        for (i, row) in a.rows().enumerate() {
            row.fill(i as i32)?;
        }
        assert_eq!(a.to_vec()?, vec![0, 0, 1, 1, 2, 2]);

        let vector = Array::<i32>::arange(3)?;
        assert!(vector.rows().all(|element| element.is_zero_dim()));
        assert_eq!(Array::<i32>::default().rows().count(), 0);

        Ok(())
    }
}
