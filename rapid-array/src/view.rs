use super::*;

impl<T: Element> Array<T> {
    /// Subscript: a view of the `index`-th sub-array along the first axis.
    ///
    /// The view shares the buffer (usage count + 1). Subscripting a rank-1 array gives a zero-dim
    /// view of a single element.
    pub fn at(&self, index: usize) -> Result<Array<T>> {
        let buffer = self.buffer()?;
        if index >= self.shape[0] {
            return Err(ArrayError::IndexOutOfRange(format!(
                "index {index} is out of range for axis 0 with extent {}",
                self.shape[0]
            )));
        }

        let offset = self.offset + index_to_offset(&[index], &self.shape);
        let (shape, zero_dim) = if self.rank() == 1 {
            (smallvec![1], true)
        } else {
            (Dims::from_slice(sub_vector(&self.shape, 1, 0)), false)
        };
        Ok(Array::from_parts(buffer.retain(), shape, offset, zero_dim))
    }

    /// A view of the same elements with another shape.
    ///
    /// At most one extent may be [`AUTO`]; it is inferred from the element count.
    pub fn reshaped(&self, new_shape: &[usize]) -> Result<Array<T>> {
        let buffer = self.buffer()?;
        let shape = self.resolve_shape(new_shape)?;
        let zero_dim = self.zero_dim && shape.len() == 1;
        Ok(Array::from_parts(buffer.retain(), shape, self.offset, zero_dim))
    }

    /// Changes the shape of this handle in place.
    pub fn reshape(&mut self, new_shape: &[usize]) -> Result<()> {
        self.buffer()?;
        let shape = self.resolve_shape(new_shape)?;
        self.zero_dim = self.zero_dim && shape.len() == 1;
        self.shape = shape;
        Ok(())
    }

    fn resolve_shape(&self, new_shape: &[usize]) -> Result<Dims> {
        let len = prod(&self.shape);
        let mut shape = Dims::from_slice(new_shape);

        let mut auto = shape.iter().enumerate().filter(|&(_, &d)| d == AUTO).map(|(i, _)| i);
        if let Some(axis) = auto.next() {
            if auto.next().is_some() {
                return Err(ArrayError::InvalidArgument(format!(
                    "only one AUTO extent is allowed, got {new_shape:?}"
                )));
            }
            let explicit: Dims = shape.iter().copied().filter(|&d| d != AUTO).collect();
            let explicit = checked_prod(&explicit)?;
            if explicit == 0 || len % explicit != 0 {
                return Err(ArrayError::ShapeMismatch(format!(
                    "cannot infer AUTO extent: {len} elements are not divisible by {explicit}"
                )));
            }
            shape[axis] = len / explicit;
        }

        if shape.is_empty() || checked_prod(&shape)? != len {
            return Err(ArrayError::ShapeMismatch(format!(
                "cannot reshape {:?} ({len} elements) into {new_shape:?}",
                self.shape
            )));
        }
        Ok(shape)
    }

    fn element_offset(&self, index: &[usize]) -> Result<usize> {
        ensure_in_range!(
            index.len() == self.rank(),
            "index {index:?} does not address an element of shape {:?}",
            self.shape
        );
        for (axis, (&i, &extent)) in index.iter().zip(&self.shape).enumerate() {
            ensure_in_range!(
                i < extent,
                "index {i} is out of range for axis {axis} with extent {extent}"
            );
        }
        Ok(self.offset + index_to_offset(index, &self.shape))
    }

    /// The element at a full multi-index.
    pub fn value(&self, index: &[usize]) -> Result<T> {
        let offset = self.element_offset(index)?;
        let guard = self.buffer()?.read();
        Ok(guard[offset])
    }

    pub fn set_value(&self, index: &[usize], value: T) -> Result<()> {
        let offset = self.element_offset(index)?;
        self.buffer()?.write()[offset] = value;
        Ok(())
    }

    /// The first element of the window; the value of a zero-dim array.
    pub fn scalar(&self) -> Result<T> {
        self.with_window(|data| data[0])
    }

    /// The elements of the window in row-major order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.with_window(|data| data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscript_creates_a_view() -> Result<()> {
        let a = Array::<i32>::from_nested(&[[1, 2], [3, 4], [5, 6]])?;
        let row = a.at(1)?;

        assert_eq!(a.usage_count(), 2);
        assert_eq!(row.shape(), &[2]);
        assert_eq!(row.to_vec()?, vec![3, 4]);

        let element = row.at(1)?;
        assert!(element.is_zero_dim());
        assert_eq!(element.scalar()?, 4);
        assert_eq!(a.usage_count(), 3);

        assert!(matches!(a.at(3), Err(ArrayError::IndexOutOfRange(_))));

        Ok(())
    }

    #[test]
    fn writes_through_views_alias() -> Result<()> {
        let a = Array::<i32>::new(&[2, 3]);
        a.at(0)?.fill(5)?;

        assert_eq!(a.value(&[0, 2])?, 5);
        assert_eq!(a.value(&[1, 0])?, 0);

        a.at(1)?.at(2)?.set_value(&[0], 8)?;
        assert_eq!(a.to_vec()?, vec![5, 5, 5, 0, 0, 8]);

        Ok(())
    }

    #[test]
    fn reshape_round_trip_shares_the_buffer() -> Result<()> {
        let a = Array::<f32>::arange(12.0)?;
        let b = a.reshaped(&[3, 4])?;
        let c = b.reshaped(&[12])?;

        assert_eq!(b.shape(), &[3, 4]);
        assert_eq!(c, a);
        assert_eq!(a.usage_count(), 3);
        assert!(c.shares_buffer_with(&a));

        Ok(())
    }

    #[test]
    fn auto_extent_is_inferred() -> Result<()> {
        let a = Array::<i32>::arange(4)?;
        assert_eq!(a.reshaped(&[AUTO, 1])?.shape(), &[4, 1]);
        assert_eq!(a.reshaped(&[2, AUTO])?.shape(), &[2, 2]);

        assert!(matches!(
            a.reshaped(&[AUTO, 3]),
            Err(ArrayError::ShapeMismatch(_))
        ));
        assert!(matches!(
            a.reshaped(&[AUTO, AUTO]),
            Err(ArrayError::InvalidArgument(_))
        ));
        assert!(matches!(a.reshaped(&[3]), Err(ArrayError::ShapeMismatch(_))));

        Ok(())
    }

    #[test]
    fn oversized_shapes_are_rejected() -> Result<()> {
        let a = Array::<i32>::arange(4)?;
        let huge = usize::MAX / 2 + 1;

        assert!(matches!(a.reshaped(&[huge, 4]), Err(ArrayError::ShapeMismatch(_))));
        assert!(matches!(a.reshaped(&[huge, 4, AUTO]), Err(ArrayError::ShapeMismatch(_))));

        Ok(())
    }

    #[test]
    fn reshape_in_place() -> Result<()> {
        let mut a = Array::<i32>::arange(6)?;
        a.reshape(&[3, 2])?;
        assert_eq!(a.shape(), &[3, 2]);
        assert_eq!(a.value(&[2, 1])?, 5);
        assert_eq!(a.usage_count(), 1);

        let mut scalar = Array::from_scalar(1.5);
        scalar.reshape(&[1, 1])?;
        assert!(!scalar.is_zero_dim());

        Ok(())
    }

    #[test]
    fn element_access_is_bounds_checked() -> Result<()> {
        let a = Array::<u16>::new(&[2, 2]);
        a.set_value(&[1, 1], 4)?;
        assert_eq!(a.value(&[1, 1])?, 4);

        if cfg!(not(feature = "unchecked")) {
            assert!(matches!(a.value(&[2, 0]), Err(ArrayError::IndexOutOfRange(_))));
            assert!(matches!(a.value(&[0]), Err(ArrayError::IndexOutOfRange(_))));
            assert!(matches!(a.set_value(&[0, 5], 1), Err(ArrayError::IndexOutOfRange(_))));
        }

        Ok(())
    }
}
