//! Reductions over all elements or along one axis.
//!
//! Without an axis, and for rank-1 input, the result is a zero-dim array. With an axis the
//! reduced axis is first permuted to the innermost position so every output element reduces one
//! contiguous row.

use super::*;

fn reduce_with<T, F>(array: &Array<T>, axis: Option<usize>, f: F) -> Result<Array<T>>
where
    T: Element,
    F: Fn(&[T]) -> Result<T>,
{
    if let Some(axis) = axis {
        if axis >= array.rank() {
            return Err(ArrayError::IndexOutOfRange(format!(
                "axis {axis} is out of range for an array of rank {}",
                array.rank()
            )));
        }
    }
    let axis = match axis {
        Some(axis) if array.rank() > 1 => axis,
        _ => {
            let value = array.with_window(|data| f(data))??;
            return Ok(Array::from_scalar(value));
        }
    };

    let last = array.rank() - 1;
    let moved = if axis == last {
        array.clone()
    } else {
        let order = (0..array.rank()).filter(|&a| a != axis).chain([axis]).collect::<Dims>();
        array.transposed(&order)?
    };

    let row_len = moved.shape[last];
    let data = moved.with_window(|data| data.chunks_exact(row_len).map(&f).collect::<Result<Vec<_>>>())??;
    Array::from_vec(data, sub_vector(&moved.shape, 0, 1))
}

fn count<T: Element>(len: usize) -> Result<T> {
    T::from(len).ok_or_else(|| {
        ArrayError::CastError(format!("element count {len} does not fit the element type"))
    })
}

fn sum_of<T: Element>(values: &[T]) -> T {
    values.iter().fold(T::zero(), |acc, &v| acc + v)
}

fn mean_of<T: Element>(values: &[T]) -> Result<T> {
    Ok(sum_of(values) / count(values.len())?)
}

pub fn sum<T: Element>(array: &Array<T>, axis: Option<usize>) -> Result<Array<T>> {
    reduce_with(array, axis, |values| Ok(sum_of(values)))
}

/// Arithmetic mean. Integer elements use integer division.
pub fn mean<T: Element>(array: &Array<T>, axis: Option<usize>) -> Result<Array<T>> {
    reduce_with(array, axis, mean_of)
}

/// Population variance: the mean of squared deviations from the mean.
pub fn var<T: Element>(array: &Array<T>, axis: Option<usize>) -> Result<Array<T>> {
    reduce_with(array, axis, |values| {
        let m = mean_of(values)?;
        let squares = values.iter().map(|&v| (v - m) * (v - m)).collect::<Vec<_>>();
        mean_of(&squares)
    })
}

pub fn min<T: Element>(array: &Array<T>, axis: Option<usize>) -> Result<Array<T>> {
    reduce_with(array, axis, |values| Ok(extreme(values, |a, b| a < b)))
}

pub fn max<T: Element>(array: &Array<T>, axis: Option<usize>) -> Result<Array<T>> {
    reduce_with(array, axis, |values| Ok(extreme(values, |a, b| a > b)))
}

fn extreme<T: Element>(values: &[T], better: impl Fn(T, T) -> bool) -> T {
    values
        .iter()
        .copied()
        .reduce(|best, v| if better(v, best) { v } else { best })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_reductions() -> Result<()> {
        let a = Array::<f64>::from_nested(&[[1.0, 2.0], [3.0, 6.0]])?;

        let total = sum(&a, None)?;
        assert!(total.is_zero_dim());
        assert_eq!(total.scalar()?, 12.0);
        assert_eq!(mean(&a, None)?.scalar()?, 3.0);
        assert_eq!(var(&a, None)?.scalar()?, 3.5);
        assert_eq!(min(&a, None)?.scalar()?, 1.0);
        assert_eq!(max(&a, None)?.scalar()?, 6.0);

        Ok(())
    }

    #[test]
    fn axis_reductions() -> Result<()> {
        let a = Array::<i32>::from_nested(&[[1, 2, 3], [4, 5, 6]])?;

        assert_eq!(sum(&a, Some(0))?, Array::from(vec![5, 7, 9]));
        assert_eq!(sum(&a, Some(1))?, Array::from(vec![6, 15]));
        assert_eq!(mean(&a, Some(1))?, Array::from(vec![2, 5]));
        assert_eq!(max(&a, Some(0))?, Array::from(vec![4, 5, 6]));

        Ok(())
    }

    #[test]
    fn middle_axis_of_a_cube() -> Result<()> {
        let a = Array::<i64>::arange(24)?.reshaped(&[2, 3, 4])?;
        let s = sum(&a, Some(1))?;

        assert_eq!(s.shape(), &[2, 4]);
        assert_eq!(s.value(&[0, 0])?, 0 + 4 + 8);
        assert_eq!(s.value(&[1, 3])?, 15 + 19 + 23);

        Ok(())
    }

    #[test]
    fn variance_along_an_axis() -> Result<()> {
        let a = Array::<f32>::from_nested(&[[1.0, 3.0], [2.0, 2.0]])?;
        assert_eq!(var(&a, Some(1))?, Array::from(vec![1.0, 0.0]));
        assert_eq!(var(&a, Some(0))?, Array::from(vec![0.25, 0.25]));

        Ok(())
    }

    #[test]
    fn rank_one_ignores_the_axis() -> Result<()> {
        let v = Array::<i32>::arange(5)?;
        assert_eq!(sum(&v, Some(0))?.scalar()?, 10);
        assert!(sum(&v, Some(0))?.is_zero_dim());

        Ok(())
    }

    #[test]
    fn axis_out_of_range() {
        let a = Array::<i32>::new(&[2, 2]);
        assert!(matches!(sum(&a, Some(2)), Err(ArrayError::IndexOutOfRange(_))));
        assert!(matches!(
            mean(&Array::<i32>::default(), None),
            Err(ArrayError::UninitializedArrayAccess(_))
        ));
    }
}
