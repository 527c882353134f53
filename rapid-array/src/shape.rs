//! Pure helpers over shapes and multi-indices. All layouts are row-major.

use super::*;

/// Inline storage for shapes; arrays of rank 4 or less never touch the heap for their shape.
pub type Dims = SmallVec<[usize; 4]>;

/// Number of elements described by `shape`.
pub fn prod(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Number of elements described by `shape`, or a [`ArrayError::ShapeMismatch`] when the count
/// does not fit `usize`.
pub fn checked_prod(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
        .ok_or_else(|| {
            ArrayError::ShapeMismatch(format!("shape {shape:?} has more elements than fit in usize"))
        })
}

/// Linear row-major offset of `index` into `shape`.
///
/// Missing trailing index entries count as zero, so `[i]` addresses the start of the `i`-th
/// sub-array.
pub fn index_to_offset(index: &[usize], shape: &[usize]) -> usize {
    let mut offset = 0;
    let mut stride = 1;
    for (dim, &extent) in shape.iter().enumerate().rev() {
        offset += index.get(dim).copied().unwrap_or(0) * stride;
        stride *= extent;
    }
    offset
}

/// Shape after permuting axes by `order`. An empty order reverses the axes.
pub fn transposed_shape(shape: &[usize], order: &[usize]) -> Dims {
    if order.is_empty() {
        shape.iter().rev().copied().collect()
    } else {
        order.iter().map(|&axis| shape[axis]).collect()
    }
}

/// Checks that `order` is a permutation of `0..rank` (or empty).
pub fn validate_permutation(order: &[usize], rank: usize) -> Result<()> {
    if order.is_empty() {
        return Ok(());
    }
    if order.len() != rank {
        return Err(ArrayError::InvalidArgument(format!(
            "Permutation {order:?} has {} axes, array has {rank}",
            order.len()
        )));
    }

    let mut seen: Dims = smallvec![0; rank];
    for &axis in order {
        if axis >= rank || seen[axis] != 0 {
            return Err(ArrayError::InvalidArgument(format!(
                "{order:?} is not a permutation of 0..{rank}"
            )));
        }
        seen[axis] = 1;
    }
    Ok(())
}

/// The middle of `shape` after dropping `start_drop` leading and `end_drop` trailing extents.
pub fn sub_vector(shape: &[usize], start_drop: usize, end_drop: usize) -> &[usize] {
    let end = shape.len().saturating_sub(end_drop);
    let start = start_drop.min(end);
    &shape[start..end]
}

/// Rounds `len` up to the next multiple of `tile`.
pub fn padded(len: usize, tile: usize) -> usize {
    len.div_ceil(tile) * tile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_row_major() {
        assert_eq!(index_to_offset(&[1, 2], &[3, 4]), 6);
        assert_eq!(index_to_offset(&[2, 1, 3], &[3, 2, 4]), 2 * 8 + 4 + 3);
        assert_eq!(index_to_offset(&[0, 0], &[3, 4]), 0);
    }

    #[test]
    fn partial_index_addresses_sub_array() {
        assert_eq!(index_to_offset(&[2], &[3, 4]), 8);
        assert_eq!(index_to_offset(&[1], &[2, 3, 5]), 15);
    }

    #[test]
    fn transposed_shapes() {
        assert_eq!(transposed_shape(&[2, 3, 4], &[]).as_slice(), &[4, 3, 2]);
        assert_eq!(transposed_shape(&[2, 3, 4], &[0, 2, 1]).as_slice(), &[2, 4, 3]);
    }

    #[test]
    fn permutations_are_validated() -> Result<()> {
        validate_permutation(&[], 3)?;
        validate_permutation(&[2, 0, 1], 3)?;

        assert!(matches!(
            validate_permutation(&[0, 0, 1], 3),
            Err(ArrayError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_permutation(&[0, 3, 1], 3),
            Err(ArrayError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_permutation(&[1, 0], 3),
            Err(ArrayError::InvalidArgument(_))
        ));

        Ok(())
    }

    #[test]
    fn sub_vectors() {
        let shape = [2, 3, 4, 5];
        assert_eq!(sub_vector(&shape, 1, 0), &[3, 4, 5]);
        assert_eq!(sub_vector(&shape, 0, 1), &[2, 3, 4]);
        assert_eq!(sub_vector(&shape, 1, 1), &[3, 4]);
        assert!(sub_vector(&shape, 3, 2).is_empty());
        assert!(sub_vector(&[7], 1, 0).is_empty());
    }

    #[test]
    fn padding_rounds_up() {
        assert_eq!(padded(0, 32), 0);
        assert_eq!(padded(1, 32), 32);
        assert_eq!(padded(64, 32), 64);
        assert_eq!(padded(65, 32), 96);
    }

    #[test]
    fn element_counts_never_wrap() -> Result<()> {
        assert_eq!(checked_prod(&[2, 3, 4])?, 24);
        assert_eq!(checked_prod(&[])?, 1);
        assert!(matches!(
            checked_prod(&[usize::MAX / 2, 3]),
            Err(ArrayError::ShapeMismatch(_))
        ));

        Ok(())
    }
}
