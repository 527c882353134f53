use super::*;
use crate::shape::{transposed_shape, validate_permutation};
use par_iter::ParallelSlice;

/// Destination rows copied together by one parallel worker.
const BLOCK: usize = 32;

impl<T: Element> Array<T> {
    /// Permutes the axes into a new buffer. `axes` lists the source axis of every destination
    /// axis; an empty list reverses them.
    pub fn transposed(&self, axes: &[usize]) -> Result<Array<T>> {
        validate_permutation(axes, self.rank())?;
        let identity = !axes.is_empty() && axes.iter().enumerate().all(|(i, &axis)| i == axis);
        if self.rank() == 1 || identity {
            return self.copy();
        }

        let shape = transposed_shape(&self.shape, axes);
        let src = self.to_vec()?;
        let data = if self.rank() == 2 {
            let (rows, cols) = (self.shape[0], self.shape[1]);
            let exec = ExecutionMode::select(src.len(), transpose_parallel_threshold());
            transpose_matrix(exec, &src, rows, cols)
        } else {
            let order = if axes.is_empty() {
                (0..self.rank()).rev().collect::<Dims>()
            } else {
                Dims::from_slice(axes)
            };
            permute(&src, &self.shape, &order)
        };
        Ok(Array::owned(data, shape, self.zero_dim))
    }
}

/// `rows x cols` into `cols x rows`.
fn transpose_matrix<T: Element>(exec: ExecutionMode, src: &[T], rows: usize, cols: usize) -> Vec<T> {
    let mut dst = vec![T::zero(); src.len()];
    match exec {
        ExecutionMode::Serial => {
            for (i, row) in src.chunks_exact(cols).enumerate() {
                for (j, &value) in row.iter().enumerate() {
                    dst[j * rows + i] = value;
                }
            }
        }
        ExecutionMode::Parallel => {
            dst.par_chunks_mut(rows * BLOCK)
                .enumerate()
                .with_threads(worker_threads())
                .for_each(|(block, out)| {
                    let first = block * BLOCK;
                    // Walk the source in row tiles so each tile stays in cache.
                    for i0 in (0..rows).step_by(BLOCK) {
                        for (local, out_row) in out.chunks_exact_mut(rows).enumerate() {
                            let j = first + local;
                            for i in i0..(i0 + BLOCK).min(rows) {
                                out_row[i] = src[i * cols + j];
                            }
                        }
                    }
                });
        }
    }
    dst
}

/// General axis permutation with an odometer over the destination index.
fn permute<T: Element>(src: &[T], shape: &[usize], order: &[usize]) -> Vec<T> {
    let rank = shape.len();
    let mut src_strides: Dims = smallvec![1; rank];
    for axis in (0..rank.saturating_sub(1)).rev() {
        src_strides[axis] = src_strides[axis + 1] * shape[axis + 1];
    }
    let dst_shape = order.iter().map(|&axis| shape[axis]).collect::<Dims>();
    let strides = order.iter().map(|&axis| src_strides[axis]).collect::<Dims>();

    let mut dst = Vec::with_capacity(src.len());
    let mut index: Dims = smallvec![0; rank];
    let mut offset = 0;
    for _ in 0..src.len() {
        dst.push(src[offset]);

        for axis in (0..rank).rev() {
            index[axis] += 1;
            offset += strides[axis];
            if index[axis] < dst_shape[axis] {
                break;
            }
            offset -= strides[axis] * dst_shape[axis];
            index[axis] = 0;
        }
    }
    dst
}
