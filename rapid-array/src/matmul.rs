use super::*;
use crate::config::ExecutionConfig;
use crate::shape::padded;
use par_iter::ParallelSlice;
use std::time::Instant;

/// Edge of the square tiles used by [`MatmulStrategy::Tiled`].
const TILE: usize = 32;

/// In-engine kernels for a rank-2 product, used when the backend declines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatmulStrategy {
    /// Triple loop on the calling thread.
    Naive,
    /// Output rows are computed by parallel workers.
    Parallel,
    /// Operands are padded to whole tiles and row bands of tiles run in parallel.
    Tiled,
}

impl MatmulStrategy {
    /// Picks a kernel by the amount of work, `m * k * n`.
    pub fn for_size(work: usize, config: &ExecutionConfig) -> Self {
        if work < config.matmul_parallel_threshold {
            MatmulStrategy::Naive
        } else if work < config.matmul_tiled_threshold {
            MatmulStrategy::Parallel
        } else {
            MatmulStrategy::Tiled
        }
    }
}

impl<T: Element> Array<T> {
    /// Dot product.
    ///
    /// - `a[1..] == b.shape`: every row of `a` is dotted with `b`.
    /// - `a.shape == b[1..]`: every row of `b` is dotted with `a`.
    /// - rank 1: inner product as a zero-dim array.
    /// - rank 2: matrix product.
    /// - higher ranks: matrix products over the leading index.
    pub fn dot(&self, other: &Array<T>) -> Result<Array<T>> {
        self.buffer()?;
        other.buffer()?;

        if sub_vector(&self.shape, 1, 0) == other.shape.as_slice() {
            let mut shape: Dims = smallvec![self.shape[0]];
            if other.rank() > 1 {
                shape.extend_from_slice(&other.shape);
            }
            return Self::stack_rows(shape, |i| self.at(i)?.dot(other));
        }

        if self.shape.as_slice() == sub_vector(&other.shape, 1, 0) {
            let mut shape: Dims = smallvec![other.shape[0]];
            if self.rank() > 1 {
                shape.extend_from_slice(&self.shape);
            }
            return Self::stack_rows(shape, |i| other.at(i)?.dot(self));
        }

        if self.rank() != other.rank() {
            return Err(ArrayError::ShapeMismatch(format!(
                "cannot dot shapes {:?} and {:?}",
                self.shape, other.shape
            )));
        }

        match self.rank() {
            1 => self.inner(other),
            2 => self.matmul(other),
            rank => {
                if self.shape[0] != other.shape[0] {
                    return Err(ArrayError::ShapeMismatch(format!(
                        "leading extents differ: {:?} and {:?}",
                        self.shape, other.shape
                    )));
                }
                let mut shape = self.shape.clone();
                shape[rank - 1] = other.shape[rank - 1];
                Self::stack_rows(shape, |i| self.at(i)?.dot(&other.at(i)?))
            }
        }
    }

    fn stack_rows(shape: Dims, row: impl Fn(usize) -> Result<Array<T>>) -> Result<Array<T>> {
        let result = Array::new(&shape);
        for i in 0..shape[0] {
            result.at(i)?.write_from(&row(i)?)?;
        }
        Ok(result)
    }

    fn inner(&self, other: &Array<T>) -> Result<Array<T>> {
        if self.shape[0] != other.shape[0] {
            return Err(ArrayError::ShapeMismatch(format!(
                "vector lengths differ: {} and {}",
                self.shape[0], other.shape[0]
            )));
        }
        let value = self.with_windows(other, |a, b| {
            T::backend_dot(a, b).unwrap_or_else(|| dot_slices(a, b))
        })?;
        Ok(Array::from_scalar(value))
    }

    fn matmul(&self, other: &Array<T>) -> Result<Array<T>> {
        let (m, k, n) = matmul_dims(self, other)?;
        let mut out = vec![T::zero(); m * n];
        let handled = self.with_windows(other, |a, b| T::backend_gemm(m, k, n, a, b, &mut out))?;
        if handled {
            return Ok(Array::owned(out, smallvec![m, n], false));
        }

        let strategy = MatmulStrategy::for_size(m * k * n, &ExecutionConfig::current());
        self.matmul_with(strategy, other)
    }

    /// Rank-2 product with a fixed in-engine kernel, bypassing the backend.
    pub fn matmul_with(&self, strategy: MatmulStrategy, other: &Array<T>) -> Result<Array<T>> {
        let (m, k, n) = matmul_dims(self, other)?;
        let started = log::log_enabled!(log::Level::Trace).then(Instant::now);

        let out = self.with_windows(other, |a, b| match strategy {
            MatmulStrategy::Naive => matmul_naive(a, b, m, k, n),
            MatmulStrategy::Parallel => matmul_parallel(a, b, m, k, n),
            MatmulStrategy::Tiled => matmul_tiled(a, b, m, k, n),
        })?;

        if let Some(started) = started {
            log::trace!("[perf] matmul {strategy:?} {m}x{k}x{n}: {:?}", started.elapsed());
        }
        Ok(Array::owned(out, smallvec![m, n], false))
    }
}

fn matmul_dims<T>(a: &Array<T>, b: &Array<T>) -> Result<(usize, usize, usize)> {
    if a.rank() != 2 || b.rank() != 2 || a.shape[1] != b.shape[0] {
        return Err(ArrayError::ShapeMismatch(format!(
            "cannot multiply matrices of shapes {:?} and {:?}",
            a.shape, b.shape
        )));
    }
    Ok((a.shape[0], a.shape[1], b.shape[1]))
}

fn dot_slices<T: Element>(a: &[T], b: &[T]) -> T {
    a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

fn matmul_naive<T: Element>(a: &[T], b: &[T], m: usize, k: usize, n: usize) -> Vec<T> {
    let mut out = vec![T::zero(); m * n];
    for i in 0..m {
        for j in 0..n {
            let mut acc = T::zero();
            for l in 0..k {
                acc = acc + a[i * k + l] * b[l * n + j];
            }
            out[i * n + j] = acc;
        }
    }
    out
}

/// `out_row += a_row * b` in i-k-j order.
fn accumulate_row<T: Element>(a_row: &[T], b: &[T], n: usize, out_row: &mut [T]) {
    for (l, &scale) in a_row.iter().enumerate() {
        let b_row = &b[l * n..(l + 1) * n];
        for (o, &v) in out_row.iter_mut().zip(b_row) {
            *o = *o + scale * v;
        }
    }
}

fn matmul_parallel<T: Element>(a: &[T], b: &[T], m: usize, k: usize, n: usize) -> Vec<T> {
    let mut out = vec![T::zero(); m * n];
    out.par_chunks_mut(n)
        .enumerate()
        .with_threads(worker_threads())
        .for_each(|(i, out_row)| accumulate_row(&a[i * k..(i + 1) * k], b, n, out_row));
    out
}

/// Copies an `rows x cols` matrix into the top-left corner of a zeroed `prows x pcols` one.
fn pad<T: Element>(src: &[T], rows: usize, cols: usize, prows: usize, pcols: usize) -> Vec<T> {
    let mut dst = vec![T::zero(); prows * pcols];
    for (src_row, dst_row) in src.chunks_exact(cols).zip(dst.chunks_exact_mut(pcols)).take(rows) {
        dst_row[..cols].copy_from_slice(src_row);
    }
    dst
}

fn matmul_tiled<T: Element>(a: &[T], b: &[T], m: usize, k: usize, n: usize) -> Vec<T> {
    let (pm, pk, pn) = (padded(m, TILE), padded(k, TILE), padded(n, TILE));
    let a = pad(a, m, k, pm, pk);
    let b = pad(b, k, n, pk, pn);

    let mut out = vec![T::zero(); pm * pn];
    out.par_chunks_mut(TILE * pn)
        .enumerate()
        .with_threads(worker_threads())
        .for_each(|(band, out_band)| {
            let i0 = band * TILE;
            for l0 in (0..pk).step_by(TILE) {
                for j0 in (0..pn).step_by(TILE) {
                    for (di, out_row) in out_band.chunks_exact_mut(pn).enumerate() {
                        let a_row = &a[(i0 + di) * pk..(i0 + di + 1) * pk];
                        let out_tile = &mut out_row[j0..j0 + TILE];
                        for l in l0..l0 + TILE {
                            let scale = a_row[l];
                            let b_tile = &b[l * pn + j0..l * pn + j0 + TILE];
                            for (o, &v) in out_tile.iter_mut().zip(b_tile) {
                                *o = *o + scale * v;
                            }
                        }
                    }
                }
            }
        });

    out.chunks_exact(pn)
        .take(m)
        .flat_map(|row| row[..n].iter().copied())
        .collect()
}
