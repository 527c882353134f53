//! Element-wise kernels with a serial and a parallel execution path.
//!
//! The serial path is unrolled by four. The parallel path splits the output into disjoint chunks,
//! pairs each with the matching input chunks and runs the serial kernel on every pair inside a
//! scoped fork-join region.

use super::*;
use par_iter::ParallelSlice;
use std::str::FromStr;

/// Smallest chunk a parallel worker is handed.
const MIN_PARALLEL_CHUNK: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    Serial,
    Parallel,
}

impl ExecutionMode {
    /// Parallel when `len` exceeds `threshold`, unless a mode is forced by the current
    /// [`ExecutionConfig`].
    pub fn select(len: usize, threshold: usize) -> Self {
        Self::select_with(len, threshold, forced_mode())
    }

    /// Parallel when `len` exceeds `threshold`; `forced` wins over the threshold when set.
    pub fn select_with(len: usize, threshold: usize, forced: Option<ExecutionMode>) -> Self {
        forced.unwrap_or(if len > threshold {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Serial
        })
    }

    pub fn code(self) -> u8 {
        match self {
            ExecutionMode::Serial => 1,
            ExecutionMode::Parallel => 2,
        }
    }
}

impl TryFrom<u8> for ExecutionMode {
    type Error = ArrayError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(ExecutionMode::Serial),
            2 => Ok(ExecutionMode::Parallel),
            other => Err(ArrayError::ConfigurationError(format!(
                "invalid execution mode {other}, expected 1 (serial) or 2 (parallel)"
            ))),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = ArrayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "serial" => Ok(ExecutionMode::Serial),
            "parallel" => Ok(ExecutionMode::Parallel),
            other => Err(ArrayError::ConfigurationError(format!(
                "invalid execution mode '{other}', expected 'serial' or 'parallel'"
            ))),
        }
    }
}

/// Writes `f(src[i])` into `dst[i]`.
pub fn unary_into<T, F>(mode: ExecutionMode, src: &[T], dst: &mut [T], f: F)
where
    T: Copy + Send + Sync,
    F: Fn(T) -> T + Send + Sync,
{
    debug_assert_eq!(src.len(), dst.len());
    match mode {
        ExecutionMode::Serial => serial_unary(src, dst, &f),
        ExecutionMode::Parallel => {
            let (threads, chunk) = partition(dst.len());
            dst.par_chunks_mut(chunk)
                .zip(src.par_chunks(chunk))
                .with_threads(threads)
                .for_each(|(out, input)| serial_unary(input, out, &f));
        }
    }
}

/// Replaces every `data[i]` with `f(data[i])`.
pub fn unary_in_place<T, F>(mode: ExecutionMode, data: &mut [T], f: F)
where
    T: Copy + Send + Sync,
    F: Fn(T) -> T + Send + Sync,
{
    match mode {
        ExecutionMode::Serial => serial_unary_in_place(data, &f),
        ExecutionMode::Parallel => {
            let (threads, chunk) = partition(data.len());
            data.par_chunks_mut(chunk)
                .with_threads(threads)
                .for_each(|out| serial_unary_in_place(out, &f));
        }
    }
}

/// Writes `f(a[i], b[i])` into `dst[i]`.
pub fn binary_into<T, F>(mode: ExecutionMode, a: &[T], b: &[T], dst: &mut [T], f: F)
where
    T: Copy + Send + Sync,
    F: Fn(T, T) -> T + Send + Sync,
{
    debug_assert!(a.len() == dst.len() && b.len() == dst.len());
    match mode {
        ExecutionMode::Serial => serial_binary(a, b, dst, &f),
        ExecutionMode::Parallel => {
            let (threads, chunk) = partition(dst.len());
            dst.par_chunks_mut(chunk)
                .zip(a.par_chunks(chunk))
                .zip(b.par_chunks(chunk))
                .with_threads(threads)
                .for_each(|((out, lhs), rhs)| serial_binary(lhs, rhs, out, &f));
        }
    }
}

/// Replaces every `data[i]` with `f(data[i], b[i])`.
pub fn binary_in_place<T, F>(mode: ExecutionMode, data: &mut [T], b: &[T], f: F)
where
    T: Copy + Send + Sync,
    F: Fn(T, T) -> T + Send + Sync,
{
    debug_assert_eq!(data.len(), b.len());
    match mode {
        ExecutionMode::Serial => serial_binary_in_place(data, b, &f),
        ExecutionMode::Parallel => {
            let (threads, chunk) = partition(data.len());
            data.par_chunks_mut(chunk)
                .zip(b.par_chunks(chunk))
                .with_threads(threads)
                .for_each(|(out, rhs)| serial_binary_in_place(out, rhs, &f));
        }
    }
}

fn partition(len: usize) -> (usize, usize) {
    let threads = worker_threads();
    (threads, len.div_ceil(threads * 4).max(MIN_PARALLEL_CHUNK))
}

fn serial_unary<T: Copy, F: Fn(T) -> T>(src: &[T], dst: &mut [T], f: &F) {
    let mut out = dst.chunks_exact_mut(4);
    let mut input = src.chunks_exact(4);
    for (o, i) in (&mut out).zip(&mut input) {
        o[0] = f(i[0]);
        o[1] = f(i[1]);
        o[2] = f(i[2]);
        o[3] = f(i[3]);
    }
    for (o, &i) in out.into_remainder().iter_mut().zip(input.remainder()) {
        *o = f(i);
    }
}

fn serial_unary_in_place<T: Copy, F: Fn(T) -> T>(data: &mut [T], f: &F) {
    let mut out = data.chunks_exact_mut(4);
    for o in &mut out {
        o[0] = f(o[0]);
        o[1] = f(o[1]);
        o[2] = f(o[2]);
        o[3] = f(o[3]);
    }
    for o in out.into_remainder() {
        *o = f(*o);
    }
}

fn serial_binary<T: Copy, F: Fn(T, T) -> T>(a: &[T], b: &[T], dst: &mut [T], f: &F) {
    let mut out = dst.chunks_exact_mut(4);
    let mut lhs = a.chunks_exact(4);
    let mut rhs = b.chunks_exact(4);
    for ((o, x), y) in (&mut out).zip(&mut lhs).zip(&mut rhs) {
        o[0] = f(x[0], y[0]);
        o[1] = f(x[1], y[1]);
        o[2] = f(x[2], y[2]);
        o[3] = f(x[3], y[3]);
    }
    let tail = lhs.remainder().iter().zip(rhs.remainder());
    for (o, (&x, &y)) in out.into_remainder().iter_mut().zip(tail) {
        *o = f(x, y);
    }
}

fn serial_binary_in_place<T: Copy, F: Fn(T, T) -> T>(data: &mut [T], b: &[T], f: &F) {
    let mut out = data.chunks_exact_mut(4);
    let mut rhs = b.chunks_exact(4);
    for (o, y) in (&mut out).zip(&mut rhs) {
        o[0] = f(o[0], y[0]);
        o[1] = f(o[1], y[1]);
        o[2] = f(o[2], y[2]);
        o[3] = f(o[3], y[3]);
    }
    for (o, &y) in out.into_remainder().iter_mut().zip(rhs.remainder()) {
        *o = f(*o, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [ExecutionMode; 2] = [ExecutionMode::Serial, ExecutionMode::Parallel];

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(ExecutionMode::select_with(100, 100, None), ExecutionMode::Serial);
        assert_eq!(ExecutionMode::select_with(101, 100, None), ExecutionMode::Parallel);
        assert_eq!(ExecutionMode::select_with(0, 0, None), ExecutionMode::Serial);
    }

    #[test]
    fn forced_mode_overrides_the_threshold() {
        let serial = ExecutionConfig {
            forced_mode: Some(ExecutionMode::Serial),
            ..ExecutionConfig::default()
        };
        let len = serial.binary_parallel_threshold + 1;
        assert_eq!(
            ExecutionMode::select_with(len, serial.binary_parallel_threshold, serial.forced_mode),
            ExecutionMode::Serial
        );

        let parallel = ExecutionConfig {
            forced_mode: Some(ExecutionMode::Parallel),
            ..ExecutionConfig::default()
        };
        assert_eq!(
            ExecutionMode::select_with(1, parallel.unary_parallel_threshold, parallel.forced_mode),
            ExecutionMode::Parallel
        );

        let automatic = ExecutionConfig::default();
        assert_eq!(
            ExecutionMode::select_with(len, automatic.binary_parallel_threshold, automatic.forced_mode),
            ExecutionMode::Parallel
        );
    }

    #[test]
    fn kernels_agree_across_modes() {
        // Odd length exercises both the unrolled body and the remainder.
        let a = (0..10_007).map(|v| v as i64).collect::<Vec<_>>();
        let b = (0..10_007).map(|v| (v % 13) as i64).collect::<Vec<_>>();

        for mode in MODES {
            let mut dst = vec![0; a.len()];
            binary_into(mode, &a, &b, &mut dst, |x, y| x * 2 + y);
            assert!(dst.iter().enumerate().all(|(i, &v)| v == a[i] * 2 + b[i]), "{mode:?}");

            let mut dst = vec![0; a.len()];
            unary_into(mode, &a, &mut dst, |x| x - 1);
            assert!(dst.iter().enumerate().all(|(i, &v)| v == a[i] - 1), "{mode:?}");

            let mut data = a.clone();
            unary_in_place(mode, &mut data, |x| x * x);
            assert!(data.iter().enumerate().all(|(i, &v)| v == a[i] * a[i]), "{mode:?}");

            let mut data = a.clone();
            binary_in_place(mode, &mut data, &b, |x, y| x - y);
            assert!(data.iter().enumerate().all(|(i, &v)| v == a[i] - b[i]), "{mode:?}");
        }
    }

    #[test]
    fn short_inputs_only_hit_the_remainder() {
        for mode in MODES {
            let mut dst = [0.0f32; 3];
            binary_into(mode, &[1.0, 2.0, 3.0], &[0.5, 0.5, 0.5], &mut dst, |x, y| x + y);
            assert_eq!(dst, [1.5, 2.5, 3.5]);

            let mut empty: [f32; 0] = [];
            unary_in_place(mode, &mut empty, |x| x + 1.0);
        }
    }

    #[test]
    fn mode_codes() -> Result<()> {
        assert_eq!(ExecutionMode::try_from(1)?, ExecutionMode::Serial);
        assert_eq!(ExecutionMode::try_from(2)?, ExecutionMode::Parallel);
        assert_eq!(ExecutionMode::Parallel.code(), 2);
        assert!(matches!(
            ExecutionMode::try_from(3),
            Err(ArrayError::ConfigurationError(_))
        ));
        assert!(matches!(
            ExecutionMode::try_from(0),
            Err(ArrayError::ConfigurationError(_))
        ));

        assert_eq!("Parallel".parse::<ExecutionMode>()?, ExecutionMode::Parallel);
        assert!(matches!(
            "fast".parse::<ExecutionMode>(),
            Err(ArrayError::ConfigurationError(_))
        ));

        Ok(())
    }
}
