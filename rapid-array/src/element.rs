use super::*;
use std::fmt;

/// Numeric types an [`Array`] can hold.
///
/// The two backend hooks let `f32` and `f64` route contractions to the configured
/// [`LinearAlgebraBackend`]; every other type keeps the in-engine kernels.
pub trait Element:
    Copy + Send + Sync + Default + PartialOrd + fmt::Debug + fmt::Display + Num + NumCast + 'static
{
    /// Inner product of two equally long slices, or `None` when the backend declines.
    fn backend_dot(a: &[Self], b: &[Self]) -> Option<Self> {
        let _ = (a, b);
        None
    }

    /// Row-major `c = a * b` for an `m x k` by `k x n` product. Returns `false` when declined.
    fn backend_gemm(m: usize, k: usize, n: usize, a: &[Self], b: &[Self], c: &mut [Self]) -> bool {
        let _ = (m, k, n, a, b, c);
        false
    }

    /// Whether `[low, high]` is non-empty and its width is representable.
    fn is_finite_range(low: Self, high: Self) -> bool {
        low <= high
    }
}

macro_rules! impl_element {
    ($($ty:ty),*) => {
        $(impl Element for $ty {})*
    };
}

impl_element!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Element for f32 {
    fn backend_dot(a: &[f32], b: &[f32]) -> Option<f32> {
        current_backend().sdot(a, b)
    }

    fn backend_gemm(m: usize, k: usize, n: usize, a: &[f32], b: &[f32], c: &mut [f32]) -> bool {
        current_backend().sgemm(m, k, n, a, b, c)
    }

    fn is_finite_range(low: f32, high: f32) -> bool {
        low <= high && (high - low).is_finite()
    }
}

impl Element for f64 {
    fn backend_dot(a: &[f64], b: &[f64]) -> Option<f64> {
        current_backend().ddot(a, b)
    }

    fn backend_gemm(m: usize, k: usize, n: usize, a: &[f64], b: &[f64], c: &mut [f64]) -> bool {
        current_backend().dgemm(m, k, n, a, b, c)
    }

    fn is_finite_range(low: f64, high: f64) -> bool {
        low <= high && (high - low).is_finite()
    }
}
