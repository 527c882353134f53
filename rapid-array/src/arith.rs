//! Broadcasting arithmetic.
//!
//! Element-wise and scalar modes run through the dispatcher in one pass. The row, grid and
//! column modes split the operation along the first axis and combine the sub-arrays
//! recursively, writing each partial result into a view of the output.

use super::*;
use crate::dispatch::{binary_in_place, binary_into, unary_in_place, unary_into};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Shape of `at(i)` for an array of `shape`.
fn row_shape(shape: &[usize]) -> &[usize] {
    if shape.len() == 1 { &[1] } else { sub_vector(shape, 1, 0) }
}

/// Checks that `a op= b` can be written into `a` at every level of the recursion.
fn validate_in_place(a: &[usize], b: &[usize]) -> Result<BroadcastMode> {
    let mode = resolve_or_err(a, b)?;
    if !mode.supports_in_place() {
        return Err(ArrayError::ShapeMismatch(format!(
            "cannot update an array of shape {a:?} in place with shape {b:?}"
        )));
    }
    match mode {
        BroadcastMode::RowWise => {
            validate_in_place(row_shape(a), b)?;
        }
        BroadcastMode::ColumnWiseReversed => {
            validate_in_place(row_shape(a), row_shape(b))?;
        }
        _ => {}
    }
    Ok(mode)
}

impl<T: Element> Array<T> {
    fn broadcast_binary<F>(&self, other: &Array<T>, f: F) -> Result<Array<T>>
    where
        F: Fn(T, T) -> T + Copy + Send + Sync,
    {
        self.buffer()?;
        other.buffer()?;

        let mode = resolve_or_err(&self.shape, &other.shape)?;
        let shape = mode.result_shape(&self.shape, &other.shape);
        let zero_dim = self.zero_dim && other.zero_dim;
        let len = prod(&shape);
        let exec = ExecutionMode::select(len, binary_parallel_threshold());

        let result = match mode {
            BroadcastMode::Elementwise => {
                let mut data = vec![T::zero(); len];
                self.with_windows(other, |a, b| binary_into(exec, a, b, &mut data, f))?;
                Array::owned(data, shape, zero_dim)
            }
            BroadcastMode::ScalarRight => {
                let rhs = other.scalar()?;
                let mut data = vec![T::zero(); len];
                self.with_window(|a| unary_into(exec, a, &mut data, move |x| f(x, rhs)))?;
                Array::owned(data, shape, zero_dim)
            }
            BroadcastMode::ScalarLeft => {
                let lhs = self.scalar()?;
                let mut data = vec![T::zero(); len];
                other.with_window(|b| unary_into(exec, b, &mut data, move |y| f(lhs, y)))?;
                Array::owned(data, shape, zero_dim)
            }
            BroadcastMode::RowWise | BroadcastMode::Grid => {
                Self::combine_rows(shape, zero_dim, |i| self.at(i)?.broadcast_binary(other, f))?
            }
            BroadcastMode::RowWiseReversed | BroadcastMode::GridReversed => {
                Self::combine_rows(shape, zero_dim, |i| self.broadcast_binary(&other.at(i)?, f))?
            }
            BroadcastMode::ColumnWise | BroadcastMode::ColumnWiseReversed => {
                Self::combine_rows(shape, zero_dim, |i| {
                    self.at(i)?.broadcast_binary(&other.at(i)?, f)
                })?
            }
        };
        Ok(result)
    }

    /// Allocates `shape` and fills row `i` with `row(i)` for every `i` along the first axis.
    fn combine_rows(
        shape: Dims,
        zero_dim: bool,
        row: impl Fn(usize) -> Result<Array<T>>,
    ) -> Result<Array<T>> {
        let mut result = Array::new(&shape);
        result.zero_dim = zero_dim;
        for i in 0..shape[0] {
            result.at(i)?.write_from(&row(i)?)?;
        }
        Ok(result)
    }

    fn map_scalar<F>(&self, f: F) -> Result<Array<T>>
    where
        F: Fn(T) -> T + Send + Sync,
    {
        let len = prod(&self.shape);
        let exec = ExecutionMode::select(len, binary_parallel_threshold());
        let mut data = vec![T::zero(); len];
        self.with_window(|src| unary_into(exec, src, &mut data, f))?;
        Ok(Array::owned(data, self.shape.clone(), self.zero_dim))
    }

    fn update_in_place<F>(&self, other: &Array<T>, f: F) -> Result<()>
    where
        F: Fn(T, T) -> T + Copy + Send + Sync,
    {
        self.buffer()?;
        other.buffer()?;
        validate_in_place(&self.shape, &other.shape)?;

        if self.shares_buffer_with(other) {
            let snapshot = other.copy()?;
            return self.apply_in_place(&snapshot, f);
        }
        self.apply_in_place(other, f)
    }

    /// Writes `self op other` into `self`. Shapes were validated and never alias.
    fn apply_in_place<F>(&self, other: &Array<T>, f: F) -> Result<()>
    where
        F: Fn(T, T) -> T + Copy + Send + Sync,
    {
        let exec = ExecutionMode::select(prod(&self.shape), binary_parallel_threshold());
        match resolve_or_err(&self.shape, &other.shape)? {
            BroadcastMode::Elementwise => {
                self.with_source_mut(other, |data, rhs| binary_in_place(exec, data, rhs, f))
            }
            BroadcastMode::ScalarRight => {
                let rhs = other.scalar()?;
                self.with_window_mut(|data| unary_in_place(exec, data, move |x| f(x, rhs)))
            }
            BroadcastMode::RowWise => {
                (0..self.shape[0]).try_for_each(|i| self.at(i)?.apply_in_place(other, f))
            }
            BroadcastMode::ColumnWiseReversed => (0..self.shape[0])
                .try_for_each(|i| self.at(i)?.apply_in_place(&other.at(i)?, f)),
            mode => Err(ArrayError::ShapeMismatch(format!(
                "broadcast mode {} cannot be applied in place",
                mode.code()
            ))),
        }
    }

    fn update_scalar_in_place<F>(&self, f: F) -> Result<()>
    where
        F: Fn(T) -> T + Send + Sync,
    {
        let exec = ExecutionMode::select(prod(&self.shape), binary_parallel_threshold());
        self.with_window_mut(|data| unary_in_place(exec, data, f))
    }

    /// `value - self` for every element.
    pub fn scalar_sub(&self, value: T) -> Result<Array<T>> {
        self.map_scalar(move |x| value - x)
    }

    /// `value / self` for every element.
    pub fn scalar_div(&self, value: T) -> Result<Array<T>> {
        self.map_scalar(move |x| value / x)
    }
}

macro_rules! impl_arith {
    ($trait:ident, $method:ident, $scalar:ident, $in_place:ident, $scalar_in_place:ident, $op:tt) => {
        impl<T: Element> $trait for &Array<T> {
            type Output = Result<Array<T>>;

            fn $method(self, other: &Array<T>) -> Self::Output {
                self.broadcast_binary(other, |x, y| x $op y)
            }
        }

        impl<T: Element> Array<T> {
            pub fn $scalar(&self, value: T) -> Result<Array<T>> {
                self.map_scalar(move |x| x $op value)
            }

            /// In-place update for the modes whose result has this array's shape. All shapes are
            /// validated before the first element is written.
            pub fn $in_place(&self, other: &Array<T>) -> Result<()> {
                self.update_in_place(other, |x, y| x $op y)
            }

            pub fn $scalar_in_place(&self, value: T) -> Result<()> {
                self.update_scalar_in_place(move |x| x $op value)
            }
        }
    };
}

impl_arith!(Add, add, add_scalar, add_in_place, add_scalar_in_place, +);
impl_arith!(Sub, sub, sub_scalar, sub_in_place, sub_scalar_in_place, -);
impl_arith!(Mul, mul, mul_scalar, mul_in_place, mul_scalar_in_place, *);
impl_arith!(Div, div, div_scalar, div_in_place, div_scalar_in_place, /);

impl<T: Element + Neg<Output = T>> Neg for &Array<T> {
    type Output = Result<Array<T>>;

    fn neg(self) -> Self::Output {
        self.map_scalar(|x| -x)
    }
}
