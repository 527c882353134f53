//! Element-wise functions. Every function returns a new array of the input's shape.

use super::*;
use crate::dispatch::unary_into;
use num_traits::Float;

impl<T: Element> Array<T> {
    /// Applies `f` to every element into a new array, in parallel for large inputs.
    pub fn mapped<F>(&self, f: F) -> Result<Array<T>>
    where
        F: Fn(T) -> T + Send + Sync,
    {
        let len = prod(&self.shape);
        let exec = ExecutionMode::select(len, unary_parallel_threshold());
        let mut data = vec![T::zero(); len];
        self.with_window(|src| unary_into(exec, src, &mut data, f))?;
        Ok(Array::owned(data, self.shape.clone(), self.zero_dim))
    }
}

macro_rules! float_functions {
    ($($name:ident),*) => {
        $(
            pub fn $name<T: Element + Float>(array: &Array<T>) -> Result<Array<T>> {
                array.mapped(|x| x.$name())
            }
        )*
    };
}

float_functions!(exp, sqrt, sin, cos, tan, asin, acos, atan, sinh, cosh, tanh);

pub fn square<T: Element>(array: &Array<T>) -> Result<Array<T>> {
    array.mapped(|x| x * x)
}

pub fn abs<T: Element>(array: &Array<T>) -> Result<Array<T>> {
    array.mapped(|x| if x < T::zero() { T::zero() - x } else { x })
}

pub fn pow<T: Element + Float>(array: &Array<T>, exponent: T) -> Result<Array<T>> {
    array.mapped(move |x| x.powf(exponent))
}

/// Clamps every element from above by `limit`.
pub fn minimum<T: Element>(array: &Array<T>, limit: T) -> Result<Array<T>> {
    array.mapped(move |x| if x < limit { x } else { limit })
}

/// Clamps every element from below by `limit`.
pub fn maximum<T: Element>(array: &Array<T>, limit: T) -> Result<Array<T>> {
    array.mapped(move |x| if x > limit { x } else { limit })
}

/// One where the element is below `limit`, zero elsewhere.
pub fn less<T: Element>(array: &Array<T>, limit: T) -> Result<Array<T>> {
    array.mapped(move |x| if x < limit { T::one() } else { T::zero() })
}

/// One where the element is above `limit`, zero elsewhere.
pub fn greater<T: Element>(array: &Array<T>, limit: T) -> Result<Array<T>> {
    array.mapped(move |x| if x > limit { T::one() } else { T::zero() })
}

/// Converts every element to `R`, failing on the first value `R` cannot represent.
pub fn cast<R: Element, S: Element>(array: &Array<S>) -> Result<Array<R>> {
    let data = array.with_window(|src| {
        src.iter()
            .map(|&v| {
                R::from(v).ok_or_else(|| {
                    ArrayError::CastError(format!(
                        "{v} cannot be represented as {}",
                        std::any::type_name::<R>()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()
    })??;
    Ok(Array::owned(data, array.shape.clone(), array.zero_dim))
}

/// A `rows x cols` Gaussian kernel with standard deviation `sigma`, normalized to sum to one.
///
/// Coordinates are centred, so odd extents put the peak on the middle element.
pub fn gaussian<T: Element + Float>(rows: usize, cols: usize, sigma: T) -> Result<Array<T>> {
    if sigma <= T::zero() || !sigma.is_finite() {
        return Err(ArrayError::InvalidArgument(format!(
            "gaussian sigma must be positive and finite, got {sigma}"
        )));
    }

    let half = |n: usize| {
        T::from(n.saturating_sub(1) as f64 / 2.0)
            .ok_or_else(|| ArrayError::CastError(format!("{n} does not fit the element type")))
    };
    let (half_rows, half_cols) = (half(rows)?, half(cols)?);
    let ys = Array::linspace(-half_rows, half_rows, rows)?;
    let xs = Array::linspace(-half_cols, half_cols, cols)?;
    let (xx, yy) = Array::meshgrid(&xs, &ys)?;

    let two = T::one() + T::one();
    let distance = (&square(&xx)? + &square(&yy)?)?;
    let kernel = exp(&distance.div_scalar(-(two * sigma * sigma))?)?;
    let total = crate::reduce::sum(&kernel, None)?.scalar()?;
    kernel.div_scalar(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Array<f64>, expected: &[f64]) -> Result<bool> {
        Ok(a.to_vec()?.iter().zip(expected).all(|(x, y)| (x - y).abs() < 1e-12))
    }

    #[test]
    fn mapped_keeps_the_shape() -> Result<()> {
        let a = Array::<i32>::arange(6)?.reshaped(&[2, 3])?;
        let b = a.mapped(|x| x * 10)?;

        assert_eq!(b.shape(), &[2, 3]);
        assert_eq!(b.to_vec()?, vec![0, 10, 20, 30, 40, 50]);
        assert_eq!(b.usage_count(), 1);

        Ok(())
    }

    #[test]
    fn large_inputs_map_in_parallel() -> Result<()> {
        let len = unary_parallel_threshold() * 2 + 1;
        assert_eq!(
            ExecutionMode::select(len, unary_parallel_threshold()),
            ExecutionMode::Parallel
        );

        let a = Array::<i64>::arange(len as i64)?;
        let squares = square(&a)?;
        assert!(squares.to_vec()?.iter().enumerate().all(|(i, &v)| v == (i * i) as i64));

        Ok(())
    }

    #[test]
    fn float_functions() -> Result<()> {
        let a = Array::<f64>::from_nested(&[0.0, 1.0, 4.0])?;

        assert!(close(&exp(&a)?, &[1.0, std::f64::consts::E, 4.0f64.exp()])?);
        assert!(close(&sqrt(&a)?, &[0.0, 1.0, 2.0])?);
        assert!(close(&pow(&a, 2.0)?, &[0.0, 1.0, 16.0])?);
        assert!(close(&tanh(&a)?, &[0.0, 1.0f64.tanh(), 4.0f64.tanh()])?);
        assert!(close(&sin(&a)?, &[0.0, 1.0f64.sin(), 4.0f64.sin()])?);

        Ok(())
    }

    #[test]
    fn gaussian_kernel_is_normalized() -> Result<()> {
        let kernel = gaussian(3, 3, 1.0)?;
        assert_eq!(kernel.shape(), &[3, 3]);

        let values = kernel.to_vec()?;
        assert!((values.iter().sum::<f64>() - 1.0).abs() < 1e-12);

        let edge = (-0.5f64).exp();
        let total = (1.0 + 2.0 * edge).powi(2);
        assert!((kernel.value(&[1, 1])? - 1.0 / total).abs() < 1e-12);
        assert!((kernel.value(&[0, 1])? - edge / total).abs() < 1e-12);
        assert_eq!(kernel.value(&[0, 0])?, kernel.value(&[2, 2])?);

        let wide = gaussian(2, 4, 0.5f32)?;
        assert_eq!(wide.shape(), &[2, 4]);
        assert!(close(&gaussian(1, 1, 2.0)?, &[1.0])?);

        assert!(matches!(gaussian(3, 3, 0.0), Err(ArrayError::InvalidArgument(_))));
        assert!(matches!(gaussian(0, 3, 1.0), Err(ArrayError::InvalidArgument(_))));

        Ok(())
    }

    #[test]
    fn integer_friendly_functions() -> Result<()> {
        let a = Array::<i32>::from_nested(&[-3, 0, 2, 5])?;

        assert_eq!(abs(&a)?.to_vec()?, vec![3, 0, 2, 5]);
        assert_eq!(square(&a)?.to_vec()?, vec![9, 0, 4, 25]);
        assert_eq!(minimum(&a, 1)?.to_vec()?, vec![-3, 0, 1, 1]);
        assert_eq!(maximum(&a, 1)?.to_vec()?, vec![1, 1, 2, 5]);
        assert_eq!(less(&a, 2)?.to_vec()?, vec![1, 1, 0, 0]);
        assert_eq!(greater(&a, 0)?.to_vec()?, vec![0, 0, 1, 1]);

        Ok(())
    }

    #[test]
    fn casts() -> Result<()> {
        let a = Array::<f64>::from_nested(&[[1.9, -2.0], [3.0, 4.5]])?;
        let b = cast::<i32, f64>(&a)?;
        assert_eq!(b, Array::from_nested(&[[1, -2], [3, 4]])?);

        assert!(matches!(cast::<u8, f64>(&a), Err(ArrayError::CastError(_))));

        Ok(())
    }
}
