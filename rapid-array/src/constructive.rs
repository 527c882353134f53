use super::*;
use rand::distributions::{Distribution, Uniform};
use rand::distributions::uniform::SampleUniform;

fn cast_index<T: Element>(i: usize) -> Result<T> {
    T::from(i).ok_or_else(|| ArrayError::CastError(format!("{i} does not fit the element type")))
}

/// Normalizes a requested shape: empty and zero-product shapes become a zero-dim `[1]`.
fn normalized(shape: &[usize]) -> Result<(Dims, bool)> {
    if shape.is_empty() || checked_prod(shape)? == 0 {
        Ok((smallvec![1], true))
    } else {
        Ok((Dims::from_slice(shape), false))
    }
}

impl<T: Element> Array<T> {
    /// Allocates a zero-filled array. Empty and zero-product shapes give a zero-dim array.
    ///
    /// # Panics
    ///
    /// Panics if the element count of `shape` overflows `usize`, like `vec!` does on capacity
    /// overflow. Use [`try_new`](Array::try_new) for shapes that are not known to be small.
    pub fn new(shape: &[usize]) -> Self {
        Self::try_new(shape).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Allocates a zero-filled array, or a [`ArrayError::ShapeMismatch`] when the element count
    /// of `shape` overflows `usize`.
    pub fn try_new(shape: &[usize]) -> Result<Self> {
        let (shape, zero_dim) = normalized(shape)?;
        let buffer = SharedBuffer::allocate(prod(&shape));
        Ok(Self::from_parts(buffer, shape, 0, zero_dim))
    }

    /// Takes ownership of row-major `data`.
    ///
    /// An empty shape expects exactly one element; a zero-product shape expects none and yields a
    /// zero-dim array holding zero.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let expected = if shape.is_empty() { 1 } else { checked_prod(shape)? };
        if data.len() != expected {
            return Err(ArrayError::ShapeMismatch(format!(
                "{} elements cannot fill shape {shape:?}",
                data.len()
            )));
        }
        if expected == 0 {
            return Self::try_new(shape);
        }

        let (shape, zero_dim) = normalized(shape)?;
        Ok(Self::owned(data, shape, zero_dim))
    }

    /// A zero-dim array holding `value`.
    pub fn from_scalar(value: T) -> Self {
        Self::owned(vec![value], smallvec![1], true)
    }

    /// Builds an array from nested arrays or `Vec`s, e.g. `&[[1, 2], [3, 4]]`.
    ///
    /// Every level must be rectangular; ragged input is a [`ArrayError::ShapeMismatch`].
    pub fn from_nested<N: Nested<T> + ?Sized>(data: &N) -> Result<Self> {
        let shape = data.nested_shape()?;
        let mut flat = Vec::with_capacity(prod(&shape));
        data.flatten_into(&mut flat);
        Self::from_vec(flat, &shape)
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::new(shape)
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, T::one())
    }

    /// # Panics
    ///
    /// Panics if the element count of `shape` overflows `usize`.
    pub fn full(shape: &[usize], value: T) -> Self {
        let (shape, zero_dim) = normalized(shape).unwrap_or_else(|err| panic!("{err}"));
        Self::owned(vec![value; prod(&shape)], shape, zero_dim)
    }

    pub fn zeros_like(other: &Array<T>) -> Self {
        Self::zeros(&other.shape).with_zero_dim(other.zero_dim)
    }

    pub fn ones_like(other: &Array<T>) -> Self {
        Self::ones(&other.shape).with_zero_dim(other.zero_dim)
    }

    fn with_zero_dim(mut self, zero_dim: bool) -> Self {
        self.zero_dim = zero_dim;
        self
    }

    /// `0, 1, .., end - 1`
    pub fn arange(end: T) -> Result<Self> {
        Self::arange_step(T::zero(), end, T::one())
    }

    /// Values from `start` (inclusive) to `end` (exclusive) advancing by `step`.
    pub fn arange_step(start: T, end: T, step: T) -> Result<Self> {
        let bounds = (start.to_f64(), end.to_f64(), step.to_f64());
        let (Some(from), Some(to), Some(by)) = bounds else {
            return Err(ArrayError::CastError(format!(
                "arange bounds {start}..{end} by {step} are not representable"
            )));
        };
        let count = ((to - from) / by).ceil();
        if !count.is_finite() || count < 0.0 {
            return Err(ArrayError::InvalidArgument(format!(
                "arange from {start} to {end} never terminates with step {step}"
            )));
        }

        let count = count as usize;
        let data = (0..count)
            .map(|i| Ok(start + step * cast_index::<T>(i)?))
            .collect::<Result<Vec<_>>>()?;
        Self::from_vec(data, &[count])
    }

    /// `len` evenly spaced values from `start` to `end`, both inclusive.
    pub fn linspace(start: T, end: T, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(ArrayError::InvalidArgument("linspace needs at least one value".to_string()));
        }

        let steps = cast_index::<T>(len.saturating_sub(1).max(1))?;
        let data = (0..len)
            .map(|i| {
                let i = cast_index::<T>(i)?;
                // Unsigned elements cannot hold a negative span.
                Ok(if end < start {
                    start - (start - end) * i / steps
                } else {
                    start + (end - start) * i / steps
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_vec(data, &[len])
    }

    /// Coordinate matrices of two vectors: `x` repeated over `y.len()` rows and `y` repeated over
    /// `x.len()` columns, both of shape `[y.len(), x.len()]`.
    pub fn meshgrid(x: &Array<T>, y: &Array<T>) -> Result<(Self, Self)> {
        let (xs, ys) = (x.to_vec()?, y.to_vec()?);
        if x.rank() != 1 || y.rank() != 1 {
            return Err(ArrayError::ShapeMismatch(format!(
                "meshgrid needs two vectors, got shapes {:?} and {:?}",
                x.shape, y.shape
            )));
        }
        let shape = [ys.len(), xs.len()];

        let grid_x = ys.iter().flat_map(|_| xs.iter().copied()).collect();
        let grid_y = ys.iter().flat_map(|&v| std::iter::repeat_n(v, xs.len())).collect();

        Ok((Self::from_vec(grid_x, &shape)?, Self::from_vec(grid_y, &shape)?))
    }

    /// Writes `value` into every element, visible through all views of the buffer.
    pub fn fill(&self, value: T) -> Result<()> {
        self.with_window_mut(|data| data.fill(value))
    }

    /// A new array of the same shape filled with `value`.
    pub fn filled(&self, value: T) -> Result<Self> {
        self.buffer()?;
        Ok(Self::full(&self.shape, value).with_zero_dim(self.zero_dim))
    }

    /// Fills with uniformly distributed values from `min` to `max`, both inclusive.
    pub fn fill_random(&self, min: T, max: T) -> Result<()>
    where
        T: SampleUniform,
    {
        if !T::is_finite_range(min, max) {
            return Err(ArrayError::InvalidArgument(format!(
                "invalid random range [{min}, {max}]"
            )));
        }

        let dist = Uniform::new_inclusive(min, max);
        let mut rng = rand::thread_rng();
        self.with_window_mut(|data| data.iter_mut().for_each(|v| *v = dist.sample(&mut rng)))
    }

    /// A deep copy with its own buffer.
    pub fn copy(&self) -> Result<Self> {
        let data = self.to_vec()?;
        Ok(Self::owned(data, self.shape.clone(), self.zero_dim))
    }

    /// Makes this array a view of `other`'s buffer, releasing the previous one.
    pub fn rebind(&mut self, other: &Array<T>) {
        *self = other.clone();
    }

    /// Copies `other`'s values into this array's window.
    ///
    /// An uninitialized receiver gets a private copy of `other` instead. Views sharing the
    /// receiver's buffer observe the new values.
    pub fn assign(&mut self, other: &Array<T>) -> Result<()> {
        if !self.is_initialized() {
            *self = other.copy()?;
            return Ok(());
        }
        if self.shape != other.shape {
            return Err(ArrayError::ShapeMismatch(format!(
                "cannot assign an array of shape {:?} to one of shape {:?}",
                other.shape, self.shape
            )));
        }
        self.write_from(other)
    }

    /// Copies `src`'s elements into this window. Element counts must match.
    pub(crate) fn write_from(&self, src: &Array<T>) -> Result<()> {
        if prod(&self.shape) != src.len() {
            return Err(ArrayError::ShapeMismatch(format!(
                "cannot write {:?} into {:?}",
                src.shape, self.shape
            )));
        }
        self.with_source_mut(src, |dst, values| dst.copy_from_slice(values))
    }
}

impl<T: Element> From<Vec<T>> for Array<T> {
    fn from(data: Vec<T>) -> Self {
        let len = data.len();
        if len == 0 {
            return Self::new(&[]);
        }
        Self::owned(data, smallvec![len], false)
    }
}

/// Rectangular nested data that can be flattened into an [`Array`].
pub trait Nested<T> {
    /// Extents of this level followed by the extents of its elements.
    fn nested_shape(&self) -> Result<Dims>;

    fn flatten_into(&self, out: &mut Vec<T>);
}

macro_rules! impl_nested_scalar {
    ($($ty:ty),*) => {
        $(impl Nested<$ty> for $ty {
            fn nested_shape(&self) -> Result<Dims> {
                Ok(Dims::new())
            }

            fn flatten_into(&self, out: &mut Vec<$ty>) {
                out.push(*self);
            }
        })*
    };
}

impl_nested_scalar!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

fn rectangular_shape<T, U: Nested<T>>(items: &[U]) -> Result<Dims> {
    let Some(first) = items.first() else {
        return Ok(smallvec![0]);
    };
    let inner = first.nested_shape()?;
    for item in &items[1..] {
        let other = item.nested_shape()?;
        if other != inner {
            return Err(ArrayError::ShapeMismatch(format!(
                "ragged nested data: {inner:?} next to {other:?}"
            )));
        }
    }

    let mut shape: Dims = smallvec![items.len()];
    shape.extend_from_slice(&inner);
    Ok(shape)
}

impl<T, U: Nested<T>> Nested<T> for [U] {
    fn nested_shape(&self) -> Result<Dims> {
        rectangular_shape(self)
    }

    fn flatten_into(&self, out: &mut Vec<T>) {
        self.iter().for_each(|item| item.flatten_into(out));
    }
}

impl<T, U: Nested<T>, const N: usize> Nested<T> for [U; N] {
    fn nested_shape(&self) -> Result<Dims> {
        rectangular_shape(self.as_slice())
    }

    fn flatten_into(&self, out: &mut Vec<T>) {
        self.as_slice().flatten_into(out);
    }
}

impl<T, U: Nested<T>> Nested<T> for Vec<U> {
    fn nested_shape(&self) -> Result<Dims> {
        rectangular_shape(self.as_slice())
    }

    fn flatten_into(&self, out: &mut Vec<T>) {
        self.as_slice().flatten_into(out);
    }
}
