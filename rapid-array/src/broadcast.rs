//! Classification of two operand shapes into a broadcasting mode.

use super::*;

/// How the operands of a binary operation line up.
///
/// `a` is the left operand, `b` the right one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BroadcastMode {
    /// Same element layout: equal shapes, or one shape is the other padded with leading ones.
    Elementwise,
    /// `b` holds a single element.
    ScalarRight,
    /// `a` holds a single element.
    ScalarLeft,
    /// `b` matches one row of `a`: `a[1..] == b`.
    RowWise,
    /// `a` matches one row of `b`: `a == b[1..]`.
    RowWiseReversed,
    /// Column `a` against row `b`; every pair is combined.
    Grid,
    /// Row `a` against column `b`; every pair is combined.
    GridReversed,
    /// `a` has a trailing unit axis, otherwise equal to `b`.
    ColumnWise,
    /// `b` has a trailing unit axis, otherwise equal to `a`.
    ColumnWiseReversed,
}

impl BroadcastMode {
    /// Legacy numeric code, 0 to 8 in declaration order.
    pub fn code(self) -> u8 {
        match self {
            BroadcastMode::Elementwise => 0,
            BroadcastMode::ScalarRight => 1,
            BroadcastMode::ScalarLeft => 2,
            BroadcastMode::RowWise => 3,
            BroadcastMode::RowWiseReversed => 4,
            BroadcastMode::Grid => 5,
            BroadcastMode::GridReversed => 6,
            BroadcastMode::ColumnWise => 7,
            BroadcastMode::ColumnWiseReversed => 8,
        }
    }

    /// Whether the result has the shape of `a`, so it can be written into `a` directly.
    pub fn supports_in_place(self) -> bool {
        matches!(
            self,
            BroadcastMode::Elementwise
                | BroadcastMode::ScalarRight
                | BroadcastMode::RowWise
                | BroadcastMode::ColumnWiseReversed
        )
    }

    /// Shape of `a op b` under this mode.
    pub fn result_shape(self, a: &[usize], b: &[usize]) -> Dims {
        match self {
            BroadcastMode::Elementwise
            | BroadcastMode::ScalarRight
            | BroadcastMode::RowWise
            | BroadcastMode::ColumnWiseReversed => Dims::from_slice(a),
            BroadcastMode::ScalarLeft | BroadcastMode::RowWiseReversed | BroadcastMode::ColumnWise => {
                Dims::from_slice(b)
            }
            BroadcastMode::Grid => grid_shape(a, b),
            BroadcastMode::GridReversed => grid_shape(b, a),
        }
    }
}

/// `column[..rank(row)] ++ [row[last]]`
fn grid_shape(column: &[usize], row: &[usize]) -> Dims {
    let mut shape = column.iter().take(row.len()).copied().collect::<Dims>();
    shape.extend(row.last().copied());
    shape
}

/// Finds the broadcasting mode for `a op b`, or `None` when the shapes are incompatible.
///
/// The checks run in a fixed order and the first match wins.
pub fn resolve(a: &[usize], b: &[usize]) -> Option<BroadcastMode> {
    let (prod_a, prod_b) = (prod(a), prod(b));
    let (first_a, last_a) = (a.first().copied()?, a.last().copied()?);
    let (first_b, last_b) = (b.first().copied()?, b.last().copied()?);

    let mode = if a == b
        || (a.len() < b.len() && prod_a == prod_b && a == sub_vector(b, b.len() - a.len(), 0))
        || (a.len() > b.len() && prod_a == prod_b && sub_vector(a, a.len() - b.len(), 0) == b)
    {
        BroadcastMode::Elementwise
    } else if prod_b == 1 {
        BroadcastMode::ScalarRight
    } else if prod_a == 1 {
        BroadcastMode::ScalarLeft
    } else if sub_vector(a, 1, 0) == b {
        BroadcastMode::RowWise
    } else if a == sub_vector(b, 1, 0) {
        BroadcastMode::RowWiseReversed
    } else if prod_a == prod_b && prod_a == first_a && first_a == last_b && a.len() >= b.len() {
        BroadcastMode::Grid
    } else if prod_a == prod_b && prod_b == first_b && last_a == first_b && b.len() >= a.len() {
        BroadcastMode::GridReversed
    } else if last_a == 1 && sub_vector(a, 0, 1) == sub_vector(b, 0, 1) {
        BroadcastMode::ColumnWise
    } else if last_b == 1 && sub_vector(a, 0, 1) == sub_vector(b, 0, 1) {
        BroadcastMode::ColumnWiseReversed
    } else {
        return None;
    };
    Some(mode)
}

/// Like [`resolve`], but reports incompatible shapes as [`ArrayError::ShapeMismatch`].
pub fn resolve_or_err(a: &[usize], b: &[usize]) -> Result<BroadcastMode> {
    resolve(a, b).ok_or_else(|| {
        ArrayError::ShapeMismatch(format!("cannot broadcast shapes {a:?} and {b:?}"))
    })
}
