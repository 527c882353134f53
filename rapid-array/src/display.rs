use super::*;
use std::fmt::{self, Write};

impl<T: Element> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.to_vec().ok() == other.to_vec().ok()
    }
}

impl<T: Element> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("shape", &self.shape)
            .field("zero_dim", &self.zero_dim)
            .field("elements", &self.to_vec().unwrap_or_default())
            .finish()
    }
}

/// Nested brackets with right-aligned columns. A zero-dim array prints its bare value.
///
/// The formatter's precision applies to every element, e.g. `format!("{a:.2}")`.
impl<T: Element> fmt::Display for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(values) = self.to_vec() else {
            return f.write_str("[uninitialized]");
        };
        let precision = f.precision();
        let cells = values
            .iter()
            .map(|v| match precision {
                Some(p) => format!("{v:.p$}"),
                None => v.to_string(),
            })
            .collect::<Vec<_>>();

        if self.zero_dim {
            return f.write_str(&cells[0]);
        }
        let width = cells.iter().map(String::len).max().unwrap_or(0);
        let mut out = String::new();
        write_level(&mut out, &cells, &self.shape, width, 0)?;
        f.write_str(&out)
    }
}

fn write_level(
    out: &mut String,
    cells: &[String],
    shape: &[usize],
    width: usize,
    depth: usize,
) -> fmt::Result {
    out.push('[');
    if shape.len() == 1 {
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            write!(out, "{cell:>width$}")?;
        }
    } else {
        let inner = sub_vector(shape, 1, 0);
        for (i, block) in cells.chunks(prod(inner)).enumerate() {
            if i > 0 {
                // One blank line per nesting level below the rows.
                out.push_str(&"\n".repeat(shape.len() - 1));
                out.push_str(&" ".repeat(depth + 1));
            }
            write_level(out, block, inner, width, depth + 1)?;
        }
    }
    out.push(']');
    Ok(())
}
