//! Human-readable descriptions of arrays.

use num_complex::Complex32;

use crate::shape::{format_shape, length, unravel};
use crate::store::{ArrayId, ArrayStore};
use crate::Result;

fn format_value(v: Complex32) -> String {
    format!("{:.3e}{:+.3e}i", v.re, v.im)
}

impl ArrayStore {
    /// One-line summary such as `NDArray<Complex Float>(4 × 5 × 3)`.
    pub fn describe(&self, id: ArrayId) -> Result<String> {
        Ok(format!(
            "NDArray<Complex Float>({})",
            format_shape(self.shape(id)?)
        ))
    }

    /// Summary line followed by the values.
    ///
    /// 1-D arrays print one value per line. Higher-dimensional arrays print one
    /// matrix over the last two axes per combination of the leading indices,
    /// each headed by `[i, j, :, :] =`.
    pub fn content_to_string(&self, id: ArrayId) -> Result<String> {
        let shape = self.shape(id)?;
        let values = self.values(id)?;
        let mut out = self.describe(id)?;
        out.push('\n');

        if shape.len() == 1 {
            for v in values {
                out.push_str(&format_value(v));
                out.push('\n');
            }
            return Ok(out);
        }

        let (leading, matrix) = shape.split_at(shape.len() - 2);
        let (rows, cols) = (matrix[0], matrix[1]);
        let block = rows * cols;
        for b in 0..length(leading) {
            let mut header: Vec<String> = unravel(b, leading)
                .iter()
                .map(|i| i.to_string())
                .collect();
            header.extend([":".to_string(), ":".to_string()]);
            out.push_str(&format!("[{}] =\n", header.join(", ")));
            for r in 0..rows {
                let row: Vec<String> = (0..cols)
                    .map(|c| format_value(values[b * block + r * cols + c]))
                    .collect();
                out.push_str(&row.join("\t"));
                out.push('\n');
            }
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let mut store = ArrayStore::new();
        let a = store.zeros(&[4, 5, 3]).unwrap();
        assert_eq!(store.describe(a).unwrap(), "NDArray<Complex Float>(4 × 5 × 3)");
    }

    #[test]
    fn test_content_1d() {
        let mut store = ArrayStore::new();
        let a = store
            .from_values(&[2], vec![Complex32::new(1.0, -2.0), Complex32::new(0.0, 0.5)])
            .unwrap();
        assert_eq!(
            store.content_to_string(a).unwrap(),
            "NDArray<Complex Float>(2)\n1.000e0-2.000e0i\n0.000e0+5.000e-1i\n"
        );
    }

    #[test]
    fn test_content_3d_headers() {
        let mut store = ArrayStore::new();
        let a = store.zeros(&[2, 2, 3]).unwrap();
        let text = store.content_to_string(a).unwrap();
        assert!(text.starts_with("NDArray<Complex Float>(2 × 2 × 3)\n[0, :, :] =\n"));
        assert!(text.contains("[1, :, :] =\n"));
        assert_eq!(text.matches("0.000e0+0.000e0i").count(), 12);
    }
}
