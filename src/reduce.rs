//! Reductions: sums and p-norms.

use num_complex::Complex32;

use crate::dense::DenseArray;
use crate::shape::{self, Coords};
use crate::store::{ArrayId, ArrayStore};
use crate::threading::map_reduce;
use crate::{BartError, Result};

impl ArrayStore {
    /// Sum of every element.
    pub fn sum(&self, id: ArrayId) -> Result<Complex32> {
        let values = self.values(id)?;
        Ok(map_reduce(
            values.len(),
            |r| values[r].iter().sum::<Complex32>(),
            |a, b| a + b,
        ))
    }

    /// New array summed over `axes`, which are removed from the shape.
    ///
    /// Summing over every axis yields shape `[1]`. Labels of the remaining axes
    /// are kept.
    pub fn sum_axes(&mut self, id: ArrayId, axes: &[usize]) -> Result<ArrayId> {
        let shape = self.shape(id)?.to_vec();
        let rank = shape.len();
        if let Some(&axis) = axes.iter().find(|&&axis| axis >= rank) {
            return Err(BartError::InvalidAxis { axis, rank });
        }
        let kept: Vec<usize> = (0..rank).filter(|axis| !axes.contains(axis)).collect();
        let out_shape: Vec<usize> = if kept.is_empty() {
            vec![1]
        } else {
            kept.iter().map(|&axis| shape[axis]).collect()
        };

        let values = self.values(id)?;
        let out_strides = shape::row_major_strides(&out_shape);
        let mut out = vec![Complex32::new(0.0, 0.0); shape::length(&out_shape)];
        let mut coords: Coords = Coords::from_elem(0, rank);
        for v in values {
            let target: usize = kept
                .iter()
                .zip(&out_strides)
                .map(|(&axis, &stride)| coords[axis] * stride)
                .sum();
            out[target] += v;
            shape::increment(&mut coords, &shape);
        }

        let mut array = DenseArray::from_vec(&out_shape, out)?;
        if !kept.is_empty() {
            if let Some(labels) = self.labels(id)? {
                array.set_labels_unchecked(Some(kept.iter().map(|&axis| labels[axis]).collect()));
            }
        }
        Ok(self.insert(array))
    }

    /// The p-norm of all elements.
    ///
    /// `p = 0` counts the non-zero elements and `p = ∞` is the largest
    /// magnitude. Negative and NaN orders are rejected.
    pub fn norm(&self, id: ArrayId, p: f64) -> Result<f64> {
        if p.is_nan() || p < 0.0 {
            return Err(BartError::InvalidNorm(p));
        }
        let values = self.values(id)?;
        let len = values.len();
        let values = values.as_slice();
        let magnitudes = move |r: std::ops::Range<usize>| values[r].iter().map(|v| v.norm() as f64);

        let norm = if p == 0.0 {
            map_reduce(
                len,
                |r| magnitudes(r).filter(|&m| m != 0.0).count() as f64,
                |a, b| a + b,
            )
        } else if p.is_infinite() {
            map_reduce(len, |r| magnitudes(r).fold(0.0, f64::max), f64::max)
        } else if p == 1.0 {
            map_reduce(len, |r| magnitudes(r).sum::<f64>(), |a, b| a + b)
        } else if p == 2.0 {
            map_reduce(len, |r| magnitudes(r).map(|m| m * m).sum::<f64>(), |a, b| a + b).sqrt()
        } else {
            map_reduce(len, |r| magnitudes(r).map(|m| m.powf(p)).sum::<f64>(), |a, b| a + b)
                .powf(1.0 / p)
        };
        Ok(norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dims::BartDim;
    use approx::assert_relative_eq;

    fn c(re: f32, im: f32) -> Complex32 {
        Complex32::new(re, im)
    }

    #[test]
    fn test_sum_all() {
        let mut store = ArrayStore::new();
        let values = (0..60).map(|i| c(i as f32, 1.0)).collect();
        let a = store.from_values(&[4, 5, 3], values).unwrap();
        let s = store.sum(a).unwrap();
        assert_relative_eq!(s.re, 1770.0);
        assert_relative_eq!(s.im, 60.0);
    }

    #[test]
    fn test_sum_through_slice() {
        let mut store = ArrayStore::new();
        let values = (0..6).map(|i| c(i as f32, 0.0)).collect();
        let a = store.from_values(&[2, 3], values).unwrap();
        let row = store.slice_str(a, &["1", ":"]).unwrap();
        assert_eq!(store.sum(row).unwrap(), c(12.0, 0.0));
    }

    #[test]
    fn test_sum_axes() {
        let mut store = ArrayStore::new();
        let values = (0..6).map(|i| c(i as f32, 0.0)).collect();
        let a = store.from_values(&[2, 3], values).unwrap();
        store.set_labels(a, &[BartDim::Read, BartDim::Coil]).unwrap();

        let cols = store.sum_axes(a, &[0]).unwrap();
        assert_eq!(store.shape(cols).unwrap(), &[3]);
        assert_eq!(
            store.values(cols).unwrap(),
            vec![c(3.0, 0.0), c(5.0, 0.0), c(7.0, 0.0)]
        );
        assert_eq!(store.labels(cols).unwrap(), Some(vec![BartDim::Coil]));

        let rows = store.sum_axes(a, &[1]).unwrap();
        assert_eq!(
            store.values(rows).unwrap(),
            vec![c(3.0, 0.0), c(12.0, 0.0)]
        );

        let all = store.sum_axes(a, &[0, 1]).unwrap();
        assert_eq!(store.shape(all).unwrap(), &[1]);
        assert_eq!(store.get(all, &[0]).unwrap(), c(15.0, 0.0));
        assert!(!store.labels_specified(all).unwrap());

        assert!(matches!(
            store.sum_axes(a, &[2]),
            Err(BartError::InvalidAxis { axis: 2, rank: 2 })
        ));
    }

    #[test]
    fn test_norms() {
        let mut store = ArrayStore::new();
        let a = store
            .from_values(&[4], vec![c(3.0, 4.0), c(0.0, 0.0), c(-1.0, 0.0), c(0.0, 2.0)])
            .unwrap();
        assert_relative_eq!(store.norm(a, 0.0).unwrap(), 3.0);
        assert_relative_eq!(store.norm(a, 1.0).unwrap(), 8.0);
        assert_relative_eq!(store.norm(a, 2.0).unwrap(), 30f64.sqrt(), epsilon = 1e-6);
        assert_relative_eq!(store.norm(a, f64::INFINITY).unwrap(), 5.0);
        assert_relative_eq!(
            store.norm(a, 3.0).unwrap(),
            (125.0f64 + 1.0 + 8.0).powf(1.0 / 3.0),
            epsilon = 1e-6
        );
        assert!(matches!(
            store.norm(a, -1.0),
            Err(BartError::InvalidNorm(_))
        ));
        assert!(store.norm(a, f64::NAN).is_err());
    }

    #[test]
    fn test_parallel_sum_large() {
        let mut store = ArrayStore::new();
        let len = 3 * crate::MIN_PARALLEL_LENGTH + 11;
        let a = store.zeros(&[len]).unwrap();
        store.fill(a, c(1.0, -0.5)).unwrap();
        let s = store.sum(a).unwrap();
        assert_relative_eq!(s.re, len as f32);
        assert_relative_eq!(s.im, -0.5 * len as f32);
        assert_relative_eq!(store.norm(a, 0.0).unwrap(), len as f64);
    }
}
