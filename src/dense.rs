//! Owned, contiguous complex arrays.

use num_complex::Complex32;

use crate::dims::{validate_labels, BartDim};
use crate::shape::{self, length, validate_shape};
use crate::{BartError, Result};

/// Dense row-major array of single-precision complex values.
///
/// Equality compares shape, labels and values. Arrays that differ only in their
/// dimension labels are not equal. `Hash` is intentionally not implemented.
#[derive(Debug, Clone)]
pub struct DenseArray {
    shape: Vec<usize>,
    data: Vec<Complex32>,
    labels: Option<Vec<BartDim>>,
}

impl DenseArray {
    /// Create a zero-filled array.
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        validate_shape(shape)?;
        Ok(Self {
            shape: shape.to_vec(),
            data: vec![Complex32::new(0.0, 0.0); length(shape)],
            labels: None,
        })
    }

    /// Create an array from row-major values.
    pub fn from_vec(shape: &[usize], data: Vec<Complex32>) -> Result<Self> {
        validate_shape(shape)?;
        if data.len() != length(shape) {
            return Err(BartError::ShapeMismatch(shape.to_vec(), vec![data.len()]));
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
            labels: None,
        })
    }

    /// Create an array from separate real and imaginary parts.
    pub fn from_real_imag(shape: &[usize], re: &[f32], im: &[f32]) -> Result<Self> {
        if re.len() != im.len() {
            return Err(BartError::ShapeMismatch(vec![re.len()], vec![im.len()]));
        }
        let data = re
            .iter()
            .zip(im)
            .map(|(&r, &i)| Complex32::new(r, i))
            .collect();
        Self::from_vec(shape, data)
    }

    /// Attach dimension labels, consuming the array.
    pub fn with_labels(mut self, labels: &[BartDim]) -> Result<Self> {
        self.set_labels(labels)?;
        Ok(self)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[Complex32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<Complex32> {
        self.data
    }

    /// Dimension labels, if assigned.
    pub fn labels(&self) -> Option<&[BartDim]> {
        self.labels.as_deref()
    }

    /// Assign one distinct label per dimension.
    pub fn set_labels(&mut self, labels: &[BartDim]) -> Result<()> {
        validate_labels(labels, self.ndim())?;
        self.labels = Some(labels.to_vec());
        Ok(())
    }

    pub(crate) fn set_labels_unchecked(&mut self, labels: Option<Vec<BartDim>>) {
        self.labels = labels;
    }

    /// Read one element by linear index or by one index per dimension.
    pub fn get(&self, indices: &[isize]) -> Result<Complex32> {
        let linear = shape::resolve_index(indices, &self.shape)?;
        Ok(self.data[linear])
    }

    /// Write one element by linear index or by one index per dimension.
    pub fn set(&mut self, value: Complex32, indices: &[isize]) -> Result<()> {
        let linear = shape::resolve_index(indices, &self.shape)?;
        self.data[linear] = value;
        Ok(())
    }
}

impl PartialEq for DenseArray {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.labels == other.labels && self.data == other.data
    }
}
