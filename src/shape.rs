//! Shape arithmetic: strides, linear/Cartesian conversion and index normalization.
//!
//! All arrays use row-major order: the last dimension varies fastest and the
//! first declared dimension has the largest stride.

use smallvec::SmallVec;

use crate::{BartError, Result};

/// Cartesian coordinate buffer. BART arrays never exceed 16 dimensions, so
/// coordinates stay inline in the common case.
pub(crate) type Coords = SmallVec<[usize; 16]>;

/// Compute row-major (C-order) strides for the given dimensions.
pub fn row_major_strides(dims: &[usize]) -> Vec<usize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1usize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

/// Number of elements of a shape.
#[inline]
pub(crate) fn length(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Number of elements of a shape, or `None` if the product overflows `usize`.
#[inline]
pub(crate) fn checked_length(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
}

/// Arrays need at least one dimension and an addressable element count.
pub(crate) fn validate_shape(shape: &[usize]) -> Result<()> {
    if shape.is_empty() {
        return Err(BartError::EmptyShape);
    }
    if checked_length(shape).is_none() {
        return Err(BartError::LengthOverflow(shape.to_vec()));
    }
    Ok(())
}

/// Convert in-bounds coordinates to a linear index.
#[inline]
pub(crate) fn ravel(coords: &[usize], shape: &[usize]) -> usize {
    debug_assert_eq!(coords.len(), shape.len());
    coords
        .iter()
        .zip(shape)
        .fold(0usize, |acc, (&c, &extent)| acc * extent + c)
}

/// Convert an in-bounds linear index to coordinates.
#[inline]
pub(crate) fn unravel(mut linear: usize, shape: &[usize]) -> Coords {
    let mut coords: Coords = SmallVec::from_elem(0, shape.len());
    for (c, &extent) in coords.iter_mut().zip(shape).rev() {
        if extent == 0 {
            continue;
        }
        *c = linear % extent;
        linear /= extent;
    }
    coords
}

/// Advance `coords` to the next position in row-major order.
///
/// Returns `false` once every position has been visited.
#[inline]
pub(crate) fn increment(coords: &mut [usize], shape: &[usize]) -> bool {
    for axis in (0..shape.len()).rev() {
        coords[axis] += 1;
        if coords[axis] < shape[axis] {
            return true;
        }
        coords[axis] = 0;
    }
    false
}

/// Normalize a possibly negative linear index against `length`.
pub(crate) fn normalize_linear(index: isize, length: usize) -> Result<usize> {
    let resolved = if index < 0 {
        index + length as isize
    } else {
        index
    };
    if resolved < 0 || resolved as usize >= length {
        return Err(BartError::LinearBounds { length, index });
    }
    Ok(resolved as usize)
}

/// Normalize per-axis indices (negative values count from the end of their axis).
pub(crate) fn normalize_cartesian(indices: &[isize], shape: &[usize]) -> Result<Coords> {
    if indices.len() != shape.len() {
        return Err(BartError::DimensionMismatch {
            expected: shape.len(),
            actual: indices.len(),
        });
    }
    let mut coords = Coords::with_capacity(shape.len());
    for (&index, &extent) in indices.iter().zip(shape) {
        let resolved = if index < 0 {
            index + extent as isize
        } else {
            index
        };
        if resolved < 0 || resolved as usize >= extent {
            return Err(BartError::CartesianBounds {
                shape: shape.to_vec(),
                indices: indices.to_vec(),
            });
        }
        coords.push(resolved as usize);
    }
    Ok(coords)
}

/// Resolve a user index to a linear index.
///
/// A single index is linear; otherwise one index per dimension is required.
pub(crate) fn resolve_index(indices: &[isize], shape: &[usize]) -> Result<usize> {
    match indices {
        [linear] => normalize_linear(*linear, length(shape)),
        _ => {
            let coords = normalize_cartesian(indices, shape)?;
            Ok(ravel(&coords, shape))
        }
    }
}

/// Format a shape as `4 × 5 × 3`.
pub(crate) fn format_shape(shape: &[usize]) -> String {
    shape
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(" × ")
}

/// Format indices as `[1, 1, 3]`.
pub(crate) fn format_indices(indices: &[isize]) -> String {
    let parts: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
