//! Elementwise operations shared by dense arrays and every view kind.
//!
//! All bulk operations are written once against the store's linear-order
//! read ([`ArrayStore::values`]) and write ([`ArrayStore::update`]) paths, which
//! take the contiguous fast path whenever the storage order allows it.

use num_complex::Complex32;
use num_traits::AsPrimitive;

use crate::dense::DenseArray;
use crate::selector::Sel;
use crate::shape::{self, length, Coords};
use crate::store::{ArrayId, ArrayStore};
use crate::{BartError, Result};

/// Right-hand operand of an elementwise operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Scalar(Complex32),
    Array(ArrayId),
}

impl From<Complex32> for Operand {
    fn from(value: Complex32) -> Self {
        Operand::Scalar(value)
    }
}

impl From<f32> for Operand {
    fn from(value: f32) -> Self {
        Operand::Scalar(Complex32::new(value, 0.0))
    }
}

impl From<ArrayId> for Operand {
    fn from(id: ArrayId) -> Self {
        Operand::Array(id)
    }
}

/// Operand values gathered before the receiver is touched.
enum Gathered {
    Scalar(Complex32),
    Values(Vec<Complex32>),
}

impl Gathered {
    #[inline]
    fn at(&self, i: usize) -> Complex32 {
        match self {
            Gathered::Scalar(v) => *v,
            Gathered::Values(values) => values[i],
        }
    }
}

impl ArrayStore {
    // ========================================================================
    // Arithmetic
    // ========================================================================

    fn gather(&self, id: ArrayId, operands: &[Operand]) -> Result<Vec<Gathered>> {
        let shape = self.shape(id)?;
        operands
            .iter()
            .map(|operand| match *operand {
                Operand::Scalar(v) => Ok(Gathered::Scalar(v)),
                Operand::Array(other) => {
                    let other_shape = self.shape(other)?;
                    if other_shape != shape {
                        return Err(BartError::ShapeMismatch(
                            shape.to_vec(),
                            other_shape.to_vec(),
                        ));
                    }
                    Ok(Gathered::Values(self.values(other)?))
                }
            })
            .collect()
    }

    fn combine_inplace<F>(&mut self, id: ArrayId, operands: &[Operand], op: F) -> Result<()>
    where
        F: Fn(Complex32, Complex32) -> Complex32,
    {
        let gathered = self.gather(id, operands)?;
        self.update(id, |i, v| gathered.iter().fold(v, |acc, g| op(acc, g.at(i))))
    }

    fn combine<F>(&mut self, id: ArrayId, operands: &[Operand], op: F) -> Result<ArrayId>
    where
        F: Fn(Complex32, Complex32) -> Complex32,
    {
        let gathered = self.gather(id, operands)?;
        let out = self.copy(id)?;
        self.update(out, |i, v| gathered.iter().fold(v, |acc, g| op(acc, g.at(i))))?;
        Ok(out)
    }

    /// New array holding `id + operands[0] + operands[1] + ...`.
    pub fn add(&mut self, id: ArrayId, operands: &[Operand]) -> Result<ArrayId> {
        self.combine(id, operands, |a, b| a + b)
    }

    pub fn subtract(&mut self, id: ArrayId, operands: &[Operand]) -> Result<ArrayId> {
        self.combine(id, operands, |a, b| a - b)
    }

    pub fn multiply(&mut self, id: ArrayId, operands: &[Operand]) -> Result<ArrayId> {
        self.combine(id, operands, |a, b| a * b)
    }

    pub fn divide(&mut self, id: ArrayId, operands: &[Operand]) -> Result<ArrayId> {
        self.combine(id, operands, |a, b| a / b)
    }

    /// Add every operand to `id` in place. Array operands must match the shape
    /// of `id`; nothing is written unless they all do.
    pub fn add_inplace(&mut self, id: ArrayId, operands: &[Operand]) -> Result<()> {
        self.combine_inplace(id, operands, |a, b| a + b)
    }

    pub fn subtract_inplace(&mut self, id: ArrayId, operands: &[Operand]) -> Result<()> {
        self.combine_inplace(id, operands, |a, b| a - b)
    }

    pub fn multiply_inplace(&mut self, id: ArrayId, operands: &[Operand]) -> Result<()> {
        self.combine_inplace(id, operands, |a, b| a * b)
    }

    pub fn divide_inplace(&mut self, id: ArrayId, operands: &[Operand]) -> Result<()> {
        self.combine_inplace(id, operands, |a, b| a / b)
    }

    // ========================================================================
    // Fill / apply / map
    // ========================================================================

    pub fn fill(&mut self, id: ArrayId, value: Complex32) -> Result<()> {
        self.update(id, |_, _| value)
    }

    pub fn fill_using_linear_indices<F>(&mut self, id: ArrayId, mut f: F) -> Result<()>
    where
        F: FnMut(usize) -> Complex32,
    {
        self.update(id, |i, _| f(i))
    }

    pub fn fill_using_cartesian_indices<F>(&mut self, id: ArrayId, mut f: F) -> Result<()>
    where
        F: FnMut(&[usize]) -> Complex32,
    {
        self.apply_with_cartesian_indices(id, |_, coords| f(coords))
    }

    pub fn apply<F>(&mut self, id: ArrayId, mut f: F) -> Result<()>
    where
        F: FnMut(Complex32) -> Complex32,
    {
        self.update(id, |_, v| f(v))
    }

    pub fn apply_with_linear_indices<F>(&mut self, id: ArrayId, mut f: F) -> Result<()>
    where
        F: FnMut(Complex32, usize) -> Complex32,
    {
        self.update(id, |i, v| f(v, i))
    }

    pub fn apply_with_cartesian_indices<F>(&mut self, id: ArrayId, mut f: F) -> Result<()>
    where
        F: FnMut(Complex32, &[usize]) -> Complex32,
    {
        let shape = self.shape(id)?.to_vec();
        let mut coords: Coords = Coords::from_elem(0, shape.len());
        self.update(id, |_, v| {
            let out = f(v, &coords);
            shape::increment(&mut coords, &shape);
            out
        })
    }

    /// Copy of `id` with `f` applied to every element.
    pub fn map<F>(&mut self, id: ArrayId, f: F) -> Result<ArrayId>
    where
        F: FnMut(Complex32) -> Complex32,
    {
        let out = self.copy(id)?;
        self.apply(out, f)?;
        Ok(out)
    }

    pub fn map_with_linear_indices<F>(&mut self, id: ArrayId, f: F) -> Result<ArrayId>
    where
        F: FnMut(Complex32, usize) -> Complex32,
    {
        let out = self.copy(id)?;
        self.apply_with_linear_indices(out, f)?;
        Ok(out)
    }

    pub fn map_with_cartesian_indices<F>(&mut self, id: ArrayId, f: F) -> Result<ArrayId>
    where
        F: FnMut(Complex32, &[usize]) -> Complex32,
    {
        let out = self.copy(id)?;
        self.apply_with_cartesian_indices(out, f)?;
        Ok(out)
    }

    // ========================================================================
    // Copying
    // ========================================================================

    /// New dense array with the values of `id`, keeping its labels.
    pub fn copy(&mut self, id: ArrayId) -> Result<ArrayId> {
        let array = self.to_dense(id)?;
        Ok(self.insert(array))
    }

    /// New zero-filled dense array with the shape of `id`.
    pub fn similar(&mut self, id: ArrayId) -> Result<ArrayId> {
        let shape = self.shape(id)?.to_vec();
        self.zeros(&shape)
    }

    /// Overwrite the values of `dst` with those of `src`. Labels are untouched.
    pub fn copy_from(&mut self, dst: ArrayId, src: ArrayId) -> Result<()> {
        let dst_shape = self.shape(dst)?;
        let src_shape = self.shape(src)?;
        if dst_shape != src_shape {
            return Err(BartError::ShapeMismatch(
                dst_shape.to_vec(),
                src_shape.to_vec(),
            ));
        }
        if let (Some(a), Some(b)) = (self.contiguous_base(dst)?, self.contiguous_base(src)?) {
            if a == b {
                // Same buffer in the same order.
                return Ok(());
            }
        }
        let values = self.values(src)?;
        self.update(dst, |i, _| values[i])
    }

    /// Overwrite `dst` with row-major values.
    pub fn copy_from_values(&mut self, dst: ArrayId, values: &[Complex32]) -> Result<()> {
        self.check_length(dst, values.len())?;
        self.update(dst, |i, _| values[i])
    }

    /// Overwrite `dst` with real values; imaginary parts become zero.
    pub fn copy_from_real<T>(&mut self, dst: ArrayId, re: &[T]) -> Result<()>
    where
        T: AsPrimitive<f32>,
    {
        self.check_length(dst, re.len())?;
        self.update(dst, |i, _| Complex32::new(re[i].as_(), 0.0))
    }

    /// Overwrite `dst` from separate real and imaginary parts.
    pub fn copy_from_real_imag<T>(&mut self, dst: ArrayId, re: &[T], im: &[T]) -> Result<()>
    where
        T: AsPrimitive<f32>,
    {
        self.check_length(dst, re.len())?;
        self.check_length(dst, im.len())?;
        self.update(dst, |i, _| Complex32::new(re[i].as_(), im[i].as_()))
    }

    fn check_length(&self, id: ArrayId, len: usize) -> Result<()> {
        let shape = self.shape(id)?;
        if length(shape) != len {
            return Err(BartError::ShapeMismatch(shape.to_vec(), vec![len]));
        }
        Ok(())
    }

    // ========================================================================
    // Real-valued projections
    // ========================================================================

    fn derive<F>(&mut self, id: ArrayId, f: F) -> Result<ArrayId>
    where
        F: Fn(Complex32) -> f32,
    {
        let mut array = self.to_dense(id)?;
        for v in array.as_mut_slice() {
            *v = Complex32::new(f(*v), 0.0);
        }
        Ok(self.insert(array))
    }

    /// Real parts as a new array.
    pub fn real(&mut self, id: ArrayId) -> Result<ArrayId> {
        self.derive(id, |v| v.re)
    }

    /// Imaginary parts as a new (real-valued) array.
    pub fn imag(&mut self, id: ArrayId) -> Result<ArrayId> {
        self.derive(id, |v| v.im)
    }

    /// Magnitudes as a new array.
    pub fn abs(&mut self, id: ArrayId) -> Result<ArrayId> {
        self.derive(id, |v| v.norm())
    }

    /// Phase angles as a new array.
    pub fn argument(&mut self, id: ArrayId) -> Result<ArrayId> {
        self.derive(id, |v| v.arg())
    }

    // ========================================================================
    // Structural operations
    // ========================================================================

    /// New dense array joining `id` and `others` along `axis`.
    ///
    /// Every input must match the shape of `id` except along `axis`. The result
    /// keeps the labels of `id`.
    pub fn concatenate(&mut self, id: ArrayId, axis: usize, others: &[ArrayId]) -> Result<ArrayId> {
        let shape = self.shape(id)?.to_vec();
        if axis >= shape.len() {
            return Err(BartError::InvalidAxis {
                axis,
                rank: shape.len(),
            });
        }
        let mut parts = Vec::with_capacity(others.len() + 1);
        parts.push(id);
        parts.extend_from_slice(others);

        let mut out_shape = shape.clone();
        out_shape[axis] = 0;
        let mut extents = Vec::with_capacity(parts.len());
        for &part in &parts {
            let part_shape = self.shape(part)?;
            let compatible = part_shape.len() == shape.len()
                && part_shape
                    .iter()
                    .zip(&shape)
                    .enumerate()
                    .all(|(k, (a, b))| k == axis || a == b);
            if !compatible {
                return Err(BartError::ShapeMismatch(shape, part_shape.to_vec()));
            }
            extents.push(part_shape[axis]);
            out_shape[axis] += part_shape[axis];
        }

        let outer: usize = shape[..axis].iter().product();
        let inner: usize = shape[axis + 1..].iter().product();
        let values = parts
            .iter()
            .map(|&part| self.values(part))
            .collect::<Result<Vec<_>>>()?;
        let mut data = Vec::with_capacity(length(&out_shape));
        for o in 0..outer {
            for (part_values, &extent) in values.iter().zip(&extents) {
                let chunk = extent * inner;
                data.extend_from_slice(&part_values[o * chunk..(o + 1) * chunk]);
            }
        }

        let mut array = DenseArray::from_vec(&out_shape, data)?;
        array.set_labels_unchecked(self.labels(id)?);
        Ok(self.insert(array))
    }

    /// View keeping only `axes`; every other axis must be a singleton.
    pub fn select_dims(&mut self, id: ArrayId, axes: &[usize]) -> Result<ArrayId> {
        let shape = self.shape(id)?.to_vec();
        let rank = shape.len();
        if let Some(&axis) = axes.iter().find(|&&axis| axis >= rank) {
            return Err(BartError::InvalidAxis { axis, rank });
        }
        let selectors = shape
            .iter()
            .enumerate()
            .map(|(axis, &extent)| {
                if axes.contains(&axis) {
                    Ok(Sel::full())
                } else if extent == 1 {
                    Ok(Sel::at(0))
                } else {
                    Err(BartError::NotSingleton { axis, extent })
                }
            })
            .collect::<Result<Vec<_>>>()?;
        self.slice(id, &selectors)
    }

    /// View without the given singleton axes.
    pub fn drop_dims(&mut self, id: ArrayId, axes: &[usize]) -> Result<ArrayId> {
        let rank = self.ndim(id)?;
        if let Some(&axis) = axes.iter().find(|&&axis| axis >= rank) {
            return Err(BartError::InvalidAxis { axis, rank });
        }
        let kept: Vec<usize> = (0..rank).filter(|axis| !axes.contains(axis)).collect();
        if kept.is_empty() {
            return Err(BartError::AllDimsDropped);
        }
        self.select_dims(id, &kept)
    }

    /// View without singleton axes. An array made only of singleton axes keeps
    /// its first axis.
    pub fn squeeze(&mut self, id: ArrayId) -> Result<ArrayId> {
        let shape = self.shape(id)?;
        let mut kept: Vec<usize> = (0..shape.len()).filter(|&axis| shape[axis] != 1).collect();
        if kept.is_empty() {
            kept.push(0);
        }
        self.select_dims(id, &kept)
    }

    // ========================================================================
    // Per-slice processing
    // ========================================================================

    /// Call `f` on every sub-array obtained by fixing the `iteration_axes` of `id`.
    ///
    /// `f` receives the store, a slice view with the iteration axes removed and
    /// the slice's position along `iteration_axes` (in the order given). Slices
    /// are visited in row-major order of that position, and writes through them
    /// land in `id`. Each slice view is released after its call unless `f` left
    /// views of its own on it. With no iteration axes, `f` sees `id` itself once.
    pub fn apply_on_slices<F>(&mut self, id: ArrayId, iteration_axes: &[usize], mut f: F) -> Result<()>
    where
        F: FnMut(&mut ArrayStore, ArrayId, &[usize]) -> Result<()>,
    {
        let shape = self.shape(id)?.to_vec();
        let rank = shape.len();
        for (k, &axis) in iteration_axes.iter().enumerate() {
            if axis >= rank {
                return Err(BartError::InvalidAxis { axis, rank });
            }
            if iteration_axes[..k].contains(&axis) {
                return Err(BartError::DuplicateAxis(axis));
            }
        }
        if iteration_axes.len() == rank {
            return Err(BartError::AllDimsDropped);
        }

        let extents: Vec<usize> = iteration_axes.iter().map(|&axis| shape[axis]).collect();
        if extents.contains(&0) {
            return Ok(());
        }
        let mut position: Coords = Coords::from_elem(0, extents.len());
        loop {
            let selectors: Vec<Sel> = (0..rank)
                .map(|axis| match iteration_axes.iter().position(|&a| a == axis) {
                    Some(k) => Sel::at(position[k] as isize),
                    None => Sel::full(),
                })
                .collect();
            let slice = self.slice(id, &selectors)?;
            let outcome = f(self, slice, &position[..]);
            if slice != id && self.contains(slice) {
                self.release_temporaries(slice, Some(id))?;
            }
            outcome?;
            if !shape::increment(&mut position, &extents) {
                return Ok(());
            }
        }
    }

    /// Copy of `id` with `f` applied to every slice as in [`Self::apply_on_slices`].
    pub fn map_on_slices<F>(&mut self, id: ArrayId, iteration_axes: &[usize], f: F) -> Result<ArrayId>
    where
        F: FnMut(&mut ArrayStore, ArrayId, &[usize]) -> Result<()>,
    {
        let out = self.copy(id)?;
        if let Err(e) = self.apply_on_slices(out, iteration_axes, f) {
            if self.contains(out) && self.dependents(out)? == 0 {
                self.release(out)?;
            }
            return Err(e);
        }
        Ok(out)
    }
}
