//! View transforms and the operations that create views.
//!
//! Every view kind implements [`IndexMap`], which translates a linear index of
//! the view into a linear index of its immediate parent. Everything else
//! (element access, bulk reads and writes, arithmetic) is written once against
//! that capability in [`crate::store`] and [`crate::ops`].
//!
//! View construction validates eagerly and collapses no-op transforms: the
//! returned id is the parent's own id whenever the view would be an identity.

use num_complex::Complex32;
use tracing::debug;

use crate::dims::BartDim;
use crate::selector::{parse_selectors, AxisRange, Sel};
use crate::shape::{self, length, ravel, unravel, validate_shape, Coords};
use crate::store::{ArrayId, ArrayStore};
use crate::{BartError, Result};

// ============================================================================
// Index maps
// ============================================================================

/// Translate view-linear indices to parent-linear indices.
pub(crate) trait IndexMap {
    fn parent_linear(&self, linear: usize, shape: &[usize], parent_shape: &[usize]) -> usize;

    /// True when view-linear order is parent-linear order.
    fn is_contiguous(&self) -> bool {
        false
    }
}

/// The kind of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Slice,
    Permute,
    Reshape,
    Mask,
}

/// Per parent axis, the resolved selector.
#[derive(Debug, Clone)]
pub(crate) struct SliceMap {
    ranges: Vec<AxisRange>,
}

impl IndexMap for SliceMap {
    fn parent_linear(&self, linear: usize, shape: &[usize], parent_shape: &[usize]) -> usize {
        let coords = unravel(linear, shape);
        let mut view_axis = 0;
        let mut parent = 0usize;
        for (range, &extent) in self.ranges.iter().zip(parent_shape) {
            let position = if range.scalar {
                range.start
            } else {
                let p = range.at(coords[view_axis]);
                view_axis += 1;
                p
            };
            parent = parent * extent + position;
        }
        parent
    }
}

/// `view axis i = parent axis perm[i]`.
#[derive(Debug, Clone)]
pub(crate) struct PermuteMap {
    perm: Vec<usize>,
}

impl IndexMap for PermuteMap {
    fn parent_linear(&self, linear: usize, shape: &[usize], parent_shape: &[usize]) -> usize {
        let coords = unravel(linear, shape);
        let mut parent_coords: Coords = Coords::from_elem(0, parent_shape.len());
        for (&axis, &c) in self.perm.iter().zip(coords.iter()) {
            parent_coords[axis] = c;
        }
        ravel(&parent_coords, parent_shape)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ReshapeMap;

impl IndexMap for ReshapeMap {
    #[inline]
    fn parent_linear(&self, linear: usize, _shape: &[usize], _parent_shape: &[usize]) -> usize {
        linear
    }

    fn is_contiguous(&self) -> bool {
        true
    }
}

/// Selected parent-linear indices, ascending.
#[derive(Debug, Clone)]
pub(crate) struct MaskMap {
    indices: Vec<usize>,
}

impl IndexMap for MaskMap {
    #[inline]
    fn parent_linear(&self, linear: usize, _shape: &[usize], _parent_shape: &[usize]) -> usize {
        self.indices[linear]
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ViewMap {
    Slice(SliceMap),
    Permute(PermuteMap),
    Reshape(ReshapeMap),
    Mask(MaskMap),
}

impl ViewMap {
    pub fn kind(&self) -> ViewKind {
        match self {
            ViewMap::Slice(_) => ViewKind::Slice,
            ViewMap::Permute(_) => ViewKind::Permute,
            ViewMap::Reshape(_) => ViewKind::Reshape,
            ViewMap::Mask(_) => ViewKind::Mask,
        }
    }

    /// Labels seen through this view, given the parent's labels.
    pub fn map_labels(&self, parent_labels: &[BartDim]) -> Option<Vec<BartDim>> {
        match self {
            ViewMap::Slice(s) => Some(
                s.ranges
                    .iter()
                    .zip(parent_labels)
                    .filter(|(range, _)| !range.scalar)
                    .map(|(_, &label)| label)
                    .collect(),
            ),
            ViewMap::Permute(p) => Some(p.perm.iter().map(|&axis| parent_labels[axis]).collect()),
            ViewMap::Reshape(_) | ViewMap::Mask(_) => None,
        }
    }
}

impl IndexMap for ViewMap {
    #[inline]
    fn parent_linear(&self, linear: usize, shape: &[usize], parent_shape: &[usize]) -> usize {
        match self {
            ViewMap::Slice(m) => m.parent_linear(linear, shape, parent_shape),
            ViewMap::Permute(m) => m.parent_linear(linear, shape, parent_shape),
            ViewMap::Reshape(m) => m.parent_linear(linear, shape, parent_shape),
            ViewMap::Mask(m) => m.parent_linear(linear, shape, parent_shape),
        }
    }

    fn is_contiguous(&self) -> bool {
        match self {
            ViewMap::Reshape(m) => m.is_contiguous(),
            _ => false,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validate that `perm` is a permutation of `0..shape.len()`.
pub(crate) fn validate_permutation(perm: &[usize], shape: &[usize]) -> Result<()> {
    if perm.len() != shape.len() {
        return Err(BartError::PermutatorShapeMismatch {
            permutation: perm.to_vec(),
            shape: shape.to_vec(),
        });
    }
    let mut seen = vec![false; perm.len()];
    for &p in perm {
        if p >= perm.len() || seen[p] {
            return Err(BartError::InvalidPermutator {
                permutation: perm.to_vec(),
                shape: shape.to_vec(),
            });
        }
        seen[p] = true;
    }
    Ok(())
}

/// Inverse of a validated permutation.
pub(crate) fn invert_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inverse[p] = i;
    }
    inverse
}

fn is_identity(perm: &[usize]) -> bool {
    perm.iter().enumerate().all(|(i, &p)| i == p)
}

// ============================================================================
// View constructors
// ============================================================================

impl ArrayStore {
    /// Slice view with one selector per dimension.
    ///
    /// Index selectors drop their dimension. Selecting the full range of every
    /// axis returns `id` itself.
    pub fn slice(&mut self, id: ArrayId, selectors: &[Sel]) -> Result<ArrayId> {
        let parent_shape = self.shape(id)?;
        if selectors.len() != parent_shape.len() {
            return Err(BartError::DimensionMismatch {
                expected: parent_shape.len(),
                actual: selectors.len(),
            });
        }
        let ranges = selectors
            .iter()
            .zip(parent_shape)
            .enumerate()
            .map(|(axis, (sel, &extent))| sel.normalize(axis, extent))
            .collect::<Result<Vec<_>>>()?;

        if ranges
            .iter()
            .zip(parent_shape)
            .all(|(range, &extent)| range.is_full(extent))
        {
            debug!(?id, "full-range slice collapsed to parent");
            return Ok(id);
        }
        let shape: Vec<usize> = ranges
            .iter()
            .filter(|range| !range.scalar)
            .map(|range| range.len)
            .collect();
        if shape.is_empty() {
            return Err(BartError::AllDimsDropped);
        }
        self.push_view(id, shape, ViewMap::Slice(SliceMap { ranges }))
    }

    /// Slice view from textual selectors such as `"1"`, `":"` or `"0:4:2"`.
    pub fn slice_str(&mut self, id: ArrayId, exprs: &[&str]) -> Result<ArrayId> {
        let selectors = parse_selectors(exprs)?;
        self.slice(id, &selectors)
    }

    /// Permute view: axis `i` of the view is axis `perm[i]` of `id`.
    ///
    /// Permuting a permute view composes both permutations over the
    /// grandparent, returning the grandparent when they cancel out.
    pub fn permute(&mut self, id: ArrayId, perm: &[usize]) -> Result<ArrayId> {
        let shape = self.shape(id)?;
        validate_permutation(perm, shape)?;
        if is_identity(perm) {
            debug!(?id, "identity permutation collapsed to parent");
            return Ok(id);
        }
        let new_shape: Vec<usize> = perm.iter().map(|&p| shape[p]).collect();

        let node = self.node(id)?;
        if let Some((grandparent, ViewMap::Permute(inner))) = node.view() {
            let composed: Vec<usize> = perm.iter().map(|&p| inner.perm[p]).collect();
            if is_identity(&composed) {
                debug!(?id, ?grandparent, "permutations cancel out");
                return Ok(grandparent);
            }
            return self.push_view(
                grandparent,
                new_shape,
                ViewMap::Permute(PermuteMap { perm: composed }),
            );
        }
        self.push_view(
            id,
            new_shape,
            ViewMap::Permute(PermuteMap {
                perm: perm.to_vec(),
            }),
        )
    }

    /// Reshape view. The element order is unchanged.
    ///
    /// Reshaping to the current shape returns `id`; reshaping a reshape view back
    /// to its parent's shape returns the parent.
    pub fn reshape(&mut self, id: ArrayId, new_shape: &[usize]) -> Result<ArrayId> {
        validate_shape(new_shape)?;
        let shape = self.shape(id)?;
        if length(shape) != length(new_shape) {
            return Err(BartError::ShapeMismatch(shape.to_vec(), new_shape.to_vec()));
        }
        if shape == new_shape {
            debug!(?id, "same-shape reshape collapsed to parent");
            return Ok(id);
        }
        let node = self.node(id)?;
        if let Some((grandparent, ViewMap::Reshape(_))) = node.view() {
            if self.shape(grandparent)? == new_shape {
                debug!(?id, ?grandparent, "reshape returned to grandparent shape");
                return Ok(grandparent);
            }
            return self.push_view(grandparent, new_shape.to_vec(), ViewMap::Reshape(ReshapeMap));
        }
        self.push_view(id, new_shape.to_vec(), ViewMap::Reshape(ReshapeMap))
    }

    /// Flattened 1-D reshape view.
    pub fn flatten(&mut self, id: ArrayId) -> Result<ArrayId> {
        let len = self.len(id)?;
        self.reshape(id, &[len])
    }

    // ------------------------------------------------------------------------
    // Masks
    // ------------------------------------------------------------------------

    /// Mask view over the elements whose value satisfies `predicate`.
    pub fn mask<F>(&mut self, id: ArrayId, mut predicate: F) -> Result<ArrayId>
    where
        F: FnMut(Complex32) -> bool,
    {
        self.mask_with_linear_indices(id, |v, _| predicate(v))
    }

    /// Mask view over the elements for which `predicate(value, linear index)` holds.
    pub fn mask_with_linear_indices<F>(&mut self, id: ArrayId, mut predicate: F) -> Result<ArrayId>
    where
        F: FnMut(Complex32, usize) -> bool,
    {
        let selected = self
            .values(id)?
            .into_iter()
            .enumerate()
            .filter(|&(i, v)| predicate(v, i))
            .map(|(i, _)| i)
            .collect();
        self.mask_selected(id, selected)
    }

    /// Mask view over the elements for which `predicate(value, coordinates)` holds.
    pub fn mask_with_cartesian_indices<F>(
        &mut self,
        id: ArrayId,
        mut predicate: F,
    ) -> Result<ArrayId>
    where
        F: FnMut(Complex32, &[usize]) -> bool,
    {
        let shape = self.shape(id)?.to_vec();
        let mut coords: Coords = Coords::from_elem(0, shape.len());
        let mut selected = Vec::new();
        for (i, v) in self.values(id)?.into_iter().enumerate() {
            if predicate(v, &coords) {
                selected.push(i);
            }
            shape::increment(&mut coords, &shape);
        }
        self.mask_selected(id, selected)
    }

    /// Mask view over the elements where the same-shaped `mask` is non-zero.
    pub fn mask_array(&mut self, id: ArrayId, mask: ArrayId) -> Result<ArrayId> {
        let flags = self.mask_flags_of(id, mask)?;
        self.mask_flags(id, &flags)
    }

    /// Mask view over the elements where the same-shaped `mask` is zero.
    pub fn inverse_mask_array(&mut self, id: ArrayId, mask: ArrayId) -> Result<ArrayId> {
        let flags = self.mask_flags_of(id, mask)?;
        self.inverse_mask_flags(id, &flags)
    }

    /// Mask view over the elements whose flag (in linear order) is set.
    pub fn mask_flags(&mut self, id: ArrayId, flags: &[bool]) -> Result<ArrayId> {
        self.check_flags(id, flags)?;
        let selected = flags
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f)
            .map(|(i, _)| i)
            .collect();
        self.mask_selected(id, selected)
    }

    /// Mask view over the elements whose flag (in linear order) is clear.
    pub fn inverse_mask_flags(&mut self, id: ArrayId, flags: &[bool]) -> Result<ArrayId> {
        self.check_flags(id, flags)?;
        let selected = flags
            .iter()
            .enumerate()
            .filter(|&(_, &f)| !f)
            .map(|(i, _)| i)
            .collect();
        self.mask_selected(id, selected)
    }

    fn mask_flags_of(&self, id: ArrayId, mask: ArrayId) -> Result<Vec<bool>> {
        let shape = self.shape(id)?;
        let mask_shape = self.shape(mask)?;
        if shape != mask_shape {
            return Err(BartError::ShapeMismatch(shape.to_vec(), mask_shape.to_vec()));
        }
        let zero = Complex32::new(0.0, 0.0);
        Ok(self.values(mask)?.into_iter().map(|v| v != zero).collect())
    }

    fn check_flags(&self, id: ArrayId, flags: &[bool]) -> Result<()> {
        let shape = self.shape(id)?;
        if flags.len() != length(shape) {
            return Err(BartError::ShapeMismatch(shape.to_vec(), vec![flags.len()]));
        }
        Ok(())
    }

    /// Build a mask view from ascending selected linear indices of `id`.
    fn mask_selected(&mut self, id: ArrayId, selected: Vec<usize>) -> Result<ArrayId> {
        let len = self.len(id)?;
        if selected.len() == len {
            debug!(?id, "mask selects every element, flattening instead");
            return self.reshape(id, &[len]);
        }
        let (parent, indices) = match self.node(id)?.view() {
            Some((grandparent, ViewMap::Mask(inner))) => (
                grandparent,
                selected.iter().map(|&i| inner.indices[i]).collect(),
            ),
            _ => (id, selected),
        };
        let shape = vec![indices.len()];
        self.push_view(parent, shape, ViewMap::Mask(MaskMap { indices }))
    }
}
