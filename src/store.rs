//! Arena that owns every dense buffer and every view record.
//!
//! Views never hold a handle to storage. They are records naming their parent
//! by [`ArrayId`], and every read or write resolves the chain of parents down to
//! the one dense node that owns the data. Because the store is the only owner,
//! `&mut ArrayStore` is the single-writer token for all aliased buffers.

use num_complex::Complex32;
use tracing::debug;

use crate::dense::DenseArray;
use crate::dims::BartDim;
use crate::shape::{self, length};
use crate::view::{IndexMap, ViewKind, ViewMap};
use crate::{BartError, Result};

/// Handle to an array or view inside an [`ArrayStore`].
///
/// Two handles are equal exactly when they name the same node, so an id
/// returned from a collapsed view operation compares equal to its source.
/// Released slots are reused with a new generation, which keeps stale handles
/// from silently aliasing a different array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Dense(DenseArray),
    View {
        parent: ArrayId,
        shape: Vec<usize>,
        map: ViewMap,
    },
}

#[derive(Debug)]
pub(crate) struct Node {
    pub kind: NodeKind,
    /// Number of views whose parent is this node.
    pub dependents: usize,
}

impl Node {
    pub fn shape(&self) -> &[usize] {
        match &self.kind {
            NodeKind::Dense(array) => array.shape(),
            NodeKind::View { shape, .. } => shape,
        }
    }

    /// The parent id and transform, for view nodes.
    pub fn view(&self) -> Option<(ArrayId, &ViewMap)> {
        match &self.kind {
            NodeKind::Dense(_) => None,
            NodeKind::View { parent, map, .. } => Some((*parent, map)),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of complex arrays and the views over them.
#[derive(Debug, Default)]
pub struct ArrayStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ArrayStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    fn alloc(&mut self, node: Node) -> ArrayId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            ArrayId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            ArrayId {
                index,
                generation: 0,
            }
        }
    }

    /// Move a dense array into the store.
    pub fn insert(&mut self, array: DenseArray) -> ArrayId {
        self.alloc(Node {
            kind: NodeKind::Dense(array),
            dependents: 0,
        })
    }

    /// Allocate a zero-filled dense array.
    pub fn zeros(&mut self, shape: &[usize]) -> Result<ArrayId> {
        Ok(self.insert(DenseArray::zeros(shape)?))
    }

    /// Allocate a dense array from row-major values.
    pub fn from_values(&mut self, shape: &[usize], values: Vec<Complex32>) -> Result<ArrayId> {
        Ok(self.insert(DenseArray::from_vec(shape, values)?))
    }

    /// Allocate a dense array from separate real and imaginary parts.
    pub fn from_real_imag(&mut self, shape: &[usize], re: &[f32], im: &[f32]) -> Result<ArrayId> {
        Ok(self.insert(DenseArray::from_real_imag(shape, re, im)?))
    }

    /// Register a view record over `parent`.
    pub(crate) fn push_view(
        &mut self,
        parent: ArrayId,
        shape: Vec<usize>,
        map: ViewMap,
    ) -> Result<ArrayId> {
        self.node_mut(parent)?.dependents += 1;
        let kind = map.kind();
        let id = self.alloc(Node {
            kind: NodeKind::View { parent, shape, map },
            dependents: 0,
        });
        debug!(?id, ?parent, ?kind, "created view");
        Ok(id)
    }

    /// Remove an array or view from the store.
    ///
    /// Fails while any view still names `id` as its parent. Returns the owned
    /// buffer when `id` was a dense array.
    pub fn release(&mut self, id: ArrayId) -> Result<Option<DenseArray>> {
        let dependents = self.node(id)?.dependents;
        if dependents > 0 {
            return Err(BartError::InUse {
                id,
                views: dependents,
            });
        }
        let slot = &mut self.slots[id.index as usize];
        let node = slot.node.take().ok_or(BartError::UnknownArray(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        debug!(?id, "released array");
        match node.kind {
            NodeKind::Dense(array) => Ok(Some(array)),
            NodeKind::View { parent, .. } => {
                self.node_mut(parent)?.dependents -= 1;
                Ok(None)
            }
        }
    }

    /// Release `top` and then each ancestor left without dependents, stopping at
    /// `keep` or at the first node still referenced.
    pub(crate) fn release_temporaries(&mut self, top: ArrayId, keep: Option<ArrayId>) -> Result<()> {
        let mut current = top;
        loop {
            if Some(current) == keep || self.node(current)?.dependents > 0 {
                return Ok(());
            }
            let parent = self.parent(current)?;
            self.release(current)?;
            match parent {
                Some(parent) => current = parent,
                None => return Ok(()),
            }
        }
    }

    // ========================================================================
    // Node access
    // ========================================================================

    pub(crate) fn node(&self, id: ArrayId) -> Result<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(BartError::UnknownArray(id))
    }

    fn node_mut(&mut self, id: ArrayId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(BartError::UnknownArray(id))
    }

    /// True when `id` names a live array or view.
    pub fn contains(&self, id: ArrayId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of live arrays and views.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn shape(&self, id: ArrayId) -> Result<&[usize]> {
        Ok(self.node(id)?.shape())
    }

    pub fn ndim(&self, id: ArrayId) -> Result<usize> {
        Ok(self.shape(id)?.len())
    }

    /// Number of elements.
    pub fn len(&self, id: ArrayId) -> Result<usize> {
        Ok(length(self.shape(id)?))
    }

    pub fn is_view(&self, id: ArrayId) -> Result<bool> {
        Ok(self.node(id)?.view().is_some())
    }

    /// The kind of view `id` is, or `None` for a dense array.
    pub fn view_kind(&self, id: ArrayId) -> Result<Option<ViewKind>> {
        Ok(self.node(id)?.view().map(|(_, map)| map.kind()))
    }

    /// Immediate parent of a view.
    pub fn parent(&self, id: ArrayId) -> Result<Option<ArrayId>> {
        Ok(self.node(id)?.view().map(|(parent, _)| parent))
    }

    /// The dense array at the bottom of the parent chain.
    pub fn base(&self, id: ArrayId) -> Result<ArrayId> {
        let mut current = id;
        while let Some((parent, _)) = self.node(current)?.view() {
            current = parent;
        }
        Ok(current)
    }

    /// Number of views whose parent is `id`.
    pub fn dependents(&self, id: ArrayId) -> Result<usize> {
        Ok(self.node(id)?.dependents)
    }

    /// Borrow the dense array behind `id`, if `id` is not a view.
    pub fn dense(&self, id: ArrayId) -> Result<Option<&DenseArray>> {
        match &self.node(id)?.kind {
            NodeKind::Dense(array) => Ok(Some(array)),
            NodeKind::View { .. } => Ok(None),
        }
    }

    fn dense_data(&self, base: ArrayId) -> Result<&[Complex32]> {
        match &self.node(base)?.kind {
            NodeKind::Dense(array) => Ok(array.as_slice()),
            NodeKind::View { .. } => Err(BartError::Unsupported("view has no storage")),
        }
    }

    fn dense_data_mut(&mut self, base: ArrayId) -> Result<&mut [Complex32]> {
        match &mut self.node_mut(base)?.kind {
            NodeKind::Dense(array) => Ok(array.as_mut_slice()),
            NodeKind::View { .. } => Err(BartError::Unsupported("view has no storage")),
        }
    }

    // ========================================================================
    // Index resolution
    // ========================================================================

    /// Resolve a linear index of `id` to `(base, storage index)`.
    pub(crate) fn storage_index(&self, id: ArrayId, linear: usize) -> Result<(ArrayId, usize)> {
        let mut current = id;
        let mut index = linear;
        loop {
            let node = self.node(current)?;
            match node.view() {
                None => return Ok((current, index)),
                Some((parent, map)) => {
                    let parent_shape = self.shape(parent)?;
                    index = map.parent_linear(index, node.shape(), parent_shape);
                    current = parent;
                }
            }
        }
    }

    /// Storage indices of every element of `id`, in linear order.
    pub(crate) fn storage_indices(&self, id: ArrayId) -> Result<(ArrayId, Vec<usize>)> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some((parent, _)) = self.node(current)?.view() {
            chain.push(current);
            current = parent;
        }
        let base = current;

        // `None` stands for the identity over the current parent.
        let mut indices: Option<Vec<usize>> = None;
        for &view in chain.iter().rev() {
            let node = self.node(view)?;
            let Some((parent, map)) = node.view() else {
                continue;
            };
            if map.is_contiguous() {
                continue;
            }
            let parent_shape = self.shape(parent)?;
            let shape = node.shape();
            let next = (0..length(shape))
                .map(|i| {
                    let p = map.parent_linear(i, shape, parent_shape);
                    indices.as_ref().map_or(p, |idx| idx[p])
                })
                .collect();
            indices = Some(next);
        }
        let indices = match indices {
            Some(indices) => indices,
            None => (0..self.len(id)?).collect(),
        };
        Ok((base, indices))
    }

    /// The dense base when `id` shares its storage order with it.
    ///
    /// True for dense arrays and for chains of reshape views over one.
    pub(crate) fn contiguous_base(&self, id: ArrayId) -> Result<Option<ArrayId>> {
        let mut current = id;
        loop {
            match self.node(current)?.view() {
                None => return Ok(Some(current)),
                Some((parent, map)) if map.is_contiguous() => current = parent,
                Some(_) => return Ok(None),
            }
        }
    }

    // ========================================================================
    // Element access
    // ========================================================================

    /// Read one element. A single index is linear; otherwise one index per
    /// dimension is required. Negative indices count from the end.
    pub fn get(&self, id: ArrayId, indices: &[isize]) -> Result<Complex32> {
        let linear = shape::resolve_index(indices, self.shape(id)?)?;
        let (base, index) = self.storage_index(id, linear)?;
        Ok(self.dense_data(base)?[index])
    }

    /// Write one element, visible through every array sharing the storage.
    pub fn set(&mut self, id: ArrayId, value: Complex32, indices: &[isize]) -> Result<()> {
        let linear = shape::resolve_index(indices, self.shape(id)?)?;
        let (base, index) = self.storage_index(id, linear)?;
        self.dense_data_mut(base)?[index] = value;
        Ok(())
    }

    /// All elements in linear order.
    pub fn values(&self, id: ArrayId) -> Result<Vec<Complex32>> {
        if let Some(base) = self.contiguous_base(id)? {
            return Ok(self.dense_data(base)?.to_vec());
        }
        let (base, indices) = self.storage_indices(id)?;
        let data = self.dense_data(base)?;
        Ok(indices.iter().map(|&i| data[i]).collect())
    }

    /// Owned snapshot of `id`, carrying its labels if it has any.
    pub fn to_dense(&self, id: ArrayId) -> Result<DenseArray> {
        let mut array = DenseArray::from_vec(self.shape(id)?, self.values(id)?)?;
        array.set_labels_unchecked(self.labels(id)?);
        Ok(array)
    }

    /// Rewrite every element in linear order with `f(linear index, old value)`.
    pub(crate) fn update<F>(&mut self, id: ArrayId, mut f: F) -> Result<()>
    where
        F: FnMut(usize, Complex32) -> Complex32,
    {
        if let Some(base) = self.contiguous_base(id)? {
            for (i, v) in self.dense_data_mut(base)?.iter_mut().enumerate() {
                *v = f(i, *v);
            }
            return Ok(());
        }
        let (base, indices) = self.storage_indices(id)?;
        let data = self.dense_data_mut(base)?;
        for (i, &s) in indices.iter().enumerate() {
            data[s] = f(i, data[s]);
        }
        Ok(())
    }

    // ========================================================================
    // Dimension labels
    // ========================================================================

    /// Labels of `id`.
    ///
    /// Dense arrays report their own labels, permute views permute their
    /// parent's labels and slice views keep the labels of the surviving axes.
    /// Reshape and mask views never carry labels.
    pub fn labels(&self, id: ArrayId) -> Result<Option<Vec<BartDim>>> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Dense(array) => Ok(array.labels().map(<[BartDim]>::to_vec)),
            NodeKind::View { parent, map, .. } => {
                let Some(parent_labels) = self.labels(*parent)? else {
                    return Ok(None);
                };
                Ok(map.map_labels(&parent_labels))
            }
        }
    }

    pub fn labels_specified(&self, id: ArrayId) -> Result<bool> {
        Ok(self.labels(id)?.is_some())
    }

    /// Labels of `id`, failing when none are assigned.
    pub fn require_labels(&self, id: ArrayId) -> Result<Vec<BartDim>> {
        self.labels(id)?
            .ok_or(BartError::Unsupported("dimension labels are not specified"))
    }

    /// Assign labels to a dense array. Views derive their labels and reject
    /// assignment.
    pub fn set_labels(&mut self, id: ArrayId, labels: &[BartDim]) -> Result<()> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Dense(array) => array.set_labels(labels),
            NodeKind::View { .. } => Err(BartError::Unsupported(
                "dimension labels cannot be assigned to a view",
            )),
        }
    }

    /// Deep equality: same shape, same labels and same values.
    pub fn equals(&self, a: ArrayId, b: ArrayId) -> Result<bool> {
        if a == b {
            return Ok(true);
        }
        Ok(self.shape(a)? == self.shape(b)?
            && self.labels(a)? == self.labels(b)?
            && self.values(a)? == self.values(b)?)
    }
}
