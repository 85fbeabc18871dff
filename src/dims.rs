//! BART dimension labels and the remapping between labeled and positional layout.
//!
//! BART addresses every array through 16 fixed positional dimensions. An array
//! whose axes carry [`BartDim`] labels can be in any axis order; the remapper
//! turns it into BART's order with a permute view (axes sorted by label id) and
//! a reshape view (singleton slots for every label the array does not use).

use std::fmt;

use tracing::debug;

use crate::store::{ArrayId, ArrayStore};
use crate::view::invert_permutation;
use crate::{BartError, Result, BART_DIMS};

/// The 16 canonical BART dimensions, in positional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BartDim {
    Read = 0,
    Phase1 = 1,
    Phase2 = 2,
    Coil = 3,
    Maps = 4,
    Te = 5,
    Coeff = 6,
    Coeff2 = 7,
    Iter = 8,
    Cshift = 9,
    Time = 10,
    Time2 = 11,
    Level = 12,
    Slice = 13,
    Avg = 14,
    Batch = 15,
}

impl BartDim {
    pub const ALL: [BartDim; BART_DIMS] = [
        BartDim::Read,
        BartDim::Phase1,
        BartDim::Phase2,
        BartDim::Coil,
        BartDim::Maps,
        BartDim::Te,
        BartDim::Coeff,
        BartDim::Coeff2,
        BartDim::Iter,
        BartDim::Cshift,
        BartDim::Time,
        BartDim::Time2,
        BartDim::Level,
        BartDim::Slice,
        BartDim::Avg,
        BartDim::Batch,
    ];

    /// Positional slot of this dimension in BART's layout.
    #[inline]
    pub fn id(self) -> usize {
        self as usize
    }

    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    /// BART's name for the dimension (`READ`, `PHS1`, ...).
    pub fn name(self) -> &'static str {
        match self {
            BartDim::Read => "READ",
            BartDim::Phase1 => "PHS1",
            BartDim::Phase2 => "PHS2",
            BartDim::Coil => "COIL",
            BartDim::Maps => "MAPS",
            BartDim::Te => "TE",
            BartDim::Coeff => "COEFF",
            BartDim::Coeff2 => "COEFF2",
            BartDim::Iter => "ITER",
            BartDim::Cshift => "CSHIFT",
            BartDim::Time => "TIME",
            BartDim::Time2 => "TIME2",
            BartDim::Level => "LEVEL",
            BartDim::Slice => "SLICE",
            BartDim::Avg => "AVG",
            BartDim::Batch => "BATCH",
        }
    }
}

impl fmt::Display for BartDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check label count against `ndim` and that no label repeats.
pub(crate) fn validate_labels(labels: &[BartDim], ndim: usize) -> Result<()> {
    if labels.len() != ndim {
        return Err(BartError::LabelCountMismatch {
            expected: ndim,
            actual: labels.len(),
        });
    }
    let mut seen = 0u16;
    for &label in labels {
        let bit = 1u16 << label.id();
        if seen & bit != 0 {
            return Err(BartError::DuplicateLabel(label));
        }
        seen |= bit;
    }
    Ok(())
}

/// Axes of a labeled array, ordered by ascending label id.
fn sorted_axes(labels: &[BartDim]) -> Vec<usize> {
    let mut axes: Vec<usize> = (0..labels.len()).collect();
    axes.sort_by_key(|&axis| labels[axis].id());
    axes
}

/// View of `id` in BART's positional layout.
///
/// The axes are permuted into ascending label order and padded with singleton
/// slots up to the largest label id. Arrays without labels are returned
/// unchanged.
///
/// # Example
///
/// ```rust
/// use bart_ndarray::{to_bart_layout, ArrayStore, BartDim};
///
/// let mut store = ArrayStore::new();
/// let a = store.zeros(&[64, 128]).unwrap();
/// store.set_labels(a, &[BartDim::Time, BartDim::Read]).unwrap();
///
/// let bart = to_bart_layout(&mut store, a).unwrap();
/// assert_eq!(store.shape(bart).unwrap(), &[128, 1, 1, 1, 1, 1, 1, 1, 1, 1, 64]);
/// ```
pub fn to_bart_layout(store: &mut ArrayStore, id: ArrayId) -> Result<ArrayId> {
    let Some(labels) = store.labels(id)? else {
        debug!(?id, "no dimension labels, keeping positional order");
        return Ok(id);
    };
    let shape = store.shape(id)?.to_vec();
    let perm = sorted_axes(&labels);
    let permuted = store.permute(id, &perm)?;

    let max_slot = labels.iter().map(|l| l.id()).max().unwrap_or(0);
    let mut target = vec![1; max_slot + 1];
    for &axis in &perm {
        target[labels[axis].id()] = shape[axis];
    }
    store.reshape(permuted, &target)
}

/// Inverse of [`to_bart_layout`]: view of a BART-layout array `id` with one
/// axis per entry of `labels`, in that order.
///
/// Slots not named by `labels` must be singletons; missing trailing slots count
/// as singletons.
pub fn from_bart_layout(store: &mut ArrayStore, id: ArrayId, labels: &[BartDim]) -> Result<ArrayId> {
    if labels.is_empty() {
        return Err(BartError::EmptyShape);
    }
    validate_labels(labels, labels.len())?;
    let shape = store.shape(id)?.to_vec();
    let sorted = sorted_axes(labels);
    let compact_shape: Vec<usize> = sorted
        .iter()
        .map(|&axis| shape.get(labels[axis].id()).copied().unwrap_or(1))
        .collect();

    let stray = shape
        .iter()
        .enumerate()
        .any(|(slot, &extent)| extent != 1 && labels.iter().all(|l| l.id() != slot));
    if stray {
        return Err(BartError::ShapeMismatch(shape, compact_shape));
    }

    let compact = store.reshape(id, &compact_shape)?;
    store.permute(compact, &invert_permutation(&sorted))
}

impl ArrayStore {
    /// View with the axes labeled `selected`, in that order.
    ///
    /// Every other axis must be a singleton and is dropped.
    pub fn select_and_reorder_labels(&mut self, id: ArrayId, selected: &[BartDim]) -> Result<ArrayId> {
        validate_labels(selected, selected.len())?;
        let labels = self.require_labels(id)?;
        let position = |labels: &[BartDim], label: BartDim| {
            labels
                .iter()
                .position(|&l| l == label)
                .ok_or(BartError::UnknownLabel(label))
        };
        let axes = selected
            .iter()
            .map(|&label| position(&labels, label))
            .collect::<Result<Vec<_>>>()?;
        let view = self.select_dims(id, &axes)?;

        let view_labels = self.require_labels(view)?;
        let perm = selected
            .iter()
            .map(|&label| position(&view_labels, label))
            .collect::<Result<Vec<_>>>()?;
        self.permute(view, &perm)
    }
}
