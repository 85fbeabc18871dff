//! Marshalling arrays to and from BART's native representation.
//!
//! BART expects a 16-slot dimension vector (unused trailing slots are 1) and a
//! flat buffer of little-endian interleaved `f32` pairs in BART's order.
//! Labeled arrays are remapped with [`to_bart_layout`] on the way out; callers
//! can ask for the inverse remapping on the way in.

use tracing::trace;

use crate::dense::DenseArray;
use crate::dims::{from_bart_layout, to_bart_layout, BartDim};
use crate::pod_complex::{complex_from_le_bytes, complex_to_le_bytes, ELEMENT_BYTES};
use crate::shape::{checked_length, length};
use crate::store::{ArrayId, ArrayStore};
use crate::{BartError, Result, BART_DIMS};

/// Dimensions and payload in BART's layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarshaledArray {
    pub dims: [usize; BART_DIMS],
    /// Little-endian interleaved `f32` real/imaginary pairs.
    pub data: Vec<u8>,
}

impl MarshaledArray {
    /// Number of complex elements described by `dims`.
    pub fn len(&self) -> usize {
        length(&self.dims)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shape and little-endian payload of `id` in BART order.
///
/// Views created for the remapping are released before returning.
pub(crate) fn bart_parts(store: &mut ArrayStore, id: ArrayId) -> Result<(Vec<usize>, Vec<u8>)> {
    let remapped = to_bart_layout(store, id)?;
    let shape = store.shape(remapped)?.to_vec();
    let values = store.values(remapped);
    store.release_temporaries(remapped, Some(id))?;
    let bytes = complex_to_le_bytes(&values?);
    trace!(?id, ?shape, bytes = bytes.len(), "marshalled array");
    Ok((shape, bytes))
}

/// Export `id` as a 16-slot dimension vector and payload.
///
/// Fails with [`BartError::TooManyDims`] when the BART layout needs more than
/// 16 dimensions.
pub fn marshal_out(store: &mut ArrayStore, id: ArrayId) -> Result<MarshaledArray> {
    let (shape, data) = bart_parts(store, id)?;
    if shape.len() > BART_DIMS {
        return Err(BartError::TooManyDims(shape.len()));
    }
    let mut dims = [1usize; BART_DIMS];
    dims[..shape.len()].copy_from_slice(&shape);
    Ok(MarshaledArray { dims, data })
}

/// Decode a payload into a dense array of shape `dims`.
pub(crate) fn decode(dims: &[usize], bytes: &[u8]) -> Result<DenseArray> {
    if dims.len() > BART_DIMS {
        return Err(BartError::TooManyDims(dims.len()));
    }
    let expected = checked_length(dims)
        .and_then(|len| len.checked_mul(ELEMENT_BYTES))
        .ok_or_else(|| BartError::Format(format!("dimensions {dims:?} overflow")))?;
    if bytes.len() != expected {
        return Err(BartError::PayloadLength {
            expected,
            actual: bytes.len(),
        });
    }
    DenseArray::from_vec(dims, complex_from_le_bytes(bytes))
}

/// Import a BART payload as a new dense array.
///
/// With `labels`, the BART layout is folded back into one axis per label (in
/// the given order) and the result carries those labels. Without, the array
/// keeps `dims` as its shape.
pub fn marshal_in(
    store: &mut ArrayStore,
    dims: &[usize],
    bytes: &[u8],
    labels: Option<&[BartDim]>,
) -> Result<ArrayId> {
    let array = decode(dims, bytes)?;
    trace!(?dims, bytes = bytes.len(), "unmarshalled array");
    let raw = store.insert(array);
    let Some(labels) = labels else {
        return Ok(raw);
    };

    let folded = match from_bart_layout(store, raw, labels) {
        Ok(view) => view,
        Err(e) => {
            store.release(raw)?;
            return Err(e);
        }
    };
    let mut result = store.to_dense(folded)?;
    store.release_temporaries(folded, None)?;
    result.set_labels(labels)?;
    Ok(store.insert(result))
}
