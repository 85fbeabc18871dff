//! Complex-valued n-dimensional arrays with aliasing views, prepared for BART.
//!
//! This crate provides a single-precision complex array engine whose views
//! (slice, permute, reshape, mask) alias the storage of their parent instead of
//! copying it, plus the dimension remapping needed to hand arrays to the
//! [BART](https://mrirecon.github.io/bart/) toolbox, whose commands expect a fixed
//! positional layout of 16 dimensions.
//!
//! # Core Types
//!
//! - [`ArrayStore`]: Arena that owns every dense buffer and every view record
//! - [`ArrayId`]: Copyable handle to an array or view inside a store
//! - [`DenseArray`]: Owned, contiguous row-major complex buffer with a shape
//! - [`Sel`]: Per-dimension slice selector (single index or strided range)
//! - [`BartDim`]: The 16 canonical BART dimension labels
//!
//! # Views
//!
//! Views are records in the store that point at a parent id. Reads and writes
//! through a view resolve down the parent chain to the dense buffer, so writes
//! through any view are visible through the parent and through every sibling.
//! A view that would be a no-op returns the parent id itself:
//!
//! ```rust
//! use bart_ndarray::{ArrayStore, Sel};
//!
//! let mut store = ArrayStore::new();
//! let a = store.zeros(&[4, 5, 3]).unwrap();
//!
//! // Full-range slices, identity permutations and same-shape reshapes collapse.
//! assert_eq!(store.slice(a, &[Sel::full(), Sel::range(0, 5), Sel::full()]).unwrap(), a);
//! assert_eq!(store.permute(a, &[0, 1, 2]).unwrap(), a);
//! assert_eq!(store.reshape(a, &[4, 5, 3]).unwrap(), a);
//!
//! // A real slice aliases the parent.
//! let s = store.slice(a, &[Sel::at(1), Sel::range(1, 4), Sel::full()]).unwrap();
//! assert_eq!(store.shape(s).unwrap(), &[3, 3]);
//! store.set(s, num_complex::Complex32::new(7.0, -7.0), &[0, 2]).unwrap();
//! assert_eq!(store.get(a, &[1, 1, 2]).unwrap(), num_complex::Complex32::new(7.0, -7.0));
//! ```
//!
//! # BART Layout
//!
//! - [`to_bart_layout`] / [`from_bart_layout`]: Permute + reshape between labeled
//!   and positional order
//! - [`marshal`]: 16-slot dims and little-endian payload for the toolkit boundary
//! - [`rawarray`]: The `.ra` container format
//! - [`MemoryRegistry`]: Named in-memory buffers (`*.mem`)
//!
//! # Parallelism
//!
//! With the `parallel` feature (default), reductions over arrays longer than
//! [`MIN_PARALLEL_LENGTH`] split recursively with `rayon::join`.

mod dense;
mod dims;
mod display;
pub mod marshal;
mod ops;
mod pod_complex;
pub mod rawarray;
mod reduce;
mod registry;
mod selector;
mod shape;
mod store;
mod threading;
mod view;

pub use num_complex::Complex32;

// ============================================================================
// Arrays and views
// ============================================================================
pub use dense::DenseArray;
pub use store::{ArrayId, ArrayStore};
pub use view::ViewKind;

// ============================================================================
// Slicing
// ============================================================================
pub use selector::{parse_selectors, Sel};

// ============================================================================
// Elementwise operations
// ============================================================================
pub use ops::Operand;

// ============================================================================
// Dimension labels and remapping
// ============================================================================
pub use dims::{from_bart_layout, to_bart_layout, BartDim};

// ============================================================================
// Toolkit boundary
// ============================================================================
pub use marshal::MarshaledArray;
pub use registry::MemoryRegistry;

// Pod complex utilities
pub use pod_complex::PodComplexF32;

// ============================================================================
// Constants
// ============================================================================

/// Number of positional dimensions BART works with.
pub const BART_DIMS: usize = 16;

/// Minimum number of elements before reductions are split across threads.
///
/// Only used with the `parallel` feature.
pub const MIN_PARALLEL_LENGTH: usize = 1 << 15;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while building, indexing or converting arrays.
#[derive(Debug, thiserror::Error)]
pub enum BartError {
    /// Linear index outside `[-length, length)`.
    #[error("linear index {index} is out of bounds for array of length {length}")]
    LinearBounds { length: usize, index: isize },

    /// Cartesian index outside the shape.
    #[error(
        "index {} is out of bounds for shape {}",
        shape::format_indices(.indices),
        shape::format_shape(.shape)
    )]
    CartesianBounds {
        shape: Vec<usize>,
        indices: Vec<isize>,
    },

    /// Slice selector outside the extent of its axis.
    #[error("selector value {value} is out of bounds for axis {axis} of extent {extent}")]
    SliceBounds {
        axis: usize,
        extent: usize,
        value: isize,
    },

    /// Number of indices or selectors does not match the number of dimensions.
    #[error("dimension mismatch: expected {expected} indices, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Shapes are incompatible for the operation.
    #[error(
        "shape mismatch: {} vs {}",
        shape::format_shape(.0),
        shape::format_shape(.1)
    )]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Permutation length does not match the number of dimensions.
    #[error(
        "permutation {:?} does not match shape {}",
        .permutation,
        shape::format_shape(.shape)
    )]
    PermutatorShapeMismatch {
        permutation: Vec<usize>,
        shape: Vec<usize>,
    },

    /// Permutation is not a bijection over `0..ndim`.
    #[error(
        "permutation {:?} is not a valid permutation for shape {}",
        .permutation,
        shape::format_shape(.shape)
    )]
    InvalidPermutator {
        permutation: Vec<usize>,
        shape: Vec<usize>,
    },

    /// Invalid axis index for the given array rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// The same axis was named twice.
    #[error("axis {0} is given more than once")]
    DuplicateAxis(usize),

    /// Only singleton axes can be dropped from a view.
    #[error("axis {axis} has extent {extent} and cannot be dropped")]
    NotSingleton { axis: usize, extent: usize },

    /// The operation would leave an array without dimensions.
    #[error("all dimensions would be dropped")]
    AllDimsDropped,

    /// Arrays need at least one dimension.
    #[error("shape must have at least one dimension")]
    EmptyShape,

    /// Malformed slice expression.
    #[error("invalid slice expression: {0}")]
    InvalidSlice(String),

    /// Number of labels differs from the number of dimensions.
    #[error("got {actual} dimension labels for an array with {expected} dimensions")]
    LabelCountMismatch { expected: usize, actual: usize },

    /// The same label was assigned twice.
    #[error("dimension label {0} is assigned more than once")]
    DuplicateLabel(BartDim),

    /// A requested label is not assigned to any dimension.
    #[error("dimension label {0} is not assigned to this array")]
    UnknownLabel(BartDim),

    /// Operation is not supported for this kind of array.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The id does not refer to a live array in this store.
    #[error("unknown or released array {0:?}")]
    UnknownArray(ArrayId),

    /// Array cannot be released while views still point at it.
    #[error("array {id:?} is still referenced by {views} view(s)")]
    InUse { id: ArrayId, views: usize },

    /// The element count of a shape does not fit in `usize`.
    #[error("shape {} has too many elements", shape::format_shape(.0))]
    LengthOverflow(Vec<usize>),

    /// Norm order must be non-negative.
    #[error("invalid norm order {0}")]
    InvalidNorm(f64),

    /// BART supports at most [`BART_DIMS`] dimensions.
    #[error("{0} dimensions exceed the BART limit of 16")]
    TooManyDims(usize),

    /// Payload length does not match the shape.
    #[error("payload of {actual} bytes does not match {expected} expected bytes")]
    PayloadLength { expected: usize, actual: usize },

    /// Container header or layout is not the supported format.
    #[error("unsupported container format: {0}")]
    Format(String),

    /// Name does not carry the required extension.
    #[error("invalid name {name:?}: must end with {extension:?}")]
    InvalidName {
        name: String,
        extension: &'static str,
    },

    /// No buffer is registered under this name.
    #[error("no buffer registered under {0:?}")]
    NotRegistered(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for array operations.
pub type Result<T> = std::result::Result<T, BartError>;
