//! Property-based tests for view composition, indexing and remapping.
//!
//! Run with: cargo test --test properties

use approx::relative_eq;
use bart_ndarray::{from_bart_layout, to_bart_layout, ArrayId, ArrayStore, BartDim, Complex32, Sel};
use proptest::prelude::*;
use proptest::sample::subsequence;

// ============================================================================
// Strategies
// ============================================================================

fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=5, 1..=4)
}

/// A shape together with a permutation of its axes.
fn shape_and_perm() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    shape_strategy().prop_flat_map(|shape| {
        let axes: Vec<usize> = (0..shape.len()).collect();
        (Just(shape), Just(axes).prop_shuffle())
    })
}

/// A shape together with distinct labels in arbitrary order.
fn shape_and_labels() -> impl Strategy<Value = (Vec<usize>, Vec<BartDim>)> {
    shape_strategy().prop_flat_map(|shape| {
        let labels = subsequence(BartDim::ALL.to_vec(), shape.len()).prop_shuffle();
        (Just(shape), labels)
    })
}

fn iota(store: &mut ArrayStore, shape: &[usize]) -> ArrayId {
    let len: usize = shape.iter().product();
    let values = (0..len)
        .map(|i| Complex32::new(i as f32, -(i as f32) * 0.5))
        .collect();
    store.from_values(shape, values).unwrap()
}

fn inverse(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inv[p] = i;
    }
    inv
}

// ============================================================================
// View composition
// ============================================================================

proptest! {
    #[test]
    fn prop_permute_then_inverse_is_identity((shape, perm) in shape_and_perm()) {
        let mut store = ArrayStore::new();
        let a = iota(&mut store, &shape);
        let p = store.permute(a, &perm).unwrap();
        prop_assert_eq!(store.permute(p, &inverse(&perm)).unwrap(), a);
    }

    #[test]
    fn prop_permuted_elements_follow_axes((shape, perm) in shape_and_perm(), seed in 0usize..1000) {
        let mut store = ArrayStore::new();
        let a = iota(&mut store, &shape);
        let p = store.permute(a, &perm).unwrap();
        let p_shape = store.shape(p).unwrap().to_vec();

        let len: usize = shape.iter().product();
        let mut rest = seed % len;
        let mut coords = vec![0isize; p_shape.len()];
        for axis in (0..p_shape.len()).rev() {
            coords[axis] = (rest % p_shape[axis]) as isize;
            rest /= p_shape[axis];
        }
        let mut parent = vec![0isize; shape.len()];
        for (axis, &source) in perm.iter().enumerate() {
            parent[source] = coords[axis];
        }
        prop_assert_eq!(store.get(p, &coords).unwrap(), store.get(a, &parent).unwrap());
    }

    #[test]
    fn prop_flatten_and_back_is_identity(shape in shape_strategy()) {
        let mut store = ArrayStore::new();
        let a = iota(&mut store, &shape);
        let flat = store.flatten(a).unwrap();
        prop_assert_eq!(store.reshape(flat, &shape).unwrap(), a);
        prop_assert_eq!(store.values(flat).unwrap(), store.values(a).unwrap());
    }

    #[test]
    fn prop_slice_matches_stepped_range(
        extent in 1usize..12,
        start in 0usize..12,
        stop in 0usize..12,
        step in 1isize..4,
    ) {
        let start = start.min(extent);
        let stop = stop.min(extent);
        let mut store = ArrayStore::new();
        let a = iota(&mut store, &[extent]);
        let expected: Vec<Complex32> = (start..stop)
            .step_by(step as usize)
            .map(|i| store.get(a, &[i as isize]).unwrap())
            .collect();

        let sel = Sel::stepped(Some(start as isize), Some(stop as isize), step);
        match store.slice(a, &[sel]) {
            Ok(view) => prop_assert_eq!(store.values(view).unwrap(), expected),
            Err(_) => prop_assert!(expected.is_empty()),
        }
    }

    #[test]
    fn prop_set_through_view_writes_parent((shape, perm) in shape_and_perm(), seed in 0usize..1000) {
        let mut store = ArrayStore::new();
        let a = iota(&mut store, &shape);
        let p = store.permute(a, &perm).unwrap();
        let flat = store.flatten(p).unwrap();
        let len = store.len(flat).unwrap();
        let i = (seed % len) as isize;

        let marker = Complex32::new(-1.0, 42.0);
        store.set(flat, marker, &[i]).unwrap();
        prop_assert_eq!(store.get(p, &[i]).unwrap(), marker);
        let hits = store.values(a).unwrap().iter().filter(|&&v| v == marker).count();
        prop_assert_eq!(hits, 1);
    }
}

// ============================================================================
// Reductions
// ============================================================================

proptest! {
    #[test]
    fn prop_two_norm_matches_sum_of_squares(
        values in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 1..64),
    ) {
        let mut store = ArrayStore::new();
        let data: Vec<Complex32> = values.iter().map(|&(re, im)| Complex32::new(re, im)).collect();
        let a = store.from_values(&[data.len()], data.clone()).unwrap();

        let expected = data
            .iter()
            .map(|v| v.norm_sqr() as f64)
            .sum::<f64>()
            .sqrt();
        let two = store.norm(a, 2.0).unwrap();
        prop_assert!(relative_eq!(two, expected, epsilon = 1e-3, max_relative = 1e-4));
        prop_assert!(store.norm(a, 1.0).unwrap() + 1e-3 >= two);
        prop_assert!(store.norm(a, f64::INFINITY).unwrap() <= two + 1e-3);
    }
}

// ============================================================================
// Remapping
// ============================================================================

proptest! {
    #[test]
    fn prop_bart_layout_round_trip((shape, labels) in shape_and_labels()) {
        let mut store = ArrayStore::new();
        let a = iota(&mut store, &shape);
        store.set_labels(a, &labels).unwrap();

        let bart = to_bart_layout(&mut store, a).unwrap();
        let bart_shape = store.shape(bart).unwrap().to_vec();
        let max_id = labels.iter().map(|l| l.id()).max().unwrap();
        prop_assert_eq!(bart_shape.len(), max_id + 1);
        for (axis, label) in labels.iter().enumerate() {
            prop_assert_eq!(bart_shape[label.id()], shape[axis]);
        }

        prop_assert_eq!(from_bart_layout(&mut store, bart, &labels).unwrap(), a);
    }
}
