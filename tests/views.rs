use approx::assert_relative_eq;
use bart_ndarray::{ArrayId, ArrayStore, BartError, Complex32, Operand, Sel, ViewKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn c(re: f32, im: f32) -> Complex32 {
    Complex32::new(re, im)
}

/// 4 × 5 × 3 array filled with its linear indices.
fn make_iota(store: &mut ArrayStore) -> ArrayId {
    let a = store.zeros(&[4, 5, 3]).unwrap();
    store
        .fill_using_linear_indices(a, |i| c(i as f32, 0.0))
        .unwrap();
    a
}

fn make_random(store: &mut ArrayStore, shape: &[usize], rng: &mut StdRng) -> ArrayId {
    let len: usize = shape.iter().product();
    let values = (0..len)
        .map(|_| c(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    store.from_values(shape, values).unwrap()
}

// ============================================================================
// Identity collapse
// ============================================================================

#[test]
fn test_identity_views_return_parent() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let live = store.live_count();

    assert_eq!(
        store.slice(a, &[Sel::full(), Sel::full(), Sel::full()]).unwrap(),
        a
    );
    assert_eq!(store.slice_str(a, &[":", "0:5", "0:3"]).unwrap(), a);
    assert_eq!(store.permute(a, &[0, 1, 2]).unwrap(), a);
    assert_eq!(store.reshape(a, &[4, 5, 3]).unwrap(), a);
    assert_eq!(store.live_count(), live);

    let flat = store.mask(a, |_| true).unwrap();
    assert_eq!(store.view_kind(flat).unwrap(), Some(ViewKind::Reshape));
    assert_eq!(store.mask(flat, |_| true).unwrap(), flat);
}

#[test]
fn test_identity_collapse_on_views() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let s = store.slice_str(a, &["1:3", ":", "2"]).unwrap();
    assert_eq!(store.slice_str(s, &[":", ":"]).unwrap(), s);
    assert_eq!(store.permute(s, &[0, 1]).unwrap(), s);
    assert_eq!(store.reshape(s, &[2, 5]).unwrap(), s);
}

// ============================================================================
// Index round-trip and aliasing
// ============================================================================

#[test]
fn test_set_get_round_trip_through_views() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let s = store.slice_str(a, &["1:4", "::2", ":"]).unwrap();
    let p = store.permute(s, &[2, 0, 1]).unwrap();
    let r = store.reshape(p, &[9, 3]).unwrap();
    let m = store.mask(r, |v| v.re > 30.0).unwrap();

    for id in [s, p, r, m] {
        let len = store.len(id).unwrap();
        for i in 0..len {
            let v = c(i as f32, -(i as f32) - 1.0);
            store.set(id, v, &[i as isize]).unwrap();
            assert_eq!(store.get(id, &[i as isize]).unwrap(), v);
        }
    }
}

#[test]
fn test_writes_visible_through_parent_and_siblings() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let s1 = store.slice_str(a, &["2", ":", ":"]).unwrap();
    let s2 = store.slice_str(a, &["1:3", "1:4", "1"]).unwrap();

    store.set(s1, c(-5.0, 5.0), &[2, 1]).unwrap();
    assert_eq!(store.get(a, &[2, 2, 1]).unwrap(), c(-5.0, 5.0));
    assert_eq!(store.get(s2, &[1, 1]).unwrap(), c(-5.0, 5.0));

    store.set(a, c(7.0, 0.0), &[1, 3, 1]).unwrap();
    assert_eq!(store.get(s2, &[0, 2]).unwrap(), c(7.0, 0.0));
}

#[test]
fn test_negative_indexing_matches_positive() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    assert_eq!(store.get(a, &[-1]).unwrap(), store.get(a, &[59]).unwrap());
    assert_eq!(
        store.get(a, &[-1, 0, -3]).unwrap(),
        store.get(a, &[3, 0, 0]).unwrap()
    );
    let p = store.permute(a, &[2, 1, 0]).unwrap();
    assert_eq!(
        store.get(p, &[-1, -1, -1]).unwrap(),
        store.get(a, &[3, 4, 2]).unwrap()
    );
}

#[test]
fn test_bounds_errors_report_length_and_index() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let err = store.get(a, &[60]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "linear index 60 is out of bounds for array of length 60"
    );
    assert!(matches!(
        store.get(a, &[-61]),
        Err(BartError::LinearBounds {
            length: 60,
            index: -61
        })
    ));
    assert!(matches!(
        store.set(a, c(0.0, 0.0), &[0, 5, 0]),
        Err(BartError::CartesianBounds { .. })
    ));
}

// ============================================================================
// Composition rules
// ============================================================================

#[test]
fn test_permute_inverse_returns_same_id() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let p = store.permute(a, &[1, 2, 0]).unwrap();
    assert_eq!(store.permute(p, &[2, 0, 1]).unwrap(), a);
}

#[test]
fn test_reshape_round_trip_returns_same_id() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let r = store.reshape(a, &[6, 10]).unwrap();
    assert_eq!(store.reshape(r, &[4, 5, 3]).unwrap(), a);
}

#[test]
fn test_mask_odd_linear_indices() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let odd = store
        .mask_with_linear_indices(a, |_, i| i % 2 == 1)
        .unwrap();
    assert_eq!(store.shape(odd).unwrap(), &[30]);
    for i in 0..30 {
        assert_eq!(
            store.get(odd, &[i as isize]).unwrap(),
            c((2 * i + 1) as f32, 0.0)
        );
    }
}

#[test]
fn test_mask_write_through() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let big = store.mask(a, |v| v.re >= 50.0).unwrap();
    store.fill(big, c(0.0, 0.0)).unwrap();
    assert_relative_eq!(store.sum(a).unwrap().re, (0..50).sum::<i32>() as f32);
}

// ============================================================================
// Elementwise laws
// ============================================================================

#[test]
fn test_add_then_subtract_is_identity() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut store = ArrayStore::new();
    let a = make_random(&mut store, &[4, 5, 3], &mut rng);
    let b = make_random(&mut store, &[4, 5, 3], &mut rng);
    let sum = store.add(a, &[Operand::Array(b)]).unwrap();
    let back = store.subtract(sum, &[Operand::Array(b)]).unwrap();
    let expected = store.values(a).unwrap();
    for (x, y) in store.values(back).unwrap().iter().zip(&expected) {
        assert_relative_eq!(x.re, y.re, epsilon = 1e-5);
        assert_relative_eq!(x.im, y.im, epsilon = 1e-5);
    }
}

#[test]
fn test_divide_by_self_is_one_or_nan() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut store = ArrayStore::new();
    let a = make_random(&mut store, &[3, 4], &mut rng);
    store.set(a, c(0.0, 0.0), &[1, 2]).unwrap();
    let q = store.divide(a, &[a.into()]).unwrap();
    for (i, v) in store.values(q).unwrap().into_iter().enumerate() {
        if i == 6 {
            assert!(v.re.is_nan() && v.im.is_nan());
        } else {
            assert_relative_eq!(v.re, 1.0, epsilon = 1e-5);
            assert_relative_eq!(v.im, 0.0, epsilon = 1e-5);
        }
    }
}

#[test]
fn test_arithmetic_on_views_keeps_view_shape() {
    let mut store = ArrayStore::new();
    let a = make_iota(&mut store);
    let t = store.slice_str(a, &["0", ":", ":"]).unwrap();
    let doubled = store.multiply(t, &[2.0f32.into()]).unwrap();
    assert!(!store.is_view(doubled).unwrap());
    assert_eq!(store.shape(doubled).unwrap(), &[5, 3]);
    assert_eq!(store.get(doubled, &[4, 2]).unwrap(), c(28.0, 0.0));
}
