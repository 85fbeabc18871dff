use bart_ndarray::{rawarray, ArrayStore, BartDim, BartError, Complex32};
use tempfile::TempDir;

#[test]
fn test_save_and_load_labeled_array() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kspace.ra");

    let mut store = ArrayStore::new();
    let values = (0..24)
        .map(|i| Complex32::new(i as f32, -0.5 * i as f32))
        .collect();
    let a = store.from_values(&[4, 3, 2], values).unwrap();
    store
        .set_labels(a, &[BartDim::Coil, BartDim::Read, BartDim::Phase1])
        .unwrap();

    rawarray::save(&mut store, a, &path).unwrap();
    assert_eq!(store.live_count(), 1);

    let loaded = rawarray::load(&path).unwrap();
    // stored in BART order: READ, PHS1, PHS2, COIL
    assert_eq!(loaded.shape(), &[3, 2, 1, 4]);
    assert_eq!(loaded.labels(), None);
    assert_eq!(
        loaded.get(&[2, 1, 0, 3]).unwrap(),
        store.get(a, &[3, 2, 1]).unwrap()
    );

    let file_len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(file_len, 8 + 5 * 8 + 4 * 8 + 24 * 8);
}

#[test]
fn test_save_slice_view() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("row.ra");

    let mut store = ArrayStore::new();
    let a = store.zeros(&[3, 4]).unwrap();
    store
        .fill_using_cartesian_indices(a, |idx| Complex32::new(idx[0] as f32, idx[1] as f32))
        .unwrap();
    let row = store.slice_str(a, &["1", "::-1"]).unwrap();
    rawarray::save(&mut store, row, &path).unwrap();

    let loaded = rawarray::load(&path).unwrap();
    assert_eq!(loaded.shape(), &[4]);
    assert_eq!(loaded.as_slice()[0], Complex32::new(1.0, 3.0));
    assert_eq!(loaded.as_slice()[3], Complex32::new(1.0, 0.0));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        rawarray::load(dir.path().join("missing.ra")),
        Err(BartError::Io(_))
    ));
}

#[test]
fn test_load_garbage_is_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.ra");
    std::fs::write(&path, [0u8; 64]).unwrap();
    assert!(matches!(
        rawarray::load(&path),
        Err(BartError::Format(_))
    ));
}
