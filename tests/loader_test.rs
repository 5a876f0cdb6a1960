use std::fs;

use dmd_prep::{open_dataset, Config, PrepError};
use tempfile::TempDir;

#[test]
fn test_unsupported_format_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("x.txt"), "not a dataset").unwrap();

    let config = Config::with_dirs(dir.path(), dir.path());
    let result = open_dataset("x.txt", &config);
    assert!(matches!(result, Err(PrepError::UnsupportedFormat(_))));
}

#[test]
fn test_no_fallback_between_formats() {
    // A zarr store renamed to a bare directory name is not probed; dispatch
    // is strictly by extension.
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("renamed_store");
    fs::create_dir_all(&store).unwrap();
    fs::write(store.join(".zgroup"), r#"{"zarr_format": 2}"#).unwrap();

    let config = Config::with_dirs(dir.path(), dir.path());
    let result = open_dataset("renamed_store", &config);
    assert!(matches!(result, Err(PrepError::UnsupportedFormat(_))));
}

#[test]
fn test_missing_zarr_store_reported() {
    let dir = TempDir::new().unwrap();
    let config = Config::with_dirs(dir.path(), dir.path());
    let result = open_dataset("missing.zarr", &config);
    assert!(matches!(result, Err(PrepError::ZarrStore(_))));
}

#[test]
fn test_zarr_directory_without_group_marker_rejected() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("bad.zarr")).unwrap();

    let config = Config::with_dirs(dir.path(), dir.path());
    let result = open_dataset("bad.zarr", &config);
    assert!(matches!(result, Err(PrepError::ZarrStore(_))));
}

#[test]
fn test_compressed_zarr_array_rejected() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("compressed.zarr");
    fs::create_dir_all(store.join("temperature")).unwrap();
    fs::write(store.join(".zgroup"), r#"{"zarr_format": 2}"#).unwrap();
    fs::write(
        store.join("temperature/.zarray"),
        r#"{
            "shape": [2],
            "chunks": [2],
            "dtype": "<f8",
            "compressor": {"id": "blosc"},
            "fill_value": null,
            "filters": null,
            "order": "C",
            "zarr_format": 2
        }"#,
    )
    .unwrap();
    fs::write(
        store.join("temperature/.zattrs"),
        r#"{"_ARRAY_DIMENSIONS": ["time"]}"#,
    )
    .unwrap();

    let config = Config::with_dirs(dir.path(), dir.path());
    let result = open_dataset("compressed.zarr", &config);
    assert!(matches!(result, Err(PrepError::ZarrStore(_))));
}
