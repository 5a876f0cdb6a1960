//! End-to-end pipeline test against a real NetCDF file:
//! load -> extract -> rehydrate -> persist -> reopen.

use std::path::Path;

use dmd_prep::grid::{LAT_DIM, LEVEL_DIM, LON_DIM, TIME_DIM};
use dmd_prep::{
    extract_field, open_dataset, rehydrate_field, Config, ExtractOptions, ZarrStoreWriter,
};
use tempfile::TempDir;

/// Write a small reanalysis-shaped file using the file's own alias names
/// ("lat", "lon") so loading also exercises canonicalization.
fn create_test_netcdf(path: &Path) {
    let mut file = netcdf::create(path).unwrap();

    file.add_attribute("title", "Test reanalysis slice").unwrap();

    file.add_dimension("time", 4).unwrap();
    file.add_dimension("level", 2).unwrap();
    file.add_dimension("lat", 6).unwrap();
    file.add_dimension("lon", 8).unwrap();

    {
        let mut var = file.add_variable::<f64>("time", &["time"]).unwrap();
        var.put_attribute("units", "hours since 2020-01-01 00:00:00")
            .unwrap();
        var.put_values(&[0.0, 22.0, 44.0, 66.0], ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f64>("level", &["level"]).unwrap();
        var.put_attribute("units", "hPa").unwrap();
        var.put_values(&[850.0, 500.0], ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f64>("lat", &["lat"]).unwrap();
        var.put_attribute("units", "degrees_north").unwrap();
        var.put_values(&[20.0, 15.0, 10.0, 5.0, 0.0, -5.0], ..)
            .unwrap();
    }
    {
        let mut var = file.add_variable::<f64>("lon", &["lon"]).unwrap();
        var.put_attribute("units", "degrees_east").unwrap();
        var.put_values(
            &[100.0, 105.0, 110.0, 115.0, 120.0, 125.0, 130.0, 135.0],
            ..,
        )
        .unwrap();
    }
    {
        let mut var = file
            .add_variable::<f64>("temperature", &["time", "level", "lat", "lon"])
            .unwrap();
        var.put_attribute("units", "K").unwrap();
        var.put_attribute("long_name", "air temperature").unwrap();

        let mut values = Vec::with_capacity(4 * 2 * 6 * 8);
        for t in 0..4 {
            for k in 0..2 {
                for j in 0..6 {
                    for i in 0..8 {
                        values.push((t * 1000 + k * 100 + j * 10 + i) as f64);
                    }
                }
            }
        }
        var.put_values(&values, ..).unwrap();
    }
}

#[test]
fn test_load_netcdf_with_canonical_names() {
    let dir = TempDir::new().unwrap();
    create_test_netcdf(&dir.path().join("era5_slice.nc"));

    let config = Config::with_dirs(dir.path(), dir.path());
    let ds = open_dataset("era5_slice.nc", &config).unwrap();

    assert!(ds.has_variable("temperature"));
    let var = ds.variable("temperature").unwrap();
    assert_eq!(
        var.dims,
        vec![
            TIME_DIM.to_string(),
            LEVEL_DIM.to_string(),
            LAT_DIM.to_string(),
            LON_DIM.to_string()
        ]
    );
    assert_eq!(var.data.shape(), &[4, 2, 6, 8]);

    // Alias coordinate names arrive canonicalized with attributes intact.
    let lat = ds.coord(LAT_DIM).unwrap();
    assert_eq!(lat.len(), 6);
    assert_eq!(
        lat.attrs.get("units").and_then(|a| a.as_str()),
        Some("degrees_north")
    );
}

#[test]
fn test_full_pipeline_against_netcdf() {
    let dir = TempDir::new().unwrap();
    create_test_netcdf(&dir.path().join("era5_slice.nc"));

    let config = Config::with_dirs(dir.path(), dir.path());
    let ds = open_dataset("era5_slice.nc", &config).unwrap();

    let opts = ExtractOptions {
        lat_range: Some((-20.0, 20.0)),
        lon_range: Some((100.0, 140.0)),
        downsample: 2,
        ..Default::default()
    };
    let field = extract_field(&ds, "temperature", &opts).unwrap();

    // The requested ranges intersect the grid, so no axis may collapse.
    assert_eq!(field.data().ndim(), 3);
    assert!(field.data().shape().iter().all(|&len| len > 0));
    let lats = &field.coord(LAT_DIM).unwrap().values;
    assert!(lats.iter().all(|&v| (-20.0..=20.0).contains(&v)));
    let lons = &field.coord(LON_DIM).unwrap().values;
    assert!(lons.iter().all(|&v| (100.0..=140.0).contains(&v)));

    let array = rehydrate_field(field).unwrap().with_name("temperature");
    let writer = ZarrStoreWriter::new(&config);
    let store = writer.persist(&array, "era5_slice").unwrap();

    assert_eq!(
        store.file_name().unwrap().to_str().unwrap(),
        "2020-01-01_2020-01-03_era5_slice.zarr"
    );

    let reopened = open_dataset(store.file_name().unwrap().to_str().unwrap(), &config).unwrap();
    assert!(reopened.has_variable("temperature"));
    assert_eq!(
        reopened.variable("temperature").unwrap().data,
        array.data().view().into_dyn()
    );
}

#[test]
fn test_netcdf_round_trip_matches_first_level() {
    let dir = TempDir::new().unwrap();
    create_test_netcdf(&dir.path().join("era5_slice.nc"));

    let config = Config::with_dirs(dir.path(), dir.path());
    let ds = open_dataset("era5_slice.nc", &config).unwrap();

    let field = extract_field(&ds, "temperature", &ExtractOptions::default()).unwrap();
    let array = rehydrate_field(field).unwrap();

    let var = ds.variable("temperature").unwrap();
    let expected = var.data.index_axis(ndarray::Axis(1), 0);
    assert_eq!(array.data().view().into_dyn(), expected);
}
