//! Shared in-memory dataset fixture for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use ndarray::{Array1, ArrayD};

use dmd_prep::grid::{
    AttributeValue, Attributes, CoordVector, GriddedDataset, GridVariable, LAT_DIM, LEVEL_DIM,
    LON_DIM, TIME_DIM,
};

pub const TIME_UNITS: &str = "hours since 2020-01-01 00:00:00";

/// Sample value at `(t, k, j, i)` in the fixture's temperature variable.
pub fn sample(t: usize, k: usize, j: usize, i: usize) -> f64 {
    (t * 1000 + k * 100 + j * 10 + i) as f64
}

/// A small reanalysis-shaped dataset:
/// time(4) x level(2) x latitude(6, descending) x longitude(8).
///
/// The time coordinate spans 2020-01-01T00 through 2020-01-03T18 and the
/// first level value is 850, so positional and by-value level selection are
/// distinguishable.
pub fn make_test_dataset() -> GriddedDataset {
    let mut coords = HashMap::new();

    let mut time_attrs = Attributes::new();
    time_attrs.insert(
        "units".to_string(),
        AttributeValue::Str(TIME_UNITS.to_string()),
    );
    coords.insert(
        TIME_DIM.to_string(),
        CoordVector {
            values: Array1::from(vec![0.0, 22.0, 44.0, 66.0]),
            attrs: time_attrs,
        },
    );

    coords.insert(
        LEVEL_DIM.to_string(),
        CoordVector::new(Array1::from(vec![850.0, 500.0])),
    );

    let mut lat_attrs = Attributes::new();
    lat_attrs.insert(
        "units".to_string(),
        AttributeValue::Str("degrees_north".to_string()),
    );
    coords.insert(
        LAT_DIM.to_string(),
        CoordVector {
            values: Array1::from(vec![20.0, 15.0, 10.0, 5.0, 0.0, -5.0]),
            attrs: lat_attrs,
        },
    );

    let mut lon_attrs = Attributes::new();
    lon_attrs.insert(
        "units".to_string(),
        AttributeValue::Str("degrees_east".to_string()),
    );
    coords.insert(
        LON_DIM.to_string(),
        CoordVector {
            values: Array1::from(vec![
                100.0, 105.0, 110.0, 115.0, 120.0, 125.0, 130.0, 135.0,
            ]),
            attrs: lon_attrs,
        },
    );

    let data = ArrayD::from_shape_fn(vec![4, 2, 6, 8], |idx| sample(idx[0], idx[1], idx[2], idx[3]));

    let mut var_attrs = Attributes::new();
    var_attrs.insert("units".to_string(), AttributeValue::Str("K".to_string()));
    var_attrs.insert(
        "long_name".to_string(),
        AttributeValue::Str("air temperature".to_string()),
    );

    let mut variables = HashMap::new();
    variables.insert(
        "temperature".to_string(),
        GridVariable {
            name: "temperature".to_string(),
            dims: vec![
                TIME_DIM.to_string(),
                LEVEL_DIM.to_string(),
                LAT_DIM.to_string(),
                LON_DIM.to_string(),
            ],
            data,
            attrs: var_attrs,
        },
    );

    let dataset = GriddedDataset {
        path: PathBuf::from("in-memory"),
        coords,
        variables,
        attrs: Attributes::new(),
    };
    dataset.validate().expect("fixture dataset is consistent");
    dataset
}
