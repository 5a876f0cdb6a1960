//! Field extraction: level selection, spatial restriction, block averaging.

use std::collections::HashMap;

use ndarray::{s, Array1, Array3, Axis, Ix3, Slice};
use tracing::debug;

use super::{ExtractOptions, ExtractedField, LevelSelection};
use crate::errors::{PrepError, Result};
use crate::grid::{CoordVector, GridVariable, GriddedDataset, LAT_DIM, LEVEL_DIM, LON_DIM};

/// Extract one variable from a dataset as a raw array plus metadata.
///
/// The transform order is fixed: the level axis is collapsed first, then the
/// optional latitude/longitude restrictions are applied, then both horizontal
/// axes are block-averaged by the downsample factor. The returned field
/// carries the variable's attributes and the final (subset, coarsened)
/// coordinate vectors, aligned with the array's axes.
///
/// # Errors
/// * `UnknownVariable` - `variable` does not name a variable in `dataset`
/// * `LevelNotFound` - by-value selection missed, or the variable has no
///   level axis
/// * `InvalidParameter` - downsample factor of zero
/// * `ShapeMismatch` - the dataset's labels are inconsistent with the data
pub fn extract_field(
    dataset: &GriddedDataset,
    variable: &str,
    opts: &ExtractOptions,
) -> Result<ExtractedField> {
    if opts.downsample == 0 {
        return Err(PrepError::InvalidParameter(
            "downsample factor must be a positive integer".to_string(),
        ));
    }

    let var = dataset.variable(variable)?;
    let (mut data, dims) = select_level(dataset, var, opts.level)?;
    let mut coords = field_coords(dataset, variable, &dims)?;

    if let Some(bounds) = opts.lat_range {
        restrict_axis(&mut data, &mut coords, &dims, LAT_DIM, bounds)?;
    }
    if let Some(bounds) = opts.lon_range {
        restrict_axis(&mut data, &mut coords, &dims, LON_DIM, bounds)?;
    }

    if opts.downsample > 1 {
        for dim in [LAT_DIM, LON_DIM] {
            coarsen_dim(&mut data, &mut coords, &dims, dim, opts.downsample)?;
        }
    }

    debug!(
        variable,
        shape = ?data.shape(),
        downsample = opts.downsample,
        "extracted field"
    );

    ExtractedField::new(data, var.attrs.clone(), coords, dims)
}

/// Collapse the level axis of a 4-D variable, returning the remaining 3-D
/// array and its dimension names in original order.
fn select_level(
    dataset: &GriddedDataset,
    var: &GridVariable,
    selection: LevelSelection,
) -> Result<(Array3<f64>, [String; 3])> {
    let axis = var
        .dims
        .iter()
        .position(|d| d == LEVEL_DIM)
        .ok_or_else(|| {
            PrepError::LevelNotFound(format!("variable '{}' has no level axis", var.name))
        })?;

    let len = var.data.shape()[axis];
    let index = match selection {
        LevelSelection::First => {
            if len == 0 {
                return Err(PrepError::LevelNotFound(format!(
                    "variable '{}' has an empty level axis",
                    var.name
                )));
            }
            0
        }
        LevelSelection::Value(value) => {
            let coord = dataset.coord(LEVEL_DIM).ok_or_else(|| {
                PrepError::LevelNotFound(format!(
                    "dataset has no level coordinate to match {} against",
                    value
                ))
            })?;
            coord
                .values
                .iter()
                .position(|&v| v == value)
                .ok_or_else(|| {
                    PrepError::LevelNotFound(format!(
                        "level {} is not on the level axis of '{}'",
                        value, var.name
                    ))
                })?
        }
    };

    let collapsed = var
        .data
        .index_axis(Axis(axis), index)
        .to_owned()
        .into_dimensionality::<Ix3>()
        .map_err(|_| {
            PrepError::ShapeMismatch(format!(
                "variable '{}' is {}-dimensional; expected time, level, latitude, longitude",
                var.name,
                var.data.ndim()
            ))
        })?;

    let mut dims: Vec<String> = var.dims.clone();
    dims.remove(axis);
    let dims: [String; 3] = dims.try_into().map_err(|_| {
        PrepError::ShapeMismatch(format!(
            "variable '{}' does not have exactly three axes after level selection",
            var.name
        ))
    })?;

    Ok((collapsed, dims))
}

/// Clone the coordinate vectors for the field's remaining dimensions.
fn field_coords(
    dataset: &GriddedDataset,
    variable: &str,
    dims: &[String; 3],
) -> Result<HashMap<String, CoordVector>> {
    let mut coords = HashMap::new();
    for dim in dims {
        let coord = dataset.coord(dim).ok_or_else(|| {
            PrepError::ShapeMismatch(format!(
                "variable '{}' uses dimension '{}' with no coordinate vector",
                variable, dim
            ))
        })?;
        coords.insert(dim.clone(), coord.clone());
    }
    Ok(coords)
}

/// Keep only the samples whose coordinate value lies within the inclusive
/// bounds. A reversed pair is normalized to `(min, max)`; selection is by
/// value, so ascending and descending coordinates behave identically. An
/// empty selection yields a degenerate zero-length axis, not an error.
fn restrict_axis(
    data: &mut Array3<f64>,
    coords: &mut HashMap<String, CoordVector>,
    dims: &[String; 3],
    dim: &str,
    bounds: (f64, f64),
) -> Result<()> {
    let axis = dim_axis(dims, dim)?;
    let (low, high) = if bounds.0 <= bounds.1 {
        bounds
    } else {
        (bounds.1, bounds.0)
    };

    let coord = coords.get_mut(dim).ok_or_else(|| {
        PrepError::ShapeMismatch(format!("no coordinate vector for dimension '{}'", dim))
    })?;

    let keep: Vec<usize> = coord
        .values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v >= low && v <= high)
        .map(|(i, _)| i)
        .collect();

    *data = data.select(Axis(axis), &keep);
    let kept: Array1<f64> = keep.iter().map(|&i| coord.values[i]).collect();
    coord.values = kept;
    Ok(())
}

/// Block-average one axis of the field by `factor`.
///
/// Output length is `floor(len / factor)`; each output sample is the mean of
/// `factor` consecutive input samples aligned from index 0, and a trailing
/// remainder shorter than `factor` is discarded. The coordinate vector is
/// coarsened with the same block means.
fn coarsen_dim(
    data: &mut Array3<f64>,
    coords: &mut HashMap<String, CoordVector>,
    dims: &[String; 3],
    dim: &str,
    factor: usize,
) -> Result<()> {
    let axis = dim_axis(dims, dim)?;
    let coord = coords.get_mut(dim).ok_or_else(|| {
        PrepError::ShapeMismatch(format!("no coordinate vector for dimension '{}'", dim))
    })?;

    *data = coarsen_axis(data, axis, factor);
    coord.values = coarsen_values(&coord.values, factor);
    Ok(())
}

fn dim_axis(dims: &[String; 3], dim: &str) -> Result<usize> {
    dims.iter().position(|d| d == dim).ok_or_else(|| {
        PrepError::ShapeMismatch(format!("field has no '{}' axis (dims: {:?})", dim, dims))
    })
}

/// Non-overlapping block means along one axis of a 3-D array.
fn coarsen_axis(data: &Array3<f64>, axis: usize, factor: usize) -> Array3<f64> {
    let len = data.shape()[axis];
    let out_len = len / factor;

    let mut out_shape = [data.shape()[0], data.shape()[1], data.shape()[2]];
    out_shape[axis] = out_len;
    let mut out = Array3::<f64>::zeros(out_shape);

    for block in 0..out_len {
        let window = data.slice_axis(
            Axis(axis),
            Slice::from(block * factor..(block + 1) * factor),
        );
        let mean = window.sum_axis(Axis(axis)) / factor as f64;
        out.index_axis_mut(Axis(axis), block).assign(&mean);
    }
    out
}

/// Non-overlapping block means of a coordinate vector.
fn coarsen_values(values: &Array1<f64>, factor: usize) -> Array1<f64> {
    let out_len = values.len() / factor;
    (0..out_len)
        .map(|block| values.slice(s![block * factor..(block + 1) * factor]).sum() / factor as f64)
        .collect()
}
