//! NetCDF backend: materialize a `.nc` file into a [`GriddedDataset`].

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array1, ArrayD, IxDyn};
use tracing::{debug, warn};

use crate::errors::{PrepError, Result};
use crate::grid::{
    canonical_dim_name, AttributeValue, Attributes, CoordVector, GriddedDataset, GridVariable,
};

/// Read a NetCDF file into memory.
///
/// Every variable is read in full as `f64` (the library converts narrower
/// on-disk types). A variable whose single dimension matches its own name is
/// treated as the coordinate vector for that dimension; everything else
/// becomes a data variable. Dimension and coordinate names are canonicalized
/// (`lat` -> `latitude`, `lev` -> `level`, ...).
pub fn read_dataset(path: &Path) -> Result<GriddedDataset> {
    if !path.exists() {
        return Err(PrepError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("NetCDF file not found: {}", path.display()),
        )));
    }

    let file = netcdf::open(path)?;

    let mut coords: HashMap<String, CoordVector> = HashMap::new();
    let mut variables: HashMap<String, GridVariable> = HashMap::new();

    for var in file.variables() {
        let name = var.name();
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| canonical_dim_name(&d.name()))
            .collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let values: Vec<f64> = var.get_values::<f64, _>(..)?;
        let attrs = read_attributes(var.attributes());

        if dims.len() == 1 && canonical_dim_name(&name) == dims[0] {
            coords.insert(
                dims[0].clone(),
                CoordVector {
                    values: Array1::from(values),
                    attrs,
                },
            );
        } else {
            let data = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| {
                PrepError::ShapeMismatch(format!(
                    "variable '{}' does not fill its declared shape {:?}",
                    name, shape
                ))
            })?;
            variables.insert(
                name.clone(),
                GridVariable {
                    name,
                    dims,
                    data,
                    attrs,
                },
            );
        }
    }

    debug!(
        file = %path.display(),
        variables = variables.len(),
        coords = coords.len(),
        "materialized NetCDF dataset"
    );

    Ok(GriddedDataset {
        path: path.to_path_buf(),
        coords,
        variables,
        attrs: read_attributes(file.attributes()),
    })
}

/// Convert the attributes the backend exposes into the pipeline's map,
/// skipping types outside the supported set.
fn read_attributes<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> Attributes {
    let mut out = Attributes::new();
    for attr in attrs {
        let name = attr.name().to_string();
        match attr.value() {
            Ok(value) => {
                if let Some(converted) = convert_attribute(value) {
                    out.insert(name, converted);
                } else {
                    debug!(attribute = %name, "skipping attribute with unsupported type");
                }
            }
            Err(e) => warn!(attribute = %name, error = %e, "failed to read attribute"),
        }
    }
    out
}

fn convert_attribute(value: netcdf::AttributeValue) -> Option<AttributeValue> {
    use netcdf::AttributeValue as Nc;
    match value {
        Nc::Str(s) => Some(AttributeValue::Str(s)),
        Nc::Schar(v) => Some(AttributeValue::Int(v as i64)),
        Nc::Uchar(v) => Some(AttributeValue::Int(v as i64)),
        Nc::Short(v) => Some(AttributeValue::Int(v as i64)),
        Nc::Ushort(v) => Some(AttributeValue::Int(v as i64)),
        Nc::Int(v) => Some(AttributeValue::Int(v as i64)),
        Nc::Uint(v) => Some(AttributeValue::Int(v as i64)),
        Nc::Longlong(v) => Some(AttributeValue::Int(v)),
        Nc::Float(v) => Some(AttributeValue::Float(v as f64)),
        Nc::Double(v) => Some(AttributeValue::Float(v)),
        Nc::Ints(v) => Some(AttributeValue::IntArray(
            v.into_iter().map(|i| i as i64).collect(),
        )),
        Nc::Longlongs(v) => Some(AttributeValue::IntArray(v)),
        Nc::Floats(v) => Some(AttributeValue::FloatArray(
            v.into_iter().map(|f| f as f64).collect(),
        )),
        Nc::Doubles(v) => Some(AttributeValue::FloatArray(v)),
        _ => None,
    }
}
