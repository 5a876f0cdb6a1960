//! In-memory model of a labeled gridded dataset.
//!
//! A [`GriddedDataset`] is the fully materialized form of a NetCDF file or
//! zarr store: named variables with ordered dimension names, one coordinate
//! vector per dimension, and attribute maps at both the dataset and the
//! variable level. Materialization happens entirely at open time, so any
//! failure in a later pipeline stage belongs to that stage and never to a
//! deferred backend read.

use std::collections::HashMap;
use std::path::PathBuf;

use ndarray::{Array1, ArrayD};
use serde_json::Value;

use crate::errors::{PrepError, Result};

/// Canonical dimension names used throughout the pipeline.
pub const TIME_DIM: &str = "time";
pub const LEVEL_DIM: &str = "level";
pub const LAT_DIM: &str = "latitude";
pub const LON_DIM: &str = "longitude";

/// Map a raw dimension or coordinate name from a data file to its canonical
/// pipeline name. Unknown names pass through unchanged.
pub fn canonical_dim_name(name: &str) -> String {
    match name.to_ascii_lowercase().as_str() {
        "lat" | "latitude" | "south_north" | "y" => LAT_DIM.to_string(),
        "lon" | "long" | "longitude" | "west_east" | "x" => LON_DIM.to_string(),
        "lev" | "level" | "plev" | "pressure_level" | "bottom_top" => LEVEL_DIM.to_string(),
        "time" | "valid_time" | "xtime" => TIME_DIM.to_string(),
        _ => name.to_string(),
    }
}

/// Supported attribute value types.
///
/// The set is the intersection of what the NetCDF backend and a zarr JSON
/// document can both express without loss, so attributes survive a full
/// extract-persist-reload cycle unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Float(f64),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Render as a zarr attribute document value.
    pub fn to_json(&self) -> Value {
        match self {
            AttributeValue::Str(s) => Value::String(s.clone()),
            AttributeValue::Int(i) => Value::from(*i),
            AttributeValue::Float(f) => Value::from(*f),
            AttributeValue::IntArray(v) => Value::from(v.clone()),
            AttributeValue::FloatArray(v) => Value::from(v.clone()),
        }
    }

    /// Parse from a zarr attribute document value. Types outside the
    /// supported set (booleans, nested objects) yield `None`.
    pub fn from_json(value: &Value) -> Option<AttributeValue> {
        match value {
            Value::String(s) => Some(AttributeValue::Str(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(AttributeValue::Int(i))
                } else {
                    n.as_f64().map(AttributeValue::Float)
                }
            }
            Value::Array(items) => {
                if items.iter().all(|v| v.as_i64().is_some()) {
                    Some(AttributeValue::IntArray(
                        items.iter().filter_map(Value::as_i64).collect(),
                    ))
                } else if items.iter().all(|v| v.as_f64().is_some()) {
                    Some(AttributeValue::FloatArray(
                        items.iter().filter_map(Value::as_f64).collect(),
                    ))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Global and per-variable attribute maps.
pub type Attributes = HashMap<String, AttributeValue>;

/// One-dimensional coordinate variable attached to a dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordVector {
    pub values: Array1<f64>,
    pub attrs: Attributes,
}

impl CoordVector {
    pub fn new(values: Array1<f64>) -> Self {
        Self {
            values,
            attrs: Attributes::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A named data variable with its dimension order, values, and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct GridVariable {
    pub name: String,
    /// Dimension names aligned with the axes of `data`.
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    pub attrs: Attributes,
}

/// Read-only labeled dataset materialized from a NetCDF file or zarr store.
#[derive(Debug, Clone)]
pub struct GriddedDataset {
    /// Path the dataset was opened from.
    pub path: PathBuf,
    /// Coordinate vectors keyed by canonical dimension name.
    pub coords: HashMap<String, CoordVector>,
    /// Data variables keyed by name.
    pub variables: HashMap<String, GridVariable>,
    /// Dataset-level attributes.
    pub attrs: Attributes,
}

impl GriddedDataset {
    /// Look up a variable, reporting `UnknownVariable` when absent.
    pub fn variable(&self, name: &str) -> Result<&GridVariable> {
        self.variables
            .get(name)
            .ok_or_else(|| PrepError::UnknownVariable(name.to_string()))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Variable names in deterministic (sorted) order.
    pub fn list_variables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn coord(&self, dim: &str) -> Option<&CoordVector> {
        self.coords.get(dim)
    }

    /// Check that every variable axis agrees with its coordinate vector.
    ///
    /// Called by the loader after materialization so that label/shape
    /// inconsistencies surface as `ShapeMismatch` at open time.
    pub fn validate(&self) -> Result<()> {
        for var in self.variables.values() {
            if var.dims.len() != var.data.ndim() {
                return Err(PrepError::ShapeMismatch(format!(
                    "variable '{}' has {} dimension names but {} array axes",
                    var.name,
                    var.dims.len(),
                    var.data.ndim()
                )));
            }
            for (axis, dim) in var.dims.iter().enumerate() {
                if let Some(coord) = self.coords.get(dim) {
                    let len = var.data.shape()[axis];
                    if coord.len() != len {
                        return Err(PrepError::ShapeMismatch(format!(
                            "variable '{}' axis '{}' has length {} but its coordinate has {}",
                            var.name,
                            dim,
                            len,
                            coord.len()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
