//! Field-level transforms between a labeled dataset and raw numeric arrays.

pub mod extract;
pub mod rehydrate;

pub use extract::extract_field;
pub use rehydrate::{rehydrate, rehydrate_field};

use std::collections::HashMap;

use ndarray::Array3;

use crate::errors::{PrepError, Result};
use crate::grid::{Attributes, CoordVector};

/// How the vertical level axis is collapsed during extraction.
///
/// The two modes are deliberately distinct: `First` is positional and ignores
/// the coordinate values entirely, `Value` matches a coordinate value and
/// fails when it is absent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LevelSelection {
    /// Take the first entry along the level axis, whatever its value.
    #[default]
    First,
    /// Select the entry whose level coordinate equals the given value.
    Value(f64),
}

/// Extraction parameters beyond the variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub level: LevelSelection,
    /// Inclusive latitude bounds, filtered by coordinate value.
    pub lat_range: Option<(f64, f64)>,
    /// Inclusive longitude bounds, filtered by coordinate value.
    pub lon_range: Option<(f64, f64)>,
    /// Block-averaging factor applied to both horizontal axes.
    pub downsample: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            level: LevelSelection::First,
            lat_range: None,
            lon_range: None,
            downsample: 1,
        }
    }
}

/// Raw numeric array plus the metadata needed to rebuild a labeled array.
///
/// Can only be built through [`ExtractedField::new`], which enforces that
/// every axis length matches its coordinate vector, so a shape/metadata
/// mismatch is reported at construction instead of surfacing downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedField {
    data: Array3<f64>,
    attrs: Attributes,
    coords: HashMap<String, CoordVector>,
    dims: [String; 3],
}

impl ExtractedField {
    pub fn new(
        data: Array3<f64>,
        attrs: Attributes,
        coords: HashMap<String, CoordVector>,
        dims: [String; 3],
    ) -> Result<Self> {
        check_axes(data.shape(), &coords, &dims)?;
        Ok(Self {
            data,
            attrs,
            coords,
            dims,
        })
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn coords(&self) -> &HashMap<String, CoordVector> {
        &self.coords
    }

    pub fn coord(&self, dim: &str) -> Option<&CoordVector> {
        self.coords.get(dim)
    }

    pub fn dims(&self) -> &[String; 3] {
        &self.dims
    }

    /// Decompose into the loose `(array, attrs, coords, dims)` tuple handed
    /// to the rehydrator.
    pub fn into_parts(
        self,
    ) -> (
        Array3<f64>,
        Attributes,
        HashMap<String, CoordVector>,
        [String; 3],
    ) {
        (self.data, self.attrs, self.coords, self.dims)
    }
}

/// Coordinate-aware array rebuilt from an extracted field.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArray {
    name: Option<String>,
    data: Array3<f64>,
    dims: [String; 3],
    coords: HashMap<String, CoordVector>,
    attrs: Attributes,
}

impl LabeledArray {
    pub fn new(
        data: Array3<f64>,
        dims: [String; 3],
        coords: HashMap<String, CoordVector>,
        attrs: Attributes,
    ) -> Result<Self> {
        check_axes(data.shape(), &coords, &dims)?;
        Ok(Self {
            name: None,
            data,
            dims,
            coords,
            attrs,
        })
    }

    /// Attach a variable name, used by the persister as the array name
    /// inside the output store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn dims(&self) -> &[String; 3] {
        &self.dims
    }

    pub fn coords(&self) -> &HashMap<String, CoordVector> {
        &self.coords
    }

    pub fn coord(&self, dim: &str) -> Option<&CoordVector> {
        self.coords.get(dim)
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }
}

/// Shared shape/metadata consistency check for the validated records.
fn check_axes(
    shape: &[usize],
    coords: &HashMap<String, CoordVector>,
    dims: &[String; 3],
) -> Result<()> {
    for (axis, dim) in dims.iter().enumerate() {
        let coord = coords.get(dim).ok_or_else(|| {
            PrepError::ShapeMismatch(format!("no coordinate vector for dimension '{}'", dim))
        })?;
        if coord.len() != shape[axis] {
            return Err(PrepError::ShapeMismatch(format!(
                "axis '{}' has length {} but its coordinate vector has {}",
                dim,
                shape[axis],
                coord.len()
            )));
        }
    }
    if coords.len() != dims.len() {
        let stray: Vec<&String> = coords.keys().filter(|k| !dims.contains(*k)).collect();
        return Err(PrepError::ShapeMismatch(format!(
            "coordinate map carries entries for unknown dimensions: {:?}",
            stray
        )));
    }
    Ok(())
}
