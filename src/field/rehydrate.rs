//! Rebuild a coordinate-labeled array from raw extraction output.

use std::collections::HashMap;

use ndarray::Array3;
use tracing::debug;

use super::{ExtractedField, LabeledArray};
use crate::errors::Result;
use crate::grid::{Attributes, CoordVector};

/// Reconstruct a labeled array purely from the metadata captured at
/// extraction time, attaching `attrs` unchanged.
///
/// When extraction used default options (first level, no ranges, factor 1)
/// the result equals the source variable restricted to level index 0,
/// value for value and coordinate for coordinate. Any disagreement between
/// the array shape and the coordinate lengths is `ShapeMismatch`.
pub fn rehydrate(
    data: Array3<f64>,
    attrs: Attributes,
    coords: HashMap<String, CoordVector>,
    dims: [String; 3],
) -> Result<LabeledArray> {
    let array = LabeledArray::new(data, dims, coords, attrs)?;
    debug!(shape = ?array.shape(), "rehydrated labeled array");
    Ok(array)
}

/// Convenience wrapper taking a whole [`ExtractedField`].
pub fn rehydrate_field(field: ExtractedField) -> Result<LabeledArray> {
    let (data, attrs, coords, dims) = field.into_parts();
    rehydrate(data, attrs, coords, dims)
}
