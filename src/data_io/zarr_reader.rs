//! Zarr v2 directory-store backend.
//!
//! Reads the store layout the persister writes: a group with one array
//! directory per variable or coordinate, JSON metadata documents, and
//! uncompressed C-order chunks. The `_ARRAY_DIMENSIONS` attribute (the
//! xarray convention) supplies the dimension labels.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ndarray::{ArrayD, IxDyn, SliceInfoElem};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{PrepError, Result};
use crate::grid::{
    canonical_dim_name, AttributeValue, Attributes, CoordVector, GriddedDataset, GridVariable,
};

/// Name of the attribute carrying dimension labels.
pub const ARRAY_DIMENSIONS_KEY: &str = "_ARRAY_DIMENSIONS";

#[derive(Debug, Deserialize)]
struct ArrayMeta {
    shape: Vec<usize>,
    chunks: Vec<usize>,
    dtype: String,
    #[serde(default)]
    compressor: Option<Value>,
    #[serde(default)]
    fill_value: Option<Value>,
    #[serde(default = "default_order")]
    order: String,
    zarr_format: i64,
}

fn default_order() -> String {
    "C".to_string()
}

/// Read a zarr store directory into memory.
pub fn read_store(path: &Path) -> Result<GriddedDataset> {
    if !path.is_dir() {
        return Err(PrepError::ZarrStore(format!(
            "not a zarr store directory: {}",
            path.display()
        )));
    }
    let zgroup = path.join(".zgroup");
    if !zgroup.exists() {
        return Err(PrepError::ZarrStore(format!(
            "no .zgroup file in {}",
            path.display()
        )));
    }
    let group: Value = parse_json(&zgroup)?;
    if group.get("zarr_format").and_then(Value::as_i64) != Some(2) {
        return Err(PrepError::ZarrStore(format!(
            "unsupported zarr format in {}",
            zgroup.display()
        )));
    }

    let attrs = match read_attrs_document(&path.join(".zattrs"))? {
        Some((attrs, _)) => attrs,
        None => Attributes::new(),
    };

    let mut coords: HashMap<String, CoordVector> = HashMap::new();
    let mut variables: HashMap<String, GridVariable> = HashMap::new();

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let array_dir = entry.path();
        if !array_dir.is_dir() || !array_dir.join(".zarray").exists() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let (data, dims, array_attrs) = read_array(&array_dir)?;

        if dims.len() == 1 && canonical_dim_name(&name) == dims[0] {
            let values = data.into_dimensionality::<ndarray::Ix1>().map_err(|_| {
                PrepError::ZarrStore(format!("coordinate array '{}' is not 1-D", name))
            })?;
            coords.insert(
                dims[0].clone(),
                CoordVector {
                    values,
                    attrs: array_attrs,
                },
            );
        } else {
            variables.insert(
                name.clone(),
                GridVariable {
                    name,
                    dims,
                    data,
                    attrs: array_attrs,
                },
            );
        }
    }

    debug!(
        store = %path.display(),
        variables = variables.len(),
        coords = coords.len(),
        "materialized zarr store"
    );

    Ok(GriddedDataset {
        path: path.to_path_buf(),
        coords,
        variables,
        attrs,
    })
}

/// Read one array directory: metadata, attributes, and all chunks.
fn read_array(dir: &Path) -> Result<(ArrayD<f64>, Vec<String>, Attributes)> {
    let meta: ArrayMeta = serde_json::from_str(&fs::read_to_string(dir.join(".zarray"))?)
        .map_err(|e| PrepError::ZarrStore(format!("bad .zarray in {}: {}", dir.display(), e)))?;

    if meta.zarr_format != 2 {
        return Err(PrepError::ZarrStore(format!(
            "array {} has zarr_format {}; only format 2 is supported",
            dir.display(),
            meta.zarr_format
        )));
    }
    if let Some(compressor) = &meta.compressor {
        if !compressor.is_null() {
            return Err(PrepError::ZarrStore(format!(
                "array {} uses a compressor; only uncompressed chunks are supported",
                dir.display()
            )));
        }
    }
    if meta.order != "C" {
        return Err(PrepError::ZarrStore(format!(
            "array {} uses order '{}'; only C order is supported",
            dir.display(),
            meta.order
        )));
    }
    if meta.shape.len() != meta.chunks.len() || meta.chunks.iter().any(|&c| c == 0) {
        return Err(PrepError::ZarrStore(format!(
            "array {} has inconsistent shape/chunk metadata",
            dir.display()
        )));
    }

    let element_size = match meta.dtype.as_str() {
        "<f8" => 8,
        "<f4" => 4,
        other => {
            return Err(PrepError::ZarrStore(format!(
                "array {} has unsupported dtype '{}'",
                dir.display(),
                other
            )))
        }
    };

    let fill = meta
        .fill_value
        .as_ref()
        .and_then(json_fill_value)
        .unwrap_or(f64::NAN);

    let ndim = meta.shape.len();
    let mut data = ArrayD::from_elem(IxDyn(&meta.shape), fill);

    // Chunk grid; a zero-length axis has no chunks at all.
    let grid: Vec<usize> = meta
        .shape
        .iter()
        .zip(&meta.chunks)
        .map(|(&s, &c)| s.div_ceil(c))
        .collect();
    let total: usize = grid.iter().product();

    for flat in 0..total {
        let mut index = vec![0usize; ndim];
        let mut rem = flat;
        for d in (0..ndim).rev() {
            index[d] = rem % grid[d];
            rem /= grid[d];
        }

        let chunk_name: Vec<String> = index.iter().map(|i| i.to_string()).collect();
        let chunk_path = dir.join(chunk_name.join("."));
        if !chunk_path.exists() {
            continue; // missing chunk stays at the fill value
        }

        let chunk = read_chunk(&chunk_path, &meta.chunks, element_size, &meta.dtype)?;

        let start: Vec<usize> = index.iter().zip(&meta.chunks).map(|(&i, &c)| i * c).collect();
        let stop: Vec<usize> = start
            .iter()
            .zip(&meta.shape)
            .zip(&meta.chunks)
            .map(|((&s, &dim), &c)| (s + c).min(dim))
            .collect();

        let valid: Vec<SliceInfoElem> = start
            .iter()
            .zip(&stop)
            .map(|(&s, &e)| SliceInfoElem::Slice {
                start: 0,
                end: Some((e - s) as isize),
                step: 1,
            })
            .collect();
        let region: Vec<SliceInfoElem> = start
            .iter()
            .zip(&stop)
            .map(|(&s, &e)| SliceInfoElem::Slice {
                start: s as isize,
                end: Some(e as isize),
                step: 1,
            })
            .collect();

        data.slice_mut(region.as_slice())
            .assign(&chunk.slice(valid.as_slice()));
    }

    let (dims, attrs) = match read_attrs_document(&dir.join(".zattrs"))? {
        Some((attrs, Some(dims))) => (dims, attrs),
        _ => {
            return Err(PrepError::ZarrStore(format!(
                "array {} has no {} attribute",
                dir.display(),
                ARRAY_DIMENSIONS_KEY
            )))
        }
    };
    if dims.len() != ndim {
        return Err(PrepError::ZarrStore(format!(
            "array {} labels {} dimensions but has {} axes",
            dir.display(),
            dims.len(),
            ndim
        )));
    }

    Ok((data, dims, attrs))
}

/// Decode one uncompressed C-order chunk file.
fn read_chunk(
    path: &Path,
    chunk_shape: &[usize],
    element_size: usize,
    dtype: &str,
) -> Result<ArrayD<f64>> {
    let bytes = fs::read(path)?;
    let expected: usize = chunk_shape.iter().product::<usize>() * element_size;
    if bytes.len() != expected {
        return Err(PrepError::ZarrStore(format!(
            "chunk {} has {} bytes; expected {}",
            path.display(),
            bytes.len(),
            expected
        )));
    }

    let values: Vec<f64> = match dtype {
        "<f8" => bytes
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        _ => bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
    };

    ArrayD::from_shape_vec(IxDyn(chunk_shape), values)
        .map_err(|_| PrepError::ZarrStore(format!("chunk {} shape mismatch", path.display())))
}

/// Parse a `.zattrs` document, splitting out the dimension labels.
///
/// Returns `None` when the document does not exist; the inner `Option`
/// covers the `_ARRAY_DIMENSIONS` entry.
#[allow(clippy::type_complexity)]
fn read_attrs_document(path: &Path) -> Result<Option<(Attributes, Option<Vec<String>>)>> {
    if !path.exists() {
        return Ok(None);
    }
    let doc: Value = parse_json(path)?;
    let object = doc.as_object().ok_or_else(|| {
        PrepError::ZarrStore(format!("{} is not a JSON object", path.display()))
    })?;

    let mut dims = None;
    let mut attrs = Attributes::new();
    for (key, value) in object {
        if key == ARRAY_DIMENSIONS_KEY {
            let labels: Option<Vec<String>> = value.as_array().map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(canonical_dim_name)
                    .collect()
            });
            dims = labels;
        } else if let Some(converted) = AttributeValue::from_json(value) {
            attrs.insert(key.clone(), converted);
        } else {
            debug!(attribute = %key, file = %path.display(), "skipping unsupported attribute");
        }
    }
    Ok(Some((attrs, dims)))
}

fn json_fill_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s == "NaN" => Some(f64::NAN),
        _ => None,
    }
}

fn parse_json(path: &Path) -> Result<Value> {
    serde_json::from_str(&fs::read_to_string(path)?)
        .map_err(|e| PrepError::ZarrStore(format!("bad JSON in {}: {}", path.display(), e)))
}
