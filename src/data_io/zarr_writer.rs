//! Persist a labeled array as a zarr v2 directory store.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::ArrayViewD;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::zarr_reader::ARRAY_DIMENSIONS_KEY;
use crate::config::Config;
use crate::errors::{PrepError, Result};
use crate::field::LabeledArray;
use crate::grid::{Attributes, TIME_DIM};
use crate::time_utils;

/// Output store naming policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputNaming {
    /// `{start}_{end}_{base}.zarr`, day-resolution dates taken from the
    /// minimum and maximum of the time coordinate.
    #[default]
    TimeSpan,
    /// `{base}.zarr` with no time prefix.
    BaseOnly,
}

/// Writes labeled arrays beneath the configured output root.
pub struct ZarrStoreWriter {
    output_dir: PathBuf,
    naming: OutputNaming,
}

impl ZarrStoreWriter {
    pub fn new(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            naming: OutputNaming::TimeSpan,
        }
    }

    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Path the store for `array` would be written to.
    pub fn store_path(&self, array: &LabeledArray, base_name: &str) -> Result<PathBuf> {
        let file_name = match self.naming {
            OutputNaming::TimeSpan => {
                let (start, end) = time_span(array)?;
                format!("{}_{}_{}.zarr", start, end, base_name)
            }
            OutputNaming::BaseOnly => format!("{}.zarr", base_name),
        };
        Ok(self.output_dir.join(file_name))
    }

    /// Write the array as a zarr v2 group, fully replacing any prior store
    /// at the derived path. No merge, no append: whatever existed there
    /// before is removed first.
    pub fn persist(&self, array: &LabeledArray, base_name: &str) -> Result<PathBuf> {
        let path = self.store_path(array, base_name)?;

        if path.exists() {
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            debug!(store = %path.display(), "removed prior store");
        }
        fs::create_dir_all(&path)?;

        write_json(&path.join(".zgroup"), &json!({ "zarr_format": 2 }))?;

        let var_name = array.name().unwrap_or(base_name);
        let dims: Vec<String> = array.dims().to_vec();
        write_array(
            &path.join(var_name),
            array.data().view().into_dyn(),
            &dims,
            array.attrs(),
        )?;

        for dim in array.dims() {
            let coord = array.coord(dim).ok_or_else(|| {
                PrepError::ShapeMismatch(format!("no coordinate vector for dimension '{}'", dim))
            })?;
            write_array(
                &path.join(dim),
                coord.values.view().into_dyn(),
                std::slice::from_ref(dim),
                &coord.attrs,
            )?;
        }

        info!(store = %path.display(), variable = var_name, "persisted zarr store");
        Ok(path)
    }
}

/// Write one array directory: `.zarray`, `.zattrs`, and a single chunk.
fn write_array(
    dir: &Path,
    data: ArrayViewD<'_, f64>,
    dims: &[String],
    attrs: &Attributes,
) -> Result<()> {
    fs::create_dir_all(dir)?;

    let shape: Vec<usize> = data.shape().to_vec();
    // Chunk extents must be at least 1 even on a degenerate axis.
    let chunks: Vec<usize> = shape.iter().map(|&s| s.max(1)).collect();

    write_json(
        &dir.join(".zarray"),
        &json!({
            "shape": shape,
            "chunks": chunks,
            "dtype": "<f8",
            "compressor": Value::Null,
            "fill_value": Value::Null,
            "filters": Value::Null,
            "order": "C",
            "zarr_format": 2,
        }),
    )?;

    let mut doc = Map::new();
    doc.insert(
        ARRAY_DIMENSIONS_KEY.to_string(),
        Value::from(dims.to_vec()),
    );
    let mut names: Vec<&String> = attrs.keys().collect();
    names.sort();
    for name in names {
        doc.insert(name.clone(), attrs[name].to_json());
    }
    write_json(&dir.join(".zattrs"), &Value::Object(doc))?;

    // One chunk spanning the whole array; nothing to write when any axis
    // is empty.
    if shape.iter().product::<usize>() > 0 {
        let chunk_name = vec!["0"; shape.len()].join(".");
        fs::write(dir.join(chunk_name), chunk_bytes(&data))?;
    }
    Ok(())
}

fn chunk_bytes(data: &ArrayViewD<'_, f64>) -> Vec<u8> {
    // Logical iteration order is row-major, matching the declared C order.
    let mut bytes = Vec::with_capacity(data.len() * 8);
    for &value in data.iter() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| PrepError::ZarrStore(format!("cannot render {}: {}", path.display(), e)))?;
    fs::write(path, text)?;
    Ok(())
}

/// Day stamps for the array's time span, from the time coordinate and its
/// CF units attribute.
fn time_span(array: &LabeledArray) -> Result<(String, String)> {
    let coord = array.coord(TIME_DIM).ok_or_else(|| {
        PrepError::InvalidParameter("labeled array has no time coordinate".to_string())
    })?;
    let units = coord
        .attrs
        .get("units")
        .and_then(|a| a.as_str())
        .ok_or_else(|| {
            PrepError::InvalidParameter(
                "time coordinate has no units attribute; cannot derive a date span".to_string(),
            )
        })?;
    let values: Vec<f64> = coord.values.iter().copied().collect();
    time_utils::time_span_stamps(&values, units)
}
