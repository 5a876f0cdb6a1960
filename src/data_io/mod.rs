//! Dataset loading and persistence backends.
//!
//! Inputs are NetCDF files (`.nc`) or zarr v2 directory stores (`.zarr`),
//! selected strictly by extension; outputs are always zarr stores. Both
//! backends materialize everything they read, so a successfully opened
//! dataset never fails lazily later.

pub mod netcdf_reader;
pub mod zarr_reader;
pub mod zarr_writer;

pub use zarr_writer::{OutputNaming, ZarrStoreWriter};

use std::path::Path;

use tracing::debug;

use crate::config::Config;
use crate::errors::{PrepError, Result};
use crate::grid::GriddedDataset;

/// Input formats the loader can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    NetCdf,
    Zarr,
}

impl InputFormat {
    /// Decide the backend for a path from its extension alone.
    ///
    /// No content sniffing and no fallback between formats: anything other
    /// than `.nc` or `.zarr` is rejected as `UnsupportedFormat`.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("nc") => Ok(InputFormat::NetCdf),
            Some("zarr") => Ok(InputFormat::Zarr),
            _ => Err(PrepError::UnsupportedFormat(format!(
                "{} (expected .nc or .zarr)",
                path.display()
            ))),
        }
    }
}

/// Open a named input file beneath the configured input root.
///
/// # Arguments
/// * `file_name` - File name resolved against the input directory
/// * `config` - Pipeline configuration carrying the directory roots
///
/// # Returns
/// A fully materialized, label-validated [`GriddedDataset`].
pub fn open_dataset(file_name: &str, config: &Config) -> Result<GriddedDataset> {
    let path = config.input_path(file_name);
    let format = InputFormat::from_path(&path)?;
    debug!(file = %path.display(), ?format, "opening dataset");

    let dataset = match format {
        InputFormat::NetCdf => netcdf_reader::read_dataset(&path)?,
        InputFormat::Zarr => zarr_reader::read_store(&path)?,
    };
    dataset.validate()?;
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_dispatch_by_extension() {
        assert_eq!(
            InputFormat::from_path(Path::new("/data/input/era5.nc")).unwrap(),
            InputFormat::NetCdf
        );
        assert_eq!(
            InputFormat::from_path(Path::new("/data/input/era5.zarr")).unwrap(),
            InputFormat::Zarr
        );
    }

    #[test]
    fn test_unsupported_extensions_rejected() {
        for name in ["x.txt", "data.grib2", "noext", "archive.nc.gz"] {
            let result = InputFormat::from_path(Path::new(name));
            assert!(
                matches!(result, Err(PrepError::UnsupportedFormat(_))),
                "expected UnsupportedFormat for {}",
                name
            );
        }
    }
}
