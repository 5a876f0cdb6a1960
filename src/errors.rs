use thiserror::Error;

/// Convenience alias used by every pipeline stage.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Error taxonomy shared by the loader, extractor, rehydrator, and persister.
///
/// All four stages report failures through this enum; no stage signals
/// failure through an absent result, and write failures are tagged the same
/// way read failures are.
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("variable not found: {0}")]
    UnknownVariable(String),

    #[error("level not found: {0}")]
    LevelNotFound(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zarr store error: {0}")]
    ZarrStore(String),
}
