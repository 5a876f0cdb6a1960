pub mod config;
pub mod data_io;
pub mod errors;
pub mod field;
pub mod grid;
pub mod time_utils;

pub use config::Config;
pub use data_io::{open_dataset, OutputNaming, ZarrStoreWriter};
pub use errors::{PrepError, Result};
pub use field::{
    extract_field, rehydrate, rehydrate_field, ExtractOptions, ExtractedField, LabeledArray,
    LevelSelection,
};
pub use grid::GriddedDataset;
