use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dmd_prep::{
    extract_field, open_dataset, rehydrate_field, Config, ExtractOptions, Result, ZarrStoreWriter,
};

fn main() {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.verbose);

    match run_pipeline(&config) {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            eprintln!("Pipeline error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Run the four stages in order, logging which stage failed.
fn run_pipeline(config: &Config) -> Result<PathBuf> {
    info!(file = %config.input_file, "loading dataset");
    let dataset = stage("load", open_dataset(&config.input_file, config))?;

    info!(variable = %config.variable, "extracting field");
    let opts = ExtractOptions {
        level: config.level_selection(),
        lat_range: config.lat_range,
        lon_range: config.lon_range,
        downsample: config.downsample,
    };
    let field = stage("extract", extract_field(&dataset, &config.variable, &opts))?;

    info!("rehydrating labeled array");
    let array = stage("rehydrate", rehydrate_field(field))?.with_name(&config.variable);

    info!(base_name = %config.base_name, "persisting zarr store");
    let writer = ZarrStoreWriter::new(config);
    stage("persist", writer.persist(&array, &config.base_name))
}

fn stage<T>(name: &str, result: Result<T>) -> Result<T> {
    if let Err(ref e) = result {
        tracing::error!(stage = name, error = %e, "pipeline stage failed");
    }
    result
}
