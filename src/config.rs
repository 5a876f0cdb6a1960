//! Pipeline configuration: directory roots and CLI parsing.

use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, Command};

use crate::errors::{PrepError, Result};
use crate::field::LevelSelection;

/// Data directories beneath the project root.
const INPUT_SUBDIR: &str = "data/input";
const OUTPUT_SUBDIR: &str = "data/output";

/// Runtime configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory input file names are resolved against.
    pub input_dir: PathBuf,
    /// Directory output stores are written to.
    pub output_dir: PathBuf,
    /// Input file name (`.nc` or `.zarr`).
    pub input_file: String,
    /// Variable to extract.
    pub variable: String,
    /// Level coordinate value; `None` selects the first level positionally.
    pub level: Option<f64>,
    /// Inclusive latitude bounds.
    pub lat_range: Option<(f64, f64)>,
    /// Inclusive longitude bounds.
    pub lon_range: Option<(f64, f64)>,
    /// Horizontal block-averaging factor.
    pub downsample: usize,
    /// Base name of the output store.
    pub base_name: String,
    /// Verbose diagnostics.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        let root = project_root().unwrap_or_else(|| PathBuf::from("."));
        Self {
            input_dir: root.join(INPUT_SUBDIR),
            output_dir: root.join(OUTPUT_SUBDIR),
            input_file: String::new(),
            variable: String::new(),
            level: None,
            lat_range: None,
            lon_range: None,
            downsample: 1,
            base_name: String::from("field"),
            verbose: false,
        }
    }
}

impl Config {
    /// Resolve a file name against the input directory.
    pub fn input_path(&self, file_name: &str) -> PathBuf {
        self.input_dir.join(file_name)
    }

    /// Level selection mode implied by the configuration.
    pub fn level_selection(&self) -> LevelSelection {
        match self.level {
            Some(value) => LevelSelection::Value(value),
            None => LevelSelection::First,
        }
    }

    /// Build a config with explicit directories, bypassing root discovery.
    /// Used by test harnesses.
    pub fn with_dirs(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Parse configuration from command line arguments.
    pub fn from_args() -> Result<Self> {
        let command = Command::new("dmd_prep")
            .version("0.1.0")
            .about("Extract, subset, coarsen, and persist gridded reanalysis fields")
            .arg(
                Arg::new("input-file")
                    .short('i')
                    .long("input-file")
                    .value_name("FILE")
                    .help("Input file name beneath the input directory (.nc or .zarr)")
                    .required(true),
            )
            .arg(
                Arg::new("variable")
                    .long("variable")
                    .value_name("NAME")
                    .help("Variable to extract")
                    .required(true),
            )
            .arg(
                Arg::new("level")
                    .short('l')
                    .long("level")
                    .value_name("VALUE")
                    .help("Level coordinate value; omit to take the first level"),
            )
            .arg(
                Arg::new("lat-range")
                    .long("lat-range")
                    .value_name("LOW,HIGH")
                    .help("Inclusive latitude bounds"),
            )
            .arg(
                Arg::new("lon-range")
                    .long("lon-range")
                    .value_name("LOW,HIGH")
                    .help("Inclusive longitude bounds"),
            )
            .arg(
                Arg::new("downsample")
                    .short('d')
                    .long("downsample")
                    .value_name("FACTOR")
                    .help("Horizontal block-averaging factor")
                    .default_value("1"),
            )
            .arg(
                Arg::new("output-name")
                    .short('o')
                    .long("output-name")
                    .value_name("BASE")
                    .help("Base name of the output store")
                    .default_value("field"),
            )
            .arg(
                Arg::new("input-dir")
                    .long("input-dir")
                    .value_name("DIR")
                    .help("Override the input directory"),
            )
            .arg(
                Arg::new("output-dir")
                    .long("output-dir")
                    .value_name("DIR")
                    .help("Override the output directory"),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Enable verbose diagnostics")
                    .action(ArgAction::SetTrue),
            );

        let matches = command
            .try_get_matches()
            .map_err(|e| PrepError::InvalidParameter(e.to_string()))?;

        let mut config = Self::default();
        if let Some(dir) = matches.get_one::<String>("input-dir") {
            config.input_dir = PathBuf::from(dir);
        }
        if let Some(dir) = matches.get_one::<String>("output-dir") {
            config.output_dir = PathBuf::from(dir);
        }

        config.input_file = matches.get_one::<String>("input-file").cloned().ok_or_else(
            || PrepError::InvalidParameter("missing input file".to_string()),
        )?;
        config.variable = matches.get_one::<String>("variable").cloned().ok_or_else(
            || PrepError::InvalidParameter("missing variable".to_string()),
        )?;

        if let Some(text) = matches.get_one::<String>("level") {
            let value: f64 = text.parse().map_err(|_| {
                PrepError::InvalidParameter(format!("invalid level value: {}", text))
            })?;
            config.level = Some(value);
        }
        if let Some(text) = matches.get_one::<String>("lat-range") {
            config.lat_range = Some(parse_range(text)?);
        }
        if let Some(text) = matches.get_one::<String>("lon-range") {
            config.lon_range = Some(parse_range(text)?);
        }
        if let Some(text) = matches.get_one::<String>("downsample") {
            config.downsample = text.parse().map_err(|_| {
                PrepError::InvalidParameter(format!(
                    "downsample factor must be a positive integer, got '{}'",
                    text
                ))
            })?;
        }
        if let Some(name) = matches.get_one::<String>("output-name") {
            config.base_name = name.clone();
        }
        config.verbose = matches.get_flag("verbose");

        config.validate()?;
        Ok(config)
    }

    /// Validate directory layout and parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.input_dir.exists() {
            return Err(PrepError::InvalidParameter(format!(
                "input directory does not exist: {}",
                self.input_dir.display()
            )));
        }
        if !self.input_dir.is_dir() {
            return Err(PrepError::InvalidParameter(format!(
                "input path is not a directory: {}",
                self.input_dir.display()
            )));
        }
        if self.downsample == 0 {
            return Err(PrepError::InvalidParameter(
                "downsample factor must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a `LOW,HIGH` bound pair.
fn parse_range(text: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 2 {
        return Err(PrepError::InvalidParameter(format!(
            "range must be LOW,HIGH, got '{}'",
            text
        )));
    }
    let low: f64 = parts[0].trim().parse().map_err(|_| {
        PrepError::InvalidParameter(format!("invalid range bound: {}", parts[0]))
    })?;
    let high: f64 = parts[1].trim().parse().map_err(|_| {
        PrepError::InvalidParameter(format!("invalid range bound: {}", parts[1]))
    })?;
    Ok((low, high))
}

/// Locate the project root by walking upward from the working directory
/// until a directory carrying a root marker is found.
pub fn project_root() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        if is_project_root(&dir) {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

fn is_project_root(dir: &Path) -> bool {
    dir.join("Cargo.toml").exists() || dir.join(".git").exists()
}
