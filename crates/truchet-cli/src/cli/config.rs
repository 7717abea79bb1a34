//! Pattern config files.
//!
//! A config is a YAML file holding any subset of [`TileConfig`] fields;
//! missing fields keep their defaults and command line flags win over
//! both.
//!
//! ```yaml
//! columns: 12
//! rows: 8
//! tile_size: 30
//! convert_to_paths: true
//! join_paths: true
//! stroke_to_path: 1.5
//! line_cap: butt
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use truchet::TileConfig;

/// Load a pattern config from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TileConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<TileConfig> {
    Ok(serde_yaml::from_str(content)?)
}
