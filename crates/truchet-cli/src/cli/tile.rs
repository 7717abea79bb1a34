//! Tile command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use truchet::{Rng, TileConfig, generate_pattern};

use super::common::{StrokeArgs, default_output, print_json, read_svg, write_svg};
use super::config::load_config;

#[derive(Args, Debug, Clone, Default)]
pub struct TileArgs {
    /// SVG file holding the tile <symbol>s ('-' for stdin)
    pub input: PathBuf,

    /// Output file ('-' for stdout) [default: output/<name>_truchet.svg]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// YAML pattern config; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of columns
    #[arg(short, long)]
    pub cols: Option<usize>,

    /// Number of rows
    #[arg(short, long)]
    pub rows: Option<usize>,

    /// Tile size in user units
    #[arg(short = 's', long = "size")]
    pub tile_size: Option<f64>,

    /// Random seed (a fresh one is drawn and logged when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Inline symbols as plain paths instead of <use> references
    #[arg(long)]
    pub convert_to_paths: bool,

    /// Join touching paths (requires --convert-to-paths)
    #[arg(long)]
    pub join_paths: bool,

    /// Maximum endpoint distance for joining
    #[arg(long, value_name = "T")]
    pub join_tolerance: Option<f64>,

    /// Do not close joined paths whose ends meet
    #[arg(long)]
    pub no_auto_close: bool,

    /// Set stroke-width on every shape
    #[arg(long, value_name = "WIDTH")]
    pub stroke_width: Option<f64>,

    #[command(flatten)]
    pub stroke: StrokeArgs,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl TileArgs {
    /// Config file values (or defaults) with flags applied on top.
    pub fn resolve_config(&self) -> Result<TileConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => TileConfig::default(),
        };
        if let Some(cols) = self.cols {
            config.columns = cols;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(size) = self.tile_size {
            config.tile_size = size;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.convert_to_paths |= self.convert_to_paths;
        config.join_paths |= self.join_paths;
        if let Some(tolerance) = self.join_tolerance {
            config.join_tolerance = tolerance;
        }
        if self.no_auto_close {
            config.auto_close = false;
        }
        if self.stroke_width.is_some() {
            config.stroke_width = self.stroke_width;
        }
        if self.stroke.stroke_to_path.is_some() {
            config.stroke_to_path = self.stroke.stroke_to_path;
        }
        if let Some(cap) = self.stroke.line_cap {
            config.line_cap = cap.into();
        }
        if let Some(join) = self.stroke.line_join {
            config.line_join = join.into();
        }
        Ok(config)
    }
}

/// Execute the tile command.
pub fn cmd_tile(args: TileArgs) -> Result<()> {
    let mut config = args.resolve_config()?;
    let seed = *config.seed.get_or_insert_with(rand::random);
    log::info!("seed: {}", seed);

    let input = read_svg(&args.input)?;
    let mut rng = Rng::new(seed);
    let pattern = generate_pattern(&input, &config, &mut rng).context("pattern generation failed")?;

    for failure in &pattern.report.inline_failures {
        log::warn!("skipped {}: {}", failure.element, failure.error);
    }

    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input, "truchet"));
    write_svg(&pattern.document, &output)?;

    if args.json {
        print_json(&pattern.report)?;
    }
    Ok(())
}
