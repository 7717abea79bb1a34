//! Join command implementation.
//!
//! Joins touching paths of an existing drawing, then optionally turns the
//! joined strokes into filled outlines.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use truchet::{JoinConfig, JoinReport, StrokeReport, StrokeStyle, join_document, stroke_document};

use super::common::{StrokeArgs, default_output, print_json, read_svg, write_svg};

#[derive(Args, Debug, Clone, Default)]
pub struct JoinArgs {
    /// SVG file to process ('-' for stdin)
    pub input: PathBuf,

    /// Output file ('-' for stdout) [default: output/<name>_joined.svg]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum endpoint distance for joining
    #[arg(short, long, default_value_t = 0.1)]
    pub tolerance: f64,

    /// Do not close joined paths whose ends meet
    #[arg(long)]
    pub no_auto_close: bool,

    #[command(flatten)]
    pub stroke: StrokeArgs,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Report of a join run.
#[derive(Debug, Serialize)]
struct JoinRunReport {
    join: JoinReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    stroke: Option<StrokeReport>,
}

impl JoinArgs {
    fn join_config(&self) -> Result<JoinConfig> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            bail!("tolerance must be non-negative, got {}", self.tolerance);
        }
        Ok(JoinConfig { tolerance: self.tolerance, auto_close: !self.no_auto_close })
    }

    fn stroke_style(&self) -> Result<Option<StrokeStyle>> {
        let Some(width) = self.stroke.stroke_to_path else {
            return Ok(None);
        };
        if !(width.is_finite() && width > 0.0) {
            bail!("stroke width must be positive, got {}", width);
        }
        let mut style = StrokeStyle::with_width(width);
        if let Some(cap) = self.stroke.line_cap {
            style.cap = cap.into();
        }
        if let Some(join) = self.stroke.line_join {
            style.join = join.into();
        }
        Ok(Some(style))
    }
}

/// Execute the join command.
pub fn cmd_join(args: JoinArgs) -> Result<()> {
    let config = args.join_config()?;
    let style = args.stroke_style()?;
    let input = read_svg(&args.input)?;

    let (mut document, join) = join_document(&input, &config);
    let stroke = style.map(|style| {
        let (stroked, report) = stroke_document(&document, &style);
        document = stroked;
        report
    });

    let failures = join.failures.iter().chain(stroke.iter().flat_map(|s| s.failures.iter()));
    for failure in failures {
        log::warn!("skipped {}: {}", failure.element, failure.error);
    }

    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input, "joined"));
    write_svg(&document, &output)?;

    if args.json {
        print_json(&JoinRunReport { join, stroke })?;
    }
    Ok(())
}
