//! Common utilities shared across CLI commands.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use truchet::{Document, LineCap, LineJoin};

/// Directory for outputs when no `-o` is given.
pub const OUTPUT_DIR: &str = "output";

/// Read and parse an SVG file, or stdin for `-`.
pub fn read_svg(path: &Path) -> Result<Document> {
    let content = if path == Path::new("-") {
        eprintln!("Reading SVG from stdin...");
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
        buf
    } else {
        eprintln!("Loading: {}", path.display());
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    Document::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// `output/<stem>_<suffix>.svg` for an input file.
pub fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| *s != "-")
        .unwrap_or("stdin");
    Path::new(OUTPUT_DIR).join(format!("{}_{}.svg", stem, suffix))
}

/// Write the document to `output` (creating its directory), or stdout for `-`.
pub fn write_svg(doc: &Document, output: &Path) -> Result<()> {
    let text = doc.to_svg_string().context("failed to serialize SVG")?;
    if output == Path::new("-") {
        io::stdout().write_all(text.as_bytes()).context("failed to write stdout")?;
        return Ok(());
    }
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    fs::write(output, text).with_context(|| format!("failed to write {}", output.display()))?;
    eprintln!("Saved: {}", output.display());
    Ok(())
}

/// Print a report as pretty JSON on stdout.
pub fn print_json<T: Serialize>(report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

// Command-line mirrors of the library's stroke styles; the library does not
// depend on clap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CapArg {
    Butt,
    Round,
    Square,
}

impl From<CapArg> for LineCap {
    fn from(cap: CapArg) -> Self {
        match cap {
            CapArg::Butt => LineCap::Butt,
            CapArg::Round => LineCap::Round,
            CapArg::Square => LineCap::Square,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum JoinArg {
    Bevel,
    Round,
}

impl From<JoinArg> for LineJoin {
    fn from(join: JoinArg) -> Self {
        match join {
            JoinArg::Bevel => LineJoin::Bevel,
            JoinArg::Round => LineJoin::Round,
        }
    }
}

/// Stroke outline options shared by `tile` and `join`.
#[derive(Args, Debug, Clone, Default)]
pub struct StrokeArgs {
    /// Replace strokes by filled outlines of this width
    #[arg(long, value_name = "WIDTH")]
    pub stroke_to_path: Option<f64>,

    /// Cap style of stroke outlines
    #[arg(long, value_enum)]
    pub line_cap: Option<CapArg>,

    /// Corner style of stroke outlines
    #[arg(long, value_enum)]
    pub line_join: Option<JoinArg>,
}
