use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

/// Errors from parsing an SVG `transform` attribute.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("unknown transform function `{name}` at byte {offset}")]
    UnknownFunction { name: String, offset: usize },

    #[error("invalid transform syntax at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
}

/// Errors from geometric operations on a single path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("stroke width must be positive and finite, got {0}")]
    InvalidWidth(f64),
}

/// Errors from reading or writing SVG documents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SvgError {
    #[error("XML error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("document has no root element")]
    NoRoot,

    #[error("invalid path data: {0}")]
    PathData(String),

    #[error("invalid value for attribute `{name}`: {value}")]
    InvalidAttribute { name: String, value: String },

    #[error("failed to write SVG: {0}")]
    Write(String),
}

/// Fatal errors of the tiling pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no <symbol> elements found in the input document")]
    NoSymbols,

    #[error("{0} requires inlined symbols (enable convert_to_paths)")]
    RequiresInline(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Svg(#[from] SvgError),
}

/// Why one element was skipped by a document pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Svg(#[from] SvgError),

    #[error("transform is not invertible")]
    SingularTransform,
}

/// A skipped element and the reason, as listed in pass reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementFailure {
    /// Short description such as `path#arc-3`.
    pub element: String,
    pub error: ElementError,
}

impl Serialize for ElementFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ElementFailure", 2)?;
        state.serialize_field("element", &self.element)?;
        state.serialize_field("message", &self.error.to_string())?;
        state.end()
    }
}
