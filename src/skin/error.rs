//! Error types for skin loading

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a skin load
///
/// Any of these leaves the engine with whatever document and textures it had
/// before the load was attempted.
#[derive(Debug, Error)]
pub enum SkinError {
    /// The skin source or one of its images could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The markup is not well-formed XML
    #[error("Malformed skin markup: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The markup is XML but not a renderable vector document
    #[error("Invalid vector source: {0}")]
    Svg(#[from] resvg::usvg::Error),

    /// A recognized attribute carries a value that does not parse
    #[error("Invalid value {value:?} for attribute `{attribute}` on <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        value: String,
    },

    /// A recognized node is missing an attribute it requires
    #[error("Missing attribute `{attribute}` on <{element}>")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    /// The document declares no usable drawing area
    #[error("Skin declares a degenerate size {width}x{height}")]
    DegenerateSize { width: f64, height: f64 },

    /// An image referenced by an image-grid layout failed to decode
    #[error("Failed to decode image {path}: {reason}")]
    Image { path: PathBuf, reason: String },

    /// The layout file is not of the kind the loader expected
    #[error("Unsupported layout: {0}")]
    UnsupportedLayout(String),
}
