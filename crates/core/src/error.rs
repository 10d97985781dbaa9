//! Error types for presentation restyling.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort loading or saving a presentation.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read the input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to parse the PPTX package structure.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// XML serialization error.
    #[error("XML writing error: {0}")]
    XmlWriteError(String),

    /// The output file exists but cannot be written, usually because it is
    /// open in another program.
    #[error("Output file is locked or read-only: {path}")]
    OutputLocked { path: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// A recoverable failure while restyling one element (a run, a cell, a
/// shape, or a whole slide part). These are logged and processing moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    /// A color attribute is not six hex digits.
    #[error("invalid color value '{0}'")]
    InvalidColor(String),

    /// A line width attribute is not an integer EMU value.
    #[error("invalid line width '{0}'")]
    InvalidLineWidth(String),

    /// A required child element is missing.
    #[error("missing <{0}> element")]
    MissingElement(&'static str),

    /// A slide part could not be parsed and is copied through unchanged.
    #[error("unreadable slide part: {0}")]
    UnreadableSlide(String),
}
