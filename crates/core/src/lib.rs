//! Core domain types for presentation restyling: colors and color maps,
//! the style configuration, and the per-element style report.

pub mod color;
pub mod config;
pub mod error;
pub mod report;
pub mod types;

pub use color::{ColorMap, RgbColor};
pub use config::StyleConfig;
pub use error::{ConfigError, Error, Result, StyleError};
pub use report::{Change, Issue, Operation, StyleReport};
pub use types::PresentationFormat;
