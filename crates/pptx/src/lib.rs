//! PPTX (Office Open XML) backend for presentation restyling.
//!
//! Opens .pptx packages, models each slide's shape tree, applies the
//! configured font and color rules, and writes the package back out.

pub mod drawing;
pub mod package;
pub mod shapes;
pub mod slide;
pub mod styler;
pub mod walker;
pub mod xml;

#[cfg(test)]
mod test_support;

pub use package::{PptxPresentation, UnreadableSlide};
pub use shapes::{DrawingKind, DrawingShape, GroupShape, Shape, TableShape};
pub use slide::Slide;
pub use styler::ShapeStyler;
pub use walker::apply_styles;
