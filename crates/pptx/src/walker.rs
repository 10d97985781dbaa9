//! Presentation-wide restyling pass.

use crate::package::PptxPresentation;
use crate::styler::ShapeStyler;
use restyle_core::{Operation, StyleConfig, StyleError, StyleReport};

/// Style every top-level shape of every slide, in presentation order.
///
/// Slides that could not be parsed are reported here and left untouched.
pub fn apply_styles(presentation: &mut PptxPresentation, config: &StyleConfig) -> StyleReport {
    let mut report = StyleReport::new();

    for unreadable in presentation.unreadable_slides() {
        report.begin_slide(unreadable.number);
        report.record(
            &unreadable.part_name,
            Operation::LoadSlide,
            Err(StyleError::UnreadableSlide(unreadable.reason.clone())),
        );
    }

    for slide in presentation.slides_mut() {
        log::debug!("Styling slide {} ({})", slide.number(), slide.part_name());
        report.begin_slide(slide.number());

        let prefix = slide.dml_prefix().to_string();
        let mut styler = ShapeStyler::new(config, &mut report).with_dml_prefix(&prefix);
        for shape in slide.shapes_mut() {
            styler.style_shape(shape);
        }
    }

    report
}
