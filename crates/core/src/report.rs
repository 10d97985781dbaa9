//! Outcomes of individual style operations and the running report.
//!
//! Every per-element operation returns `Result<Change, StyleError>`. The
//! walker hands each result to [`StyleReport::record`], which is the only
//! place that logs, counts, and swallows failures.

use crate::color::RgbColor;
use crate::error::StyleError;
use std::fmt;

/// What a single style operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// A color was replaced through the color map.
    Recolored { from: RgbColor, to: RgbColor },
    /// The outline was set to "no fill".
    OutlineRemoved,
    /// A non-color property (the typeface) was written.
    Applied,
    /// Nothing to do.
    Unchanged,
    /// Deliberately not processed.
    Skipped(&'static str),
}

/// The style operation an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ShapeFill,
    ShapeOutline,
    GroupOutline,
    RunFont,
    RunColor,
    CellFill,
    CellBorder,
    LoadSlide,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::ShapeFill => "fill color",
            Operation::ShapeOutline => "outline",
            Operation::GroupOutline => "group outline",
            Operation::RunFont => "run font",
            Operation::RunColor => "run color",
            Operation::CellFill => "table cell fill",
            Operation::CellBorder => "table cell border",
            Operation::LoadSlide => "slide part",
        };
        f.write_str(label)
    }
}

/// A failure that was logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// 1-based slide number.
    pub slide: usize,
    /// Name of the shape being styled, or the part name for slide failures.
    pub target: String,
    pub operation: Operation,
    pub error: StyleError,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slide {}, '{}': {} failed: {}",
            self.slide, self.target, self.operation, self.error
        )
    }
}

/// Running totals for one restyling pass.
#[derive(Debug, Clone, Default)]
pub struct StyleReport {
    current_slide: usize,
    /// Slides visited.
    pub slides: usize,
    /// Shapes visited, including group members.
    pub shapes: usize,
    /// Text runs whose typeface was written.
    pub runs: usize,
    /// Colors replaced through the color map.
    pub recolored: usize,
    /// Outlines set to "no fill".
    pub outlines_removed: usize,
    /// Failures that were logged and skipped.
    pub issues: Vec<Issue>,
}

impl StyleReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start attributing outcomes to the given 1-based slide number.
    pub fn begin_slide(&mut self, number: usize) {
        self.current_slide = number;
        self.slides += 1;
    }

    /// Count a visited shape.
    pub fn visit_shape(&mut self) {
        self.shapes += 1;
    }

    /// Log and count one outcome, returning the change (or `Unchanged` for
    /// a failure) so callers can keep going.
    pub fn record(
        &mut self,
        target: &str,
        operation: Operation,
        result: Result<Change, StyleError>,
    ) -> Change {
        let slide = self.current_slide;
        match result {
            Ok(change) => {
                match change {
                    Change::Recolored { from, to } => {
                        self.recolored += 1;
                        log::info!(
                            "Slide {}: '{}' {} changed from {} to {}",
                            slide,
                            target,
                            operation,
                            from,
                            to
                        );
                    }
                    Change::OutlineRemoved => {
                        self.outlines_removed += 1;
                        log::info!("Slide {}: '{}' {} removed", slide, target, operation);
                    }
                    Change::Applied => {
                        if operation == Operation::RunFont {
                            self.runs += 1;
                        }
                        log::debug!("Slide {}: '{}' {} applied", slide, target, operation);
                    }
                    Change::Skipped(reason) => {
                        log::debug!(
                            "Slide {}: '{}' {} skipped ({})",
                            slide,
                            target,
                            operation,
                            reason
                        );
                    }
                    Change::Unchanged => {
                        log::trace!("Slide {}: '{}' {} unchanged", slide, target, operation);
                    }
                }
                change
            }
            Err(error) => {
                let issue = Issue {
                    slide,
                    target: target.to_string(),
                    operation,
                    error,
                };
                log::error!("{}", issue);
                self.issues.push(issue);
                Change::Unchanged
            }
        }
    }

    /// Whether any element failed.
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

impl fmt::Display for StyleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} slides, {} shapes, {} runs restyled, {} colors remapped, {} outlines removed, {} issues",
            self.slides,
            self.shapes,
            self.runs,
            self.recolored,
            self.outlines_removed,
            self.issues.len()
        )
    }
}
