//! Per-shape style rules.
//!
//! Dispatch order is group, then text, then table, then the generic fill and
//! outline rules. A shape takes exactly one of the group, table, or generic
//! paths. Every outcome goes through [`StyleReport::record`].

use crate::drawing;
use crate::shapes::{DrawingShape, GroupShape, Shape, TableShape};
use crate::xml::Element;
use restyle_core::{Change, Operation, RgbColor, StyleConfig, StyleError, StyleReport};

/// Table cell border elements, in `tcPr` order.
const BORDER_SIDES: &[&str] = &["lnL", "lnR", "lnT", "lnB"];

/// Applies the configured style to shapes, one at a time.
pub struct ShapeStyler<'a> {
    config: &'a StyleConfig,
    report: &'a mut StyleReport,
    /// Prefix for DrawingML elements created on this slide.
    dml_prefix: &'a str,
}

impl<'a> ShapeStyler<'a> {
    pub fn new(config: &'a StyleConfig, report: &'a mut StyleReport) -> Self {
        Self {
            config,
            report,
            dml_prefix: drawing::DEFAULT_DML_PREFIX,
        }
    }

    /// Use the prefix the slide binds to the DrawingML namespace.
    pub fn with_dml_prefix(mut self, prefix: &'a str) -> Self {
        self.dml_prefix = prefix;
        self
    }

    /// Style one shape, recursing into groups.
    pub fn style_shape(&mut self, shape: &mut Shape) {
        self.report.visit_shape();

        match shape {
            Shape::Group(group) => self.style_group(group),
            Shape::TextFrame(shape) => {
                let name = shape.name().to_string();
                if let Some(body) = shape.text_body_mut() {
                    self.style_text_body(&name, body);
                }
                self.style_generic(shape);
            }
            Shape::Table(table) => self.style_table(table),
            Shape::Generic(shape) => self.style_generic(shape),
        }
    }

    fn style_group(&mut self, group: &mut GroupShape) {
        // An empty group has nothing to recurse into and no fill or outline
        // of its own.
        if !group.has_shapes() {
            return;
        }

        for member in group.shapes_mut() {
            self.style_shape(member);
        }

        // Group shape properties (`p:grpSpPr`) have no outline element, so
        // the group-level outline rule has nothing to write.
        if group.has_text_descendant() {
            self.report.record(
                group.name(),
                Operation::GroupOutline,
                Ok(Change::Skipped("group shape properties have no outline")),
            );
        }
    }

    /// Unified font on every run; run colors through the color map.
    fn style_text_body(&mut self, owner: &str, body: &mut Element) {
        let config = self.config;

        for paragraph in body.children_named_mut("p") {
            for run in paragraph.children_named_mut("r") {
                let font = drawing::set_run_typeface(
                    run,
                    self.dml_prefix,
                    &config.font_name,
                    config.east_asian,
                );
                self.report.record(owner, Operation::RunFont, Ok(font));

                let color = drawing::remap_run_color(run, &config.colors);
                self.report.record(owner, Operation::RunColor, color);
            }
        }
    }

    fn style_table(&mut self, table: &mut TableShape) {
        let name = table.name().to_string();
        let config = self.config;

        for cell in table.cells_mut() {
            let fill = match cell.child_mut("tcPr") {
                Some(tc_pr) => drawing::remap_solid_color(tc_pr, &config.colors),
                None => Ok(Change::Unchanged),
            };
            self.report.record(&name, Operation::CellFill, fill);

            if let Some(body) = cell.child_mut("txBody") {
                self.style_text_body(&name, body);
            }

            self.style_borders(&name, cell);
        }
    }

    /// Remap the four border colors of a table cell.
    fn style_borders(&mut self, owner: &str, cell: &mut Element) {
        let Some(tc_pr) = cell.child_mut("tcPr") else {
            return;
        };

        for side in BORDER_SIDES {
            for border in tc_pr.children_named_mut(side) {
                let change = drawing::remap_solid_color(border, &self.config.colors);
                self.report.record(owner, Operation::CellBorder, change);
            }
        }
    }

    fn style_generic(&mut self, shape: &mut DrawingShape) {
        let name = shape.name().to_string();
        let kind = shape.kind();

        if kind.has_fill() {
            let fill = match shape.properties_mut() {
                Some(sp_pr) => drawing::remap_solid_color(sp_pr, &self.config.colors),
                None => Ok(Change::Unchanged),
            };
            self.report.record(&name, Operation::ShapeFill, fill);
        }

        if !kind.has_outline() {
            return;
        }

        if self.config.is_connector_name(&name) {
            self.report.record(
                &name,
                Operation::ShapeOutline,
                Ok(Change::Skipped("connector or arrow")),
            );
            return;
        }

        match shape.properties_mut() {
            Some(sp_pr) => self.style_outline(&name, sp_pr),
            None => {
                self.report.record(
                    &name,
                    Operation::ShapeOutline,
                    Err(StyleError::MissingElement("spPr")),
                );
            }
        }
    }

    /// Outline rules for a non-connector shape:
    /// no explicit color removes the outline; a visible outline has its color
    /// remapped; an outline that ends up white is removed.
    fn style_outline(&mut self, name: &str, sp_pr: &mut Element) {
        let Some(raw) = drawing::line_rgb(sp_pr).map(str::to_string) else {
            let change = drawing::remove_outline(sp_pr, self.dml_prefix);
            self.report.record(name, Operation::ShapeOutline, Ok(change));
            return;
        };

        let resolved = self
            .config
            .colors
            .lookup(&raw)
            .and_then(|mapped| Ok((raw.parse::<RgbColor>()?, mapped)));
        let (mut color, mapped) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                self.report.record(name, Operation::ShapeOutline, Err(e));
                return;
            }
        };

        let width = match drawing::line_width(sp_pr) {
            Ok(width) => width,
            Err(e) => {
                self.report.record(name, Operation::ShapeOutline, Err(e));
                return;
            }
        };

        if width > 0 {
            let outcome = match mapped {
                Some(mapped) if mapped != color => {
                    drawing::set_line_rgb(sp_pr, mapped).map(|()| {
                        let change = Change::Recolored {
                            from: color,
                            to: mapped,
                        };
                        color = mapped;
                        change
                    })
                }
                _ => Ok(Change::Unchanged),
            };
            self.report.record(name, Operation::ShapeOutline, outcome);
        }

        if color == RgbColor::WHITE {
            let change = drawing::remove_outline(sp_pr, self.dml_prefix);
            self.report.record(name, Operation::ShapeOutline, Ok(change));
        }
    }
}
