//! DrawingML property edits: solid colors, outlines, and run typefaces.
//!
//! Element positions follow the ECMA-376 sequences for `spPr`, `ln` and
//! `rPr`, so inserted elements land where PowerPoint expects them.

use crate::xml::Element;
use restyle_core::{Change, ColorMap, RgbColor, StyleError};

/// DrawingML main namespace.
pub const DRAWINGML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// Prefix PowerPoint binds to [`DRAWINGML_NS`].
pub const DEFAULT_DML_PREFIX: &str = "a";

/// Fill choice elements (`EG_FillProperties`).
const FILL_CHOICES: &[&str] = &["noFill", "solidFill", "gradFill", "blipFill", "pattFill", "grpFill"];

/// `spPr` children that come after `ln`.
const SP_PR_AFTER_LN: &[&str] = &["effectLst", "effectDag", "scene3d", "sp3d", "extLst"];

/// `rPr` children that come after `latin`.
const R_PR_AFTER_LATIN: &[&str] = &["ea", "cs", "sym", "hlinkClick", "hlinkMouseOver", "rtl", "extLst"];

/// `rPr` children that come after `ea`.
const R_PR_AFTER_EA: &[&str] = &["cs", "sym", "hlinkClick", "hlinkMouseOver", "rtl", "extLst"];

/// Qualified name for a created DrawingML element; an empty prefix means
/// DrawingML is the default namespace.
fn dml(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

/// The explicit RGB value of `parent/solidFill/srgbClr`, if any.
pub fn solid_rgb(parent: &Element) -> Option<&str> {
    parent.find(&["solidFill", "srgbClr"])?.attr("val")
}

/// Replace `parent/solidFill/srgbClr/@val` through the color map.
///
/// Absent or non-RGB colors are left alone; only a found mapping writes.
pub fn remap_solid_color(parent: &mut Element, colors: &ColorMap) -> Result<Change, StyleError> {
    let Some(srgb) = parent.find_mut(&["solidFill", "srgbClr"]) else {
        return Ok(Change::Unchanged);
    };
    let Some(raw) = srgb.attr("val") else {
        return Ok(Change::Unchanged);
    };

    let Some(to) = colors.lookup(raw)? else {
        return Ok(Change::Unchanged);
    };
    let from: RgbColor = raw.parse()?;
    if to == from {
        return Ok(Change::Unchanged);
    }

    srgb.set_attr("val", &to.to_hex());
    Ok(Change::Recolored { from, to })
}

/// The explicit RGB color of the outline in `spPr`, if any.
pub fn line_rgb(sp_pr: &Element) -> Option<&str> {
    solid_rgb(sp_pr.child("ln")?)
}

/// Outline width in EMU; zero when unspecified.
pub fn line_width(sp_pr: &Element) -> Result<i64, StyleError> {
    match sp_pr.child("ln").and_then(|ln| ln.attr("w")) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| StyleError::InvalidLineWidth(raw.to_string())),
        None => Ok(0),
    }
}

/// Overwrite the outline's existing RGB color.
pub fn set_line_rgb(sp_pr: &mut Element, color: RgbColor) -> Result<(), StyleError> {
    let srgb = sp_pr
        .find_mut(&["ln", "solidFill", "srgbClr"])
        .ok_or(StyleError::MissingElement("srgbClr"))?;
    srgb.set_attr("val", &color.to_hex());
    Ok(())
}

/// Set the outline to "no fill", creating `ln` when absent.
///
/// `prefix` is the slide's DrawingML prefix, used for created elements.
pub fn remove_outline(sp_pr: &mut Element, prefix: &str) -> Change {
    let ln = sp_pr.get_or_insert_child("ln", &dml(prefix, "ln"), SP_PR_AFTER_LN);

    let fills: Vec<&str> = ln
        .elements()
        .map(|e| e.local_name())
        .filter(|local| FILL_CHOICES.contains(local))
        .collect();
    if fills == ["noFill"] {
        return Change::Unchanged;
    }

    ln.remove_children(|e| FILL_CHOICES.contains(&e.local_name()));
    ln.insert_child(0, Element::new(dml(prefix, "noFill")));
    Change::OutlineRemoved
}

/// Whether `ln` resolves to "no fill".
pub fn is_outline_removed(sp_pr: &Element) -> bool {
    sp_pr
        .child("ln")
        .map(|ln| ln.child("noFill").is_some())
        .unwrap_or(false)
}

/// Write the run typeface (`latin`, and `ea` when asked), creating `rPr`
/// when the run has none.
pub fn set_run_typeface(
    run: &mut Element,
    prefix: &str,
    font_name: &str,
    east_asian: bool,
) -> Change {
    let r_pr = run.get_or_insert_child("rPr", &dml(prefix, "rPr"), &["t"]);

    let mut changed = set_typeface(r_pr, prefix, "latin", font_name, R_PR_AFTER_LATIN);
    if east_asian {
        changed |= set_typeface(r_pr, prefix, "ea", font_name, R_PR_AFTER_EA);
    }

    if changed {
        Change::Applied
    } else {
        Change::Unchanged
    }
}

fn set_typeface(
    r_pr: &mut Element,
    prefix: &str,
    local: &str,
    font_name: &str,
    followers: &[&str],
) -> bool {
    let font = r_pr.get_or_insert_child(local, &dml(prefix, local), followers);
    if font.attr_unescaped("typeface").as_deref() == Some(font_name) {
        return false;
    }
    font.set_attr("typeface", font_name);
    true
}

/// Remap the run's explicit text color, if it has one.
pub fn remap_run_color(run: &mut Element, colors: &ColorMap) -> Result<Change, StyleError> {
    match run.child_mut("rPr") {
        Some(r_pr) => remap_solid_color(r_pr, colors),
        None => Ok(Change::Unchanged),
    }
}
