//! A parsed slide part and its top-level shapes.

use crate::drawing::{DEFAULT_DML_PREFIX, DRAWINGML_NS};
use crate::shapes::{members_from_nodes, nodes_from_members, Member, Shape};
use crate::xml::{Element, XmlDocument};
use restyle_core::{Error, Result};

/// Path from `p:sld` to the slide's shape tree.
const SHAPE_TREE_PATH: &[&str] = &["cSld", "spTree"];

/// One slide, with its shape tree taken apart into shapes.
#[derive(Debug, Clone)]
pub struct Slide {
    number: usize,
    part_name: String,
    /// The slide XML with the shape tree children moved into `members`.
    document: XmlDocument,
    members: Vec<Member>,
    dml_prefix: String,
}

impl Slide {
    /// Parse a slide part.
    pub fn parse(number: usize, part_name: impl Into<String>, content: &str) -> Result<Self> {
        let mut document = XmlDocument::parse(content)?;
        let dml_prefix = resolve_dml_prefix(&mut document.root)?;
        let members = match document.root.find_mut(SHAPE_TREE_PATH) {
            Some(tree) => members_from_nodes(std::mem::take(&mut tree.children)),
            None => {
                log::debug!("Slide {} has no shape tree", number);
                Vec::new()
            }
        };

        Ok(Self {
            number,
            part_name: part_name.into(),
            document,
            members,
            dml_prefix,
        })
    }

    /// 1-based position in the presentation.
    pub fn number(&self) -> usize {
        self.number
    }

    /// ZIP entry name of the slide part, e.g. `ppt/slides/slide1.xml`.
    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    /// Prefix bound to the DrawingML namespace on the slide root; empty when
    /// DrawingML is the default namespace.
    pub fn dml_prefix(&self) -> &str {
        &self.dml_prefix
    }

    /// Top-level shapes in document order.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.members.iter().filter_map(|member| match member {
            Member::Shape(shape) => Some(shape),
            Member::Other(_) => None,
        })
    }

    /// Mutable top-level shapes in document order.
    pub fn shapes_mut(&mut self) -> impl Iterator<Item = &mut Shape> {
        self.members.iter_mut().filter_map(|member| match member {
            Member::Shape(shape) => Some(shape),
            Member::Other(_) => None,
        })
    }

    /// Find a top-level shape by name.
    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes().find(|shape| shape.name() == name)
    }

    /// Serialize the slide with its current shapes.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut document = self.document.clone();
        if let Some(tree) = document.root.find_mut(SHAPE_TREE_PATH) {
            tree.children = nodes_from_members(self.members.clone());
        }
        document.to_bytes()
    }
}

/// Find the DrawingML prefix declared on the slide root.
///
/// When none is declared, `xmlns:a` is added so created elements are bound.
/// A slide that uses `a` for another namespace cannot take new DrawingML
/// elements and is rejected.
fn resolve_dml_prefix(root: &mut Element) -> Result<String> {
    let declared = root.attributes().find_map(|(key, value)| {
        if value != DRAWINGML_NS {
            return None;
        }
        match key {
            "xmlns" => Some(String::new()),
            _ => key.strip_prefix("xmlns:").map(str::to_string),
        }
    });
    if let Some(prefix) = declared {
        return Ok(prefix);
    }

    let reserved = format!("xmlns:{}", DEFAULT_DML_PREFIX);
    if let Some(other) = root.attr(&reserved) {
        return Err(Error::PptxParseError(format!(
            "prefix '{}' is bound to '{}' and the DrawingML namespace is not declared on <{}>",
            DEFAULT_DML_PREFIX, other, root.name
        )));
    }

    root.set_attr(&reserved, DRAWINGML_NS);
    Ok(DEFAULT_DML_PREFIX.to_string())
}
