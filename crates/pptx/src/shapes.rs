//! Shape model over slide XML.
//!
//! The kind of every shape is decided once, when a shape tree is loaded.
//! Each variant owns its XML element; group shapes own their members so the
//! styler can recurse without re-probing the markup.

use crate::drawing;
use crate::xml::{Element, Node};

/// An entry of a shape tree: either a shape or markup that is not a shape
/// (`nvGrpSpPr`, `grpSpPr`, whitespace, `mc:AlternateContent`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Shape(Shape),
    Other(Node),
}

impl Member {
    /// Classify a child node of a shape tree.
    pub fn from_node(node: Node) -> Self {
        match node {
            Node::Element(element) => match Shape::from_element(element) {
                Ok(shape) => Member::Shape(shape),
                Err(element) => Member::Other(Node::Element(element)),
            },
            other => Member::Other(other),
        }
    }

    /// Turn the member back into markup.
    pub fn into_node(self) -> Node {
        match self {
            Member::Shape(shape) => Node::Element(shape.into_element()),
            Member::Other(node) => node,
        }
    }
}

/// Classify all children of a shape tree element.
pub fn members_from_nodes(nodes: Vec<Node>) -> Vec<Member> {
    nodes.into_iter().map(Member::from_node).collect()
}

/// Reassemble the children of a shape tree element.
pub fn nodes_from_members(members: Vec<Member>) -> Vec<Node> {
    members.into_iter().map(Member::into_node).collect()
}

/// A shape on a slide, by the rule path it takes through the styler.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// `p:grpSp`.
    Group(GroupShape),
    /// `p:sp` with a text body.
    TextFrame(DrawingShape),
    /// `p:graphicFrame` holding an `a:tbl`.
    Table(TableShape),
    /// Everything else that can be drawn.
    Generic(DrawingShape),
}

impl Shape {
    /// Build a shape from its element, or hand the element back when it is
    /// not a shape.
    pub fn from_element(element: Element) -> Result<Self, Element> {
        let local = element.local_name().to_owned();
        let shape = match local.as_str() {
            "grpSp" => Shape::Group(GroupShape::from_element(element)),
            "sp" if element.child("txBody").is_some() => {
                Shape::TextFrame(DrawingShape::new(element, DrawingKind::AutoShape))
            }
            "sp" => Shape::Generic(DrawingShape::new(element, DrawingKind::AutoShape)),
            "cxnSp" => Shape::Generic(DrawingShape::new(element, DrawingKind::Connector)),
            "pic" => Shape::Generic(DrawingShape::new(element, DrawingKind::Picture)),
            "graphicFrame" if element.find(TABLE_PATH).is_some() => {
                Shape::Table(TableShape::new(element))
            }
            "graphicFrame" => Shape::Generic(DrawingShape::new(element, DrawingKind::GraphicFrame)),
            "contentPart" => Shape::Generic(DrawingShape::new(element, DrawingKind::ContentPart)),
            _ => return Err(element),
        };
        Ok(shape)
    }

    pub fn name(&self) -> &str {
        match self {
            Shape::Group(group) => &group.name,
            Shape::TextFrame(shape) | Shape::Generic(shape) => &shape.name,
            Shape::Table(table) => &table.name,
        }
    }

    /// Whether this shape owns a text frame.
    pub fn has_text_frame(&self) -> bool {
        matches!(self, Shape::TextFrame(_))
    }

    /// Turn the shape back into markup.
    pub fn into_element(self) -> Element {
        match self {
            Shape::Group(group) => group.into_element(),
            Shape::TextFrame(shape) | Shape::Generic(shape) => shape.element,
            Shape::Table(table) => table.element,
        }
    }
}

/// Name from `nv*Pr/cNvPr/@name`.
fn shape_name(element: &Element) -> String {
    element
        .elements()
        .find(|e| e.local_name().starts_with("nv"))
        .and_then(|nv| nv.child("cNvPr"))
        .and_then(|c_nv_pr| c_nv_pr.attr_unescaped("name"))
        .unwrap_or_default()
}

/// A group and its members.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupShape {
    name: String,
    /// The `p:grpSp` element with its children moved into `members`.
    element: Element,
    members: Vec<Member>,
}

impl GroupShape {
    fn from_element(mut element: Element) -> Self {
        let name = shape_name(&element);
        let members = members_from_nodes(std::mem::take(&mut element.children));
        Self {
            name,
            element,
            members,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member shapes in document order.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.members.iter().filter_map(|member| match member {
            Member::Shape(shape) => Some(shape),
            Member::Other(_) => None,
        })
    }

    /// Mutable member shapes in document order.
    pub fn shapes_mut(&mut self) -> impl Iterator<Item = &mut Shape> {
        self.members.iter_mut().filter_map(|member| match member {
            Member::Shape(shape) => Some(shape),
            Member::Other(_) => None,
        })
    }

    /// Whether the group contains any shape.
    pub fn has_shapes(&self) -> bool {
        self.shapes().next().is_some()
    }

    /// Whether any shape below this group, at any depth, owns a text frame.
    pub fn has_text_descendant(&self) -> bool {
        self.shapes().any(|shape| match shape {
            Shape::Group(group) => group.has_text_descendant(),
            other => other.has_text_frame(),
        })
    }

    fn into_element(self) -> Element {
        let mut element = self.element;
        element.children = nodes_from_members(self.members);
        element
    }
}

/// What sort of drawable element a [`DrawingShape`] wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingKind {
    /// `p:sp`.
    AutoShape,
    /// `p:cxnSp`.
    Connector,
    /// `p:pic`.
    Picture,
    /// `p:graphicFrame` without a table (charts, diagrams, OLE objects).
    GraphicFrame,
    /// `p:contentPart` (ink).
    ContentPart,
}

impl DrawingKind {
    /// Whether the shape has a fill of its own.
    pub fn has_fill(self) -> bool {
        matches!(self, DrawingKind::AutoShape)
    }

    /// Whether the shape has an outline in `p:spPr`.
    pub fn has_outline(self) -> bool {
        matches!(
            self,
            DrawingKind::AutoShape | DrawingKind::Connector | DrawingKind::Picture
        )
    }
}

/// A non-group, non-table shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingShape {
    name: String,
    kind: DrawingKind,
    element: Element,
}

impl DrawingShape {
    fn new(element: Element, kind: DrawingKind) -> Self {
        Self {
            name: shape_name(&element),
            kind,
            element,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DrawingKind {
        self.kind
    }

    /// Shape properties (`p:spPr`).
    pub fn properties(&self) -> Option<&Element> {
        self.element.child("spPr")
    }

    pub fn properties_mut(&mut self) -> Option<&mut Element> {
        self.element.child_mut("spPr")
    }

    /// Text body (`p:txBody`).
    pub fn text_body(&self) -> Option<&Element> {
        self.element.child("txBody")
    }

    pub fn text_body_mut(&mut self) -> Option<&mut Element> {
        self.element.child_mut("txBody")
    }

    /// Explicit RGB fill color.
    pub fn fill_rgb(&self) -> Option<&str> {
        self.properties().and_then(drawing::solid_rgb)
    }

    /// Explicit RGB outline color.
    pub fn line_rgb(&self) -> Option<&str> {
        self.properties().and_then(drawing::line_rgb)
    }

    /// Whether the outline is set to "no fill".
    pub fn is_outline_removed(&self) -> bool {
        self.properties()
            .map(drawing::is_outline_removed)
            .unwrap_or(false)
    }
}

/// Path from a graphic frame to its table.
const TABLE_PATH: &[&str] = &["graphic", "graphicData", "tbl"];

/// A graphic frame holding a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableShape {
    name: String,
    element: Element,
}

impl TableShape {
    fn new(element: Element) -> Self {
        Self {
            name: shape_name(&element),
            element,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cells (`a:tc`) in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Element> {
        self.element
            .find(TABLE_PATH)
            .into_iter()
            .flat_map(|tbl| tbl.children_named("tr"))
            .flat_map(|tr| tr.children_named("tc"))
    }

    /// Mutable cells in row-major order.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.element
            .find_mut(TABLE_PATH)
            .into_iter()
            .flat_map(|tbl| tbl.children_named_mut("tr"))
            .flat_map(|tr| tr.children_named_mut("tc"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    fn parse(xml: &str) -> Element {
        let wrapped = format!(
            r#"<root xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">{}</root>"#,
            xml
        );
        let doc = XmlDocument::parse(&wrapped).unwrap();
        let elem = doc.root.elements().next().unwrap().clone();
        elem
    }

    #[test]
    fn test_classify_text_shape() {
        let element = parse(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/></p:nvSpPr><p:spPr/><p:txBody><a:p/></p:txBody></p:sp>"#,
        );
        let shape = Shape::from_element(element).unwrap();
        assert!(matches!(shape, Shape::TextFrame(_)));
        assert_eq!(shape.name(), "Title 1");
        assert!(shape.has_text_frame());
    }

    #[test]
    fn test_classify_generic_shapes() {
        let sp = parse(r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Rectangle 2"/></p:nvSpPr><p:spPr/></p:sp>"#);
        match Shape::from_element(sp).unwrap() {
            Shape::Generic(shape) => {
                assert_eq!(shape.kind(), DrawingKind::AutoShape);
                assert!(shape.kind().has_fill());
            }
            other => panic!("unexpected {:?}", other),
        }

        let cxn = parse(r#"<p:cxnSp><p:nvCxnSpPr><p:cNvPr id="4" name="Connector 5"/></p:nvCxnSpPr><p:spPr/></p:cxnSp>"#);
        match Shape::from_element(cxn).unwrap() {
            Shape::Generic(shape) => {
                assert_eq!(shape.kind(), DrawingKind::Connector);
                assert_eq!(shape.name(), "Connector 5");
                assert!(!shape.kind().has_fill());
                assert!(shape.kind().has_outline());
            }
            other => panic!("unexpected {:?}", other),
        }

        let chart = parse(r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="5" name="Chart 1"/></p:nvGraphicFramePr><a:graphic><a:graphicData uri="chart"/></a:graphic></p:graphicFrame>"#);
        match Shape::from_element(chart).unwrap() {
            Shape::Generic(shape) => {
                assert_eq!(shape.kind(), DrawingKind::GraphicFrame);
                assert!(!shape.kind().has_outline());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_table() {
        let element = parse(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="6" name="Table 3"/></p:nvGraphicFramePr><a:graphic><a:graphicData><a:tbl><a:tr><a:tc/><a:tc/></a:tr><a:tr><a:tc/><a:tc/></a:tr></a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        );
        match Shape::from_element(element).unwrap() {
            Shape::Table(table) => {
                assert_eq!(table.name(), "Table 3");
                assert_eq!(table.cells().count(), 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_non_shape_is_returned() {
        let element = parse(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/></p:nvGrpSpPr>"#);
        assert!(Shape::from_element(element).is_err());
    }

    #[test]
    fn test_group_members_and_round_trip() {
        let element = parse(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="7" name="Group 6"/></p:nvGrpSpPr><p:grpSpPr/><p:grpSp><p:nvGrpSpPr><p:cNvPr id="8" name="Group 7"/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="9" name="TextBox 8"/></p:nvSpPr><p:spPr/><p:txBody/></p:sp></p:grpSp><p:cxnSp><p:nvCxnSpPr><p:cNvPr id="10" name="Connector 9"/></p:nvCxnSpPr><p:spPr/></p:cxnSp></p:grpSp>"#,
        );
        let original = element.clone();

        let shape = Shape::from_element(element).unwrap();
        let Shape::Group(group) = &shape else {
            panic!("expected a group");
        };
        assert_eq!(group.name(), "Group 6");
        assert_eq!(group.shapes().count(), 2);
        assert!(group.has_shapes());
        assert!(group.has_text_descendant());

        assert_eq!(shape.into_element(), original);
    }

    #[test]
    fn test_group_without_text() {
        let element = parse(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="7" name="Group 6"/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="9" name="Oval 8"/></p:nvSpPr><p:spPr/></p:sp></p:grpSp>"#,
        );
        let Ok(Shape::Group(group)) = Shape::from_element(element) else {
            panic!("expected a group");
        };
        assert!(group.has_shapes());
        assert!(!group.has_text_descendant());
    }
}
