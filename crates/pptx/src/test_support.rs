//! In-memory `.pptx` packages for tests.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Wrap shape tree members in a complete slide part.
pub fn slide_xml(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        NS, shapes
    )
}

/// A slide with one plain rectangle.
pub fn rect_slide(name: &str) -> String {
    slide_xml(&format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="{}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:sp>"#,
        name
    ))
}

/// Build a package whose slides are listed in the given order.
pub fn build_pptx(slides: &[&str]) -> Vec<u8> {
    let mut builder = PackageBuilder::new();
    for (idx, content) in slides.iter().enumerate() {
        let rel_id = format!("rId{}", idx + 2);
        let target = format!("slides/slide{}.xml", idx + 1);
        builder = builder.slide(&rel_id, &target, content);
    }
    builder.build()
}

pub struct PackageBuilder {
    slides: Vec<(String, String, String)>,
    order: Option<Vec<String>>,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self {
            slides: Vec::new(),
            order: None,
        }
    }

    /// Add a slide relationship; `target` is relative to `ppt/`.
    pub fn slide(mut self, rel_id: &str, target: &str, content: &str) -> Self {
        self.slides
            .push((rel_id.to_string(), target.to_string(), content.to_string()));
        self
    }

    /// Override the `p:sldIdLst` order.
    pub fn order(mut self, rel_ids: &[&str]) -> Self {
        self.order = Some(rel_ids.iter().map(|id| id.to_string()).collect());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let order = self
            .order
            .clone()
            .unwrap_or_else(|| self.slides.iter().map(|(id, _, _)| id.clone()).collect());

        let slide_ids: String = order
            .iter()
            .enumerate()
            .map(|(idx, rel_id)| format!(r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + idx, rel_id))
            .collect();
        let presentation = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#,
            NS, slide_ids
        );

        let mut rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
            REL_BASE
        );
        for (rel_id, target, _) in &self.slides {
            rels.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}/slide" Target="{}"/>"#,
                rel_id, REL_BASE, target
            ));
        }
        rels.push_str("</Relationships>");

        let package_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#,
            REL_BASE
        );

        let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/></Types>"#;

        let mut data = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut data));
            let options = FileOptions::default();

            let mut add = |name: &str, bytes: &[u8]| {
                zip.start_file(name, options).unwrap();
                zip.write_all(bytes).unwrap();
            };

            add("[Content_Types].xml", content_types.as_bytes());
            add("_rels/.rels", package_rels.as_bytes());
            add("ppt/presentation.xml", presentation.as_bytes());
            add("ppt/_rels/presentation.xml.rels", rels.as_bytes());
            for (_, target, content) in &self.slides {
                add(&format!("ppt/{}", target), content.as_bytes());
            }
            add("ppt/media/image1.png", FAKE_PNG);

            zip.finish().unwrap();
        }
        data
    }
}
