//! PPTX package loading and saving.
//!
//! A `.pptx` is a ZIP archive of XML parts. Slides are found through the
//! package relationships and `p:sldIdLst`; on save, slide parts are
//! re-encoded and every other entry is raw-copied.

use crate::slide::Slide;
use quick_xml::events::Event;
use quick_xml::Reader;
use restyle_core::{Error, PresentationFormat, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Package-level relationships part.
const PACKAGE_RELS: &str = "_rels/.rels";

/// Where the presentation part lives when the package relationships do not say.
const DEFAULT_PRESENTATION_PART: &str = "ppt/presentation.xml";

const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// A slide part that could not be read; it is copied through unchanged.
#[derive(Debug, Clone)]
pub struct UnreadableSlide {
    pub number: usize,
    pub part_name: String,
    pub reason: String,
}

/// An opened presentation package.
#[derive(Debug, Clone)]
pub struct PptxPresentation {
    /// Original archive bytes; unchanged entries are copied from here.
    source: Vec<u8>,
    slides: Vec<Slide>,
    unreadable: Vec<UnreadableSlide>,
}

impl PptxPresentation {
    /// Open a `.pptx` file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        log::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(bytes)
    }

    /// Load a presentation from archive bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        match PresentationFormat::from_magic(&bytes) {
            Some(PresentationFormat::Pptx) => {}
            Some(PresentationFormat::Ppt) => {
                return Err(Error::UnsupportedFormat(
                    "legacy .ppt files are not supported; save the file as .pptx first"
                        .to_string(),
                ));
            }
            None => {
                return Err(Error::UnsupportedFormat(
                    "not a ZIP-based PowerPoint package".to_string(),
                ));
            }
        }

        let mut slides = Vec::new();
        let mut unreadable = Vec::new();
        {
            let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))
                .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

            let presentation_part = find_presentation_part(&mut archive)?;
            let slide_parts = get_slide_order(&mut archive, &presentation_part)?;
            log::debug!("Found {} slides in {}", slide_parts.len(), presentation_part);

            for (idx, part_name) in slide_parts.into_iter().enumerate() {
                let number = idx + 1;
                let loaded = read_file_from_archive(&mut archive, &part_name)
                    .and_then(|content| Slide::parse(number, part_name.as_str(), &content));

                match loaded {
                    Ok(slide) => slides.push(slide),
                    Err(e) => {
                        log::warn!("Slide {} ({}) will be copied unchanged: {}", number, part_name, e);
                        unreadable.push(UnreadableSlide {
                            number,
                            part_name,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            source: bytes,
            slides,
            unreadable,
        })
    }

    /// Parsed slides in presentation order.
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slides_mut(&mut self) -> &mut [Slide] {
        &mut self.slides
    }

    /// Slides that failed to load.
    pub fn unreadable_slides(&self) -> &[UnreadableSlide] {
        &self.unreadable
    }

    /// Number of slides, including unreadable ones.
    pub fn slide_count(&self) -> usize {
        self.slides.len() + self.unreadable.len()
    }

    /// Assemble the output archive in memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut updated: HashMap<&str, Vec<u8>> = HashMap::new();
        for slide in &self.slides {
            updated.insert(slide.part_name(), slide.to_xml()?);
        }

        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))
            .map_err(|e| Error::ZipError(format!("Failed to reopen source archive: {}", e)))?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            let name = file.name().to_string();

            match updated.get(name.as_str()) {
                Some(bytes) => {
                    zip.start_file(name.as_str(), options)
                        .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
                    zip.write_all(bytes)?;
                }
                None => {
                    zip.raw_copy_file(file)
                        .map_err(|e| Error::ZipError(format!("Failed to copy '{}': {}", name, e)))?;
                }
            }
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        Ok(cursor.into_inner())
    }

    /// Write the presentation to `path`.
    ///
    /// The archive is built in memory first, so a failure never leaves a
    /// half-written file behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        std::fs::write(path, bytes).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Error::OutputLocked {
                path: path.display().to_string(),
            },
            _ => Error::IoError(e),
        })
    }
}

/// A `Relationship` entry of a `.rels` part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// Parse the relationships of a `.rels` part.
fn parse_relationships(content: &str) -> Result<Vec<Relationship>> {
    let mut relationships = Vec::new();
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship::default();

                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map(|v| v.to_string())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }

                relationships.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Whether a relationship type points at a slide (not a layout or master).
fn is_slide_relationship(rel_type: &str) -> bool {
    rel_type.ends_with("/slide")
}

/// Resolve the presentation part from the package relationships.
fn find_presentation_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let content = match read_file_from_archive(archive, PACKAGE_RELS) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("Package relationships unreadable ({}); assuming {}", e, DEFAULT_PRESENTATION_PART);
            return Ok(DEFAULT_PRESENTATION_PART.to_string());
        }
    };

    let part = parse_relationships(&content)?
        .into_iter()
        .find(|rel| rel.rel_type.ends_with(OFFICE_DOCUMENT_REL))
        .map(|rel| resolve_target("", &rel.target))
        .unwrap_or_else(|| DEFAULT_PRESENTATION_PART.to_string());

    Ok(part)
}

/// Get the ordered list of slide part names.
///
/// The order comes from `p:sldIdLst` in the presentation part; when that is
/// missing the slide relationships are ordered by the number in their id or
/// target, as older writers number them sequentially.
fn get_slide_order<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    presentation_part: &str,
) -> Result<Vec<String>> {
    let presentation = read_file_from_archive(archive, presentation_part).map_err(|e| {
        Error::PptxParseError(format!("Missing presentation part '{}': {}", presentation_part, e))
    })?;

    let rels_part = relationships_part_for(presentation_part);
    let rels_content = read_file_from_archive(archive, &rels_part)?;
    let relationships = parse_relationships(&rels_content)?;

    let targets: HashMap<&str, String> = relationships
        .iter()
        .filter(|rel| is_slide_relationship(&rel.rel_type))
        .map(|rel| (rel.id.as_str(), resolve_target(presentation_part, &rel.target)))
        .collect();

    let listed = slide_id_list(&presentation)?;
    if !listed.is_empty() {
        let mut order = Vec::with_capacity(listed.len());
        for rel_id in listed {
            match targets.get(rel_id.as_str()) {
                Some(target) => order.push(target.clone()),
                None => log::warn!("Slide id list references unknown relationship '{}'", rel_id),
            }
        }
        return Ok(order);
    }

    let mut slides: Vec<(String, Option<usize>)> = relationships
        .iter()
        .filter(|rel| is_slide_relationship(&rel.rel_type))
        .map(|rel| {
            let order_num =
                extract_slide_number(&rel.id).or_else(|| extract_slide_number(&rel.target));
            (resolve_target(presentation_part, &rel.target), order_num)
        })
        .collect();

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    Ok(slides.into_iter().map(|(path, _)| path).collect())
}

/// Relationship ids of `p:sldIdLst/p:sldId` in document order.
fn slide_id_list(presentation_xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(presentation_xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                // The relationship id is the namespaced `r:id`; plain `id` is
                // the numeric slide id.
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|attr| {
                        let key = attr.key.as_ref();
                        key.contains(&b':') && local_name(key) == b"id"
                    })
                    .map(|attr| String::from_utf8_lossy(&attr.value).to_string());

                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation part: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// `ppt/presentation.xml` -> `ppt/_rels/presentation.xml.rels`.
fn relationships_part_for(part_name: &str) -> String {
    match part_name.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part_name),
    }
}

/// Resolve a relationship target against the part that owns it.
fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Read a text part from the ZIP archive.
fn read_file_from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_pptx, rect_slide, PackageBuilder};

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sldId"), b"sldId");
        assert_eq!(local_name(b"Relationship"), b"Relationship");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slides/slide1.xml"),
            "ppt/slides/slide1.xml"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../slideLayouts/slideLayout2.xml"),
            "ppt/slideLayouts/slideLayout2.xml"
        );
        assert_eq!(
            resolve_target("ppt/presentation.xml", "/ppt/slides/slide9.xml"),
            "ppt/slides/slide9.xml"
        );
        assert_eq!(resolve_target("", "ppt/presentation.xml"), "ppt/presentation.xml");
    }

    #[test]
    fn test_relationships_part_for() {
        assert_eq!(
            relationships_part_for("ppt/presentation.xml"),
            "ppt/_rels/presentation.xml.rels"
        );
        assert_eq!(relationships_part_for("doc.xml"), "_rels/doc.xml.rels");
    }

    #[test]
    fn test_slide_relationship_types() {
        let base = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
        assert!(is_slide_relationship(&format!("{}/slide", base)));
        assert!(!is_slide_relationship(&format!("{}/slideLayout", base)));
        assert!(!is_slide_relationship(&format!("{}/slideMaster", base)));
    }

    #[test]
    fn test_slide_order_follows_id_list() {
        // Relationship ids are deliberately out of step with the list order.
        let bytes = PackageBuilder::new()
            .slide("rId7", "slides/slide1.xml", &rect_slide("First"))
            .slide("rId3", "slides/slide2.xml", &rect_slide("Second"))
            .order(&["rId3", "rId7"])
            .build();

        let presentation = PptxPresentation::from_bytes(bytes).unwrap();
        let parts: Vec<&str> = presentation.slides().iter().map(|s| s.part_name()).collect();
        assert_eq!(parts, vec!["ppt/slides/slide2.xml", "ppt/slides/slide1.xml"]);
        assert_eq!(presentation.slides()[0].number(), 1);
        assert!(presentation.slides()[0].shape("Second").is_some());
    }

    #[test]
    fn test_rejects_non_zip() {
        let result = PptxPresentation::from_bytes(b"<?xml version=\"1.0\"?><p/>".to_vec());
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_rejects_legacy_ppt() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.extend_from_slice(&[0; 504]);
        let result = PptxPresentation::from_bytes(bytes);
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_presentation_part_is_fatal() {
        let mut data = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut data));
            writer.start_file("hello.txt", FileOptions::default()).unwrap();
            writer.write_all(b"hi").unwrap();
            writer.finish().unwrap();
        }
        let result = PptxPresentation::from_bytes(data);
        assert!(matches!(result, Err(Error::PptxParseError(_))));
    }

    #[test]
    fn test_unreadable_slide_is_copied_through() {
        let broken = "<p:sld><p:cSld></p:sld>";
        let bytes = PackageBuilder::new()
            .slide("rId2", "slides/slide1.xml", broken)
            .slide("rId3", "slides/slide2.xml", &rect_slide("Fine"))
            .build();

        let presentation = PptxPresentation::from_bytes(bytes).unwrap();
        assert_eq!(presentation.slides().len(), 1);
        assert_eq!(presentation.unreadable_slides().len(), 1);
        assert_eq!(presentation.unreadable_slides()[0].number, 1);
        assert_eq!(presentation.slide_count(), 2);

        let output = presentation.to_bytes().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(output)).unwrap();
        let content = read_file_from_archive(&mut archive, "ppt/slides/slide1.xml").unwrap();
        assert_eq!(content, broken);
    }

    #[test]
    fn test_save_round_trip_keeps_other_entries() {
        let bytes = build_pptx(&[&rect_slide("Rectangle 1")]);
        let presentation = PptxPresentation::from_bytes(bytes).unwrap();
        let output = presentation.to_bytes().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(output.clone())).unwrap();
        let names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
        assert!(names.contains(&"[Content_Types].xml".to_string()));
        assert!(names.contains(&"ppt/presentation.xml".to_string()));
        assert!(names.contains(&"ppt/media/image1.png".to_string()));

        let mut media = Vec::new();
        archive
            .by_name("ppt/media/image1.png")
            .unwrap()
            .read_to_end(&mut media)
            .unwrap();
        assert_eq!(media, crate::test_support::FAKE_PNG);

        let reopened = PptxPresentation::from_bytes(output).unwrap();
        assert_eq!(reopened.slides().len(), 1);
        assert!(reopened.slides()[0].shape("Rectangle 1").is_some());
    }

    #[test]
    fn test_save_to_disk() {
        let bytes = build_pptx(&[&rect_slide("Rectangle 1")]);
        let presentation = PptxPresentation::from_bytes(bytes).unwrap();

        let path = std::env::temp_dir().join(format!("restyle-save-{}.pptx", std::process::id()));
        presentation.save(&path).unwrap();
        let reopened = PptxPresentation::open(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reopened.slides().len(), 1);
    }
}
