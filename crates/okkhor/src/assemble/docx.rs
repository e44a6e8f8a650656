//! Minimal OOXML writer for the styled output document.
//!
//! Only the parts a word processor needs to open the file are emitted:
//! content types, package relationships, a styles part defining the two
//! heading levels, and the document body itself.

use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::classify::{ClassifiedLine, LineRole};
use crate::error::ConvertError;

const WORDPROCESSING_NS: &str =
    "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// 1 inch in twentieths of a point.
const MARGIN_TWIPS: &str = "1440";
/// 1.5 line spacing in 240ths of a line.
const BODY_LINE_SPACING: &str = "360";
/// 6pt space after body paragraphs, in twentieths of a point.
const BODY_SPACE_AFTER: &str = "120";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:styleId="Heading1">
<w:name w:val="heading 1"/>
<w:pPr><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr>
<w:rPr><w:b/><w:sz w:val="32"/></w:rPr>
</w:style>
<w:style w:type="paragraph" w:styleId="Heading2">
<w:name w:val="heading 2"/>
<w:pPr><w:spacing w:before="200" w:after="100"/><w:outlineLvl w:val="1"/></w:pPr>
<w:rPr><w:b/><w:sz w:val="28"/></w:rPr>
</w:style>
</w:styles>"#;

fn assembly_err<E: std::fmt::Display>(e: E) -> ConvertError {
    ConvertError::Assembly(e.to_string())
}

/// Builds a complete, independently openable DOCX from the classified lines
/// of all pages. A page break follows every page except the last.
pub fn build_docx(classified_pages: &[Vec<ClassifiedLine>]) -> Result<Vec<u8>, ConvertError> {
    let document = build_document_xml(classified_pages)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/document.xml", document.as_slice()),
    ] {
        zip.start_file(name, options).map_err(assembly_err)?;
        zip.write_all(content).map_err(assembly_err)?;
    }

    let cursor = zip.finish().map_err(assembly_err)?;
    Ok(cursor.into_inner())
}

fn build_document_xml(classified_pages: &[Vec<ClassifiedLine>]) -> Result<Vec<u8>, ConvertError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(assembly_err)?;

    let mut document = BytesStart::new("w:document");
    document.push_attribute(("xmlns:w", WORDPROCESSING_NS));
    writer
        .write_event(Event::Start(document))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:body")))
        .map_err(assembly_err)?;

    for (index, lines) in classified_pages.iter().enumerate() {
        for line in lines {
            match line.role {
                LineRole::Empty => write_empty_paragraph(&mut writer)?,
                LineRole::Title => write_heading(&mut writer, "Heading1", &line.text)?,
                LineRole::Subtitle => write_heading(&mut writer, "Heading2", &line.text)?,
                LineRole::Paragraph => write_body_paragraph(&mut writer, &line.text)?,
            }
        }

        if index + 1 < classified_pages.len() {
            write_page_break(&mut writer)?;
        }
    }

    write_section_properties(&mut writer)?;

    writer
        .write_event(Event::End(BytesEnd::new("w:body")))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:document")))
        .map_err(assembly_err)?;

    Ok(writer.into_inner().into_inner())
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write_empty_paragraph(writer: &mut XmlWriter) -> Result<(), ConvertError> {
    writer
        .write_event(Event::Empty(BytesStart::new("w:p")))
        .map_err(assembly_err)
}

fn write_heading(writer: &mut XmlWriter, style: &str, text: &str) -> Result<(), ConvertError> {
    writer
        .write_event(Event::Start(BytesStart::new("w:p")))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:pPr")))
        .map_err(assembly_err)?;
    let mut p_style = BytesStart::new("w:pStyle");
    p_style.push_attribute(("w:val", style));
    writer
        .write_event(Event::Empty(p_style))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:pPr")))
        .map_err(assembly_err)?;
    write_run(writer, text)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:p")))
        .map_err(assembly_err)
}

fn write_body_paragraph(writer: &mut XmlWriter, text: &str) -> Result<(), ConvertError> {
    writer
        .write_event(Event::Start(BytesStart::new("w:p")))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:pPr")))
        .map_err(assembly_err)?;
    let mut spacing = BytesStart::new("w:spacing");
    spacing.push_attribute(("w:after", BODY_SPACE_AFTER));
    spacing.push_attribute(("w:line", BODY_LINE_SPACING));
    spacing.push_attribute(("w:lineRule", "auto"));
    writer
        .write_event(Event::Empty(spacing))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:pPr")))
        .map_err(assembly_err)?;
    write_run(writer, text)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:p")))
        .map_err(assembly_err)
}

fn write_run(writer: &mut XmlWriter, text: &str) -> Result<(), ConvertError> {
    writer
        .write_event(Event::Start(BytesStart::new("w:r")))
        .map_err(assembly_err)?;
    let mut t = BytesStart::new("w:t");
    t.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(t)).map_err(assembly_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:t")))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:r")))
        .map_err(assembly_err)
}

fn write_page_break(writer: &mut XmlWriter) -> Result<(), ConvertError> {
    writer
        .write_event(Event::Start(BytesStart::new("w:p")))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:r")))
        .map_err(assembly_err)?;
    let mut br = BytesStart::new("w:br");
    br.push_attribute(("w:type", "page"));
    writer.write_event(Event::Empty(br)).map_err(assembly_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:r")))
        .map_err(assembly_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:p")))
        .map_err(assembly_err)
}

fn write_section_properties(writer: &mut XmlWriter) -> Result<(), ConvertError> {
    writer
        .write_event(Event::Start(BytesStart::new("w:sectPr")))
        .map_err(assembly_err)?;

    let mut page_size = BytesStart::new("w:pgSz");
    page_size.push_attribute(("w:w", "12240"));
    page_size.push_attribute(("w:h", "15840"));
    writer
        .write_event(Event::Empty(page_size))
        .map_err(assembly_err)?;

    let mut margins = BytesStart::new("w:pgMar");
    margins.push_attribute(("w:top", MARGIN_TWIPS));
    margins.push_attribute(("w:right", MARGIN_TWIPS));
    margins.push_attribute(("w:bottom", MARGIN_TWIPS));
    margins.push_attribute(("w:left", MARGIN_TWIPS));
    margins.push_attribute(("w:header", "720"));
    margins.push_attribute(("w:footer", "720"));
    margins.push_attribute(("w:gutter", "0"));
    writer
        .write_event(Event::Empty(margins))
        .map_err(assembly_err)?;

    writer
        .write_event(Event::End(BytesEnd::new("w:sectPr")))
        .map_err(assembly_err)
}
