use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use chrono::Utc;
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::{DocxError, DocxResult};
use super::table::Table;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n";

// The standard WordprocessingML namespace set. Cloned table subtrees may
// carry attributes from the extension namespaces (w14:paraId and friends),
// so the output root must declare them for the splice to stay well-formed.
const DOCUMENT_NAMESPACES: &str = concat!(
    "xmlns:wpc=\"http://schemas.microsoft.com/office/word/2010/wordprocessingCanvas\" ",
    "xmlns:mc=\"http://schemas.openxmlformats.org/markup-compatibility/2006\" ",
    "xmlns:o=\"urn:schemas-microsoft-com:office:office\" ",
    "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" ",
    "xmlns:m=\"http://schemas.openxmlformats.org/officeDocument/2006/math\" ",
    "xmlns:v=\"urn:schemas-microsoft-com:vml\" ",
    "xmlns:wp14=\"http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing\" ",
    "xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" ",
    "xmlns:w10=\"urn:schemas-microsoft-com:office:word\" ",
    "xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" ",
    "xmlns:w14=\"http://schemas.microsoft.com/office/word/2010/wordml\" ",
    "xmlns:w15=\"http://schemas.microsoft.com/office/word/2012/wordml\" ",
    "xmlns:wpg=\"http://schemas.microsoft.com/office/word/2010/wordprocessingGroup\" ",
    "xmlns:wpi=\"http://schemas.microsoft.com/office/word/2010/wordprocessingInk\" ",
    "xmlns:wne=\"http://schemas.microsoft.com/office/word/2006/wordml\" ",
    "xmlns:wps=\"http://schemas.microsoft.com/office/word/2010/wordprocessingShape\" ",
    "mc:Ignorable=\"w14 w15 wp14\"",
);

// US Letter with one-inch margins.
const SECTION_PROPS: &str = concat!(
    "<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/>",
    "<w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" ",
    "w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/></w:sectPr>",
);

const CONTENT_TYPES: &str = concat!(
    "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
    "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
    "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
    "<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>",
    "<Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>",
    "<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>",
    "<Override PartName=\"/docProps/app.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.extended-properties+xml\"/>",
    "</Types>",
);

const PACKAGE_RELS: &str = concat!(
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>",
    "<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>",
    "<Relationship Id=\"rId3\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties\" Target=\"docProps/app.xml\"/>",
    "</Relationships>",
);

const DOCUMENT_RELS: &str = concat!(
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
    "</Relationships>",
);

// Normal, Heading1, and a bordered TableGrid. Cloned tables keep their own
// style references; anything beyond these defaults degrades to Normal Table
// rendering in Word.
const STYLES_PART: &str = concat!(
    "<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
    "<w:docDefaults><w:rPrDefault><w:rPr>",
    "<w:rFonts w:ascii=\"Calibri\" w:hAnsi=\"Calibri\"/><w:sz w:val=\"22\"/>",
    "</w:rPr></w:rPrDefault><w:pPrDefault/></w:docDefaults>",
    "<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\">",
    "<w:name w:val=\"Normal\"/><w:qFormat/></w:style>",
    "<w:style w:type=\"paragraph\" w:styleId=\"Heading1\">",
    "<w:name w:val=\"heading 1\"/><w:basedOn w:val=\"Normal\"/><w:qFormat/>",
    "<w:pPr><w:spacing w:before=\"240\" w:after=\"120\"/><w:outlineLvl w:val=\"0\"/></w:pPr>",
    "<w:rPr><w:b/><w:sz w:val=\"32\"/></w:rPr></w:style>",
    "<w:style w:type=\"table\" w:default=\"1\" w:styleId=\"TableNormal\">",
    "<w:name w:val=\"Normal Table\"/></w:style>",
    "<w:style w:type=\"table\" w:styleId=\"TableGrid\">",
    "<w:name w:val=\"Table Grid\"/><w:basedOn w:val=\"TableNormal\"/>",
    "<w:tblPr><w:tblBorders>",
    "<w:top w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
    "<w:left w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
    "<w:bottom w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
    "<w:right w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
    "<w:insideH w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
    "<w:insideV w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>",
    "</w:tblBorders></w:tblPr></w:style>",
    "</w:styles>",
);

const APP_PART: &str = concat!(
    "<Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\">",
    "<Application>tablecourier</Application>",
    "</Properties>",
);

/// Accumulates body content for one output document, then serializes the
/// complete minimal package in a single pass.
pub(crate) struct DocumentBuilder {
    title: String,
    body: String,
}

impl DocumentBuilder {
    pub(crate) fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            body: String::new(),
        }
    }

    pub(crate) fn add_heading(&mut self, text: &str) {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr>\
             <w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
            escape(text)
        ));
    }

    /// Empty text produces a bare spacer paragraph.
    pub(crate) fn add_paragraph(&mut self, text: &str) {
        if text.is_empty() {
            self.body.push_str("<w:p/>");
        } else {
            self.body.push_str(&format!(
                "<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
                escape(text)
            ));
        }
    }

    /// Splice a table's captured subtree into the body verbatim. This is
    /// the structural clone: grid, spans, style references, and nested
    /// content all survive untouched.
    pub(crate) fn add_table(&mut self, table: &Table) {
        self.body.push_str(&table.xml);
    }

    fn document_xml(&self) -> String {
        format!(
            "{XML_DECL}<w:document {DOCUMENT_NAMESPACES}><w:body>{}{SECTION_PROPS}</w:body></w:document>",
            self.body
        )
    }

    fn core_xml(&self) -> String {
        let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        format!(
            "{XML_DECL}<cp:coreProperties \
             xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
             xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
             xmlns:dcterms=\"http://purl.org/dc/terms/\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
             <dc:title>{}</dc:title><dc:creator>tablecourier</dc:creator>\
             <dcterms:created xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:created>\
             <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:modified>\
             </cp:coreProperties>",
            escape(&self.title)
        )
    }

    /// Serialize the package to bytes.
    pub(crate) fn save(&self) -> DocxResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut cursor);
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            let parts: [(&str, String); 7] = [
                ("[Content_Types].xml", format!("{XML_DECL}{CONTENT_TYPES}")),
                ("_rels/.rels", format!("{XML_DECL}{PACKAGE_RELS}")),
                ("word/document.xml", self.document_xml()),
                (
                    "word/_rels/document.xml.rels",
                    format!("{XML_DECL}{DOCUMENT_RELS}"),
                ),
                ("word/styles.xml", format!("{XML_DECL}{STYLES_PART}")),
                ("docProps/core.xml", self.core_xml()),
                ("docProps/app.xml", format!("{XML_DECL}{APP_PART}")),
            ];
            for (name, content) in &parts {
                zip.start_file(*name, options)
                    .map_err(|e| DocxError::Write(e.to_string()))?;
                zip.write_all(content.as_bytes())?;
            }
            zip.finish().map_err(|e| DocxError::Write(e.to_string()))?;
        }
        Ok(cursor.into_inner())
    }

    pub(crate) fn save_to_path(&self, path: &Path) -> DocxResult<()> {
        fs::write(path, self.save()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::read::read_tables;
    use super::super::table::parse_tables;
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn parsed_table(marker: &str, span: usize) -> Table {
        let span_xml = if span > 1 {
            format!("<w:tcPr><w:gridSpan w:val=\"{span}\"/></w:tcPr>")
        } else {
            String::new()
        };
        let xml = format!(
            "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body><w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/></w:tblPr>\
             <w:tblGrid><w:gridCol/><w:gridCol/></w:tblGrid>\
             <w:tr><w:tc>{span_xml}<w:p><w:r><w:t>{marker}</w:t></w:r></w:p></w:tc></w:tr>\
             </w:tbl></w:body></w:document>"
        );
        parse_tables(xml.as_bytes()).unwrap().remove(0)
    }

    fn document_part(bytes: &[u8]) -> String {
        let mut archive = ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name("word/document.xml").unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn saved_package_reads_back() {
        let mut builder = DocumentBuilder::new("Part 1");
        builder.add_heading("Extracted Tables - Part 1");
        builder.add_paragraph("This document contains 1 of 1 tables.");
        builder.add_table(&parsed_table("alpha", 1));
        builder.add_paragraph("");

        let bytes = builder.save().unwrap();
        let tables = read_tables(&bytes).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0].cells[0].text, "alpha");
        assert_eq!(tables[0].style.as_deref(), Some("TableGrid"));
    }

    #[test]
    fn grid_span_survives_clone_and_reread() {
        let mut builder = DocumentBuilder::new("spans");
        builder.add_table(&parsed_table("wide", 2));
        let bytes = builder.save().unwrap();
        let tables = read_tables(&bytes).unwrap();
        assert_eq!(tables[0].rows[0].cells[0].grid_span, 2);
        assert_eq!(tables[0].spanned_cell_count(), 1);
    }

    #[test]
    fn heading_text_is_escaped() {
        let mut builder = DocumentBuilder::new("t");
        builder.add_heading("Tom & Jerry <3");
        let bytes = builder.save().unwrap();
        let xml = document_part(&bytes);
        assert!(xml.contains("Tom &amp; Jerry &lt;3"));
    }

    #[test]
    fn empty_paragraph_is_a_spacer() {
        let mut builder = DocumentBuilder::new("t");
        builder.add_paragraph("");
        assert!(builder.document_xml().contains("<w:p/>"));
    }

    #[test]
    fn package_has_required_parts() {
        let bytes = DocumentBuilder::new("t").save().unwrap();
        let mut archive = ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/_rels/document.xml.rels",
            "word/styles.xml",
            "docProps/core.xml",
            "docProps/app.xml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing part {name}");
        }
    }
}
