use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, BytesText, Event};

use super::error::{DocxError, DocxResult};

/// One table lifted out of a source document.
///
/// `xml` is the verbatim `<w:tbl>` subtree and is what gets spliced into
/// output documents; the remaining fields are parsed metadata used for
/// reporting and tests. Nested tables stay embedded in their outer
/// table's subtree and are not listed separately.
#[derive(Debug, Clone)]
pub(crate) struct Table {
    pub(crate) xml: String,
    pub(crate) columns: usize,
    pub(crate) style: Option<String>,
    pub(crate) rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TableRow {
    pub(crate) cells: Vec<TableCell>,
}

#[derive(Debug, Clone)]
pub(crate) struct TableCell {
    pub(crate) text: String,
    pub(crate) grid_span: usize,
}

impl Table {
    pub(crate) fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn spanned_cell_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .filter(|cell| cell.grid_span > 1)
            .count()
    }
}

/// In-flight capture of one top-level `w:tbl` subtree. Every event between
/// the opening and closing tag is echoed through a quick-xml writer, so the
/// captured bytes are a lossless structural clone; grid, style, and cell
/// metadata are collected on the side, from depth 1 only.
struct Capture {
    writer: Writer<Cursor<Vec<u8>>>,
    depth: usize,
    columns: usize,
    style: Option<String>,
    rows: Vec<TableRow>,
    row: Option<TableRow>,
    cell: Option<TableCell>,
    in_text: bool,
}

impl Capture {
    fn new() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
            depth: 1,
            columns: 0,
            style: None,
            rows: Vec::new(),
            row: None,
            cell: None,
            in_text: false,
        }
    }

    fn write(&mut self, event: Event<'_>) -> DocxResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| DocxError::Xml(e.to_string()))
    }

    fn on_element(&mut self, e: &BytesStart<'_>) -> DocxResult<()> {
        if self.depth != 1 {
            return Ok(());
        }
        match e.name().as_ref() {
            b"w:tr" => self.row = Some(TableRow::default()),
            b"w:tc" => {
                self.cell = Some(TableCell {
                    text: String::new(),
                    grid_span: 1,
                })
            }
            b"w:t" => self.in_text = self.cell.is_some(),
            b"w:gridCol" => self.columns += 1,
            b"w:tblStyle" => self.style = attr_val(e, "w:val")?,
            b"w:gridSpan" => {
                if let Some(cell) = self.cell.as_mut() {
                    let span = attr_val(e, "w:val")?
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(1);
                    cell.grid_span = span.max(1);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_end(&mut self, e: &quick_xml::events::BytesEnd<'_>) {
        if self.depth != 1 {
            return;
        }
        match e.name().as_ref() {
            b"w:t" => self.in_text = false,
            b"w:p" => {
                // Paragraph boundary inside a cell: model text keeps it as
                // a newline, trimmed again when the cell closes.
                if let Some(cell) = self.cell.as_mut() {
                    cell.text.push('\n');
                }
            }
            b"w:tc" => {
                if let (Some(mut cell), Some(row)) = (self.cell.take(), self.row.as_mut()) {
                    while cell.text.ends_with('\n') {
                        cell.text.pop();
                    }
                    row.cells.push(cell);
                }
            }
            b"w:tr" => {
                if let Some(row) = self.row.take() {
                    self.rows.push(row);
                }
            }
            _ => {}
        }
    }

    fn on_text(&mut self, t: &BytesText<'_>) -> DocxResult<()> {
        if self.in_text && self.depth == 1 {
            if let Some(cell) = self.cell.as_mut() {
                let text = t.unescape().map_err(|e| DocxError::Xml(e.to_string()))?;
                cell.text.push_str(&text);
            }
        }
        Ok(())
    }

    fn finish(self) -> DocxResult<Table> {
        let bytes = self.writer.into_inner().into_inner();
        let xml = String::from_utf8(bytes)
            .map_err(|_| DocxError::Xml("table XML is not valid UTF-8".to_string()))?;
        Ok(Table {
            xml,
            columns: self.columns,
            style: self.style,
            rows: self.rows,
        })
    }
}

fn attr_val(e: &BytesStart<'_>, name: &str) -> DocxResult<Option<String>> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| DocxError::Attr(err.to_string()))?;
    match attr {
        Some(a) => {
            let value = a
                .unescape_value()
                .map_err(|err| DocxError::Attr(err.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

fn strip_bom(xml: &[u8]) -> &[u8] {
    xml.strip_prefix(b"\xef\xbb\xbf").unwrap_or(xml)
}

/// Enumerate the top-level tables of a `word/document.xml` part, in
/// document order.
pub(crate) fn parse_tables(xml: &[u8]) -> DocxResult<Vec<Table>> {
    let mut reader = Reader::from_reader(strip_bom(xml));
    let mut buf = Vec::new();
    let mut tables = Vec::new();
    let mut capture: Option<Capture> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| DocxError::Xml(e.to_string()))?;
        match event {
            Event::Eof => break,
            Event::Start(e) => {
                let is_tbl = e.name().as_ref() == b"w:tbl";
                match capture.as_mut() {
                    None if is_tbl => {
                        let mut cap = Capture::new();
                        cap.write(Event::Start(e))?;
                        capture = Some(cap);
                    }
                    None => {}
                    Some(cap) => {
                        if is_tbl {
                            cap.depth += 1;
                        }
                        cap.on_element(&e)?;
                        cap.write(Event::Start(e))?;
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(cap) = capture.as_mut() {
                    cap.on_element(&e)?;
                    cap.write(Event::Empty(e))?;
                }
            }
            Event::End(e) => {
                if let Some(mut cap) = capture.take() {
                    let is_tbl = e.name().as_ref() == b"w:tbl";
                    cap.on_end(&e);
                    cap.write(Event::End(e))?;
                    if is_tbl {
                        cap.depth -= 1;
                    }
                    if cap.depth == 0 {
                        tables.push(cap.finish()?);
                    } else {
                        capture = Some(cap);
                    }
                }
            }
            Event::Text(t) => {
                if let Some(cap) = capture.as_mut() {
                    cap.on_text(&t)?;
                    cap.write(Event::Text(t))?;
                }
            }
            other => {
                // CDATA, comments, and processing instructions inside a
                // table are carried over verbatim.
                if let Some(cap) = capture.as_mut() {
                    cap.write(other)?;
                }
            }
        }
        buf.clear();
    }

    if capture.is_some() {
        return Err(DocxError::Xml("unterminated w:tbl element".to_string()));
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        )
    }

    fn simple_table(marker: &str) -> String {
        format!(
            "<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/></w:tblPr>\
             <w:tblGrid><w:gridCol w:w=\"2400\"/><w:gridCol w:w=\"2400\"/></w:tblGrid>\
             <w:tr><w:tc><w:p><w:r><w:t>{marker}</w:t></w:r></w:p></w:tc>\
             <w:tc><w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"
        )
    }

    #[test]
    fn finds_tables_in_order() {
        let xml = document(&format!(
            "<w:p/>{}<w:p/>{}",
            simple_table("first"),
            simple_table("second")
        ));
        let tables = parse_tables(xml.as_bytes()).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows[0].cells[0].text, "first");
        assert_eq!(tables[1].rows[0].cells[0].text, "second");
    }

    #[test]
    fn captured_subtree_is_verbatim() {
        let tbl = simple_table("clone me");
        let xml = document(&tbl);
        let tables = parse_tables(xml.as_bytes()).unwrap();
        assert_eq!(tables[0].xml, tbl);
    }

    #[test]
    fn grid_metadata_and_style() {
        let xml = document(&simple_table("m"));
        let tables = parse_tables(xml.as_bytes()).unwrap();
        assert_eq!(tables[0].columns, 2);
        assert_eq!(tables[0].style.as_deref(), Some("TableGrid"));
        assert_eq!(tables[0].row_count(), 1);
        assert_eq!(tables[0].rows[0].cells.len(), 2);
    }

    #[test]
    fn grid_span_is_recorded() {
        let body = "<w:tbl><w:tblGrid><w:gridCol/><w:gridCol/></w:tblGrid>\
             <w:tr><w:tc><w:tcPr><w:gridSpan w:val=\"2\"/></w:tcPr>\
             <w:p><w:r><w:t>wide</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
        let xml = document(body);
        let tables = parse_tables(xml.as_bytes()).unwrap();
        let cell = &tables[0].rows[0].cells[0];
        assert_eq!(cell.grid_span, 2);
        assert_eq!(tables[0].spanned_cell_count(), 1);
    }

    #[test]
    fn nested_table_stays_inside_outer() {
        let inner = "<w:tbl><w:tblGrid><w:gridCol/></w:tblGrid>\
             <w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
        let body = format!(
            "<w:tbl><w:tblGrid><w:gridCol/><w:gridCol/></w:tblGrid>\
             <w:tr><w:tc><w:p><w:r><w:t>outer</w:t></w:r></w:p>{inner}</w:tc></w:tr></w:tbl>"
        );
        let xml = document(&body);
        let tables = parse_tables(xml.as_bytes()).unwrap();
        assert_eq!(tables.len(), 1);
        // Inner grid columns must not leak into the outer column count.
        assert_eq!(tables[0].columns, 2);
        assert!(tables[0].xml.contains("inner"));
        assert_eq!(tables[0].rows[0].cells[0].text, "outer");
    }

    #[test]
    fn escaped_text_is_unescaped_in_model_only() {
        let body = "<w:tbl><w:tblGrid><w:gridCol/></w:tblGrid>\
             <w:tr><w:tc><w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
        let xml = document(body);
        let tables = parse_tables(xml.as_bytes()).unwrap();
        assert_eq!(tables[0].rows[0].cells[0].text, "A & B");
        assert!(tables[0].xml.contains("A &amp; B"));
    }

    #[test]
    fn multi_paragraph_cell_joins_with_newline() {
        let body = "<w:tbl><w:tblGrid><w:gridCol/></w:tblGrid>\
             <w:tr><w:tc><w:p><w:r><w:t>one</w:t></w:r></w:p>\
             <w:p><w:r><w:t>two</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
        let xml = document(body);
        let tables = parse_tables(xml.as_bytes()).unwrap();
        assert_eq!(tables[0].rows[0].cells[0].text, "one\ntwo");
    }

    #[test]
    fn document_without_tables() {
        let xml = document("<w:p><w:r><w:t>prose only</w:t></w:r></w:p>");
        let tables = parse_tables(xml.as_bytes()).unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn truncated_document_fails() {
        let xml = document("<w:tbl><w:tr>");
        assert!(parse_tables(xml.as_bytes()).is_err());
    }
}
