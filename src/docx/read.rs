use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use super::error::{DocxError, DocxResult};
use super::table::{Table, parse_tables};

const DOCUMENT_PART: &str = "word/document.xml";

/// Open a .docx package from bytes and enumerate its top-level tables in
/// document order.
pub(crate) fn read_tables(bytes: &[u8]) -> DocxResult<Vec<Table>> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| DocxError::Package(e.to_string()))?;
    let mut part = match archive.by_name(DOCUMENT_PART) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Err(DocxError::MissingPart(DOCUMENT_PART)),
        Err(e) => return Err(DocxError::Package(e.to_string())),
    };
    let mut xml = Vec::with_capacity(part.size() as usize);
    part.read_to_end(&mut xml)?;
    parse_tables(&xml)
}

pub(crate) fn read_tables_from_path(path: &Path) -> DocxResult<Vec<Table>> {
    read_tables(&fs::read(path)?)
}
