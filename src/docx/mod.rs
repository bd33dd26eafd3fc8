//! Minimal .docx (OOXML) support: enumerate the tables of an existing
//! package and emit new packages that carry structural clones of them.

pub(crate) mod error;
pub(crate) mod read;
pub(crate) mod table;
pub(crate) mod write;

pub(crate) use error::{DocxError, DocxResult};
pub(crate) use read::{read_tables, read_tables_from_path};
pub(crate) use table::{Table, parse_tables};
pub(crate) use write::DocumentBuilder;
