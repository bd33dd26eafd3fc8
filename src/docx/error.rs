use std::io;
use thiserror::Error;

pub(crate) type DocxResult<T> = Result<T, DocxError>;

/// Errors from the .docx package layer.
#[derive(Error, Debug)]
pub(crate) enum DocxError {
    /// I/O error while reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bytes are not a readable .docx (zip) package.
    #[error("not a .docx package: {0}")]
    Package(String),

    /// The package is a zip but a required part is absent.
    #[error("missing package part: {0}")]
    MissingPart(&'static str),

    /// word/document.xml could not be parsed.
    #[error("malformed document XML: {0}")]
    Xml(String),

    /// An element attribute could not be decoded.
    #[error("malformed attribute: {0}")]
    Attr(String),

    /// The output package could not be serialized.
    #[error("failed to write package: {0}")]
    Write(String),
}
