use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::docx::{DocxError, read_tables_from_path};
use crate::repaginate::repaginate;

#[derive(Error, Debug)]
pub(crate) enum ConvertError {
    /// An input could not be read; the whole run is abandoned, including
    /// tables already collected from earlier files.
    #[error("failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: DocxError,
    },

    /// Output construction or serialization failed.
    #[error("failed to build output document: {0}")]
    Build(#[from] DocxError),
}

#[derive(Debug)]
pub(crate) struct OutputFile {
    pub(crate) path: PathBuf,
    /// Delivery name, independent of the on-disk prefix.
    pub(crate) name: String,
}

#[derive(Debug)]
pub(crate) struct ConvertOutcome {
    /// (input display name, tables found) per input, in input order.
    pub(crate) per_file: Vec<(String, usize)>,
    pub(crate) total_tables: usize,
    pub(crate) outputs: Vec<OutputFile>,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run one conversion: extract every table from `inputs` in order, then
/// write one output document per chunk of `tables_per_file` tables into
/// `out_dir`, each named `{prefix}tables_part_NN.docx`.
///
/// Zero tables is a success with zero outputs; the caller decides how to
/// surface "none found". The first unreadable input aborts the run.
pub(crate) fn convert_files(
    inputs: &[PathBuf],
    out_dir: &Path,
    tables_per_file: usize,
    prefix: &str,
) -> Result<ConvertOutcome, ConvertError> {
    let mut all_tables = Vec::new();
    let mut per_file = Vec::with_capacity(inputs.len());
    for input in inputs {
        let name = display_name(input);
        let tables = read_tables_from_path(input).map_err(|source| ConvertError::Read {
            file: name.clone(),
            source,
        })?;
        per_file.push((name, tables.len()));
        all_tables.extend(tables);
    }

    let total_tables = all_tables.len();
    let mut outputs = Vec::new();
    for batch in repaginate(all_tables, tables_per_file) {
        let name = batch.file_name();
        let path = out_dir.join(format!("{prefix}{name}"));
        let bytes = batch.render()?;
        std::fs::write(&path, bytes).map_err(DocxError::Io)?;
        outputs.push(OutputFile { path, name });
    }

    Ok(ConvertOutcome {
        per_file,
        total_tables,
        outputs,
    })
}
