use crate::docx::{DocxResult, DocumentBuilder, Table};

/// One output document's worth of tables.
#[derive(Debug)]
pub(crate) struct TableBatch {
    /// 1-based position of this batch in the run.
    pub(crate) part: usize,
    pub(crate) tables: Vec<Table>,
    /// Total tables across the whole run, for the descriptive line.
    pub(crate) total_tables: usize,
}

impl TableBatch {
    pub(crate) fn file_name(&self) -> String {
        format!("tables_part_{:02}.docx", self.part)
    }

    fn heading(&self) -> String {
        format!("Extracted Tables - Part {}", self.part)
    }

    /// Render the batch as a complete .docx package: part heading, count
    /// line, then each table followed by a spacer paragraph.
    pub(crate) fn render(&self) -> DocxResult<Vec<u8>> {
        let mut builder = DocumentBuilder::new(&self.heading());
        builder.add_heading(&self.heading());
        builder.add_paragraph(&format!(
            "This document contains {} of {} tables.",
            self.tables.len(),
            self.total_tables
        ));
        for table in &self.tables {
            builder.add_table(table);
            builder.add_paragraph("");
        }
        builder.save()
    }
}

/// Partition `tables` into consecutive batches of `chunk_size`, the final
/// batch possibly shorter. Order is preserved and no table is split across
/// batches; empty input yields no batches. A zero `chunk_size` is clamped
/// to 1.
pub(crate) fn repaginate(tables: Vec<Table>, chunk_size: usize) -> Vec<TableBatch> {
    let chunk_size = chunk_size.max(1);
    let total_tables = tables.len();
    let mut batches = Vec::with_capacity(total_tables.div_ceil(chunk_size));
    let mut tables = tables.into_iter();
    let mut part = 0;
    loop {
        let chunk: Vec<Table> = tables.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }
        part += 1;
        batches.push(TableBatch {
            part,
            tables: chunk,
            total_tables,
        });
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::parse_tables;

    fn tables_with_markers(count: usize) -> Vec<Table> {
        let body: String = (0..count)
            .map(|i| {
                format!(
                    "<w:tbl><w:tblGrid><w:gridCol/></w:tblGrid>\
                     <w:tr><w:tc><w:p><w:r><w:t>t{i}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"
                )
            })
            .collect();
        let xml = format!(
            "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );
        parse_tables(xml.as_bytes()).unwrap()
    }

    fn marker(table: &Table) -> &str {
        &table.rows[0].cells[0].text
    }

    #[test]
    fn batch_count_is_ceil_of_n_over_k() {
        for (n, k, expected) in [(0, 30, 0), (1, 30, 1), (30, 30, 1), (31, 30, 2), (90, 30, 3)] {
            assert_eq!(repaginate(tables_with_markers(n), k).len(), expected);
        }
    }

    #[test]
    fn forty_five_tables_split_thirty_fifteen() {
        let batches = repaginate(tables_with_markers(45), 30);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].tables.len(), 30);
        assert_eq!(batches[1].tables.len(), 15);
        assert_eq!(batches[0].part, 1);
        assert_eq!(batches[1].part, 2);
    }

    #[test]
    fn concatenation_preserves_input_order() {
        let batches = repaginate(tables_with_markers(7), 3);
        let flattened: Vec<String> = batches
            .iter()
            .flat_map(|b| b.tables.iter())
            .map(|t| marker(t).to_string())
            .collect();
        let expected: Vec<String> = (0..7).map(|i| format!("t{i}")).collect();
        assert_eq!(flattened, expected);
    }

    #[test]
    fn empty_input_gives_no_batches() {
        assert!(repaginate(Vec::new(), 30).is_empty());
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        let batches = repaginate(tables_with_markers(3), 0);
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn batch_file_names_are_ordered() {
        let batches = repaginate(tables_with_markers(4), 2);
        assert_eq!(batches[0].file_name(), "tables_part_01.docx");
        assert_eq!(batches[1].file_name(), "tables_part_02.docx");
    }

    #[test]
    fn rendered_batch_reads_back_in_order() {
        let batches = repaginate(tables_with_markers(5), 2);
        let mut seen = Vec::new();
        for batch in &batches {
            let bytes = batch.render().unwrap();
            for table in crate::docx::read_tables(&bytes).unwrap() {
                seen.push(marker(&table).to_string());
            }
        }
        let expected: Vec<String> = (0..5).map(|i| format!("t{i}")).collect();
        assert_eq!(seen, expected);
    }
}
