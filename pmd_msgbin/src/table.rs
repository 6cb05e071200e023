//! Tabular (csv) exchange of the message entries.
//!
//! The contract with the outside world is a named column: entries travel in
//! an `Index,ID,Entry` table and the translation pass work on any table with
//! an `Entry` column. Every other column of a table is carried through
//! unmodified.

use crate::translate::{Cell, GlossaryTranslator};
use crate::MessageBin;
use csv::StringRecord;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use thiserror::Error;

/// name of the column holding the text in every exchanged table
pub const ENTRY_COLUMN: &str = "Entry";
/// name of the column holding the original index in an entry table
pub const INDEX_COLUMN: &str = "Index";
/// name of the column holding the hash in an entry table
pub const ID_COLUMN: &str = "ID";

/// An error that may occur during a tabular exchange
#[derive(Error, Debug)]
pub enum TableError {
    #[error("an input/output error occured")]
    IOError(#[from] std::io::Error),
    #[error("an error occured reading or writing the csv data")]
    CsvError(#[from] csv::Error),
    #[error("the table has no {0:?} column")]
    ColumnMissing(String),
    #[error("the table has {got} rows, but {expected} replacement cells were provided")]
    RowCountMismatch { expected: usize, got: usize },
}

/// A non fatal event reported by [`import_entries`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// a row referenced an original index that is not present in the file
    IndexNotFound(usize),
    /// the index cell of a row could not be parsed as a number
    BadIndex(String),
}

fn column_position(headers: &StringRecord, column: &str) -> Result<usize, TableError> {
    headers
        .iter()
        .position(|header| header == column)
        .map_or_else(|| Err(TableError::ColumnMissing(column.to_string())), Ok)
}

/// Read the named column of a csv table into cells. An empty field is
/// surfaced as an opaque cell.
pub fn read_column<R: Read>(input: R, column: &str) -> Result<Vec<Cell>, TableError> {
    let mut reader = csv::Reader::from_reader(input);
    let position = column_position(reader.headers()?, column)?;
    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record?;
        match record.get(position) {
            None | Some("") => cells.push(Cell::Opaque),
            Some(text) => cells.push(Cell::Text(text.to_string())),
        }
    }
    Ok(cells)
}

/// Rewrite the named column of a csv table, keeping every other column and
/// the row order. Opaque cells leave the original field in place. The number
/// of cells must match the number of rows.
pub fn write_column<R: Read, W: Write>(
    input: R,
    output: W,
    column: &str,
    cells: &[Cell],
) -> Result<(), TableError> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let position = column_position(&headers, column)?;
    let records = reader
        .records()
        .collect::<Result<Vec<StringRecord>, csv::Error>>()?;
    if records.len() != cells.len() {
        return Err(TableError::RowCountMismatch {
            expected: cells.len(),
            got: records.len(),
        });
    }

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&headers)?;
    for (record, cell) in records.iter().zip(cells) {
        let mut row = StringRecord::new();
        for (field_position, field) in record.iter().enumerate() {
            match cell {
                Cell::Text(text) if field_position == position => row.push_field(text),
                _ => row.push_field(field),
            }
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Dump the entries of the file as an `Index,ID,Entry` table.
pub fn export_entries<W: Write>(
    output: W,
    message_bin: &MessageBin,
) -> Result<(), TableError> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&[INDEX_COLUMN, ID_COLUMN, ENTRY_COLUMN])?;
    for entry in message_bin.entries() {
        writer.write_record(&[
            entry.original_index().to_string(),
            entry.hash().to_string(),
            entry.text().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Update the entries of the file from an `Index,ID,Entry` table, matching
/// rows on the `Index` column.
///
/// Rows with a blank index are skipped silently, rows whose index is
/// unparsable or unknown are skipped with a warning. The `ID` column is
/// ignored, the hashes of the file are immutable.
pub fn import_entries<R: Read>(
    input: R,
    message_bin: &mut MessageBin,
) -> Result<Vec<ImportWarning>, TableError> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let index_position = column_position(&headers, INDEX_COLUMN)?;
    let entry_position = column_position(&headers, ENTRY_COLUMN)?;

    let by_original_index: BTreeMap<usize, usize> = message_bin
        .entries()
        .iter()
        .enumerate()
        .map(|(position, entry)| (entry.original_index(), position))
        .collect();

    let mut warnings = Vec::new();
    for record in reader.records() {
        let record = record?;
        let index_text = record.get(index_position).unwrap_or("").trim();
        if index_text.is_empty() {
            continue;
        }
        let index: usize = match index_text.parse() {
            Ok(index) => index,
            Err(_) => {
                warnings.push(ImportWarning::BadIndex(index_text.to_string()));
                continue;
            }
        };
        let position = match by_original_index.get(&index) {
            Some(position) => *position,
            None => {
                warnings.push(ImportWarning::IndexNotFound(index));
                continue;
            }
        };
        let text = record.get(entry_position).unwrap_or("").trim();
        if let Some(entry) = message_bin.entry_mut(position) {
            entry.set_text(text);
        }
    }
    Ok(warnings)
}

/// Read a glossary table with `Source` and `Translation` columns into a
/// [`GlossaryTranslator`].
pub fn read_glossary<R: Read>(input: R) -> Result<GlossaryTranslator, TableError> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let source_position = column_position(&headers, "Source")?;
    let translation_position = column_position(&headers, "Translation")?;
    let mut glossary = GlossaryTranslator::new_empty();
    for record in reader.records() {
        let record = record?;
        let source = record.get(source_position).unwrap_or("");
        if source.is_empty() {
            continue;
        }
        glossary.add_translation(source, record.get(translation_position).unwrap_or(""));
    }
    Ok(glossary)
}
