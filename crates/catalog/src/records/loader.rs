//! Delimited table reader and document formatter

use anyhow::Result;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{error, info};

use super::{Document, DELIMITER, DESCRIPTION_COLUMN};
use crate::error::CatalogError;

const PARAGRAPH_TAGS: [&str; 2] = ["<p>", "</p>"];

/// Remove literal `<p>` and `</p>` tokens. Any other markup is left in place.
pub fn strip_paragraph_tags(description: &str) -> String {
  PARAGRAPH_TAGS.iter().fold(description.to_string(), |text, tag| text.replace(tag, ""))
}

/// Flatten one row into a document, in column order.
pub fn format_document<C, V>(columns: &[C], values: &[V]) -> Document
where
  C: AsRef<str>,
  V: AsRef<str>,
{
  let lines: Vec<String> = columns
    .iter()
    .zip(values.iter())
    .map(|(column, value)| format!("{}: {}", column.as_ref(), value.as_ref()))
    .collect();

  Document::from(format!("{}\n\n", lines.join("\n")))
}

/// Load a `;`-delimited table and turn every row into a [`Document`].
///
/// The first column is the row identifier and is dropped. A `Description`
/// column must be present among the remaining columns.
pub fn load_documents(file_path: &Path) -> Result<Vec<Document>> {
  let source = file_path.display().to_string();

  let file = File::open(file_path).map_err(|e| {
    error!(path = %source, error = %e, "Failed to open record file");
    CatalogError::io(&source, e.to_string())
  })?;

  let documents = read_documents(file, &source)?;
  info!(path = %source, documents = documents.len(), "Loaded documents");
  Ok(documents)
}

/// Parse documents from any reader; `source` names the input in errors.
pub fn read_documents<R: Read>(reader: R, source: &str) -> Result<Vec<Document>> {
  let mut reader =
    ReaderBuilder::new().delimiter(DELIMITER).has_headers(true).flexible(false).from_reader(reader);

  let headers = reader.headers().map_err(|e| parse_failure(source, e.to_string()))?.clone();
  let layout = TableLayout::from_headers(&headers).map_err(|message| parse_failure(source, message))?;

  let mut documents = Vec::new();
  for (row, record) in reader.records().enumerate() {
    let record = record.map_err(|e| parse_failure(source, format!("row {}: {e}", row + 1)))?;
    documents.push(layout.document_for(&record));
  }

  Ok(documents)
}

fn parse_failure(source: &str, message: String) -> anyhow::Error {
  error!(path = %source, error = %message, "Failed to parse record file");
  CatalogError::parse(source, message).into()
}

/// Column names after the identifier column, plus where `Description` sits
struct TableLayout {
  columns: Vec<String>,
  description_index: usize,
}

impl TableLayout {
  fn from_headers(headers: &StringRecord) -> std::result::Result<Self, String> {
    if headers.len() < 2 {
      return Err(format!(
        "expected an identifier column followed by data columns, found {} column(s)",
        headers.len()
      ));
    }

    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let description_index = columns
      .iter()
      .position(|column| column == DESCRIPTION_COLUMN)
      .ok_or_else(|| format!("missing '{DESCRIPTION_COLUMN}' column"))?;

    Ok(Self { columns, description_index })
  }

  fn document_for(&self, record: &StringRecord) -> Document {
    let values: Vec<String> = record
      .iter()
      .skip(1)
      .enumerate()
      .map(|(index, value)| {
        if index == self.description_index {
          strip_paragraph_tags(value)
        } else {
          value.to_string()
        }
      })
      .collect();

    format_document(&self.columns, &values)
  }
}
