//! Record loading: delimited product tables flattened into text documents

pub mod loader;

pub use loader::{format_document, load_documents, strip_paragraph_tags};

/// Column whose markup gets stripped before flattening
pub const DESCRIPTION_COLUMN: &str = "Description";

/// Field delimiter of the input table
pub const DELIMITER: u8 = b';';

/// A flattened record: `"Column: value"` lines joined by `\n`, followed by a
/// blank line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document(String);

impl Document {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<String> for Document {
  fn from(text: String) -> Self {
    Self(text)
  }
}

impl AsRef<str> for Document {
  fn as_ref(&self) -> &str {
    &self.0
  }
}
