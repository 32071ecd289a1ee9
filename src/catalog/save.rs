//! Catalog serializer.

use std::path::Path;

use super::error::CatalogError;
use super::model::{
    Catalog,
    Record,
};
use super::quote::quote;

/// Header written when a catalog has none of its own.
pub const DEFAULT_HEADER: &str = "Project-Id-Version: PACKAGE VERSION
PO-Revision-Date: YEAR-MO-DA HO:MI +ZONE
Last-Translator: Unspecified Translator <jfesler+unspecified-translator@test-ipv6.com>
Language-Team: LANGUAGE <v6code@test-ipv6.com>
MIME-Version: 1.0
Content-Type: text/plain; charset=UTF-8
Content-Transfer-Encoding: 8bit
";

/// Writes `label` and a quoted value, splitting multi-line values into one
/// quoted fragment per line after an empty first fragment.
fn write_field(out: &mut String, label: &str, content: &str) {
    out.push_str(label);
    out.push(' ');
    if content.contains('\n') {
        out.push_str("\"\"\n");
        for line in content.split_inclusive('\n') {
            out.push_str(&quote(line));
            out.push('\n');
        }
    } else {
        out.push_str(&quote(content));
        out.push('\n');
    }
}

/// Writes one record followed by the blank separator line.
fn write_record(out: &mut String, record: &Record) {
    if !record.comment.is_empty() {
        write_field(out, "#:", &record.comment);
    }
    write_field(out, "msgid", &record.source_text);
    write_field(out, "msgstr", &record.translated_text);
    out.push('\n');
}

impl Catalog {
    /// Renders the catalog: header first, then records in insertion order.
    #[must_use]
    pub fn to_po_string(&self) -> String {
        let mut out = String::new();
        match self.header() {
            Some(header) => write_record(&mut out, header),
            None => write_record(&mut out, &Record::new("", "", DEFAULT_HEADER)),
        }
        for record in self.records() {
            write_record(&mut out, record);
        }
        out
    }

    /// Writes the catalog to `path`.
    ///
    /// # Errors
    /// Returns [`CatalogError::Write`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        tracing::info!(path = %path.display(), records = self.len(), "Generating catalog");
        std::fs::write(path, self.to_po_string())
            .map_err(|source| CatalogError::Write { path: path.to_path_buf(), source })
    }
}
