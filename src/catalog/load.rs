//! Catalog file parser.
//!
//! The format is a sequence of blank-line separated chunks. Each chunk is
//! made of `TOKEN value` lines; a line that starts with a quote continues
//! the previous token and its value is appended without a separator.
//!
//! ```text
//! #: faq.html
//! msgid ""
//! "Q: So, why worry? "
//! "NAT will work, right?"
//! msgstr ""
//! ```

use std::collections::HashMap;
use std::path::Path;

use super::error::CatalogError;
use super::model::{
    Catalog,
    Record,
};
use super::quote::{
    QuoteError,
    unquote,
};

/// Token of a record comment line.
const COMMENT_TOKEN: &str = "#:";
/// Token of the source text.
const SOURCE_TOKEN: &str = "msgid";
/// Token of the translated text.
const TRANSLATION_TOKEN: &str = "msgstr";
/// Header naming the catalog locale.
const LANGUAGE_HEADER: &str = "Language";

/// Reads and parses a catalog file.
///
/// # Errors
/// Returns [`CatalogError`] if the file cannot be read or is malformed.
pub fn load(path: &Path) -> Result<Catalog, CatalogError> {
    tracing::debug!(path = %path.display(), "Loading catalog");
    let text = std::fs::read_to_string(path)
        .map_err(|source| CatalogError::Read { path: path.to_path_buf(), source })?;
    parse(&text, path)
}

/// Parses catalog text. `origin` names the file in errors and decides
/// whether a missing `Language:` header is acceptable (only `.pot` files).
///
/// # Errors
/// Returns [`CatalogError`] for malformed chunks, bad quoting, a missing
/// header record or a missing `Language:` header on a locale catalog.
pub fn parse(text: &str, origin: &Path) -> Result<Catalog, CatalogError> {
    let chunks: Vec<&str> = text.split("\n\n").collect();
    if chunks.len() < 2 {
        return Err(CatalogError::BadFormat(origin.to_path_buf()));
    }

    let mut catalog = Catalog::new();
    for chunk in chunks {
        let record = parse_chunk(chunk)
            .map_err(|source| CatalogError::Unquote { path: origin.to_path_buf(), source })?;
        if record.source_text.is_empty() && record.translated_text.is_empty() {
            continue;
        }
        catalog.insert(record);
    }

    let headers = catalog
        .header()
        .map(|header| parse_headers(&header.translated_text))
        .ok_or_else(|| CatalogError::MissingHeader(origin.to_path_buf()))?;
    let locale = headers.get(LANGUAGE_HEADER).cloned().unwrap_or_default();
    catalog.set_headers(headers);

    if locale.is_empty() {
        if !is_master(origin) {
            return Err(CatalogError::MissingLanguage(origin.to_path_buf()));
        }
    } else {
        catalog.set_locale(locale);
    }

    Ok(catalog)
}

/// Whether `origin` is the master catalog (`.pot`).
fn is_master(origin: &Path) -> bool {
    origin.extension().is_some_and(|ext| ext == "pot")
}

/// Folds a chunk's lines into one record.
fn parse_chunk(chunk: &str) -> Result<Record, QuoteError> {
    let mut values: HashMap<&str, String> = HashMap::new();
    let mut token = "";

    for line in chunk.split('\n') {
        if line.is_empty() {
            continue;
        }
        let mut rest = line;
        if !line.starts_with('"') {
            (token, rest) = line.split_once(' ').unwrap_or((line, ""));
        }
        let value = if rest.starts_with('"') { unquote(rest)? } else { rest.to_string() };
        values.entry(token).or_default().push_str(&value);
    }

    let mut take = |name: &str| values.remove(name).unwrap_or_default();
    Ok(Record {
        comment: take(COMMENT_TOKEN),
        source_text: take(SOURCE_TOKEN),
        translated_text: take(TRANSLATION_TOKEN),
    })
}

/// Parses the header block (`Name: value` per line).
fn parse_headers(block: &str) -> HashMap<String, String> {
    block
        .split('\n')
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}
