//! In-memory catalog model.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::friendly::friendly_name;

/// Comment given to master records that no template referenced yet.
pub const NOT_USED: &str = "not-used, archived.  Not currently needed for translation.";

/// Substring that marks a record comment as archived.
pub const NOT_USED_MARKER: &str = "not-used";

/// Runs of whitespace, collapsed by [`canonicalize`].
#[allow(clippy::unwrap_used)]
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Canonical lookup form of marker text: trimmed, whitespace runs collapsed.
#[must_use]
pub fn canonicalize(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

/// One translatable unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Free-text context, usually the template that referenced the text.
    pub comment: String,
    /// Original text; unique lookup key within a catalog.
    pub source_text: String,
    /// Locale-specific replacement, empty when untranslated.
    pub translated_text: String,
}

impl Record {
    /// Creates a record.
    #[must_use]
    pub fn new(
        comment: impl Into<String>,
        source_text: impl Into<String>,
        translated_text: impl Into<String>,
    ) -> Self {
        Self {
            comment: comment.into(),
            source_text: source_text.into(),
            translated_text: translated_text.into(),
        }
    }

    /// Whether the record carries the not-used marker.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.comment.contains(NOT_USED_MARKER)
    }
}

/// One translation file: the master `.pot` or a single locale's `.po`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Records by source text.
    records: HashMap<String, Record>,
    /// Insertion order of `records`; never holds the empty key.
    order: Vec<String>,
    /// Header pseudo-record (empty source text), kept apart from `records`.
    header: Option<Record>,
    /// Parsed header block.
    headers: HashMap<String, String>,
    /// Locale code, e.g. `fr_FR`.
    locale: String,
    /// Display name of the language in itself.
    language_name: String,
    /// Master keys with a translation.
    pub(super) translated: usize,
    /// Master keys, header excluded.
    pub(super) total: usize,
    /// Formatted completion, e.g. `50.00%`; empty before a merge.
    pub(super) percent_translated: String,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record, keeping the key's first position.
    ///
    /// Records with an empty source text become the header.
    pub fn insert(&mut self, record: Record) {
        if record.source_text.is_empty() {
            self.header = Some(record);
            return;
        }
        if !self.records.contains_key(&record.source_text) {
            self.order.push(record.source_text.clone());
        }
        self.records.insert(record.source_text.clone(), record);
    }

    /// Record for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    /// Mutable record for `key`.
    pub(super) fn get_mut(&mut self, key: &str) -> Option<&mut Record> {
        self.records.get_mut(key)
    }

    /// Whether `key` has a record.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().filter_map(|key| self.records.get(key))
    }

    /// Every record, header excluded, in file order.
    pub(super) fn records_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.values_mut()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of records, header excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether there are no records besides the header.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Header pseudo-record, if any.
    #[must_use]
    pub const fn header(&self) -> Option<&Record> {
        self.header.as_ref()
    }

    /// Replaces the parsed header block.
    pub(super) fn set_headers(&mut self, headers: HashMap<String, String>) {
        self.headers = headers;
    }

    /// Parsed `Name: value` header block.
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Sets the locale and derives the display name from it.
    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
        self.language_name = friendly_name(&self.locale);
    }

    /// Overrides the display name.
    pub fn set_language_name(&mut self, name: impl Into<String>) {
        self.language_name = name.into();
    }

    /// Full locale code, e.g. `pt_BR`.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Language subtag, e.g. `pt`.
    #[must_use]
    pub fn lang(&self) -> &str {
        self.locale.split('_').next().unwrap_or_default()
    }

    /// Upper-cased language subtag, e.g. `PT`.
    #[must_use]
    pub fn lang_uc(&self) -> String {
        self.lang().to_uppercase()
    }

    /// Display name of the language.
    #[must_use]
    pub fn language_name(&self) -> &str {
        &self.language_name
    }

    /// Master keys translated in this catalog.
    #[must_use]
    pub const fn translated(&self) -> usize {
        self.translated
    }

    /// Master keys considered when scoring.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Completion percentage such as `"50.00%"`; empty before a merge.
    #[must_use]
    pub fn percent_translated(&self) -> &str {
        &self.percent_translated
    }
}
