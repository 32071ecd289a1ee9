//! Completion statistics and usage recording against the master catalog.

use std::path::Path;
use std::sync::{
    Mutex,
    MutexGuard,
    PoisonError,
};

use super::error::CatalogError;
use super::model::{
    Catalog,
    NOT_USED,
    Record,
    canonicalize,
};

/// Marker texts answered from the locale itself and never stored.
const DYNAMIC_KEYWORDS: [&str; 3] = ["lang", "langUC", "locale"];

/// Scores `locale` against the keys of `master`.
///
/// A key counts as translated when the locale has a non-empty translation
/// that differs from the key itself.
pub fn merge_locale(master: &Catalog, locale: &mut Catalog) {
    let mut translated = 0;
    let mut total = 0;
    for key in master.keys() {
        total += 1;
        if locale
            .get(key)
            .is_some_and(|record| !record.translated_text.is_empty() && record.translated_text != key)
        {
            translated += 1;
        }
    }

    locale.translated = translated;
    locale.total = total;
    if total > 0 {
        locale.percent_translated = format_percent(translated, total);
    }
    tracing::debug!(
        locale = locale.locale(),
        translated,
        total,
        percent = locale.percent_translated(),
        "Merged catalog"
    );
}

/// `translated / total` as a percentage with two decimals, e.g. `50.00%`.
#[allow(clippy::float_arithmetic, clippy::cast_precision_loss)]
fn format_percent(translated: usize, total: usize) -> String {
    let percent = 100.0 * translated as f64 / total as f64;
    format!("{percent:.2}%")
}

impl Catalog {
    /// Records that a template referenced `key`.
    ///
    /// Unknown keys are appended with `context` as their comment; archived
    /// records are reactivated with the new context. Returns `true` when the
    /// catalog changed.
    pub fn record_usage(&mut self, key: &str, context: &str) -> bool {
        let key = canonicalize(key);
        if key.is_empty() || DYNAMIC_KEYWORDS.contains(&key.as_str()) {
            return false;
        }

        match self.get_mut(&key) {
            None => {
                tracing::debug!(key = %key, context, "New catalog entry");
                self.insert(Record::new(context, key, ""));
                true
            }
            Some(record) if record.is_archived() => {
                record.comment = context.to_string();
                true
            }
            Some(_) => false,
        }
    }

    /// Replaces every record comment with the archive sentinel.
    pub fn archive_all(&mut self) {
        for record in self.records_mut() {
            record.comment = NOT_USED.to_string();
        }
    }
}

/// The master catalog, shared by every build job.
#[derive(Debug, Default)]
pub struct MasterCatalog {
    /// The master catalog itself.
    inner: Mutex<Catalog>,
}

impl MasterCatalog {
    /// Wraps a loaded master catalog.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self { inner: Mutex::new(catalog) }
    }

    /// Locks the catalog, recovering from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Thread-safe [`Catalog::record_usage`]; the lookup and the insert or
    /// update happen under one lock.
    pub fn record_usage(&self, key: &str, context: &str) -> bool {
        self.lock().record_usage(key, context)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Catalog {
        self.lock().clone()
    }

    /// Runs `f` with the catalog locked.
    pub fn with_catalog<R>(&self, f: impl FnOnce(&Catalog) -> R) -> R {
        f(&self.lock())
    }

    /// Writes the catalog to `path`.
    ///
    /// # Errors
    /// Returns [`CatalogError::Write`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        self.lock().save(path)
    }
}
