//! The master catalog together with every locale catalog.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::error::CatalogError;
use super::load::load;
use super::merge::{
    MasterCatalog,
    merge_locale,
};
use super::model::Catalog;
use crate::fsutil::files_in_dir_recursive;

/// Locale of the untranslated source text.
pub const SOURCE_LOCALE: &str = "en_US";

/// Display name of the source language.
pub const SOURCE_LANGUAGE: &str = "English";

/// Loaded catalogs, ready for a build.
#[derive(Debug)]
pub struct CatalogSet {
    /// Mutable master; templates record usage into it.
    master: Arc<MasterCatalog>,
    /// Master as loaded, used as the source locale's translation table.
    source: Arc<Catalog>,
    /// Merged locale catalogs by code.
    locales: BTreeMap<String, Arc<Catalog>>,
}

impl CatalogSet {
    /// Loads the master at `pot_path` and every `.po` file below
    /// `locale_dir`, scoring each locale against the master.
    ///
    /// Every master record starts out archived; the build reactivates the
    /// ones templates still reference.
    ///
    /// # Errors
    /// Returns [`CatalogError`] if any catalog fails to load or the locale
    /// directory cannot be listed.
    pub fn load_all(pot_path: &Path, locale_dir: &Path) -> Result<Self, CatalogError> {
        let mut master = load(pot_path)?;
        master.archive_all();

        let mut locales = Vec::new();
        for relative in files_in_dir_recursive(locale_dir)? {
            if relative.extension().is_none_or(|ext| ext != "po") {
                continue;
            }
            let mut locale = load(&locale_dir.join(&relative))?;
            merge_locale(&master, &mut locale);
            locales.push(locale);
        }

        tracing::info!(
            master = %pot_path.display(),
            records = master.len(),
            locales = locales.len(),
            "Loaded catalogs"
        );
        Ok(Self::from_parts(master, locales))
    }

    /// Builds a set from already merged catalogs.
    ///
    /// The master's locale is forced to the source language. A later locale
    /// with the same code replaces an earlier one.
    #[must_use]
    pub fn from_parts(mut master: Catalog, locales: impl IntoIterator<Item = Catalog>) -> Self {
        master.set_locale(SOURCE_LOCALE);
        master.set_language_name(SOURCE_LANGUAGE);
        let source = Arc::new(master.clone());
        let locales = locales
            .into_iter()
            .map(|catalog| (catalog.locale().to_string(), Arc::new(catalog)))
            .collect();
        Self { master: Arc::new(MasterCatalog::new(master)), source, locales }
    }

    /// Master catalog that collects template usage.
    #[must_use]
    pub fn master(&self) -> &Arc<MasterCatalog> {
        &self.master
    }

    /// Translation table of the source pseudo-locale.
    #[must_use]
    pub fn source(&self) -> &Arc<Catalog> {
        &self.source
    }

    /// Locale catalogs keyed by locale code, in code order.
    #[must_use]
    pub const fn locales(&self) -> &BTreeMap<String, Arc<Catalog>> {
        &self.locales
    }

    /// Catalog of locale `code`.
    #[must_use]
    pub fn locale(&self, code: &str) -> Option<&Arc<Catalog>> {
        self.locales.get(code)
    }

    /// Loaded locale codes, sorted.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }

    /// Apache `AddLanguage` directives for the source locale and every
    /// loaded locale, one per line, without duplicates.
    #[must_use]
    pub fn language_directives(&self) -> String {
        let mut seen = std::collections::HashSet::new();
        let mut text = String::new();
        let mut add = |line: String| {
            if seen.insert(line.clone()) {
                text.push_str(&line);
                text.push('\n');
            }
        };

        for locale in std::iter::once(SOURCE_LOCALE).chain(self.languages()) {
            let lang = locale.split('_').next().unwrap_or_default();
            add(format!("AddLanguage {lang} .{locale}"));
            add(format!("AddLanguage {} .{locale}", locale.replace('_', "-")));
        }
        text
    }
}
