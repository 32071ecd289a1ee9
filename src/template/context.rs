//! Data available to templates as `.`.
//!
//! Expanded templates are cached per path and shared by every locale, so
//! nothing here may depend on the locale being built.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::TemplateError;
use crate::catalog::{
    Catalog,
    CatalogSet,
};
use crate::gitinfo::GitInfo;

/// Completion figures of one locale, as `.PoMap.<locale>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocaleSummary {
    /// Locale code.
    pub locale: String,
    /// Language display name.
    pub language: String,
    /// Translated master keys.
    pub translated: usize,
    /// Master keys.
    pub out_of: usize,
    /// Formatted completion, e.g. `50.00%`.
    pub percent_translated: String,
}

impl LocaleSummary {
    /// Summary of a merged catalog.
    #[must_use]
    pub fn of(catalog: &Catalog) -> Self {
        Self {
            locale: catalog.locale().to_string(),
            language: catalog.language_name().to_string(),
            translated: catalog.translated(),
            out_of: catalog.total(),
            percent_translated: catalog.percent_translated().to_string(),
        }
    }
}

/// Template context. Field names are PascalCase in templates.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateData {
    /// Details about the checkout.
    pub git_info: GitInfo,
    /// Completion figures by locale code.
    pub po_map: BTreeMap<String, LocaleSummary>,
    /// File name up to the first `.`.
    pub basename: String,
    /// Apache `AddLanguage` directives.
    pub add_language: String,
    /// Signature of the template directory.
    pub dir_signature: String,
}

impl TemplateData {
    /// Fields holding maps, where a missing key reads as nil.
    pub const MAP_FIELDS: &'static [&'static str] = &["PoMap"];

    /// Context shared by all files of one template directory.
    #[must_use]
    pub fn for_directory(git_info: GitInfo, catalogs: &CatalogSet, dir_signature: String) -> Self {
        Self {
            git_info,
            po_map: catalogs
                .locales()
                .iter()
                .map(|(code, catalog)| (code.clone(), LocaleSummary::of(catalog)))
                .collect(),
            basename: String::new(),
            add_language: catalogs.language_directives(),
            dir_signature,
        }
    }

    /// Copy for one file.
    #[must_use]
    pub fn with_file(&self, file_name: &str) -> Self {
        Self { basename: basename(file_name).to_string(), ..self.clone() }
    }

    /// JSON view evaluated by the template engine.
    ///
    /// # Errors
    /// Returns [`TemplateError::Data`] if serialization fails.
    pub fn to_value(&self) -> Result<Value, TemplateError> {
        serde_json::to_value(self).map_err(|e| TemplateError::Data(e.to_string()))
    }
}

/// `index.html` → `index`, `faq.part.html` → `faq`.
#[must_use]
pub fn basename(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::catalog::{
        Record,
        merge_locale,
    };

    #[rstest]
    #[case::simple("index.html", "index")]
    #[case::double_extension("faq.part.html", "faq")]
    #[case::dotfile("dot.htaccess", "dot")]
    #[case::no_extension("README", "README")]
    fn basename_stops_at_first_dot(#[case] file_name: &str, #[case] expected: &str) {
        assert_that!(basename(file_name), eq(expected));
    }

    #[rstest]
    fn value_uses_pascal_case_fields() {
        let mut master = Catalog::new();
        master.insert(Record::new("", "slow", ""));
        master.insert(Record::new("", "fast", ""));
        let mut fr = Catalog::new();
        fr.set_locale("fr_FR");
        fr.insert(Record::new("", "slow", "lent"));
        merge_locale(&master, &mut fr);
        let catalogs = CatalogSet::from_parts(master, [fr]);

        let data = TemplateData::for_directory(GitInfo::default(), &catalogs, "abc".to_string())
            .with_file("index.html");
        let value = data.to_value().unwrap();

        assert_that!(value["Basename"].as_str(), some(eq("index")));
        assert_that!(value["DirSignature"].as_str(), some(eq("abc")));
        assert_that!(value["GitInfo"]["ProjectVersion"].as_str(), some(eq("x.notags")));
        assert_that!(value["PoMap"]["fr_FR"]["PercentTranslated"].as_str(), some(eq("50.00%")));
        assert_that!(value["PoMap"]["fr_FR"]["Language"].as_str(), some(eq("français")));
        assert_that!(value["PoMap"]["fr_FR"]["OutOf"].as_u64(), some(eq(2)));
        assert_that!(value["AddLanguage"].as_str(), some(starts_with("AddLanguage en .en_US\n")));
    }
}
