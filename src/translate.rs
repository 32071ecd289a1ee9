//! Marker substitution for one locale.

use regex::Captures;

use crate::catalog::{
    Catalog,
    canonicalize,
};
use crate::template::expand::MARKER;

/// Resolves one marker text against `catalog`.
///
/// Dynamic keywords answer from the locale itself and are returned as is.
/// Anything else is the catalog's translation, or the canonical text when
/// there is none; with `escape_quotes` every `"` and `'` in it is
/// backslash-escaped.
#[must_use]
pub fn translate(catalog: &Catalog, text: &str, escape_quotes: bool) -> String {
    let key = canonicalize(text);
    match key.as_str() {
        "lang" => return catalog.lang().to_string(),
        "langUC" => return catalog.lang_uc(),
        "locale" => return catalog.locale().to_string(),
        "langname" => return catalog.language_name().to_string(),
        "percenttranslated" => return catalog.percent_translated().to_string(),
        _ => {}
    }

    let resolved = match catalog.get(&key) {
        Some(record) if !record.translated_text.is_empty() => record.translated_text.clone(),
        _ => key,
    };
    if escape_quotes { resolved.replace('"', "\\\"").replace('\'', "\\'") } else { resolved }
}

/// Replaces every `{{ … }}` marker in `content`.
#[must_use]
pub fn translate_content(catalog: &Catalog, content: &str, escape_quotes: bool) -> String {
    MARKER
        .replace_all(content, |captures: &Captures<'_>| {
            translate(catalog, captures.get(1).map_or("", |m| m.as_str()), escape_quotes)
        })
        .into_owned()
}
