//! Display names of locales, written in the locale's own language.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Self-names keyed by normalized code (`pt_br`, `fr`).
///
/// Region-specific names are listed only where they differ from the bare
/// language name.
static SELF_NAMES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        ("af", "Afrikaans"),
        ("ar", "العربية"),
        ("az", "azərbaycan"),
        ("be", "беларуская"),
        ("bg", "български"),
        ("bs", "bosanski"),
        ("ca", "català"),
        ("cs", "čeština"),
        ("cy", "Cymraeg"),
        ("da", "dansk"),
        ("de", "Deutsch"),
        ("de_at", "Österreichisches Deutsch"),
        ("de_ch", "Schweizer Hochdeutsch"),
        ("el", "Ελληνικά"),
        ("en", "English"),
        ("en_au", "Australian English"),
        ("en_ca", "Canadian English"),
        ("en_gb", "British English"),
        ("en_us", "American English"),
        ("eo", "esperanto"),
        ("es", "español"),
        ("es_es", "español de España"),
        ("es_mx", "español de México"),
        ("et", "eesti"),
        ("eu", "euskara"),
        ("fa", "فارسی"),
        ("fi", "suomi"),
        ("fo", "føroyskt"),
        ("fr", "français"),
        ("fr_ca", "français canadien"),
        ("fr_ch", "français suisse"),
        ("gl", "galego"),
        ("he", "עברית"),
        ("hi", "हिन्दी"),
        ("hr", "hrvatski"),
        ("hu", "magyar"),
        ("hy", "հայերեն"),
        ("id", "Indonesia"),
        ("is", "íslenska"),
        ("it", "italiano"),
        ("ja", "日本語"),
        ("ka", "ქართული"),
        ("kk", "қазақ тілі"),
        ("ko", "한국어"),
        ("lt", "lietuvių"),
        ("lv", "latviešu"),
        ("mk", "македонски"),
        ("mn", "монгол"),
        ("ms", "Melayu"),
        ("mt", "Malti"),
        ("nb", "norsk bokmål"),
        ("nl", "Nederlands"),
        ("nl_be", "Vlaams"),
        ("nn", "nynorsk"),
        ("pl", "polski"),
        ("pt", "português"),
        ("pt_br", "português (Brasil)"),
        ("pt_pt", "português europeu"),
        ("ro", "română"),
        ("ru", "русский"),
        ("sk", "slovenčina"),
        ("sl", "slovenščina"),
        ("sq", "shqip"),
        ("sr", "српски"),
        ("sv", "svenska"),
        ("sw", "Kiswahili"),
        ("ta", "தமிழ்"),
        ("th", "ไทย"),
        ("tr", "Türkçe"),
        ("uk", "українська"),
        ("ur", "اردو"),
        ("uz", "o‘zbek"),
        ("vi", "Tiếng Việt"),
        ("zh", "中文"),
        ("zh_cn", "简体中文"),
        ("zh_hk", "繁體中文（香港）"),
        ("zh_tw", "繁體中文"),
    ]
    .into_iter()
    .collect()
});

/// Normalize language code (lowercase and replace - with _)
fn normalize_language_code(code: &str) -> String {
    code.to_lowercase().replace('-', "_")
}

/// Returns the locale's self-name, e.g. `fr_FR` → `français`.
///
/// Looks up the full code first, then the bare language subtag, and falls
/// back to the code itself when neither is known.
#[must_use]
pub fn friendly_name(locale: &str) -> String {
    let normalized = normalize_language_code(locale);
    if let Some(name) = SELF_NAMES.get(normalized.as_str()) {
        return (*name).to_string();
    }
    let language = normalized.split('_').next().unwrap_or_default();
    SELF_NAMES.get(language).map_or_else(|| locale.to_string(), |name| (*name).to_string())
}
