//! Output categories: which template directory feeds which artifacts.

use std::sync::Arc;

use crate::config::ProcessorsConfig;

/// How the files of one template subdirectory are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCategory {
    /// Subdirectory of the template directory.
    pub directory: &'static str,
    /// Only files with this suffix belong to the category.
    pub extension: &'static str,
    /// Post-processing commands; empty means direct write.
    pub commands: Arc<[String]>,
    /// Backslash-escape quotes in translations (for string literals).
    pub escape_quotes: bool,
    /// One artifact per locale, suffixed with the locale code.
    pub multi_locale: bool,
    /// Write a gzip copy next to directly written files.
    pub compress: bool,
}

impl OutputCategory {
    /// The site's categories, in build order.
    #[must_use]
    pub fn standard_table(processors: &ProcessorsConfig) -> Vec<Self> {
        let category = |directory, extension, commands: &[String], escape_quotes, multi_locale, compress| Self {
            directory,
            extension,
            commands: Arc::from(commands),
            escape_quotes,
            multi_locale,
            compress,
        };
        vec![
            category("css", ".css", &processors.css, false, false, true),
            category("js", ".js", &processors.js, true, true, true),
            category("html", ".html", &processors.html, false, true, true),
            category("php", ".php", &processors.php, false, false, false),
            category("apache", ".htaccess", &processors.apache, false, false, false),
            category("apache", ".example", &processors.apache, false, false, false),
        ]
    }

    /// Whether `file_name` belongs to this category.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with(self.extension)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn table() -> Vec<OutputCategory> {
        let processors = ProcessorsConfig {
            html: vec!["mv [INPUT] [OUTPUT]".to_string()],
            ..ProcessorsConfig::default()
        };
        OutputCategory::standard_table(&processors)
    }

    #[rstest]
    #[case::css("css", ".css", false, false, true)]
    #[case::js("js", ".js", true, true, true)]
    #[case::html("html", ".html", false, true, true)]
    #[case::php("php", ".php", false, false, false)]
    #[case::htaccess("apache", ".htaccess", false, false, false)]
    #[case::example("apache", ".example", false, false, false)]
    fn table_flags(
        #[case] directory: &str,
        #[case] extension: &str,
        #[case] escape_quotes: bool,
        #[case] multi_locale: bool,
        #[case] compress: bool,
    ) {
        let table = table();
        let category = table.iter().find(|c| c.extension == extension).unwrap();

        assert_that!(category.directory, eq(directory));
        assert_that!(category.escape_quotes, eq(escape_quotes));
        assert_that!(category.multi_locale, eq(multi_locale));
        assert_that!(category.compress, eq(compress));
    }

    #[rstest]
    fn commands_come_from_processors() {
        let table = table();

        let html = table.iter().find(|c| c.directory == "html").unwrap();
        let css = table.iter().find(|c| c.directory == "css").unwrap();

        assert_that!(html.commands.to_vec(), elements_are![eq("mv [INPUT] [OUTPUT]")]);
        assert_that!(css.commands.to_vec(), is_empty());
    }

    #[rstest]
    #[case::suffix("dot.htaccess", true)]
    #[case::other_suffix("httpd.conf.example", false)]
    #[case::backup("dot.htaccess~", false)]
    fn htaccess_matching(#[case] file: &str, #[case] expected: bool) {
        let table = table();
        let htaccess = table.iter().find(|c| c.extension == ".htaccess").unwrap();

        assert_that!(htaccess.matches(file), eq(expected));
    }
}
