//! 設定の型定義

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

/// 設定値の検証エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "directories.outputDir")
    pub field_path: String,
    /// エラーの説明
    pub message: String,
}

impl ValidationError {
    /// 検証エラーを作成
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

/// 設定の読み込みエラー
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 検証エラー（複数）
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    /// 設定ファイルを読み込めない
    #[error("Failed to load configuration file {}: {source}", path.display())]
    IoError {
        /// 対象のパス
        path: PathBuf,
        /// 元のエラー
        #[source]
        source: std::io::Error,
    },

    /// JSONC の構文エラー
    #[error("Failed to parse configuration: {0}")]
    SyntaxError(#[from] jsonc_parser::errors::ParseError),

    /// 設定値の型が合わない
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// 検証エラーを番号付きの行に整形する
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Settings of one site build.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildSettings {
    /// 入出力ディレクトリ
    pub directories: DirectoriesConfig,
    /// 後処理コマンド
    pub processors: ProcessorsConfig,

    /// Output name overrides, keyed by template file name.
    pub file_map: BTreeMap<String, String>,

    /// 実行オプション
    pub options: OptionsConfig,
}

/// 入出力ディレクトリの設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoriesConfig {
    /// One subdirectory per output category (`css`, `js`, `html`, ...).
    pub template_dir: PathBuf,
    /// Copied to `images/` and `images-nc/` in the output.
    pub images_dir: PathBuf,
    /// Static files served as is. Currently not copied.
    pub transparent_dir: PathBuf,
    /// Holds `<projectName>.pot` and the locale catalogs under `dl/`.
    pub po_dir: PathBuf,
    /// Removed and recreated on every build.
    pub output_dir: PathBuf,
}

impl Default for DirectoriesConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("templates"),
            images_dir: PathBuf::from("images"),
            transparent_dir: PathBuf::from("transparent"),
            po_dir: PathBuf::from("translations"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Shell commands run on each output file, per category.
///
/// An empty list means the file is written directly (and compressed where
/// the category asks for it).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessorsConfig {
    /// Free text for whoever edits the file. Never executed.
    pub note: Vec<String>,
    /// Commands for `js/` templates.
    pub js: Vec<String>,
    /// Commands for `css/` templates.
    pub css: Vec<String>,
    /// Commands for `html/` templates.
    pub html: Vec<String>,
    /// Commands for `php/` templates.
    pub php: Vec<String>,
    /// Commands for `apache/` templates.
    pub apache: Vec<String>,
}

impl Default for ProcessorsConfig {
    fn default() -> Self {
        let note = [
            "Macros available:",
            "[NAME] will simply be index.html.en_US, index.js.en_US, or comment.php",
            "[NAMEGZ] will simply be index.html.gz.en_US, index.js.gz.en_US, or comment.php.gz",
            "[INPUT] will be identical to [NAME].orig, and is written to disk before the commands run.",
            "[OUTPUT] will be identical to [NAME]",
            "Commands run with /bin/sh in the output directory. At minimum use: mv [INPUT] [OUTPUT]",
        ];
        Self {
            note: note.iter().map(ToString::to_string).collect(),
            js: Vec::new(),
            css: Vec::new(),
            html: Vec::new(),
            php: Vec::new(),
            apache: Vec::new(),
        }
    }
}

/// 実行オプション
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionsConfig {
    /// Worker count. `0` means one per CPU.
    pub max_threads: usize,
    /// Base name of the master catalog, `<poDir>/<projectName>.pot`.
    pub project_name: String,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self { max_threads: 0, project_name: "falling-sky".to_string() }
    }
}

/// 既定の出力名マッピング
fn default_file_map() -> BTreeMap<String, String> {
    [
        ("dot.htaccess", ".htaccess"),
        ("ip.htaccess", "ip/.htaccess"),
        ("images.htaccess", "images/.htaccess"),
        ("images-nc.htaccess", "images-nc/.htaccess"),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

impl BuildSettings {
    /// Fills every setting the configuration left empty: blank directories,
    /// the processor note and the file map.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        let defaults = DirectoriesConfig::default();
        let directories = [
            (&mut self.directories.template_dir, defaults.template_dir),
            (&mut self.directories.images_dir, defaults.images_dir),
            (&mut self.directories.transparent_dir, defaults.transparent_dir),
            (&mut self.directories.po_dir, defaults.po_dir),
            (&mut self.directories.output_dir, defaults.output_dir),
        ];
        for (dir, default) in directories {
            if dir.as_os_str().is_empty() {
                *dir = default;
            }
        }
        if self.processors.note.is_empty() {
            self.processors.note = ProcessorsConfig::default().note;
        }
        if self.file_map.is_empty() {
            self.file_map = default_file_map();
        }
        self
    }

    /// Default settings as pretty JSON, for `--example`.
    ///
    /// # Errors
    /// Returns [`ConfigError::ParseError`] if serialization fails.
    pub fn example() -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&Self::default().with_defaults())?)
    }

    /// Path of the master catalog.
    #[must_use]
    pub fn pot_path(&self) -> PathBuf {
        self.directories.po_dir.join(format!("{}.pot", self.options.project_name))
    }

    /// Directory holding the locale catalogs.
    #[must_use]
    pub fn locale_dir(&self) -> PathBuf {
        self.directories.po_dir.join("dl")
    }

    /// Output name of a template file.
    #[must_use]
    pub fn output_name<'a>(&'a self, file_name: &'a str) -> &'a str {
        self.file_map.get(file_name).map_or(file_name, String::as_str)
    }

    /// # Errors
    /// - Directory path is empty
    /// - Project name is empty
    /// - `fileMap` entry with an empty side
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let directories = [
            ("directories.templateDir", &self.directories.template_dir),
            ("directories.imagesDir", &self.directories.images_dir),
            ("directories.transparentDir", &self.directories.transparent_dir),
            ("directories.poDir", &self.directories.po_dir),
            ("directories.outputDir", &self.directories.output_dir),
        ];
        for (field_path, dir) in directories {
            if dir.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    field_path,
                    "The directory cannot be empty. Please specify a path, for example: \"output\"",
                ));
            }
        }

        if self.options.project_name.trim().is_empty() {
            errors.push(ValidationError::new(
                "options.projectName",
                "The project name cannot be empty. It names the master catalog <projectName>.pot",
            ));
        }

        for (from, to) in &self.file_map {
            if from.is_empty() || to.is_empty() {
                errors.push(ValidationError::new(
                    format!("fileMap[{from:?}]"),
                    format!("Both sides of a mapping must be non-empty: {from:?} -> {to:?}"),
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::expect_used, clippy::panic)]
mod tests {
    use std::path::Path;

    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn validate_valid_settings() {
        let settings = BuildSettings::default().with_defaults();

        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn deserialize_partial_settings() {
        let json = r#"{"directories": {"outputDir": "public"}, "options": {"maxThreads": 3}}"#;

        let settings: BuildSettings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.directories.output_dir, Path::new("public"));
        assert_eq!(settings.directories.template_dir, Path::new("templates"));
        assert_that!(settings.options.max_threads, eq(3));
        assert_that!(settings.options.project_name, eq("falling-sky"));
    }

    #[rstest]
    fn deserialize_empty_settings() {
        let settings: BuildSettings = serde_json::from_str::<BuildSettings>("{}").unwrap().with_defaults();

        assert_eq!(settings.directories.po_dir, Path::new("translations"));
        assert_that!(settings.processors.html, is_empty());
        assert_that!(settings.processors.note, not(is_empty()));
        assert_that!(settings.file_map.get("dot.htaccess").map(String::as_str), some(eq(".htaccess")));
        assert_that!(settings.file_map, len(eq(4)));
    }

    #[rstest]
    fn blank_settings_fall_back_to_defaults() {
        let json = r#"{"directories": {"templateDir": "", "outputDir": "public"}, "processors": {"note": []}}"#;

        let settings = serde_json::from_str::<BuildSettings>(json).unwrap().with_defaults();

        assert_eq!(settings.directories.template_dir, Path::new("templates"));
        assert_eq!(settings.directories.output_dir, Path::new("public"));
        assert_that!(settings.processors.note, not(is_empty()));
        assert_that!(settings.validate(), ok(anything()));
    }

    #[rstest]
    fn explicit_file_map_replaces_defaults() {
        let json = r#"{"fileMap": {"robots.txt": "robots.txt"}}"#;

        let settings = serde_json::from_str::<BuildSettings>(json).unwrap().with_defaults();

        assert_that!(settings.file_map, len(eq(1)));
        assert_that!(settings.output_name("dot.htaccess"), eq("dot.htaccess"));
    }

    #[rstest]
    #[case::mapped("ip.htaccess", "ip/.htaccess")]
    #[case::unmapped("index.html", "index.html")]
    fn output_name_follows_file_map(#[case] file: &str, #[case] expected: &str) {
        let settings = BuildSettings::default().with_defaults();

        assert_that!(settings.output_name(file), eq(expected));
    }

    #[rstest]
    fn catalog_paths_use_project_name() {
        let settings = BuildSettings::default();

        assert_eq!(settings.pot_path(), Path::new("translations/falling-sky.pot"));
        assert_eq!(settings.locale_dir(), Path::new("translations/dl"));
    }

    #[rstest]
    fn validate_invalid_output_dir_empty() {
        let mut settings = BuildSettings::default();
        settings.directories.output_dir = PathBuf::new();

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("directories.outputDir")),
                field!(ValidationError.message, contains_substring("cannot be empty"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_project_name_blank() {
        let mut settings = BuildSettings::default();
        settings.options.project_name = "  ".to_string();

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("options.projectName")),
                field!(ValidationError.message, contains_substring("cannot be empty"))
            ]])
        );
    }

    #[rstest]
    fn validate_invalid_file_map_entry() {
        let mut settings = BuildSettings::default();
        settings.file_map.insert("dot.htaccess".to_string(), String::new());

        let result = settings.validate();

        assert_that!(
            result,
            err(elements_are![all![
                field!(ValidationError.field_path, eq("fileMap[\"dot.htaccess\"]")),
                field!(ValidationError.message, contains_substring("non-empty"))
            ]])
        );
    }

    #[rstest]
    fn example_is_pretty_camel_case_json() {
        let example = BuildSettings::example().unwrap();

        assert_that!(example, contains_substring("\"templateDir\": \"templates\""));
        assert_that!(example, contains_substring("\"maxThreads\": 0"));
        assert_that!(example, contains_substring("\"images-nc.htaccess\": \"images-nc/.htaccess\""));
        let reparsed: BuildSettings = serde_json::from_str(&example).unwrap();
        assert_that!(reparsed.validate(), ok(anything()));
    }

    #[rstest]
    fn config_error_validation_errors_format() {
        let mut settings = BuildSettings::default();
        settings.directories.po_dir = PathBuf::new();
        settings.options.project_name = String::new();

        let errors = settings.validate().unwrap_err();
        let config_error = ConfigError::ValidationErrors(errors);

        let error_message = format!("{config_error}");
        assert_that!(error_message, contains_substring("Configuration validation failed"));
        assert_that!(error_message, contains_substring("1. directories.poDir"));
        assert_that!(error_message, contains_substring("2. options.projectName"));
    }
}
