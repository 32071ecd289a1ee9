//! 設定ファイルの読み込み関数

use std::path::Path;

use jsonc_parser::ParseOptions;

use super::{
    BuildSettings,
    ConfigError,
};

/// 設定ファイルを読み込む
///
/// JSON にコメントと末尾カンマを許可する。省略されたフィールドは既定値になる。
///
/// # Arguments
/// * `path` - 設定ファイルのパス
///
/// # Errors
/// - ファイル読み込みエラー
/// - JSON 構文エラー
/// - 型の不一致
pub(super) fn load_from_file(path: &Path) -> Result<BuildSettings, ConfigError> {
    tracing::debug!(path = %path.display(), "Loading configuration");

    let content = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::IoError { path: path.to_path_buf(), source })?;
    parse(&content)
}

/// 設定テキストをパースする
///
/// 空のファイルは `{}` と同じ扱い
pub(super) fn parse(content: &str) -> Result<BuildSettings, ConfigError> {
    let value = jsonc_parser::parse_to_serde_value(content, &ParseOptions::default())?;
    let settings: BuildSettings = match value {
        Some(value) => serde_json::from_value(value)?,
        None => BuildSettings::default(),
    };
    Ok(settings.with_defaults())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    /// `load_from_file`: 設定ファイルが存在する場合
    #[rstest]
    fn test_load_from_file_with_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fsbuild.json");
        fs::write(&path, r#"{"options": {"projectName": "mirror"}}"#).unwrap();

        let settings = load_from_file(&path).unwrap();

        assert_eq!(settings.options.project_name, "mirror");
        assert_eq!(settings.file_map.len(), 4);
    }

    /// `load_from_file`: 設定ファイルが存在しない場合
    #[rstest]
    fn test_load_from_file_missing() {
        let temp_dir = TempDir::new().unwrap();

        let result = load_from_file(&temp_dir.path().join("missing.json"));

        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }

    /// `parse`: コメントと末尾カンマ
    #[rstest]
    fn test_parse_allows_comments() {
        let content = r#"{
            // built by CI
            "processors": {
                "html": ["mv [INPUT] [OUTPUT]"], /* no tidy here */
            },
        }"#;

        let settings = parse(content).unwrap();

        assert_that!(settings.processors.html, elements_are![eq("mv [INPUT] [OUTPUT]")]);
    }

    /// `parse`: 空のファイル
    #[rstest]
    fn test_parse_empty() {
        let settings = parse("").unwrap();

        assert_eq!(settings.options.project_name, "falling-sky");
    }

    /// `parse`: 構文エラー
    #[rstest]
    #[case::syntax("invalid json")]
    #[case::wrong_type(r#"{"options": {"maxThreads": "four"}}"#)]
    fn test_parse_invalid(#[case] content: &str) {
        assert!(parse(content).is_err());
    }
}
