//! テスト用ユーティリティ関数
//!
//! 複数のテストモジュールで使用される共通のヘルパー関数を提供します。
#![cfg(test)]
#![allow(clippy::unwrap_used)]

use std::path::Path;

use tempfile::TempDir;

use crate::catalog::{
    Catalog,
    Record,
};

/// ファイル群を `root` 以下に書き込む
///
/// # Arguments
/// * `root` - 書き込み先ディレクトリ
/// * `files` - 相対パスと内容の組。親ディレクトリは自動で作成する
pub(crate) fn write_files(root: &Path, files: &[(&str, &str)]) {
    for &(name, content) in files {
        let path = root.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

/// ファイル群を書き込んだ一時ディレクトリを作成する
pub(crate) fn temp_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_files(dir.path(), files);
    dir
}

/// テスト用の Catalog を作成する
///
/// # Arguments
/// * `locale` - ロケールコード（例: "fr_FR"）
/// * `entries` - 原文と訳文の組
pub(crate) fn catalog(locale: &str, entries: &[(&str, &str)]) -> Catalog {
    let mut catalog = Catalog::new();
    catalog.set_locale(locale);
    for &(key, translation) in entries {
        catalog.insert(Record::new("", key, translation));
    }
    catalog
}
