//! ビルド全体のエラー型

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::fsutil::FsError;
use crate::output::OutputError;
use crate::signature::SignatureError;
use crate::template::TemplateError;

/// Defines errors that may occur during a build
#[derive(Error, Debug)]
pub enum BuildError {
    /// 設定エラー
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// カタログの読み書きエラー
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// ディレクトリ操作のエラー
    #[error(transparent)]
    Fs(#[from] FsError),
    /// シグネチャ計算のエラー
    #[error(transparent)]
    Signature(#[from] SignatureError),
    /// Error when preparing the output directory
    #[error("Failed to prepare {}: {source}", path.display())]
    Prepare {
        /// 対象のパス
        path: PathBuf,
        /// 元のエラー
        #[source]
        source: std::io::Error,
    },
    /// Error from one (file, locale) job
    #[error("Building {} for {locale}: {source}", file.display())]
    Job {
        /// テンプレートファイル
        file: PathBuf,
        /// ビルド中のロケール
        locale: String,
        /// 元のエラー
        #[source]
        source: JobError,
    },
    /// Error when a job panicked instead of returning
    #[error("Job panicked: {0}")]
    JobPanicked(String),
    /// シャットダウン後のジョブ投入
    #[error("Job queue is closed")]
    QueueClosed,
}

/// The stage of a job that failed
#[derive(Error, Debug)]
pub enum JobError {
    /// テンプレート展開の失敗
    #[error("expanding template: {0}")]
    Expand(#[from] TemplateError),
    /// 成果物の書き込み失敗
    #[error("writing output: {0}")]
    Output(#[from] OutputError),
}
