//! 設定管理を行うモジュール

use std::path::PathBuf;

use super::{
    BuildSettings,
    ConfigError,
    loader,
};

/// 設定管理を行う
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// 現在の設定
    current_settings: BuildSettings,

    /// 読み込んだ設定ファイル
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: BuildSettings::default().with_defaults(), config_path: None }
    }

    /// 設定を読み込む
    ///
    /// # Arguments
    /// * `config_path` - 設定ファイルのパス。`None` なら既定値
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(&mut self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let settings = match &config_path {
            Some(path) => loader::load_from_file(path)?,
            None => BuildSettings::default().with_defaults(),
        };

        // バリデーション
        settings.validate().map_err(ConfigError::ValidationErrors)?;

        self.current_settings = settings;
        self.config_path = config_path;
        tracing::debug!("Settings loaded successfully: {:?}", self.current_settings);

        Ok(())
    }

    /// 現在の設定を取得
    #[must_use]
    pub const fn get_settings(&self) -> &BuildSettings {
        &self.current_settings
    }

    /// 読み込んだ設定ファイルを取得
    #[must_use]
    pub const fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    /// 設定を取り出す
    #[must_use]
    pub fn into_settings(self) -> BuildSettings {
        self.current_settings
    }
}
