//! ビルド設定
mod loader;
mod manager;
mod types;

pub use manager::ConfigManager;
pub use types::{
    BuildSettings,
    ConfigError,
    DirectoriesConfig,
    OptionsConfig,
    ProcessorsConfig,
    ValidationError,
};
