//! i18n-site-builder
//!
//! テンプレートを展開し、ロケールごとの翻訳カタログを適用して静的サイトを生成する。
//! テンプレートが参照する文言はマスターカタログ (`.pot`) に記録される。

pub mod build;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod gitinfo;
pub mod output;
pub mod queue;
pub mod signature;
pub mod store;
pub mod template;
pub mod translate;

#[cfg(test)]
mod test_utils;

pub use error::BuildError;
