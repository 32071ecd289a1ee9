//! Template expansion: includes, marker recording and the `[% %]` language.

pub mod context;
pub mod engine;
pub mod expand;

use std::path::PathBuf;

use thiserror::Error;

pub use context::{
    LocaleSummary,
    TemplateData,
};
pub use engine::Template;
pub use expand::Expander;

use crate::store::ContentError;

/// Defines errors that may occur while expanding a template
#[derive(Error, Debug, Clone)]
pub enum TemplateError {
    /// A template or include could not be read
    #[error(transparent)]
    Content(#[from] ContentError),
    /// An include kept including itself
    #[error("Include cycle: {include:?} substituted too often while expanding {}", file.display())]
    IncludeCycle {
        /// Template being expanded.
        file: PathBuf,
        /// Include that kept coming back.
        include: String,
    },
    /// The template source is malformed
    #[error("Parsing template {name}:{line}: {message}")]
    Parse {
        /// Template name.
        name: String,
        /// 1-based source line.
        line: usize,
        /// What went wrong.
        message: String,
    },
    /// Executing the template failed
    #[error("Executing template {name}:{line}: {message}")]
    Eval {
        /// Template name.
        name: String,
        /// 1-based source line.
        line: usize,
        /// What went wrong.
        message: String,
    },
    /// The template data could not be converted to JSON
    #[error("Failed to prepare template data: {0}")]
    Data(String),
}
