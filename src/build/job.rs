//! One (file, locale) job: expand, translate, write.

use std::path::PathBuf;
use std::sync::Arc;

use super::OutputCategory;
use crate::catalog::Catalog;
use crate::config::BuildSettings;
use crate::error::{
    BuildError,
    JobError,
};
use crate::output::{
    Artifact,
    write_artifact,
};
use crate::store::ContentStore;
use crate::template::{
    Expander,
    TemplateData,
};
use crate::translate::translate_content;

/// State shared by every job of a build.
#[derive(Debug)]
pub struct BuildContext {
    /// Raw template contents.
    pub store: Arc<ContentStore>,
    /// Expansion cache shared by every job.
    pub expander: Expander,
    /// Settings of the running build.
    pub settings: Arc<BuildSettings>,
}

/// Builds one template file for one locale.
#[derive(Debug, Clone)]
pub struct BuildJob {
    /// Template directory of the category.
    pub root: PathBuf,
    /// Template file name inside `root`.
    pub file_name: String,
    /// Category the file was listed under.
    pub category: Arc<OutputCategory>,
    /// Locale being built.
    pub catalog: Arc<Catalog>,
    /// Template context for this file.
    pub data: Arc<TemplateData>,
    /// State shared by every job of the build.
    pub context: Arc<BuildContext>,
}

impl BuildJob {
    /// # Errors
    /// Returns [`BuildError::Job`] naming the file and locale.
    pub async fn run(self) -> Result<(), BuildError> {
        let locale = self.catalog.locale();
        tracing::debug!(file = %self.root.join(&self.file_name).display(), locale, "Building");

        self.build().await.map_err(|source| BuildError::Job {
            file: self.root.join(&self.file_name),
            locale: locale.to_string(),
            source,
        })
    }

    /// Expands, translates and writes one artifact.
    async fn build(&self) -> Result<(), JobError> {
        let expanded = self.context.expander.expand(&self.root, &self.file_name, &self.data).await?;
        let content = translate_content(&self.catalog, &expanded, self.category.escape_quotes);

        let settings = &self.context.settings;
        let artifact = Artifact {
            file_name: &self.file_name,
            output_name: settings.output_name(&self.file_name),
            locale: self.category.multi_locale.then(|| self.catalog.locale()),
            compress: self.category.compress,
        };
        write_artifact(&settings.directories.output_dir, &artifact, &self.category.commands, &content)
            .await?;
        Ok(())
    }
}
