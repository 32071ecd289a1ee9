//! ビルド全体の流れ
//!
//! Every template file of every category becomes one job for the source
//! locale, plus one per loaded locale when the category is multi-locale.
//! Jobs run on the [`JobQueue`]; the master catalog is saved only after all
//! of them have finished.

mod category;
mod job;

use std::path::Path;
use std::sync::Arc;

pub use category::OutputCategory;
pub use job::{
    BuildContext,
    BuildJob,
};

use crate::catalog::{
    Catalog,
    CatalogSet,
};
use crate::config::BuildSettings;
use crate::error::BuildError;
use crate::fsutil::{
    copy_tree,
    files_in_dir_shallow,
};
use crate::gitinfo::GitInfo;
use crate::queue::JobQueue;
use crate::signature::scan_dir;
use crate::store::ContentStore;
use crate::template::{
    Expander,
    TemplateData,
};

/// Output subdirectories that receive a copy of the images.
const IMAGE_DIRS: [&str; 2] = ["images", "images-nc"];

/// Output aliases pointing back at the output root.
const ALIASES: [&str; 2] = ["isp", "helpdesk"];

/// Runs every template job and waits for them.
///
/// Returns the number of jobs run.
///
/// # Errors
/// Returns the first failure: a category directory that cannot be listed or
/// signed, or the first failing job. Jobs still queued at that point are
/// skipped.
pub async fn build_all(
    settings: Arc<BuildSettings>,
    catalogs: &CatalogSet,
    git_info: GitInfo,
) -> Result<usize, BuildError> {
    let store = Arc::new(ContentStore::new());
    let context = Arc::new(BuildContext {
        store: Arc::clone(&store),
        expander: Expander::new(store, Arc::clone(catalogs.master())),
        settings: Arc::clone(&settings),
    });
    let queue = JobQueue::start(settings.options.max_threads);

    let submitted = submit_all(&queue, &context, catalogs, &git_info).await;
    if submitted.is_err() {
        queue.cancel();
    }
    let finished = queue.shutdown().await;
    let jobs = submitted?;
    finished?;

    tracing::info!(jobs, "All jobs finished");
    Ok(jobs)
}

/// Lists every category directory and queues its jobs. Returns the number queued.
async fn submit_all(
    queue: &JobQueue,
    context: &Arc<BuildContext>,
    catalogs: &CatalogSet,
    git_info: &GitInfo,
) -> Result<usize, BuildError> {
    let settings = &context.settings;
    let directives = catalogs.language_directives();
    let mut jobs = 0;

    for category in OutputCategory::standard_table(&settings.processors) {
        let category = Arc::new(category);
        let root = settings.directories.template_dir.join(category.directory);
        let files = files_in_dir_shallow(&root)?;
        let signature = scan_dir(&context.store, &root, &[directives.as_str()]).await?;
        let shared = TemplateData::for_directory(git_info.clone(), catalogs, signature);

        for file_name in files.iter().filter_map(|file| file.to_str()) {
            if !category.matches(file_name) {
                continue;
            }
            let data = Arc::new(shared.with_file(file_name));
            for catalog in targets(&category, catalogs) {
                let job = BuildJob {
                    root: root.clone(),
                    file_name: file_name.to_string(),
                    category: Arc::clone(&category),
                    catalog: Arc::clone(catalog),
                    data: Arc::clone(&data),
                    context: Arc::clone(context),
                };
                queue.submit(job.run())?;
                jobs += 1;
            }
        }
        tracing::debug!(directory = category.directory, extension = category.extension, "Queued category");
    }
    Ok(jobs)
}

/// Source locale first, then every loaded locale for multi-locale
/// categories.
fn targets<'a>(
    category: &OutputCategory,
    catalogs: &'a CatalogSet,
) -> impl Iterator<Item = &'a Arc<Catalog>> + use<'a> {
    let locales = category.multi_locale.then(|| catalogs.locales().values());
    std::iter::once(catalogs.source()).chain(locales.into_iter().flatten())
}

/// Builds the whole site described by `settings`.
///
/// # Errors
/// Returns the first failure of any stage. The master catalog is only
/// written when every job succeeded.
pub async fn run(settings: BuildSettings) -> Result<(), BuildError> {
    let settings = Arc::new(settings);
    let output_dir = &settings.directories.output_dir;

    prepare_output(output_dir)?;
    prepare_output(&output_dir.join("htrev"))?;

    let pot_path = settings.pot_path();
    let catalogs = CatalogSet::load_all(&pot_path, &settings.locale_dir())?;
    let git_info = GitInfo::gather(Path::new(".")).await;

    build_all(Arc::clone(&settings), &catalogs, git_info).await?;

    for dir in IMAGE_DIRS {
        copy_tree(&settings.directories.images_dir, &output_dir.join(dir), false)?;
    }
    link_aliases(output_dir)?;

    catalogs.master().save(&pot_path)?;
    tracing::info!(pot = %pot_path.display(), "Saved master catalog");
    Ok(())
}

/// Empties `dir`, creating it if needed.
fn prepare_output(dir: &Path) -> Result<(), BuildError> {
    tracing::info!(dir = %dir.display(), "Preparing output directory");
    let prepare = || {
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)
    };
    prepare().map_err(|source| BuildError::Prepare { path: dir.to_path_buf(), source })
}

/// Points every alias at the output root.
#[cfg(unix)]
fn link_aliases(output_dir: &Path) -> Result<(), BuildError> {
    for alias in ALIASES {
        let path = output_dir.join(alias);
        std::os::unix::fs::symlink(".", &path).map_err(|source| BuildError::Prepare { path, source })?;
    }
    Ok(())
}

/// Points every alias at the output root.
#[cfg(not(unix))]
fn link_aliases(_output_dir: &Path) -> Result<(), BuildError> {
    tracing::warn!(aliases = ?ALIASES, "Symlinks are not supported on this platform; skipping");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::catalog::Record;

    fn catalogs() -> CatalogSet {
        let mut fr = Catalog::new();
        fr.set_locale("fr_FR");
        let mut de = Catalog::new();
        de.set_locale("de_DE");
        CatalogSet::from_parts(Catalog::new(), [fr, de])
    }

    #[rstest]
    #[case::multi_locale(true, vec!["en_US", "de_DE", "fr_FR"])]
    #[case::source_only(false, vec!["en_US"])]
    fn targets_start_with_source(#[case] multi_locale: bool, #[case] expected: Vec<&str>) {
        let catalogs = catalogs();
        let category = OutputCategory {
            directory: "html",
            extension: ".html",
            commands: Arc::from(Vec::new()),
            escape_quotes: false,
            multi_locale,
            compress: false,
        };

        let locales: Vec<&str> = targets(&category, &catalogs).map(|c| c.locale()).collect();

        assert_eq!(locales, expected);
    }

    #[rstest]
    fn prepare_output_empties_directory() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("output");
        std::fs::create_dir_all(output.join("old")).unwrap();
        std::fs::write(output.join("old/stale.html"), "x").unwrap();

        prepare_output(&output).unwrap();

        assert_that!(output.is_dir(), eq(true));
        assert_that!(std::fs::read_dir(&output).unwrap().count(), eq(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn missing_category_directory_fails_the_build() {
        let dir = TempDir::new().unwrap();
        let mut settings = BuildSettings::default().with_defaults();
        settings.directories.template_dir = dir.path().join("templates");
        settings.directories.output_dir = dir.path().join("output");
        let mut master = Catalog::new();
        master.insert(Record::new("", "slow", ""));

        let result = build_all(Arc::new(settings), &CatalogSet::from_parts(master, Vec::new()), GitInfo::default()).await;

        assert!(matches!(result, Err(BuildError::Fs(_))));
    }
}
