//! Include resolution, marker recording and the expansion cache.
//!
//! A template is expanded once per build: includes are inlined, every
//! `{{ text }}` marker is recorded in the master catalog, and the result is
//! run through the template engine. The cached text is locale-agnostic;
//! markers are substituted per locale afterwards.

use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::{
    Arc,
    LazyLock,
};

use regex::{
    Captures,
    Regex,
};
use tokio::sync::{
    Mutex,
    OnceCell,
};

use super::TemplateError;
use super::context::TemplateData;
use super::engine;
use crate::catalog::{
    MasterCatalog,
    canonicalize,
};
use crate::store::ContentStore;

/// `[% PROCESS "name" %]`
#[allow(clippy::unwrap_used)]
static PROCESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[%\s*PROCESS\s*"(.*?)"\s*%\]"#).unwrap());

/// `{{ text }}`, possibly spanning lines.
#[allow(clippy::unwrap_used)]
pub static MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap());

/// How often one include may be substituted into a single template.
const MAX_SUBSTITUTIONS: usize = 64;

/// Expands templates and caches the results by path.
#[derive(Debug)]
pub struct Expander {
    /// Raw template contents.
    store: Arc<ContentStore>,
    /// Master catalog that records marker usage.
    master: Arc<MasterCatalog>,
    /// One cell per path; the first caller fills it, concurrent callers wait.
    cache: Mutex<HashMap<PathBuf, Arc<OnceCell<Arc<str>>>>>,
}

impl Expander {
    /// Creates an expander with an empty cache.
    #[must_use]
    pub fn new(store: Arc<ContentStore>, master: Arc<MasterCatalog>) -> Self {
        Self { store, master, cache: Mutex::new(HashMap::new()) }
    }

    /// Expanded but untranslated content of `root/file`.
    ///
    /// # Errors
    /// Returns [`TemplateError`] if a file cannot be read, includes cycle,
    /// or the template fails to parse or execute. Failures are not cached.
    pub async fn expand(
        &self,
        root: &Path,
        file: &str,
        data: &TemplateData,
    ) -> Result<Arc<str>, TemplateError> {
        let path = root.join(file);
        let cell = Arc::clone(self.cache.lock().await.entry(path).or_default());

        let content = cell
            .get_or_try_init(|| async {
                let source = self.gather(root, file).await?;
                let rendered = engine::render(file, &source, &data.to_value()?, TemplateData::MAP_FIELDS)?;
                tracing::debug!(root = %root.display(), file, "Expanded template");
                Ok::<_, TemplateError>(Arc::from(rendered))
            })
            .await?;
        Ok(Arc::clone(content))
    }

    /// Reads `file` and inlines its includes until none remain.
    async fn gather(&self, root: &Path, file: &str) -> Result<String, TemplateError> {
        let mut content = self.read(root, file).await?;
        let mut substitutions: HashMap<String, usize> = HashMap::new();

        loop {
            let Some((directive, include)) = PROCESS.captures(&content).map(|captures| {
                let text = |i| captures.get(i).map_or("", |m| m.as_str()).to_string();
                (text(0), text(1))
            }) else {
                break;
            };

            let count = substitutions.entry(include.clone()).or_default();
            *count += 1;
            if *count > MAX_SUBSTITUTIONS {
                return Err(TemplateError::IncludeCycle { file: root.join(file), include });
            }

            let included = self.read(root, &include).await?;
            content = content.replace(&directive, &included);
        }
        Ok(content)
    }

    /// Reads one file through the store, recording its markers with the
    /// file name as context.
    async fn read(&self, root: &Path, name: &str) -> Result<String, TemplateError> {
        let text = self.store.get(&root.join(name)).await?;
        Ok(record_markers(&self.master, &text, name))
    }
}

/// Records every marker in `text` and rewrites it to its canonical form.
fn record_markers(master: &MasterCatalog, text: &str, context: &str) -> String {
    MARKER
        .replace_all(text, |captures: &Captures<'_>| {
            let inner = captures.get(1).map_or("", |m| m.as_str());
            master.record_usage(inner, context);
            format!("{{{{{}}}}}", canonicalize(inner))
        })
        .into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::catalog::{
        Catalog,
        NOT_USED,
        Record,
    };

    struct Fixture {
        dir: TempDir,
        master: Arc<MasterCatalog>,
        expander: Expander,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        let mut catalog = Catalog::new();
        catalog.insert(Record::new(NOT_USED, "Archived", ""));
        let master = Arc::new(MasterCatalog::new(catalog));
        let expander = Expander::new(Arc::new(ContentStore::new()), Arc::clone(&master));
        Fixture { dir, master, expander }
    }

    fn data() -> TemplateData {
        TemplateData { basename: "index".to_string(), ..TemplateData::default() }
    }

    #[tokio::test]
    async fn includes_are_inlined_and_markers_recorded() {
        let f = fixture(&[
            ("index.html", "<h1>{{ Hello\n  world }}</h1>[% PROCESS \"footer.inc\" %][% PROCESS \"footer.inc\" %]"),
            ("footer.inc", "<p>{{Archived}}</p>"),
        ]);

        let content = f.expander.expand(f.dir.path(), "index.html", &data()).await.unwrap();

        assert_that!(&*content, eq("<h1>{{Hello world}}</h1><p>{{Archived}}</p><p>{{Archived}}</p>"));
        let master = f.master.snapshot();
        assert_that!(master.get("Hello world").map(|r| r.comment.as_str()), some(eq("index.html")));
        assert_that!(master.get("Archived").map(|r| r.comment.as_str()), some(eq("footer.inc")));
    }

    #[tokio::test]
    async fn nested_includes_resolve() {
        let f = fixture(&[
            ("page.html", "a[% PROCESS \"one.inc\" %]d"),
            ("one.inc", "b[%PROCESS \"two.inc\"%]"),
            ("two.inc", "c"),
        ]);

        let content = f.expander.expand(f.dir.path(), "page.html", &data()).await.unwrap();

        assert_that!(&*content, eq("abcd"));
    }

    #[tokio::test]
    async fn template_language_runs_after_includes() {
        let f = fixture(&[
            ("page.html", "[% PROCESS \"head.inc\" %]"),
            ("head.inc", "<title>[% .Basename %]</title>"),
        ]);

        let content = f.expander.expand(f.dir.path(), "page.html", &data()).await.unwrap();

        assert_that!(&*content, eq("<title>index</title>"));
    }

    #[rstest]
    #[case::self_include("[% PROCESS \"loop.inc\" %]", "[% PROCESS \"loop.inc\" %]x")]
    #[case::mutual("[% PROCESS \"a.inc\" %]", "[% PROCESS \"a.inc\" %]")]
    #[tokio::test]
    async fn include_cycles_are_fatal(#[case] page: &str, #[case] include: &str) {
        let f = fixture(&[("page.html", page), ("loop.inc", include), ("a.inc", "[% PROCESS \"loop.inc\" %]")]);

        let result = f.expander.expand(f.dir.path(), "page.html", &data()).await;

        assert!(matches!(result, Err(TemplateError::IncludeCycle { .. })));
    }

    #[tokio::test]
    async fn missing_include_is_a_content_error() {
        let f = fixture(&[("page.html", "[% PROCESS \"nope.inc\" %]")]);

        let result = f.expander.expand(f.dir.path(), "page.html", &data()).await;

        assert!(matches!(result, Err(TemplateError::Content(_))));
    }

    #[tokio::test]
    async fn template_errors_propagate() {
        let f = fixture(&[("page.html", "[% if .Basename %]unterminated")]);

        let result = f.expander.expand(f.dir.path(), "page.html", &data()).await;

        assert!(matches!(result, Err(TemplateError::Parse { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_expansion_is_single_flight() {
        let f = fixture(&[("page.html", "{{slow}} [% .Basename %]"), ("other.html", "{{fast}}")]);
        let expander = Arc::new(f.expander);
        let root = f.dir.path().to_path_buf();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let expander = Arc::clone(&expander);
                let root = root.clone();
                let file = if i % 2 == 0 { "page.html" } else { "other.html" };
                tokio::spawn(async move { expander.expand(&root, file, &data()).await.unwrap() })
            })
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_that!(&*results[0], eq("{{slow}} index"));
        assert_that!(&*results[1], eq("{{fast}}"));
        for (i, result) in results.iter().enumerate() {
            assert_that!(Arc::ptr_eq(result, &results[i % 2]), eq(true));
        }
        assert_that!(f.master.snapshot().len(), eq(3));
    }
}
