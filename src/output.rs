//! Writing output artifacts.
//!
//! A file is either written directly (plus a gzip copy for compressing
//! categories) or handed to the configured shell commands, which find it at
//! `[INPUT]` in the output directory.

use std::io::Write as _;
use std::path::{
    Path,
    PathBuf,
};
use std::process::{
    ExitStatus,
    Stdio,
};

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Defines errors that may occur while writing output
#[derive(Error, Debug)]
pub enum OutputError {
    /// A file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Gzip compression failed.
    #[error("Failed to compress {}: {source}", path.display())]
    Compress {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The shell could not be started.
    #[error("Failed to run {command:?}: {source}")]
    Spawn {
        /// Command after macro substitution.
        command: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A post-processing command exited unsuccessfully
    #[error("While running {command:?}: {status}")]
    Command {
        /// Command after macro substitution.
        command: String,
        /// Exit status of the shell.
        status: ExitStatus,
        /// Captured standard error.
        stderr: String,
    },
}

/// One file to produce for one locale.
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    /// Template file name, e.g. `index.html`.
    pub file_name: &'a str,
    /// Name below the output directory after the file map.
    pub output_name: &'a str,
    /// Set for multi-locale categories; suffixes every output name.
    pub locale: Option<&'a str>,
    /// Write a gzip copy when no commands are configured.
    pub compress: bool,
}

/// Names substituted into post-processing commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macros {
    /// `[NAME]`
    pub name: String,
    /// `[NAMEGZ]`
    pub name_gz: String,
    /// `[INPUT]`
    pub input: String,
    /// `[OUTPUT]`
    pub output: String,
}

impl Macros {
    /// Macros for `output_name`, suffixed with `locale` when given.
    #[must_use]
    pub fn new(output_name: &str, locale: Option<&str>) -> Self {
        let (name, name_gz) = match locale {
            Some(locale) => (format!("{output_name}.{locale}"), format!("{output_name}.gz.{locale}")),
            None => (output_name.to_string(), format!("{output_name}.gz")),
        };
        Self { input: format!("{name}.orig"), output: name.clone(), name, name_gz }
    }

    /// Replaces every `[MACRO]` in `command`.
    #[must_use]
    pub fn apply(&self, command: &str) -> String {
        command
            .replace("[NAMEGZ]", &self.name_gz)
            .replace("[NAME]", &self.name)
            .replace("[INPUT]", &self.input)
            .replace("[OUTPUT]", &self.output)
    }
}

/// Writes `content` for `artifact` below `output_dir`.
///
/// # Errors
/// Returns [`OutputError`] if a file cannot be written or a command fails.
pub async fn write_artifact(
    output_dir: &Path,
    artifact: &Artifact<'_>,
    commands: &[String],
    content: &str,
) -> Result<(), OutputError> {
    let macros = Macros::new(artifact.output_name, artifact.locale);
    if commands.is_empty() {
        write_direct(output_dir, artifact, &macros, content).await
    } else {
        run_commands(output_dir, &macros, commands, content).await
    }
}

/// Writes the content, and its gzip copy when requested.
async fn write_direct(
    output_dir: &Path,
    artifact: &Artifact<'_>,
    macros: &Macros,
    content: &str,
) -> Result<(), OutputError> {
    write_file(&output_dir.join(&macros.name), content.as_bytes()).await?;

    if artifact.compress {
        let path = output_dir.join(&macros.name_gz);
        let compressed = if Path::new(artifact.file_name).extension().is_some_and(|ext| ext == "html") {
            gzip(&point_at_compressed_assets(content))
        } else {
            gzip(content)
        }
        .map_err(|source| OutputError::Compress { path: path.clone(), source })?;
        write_file(&path, &compressed).await?;
    }
    tracing::debug!(name = %macros.name, compress = artifact.compress, "Wrote output");
    Ok(())
}

/// Compressed pages load the compressed script and stylesheet.
fn point_at_compressed_assets(content: &str) -> String {
    content
        .replace(r#"src="/index.js"#, r#"src="/index.js.gz"#)
        .replace(r#"href="/index.css"#, r#"href="/index.css.gz"#)
}

/// Gzip at the best compression level.
fn gzip(content: &str) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(content.as_bytes())?;
    encoder.finish()
}

/// Writes `bytes`, creating parent directories.
async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    let write = async {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await
    };
    write.await.map_err(|source| OutputError::Write { path: path.to_path_buf(), source })
}

/// Writes `[INPUT]`, then runs each command in order with `/bin/sh` in
/// `output_dir`, the command text on stdin.
async fn run_commands(
    output_dir: &Path,
    macros: &Macros,
    commands: &[String],
    content: &str,
) -> Result<(), OutputError> {
    write_file(&output_dir.join(&macros.input), content.as_bytes()).await?;

    for command in commands {
        let command = macros.apply(command);
        tracing::debug!(%command, "Running post-processor");
        run_shell(output_dir, &command).await?;
    }
    Ok(())
}

/// Runs one command with `/bin/sh` in `dir`.
async fn run_shell(dir: &Path, command: &str) -> Result<(), OutputError> {
    let spawn_error = |source| OutputError::Spawn { command: command.to_string(), source };

    let mut child = Command::new("/bin/sh")
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(command.as_bytes()).await.map_err(spawn_error)?;
    }
    let output = child.wait_with_output().await.map_err(spawn_error)?;

    // tidy は警告だけでも 1 を返す
    if output.status.success() || (command.starts_with("tidy ") && output.status.code() == Some(1)) {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    tracing::error!(%command, status = %output.status, %stderr, "Post-processor failed");
    Err(OutputError::Command { command: command.to_string(), status: output.status, stderr })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Read as _;

    use flate2::read::GzDecoder;
    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    fn gunzip(path: &Path) -> String {
        let mut text = String::new();
        GzDecoder::new(std::fs::File::open(path).unwrap()).read_to_string(&mut text).unwrap();
        text
    }

    #[rstest]
    #[case::single_locale(None, "comment.php", "comment.php.gz")]
    #[case::multi_locale(Some("fr_FR"), "comment.php.fr_FR", "comment.php.gz.fr_FR")]
    fn macros_per_locale(#[case] locale: Option<&str>, #[case] name: &str, #[case] name_gz: &str) {
        let macros = Macros::new("comment.php", locale);

        assert_that!(macros.name, eq(name));
        assert_that!(macros.name_gz, eq(name_gz));
        assert_eq!(macros.input, format!("{name}.orig"));
        assert_that!(macros.output, eq(name));
    }

    #[rstest]
    fn macros_are_substituted_everywhere() {
        let macros = Macros::new("index.js", Some("de_DE"));

        let command = macros.apply("uglify [INPUT] -o [OUTPUT] && gzip -9 < [NAME] > [NAMEGZ] # [NAME]");

        assert_that!(
            command,
            eq("uglify index.js.de_DE.orig -o index.js.de_DE && gzip -9 < index.js.de_DE > index.js.gz.de_DE # index.js.de_DE")
        );
    }

    #[tokio::test]
    async fn direct_write_with_gzip_rewrites_asset_links() {
        let dir = TempDir::new().unwrap();
        let artifact =
            Artifact { file_name: "index.html", output_name: "index.html", locale: Some("fr_FR"), compress: true };
        let content = r#"<script src="/index.js"></script><link href="/index.css">"#;

        write_artifact(dir.path(), &artifact, &[], content).await.unwrap();

        let plain = std::fs::read_to_string(dir.path().join("index.html.fr_FR")).unwrap();
        assert_that!(plain, eq(content));
        assert_that!(
            gunzip(&dir.path().join("index.html.gz.fr_FR")),
            eq(r#"<script src="/index.js.gz"></script><link href="/index.css.gz">"#)
        );
    }

    #[tokio::test]
    async fn non_html_is_compressed_verbatim() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact { file_name: "index.js", output_name: "index.js", locale: None, compress: true };
        let content = r#"load("src="/index.js")"#;

        write_artifact(dir.path(), &artifact, &[], content).await.unwrap();

        assert_that!(gunzip(&dir.path().join("index.js.gz")), eq(content));
    }

    #[tokio::test]
    async fn mapped_names_create_parent_directories() {
        let dir = TempDir::new().unwrap();
        let artifact =
            Artifact { file_name: "ip.htaccess", output_name: "ip/.htaccess", locale: None, compress: false };

        write_artifact(dir.path(), &artifact, &[], "Deny from all\n").await.unwrap();

        assert_that!(std::fs::read_to_string(dir.path().join("ip/.htaccess")).unwrap(), eq("Deny from all\n"));
        assert_that!(dir.path().join("ip/.htaccess.gz").exists(), eq(false));
    }

    #[tokio::test]
    async fn commands_run_in_order_in_output_dir() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact { file_name: "index.css", output_name: "index.css", locale: None, compress: true };
        let commands = vec!["tr a-z A-Z < [INPUT] > [OUTPUT]".to_string(), "rm [INPUT]".to_string()];

        write_artifact(dir.path(), &artifact, &commands, "body {}").await.unwrap();

        assert_that!(std::fs::read_to_string(dir.path().join("index.css")).unwrap(), eq("BODY {}"));
        assert_that!(dir.path().join("index.css.orig").exists(), eq(false));
        assert_that!(dir.path().join("index.css.gz").exists(), eq(false));
    }

    #[rstest]
    #[case::tidy_warning("tidy -v >/dev/null 2>&1; exit 1", true)]
    #[case::tidy_error("tidy -v >/dev/null 2>&1; exit 2", false)]
    #[case::other_exit_one("exit 1", false)]
    #[tokio::test]
    async fn exit_status_handling(#[case] command: &str, #[case] succeeds: bool) {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact { file_name: "a.html", output_name: "a.html", locale: None, compress: false };
        let commands = vec![command.to_string()];

        let result = write_artifact(dir.path(), &artifact, &commands, "x").await;

        assert_that!(result.is_ok(), eq(succeeds));
    }

    #[tokio::test]
    async fn failing_command_keeps_stderr() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact { file_name: "a.php", output_name: "a.php", locale: None, compress: false };
        let commands = vec!["echo broken >&2; exit 3".to_string()];

        let result = write_artifact(dir.path(), &artifact, &commands, "x").await;

        assert!(matches!(
            &result,
            Err(OutputError::Command { command, stderr, .. })
                if command == "echo broken >&2; exit 3" && stderr.contains("broken")
        ));
    }
}
