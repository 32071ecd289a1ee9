//! Version-control metadata shown on generated pages.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tokio::process::Command;

/// Placeholder for metadata that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// Fallback when the repository has no tags.
const NO_TAGS: &str = "x.notags";

/// Fetch URL in `git remote -v` output.
#[allow(clippy::unwrap_used)]
static FETCH_REMOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)\s+\(fetch\)$").unwrap());

/// Details about the checkout the site is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GitInfo {
    /// Number of commits in the log.
    pub revision_count: String,
    /// `git describe --tags --long` output.
    pub project_version: String,
    /// Tag name plus revision count, e.g. `4.1.22`.
    pub version: String,
    /// Date of the last commit, in UTC.
    pub date: String,
    /// Fetch URL of the first remote.
    pub repository: String,
    /// Abbreviated hash of the current commit.
    pub hash: String,
}

impl Default for GitInfo {
    fn default() -> Self {
        Self {
            revision_count: UNKNOWN.to_string(),
            project_version: NO_TAGS.to_string(),
            version: UNKNOWN.to_string(),
            date: UNKNOWN.to_string(),
            repository: UNKNOWN.to_string(),
            hash: UNKNOWN.to_string(),
        }
    }
}

impl GitInfo {
    /// Queries git in `repo_dir`. Anything that cannot be determined is
    /// reported as [`UNKNOWN`].
    pub async fn gather(repo_dir: &Path) -> Self {
        let revision_count = git(repo_dir, &["log", "--oneline"])
            .await
            .map_or_else(|| UNKNOWN.to_string(), |log| log.lines().count().to_string());
        let hash = git(repo_dir, &["log", "--oneline", "-1"])
            .await
            .and_then(|line| line.split_whitespace().next().map(str::to_string))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let project_version =
            git(repo_dir, &["describe", "--tags", "--long"]).await.unwrap_or_else(|| NO_TAGS.to_string());
        let date = git_in_utc(repo_dir, &["log", "-1", "--format=%cd"])
            .await
            .unwrap_or_else(|| UNKNOWN.to_string());
        let repository = git(repo_dir, &["remote", "-v"])
            .await
            .and_then(|remotes| fetch_remote(&remotes))
            .unwrap_or_else(|| UNKNOWN.to_string());

        let info = Self {
            version: version_of(&project_version, &revision_count),
            revision_count,
            project_version,
            date,
            repository,
            hash,
        };
        tracing::info!(version = %info.version, hash = %info.hash, "Gathered git info");
        info
    }
}

/// `<tag>.<count>`, using the part of the description before the first `-`.
fn version_of(project_version: &str, revision_count: &str) -> String {
    let tag = project_version.split('-').next().unwrap_or_default();
    format!("{tag}.{revision_count}")
}

/// First fetch URL in `git remote -v` output.
fn fetch_remote(remotes: &str) -> Option<String> {
    remotes
        .lines()
        .find_map(|line| FETCH_REMOTE.captures(line))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Trimmed stdout of a successful git command.
async fn git(repo_dir: &Path, args: &[&str]) -> Option<String> {
    run(Command::new("git").args(args).current_dir(repo_dir)).await
}

/// Runs git with `TZ=UTC`.
async fn git_in_utc(repo_dir: &Path, args: &[&str]) -> Option<String> {
    run(Command::new("git").args(args).current_dir(repo_dir).env("TZ", "UTC")).await
}

/// Trimmed stdout of a successful command.
async fn run(command: &mut Command) -> Option<String> {
    match command.output().await {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(output) => {
            tracing::warn!(
                ?command,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git command failed"
            );
            None
        }
        Err(err) => {
            tracing::warn!(?command, %err, "Failed to run git");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::tagged("4.1-22-gabc123", "22", "4.1.22")]
    #[case::no_tags("x.notags", "7", "x.notags.7")]
    #[case::unknown_count("4.1-0-gabc", UNKNOWN, "4.1.unknown")]
    fn version_combines_tag_and_count(
        #[case] project_version: &str,
        #[case] count: &str,
        #[case] expected: &str,
    ) {
        assert_that!(version_of(project_version, count), eq(expected));
    }

    #[rstest]
    fn fetch_remote_picks_fetch_url() {
        let remotes = "origin\tgit@example.com:site.git (push)\norigin\thttps://example.com/site.git (fetch)\n";

        assert_that!(fetch_remote(remotes), some(eq("https://example.com/site.git")));
        assert_that!(fetch_remote(""), none());
    }

    #[tokio::test]
    async fn gather_outside_a_repository_degrades() {
        let dir = tempfile::TempDir::new().unwrap();

        let info = GitInfo::gather(dir.path()).await;

        assert_that!(info.hash, eq(UNKNOWN));
        assert_that!(info.project_version, eq(NO_TAGS));
    }
}
