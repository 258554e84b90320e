//! Version control of the reference source repository.

use std::path::Path;

use async_trait::async_trait;
use chrono::DateTime;
use log::{info, warn};

use crate::error::{Result, XrefError};
use crate::utils;
use crate::version::ReleaseTag;

/// Operations the pipeline needs from the version control provider.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Clone `url` into `path` on `branch`, or, if `path` exists, discard local
    /// changes, fetch and check out the latest commit of `branch`.
    async fn sync(&self, url: &str, path: &Path, branch: &str) -> Result<()>;

    /// Every tag of the repository with the time of the commit it targets.
    async fn list_tags(&self, path: &Path) -> Result<Vec<ReleaseTag>>;

    /// Hard reset the working tree to `tag` and remove untracked files.
    async fn reset_to(&self, path: &Path, tag: &str) -> Result<()>;

    /// Stage and commit every change. Returns `false` when there was nothing
    /// to commit.
    async fn commit_all(&self, path: &Path, message: &str) -> Result<bool>;
}

/// [`VersionControl`] backed by the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

/// Tab separated: tag name, commit author date, dereferenced author date of
/// annotated tags.
const TAG_FORMAT: &str = "--format=%(refname:short)%09%(authordate:iso-strict)%09%(*authordate:iso-strict)";

/// Parse one line of `git for-each-ref` output in [`TAG_FORMAT`].
pub fn parse_tag_line(line: &str) -> Result<ReleaseTag> {
    let mut fields = line.split('\t');
    let name = fields.next().unwrap_or_default().trim();
    let direct = fields.next().unwrap_or_default().trim();
    let dereferenced = fields.next().unwrap_or_default().trim();

    // Annotated tags point to a tag object: the commit date is the
    // dereferenced one.
    let date = if dereferenced.is_empty() { direct } else { dereferenced };

    let commit_time = DateTime::parse_from_rfc3339(date).map_err(|e| XrefError::InvalidTag {
        tag: name.to_string(),
        reason: format!("unreadable date '{}': {}", date, e),
    })?;

    Ok(ReleaseTag::new(name, commit_time))
}

/// Parse `git for-each-ref` output, skipping the tags without a readable date.
pub fn parse_tag_list(output: &str) -> Vec<ReleaseTag> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_tag_line(line) {
            Ok(tag) => Some(tag),
            Err(e) => {
                warn!("Skipping tag: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl VersionControl for GitCli {
    async fn sync(&self, url: &str, path: &Path, branch: &str) -> Result<()> {
        if !path.exists() {
            info!("Cloning {} to '{}'", url, path.display());
            let cwd = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            tokio::fs::create_dir_all(cwd)
                .await
                .map_err(|e| XrefError::io(cwd, e))?;
            let target = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());
            utils::run_command("git", ["clone", "--branch", branch, url, target.as_str()], cwd).await?;
            return Ok(());
        }

        info!("Hard reset '{}' to HEAD", path.display());
        utils::run_command("git", ["reset", "--hard"], path).await?;
        utils::run_command("git", ["clean", "-fd"], path).await?;

        info!("Fetching changes from 'origin' in '{}'", path.display());
        utils::run_command("git", ["fetch", "--tags", "origin"], path).await?;

        info!("Checking out '{}' to '{}' branch", path.display(), branch);
        let remote_branch = format!("origin/{}", branch);
        utils::run_command("git", ["checkout", "--force", remote_branch.as_str()], path).await?;
        Ok(())
    }

    async fn list_tags(&self, path: &Path) -> Result<Vec<ReleaseTag>> {
        let output = utils::run_command("git", ["for-each-ref", TAG_FORMAT, "refs/tags"], path).await?;
        Ok(parse_tag_list(&output))
    }

    async fn reset_to(&self, path: &Path, tag: &str) -> Result<()> {
        info!("Hard reset '{}' to '{}'", path.display(), tag);
        utils::run_command("git", ["reset", "--hard", tag], path).await?;
        utils::run_command("git", ["clean", "-fd"], path).await?;
        Ok(())
    }

    async fn commit_all(&self, path: &Path, message: &str) -> Result<bool> {
        let status = utils::run_command("git", ["status", "--porcelain"], path).await?;
        if status.trim().is_empty() {
            info!("Nothing to commit on '{}'", path.display());
            return Ok(false);
        }

        info!("Committing changes on '{}'", path.display());
        utils::run_command("git", ["add", "--all"], path).await?;
        utils::run_command("git", ["commit", "--message", message], path).await?;
        Ok(true)
    }
}
