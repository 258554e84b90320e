//! Generation of the xref maps of every Unity version.
//!
//! The run syncs the reference source repository, resolves the published
//! versions from its tags, then for each distinct release: resets the working
//! tree to the release tag, runs the documentation generator once and
//! publishes a fixed copy of its xref map for every version name sharing that
//! release. The latest stable version is also published at the output root
//! with version-less hrefs.
//!
//! Releases are processed one after the other. A failing release only fails
//! the versions it backs; the run goes on with the next one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::XrefMapsConfig;
use crate::docfx::DocGenerator;
use crate::git::VersionControl;
use crate::href::HrefContext;
use crate::link_check::LinkChecker;
use crate::utils;
use crate::version::{self, Version};
use crate::xrefmap::{FixReport, XrefMap};

/// Live check of the hrefs of a fixed xref map.
#[derive(Clone)]
pub struct LinkValidation {
    pub checker: Arc<dyn LinkChecker>,
    /// Maximum number of requests in flight
    pub concurrency: usize,
}

/// A version whose xref map could not be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionFailure {
    pub version: String,
    pub release: String,
    pub error: String,
}

/// Outcome of [`XrefMapGenerator::run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub latest_stable: Option<Version>,
    /// Versions whose xref map was written, in processing order
    pub written: Vec<String>,
    /// Versions left untouched because their xref map already existed
    pub skipped: Vec<String>,
    pub failed: Vec<VersionFailure>,
    /// Whether the root xref map was written
    pub root_written: bool,
    /// Counters summed over every written xref map
    pub fixes: FixReport,
    pub committed: bool,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

/// Fix the xref map at `path` in place: drop invalid references, resolve the
/// hrefs against `context` and, with `validation`, drop the references whose
/// page does not exist.
pub async fn fix_xrefmap_file(
    path: &Path,
    context: &HrefContext,
    rescue_overloads: bool,
    validation: Option<&LinkValidation>,
) -> crate::Result<FixReport> {
    let mut map = XrefMap::read(path).await?;
    let mut report = map.fix_hrefs(context, rescue_overloads);
    debug!(
        "{}: {} references, {} removed, {} rescued",
        path.display(),
        report.total,
        report.removed,
        report.rescued
    );

    if let Some(validation) = validation {
        info!("Testing the {} hrefs of {}", map.references.len(), path.display());
        report.unreachable = map
            .retain_reachable(Arc::clone(&validation.checker), validation.concurrency)
            .await;
    }

    map.write(path).await?;
    Ok(report)
}

pub struct XrefMapGenerator {
    config: XrefMapsConfig,
    vcs: Arc<dyn VersionControl>,
    docs: Arc<dyn DocGenerator>,
    link_checker: Option<Arc<dyn LinkChecker>>,
}

impl XrefMapGenerator {
    pub fn new(
        config: XrefMapsConfig,
        vcs: Arc<dyn VersionControl>,
        docs: Arc<dyn DocGenerator>,
    ) -> Self {
        Self {
            config,
            vcs,
            docs,
            link_checker: None,
        }
    }

    /// Check the published hrefs with `checker` when `test_urls` is enabled.
    pub fn with_link_checker(mut self, checker: Arc<dyn LinkChecker>) -> Self {
        self.link_checker = Some(checker);
        self
    }

    fn link_validation(&self) -> Option<LinkValidation> {
        if !self.config.test_urls {
            return None;
        }

        match &self.link_checker {
            Some(checker) => Some(LinkValidation {
                checker: Arc::clone(checker),
                concurrency: self.config.link_check_concurrency,
            }),
            None => {
                warn!("URL testing is enabled but no link checker is configured");
                None
            }
        }
    }

    /// Sync the repository and resolve its versions.
    pub async fn resolve_versions(&self) -> Result<version::ResolvedVersions> {
        let config = &self.config;

        self.vcs
            .sync(&config.repo_url, &config.repo_path, &config.repo_branch)
            .await
            .with_context(|| format!("Failed to sync '{}'", config.repo_path.display()))?;

        let tags = self
            .vcs
            .list_tags(&config.repo_path)
            .await
            .with_context(|| format!("Failed to list the tags of '{}'", config.repo_path.display()))?;
        info!("Found {} release tags", tags.len());

        let resolved = version::resolve_versions(&tags, config.stable_marker)
            .context("Failed to resolve the Unity versions")?;
        info!(
            "Resolved {} versions, latest stable is {} ({})",
            resolved.versions.len(),
            resolved.latest_stable.name,
            resolved.latest_stable.release
        );

        Ok(resolved)
    }

    /// Run the whole generation.
    ///
    /// # Errors
    ///
    /// Fails when the repository cannot be synced, when no stable version
    /// exists or when the commit of the output fails. Failures of a single
    /// release are recorded in the report instead.
    pub async fn run(&self) -> Result<GenerationReport> {
        let start_time = Instant::now();
        let resolved = self.resolve_versions().await?;
        let latest_stable = resolved.latest_stable.clone();
        let validation = self.link_validation();

        let mut report = GenerationReport {
            latest_stable: Some(latest_stable.clone()),
            ..Default::default()
        };

        for (release, names) in resolved.releases() {
            let backs_root = names.contains(&latest_stable.name);

            if self.config.skip_existing && self.is_published(&names, backs_root) {
                info!("Skipping {}: xref maps of {} already exist", release, names.join(", "));
                report.skipped.extend(names);
                continue;
            }

            let generated = match self.generate_release(&release).await {
                Ok(path) => path,
                Err(e) => {
                    error!("Failed to generate the docs of {}: {:#}", release, e);
                    report.failed.extend(names.iter().map(|name| VersionFailure {
                        version: name.clone(),
                        release: release.clone(),
                        error: format!("{:#}", e),
                    }));
                    continue;
                }
            };

            for name in &names {
                let dest = self.config.version_xrefmap_path(name);
                let context = self.config.href_context(name);
                match self.publish(&generated, &dest, &context, validation.as_ref()).await {
                    Ok(fixes) => {
                        info!("Wrote {} ({} references)", dest.display(), fixes.resolved - fixes.unreachable);
                        report.fixes.merge(&fixes);
                        report.written.push(name.clone());
                    }
                    Err(e) => {
                        error!("Failed to publish the xref map of {}: {:#}", name, e);
                        report.failed.push(VersionFailure {
                            version: name.clone(),
                            release: release.clone(),
                            error: format!("{:#}", e),
                        });
                    }
                }
            }

            if backs_root {
                let dest = self.config.root_xrefmap_path();
                let context = self.config.root_href_context();
                match self.publish(&generated, &dest, &context, validation.as_ref()).await {
                    Ok(fixes) => {
                        info!("Wrote {} from {}", dest.display(), latest_stable.name);
                        report.fixes.merge(&fixes);
                        report.root_written = true;
                    }
                    Err(e) => {
                        error!("Failed to publish the root xref map: {:#}", e);
                        report.failed.push(VersionFailure {
                            version: ".".to_string(),
                            release: release.clone(),
                            error: format!("{:#}", e),
                        });
                    }
                }
            }
        }

        if let Some(message) = &self.config.commit_message {
            report.committed = self
                .vcs
                .commit_all(&self.config.output_path, message)
                .await
                .with_context(|| format!("Failed to commit '{}'", self.config.output_path.display()))?;
        }

        report.elapsed = start_time.elapsed();
        info!(
            "Generation completed in {:.2}s: {} written, {} skipped, {} failed",
            report.elapsed.as_secs_f64(),
            report.written.len(),
            report.skipped.len(),
            report.failed.len()
        );

        Ok(report)
    }

    fn is_published(&self, names: &[String], backs_root: bool) -> bool {
        names
            .iter()
            .all(|name| self.config.version_xrefmap_path(name).exists())
            && (!backs_root || self.config.root_xrefmap_path().exists())
    }

    /// Check out `release` and generate its docs. Returns the path of the
    /// generated xref map.
    async fn generate_release(&self, release: &str) -> Result<PathBuf> {
        let repo_path = &self.config.repo_path;

        self.vcs
            .reset_to(repo_path, release)
            .await
            .with_context(|| format!("Failed to check out {}", release))?;

        info!("Generating the docs of {}", release);
        let site_path = self
            .docs
            .generate(repo_path)
            .await
            .with_context(|| format!("Failed to generate the docs of {}", release))?;

        let xrefmap_path = site_path.join(&self.config.xrefmap_file_name);
        if !xrefmap_path.exists() {
            anyhow::bail!("No xref map generated at '{}'", xrefmap_path.display());
        }

        Ok(xrefmap_path)
    }

    async fn publish(
        &self,
        generated: &Path,
        dest: &Path,
        context: &HrefContext,
        validation: Option<&LinkValidation>,
    ) -> Result<FixReport> {
        utils::copy_file(generated, dest)
            .await
            .with_context(|| format!("Failed to copy {} to {}", generated.display(), dest.display()))?;

        match fix_xrefmap_file(dest, context, self.config.rescue_orphan_overloads, validation).await {
            Ok(fixes) => Ok(fixes),
            Err(e) => {
                // An unfixed copy must not pass for a published map.
                if let Err(remove_error) = tokio::fs::remove_file(dest).await {
                    debug!("Failed to remove {}: {}", dest.display(), remove_error);
                }
                Err(e).with_context(|| format!("Failed to fix {}", dest.display()))
            }
        }
    }
}
