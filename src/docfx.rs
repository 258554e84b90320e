//! Documentation generation with DocFX.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info};

use crate::config::XrefMapsConfig;
use crate::error::{Result, XrefError};
use crate::utils;

/// Builds the documentation site, and its xref map, of a working tree.
#[async_trait]
pub trait DocGenerator: Send + Sync {
    /// Generate the documentation of the working tree at `repo_path` and
    /// return the directory of the generated site.
    async fn generate(&self, repo_path: &Path) -> Result<PathBuf>;
}

/// Item group condition that hides the Unity sources from DocFX.
const DEBUG_ITEM_GROUP: &str =
    "ItemGroup Condition=\" '$(Configuration)|$(Platform)' == 'Debug|AnyCPU' \"";

/// Make every item group of a Unity project unconditional so DocFX picks up
/// the sources.
pub fn patch_csproj(text: &str) -> String {
    text.replace(DEBUG_ITEM_GROUP, "ItemGroup")
}

/// [`DocGenerator`] running the `docfx` executable from the working
/// directory, next to its `docfx.json`.
#[derive(Debug, Clone)]
pub struct DocFx {
    command: Vec<String>,
    working_dir: PathBuf,
    metadata_path: PathBuf,
    site_path: PathBuf,
    csproj_paths: Vec<PathBuf>,
}

impl DocFx {
    pub fn new(config: &XrefMapsConfig) -> Self {
        Self {
            command: config.docfx_command.clone(),
            working_dir: PathBuf::from("."),
            metadata_path: config.docfx_metadata_path.clone(),
            site_path: config.generated_docs_path.clone(),
            csproj_paths: config.csproj_paths.clone(),
        }
    }

    async fn patch_projects(&self, repo_path: &Path) -> Result<()> {
        for csproj in &self.csproj_paths {
            let path = repo_path.join(csproj);
            if !path.exists() {
                debug!("Skipping missing project {}", path.display());
                continue;
            }

            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| XrefError::io(&path, e))?;
            tokio::fs::write(&path, patch_csproj(&text))
                .await
                .map_err(|e| XrefError::io(&path, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocGenerator for DocFx {
    async fn generate(&self, repo_path: &Path) -> Result<PathBuf> {
        for path in [&self.metadata_path, &self.site_path] {
            utils::remove_dir_if_exists(path).await?;
        }

        info!("Fixing the projects of '{}'", repo_path.display());
        self.patch_projects(repo_path).await?;

        let Some((program, args)) = self.command.split_first() else {
            return Err(XrefError::command("docfx", "no DocFX command configured"));
        };

        info!("Running DocFX on '{}'", repo_path.display());
        let output = utils::run_command(program, args, &self.working_dir).await?;
        for line in output.lines() {
            debug!("docfx: {}", line);
        }

        Ok(self.site_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CSPROJ: &str = r#"<Project>
  <ItemGroup Condition=" '$(Configuration)|$(Platform)' == 'Debug|AnyCPU' ">
    <Compile Include="Runtime/Export/GameObject.cs" />
  </ItemGroup>
</Project>"#;

    #[test]
    fn test_patch_csproj() {
        let patched = patch_csproj(CSPROJ);
        assert!(patched.contains("<ItemGroup>"));
        assert!(!patched.contains("Condition"));
        assert!(patched.contains("</ItemGroup>"));
    }

    #[tokio::test]
    async fn test_generate_fails_without_command() {
        let temp_dir = TempDir::new().unwrap();
        let config = XrefMapsConfig {
            docfx_command: Vec::new(),
            docfx_metadata_path: temp_dir.path().join("Temp"),
            generated_docs_path: temp_dir.path().join("_site"),
            csproj_paths: vec![PathBuf::from("UnityEngine.csproj")],
            ..Default::default()
        };
        std::fs::write(temp_dir.path().join("UnityEngine.csproj"), CSPROJ).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("_site")).unwrap();

        let result = DocFx::new(&config).generate(temp_dir.path()).await;

        assert!(matches!(result, Err(XrefError::Command { .. })));
        assert!(!temp_dir.path().join("_site").exists());
        let patched = std::fs::read_to_string(temp_dir.path().join("UnityEngine.csproj")).unwrap();
        assert!(!patched.contains("Condition"));
    }
}
