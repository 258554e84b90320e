//! Run configuration.
//!
//! Settings come from, in increasing priority: built-in defaults, an optional
//! `xrefmaps.toml` file, `XREFMAPS_*` environment variables (nested keys use
//! `__`), then command-line overrides applied by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::href::HrefContext;
use crate::version::DEFAULT_STABLE_MARKER;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "xrefmaps.toml";

/// Placeholder of the version label in [`XrefMapsConfig::versioned_api_url`].
pub const VERSION_PLACEHOLDER: &str = "{version}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XrefMapsConfig {
    /// Repository holding the C# reference source
    pub repo_url: String,
    /// Working tree of `repo_url`
    pub repo_path: PathBuf,
    pub repo_branch: String,
    /// Site directory DocFX writes into, relative to the working directory
    pub generated_docs_path: PathBuf,
    /// DocFX metadata directory cleared before each generation
    pub docfx_metadata_path: PathBuf,
    /// Command and arguments used to run DocFX
    pub docfx_command: Vec<String>,
    /// Projects patched before running DocFX, relative to `repo_path`
    pub csproj_paths: Vec<PathBuf>,
    pub xrefmap_file_name: String,
    /// Root directory of the published xref maps
    pub output_path: PathBuf,
    /// Scripting reference of the latest version
    pub api_url: String,
    /// Scripting reference of a given version, `{version}` is replaced
    pub versioned_api_url: String,
    /// Root namespaces the online documentation leaves out of page names
    pub namespaces_to_trim: Vec<String>,
    /// Character identifying final releases in tag names
    pub stable_marker: char,
    /// Check every href over HTTP and drop the unreachable ones
    pub test_urls: bool,
    pub link_check_concurrency: usize,
    pub link_check_timeout_secs: u64,
    /// Keep overload groups whose concrete overloads are all missing
    pub rescue_orphan_overloads: bool,
    /// Do not regenerate versions whose xref map already exists
    pub skip_existing: bool,
    /// Commit the output repository with this message when set
    pub commit_message: Option<String>,
}

impl Default for XrefMapsConfig {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/Unity-Technologies/UnityCsReference.git".to_string(),
            repo_path: PathBuf::from("UnityCsReference"),
            repo_branch: "master".to_string(),
            generated_docs_path: PathBuf::from("UnityCsReference/_site"),
            docfx_metadata_path: PathBuf::from("Temp"),
            docfx_command: vec!["docfx".to_string()],
            csproj_paths: vec![
                PathBuf::from("Projects/CSharp/UnityEditor.csproj"),
                PathBuf::from("Projects/CSharp/UnityEngine.csproj"),
            ],
            xrefmap_file_name: "xrefmap.yml".to_string(),
            output_path: PathBuf::from("_site/Unity"),
            api_url: "https://docs.unity3d.com/ScriptReference/".to_string(),
            versioned_api_url: "https://docs.unity3d.com/{version}/Documentation/ScriptReference/"
                .to_string(),
            namespaces_to_trim: vec!["UnityEditor".to_string(), "UnityEngine".to_string()],
            stable_marker: DEFAULT_STABLE_MARKER,
            test_urls: false,
            link_check_concurrency: 16,
            link_check_timeout_secs: 30,
            rescue_orphan_overloads: false,
            skip_existing: false,
            commit_message: None,
        }
    }
}

impl XrefMapsConfig {
    /// Load the configuration, layering `path` (if it exists) and the
    /// environment over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::XrefError::Config`] when the file or an environment
    /// variable holds a value of the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_FILE_NAME));

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("XREFMAPS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("namespaces_to_trim")
                    .with_list_parse_key("docfx_command")
                    .with_list_parse_key("csproj_paths")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Scripting reference URL of `version`.
    pub fn api_url_for(&self, version: &str) -> String {
        self.versioned_api_url.replace(VERSION_PLACEHOLDER, version)
    }

    /// Href settings of the xref map of `version`.
    pub fn href_context(&self, version: &str) -> HrefContext {
        HrefContext::new(self.api_url_for(version), self.namespaces_to_trim.clone())
    }

    /// Href settings of the version-less root xref map.
    pub fn root_href_context(&self) -> HrefContext {
        HrefContext::new(self.api_url.clone(), self.namespaces_to_trim.clone())
    }

    /// Published xref map of `version`: `<output>/<version>/xrefmap.yml`.
    pub fn version_xrefmap_path(&self, version: &str) -> PathBuf {
        self.output_path.join(version).join(&self.xrefmap_file_name)
    }

    /// Published default xref map: `<output>/xrefmap.yml`.
    pub fn root_xrefmap_path(&self) -> PathBuf {
        self.output_path.join(&self.xrefmap_file_name)
    }
}
