//! DocFX xref map documents.
//!
//! An xref map is a YAML document listing, for every documented symbol, its
//! uid and the href of its page. DocFX generates one next to the site it
//! builds; this module loads it, rewrites its hrefs to point at the online
//! Unity documentation and saves it back.

use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{Result, XrefError};
use crate::href::HrefContext;
use crate::link_check::LinkChecker;
use crate::validator;

lazy_static::lazy_static! {
    /// Lower bounds of multidimensional arrays as DocFX writes them
    /// (`System.Single[0:,0:]`). Only the bare `<digit>:` before `,` or `]`
    /// matches so ports and comment id prefixes are left alone.
    static ref ARRAY_BOUND: Regex = Regex::new(r"(\d):([,\]])").unwrap();
}

/// First line of every xref map document.
pub const XREFMAP_HEADER: &str = "### YamlMime:XRefMap";

/// One symbol of an xref map.
///
/// The `.vb` fields hold the Visual Basic display names DocFX emits next to
/// the C# ones; they are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefMapReference {
    pub uid: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(rename = "name.vb", default, skip_serializing_if = "Option::is_none")]
    pub name_vb: Option<String>,

    /// Page of the symbol, assigned by [`XrefMap::fix_hrefs`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(rename = "commentId", default, skip_serializing_if = "String::is_empty")]
    pub comment_id: String,

    #[serde(rename = "isSpec", default, skip_serializing_if = "Option::is_none")]
    pub is_spec: Option<String>,

    #[serde(rename = "fullName", default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,

    #[serde(rename = "fullName.vb", default, skip_serializing_if = "Option::is_none")]
    pub full_name_vb: Option<String>,

    #[serde(rename = "nameWithType", default, skip_serializing_if = "String::is_empty")]
    pub name_with_type: String,

    #[serde(
        rename = "nameWithType.vb",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub name_with_type_vb: Option<String>,
}

impl XrefMapReference {
    pub fn new(uid: impl Into<String>, comment_id: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            comment_id: comment_id.into(),
            ..Default::default()
        }
    }
}

/// Counters of one [`XrefMap::fix_hrefs`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixReport {
    /// References before the pass
    pub total: usize,
    /// Overload groups rewritten into method references
    pub rescued: usize,
    /// Invalid references dropped
    pub removed: usize,
    /// References kept with a resolved href
    pub resolved: usize,
    /// References dropped by the link check
    pub unreachable: usize,
}

impl FixReport {
    /// Add the counters of `other` to these.
    pub fn merge(&mut self, other: &FixReport) {
        self.total += other.total;
        self.rescued += other.rescued;
        self.removed += other.removed;
        self.resolved += other.resolved;
        self.unreachable += other.unreachable;
    }
}

/// An xref map document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefMap {
    #[serde(default)]
    pub sorted: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<XrefMapReference>,
}

/// Strip the colon of array lower bounds: `Single[0:,0:]` -> `Single[0,0]`.
pub fn desugar(raw: &str) -> String {
    ARRAY_BOUND.replace_all(raw, "${1}${2}").into_owned()
}

impl XrefMap {
    /// Parse an xref map document.
    ///
    /// # Errors
    ///
    /// Returns [`XrefError::Parse`] when the text, once de-sugared, does not
    /// match the xref map schema.
    pub fn load(raw: &str) -> Result<Self> {
        let text = desugar(raw);
        serde_yaml::from_str(&text).map_err(|e| XrefError::Parse(e.to_string()))
    }

    /// Read and parse the xref map at `path`.
    pub async fn read(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| XrefError::io(path, e))?;
        Self::load(&raw).map_err(|e| match e {
            XrefError::Parse(message) => {
                XrefError::Parse(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Serialize the document, header line included. Absent optional fields
    /// are left out.
    pub fn save(&self) -> Result<String> {
        let body = serde_yaml::to_string(self)?;
        Ok(format!("{}\n{}", XREFMAP_HEADER, body))
    }

    /// Serialize the document to `path`, creating parent directories.
    pub async fn write(&self, path: &Path) -> Result<()> {
        let text = self.save()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| XrefError::io(parent, e))?;
        }
        tokio::fs::write(path, text)
            .await
            .map_err(|e| XrefError::io(path, e))
    }

    /// Drop unpublishable references and point the others at the pages of
    /// `context.api_url`.
    ///
    /// With `rescue_overloads`, overload groups whose members all vanished are
    /// first turned into method references instead of being dropped.
    pub fn fix_hrefs(&mut self, context: &HrefContext, rescue_overloads: bool) -> FixReport {
        let mut report = FixReport {
            total: self.references.len(),
            ..Default::default()
        };

        if rescue_overloads {
            let snapshot = self.references.clone();
            for reference in &mut self.references {
                if validator::fix_overload_comment_id(reference, &snapshot) {
                    debug!("Rescued overload group {} as {}", reference.uid, reference.comment_id);
                    report.rescued += 1;
                }
            }
        }

        self.references.retain(validator::is_valid);
        report.removed = report.total - self.references.len();

        for reference in &mut self.references {
            reference.href = Some(context.resolve(&reference.uid, &reference.comment_id));
        }
        report.resolved = self.references.len();

        report
    }

    /// Check every href with `checker` and drop the references whose page does
    /// not exist. Returns the number of dropped references.
    ///
    /// All checks run concurrently, at most `concurrency` at a time; the
    /// references are filtered once every check has completed.
    pub async fn retain_reachable(
        &mut self,
        checker: Arc<dyn LinkChecker>,
        concurrency: usize,
    ) -> usize {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut checks = JoinSet::new();

        for (index, reference) in self.references.iter().enumerate() {
            let Some(href) = reference.href.clone() else {
                continue;
            };
            let checker = Arc::clone(&checker);
            let semaphore = Arc::clone(&semaphore);
            checks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, checker.exists(&href).await)
            });
        }

        let mut reachable = vec![false; self.references.len()];
        while let Some(result) = checks.join_next().await {
            match result {
                Ok((index, exists)) => reachable[index] = exists,
                Err(e) => warn!("Link check task failed: {}", e),
            }
        }

        let before = self.references.len();
        let mut index = 0;
        self.references.retain(|reference| {
            let keep = reachable[index];
            index += 1;
            if !keep {
                warn!(
                    "Invalid URL {} for uid {}",
                    reference.href.as_deref().unwrap_or("<none>"),
                    reference.uid
                );
            }
            keep
        });

        before - self.references.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    const GENERATED: &str = r#"### YamlMime:XRefMap
sorted: true
references:
- uid: UnityEngine
  name: UnityEngine
  href: api/UnityEngine.html
  commentId: N:UnityEngine
  fullName: UnityEngine
  nameWithType: UnityEngine
- uid: UnityEngine.GameObject.SetActive(System.Boolean)
  name: SetActive(Boolean)
  href: api/UnityEngine.GameObject.html#UnityEngine_GameObject_SetActive_System_Boolean_
  commentId: M:UnityEngine.GameObject.SetActive(System.Boolean)
  fullName: UnityEngine.GameObject.SetActive(System.Boolean)
  fullName.vb: UnityEngine.GameObject.SetActive(System.Boolean)
  nameWithType: GameObject.SetActive(Boolean)
- uid: UnityEngine.Object.Destroy*
  name: Destroy
  href: api/UnityEngine.Object.html#UnityEngine_Object_Destroy_
  commentId: Overload:UnityEngine.Object.Destroy
  isSpec: "True"
  fullName: UnityEngine.Object.Destroy
  nameWithType: Object.Destroy
"#;

    fn context() -> HrefContext {
        HrefContext::new(
            "https://docs.unity3d.com/ScriptReference/",
            vec!["UnityEngine".to_string(), "UnityEditor".to_string()],
        )
    }

    struct FakeChecker {
        missing: Vec<String>,
    }

    #[async_trait]
    impl LinkChecker for FakeChecker {
        async fn exists(&self, url: &str) -> bool {
            !self.missing.iter().any(|missing| missing == url)
        }
    }

    #[test]
    fn test_desugar_array_bounds() {
        assert_eq!(
            desugar("uid: System.Single[0:,0:]\n"),
            "uid: System.Single[0,0]\n"
        );
        assert_eq!(desugar("commentId: M:Foo\n"), "commentId: M:Foo\n");
        assert_eq!(
            desugar("href: http://127.0.0.1:8080/Foo.html\n"),
            "href: http://127.0.0.1:8080/Foo.html\n"
        );
    }

    #[test]
    fn test_load_generated_map() {
        let map = XrefMap::load(GENERATED).unwrap();
        assert!(map.sorted);
        assert_eq!(map.references.len(), 3);

        let method = &map.references[1];
        assert_eq!(method.name, "SetActive(Boolean)");
        assert_eq!(method.name_vb, None);
        assert_eq!(
            method.full_name_vb.as_deref(),
            Some("UnityEngine.GameObject.SetActive(System.Boolean)")
        );
        assert_eq!(map.references[2].is_spec.as_deref(), Some("True"));
    }

    #[test]
    fn test_save_then_load_keeps_values() {
        let raw = r#"### YamlMime:XRefMap
sorted: true
references:
- uid: UnityEngine.Mesh.SetVertices(System.Single[0:,0:])
  name: SetVertices(Single[0:,0:])
  href: http://127.0.0.1:8080/Mesh-SetVertices.html
  commentId: M:UnityEngine.Mesh.SetVertices(System.Single[0:,0:])
  fullName: UnityEngine.Mesh.SetVertices(System.Single[0:,0:])
  nameWithType: Mesh.SetVertices(Single[0:,0:])
"#;
        let map = XrefMap::load(raw).unwrap();
        let reference = &map.references[0];
        assert_eq!(reference.uid, "UnityEngine.Mesh.SetVertices(System.Single[0,0])");
        assert_eq!(reference.name, "SetVertices(Single[0,0])");
        assert_eq!(
            reference.href.as_deref(),
            Some("http://127.0.0.1:8080/Mesh-SetVertices.html")
        );

        let reloaded = XrefMap::load(&map.save().unwrap()).unwrap();
        assert_eq!(reloaded, map);
    }

    #[test]
    fn test_save_then_load_keeps_port_hrefs() {
        let mut reference = XrefMapReference::new("UnityEngine.Foo", "T:UnityEngine.Foo");
        reference.href = Some("http://127.0.0.1:8080/Foo-null.html".to_string());
        let map = XrefMap {
            sorted: true,
            references: vec![reference],
        };

        let reloaded = XrefMap::load(&map.save().unwrap()).unwrap();
        assert_eq!(reloaded, map);
    }

    #[test]
    fn test_load_rejects_invalid_schema() {
        let result = XrefMap::load("sorted: [1, 2\nreferences: 12");
        assert!(matches!(result, Err(XrefError::Parse(_))));

        let result = XrefMap::load("references:\n  uid: not-a-list\n");
        assert!(matches!(result, Err(XrefError::Parse(_))));
    }

    #[test]
    fn test_save_omits_absent_fields() {
        let map = XrefMap {
            sorted: true,
            references: vec![XrefMapReference::new("UnityEngine.Object", "T:UnityEngine.Object")],
        };

        let text = map.save().unwrap();
        assert!(text.starts_with("### YamlMime:XRefMap\n"));
        assert!(text.contains("sorted: true"));
        assert!(text.contains("commentId: T:UnityEngine.Object"));
        assert!(!text.contains("href"));
        assert!(!text.contains(".vb"));
        assert!(!text.contains("isSpec"));
        assert!(!text.contains("null"));
    }

    #[test]
    fn test_save_then_load_keeps_fields() {
        let original = XrefMap::load(GENERATED).unwrap();
        let reloaded = XrefMap::load(&original.save().unwrap()).unwrap();
        assert_eq!(reloaded, original);
        assert_eq!(reloaded.references[0].full_name_vb, None);
    }

    #[test]
    fn test_fix_hrefs() {
        let mut map = XrefMap::load(GENERATED).unwrap();
        let report = map.fix_hrefs(&context(), false);

        assert_eq!(
            report,
            FixReport {
                total: 3,
                rescued: 0,
                removed: 1,
                resolved: 2,
                unreachable: 0,
            }
        );
        assert_eq!(
            map.references[0].href.as_deref(),
            Some("https://docs.unity3d.com/ScriptReference/index.html")
        );
        assert_eq!(
            map.references[1].href.as_deref(),
            Some("https://docs.unity3d.com/ScriptReference/GameObject-SetActive.html")
        );
        for reference in &map.references {
            assert!(reference.href.as_deref().unwrap().ends_with(".html"));
            assert!(!reference.comment_id.contains("Overload:"));
        }
    }

    #[test]
    fn test_fix_hrefs_rescues_orphan_overloads() {
        let mut map = XrefMap::load(GENERATED).unwrap();
        let report = map.fix_hrefs(&context(), true);

        assert_eq!(report.rescued, 1);
        assert_eq!(report.removed, 0);
        assert_eq!(
            map.references[2].href.as_deref(),
            Some("https://docs.unity3d.com/ScriptReference/Object-Destroy.html")
        );
    }

    #[tokio::test]
    async fn test_retain_reachable_drops_missing_pages() {
        let mut map = XrefMap::load(GENERATED).unwrap();
        map.fix_hrefs(&context(), false);

        let checker = Arc::new(FakeChecker {
            missing: vec![
                "https://docs.unity3d.com/ScriptReference/GameObject-SetActive.html".to_string(),
            ],
        });
        let dropped = map.retain_reachable(checker, 2).await;

        assert_eq!(dropped, 1);
        assert_eq!(map.references.len(), 1);
        assert_eq!(map.references[0].uid, "UnityEngine");
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("2019.4").join("xrefmap.yml");

        let mut map = XrefMap::load(GENERATED).unwrap();
        map.fix_hrefs(&context(), false);
        map.write(&path).await.unwrap();

        let reloaded = XrefMap::read(&path).await.unwrap();
        assert_eq!(reloaded, map);
    }
}
