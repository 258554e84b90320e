//! Xref maps of the Unity scripting API
//!
//! Generates DocFX cross-reference maps for every Unity version from the
//! C# reference source, pointing each symbol at its page of the online
//! Unity scripting reference.

pub mod config;
pub mod docfx;
pub mod error;
pub mod git;
pub mod href;
pub mod link_check;
pub mod pipeline;
pub mod utils;
pub mod validator;
pub mod version;
pub mod xrefmap;

pub use config::XrefMapsConfig;
pub use docfx::{DocFx, DocGenerator};
pub use error::{Result, XrefError};
pub use git::{GitCli, VersionControl};
pub use href::{resolve_href, HrefContext, HrefRule, SymbolKind, HREF_RULES};
pub use link_check::{HttpLinkChecker, LinkChecker};
pub use pipeline::{
    fix_xrefmap_file, GenerationReport, LinkValidation, VersionFailure, XrefMapGenerator,
};
pub use version::{resolve_versions, ReleaseTag, ResolvedVersions, Version};
pub use xrefmap::{FixReport, XrefMap, XrefMapReference};
