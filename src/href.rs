//! Href resolution for xref map references.
//!
//! DocFX identifies symbols by uid (`UnityEngine.GameObject.SetActive(System.Boolean)`)
//! while the Unity scripting reference names its pages after a trimmed,
//! hyphenated form of that uid (`GameObject-SetActive.html`). The rewrite is an
//! ordered list of [`HrefRule`]s; order matters since later rules rely on the
//! output of earlier ones (the member anchor rule expects parameter lists to be
//! gone already).

use regex::Regex;

lazy_static::lazy_static! {
    /// Arity of nested or method generics, e.g. ``` ``1 ```
    static ref NESTED_GENERIC_ARITY: Regex = Regex::new(r"``\d").unwrap();
    static ref TRAILING_WILDCARD: Regex = Regex::new(r"\*$").unwrap();
    static ref PARAMETER_LIST: Regex = Regex::new(r"\(.*\)").unwrap();
}

/// Fragment of namespace references: they all point to the documentation index.
pub const NAMESPACE_FRAGMENT: &str = "index";

/// Kind of symbol a comment id refers to, taken from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Namespace,
    Type,
    Method,
    Property,
    Field,
    Event,
    Other,
}

impl SymbolKind {
    pub fn from_comment_id(comment_id: &str) -> Self {
        match comment_id.split_once(':').map(|(prefix, _)| prefix) {
            Some("N") => SymbolKind::Namespace,
            Some("T") => SymbolKind::Type,
            Some("M") => SymbolKind::Method,
            Some("P") => SymbolKind::Property,
            Some("F") => SymbolKind::Field,
            Some("E") => SymbolKind::Event,
            _ => SymbolKind::Other,
        }
    }

    /// Members whose page is reached through an anchor on their type's path.
    pub fn is_member(self) -> bool {
        matches!(self, SymbolKind::Method | SymbolKind::Property)
    }
}

/// Inputs shared by every rule of one resolution.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub kind: SymbolKind,
    pub namespaces_to_trim: &'a [String],
}

/// One step of the uid to page-name rewrite.
pub struct HrefRule {
    pub name: &'static str,
    pub applies: fn(&RuleInput<'_>) -> bool,
    pub rewrite: fn(&str, &RuleInput<'_>) -> String,
}

impl HrefRule {
    /// Apply this rule to `fragment` if its precondition holds.
    pub fn apply(&self, fragment: String, input: &RuleInput<'_>) -> String {
        if (self.applies)(input) {
            (self.rewrite)(&fragment, input)
        } else {
            fragment
        }
    }
}

fn always(_: &RuleInput<'_>) -> bool {
    true
}

fn on_members(input: &RuleInput<'_>) -> bool {
    input.kind.is_member()
}

/// The Unity documentation omits the root `UnityEngine` and `UnityEditor`
/// namespaces from its page names.
fn trim_namespaces(fragment: &str, input: &RuleInput<'_>) -> String {
    input
        .namespaces_to_trim
        .iter()
        .fold(fragment.to_string(), |fragment, namespace| {
            fragment.replace(&format!("{}.", namespace), "")
        })
}

fn constructor(fragment: &str, _: &RuleInput<'_>) -> String {
    fragment.replace(".#ctor", "-ctor")
}

fn nested_generic_arity(fragment: &str, _: &RuleInput<'_>) -> String {
    NESTED_GENERIC_ARITY.replace_all(fragment, "").into_owned()
}

fn generic_arity(fragment: &str, _: &RuleInput<'_>) -> String {
    fragment.replace('`', "_")
}

fn overload_wildcard(fragment: &str, _: &RuleInput<'_>) -> String {
    TRAILING_WILDCARD.replace(fragment, "").into_owned()
}

fn parameter_list(fragment: &str, _: &RuleInput<'_>) -> String {
    PARAMETER_LIST.replace(fragment, "").into_owned()
}

/// Member pages are anchored with a hyphen (`Transform-position`) while nested
/// types keep their dot (`ParticleSystem.MainModule`).
///
/// Methods always take the hyphen. Properties take it when their name starts
/// lowercase, which is how Unity names them; a property whose name starts
/// uppercase is indistinguishable from a nested type here and keeps the dot.
///
/// Methods do not follow the lowercase-only rule on purpose: Unity names
/// them in PascalCase and still anchors them (`GameObject-SetActive`).
fn member_anchor(fragment: &str, input: &RuleInput<'_>) -> String {
    let Some(dot) = fragment.rfind('.') else {
        return fragment.to_string();
    };

    let member = &fragment[dot + 1..];
    // Constructors are anchored already: `Rendering.CommandBuffer-ctor`
    if member.contains('-') {
        return fragment.to_string();
    }

    let lowercase_member = member
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_lowercase());

    if input.kind == SymbolKind::Method || lowercase_member {
        format!("{}-{}", &fragment[..dot], member)
    } else {
        fragment.to_string()
    }
}

/// Rewrite rules in application order.
pub static HREF_RULES: &[HrefRule] = &[
    HrefRule {
        name: "trim-namespaces",
        applies: always,
        rewrite: trim_namespaces,
    },
    HrefRule {
        name: "constructor",
        applies: always,
        rewrite: constructor,
    },
    HrefRule {
        name: "nested-generic-arity",
        applies: always,
        rewrite: nested_generic_arity,
    },
    HrefRule {
        name: "generic-arity",
        applies: always,
        rewrite: generic_arity,
    },
    HrefRule {
        name: "overload-wildcard",
        applies: always,
        rewrite: overload_wildcard,
    },
    HrefRule {
        name: "parameter-list",
        applies: always,
        rewrite: parameter_list,
    },
    HrefRule {
        name: "member-anchor",
        applies: on_members,
        rewrite: member_anchor,
    },
];

/// Page name (without extension) of a symbol on the Unity documentation.
pub fn resolve_fragment(uid: &str, comment_id: &str, namespaces_to_trim: &[String]) -> String {
    let input = RuleInput {
        kind: SymbolKind::from_comment_id(comment_id),
        namespaces_to_trim,
    };

    if input.kind == SymbolKind::Namespace {
        return NAMESPACE_FRAGMENT.to_string();
    }

    HREF_RULES
        .iter()
        .fold(uid.to_string(), |fragment, rule| rule.apply(fragment, &input))
}

/// Full URL of a symbol's page: `api_url` + page name + `.html`.
///
/// Never fails: malformed uids produce a malformed URL, invalid references
/// are filtered out beforehand by [`crate::validator::is_valid`].
pub fn resolve_href(
    uid: &str,
    comment_id: &str,
    api_url: &str,
    namespaces_to_trim: &[String],
) -> String {
    format!(
        "{}{}.html",
        api_url,
        resolve_fragment(uid, comment_id, namespaces_to_trim)
    )
}

/// Base URL and namespace settings used to resolve the hrefs of one xref map.
#[derive(Debug, Clone)]
pub struct HrefContext {
    pub api_url: String,
    pub namespaces_to_trim: Vec<String>,
}

impl HrefContext {
    pub fn new(api_url: impl Into<String>, namespaces_to_trim: Vec<String>) -> Self {
        Self {
            api_url: api_url.into(),
            namespaces_to_trim,
        }
    }

    pub fn resolve(&self, uid: &str, comment_id: &str) -> String {
        resolve_href(uid, comment_id, &self.api_url, &self.namespaces_to_trim)
    }
}
