use crate::hash::data_sha;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between type and name in a fingerprint key.
pub const KEY_SEPARATOR: &str = "::";

/// Fingerprint type of the synthetic record emitted when an aspect vetoes a push.
pub const VETO_TYPE: &str = "veto";

/// A named, hashed, typed snapshot of one aspect of project state.
///
/// Two fingerprints describe the same entity over time when `fp_type` and
/// `name` match; they differ in content when `sha` differs. Fingerprints of
/// a virtual project carry its path as a `name` prefix, so sibling projects
/// never share a key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub fp_type: Option<String>,
    pub name: String,
    pub sha: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Fingerprint {
    /// Build a fingerprint whose sha is derived from `data`.
    pub fn new(fp_type: impl Into<String>, name: impl Into<String>, data: Value) -> Self {
        Self {
            fp_type: Some(fp_type.into()),
            name: name.into(),
            sha: data_sha(&data),
            data,
            version: None,
            abbreviation: None,
            path: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }

    /// Place in the virtual project at `path`: the path is recorded and
    /// prefixed to `name` (`moduleA/build.gradle`). `.` and empty paths mean
    /// the whole project and leave the name alone.
    pub fn in_virtual_project(mut self, path: Option<&str>) -> Self {
        self.path = normalize_path(path);
        if let Some(p) = &self.path {
            let prefix = format!("{p}/");
            if !self.name.starts_with(&prefix) {
                self.name = format!("{prefix}{}", self.name);
            }
        }
        self
    }

    /// The fingerprint as its own virtual project sees it: path prefix
    /// removed from `name` and no path.
    pub fn local_to_virtual_project(&self) -> Fingerprint {
        let mut fp = self.clone();
        if let Some(p) = fp.path.take() {
            if let Some(rest) = fp.name.strip_prefix(&format!("{p}/")) {
                fp.name = rest.to_string();
            }
        }
        fp
    }

    pub fn type_name(&self) -> &str {
        self.fp_type.as_deref().unwrap_or("")
    }

    /// `type::name` identity key.
    pub fn key(&self) -> String {
        fingerprint_key(self.type_name(), &self.name)
    }

    pub fn same_entity(&self, other: &Fingerprint) -> bool {
        self.fp_type == other.fp_type && self.name == other.name
    }

    /// Same entity, different content.
    pub fn is_changed_from(&self, other: &Fingerprint) -> bool {
        self.same_entity(other) && self.sha != other.sha
    }

    /// Short human label: abbreviation when present, otherwise a sha prefix.
    pub fn display_value(&self) -> String {
        match &self.abbreviation {
            Some(a) => a.clone(),
            None => self.sha.chars().take(8).collect(),
        }
    }
}

/// Build the `type::name` key used by previous/target lookups.
pub fn fingerprint_key(fp_type: &str, name: &str) -> String {
    format!("{fp_type}{KEY_SEPARATOR}{name}")
}

/// Normalize a sub-project path: `None`, `""`, `"."` and `"./"` all mean
/// "no sub-path". Leading `./` and trailing `/` are stripped; separators
/// become `/`.
pub fn normalize_path(path: Option<&str>) -> Option<String> {
    let raw = path?.trim().replace('\\', "/");
    let mut p = raw.as_str();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    let p = p.trim_end_matches('/');
    if p.is_empty() || p == "." {
        None
    } else {
        Some(p.to_string())
    }
}
