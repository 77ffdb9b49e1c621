//! Virtual project detection.
//!
//! A virtual project is a sub-directory that should be fingerprinted as if it
//! were its own repository (monorepo modules, nested services). Finders
//! answer one question per project: is this tree one unit, a set of units,
//! or unknown?

pub mod cached;
pub mod first_of;
pub mod glob;

pub use cached::CachingFinder;
pub use first_of::{first_virtual_project_finder_of, FirstOfFinder};
pub use glob::{FileRule, FileStatus, GlobFinder};

use crate::project::Project;
use serde::Serialize;

/// A sub-directory to fingerprint independently. `path` is `"."` for the
/// project root.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VirtualProject {
    pub path: String,
    pub reason: String,
}

/// Outcome of virtual project detection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status")]
pub enum VirtualProjectInfo {
    /// No splitting; treat the whole tree as one unit.
    RootOnly,
    /// Fingerprint each listed directory independently.
    IdentifiedPaths {
        #[serde(rename = "virtualProjects")]
        virtual_projects: Vec<VirtualProject>,
    },
    /// The finder could not tell; callers usually treat this as `RootOnly`.
    Unknown,
}

impl VirtualProjectInfo {
    pub fn identified(virtual_projects: Vec<VirtualProject>) -> Self {
        VirtualProjectInfo::IdentifiedPaths { virtual_projects }
    }

    /// Identified sub-projects, empty for `RootOnly`/`Unknown`.
    pub fn virtual_projects(&self) -> &[VirtualProject] {
        match self {
            VirtualProjectInfo::IdentifiedPaths { virtual_projects } => virtual_projects,
            _ => &[],
        }
    }

    pub fn status_name(&self) -> &'static str {
        match self {
            VirtualProjectInfo::RootOnly => "RootOnly",
            VirtualProjectInfo::IdentifiedPaths { .. } => "IdentifiedPaths",
            VirtualProjectInfo::Unknown => "Unknown",
        }
    }
}

/// Strategy deciding whether and where a project splits into virtual projects.
pub trait VirtualProjectFinder: Send + Sync {
    fn name(&self) -> &str;

    fn find(&self, project: &dyn Project) -> anyhow::Result<VirtualProjectInfo>;

    /// The caller is done with `project`; drop anything kept for it.
    fn release(&self, _project: &dyn Project) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_status_tag() {
        let info = VirtualProjectInfo::identified(vec![VirtualProject {
            path: "moduleA".into(),
            reason: "has file: build.gradle".into(),
        }]);
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["status"], "IdentifiedPaths");
        assert_eq!(v["virtualProjects"][0]["path"], "moduleA");
        assert_eq!(
            serde_json::to_value(VirtualProjectInfo::RootOnly).unwrap()["status"],
            "RootOnly"
        );
    }

    #[test]
    fn virtual_projects_empty_unless_identified() {
        assert!(VirtualProjectInfo::RootOnly.virtual_projects().is_empty());
        assert!(VirtualProjectInfo::Unknown.virtual_projects().is_empty());
    }
}
