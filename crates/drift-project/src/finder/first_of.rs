use super::{VirtualProject, VirtualProjectFinder, VirtualProjectInfo};
use crate::project::Project;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tries finders in order.
///
/// `RootOnly` from any finder is definitive and returned at once, even if
/// earlier finders identified paths. Identified paths accumulate across
/// finders. `Unknown` (or a finder error) falls through to the next finder.
pub struct FirstOfFinder {
    name: String,
    finders: Vec<Arc<dyn VirtualProjectFinder>>,
}

impl FirstOfFinder {
    pub fn new(finders: Vec<Arc<dyn VirtualProjectFinder>>) -> Self {
        let name = format!(
            "first-of:{}",
            finders
                .iter()
                .map(|f| f.name().to_string())
                .collect::<Vec<_>>()
                .join("|")
        );
        Self { name, finders }
    }
}

impl VirtualProjectFinder for FirstOfFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, project: &dyn Project) -> anyhow::Result<VirtualProjectInfo> {
        let mut found: Vec<VirtualProject> = Vec::new();
        for finder in &self.finders {
            let info = match finder.find(project) {
                Ok(info) => info,
                Err(e) => {
                    warn!(
                        finder = finder.name(),
                        error = %e,
                        "virtual project finder failed; treating as unknown"
                    );
                    continue;
                }
            };
            match info {
                VirtualProjectInfo::RootOnly => {
                    debug!(finder = finder.name(), "finder reported root only");
                    return Ok(VirtualProjectInfo::RootOnly);
                }
                VirtualProjectInfo::IdentifiedPaths { virtual_projects } => {
                    for vp in virtual_projects {
                        if !found.iter().any(|f| f.path == vp.path) {
                            found.push(vp);
                        }
                    }
                }
                VirtualProjectInfo::Unknown => {}
            }
        }
        if found.is_empty() {
            Ok(VirtualProjectInfo::Unknown)
        } else {
            Ok(VirtualProjectInfo::identified(found))
        }
    }

    fn release(&self, project: &dyn Project) {
        for finder in &self.finders {
            finder.release(project);
        }
    }
}

/// Compose finders; see [`FirstOfFinder`].
pub fn first_virtual_project_finder_of(
    finders: Vec<Arc<dyn VirtualProjectFinder>>,
) -> FirstOfFinder {
    FirstOfFinder::new(finders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::MemoryProject;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        info: VirtualProjectInfo,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(info: VirtualProjectInfo) -> Arc<Self> {
            Arc::new(Self {
                info,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl VirtualProjectFinder for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn find(&self, _project: &dyn Project) -> anyhow::Result<VirtualProjectInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.info.clone())
        }
    }

    struct Failing;

    impl VirtualProjectFinder for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn find(&self, _project: &dyn Project) -> anyhow::Result<VirtualProjectInfo> {
            anyhow::bail!("boom")
        }
    }

    fn paths(ps: &[&str]) -> VirtualProjectInfo {
        VirtualProjectInfo::identified(
            ps.iter()
                .map(|p| VirtualProject {
                    path: p.to_string(),
                    reason: "test".into(),
                })
                .collect(),
        )
    }

    #[test]
    fn root_only_short_circuits() {
        let a = Fixed::new(VirtualProjectInfo::RootOnly);
        let b = Fixed::new(paths(&["x"]));
        let finder = FirstOfFinder::new(vec![a.clone(), b.clone()]);
        let info = finder.find(&MemoryProject::new("p")).unwrap();
        assert_eq!(info, VirtualProjectInfo::RootOnly);
        assert_eq!(b.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn root_only_after_paths_still_wins() {
        let finder = FirstOfFinder::new(vec![
            Fixed::new(paths(&["x"])),
            Fixed::new(VirtualProjectInfo::RootOnly),
        ]);
        let info = finder.find(&MemoryProject::new("p")).unwrap();
        assert_eq!(info, VirtualProjectInfo::RootOnly);
    }

    #[test]
    fn identified_paths_accumulate() {
        let finder = first_virtual_project_finder_of(vec![
            Fixed::new(paths(&["a", "b"])),
            Fixed::new(VirtualProjectInfo::Unknown),
            Fixed::new(paths(&["b", "c"])),
        ]);
        let info = finder.find(&MemoryProject::new("p")).unwrap();
        assert_eq!(info, paths(&["a", "b", "c"]));
    }

    #[test]
    fn all_unknown_is_unknown() {
        let finder = FirstOfFinder::new(vec![
            Fixed::new(VirtualProjectInfo::Unknown),
            Arc::new(Failing),
        ]);
        assert_eq!(
            finder.find(&MemoryProject::new("p")).unwrap(),
            VirtualProjectInfo::Unknown
        );
    }

    #[test]
    fn failing_finder_falls_through() {
        let finder = FirstOfFinder::new(vec![Arc::new(Failing), Fixed::new(paths(&["svc"]))]);
        assert_eq!(finder.find(&MemoryProject::new("p")).unwrap(), paths(&["svc"]));
    }
}
