use super::{VirtualProjectFinder, VirtualProjectInfo};
use crate::project::Project;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::warn;

/// Remembers the first result per project instance.
///
/// Concurrent callers on the same project block on a single computation and
/// all observe its result. A failed computation is cached as `Unknown`.
/// Entries live until [`VirtualProjectFinder::release`] is called for the
/// project; long-lived embedders must release every project they find.
pub struct CachingFinder {
    name: String,
    inner: Arc<dyn VirtualProjectFinder>,
    cache: Mutex<HashMap<String, Arc<OnceLock<VirtualProjectInfo>>>>,
}

impl CachingFinder {
    pub fn new(inner: Arc<dyn VirtualProjectFinder>) -> Self {
        Self {
            name: format!("cached:{}", inner.name()),
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cell(&self, project_id: &str) -> Arc<OnceLock<VirtualProjectInfo>> {
        match self.cache.lock() {
            Ok(mut cache) => Arc::clone(cache.entry(project_id.to_string()).or_default()),
            // Poisoned: compute without caching.
            Err(_) => Arc::new(OnceLock::new()),
        }
    }
}

impl VirtualProjectFinder for CachingFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, project: &dyn Project) -> anyhow::Result<VirtualProjectInfo> {
        let cell = self.cell(project.id());
        let info = cell.get_or_init(|| match self.inner.find(project) {
            Ok(info) => info,
            Err(e) => {
                warn!(
                    finder = self.inner.name(),
                    project = project.name(),
                    error = %e,
                    "virtual project detection failed"
                );
                VirtualProjectInfo::Unknown
            }
        });
        Ok(info.clone())
    }

    fn release(&self, project: &dyn Project) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(project.id());
        }
        self.inner.release(project);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::VirtualProject;
    use crate::project::MemoryProject;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    impl VirtualProjectFinder for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn find(&self, _project: &dyn Project) -> anyhow::Result<VirtualProjectInfo> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(10));
            Ok(VirtualProjectInfo::identified(vec![VirtualProject {
                path: format!("call{n}"),
                reason: "counting".into(),
            }]))
        }
    }

    #[test]
    fn repeated_calls_reuse_first_result() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let cached = CachingFinder::new(inner.clone());
        let p = MemoryProject::new("p");
        let first = cached.find(&p).unwrap();
        let second = cached.find(&p).unwrap();
        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_projects_computed_separately() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let cached = CachingFinder::new(inner.clone());
        cached.find(&MemoryProject::new("a")).unwrap();
        cached.find(&MemoryProject::new("b")).unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_callers_share_one_computation() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let cached = CachingFinder::new(inner.clone());
        let p = MemoryProject::new("p");
        let results: Vec<VirtualProjectInfo> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| cached.find(&p).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &results[0]));
    }

    #[test]
    fn release_drops_the_entry_and_recomputes() {
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let cached = CachingFinder::new(inner.clone());
        let p = MemoryProject::new("p");
        cached.find(&p).unwrap();
        assert_eq!(cached.cache.lock().unwrap().len(), 1);
        cached.release(&p);
        assert_eq!(cached.cache.lock().unwrap().len(), 0);
        cached.find(&p).unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
