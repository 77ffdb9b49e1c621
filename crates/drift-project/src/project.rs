use anyhow::Context;
use drift_core::DriftError;
use globset::{GlobBuilder, GlobMatcher};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Directories never descended into when enumerating files.
const SKIP_DIRS: &[&str] = &[".git", ".drift"];

/// A source tree that extractors read from and appliers write to.
///
/// All paths are relative to the project root and use `/` separators.
pub trait Project: Send + Sync {
    /// Identity of this instance. Two views of the same directory have
    /// different ids; per-run caches key on it.
    fn id(&self) -> &str;

    /// Human label (root directory or logical name).
    fn name(&self) -> &str;

    /// File content, or `None` when the file does not exist.
    fn get_file(&self, path: &str) -> anyhow::Result<Option<String>>;

    /// Create or overwrite a file, creating parent directories as needed.
    fn add_file(&self, path: &str, content: &str) -> anyhow::Result<()>;

    /// Sorted relative paths of all files matching `glob`. `*` does not
    /// cross `/`; use `**/` to match at any depth (including the root).
    fn files_matching(&self, glob: &str) -> anyhow::Result<Vec<String>>;

    /// A view rooted at `path` that behaves as an independent project.
    fn sub_project(&self, path: &str) -> anyhow::Result<Arc<dyn Project>>;

    fn has_file(&self, path: &str) -> anyhow::Result<bool> {
        Ok(self.get_file(path)?.is_some())
    }
}

// ── Path helpers ──

/// Normalize a project-relative path, rejecting absolute paths and `..`.
pub fn clean_relative(path: &str) -> Result<String, DriftError> {
    let unified = path.replace('\\', "/");
    let mut parts = Vec::new();
    for comp in Path::new(&unified).components() {
        match comp {
            Component::Normal(s) => parts.push(s.to_string_lossy().to_string()),
            Component::CurDir => {}
            _ => return Err(DriftError::PathOutsideProject(path.to_string())),
        }
    }
    Ok(parts.join("/"))
}

/// Compile a glob where `*` stops at `/`.
pub fn glob_matcher(glob: &str) -> anyhow::Result<GlobMatcher> {
    let compiled = GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob: {glob}"))?;
    Ok(compiled.compile_matcher())
}

fn is_skipped(rel: &str) -> bool {
    rel.split('/').any(|seg| SKIP_DIRS.contains(&seg))
}

fn new_instance_id() -> String {
    format!("prj_{}", ulid::Ulid::new())
}

// ── Filesystem project ──

/// Project backed by a directory on disk.
#[derive(Debug)]
pub struct LocalProject {
    id: String,
    name: String,
    root: PathBuf,
}

impl LocalProject {
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("project root is not a directory: {}", root.display());
        }
        Ok(Self {
            id: new_instance_id(),
            name: root.display().to_string(),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self, dir: &Path, rel: &str, out: &mut Vec<String>) -> anyhow::Result<()> {
        let entries =
            fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let child_rel = if rel.is_empty() {
                file_name.clone()
            } else {
                format!("{rel}/{file_name}")
            };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if SKIP_DIRS.contains(&file_name.as_str()) {
                    continue;
                }
                self.walk(&entry.path(), &child_rel, out)?;
            } else if file_type.is_file() {
                out.push(child_rel);
            }
        }
        Ok(())
    }
}

impl Project for LocalProject {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_file(&self, path: &str) -> anyhow::Result<Option<String>> {
        let full = self.root.join(clean_relative(path)?);
        if !full.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&full)
            .with_context(|| format!("failed to read {}", full.display()))?;
        Ok(Some(content))
    }

    fn add_file(&self, path: &str, content: &str) -> anyhow::Result<()> {
        let rel = clean_relative(path)?;
        if rel.is_empty() {
            anyhow::bail!("cannot write to project root");
        }
        let full = self.root.join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content).with_context(|| format!("failed to write {}", full.display()))
    }

    fn files_matching(&self, glob: &str) -> anyhow::Result<Vec<String>> {
        let matcher = glob_matcher(glob)?;
        let mut all = Vec::new();
        self.walk(&self.root, "", &mut all)?;
        let mut matched: Vec<String> = all.into_iter().filter(|p| matcher.is_match(p)).collect();
        matched.sort();
        Ok(matched)
    }

    fn sub_project(&self, path: &str) -> anyhow::Result<Arc<dyn Project>> {
        let rel = clean_relative(path)?;
        let root = if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        };
        Ok(Arc::new(LocalProject::open(root)?))
    }
}

// ── In-memory project ──

/// Project held entirely in memory. Sub-project views share storage with
/// their parent, so writes through a view are visible from the parent.
#[derive(Debug, Clone)]
pub struct MemoryProject {
    id: String,
    name: String,
    files: Arc<RwLock<BTreeMap<String, String>>>,
    prefix: String,
}

impl MemoryProject {
    pub fn new(name: &str) -> Self {
        Self {
            id: new_instance_id(),
            name: name.to_string(),
            files: Arc::new(RwLock::new(BTreeMap::new())),
            prefix: String::new(),
        }
    }

    /// Build from `(path, content)` pairs. Invalid paths are skipped.
    pub fn with_files<I, P, C>(name: &str, files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<String>,
    {
        let project = Self::new(name);
        if let Ok(mut map) = project.files.write() {
            for (path, content) in files {
                if let Ok(rel) = clean_relative(path.as_ref()) {
                    map.insert(rel, content.into());
                }
            }
        }
        project
    }

    fn full(&self, rel: &str) -> String {
        if self.prefix.is_empty() {
            rel.to_string()
        } else if rel.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}/{}", self.prefix, rel)
        }
    }

    fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(key);
        }
        key.strip_prefix(self.prefix.as_str())?.strip_prefix('/')
    }
}

impl Project for MemoryProject {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_file(&self, path: &str) -> anyhow::Result<Option<String>> {
        let key = self.full(&clean_relative(path)?);
        let map = self
            .files
            .read()
            .map_err(|_| anyhow::anyhow!("project file map poisoned"))?;
        Ok(map.get(&key).cloned())
    }

    fn add_file(&self, path: &str, content: &str) -> anyhow::Result<()> {
        let rel = clean_relative(path)?;
        if rel.is_empty() {
            anyhow::bail!("cannot write to project root");
        }
        let key = self.full(&rel);
        let mut map = self
            .files
            .write()
            .map_err(|_| anyhow::anyhow!("project file map poisoned"))?;
        map.insert(key, content.to_string());
        Ok(())
    }

    fn files_matching(&self, glob: &str) -> anyhow::Result<Vec<String>> {
        let matcher = glob_matcher(glob)?;
        let map = self
            .files
            .read()
            .map_err(|_| anyhow::anyhow!("project file map poisoned"))?;
        // BTreeMap iteration is already sorted.
        Ok(map
            .keys()
            .filter_map(|k| self.strip(k))
            .filter(|rel| !is_skipped(rel) && matcher.is_match(rel))
            .map(str::to_string)
            .collect())
    }

    fn sub_project(&self, path: &str) -> anyhow::Result<Arc<dyn Project>> {
        let rel = clean_relative(path)?;
        let name = if rel.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.name, rel)
        };
        Ok(Arc::new(MemoryProject {
            id: new_instance_id(),
            name,
            files: Arc::clone(&self.files),
            prefix: self.full(&rel),
        }))
    }
}
