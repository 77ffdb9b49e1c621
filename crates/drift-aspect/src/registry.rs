use crate::aspect::Aspect;
use drift_core::{DriftError, Fingerprint};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered set of aspects, built once at startup and passed explicitly to
/// the computer and the vote pipeline.
#[derive(Default, Clone)]
pub struct AspectRegistry {
    aspects: Vec<Arc<dyn Aspect>>,
    by_name: HashMap<String, usize>,
}

impl std::fmt::Debug for AspectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectRegistry")
            .field("aspects", &self.names())
            .finish()
    }
}

impl AspectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_aspects(aspects: Vec<Arc<dyn Aspect>>) -> Result<Self, DriftError> {
        let mut registry = Self::new();
        for aspect in aspects {
            registry.register(aspect)?;
        }
        Ok(registry)
    }

    /// Add an aspect. Names must be unique.
    pub fn register(&mut self, aspect: Arc<dyn Aspect>) -> Result<(), DriftError> {
        let name = aspect.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(DriftError::DuplicateAspect(name));
        }
        self.by_name.insert(name, self.aspects.len());
        self.aspects.push(aspect);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Aspect>> {
        self.by_name.get(name).map(|&i| &self.aspects[i])
    }

    /// The aspect owning `fp`: exact name match on the type first, then the
    /// first aspect whose `owns` accepts it.
    pub fn find_owner(&self, fp: &Fingerprint) -> Option<&Arc<dyn Aspect>> {
        fp.fp_type
            .as_deref()
            .and_then(|t| self.get(t))
            .or_else(|| self.aspects.iter().find(|a| a.owns(fp)))
    }

    /// Aspects in registration order.
    pub fn all(&self) -> &[Arc<dyn Aspect>] {
        &self.aspects
    }

    pub fn names(&self) -> Vec<&str> {
        self.aspects.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::SimpleAspect;
    use serde_json::json;

    fn aspect(name: &str) -> Arc<dyn Aspect> {
        Arc::new(SimpleAspect::new(name, |_, _| Ok(Vec::new())))
    }

    #[test]
    fn keeps_registration_order() {
        let r = AspectRegistry::from_aspects(vec![aspect("b"), aspect("a"), aspect("c")]).unwrap();
        assert_eq!(r.names(), vec!["b", "a", "c"]);
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = AspectRegistry::from_aspects(vec![aspect("a"), aspect("a")]).unwrap_err();
        assert!(matches!(err, DriftError::DuplicateAspect(n) if n == "a"));
    }

    #[test]
    fn finds_owner_by_type() {
        let r = AspectRegistry::from_aspects(vec![aspect("npm"), aspect("docker")]).unwrap();
        let fp = Fingerprint::new("docker", "node", json!("18"));
        assert_eq!(r.find_owner(&fp).unwrap().name(), "docker");
        let orphan = Fingerprint::new("maven", "x", json!(1));
        assert!(r.find_owner(&orphan).is_none());
    }
}
