//! Provider name to adapter mapping.
//!
//! Not synchronized on its own; the server keeps it behind the same lock as
//! the rest of its shared state.

use std::collections::HashMap;
use std::sync::Arc;

use super::{BitbucketAdapter, GithubAdapter, GitlabAdapter, ProviderAdapter};

pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Registry with `github`, `gitlab` and `bitbucket` pre-registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("github", Arc::new(GithubAdapter));
        registry.register("gitlab", Arc::new(GitlabAdapter));
        registry.register("bitbucket", Arc::new(BitbucketAdapter));
        registry
    }

    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register an adapter. An existing adapter under the same name is replaced.
    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
