//! Name-keyed capability registry.
//!
//! Resolution order for `load(name)`:
//! 1. an instance already held under `name` (registered programmatically or loaded earlier),
//! 2. a `<name>.toml` manifest in the plugin directory,
//! 3. the built-in implementation of the same name,
//! 4. nothing: logged, and the caller applies its fallback.
//!
//! At most one instance is held per name for the registry's lifetime.

use super::builtin::builtin;
use super::manifest::PluginManifest;
use super::{
    AnalysisCapability, Capability, CapabilityKind, CitationCapability, SearchCapability,
    VerificationCapability,
};
use crate::config::SleuthConfig;
use crate::error::CapabilityError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 30;

pub struct CapabilityRegistry {
    loaded: RwLock<HashMap<String, Capability>>,
    plugin_dir: Option<PathBuf>,
    network_timeout_secs: u64,
    builtins: bool,
}

impl CapabilityRegistry {
    /// Registry with built-ins only.
    pub fn new() -> Self {
        Self {
            loaded: RwLock::new(HashMap::new()),
            plugin_dir: None,
            network_timeout_secs: DEFAULT_NETWORK_TIMEOUT_SECS,
            builtins: true,
        }
    }

    /// Registry that never falls back to built-ins.
    pub fn without_builtins() -> Self {
        Self {
            builtins: false,
            ..Self::new()
        }
    }

    /// Registry that also resolves manifests under `dir`.
    pub fn with_plugin_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: Some(dir.into()),
            ..Self::new()
        }
    }

    pub fn from_config(config: &SleuthConfig) -> Self {
        Self {
            loaded: RwLock::new(HashMap::new()),
            plugin_dir: config.plugins.directory.clone(),
            network_timeout_secs: config.research.capability_timeout_secs,
            builtins: true,
        }
    }

    pub fn plugin_dir(&self) -> Option<&Path> {
        self.plugin_dir.as_deref()
    }

    /// Register a user-supplied implementation under `name`.
    pub fn register(&self, name: &str, capability: Capability) -> Result<(), CapabilityError> {
        let mut loaded = self.loaded.write().unwrap_or_else(|e| e.into_inner());
        if loaded.contains_key(name) {
            return Err(CapabilityError::AlreadyRegistered {
                name: name.to_string(),
            });
        }
        info!(name = %name, kind = %capability.kind(), "Capability registered");
        loaded.insert(name.to_string(), capability);
        Ok(())
    }

    /// Resolve `name`, or `None` when no implementation exists.
    pub fn load(&self, name: &str) -> Option<Capability> {
        if let Some(capability) = self
            .loaded
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            return Some(capability.clone());
        }

        let resolved = self.load_from_plugin_dir(name).or_else(|| {
            let capability = builtin(name).filter(|_| self.builtins);
            if capability.is_some() {
                debug!(name = %name, "Using built-in capability");
            }
            capability
        });

        let Some(capability) = resolved else {
            warn!(name = %name, "Capability unavailable; continuing without it");
            return None;
        };

        // Another caller may have resolved the same name meanwhile; keep the first.
        let mut loaded = self.loaded.write().unwrap_or_else(|e| e.into_inner());
        Some(loaded.entry(name.to_string()).or_insert(capability).clone())
    }

    fn load_from_plugin_dir(&self, name: &str) -> Option<Capability> {
        let dir = self.plugin_dir.as_ref()?;
        let path = dir.join(format!("{name}.toml"));
        if !path.is_file() {
            return None;
        }
        let result = PluginManifest::load(name, &path)
            .and_then(|m| m.build(name, dir, self.network_timeout_secs));
        match result {
            Ok(capability) => {
                info!(name = %name, path = %path.display(), "Loaded capability from manifest");
                Some(capability)
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Plugin manifest rejected; falling back to built-in");
                None
            }
        }
    }

    /// Resolve `name` and require it to be of `expected` kind.
    pub fn load_kind(
        &self,
        name: &str,
        expected: CapabilityKind,
    ) -> Result<Capability, CapabilityError> {
        let capability = self.load(name).ok_or_else(|| CapabilityError::NotFound {
            name: name.to_string(),
        })?;
        if capability.kind() != expected {
            return Err(CapabilityError::KindMismatch {
                name: name.to_string(),
                expected: expected.to_string(),
                actual: capability.kind().to_string(),
            });
        }
        Ok(capability)
    }

    pub fn search(&self) -> Option<Arc<dyn SearchCapability>> {
        match self.load_expected(CapabilityKind::Search)? {
            Capability::Search(c) => Some(c),
            _ => None,
        }
    }

    pub fn analysis(&self) -> Option<Arc<dyn AnalysisCapability>> {
        match self.load_expected(CapabilityKind::Analysis)? {
            Capability::Analysis(c) => Some(c),
            _ => None,
        }
    }

    pub fn verification(&self) -> Option<Arc<dyn VerificationCapability>> {
        match self.load_expected(CapabilityKind::Verification)? {
            Capability::Verification(c) => Some(c),
            _ => None,
        }
    }

    pub fn citation(&self) -> Option<Arc<dyn CitationCapability>> {
        match self.load_expected(CapabilityKind::Citation)? {
            Capability::Citation(c) => Some(c),
            _ => None,
        }
    }

    fn load_expected(&self, kind: CapabilityKind) -> Option<Capability> {
        match self.load_kind(kind.default_name(), kind) {
            Ok(capability) => Some(capability),
            Err(CapabilityError::NotFound { .. }) => None,
            Err(e) => {
                warn!(error = %e, "Ignoring capability of the wrong kind");
                None
            }
        }
    }

    /// Names currently held, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .loaded
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
