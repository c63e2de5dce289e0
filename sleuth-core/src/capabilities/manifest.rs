//! Plugin manifests.
//!
//! A manifest is `<plugin dir>/<name>.toml`:
//!
//! ```toml
//! kind = "search"
//! provider = "json_file"
//! description = "Curated sources"
//!
//! [options]
//! path = "sources.json"
//! ```

use super::builtin::{
    CrossReferenceVerification, HeuristicAnalysis, HttpJsonSearch, JsonFileSearch,
    TemplateCitation,
};
use super::{Capability, CapabilityKind};
use crate::config::CitationStyle;
use crate::error::CapabilityError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub kind: CapabilityKind,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub options: toml::Table,
}

impl PluginManifest {
    /// Read and parse the manifest at `path`.
    pub fn load(name: &str, path: &Path) -> Result<Self, CapabilityError> {
        let text = std::fs::read_to_string(path).map_err(|e| CapabilityError::Manifest {
            name: name.to_string(),
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::parse(name, &text)
    }

    pub fn parse(name: &str, text: &str) -> Result<Self, CapabilityError> {
        toml::from_str(text).map_err(|e| CapabilityError::Manifest {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Instantiate the capability this manifest describes.
    ///
    /// Relative paths in options resolve against `base_dir` (the manifest's directory).
    /// `default_timeout_secs` applies to network providers without their own `timeout_secs`.
    pub fn build(
        &self,
        name: &str,
        base_dir: &Path,
        default_timeout_secs: u64,
    ) -> Result<Capability, CapabilityError> {
        match (self.kind, self.provider.as_str()) {
            (CapabilityKind::Search, "json_file") => {
                let path = base_dir.join(self.required_str(name, "path")?);
                Ok(Capability::search(JsonFileSearch::new(name, path)))
            }
            (CapabilityKind::Search, "http_json") => {
                let endpoint = self.required_str(name, "endpoint")?;
                let timeout = self
                    .options
                    .get("timeout_secs")
                    .and_then(toml::Value::as_integer)
                    .and_then(|t| u64::try_from(t).ok())
                    .filter(|t| *t > 0)
                    .unwrap_or(default_timeout_secs);
                Ok(Capability::search(HttpJsonSearch::new(name, endpoint, timeout)?))
            }
            (CapabilityKind::Analysis, "heuristic") => {
                Ok(Capability::analysis(HeuristicAnalysis::default()))
            }
            (CapabilityKind::Verification, "cross_reference") => {
                Ok(Capability::verification(CrossReferenceVerification::default()))
            }
            (CapabilityKind::Citation, "template") => match self.options.get("style") {
                None => Ok(Capability::citation(TemplateCitation::default())),
                Some(value) => {
                    let style: CitationStyle =
                        value.clone().try_into().map_err(|e| CapabilityError::Manifest {
                            name: name.to_string(),
                            reason: format!("invalid citation style: {e}"),
                        })?;
                    Ok(Capability::citation(TemplateCitation::with_style(style)))
                }
            },
            (kind, provider) => Err(CapabilityError::Manifest {
                name: name.to_string(),
                reason: format!("unknown {kind} provider '{provider}'"),
            }),
        }
    }

    fn required_str<'a>(&'a self, name: &str, key: &str) -> Result<&'a str, CapabilityError> {
        self.options
            .get(key)
            .and_then(toml::Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CapabilityError::Manifest {
                name: name.to_string(),
                reason: format!("missing string option '{key}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_manifest() {
        let manifest = PluginManifest::parse(
            "search",
            "kind = \"search\"\nprovider = \"json_file\"\n\n[options]\npath = \"sources.json\"\n",
        )
        .unwrap();
        assert_eq!(manifest.kind, CapabilityKind::Search);
        assert_eq!(manifest.provider, "json_file");
        let cap = manifest.build("search", Path::new("/plugins"), 30).unwrap();
        assert_eq!(cap.kind(), CapabilityKind::Search);
    }

    #[test]
    fn test_missing_required_option() {
        let manifest =
            PluginManifest::parse("web", "kind = \"search\"\nprovider = \"http_json\"\n").unwrap();
        let err = manifest.build("web", Path::new("."), 30).unwrap_err();
        assert!(matches!(err, CapabilityError::Manifest { reason, .. } if reason.contains("endpoint")));
    }

    #[test]
    fn test_unknown_provider() {
        let manifest =
            PluginManifest::parse("analysis", "kind = \"analysis\"\nprovider = \"gpt\"\n").unwrap();
        assert!(manifest.build("analysis", Path::new("."), 30).is_err());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(PluginManifest::parse("x", "kind = \"telepathy\"\nprovider = \"p\"\n").is_err());
    }

    #[test]
    fn test_citation_style_option() {
        let manifest = PluginManifest::parse(
            "citation",
            "kind = \"citation\"\nprovider = \"template\"\n[options]\nstyle = \"mla\"\n",
        )
        .unwrap();
        assert!(manifest.build("citation", Path::new("."), 30).is_ok());

        let bad = PluginManifest::parse(
            "citation",
            "kind = \"citation\"\nprovider = \"template\"\n[options]\nstyle = \"harvard\"\n",
        )
        .unwrap();
        assert!(bad.build("citation", Path::new("."), 30).is_err());
    }
}
