//! Site configuration for the librarian answering engine.
//!
//! A site bundles everything one tenant needs to answer questions: the
//! condense and answer templates, template variables, and the list of
//! corpus libraries to retrieve from. Configurations are loaded from a
//! YAML file once, validated eagerly, and treated as read-only for the
//! lifetime of every session that uses them.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{AppError, AppResult};

/// One library entry in a site's retrieval configuration.
///
/// Entries are either a bare library name or a name with a relevance
/// weight. A single configuration must use one form throughout; mixing
/// the two is rejected by [`SiteConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibrarySpec {
    /// Bare library name, e.g. `- guides`
    Bare(String),

    /// Weighted entry, e.g. `- {name: guides, weight: 2.0}`
    Weighted { name: String, weight: f64 },
}

impl LibrarySpec {
    /// The library name regardless of form.
    pub fn name(&self) -> &str {
        match self {
            Self::Bare(name) => name,
            Self::Weighted { name, .. } => name,
        }
    }

    /// The explicit weight, if this entry carries one.
    pub fn weight(&self) -> Option<f64> {
        match self {
            Self::Bare(_) => None,
            Self::Weighted { weight, .. } => Some(*weight),
        }
    }
}

fn default_source_count() -> usize {
    4
}

/// Per-site configuration, loaded once and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Stable site identifier (used in logs, never shown to end users)
    #[serde(rename = "siteId")]
    pub site_id: String,

    /// Template used to rewrite a follow-up question into a standalone one
    #[serde(rename = "condenseTemplate")]
    pub condense_template: String,

    /// Template used to produce the final answer from the merged context
    #[serde(rename = "answerTemplate")]
    pub answer_template: String,

    /// Site-defined template variables (e.g. assistant_name, site_name)
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Corpus libraries to retrieve from, in declaration order
    pub libraries: Vec<LibrarySpec>,

    /// Default number of passages to retrieve per question
    #[serde(rename = "sourceCount", default = "default_source_count")]
    pub source_count: usize,
}

impl SiteConfig {
    /// Load and validate a site configuration from a YAML file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read site file {:?}: {}", path, e))
        })?;

        let site = Self::from_yaml(&contents)
            .map_err(|e| AppError::Config(format!("Invalid site file {:?}: {}", path, e)))?;

        tracing::info!("Loaded site configuration: {}", site.site_id);
        Ok(site)
    }

    /// Parse and validate a site configuration from YAML text.
    pub fn from_yaml(contents: &str) -> AppResult<Self> {
        let site: SiteConfig = serde_yaml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse site YAML: {}", e)))?;
        site.validate()?;
        Ok(site)
    }

    /// Validate structural invariants.
    ///
    /// Rejected here, before any request is served:
    /// - empty library lists
    /// - configurations mixing bare and weighted entries
    /// - zero, negative or non-finite weights
    /// - duplicate library names
    /// - empty templates or a zero source count
    pub fn validate(&self) -> AppResult<()> {
        if self.site_id.is_empty() {
            return Err(AppError::Config("Site id cannot be empty".to_string()));
        }

        if self.condense_template.trim().is_empty() {
            return Err(AppError::Config(format!(
                "Site '{}': condense template cannot be empty",
                self.site_id
            )));
        }

        if self.answer_template.trim().is_empty() {
            return Err(AppError::Config(format!(
                "Site '{}': answer template cannot be empty",
                self.site_id
            )));
        }

        if self.source_count == 0 {
            return Err(AppError::Config(format!(
                "Site '{}': sourceCount must be at least 1",
                self.site_id
            )));
        }

        if self.libraries.is_empty() {
            return Err(AppError::Config(format!(
                "Site '{}': at least one library is required",
                self.site_id
            )));
        }

        let weighted = self.libraries.iter().filter(|l| l.weight().is_some()).count();
        if weighted != 0 && weighted != self.libraries.len() {
            return Err(AppError::Config(format!(
                "Site '{}': libraries must be all bare or all weighted, not a mix",
                self.site_id
            )));
        }

        for lib in &self.libraries {
            if lib.name().is_empty() {
                return Err(AppError::Config(format!(
                    "Site '{}': library names cannot be empty",
                    self.site_id
                )));
            }
            if let Some(weight) = lib.weight() {
                if !weight.is_finite() || weight <= 0.0 {
                    return Err(AppError::Config(format!(
                        "Site '{}': library '{}' has invalid weight {}",
                        self.site_id,
                        lib.name(),
                        weight
                    )));
                }
            }
        }

        let mut seen = HashSet::new();
        for lib in &self.libraries {
            if !seen.insert(lib.name()) {
                return Err(AppError::Config(format!(
                    "Site '{}': duplicate library '{}'",
                    self.site_id,
                    lib.name()
                )));
            }
        }

        Ok(())
    }

    /// Whether this site uses weighted retrieval.
    pub fn is_weighted(&self) -> bool {
        self.libraries.iter().any(|l| l.weight().is_some())
    }

    /// All library names in declaration order.
    pub fn library_names(&self) -> Vec<String> {
        self.libraries.iter().map(|l| l.name().to_string()).collect()
    }
}
