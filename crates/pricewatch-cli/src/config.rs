//! Run configuration: where to work and which suppliers to watch.
//!
//! ```json
//! {
//!   "workdir": "run_out",
//!   "delete_unchanged_source": false,
//!   "archive_originals": true,
//!   "suppliers": [
//!     { "id": "Tevelam", "source": { "kind": "http", "url": "https://..." } },
//!     { "id": "IMSA", "source": { "kind": "recent_file", "patterns": ["lista", "imsa"] } },
//!     { "id": "Acme", "source": { "kind": "http", "url": "https://..." },
//!       "supplier": { "id": "Acme", "stock_policy": { "kind": "all" } } }
//!   ]
//! }
//! ```
//!
//! Entries without a `supplier` block use the built-in extraction settings
//! for that id.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use pricewatch_core::SupplierConfig;
use pricewatch_sync::SourceSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    #[serde(default)]
    pub delete_unchanged_source: bool,
    #[serde(default = "enabled")]
    pub archive_originals: bool,
    #[serde(default = "default_entries")]
    pub suppliers: Vec<SupplierEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<SupplierConfig>,
}

/// A supplier ready to run: extraction settings plus where its file comes from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSupplier {
    pub config: SupplierConfig,
    pub source: Option<SourceSpec>,
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

fn enabled() -> bool {
    true
}

/// Built-in suppliers. Download URLs are deployment-specific, so the defaults
/// look for files saved into the working directory.
fn default_entries() -> Vec<SupplierEntry> {
    SupplierConfig::defaults()
        .into_iter()
        .map(|s| {
            // IMSA's file arrives through a browser download that may still
            // be running when the cycle starts.
            let source = if s.id == "IMSA" {
                SourceSpec::RecentFile {
                    patterns: vec!["lista".into(), "imsa".into()],
                    max_age_secs: 180,
                    wait_secs: 60,
                    poll_secs: 2,
                }
            } else {
                SourceSpec::RecentFile {
                    patterns: vec![s.id.to_lowercase()],
                    max_age_secs: 24 * 60 * 60,
                    wait_secs: 0,
                    poll_secs: 2,
                }
            };
            SupplierEntry {
                id: s.id,
                source: Some(source),
                supplier: None,
            }
        })
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            delete_unchanged_source: false,
            archive_originals: true,
            suppliers: default_entries(),
        }
    }
}

impl AppConfig {
    /// Load `path`, or the built-in configuration when `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", p.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Supplier ids must be unique: each id owns its state files.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.suppliers {
            if entry.id.trim().is_empty() {
                bail!("supplier with empty id");
            }
            if !seen.insert(entry.id.as_str()) {
                bail!("duplicate supplier id '{}'", entry.id);
            }
            if let Some(cfg) = &entry.supplier {
                if cfg.id != entry.id {
                    bail!(
                        "supplier block id '{}' does not match entry id '{}'",
                        cfg.id,
                        entry.id
                    );
                }
            }
        }
        Ok(())
    }

    /// Resolve every entry against the built-in defaults, keeping file order.
    ///
    /// `only` restricts the result to the named ids; naming an unknown id is
    /// an error.
    pub fn resolve(&self, only: &[String]) -> anyhow::Result<Vec<ResolvedSupplier>> {
        for id in only {
            if !self.suppliers.iter().any(|e| &e.id == id) {
                bail!("unknown supplier '{id}'");
            }
        }

        let builtin = SupplierConfig::defaults();
        self.suppliers
            .iter()
            .filter(|e| only.is_empty() || only.contains(&e.id))
            .map(|e| -> anyhow::Result<ResolvedSupplier> {
                let config = match &e.supplier {
                    Some(cfg) => cfg.clone(),
                    None => builtin
                        .iter()
                        .find(|b| b.id == e.id)
                        .cloned()
                        .with_context(|| format!("no built-in settings for supplier '{}'", e.id))?,
                };
                Ok(ResolvedSupplier {
                    config,
                    source: e.source.clone(),
                })
            })
            .collect()
    }

    /// Find one supplier's extraction settings.
    pub fn supplier(&self, id: &str) -> anyhow::Result<SupplierConfig> {
        let mut resolved = self.resolve(&[id.to_string()])?;
        resolved
            .pop()
            .map(|r| r.config)
            .with_context(|| format!("unknown supplier '{id}'"))
    }
}
