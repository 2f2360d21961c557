//! Per-site settings snapshot.
//!
//! Settings are owned by the host extension; the engine only reads a snapshot
//! of them. The JSON layout mirrors what the options page stores:
//!
//! ```json
//! {
//!   "provider_settings": { "leetcode": { "enabled": true, "subdirectory": "lc" } },
//!   "github_leetsync_subdirectory": "legacy-dir",
//!   "overwrite_existing": true
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub subdirectory: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self { enabled: true, subdirectory: String::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    #[serde(default, rename = "provider_settings")]
    pub sites: BTreeMap<String, SiteSettings>,
    /// Pre-multi-site subdirectory; only ever applied to LeetCode.
    #[serde(
        default,
        rename = "github_leetsync_subdirectory",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_subdirectory: Option<String>,
    /// Replace files that already exist in the repository.
    #[serde(default = "default_true")]
    pub overwrite_existing: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            sites: BTreeMap::new(),
            legacy_subdirectory: None,
            overwrite_existing: true,
        }
    }
}

/// Site whose legacy subdirectory setting still applies.
const LEGACY_SITE: &str = "leetcode";

impl SettingsSnapshot {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn site(&self, site: &str) -> Option<&SiteSettings> {
        self.sites.get(site)
    }

    /// Sites without an entry are enabled.
    pub fn is_enabled(&self, site: &str) -> bool {
        self.site(site).map_or(true, |s| s.enabled)
    }

    /// Upload directory for a site: its own setting, then the legacy
    /// setting (LeetCode only), then the site name.
    pub fn subdirectory_for(&self, site: &str) -> String {
        if let Some(dir) = self.site(site).map(|s| s.subdirectory.trim()).filter(|d| !d.is_empty()) {
            return dir.to_string();
        }
        if site == LEGACY_SITE {
            if let Some(dir) = self.legacy_subdirectory.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
                return dir.to_string();
            }
        }
        site.to_string()
    }
}
