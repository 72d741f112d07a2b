//! Usage: OAuthProviderRegistry - lookup of popup providers by name or provider id.
//!
//! Adding a provider means adding a `OAuthProviderKey` variant and registering its config here.

use super::providers::{OAuthProviderConfig, GITHUB_CONFIG, GOOGLE_CONFIG};
use std::collections::HashMap;
use std::sync::OnceLock;

pub struct OAuthProviderRegistry {
    by_name: HashMap<&'static str, OAuthProviderConfig>,
    by_provider_id: HashMap<&'static str, &'static str>, // provider_id -> name
}

impl OAuthProviderRegistry {
    fn new() -> Self {
        let mut by_name = HashMap::new();
        let mut by_provider_id = HashMap::new();

        for config in [GOOGLE_CONFIG, GITHUB_CONFIG] {
            let name = config.key.as_str();
            by_provider_id.insert(config.provider_id, name);
            by_name.insert(name, config);
        }

        Self {
            by_name,
            by_provider_id,
        }
    }

    /// Look up a provider by short name (e.g., "google"); case-insensitive.
    pub fn get_by_name(&self, name: &str) -> Option<OAuthProviderConfig> {
        let name = name.trim().to_ascii_lowercase();
        self.by_name.get(name.as_str()).copied()
    }

    /// Look up a provider by backend provider id (e.g., "github.com").
    pub fn get_by_provider_id(&self, provider_id: &str) -> Option<OAuthProviderConfig> {
        let name = self.by_provider_id.get(provider_id.trim())?;
        self.get_by_name(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

pub fn global_registry() -> &'static OAuthProviderRegistry {
    static REGISTRY: OnceLock<OAuthProviderRegistry> = OnceLock::new();
    REGISTRY.get_or_init(OAuthProviderRegistry::new)
}
