//! Platform → adapter lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use livewatch_core::config::PlatformsConfig;
use livewatch_core::result::AppResult;
use livewatch_core::traits::PlatformAdapter;
use livewatch_core::types::Platform;

use crate::twitch::TwitchAdapter;
use crate::youtube::YouTubeAdapter;

/// The set of adapters the scheduler may call, at most one per platform.
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every adapter enabled in configuration.
    pub fn from_config(config: &PlatformsConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout_seconds);
        let mut registry = Self::new();

        if config.twitch.enabled {
            registry.register(Arc::new(TwitchAdapter::new(&config.twitch, timeout)?));
        }
        if config.youtube.enabled {
            registry.register(Arc::new(YouTubeAdapter::new(&config.youtube, timeout)?));
        }

        info!(
            platforms = ?registry.platforms(),
            "Platform adapters registered"
        );
        Ok(registry)
    }

    /// Register an adapter, replacing any previous one for its platform.
    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    /// Adapter for `platform`.
    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    /// Registered platforms, sorted.
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.adapters.keys().copied().collect();
        platforms.sort();
        platforms
    }

    /// Whether no adapter is registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_platforms_are_skipped() {
        let registry = AdapterRegistry::from_config(&PlatformsConfig::default()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_enabled_platform_is_registered() {
        let mut config = PlatformsConfig::default();
        config.youtube.enabled = true;
        config.youtube.api_key = "key".into();

        let registry = AdapterRegistry::from_config(&config).unwrap();
        assert_eq!(registry.platforms(), vec![Platform::YouTube]);
        assert!(registry.get(Platform::Twitch).is_none());
    }

    #[test]
    fn test_enabled_platform_without_credentials_fails() {
        let mut config = PlatformsConfig::default();
        config.twitch.enabled = true;
        assert!(AdapterRegistry::from_config(&config).is_err());
    }
}
