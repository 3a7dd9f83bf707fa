use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::facebook::FacebookHandler;
use super::generic::GenericHandler;
use super::tiktok::TikTokHandler;
use super::traits::{HandlerError, PlatformHandler};
use super::youtube::YouTubeHandler;
use crate::config::EngineConfig;
use crate::engine::ExtractionEngine;
use crate::urls::Platform;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no handler registered for platform: {0}")]
    NotFound(Platform),

    #[error("handler initialization failed: {0}")]
    Init(#[from] HandlerError),
}

/// Registry mapping platforms to handler instances
///
/// Adding a platform means registering a handler; nothing else in the
/// crate needs to change.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<Platform, Arc<dyn PlatformHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, platform: Platform, handler: Arc<dyn PlatformHandler>) {
        self.handlers.insert(platform, handler);
    }

    /// Strict lookup
    pub fn get(&self, platform: Platform) -> Result<Arc<dyn PlatformHandler>, RegistryError> {
        self.handlers
            .get(&platform)
            .cloned()
            .ok_or(RegistryError::NotFound(platform))
    }

    /// Lookup that falls back to the generic handler
    pub fn resolve(&self, platform: Platform) -> Result<Arc<dyn PlatformHandler>, RegistryError> {
        self.get(platform).or_else(|_| self.get(Platform::Generic))
    }

    pub fn has_handler(&self, platform: Platform) -> bool {
        self.handlers.contains_key(&platform)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.handlers.keys().copied().collect()
    }

    /// Create the registry with the built-in handlers
    pub fn with_defaults(
        engine: Arc<dyn ExtractionEngine>,
        config: &EngineConfig,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        registry.register(
            Platform::YouTube,
            Arc::new(YouTubeHandler::new(engine.clone(), config.cookies_file.clone())),
        );
        registry.register(
            Platform::Facebook,
            Arc::new(FacebookHandler::new(engine.clone(), &config.user_agent)?),
        );
        registry.register(Platform::TikTok, Arc::new(TikTokHandler::new(engine.clone())));
        registry.register(Platform::Generic, Arc::new(GenericHandler::new(engine)));

        Ok(registry)
    }
}
