use std::sync::Arc;

use adprovision_core::{BidderRegistry, Config, ProductStore, SanitizedConfig, SettingsStore};

use crate::wizard::WizardSession;

/// Shared application state
pub struct AppState {
    config: Config,
    product_store: Arc<dyn ProductStore>,
    settings_store: Arc<dyn SettingsStore>,
    registry: Arc<BidderRegistry>,
    /// Absent when no remote ad server is configured.
    wizard: Option<Arc<WizardSession>>,
}

impl AppState {
    pub fn new(
        config: Config,
        product_store: Arc<dyn ProductStore>,
        settings_store: Arc<dyn SettingsStore>,
        registry: Arc<BidderRegistry>,
        wizard: Option<Arc<WizardSession>>,
    ) -> Self {
        Self {
            config,
            product_store,
            settings_store,
            registry,
            wizard,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn product_store(&self) -> &dyn ProductStore {
        self.product_store.as_ref()
    }

    pub fn settings_store(&self) -> &dyn SettingsStore {
        self.settings_store.as_ref()
    }

    pub fn registry(&self) -> &BidderRegistry {
        self.registry.as_ref()
    }

    pub fn wizard(&self) -> Option<&Arc<WizardSession>> {
        self.wizard.as_ref()
    }
}
