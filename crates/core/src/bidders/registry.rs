//! Bidder registry.

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::types::Bidder;
use crate::adapter::{AdServerAdapter, AdapterError};

/// Lookup from bidder key to bidder metadata.
///
/// Keys are kept sorted so the UI gets a stable selection list.
#[derive(Debug, Clone, Default)]
pub struct BidderRegistry {
    bidders: BTreeMap<String, Bidder>,
}

impl BidderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a list of bidders.
    pub fn from_bidders(bidders: impl IntoIterator<Item = Bidder>) -> Self {
        let mut registry = Self::new();
        for bidder in bidders {
            registry.register(bidder);
        }
        registry
    }

    /// Build the registry from statically configured bidders plus those
    /// reported by the remote server. Remote entries replace configured
    /// entries with the same key.
    pub async fn load(
        configured: &[Bidder],
        adapter: &dyn AdServerAdapter,
    ) -> Result<Self, AdapterError> {
        let mut registry = Self::from_bidders(configured.iter().cloned());
        let remote = adapter.bidders().await?;
        info!("Loaded {} bidders from {}", remote.len(), adapter.name());
        for bidder in remote {
            registry.register(bidder);
        }
        Ok(registry)
    }

    /// Register a bidder, returning the entry it replaced.
    pub fn register(&mut self, bidder: Bidder) -> Option<Bidder> {
        let replaced = self.bidders.insert(bidder.key.clone(), bidder);
        if let Some(ref old) = replaced {
            warn!("Bidder {} registered twice, keeping the latest entry", old.key);
        }
        replaced
    }

    pub fn get(&self, key: &str) -> Option<&Bidder> {
        self.bidders.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.bidders.contains_key(key)
    }

    /// Bidder keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bidders.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bidder> {
        self.bidders.values()
    }

    pub fn len(&self) -> usize {
        self.bidders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bidders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockAdServer};

    #[test]
    fn test_register_and_lookup() {
        let mut registry = BidderRegistry::new();
        assert!(registry.is_empty());

        registry.register(fixtures::bidder("openx", "OpenX"));
        registry.register(fixtures::bidder("medianet", "Media.net"));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("medianet"));
        assert!(!registry.contains("rubicon"));
        assert_eq!(registry.get("openx").unwrap().name, "OpenX");
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["medianet", "openx"]);
    }

    #[test]
    fn test_register_replaces_duplicate() {
        let mut registry = BidderRegistry::new();
        assert!(registry.register(fixtures::bidder("openx", "Old")).is_none());
        let replaced = registry.register(fixtures::bidder("openx", "New"));

        assert_eq!(replaced.unwrap().name, "Old");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("openx").unwrap().name, "New");
    }

    #[tokio::test]
    async fn test_load_merges_configured_and_remote() {
        let server = MockAdServer::new();
        server
            .set_bidders(vec![
                fixtures::bidder("medianet", "Media.net (remote)"),
                fixtures::bidder("rubicon", "Magnite"),
            ])
            .await;

        let configured = vec![
            fixtures::bidder("medianet", "Media.net"),
            fixtures::bidder("openx", "OpenX"),
        ];
        let registry = BidderRegistry::load(&configured, &server).await.unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("medianet").unwrap().name, "Media.net (remote)");
        assert!(registry.contains("openx"));
        assert!(registry.contains("rubicon"));
    }
}
