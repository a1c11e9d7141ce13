use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use crate::db::Store;
use crate::models::{Advertisement, Bid, Contract};
use crate::services::locks::AdvertisementLocks;
use crate::services::notifier::{EventEnvelope, MarketEvent, NotificationHook};
use crate::services::{MarketError, MarketResult};

#[derive(Debug, Clone, Copy)]
pub struct MarketSettings {
    /// New advertisements open for bidding immediately instead of waiting
    /// for moderation.
    pub auto_approve_advertisements: bool,
}

impl Default for MarketSettings {
    fn default() -> Self {
        MarketSettings {
            auto_approve_advertisements: true,
        }
    }
}

/// Bid & contract lifecycle engine.
///
/// Operations live in `advertisements`, `bids`, `contracts` and `reviews`;
/// this type only wires storage, locking and event delivery together. It is
/// shared by every request task, so all state sits behind the store.
pub struct Marketplace {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) locks: AdvertisementLocks,
    pub(crate) settings: MarketSettings,
    hooks: Arc<dyn NotificationHook>,
}

impl Marketplace {
    pub fn new(store: Arc<dyn Store>, hooks: Arc<dyn NotificationHook>) -> Self {
        Self::with_settings(store, hooks, MarketSettings::default())
    }

    pub fn with_settings(
        store: Arc<dyn Store>,
        hooks: Arc<dyn NotificationHook>,
        settings: MarketSettings,
    ) -> Self {
        Marketplace {
            store,
            locks: AdvertisementLocks::new(),
            settings,
            hooks,
        }
    }

    pub(crate) async fn publish(&self, event: MarketEvent) {
        self.hooks.publish(EventEnvelope::new(event)).await;
    }

    pub(crate) async fn load_advertisement(&self, id: &ObjectId) -> MarketResult<Advertisement> {
        self.store
            .find_advertisement(id)
            .await?
            .ok_or(MarketError::NotFound("Advertisement"))
    }

    pub(crate) async fn load_bid(&self, id: &ObjectId) -> MarketResult<Bid> {
        self.store
            .find_bid(id)
            .await?
            .ok_or(MarketError::NotFound("Bid"))
    }

    pub(crate) async fn load_contract(&self, id: &ObjectId) -> MarketResult<Contract> {
        self.store
            .find_contract(id)
            .await?
            .ok_or(MarketError::NotFound("Contract"))
    }
}
