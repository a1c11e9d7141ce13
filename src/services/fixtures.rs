//! Shared setup for engine tests: an in-memory marketplace with a recording hook.

use mongodb::bson::{oid::ObjectId, DateTime};
use std::sync::Arc;

use crate::db::MemoryStore;
use crate::models::{Actor, Advertisement, Bid, BidTerms, Contract};
use crate::services::advertisements::AdvertisementDraft;
use crate::services::{MarketSettings, Marketplace, RecordingHook};
use crate::utils::time::add_days;

pub struct Harness {
    pub market: Marketplace,
    pub hook: Arc<RecordingHook>,
    pub client: Actor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(MarketSettings::default())
    }

    pub fn with_settings(settings: MarketSettings) -> Self {
        let hook = Arc::new(RecordingHook::new());
        let market = Marketplace::with_settings(Arc::new(MemoryStore::new()), hook.clone(), settings);
        Harness {
            market,
            hook,
            client: Actor::client(ObjectId::new()),
        }
    }

    /// An OPEN campaign owned by `self.client`, $100-$500, closing in 10 days.
    pub async fn open_ad(&self) -> Advertisement {
        let draft = AdvertisementDraft {
            title: "Summer launch".into(),
            description: Some("Three stories and a reel".into()),
            budget_min: 100.0,
            budget_max: 500.0,
            deadline: add_days(DateTime::now(), 10),
        };
        self.market
            .create_advertisement(&self.client, draft)
            .await
            .expect("open advertisement")
    }

    pub fn terms(&self, ad: &Advertisement, price: f64, days: i32) -> BidTerms {
        BidTerms {
            advertisement_id: ad.id,
            proposed_price: price,
            delivery_days: days,
            proposal: "Short-form video series".into(),
        }
    }

    /// A PENDING bid from a fresh influencer.
    pub async fn bid(&self, ad: &Advertisement, price: f64, days: i32) -> (Actor, Bid) {
        let influencer = Actor::influencer(ObjectId::new());
        let bid = self
            .market
            .submit_bid(&influencer, self.terms(ad, price, days))
            .await
            .expect("submit bid");
        (influencer, bid)
    }

    /// An ACTIVE contract formed by accepting a single bid.
    pub async fn contract(&self) -> Contract {
        let ad = self.open_ad().await;
        let (_, bid) = self.bid(&ad, 200.0, 5).await;
        self.market
            .accept_bid(&self.client, &bid.id)
            .await
            .expect("accept bid")
            .contract
    }
}
