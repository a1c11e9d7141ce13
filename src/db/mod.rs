pub mod memory;
pub mod mongo;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::*;

use log::{error, info};
use rocket::fairing::AdHoc;
use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::services::{LogHook, Marketplace, MarketSettings, NotificationHook, WebhookHook};

pub fn init() -> AdHoc {
    AdHoc::try_on_ignite("Marketplace storage", |rocket| async move {
        match connect().await {
            Ok(store) => {
                let market = Marketplace::with_settings(store, notification_hook(), settings());
                Ok(rocket.manage(market))
            }
            Err(e) => {
                error!("✗ Failed to initialise storage: {}", e);
                Err(rocket)
            }
        }
    })
}

async fn connect() -> StoreResult<Arc<dyn Store>> {
    match Config::storage_backend() {
        StorageBackend::MongoDb => {
            let store = MongoStore::connect(&Config::mongodb_uri(), &Config::mongodb_database()).await?;
            info!("✓ MongoDB connected successfully");
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            info!("✓ Using in-memory storage");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn notification_hook() -> Arc<dyn NotificationHook> {
    match Config::notification_webhook_url() {
        Some(url) => {
            info!("✓ Publishing marketplace events to {}", url);
            Arc::new(WebhookHook::new(url))
        }
        None => Arc::new(LogHook),
    }
}

fn settings() -> MarketSettings {
    MarketSettings {
        auto_approve_advertisements: Config::auto_approve_advertisements(),
    }
}
