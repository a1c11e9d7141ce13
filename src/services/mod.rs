pub mod advertisements;
pub mod bids;
pub mod contracts;
pub mod error;
pub mod jwt;
pub mod locks;
pub mod marketplace;
pub mod notifier;
pub mod policy;
pub mod reviews;

#[cfg(test)]
pub(crate) mod fixtures;

pub use advertisements::AdvertisementDraft;
pub use bids::AcceptedBid;
pub use error::{MarketError, MarketResult};
pub use jwt::JwtService;
pub use marketplace::{MarketSettings, Marketplace};
pub use notifier::{EventEnvelope, LogHook, MarketEvent, NotificationHook, RecordingHook, WebhookHook};
pub use reviews::ReviewSubmission;
