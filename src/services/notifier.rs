use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Lifecycle events handed to the external notification service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    BidSubmitted {
        bid_id: String,
        advertisement_id: String,
        influencer_id: String,
        client_id: String,
    },
    BidShortlisted {
        bid_id: String,
        influencer_id: String,
    },
    BidRejected {
        bid_id: String,
        influencer_id: String,
    },
    BidAccepted {
        bid_id: String,
        influencer_id: String,
        contract_id: String,
    },
    ContractCreated {
        contract_id: String,
        bid_id: String,
        client_id: String,
        influencer_id: String,
        agreed_price: f64,
    },
    ContractCompleted {
        contract_id: String,
        client_id: String,
        influencer_id: String,
    },
    ContractCancelled {
        contract_id: String,
        client_id: String,
        influencer_id: String,
    },
    ContractDisputed {
        contract_id: String,
        raised_by: String,
    },
    AdvertisementClosed {
        advertisement_id: String,
        client_id: String,
    },
    AdvertisementModerated {
        advertisement_id: String,
        client_id: String,
        status: String,
    },
    ReviewSubmitted {
        review_id: String,
        influencer_id: String,
        rating: i32,
    },
}

impl MarketEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MarketEvent::BidSubmitted { .. } => "bid_submitted",
            MarketEvent::BidShortlisted { .. } => "bid_shortlisted",
            MarketEvent::BidRejected { .. } => "bid_rejected",
            MarketEvent::BidAccepted { .. } => "bid_accepted",
            MarketEvent::ContractCreated { .. } => "contract_created",
            MarketEvent::ContractCompleted { .. } => "contract_completed",
            MarketEvent::ContractCancelled { .. } => "contract_cancelled",
            MarketEvent::ContractDisputed { .. } => "contract_disputed",
            MarketEvent::AdvertisementClosed { .. } => "advertisement_closed",
            MarketEvent::AdvertisementModerated { .. } => "advertisement_moderated",
            MarketEvent::ReviewSubmitted { .. } => "review_submitted",
        }
    }
}

/// An event stamped with a delivery id receivers can deduplicate on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub id: Uuid,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub event: MarketEvent,
}

impl EventEnvelope {
    pub fn new(event: MarketEvent) -> Self {
        EventEnvelope {
            id: Uuid::new_v4(),
            occurred_at: chrono::Utc::now(),
            event,
        }
    }
}

/// Receives events after the state change they describe has been committed.
///
/// Implementations must not fail the caller: delivery problems are logged and
/// swallowed.
#[async_trait]
pub trait NotificationHook: Send + Sync {
    async fn publish(&self, envelope: EventEnvelope);
}

/// Writes every event to the application log.
pub struct LogHook;

#[async_trait]
impl NotificationHook for LogHook {
    async fn publish(&self, envelope: EventEnvelope) {
        info!("event {} [{}]: {:?}", envelope.event.kind(), envelope.id, envelope.event);
    }
}

/// POSTs each event as JSON to an external notification service.
pub struct WebhookHook {
    client: Client,
    url: String,
}

impl WebhookHook {
    pub fn new(url: impl Into<String>) -> Self {
        WebhookHook {
            client: Client::new(),
            url: url.into(),
        }
    }

    async fn deliver(client: Client, url: String, envelope: EventEnvelope) {
        let kind = envelope.event.kind();
        match client.post(&url).json(&envelope).send().await {
            Ok(res) if res.status().is_success() => {
                info!("delivered {} [{}] to notification service", kind, envelope.id);
            }
            Ok(res) => {
                warn!("notification service rejected {} [{}]: HTTP {}", kind, envelope.id, res.status());
            }
            Err(e) => {
                error!("failed to deliver {} [{}]: {}", kind, envelope.id, e);
            }
        }
    }
}

#[async_trait]
impl NotificationHook for WebhookHook {
    async fn publish(&self, envelope: EventEnvelope) {
        tokio::spawn(Self::deliver(self.client.clone(), self.url.clone(), envelope));
    }
}

/// Keeps events in memory; handy for tests and local tooling.
#[derive(Default)]
pub struct RecordingHook {
    events: Mutex<Vec<MarketEvent>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<MarketEvent> {
        self.events.lock().await.clone()
    }

    pub async fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().await.iter().map(MarketEvent::kind).collect()
    }
}

#[async_trait]
impl NotificationHook for RecordingHook {
    async fn publish(&self, envelope: EventEnvelope) {
        self.events.lock().await.push(envelope.event);
    }
}
