use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::utils::time::to_chrono;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvertisementStatus {
    Open,
    Closed,
    PendingApproval,
    Rejected,
}

impl AdvertisementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvertisementStatus::Open => "OPEN",
            AdvertisementStatus::Closed => "CLOSED",
            AdvertisementStatus::PendingApproval => "PENDING_APPROVAL",
            AdvertisementStatus::Rejected => "REJECTED",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Advertisement {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub client_id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub deadline: DateTime,
    pub status: AdvertisementStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Advertisement {
    /// Bids are only taken while the campaign is open and before its deadline.
    pub fn accepts_bids_at(&self, now: DateTime) -> bool {
        self.status == AdvertisementStatus::Open && now < self.deadline
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdvertisementDto {
    pub title: String,
    pub description: Option<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub deadline: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementResponse {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub description: Option<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub deadline: chrono::DateTime<chrono::Utc>,
    pub status: AdvertisementStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Advertisement> for AdvertisementResponse {
    fn from(ad: Advertisement) -> Self {
        AdvertisementResponse {
            id: ad.id.to_hex(),
            client_id: ad.client_id.to_hex(),
            title: ad.title,
            description: ad.description,
            budget_min: ad.budget_min,
            budget_max: ad.budget_max,
            deadline: to_chrono(ad.deadline),
            status: ad.status,
            created_at: to_chrono(ad.created_at),
            updated_at: to_chrono(ad.updated_at),
        }
    }
}
