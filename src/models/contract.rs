use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use std::str::FromStr;

use crate::utils::time::to_chrono;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Active,
    Completed,
    Cancelled,
    Disputed,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "ACTIVE",
            ContractStatus::Completed => "COMPLETED",
            ContractStatus::Cancelled => "CANCELLED",
            ContractStatus::Disputed => "DISPUTED",
        }
    }

    /// Every outgoing transition starts from ACTIVE.
    pub fn can_transition_to(&self, next: ContractStatus) -> bool {
        *self == ContractStatus::Active && next != ContractStatus::Active
    }
}

impl FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(ContractStatus::Active),
            "COMPLETED" => Ok(ContractStatus::Completed),
            "CANCELLED" => Ok(ContractStatus::Cancelled),
            "DISPUTED" => Ok(ContractStatus::Disputed),
            other => Err(format!("Unknown contract status '{}'", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Contract {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub bid_id: ObjectId,
    pub client_id: ObjectId,
    pub influencer_id: ObjectId,
    pub advertisement_id: ObjectId,
    pub agreed_price: f64,
    pub delivery_deadline: DateTime,
    pub status: ContractStatus,
    pub completed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractResponse {
    pub id: String,
    pub bid_id: String,
    pub client_id: String,
    pub influencer_id: String,
    pub advertisement_id: String,
    pub agreed_price: f64,
    pub delivery_deadline: chrono::DateTime<chrono::Utc>,
    pub status: ContractStatus,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Contract> for ContractResponse {
    fn from(contract: Contract) -> Self {
        ContractResponse {
            id: contract.id.to_hex(),
            bid_id: contract.bid_id.to_hex(),
            client_id: contract.client_id.to_hex(),
            influencer_id: contract.influencer_id.to_hex(),
            advertisement_id: contract.advertisement_id.to_hex(),
            agreed_price: contract.agreed_price,
            delivery_deadline: to_chrono(contract.delivery_deadline),
            status: contract.status,
            completed_at: contract.completed_at.map(to_chrono),
            created_at: to_chrono(contract.created_at),
            updated_at: to_chrono(contract.updated_at),
        }
    }
}
