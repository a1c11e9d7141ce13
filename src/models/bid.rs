use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;
use std::str::FromStr;

use crate::utils::time::to_chrono;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    Pending,
    Shortlisted,
    Accepted,
    Rejected,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Pending => "PENDING",
            BidStatus::Shortlisted => "SHORTLISTED",
            BidStatus::Accepted => "ACCEPTED",
            BidStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BidStatus::Accepted | BidStatus::Rejected)
    }

    /// Statuses a bid may hold immediately before moving to `self`.
    pub fn predecessors(&self) -> &'static [BidStatus] {
        match self {
            BidStatus::Pending => &[],
            BidStatus::Shortlisted => &[BidStatus::Pending],
            BidStatus::Accepted | BidStatus::Rejected => {
                &[BidStatus::Pending, BidStatus::Shortlisted]
            }
        }
    }

    pub fn can_transition_to(&self, next: BidStatus) -> bool {
        next.predecessors().contains(self)
    }
}

impl FromStr for BidStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(BidStatus::Pending),
            "SHORTLISTED" => Ok(BidStatus::Shortlisted),
            "ACCEPTED" => Ok(BidStatus::Accepted),
            "REJECTED" => Ok(BidStatus::Rejected),
            other => Err(format!("Unknown bid status '{}'", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Bid {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub advertisement_id: ObjectId,
    pub influencer_id: ObjectId,
    pub proposed_price: f64,
    pub delivery_days: i32,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Terms an influencer offers when bidding on a campaign.
#[derive(Debug, Clone)]
pub struct BidTerms {
    pub advertisement_id: ObjectId,
    pub proposed_price: f64,
    pub delivery_days: i32,
    pub proposal: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBidDto {
    pub advertisement_id: String,
    pub proposed_price: f64,
    pub proposal: String,
    pub delivery_days: i32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BidResponse {
    pub id: String,
    pub advertisement_id: String,
    pub influencer_id: String,
    pub proposed_price: f64,
    pub delivery_days: i32,
    pub proposal: String,
    pub status: BidStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Bid> for BidResponse {
    fn from(bid: Bid) -> Self {
        BidResponse {
            id: bid.id.to_hex(),
            advertisement_id: bid.advertisement_id.to_hex(),
            influencer_id: bid.influencer_id.to_hex(),
            proposed_price: bid.proposed_price,
            delivery_days: bid.delivery_days,
            proposal: bid.proposal,
            status: bid.status,
            created_at: to_chrono(bid.created_at),
            updated_at: to_chrono(bid.updated_at),
        }
    }
}
