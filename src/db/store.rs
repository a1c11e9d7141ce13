use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use thiserror::Error;

use crate::models::{
    Advertisement, AdvertisementStatus, Bid, BidStatus, Contract, ContractStatus,
    InfluencerRating, Review,
};
use crate::utils::PageRequest;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional write found the record in an unexpected state.
    #[error("{0}")]
    Conflict(String),

    /// A unique constraint rejected the write; carries the entity name.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Clone, Default)]
pub struct BidQuery {
    pub advertisement_id: Option<ObjectId>,
    pub influencer_id: Option<ObjectId>,
    pub status: Option<BidStatus>,
}

impl BidQuery {
    pub fn matches(&self, bid: &Bid) -> bool {
        self.advertisement_id.is_none_or(|id| bid.advertisement_id == id)
            && self.influencer_id.is_none_or(|id| bid.influencer_id == id)
            && self.status.is_none_or(|status| bid.status == status)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractQuery {
    pub client_id: Option<ObjectId>,
    pub influencer_id: Option<ObjectId>,
    pub status: Option<ContractStatus>,
}

impl ContractQuery {
    pub fn matches(&self, contract: &Contract) -> bool {
        self.client_id.is_none_or(|id| contract.client_id == id)
            && self.influencer_id.is_none_or(|id| contract.influencer_id == id)
            && self.status.is_none_or(|status| contract.status == status)
    }
}

/// Everything the accept cascade writes, applied as one unit.
#[derive(Debug, Clone)]
pub struct Acceptance {
    pub bid_id: ObjectId,
    pub advertisement_id: ObjectId,
    pub contract: Contract,
    pub at: DateTime,
}

#[derive(Debug, Clone)]
pub struct AcceptanceCommit {
    pub bid: Bid,
    pub contract: Contract,
    pub advertisement: Advertisement,
    pub rejected_bids: Vec<Bid>,
}

#[derive(Debug, Clone)]
pub struct ClosureCommit {
    pub advertisement: Advertisement,
    pub rejected_bids: Vec<Bid>,
}

#[derive(Debug, Clone)]
pub struct ReviewCommit {
    pub review: Review,
    pub rating: InfluencerRating,
}

/// Persistence boundary of the marketplace engine.
///
/// Conditional updates take the statuses the record must currently hold and
/// return `Ok(None)` when it does not, so a racing writer never overwrites a
/// transition it did not observe. The `commit_*` methods apply multi-record
/// changes atomically: all of their writes land or none do.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_advertisement(&self, ad: &Advertisement) -> StoreResult<()>;

    async fn find_advertisement(&self, id: &ObjectId) -> StoreResult<Option<Advertisement>>;

    async fn update_advertisement_status(
        &self,
        id: &ObjectId,
        from: AdvertisementStatus,
        to: AdvertisementStatus,
        at: DateTime,
    ) -> StoreResult<Option<Advertisement>>;

    /// OPEN -> CLOSED, rejecting every live bid on the advertisement.
    async fn commit_closure(&self, id: &ObjectId, at: DateTime) -> StoreResult<ClosureCommit>;

    /// Fails with `Duplicate("bid")` when the influencer already bid on the advertisement.
    async fn insert_bid(&self, bid: &Bid) -> StoreResult<()>;

    async fn find_bid(&self, id: &ObjectId) -> StoreResult<Option<Bid>>;

    async fn update_bid_status(
        &self,
        id: &ObjectId,
        from: &[BidStatus],
        to: BidStatus,
        at: DateTime,
    ) -> StoreResult<Option<Bid>>;

    async fn list_bids(&self, query: &BidQuery, page: &PageRequest) -> StoreResult<(Vec<Bid>, u64)>;

    /// Accepts the bid, rejects its live siblings, closes the advertisement
    /// and inserts the contract. `Conflict` when the advertisement is no
    /// longer open or the bid is no longer live, `Duplicate("contract")` when
    /// the bid already has a contract.
    async fn commit_acceptance(&self, acceptance: &Acceptance) -> StoreResult<AcceptanceCommit>;

    async fn find_contract(&self, id: &ObjectId) -> StoreResult<Option<Contract>>;

    async fn find_contract_by_bid(&self, bid_id: &ObjectId) -> StoreResult<Option<Contract>>;

    /// Sets `completed_at` when moving to COMPLETED.
    async fn update_contract_status(
        &self,
        id: &ObjectId,
        from: ContractStatus,
        to: ContractStatus,
        at: DateTime,
    ) -> StoreResult<Option<Contract>>;

    async fn list_contracts(&self, query: &ContractQuery, page: &PageRequest) -> StoreResult<(Vec<Contract>, u64)>;

    async fn has_completed_contract(
        &self,
        client_id: &ObjectId,
        influencer_id: &ObjectId,
        advertisement_id: &ObjectId,
    ) -> StoreResult<bool>;

    /// Inserts the review and folds its rating into the influencer aggregate.
    /// `Duplicate("review")` when the triple was already reviewed.
    async fn commit_review(&self, review: &Review) -> StoreResult<ReviewCommit>;

    async fn find_influencer_rating(&self, influencer_id: &ObjectId) -> StoreResult<Option<InfluencerRating>>;

    async fn list_reviews(&self, influencer_id: &ObjectId, page: &PageRequest) -> StoreResult<(Vec<Review>, u64)>;
}
