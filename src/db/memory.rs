use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{
    Acceptance, AcceptanceCommit, BidQuery, ClosureCommit, ContractQuery, ReviewCommit, Store,
    StoreError, StoreResult,
};
use crate::models::{
    Advertisement, AdvertisementStatus, Bid, BidStatus, Contract, ContractStatus,
    InfluencerRating, Review,
};
use crate::utils::PageRequest;

#[derive(Default)]
struct Tables {
    advertisements: HashMap<ObjectId, Advertisement>,
    bids: HashMap<ObjectId, Bid>,
    contracts: HashMap<ObjectId, Contract>,
    reviews: HashMap<ObjectId, Review>,
    ratings: HashMap<ObjectId, InfluencerRating>,
}

impl Tables {
    fn live_siblings(&self, advertisement_id: ObjectId, except: Option<ObjectId>) -> Vec<ObjectId> {
        self.bids
            .values()
            .filter(|bid| bid.advertisement_id == advertisement_id)
            .filter(|bid| Some(bid.id) != except)
            .filter(|bid| !bid.status.is_terminal())
            .map(|bid| bid.id)
            .collect()
    }

    fn reject_bids(&mut self, ids: &[ObjectId], at: DateTime) -> Vec<Bid> {
        let mut rejected = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bid) = self.bids.get_mut(id) {
                bid.status = BidStatus::Rejected;
                bid.updated_at = at;
                rejected.push(bid.clone());
            }
        }
        rejected
    }
}

/// Process-local store. Each method runs under one write or read guard, which
/// makes every commit atomic with respect to every other call.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(mut rows: Vec<T>, key: impl Fn(&T) -> (DateTime, ObjectId), page: &PageRequest) -> (Vec<T>, u64) {
    // Newest first; id breaks ties so pages are stable.
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    let total = rows.len() as u64;
    let items = rows
        .into_iter()
        .skip(page.skip() as usize)
        .take(page.limit as usize)
        .collect();
    (items, total)
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_advertisement(&self, ad: &Advertisement) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.advertisements.contains_key(&ad.id) {
            return Err(StoreError::Duplicate("advertisement"));
        }
        tables.advertisements.insert(ad.id, ad.clone());
        Ok(())
    }

    async fn find_advertisement(&self, id: &ObjectId) -> StoreResult<Option<Advertisement>> {
        Ok(self.tables.read().await.advertisements.get(id).cloned())
    }

    async fn update_advertisement_status(
        &self,
        id: &ObjectId,
        from: AdvertisementStatus,
        to: AdvertisementStatus,
        at: DateTime,
    ) -> StoreResult<Option<Advertisement>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .advertisements
            .get_mut(id)
            .filter(|ad| ad.status == from)
            .map(|ad| {
                ad.status = to;
                ad.updated_at = at;
                ad.clone()
            }))
    }

    async fn commit_closure(&self, id: &ObjectId, at: DateTime) -> StoreResult<ClosureCommit> {
        let mut tables = self.tables.write().await;

        let advertisement = match tables.advertisements.get_mut(id) {
            Some(ad) if ad.status == AdvertisementStatus::Open => {
                ad.status = AdvertisementStatus::Closed;
                ad.updated_at = at;
                ad.clone()
            }
            Some(ad) => {
                return Err(StoreError::Conflict(format!("advertisement is {}", ad.status.as_str())));
            }
            None => return Err(StoreError::Conflict("advertisement does not exist".into())),
        };

        let live = tables.live_siblings(*id, None);
        let rejected_bids = tables.reject_bids(&live, at);

        Ok(ClosureCommit { advertisement, rejected_bids })
    }

    async fn insert_bid(&self, bid: &Bid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .bids
            .values()
            .any(|b| b.advertisement_id == bid.advertisement_id && b.influencer_id == bid.influencer_id);
        if taken {
            return Err(StoreError::Duplicate("bid"));
        }
        tables.bids.insert(bid.id, bid.clone());
        Ok(())
    }

    async fn find_bid(&self, id: &ObjectId) -> StoreResult<Option<Bid>> {
        Ok(self.tables.read().await.bids.get(id).cloned())
    }

    async fn update_bid_status(
        &self,
        id: &ObjectId,
        from: &[BidStatus],
        to: BidStatus,
        at: DateTime,
    ) -> StoreResult<Option<Bid>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .bids
            .get_mut(id)
            .filter(|bid| from.contains(&bid.status))
            .map(|bid| {
                bid.status = to;
                bid.updated_at = at;
                bid.clone()
            }))
    }

    async fn list_bids(&self, query: &BidQuery, page: &PageRequest) -> StoreResult<(Vec<Bid>, u64)> {
        let tables = self.tables.read().await;
        let rows: Vec<Bid> = tables.bids.values().filter(|b| query.matches(b)).cloned().collect();
        Ok(paginate(rows, |b: &Bid| (b.created_at, b.id), page))
    }

    async fn commit_acceptance(&self, acceptance: &Acceptance) -> StoreResult<AcceptanceCommit> {
        let mut tables = self.tables.write().await;

        // Validate everything before the first write.
        match tables.advertisements.get(&acceptance.advertisement_id) {
            Some(ad) if ad.status == AdvertisementStatus::Open => {}
            Some(ad) => {
                return Err(StoreError::Conflict(format!("advertisement is {}", ad.status.as_str())));
            }
            None => return Err(StoreError::Conflict("advertisement does not exist".into())),
        }
        match tables.bids.get(&acceptance.bid_id) {
            Some(bid) if bid.advertisement_id != acceptance.advertisement_id => {
                return Err(StoreError::Conflict("bid belongs to another advertisement".into()));
            }
            Some(bid) if !bid.status.can_transition_to(BidStatus::Accepted) => {
                return Err(StoreError::Conflict(format!("bid is {}", bid.status.as_str())));
            }
            Some(_) => {}
            None => return Err(StoreError::Conflict("bid does not exist".into())),
        }
        if tables.contracts.values().any(|c| c.bid_id == acceptance.bid_id) {
            return Err(StoreError::Duplicate("contract"));
        }

        let at = acceptance.at;
        let bid = {
            let bid = tables
                .bids
                .get_mut(&acceptance.bid_id)
                .ok_or_else(|| StoreError::Conflict("bid does not exist".into()))?;
            bid.status = BidStatus::Accepted;
            bid.updated_at = at;
            bid.clone()
        };

        let siblings = tables.live_siblings(acceptance.advertisement_id, Some(acceptance.bid_id));
        let rejected_bids = tables.reject_bids(&siblings, at);

        let advertisement = {
            let ad = tables
                .advertisements
                .get_mut(&acceptance.advertisement_id)
                .ok_or_else(|| StoreError::Conflict("advertisement does not exist".into()))?;
            ad.status = AdvertisementStatus::Closed;
            ad.updated_at = at;
            ad.clone()
        };

        tables.contracts.insert(acceptance.contract.id, acceptance.contract.clone());

        Ok(AcceptanceCommit {
            bid,
            contract: acceptance.contract.clone(),
            advertisement,
            rejected_bids,
        })
    }

    async fn find_contract(&self, id: &ObjectId) -> StoreResult<Option<Contract>> {
        Ok(self.tables.read().await.contracts.get(id).cloned())
    }

    async fn find_contract_by_bid(&self, bid_id: &ObjectId) -> StoreResult<Option<Contract>> {
        Ok(self
            .tables
            .read()
            .await
            .contracts
            .values()
            .find(|c| c.bid_id == *bid_id)
            .cloned())
    }

    async fn update_contract_status(
        &self,
        id: &ObjectId,
        from: ContractStatus,
        to: ContractStatus,
        at: DateTime,
    ) -> StoreResult<Option<Contract>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .contracts
            .get_mut(id)
            .filter(|c| c.status == from)
            .map(|c| {
                c.status = to;
                c.updated_at = at;
                if to == ContractStatus::Completed {
                    c.completed_at = Some(at);
                }
                c.clone()
            }))
    }

    async fn list_contracts(&self, query: &ContractQuery, page: &PageRequest) -> StoreResult<(Vec<Contract>, u64)> {
        let tables = self.tables.read().await;
        let rows: Vec<Contract> = tables.contracts.values().filter(|c| query.matches(c)).cloned().collect();
        Ok(paginate(rows, |c: &Contract| (c.created_at, c.id), page))
    }

    async fn has_completed_contract(
        &self,
        client_id: &ObjectId,
        influencer_id: &ObjectId,
        advertisement_id: &ObjectId,
    ) -> StoreResult<bool> {
        Ok(self.tables.read().await.contracts.values().any(|c| {
            c.status == ContractStatus::Completed
                && c.client_id == *client_id
                && c.influencer_id == *influencer_id
                && c.advertisement_id == *advertisement_id
        }))
    }

    async fn commit_review(&self, review: &Review) -> StoreResult<ReviewCommit> {
        let mut tables = self.tables.write().await;

        let reviewed = tables.reviews.values().any(|r| {
            r.client_id == review.client_id
                && r.influencer_id == review.influencer_id
                && r.advertisement_id == review.advertisement_id
        });
        if reviewed {
            return Err(StoreError::Duplicate("review"));
        }

        let rating = tables
            .ratings
            .get(&review.influencer_id)
            .cloned()
            .unwrap_or_else(|| InfluencerRating::empty(review.influencer_id))
            .absorb(review.rating, review.created_at);

        tables.reviews.insert(review.id, review.clone());
        tables.ratings.insert(review.influencer_id, rating.clone());

        Ok(ReviewCommit {
            review: review.clone(),
            rating,
        })
    }

    async fn find_influencer_rating(&self, influencer_id: &ObjectId) -> StoreResult<Option<InfluencerRating>> {
        Ok(self.tables.read().await.ratings.get(influencer_id).cloned())
    }

    async fn list_reviews(&self, influencer_id: &ObjectId, page: &PageRequest) -> StoreResult<(Vec<Review>, u64)> {
        let tables = self.tables.read().await;
        let rows: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| r.influencer_id == *influencer_id)
            .cloned()
            .collect();
        Ok(paginate(rows, |r: &Review| (r.created_at, r.id), page))
    }
}
