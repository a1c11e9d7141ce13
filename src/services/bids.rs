use log::{debug, info};
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::db::{Acceptance, BidQuery};
use crate::models::{Actor, AdvertisementStatus, Bid, BidStatus, BidTerms, Contract, Role};
use crate::services::contracts::create_from_accepted_bid;
use crate::services::notifier::MarketEvent;
use crate::services::policy::{self, Access};
use crate::services::{MarketError, MarketResult, Marketplace};
use crate::utils::validation::validate_bid_terms;
use crate::utils::{Page, PageRequest};

/// Outcome of accepting a bid: the winning bid and the contract it formed.
#[derive(Debug, Clone)]
pub struct AcceptedBid {
    pub bid: Bid,
    pub contract: Contract,
}

impl Marketplace {
    pub async fn submit_bid(&self, actor: &Actor, terms: BidTerms) -> MarketResult<Bid> {
        policy::require_role(actor, Role::Influencer)?;
        validate_bid_terms(terms.proposed_price, terms.delivery_days, &terms.proposal)?;

        let _guard = self.locks.acquire(terms.advertisement_id).await;
        let ad = self.load_advertisement(&terms.advertisement_id).await?;

        let now = DateTime::now();
        if !ad.accepts_bids_at(now) {
            debug!(
                "bid refused: advertisement {} is {} (deadline {})",
                ad.id,
                ad.status.as_str(),
                ad.deadline
            );
            return Err(MarketError::AdvertisementClosed);
        }

        let bid = Bid {
            id: ObjectId::new(),
            advertisement_id: ad.id,
            influencer_id: actor.user_id,
            proposed_price: terms.proposed_price,
            delivery_days: terms.delivery_days,
            proposal: terms.proposal.trim().to_string(),
            status: BidStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_bid(&bid).await?;
        info!("Bid {} submitted by influencer {} on advertisement {}", bid.id, bid.influencer_id, ad.id);

        self.publish(MarketEvent::BidSubmitted {
            bid_id: bid.id.to_hex(),
            advertisement_id: ad.id.to_hex(),
            influencer_id: bid.influencer_id.to_hex(),
            client_id: ad.client_id.to_hex(),
        })
        .await;

        Ok(bid)
    }

    pub async fn shortlist_bid(&self, actor: &Actor, bid_id: &ObjectId) -> MarketResult<Bid> {
        let bid = self.transition_bid(actor, bid_id, BidStatus::Shortlisted).await?;
        self.publish(MarketEvent::BidShortlisted {
            bid_id: bid.id.to_hex(),
            influencer_id: bid.influencer_id.to_hex(),
        })
        .await;
        Ok(bid)
    }

    pub async fn reject_bid(&self, actor: &Actor, bid_id: &ObjectId) -> MarketResult<Bid> {
        let bid = self.transition_bid(actor, bid_id, BidStatus::Rejected).await?;
        self.publish(MarketEvent::BidRejected {
            bid_id: bid.id.to_hex(),
            influencer_id: bid.influencer_id.to_hex(),
        })
        .await;
        Ok(bid)
    }

    /// Single-bid moves that do not form a contract.
    async fn transition_bid(&self, actor: &Actor, bid_id: &ObjectId, to: BidStatus) -> MarketResult<Bid> {
        let bid = self.load_bid(bid_id).await?;
        let ad = self.load_advertisement(&bid.advertisement_id).await?;
        policy::authorize(actor, Access::Owner(ad.client_id))?;

        let _guard = self.locks.acquire(ad.id).await;
        let bid = self.load_bid(bid_id).await?;
        if !bid.status.can_transition_to(to) {
            return Err(MarketError::transition(format!(
                "bid is {} and cannot become {}",
                bid.status.as_str(),
                to.as_str()
            )));
        }

        let bid = self
            .store
            .update_bid_status(bid_id, to.predecessors(), to, DateTime::now())
            .await?
            .ok_or_else(|| MarketError::transition("bid changed status concurrently"))?;

        info!("Bid {} moved to {} by client {}", bid.id, to.as_str(), actor.user_id);
        Ok(bid)
    }

    /// Accepts a bid and forms its contract.
    ///
    /// Bid acceptance, rejection of the remaining live bids, closing the
    /// advertisement and inserting the contract are one store commit; the
    /// per-advertisement lock makes concurrent accepts on the same campaign
    /// queue up, and the loser observes a closed advertisement.
    pub async fn accept_bid(&self, actor: &Actor, bid_id: &ObjectId) -> MarketResult<AcceptedBid> {
        let bid = self.load_bid(bid_id).await?;
        let ad = self.load_advertisement(&bid.advertisement_id).await?;
        policy::authorize(actor, Access::Owner(ad.client_id))?;

        let _guard = self.locks.acquire(ad.id).await;
        let bid = self.load_bid(bid_id).await?;
        let ad = self.load_advertisement(&bid.advertisement_id).await?;

        if !bid.status.can_transition_to(BidStatus::Accepted) {
            return Err(MarketError::transition(format!(
                "bid is {} and cannot be accepted",
                bid.status.as_str()
            )));
        }
        if ad.status != AdvertisementStatus::Open {
            return Err(MarketError::transition(format!(
                "advertisement is {}",
                ad.status.as_str()
            )));
        }

        let accepted_at = DateTime::now();
        let acceptance = Acceptance {
            bid_id: bid.id,
            advertisement_id: ad.id,
            contract: create_from_accepted_bid(&bid, ad.client_id, accepted_at),
            at: accepted_at,
        };

        let commit = self.store.commit_acceptance(&acceptance).await?;
        info!(
            "Bid {} accepted on advertisement {}; contract {} formed at {:.2}, {} sibling bid(s) rejected",
            commit.bid.id,
            ad.id,
            commit.contract.id,
            commit.contract.agreed_price,
            commit.rejected_bids.len()
        );

        self.publish(MarketEvent::BidAccepted {
            bid_id: commit.bid.id.to_hex(),
            influencer_id: commit.bid.influencer_id.to_hex(),
            contract_id: commit.contract.id.to_hex(),
        })
        .await;
        for rejected in &commit.rejected_bids {
            self.publish(MarketEvent::BidRejected {
                bid_id: rejected.id.to_hex(),
                influencer_id: rejected.influencer_id.to_hex(),
            })
            .await;
        }
        self.publish(MarketEvent::AdvertisementClosed {
            advertisement_id: ad.id.to_hex(),
            client_id: ad.client_id.to_hex(),
        })
        .await;
        self.publish(MarketEvent::ContractCreated {
            contract_id: commit.contract.id.to_hex(),
            bid_id: commit.bid.id.to_hex(),
            client_id: commit.contract.client_id.to_hex(),
            influencer_id: commit.contract.influencer_id.to_hex(),
            agreed_price: commit.contract.agreed_price,
        })
        .await;

        Ok(AcceptedBid {
            bid: commit.bid,
            contract: commit.contract,
        })
    }

    /// A bid is visible to the influencer who placed it and to the campaign owner.
    pub async fn get_bid(&self, actor: &Actor, bid_id: &ObjectId) -> MarketResult<Bid> {
        let bid = self.load_bid(bid_id).await?;
        let ad = self.load_advertisement(&bid.advertisement_id).await?;
        policy::authorize(
            actor,
            Access::Party {
                client_id: ad.client_id,
                influencer_id: bid.influencer_id,
            },
        )?;
        Ok(bid)
    }

    pub async fn list_my_bids(
        &self,
        actor: &Actor,
        status: Option<BidStatus>,
        page: PageRequest,
    ) -> MarketResult<Page<Bid>> {
        policy::require_role(actor, Role::Influencer)?;

        let query = BidQuery {
            influencer_id: Some(actor.user_id),
            status,
            ..Default::default()
        };
        let (bids, total) = self.store.list_bids(&query, &page).await?;
        Ok(Page::new(bids, total, &page))
    }
}
