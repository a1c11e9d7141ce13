use log::info;
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::db::ContractQuery;
use crate::models::{Actor, Bid, Contract, ContractStatus, Role};
use crate::services::notifier::MarketEvent;
use crate::services::policy::{self, Access};
use crate::services::{MarketError, MarketResult, Marketplace};
use crate::utils::time::add_days;
use crate::utils::{Page, PageRequest};

/// Contract terms derived from an accepted bid. Only the accept cascade calls
/// this; the store's unique `bid_id` constraint keeps it at one per bid.
pub fn create_from_accepted_bid(bid: &Bid, client_id: ObjectId, accepted_at: DateTime) -> Contract {
    Contract {
        id: ObjectId::new(),
        bid_id: bid.id,
        client_id,
        influencer_id: bid.influencer_id,
        advertisement_id: bid.advertisement_id,
        agreed_price: bid.proposed_price,
        delivery_deadline: add_days(accepted_at, bid.delivery_days),
        status: ContractStatus::Active,
        completed_at: None,
        created_at: accepted_at,
        updated_at: accepted_at,
    }
}

impl Marketplace {
    pub async fn complete_contract(&self, actor: &Actor, id: &ObjectId) -> MarketResult<Contract> {
        let contract = self.load_contract(id).await?;
        policy::authorize(actor, Access::Owner(contract.client_id))?;

        let contract = self.transition_contract(contract, ContractStatus::Completed).await?;
        self.publish(MarketEvent::ContractCompleted {
            contract_id: contract.id.to_hex(),
            client_id: contract.client_id.to_hex(),
            influencer_id: contract.influencer_id.to_hex(),
        })
        .await;
        Ok(contract)
    }

    pub async fn cancel_contract(&self, actor: &Actor, id: &ObjectId) -> MarketResult<Contract> {
        let contract = self.load_contract(id).await?;
        policy::authorize(actor, Access::Owner(contract.client_id))?;

        let contract = self.transition_contract(contract, ContractStatus::Cancelled).await?;
        self.publish(MarketEvent::ContractCancelled {
            contract_id: contract.id.to_hex(),
            client_id: contract.client_id.to_hex(),
            influencer_id: contract.influencer_id.to_hex(),
        })
        .await;
        Ok(contract)
    }

    /// Either party (or a moderator) may escalate an active contract.
    pub async fn dispute_contract(&self, actor: &Actor, id: &ObjectId) -> MarketResult<Contract> {
        let contract = self.load_contract(id).await?;
        policy::authorize(
            actor,
            Access::Party {
                client_id: contract.client_id,
                influencer_id: contract.influencer_id,
            },
        )?;

        let contract = self.transition_contract(contract, ContractStatus::Disputed).await?;
        self.publish(MarketEvent::ContractDisputed {
            contract_id: contract.id.to_hex(),
            raised_by: actor.user_id.to_hex(),
        })
        .await;
        Ok(contract)
    }

    async fn transition_contract(&self, contract: Contract, to: ContractStatus) -> MarketResult<Contract> {
        if !contract.status.can_transition_to(to) {
            return Err(MarketError::transition(format!(
                "contract is {} and cannot become {}",
                contract.status.as_str(),
                to.as_str()
            )));
        }

        let updated = self
            .store
            .update_contract_status(&contract.id, ContractStatus::Active, to, DateTime::now())
            .await?
            .ok_or_else(|| MarketError::transition("contract changed status concurrently"))?;

        info!("Contract {} moved to {}", updated.id, to.as_str());
        Ok(updated)
    }

    pub async fn get_contract(&self, actor: &Actor, id: &ObjectId) -> MarketResult<Contract> {
        let contract = self.load_contract(id).await?;
        policy::authorize(
            actor,
            Access::Party {
                client_id: contract.client_id,
                influencer_id: contract.influencer_id,
            },
        )?;
        Ok(contract)
    }

    pub async fn list_my_contracts(
        &self,
        actor: &Actor,
        status: Option<ContractStatus>,
        page: PageRequest,
    ) -> MarketResult<Page<Contract>> {
        let mut query = ContractQuery {
            status,
            ..Default::default()
        };
        match actor.role {
            Role::Client => query.client_id = Some(actor.user_id),
            Role::Influencer => query.influencer_id = Some(actor.user_id),
            Role::Admin => {}
        }

        let (contracts, total) = self.store.list_contracts(&query, &page).await?;
        Ok(Page::new(contracts, total, &page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::Harness;

    #[test]
    fn terms_follow_the_bid() {
        let bid = Bid {
            id: ObjectId::new(),
            advertisement_id: ObjectId::new(),
            influencer_id: ObjectId::new(),
            proposed_price: 275.5,
            delivery_days: 3,
            proposal: "two reels".into(),
            status: crate::models::BidStatus::Accepted,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };
        let at = DateTime::from_millis(1_700_000_000_000);
        let contract = create_from_accepted_bid(&bid, ObjectId::new(), at);

        assert_eq!(contract.agreed_price, 275.5);
        assert_eq!(contract.bid_id, bid.id);
        assert_eq!(contract.status, ContractStatus::Active);
        assert_eq!(contract.created_at, at);
        assert_eq!(
            contract.delivery_deadline.timestamp_millis(),
            at.timestamp_millis() + 3 * 24 * 60 * 60 * 1000
        );
    }

    #[tokio::test]
    async fn complete_sets_completed_at_and_blocks_cancel() {
        let h = Harness::new();
        let contract = h.contract().await;

        let completed = h.market.complete_contract(&h.client, &contract.id).await.unwrap();
        assert_eq!(completed.status, ContractStatus::Completed);
        assert!(completed.completed_at.is_some());

        let cancel = h.market.cancel_contract(&h.client, &contract.id).await;
        assert!(matches!(cancel, Err(MarketError::InvalidTransition(_))));
        assert!(h.hook.kinds().await.contains(&"contract_completed"));
    }

    #[tokio::test]
    async fn cancelled_contract_does_not_reopen() {
        let h = Harness::new();
        let contract = h.contract().await;

        let cancelled = h.market.cancel_contract(&h.client, &contract.id).await.unwrap();
        assert_eq!(cancelled.status, ContractStatus::Cancelled);
        assert!(cancelled.completed_at.is_none());

        for result in [
            h.market.complete_contract(&h.client, &contract.id).await,
            h.market.cancel_contract(&h.client, &contract.id).await,
        ] {
            assert!(matches!(result, Err(MarketError::InvalidTransition(_))));
        }
    }

    #[tokio::test]
    async fn only_issuing_client_completes() {
        let h = Harness::new();
        let contract = h.contract().await;
        let influencer = Actor::influencer(contract.influencer_id);

        assert!(matches!(
            h.market.complete_contract(&influencer, &contract.id).await,
            Err(MarketError::NotOwner)
        ));
        assert!(matches!(
            h.market.cancel_contract(&Actor::client(ObjectId::new()), &contract.id).await,
            Err(MarketError::NotOwner)
        ));
    }

    #[tokio::test]
    async fn influencer_can_dispute() {
        let h = Harness::new();
        let contract = h.contract().await;
        let influencer = Actor::influencer(contract.influencer_id);

        assert!(matches!(
            h.market.dispute_contract(&Actor::influencer(ObjectId::new()), &contract.id).await,
            Err(MarketError::NotOwner)
        ));

        let disputed = h.market.dispute_contract(&influencer, &contract.id).await.unwrap();
        assert_eq!(disputed.status, ContractStatus::Disputed);
        assert!(matches!(
            h.market.complete_contract(&h.client, &contract.id).await,
            Err(MarketError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn contracts_are_listed_per_side() {
        let h = Harness::new();
        let contract = h.contract().await;
        let influencer = Actor::influencer(contract.influencer_id);

        let mine = h.market.list_my_contracts(&influencer, None, PageRequest::default()).await.unwrap();
        assert_eq!(mine.items.len(), 1);

        let other = Actor::influencer(ObjectId::new());
        let theirs = h.market.list_my_contracts(&other, None, PageRequest::default()).await.unwrap();
        assert!(theirs.items.is_empty());

        let completed = h
            .market
            .list_my_contracts(&h.client, Some(ContractStatus::Completed), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(completed.pagination.total, 0);

        assert!(h.market.get_contract(&influencer, &contract.id).await.is_ok());
        assert!(h.market.get_contract(&Actor::admin(ObjectId::new()), &contract.id).await.is_ok());
        assert!(matches!(h.market.get_contract(&other, &contract.id).await, Err(MarketError::NotOwner)));
    }
}
