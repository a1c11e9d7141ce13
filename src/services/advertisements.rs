use log::{debug, info};
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::db::BidQuery;
use crate::models::{Actor, Advertisement, AdvertisementStatus, Bid, BidStatus, Role};
use crate::services::notifier::MarketEvent;
use crate::services::policy::{self, Access};
use crate::services::{MarketError, MarketResult, Marketplace};
use crate::utils::validation::validate_budget;
use crate::utils::{Page, PageRequest};

/// Campaign fields supplied by the client.
#[derive(Debug, Clone)]
pub struct AdvertisementDraft {
    pub title: String,
    pub description: Option<String>,
    pub budget_min: f64,
    pub budget_max: f64,
    pub deadline: DateTime,
}

impl Marketplace {
    pub async fn create_advertisement(&self, actor: &Actor, draft: AdvertisementDraft) -> MarketResult<Advertisement> {
        policy::require_role(actor, Role::Client)?;

        let title = draft.title.trim();
        if title.is_empty() {
            return Err(MarketError::InvalidTerms("Title is required".into()));
        }
        validate_budget(draft.budget_min, draft.budget_max)?;

        let now = DateTime::now();
        if draft.deadline <= now {
            return Err(MarketError::InvalidTerms("Deadline must be in the future".into()));
        }

        let status = if self.settings.auto_approve_advertisements {
            AdvertisementStatus::Open
        } else {
            AdvertisementStatus::PendingApproval
        };

        let ad = Advertisement {
            id: ObjectId::new(),
            client_id: actor.user_id,
            title: title.to_string(),
            description: draft.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            budget_min: draft.budget_min,
            budget_max: draft.budget_max,
            deadline: draft.deadline,
            status,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_advertisement(&ad).await?;
        info!("Advertisement {} created by client {} ({})", ad.id, ad.client_id, ad.status.as_str());
        Ok(ad)
    }

    pub async fn get_advertisement(&self, id: &ObjectId) -> MarketResult<Advertisement> {
        self.load_advertisement(id).await
    }

    /// Manual close. Live bids are rejected in the same commit so none is left
    /// waiting on a campaign that can no longer accept it.
    pub async fn close_advertisement(&self, actor: &Actor, id: &ObjectId) -> MarketResult<Advertisement> {
        let ad = self.load_advertisement(id).await?;
        policy::authorize(actor, Access::Owner(ad.client_id))?;

        let _guard = self.locks.acquire(*id).await;
        let ad = self.load_advertisement(id).await?;
        if ad.status != AdvertisementStatus::Open {
            debug!("close refused: advertisement {} is {}", id, ad.status.as_str());
            return Err(MarketError::transition(format!(
                "cannot close an advertisement that is {}",
                ad.status.as_str()
            )));
        }

        let commit = self.store.commit_closure(id, DateTime::now()).await?;
        info!(
            "Advertisement {} closed by client {}; {} live bid(s) rejected",
            id,
            actor.user_id,
            commit.rejected_bids.len()
        );

        for bid in &commit.rejected_bids {
            self.publish(MarketEvent::BidRejected {
                bid_id: bid.id.to_hex(),
                influencer_id: bid.influencer_id.to_hex(),
            })
            .await;
        }
        self.publish(MarketEvent::AdvertisementClosed {
            advertisement_id: id.to_hex(),
            client_id: commit.advertisement.client_id.to_hex(),
        })
        .await;

        Ok(commit.advertisement)
    }

    /// Moderation decision on an advertisement awaiting approval.
    pub async fn moderate_advertisement(&self, actor: &Actor, id: &ObjectId, approve: bool) -> MarketResult<Advertisement> {
        policy::authorize(actor, Access::Moderator)?;

        let ad = self.load_advertisement(id).await?;
        if ad.status != AdvertisementStatus::PendingApproval {
            return Err(MarketError::transition(format!(
                "advertisement is {}, not awaiting approval",
                ad.status.as_str()
            )));
        }

        let to = if approve {
            AdvertisementStatus::Open
        } else {
            AdvertisementStatus::Rejected
        };

        let ad = self
            .store
            .update_advertisement_status(id, AdvertisementStatus::PendingApproval, to, DateTime::now())
            .await?
            .ok_or_else(|| MarketError::transition("advertisement was moderated concurrently"))?;

        info!("Advertisement {} moderated to {} by {}", id, to.as_str(), actor.user_id);
        self.publish(MarketEvent::AdvertisementModerated {
            advertisement_id: id.to_hex(),
            client_id: ad.client_id.to_hex(),
            status: to.as_str().to_string(),
        })
        .await;

        Ok(ad)
    }

    /// Bids received on one of the caller's campaigns.
    pub async fn list_advertisement_bids(
        &self,
        actor: &Actor,
        id: &ObjectId,
        status: Option<BidStatus>,
        page: PageRequest,
    ) -> MarketResult<Page<Bid>> {
        let ad = self.load_advertisement(id).await?;
        policy::authorize(actor, Access::Owner(ad.client_id))?;

        let query = BidQuery {
            advertisement_id: Some(*id),
            status,
            ..Default::default()
        };
        let (bids, total) = self.store.list_bids(&query, &page).await?;
        Ok(Page::new(bids, total, &page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::Harness;
    use crate::utils::time::add_days;

    fn draft(deadline: DateTime) -> AdvertisementDraft {
        AdvertisementDraft {
            title: "Autumn collection".into(),
            description: Some("  ".into()),
            budget_min: 100.0,
            budget_max: 500.0,
            deadline,
        }
    }

    #[tokio::test]
    async fn create_opens_campaign_for_client() {
        let h = Harness::new();
        let ad = h
            .market
            .create_advertisement(&h.client, draft(add_days(DateTime::now(), 10)))
            .await
            .unwrap();

        assert_eq!(ad.status, AdvertisementStatus::Open);
        assert_eq!(ad.client_id, h.client.user_id);
        assert_eq!(ad.description, None);
    }

    #[tokio::test]
    async fn create_rejects_bad_terms_and_wrong_role() {
        let h = Harness::new();
        let future = add_days(DateTime::now(), 10);

        let mut bad_budget = draft(future);
        bad_budget.budget_min = 900.0;
        assert!(matches!(
            h.market.create_advertisement(&h.client, bad_budget).await,
            Err(MarketError::InvalidTerms(_))
        ));

        assert!(matches!(
            h.market.create_advertisement(&h.client, draft(add_days(DateTime::now(), -1))).await,
            Err(MarketError::InvalidTerms(_))
        ));

        let influencer = Actor::influencer(ObjectId::new());
        assert!(matches!(
            h.market.create_advertisement(&influencer, draft(future)).await,
            Err(MarketError::NotOwner)
        ));
    }

    #[tokio::test]
    async fn close_rejects_live_bids_and_blocks_new_ones() {
        let h = Harness::new();
        let ad = h.open_ad().await;
        let (_, pending) = h.bid(&ad, 200.0, 5).await;
        let (_, shortlisted) = h.bid(&ad, 250.0, 3).await;
        h.market.shortlist_bid(&h.client, &shortlisted.id).await.unwrap();

        let closed = h.market.close_advertisement(&h.client, &ad.id).await.unwrap();
        assert_eq!(closed.status, AdvertisementStatus::Closed);

        for id in [pending.id, shortlisted.id] {
            assert_eq!(h.market.load_bid(&id).await.unwrap().status, BidStatus::Rejected);
        }

        let late = h.market.submit_bid(&Actor::influencer(ObjectId::new()), h.terms(&ad, 150.0, 2)).await;
        assert!(matches!(late, Err(MarketError::AdvertisementClosed)));

        let again = h.market.close_advertisement(&h.client, &ad.id).await;
        assert!(matches!(again, Err(MarketError::InvalidTransition(_))));

        assert!(h.hook.kinds().await.contains(&"advertisement_closed"));
    }

    #[tokio::test]
    async fn only_owner_may_close() {
        let h = Harness::new();
        let ad = h.open_ad().await;
        let stranger = Actor::client(ObjectId::new());

        assert!(matches!(
            h.market.close_advertisement(&stranger, &ad.id).await,
            Err(MarketError::NotOwner)
        ));
        assert_eq!(h.market.get_advertisement(&ad.id).await.unwrap().status, AdvertisementStatus::Open);
    }

    #[tokio::test]
    async fn moderation_gates_pending_campaigns() {
        let h = Harness::with_settings(crate::services::MarketSettings {
            auto_approve_advertisements: false,
        });
        let ad = h
            .market
            .create_advertisement(&h.client, draft(add_days(DateTime::now(), 10)))
            .await
            .unwrap();
        assert_eq!(ad.status, AdvertisementStatus::PendingApproval);

        let early = h.market.submit_bid(&Actor::influencer(ObjectId::new()), h.terms(&ad, 150.0, 2)).await;
        assert!(matches!(early, Err(MarketError::AdvertisementClosed)));

        assert!(matches!(
            h.market.moderate_advertisement(&h.client, &ad.id, true).await,
            Err(MarketError::NotOwner)
        ));

        let admin = Actor::admin(ObjectId::new());
        let approved = h.market.moderate_advertisement(&admin, &ad.id, true).await.unwrap();
        assert_eq!(approved.status, AdvertisementStatus::Open);

        assert!(matches!(
            h.market.moderate_advertisement(&admin, &ad.id, false).await,
            Err(MarketError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn campaign_bids_are_visible_to_owner_only() {
        let h = Harness::new();
        let ad = h.open_ad().await;
        h.bid(&ad, 200.0, 5).await;
        h.bid(&ad, 300.0, 7).await;

        let page = h
            .market
            .list_advertisement_bids(&h.client, &ad.id, None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total, 2);

        let stranger = Actor::client(ObjectId::new());
        assert!(matches!(
            h.market.list_advertisement_bids(&stranger, &ad.id, None, PageRequest::default()).await,
            Err(MarketError::NotOwner)
        ));
    }
}
