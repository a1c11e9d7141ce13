use log::info;
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::db::ReviewCommit;
use crate::models::{Actor, InfluencerRating, Review, Role};
use crate::services::notifier::MarketEvent;
use crate::services::policy;
use crate::services::{MarketError, MarketResult, Marketplace};
use crate::utils::validation::validate_rating;
use crate::utils::{Page, PageRequest};

#[derive(Debug, Clone)]
pub struct ReviewSubmission {
    pub influencer_id: ObjectId,
    pub advertisement_id: ObjectId,
    pub rating: f64,
    pub comment: Option<String>,
}

impl Marketplace {
    /// Records a client's review of an influencer for one campaign.
    ///
    /// Requires a COMPLETED contract between the two on that advertisement.
    /// The review insert and the influencer's rating aggregate are committed
    /// together, so `average_rating` always reflects `total_reviews`.
    pub async fn submit_review(&self, actor: &Actor, submission: ReviewSubmission) -> MarketResult<ReviewCommit> {
        let rating = validate_rating(submission.rating)?;
        policy::require_role(actor, Role::Client)?;

        let eligible = self
            .store
            .has_completed_contract(&actor.user_id, &submission.influencer_id, &submission.advertisement_id)
            .await?;
        if !eligible {
            return Err(MarketError::NotEligible);
        }

        let review = Review {
            id: ObjectId::new(),
            client_id: actor.user_id,
            influencer_id: submission.influencer_id,
            advertisement_id: submission.advertisement_id,
            rating,
            comment: submission.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            created_at: DateTime::now(),
        };

        let commit = self.store.commit_review(&review).await?;
        info!(
            "Review {} for influencer {}: rating {} (now {:.2} over {})",
            commit.review.id,
            commit.review.influencer_id,
            commit.review.rating,
            commit.rating.average_rating,
            commit.rating.total_reviews
        );

        self.publish(MarketEvent::ReviewSubmitted {
            review_id: commit.review.id.to_hex(),
            influencer_id: commit.review.influencer_id.to_hex(),
            rating: commit.review.rating,
        })
        .await;

        Ok(commit)
    }

    pub async fn get_influencer_rating(&self, influencer_id: &ObjectId) -> MarketResult<InfluencerRating> {
        Ok(self
            .store
            .find_influencer_rating(influencer_id)
            .await?
            .unwrap_or_else(|| InfluencerRating::empty(*influencer_id)))
    }

    pub async fn list_influencer_reviews(&self, influencer_id: &ObjectId, page: PageRequest) -> MarketResult<Page<Review>> {
        let (reviews, total) = self.store.list_reviews(influencer_id, &page).await?;
        Ok(Page::new(reviews, total, &page))
    }
}
