use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::utils::time::to_chrono;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub client_id: ObjectId,
    pub influencer_id: ObjectId,
    pub advertisement_id: ObjectId,
    pub rating: i32, // 1-5
    pub comment: Option<String>,
    pub created_at: DateTime,
}

/// Running aggregate of every review an influencer has received.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InfluencerRating {
    pub influencer_id: ObjectId,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub updated_at: DateTime,
}

impl InfluencerRating {
    pub fn empty(influencer_id: ObjectId) -> Self {
        InfluencerRating {
            influencer_id,
            average_rating: 0.0,
            total_reviews: 0,
            updated_at: DateTime::from_millis(0),
        }
    }

    /// Folds one more rating into the running mean.
    pub fn absorb(&self, rating: i32, at: DateTime) -> Self {
        let total = self.total_reviews + 1;
        let average = (self.average_rating * self.total_reviews as f64 + rating as f64) / total as f64;

        InfluencerRating {
            influencer_id: self.influencer_id,
            average_rating: average,
            total_reviews: total,
            updated_at: at,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewDto {
    pub influencer_id: String,
    pub advertisement_id: String,
    /// Whole number from 1 to 5; anything else is refused with `INVALID_RATING`.
    pub rating: f64,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: String,
    pub client_id: String,
    pub influencer_id: String,
    pub advertisement_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        ReviewResponse {
            id: review.id.to_hex(),
            client_id: review.client_id.to_hex(),
            influencer_id: review.influencer_id.to_hex(),
            advertisement_id: review.advertisement_id.to_hex(),
            rating: review.rating,
            comment: review.comment,
            created_at: to_chrono(review.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfluencerRatingResponse {
    pub influencer_id: String,
    pub average_rating: f64,
    pub total_reviews: i64,
}

impl From<InfluencerRating> for InfluencerRatingResponse {
    fn from(rating: InfluencerRating) -> Self {
        InfluencerRatingResponse {
            influencer_id: rating.influencer_id.to_hex(),
            average_rating: rating.average_rating,
            total_reviews: rating.total_reviews,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_matches_full_recompute() {
        let influencer = ObjectId::new();
        let now = DateTime::now();
        let ratings = [5, 3, 4, 1, 5];

        let aggregate = ratings
            .iter()
            .fold(InfluencerRating::empty(influencer), |acc, r| acc.absorb(*r, now));

        let expected = ratings.iter().sum::<i32>() as f64 / ratings.len() as f64;
        assert_eq!(aggregate.total_reviews, 5);
        assert!((aggregate.average_rating - expected).abs() < 1e-9);
    }

    #[test]
    fn first_rating_becomes_the_average() {
        let aggregate = InfluencerRating::empty(ObjectId::new()).absorb(4, DateTime::now());
        assert_eq!(aggregate.total_reviews, 1);
        assert_eq!(aggregate.average_rating, 4.0);
    }
}
