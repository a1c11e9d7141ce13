use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::guards::AuthGuard;
use crate::models::{CreateReviewDto, InfluencerRatingResponse, ReviewResponse};
use crate::services::{Marketplace, ReviewSubmission};
use crate::utils::validation::parse_object_id;
use crate::utils::{ApiError, ApiResponse, PageRequest};

#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct ReviewsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[openapi(tag = "Reviews")]
#[post("/reviews", data = "<dto>")]
pub async fn create_review(
    market: &State<Marketplace>,
    auth: AuthGuard,
    dto: Json<CreateReviewDto>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    let dto = dto.into_inner();
    let submission = ReviewSubmission {
        influencer_id: parse_object_id(&dto.influencer_id, "influencer")?,
        advertisement_id: parse_object_id(&dto.advertisement_id, "advertisement")?,
        rating: dto.rating,
        comment: dto.comment,
    };

    let commit = market.submit_review(&auth.actor(), submission).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Review submitted successfully",
        commit.review.into(),
    )))
}

#[openapi(tag = "Reviews")]
#[get("/reviews/influencer/<influencer_id>?<query..>")]
pub async fn influencer_reviews(
    market: &State<Marketplace>,
    influencer_id: String,
    query: ReviewsQuery,
) -> Result<Json<ApiResponse<Vec<ReviewResponse>>>, ApiError> {
    let influencer_id = parse_object_id(&influencer_id, "influencer")?;
    let page = market
        .list_influencer_reviews(&influencer_id, PageRequest::new(query.page, query.limit))
        .await?;

    Ok(Json(ApiResponse::paginated(page.map(ReviewResponse::from))))
}

#[openapi(tag = "Reviews")]
#[get("/reviews/influencer/<influencer_id>/rating")]
pub async fn influencer_rating(
    market: &State<Marketplace>,
    influencer_id: String,
) -> Result<Json<ApiResponse<InfluencerRatingResponse>>, ApiError> {
    let influencer_id = parse_object_id(&influencer_id, "influencer")?;
    let rating = market.get_influencer_rating(&influencer_id).await?;
    Ok(Json(ApiResponse::success(rating.into())))
}
