use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use serde::Serialize;
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::guards::AuthGuard;
use crate::models::{BidResponse, BidStatus, BidTerms, ContractResponse, SubmitBidDto};
use crate::routes::ListQuery;
use crate::services::Marketplace;
use crate::utils::validation::{parse_object_id, parse_status};
use crate::utils::{ApiError, ApiResponse};

#[derive(Debug, Serialize, JsonSchema)]
pub struct AcceptedBidResponse {
    pub bid: BidResponse,
    pub contract: ContractResponse,
}

#[openapi(tag = "Bids")]
#[post("/bids", data = "<dto>")]
pub async fn submit_bid(
    market: &State<Marketplace>,
    auth: AuthGuard,
    dto: Json<SubmitBidDto>,
) -> Result<Json<ApiResponse<BidResponse>>, ApiError> {
    let dto = dto.into_inner();
    let terms = BidTerms {
        advertisement_id: parse_object_id(&dto.advertisement_id, "advertisement")?,
        proposed_price: dto.proposed_price,
        delivery_days: dto.delivery_days,
        proposal: dto.proposal,
    };

    let bid = market.submit_bid(&auth.actor(), terms).await?;
    Ok(Json(ApiResponse::success_with_message("Bid submitted successfully", bid.into())))
}

#[openapi(tag = "Bids")]
#[patch("/bids/<id>/shortlist")]
pub async fn shortlist_bid(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<BidResponse>>, ApiError> {
    let id = parse_object_id(&id, "bid")?;
    let bid = market.shortlist_bid(&auth.actor(), &id).await?;
    Ok(Json(ApiResponse::success_with_message("Bid shortlisted", bid.into())))
}

#[openapi(tag = "Bids")]
#[patch("/bids/<id>/accept")]
pub async fn accept_bid(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<AcceptedBidResponse>>, ApiError> {
    let id = parse_object_id(&id, "bid")?;
    let accepted = market.accept_bid(&auth.actor(), &id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Bid accepted and contract created",
        AcceptedBidResponse {
            bid: accepted.bid.into(),
            contract: accepted.contract.into(),
        },
    )))
}

#[openapi(tag = "Bids")]
#[patch("/bids/<id>/reject")]
pub async fn reject_bid(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<BidResponse>>, ApiError> {
    let id = parse_object_id(&id, "bid")?;
    let bid = market.reject_bid(&auth.actor(), &id).await?;
    Ok(Json(ApiResponse::success_with_message("Bid rejected", bid.into())))
}

#[openapi(tag = "Bids")]
#[get("/bids/my-bids?<query..>")]
pub async fn my_bids(
    market: &State<Marketplace>,
    auth: AuthGuard,
    query: ListQuery,
) -> Result<Json<ApiResponse<Vec<BidResponse>>>, ApiError> {
    let status = parse_status::<BidStatus>(query.status.as_deref())?;
    let page = market
        .list_my_bids(&auth.actor(), status, query.page_request())
        .await?;

    Ok(Json(ApiResponse::paginated(page.map(BidResponse::from))))
}

#[openapi(tag = "Bids")]
#[get("/bids/<id>")]
pub async fn get_bid(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<BidResponse>>, ApiError> {
    let id = parse_object_id(&id, "bid")?;
    let bid = market.get_bid(&auth.actor(), &id).await?;
    Ok(Json(ApiResponse::success(bid.into())))
}
