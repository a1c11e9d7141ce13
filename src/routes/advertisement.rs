use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::guards::AuthGuard;
use crate::models::{AdvertisementResponse, BidResponse, BidStatus, CreateAdvertisementDto};
use crate::routes::ListQuery;
use crate::services::{AdvertisementDraft, Marketplace};
use crate::utils::time::from_chrono;
use crate::utils::validation::{parse_object_id, parse_status};
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Advertisements")]
#[post("/advertisements", data = "<dto>")]
pub async fn create_advertisement(
    market: &State<Marketplace>,
    auth: AuthGuard,
    dto: Json<CreateAdvertisementDto>,
) -> Result<Json<ApiResponse<AdvertisementResponse>>, ApiError> {
    let dto = dto.into_inner();
    let draft = AdvertisementDraft {
        title: dto.title,
        description: dto.description,
        budget_min: dto.budget_min,
        budget_max: dto.budget_max,
        deadline: from_chrono(dto.deadline),
    };

    let ad = market.create_advertisement(&auth.actor(), draft).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Advertisement created successfully",
        ad.into(),
    )))
}

#[openapi(tag = "Advertisements")]
#[get("/advertisements/<id>")]
pub async fn get_advertisement(
    market: &State<Marketplace>,
    _auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<AdvertisementResponse>>, ApiError> {
    let id = parse_object_id(&id, "advertisement")?;
    let ad = market.get_advertisement(&id).await?;
    Ok(Json(ApiResponse::success(ad.into())))
}

#[openapi(tag = "Advertisements")]
#[patch("/advertisements/<id>/close")]
pub async fn close_advertisement(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<AdvertisementResponse>>, ApiError> {
    let id = parse_object_id(&id, "advertisement")?;
    let ad = market.close_advertisement(&auth.actor(), &id).await?;
    Ok(Json(ApiResponse::success_with_message("Advertisement closed", ad.into())))
}

#[openapi(tag = "Advertisements")]
#[patch("/advertisements/<id>/approve")]
pub async fn approve_advertisement(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<AdvertisementResponse>>, ApiError> {
    let id = parse_object_id(&id, "advertisement")?;
    let ad = market.moderate_advertisement(&auth.actor(), &id, true).await?;
    Ok(Json(ApiResponse::success_with_message("Advertisement approved", ad.into())))
}

#[openapi(tag = "Advertisements")]
#[patch("/advertisements/<id>/reject")]
pub async fn reject_advertisement(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<AdvertisementResponse>>, ApiError> {
    let id = parse_object_id(&id, "advertisement")?;
    let ad = market.moderate_advertisement(&auth.actor(), &id, false).await?;
    Ok(Json(ApiResponse::success_with_message("Advertisement rejected", ad.into())))
}

#[openapi(tag = "Advertisements")]
#[get("/advertisements/<id>/bids?<query..>")]
pub async fn advertisement_bids(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
    query: ListQuery,
) -> Result<Json<ApiResponse<Vec<BidResponse>>>, ApiError> {
    let id = parse_object_id(&id, "advertisement")?;
    let status = parse_status::<BidStatus>(query.status.as_deref())?;
    let page = market
        .list_advertisement_bids(&auth.actor(), &id, status, query.page_request())
        .await?;

    Ok(Json(ApiResponse::paginated(page.map(BidResponse::from))))
}
