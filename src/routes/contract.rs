use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use crate::guards::AuthGuard;
use crate::models::{ContractResponse, ContractStatus};
use crate::routes::ListQuery;
use crate::services::Marketplace;
use crate::utils::validation::{parse_object_id, parse_status};
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Contracts")]
#[patch("/contracts/<id>/complete")]
pub async fn complete_contract(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<ContractResponse>>, ApiError> {
    let id = parse_object_id(&id, "contract")?;
    let contract = market.complete_contract(&auth.actor(), &id).await?;
    Ok(Json(ApiResponse::success_with_message("Contract completed", contract.into())))
}

#[openapi(tag = "Contracts")]
#[patch("/contracts/<id>/cancel")]
pub async fn cancel_contract(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<ContractResponse>>, ApiError> {
    let id = parse_object_id(&id, "contract")?;
    let contract = market.cancel_contract(&auth.actor(), &id).await?;
    Ok(Json(ApiResponse::success_with_message("Contract cancelled", contract.into())))
}

#[openapi(tag = "Contracts")]
#[patch("/contracts/<id>/dispute")]
pub async fn dispute_contract(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<ContractResponse>>, ApiError> {
    let id = parse_object_id(&id, "contract")?;
    let contract = market.dispute_contract(&auth.actor(), &id).await?;
    Ok(Json(ApiResponse::success_with_message("Contract disputed", contract.into())))
}

#[openapi(tag = "Contracts")]
#[get("/contracts/my-contracts?<query..>")]
pub async fn my_contracts(
    market: &State<Marketplace>,
    auth: AuthGuard,
    query: ListQuery,
) -> Result<Json<ApiResponse<Vec<ContractResponse>>>, ApiError> {
    let status = parse_status::<ContractStatus>(query.status.as_deref())?;
    let page = market
        .list_my_contracts(&auth.actor(), status, query.page_request())
        .await?;

    Ok(Json(ApiResponse::paginated(page.map(ContractResponse::from))))
}

#[openapi(tag = "Contracts")]
#[get("/contracts/<id>")]
pub async fn get_contract(
    market: &State<Marketplace>,
    auth: AuthGuard,
    id: String,
) -> Result<Json<ApiResponse<ContractResponse>>, ApiError> {
    let id = parse_object_id(&id, "contract")?;
    let contract = market.get_contract(&auth.actor(), &id).await?;
    Ok(Json(ApiResponse::success(contract.into())))
}
