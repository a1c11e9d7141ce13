use rocket::serde::json::Json;
use rocket_okapi::openapi;
use serde::Serialize;
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::utils::ApiResponse;

#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

#[openapi(tag = "Health")]
#[get("/health")]
pub fn health() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}
