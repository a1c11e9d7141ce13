#[macro_use]
extern crate rocket;

pub mod config;
pub mod db;
pub mod guards;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::serde::json::Json;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

use crate::config::Config;
use crate::services::Marketplace;
use crate::utils::ApiResponse;

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PATCH, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(400)]
fn bad_request() -> Json<ApiResponse<()>> {
    Json(ApiResponse::<()>::error("BAD_REQUEST", "Malformed request"))
}

#[catch(401)]
fn unauthorized() -> Json<ApiResponse<()>> {
    Json(ApiResponse::<()>::error("UNAUTHORIZED", "Missing or invalid bearer token"))
}

#[catch(404)]
fn not_found() -> Json<ApiResponse<()>> {
    Json(ApiResponse::<()>::error("NOT_FOUND", "Resource not found (check /api prefix)"))
}

#[catch(422)]
fn unprocessable() -> Json<ApiResponse<()>> {
    Json(ApiResponse::<()>::error("BAD_REQUEST", "Request body does not match the expected shape"))
}

#[catch(500)]
fn internal_error() -> Json<ApiResponse<()>> {
    Json(ApiResponse::<()>::error("INTERNAL_ERROR", "Internal server error"))
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/api/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- ASSEMBLY ----------------------------- */

fn mount(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(CORS)
        .mount("/", routes![options_handler])
        .mount(
            "/api",
            openapi_get_routes![
                // Health
                routes::health::health,
                // Advertisements
                routes::advertisement::create_advertisement,
                routes::advertisement::get_advertisement,
                routes::advertisement::close_advertisement,
                routes::advertisement::approve_advertisement,
                routes::advertisement::reject_advertisement,
                routes::advertisement::advertisement_bids,
                // Bids
                routes::bid::submit_bid,
                routes::bid::shortlist_bid,
                routes::bid::accept_bid,
                routes::bid::reject_bid,
                routes::bid::my_bids,
                routes::bid::get_bid,
                // Contracts
                routes::contract::complete_contract,
                routes::contract::cancel_contract,
                routes::contract::dispute_contract,
                routes::contract::my_contracts,
                routes::contract::get_contract,
                // Reviews
                routes::review::create_review,
                routes::review::influencer_reviews,
                routes::review::influencer_rating,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register(
            "/",
            catchers![bad_request, unauthorized, not_found, unprocessable, internal_error],
        )
}

/// Server configured from `Rocket.toml` / `ROCKET_*`; storage is chosen at ignite.
pub fn rocket() -> Rocket<Build> {
    mount(rocket::custom(Config::figment()).attach(db::init()))
}

/// Server around an already-built engine, used by the HTTP tests.
pub fn build_with(market: Marketplace) -> Rocket<Build> {
    mount(rocket::custom(Config::figment()).manage(market))
}
