use std::sync::Arc;

use mongodb::bson::oid::ObjectId;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use serde_json::{Value, json};

use collabmarket::db::MemoryStore;
use collabmarket::models::Role;
use collabmarket::services::{JwtService, Marketplace, RecordingHook};

struct User {
    id: ObjectId,
    token: String,
}

impl User {
    fn new(role: Role) -> Self {
        let id = ObjectId::new();
        let token = JwtService::generate_access_token(&id, role).expect("token");
        User { id, token }
    }

    fn auth(&self) -> Header<'static> {
        Header::new("Authorization", format!("Bearer {}", self.token))
    }
}

async fn client() -> (Client, Arc<RecordingHook>) {
    let hook = Arc::new(RecordingHook::new());
    let market = Marketplace::new(Arc::new(MemoryStore::new()), hook.clone());
    let client = Client::tracked(collabmarket::build_with(market))
        .await
        .expect("valid rocket instance");
    (client, hook)
}

async fn body(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().await.expect("json body")
}

async fn create_ad(client: &Client, owner: &User) -> String {
    let deadline = chrono::Utc::now() + chrono::Duration::days(10);
    let response = client
        .post("/api/advertisements")
        .header(ContentType::JSON)
        .header(owner.auth())
        .body(
            json!({
                "title": "Autumn drop",
                "budgetMin": 100.0,
                "budgetMax": 500.0,
                "deadline": deadline.to_rfc3339(),
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    body(response).await["data"]["id"].as_str().expect("ad id").to_string()
}

async fn submit_bid<'c>(client: &'c Client, influencer: &User, ad_id: &str, price: f64, days: i32) -> LocalResponse<'c> {
    client
        .post("/api/bids")
        .header(ContentType::JSON)
        .header(influencer.auth())
        .body(
            json!({
                "advertisementId": ad_id,
                "proposedPrice": price,
                "proposal": "Two reels and a story",
                "deliveryDays": days,
            })
            .to_string(),
        )
        .dispatch()
        .await
}

#[rocket::async_test]
async fn health_is_public() {
    let (client, _) = client().await;
    let response = client.get("/api/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(body(response).await["data"]["status"], "ok");
}

#[rocket::async_test]
async fn missing_token_is_unauthorized() {
    let (client, _) = client().await;
    let response = client.get("/api/bids/my-bids").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);

    let json = body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[rocket::async_test]
async fn full_engagement_lifecycle() {
    let (client, hook) = client().await;
    let brand = User::new(Role::Client);
    let creator = User::new(Role::Influencer);
    let rival = User::new(Role::Influencer);

    let ad_id = create_ad(&client, &brand).await;

    // Scenario A
    let first = submit_bid(&client, &creator, &ad_id, 200.0, 5).await;
    assert_eq!(first.status(), Status::Ok);
    let bid = body(first).await;
    assert_eq!(bid["data"]["status"], "PENDING");
    let bid_id = bid["data"]["id"].as_str().unwrap().to_string();

    let duplicate = submit_bid(&client, &creator, &ad_id, 180.0, 4).await;
    assert_eq!(duplicate.status(), Status::Conflict);
    assert_eq!(body(duplicate).await["code"], "ALREADY_BID");

    let other = body(submit_bid(&client, &rival, &ad_id, 300.0, 3).await).await;
    let other_id = other["data"]["id"].as_str().unwrap().to_string();

    // Scenario B
    let shortlisted = client
        .patch(format!("/api/bids/{}/shortlist", bid_id))
        .header(brand.auth())
        .dispatch()
        .await;
    assert_eq!(body(shortlisted).await["data"]["status"], "SHORTLISTED");

    let accepted = client
        .patch(format!("/api/bids/{}/accept", bid_id))
        .header(brand.auth())
        .dispatch()
        .await;
    assert_eq!(accepted.status(), Status::Ok);
    let accepted = body(accepted).await;
    assert_eq!(accepted["data"]["bid"]["status"], "ACCEPTED");
    assert_eq!(accepted["data"]["contract"]["agreedPrice"], 200.0);
    assert_eq!(accepted["data"]["contract"]["status"], "ACTIVE");
    let contract_id = accepted["data"]["contract"]["id"].as_str().unwrap().to_string();

    let ad = body(client.get(format!("/api/advertisements/{}", ad_id)).header(brand.auth()).dispatch().await).await;
    assert_eq!(ad["data"]["status"], "CLOSED");

    let sibling = body(client.get(format!("/api/bids/{}", other_id)).header(rival.auth()).dispatch().await).await;
    assert_eq!(sibling["data"]["status"], "REJECTED");

    let retry = client
        .patch(format!("/api/bids/{}/accept", bid_id))
        .header(brand.auth())
        .dispatch()
        .await;
    assert_eq!(retry.status(), Status::Conflict);
    assert_eq!(body(retry).await["code"], "INVALID_TRANSITION");

    // Scenario C
    let completed = client
        .patch(format!("/api/contracts/{}/complete", contract_id))
        .header(brand.auth())
        .dispatch()
        .await;
    let completed = body(completed).await;
    assert_eq!(completed["data"]["status"], "COMPLETED");
    assert!(completed["data"]["completedAt"].is_string());

    let review = client
        .post("/api/reviews")
        .header(ContentType::JSON)
        .header(brand.auth())
        .body(
            json!({
                "influencerId": creator.id.to_hex(),
                "advertisementId": ad_id,
                "rating": 5,
                "comment": "great",
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(review.status(), Status::Ok);
    assert_eq!(body(review).await["data"]["rating"], 5);

    let rating = body(
        client
            .get(format!("/api/reviews/influencer/{}/rating", creator.id.to_hex()))
            .dispatch()
            .await,
    )
    .await;
    assert_eq!(rating["data"]["averageRating"], 5.0);
    assert_eq!(rating["data"]["totalReviews"], 1);

    // Scenario E
    let cancel = client
        .patch(format!("/api/contracts/{}/cancel", contract_id))
        .header(brand.auth())
        .dispatch()
        .await;
    assert_eq!(cancel.status(), Status::Conflict);
    assert_eq!(body(cancel).await["code"], "INVALID_TRANSITION");

    let kinds = hook.kinds().await;
    assert!(kinds.contains(&"contract_created"));
    assert!(kinds.contains(&"review_submitted"));
}

#[rocket::async_test]
async fn review_without_completed_contract_is_not_eligible() {
    let (client, _) = client().await;
    let brand = User::new(Role::Client);
    let ad_id = create_ad(&client, &brand).await;

    let response = client
        .post("/api/reviews")
        .header(ContentType::JSON)
        .header(brand.auth())
        .body(
            json!({
                "influencerId": ObjectId::new().to_hex(),
                "advertisementId": ad_id,
                "rating": 4,
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    assert_eq!(body(response).await["code"], "NOT_ELIGIBLE");
}

#[rocket::async_test]
async fn strangers_cannot_touch_a_campaign() {
    let (client, _) = client().await;
    let brand = User::new(Role::Client);
    let stranger = User::new(Role::Client);
    let creator = User::new(Role::Influencer);

    let ad_id = create_ad(&client, &brand).await;
    let bid = body(submit_bid(&client, &creator, &ad_id, 150.0, 2).await).await;
    let bid_id = bid["data"]["id"].as_str().unwrap().to_string();

    let response = client
        .patch(format!("/api/bids/{}/accept", bid_id))
        .header(stranger.auth())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
    assert_eq!(body(response).await["code"], "NOT_OWNER");

    let close = client
        .patch(format!("/api/advertisements/{}/close", ad_id))
        .header(stranger.auth())
        .dispatch()
        .await;
    assert_eq!(close.status(), Status::Forbidden);
}

#[rocket::async_test]
async fn closed_campaign_refuses_bids() {
    let (client, _) = client().await;
    let brand = User::new(Role::Client);
    let ad_id = create_ad(&client, &brand).await;

    let close = client
        .patch(format!("/api/advertisements/{}/close", ad_id))
        .header(brand.auth())
        .dispatch()
        .await;
    assert_eq!(body(close).await["data"]["status"], "CLOSED");

    let late = submit_bid(&client, &User::new(Role::Influencer), &ad_id, 150.0, 2).await;
    assert_eq!(late.status(), Status::Conflict);
    assert_eq!(body(late).await["code"], "ADVERTISEMENT_CLOSED");
}

#[rocket::async_test]
async fn my_bids_paginates_and_validates_status() {
    let (client, _) = client().await;
    let brand = User::new(Role::Client);
    let creator = User::new(Role::Influencer);

    for _ in 0..3 {
        let ad_id = create_ad(&client, &brand).await;
        submit_bid(&client, &creator, &ad_id, 120.0, 3).await;
    }

    let page = body(
        client
            .get("/api/bids/my-bids?page=2&limit=2")
            .header(creator.auth())
            .dispatch()
            .await,
    )
    .await;
    assert_eq!(page["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["pagination"]["totalPages"], 2);

    let bad = client
        .get("/api/bids/my-bids?status=WON")
        .header(creator.auth())
        .dispatch()
        .await;
    assert_eq!(bad.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn malformed_ids_are_rejected() {
    let (client, _) = client().await;
    let brand = User::new(Role::Client);

    let response = client
        .patch("/api/bids/not-an-id/accept")
        .header(brand.auth())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(body(response).await["code"], "INVALID_ID");
}

#[rocket::async_test]
async fn fractional_or_huge_ratings_are_invalid() {
    let (client, _) = client().await;
    let brand = User::new(Role::Client);

    for rating in [json!(4.5), json!(1e12)] {
        let response = client
            .post("/api/reviews")
            .header(ContentType::JSON)
            .header(brand.auth())
            .body(
                json!({
                    "influencerId": ObjectId::new().to_hex(),
                    "advertisementId": ObjectId::new().to_hex(),
                    "rating": rating,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(body(response).await["code"], "INVALID_RATING");
    }
}

#[rocket::async_test]
async fn endless_delivery_window_is_invalid_terms() {
    let (client, _) = client().await;
    let brand = User::new(Role::Client);
    let ad_id = create_ad(&client, &brand).await;

    let response = submit_bid(&client, &User::new(Role::Influencer), &ad_id, 150.0, i32::MAX).await;
    assert_eq!(response.status(), Status::BadRequest);
    assert_eq!(body(response).await["code"], "INVALID_TERMS");
}

#[rocket::async_test]
async fn far_page_is_empty_not_an_error() {
    let (client, _) = client().await;
    let creator = User::new(Role::Influencer);

    let response = client
        .get(format!("/api/bids/my-bids?page={}&limit=100", i64::MAX))
        .header(creator.auth())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let json = body(response).await;
    assert_eq!(json["data"].as_array().map(Vec::len), Some(0));
    assert_eq!(json["pagination"]["total"], 0);
}
