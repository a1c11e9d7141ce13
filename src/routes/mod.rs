pub mod advertisement;
pub mod bid;
pub mod contract;
pub mod health;
pub mod review;

use crate::utils::PageRequest;

/// `?status=&page=&limit=` on the list endpoints.
#[derive(FromForm, serde::Deserialize, rocket_okapi::okapi::schemars::JsonSchema)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}
