pub mod pagination;
pub mod response;
pub mod time;
pub mod validation;

pub use pagination::{Page, PageRequest, Pagination};
pub use response::{ApiError, ApiResponse};
