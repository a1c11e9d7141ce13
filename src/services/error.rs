use thiserror::Error;

use crate::db::StoreError;

pub type MarketResult<T> = Result<T, MarketError>;

/// Business-rule failures raised by the marketplace engine.
///
/// Every variant maps to a stable wire code (see [`MarketError::code`]) so the
/// frontend can branch on it without parsing messages.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("You do not have permission to perform this action")]
    NotOwner,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("You have already placed a bid on this advertisement")]
    AlreadyBid,

    #[error("This advertisement is not accepting bids")]
    AdvertisementClosed,

    #[error("Invalid terms: {0}")]
    InvalidTerms(String),

    #[error("Rating must be an integer between 1 and 5")]
    InvalidRating,

    #[error("A completed contract is required before leaving a review")]
    NotEligible,

    #[error("You have already reviewed this influencer for this advertisement")]
    DuplicateReview,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl MarketError {
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::NotOwner => "NOT_OWNER",
            MarketError::InvalidTransition(_) => "INVALID_TRANSITION",
            MarketError::AlreadyBid => "ALREADY_BID",
            MarketError::AdvertisementClosed => "ADVERTISEMENT_CLOSED",
            MarketError::InvalidTerms(_) => "INVALID_TERMS",
            MarketError::InvalidRating => "INVALID_RATING",
            MarketError::NotEligible => "NOT_ELIGIBLE",
            MarketError::DuplicateReview => "DUPLICATE_REVIEW",
            MarketError::NotFound(_) => "NOT_FOUND",
            MarketError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub(crate) fn transition(message: impl Into<String>) -> Self {
        MarketError::InvalidTransition(message.into())
    }
}

impl From<StoreError> for MarketError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => MarketError::InvalidTransition(reason),
            StoreError::Duplicate("bid") => MarketError::AlreadyBid,
            StoreError::Duplicate("review") => MarketError::DuplicateReview,
            StoreError::Duplicate(what) => {
                MarketError::InvalidTransition(format!("{} already exists", what))
            }
            StoreError::Backend(reason) => MarketError::Storage(reason),
        }
    }
}
