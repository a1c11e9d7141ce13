use mongodb::bson::oid::ObjectId;
use std::str::FromStr;

use crate::services::MarketError;
use crate::utils::ApiError;

/// Longest delivery window a bid may propose (ten years).
pub const MAX_DELIVERY_DAYS: i32 = 3650;

pub fn parse_object_id(raw: &str, label: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| ApiError::invalid_id(format!("Invalid {} ID", label)))
}

/// Optional `?status=` filter; unknown values are a 400 rather than an empty list.
pub fn parse_status<S>(raw: Option<&str>) -> Result<Option<S>, ApiError>
where
    S: FromStr<Err = String>,
{
    raw.filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .transpose()
        .map_err(ApiError::bad_request)
}

pub fn validate_bid_terms(proposed_price: f64, delivery_days: i32, proposal: &str) -> Result<(), MarketError> {
    if !proposed_price.is_finite() || proposed_price <= 0.0 {
        return Err(MarketError::InvalidTerms("Proposed price must be greater than zero".into()));
    }
    if !(1..=MAX_DELIVERY_DAYS).contains(&delivery_days) {
        return Err(MarketError::InvalidTerms(format!(
            "Delivery days must be between 1 and {}",
            MAX_DELIVERY_DAYS
        )));
    }
    if proposal.trim().is_empty() {
        return Err(MarketError::InvalidTerms("Proposal is required".into()));
    }
    Ok(())
}

pub fn validate_budget(budget_min: f64, budget_max: f64) -> Result<(), MarketError> {
    if !budget_min.is_finite() || !budget_max.is_finite() || budget_min <= 0.0 {
        return Err(MarketError::InvalidTerms("Budget must be greater than zero".into()));
    }
    if budget_min > budget_max {
        return Err(MarketError::InvalidTerms("Minimum budget cannot exceed maximum budget".into()));
    }
    Ok(())
}

/// Ratings arrive as JSON numbers; only the whole numbers 1 through 5 are accepted.
pub fn validate_rating(rating: f64) -> Result<i32, MarketError> {
    if rating.fract() != 0.0 || !(1.0..=5.0).contains(&rating) {
        return Err(MarketError::InvalidRating);
    }
    Ok(rating as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bid_terms() {
        assert!(validate_bid_terms(200.0, 5, "a reel and two stories").is_ok());
        assert!(matches!(validate_bid_terms(0.0, 5, "x"), Err(MarketError::InvalidTerms(_))));
        assert!(matches!(validate_bid_terms(-1.0, 5, "x"), Err(MarketError::InvalidTerms(_))));
        assert!(matches!(validate_bid_terms(f64::NAN, 5, "x"), Err(MarketError::InvalidTerms(_))));
        assert!(matches!(validate_bid_terms(10.0, 0, "x"), Err(MarketError::InvalidTerms(_))));
        assert!(matches!(validate_bid_terms(10.0, 1, "   "), Err(MarketError::InvalidTerms(_))));
    }

    #[test]
    fn delivery_window_is_bounded() {
        assert!(validate_bid_terms(10.0, MAX_DELIVERY_DAYS, "x").is_ok());
        for days in [MAX_DELIVERY_DAYS + 1, i32::MAX] {
            assert!(matches!(validate_bid_terms(10.0, days, "x"), Err(MarketError::InvalidTerms(_))));
        }
    }

    #[test]
    fn budget() {
        assert!(validate_budget(100.0, 500.0).is_ok());
        assert!(validate_budget(100.0, 100.0).is_ok());
        assert!(validate_budget(600.0, 500.0).is_err());
        assert!(validate_budget(0.0, 500.0).is_err());
    }

    #[test]
    fn rating_bounds() {
        assert_eq!(validate_rating(1.0).unwrap(), 1);
        assert_eq!(validate_rating(5.0).unwrap(), 5);
        for bad in [0.0, 6.0, -3.0, 4.5, 1e12, f64::NAN, f64::INFINITY] {
            assert!(matches!(validate_rating(bad), Err(MarketError::InvalidRating)), "{}", bad);
        }
    }

    #[test]
    fn object_ids() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex(), "bid").ok(), Some(id));
        assert!(parse_object_id("not-an-id", "bid").is_err());
    }

    #[test]
    fn status_filters() {
        use crate::models::BidStatus;

        assert_eq!(parse_status::<BidStatus>(None).unwrap(), None);
        assert_eq!(parse_status::<BidStatus>(Some("")).unwrap(), None);
        assert_eq!(parse_status::<BidStatus>(Some("shortlisted")).unwrap(), Some(BidStatus::Shortlisted));
        let err = parse_status::<BidStatus>(Some("WON")).unwrap_err();
        assert_eq!(err.code, "BAD_REQUEST");
    }
}
