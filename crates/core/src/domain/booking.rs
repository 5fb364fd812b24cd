//! Car rentals, hotels and trip recommendations.
//!
//! All three share the same lifecycle: searchable rows with a `booked` flag
//! flipped by book/cancel and a small set of updatable fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RentalId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotelId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendationId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarRental {
    pub id: RentalId,
    pub name: String,
    pub location: String,
    pub price_tier: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub booked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub name: String,
    pub location: String,
    pub price_tier: String,
    pub checkin_date: NaiveDate,
    pub checkout_date: NaiveDate,
    pub booked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecommendation {
    pub id: RecommendationId,
    pub name: String,
    pub location: String,
    pub keywords: String,
    pub details: String,
    pub booked: bool,
}

/// Text filters narrow results; `price_tier` and the date range are accepted
/// for the model's benefit but do not constrain the query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaySearch {
    pub location: Option<String>,
    pub name: Option<String>,
    pub price_tier: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TripSearch {
    pub location: Option<String>,
    pub name: Option<String>,
    pub keywords: Vec<String>,
}

impl TripSearch {
    pub fn with_keyword_list(mut self, raw: &str) -> Self {
        self.keywords = raw
            .split(',')
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_string)
            .collect();
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DateRangeUpdate {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRangeUpdate {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{DateRangeUpdate, TripSearch};

    #[test]
    fn keyword_list_is_split_and_trimmed() {
        let search = TripSearch::default().with_keyword_list(" art, museum ,,history");
        assert_eq!(search.keywords, vec!["art", "museum", "history"]);
    }

    #[test]
    fn empty_date_update_is_detected() {
        assert!(DateRangeUpdate::default().is_empty());
    }
}
