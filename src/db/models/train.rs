//! Train and fare-class models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::parse_json_list;
use crate::utils::format_duration;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Train {
    pub id: String,
    pub train_name: String,
    pub train_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub total_seats: i64,
    pub available_seats: i64,
    pub status: String,
    /// JSON array of amenity tag strings
    pub amenities: Option<String>,
    /// Bumped on every seat-counter mutation
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FareClass {
    pub id: String,
    pub train_id: String,
    pub class_type: String,
    pub total_seats: i64,
    pub available_seats: i64,
    pub price_multiplier: f64,
}

impl Train {
    pub fn amenity_list(&self) -> Vec<String> {
        parse_json_list(self.amenities.as_deref())
    }

    pub fn departure(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.departure_time)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn arrival(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.arrival_time)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn duration_minutes(&self) -> i64 {
        match (self.departure(), self.arrival()) {
            (Some(dep), Some(arr)) => (arr - dep).num_minutes().max(0),
            _ => 0,
        }
    }

    /// Base fare: flat rate plus an hourly rate over whole journey hours,
    /// with a surcharge for the four metro stations.
    pub fn base_fare(&self) -> i64 {
        const BASE_PRICE: f64 = 100.0;
        const HOURLY_RATE: f64 = 50.0;
        const METRO_MULTIPLIER: f64 = 1.2;
        const METRO_STATIONS: [&str; 4] = ["Mumbai", "Delhi", "Bangalore", "Chennai"];

        let hours = (self.duration_minutes() / 60) as f64;
        let mut price = BASE_PRICE + hours * HOURLY_RATE;

        if METRO_STATIONS.contains(&self.origin.as_str())
            || METRO_STATIONS.contains(&self.destination.as_str())
        {
            price *= METRO_MULTIPLIER;
        }

        price.round() as i64
    }

    pub fn class_price(&self, multiplier: f64) -> i64 {
        (self.base_fare() as f64 * multiplier).round() as i64
    }

    /// Booked fraction as a percentage with one decimal place.
    pub fn occupancy_percentage(&self) -> f64 {
        occupancy(self.total_seats, self.available_seats)
    }
}

pub fn occupancy(total_seats: i64, available_seats: i64) -> f64 {
    if total_seats <= 0 {
        return 0.0;
    }
    let booked = (total_seats - available_seats) as f64;
    (booked / total_seats as f64 * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FareClassResponse {
    pub class_type: String,
    pub total_seats: i64,
    pub available_seats: i64,
    pub price: i64,
}

/// Response DTO with the derived journey fields the clients render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub id: String,
    pub train_name: String,
    pub train_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub total_seats: i64,
    pub available_seats: i64,
    pub status: String,
    pub amenities: Vec<String>,
    pub duration: String,
    pub duration_in_minutes: i64,
    pub price: i64,
    pub occupancy_percentage: f64,
    pub classes: Vec<FareClassResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl TrainResponse {
    pub fn from_train(train: Train, classes: Vec<FareClass>) -> Self {
        let minutes = train.duration_minutes();
        let classes = classes
            .into_iter()
            .map(|c| FareClassResponse {
                price: train.class_price(c.price_multiplier),
                class_type: c.class_type,
                total_seats: c.total_seats,
                available_seats: c.available_seats,
            })
            .collect();

        Self {
            duration: format_duration(minutes),
            duration_in_minutes: minutes,
            price: train.base_fare(),
            occupancy_percentage: train.occupancy_percentage(),
            amenities: train.amenity_list(),
            classes,
            id: train.id,
            train_name: train.train_name,
            train_number: train.train_number,
            origin: train.origin,
            destination: train.destination,
            departure_time: train.departure_time,
            arrival_time: train.arrival_time,
            total_seats: train.total_seats,
            available_seats: train.available_seats,
            status: train.status,
            created_at: train.created_at,
            updated_at: train.updated_at,
        }
    }
}

/// Compact embed for booking responses and tickets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainSummary {
    pub id: String,
    pub train_name: String,
    pub train_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
}

impl From<&Train> for TrainSummary {
    fn from(train: &Train) -> Self {
        Self {
            id: train.id.clone(),
            train_name: train.train_name.clone(),
            train_number: train.train_number.clone(),
            origin: train.origin.clone(),
            destination: train.destination.clone(),
            departure_time: train.departure_time.clone(),
            arrival_time: train.arrival_time.clone(),
            duration: format_duration(train.duration_minutes()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFareClassRequest {
    pub class_type: String,
    pub total_seats: i64,
    #[serde(default = "default_price_multiplier")]
    pub price_multiplier: f64,
}

fn default_price_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct CreateTrainRequest {
    pub train_name: String,
    pub train_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i64,
    #[serde(default)]
    pub classes: Vec<CreateFareClassRequest>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainPagination {
    pub total_pages: i64,
    pub current_page: i64,
    pub total_trains: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl TrainPagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let limit = limit.max(1);
        let total_pages = (total + limit - 1) / limit;
        Self {
            total_pages,
            current_page: page,
            total_trains: total,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// The unpaginated search endpoint reports everything as one page.
    pub fn single_page(total: i64) -> Self {
        Self {
            total_pages: 1,
            current_page: 1,
            total_trains: total,
            has_next: false,
            has_prev: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTrainRequest {
    pub train_name: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub total_seats: Option<i64>,
    pub status: Option<String>,
    pub amenities: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(origin: &str, destination: &str, dep: &str, arr: &str) -> Train {
        Train {
            id: "t1".to_string(),
            train_name: "Test Express".to_string(),
            train_number: "TST001".to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_time: dep.to_string(),
            arrival_time: arr.to_string(),
            total_seats: 100,
            available_seats: 40,
            status: "active".to_string(),
            amenities: None,
            version: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_duration_minutes() {
        let t = train(
            "Pune",
            "Goa",
            "2030-01-01T08:00:00Z",
            "2030-01-01T20:30:00Z",
        );
        assert_eq!(t.duration_minutes(), 750);
    }

    #[test]
    fn test_base_fare_plain_route() {
        // 12 whole hours: 100 + 12 * 50 = 700
        let t = train(
            "Pune",
            "Goa",
            "2030-01-01T08:00:00Z",
            "2030-01-01T20:30:00Z",
        );
        assert_eq!(t.base_fare(), 700);
    }

    #[test]
    fn test_base_fare_metro_surcharge() {
        // (100 + 12 * 50) * 1.2 = 840
        let t = train(
            "Mumbai",
            "Goa",
            "2030-01-01T08:00:00Z",
            "2030-01-01T20:30:00Z",
        );
        assert_eq!(t.base_fare(), 840);
    }

    #[test]
    fn test_metro_match_is_exact() {
        let t = train(
            "Mumbai Central",
            "Goa",
            "2030-01-01T08:00:00Z",
            "2030-01-01T20:30:00Z",
        );
        assert_eq!(t.base_fare(), 700);
    }

    #[test]
    fn test_occupancy_one_decimal() {
        assert_eq!(occupancy(100, 40), 60.0);
        assert_eq!(occupancy(3, 1), 66.7);
        assert_eq!(occupancy(0, 0), 0.0);
    }

    #[test]
    fn test_class_price_rounds() {
        let t = train(
            "Pune",
            "Goa",
            "2030-01-01T08:00:00Z",
            "2030-01-01T20:30:00Z",
        );
        assert_eq!(t.class_price(1.5), 1050);
        assert_eq!(t.class_price(0.75), 525);
    }
}
