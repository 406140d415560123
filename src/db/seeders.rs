//! Database seeders for demo data.
//!
//! Inserts a set of sample trains with fare classes so a fresh install has
//! something to search and book against. Existing rows are left alone, so
//! reseeding never resets live seat counters.

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::info;

use super::models::serialize_json_list;

/// Seat share and price multiplier per fare class on seeded trains.
const CLASS_SPLIT: &[(&str, f64, f64)] = &[
    ("AC", 0.2, 1.5),
    ("Sleeper", 0.5, 1.0),
    ("Seater", 0.3, 0.8),
];

/// Seed sample trains (skips trains whose number already exists).
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<()> {
    info!("Seeding sample trains...");

    // Format: (number, name, origin, destination, days_out, dep_hour, dep_min, journey_minutes, total_seats, amenities)
    let trains: Vec<(&str, &str, &str, &str, i64, u32, u32, i64, i64, Vec<&str>)> = vec![
        (
            "RAJ001",
            "Rajdhani Express",
            "New Delhi",
            "Mumbai Central",
            5,
            8,
            0,
            750,
            300,
            vec!["WiFi", "Food", "Charging", "Blanket"],
        ),
        (
            "SHT002",
            "Shatabdi Express",
            "Chennai Central",
            "Bangalore City",
            5,
            6,
            0,
            330,
            200,
            vec!["WiFi", "Food", "Charging"],
        ),
        (
            "DUR003",
            "Duronto Express",
            "Kolkata",
            "New Delhi",
            5,
            18,
            45,
            1050,
            400,
            vec!["Food", "Blanket", "Pillow"],
        ),
        (
            "GAR004",
            "Garib Rath",
            "Mumbai Central",
            "Ahmedabad",
            6,
            14,
            20,
            505,
            250,
            vec!["Charging"],
        ),
        (
            "JAN005",
            "Jan Shatabdi",
            "Pune",
            "Mumbai Central",
            6,
            7,
            15,
            195,
            150,
            vec!["WiFi", "Charging"],
        ),
    ];

    let mut seeded = 0;
    for (number, name, origin, destination, days_out, dep_hour, dep_min, journey_minutes, total_seats, amenities) in
        trains
    {
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM trains WHERE train_number = ?")
                .bind(number)
                .fetch_optional(pool)
                .await?;
        if existing.is_some() {
            continue;
        }

        // Schedule relative to today so seeded trains stay bookable
        let day = Utc::now().date_naive() + Duration::days(days_out);
        let departure = match day.and_hms_opt(dep_hour, dep_min, 0) {
            Some(dt) => dt.and_utc(),
            None => continue,
        };
        let arrival = departure + Duration::minutes(journey_minutes);

        let train_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO trains
            (id, train_name, train_number, origin, destination, departure_time, arrival_time,
             total_seats, available_seats, status, amenities, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?, ?)
            "#,
        )
        .bind(&train_id)
        .bind(name)
        .bind(number)
        .bind(origin)
        .bind(destination)
        .bind(departure.to_rfc3339())
        .bind(arrival.to_rfc3339())
        .bind(total_seats)
        .bind(total_seats)
        .bind(serialize_json_list(&amenities))
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        for (class_type, share, multiplier) in CLASS_SPLIT {
            let seats = (total_seats as f64 * share).round() as i64;
            if seats == 0 {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO fare_classes
                (id, train_id, class_type, total_seats, available_seats, price_multiplier)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&train_id)
            .bind(class_type)
            .bind(seats)
            .bind(seats)
            .bind(multiplier)
            .execute(pool)
            .await?;
        }

        seeded += 1;
    }

    info!("Seeded {} sample trains", seeded);
    Ok(())
}
