use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::mess::{Mess, MessListing};
use crate::infra::db::Db;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Clone)]
pub struct MessService {
    db: Db,
}

pub struct NewMess {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rate_breakfast: i32,
    pub rate_lunch: i32,
    pub rate_dinner: i32,
}

impl MessService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(&self, owner_id: Uuid, new: NewMess) -> Result<Mess> {
        let row = sqlx::query(
            "INSERT INTO messes \
             (owner_id, name, description, address, latitude, longitude, \
              rate_breakfast, rate_lunch, rate_dinner) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, owner_id, name, description, address, latitude, longitude, \
                       rate_breakfast, rate_lunch, rate_dinner, created_at",
        )
        .bind(owner_id)
        .bind(new.name)
        .bind(new.description)
        .bind(new.address)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(new.rate_breakfast)
        .bind(new.rate_lunch)
        .bind(new.rate_dinner)
        .fetch_one(self.db.pool())
        .await?;

        Ok(mess_from_row(&row))
    }

    pub async fn get(&self, mess_id: Uuid) -> Result<Option<Mess>> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, description, address, latitude, longitude, \
                    rate_breakfast, rate_lunch, rate_dinner, created_at \
             FROM messes WHERE id = $1",
        )
        .bind(mess_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| mess_from_row(&row)))
    }

    pub async fn update(
        &self,
        mess_id: Uuid,
        owner_id: Uuid,
        description: Option<String>,
        address: Option<String>,
        rate_breakfast: Option<i32>,
        rate_lunch: Option<i32>,
        rate_dinner: Option<i32>,
    ) -> Result<Option<Mess>> {
        let row = sqlx::query(
            "UPDATE messes \
             SET description = COALESCE($3, description), \
                 address = COALESCE($4, address), \
                 rate_breakfast = COALESCE($5, rate_breakfast), \
                 rate_lunch = COALESCE($6, rate_lunch), \
                 rate_dinner = COALESCE($7, rate_dinner) \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING id, owner_id, name, description, address, latitude, longitude, \
                       rate_breakfast, rate_lunch, rate_dinner, created_at",
        )
        .bind(mess_id)
        .bind(owner_id)
        .bind(description)
        .bind(address)
        .bind(rate_breakfast)
        .bind(rate_lunch)
        .bind(rate_dinner)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| mess_from_row(&row)))
    }

    /// Lists messes, closest first when the caller supplied a position.
    /// Plain in-process sort over the fetched page; there is no geo index.
    pub async fn list(&self, near: Option<(f64, f64)>, limit: i64) -> Result<Vec<MessListing>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, name, description, address, latitude, longitude, \
                    rate_breakfast, rate_lunch, rate_dinner, created_at \
             FROM messes ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut listings: Vec<MessListing> = rows
            .iter()
            .map(|row| {
                let mess = mess_from_row(row);
                let distance_km = near
                    .map(|(lat, lng)| haversine_km(lat, lng, mess.latitude, mess.longitude));
                MessListing { mess, distance_km }
            })
            .collect();

        if near.is_some() {
            listings.sort_by(|a, b| {
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        Ok(listings)
    }
}

fn mess_from_row(row: &PgRow) -> Mess {
    Mess {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        description: row.get("description"),
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        rate_breakfast: row.get("rate_breakfast"),
        rate_lunch: row.get("rate_lunch"),
        rate_dinner: row.get("rate_dinner"),
        created_at: row.get("created_at"),
    }
}

/// Great-circle distance between two WGS84 points.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
