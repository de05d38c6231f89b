use serde::{Deserialize, Serialize};

/// A car in the rental fleet. `available` is written only by the
/// lifecycle manager; admin edits never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: i32,
    pub name: String,
    pub car_type: String,
    pub price_per_day: i32,
    pub seats: i32,
    pub transmission: String,
    pub fuel_type: String,
    pub plate_number: String,
    pub year: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateCarRequest {
    pub name: String,
    pub car_type: String,
    pub price_per_day: i32,
    pub seats: i32,
    pub transmission: String,
    pub fuel_type: String,
    pub plate_number: String,
    pub year: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

// No `available` field on purpose: availability belongs to the
// lifecycle manager, not to the admin edit form.
#[derive(Debug, Deserialize)]
pub struct UpdateCarRequest {
    pub name: Option<String>,
    pub car_type: Option<String>,
    pub price_per_day: Option<i32>,
    pub seats: Option<i32>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub plate_number: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCarImagesRequest {
    pub image_url: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CarQuery {
    pub page: Option<i32>,
    pub limit: Option<i32>,
    pub car_type: Option<String>,
    pub available_only: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CarListResponse {
    pub cars: Vec<Car>,
    pub total: i64,
    pub page: i32,
    pub limit: i32,
}

impl Car {
    pub fn apply_update(&mut self, update: UpdateCarRequest) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(car_type) = update.car_type {
            self.car_type = car_type;
        }
        if let Some(price_per_day) = update.price_per_day {
            self.price_per_day = price_per_day;
        }
        if let Some(seats) = update.seats {
            self.seats = seats;
        }
        if let Some(transmission) = update.transmission {
            self.transmission = transmission;
        }
        if let Some(fuel_type) = update.fuel_type {
            self.fuel_type = fuel_type;
        }
        if let Some(plate_number) = update.plate_number {
            self.plate_number = plate_number;
        }
        if let Some(year) = update.year {
            self.year = year;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if update.image_url.is_some() {
            self.image_url = update.image_url;
        }
    }
}
