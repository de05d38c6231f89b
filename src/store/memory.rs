use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::booking::Booking;
use crate::model::car::{Car, CarQuery, CreateCarRequest};
use crate::model::notification::{Notification, NotificationEvent};
use crate::model::reservation::Reservation;
use crate::model::user::User;
use crate::store::{seed, BookingStore, CarStore, NotificationStore, ReservationStore, Stores, UserStore};

const CARS_KEY: &str = "pahiramcar_cars";
const RESERVATIONS_KEY: &str = "pahiramcar_reservations";
const BOOKINGS_KEY: &str = "pahiramcar_bookings";
const NOTIFICATIONS_KEY: &str = "pahiramcar_notifications";
const USERS_KEY: &str = "pahiramcar_users";

/// Demo-mode store: every collection is a vector behind an `RwLock`,
/// optionally snapshotted to one JSON file per named key after each
/// write. A corrupt snapshot falls back to the seed dataset instead of
/// failing startup.
pub struct MemoryStore {
    cars: RwLock<Vec<Car>>,
    reservations: RwLock<Vec<Reservation>>,
    bookings: RwLock<Vec<Booking>>,
    notifications: RwLock<Vec<Notification>>,
    users: RwLock<Vec<User>>,
    persist_dir: Option<PathBuf>,
}

impl MemoryStore {
    /// Fresh store seeded with the demo fleet, nothing persisted.
    pub fn demo() -> Self {
        MemoryStore {
            cars: RwLock::new(seed::demo_fleet()),
            reservations: RwLock::new(Vec::new()),
            bookings: RwLock::new(Vec::new()),
            notifications: RwLock::new(Vec::new()),
            users: RwLock::new(Vec::new()),
            persist_dir: None,
        }
    }

    /// Store that snapshots each collection under `dir`, loading any
    /// existing snapshots first.
    pub fn with_persistence(dir: PathBuf) -> Self {
        let cars = load_collection(&dir, CARS_KEY).unwrap_or_else(seed::demo_fleet);
        let reservations = load_collection(&dir, RESERVATIONS_KEY).unwrap_or_default();
        let bookings = load_collection(&dir, BOOKINGS_KEY).unwrap_or_default();
        let notifications = load_collection(&dir, NOTIFICATIONS_KEY).unwrap_or_default();
        let users = load_collection(&dir, USERS_KEY).unwrap_or_default();
        MemoryStore {
            cars: RwLock::new(cars),
            reservations: RwLock::new(reservations),
            bookings: RwLock::new(bookings),
            notifications: RwLock::new(notifications),
            users: RwLock::new(users),
            persist_dir: Some(dir),
        }
    }

    /// One shared instance behind every repository handle.
    pub fn into_stores(self: Arc<Self>) -> Stores {
        Stores {
            cars: self.clone(),
            reservations: self.clone(),
            bookings: self.clone(),
            notifications: self.clone(),
            users: self,
        }
    }

    fn snapshot<T: Serialize>(&self, key: &str, items: &[T]) {
        let Some(dir) = &self.persist_dir else {
            return;
        };
        // Persistence is best effort, like the original localStorage
        // write: a failed snapshot is logged, never surfaced.
        let path = dir.join(format!("{key}.json"));
        match serde_json::to_vec_pretty(items) {
            Ok(bytes) => {
                if let Err(err) = std::fs::write(&path, bytes) {
                    tracing::warn!("failed to persist {key}: {err}");
                }
            }
            Err(err) => tracing::warn!("failed to serialize {key}: {err}"),
        }
    }
}

fn load_collection<T: DeserializeOwned>(dir: &Path, key: &str) -> Option<Vec<T>> {
    let path = dir.join(format!("{key}.json"));
    let bytes = std::fs::read(&path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(items) => Some(items),
        Err(err) => {
            tracing::warn!("corrupt snapshot {}: {err}; falling back to seed data", path.display());
            None
        }
    }
}

#[async_trait]
impl CarStore for MemoryStore {
    async fn create(&self, car: CreateCarRequest) -> AppResult<Car> {
        let mut cars = self.cars.write().await;
        let id = cars.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let car = Car {
            id,
            name: car.name,
            car_type: car.car_type,
            price_per_day: car.price_per_day,
            seats: car.seats,
            transmission: car.transmission,
            fuel_type: car.fuel_type,
            plate_number: car.plate_number,
            year: car.year,
            description: car.description,
            image_url: car.image_url,
            images: car.images,
            available: true,
        };
        cars.push(car.clone());
        self.snapshot(CARS_KEY, &cars);
        Ok(car)
    }

    async fn update(&self, car: Car) -> AppResult<Car> {
        let mut cars = self.cars.write().await;
        let slot = cars
            .iter_mut()
            .find(|c| c.id == car.id)
            .ok_or(AppError::NotFound("Car"))?;
        *slot = car.clone();
        self.snapshot(CARS_KEY, &cars);
        Ok(car)
    }

    async fn delete(&self, car_id: i32) -> AppResult<()> {
        let mut cars = self.cars.write().await;
        let before = cars.len();
        cars.retain(|c| c.id != car_id);
        if cars.len() == before {
            return Err(AppError::NotFound("Car"));
        }
        self.snapshot(CARS_KEY, &cars);
        Ok(())
    }

    async fn find_by_id(&self, car_id: i32) -> AppResult<Option<Car>> {
        let cars = self.cars.read().await;
        Ok(cars.iter().find(|c| c.id == car_id).cloned())
    }

    async fn list(&self, query: &CarQuery) -> AppResult<(Vec<Car>, i64)> {
        let cars = self.cars.read().await;
        let filtered: Vec<Car> = cars
            .iter()
            .filter(|c| match &query.car_type {
                Some(car_type) => c.car_type.eq_ignore_ascii_case(car_type),
                None => true,
            })
            .filter(|c| !query.available_only.unwrap_or(false) || c.available)
            .cloned()
            .collect();
        let total = filtered.len() as i64;
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = ((page - 1) * limit) as usize;
        let page_items = filtered.into_iter().skip(offset).take(limit as usize).collect();
        Ok((page_items, total))
    }

    async fn set_availability(&self, car_id: i32, available: bool) -> AppResult<()> {
        let mut cars = self.cars.write().await;
        let car = cars
            .iter_mut()
            .find(|c| c.id == car_id)
            .ok_or(AppError::NotFound("Car"))?;
        car.available = available;
        self.snapshot(CARS_KEY, &cars);
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn create(&self, reservation: Reservation) -> AppResult<Reservation> {
        let mut reservations = self.reservations.write().await;
        reservations.push(reservation.clone());
        self.snapshot(RESERVATIONS_KEY, &reservations);
        Ok(reservation)
    }

    async fn update(&self, reservation: Reservation) -> AppResult<Reservation> {
        let mut reservations = self.reservations.write().await;
        let slot = reservations
            .iter_mut()
            .find(|r| r.id == reservation.id)
            .ok_or(AppError::NotFound("Reservation"))?;
        *slot = reservation.clone();
        self.snapshot(RESERVATIONS_KEY, &reservations);
        Ok(reservation)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        let reservations = self.reservations.read().await;
        Ok(reservations.iter().find(|r| r.id == id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Reservation>> {
        Ok(self.reservations.read().await.clone())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Reservation>> {
        let reservations = self.reservations.read().await;
        Ok(reservations.iter().filter(|r| r.user_id == user_id).cloned().collect())
    }

    async fn list_by_car(&self, car_id: i32) -> AppResult<Vec<Reservation>> {
        let reservations = self.reservations.read().await;
        Ok(reservations.iter().filter(|r| r.car_id == car_id).cloned().collect())
    }

    async fn replace_all(&self, replacement: Vec<Reservation>) -> AppResult<()> {
        let mut reservations = self.reservations.write().await;
        *reservations = replacement;
        self.snapshot(RESERVATIONS_KEY, &reservations);
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn create(&self, booking: Booking) -> AppResult<Booking> {
        let mut bookings = self.bookings.write().await;
        bookings.push(booking.clone());
        self.snapshot(BOOKINGS_KEY, &bookings);
        Ok(booking)
    }

    async fn update(&self, booking: Booking) -> AppResult<Booking> {
        let mut bookings = self.bookings.write().await;
        let slot = bookings
            .iter_mut()
            .find(|b| b.id == booking.id)
            .ok_or(AppError::NotFound("Booking"))?;
        *slot = booking.clone();
        self.snapshot(BOOKINGS_KEY, &bookings);
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Booking>> {
        Ok(self.bookings.read().await.clone())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn publish(&self, event: NotificationEvent) -> AppResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            kind: event.kind,
            title: event.title,
            message: event.message,
            data: event.data,
            user_id: event.user_id,
            read: false,
            created_at: Utc::now(),
        };
        let mut notifications = self.notifications.write().await;
        notifications.push(notification.clone());
        self.snapshot(NOTIFICATIONS_KEY, &notifications);
        Ok(notification)
    }

    async fn list_for(&self, recipient: Option<Uuid>) -> AppResult<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut matching: Vec<Notification> = notifications
            .iter()
            .filter(|n| n.user_id == recipient)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn unread_count_for(&self, recipient: Option<Uuid>) -> AppResult<i64> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| n.user_id == recipient && !n.read)
            .count() as i64)
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<()> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(AppError::NotFound("Notification"))?;
        notification.read = true;
        self.snapshot(NOTIFICATIONS_KEY, &notifications);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                user.username
            )));
        }
        users.push(user.clone());
        self.snapshot(USERS_KEY, &users);
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.username == username && u.password_hash == password)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_store_starts_with_the_seed_fleet() {
        let store = MemoryStore::demo();
        let (cars, total) = store.list(&CarQuery::default()).await.unwrap();
        assert_eq!(total, 6);
        assert!(cars.iter().all(|c| c.available));
    }

    #[tokio::test]
    async fn list_filters_by_type_and_availability() {
        let store = MemoryStore::demo();
        store.set_availability(3, false).await.unwrap();
        let query = CarQuery {
            car_type: Some("SUV".into()),
            available_only: Some(true),
            ..CarQuery::default()
        };
        let (cars, total) = store.list(&query).await.unwrap();
        assert_eq!(total, 2);
        assert!(cars.iter().all(|c| c.car_type == "SUV" && c.id != 3));
    }

    #[tokio::test]
    async fn snapshots_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::with_persistence(dir.path().to_path_buf());
        store.set_availability(1, false).await.unwrap();
        drop(store);

        let reopened = MemoryStore::with_persistence(dir.path().to_path_buf());
        let car = CarStore::find_by_id(&reopened, 1).await.unwrap().unwrap();
        assert!(!car.available);
    }

    #[tokio::test]
    async fn corrupt_snapshot_falls_back_to_the_seed_fleet() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pahiramcar_cars.json"), b"{not json").unwrap();
        let store = MemoryStore::with_persistence(dir.path().to_path_buf());
        let (_, total) = store.list(&CarQuery::default()).await.unwrap();
        assert_eq!(total, 6);
    }
}
