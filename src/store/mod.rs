use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::model::booking::Booking;
use crate::model::car::{Car, CarQuery, CreateCarRequest};
use crate::model::notification::{Notification, NotificationEvent};
use crate::model::reservation::Reservation;
use crate::model::user::User;

pub mod memory;
pub mod postgres;
pub mod seed;

/// Fleet repository. `set_availability` is reserved for the lifecycle
/// manager; route handlers never call it directly.
#[async_trait]
pub trait CarStore: Send + Sync {
    async fn create(&self, car: CreateCarRequest) -> AppResult<Car>;
    async fn update(&self, car: Car) -> AppResult<Car>;
    async fn delete(&self, car_id: i32) -> AppResult<()>;
    async fn find_by_id(&self, car_id: i32) -> AppResult<Option<Car>>;
    async fn list(&self, query: &CarQuery) -> AppResult<(Vec<Car>, i64)>;
    async fn set_availability(&self, car_id: i32, available: bool) -> AppResult<()>;
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn create(&self, reservation: Reservation) -> AppResult<Reservation>;
    async fn update(&self, reservation: Reservation) -> AppResult<Reservation>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>>;
    async fn list_all(&self) -> AppResult<Vec<Reservation>>;
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Reservation>>;
    async fn list_by_car(&self, car_id: i32) -> AppResult<Vec<Reservation>>;
    /// Persist a whole swept set in one pass; used only by the
    /// expiration sweep after it detected a change.
    async fn replace_all(&self, reservations: Vec<Reservation>) -> AppResult<()>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create(&self, booking: Booking) -> AppResult<Booking>;
    async fn update(&self, booking: Booking) -> AppResult<Booking>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>>;
    async fn list_all(&self) -> AppResult<Vec<Booking>>;
}

/// Append-only event log keyed by optional recipient. `None` targets
/// the staff broadcast feed.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn publish(&self, event: NotificationEvent) -> AppResult<Notification>;
    async fn list_for(&self, recipient: Option<Uuid>) -> AppResult<Vec<Notification>>;
    async fn unread_count_for(&self, recipient: Option<Uuid>) -> AppResult<i64>;
    async fn mark_read(&self, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_credentials(&self, username: &str, password: &str)
        -> AppResult<Option<User>>;
}

/// The repository bundle handed to the router and the lifecycle
/// manager. In production every handle points at Postgres; in demo
/// mode they all share one in-memory store.
#[derive(Clone)]
pub struct Stores {
    pub cars: Arc<dyn CarStore>,
    pub reservations: Arc<dyn ReservationStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub users: Arc<dyn UserStore>,
}
