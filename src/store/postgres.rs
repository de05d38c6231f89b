use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::booking::{Booking, BookingStatus, PaymentMethod, PaymentStatus};
use crate::model::car::{Car, CarQuery, CreateCarRequest};
use crate::model::notification::{Notification, NotificationEvent, NotificationKind};
use crate::model::reservation::{Reservation, ReservationStatus};
use crate::model::user::User;
use crate::store::{BookingStore, CarStore, NotificationStore, ReservationStore, Stores, UserStore};

/// Postgres-backed repositories. All queries are built at runtime with
/// positional binds; the schema lives in `schema.sql`.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn into_stores(self: Arc<Self>) -> Stores {
        Stores {
            cars: self.clone(),
            reservations: self.clone(),
            bookings: self.clone(),
            notifications: self.clone(),
            users: self,
        }
    }
}

fn decode_err(msg: String) -> AppError {
    AppError::Database(sqlx::Error::Decode(msg.into()))
}

fn car_from_row(row: &PgRow) -> AppResult<Car> {
    Ok(Car {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        car_type: row.try_get("car_type")?,
        price_per_day: row.try_get("price_per_day")?,
        seats: row.try_get("seats")?,
        transmission: row.try_get("transmission")?,
        fuel_type: row.try_get("fuel_type")?,
        plate_number: row.try_get("plate_number")?,
        year: row.try_get("year")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        images: row.try_get("images")?,
        available: row.try_get("available")?,
    })
}

fn reservation_from_row(row: &PgRow) -> AppResult<Reservation> {
    let status: String = row.try_get("status")?;
    Ok(Reservation {
        id: row.try_get("id")?,
        car_id: row.try_get("car_id")?,
        user_id: row.try_get("user_id")?,
        customer_name: row.try_get("customer_name")?,
        customer_contact: row.try_get("customer_contact")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        days: row.try_get("days")?,
        total_price: row.try_get("total_price")?,
        status: status.parse::<ReservationStatus>().map_err(decode_err)?,
        has_license_file: row.try_get("has_license_file")?,
        has_contract_file: row.try_get("has_contract_file")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
    })
}

fn booking_from_row(row: &PgRow) -> AppResult<Booking> {
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;
    let payment_method: Option<String> = row.try_get("payment_method")?;
    let payment_method = payment_method
        .map(|raw| serde_json::from_str::<PaymentMethod>(&raw))
        .transpose()
        .map_err(|e| decode_err(e.to_string()))?;
    Ok(Booking {
        id: row.try_get("id")?,
        reservation_id: row.try_get("reservation_id")?,
        car_id: row.try_get("car_id")?,
        customer_name: row.try_get("customer_name")?,
        customer_contact: row.try_get("customer_contact")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        total_price: row.try_get("total_price")?,
        status: status.parse::<BookingStatus>().map_err(decode_err)?,
        payment_status: payment_status.parse::<PaymentStatus>().map_err(decode_err)?,
        payment_method,
        license_id: row.try_get("license_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> AppResult<Notification> {
    let kind: String = row.try_get("kind")?;
    let data: String = row.try_get("data")?;
    Ok(Notification {
        id: row.try_get("id")?,
        kind: kind.parse::<NotificationKind>().map_err(decode_err)?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        data: serde_json::from_str(&data).map_err(|e| decode_err(e.to_string()))?,
        user_id: row.try_get("user_id")?,
        read: row.try_get("read")?,
        created_at: row.try_get("created_at")?,
    })
}

fn user_from_row(row: &PgRow) -> AppResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

const CAR_COLUMNS: &str = "id, name, car_type, price_per_day, seats, transmission, fuel_type, \
     plate_number, year, description, image_url, images, available";

const RESERVATION_COLUMNS: &str = "id, car_id, user_id, customer_name, customer_contact, \
     start_date, end_date, days, total_price, status, has_license_file, has_contract_file, \
     created_at, updated_at, cancelled_at";

const BOOKING_COLUMNS: &str = "id, reservation_id, car_id, customer_name, customer_contact, \
     start_date, end_date, total_price, status, payment_status, payment_method, license_id, \
     created_at, updated_at";

#[async_trait]
impl CarStore for PgStore {
    async fn create(&self, car: CreateCarRequest) -> AppResult<Car> {
        let row = sqlx::query(&format!(
            "INSERT INTO cars (name, car_type, price_per_day, seats, transmission, fuel_type, \
             plate_number, year, description, image_url, images, available) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE) \
             RETURNING {CAR_COLUMNS}"
        ))
        .bind(&car.name)
        .bind(&car.car_type)
        .bind(car.price_per_day)
        .bind(car.seats)
        .bind(&car.transmission)
        .bind(&car.fuel_type)
        .bind(&car.plate_number)
        .bind(car.year)
        .bind(&car.description)
        .bind(&car.image_url)
        .bind(&car.images)
        .fetch_one(&self.pool)
        .await?;
        car_from_row(&row)
    }

    async fn update(&self, car: Car) -> AppResult<Car> {
        let row = sqlx::query(&format!(
            "UPDATE cars SET name = $1, car_type = $2, price_per_day = $3, seats = $4, \
             transmission = $5, fuel_type = $6, plate_number = $7, year = $8, description = $9, \
             image_url = $10, images = $11 WHERE id = $12 RETURNING {CAR_COLUMNS}"
        ))
        .bind(&car.name)
        .bind(&car.car_type)
        .bind(car.price_per_day)
        .bind(car.seats)
        .bind(&car.transmission)
        .bind(&car.fuel_type)
        .bind(&car.plate_number)
        .bind(car.year)
        .bind(&car.description)
        .bind(&car.image_url)
        .bind(&car.images)
        .bind(car.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Car"))?;
        car_from_row(&row)
    }

    async fn delete(&self, car_id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(car_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Car"));
        }
        Ok(())
    }

    async fn find_by_id(&self, car_id: i32) -> AppResult<Option<Car>> {
        let row = sqlx::query(&format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = $1"))
            .bind(car_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(car_from_row).transpose()
    }

    async fn list(&self, query: &CarQuery) -> AppResult<(Vec<Car>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut where_clauses = Vec::new();
        let mut param_count = 1;
        if query.car_type.is_some() {
            where_clauses.push(format!("car_type = ${param_count}"));
            param_count += 1;
        }
        if query.available_only.unwrap_or(false) {
            where_clauses.push(format!("available = ${param_count}"));
            param_count += 1;
        }
        let where_clause = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) AS total FROM cars {where_clause}");
        let mut count_builder = sqlx::query(&count_query);
        if let Some(car_type) = &query.car_type {
            count_builder = count_builder.bind(car_type);
        }
        if query.available_only.unwrap_or(false) {
            count_builder = count_builder.bind(true);
        }
        let total: i64 = count_builder.fetch_one(&self.pool).await?.try_get("total")?;

        let fetch_query = format!(
            "SELECT {CAR_COLUMNS} FROM cars {where_clause} ORDER BY id ASC \
             LIMIT ${param_count} OFFSET ${}",
            param_count + 1
        );
        let mut fetch_builder = sqlx::query(&fetch_query);
        if let Some(car_type) = &query.car_type {
            fetch_builder = fetch_builder.bind(car_type);
        }
        if query.available_only.unwrap_or(false) {
            fetch_builder = fetch_builder.bind(true);
        }
        let rows = fetch_builder
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        let cars = rows.iter().map(car_from_row).collect::<AppResult<Vec<_>>>()?;
        Ok((cars, total))
    }

    async fn set_availability(&self, car_id: i32, available: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE cars SET available = $1 WHERE id = $2")
            .bind(available)
            .bind(car_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Car"));
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn create(&self, r: Reservation) -> AppResult<Reservation> {
        sqlx::query(
            "INSERT INTO reservations (id, car_id, user_id, customer_name, customer_contact, \
             start_date, end_date, days, total_price, status, has_license_file, \
             has_contract_file, created_at, updated_at, cancelled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(r.id)
        .bind(r.car_id)
        .bind(r.user_id)
        .bind(&r.customer_name)
        .bind(&r.customer_contact)
        .bind(r.start_date)
        .bind(r.end_date)
        .bind(r.days)
        .bind(r.total_price)
        .bind(r.status.as_str())
        .bind(r.has_license_file)
        .bind(r.has_contract_file)
        .bind(r.created_at)
        .bind(r.updated_at)
        .bind(r.cancelled_at)
        .execute(&self.pool)
        .await?;
        Ok(r)
    }

    async fn update(&self, r: Reservation) -> AppResult<Reservation> {
        let result = sqlx::query(
            "UPDATE reservations SET customer_name = $1, customer_contact = $2, start_date = $3, \
             end_date = $4, days = $5, total_price = $6, status = $7, has_license_file = $8, \
             has_contract_file = $9, updated_at = $10, cancelled_at = $11 WHERE id = $12",
        )
        .bind(&r.customer_name)
        .bind(&r.customer_contact)
        .bind(r.start_date)
        .bind(r.end_date)
        .bind(r.days)
        .bind(r.total_price)
        .bind(r.status.as_str())
        .bind(r.has_license_file)
        .bind(r.has_contract_file)
        .bind(r.updated_at)
        .bind(r.cancelled_at)
        .bind(r.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Reservation"));
        }
        Ok(r)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        let row = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(reservation_from_row).transpose()
    }

    async fn list_all(&self) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(reservation_from_row).collect()
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = $1 \
             ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(reservation_from_row).collect()
    }

    async fn list_by_car(&self, car_id: i32) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE car_id = $1 \
             ORDER BY created_at ASC"
        ))
        .bind(car_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(reservation_from_row).collect()
    }

    async fn replace_all(&self, reservations: Vec<Reservation>) -> AppResult<()> {
        for r in reservations {
            ReservationStore::update(self, r).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn create(&self, b: Booking) -> AppResult<Booking> {
        let payment_method = b
            .payment_method
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| decode_err(e.to_string()))?;
        sqlx::query(
            "INSERT INTO bookings (id, reservation_id, car_id, customer_name, customer_contact, \
             start_date, end_date, total_price, status, payment_status, payment_method, \
             license_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(b.id)
        .bind(b.reservation_id)
        .bind(b.car_id)
        .bind(&b.customer_name)
        .bind(&b.customer_contact)
        .bind(b.start_date)
        .bind(b.end_date)
        .bind(b.total_price)
        .bind(b.status.as_str())
        .bind(b.payment_status.as_str())
        .bind(payment_method)
        .bind(&b.license_id)
        .bind(b.created_at)
        .bind(b.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(b)
    }

    async fn update(&self, b: Booking) -> AppResult<Booking> {
        let payment_method = b
            .payment_method
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| decode_err(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE bookings SET status = $1, payment_status = $2, payment_method = $3, \
             license_id = $4, updated_at = $5 WHERE id = $6",
        )
        .bind(b.status.as_str())
        .bind(b.payment_status.as_str())
        .bind(payment_method)
        .bind(&b.license_id)
        .bind(b.updated_at)
        .bind(b.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Booking"));
        }
        Ok(b)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn list_all(&self) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(booking_from_row).collect()
    }
}

#[async_trait]
impl NotificationStore for PgStore {
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
        let data = serde_json::to_string(&notification.data)
            .map_err(|e| decode_err(e.to_string()))?;
        sqlx::query(
            "INSERT INTO notifications (id, kind, title, message, data, user_id, read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(data)
        .bind(notification.user_id)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(notification)
    }

    async fn list_for(&self, recipient: Option<Uuid>) -> AppResult<Vec<Notification>> {
        let rows = match recipient {
            Some(user_id) => {
                sqlx::query(
                    "SELECT id, kind, title, message, data, user_id, read, created_at \
                     FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, kind, title, message, data, user_id, read, created_at \
                     FROM notifications WHERE user_id IS NULL ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(notification_from_row).collect()
    }

    async fn unread_count_for(&self, recipient: Option<Uuid>) -> AppResult<i64> {
        let row = match recipient {
            Some(user_id) => {
                sqlx::query(
                    "SELECT COUNT(*) AS total FROM notifications \
                     WHERE user_id = $1 AND read = FALSE",
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT COUNT(*) AS total FROM notifications \
                     WHERE user_id IS NULL AND read = FALSE",
                )
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(row.try_get("total")?)
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: User) -> AppResult<User> {
        sqlx::query(
            "INSERT INTO users (id, full_name, username, email, phone, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.constraint().is_some() => {
                AppError::Conflict(format!("Username {} is already taken", user.username))
            }
            other => AppError::Database(other),
        })?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, full_name, username, email, phone, password_hash, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AppResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, full_name, username, email, phone, password_hash, created_at \
             FROM users WHERE username = $1 AND password_hash = $2",
        )
        .bind(username)
        .bind(password)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }
}
