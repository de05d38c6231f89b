use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::booking::{
    Booking, BookingStatus, ConvertToBookingRequest, CreateBookingRequest, PaymentMethod,
    PaymentStatus,
};
use crate::model::car::Car;
use crate::model::notification::{NotificationEvent, NotificationKind};
use crate::model::reservation::{
    ActivityAction, CreateReservationRequest, RecentActivity, Reservation, ReservationStatus,
    UpdateReservationRequest,
};
use crate::model::user::User;
use crate::store::Stores;

/// Owns every status transition of reservations and bookings, and is
/// the only writer of `Car.available`. Route handlers call in here;
/// they never flip availability or statuses on their own.
#[derive(Clone)]
pub struct LifecycleManager {
    stores: Stores,
}

/// Retags every WAITING_FOR_APPROVAL reservation whose end date lies
/// before `now` as EXPIRED. Pure and idempotent: re-running on its own
/// output at the same `now` returns an identical set.
pub fn sweep_expired(reservations: &[Reservation], now: DateTime<Utc>) -> Vec<Reservation> {
    let today = now.date_naive();
    reservations
        .iter()
        .cloned()
        .map(|mut r| {
            if r.status == ReservationStatus::WaitingForApproval && r.end_date < today {
                r.status = ReservationStatus::Expired;
                r.updated_at = Some(now);
            }
            r
        })
        .collect()
}

/// Whole rental days between the two dates.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> AppResult<i64> {
    let days = (end - start).num_days();
    if days < 1 {
        return Err(AppError::Validation(
            "End date must be after the start date".into(),
        ));
    }
    Ok(days)
}

impl LifecycleManager {
    pub fn new(stores: Stores) -> Self {
        LifecycleManager { stores }
    }

    /// Fire-and-forget delivery: a failed publish is logged and never
    /// aborts the transition that produced it.
    async fn notify(&self, event: NotificationEvent) {
        if let Err(err) = self.stores.notifications.publish(event).await {
            tracing::warn!("notification publish failed: {err}");
        }
    }

    async fn car_name(&self, car_id: i32) -> String {
        match self.stores.cars.find_by_id(car_id).await {
            Ok(Some(car)) => car.name,
            _ => "Unknown Car".into(),
        }
    }

    async fn require_car(&self, car_id: i32) -> AppResult<Car> {
        self.stores
            .cars
            .find_by_id(car_id)
            .await?
            .ok_or(AppError::NotFound("Car"))
    }

    pub async fn create_reservation(
        &self,
        requester: &User,
        input: CreateReservationRequest,
    ) -> AppResult<Reservation> {
        if input.customer_name.trim().is_empty() {
            return Err(AppError::Validation("Missing customer name".into()));
        }
        if input.customer_contact.trim().is_empty() {
            return Err(AppError::Validation("Missing customer contact".into()));
        }
        let start_date = input
            .start_date
            .ok_or_else(|| AppError::Validation("Missing start date".into()))?;
        let end_date = input
            .end_date
            .ok_or_else(|| AppError::Validation("Missing end date".into()))?;
        let days = rental_days(start_date, end_date)?;

        let car = self.require_car(input.car_id).await?;
        if !car.available {
            return Err(AppError::Validation(format!(
                "{} is not available for reservation",
                car.name
            )));
        }

        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            car_id: car.id,
            user_id: requester.id,
            customer_name: input.customer_name,
            customer_contact: input.customer_contact,
            start_date,
            end_date,
            days,
            total_price: i64::from(car.price_per_day) * days,
            status: ReservationStatus::WaitingForApproval,
            has_license_file: input.has_license_file,
            has_contract_file: input.has_contract_file,
            created_at: now,
            updated_at: None,
            cancelled_at: None,
        };

        let reservation = self.stores.reservations.create(reservation).await?;
        self.stores.cars.set_availability(car.id, false).await?;

        self.notify(NotificationEvent {
            kind: NotificationKind::Reservation,
            title: "New Reservation".into(),
            message: format!("{} reserved a {}", reservation.customer_name, car.name),
            data: json!({
                "reservation_id": reservation.id,
                "car_id": car.id,
                "car_name": car.name,
                "customer_name": reservation.customer_name,
                "start_date": reservation.start_date,
                "days": reservation.days,
                "total_price": reservation.total_price,
            }),
            user_id: None,
        })
        .await;

        tracing::info!(reservation_id = %reservation.id, car_id = car.id, "reservation created");
        Ok(reservation)
    }

    pub async fn cancel_reservation(&self, id: Uuid) -> AppResult<Reservation> {
        let mut reservation = self
            .stores
            .reservations
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Reservation"))?;
        if reservation.status != ReservationStatus::WaitingForApproval {
            return Err(AppError::Validation(format!(
                "Reservation is {}, only reservations awaiting approval can be cancelled",
                reservation.status
            )));
        }

        let now = Utc::now();
        reservation.status = ReservationStatus::Cancelled;
        reservation.cancelled_at = Some(now);
        reservation.updated_at = Some(now);
        let reservation = self.stores.reservations.update(reservation).await?;
        self.stores
            .cars
            .set_availability(reservation.car_id, true)
            .await?;

        let car_name = self.car_name(reservation.car_id).await;
        let data = json!({
            "reservation_id": reservation.id,
            "car_id": reservation.car_id,
            "car_name": car_name,
            "customer_name": reservation.customer_name,
            "timestamp": now,
        });
        self.notify(NotificationEvent {
            kind: NotificationKind::Cancellation,
            title: "Reservation Cancelled".into(),
            message: format!("Reservation for {car_name} has been cancelled"),
            data: data.clone(),
            user_id: None,
        })
        .await;
        self.notify(NotificationEvent {
            kind: NotificationKind::Cancellation,
            title: "Reservation Cancelled".into(),
            message: format!("Your reservation for {car_name} has been cancelled"),
            data,
            user_id: Some(reservation.user_id),
        })
        .await;

        tracing::info!(reservation_id = %reservation.id, "reservation cancelled");
        Ok(reservation)
    }

    /// Limited field update; status never changes here, only through
    /// the dedicated transitions. Date edits recompute days and total.
    pub async fn update_reservation(
        &self,
        id: Uuid,
        update: UpdateReservationRequest,
    ) -> AppResult<Reservation> {
        let mut reservation = self
            .stores
            .reservations
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Reservation"))?;
        if reservation.status.is_terminal() {
            return Err(AppError::Validation(
                "Terminated reservations cannot be edited".into(),
            ));
        }

        if let Some(customer_name) = update.customer_name {
            reservation.customer_name = customer_name;
        }
        if let Some(customer_contact) = update.customer_contact {
            reservation.customer_contact = customer_contact;
        }
        if let Some(start_date) = update.start_date {
            reservation.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            reservation.end_date = end_date;
        }
        if let Some(has_license_file) = update.has_license_file {
            reservation.has_license_file = has_license_file;
        }
        if let Some(has_contract_file) = update.has_contract_file {
            reservation.has_contract_file = has_contract_file;
        }
        reservation.days = rental_days(reservation.start_date, reservation.end_date)?;
        let car = self.require_car(reservation.car_id).await?;
        reservation.total_price = i64::from(car.price_per_day) * reservation.days;
        reservation.updated_at = Some(Utc::now());

        self.stores.reservations.update(reservation).await
    }

    pub async fn convert_to_booking(
        &self,
        reservation_id: Uuid,
        fields: ConvertToBookingRequest,
    ) -> AppResult<Booking> {
        let mut reservation = self
            .stores
            .reservations
            .find_by_id(reservation_id)
            .await?
            .ok_or(AppError::NotFound("Reservation"))?;
        if reservation.status != ReservationStatus::WaitingForApproval {
            return Err(AppError::Validation(format!(
                "Reservation is {}, only reservations awaiting approval can be converted",
                reservation.status
            )));
        }
        fields.payment_method.validate(reservation.total_price)?;

        let now = Utc::now();
        reservation.status = ReservationStatus::Booked;
        reservation.updated_at = Some(now);
        let reservation = self.stores.reservations.update(reservation).await?;

        let booking = Booking {
            id: Uuid::new_v4(),
            reservation_id: Some(reservation.id),
            car_id: reservation.car_id,
            customer_name: reservation.customer_name.clone(),
            customer_contact: reservation.customer_contact.clone(),
            start_date: reservation.start_date,
            end_date: reservation.end_date,
            total_price: reservation.total_price,
            status: if fields.activate_now {
                BookingStatus::Ongoing
            } else {
                BookingStatus::Confirmed
            },
            payment_status: if fields.paid {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Pending
            },
            payment_method: Some(fields.payment_method),
            license_id: fields.license_id,
            created_at: now,
            updated_at: None,
        };
        let booking = self.stores.bookings.create(booking).await?;

        let car_name = self.car_name(booking.car_id).await;
        self.notify(NotificationEvent {
            kind: NotificationKind::Booking,
            title: "Reservation Converted".into(),
            message: format!(
                "Reservation for {car_name} was converted into a booking for {}",
                booking.customer_name
            ),
            data: json!({
                "booking_id": booking.id,
                "reservation_id": reservation.id,
                "car_id": booking.car_id,
                "car_name": car_name,
                "total_price": booking.total_price,
            }),
            user_id: None,
        })
        .await;

        tracing::info!(
            reservation_id = %reservation.id,
            booking_id = %booking.id,
            "reservation converted to booking"
        );
        Ok(booking)
    }

    /// Direct staff booking with no preceding reservation.
    pub async fn create_booking(&self, input: CreateBookingRequest) -> AppResult<Booking> {
        if input.customer_name.trim().is_empty() {
            return Err(AppError::Validation("Missing customer name".into()));
        }
        let days = rental_days(input.start_date, input.end_date)?;
        let car = self.require_car(input.car_id).await?;
        if !car.available {
            return Err(AppError::Validation(format!(
                "{} is not available for booking",
                car.name
            )));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            reservation_id: None,
            car_id: car.id,
            customer_name: input.customer_name,
            customer_contact: input.customer_contact,
            start_date: input.start_date,
            end_date: input.end_date,
            total_price: i64::from(car.price_per_day) * days,
            status: if input.activate_now {
                BookingStatus::Ongoing
            } else {
                BookingStatus::Confirmed
            },
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            license_id: input.license_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        let booking = self.stores.bookings.create(booking).await?;
        self.stores.cars.set_availability(car.id, false).await?;

        self.notify(NotificationEvent {
            kind: NotificationKind::Booking,
            title: "New Booking".into(),
            message: format!("{} booked a {}", booking.customer_name, car.name),
            data: json!({
                "booking_id": booking.id,
                "car_id": car.id,
                "car_name": car.name,
                "total_price": booking.total_price,
            }),
            user_id: None,
        })
        .await;
        Ok(booking)
    }

    pub async fn activate_booking(&self, id: Uuid) -> AppResult<Booking> {
        let mut booking = self.require_booking(id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(AppError::Validation(format!(
                "Booking is {}, only confirmed bookings can be activated",
                booking.status
            )));
        }
        booking.status = BookingStatus::Ongoing;
        booking.updated_at = Some(Utc::now());
        self.stores.bookings.update(booking).await
    }

    pub async fn complete_booking(&self, id: Uuid) -> AppResult<Booking> {
        let mut booking = self.require_booking(id).await?;
        if booking.status != BookingStatus::Ongoing {
            return Err(AppError::Validation(format!(
                "Booking is {}, only ongoing bookings can be completed",
                booking.status
            )));
        }
        booking.status = BookingStatus::Completed;
        booking.updated_at = Some(Utc::now());
        let booking = self.stores.bookings.update(booking).await?;
        // Completed is terminal: the car no longer has an active hold.
        self.stores
            .cars
            .set_availability(booking.car_id, true)
            .await?;
        tracing::info!(booking_id = %booking.id, "booking completed");
        Ok(booking)
    }

    pub async fn cancel_booking(&self, id: Uuid) -> AppResult<Booking> {
        let mut booking = self.require_booking(id).await?;
        if booking.status.is_terminal() {
            return Err(AppError::Validation(format!(
                "Booking is already {}",
                booking.status
            )));
        }
        booking.status = BookingStatus::Cancelled;
        if booking.payment_status == PaymentStatus::Paid {
            booking.payment_status = PaymentStatus::Refunded;
        }
        booking.updated_at = Some(Utc::now());
        let booking = self.stores.bookings.update(booking).await?;
        self.stores
            .cars
            .set_availability(booking.car_id, true)
            .await?;

        let car_name = self.car_name(booking.car_id).await;
        self.notify(NotificationEvent {
            kind: NotificationKind::Cancellation,
            title: "Booking Cancelled".into(),
            message: format!("Booking for {car_name} has been cancelled"),
            data: json!({
                "booking_id": booking.id,
                "car_id": booking.car_id,
                "car_name": car_name,
                "payment_status": booking.payment_status,
            }),
            user_id: None,
        })
        .await;
        tracing::info!(booking_id = %booking.id, "booking cancelled");
        Ok(booking)
    }

    pub async fn record_payment(&self, id: Uuid, method: PaymentMethod) -> AppResult<Booking> {
        let mut booking = self.require_booking(id).await?;
        if booking.status.is_terminal() {
            return Err(AppError::Validation(format!(
                "Booking is already {}",
                booking.status
            )));
        }
        method.validate(booking.total_price)?;
        booking.payment_status = PaymentStatus::Paid;
        booking.payment_method = Some(method);
        booking.updated_at = Some(Utc::now());
        let booking = self.stores.bookings.update(booking).await?;

        let car_name = self.car_name(booking.car_id).await;
        self.notify(NotificationEvent {
            kind: NotificationKind::Payment,
            title: "Payment Received".into(),
            message: format!(
                "Payment of {} received for the {car_name} booking",
                booking.total_price
            ),
            data: json!({
                "booking_id": booking.id,
                "total_price": booking.total_price,
            }),
            user_id: None,
        })
        .await;
        Ok(booking)
    }

    /// Batch expiration pass. Persists nothing when the swept set is
    /// identical to the stored one; otherwise writes the new set,
    /// releases the cars of newly expired reservations and notifies
    /// staff. Returns how many reservations expired.
    pub async fn sweep_expired_reservations(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let current = self.stores.reservations.list_all().await?;
        let swept = sweep_expired(&current, now);
        if swept == current {
            return Ok(0);
        }

        let expired: Vec<Reservation> = swept
            .iter()
            .zip(&current)
            .filter(|(after, before)| after.status != before.status)
            .map(|(after, _)| after.clone())
            .collect();
        self.stores.reservations.replace_all(swept).await?;

        for reservation in &expired {
            self.stores
                .cars
                .set_availability(reservation.car_id, true)
                .await?;
            let car_name = self.car_name(reservation.car_id).await;
            self.notify(NotificationEvent {
                kind: NotificationKind::Expiration,
                title: "Reservation Expired".into(),
                message: format!("Reservation for {car_name} expired without approval"),
                data: json!({
                    "reservation_id": reservation.id,
                    "car_id": reservation.car_id,
                    "car_name": car_name,
                    "end_date": reservation.end_date,
                }),
                user_id: None,
            })
            .await;
        }

        tracing::info!(count = expired.len(), "expiration sweep retired reservations");
        Ok(expired.len())
    }

    /// True iff any reservation for the car is awaiting approval.
    pub async fn is_car_reserved(&self, car_id: i32) -> AppResult<bool> {
        let reservations = self.stores.reservations.list_by_car(car_id).await?;
        Ok(reservations
            .iter()
            .any(|r| r.status == ReservationStatus::WaitingForApproval))
    }

    /// Dashboard feed: one row per reservation the user ever made,
    /// newest first.
    pub async fn recent_activities(&self, user_id: Uuid) -> AppResult<Vec<RecentActivity>> {
        let reservations = self.stores.reservations.list_by_user(user_id).await?;
        let mut activities = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            let action = if reservation.status == ReservationStatus::Cancelled {
                ActivityAction::Cancelled
            } else {
                ActivityAction::Created
            };
            activities.push(RecentActivity {
                id: reservation.id,
                action,
                car_name: self.car_name(reservation.car_id).await,
                timestamp: reservation.activity_timestamp(),
                status: reservation.status,
            });
        }
        activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(activities)
    }

    async fn require_booking(&self, id: Uuid) -> AppResult<Booking> {
        self.stores
            .bookings
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Booking"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn waiting(end: NaiveDate) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            car_id: 1,
            user_id: Uuid::new_v4(),
            customer_name: "Juan Dela Cruz".into(),
            customer_contact: "juan@example.com".into(),
            start_date: end - chrono::Duration::days(7),
            end_date: end,
            days: 7,
            total_price: 31_500,
            status: ReservationStatus::WaitingForApproval,
            has_license_file: true,
            has_contract_file: true,
            created_at: Utc::now(),
            updated_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn sweep_expires_only_past_due_waiting_reservations() {
        let now = Utc.with_ymd_and_hms(2025, 5, 12, 0, 0, 0).unwrap();
        let past_due = waiting(NaiveDate::from_ymd_opt(2025, 5, 10).unwrap());
        let still_open = waiting(NaiveDate::from_ymd_opt(2025, 5, 20).unwrap());
        let mut cancelled = waiting(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        cancelled.status = ReservationStatus::Cancelled;

        let swept = sweep_expired(&[past_due, still_open, cancelled], now);
        assert_eq!(swept[0].status, ReservationStatus::Expired);
        assert_eq!(swept[1].status, ReservationStatus::WaitingForApproval);
        assert_eq!(swept[2].status, ReservationStatus::Cancelled);
    }

    #[test]
    fn sweep_is_idempotent() {
        let now = Utc.with_ymd_and_hms(2025, 5, 12, 0, 0, 0).unwrap();
        let input = vec![
            waiting(NaiveDate::from_ymd_opt(2025, 5, 10).unwrap()),
            waiting(NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()),
        ];
        let once = sweep_expired(&input, now);
        let twice = sweep_expired(&once, now);
        assert_eq!(once, twice);
    }

    #[test]
    fn sweep_leaves_end_date_today_alone() {
        // Expiration requires end_date strictly before the sweep day.
        let now = Utc.with_ymd_and_hms(2025, 5, 10, 23, 0, 0).unwrap();
        let ends_today = waiting(NaiveDate::from_ymd_opt(2025, 5, 10).unwrap());
        let swept = sweep_expired(&[ends_today], now);
        assert_eq!(swept[0].status, ReservationStatus::WaitingForApproval);
    }

    #[test]
    fn rental_days_counts_whole_days() {
        let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        assert_eq!(rental_days(start, end).unwrap(), 7);
        assert_eq!(i64::from(4500) * 7, 31_500);
    }

    #[test]
    fn rental_days_rejects_inverted_ranges() {
        let start = NaiveDate::from_ymd_opt(2025, 5, 8).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert!(rental_days(start, end).is_err());
        assert!(rental_days(start, start).is_err());
    }
}
