use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use pahiramcar_be::error::AppError;
use pahiramcar_be::lifecycle::LifecycleManager;
use pahiramcar_be::model::booking::{
    BookingStatus, ConvertToBookingRequest, CreateBookingRequest, PaymentMethod, PaymentStatus,
};
use pahiramcar_be::model::notification::NotificationKind;
use pahiramcar_be::model::reservation::{
    ActivityAction, CreateReservationRequest, ReservationStatus,
};
use pahiramcar_be::model::user::User;
use pahiramcar_be::store::memory::MemoryStore;
use pahiramcar_be::store::Stores;

async fn setup() -> (Stores, LifecycleManager, User) {
    let stores = Arc::new(MemoryStore::demo()).into_stores();
    let user = User {
        id: Uuid::new_v4(),
        full_name: "Juan Dela Cruz".into(),
        username: "juandc".into(),
        email: "juan@example.com".into(),
        phone: "09171234567".into(),
        password_hash: "secret".into(),
        created_at: Utc::now(),
    };
    stores.users.create(user.clone()).await.unwrap();
    let lifecycle = LifecycleManager::new(stores.clone());
    (stores, lifecycle, user)
}

fn camry_request() -> CreateReservationRequest {
    CreateReservationRequest {
        car_id: 1,
        customer_name: "Juan Dela Cruz".into(),
        customer_contact: "juan@example.com".into(),
        start_date: NaiveDate::from_ymd_opt(2025, 5, 1),
        end_date: NaiveDate::from_ymd_opt(2025, 5, 8),
        has_license_file: true,
        has_contract_file: true,
    }
}

#[tokio::test]
async fn creating_a_reservation_holds_the_car_and_notifies_staff() {
    let (stores, lifecycle, user) = setup().await;

    let reservation = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();

    assert_eq!(reservation.status, ReservationStatus::WaitingForApproval);
    assert_eq!(reservation.days, 7);
    // Camry rents for 4500/day.
    assert_eq!(reservation.total_price, 31_500);

    let car = stores.cars.find_by_id(1).await.unwrap().unwrap();
    assert!(!car.available);
    assert!(lifecycle.is_car_reserved(1).await.unwrap());

    let staff_feed = stores.notifications.list_for(None).await.unwrap();
    assert_eq!(staff_feed.len(), 1);
    assert_eq!(staff_feed[0].kind, NotificationKind::Reservation);
}

#[tokio::test]
async fn reserving_an_unavailable_car_fails_without_mutating_state() {
    let (stores, lifecycle, user) = setup().await;
    lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();

    let err = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(stores.reservations.list_all().await.unwrap().len(), 1);
    assert_eq!(stores.notifications.list_for(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_required_fields_fail_validation() {
    let (stores, lifecycle, user) = setup().await;

    let mut no_start = camry_request();
    no_start.start_date = None;
    assert!(matches!(
        lifecycle.create_reservation(&user, no_start).await,
        Err(AppError::Validation(_))
    ));

    let mut no_name = camry_request();
    no_name.customer_name = "  ".into();
    assert!(matches!(
        lifecycle.create_reservation(&user, no_name).await,
        Err(AppError::Validation(_))
    ));

    // Nothing was written and the car is still open.
    assert!(stores.reservations.list_all().await.unwrap().is_empty());
    assert!(stores.cars.find_by_id(1).await.unwrap().unwrap().available);
}

#[tokio::test]
async fn cancelling_releases_the_car_and_notifies_staff_and_requester() {
    let (stores, lifecycle, user) = setup().await;
    let reservation = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();

    let cancelled = lifecycle.cancel_reservation(reservation.id).await.unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let car = stores.cars.find_by_id(1).await.unwrap().unwrap();
    assert!(car.available);
    assert!(!lifecycle.is_car_reserved(1).await.unwrap());

    let staff_feed = stores.notifications.list_for(None).await.unwrap();
    assert!(staff_feed
        .iter()
        .any(|n| n.kind == NotificationKind::Cancellation));
    let user_feed = stores.notifications.list_for(Some(user.id)).await.unwrap();
    assert_eq!(user_feed.len(), 1);
    assert_eq!(user_feed[0].kind, NotificationKind::Cancellation);
}

#[tokio::test]
async fn cancelling_an_unknown_reservation_is_not_found() {
    let (_stores, lifecycle, _user) = setup().await;
    let err = lifecycle.cancel_reservation(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound("Reservation")));
}

#[tokio::test]
async fn cancelling_twice_is_rejected() {
    let (_stores, lifecycle, user) = setup().await;
    let reservation = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();
    lifecycle.cancel_reservation(reservation.id).await.unwrap();

    let err = lifecycle.cancel_reservation(reservation.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn converting_marks_the_reservation_booked_and_confirms_a_booking() {
    let (stores, lifecycle, user) = setup().await;
    let reservation = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();

    let booking = lifecycle
        .convert_to_booking(
            reservation.id,
            ConvertToBookingRequest {
                payment_method: PaymentMethod::Cash { amount_tendered: 31_500 },
                paid: true,
                activate_now: false,
                license_id: Some("1234 5678 9123".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Paid);
    assert_eq!(booking.reservation_id, Some(reservation.id));
    assert_eq!(booking.total_price, reservation.total_price);

    let stored = stores
        .reservations
        .find_by_id(reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ReservationStatus::Booked);
    // No longer an approval-pending hold, but the car stays unavailable.
    assert!(!lifecycle.is_car_reserved(1).await.unwrap());
    assert!(!stores.cars.find_by_id(1).await.unwrap().unwrap().available);
}

#[tokio::test]
async fn conversion_rejects_cash_short_of_the_total() {
    let (_stores, lifecycle, user) = setup().await;
    let reservation = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();

    let err = lifecycle
        .convert_to_booking(
            reservation.id,
            ConvertToBookingRequest {
                payment_method: PaymentMethod::Cash { amount_tendered: 30_000 },
                paid: true,
                activate_now: false,
                license_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn completing_an_ongoing_booking_releases_the_car() {
    let (stores, lifecycle, user) = setup().await;
    let reservation = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();
    let booking = lifecycle
        .convert_to_booking(
            reservation.id,
            ConvertToBookingRequest {
                payment_method: PaymentMethod::Cash { amount_tendered: 31_500 },
                paid: true,
                activate_now: true,
                license_id: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Ongoing);

    let completed = lifecycle.complete_booking(booking.id).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert!(stores.cars.find_by_id(1).await.unwrap().unwrap().available);
}

#[tokio::test]
async fn completing_a_confirmed_booking_is_rejected() {
    let (_stores, lifecycle, _user) = setup().await;
    let booking = lifecycle
        .create_booking(CreateBookingRequest {
            car_id: 2,
            customer_name: "Maria Santos".into(),
            customer_contact: "maria@example.com".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            activate_now: false,
            license_id: None,
        })
        .await
        .unwrap();

    let err = lifecycle.complete_booking(booking.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn cancelling_a_paid_booking_refunds_and_releases_the_car() {
    let (stores, lifecycle, user) = setup().await;
    let reservation = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();
    let booking = lifecycle
        .convert_to_booking(
            reservation.id,
            ConvertToBookingRequest {
                payment_method: PaymentMethod::Cash { amount_tendered: 31_500 },
                paid: true,
                activate_now: true,
                license_id: None,
            },
        )
        .await
        .unwrap();

    let cancelled = lifecycle.cancel_booking(booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    assert!(stores.cars.find_by_id(1).await.unwrap().unwrap().available);

    let err = lifecycle.cancel_booking(booking.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn direct_booking_holds_the_car_and_activates_once() {
    let (stores, lifecycle, _user) = setup().await;
    let booking = lifecycle
        .create_booking(CreateBookingRequest {
            car_id: 3,
            customer_name: "Maria Santos".into(),
            customer_contact: "maria@example.com".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(),
            activate_now: false,
            license_id: None,
        })
        .await
        .unwrap();

    // Explorer rents for 6500/day, three days.
    assert_eq!(booking.total_price, 19_500);
    assert!(!stores.cars.find_by_id(3).await.unwrap().unwrap().available);

    let ongoing = lifecycle.activate_booking(booking.id).await.unwrap();
    assert_eq!(ongoing.status, BookingStatus::Ongoing);
    let err = lifecycle.activate_booking(booking.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn recording_a_payment_marks_the_booking_paid() {
    let (stores, lifecycle, _user) = setup().await;
    let booking = lifecycle
        .create_booking(CreateBookingRequest {
            car_id: 5,
            customer_name: "Maria Santos".into(),
            customer_contact: "maria@example.com".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            activate_now: true,
            license_id: None,
        })
        .await
        .unwrap();
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert!(booking.action_required(Utc::now()));

    let paid = lifecycle
        .record_payment(
            booking.id,
            PaymentMethod::DebitCard {
                card_number: "4111 1111 1111 1111".into(),
                card_holder: "Maria Santos".into(),
                expiry: "12/27".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let staff_feed = stores.notifications.list_for(None).await.unwrap();
    assert!(staff_feed.iter().any(|n| n.kind == NotificationKind::Payment));
}

#[tokio::test]
async fn sweep_expires_past_due_holds_and_releases_their_cars() {
    let (stores, lifecycle, user) = setup().await;
    let past_due = lifecycle
        .create_reservation(
            &user,
            CreateReservationRequest {
                car_id: 2,
                customer_name: "Juan Dela Cruz".into(),
                customer_contact: "juan@example.com".into(),
                start_date: NaiveDate::from_ymd_opt(2025, 4, 1),
                end_date: NaiveDate::from_ymd_opt(2025, 4, 8),
                has_license_file: false,
                has_contract_file: false,
            },
        )
        .await
        .unwrap();
    let still_open = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();

    let now = Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap();
    let expired = lifecycle.sweep_expired_reservations(now).await.unwrap();
    assert_eq!(expired, 1);

    let swept = stores
        .reservations
        .find_by_id(past_due.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(swept.status, ReservationStatus::Expired);
    assert!(stores.cars.find_by_id(2).await.unwrap().unwrap().available);

    let untouched = stores
        .reservations
        .find_by_id(still_open.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.status, ReservationStatus::WaitingForApproval);
    assert!(!stores.cars.find_by_id(1).await.unwrap().unwrap().available);

    // Idempotent: a second pass at the same instant writes nothing.
    let again = lifecycle.sweep_expired_reservations(now).await.unwrap();
    assert_eq!(again, 0);

    let staff_feed = stores.notifications.list_for(None).await.unwrap();
    let expirations = staff_feed
        .iter()
        .filter(|n| n.kind == NotificationKind::Expiration)
        .count();
    assert_eq!(expirations, 1);
}

#[tokio::test]
async fn recent_activities_come_back_newest_first() {
    let (_stores, lifecycle, user) = setup().await;
    let first = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();
    lifecycle
        .create_reservation(
            &user,
            CreateReservationRequest {
                car_id: 2,
                customer_name: "Juan Dela Cruz".into(),
                customer_contact: "juan@example.com".into(),
                start_date: NaiveDate::from_ymd_opt(2025, 5, 10),
                end_date: NaiveDate::from_ymd_opt(2025, 5, 17),
                has_license_file: true,
                has_contract_file: true,
            },
        )
        .await
        .unwrap();
    lifecycle.cancel_reservation(first.id).await.unwrap();

    let activities = lifecycle.recent_activities(user.id).await.unwrap();
    assert_eq!(activities.len(), 2);
    // The cancellation is the most recent event even though that
    // reservation was created first.
    assert_eq!(activities[0].id, first.id);
    assert_eq!(activities[0].action, ActivityAction::Cancelled);
    assert_eq!(activities[0].car_name, "2016 Toyota Camry");
    assert_eq!(activities[1].action, ActivityAction::Created);
}

#[tokio::test]
async fn unread_counts_track_mark_read() {
    let (stores, lifecycle, user) = setup().await;
    let reservation = lifecycle
        .create_reservation(&user, camry_request())
        .await
        .unwrap();
    lifecycle.cancel_reservation(reservation.id).await.unwrap();

    assert_eq!(stores.notifications.unread_count_for(None).await.unwrap(), 2);
    assert_eq!(
        stores
            .notifications
            .unread_count_for(Some(user.id))
            .await
            .unwrap(),
        1
    );

    let staff_feed = stores.notifications.list_for(None).await.unwrap();
    stores.notifications.mark_read(staff_feed[0].id).await.unwrap();
    assert_eq!(stores.notifications.unread_count_for(None).await.unwrap(), 1);
}
