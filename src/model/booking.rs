use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Persisted booking status. Overdue is deliberately absent: it is a
/// read-time derivation of Ongoing past its end date, see
/// [`Booking::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    Ongoing,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Ongoing => "Ongoing",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Confirmed" => Ok(BookingStatus::Confirmed),
            "Ongoing" => Ok(BookingStatus::Ongoing),
            "Completed" => Ok(BookingStatus::Completed),
            "Cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Closed set of payment methods, each carrying only the fields that
/// method needs. Validated at construction via [`PaymentMethod::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum PaymentMethod {
    Cash {
        amount_tendered: i64,
    },
    #[serde(rename = "Debit Card")]
    DebitCard {
        card_number: String,
        card_holder: String,
        expiry: String,
    },
    #[serde(rename = "Credit Card")]
    CreditCard {
        card_number: String,
        card_holder: String,
        expiry: String,
    },
}

impl PaymentMethod {
    /// `total` is the booking total the payment must cover.
    pub fn validate(&self, total: i64) -> AppResult<()> {
        match self {
            PaymentMethod::Cash { amount_tendered } => {
                if *amount_tendered < total {
                    return Err(AppError::Validation(format!(
                        "Cash tendered ({amount_tendered}) does not cover the total ({total})"
                    )));
                }
            }
            PaymentMethod::DebitCard {
                card_number,
                card_holder,
                ..
            }
            | PaymentMethod::CreditCard {
                card_number,
                card_holder,
                ..
            } => {
                if card_number.trim().is_empty() {
                    return Err(AppError::Validation("Missing card number".into()));
                }
                if card_holder.trim().is_empty() {
                    return Err(AppError::Validation("Missing card holder".into()));
                }
            }
        }
        Ok(())
    }
}

/// An active or finished rental, created from an approved reservation
/// or directly by staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub reservation_id: Option<Uuid>,
    pub car_id: i32,
    pub customer_name: String,
    pub customer_contact: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub license_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Read-time status: an Ongoing booking past its end date is shown
    /// as Overdue without ever persisting that state.
    pub fn effective_status(&self, now: DateTime<Utc>) -> EffectiveStatus {
        if self.status == BookingStatus::Ongoing && self.end_date < now.date_naive() {
            EffectiveStatus::Overdue
        } else {
            EffectiveStatus::Stored(self.status)
        }
    }

    pub fn action_required(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == EffectiveStatus::Overdue
            || self.payment_status == PaymentStatus::Pending
    }
}

/// What a read sees: either the stored status or the derived Overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveStatus {
    Stored(BookingStatus),
    Overdue,
}

impl EffectiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectiveStatus::Stored(status) => status.as_str(),
            EffectiveStatus::Overdue => "Overdue",
        }
    }
}

impl Serialize for EffectiveStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Booking as returned by the API: stored fields plus the two derived
/// ones evaluated at request time.
#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub effective_status: EffectiveStatus,
    pub action_required: bool,
}

impl BookingView {
    pub fn at(booking: Booking, now: DateTime<Utc>) -> Self {
        let effective_status = booking.effective_status(now);
        let action_required = booking.action_required(now);
        BookingView {
            booking,
            effective_status,
            action_required,
        }
    }
}

/// Fields staff supply when converting a reservation into a booking.
#[derive(Debug, Deserialize)]
pub struct ConvertToBookingRequest {
    pub payment_method: PaymentMethod,
    /// Whether the payment was captured during conversion.
    #[serde(default)]
    pub paid: bool,
    /// Start the rental immediately instead of waiting for pickup.
    #[serde(default)]
    pub activate_now: bool,
    pub license_id: Option<String>,
}

/// Direct staff booking, bypassing the reservation flow.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub car_id: i32,
    pub customer_name: String,
    pub customer_contact: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub activate_now: bool,
    pub license_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    #[serde(flatten)]
    pub payment_method: PaymentMethod,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking(status: BookingStatus, payment_status: PaymentStatus) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            reservation_id: None,
            car_id: 1,
            customer_name: "Maria Santos".into(),
            customer_contact: "maria@example.com".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 5, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            total_price: 31_500,
            status,
            payment_status,
            payment_method: None,
            license_id: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn ongoing_past_end_date_reads_as_overdue() {
        let b = booking(BookingStatus::Ongoing, PaymentStatus::Paid);
        let now = Utc.with_ymd_and_hms(2025, 5, 12, 9, 0, 0).unwrap();
        assert_eq!(b.effective_status(now), EffectiveStatus::Overdue);
        assert!(b.action_required(now));
    }

    #[test]
    fn overdue_is_not_persisted_and_reverses_with_the_clock() {
        let b = booking(BookingStatus::Ongoing, PaymentStatus::Paid);
        let before_end = Utc.with_ymd_and_hms(2025, 5, 9, 9, 0, 0).unwrap();
        assert_eq!(
            b.effective_status(before_end),
            EffectiveStatus::Stored(BookingStatus::Ongoing)
        );
        assert!(!b.action_required(before_end));
        assert_eq!(b.status, BookingStatus::Ongoing);
    }

    #[test]
    fn confirmed_past_end_date_is_not_overdue() {
        let b = booking(BookingStatus::Confirmed, PaymentStatus::Paid);
        let now = Utc.with_ymd_and_hms(2025, 5, 12, 9, 0, 0).unwrap();
        assert_eq!(
            b.effective_status(now),
            EffectiveStatus::Stored(BookingStatus::Confirmed)
        );
    }

    #[test]
    fn pending_payment_requires_action() {
        let b = booking(BookingStatus::Confirmed, PaymentStatus::Pending);
        let now = Utc.with_ymd_and_hms(2025, 5, 4, 9, 0, 0).unwrap();
        assert!(b.action_required(now));
    }

    #[test]
    fn cash_must_cover_the_total() {
        let short = PaymentMethod::Cash { amount_tendered: 30_000 };
        assert!(short.validate(31_500).is_err());
        let exact = PaymentMethod::Cash { amount_tendered: 31_500 };
        assert!(exact.validate(31_500).is_ok());
    }

    #[test]
    fn card_fields_must_be_present() {
        let missing = PaymentMethod::DebitCard {
            card_number: " ".into(),
            card_holder: "Maria Santos".into(),
            expiry: "12/27".into(),
        };
        assert!(missing.validate(1_000).is_err());
    }

    #[test]
    fn payment_method_serializes_with_original_labels() {
        let method = PaymentMethod::DebitCard {
            card_number: "4111".into(),
            card_holder: "Maria Santos".into(),
            expiry: "12/27".into(),
        };
        let value = serde_json::to_value(&method).unwrap();
        assert_eq!(value["method"], "Debit Card");
    }
}
