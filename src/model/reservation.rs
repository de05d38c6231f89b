use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status machine for a reservation. WAITING_FOR_APPROVAL is the sole
/// initial state; the other three are terminal for the reservation
/// (BOOKED hands off to a companion booking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    WaitingForApproval,
    Booked,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::WaitingForApproval => "WAITING_FOR_APPROVAL",
            ReservationStatus::Booked => "BOOKED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::WaitingForApproval)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING_FOR_APPROVAL" => Ok(ReservationStatus::WaitingForApproval),
            "BOOKED" => Ok(ReservationStatus::Booked),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "EXPIRED" => Ok(ReservationStatus::Expired),
            other => Err(format!("unknown reservation status: {other}")),
        }
    }
}

/// A customer's provisional hold on a car pending approval or
/// conversion. Never deleted, only status-terminated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub car_id: i32,
    pub user_id: Uuid,
    pub customer_name: String,
    pub customer_contact: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub total_price: i64,
    pub status: ReservationStatus,
    pub has_license_file: bool,
    pub has_contract_file: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub car_id: i32,
    pub customer_name: String,
    pub customer_contact: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub has_license_file: bool,
    #[serde(default)]
    pub has_contract_file: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReservationRequest {
    pub customer_name: Option<String>,
    pub customer_contact: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub has_license_file: Option<bool>,
    pub has_contract_file: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReservationQuery {
    pub status: Option<ReservationStatus>,
}

#[derive(Debug, Serialize)]
pub struct ReservationListResponse {
    pub reservations: Vec<Reservation>,
    pub total: usize,
}

/// One row of the user-dashboard recent-activity feed, projected from
/// the reservation history.
#[derive(Debug, Serialize)]
pub struct RecentActivity {
    pub id: Uuid,
    pub action: ActivityAction,
    pub car_name: String,
    pub timestamp: DateTime<Utc>,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Created,
    Cancelled,
}

impl Reservation {
    /// Timestamp the activity feed sorts by: cancellation time when the
    /// reservation was cancelled, else last update, else creation.
    pub fn activity_timestamp(&self) -> DateTime<Utc> {
        if self.status == ReservationStatus::Cancelled {
            self.cancelled_at
                .or(self.updated_at)
                .unwrap_or(self.created_at)
        } else {
            self.created_at
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ReservationStatus::WaitingForApproval,
            ReservationStatus::Booked,
            ReservationStatus::Cancelled,
            ReservationStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<ReservationStatus>(), Ok(status));
        }
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&ReservationStatus::WaitingForApproval).unwrap();
        assert_eq!(json, "\"WAITING_FOR_APPROVAL\"");
    }

    #[test]
    fn only_waiting_is_non_terminal() {
        assert!(!ReservationStatus::WaitingForApproval.is_terminal());
        assert!(ReservationStatus::Booked.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Expired.is_terminal());
    }
}
