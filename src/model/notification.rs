use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reservation,
    Cancellation,
    Booking,
    Payment,
    Expiration,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Reservation => "reservation",
            NotificationKind::Cancellation => "cancellation",
            NotificationKind::Booking => "booking",
            NotificationKind::Payment => "payment",
            NotificationKind::Expiration => "expiration",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reservation" => Ok(NotificationKind::Reservation),
            "cancellation" => Ok(NotificationKind::Cancellation),
            "booking" => Ok(NotificationKind::Booking),
            "payment" => Ok(NotificationKind::Payment),
            "expiration" => Ok(NotificationKind::Expiration),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// Append-only lifecycle event. `user_id == None` means the event is a
/// broadcast to staff; set, it targets one requester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub user_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// What the lifecycle manager hands to the sink; the store assigns the
/// id, read flag and timestamp.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}
