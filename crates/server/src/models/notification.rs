//! In-app notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solarshop_core::{NotificationId, UserId};

use super::pagination::PageParams;

/// Notification kinds written by the system.
pub mod kind {
    pub const ORDER_PLACED: &str = "order_placed";
    pub const PAYMENT_RECEIVED: &str = "payment_received";
    pub const ORDER_STATUS: &str = "order_status";
    pub const QUOTE_RESPONDED: &str = "quote_responded";
    pub const BROADCAST: &str = "broadcast";
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A notification about to be written for one user.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

/// Who receives a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    All,
    Customers,
    Admins,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Broadcast {
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    #[serde(default)]
    pub audience: Audience,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl NotificationQuery {
    #[must_use]
    pub const fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
