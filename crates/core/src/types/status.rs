//! Status enums for various entities.
//!
//! With the `postgres` feature each enum maps to a `PostgreSQL` enum type of
//! the same snake_case name (see `crates/server/migrations`).

use serde::{Deserialize, Serialize};

/// Implements `Display`, `FromStr` and `as_str` from a variant/string table.
macro_rules! impl_status_str {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire/database representation.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($name), ": {}"), s)),
                }
            }
        }
    };
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Storefront customer.
    #[default]
    Customer,
    /// Back-office administrator.
    Admin,
}

impl_status_str!(UserRole {
    Customer => "customer",
    Admin => "admin",
});

/// Catalog visibility of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Not yet visible in the storefront.
    #[default]
    Draft,
    /// Listed and purchasable.
    Active,
    /// Withdrawn; kept for order history.
    Archived,
}

impl_status_str!(ProductStatus {
    Draft => "draft",
    Active => "active",
    Archived => "archived",
});

/// Order fulfillment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl_status_str!(OrderStatus {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Whether an order may move from `self` to `next`.
    ///
    /// ```text
    /// pending ──► processing ──► shipped ──► delivered
    ///    │             │
    ///    └──► cancelled ◄┘
    /// ```
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Delivered and cancelled orders never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Stock has left the shelf but not yet been returned.
    #[must_use]
    pub const fn holds_stock(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Order payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl_status_str!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

/// State of a single M-Pesa STK push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_attempt_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAttemptStatus {
    /// Prompt sent, waiting for the customer.
    #[default]
    Pending,
    /// Customer paid; receipt recorded.
    Completed,
    /// Rejected by M-Pesa (insufficient funds, timeout, wrong PIN...).
    Failed,
    /// Customer dismissed the prompt.
    Cancelled,
}

impl_status_str!(PaymentAttemptStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl PaymentAttemptStatus {
    /// Map an STK `ResultCode` to an attempt status.
    ///
    /// `0` is success and `1032` is "request cancelled by user"; every other
    /// code is a failure.
    #[must_use]
    pub const fn from_result_code(code: i64) -> Self {
        match code {
            0 => Self::Completed,
            1032 => Self::Cancelled,
            _ => Self::Failed,
        }
    }
}

/// Kind of stock movement in the inventory ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "movement_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock received from a supplier.
    Purchase,
    /// Stock sold to a customer.
    Sale,
    /// Stock returned by a customer (or restocked from a cancelled order).
    Return,
    /// Manual correction; signed.
    Adjustment,
}

impl_status_str!(MovementType {
    Purchase => "purchase",
    Sale => "sale",
    Return => "return",
    Adjustment => "adjustment",
});

/// Lifecycle of a customer quote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "quote_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Waiting for the sales team.
    #[default]
    Pending,
    /// Priced by an admin; awaiting the customer.
    Quoted,
    Accepted,
    Rejected,
    /// Quoted but not answered before `valid_until`.
    Expired,
}

impl_status_str!(QuoteStatus {
    Pending => "pending",
    Quoted => "quoted",
    Accepted => "accepted",
    Rejected => "rejected",
    Expired => "expired",
});

/// Moderation state of a product review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "review_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl_status_str!(ReviewStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_transitions_forward() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_order_transitions_cancel() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Delivered.can_transition_to(*next));
            assert!(!OrderStatus::Cancelled.can_transition_to(*next));
        }
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_no_skipping_or_self_transition() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_result_code_mapping() {
        assert_eq!(
            PaymentAttemptStatus::from_result_code(0),
            PaymentAttemptStatus::Completed
        );
        assert_eq!(
            PaymentAttemptStatus::from_result_code(1032),
            PaymentAttemptStatus::Cancelled
        );
        assert_eq!(
            PaymentAttemptStatus::from_result_code(1),
            PaymentAttemptStatus::Failed
        );
        assert_eq!(
            PaymentAttemptStatus::from_result_code(2001),
            PaymentAttemptStatus::Failed
        );
    }

    #[test]
    fn test_string_roundtrip() {
        for t in MovementType::ALL {
            assert_eq!(t.as_str().parse::<MovementType>().unwrap(), *t);
        }
        assert_eq!(MovementType::Return.to_string(), "return");
        assert!("refund".parse::<MovementType>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&PaymentAttemptStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let role: UserRole = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, UserRole::Admin);
    }
}
