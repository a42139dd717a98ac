//! Business logic that spans repositories or talks to external services.

pub mod auth;
pub mod checkout;
pub mod email;
pub mod mpesa;
pub mod orders;
pub mod uploads;
