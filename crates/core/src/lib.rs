//! SolarShop Core - Shared types library.
//!
//! This crate provides common types used across all SolarShop components:
//! - `server` - Storefront and admin JSON API
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure domain rules - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, phone numbers and statuses
//! - [`ledger`] - Stock movement arithmetic for the inventory ledger

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ledger;
pub mod types;

pub use ledger::LedgerError;
pub use types::*;
