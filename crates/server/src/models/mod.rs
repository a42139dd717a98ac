//! Domain models.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod pagination;
pub mod payment;
pub mod quote;
pub mod review;
pub mod session;
pub mod settings;
pub mod user;

pub use pagination::{Page, PageParams};
pub use session::{CurrentUser, keys as session_keys};
pub use settings::StoreSettings;
pub use user::User;
