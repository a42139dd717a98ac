//! Inventory maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! ss-cli inventory audit
//! ```
//!
//! The audit exits non-zero when any product's stored balance disagrees
//! with the sum of its stock movements, so it can run from cron.

use solarshop_server::db::{InventoryRepository, RepositoryError};
use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0} product(s) disagree with the stock ledger")]
    Discrepancies(usize),
}

/// Compare every product's stock against its movement history.
pub async fn audit() -> Result<(), InventoryError> {
    let pool = connect().await?;
    let discrepancies = InventoryRepository::new(&pool).audit().await?;

    if discrepancies.is_empty() {
        tracing::info!("Stock balances match the movement ledger");
        return Ok(());
    }

    for d in &discrepancies {
        tracing::warn!(
            product_id = %d.product_id,
            sku = %d.sku,
            stock = d.stock_quantity,
            ledger = d.ledger_quantity,
            movements = d.movement_count,
            difference = d.difference(),
            "{}",
            d.name
        );
    }

    Err(InventoryError::Discrepancies(discrepancies.len()))
}
