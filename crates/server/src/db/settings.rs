//! Store settings key/value storage.

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::settings::StoreSettings;

/// Load settings, falling back to defaults for missing keys.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn load(pool: &PgPool) -> Result<StoreSettings, RepositoryError> {
    let pairs = sqlx::query_as::<_, (String, JsonValue)>("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await?;
    Ok(StoreSettings::from_pairs(pairs))
}

/// Persist every setting in one transaction.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if a value cannot be serialized.
/// Returns `RepositoryError::Database` if a query fails.
pub async fn save(pool: &PgPool, settings: &StoreSettings) -> Result<(), RepositoryError> {
    let pairs = settings
        .to_pairs()
        .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

    let mut tx = pool.begin().await?;
    for (key, value) in pairs {
        sqlx::query(
            r"
            INSERT INTO settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
