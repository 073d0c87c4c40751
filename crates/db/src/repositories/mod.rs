use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use slideboard_core::domain::measure::{MeasureSheet, MeasureSheetId, MeasureTaskId};
use slideboard_core::domain::product::{Product, ProductId};
use slideboard_core::domain::quote::{Quote, QuoteId, QuoteTree, TenantId};
use slideboard_core::errors::ApplicationError;

pub mod measure;
pub mod product;
pub mod quote;

pub use measure::SqlMeasureRepository;
pub use product::SqlProductRepository;
pub use quote::SqlQuoteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// Whether the store gave up because another writer held the lock or won a
    /// uniqueness race. The caller's transaction was rolled back and can be retried.
    pub fn is_contention(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(error)) => {
                if error.is_unique_violation() {
                    return true;
                }
                // SQLITE_BUSY, SQLITE_LOCKED and their extended codes.
                if matches!(error.code().as_deref(), Some("5" | "6" | "261" | "262" | "517")) {
                    return true;
                }
                let message = error.message().to_ascii_lowercase();
                message.contains("database is locked") || message.contains("busy")
            }
            Self::Database(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        if error.is_contention() {
            Self::Conflict(error.to_string())
        } else {
            Self::Persistence(error.to_string())
        }
    }
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_tree(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
    ) -> Result<Option<QuoteTree>, RepositoryError>;

    /// Every version in `id`'s family, oldest first.
    async fn list_family(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
    ) -> Result<Vec<Quote>, RepositoryError>;

    async fn insert_tree(&self, tree: &QuoteTree) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MeasureRepository: Send + Sync {
    async fn latest_sheet_for_task(
        &self,
        tenant_id: &TenantId,
        task_id: &MeasureTaskId,
    ) -> Result<Option<MeasureSheet>, RepositoryError>;

    async fn find_sheet(
        &self,
        tenant_id: &TenantId,
        id: &MeasureSheetId,
    ) -> Result<Option<MeasureSheet>, RepositoryError>;

    async fn save_sheet(&self, sheet: &MeasureSheet) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &ProductId,
    ) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn decimal_column(row: &SqliteRow, name: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = column(row, name)?;
    parse_decimal(name, &raw)
}

pub(crate) fn optional_decimal_column(
    row: &SqliteRow,
    name: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let raw: Option<String> = column(row, name)?;
    raw.map(|raw| parse_decimal(name, &raw)).transpose()
}

pub(crate) fn timestamp_column(
    row: &SqliteRow,
    name: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = column(row, name)?;
    parse_timestamp(name, &raw)
}

pub(crate) fn optional_timestamp_column(
    row: &SqliteRow,
    name: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    let raw: Option<String> = column(row, name)?;
    raw.map(|raw| parse_timestamp(name, &raw)).transpose()
}

pub(crate) fn parse_enum<T>(name: &str, raw: &str) -> Result<T, RepositoryError>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>().map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

fn parse_decimal(name: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw.trim())
        .map_err(|e| RepositoryError::Decode(format!("{name}: `{raw}` is not a decimal: {e}")))
}

fn parse_timestamp(name: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{name}: `{raw}` is not RFC 3339: {e}")))
}

/// Fixed-width UTC text, e.g. `2026-03-01T09:30:00.000000Z`.
pub(crate) fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}
