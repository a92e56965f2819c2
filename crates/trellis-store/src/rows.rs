//! Column decoding shared by the `row_to_*` helpers.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

/// Wrap a decode failure of column `idx`.
pub(crate) fn conversion<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Read a UUID-keyed id from column `idx`.
pub(crate) fn id<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Result<T, uuid::Error>) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    parse(&text).map_err(|e| conversion(idx, e))
}

pub(crate) fn opt_id<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Result<T, uuid::Error>,
) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse(&t))
        .transpose()
        .map_err(|e| conversion(idx, e))
}

/// Read an RFC 3339 timestamp from column `idx`.
pub(crate) fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion(idx, e))
}
