//! # Sequence Repository
//!
//! Persistent document numbering.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  document_sequences (account_id, doc_type, period) → next_value         │
//! │                                                                         │
//! │  allocate(account, invoice, 2026-10)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT ... VALUES (.., 2)                                              │
//! │  ON CONFLICT DO UPDATE SET next_value = next_value + 1                  │
//! │  RETURNING next_value - 1           ← one statement, no read-then-write │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  "FAC-2026-10-0007"                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A new month starts again at 0001. Allocation can run inside a caller's
//! transaction (see [`allocate_number`]), so a rolled-back conversion does
//! not burn a number.

use batiflow_core::numbering::format_number;
use batiflow_core::DocumentType;
use chrono::{Datelike, NaiveDate};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Repository for numbering sequences.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Allocates the next number for `doc_type` in the month of `date`.
    pub async fn next_number(
        &self,
        account_id: &str,
        doc_type: DocumentType,
        date: NaiveDate,
    ) -> DbResult<String> {
        allocate_number(&self.pool, account_id, doc_type, date).await
    }

    /// Value the next allocation will return, without allocating it.
    pub async fn peek(
        &self,
        account_id: &str,
        doc_type: DocumentType,
        date: NaiveDate,
    ) -> DbResult<u32> {
        let next: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT next_value FROM document_sequences
            WHERE account_id = ?1 AND doc_type = ?2 AND period = ?3
            "#,
        )
        .bind(account_id)
        .bind(doc_type)
        .bind(period(date))
        .fetch_optional(&self.pool)
        .await?;

        Ok(next.map_or(1, |n| n as u32))
    }
}

/// `YYYY-MM` key of the sequence a date belongs to.
fn period(date: NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

/// Allocates a number on any executor (pool or open transaction).
pub(crate) async fn allocate_number<'e, E>(
    executor: E,
    account_id: &str,
    doc_type: DocumentType,
    date: NaiveDate,
) -> DbResult<String>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO document_sequences (account_id, doc_type, period, next_value)
        VALUES (?1, ?2, ?3, 2)
        ON CONFLICT (account_id, doc_type, period)
        DO UPDATE SET next_value = next_value + 1
        RETURNING next_value - 1
        "#,
    )
    .bind(account_id)
    .bind(doc_type)
    .bind(period(date))
    .fetch_one(executor)
    .await?;

    let number = format_number(doc_type, date, sequence as u32);
    debug!(account_id = %account_id, number = %number, "Allocated document number");
    Ok(number)
}

// =============================================================================
// Unit Tests
// =============================================================================
