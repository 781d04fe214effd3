//! # Document Repository
//!
//! Database operations for quotes and invoices.
//!
//! ## Document Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Document Lifecycle                                │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                        │
//! │     └── create_draft(Quote) → Document { DEV-.., Draft }                │
//! │                                                                         │
//! │  2. EDIT                                                                │
//! │     └── save(&mut doc) → validate, refresh cached total, UPDATE         │
//! │                                                                         │
//! │  3. STATUS                                                              │
//! │     └── mark_sent() / sign() / update_status() → lifecycle rules        │
//! │                                                                         │
//! │  4. CONVERT (signed quotes, see ConversionService)                      │
//! │     └── list_by_source_quote() → invoices already issued                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sections, settings and signature are JSON columns: a document is always
//! read and written as a whole.

use batiflow_core::conversion::check_invoiced_within_quote;
use batiflow_core::lifecycle::{self, check_transition};
use batiflow_core::numbering::generate_number_on;
use batiflow_core::validation::validate_document;
use batiflow_core::{Document, DocumentStatus, DocumentType, Signature, ValidationError};
use chrono::{Local, NaiveDate, Utc};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::config::NumberingStrategy;
use crate::error::{DbError, DbResult};
use crate::pool::BillingPolicy;
use crate::repository::sequence::allocate_number;

const SELECT_DOCUMENT: &str = r#"
    SELECT
        id, doc_type, number, date, status, client_name, project_address,
        total, source_quote, signature_json, sections_json, settings_json, validity
    FROM documents
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    doc_type: DocumentType,
    number: String,
    date: NaiveDate,
    status: String,
    client_name: String,
    project_address: String,
    total: f64,
    source_quote: Option<String>,
    signature_json: Option<String>,
    sections_json: String,
    settings_json: String,
    validity: Option<String>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DbError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let status = DocumentStatus::from_parts(row.doc_type, &row.status).map_err(|e| {
            DbError::CorruptRow {
                table: "documents".to_string(),
                reason: format!("{}: {}", row.number, e),
            }
        })?;

        let signature = row
            .signature_json
            .as_deref()
            .map(serde_json::from_str::<Signature>)
            .transpose()?;

        Ok(Document {
            id: row.id,
            number: row.number,
            date: row.date,
            status,
            client_name: row.client_name,
            project_address: row.project_address,
            sections: serde_json::from_str(&row.sections_json)?,
            total: row.total,
            settings: serde_json::from_str(&row.settings_json)?,
            source_quote: row.source_quote,
            signature,
            validity: row.validity,
        })
    }
}

// =============================================================================
// Executor-generic Queries
// =============================================================================
// Shared by the repository (on the pool) and ConversionService (inside its
// transaction).

pub(crate) async fn fetch_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<Document>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_DOCUMENT} WHERE id = ?1");
    let row: Option<DocumentRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(Document::try_from).transpose()
}

pub(crate) async fn fetch_by_number<'e, E>(
    executor: E,
    account_id: &str,
    number: &str,
) -> DbResult<Option<Document>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_DOCUMENT} WHERE account_id = ?1 AND number = ?2");
    let row: Option<DocumentRow> = sqlx::query_as(&sql)
        .bind(account_id)
        .bind(number)
        .fetch_optional(executor)
        .await?;

    row.map(Document::try_from).transpose()
}

/// Invoices generated from `quote_number`, oldest first.
pub(crate) async fn fetch_by_source_quote<'e, E>(
    executor: E,
    account_id: &str,
    quote_number: &str,
) -> DbResult<Vec<Document>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "{SELECT_DOCUMENT} WHERE account_id = ?1 AND doc_type = 'invoice' AND source_quote = ?2 \
         ORDER BY date, number"
    );
    let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
        .bind(account_id)
        .bind(quote_number)
        .fetch_all(executor)
        .await?;

    rows.into_iter().map(Document::try_from).collect()
}

pub(crate) async fn insert_document<'e, E>(
    executor: E,
    account_id: &str,
    doc: &Document,
) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %doc.id, number = %doc.number, "Inserting document");

    let now = Utc::now();
    let signature_json = doc.signature.as_ref().map(serde_json::to_string).transpose()?;

    sqlx::query(
        r#"
        INSERT INTO documents (
            id, account_id, doc_type, number, date, status,
            client_name, project_address, total, source_quote,
            signature_json, sections_json, settings_json, validity,
            conversion_version, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14,
            0, ?15, ?15
        )
        "#,
    )
    .bind(&doc.id)
    .bind(account_id)
    .bind(doc.doc_type())
    .bind(&doc.number)
    .bind(doc.date)
    .bind(doc.status.as_str())
    .bind(&doc.client_name)
    .bind(&doc.project_address)
    .bind(doc.total)
    .bind(&doc.source_quote)
    .bind(signature_json)
    .bind(serde_json::to_string(&doc.sections)?)
    .bind(serde_json::to_string(&doc.settings)?)
    .bind(&doc.validity)
    .bind(now)
    .execute(executor)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, doc.number.clone()),
        other => other,
    })?;

    Ok(())
}

fn immutable(field: &str) -> DbError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("{field} cannot be changed once stored"),
    }
    .into()
}

/// Attempts at numbering a new document before giving up on unique
/// violations (random suffix collisions, imported numbers).
pub(crate) const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Numbers and inserts a new document on an open connection or transaction.
///
/// `build` turns the allocated number into the document to store. A number
/// already taken in the account is replaced by a fresh one.
pub(crate) async fn insert_numbered<F>(
    conn: &mut SqliteConnection,
    policy: &BillingPolicy,
    doc_type: DocumentType,
    date: NaiveDate,
    mut build: F,
) -> DbResult<Document>
where
    F: FnMut(String) -> Document,
{
    let mut attempt = 1;
    loop {
        let number = match policy.numbering {
            NumberingStrategy::Sequential => {
                allocate_number(&mut *conn, &policy.account_id, doc_type, date).await?
            }
            NumberingStrategy::Random => generate_number_on(doc_type, date),
        };

        let doc = build(number);
        match insert_document(&mut *conn, &policy.account_id, &doc).await {
            Ok(()) => return Ok(doc),
            Err(DbError::UniqueViolation { .. }) if attempt < MAX_NUMBER_ATTEMPTS => {
                warn!(number = %doc.number, attempt, "Document number already taken, renumbering");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Re-checks, before an invoice linked to a quote is written, that the
/// quote's invoices stay within its TTC.
///
/// The first statement writes the quote row, so a concurrent conversion of
/// the same quote waits for this transaction.
pub(crate) async fn check_linked_invoice(
    conn: &mut SqliteConnection,
    account_id: &str,
    invoice: &Document,
) -> DbResult<()> {
    let Some(quote_number) = invoice.source_quote.as_deref().filter(|_| invoice.is_invoice()) else {
        return Ok(());
    };

    let locked = sqlx::query(
        r#"
        UPDATE documents
        SET conversion_version = conversion_version + 1
        WHERE account_id = ?1 AND number = ?2 AND doc_type = 'quote'
        "#,
    )
    .bind(account_id)
    .bind(quote_number)
    .execute(&mut *conn)
    .await?;

    if locked.rows_affected() == 0 {
        return Err(DbError::not_found("Quote", quote_number));
    }

    let quote = fetch_by_number(&mut *conn, account_id, quote_number)
        .await?
        .ok_or_else(|| DbError::not_found("Quote", quote_number))?;
    let linked = fetch_by_source_quote(&mut *conn, account_id, quote_number).await?;

    check_invoiced_within_quote(&quote, &linked, invoice)?;
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for document database operations.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
    policy: BillingPolicy,
}

impl DocumentRepository {
    pub(crate) fn new(pool: SqlitePool, policy: BillingPolicy) -> Self {
        DocumentRepository { pool, policy }
    }

    /// Creates and stores an empty draft dated today.
    ///
    /// The number comes from the configured numbering strategy and the
    /// settings from the configured defaults.
    pub async fn create_draft(&self, doc_type: DocumentType) -> DbResult<Document> {
        let today = Local::now().date_naive();
        let mut tx = self.pool.begin().await?;

        let doc = insert_numbered(&mut *tx, &self.policy, doc_type, today, |number| {
            let mut doc = Document::new(doc_type, number);
            doc.settings = self.policy.default_settings;
            doc
        })
        .await?;
        tx.commit().await?;

        info!(id = %doc.id, number = %doc.number, "Draft created");
        Ok(doc)
    }

    /// Stores a complete document as is (imports, seeding).
    ///
    /// An invoice linked to a quote must fit within the quote's TTC.
    pub async fn insert(&self, doc: &Document) -> DbResult<()> {
        validate_document(doc)?;

        let mut tx = self.pool.begin().await?;
        check_linked_invoice(&mut *tx, &self.policy.account_id, doc).await?;
        insert_document(&mut *tx, &self.policy.account_id, doc).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Gets a document by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Document>> {
        fetch_by_id(&self.pool, id).await
    }

    /// Gets a document of this account by number.
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Document>> {
        fetch_by_number(&self.pool, &self.policy.account_id, number).await
    }

    async fn require(&self, id: &str) -> DbResult<Document> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Document", id))
    }

    /// Saves an edited document.
    ///
    /// A status change against the stored row must be a legal transition.
    /// Number, type and source quote are immutable.
    ///
    /// The cached total is recomputed from the sections, except on invoices
    /// generated from a quote: their total is the amount fixed at conversion
    /// (the copied quote discount would otherwise also shrink the deduction
    /// line), and the quote's invoices are re-checked against its TTC.
    pub async fn save(&self, doc: &mut Document) -> DbResult<()> {
        let stored = self.require(&doc.id).await?;

        if stored.number != doc.number {
            return Err(immutable("number"));
        }
        if stored.source_quote != doc.source_quote {
            return Err(immutable("sourceQuote"));
        }
        check_transition(&doc.number, stored.status, doc.status)?;

        let linked = doc.is_invoice() && doc.source_quote.is_some();
        if linked {
            doc.total = stored.total;
        } else {
            doc.refresh_total();
        }
        validate_document(doc)?;

        debug!(id = %doc.id, total = doc.total, "Saving document");

        let signature_json = doc.signature.as_ref().map(serde_json::to_string).transpose()?;

        let mut tx = self.pool.begin().await?;
        if linked {
            check_linked_invoice(&mut *tx, &self.policy.account_id, doc).await?;
        }

        sqlx::query(
            r#"
            UPDATE documents SET
                date = ?2,
                status = ?3,
                client_name = ?4,
                project_address = ?5,
                total = ?6,
                signature_json = ?7,
                sections_json = ?8,
                settings_json = ?9,
                validity = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&doc.id)
        .bind(doc.date)
        .bind(doc.status.as_str())
        .bind(&doc.client_name)
        .bind(&doc.project_address)
        .bind(doc.total)
        .bind(signature_json)
        .bind(serde_json::to_string(&doc.sections)?)
        .bind(serde_json::to_string(&doc.settings)?)
        .bind(&doc.validity)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Lists documents of one type, newest first.
    pub async fn list_by_type(&self, doc_type: DocumentType) -> DbResult<Vec<Document>> {
        let sql = format!(
            "{SELECT_DOCUMENT} WHERE account_id = ?1 AND doc_type = ?2 ORDER BY date DESC, number DESC"
        );
        let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
            .bind(&self.policy.account_id)
            .bind(doc_type)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    /// Invoices generated from a quote, oldest first.
    pub async fn list_by_source_quote(&self, quote_number: &str) -> DbResult<Vec<Document>> {
        fetch_by_source_quote(&self.pool, &self.policy.account_id, quote_number).await
    }

    /// Moves a document to `target` through the lifecycle rules.
    pub async fn update_status(&self, id: &str, target: DocumentStatus) -> DbResult<Document> {
        let mut doc = self.require(id).await?;
        lifecycle::transition(&mut doc, target)?;
        self.write_status(&doc).await?;
        Ok(doc)
    }

    /// Share action: draft → pending, other statuses unchanged.
    pub async fn mark_sent(&self, id: &str) -> DbResult<Document> {
        let mut doc = self.require(id).await?;
        if lifecycle::mark_sent(&mut doc) {
            self.write_status(&doc).await?;
        }
        Ok(doc)
    }

    /// Records a signature on a quote.
    pub async fn sign(&self, id: &str, signature: Signature) -> DbResult<Document> {
        let mut doc = self.require(id).await?;
        lifecycle::sign(&mut doc, signature)?;
        self.write_status(&doc).await?;
        Ok(doc)
    }

    async fn write_status(&self, doc: &Document) -> DbResult<()> {
        let signature_json = doc.signature.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            "UPDATE documents SET status = ?2, signature_json = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(&doc.id)
        .bind(doc.status.as_str())
        .bind(signature_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a document.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Document", id));
        }

        info!(id = %id, "Document deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
