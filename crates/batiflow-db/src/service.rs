//! # Conversion Service
//!
//! Runs the quote → invoice protocol against the database so that two
//! conversions of the same quote can never over-invoice it.
//!
//! ## Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. UPDATE documents SET conversion_version += 1 WHERE id = quote      │
//! │      └── first statement is a write: takes the SQLite write lock,       │
//! │          a concurrent conversion waits here (busy_timeout)              │
//! │   2. SELECT quote                                                       │
//! │   3. SELECT invoices WHERE source_quote = quote.number                  │
//! │      └── sees every invoice committed before the lock was granted       │
//! │   4. plan_conversion(quote, quote.settings, history, mode)              │
//! │      └── rejection → ROLLBACK (nothing written, no number burned)       │
//! │   5. allocate number (same transaction)                                 │
//! │   6. INSERT invoice (number taken → renumber, up to 5 attempts)         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use batiflow_core::conversion::{already_invoiced, build_invoice, plan_conversion, ConversionMode};
use batiflow_core::{Document, DocumentType};
use chrono::{Local, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::BillingPolicy;
use crate::repository::document::{fetch_by_id, fetch_by_source_quote, insert_numbered};

/// Converts stored quotes into stored invoices.
#[derive(Debug, Clone)]
pub struct ConversionService {
    pool: SqlitePool,
    policy: BillingPolicy,
}

impl ConversionService {
    pub(crate) fn new(pool: SqlitePool, policy: BillingPolicy) -> Self {
        ConversionService { pool, policy }
    }

    /// Converts the quote `quote_id` using its stored settings.
    ///
    /// Returns the stored invoice. Business rejections come back as
    /// `DbError::Core(CoreError::Conversion(..))` and leave the database
    /// untouched.
    pub async fn convert(&self, quote_id: &str, mode: ConversionMode) -> DbResult<Document> {
        let mut tx = self.pool.begin().await?;

        let bumped = sqlx::query(
            r#"
            UPDATE documents
            SET conversion_version = conversion_version + 1, updated_at = ?2
            WHERE id = ?1 AND account_id = ?3
            "#,
        )
        .bind(quote_id)
        .bind(Utc::now())
        .bind(&self.policy.account_id)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            return Err(DbError::not_found("Document", quote_id));
        }

        let quote = fetch_by_id(&mut *tx, quote_id)
            .await?
            .ok_or_else(|| DbError::not_found("Document", quote_id))?;
        let history =
            fetch_by_source_quote(&mut *tx, &self.policy.account_id, &quote.number).await?;

        let plan = match plan_conversion(&quote, &quote.settings, &history, mode) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(quote = %quote.number, error = %err, "Conversion refused");
                tx.rollback().await?;
                return Err(err.into());
            }
        };

        let today = Local::now().date_naive();
        let invoice = insert_numbered(&mut *tx, &self.policy, DocumentType::Invoice, today, |number| {
            build_invoice(&quote, &plan, number, today)
        })
        .await?;
        tx.commit().await?;

        info!(
            quote = %quote.number,
            invoice = %invoice.number,
            mode = ?mode,
            total = invoice.total,
            already_invoiced = plan.already_invoiced,
            "Invoice stored"
        );

        Ok(invoice)
    }

    /// Amount still to invoice on a quote, from its stored invoices.
    pub async fn remaining_to_pay(&self, quote_id: &str) -> DbResult<f64> {
        let quote = fetch_by_id(&self.pool, quote_id)
            .await?
            .ok_or_else(|| DbError::not_found("Document", quote_id))?;
        let history =
            fetch_by_source_quote(&self.pool, &self.policy.account_id, &quote.number).await?;

        let invoiced = already_invoiced(&quote.number, &history);
        Ok(quote.totals().total_ttc - invoiced)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use batiflow_core::{
        AmountType, ConversionError, DocumentStatus, InvoiceStatus, LineItem, Nature,
        QuoteStatus, Section, Signature,
    };

    /// Stores a signed quote worth 1000 TTC (VAT-free lines).
    async fn signed_quote(db: &Database) -> Document {
        let repo = db.documents();
        let mut quote = repo.create_draft(DocumentType::Quote).await.unwrap();
        quote.client_name = "SARL Duval".to_string();
        quote.project_address = "3 impasse des Vignes, Narbonne".to_string();
        quote.sections.push(Section::new("Toiture").with_items(vec![
            LineItem::new("Pose de tuiles", 1.0, 600.0, Nature::Labor).with_vat_rate(0.0),
            LineItem::new("Tuiles canal", 1.0, 400.0, Nature::Material).with_vat_rate(0.0),
        ]));
        repo.save(&mut quote).await.unwrap();
        repo.sign(&quote.id, Signature::captured_now("signatures/duval.png"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_deposit_then_final() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let quote = signed_quote(&db).await;
        let service = db.conversions();

        let deposit = service.convert(&quote.id, ConversionMode::Deposit).await.unwrap();
        assert_eq!(deposit.total, 300.0);
        assert_eq!(deposit.status, DocumentStatus::Invoice(InvoiceStatus::Draft));
        assert_eq!(deposit.source_quote.as_deref(), Some(quote.number.as_str()));
        assert!(deposit.number.ends_with("-0001"));

        assert_eq!(service.remaining_to_pay(&quote.id).await.unwrap(), 700.0);

        let balance = service.convert(&quote.id, ConversionMode::Final).await.unwrap();
        assert_eq!(balance.total, 700.0);
        assert!(balance.number.ends_with("-0002"));
        assert_eq!(balance.sections.len(), 2);

        let err = service.convert(&quote.id, ConversionMode::Final).await.unwrap_err();
        assert!(matches!(
            err.as_conversion(),
            Some(ConversionError::AlreadyFullyInvoiced { .. })
        ));

        let stored = db.documents().list_by_source_quote(&quote.number).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.iter().map(|d| d.total).sum::<f64>(), 1000.0);
    }

    #[tokio::test]
    async fn test_saving_converted_invoices_keeps_quote_total() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.documents();

        // 1000 HT at 20 %, 10 % discount → 1080 TTC
        let mut quote = repo.create_draft(DocumentType::Quote).await.unwrap();
        quote.client_name = "Mme Roussel".to_string();
        quote.sections.push(Section::new("Façade").with_items(vec![LineItem::new(
            "Ravalement",
            1.0,
            1000.0,
            Nature::Labor,
        )]));
        quote.settings.discount_value = 10.0;
        repo.save(&mut quote).await.unwrap();
        assert_eq!(quote.total, 1080.0);
        repo.sign(&quote.id, Signature::captured_now("signatures/roussel.png"))
            .await
            .unwrap();

        let service = db.conversions();
        let deposit = service.convert(&quote.id, ConversionMode::Deposit).await.unwrap();
        let mut balance = service.convert(&quote.id, ConversionMode::Final).await.unwrap();
        let balance_total = balance.total;
        assert!((deposit.total + balance_total - 1080.0).abs() < 1e-9);

        // unchanged re-save, then an edit with a tampered total
        repo.save(&mut balance).await.unwrap();
        assert_eq!(balance.total, balance_total);

        balance.client_name = "Mme Roussel-Petit".to_string();
        balance.total = 5000.0;
        repo.save(&mut balance).await.unwrap();
        assert_eq!(balance.total, balance_total);

        let invoiced: f64 = repo
            .list_by_source_quote(&quote.number)
            .await
            .unwrap()
            .iter()
            .map(|d| d.total)
            .sum();
        assert!(invoiced <= 1080.0 + 1e-9);
        assert!(service.remaining_to_pay(&quote.id).await.unwrap().abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_saving_invoice_rechecks_quote_total() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.documents();
        let quote = signed_quote(&db).await;

        let mut balance = db
            .conversions()
            .convert(&quote.id, ConversionMode::Final)
            .await
            .unwrap();
        assert_eq!(balance.total, 1000.0);

        // the signed quote is discounted after invoicing
        let mut quote = repo.get_by_id(&quote.id).await.unwrap().unwrap();
        quote.settings.discount_type = AmountType::Fixed;
        quote.settings.discount_value = 100.0;
        repo.save(&mut quote).await.unwrap();

        balance.status = DocumentStatus::Invoice(InvoiceStatus::Pending);
        let err = repo.save(&mut balance).await.unwrap_err();
        assert!(matches!(
            err.as_conversion(),
            Some(ConversionError::ExceedsQuoteTotal { .. })
        ));

        let stored = repo.get_by_id(&balance.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Invoice(InvoiceStatus::Draft));
    }

    #[tokio::test]
    async fn test_rejection_writes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.documents();

        let mut quote = signed_quote(&db).await;
        quote.settings.down_payment_type = AmountType::Fixed;
        quote.settings.down_payment_value = 1500.0;
        // settings of a signed quote stay editable
        repo.save(&mut quote).await.unwrap();

        let err = db
            .conversions()
            .convert(&quote.id, ConversionMode::Deposit)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_conversion(),
            Some(ConversionError::DepositExceedsBalance { .. })
        ));

        assert!(repo.list_by_type(DocumentType::Invoice).await.unwrap().is_empty());

        // no invoice number was consumed
        let next = db
            .sequences()
            .peek(db.account_id(), DocumentType::Invoice, Local::now().date_naive())
            .await
            .unwrap();
        assert_eq!(next, 1);
    }

    #[tokio::test]
    async fn test_unsigned_quote_and_missing_quote() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let quote = db.documents().create_draft(DocumentType::Quote).await.unwrap();

        let err = db
            .conversions()
            .convert(&quote.id, ConversionMode::Final)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_conversion(),
            Some(ConversionError::QuoteNotSigned { .. })
        ));

        let err = db
            .conversions()
            .convert("7f9c0a4e-0000-4000-8000-000000000000", ConversionMode::Final)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let stored = db.documents().get_by_id(&quote.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Quote(QuoteStatus::Draft));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_conversions_never_over_invoice() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("billing.db")).max_connections(4))
            .await
            .unwrap();
        let quote = signed_quote(&db).await;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = db.conversions();
                let quote_id = quote.id.clone();
                tokio::spawn(async move { service.convert(&quote_id, ConversionMode::Final).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(invoice) => {
                    assert_eq!(invoice.total, 1000.0);
                    succeeded += 1;
                }
                Err(err) => assert!(matches!(
                    err.as_conversion(),
                    Some(ConversionError::AlreadyFullyInvoiced { .. })
                )),
            }
        }
        assert_eq!(succeeded, 1);

        let invoiced: f64 = db
            .documents()
            .list_by_source_quote(&quote.number)
            .await
            .unwrap()
            .iter()
            .map(|d| d.total)
            .sum();
        assert_eq!(invoiced, 1000.0);
    }
}
