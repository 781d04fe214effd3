//! # Document Lifecycle
//!
//! Status state machine for quotes and invoices.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  QUOTE                                                                  │
//! │                                                                         │
//! │   Draft ──send──► Pending ──sign──► Signed      (terminal, invoiceable) │
//! │     │  ◄──recall──   │                                                  │
//! │     └─────sign───────┼────────────► Signed                              │
//! │                      └──refuse────► Rejected ──reopen──► Draft          │
//! │                                                                         │
//! │  INVOICE                                                                │
//! │                                                                         │
//! │   Draft ──send──► Pending ──pay──► Paid          (terminal)             │
//! │         ◄──recall──  │                                                  │
//! │                      └──late───► Overdue ──pay──► Paid                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every status write goes through [`transition`], [`sign`], [`mark_sent`]
//! or [`mark_paid`]. Signed is only reachable by capturing a signature.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use ts_rs::TS;

use crate::error::{LifecycleError, ValidationError};
use crate::types::{Document, DocumentType, Signature};

// =============================================================================
// Quote Status
// =============================================================================

/// Status of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Being written.
    #[default]
    Draft,
    /// Sent to the client, awaiting an answer.
    Pending,
    /// Accepted with a signature. Unlocks invoicing.
    Signed,
    /// Declined by the client.
    Rejected,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 4] = [
        QuoteStatus::Draft,
        QuoteStatus::Pending,
        QuoteStatus::Signed,
        QuoteStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Pending => "pending",
            QuoteStatus::Signed => "signed",
            QuoteStatus::Rejected => "rejected",
        }
    }

    /// Statuses reachable in one step.
    pub fn next_statuses(&self) -> &'static [QuoteStatus] {
        match self {
            QuoteStatus::Draft => &[QuoteStatus::Pending, QuoteStatus::Signed],
            QuoteStatus::Pending => &[
                QuoteStatus::Draft,
                QuoteStatus::Signed,
                QuoteStatus::Rejected,
            ],
            QuoteStatus::Rejected => &[QuoteStatus::Draft],
            QuoteStatus::Signed => &[],
        }
    }

    pub fn can_transition_to(&self, target: QuoteStatus) -> bool {
        self.next_statuses().contains(&target)
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuoteStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "quote status".to_string(),
                allowed: QuoteStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    pub fn next_statuses(&self) -> &'static [InvoiceStatus] {
        match self {
            InvoiceStatus::Draft => &[InvoiceStatus::Pending],
            InvoiceStatus::Pending => &[
                InvoiceStatus::Draft,
                InvoiceStatus::Paid,
                InvoiceStatus::Overdue,
            ],
            InvoiceStatus::Overdue => &[InvoiceStatus::Paid],
            InvoiceStatus::Paid => &[],
        }
    }

    pub fn can_transition_to(&self, target: InvoiceStatus) -> bool {
        self.next_statuses().contains(&target)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "invoice status".to_string(),
                allowed: InvoiceStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Document Status
// =============================================================================

/// Status tagged with the document type it belongs to.
///
/// Serialized as `{"type": "quote", "value": "signed"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DocumentStatus {
    Quote(QuoteStatus),
    Invoice(InvoiceStatus),
}

impl DocumentStatus {
    pub fn doc_type(&self) -> DocumentType {
        match self {
            DocumentStatus::Quote(_) => DocumentType::Quote,
            DocumentStatus::Invoice(_) => DocumentType::Invoice,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Quote(s) => s.as_str(),
            DocumentStatus::Invoice(s) => s.as_str(),
        }
    }

    /// Rebuilds a status from its stored columns.
    pub fn from_parts(doc_type: DocumentType, status: &str) -> Result<Self, ValidationError> {
        Ok(match doc_type {
            DocumentType::Quote => DocumentStatus::Quote(status.parse()?),
            DocumentType::Invoice => DocumentStatus::Invoice(status.parse()?),
        })
    }

    pub fn is_draft(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Quote(QuoteStatus::Draft) | DocumentStatus::Invoice(InvoiceStatus::Draft)
        )
    }

    /// Draft and pending documents may still have their lines edited.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Quote(QuoteStatus::Draft | QuoteStatus::Pending)
                | DocumentStatus::Invoice(InvoiceStatus::Draft | InvoiceStatus::Pending)
        )
    }

    /// Only signed quotes may be converted into invoices.
    pub fn allows_conversion(&self) -> bool {
        matches!(self, DocumentStatus::Quote(QuoteStatus::Signed))
    }

    /// Quotes still waiting on the client (dashboard counter).
    pub fn is_open_quote(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Quote(QuoteStatus::Draft | QuoteStatus::Pending)
        )
    }

    pub fn can_transition_to(&self, target: DocumentStatus) -> bool {
        match (self, target) {
            (DocumentStatus::Quote(from), DocumentStatus::Quote(to)) => from.can_transition_to(to),
            (DocumentStatus::Invoice(from), DocumentStatus::Invoice(to)) => {
                from.can_transition_to(to)
            }
            _ => false,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transitions
// =============================================================================

/// Checks that `target` may be written over `current`.
///
/// Re-applying the current status is accepted. `Signed` is refused: it is
/// only reachable through [`sign`].
pub fn check_transition(
    number: &str,
    current: DocumentStatus,
    target: DocumentStatus,
) -> Result<(), LifecycleError> {
    if current.doc_type() != target.doc_type() {
        return Err(LifecycleError::WrongDocumentType {
            doc_type: current.doc_type().to_string(),
            status: target.to_string(),
        });
    }

    if current == target {
        return Ok(());
    }

    if target == DocumentStatus::Quote(QuoteStatus::Signed) {
        return Err(LifecycleError::SignatureRequired {
            number: number.to_string(),
        });
    }

    if !current.can_transition_to(target) {
        return Err(LifecycleError::InvalidTransition {
            doc_type: current.doc_type().to_string(),
            from: current.to_string(),
            to: target.to_string(),
        });
    }

    Ok(())
}

/// Moves a document to `target`, returning the previous status.
pub fn transition(
    doc: &mut Document,
    target: DocumentStatus,
) -> Result<DocumentStatus, LifecycleError> {
    let previous = doc.status;
    check_transition(&doc.number, previous, target)?;

    if previous != target {
        info!(number = %doc.number, from = %previous, to = %target, "Document status changed");
        doc.status = target;
    }

    Ok(previous)
}

/// Records a client signature and marks the quote as signed.
///
/// Totals are not frozen here; they are recomputed when the quote is
/// converted.
pub fn sign(doc: &mut Document, signature: Signature) -> Result<(), LifecycleError> {
    let signed = DocumentStatus::Quote(QuoteStatus::Signed);

    if !doc.is_quote() {
        return Err(LifecycleError::WrongDocumentType {
            doc_type: doc.doc_type().to_string(),
            status: signed.to_string(),
        });
    }

    if !doc.status.can_transition_to(signed) {
        return Err(LifecycleError::InvalidTransition {
            doc_type: DocumentType::Quote.to_string(),
            from: doc.status.to_string(),
            to: signed.to_string(),
        });
    }

    info!(number = %doc.number, "Quote signed");
    doc.signature = Some(signature);
    doc.status = signed;
    Ok(())
}

/// Share action: a draft becomes pending, anything else is left alone.
///
/// Returns whether the status changed.
pub fn mark_sent(doc: &mut Document) -> bool {
    let target = match doc.status {
        DocumentStatus::Quote(QuoteStatus::Draft) => DocumentStatus::Quote(QuoteStatus::Pending),
        DocumentStatus::Invoice(InvoiceStatus::Draft) => {
            DocumentStatus::Invoice(InvoiceStatus::Pending)
        }
        _ => {
            debug!(number = %doc.number, status = %doc.status, "Document sent, status kept");
            return false;
        }
    };

    info!(number = %doc.number, "Document sent, now pending");
    doc.status = target;
    true
}

/// Marks an invoice as paid.
pub fn mark_paid(doc: &mut Document) -> Result<DocumentStatus, LifecycleError> {
    transition(doc, DocumentStatus::Invoice(InvoiceStatus::Paid))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn quote_in(status: QuoteStatus) -> Document {
        let mut doc = Document::new_quote("DEV-2026-10-0001");
        doc.status = DocumentStatus::Quote(status);
        doc
    }

    fn invoice_in(status: InvoiceStatus) -> Document {
        let mut doc = Document::new_invoice("FAC-2026-10-0001");
        doc.status = DocumentStatus::Invoice(status);
        doc
    }

    #[test]
    fn test_quote_happy_path() {
        let mut quote = quote_in(QuoteStatus::Draft);
        assert!(mark_sent(&mut quote));
        assert_eq!(quote.status, DocumentStatus::Quote(QuoteStatus::Pending));

        sign(&mut quote, Signature::captured_now("signatures/dev-0001.png")).unwrap();
        assert_eq!(quote.status, DocumentStatus::Quote(QuoteStatus::Signed));
        assert!(quote.status.allows_conversion());
        assert!(quote.signature.is_some());
    }

    #[test]
    fn test_signed_quote_cannot_go_back_to_draft() {
        let mut quote = quote_in(QuoteStatus::Signed);
        let err = transition(&mut quote, DocumentStatus::Quote(QuoteStatus::Draft)).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(quote.status, DocumentStatus::Quote(QuoteStatus::Signed));
    }

    #[test]
    fn test_signed_requires_signature() {
        let mut quote = quote_in(QuoteStatus::Pending);
        let err = transition(&mut quote, DocumentStatus::Quote(QuoteStatus::Signed)).unwrap_err();
        assert!(matches!(err, LifecycleError::SignatureRequired { .. }));
    }

    #[test]
    fn test_rejected_quote_reopens_as_draft_only() {
        let mut quote = quote_in(QuoteStatus::Rejected);
        assert!(sign(&mut quote, Signature::captured_now("sig.png")).is_err());

        // sending again goes through Draft
        let err = transition(&mut quote, DocumentStatus::Quote(QuoteStatus::Pending)).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(quote.status, DocumentStatus::Quote(QuoteStatus::Rejected));

        transition(&mut quote, DocumentStatus::Quote(QuoteStatus::Draft)).unwrap();
        assert!(mark_sent(&mut quote));
        assert_eq!(quote.status, DocumentStatus::Quote(QuoteStatus::Pending));
    }

    #[test]
    fn test_invoice_statuses_do_not_apply_to_quotes() {
        let mut quote = quote_in(QuoteStatus::Pending);
        let err = transition(&mut quote, DocumentStatus::Invoice(InvoiceStatus::Paid)).unwrap_err();
        assert!(matches!(err, LifecycleError::WrongDocumentType { .. }));

        let mut invoice = invoice_in(InvoiceStatus::Draft);
        assert!(sign(&mut invoice, Signature::captured_now("sig.png")).is_err());
    }

    #[test]
    fn test_invoice_payment_path() {
        let mut invoice = invoice_in(InvoiceStatus::Draft);
        assert!(mark_paid(&mut invoice).is_err());

        assert!(mark_sent(&mut invoice));
        transition(&mut invoice, DocumentStatus::Invoice(InvoiceStatus::Overdue)).unwrap();
        let previous = mark_paid(&mut invoice).unwrap();
        assert_eq!(previous, DocumentStatus::Invoice(InvoiceStatus::Overdue));
        assert_eq!(invoice.status, DocumentStatus::Invoice(InvoiceStatus::Paid));

        let err = transition(&mut invoice, DocumentStatus::Invoice(InvoiceStatus::Pending));
        assert!(err.is_err());
    }

    #[test]
    fn test_mark_sent_only_moves_drafts() {
        let mut quote = quote_in(QuoteStatus::Signed);
        assert!(!mark_sent(&mut quote));
        assert_eq!(quote.status, DocumentStatus::Quote(QuoteStatus::Signed));
    }

    #[test]
    fn test_same_status_is_a_no_op() {
        let mut invoice = invoice_in(InvoiceStatus::Paid);
        let previous =
            transition(&mut invoice, DocumentStatus::Invoice(InvoiceStatus::Paid)).unwrap();
        assert_eq!(previous, DocumentStatus::Invoice(InvoiceStatus::Paid));
    }

    #[test]
    fn test_status_from_parts() {
        let status = DocumentStatus::from_parts(DocumentType::Invoice, "overdue").unwrap();
        assert_eq!(status, DocumentStatus::Invoice(InvoiceStatus::Overdue));

        assert!(DocumentStatus::from_parts(DocumentType::Quote, "paid").is_err());
    }

    #[test]
    fn test_status_flags() {
        assert!(DocumentStatus::Quote(QuoteStatus::Draft).is_open_quote());
        assert!(DocumentStatus::Quote(QuoteStatus::Pending).is_open_quote());
        assert!(!DocumentStatus::Quote(QuoteStatus::Signed).is_open_quote());
        assert!(!DocumentStatus::Invoice(InvoiceStatus::Paid).is_editable());
        assert!(DocumentStatus::Invoice(InvoiceStatus::Draft).is_draft());
    }
}
