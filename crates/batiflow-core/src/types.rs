//! # Domain Types
//!
//! The document tree shared by quotes and invoices.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Document Tree                                   │
//! │                                                                         │
//! │  Document (quote | invoice)                                             │
//! │  ├── number        DEV-2026-10-4821 / FAC-2026-10-0007                  │
//! │  ├── status        DocumentStatus::Quote(..) | ::Invoice(..)            │
//! │  ├── settings      GlobalSettings (deposit, discount)                   │
//! │  ├── total         cached TTC (recomputed before every persist)         │
//! │  └── sections[]                                                         │
//! │      └── Section { title }                                              │
//! │          └── items[]                                                    │
//! │              └── LineItem { quantity × unit_price, nature, vat_rate }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! Every LineItem belongs to exactly one Section and every Section to one
//! Document. Nothing is shared, so a document is cloned as a whole.
//!
//! ## Boundary Defaults
//! A line item stored before per-line VAT existed has no `vatRate`; serde
//! fills in [`DEFAULT_VAT_RATE`] on the way in so the totals engine never
//! has to guess.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::lifecycle::{DocumentStatus, InvoiceStatus, QuoteStatus};
use crate::totals::{compute_totals, Totals};
use crate::{DEFAULT_QUOTE_VALIDITY, DEFAULT_VAT_RATE};

// =============================================================================
// Document Type
// =============================================================================

/// Kind of commercial document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Quote,
    Invoice,
}

impl DocumentType {
    /// Lowercase name used in storage and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Quote => "quote",
            DocumentType::Invoice => "invoice",
        }
    }

    /// Number prefix (`DEV` for devis, `FAC` for factures).
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentType::Quote => "DEV",
            DocumentType::Invoice => "FAC",
        }
    }

    /// Status a freshly created document of this type starts in.
    pub fn initial_status(&self) -> DocumentStatus {
        match self {
            DocumentType::Quote => DocumentStatus::Quote(QuoteStatus::Draft),
            DocumentType::Invoice => DocumentStatus::Invoice(InvoiceStatus::Draft),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Nature
// =============================================================================

/// Reporting classification of a line (labor vs. material).
///
/// Does not affect tax. Anything that is not labor counts as material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Nature {
    Labor,
    #[default]
    Material,
}

// =============================================================================
// Amount Type
// =============================================================================

/// How a deposit or discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AmountType {
    /// Value is a percentage of the relevant total.
    #[default]
    Percent,
    /// Value is a flat currency amount.
    Fixed,
}

// =============================================================================
// Global Settings
// =============================================================================

/// Whole-document deposit and discount settings.
///
/// Owned by a document and passed explicitly into every computation; there
/// is no ambient settings object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    pub down_payment_value: f64,
    pub down_payment_type: AmountType,
    pub discount_value: f64,
    pub discount_type: AmountType,
}

impl GlobalSettings {
    /// Same deposit settings with the discount removed.
    pub fn without_discount(&self) -> Self {
        GlobalSettings {
            discount_value: 0.0,
            discount_type: AmountType::Percent,
            ..*self
        }
    }
}

impl Default for GlobalSettings {
    /// 30 % deposit, no discount.
    fn default() -> Self {
        GlobalSettings {
            down_payment_value: 30.0,
            down_payment_type: AmountType::Percent,
            discount_value: 0.0,
            discount_type: AmountType::Percent,
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

fn default_vat_rate() -> f64 {
    DEFAULT_VAT_RATE
}

/// A priced line in a section.
///
/// `quantity × unit_price` is the line's pre-tax (HT) contribution. A
/// negative unit price is a deduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub nature: Nature,
    /// VAT rate in percent (20 = 20 %).
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
    /// Display unit ("m²", "u", "h"...).
    #[serde(default)]
    pub unit: Option<String>,
}

impl LineItem {
    /// Creates a line at the default VAT rate.
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64, nature: Nature) -> Self {
        LineItem {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            quantity,
            unit_price,
            nature,
            vat_rate: DEFAULT_VAT_RATE,
            unit: None,
        }
    }

    pub fn with_vat_rate(mut self, vat_rate: f64) -> Self {
        self.vat_rate = vat_rate;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Pre-tax line amount.
    #[inline]
    pub fn total_ht(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

// =============================================================================
// Section
// =============================================================================

/// A titled group of line items. Order is for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Section {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<LineItem>) -> Self {
        self.items = items;
        self
    }
}

// =============================================================================
// Signature
// =============================================================================

/// Captured client signature.
///
/// Only a reference to the stored image is kept; storage is somebody else's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub image_ref: String,
    #[ts(as = "String")]
    pub signed_at: DateTime<Utc>,
}

impl Signature {
    pub fn captured_now(image_ref: impl Into<String>) -> Self {
        Signature {
            image_ref: image_ref.into(),
            signed_at: Utc::now(),
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// A quote or an invoice.
///
/// The document type is carried by the status variant, so a quote can never
/// hold an invoice status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub status: DocumentStatus,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub project_address: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Cached TTC total. Never a source of truth.
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub settings: GlobalSettings,
    /// Number of the quote an invoice was generated from.
    #[serde(default)]
    pub source_quote: Option<String>,
    #[serde(default)]
    pub signature: Option<Signature>,
    #[serde(default)]
    pub validity: Option<String>,
}

impl Document {
    /// Creates an empty draft dated today.
    pub fn new(doc_type: DocumentType, number: impl Into<String>) -> Self {
        Document {
            id: Uuid::new_v4().to_string(),
            number: number.into(),
            date: Local::now().date_naive(),
            status: doc_type.initial_status(),
            client_name: String::new(),
            project_address: String::new(),
            sections: Vec::new(),
            total: 0.0,
            settings: GlobalSettings::default(),
            source_quote: None,
            signature: None,
            validity: match doc_type {
                DocumentType::Quote => Some(DEFAULT_QUOTE_VALIDITY.to_string()),
                DocumentType::Invoice => None,
            },
        }
    }

    pub fn new_quote(number: impl Into<String>) -> Self {
        Document::new(DocumentType::Quote, number)
    }

    pub fn new_invoice(number: impl Into<String>) -> Self {
        Document::new(DocumentType::Invoice, number)
    }

    #[inline]
    pub fn doc_type(&self) -> DocumentType {
        self.status.doc_type()
    }

    #[inline]
    pub fn is_quote(&self) -> bool {
        self.doc_type() == DocumentType::Quote
    }

    #[inline]
    pub fn is_invoice(&self) -> bool {
        self.doc_type() == DocumentType::Invoice
    }

    /// Totals for the current sections and the document's own settings.
    pub fn totals(&self) -> Totals {
        compute_totals(&self.sections, &self.settings)
    }

    /// Recomputes the cached `total` and returns the fresh totals.
    pub fn refresh_total(&mut self) -> Totals {
        let totals = self.totals();
        self.total = totals.total_ttc;
        totals
    }

    /// Iterates over every line of every section.
    pub fn line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
