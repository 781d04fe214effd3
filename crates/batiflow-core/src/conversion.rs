//! # Invoice Conversion
//!
//! Turns a signed quote into a deposit invoice or a final (balance) invoice,
//! never invoicing more than the quote is worth.
//!
//! ## Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Signed quote + settings + invoices already issued against it           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  totals            = compute_totals(quote.sections, settings)           │
//! │  already_invoiced  = Σ historical.total                                 │
//! │  remaining_to_pay  = totals.total_ttc − already_invoiced                │
//! │       │                                                                 │
//! │       ├── remaining ≤ 1 ──────────────► AlreadyFullyInvoiced            │
//! │       │                                                                 │
//! │       ├── DEPOSIT                                                       │
//! │       │     deposit = TTC × pct/100 | fixed                             │
//! │       │     deposit > remaining ───────► DepositExceedsBalance          │
//! │       │     one "Deposit Billing" line at deposit / 1.2, VAT 20         │
//! │       │     invoice.total = deposit                                     │
//! │       │                                                                 │
//! │       └── FINAL                                                         │
//! │             copy every quote section                                    │
//! │             + deduction line −(already_invoiced / 1.2), VAT 20          │
//! │             invoice.total = remaining_to_pay                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Synthetic deposit and deduction lines always back out a flat 20 % VAT,
//! whatever rates the quote's own lines carry.
//!
//! The protocol only builds the invoice value. Storing it (and re-checking
//! the plan against invoices committed in the meantime) is the caller's job,
//! see batiflow-db's `ConversionService`.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ConversionError;
use crate::lifecycle::{DocumentStatus, InvoiceStatus};
use crate::numbering::{NumberGenerator, RandomNumbering};
use crate::totals::{compute_totals, Totals};
use crate::types::{
    AmountType, Document, DocumentType, GlobalSettings, LineItem, Nature, Section,
};

/// A quote whose remaining balance is at or below this is fully invoiced.
pub const FULLY_INVOICED_THRESHOLD: f64 = 1.0;

/// VAT rate of synthetic deposit / deduction lines.
pub const SYNTHETIC_LINE_VAT_RATE: f64 = 20.0;

/// Divisor turning a TTC amount into the HT price of a synthetic line.
pub const SYNTHETIC_LINE_VAT_DIVISOR: f64 = 1.2;

/// Rounding slack allowed when re-checking stored invoices against a quote.
pub const INVOICED_TOTAL_TOLERANCE: f64 = 0.005;

pub const DEPOSIT_SECTION_TITLE: &str = "Deposit Billing";
pub const DEDUCTION_SECTION_TITLE: &str = "Deduction of prior deposits/payments";

// =============================================================================
// Mode
// =============================================================================

/// Which kind of invoice to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    /// Partial invoice from the deposit settings.
    Deposit,
    /// Balance invoice for everything not yet invoiced.
    Final,
}

// =============================================================================
// Plan
// =============================================================================

/// Amounts of a conversion that passed every guard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ConversionPlan {
    pub mode: ConversionMode,
    pub totals: Totals,
    pub already_invoiced: f64,
    pub remaining_to_pay: f64,
    /// TTC total of the invoice to create.
    pub invoice_total: f64,
    /// Settings the invoice is created with.
    pub settings: GlobalSettings,
}

/// Deposit amount for a quote's totals and settings.
///
/// Also shown as a preview in the editor's settings panel.
pub fn deposit_amount(totals: &Totals, settings: &GlobalSettings) -> f64 {
    match settings.down_payment_type {
        AmountType::Percent => totals.total_ttc * (settings.down_payment_value / 100.0),
        AmountType::Fixed => settings.down_payment_value,
    }
}

/// Sum of the totals of invoices generated from `quote_number`.
///
/// Documents that are not invoices of that quote are ignored.
pub fn already_invoiced(quote_number: &str, historical_invoices: &[Document]) -> f64 {
    historical_invoices
        .iter()
        .filter(|doc| doc.is_invoice() && doc.source_quote.as_deref() == Some(quote_number))
        .map(|doc| doc.total)
        .sum()
}

/// Checks that `invoice`, added to the other invoices of its quote, does not
/// bill more than the quote's TTC.
///
/// `linked_invoices` may contain `invoice` itself; it is counted once, at
/// its current total. Documents without a `source_quote` pass.
pub fn check_invoiced_within_quote(
    quote: &Document,
    linked_invoices: &[Document],
    invoice: &Document,
) -> Result<(), ConversionError> {
    if !invoice.is_invoice() || invoice.source_quote.as_deref() != Some(quote.number.as_str()) {
        return Ok(());
    }

    let others: f64 = linked_invoices
        .iter()
        .filter(|doc| doc.id != invoice.id)
        .filter(|doc| doc.is_invoice() && doc.source_quote.as_deref() == Some(quote.number.as_str()))
        .map(|doc| doc.total)
        .sum();
    let invoiced = others + invoice.total;
    let quote_total = quote.totals().total_ttc;

    if invoiced > quote_total + INVOICED_TOTAL_TOLERANCE {
        warn!(
            quote = %quote.number,
            invoice = %invoice.number,
            invoiced,
            quote_total,
            "Invoice rejected: quote would be over-invoiced"
        );
        return Err(ConversionError::ExceedsQuoteTotal {
            quote_number: quote.number.clone(),
            invoiced,
            quote_total,
        });
    }

    Ok(())
}

/// Runs every check of the protocol and computes the invoice amounts.
pub fn plan_conversion(
    quote: &Document,
    settings: &GlobalSettings,
    historical_invoices: &[Document],
    mode: ConversionMode,
) -> Result<ConversionPlan, ConversionError> {
    if !quote.is_quote() {
        return Err(ConversionError::NotAQuote {
            number: quote.number.clone(),
        });
    }

    if !quote.status.allows_conversion() {
        return Err(ConversionError::QuoteNotSigned {
            quote_number: quote.number.clone(),
            status: quote.status.to_string(),
        });
    }

    let totals = compute_totals(&quote.sections, settings);
    let already_invoiced = already_invoiced(&quote.number, historical_invoices);
    let remaining_to_pay = totals.total_ttc - already_invoiced;

    if remaining_to_pay <= FULLY_INVOICED_THRESHOLD {
        warn!(
            quote = %quote.number,
            remaining = remaining_to_pay,
            "Conversion rejected: quote already fully invoiced"
        );
        return Err(ConversionError::AlreadyFullyInvoiced {
            quote_number: quote.number.clone(),
            remaining: remaining_to_pay,
        });
    }

    let (invoice_total, invoice_settings) = match mode {
        ConversionMode::Deposit => {
            let deposit = deposit_amount(&totals, settings);
            if deposit > remaining_to_pay {
                warn!(
                    quote = %quote.number,
                    deposit,
                    remaining = remaining_to_pay,
                    "Conversion rejected: deposit exceeds balance"
                );
                return Err(ConversionError::DepositExceedsBalance {
                    deposit,
                    remaining: remaining_to_pay,
                });
            }
            (deposit, settings.without_discount())
        }
        ConversionMode::Final => (remaining_to_pay, *settings),
    };

    Ok(ConversionPlan {
        mode,
        totals,
        already_invoiced,
        remaining_to_pay,
        invoice_total,
        settings: invoice_settings,
    })
}

/// Builds the invoice for a plan returned by [`plan_conversion`].
pub fn build_invoice(
    quote: &Document,
    plan: &ConversionPlan,
    number: String,
    date: NaiveDate,
) -> Document {
    let sections = match plan.mode {
        ConversionMode::Deposit => vec![deposit_section(quote, plan)],
        ConversionMode::Final => {
            let mut sections = quote.sections.clone();
            if plan.already_invoiced > 0.0 {
                sections.push(deduction_section(plan.already_invoiced));
            }
            sections
        }
    };

    Document {
        id: Uuid::new_v4().to_string(),
        number,
        date,
        status: DocumentStatus::Invoice(InvoiceStatus::Draft),
        client_name: quote.client_name.clone(),
        project_address: quote.project_address.clone(),
        sections,
        total: plan.invoice_total,
        settings: plan.settings,
        source_quote: Some(quote.number.clone()),
        signature: None,
        validity: None,
    }
}

/// Converts a signed quote into a new invoice numbered at random.
///
/// ## Example
/// ```rust
/// use batiflow_core::conversion::{convert_to_invoice, ConversionMode};
/// use batiflow_core::lifecycle::{DocumentStatus, QuoteStatus};
/// use batiflow_core::{Document, GlobalSettings, LineItem, Nature, Section};
///
/// let mut quote = Document::new_quote("DEV-2026-10-0001");
/// quote.sections.push(
///     Section::new("Lot 1").with_items(vec![LineItem::new("Pose", 1.0, 1000.0, Nature::Labor)]),
/// );
/// quote.status = DocumentStatus::Quote(QuoteStatus::Signed);
///
/// let settings = GlobalSettings::default(); // 30 % deposit
/// let deposit = convert_to_invoice(&quote, &settings, &[], ConversionMode::Deposit).unwrap();
/// assert_eq!(deposit.total, 360.0);
/// assert_eq!(deposit.source_quote.as_deref(), Some("DEV-2026-10-0001"));
/// ```
pub fn convert_to_invoice(
    quote: &Document,
    settings: &GlobalSettings,
    historical_invoices: &[Document],
    mode: ConversionMode,
) -> Result<Document, ConversionError> {
    convert_to_invoice_with(&RandomNumbering, quote, settings, historical_invoices, mode)
}

/// Same as [`convert_to_invoice`] with an explicit numbering strategy.
pub fn convert_to_invoice_with(
    numbering: &impl NumberGenerator,
    quote: &Document,
    settings: &GlobalSettings,
    historical_invoices: &[Document],
    mode: ConversionMode,
) -> Result<Document, ConversionError> {
    let plan = plan_conversion(quote, settings, historical_invoices, mode)?;

    let date = Local::now().date_naive();
    let number = numbering.next_number(DocumentType::Invoice, date);
    let invoice = build_invoice(quote, &plan, number, date);

    info!(
        quote = %quote.number,
        invoice = %invoice.number,
        mode = ?mode,
        total = invoice.total,
        "Invoice generated from quote"
    );

    Ok(invoice)
}

// =============================================================================
// Synthetic Sections
// =============================================================================

fn deposit_section(quote: &Document, plan: &ConversionPlan) -> Section {
    let label = match plan.settings.down_payment_type {
        AmountType::Percent => format!("Deposit of {}%", plan.settings.down_payment_value),
        AmountType::Fixed => "Fixed deposit".to_string(),
    };

    let line = LineItem::new(
        format!("{} on quote No. {}", label, quote.number),
        1.0,
        plan.invoice_total / SYNTHETIC_LINE_VAT_DIVISOR,
        Nature::Labor,
    )
    .with_vat_rate(SYNTHETIC_LINE_VAT_RATE)
    .with_unit("u");

    Section::new(DEPOSIT_SECTION_TITLE).with_items(vec![line])
}

fn deduction_section(already_invoiced: f64) -> Section {
    let line = LineItem::new(
        "Deduction of previous deposit invoices",
        1.0,
        -(already_invoiced / SYNTHETIC_LINE_VAT_DIVISOR),
        Nature::Material,
    )
    .with_vat_rate(SYNTHETIC_LINE_VAT_RATE)
    .with_unit("lot");

    Section::new(DEDUCTION_SECTION_TITLE).with_items(vec![line])
}

// =============================================================================
// Unit Tests
// =============================================================================
