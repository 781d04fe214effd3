//! # Reporting
//!
//! Dashboard revenue figures and the accounting CSV export.
//!
//! ## Revenue Split
//! ```text
//! For every PAID invoice:
//!   labor_ttc    = Σ labor lines    qty × price × (1 + vat/100)
//!   material_ttc = Σ material lines qty × price × (1 + vat/100)
//!   ratio        = invoice.total / (labor_ttc + material_ttc)
//!
//!   revenue.labor    += labor_ttc × ratio
//!   revenue.material += material_ttc × ratio
//! ```
//!
//! Scaling by `total / raw TTC` folds the document discount and any deposit
//! deduction back into both halves, so `labor + material == total` for every
//! invoice whose lines sum to something positive. Invoices made only of
//! zero or negative lines count toward revenue but not toward the split.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ReportError;
use crate::lifecycle::{DocumentStatus, InvoiceStatus};
use crate::money::format_decimal_comma;
use crate::types::{Document, Nature};

/// CSV header of the accounting export.
pub const ACCOUNTING_CSV_HEADER: &str = "Number;Date;Client;Total TTC;Status";

// =============================================================================
// Revenue Summary
// =============================================================================

/// Figures shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    /// Sum of the totals of paid invoices.
    pub revenue: f64,
    pub revenue_labor: f64,
    pub revenue_material: f64,
    /// Every invoice, whatever its status.
    pub invoice_count: usize,
    /// Quotes still in draft or awaiting the client.
    pub pending_quotes: usize,
}

/// Computes the dashboard figures.
///
/// Documents of the wrong type in either slice are ignored.
pub fn revenue_summary(invoices: &[Document], quotes: &[Document]) -> RevenueSummary {
    let mut summary = RevenueSummary::default();

    for invoice in invoices.iter().filter(|doc| doc.is_invoice()) {
        summary.invoice_count += 1;

        if invoice.status != DocumentStatus::Invoice(InvoiceStatus::Paid) {
            continue;
        }
        summary.revenue += invoice.total;

        let (labor, material) = ttc_by_nature(invoice);
        let raw_ttc = labor + material;
        if raw_ttc > 0.0 {
            let ratio = invoice.total / raw_ttc;
            summary.revenue_labor += labor * ratio;
            summary.revenue_material += material * ratio;
        }
    }

    summary.pending_quotes = quotes
        .iter()
        .filter(|doc| doc.status.is_open_quote())
        .count();

    summary
}

fn ttc_by_nature(doc: &Document) -> (f64, f64) {
    let mut labor = 0.0;
    let mut material = 0.0;

    for item in doc.line_items() {
        let line_ttc = item.quantity * item.unit_price * (1.0 + item.vat_rate / 100.0);
        match item.nature {
            Nature::Labor => labor += line_ttc,
            Nature::Material => material += line_ttc,
        }
    }

    (labor, material)
}

// =============================================================================
// Recent Activity
// =============================================================================

/// One entry of the dashboard's recent activity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub client_name: String,
    pub amount: f64,
}

/// Latest paid invoices, newest first.
pub fn recent_activity(invoices: &[Document], limit: usize) -> Vec<ActivityEntry> {
    let mut paid: Vec<&Document> = invoices
        .iter()
        .filter(|doc| doc.status == DocumentStatus::Invoice(InvoiceStatus::Paid))
        .collect();
    paid.sort_by(|a, b| b.date.cmp(&a.date));

    paid.into_iter()
        .take(limit)
        .map(|doc| ActivityEntry {
            id: doc.id.clone(),
            number: doc.number.clone(),
            date: doc.date,
            client_name: doc.client_name.clone(),
            amount: doc.total,
        })
        .collect()
}

// =============================================================================
// Accounting Export
// =============================================================================

/// Renders every invoice as a `;`-separated CSV for the accountant.
///
/// ## Format
/// ```text
/// Number;Date;Client;Total TTC;Status
/// FAC-2026-10-0001;16/10/2026;"Mme Martin";1234,50;paid
/// ```
pub fn accounting_csv(invoices: &[Document]) -> Result<String, ReportError> {
    if invoices.is_empty() {
        return Err(ReportError::NoInvoices);
    }

    let mut lines = Vec::with_capacity(invoices.len() + 1);
    lines.push(ACCOUNTING_CSV_HEADER.to_string());

    for invoice in invoices {
        lines.push(format!(
            "{};{};\"{}\";{};{}",
            invoice.number,
            invoice.date.format("%d/%m/%Y"),
            invoice.client_name.replace('"', "\"\""),
            format_decimal_comma(invoice.total),
            invoice.status,
        ));
    }

    Ok(lines.join("\n"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::QuoteStatus;
    use crate::types::{LineItem, Section};

    const EPSILON: f64 = 1e-9;

    fn invoice(number: &str, status: InvoiceStatus, sections: Vec<Section>) -> Document {
        let mut doc = Document::new_invoice(number);
        doc.status = DocumentStatus::Invoice(status);
        doc.sections = sections;
        doc.refresh_total();
        doc
    }

    fn quote(status: QuoteStatus) -> Document {
        let mut doc = Document::new_quote("DEV-2026-10-0001");
        doc.status = DocumentStatus::Quote(status);
        doc
    }

    #[test]
    fn test_revenue_counts_only_paid_invoices() {
        let section = Section::new("Électricité").with_items(vec![
            LineItem::new("Câblage", 1.0, 100.0, Nature::Labor),
            LineItem::new("Tableau", 1.0, 300.0, Nature::Material),
        ]);
        let invoices = vec![
            invoice("FAC-2026-10-0001", InvoiceStatus::Paid, vec![section.clone()]),
            invoice("FAC-2026-10-0002", InvoiceStatus::Pending, vec![section]),
        ];

        let summary = revenue_summary(&invoices, &[]);
        assert_eq!(summary.invoice_count, 2);
        assert_eq!(summary.revenue, 480.0);
        assert!((summary.revenue_labor - 120.0).abs() < EPSILON);
        assert!((summary.revenue_material - 360.0).abs() < EPSILON);
    }

    #[test]
    fn test_split_is_scaled_to_the_invoice_total() {
        // final invoice: 1000 HT of work, minus a 360 TTC deposit
        let mut doc = invoice(
            "FAC-2026-10-0003",
            InvoiceStatus::Paid,
            vec![
                Section::new("Travaux")
                    .with_items(vec![LineItem::new("Pose", 1.0, 1000.0, Nature::Labor)]),
                Section::new("Déduction").with_items(vec![LineItem::new(
                    "Acompte",
                    1.0,
                    -300.0,
                    Nature::Material,
                )]),
            ],
        );
        doc.total = 840.0;

        let summary = revenue_summary(&[doc], &[]);
        assert_eq!(summary.revenue, 840.0);
        assert!((summary.revenue_labor + summary.revenue_material - 840.0).abs() < EPSILON);
    }

    #[test]
    fn test_pending_quotes_counts_draft_and_pending() {
        let quotes = vec![
            quote(QuoteStatus::Draft),
            quote(QuoteStatus::Pending),
            quote(QuoteStatus::Signed),
            quote(QuoteStatus::Rejected),
        ];
        assert_eq!(revenue_summary(&[], &quotes).pending_quotes, 2);
    }

    #[test]
    fn test_recent_activity_newest_first() {
        let mut older = invoice("FAC-2026-09-0001", InvoiceStatus::Paid, vec![]);
        older.date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let mut newer = invoice("FAC-2026-10-0001", InvoiceStatus::Paid, vec![]);
        newer.date = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let unpaid = invoice("FAC-2026-10-0002", InvoiceStatus::Draft, vec![]);

        let activity = recent_activity(&[older, unpaid, newer], 4);
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].number, "FAC-2026-10-0001");
    }

    #[test]
    fn test_accounting_csv() {
        let mut doc = invoice("FAC-2026-10-0001", InvoiceStatus::Paid, vec![]);
        doc.date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        doc.client_name = "SCI \"Les Tilleuls\"".to_string();
        doc.total = 1234.5;

        let csv = accounting_csv(&[doc]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], ACCOUNTING_CSV_HEADER);
        assert_eq!(
            lines[1],
            "FAC-2026-10-0001;16/10/2026;\"SCI \"\"Les Tilleuls\"\"\";1234,50;paid"
        );
    }

    #[test]
    fn test_accounting_csv_requires_invoices() {
        assert_eq!(accounting_csv(&[]), Err(ReportError::NoInvoices));
    }
}
