//! # batiflow-core: Pure Financial Engine for BatiFlow
//!
//! This crate is the **heart** of BatiFlow billing. It contains the document
//! math and the quote → invoice protocol as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       BatiFlow Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web Editor (external)                        │   │
//! │  │   Sections UI ──► Totals panel ──► Sign ──► Deposit / Balance   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON (camelCase) + TS bindings         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ batiflow-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌──────────┐ ┌────────────┐ ┌───────────┐          │   │
//! │  │  │ totals  │ │numbering │ │ conversion │ │ lifecycle │          │   │
//! │  │  │ HT/TVA  │ │ DEV/FAC  │ │deposit/bal.│ │  status   │          │   │
//! │  │  └─────────┘ └──────────┘ └────────────┘ └───────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 batiflow-db (Database Layer)                    │   │
//! │  │     documents, numbering sequences, transactional conversion    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Document tree (Document, Section, LineItem, GlobalSettings)
//! - [`money`] - Currency formatting (fr-FR euros)
//! - [`totals`] - HT / VAT / TTC totals engine
//! - [`numbering`] - DEV-/FAC- document numbers
//! - [`conversion`] - Quote → deposit / balance invoice protocol
//! - [`lifecycle`] - Document status state machine
//! - [`validation`] - Input shape checks at the persistence boundary
//! - [`reporting`] - Dashboard revenue and accounting export
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use batiflow_core::{compute_totals, GlobalSettings, LineItem, Nature, Section};
//!
//! let section = Section::new("Peinture").with_items(vec![
//!     LineItem::new("Préparation des supports", 10.0, 15.0, Nature::Labor),
//!     LineItem::new("Peinture impression", 5.0, 8.5, Nature::Material),
//! ]);
//!
//! let totals = compute_totals(&[section], &GlobalSettings::default());
//! assert_eq!(totals.raw_total_ht, 192.5);
//! assert_eq!(totals.total_ttc, 231.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod conversion;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod numbering;
pub mod reporting;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use conversion::{convert_to_invoice, plan_conversion, ConversionMode, ConversionPlan};
pub use error::{
    ConversionError, CoreError, CoreResult, LifecycleError, ReportError, ValidationError,
};
pub use lifecycle::{DocumentStatus, InvoiceStatus, QuoteStatus};
pub use money::format_currency;
pub use numbering::{generate_number, NumberGenerator};
pub use reporting::{accounting_csv, revenue_summary, RevenueSummary};
pub use totals::{compute_totals, Totals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default account ID (single-account runtime with multi-account schema).
///
/// The numbering sequences table is keyed by account so each business gets
/// its own monotonic DEV/FAC counters once accounts are resolved dynamically.
pub const DEFAULT_ACCOUNT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// VAT rate (percent) applied to line items that do not carry one.
pub const DEFAULT_VAT_RATE: f64 = 20.0;

/// Validity printed on new quotes.
pub const DEFAULT_QUOTE_VALIDITY: &str = "1 month";
