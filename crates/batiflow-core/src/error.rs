//! # Error Types
//!
//! Domain-specific error types for batiflow-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  batiflow-core errors (this file)                                      │
//! │  ├── CoreError        - Umbrella for the variants below                │
//! │  ├── ConversionError  - Quote → invoice business rejections            │
//! │  ├── LifecycleError   - Illegal status transitions                     │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ReportError      - Dashboard / export preconditions               │
//! │                                                                         │
//! │  batiflow-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures (wraps CoreError)  │
//! │                                                                         │
//! │  Flow: ConversionError → CoreError → DbError → Editor message          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (document number, amounts)
//! 3. Errors are enum variants, never String
//! 4. Business rejections are values, never panics

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Quote could not be converted into an invoice.
    #[error("Conversion rejected: {0}")]
    Conversion(#[from] ConversionError),

    /// Status change refused by the lifecycle rules.
    #[error("Status change rejected: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Report could not be produced.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

// =============================================================================
// Conversion Error
// =============================================================================

/// Business-rule rejections of the quote → invoice protocol.
///
/// ## User Workflow
/// ```text
/// Signed quote DEV-2026-10-4821 (TTC 1 000 €)
///      │
///      ▼
/// Already invoiced: 999,50 €
///      │
///      ▼
/// AlreadyFullyInvoiced { remaining: 0.5 }
///      │
///      ▼
/// Editor shows: "This quote is already fully invoiced"
/// ```
///
/// No invoice is produced when any of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Remaining balance is at or below one currency unit.
    #[error("Quote {quote_number} is already fully invoiced (remaining {remaining:.2})")]
    AlreadyFullyInvoiced { quote_number: String, remaining: f64 },

    /// Requested deposit is larger than what is left to pay.
    #[error("Deposit of {deposit:.2} exceeds remaining balance of {remaining:.2}")]
    DepositExceedsBalance { deposit: f64, remaining: f64 },

    /// Only signed quotes can be invoiced.
    #[error("Quote {quote_number} is {status}, only signed quotes can be invoiced")]
    QuoteNotSigned { quote_number: String, status: String },

    /// The source document is an invoice.
    #[error("Document {number} is not a quote")]
    NotAQuote { number: String },

    /// Storing an invoice would bill more than its quote's total.
    #[error("Invoices of quote {quote_number} would total {invoiced:.2}, above the quote total of {quote_total:.2}")]
    ExceedsQuoteTotal {
        quote_number: String,
        invoiced: f64,
        quote_total: f64,
    },
}

// =============================================================================
// Lifecycle Error
// =============================================================================

/// Status transition failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Target status is not reachable from the current one.
    #[error("Cannot move {doc_type} from {from} to {to}")]
    InvalidTransition {
        doc_type: String,
        from: String,
        to: String,
    },

    /// Quotes become signed only by capturing a signature.
    #[error("Quote {number} can only be signed with a signature")]
    SignatureRequired { number: String },

    /// A quote status was applied to an invoice or the reverse.
    #[error("Status {status} does not apply to a {doc_type}")]
    WrongDocumentType { doc_type: String, status: String },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a document handed over by the editor doesn't have the
/// expected shape. Checked before a document is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Number is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Invalid format (e.g., invalid UUID, invalid document number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Report Error
// =============================================================================

/// Reporting errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// Accounting export requested with no invoice at all.
    #[error("No invoices to export")]
    NoInvoices,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_error_messages() {
        let err = ConversionError::DepositExceedsBalance {
            deposit: 300.0,
            remaining: 200.0,
        };
        assert_eq!(
            err.to_string(),
            "Deposit of 300.00 exceeds remaining balance of 200.00"
        );

        let err = ConversionError::AlreadyFullyInvoiced {
            quote_number: "DEV-2026-10-4821".to_string(),
            remaining: 0.5,
        };
        assert_eq!(
            err.to_string(),
            "Quote DEV-2026-10-4821 is already fully invoiced (remaining 0.50)"
        );
    }

    #[test]
    fn test_lifecycle_error_messages() {
        let err = LifecycleError::InvalidTransition {
            doc_type: "quote".to_string(),
            from: "signed".to_string(),
            to: "draft".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot move quote from signed to draft");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "title".to_string(),
        };
        assert_eq!(err.to_string(), "title is required");

        let err = ValidationError::NotFinite {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be a finite number");
    }

    #[test]
    fn test_errors_convert_to_core_error() {
        let core_err: CoreError = ConversionError::NotAQuote {
            number: "FAC-2026-10-0001".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Conversion(_)));

        let core_err: CoreError = ReportError::NoInvoices.into();
        assert!(matches!(core_err, CoreError::Report(_)));
    }
}
