//! # Validation Module
//!
//! Shape checks for documents coming back from the editor.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web editor                                                    │
//! │  └── Field-level feedback while typing                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: serde (camelCase JSON)                                        │
//! │  ├── Type validation (deserialization)                                  │
//! │  ├── Boundary defaults (missing vatRate → 20)                           │
//! │  └── THIS MODULE: finite numbers, ranges, lengths, number format        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL constraints                                               │
//! │  └── UNIQUE (number)                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Arithmetic is never validated away: negative prices, zero quantities and
//! discounts larger than the document are legal and handled by the totals
//! engine. Only values the engine cannot give a meaning to (NaN, infinity,
//! a VAT rate above 100 %) are refused.
//!
//! ## Usage
//! ```rust
//! use batiflow_core::validation::{validate_document, validate_settings};
//! use batiflow_core::{Document, GlobalSettings};
//!
//! let quote = Document::new_quote("DEV-2026-10-0001");
//! validate_document(&quote).unwrap();
//! validate_settings(&GlobalSettings::default()).unwrap();
//! ```

use crate::numbering::parse_number;
use crate::types::{AmountType, Document, DocumentType, GlobalSettings, LineItem, Section};

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CLIENT_NAME_LEN: usize = 200;
pub const MAX_ADDRESS_LEN: usize = 500;

// =============================================================================
// Numeric Validators
// =============================================================================

fn finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> ValidationResult<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn percentage(field: &str, value: f64) -> ValidationResult<()> {
    non_negative(field, value)?;
    if value > 100.0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a VAT rate in percent.
///
/// ## Example
/// ```rust
/// use batiflow_core::validation::validate_vat_rate;
///
/// assert!(validate_vat_rate(5.5).is_ok());
/// assert!(validate_vat_rate(0.0).is_ok());
/// assert!(validate_vat_rate(120.0).is_err());
/// ```
pub fn validate_vat_rate(rate: f64) -> ValidationResult<()> {
    percentage("vat rate", rate)
}

// =============================================================================
// Document Tree Validators
// =============================================================================

/// Validates a single line.
///
/// Negative quantities and prices are accepted (deductions, credit lines).
pub fn validate_line_item(item: &LineItem) -> ValidationResult<()> {
    if item.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "line id".to_string(),
        });
    }

    max_len("description", &item.description, MAX_DESCRIPTION_LEN)?;
    finite("quantity", item.quantity)?;
    finite("unit price", item.unit_price)?;
    validate_vat_rate(item.vat_rate)?;

    Ok(())
}

pub fn validate_section(section: &Section) -> ValidationResult<()> {
    if section.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "section id".to_string(),
        });
    }

    max_len("section title", &section.title, MAX_TITLE_LEN)?;

    for item in &section.items {
        validate_line_item(item)?;
    }

    Ok(())
}

/// Validates deposit and discount settings.
///
/// Percent values must lie in 0..=100. Fixed values only need to be
/// non-negative; a fixed discount above the document total floors the net
/// at zero.
pub fn validate_settings(settings: &GlobalSettings) -> ValidationResult<()> {
    match settings.down_payment_type {
        AmountType::Percent => percentage("deposit", settings.down_payment_value)?,
        AmountType::Fixed => non_negative("deposit", settings.down_payment_value)?,
    }

    match settings.discount_type {
        AmountType::Percent => percentage("discount", settings.discount_value)?,
        AmountType::Fixed => non_negative("discount", settings.discount_value)?,
    }

    Ok(())
}

/// Validates a document number and checks its prefix against the type.
pub fn validate_document_number(number: &str, doc_type: DocumentType) -> ValidationResult<()> {
    if number.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "number".to_string(),
        });
    }

    let parsed = parse_number(number)?;
    if parsed.doc_type != doc_type {
        return Err(ValidationError::InvalidFormat {
            field: "number".to_string(),
            reason: format!("a {} number must start with {}", doc_type, doc_type.prefix()),
        });
    }

    Ok(())
}

/// Validates a whole document before it is persisted.
pub fn validate_document(doc: &Document) -> ValidationResult<()> {
    validate_uuid(&doc.id)?;
    validate_document_number(&doc.number, doc.doc_type())?;

    max_len("client name", &doc.client_name, MAX_CLIENT_NAME_LEN)?;
    max_len("project address", &doc.project_address, MAX_ADDRESS_LEN)?;
    finite("total", doc.total)?;
    validate_settings(&doc.settings)?;

    match (&doc.source_quote, doc.doc_type()) {
        (Some(source), DocumentType::Invoice) => {
            validate_document_number(source, DocumentType::Quote)?
        }
        (Some(_), DocumentType::Quote) => {
            return Err(ValidationError::InvalidFormat {
                field: "source quote".to_string(),
                reason: "only invoices reference a source quote".to_string(),
            })
        }
        (None, _) => {}
    }

    for section in &doc.sections {
        validate_section(section)?;
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use batiflow_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Nature;

    fn quote_with_line(item: LineItem) -> Document {
        let mut quote = Document::new_quote("DEV-2026-10-0001");
        quote
            .sections
            .push(Section::new("Plomberie").with_items(vec![item]));
        quote
    }

    #[test]
    fn test_line_item_accepts_deductions() {
        let item = LineItem::new("Reprise ancien ballon", 1.0, -150.0, Nature::Material);
        assert!(validate_line_item(&item).is_ok());

        let item = LineItem::new("Avoir", -2.0, 10.0, Nature::Labor);
        assert!(validate_line_item(&item).is_ok());
    }

    #[test]
    fn test_line_item_rejects_non_finite() {
        let item = LineItem::new("Tuyau", f64::NAN, 4.0, Nature::Material);
        assert_eq!(
            validate_line_item(&item),
            Err(ValidationError::NotFinite {
                field: "quantity".to_string()
            })
        );

        let item = LineItem::new("Tuyau", 1.0, f64::INFINITY, Nature::Material);
        assert!(validate_line_item(&item).is_err());
    }

    #[test]
    fn test_vat_rate_range() {
        assert!(validate_vat_rate(20.0).is_ok());
        assert!(validate_vat_rate(100.0).is_ok());
        assert!(validate_vat_rate(-1.0).is_err());
        assert!(validate_vat_rate(100.5).is_err());
    }

    #[test]
    fn test_settings_percent_bounds() {
        let mut settings = GlobalSettings::default();
        assert!(validate_settings(&settings).is_ok());

        settings.down_payment_value = 130.0;
        assert!(validate_settings(&settings).is_err());

        // a fixed amount has no upper bound
        settings.down_payment_type = AmountType::Fixed;
        assert!(validate_settings(&settings).is_ok());

        settings.discount_value = -5.0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_document_number_must_match_type() {
        assert!(validate_document_number("DEV-2026-10-0001", DocumentType::Quote).is_ok());
        assert!(validate_document_number("FAC-2026-10-0001", DocumentType::Quote).is_err());
        assert!(validate_document_number("", DocumentType::Invoice).is_err());
    }

    #[test]
    fn test_validate_document() {
        let quote = quote_with_line(LineItem::new("Ballon 200L", 1.0, 890.0, Nature::Material));
        assert!(validate_document(&quote).is_ok());

        let mut bad = quote.clone();
        bad.client_name = "x".repeat(MAX_CLIENT_NAME_LEN + 1);
        assert!(validate_document(&bad).is_err());

        let mut bad = quote.clone();
        bad.source_quote = Some("DEV-2026-09-0001".to_string());
        assert!(validate_document(&bad).is_err());

        let mut bad = quote;
        bad.sections[0].items[0].vat_rate = f64::NAN;
        assert!(validate_document(&bad).is_err());
    }

    #[test]
    fn test_invoice_source_quote_must_be_a_quote_number() {
        let mut invoice = Document::new_invoice("FAC-2026-10-0001");
        invoice.source_quote = Some("DEV-2026-10-0001".to_string());
        assert!(validate_document(&invoice).is_ok());

        invoice.source_quote = Some("FAC-2026-10-0002".to_string());
        assert!(validate_document(&invoice).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
