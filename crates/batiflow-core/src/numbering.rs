//! # Document Numbering
//!
//! Human-readable numbers for quotes and invoices.
//!
//! ## Format
//! ```text
//! DEV-2026-10-4821
//! ─┬─ ─┬── ┬─ ─┬──
//!  │   │   │   └── sequence (4 digits, zero padded)
//!  │   │   └────── month (2 digits)
//!  │   └────────── year
//!  └────────────── DEV = quote (devis), FAC = invoice (facture)
//! ```
//!
//! ## Strategies
//! - [`RandomNumbering`]: random 1000..=9999 suffix. Collisions are possible;
//!   kept for documents created before sequences existed.
//! - [`SequentialNumbering`]: in-memory monotonic counter per type.
//! - batiflow-db's `SequenceRepository`: monotonic counter per account, type
//!   and month, persisted in SQLite. Used for everything the app creates.

use chrono::{Datelike, Local, NaiveDate};
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::ValidationError;
use crate::types::DocumentType;

// =============================================================================
// Formatting
// =============================================================================

/// Renders `<PREFIX>-<year>-<MM>-<NNNN>`.
///
/// ## Example
/// ```rust
/// use batiflow_core::numbering::format_number;
/// use batiflow_core::DocumentType;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
/// assert_eq!(format_number(DocumentType::Invoice, date, 7), "FAC-2026-03-0007");
/// ```
pub fn format_number(doc_type: DocumentType, date: NaiveDate, sequence: u32) -> String {
    format!(
        "{}-{}-{:02}-{:04}",
        doc_type.prefix(),
        date.year(),
        date.month(),
        sequence
    )
}

/// Generates a number with a random suffix, dated today.
pub fn generate_number(doc_type: DocumentType) -> String {
    generate_number_on(doc_type, Local::now().date_naive())
}

/// Generates a number with a random suffix for the given date.
pub fn generate_number_on(doc_type: DocumentType, date: NaiveDate) -> String {
    let suffix = rand::thread_rng().gen_range(1000..=9999);
    format_number(doc_type, date, suffix)
}

// =============================================================================
// Parsing
// =============================================================================

/// The parts of a document number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentNumber {
    pub doc_type: DocumentType,
    pub year: i32,
    pub month: u32,
    pub sequence: u32,
}

/// Parses a number produced by [`format_number`].
pub fn parse_number(number: &str) -> Result<DocumentNumber, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "number".to_string(),
        reason: reason.to_string(),
    };

    let mut parts = number.trim().split('-');
    let (Some(prefix), Some(year), Some(month), Some(sequence), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(invalid("expected PREFIX-YYYY-MM-NNNN"));
    };

    let doc_type = match prefix {
        "DEV" => DocumentType::Quote,
        "FAC" => DocumentType::Invoice,
        _ => return Err(invalid("prefix must be DEV or FAC")),
    };

    if year.len() != 4 || month.len() != 2 || sequence.len() < 4 {
        return Err(invalid("expected PREFIX-YYYY-MM-NNNN"));
    }

    let year: i32 = year.parse().map_err(|_| invalid("year is not a number"))?;
    let month: u32 = month.parse().map_err(|_| invalid("month is not a number"))?;
    let sequence: u32 = sequence
        .parse()
        .map_err(|_| invalid("sequence is not a number"))?;

    if !(1..=12).contains(&month) {
        return Err(invalid("month must be 01-12"));
    }

    Ok(DocumentNumber {
        doc_type,
        year,
        month,
        sequence,
    })
}

// =============================================================================
// Strategies
// =============================================================================

/// Produces the number of a new document.
pub trait NumberGenerator {
    fn next_number(&self, doc_type: DocumentType, date: NaiveDate) -> String;
}

/// Random 4-digit suffix. May collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNumbering;

impl NumberGenerator for RandomNumbering {
    fn next_number(&self, doc_type: DocumentType, date: NaiveDate) -> String {
        generate_number_on(doc_type, date)
    }
}

/// Monotonic per-type counter held in memory.
///
/// Unique for the lifetime of the value. Does not reset on month change.
#[derive(Debug)]
pub struct SequentialNumbering {
    quotes: AtomicU32,
    invoices: AtomicU32,
}

impl SequentialNumbering {
    pub fn new() -> Self {
        Self::starting_at(1, 1)
    }

    /// Next quote and invoice sequence values to hand out.
    pub fn starting_at(next_quote: u32, next_invoice: u32) -> Self {
        SequentialNumbering {
            quotes: AtomicU32::new(next_quote),
            invoices: AtomicU32::new(next_invoice),
        }
    }
}

impl Default for SequentialNumbering {
    fn default() -> Self {
        Self::new()
    }
}

impl NumberGenerator for SequentialNumbering {
    fn next_number(&self, doc_type: DocumentType, date: NaiveDate) -> String {
        let counter = match doc_type {
            DocumentType::Quote => &self.quotes,
            DocumentType::Invoice => &self.invoices,
        };
        let sequence = counter.fetch_add(1, Ordering::Relaxed);
        format_number(doc_type, date, sequence)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn october() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_random_number_shape() {
        for _ in 0..200 {
            let number = generate_number_on(DocumentType::Quote, october());
            assert!(number.starts_with("DEV-2026-10-"));

            let parsed = parse_number(&number).unwrap();
            assert!((1000..=9999).contains(&parsed.sequence));
        }

        let invoice = generate_number(DocumentType::Invoice);
        assert!(invoice.starts_with("FAC-"));
        assert_eq!(invoice.len(), "FAC-2026-10-0000".len());
    }

    #[test]
    fn test_parse_number() {
        let parsed = parse_number("FAC-2026-03-0042").unwrap();
        assert_eq!(parsed.doc_type, DocumentType::Invoice);
        assert_eq!(parsed.year, 2026);
        assert_eq!(parsed.month, 3);
        assert_eq!(parsed.sequence, 42);

        // sequences past 9999 keep growing
        assert_eq!(parse_number("DEV-2026-03-12345").unwrap().sequence, 12345);
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert!(parse_number("").is_err());
        assert!(parse_number("INV-2026-03-0042").is_err());
        assert!(parse_number("FAC-2026-13-0042").is_err());
        assert!(parse_number("FAC-26-03-0042").is_err());
        assert!(parse_number("FAC-2026-03-42").is_err());
        assert!(parse_number("FAC-2026-03-0042-1").is_err());
    }

    #[test]
    fn test_sequential_numbering_is_per_type() {
        let numbering = SequentialNumbering::new();
        assert_eq!(numbering.next_number(DocumentType::Quote, october()), "DEV-2026-10-0001");
        assert_eq!(numbering.next_number(DocumentType::Quote, october()), "DEV-2026-10-0002");
        assert_eq!(
            numbering.next_number(DocumentType::Invoice, october()),
            "FAC-2026-10-0001"
        );
    }

    #[test]
    fn test_sequential_numbering_is_unique_across_threads() {
        let numbering = Arc::new(SequentialNumbering::starting_at(1, 100));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let numbering = Arc::clone(&numbering);
                thread::spawn(move || {
                    (0..50)
                        .map(|_| numbering.next_number(DocumentType::Invoice, october()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for number in handle.join().unwrap() {
                assert!(seen.insert(number));
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
