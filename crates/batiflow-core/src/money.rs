//! # Money Module
//!
//! Currency formatting for amounts produced by the totals engine.
//!
//! ## Display Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fr-FR euros                                                            │
//! │                                                                         │
//! │    1234.5     →  "1 234,50 €"                                           │
//! │    -87.333    →  "-87,33 €"                                             │
//! │                                                                         │
//! │  • narrow no-break space (U+202F) between thousands groups              │
//! │  • decimal comma, always two decimals                                   │
//! │  • no-break space (U+00A0) before the euro sign                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts stay `f64` everywhere in the engine; rounding to cents happens
//! here and only for display or export.

/// Thousands separator used by fr-FR.
pub const GROUP_SEPARATOR: char = '\u{202F}';

/// Space between the amount and the currency sign.
pub const CURRENCY_SPACE: char = '\u{00A0}';

/// Rounds an amount to whole cents (half away from zero).
///
/// ## Example
/// ```rust
/// use batiflow_core::money::to_cents;
///
/// assert_eq!(to_cents(10.99), 1099);
/// assert_eq!(to_cents(-5.5), -550);
/// ```
#[inline]
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Formats an amount as fr-FR euros.
///
/// ## Example
/// ```rust
/// use batiflow_core::format_currency;
///
/// assert_eq!(format_currency(1234.5), "1\u{202F}234,50\u{00A0}€");
/// assert_eq!(format_currency(0.0), "0,00\u{00A0}€");
/// ```
pub fn format_currency(amount: f64) -> String {
    let cents = to_cents(amount);
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();

    format!(
        "{}{},{:02}{}€",
        sign,
        group_thousands(abs / 100),
        abs % 100,
        CURRENCY_SPACE
    )
}

/// Two decimals with a decimal comma and no grouping (`"1234,50"`).
///
/// Used by the accounting export, which spreadsheets read as a number.
pub fn format_decimal_comma(amount: f64) -> String {
    format!("{:.2}", amount).replace('.', ",")
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(c);
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================
