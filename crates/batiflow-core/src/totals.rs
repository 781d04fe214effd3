//! # Totals Engine
//!
//! Computes HT / VAT / TTC totals for a document.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  raw_total_ht   = Σ quantity × unit_price          (split labor/material)│
//! │  discount       = raw × value/100   |   value (fixed, may exceed raw)   │
//! │  net_total_ht   = max(0, raw − discount)                                │
//! │  raw_total_vat  = Σ quantity × unit_price × vat_rate/100  (undiscounted)│
//! │  ratio          = net / raw   if raw > 0   else 1                       │
//! │  total_vat      = raw_total_vat × ratio                                 │
//! │  total_ttc      = net_total_ht + total_vat                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The discount is a whole-document cut that deflates the blended VAT of the
//! undiscounted lines proportionally. It is never spread line by line.
//!
//! All arithmetic is `f64` in exactly the order above so the figures match
//! the ones the editor has always shown, to the last bit. The function is
//! pure and cheap enough to run on every keystroke.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{AmountType, GlobalSettings, Nature, Section};

// =============================================================================
// Totals
// =============================================================================

/// Output of [`compute_totals`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub raw_total_ht: f64,
    pub discount_amount: f64,
    pub net_total_ht: f64,
    /// VAT after proportional discount.
    pub total_vat: f64,
    pub total_ttc: f64,
    pub total_labor: f64,
    pub total_material: f64,
}

/// Computes the totals of a document.
///
/// Never fails: an empty document, or one whose lines sum to zero, yields
/// zero totals (the ratio guard keeps NaN out).
///
/// ## Example
/// ```rust
/// use batiflow_core::{compute_totals, AmountType, GlobalSettings, LineItem, Nature, Section};
///
/// let settings = GlobalSettings {
///     discount_value: 10.0,
///     discount_type: AmountType::Percent,
///     ..GlobalSettings::default()
/// };
/// let section = Section::new("Lot 1")
///     .with_items(vec![LineItem::new("Pose", 1.0, 1000.0, Nature::Labor)]);
///
/// let totals = compute_totals(&[section], &settings);
/// assert_eq!(totals.net_total_ht, 900.0);
/// assert_eq!(totals.total_ttc, 1080.0);
/// ```
pub fn compute_totals(sections: &[Section], settings: &GlobalSettings) -> Totals {
    let mut raw_total_ht = 0.0;
    let mut total_labor = 0.0;
    let mut total_material = 0.0;

    for item in sections.iter().flat_map(|s| s.items.iter()) {
        let line_total = item.quantity * item.unit_price;
        raw_total_ht += line_total;
        match item.nature {
            Nature::Labor => total_labor += line_total,
            Nature::Material => total_material += line_total,
        }
    }

    let discount_amount = match settings.discount_type {
        AmountType::Percent => raw_total_ht * (settings.discount_value / 100.0),
        AmountType::Fixed => settings.discount_value,
    };

    let net_total_ht = f64::max(0.0, raw_total_ht - discount_amount);

    let mut raw_total_vat = 0.0;
    for item in sections.iter().flat_map(|s| s.items.iter()) {
        raw_total_vat += item.quantity * item.unit_price * (item.vat_rate / 100.0);
    }

    let ratio = discount_ratio(raw_total_ht, net_total_ht);
    let total_vat = raw_total_vat * ratio;

    Totals {
        raw_total_ht,
        discount_amount,
        net_total_ht,
        total_vat,
        total_ttc: net_total_ht + total_vat,
        total_labor,
        total_material,
    }
}

/// `net / raw`, or 1 when there is nothing positive to discount.
#[inline]
fn discount_ratio(raw_total_ht: f64, net_total_ht: f64) -> f64 {
    if raw_total_ht > 0.0 {
        net_total_ht / raw_total_ht
    } else {
        1.0
    }
}

// =============================================================================
// VAT Breakdown
// =============================================================================

/// VAT collected at one rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VatLine {
    /// Rate in percent.
    pub rate: f64,
    /// Undiscounted HT base taxed at this rate.
    pub base_ht: f64,
    /// VAT at this rate after the proportional discount.
    pub vat: f64,
}

/// Splits the document VAT by rate, in order of first appearance.
///
/// Uses the same discount ratio as [`compute_totals`], so the lines add up
/// to `total_vat` (within float rounding).
pub fn vat_breakdown(sections: &[Section], settings: &GlobalSettings) -> Vec<VatLine> {
    let totals = compute_totals(sections, settings);
    let ratio = discount_ratio(totals.raw_total_ht, totals.net_total_ht);

    let mut lines: Vec<VatLine> = Vec::new();
    for item in sections.iter().flat_map(|s| s.items.iter()) {
        let base = item.quantity * item.unit_price;
        let vat = base * (item.vat_rate / 100.0);

        match lines.iter_mut().find(|l| l.rate == item.vat_rate) {
            Some(line) => {
                line.base_ht += base;
                line.vat += vat;
            }
            None => lines.push(VatLine {
                rate: item.vat_rate,
                base_ht: base,
                vat,
            }),
        }
    }

    for line in &mut lines {
        line.vat *= ratio;
    }

    lines
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineItem;

    const EPSILON: f64 = 1e-9;

    fn no_discount() -> GlobalSettings {
        GlobalSettings::default()
    }

    fn painting_section() -> Section {
        Section::new("Peinture").with_items(vec![
            LineItem::new("Préparation des supports", 10.0, 15.0, Nature::Labor),
            LineItem::new("Peinture impression", 5.0, 8.5, Nature::Material),
        ])
    }

    #[test]
    fn test_end_to_end_painting_quote() {
        let totals = compute_totals(&[painting_section()], &no_discount());

        assert_eq!(totals.raw_total_ht, 192.5);
        assert_eq!(totals.total_vat, 38.5);
        assert_eq!(totals.total_ttc, 231.0);
        assert_eq!(totals.total_labor, 150.0);
        assert_eq!(totals.total_material, 42.5);
        assert_eq!(totals.discount_amount, 0.0);
    }

    #[test]
    fn test_empty_document_is_all_zero() {
        let totals = compute_totals(&[], &no_discount());
        assert_eq!(totals, Totals::default());

        let empty_section = Section::new("Vide");
        let totals = compute_totals(&[empty_section], &no_discount());
        assert_eq!(totals.total_ttc, 0.0);
        assert!(!totals.total_vat.is_nan());
    }

    #[test]
    fn test_zero_sum_document_has_no_nan() {
        let section = Section::new("Avoir").with_items(vec![
            LineItem::new("Travaux", 1.0, 100.0, Nature::Labor),
            LineItem::new("Remise exceptionnelle", 1.0, -100.0, Nature::Material),
        ]);
        let settings = GlobalSettings {
            discount_value: 10.0,
            ..no_discount()
        };

        let totals = compute_totals(&[section], &settings);
        assert_eq!(totals.raw_total_ht, 0.0);
        assert_eq!(totals.net_total_ht, 0.0);
        assert_eq!(totals.total_vat, 0.0);
        assert_eq!(totals.total_ttc, 0.0);
    }

    #[test]
    fn test_labor_plus_material_equals_raw() {
        let section = Section::new("Mixte").with_items(vec![
            LineItem::new("Dépose", 3.3, 41.7, Nature::Labor),
            LineItem::new("Plâtre", 12.0, 7.15, Nature::Material),
            LineItem::new("Pose", 0.75, 62.0, Nature::Labor).with_vat_rate(10.0),
            LineItem::new("Reprise", 1.0, -12.4, Nature::Material),
        ]);

        let totals = compute_totals(&[section], &no_discount());
        assert!((totals.total_labor + totals.total_material - totals.raw_total_ht).abs() < EPSILON);
    }

    #[test]
    fn test_fixed_discount_floors_net_at_zero() {
        let settings = GlobalSettings {
            discount_value: 500.0,
            discount_type: AmountType::Fixed,
            ..no_discount()
        };

        let totals = compute_totals(&[painting_section()], &settings);
        assert_eq!(totals.discount_amount, 500.0);
        assert_eq!(totals.net_total_ht, 0.0);
        assert_eq!(totals.total_vat, 0.0);
        assert_eq!(totals.total_ttc, 0.0);
    }

    #[test]
    fn test_zero_discount_keeps_raw_vat() {
        let section = Section::new("Multi-taux").with_items(vec![
            LineItem::new("Rénovation", 10.0, 33.3, Nature::Labor).with_vat_rate(10.0),
            LineItem::new("Fournitures", 4.0, 19.99, Nature::Material),
            LineItem::new("Isolation", 2.0, 70.0, Nature::Material).with_vat_rate(5.5),
        ]);

        let raw_vat = 10.0 * 33.3 * (10.0 / 100.0) + 4.0 * 19.99 * (20.0 / 100.0)
            + 2.0 * 70.0 * (5.5 / 100.0);

        let totals = compute_totals(&[section], &no_discount());
        assert_eq!(totals.total_vat, raw_vat);
    }

    #[test]
    fn test_percent_discount_deflates_vat_proportionally() {
        let section = Section::new("Multi-taux").with_items(vec![
            LineItem::new("Main d'œuvre", 1.0, 600.0, Nature::Labor).with_vat_rate(10.0),
            LineItem::new("Matériaux", 1.0, 400.0, Nature::Material),
        ]);
        let settings = GlobalSettings {
            discount_value: 25.0,
            discount_type: AmountType::Percent,
            ..no_discount()
        };

        let totals = compute_totals(&[section], &settings);
        assert_eq!(totals.discount_amount, 250.0);
        assert_eq!(totals.net_total_ht, 750.0);
        // raw VAT 60 + 80 = 140, deflated by 0.75
        assert!((totals.total_vat - 105.0).abs() < EPSILON);
        assert!((totals.total_ttc - 855.0).abs() < EPSILON);
    }

    #[test]
    fn test_totals_are_order_independent() {
        let a = LineItem::new("A", 2.0, 12.5, Nature::Labor);
        let b = LineItem::new("B", 1.0, 80.0, Nature::Material).with_vat_rate(10.0);

        let forward = compute_totals(
            &[Section::new("S").with_items(vec![a.clone(), b.clone()])],
            &no_discount(),
        );
        let backward = compute_totals(
            &[Section::new("S1").with_items(vec![b]), Section::new("S2").with_items(vec![a])],
            &no_discount(),
        );

        assert_eq!(forward.total_ttc, backward.total_ttc);
    }

    #[test]
    fn test_vat_breakdown_sums_to_total_vat() {
        let section = Section::new("Multi-taux").with_items(vec![
            LineItem::new("Main d'œuvre", 1.0, 600.0, Nature::Labor).with_vat_rate(10.0),
            LineItem::new("Matériaux", 1.0, 400.0, Nature::Material),
            LineItem::new("Matériaux 2", 2.0, 50.0, Nature::Material),
        ]);
        let settings = GlobalSettings {
            discount_value: 100.0,
            discount_type: AmountType::Fixed,
            ..no_discount()
        };

        let lines = vat_breakdown(&[section.clone()], &settings);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].rate, 10.0);
        assert_eq!(lines[1].rate, 20.0);
        assert_eq!(lines[1].base_ht, 500.0);

        let totals = compute_totals(&[section], &settings);
        let sum: f64 = lines.iter().map(|l| l.vat).sum();
        assert!((sum - totals.total_vat).abs() < EPSILON);
    }
}
