//! Column layout resolution per (segment, country).
//!
//! The same logical template is laid out with different column counts per
//! segment spreadsheet and per region, so the projected-units and
//! competitor-pricing groups sit at shifted positions. The shifts are
//! data: a delta table keyed by (segment, region class, group), applied to
//! the base positions on every call. Nothing is mutated in place and
//! nothing leaks between calls; each resolution is independent.

use crate::ledger::columns;
use crate::model::{CountryCode, SellerSegment};

/// The two column groups whose physical position varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricGroup {
    /// Low/base/high scenario unit counts.
    ProjectedUnits,
    /// Price, fulfillment fee, storage fee.
    CompetitorPricing,
}

/// Resolved physical positions for one group, in base-column order
/// (low/base/high units, or price/fulfillment-fee/storage-fee).
pub type GroupColumns = [usize; 3];

/// Whether a country is in the segment's home region. Vendor templates
/// split on {US, CAN}; seller templates on {US, CAN, AUS}.
fn in_home_region(segment: SellerSegment, country: CountryCode) -> bool {
    use CountryCode::*;
    match segment {
        SellerSegment::Vendor => matches!(country, US | CAN),
        _ => matches!(country, US | CAN | AUS),
    }
}

/// Per-group base positions.
fn base_columns(group: MetricGroup) -> GroupColumns {
    match group {
        MetricGroup::ProjectedUnits => [
            columns::COL_UNITS_LOW,
            columns::COL_UNITS_BASE,
            columns::COL_UNITS_HIGH,
        ],
        MetricGroup::CompetitorPricing => [
            columns::COL_PRICE,
            columns::COL_FULFILLMENT_FEE,
            columns::COL_STORAGE_FEE,
        ],
    }
}

/// The delta table. One row per (segment, home?, group); members listed in
/// base-column order.
fn deltas(segment: SellerSegment, home: bool, group: MetricGroup) -> [i32; 3] {
    use MetricGroup::*;
    use SellerSegment::*;
    match (segment, home, group) {
        (Vendor, true, ProjectedUnits) => [2, 2, 2],
        (Vendor, false, ProjectedUnits) => [3, 3, 3],
        (ExistingSeller, true, ProjectedUnits) => [0, 0, 0],
        (ExistingSeller, false, ProjectedUnits) => [1, 1, 1],
        (NewSeller, true, ProjectedUnits) => [-2, -2, -2],
        (NewSeller, false, ProjectedUnits) => [-1, -1, -1],

        // price / fulfillment fee / storage fee
        (ExistingSeller, true, CompetitorPricing) => [0, 0, 0],
        (ExistingSeller, false, CompetitorPricing) => [0, 1, 1],
        (Vendor, true, CompetitorPricing) => [0, 2, 2],
        (Vendor, false, CompetitorPricing) => [0, 0, 3],
        (NewSeller, true, CompetitorPricing) => [-2, -2, -2],
        (NewSeller, false, CompetitorPricing) => [-2, -1, -1],
    }
}

/// Resolve the physical columns of a group for one (segment, country).
/// Pure and stateless: identical inputs always yield identical outputs.
pub fn resolve(segment: SellerSegment, country: CountryCode, group: MetricGroup) -> GroupColumns {
    let base = base_columns(group);
    let shift = deltas(segment, in_home_region(segment, country), group);
    let mut out = [0usize; 3];
    for (i, (b, d)) in base.iter().zip(shift.iter()).enumerate() {
        let col = *b as i32 + d;
        debug_assert!(col >= 0 && (col as usize) < columns::ROW_WIDTH);
        out[i] = col as usize;
    }
    out
}
